use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::{
    Address, CustomerId, CustomerStatus, InternetPlanId, InvoiceId, SubscriptionStatus,
};

/// Paging metadata echoed back by the collection endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pageable {
    pub page_number: u32,
    pub page_size: u32,
}

/// One page of a paginated collection endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub total_pages: u32,
    #[serde(default)]
    pub total_elements: u64,
    #[serde(default)]
    pub first: bool,
    #[serde(default)]
    pub last: bool,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "paged_or_none"
    )]
    pub pageable: Option<Pageable>,
}

/// Unpaged responses carry `"pageable": "INSTANCE"` instead of an object.
fn paged_or_none<'de, D>(deserializer: D) -> Result<Option<Pageable>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Paged(Pageable),
        Other(serde::de::IgnoredAny),
    }

    Ok(match Option::<Repr>::deserialize(deserializer)? {
        Some(Repr::Paged(pageable)) => Some(pageable),
        Some(Repr::Other(_)) | None => None,
    })
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Self {
            content: Vec::new(),
            total_pages: 0,
            total_elements: 0,
            first: true,
            last: true,
            pageable: None,
        }
    }
}

/// Body for creating a customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDraft {
    #[validate(custom(
        function = "crate::validation::not_blank",
        message = "Username cannot be blank"
    ))]
    pub username: String,
    #[validate(custom(
        function = "crate::validation::not_blank",
        message = "Full name cannot be blank"
    ))]
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(custom(
        function = "crate::validation::phone_shape",
        message = "Phone number must be 6-20 digits with optional + prefix"
    ))]
    pub phone: Option<String>,
    #[validate(nested)]
    pub address: Address,
    pub status: CustomerStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 500, message = "Notes must be less than 500 characters"))]
    pub notes: Option<String>,
}

/// Body for creating or replacing an internet plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InternetPlanDraft {
    pub name: String,
    #[validate(
        custom(function = "crate::validation::not_blank", message = "Speed cannot be blank"),
        length(max = 10, message = "Speed must be at most 10 characters")
    )]
    pub speed: String,
    #[validate(range(min = 0.0, message = "Price must be non-negative"))]
    pub price: f64,
    #[validate(custom(
        function = "crate::validation::not_blank",
        message = "Bandwidth cannot be blank"
    ))]
    pub bandwidth: String,
    pub is_active: bool,
}

/// Body for replacing a customer's subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionUpdate {
    pub customer_id: CustomerId,
    pub internet_plan_id: InternetPlanId,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: SubscriptionStatus,
}

/// Body and response of the invoice payment endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoicePayment {
    pub id: InvoiceId,
    pub amount_paid: f64,
}
