use std::{fmt, str::FromStr};

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::Validate;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

id_newtype!(CustomerId);
id_newtype!(AddressId);
id_newtype!(InternetPlanId);
id_newtype!(SubscriptionId);
id_newtype!(InvoiceId);
id_newtype!(AppUserId);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CustomerStatus {
    Active,
    Expiring,
    Suspended,
    Expired,
    PendingActivation,
}

impl CustomerStatus {
    pub const ALL: [CustomerStatus; 5] = [
        CustomerStatus::Active,
        CustomerStatus::Expiring,
        CustomerStatus::Suspended,
        CustomerStatus::Expired,
        CustomerStatus::PendingActivation,
    ];

    /// Wire spelling, as sent in the `status` query parameter.
    pub const fn as_str(self) -> &'static str {
        match self {
            CustomerStatus::Active => "ACTIVE",
            CustomerStatus::Expiring => "EXPIRING",
            CustomerStatus::Suspended => "SUSPENDED",
            CustomerStatus::Expired => "EXPIRED",
            CustomerStatus::PendingActivation => "PENDING_ACTIVATION",
        }
    }
}

impl fmt::Display for CustomerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CustomerStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        CustomerStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| UnknownVariant {
                kind: "customer status",
                value: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionStatus {
    Active,
    Expiring,
    Expired,
    Cancelled,
}

impl SubscriptionStatus {
    pub const ALL: [SubscriptionStatus; 4] = [
        SubscriptionStatus::Active,
        SubscriptionStatus::Expiring,
        SubscriptionStatus::Expired,
        SubscriptionStatus::Cancelled,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "ACTIVE",
            SubscriptionStatus::Expiring => "EXPIRING",
            SubscriptionStatus::Expired => "EXPIRED",
            SubscriptionStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        SubscriptionStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| UnknownVariant {
                kind: "subscription status",
                value: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    User,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: AddressId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 100, message = "Country must be less than 100 characters"))]
    pub country: Option<String>,
    #[validate(
        custom(function = "crate::validation::not_blank", message = "City cannot be blank"),
        length(max = 100, message = "City must be less than 100 characters")
    )]
    pub city: String,
    #[validate(
        custom(
            function = "crate::validation::not_blank",
            message = "Street address cannot be blank"
        ),
        length(max = 200, message = "Street address must be less than 200 characters")
    )]
    pub street: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(custom(
        function = "crate::validation::postal_code_shape",
        message = "Postal code must be 3-10 alphanumeric characters"
    ))]
    pub postal_code: Option<String>,
}

impl Address {
    /// Single-line form: non-empty parts of country, city, street, postal code.
    pub fn inline(&self) -> String {
        [
            self.country.as_deref(),
            Some(self.city.as_str()),
            Some(self.street.as_str()),
            self.postal_code.as_deref(),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: CustomerId,
    pub username: String,
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub address: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_date: Option<DateTime<Utc>>,
    pub status: CustomerStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InternetPlan {
    pub id: InternetPlanId,
    pub name: String,
    pub speed: String,
    pub price: f64,
    pub bandwidth: String,
    #[serde(alias = "active")]
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: SubscriptionId,
    pub customer: Customer,
    pub internet_plan: InternetPlan,
    pub start_date: DateTime<Utc>,
    pub end_date: NaiveDate,
    pub status: SubscriptionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Subscription {
    /// Active and ending within the next seven days (exclusive on both ends).
    pub fn is_expiring_soon(&self, today: NaiveDate) -> bool {
        let warning_start = self
            .end_date
            .checked_sub_days(Days::new(7))
            .unwrap_or(self.end_date);
        self.status == SubscriptionStatus::Active && today > warning_start && today < self.end_date
    }

    pub fn is_expired(&self, today: NaiveDate) -> bool {
        today > self.end_date
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: InvoiceId,
    pub subscription_id: SubscriptionId,
    pub issue_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub amount_due: f64,
    pub amount_paid: f64,
    #[serde(alias = "paid")]
    pub is_paid: bool,
}

impl Invoice {
    pub fn outstanding(&self) -> f64 {
        (self.amount_due - self.amount_paid).max(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppUser {
    pub id: AppUserId,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub role: Role,
}
