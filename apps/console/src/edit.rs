//! Flag sets for the create and edit subcommands and how they turn into
//! request bodies.

use anyhow::{anyhow, Context};
use chrono::{NaiveDate, NaiveTime};
use clap::Args;
use shared::{
    domain::{
        Address, AddressId, Customer, CustomerStatus, InternetPlan, InternetPlanId, Subscription,
        SubscriptionStatus,
    },
    protocol::{CustomerDraft, InternetPlanDraft, SubscriptionUpdate},
};

/// An empty value clears an optional field.
fn optional(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn required(value: Option<String>, flag: &str) -> anyhow::Result<String> {
    value.ok_or_else(|| anyhow!("--{flag} is required"))
}

#[derive(Args, Debug, Default, Clone)]
pub struct CustomerArgs {
    #[arg(long)]
    pub username: Option<String>,
    #[arg(long)]
    pub full_name: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    /// Defaults to the username for new customers.
    #[arg(long)]
    pub address_id: Option<String>,
    #[arg(long)]
    pub country: Option<String>,
    #[arg(long)]
    pub city: Option<String>,
    #[arg(long)]
    pub street: Option<String>,
    #[arg(long)]
    pub postal_code: Option<String>,
    #[arg(long)]
    pub status: Option<CustomerStatus>,
    #[arg(long)]
    pub notes: Option<String>,
}

impl CustomerArgs {
    /// Body for a new customer. Status defaults to `PENDING_ACTIVATION`.
    pub fn into_draft(self) -> anyhow::Result<CustomerDraft> {
        let username = required(self.username, "username")?;
        let address_id = self.address_id.unwrap_or_else(|| username.clone());
        Ok(CustomerDraft {
            full_name: required(self.full_name, "full-name")?,
            phone: self.phone.and_then(optional),
            address: Address {
                id: AddressId::new(address_id),
                country: self.country.and_then(optional),
                city: required(self.city, "city")?,
                street: required(self.street, "street")?,
                postal_code: self.postal_code.and_then(optional),
            },
            status: self.status.unwrap_or(CustomerStatus::PendingActivation),
            notes: self.notes.and_then(optional),
            username,
        })
    }

    /// Overwrites the fields that were given and keeps the rest.
    pub fn apply_to(self, customer: &mut Customer) {
        if let Some(v) = self.username {
            customer.username = v;
        }
        if let Some(v) = self.full_name {
            customer.full_name = v;
        }
        if let Some(v) = self.phone {
            customer.phone = optional(v);
        }
        if let Some(v) = self.address_id {
            customer.address.id = AddressId::new(v);
        }
        if let Some(v) = self.country {
            customer.address.country = optional(v);
        }
        if let Some(v) = self.city {
            customer.address.city = v;
        }
        if let Some(v) = self.street {
            customer.address.street = v;
        }
        if let Some(v) = self.postal_code {
            customer.address.postal_code = optional(v);
        }
        if let Some(v) = self.status {
            customer.status = v;
        }
        if let Some(v) = self.notes {
            customer.notes = optional(v);
        }
    }
}

/// The editable part of a stored customer, for checking an edit locally.
pub fn draft_of(customer: &Customer) -> CustomerDraft {
    CustomerDraft {
        username: customer.username.clone(),
        full_name: customer.full_name.clone(),
        phone: customer.phone.clone(),
        address: customer.address.clone(),
        status: customer.status,
        notes: customer.notes.clone(),
    }
}

#[derive(Args, Debug, Default, Clone)]
pub struct PlanArgs {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub speed: Option<String>,
    #[arg(long)]
    pub price: Option<f64>,
    #[arg(long)]
    pub bandwidth: Option<String>,
    /// true or false; new plans are active.
    #[arg(long)]
    pub active: Option<bool>,
}

impl PlanArgs {
    pub fn into_draft(self) -> anyhow::Result<InternetPlanDraft> {
        Ok(InternetPlanDraft {
            name: required(self.name, "name")?,
            speed: required(self.speed, "speed")?,
            price: self.price.ok_or_else(|| anyhow!("--price is required"))?,
            bandwidth: required(self.bandwidth, "bandwidth")?,
            is_active: self.active.unwrap_or(true),
        })
    }

    pub fn draft_over(self, plan: &InternetPlan) -> InternetPlanDraft {
        InternetPlanDraft {
            name: self.name.unwrap_or_else(|| plan.name.clone()),
            speed: self.speed.unwrap_or_else(|| plan.speed.clone()),
            price: self.price.unwrap_or(plan.price),
            bandwidth: self.bandwidth.unwrap_or_else(|| plan.bandwidth.clone()),
            is_active: self.active.unwrap_or(plan.is_active),
        }
    }
}

#[derive(Args, Debug, Default, Clone)]
pub struct SubscriptionArgs {
    /// Switch to another internet plan.
    #[arg(long)]
    pub plan_id: Option<String>,
    /// Last day of the subscription, YYYY-MM-DD.
    #[arg(long)]
    pub end_date: Option<NaiveDate>,
    #[arg(long)]
    pub status: Option<SubscriptionStatus>,
}

impl SubscriptionArgs {
    /// Replacement body for `current`; the start date is always kept.
    pub fn update_for(self, current: &Subscription) -> anyhow::Result<SubscriptionUpdate> {
        let end_date = self.end_date.unwrap_or(current.end_date);
        let end_date = end_date
            .and_time(NaiveTime::MIN)
            .and_local_timezone(chrono::Utc)
            .single()
            .with_context(|| format!("invalid end date {end_date}"))?;
        if end_date < current.start_date {
            anyhow::bail!(
                "end date {} is before the start date {}",
                end_date.date_naive(),
                current.start_date.date_naive()
            );
        }
        Ok(SubscriptionUpdate {
            customer_id: current.customer.id.clone(),
            internet_plan_id: self
                .plan_id
                .map(InternetPlanId::new)
                .unwrap_or_else(|| current.internet_plan.id.clone()),
            start_date: current.start_date,
            end_date,
            status: self.status.unwrap_or(current.status),
        })
    }
}
