//! REST collaborator: the back-office HTTP API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::{
        AppUser, Customer, CustomerId, InternetPlan, InternetPlanId, Invoice, InvoiceId,
        Subscription,
    },
    error::ErrorMessage,
    protocol::{CustomerDraft, InternetPlanDraft, InvoicePayment, Page, SubscriptionUpdate},
    validation::{validate_customer_draft, validate_internet_plan_draft},
};
use tracing::{debug, warn};
use url::Url;

use crate::{error::ApiFailure, query::ListRequest, session::SessionProbe};

pub type CustomerPage = Page<Customer>;

/// The part of the back office the customer list depends on.
#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    async fn fetch_customers(&self, request: &ListRequest) -> Result<CustomerPage, ApiFailure>;
    async fn delete_customer(&self, id: &CustomerId) -> Result<(), ApiFailure>;
}

/// reqwest-backed client for every back-office endpoint the console uses.
#[derive(Clone)]
pub struct HttpBackofficeClient {
    http: Client,
    base_url: String,
}

/// Trims whitespace and trailing slashes so paths can be appended verbatim.
pub fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

impl HttpBackofficeClient {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, ApiFailure> {
        let base_url = normalize_base_url(base_url);
        Url::parse(&base_url).map_err(|err| ApiFailure::InvalidUrl(format!("{base_url}: {err}")))?;

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|err| ApiFailure::Network(format!("failed to build http client: {err}")))?;

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, ApiFailure> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message_from_body(&body)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string());
        debug!(status = status.as_u16(), %message, "back office rejected request");
        Err(ApiFailure::status(status.as_u16(), message))
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiFailure> {
        let response = self.send(builder).await?;
        Ok(response.json().await?)
    }

    async fn send_empty(&self, builder: RequestBuilder) -> Result<(), ApiFailure> {
        self.send(builder).await?;
        Ok(())
    }

    pub async fn get_customer(&self, id: &CustomerId) -> Result<Customer, ApiFailure> {
        self.send_json(self.http.get(self.url(&format!("/customers/{id}"))))
            .await
    }

    pub async fn create_customer(
        &self,
        draft: &CustomerDraft,
        internet_plan_id: &InternetPlanId,
    ) -> Result<Customer, ApiFailure> {
        validate_customer_draft(draft)?;
        self.send_json(
            self.http
                .post(self.url("/customers"))
                .query(&[("internetPlanId", internet_plan_id.as_str())])
                .json(draft),
        )
        .await
    }

    pub async fn update_customer(&self, customer: &Customer) -> Result<Customer, ApiFailure> {
        self.send_json(
            self.http
                .put(self.url(&format!("/customers/{}", customer.id)))
                .json(customer),
        )
        .await
    }

    pub async fn list_internet_plans(&self) -> Result<Vec<InternetPlan>, ApiFailure> {
        self.send_json(self.http.get(self.url("/internet_plans")))
            .await
    }

    pub async fn get_internet_plan(&self, id: &InternetPlanId) -> Result<InternetPlan, ApiFailure> {
        self.send_json(self.http.get(self.url(&format!("/internet_plans/{id}"))))
            .await
    }

    pub async fn create_internet_plan(
        &self,
        draft: &InternetPlanDraft,
    ) -> Result<InternetPlan, ApiFailure> {
        validate_internet_plan_draft(draft)?;
        self.send_json(self.http.post(self.url("/internet_plans")).json(draft))
            .await
    }

    pub async fn update_internet_plan(
        &self,
        id: &InternetPlanId,
        draft: &InternetPlanDraft,
    ) -> Result<InternetPlan, ApiFailure> {
        validate_internet_plan_draft(draft)?;
        self.send_json(
            self.http
                .put(self.url(&format!("/internet_plans/{id}")))
                .json(draft),
        )
        .await
    }

    pub async fn delete_internet_plan(&self, id: &InternetPlanId) -> Result<(), ApiFailure> {
        self.send_empty(self.http.delete(self.url(&format!("/internet_plans/{id}"))))
            .await
    }

    pub async fn get_subscription(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Subscription, ApiFailure> {
        self.send_json(
            self.http
                .get(self.url(&format!("/subscriptions/{customer_id}"))),
        )
        .await
    }

    pub async fn update_subscription(
        &self,
        update: &SubscriptionUpdate,
    ) -> Result<Subscription, ApiFailure> {
        self.send_json(
            self.http
                .put(self.url(&format!("/subscriptions/{}", update.customer_id)))
                .json(update),
        )
        .await
    }

    pub async fn delete_subscription(&self, customer_id: &CustomerId) -> Result<(), ApiFailure> {
        self.send_empty(
            self.http
                .delete(self.url(&format!("/subscriptions/{customer_id}"))),
        )
        .await
    }

    /// Loads a subscription together with the plans it may be switched to.
    pub async fn load_subscription_editor(
        &self,
        customer_id: &CustomerId,
    ) -> Result<(Subscription, Vec<InternetPlan>), ApiFailure> {
        futures::try_join!(
            self.get_subscription(customer_id),
            self.list_internet_plans()
        )
    }

    pub async fn list_customer_invoices(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Vec<Invoice>, ApiFailure> {
        self.send_json(
            self.http
                .get(self.url(&format!("/invoices/customer/{customer_id}"))),
        )
        .await
    }

    pub async fn get_invoice(&self, id: &InvoiceId) -> Result<Invoice, ApiFailure> {
        self.send_json(self.http.get(self.url(&format!("/invoices/{id}"))))
            .await
    }

    pub async fn record_payment(
        &self,
        id: &InvoiceId,
        amount_paid: f64,
    ) -> Result<InvoicePayment, ApiFailure> {
        let payment = InvoicePayment {
            id: id.clone(),
            amount_paid,
        };
        self.send_json(self.http.put(self.url("/invoices")).json(&payment))
            .await
    }

    /// Pays the full amount due and returns the invoice as it now stands.
    pub async fn mark_invoice_paid(&self, invoice: &Invoice) -> Result<Invoice, ApiFailure> {
        if invoice.is_paid {
            return Ok(invoice.clone());
        }
        let payment = self.record_payment(&invoice.id, invoice.amount_due).await?;
        if payment.id != invoice.id {
            warn!(expected = %invoice.id, got = %payment.id, "payment echoed a different invoice");
        }
        Ok(apply_payment(invoice, &payment))
    }
}

/// An invoice counts as paid only when the paid amount matches the amount due.
fn apply_payment(invoice: &Invoice, payment: &InvoicePayment) -> Invoice {
    Invoice {
        amount_paid: payment.amount_paid,
        is_paid: payment.amount_paid == invoice.amount_due,
        ..invoice.clone()
    }
}

fn error_message_from_body(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    if let Ok(error) = serde_json::from_str::<ErrorMessage>(body) {
        return Some(error.message);
    }
    // Validation failures come back as a bare list of `field: message` strings.
    if let Ok(fields) = serde_json::from_str::<Vec<String>>(body) {
        return Some(fields.join("; "));
    }
    Some(body.chars().take(200).collect())
}

#[async_trait]
impl CustomerDirectory for HttpBackofficeClient {
    async fn fetch_customers(&self, request: &ListRequest) -> Result<CustomerPage, ApiFailure> {
        self.send_json(
            self.http
                .get(self.url(&request.path_and_query())),
        )
        .await
    }

    async fn delete_customer(&self, id: &CustomerId) -> Result<(), ApiFailure> {
        self.send_empty(self.http.delete(self.url(&format!("/customers/{id}"))))
            .await
    }
}

#[async_trait]
impl SessionProbe for HttpBackofficeClient {
    async fn current_user(&self) -> Result<Option<AppUser>, ApiFailure> {
        let response = match self.send(self.http.get(self.url("/auth/me"))).await {
            Ok(response) => response,
            Err(err) if err.is_unauthenticated() => return Ok(None),
            Err(err) => return Err(err),
        };
        // An anonymous principal is reported as an empty 200 body.
        let body = response.text().await?;
        if body.trim().is_empty() || body.trim() == "null" {
            return Ok(None);
        }
        serde_json::from_str(&body)
            .map(Some)
            .map_err(|err| ApiFailure::Decode(err.to_string()))
    }
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
