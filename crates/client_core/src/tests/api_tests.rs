use std::sync::Arc;

use super::*;
use axum::{
    extract::{Path, RawQuery, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response as AxumResponse},
    routing::{get, put},
    Json, Router,
};
use serde_json::{json, Value};
use shared::domain::{Address, AddressId, CustomerStatus, SubscriptionId, SubscriptionStatus};
use tokio::{net::TcpListener, sync::Mutex};

use crate::query::{PageSize, QueryState, SortDirection};

#[derive(Clone, Default)]
struct ServerState {
    seen: Arc<Mutex<Vec<String>>>,
    bodies: Arc<Mutex<Vec<Value>>>,
    signed_in: bool,
}

impl ServerState {
    async fn record(&self, method: Method, path: &str, query: Option<String>) {
        let entry = match query {
            Some(query) => format!("{method} {path}?{query}"),
            None => format!("{method} {path}"),
        };
        self.seen.lock().await.push(entry);
    }

    async fn record_body(&self, method: Method, path: &str, query: Option<String>, body: Value) {
        self.record(method, path, query).await;
        self.bodies.lock().await.push(body);
    }

    async fn last_body(&self) -> Value {
        self.bodies.lock().await.last().cloned().unwrap_or(Value::Null)
    }
}

fn customer_json(id: &str) -> Value {
    json!({
        "id": id,
        "username": format!("user-{id}"),
        "fullName": "Jane Roe",
        "address": {"id": "a-1", "city": "Berlin", "street": "Main 1"},
        "registrationDate": "2024-03-01T10:15:00Z",
        "status": "ACTIVE"
    })
}

fn plan_json(id: &str) -> Value {
    json!({
        "id": id,
        "name": "Fiber 100",
        "speed": "100",
        "price": 29.9,
        "bandwidth": "unlimited",
        "active": true
    })
}

fn page_json(ids: &[&str]) -> Value {
    json!({
        "content": ids.iter().map(|id| customer_json(id)).collect::<Vec<_>>(),
        "totalPages": 4,
        "totalElements": 17,
        "first": true,
        "last": false,
        "pageable": {"pageNumber": 0, "pageSize": 5}
    })
}

async fn list_customers(State(state): State<ServerState>, RawQuery(query): RawQuery) -> Json<Value> {
    state.record(Method::GET, "/api/customers", query).await;
    Json(page_json(&["c-1", "c-2"]))
}

async fn search_customers(
    State(state): State<ServerState>,
    RawQuery(query): RawQuery,
) -> Json<Value> {
    state
        .record(Method::GET, "/api/customers/search", query)
        .await;
    Json(page_json(&["c-3"]))
}

async fn create_customer(
    State(state): State<ServerState>,
    RawQuery(query): RawQuery,
    Json(body): Json<Value>,
) -> AxumResponse {
    state
        .record_body(Method::POST, "/api/customers", query, body)
        .await;
    (StatusCode::CREATED, Json(customer_json("c-new"))).into_response()
}

async fn update_customer(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Json<Value> {
    state
        .record_body(Method::PUT, &format!("/api/customers/{id}"), None, body.clone())
        .await;
    Json(body)
}

async fn get_customer(State(state): State<ServerState>, Path(id): Path<String>) -> AxumResponse {
    state
        .record(Method::GET, &format!("/api/customers/{id}"), None)
        .await;
    Json(customer_json(&id)).into_response()
}

async fn delete_customer(State(state): State<ServerState>, Path(id): Path<String>) -> AxumResponse {
    state
        .record(Method::DELETE, &format!("/api/customers/{id}"), None)
        .await;
    if id == "missing" {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({
                "message": "Customer not found with id: missing",
                "timestamp": "2024-05-01T12:00:00.123"
            })),
        )
            .into_response();
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn list_plans(State(state): State<ServerState>) -> Json<Value> {
    state.record(Method::GET, "/api/internet_plans", None).await;
    Json(json!([plan_json("p-1"), plan_json("p-2")]))
}

async fn create_plan(State(state): State<ServerState>) -> AxumResponse {
    state.record(Method::POST, "/api/internet_plans", None).await;
    (
        StatusCode::BAD_REQUEST,
        Json(json!(["name: Plan name already exists"])),
    )
        .into_response()
}

async fn update_plan(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Json<Value> {
    state
        .record_body(Method::PUT, &format!("/api/internet_plans/{id}"), None, body)
        .await;
    Json(plan_json(&id))
}

fn subscription_json(customer_id: &str) -> Value {
    json!({
        "id": "s-1",
        "customer": customer_json(customer_id),
        "internetPlan": plan_json("p-1"),
        "startDate": "2024-06-30T00:00:00Z",
        "endDate": "2025-06-30",
        "status": "ACTIVE"
    })
}

async fn get_subscription(
    State(state): State<ServerState>,
    Path(customer_id): Path<String>,
) -> Json<Value> {
    state
        .record(
            Method::GET,
            &format!("/api/subscriptions/{customer_id}"),
            None,
        )
        .await;
    Json(subscription_json(&customer_id))
}

async fn update_subscription(
    State(state): State<ServerState>,
    Path(customer_id): Path<String>,
    Json(body): Json<Value>,
) -> Json<Value> {
    state
        .record_body(
            Method::PUT,
            &format!("/api/subscriptions/{customer_id}"),
            None,
            body,
        )
        .await;
    Json(subscription_json(&customer_id))
}

async fn delete_subscription(
    State(state): State<ServerState>,
    Path(customer_id): Path<String>,
) -> StatusCode {
    state
        .record(
            Method::DELETE,
            &format!("/api/subscriptions/{customer_id}"),
            None,
        )
        .await;
    StatusCode::NO_CONTENT
}

async fn pay_invoice(State(state): State<ServerState>, Json(body): Json<Value>) -> Json<Value> {
    state.record(Method::PUT, "/api/invoices", None).await;
    Json(body)
}

async fn current_user(State(state): State<ServerState>) -> AxumResponse {
    state.record(Method::GET, "/api/auth/me", None).await;
    if !state.signed_in {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!({
        "id": "u-1",
        "username": "octocat",
        "avatarUrl": "https://avatars.example.com/u/1",
        "role": "ADMIN"
    }))
    .into_response()
}

async fn spawn_backoffice(state: ServerState) -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let app = Router::new()
        .route("/api/customers", get(list_customers).post(create_customer))
        .route("/api/customers/search", get(search_customers))
        .route(
            "/api/customers/:id",
            get(get_customer).put(update_customer).delete(delete_customer),
        )
        .route("/api/internet_plans", get(list_plans).post(create_plan))
        .route("/api/internet_plans/:id", put(update_plan))
        .route(
            "/api/subscriptions/:customer_id",
            get(get_subscription)
                .put(update_subscription)
                .delete(delete_subscription),
        )
        .route("/api/invoices", put(pay_invoice))
        .route("/api/auth/me", get(current_user))
        .with_state(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}/api")
}

async fn client_for(state: &ServerState) -> HttpBackofficeClient {
    let base = spawn_backoffice(state.clone()).await;
    HttpBackofficeClient::new(&format!("{base}/"), Some(Duration::from_secs(5))).expect("client")
}

fn sample_invoice(is_paid: bool) -> Invoice {
    Invoice {
        id: InvoiceId::from("inv-1"),
        subscription_id: SubscriptionId::from("s-1"),
        issue_date: "2024-06-01T00:00:00Z".parse().expect("issue date"),
        due_date: "2024-06-15T00:00:00Z".parse().expect("due date"),
        amount_due: 29.9,
        amount_paid: 0.0,
        is_paid,
    }
}

#[test]
fn rejects_unparseable_base_url() {
    assert!(matches!(
        HttpBackofficeClient::new("localhost without scheme", None),
        Err(ApiFailure::InvalidUrl(_))
    ));
    let client = HttpBackofficeClient::new(" http://localhost:8080/api// ", None).expect("client");
    assert_eq!(client.base_url(), "http://localhost:8080/api");
}

#[test]
fn error_bodies_are_reduced_to_a_message() {
    assert_eq!(
        error_message_from_body(r#"{"message":"Plan not found","timestamp":null}"#).as_deref(),
        Some("Plan not found")
    );
    assert_eq!(
        error_message_from_body(r#"["speed: Speed cannot be blank","price: bad"]"#).as_deref(),
        Some("speed: Speed cannot be blank; price: bad")
    );
    assert_eq!(
        error_message_from_body("upstream timeout").as_deref(),
        Some("upstream timeout")
    );
    assert_eq!(error_message_from_body("  "), None);
}

#[tokio::test]
async fn plain_list_sends_page_and_size_only() {
    let state = ServerState::default();
    let client = client_for(&state).await;

    let request = QueryState::default().request_for_page(0);
    let page = client.fetch_customers(&request).await.expect("page");

    assert_eq!(page.content.len(), 2);
    assert_eq!(page.total_pages, 4);
    assert_eq!(
        state.seen.lock().await.clone(),
        vec!["GET /api/customers?page=0&size=5"]
    );
}

#[tokio::test]
async fn search_sends_parameters_in_wire_order() {
    let state = ServerState::default();
    let client = client_for(&state).await;

    let query = QueryState {
        search_term: " müller & sons ".into(),
        status_filter: Some(CustomerStatus::Active),
        sort_direction: SortDirection::Descending,
        page_size: PageSize::Ten,
        ..QueryState::default()
    };
    let request = query.request_for_page(2);
    let page = client.fetch_customers(&request).await.expect("page");

    assert_eq!(page.content[0].id, CustomerId::from("c-3"));
    let seen = state.seen.lock().await.clone();
    assert_eq!(seen, vec![format!("GET /api{}", request.path_and_query())]);
    assert_eq!(
        seen[0],
        "GET /api/customers/search?page=2&size=10&searchTerm=m%C3%BCller+%26+sons&status=ACTIVE&sort=registrationDate,desc"
    );
}

fn customer_draft() -> CustomerDraft {
    CustomerDraft {
        username: "jroe".into(),
        full_name: "Jane Roe".into(),
        phone: Some("+49 30 1234567".into()),
        address: Address {
            id: AddressId::from("a-9"),
            country: Some("Germany".into()),
            city: "Berlin".into(),
            street: "Main 1".into(),
            postal_code: Some("10178".into()),
        },
        status: CustomerStatus::PendingActivation,
        notes: None,
    }
}

#[tokio::test]
async fn creating_a_customer_posts_the_draft_with_the_plan_id() {
    let state = ServerState::default();
    let client = client_for(&state).await;

    let created = client
        .create_customer(&customer_draft(), &InternetPlanId::from("p-1"))
        .await
        .expect("created");

    assert_eq!(created.id, CustomerId::from("c-new"));
    assert_eq!(
        state.seen.lock().await.clone(),
        vec!["POST /api/customers?internetPlanId=p-1"]
    );
    let body = state.last_body().await;
    assert_eq!(body["username"], "jroe");
    assert_eq!(body["fullName"], "Jane Roe");
    assert_eq!(body["status"], "PENDING_ACTIVATION");
    assert_eq!(body["address"]["postalCode"], "10178");
    assert!(body.get("notes").is_none());
    assert!(body.get("internetPlanId").is_none());
}

#[tokio::test]
async fn invalid_customer_draft_is_not_posted() {
    let state = ServerState::default();
    let client = client_for(&state).await;

    let mut draft = customer_draft();
    draft.phone = Some("call me".into());
    let err = client
        .create_customer(&draft, &InternetPlanId::from("p-1"))
        .await
        .expect_err("invalid");
    assert!(matches!(
        err,
        ApiFailure::Validation(ref errors) if errors.fields()[0].starts_with("phone: ")
    ));
    assert!(state.seen.lock().await.is_empty());
}

#[tokio::test]
async fn updating_a_customer_puts_the_full_record() {
    let state = ServerState::default();
    let client = client_for(&state).await;

    let mut customer = client
        .get_customer(&CustomerId::from("c-4"))
        .await
        .expect("customer");
    customer.notes = Some("moved upstairs".into());
    customer.status = CustomerStatus::Suspended;

    let updated = client.update_customer(&customer).await.expect("updated");

    assert_eq!(updated, customer);
    assert_eq!(
        state.seen.lock().await.clone(),
        vec!["GET /api/customers/c-4", "PUT /api/customers/c-4"]
    );
    let body = state.last_body().await;
    assert_eq!(body["id"], "c-4");
    assert_eq!(body["fullName"], "Jane Roe");
    assert_eq!(body["registrationDate"], "2024-03-01T10:15:00Z");
    assert_eq!(body["status"], "SUSPENDED");
    assert_eq!(body["notes"], "moved upstairs");
}

#[tokio::test]
async fn updating_a_plan_puts_the_draft_under_its_id() {
    let state = ServerState::default();
    let client = client_for(&state).await;

    let draft = InternetPlanDraft {
        name: "Fiber 250".into(),
        speed: "250".into(),
        price: 39.0,
        bandwidth: "unlimited".into(),
        is_active: false,
    };
    let plan = client
        .update_internet_plan(&InternetPlanId::from("p-2"), &draft)
        .await
        .expect("updated");

    assert_eq!(plan.id, InternetPlanId::from("p-2"));
    assert_eq!(
        state.seen.lock().await.clone(),
        vec!["PUT /api/internet_plans/p-2"]
    );
    let body = state.last_body().await;
    assert_eq!(body["name"], "Fiber 250");
    assert_eq!(body["price"], 39.0);
    assert_eq!(body["isActive"], false);
}

#[tokio::test]
async fn subscriptions_are_replaced_and_cancelled_by_customer_id() {
    let state = ServerState::default();
    let client = client_for(&state).await;

    let update = SubscriptionUpdate {
        customer_id: CustomerId::from("c-7"),
        internet_plan_id: InternetPlanId::from("p-2"),
        start_date: "2024-06-30T00:00:00Z".parse().expect("start"),
        end_date: "2026-06-30T00:00:00Z".parse().expect("end"),
        status: SubscriptionStatus::Active,
    };
    let subscription = client.update_subscription(&update).await.expect("updated");
    assert_eq!(subscription.customer.id, CustomerId::from("c-7"));

    let body = state.last_body().await;
    assert_eq!(body["customerId"], "c-7");
    assert_eq!(body["internetPlanId"], "p-2");
    assert_eq!(body["startDate"], "2024-06-30T00:00:00Z");
    assert_eq!(body["endDate"], "2026-06-30T00:00:00Z");
    assert_eq!(body["status"], "ACTIVE");

    client
        .delete_subscription(&CustomerId::from("c-7"))
        .await
        .expect("cancelled");
    assert_eq!(
        state.seen.lock().await.clone(),
        vec![
            "PUT /api/subscriptions/c-7",
            "DELETE /api/subscriptions/c-7"
        ]
    );
}

#[tokio::test]
async fn deleting_missing_customer_surfaces_server_message() {
    let state = ServerState::default();
    let client = client_for(&state).await;

    client
        .delete_customer(&CustomerId::from("c-1"))
        .await
        .expect("delete");
    let err = client
        .delete_customer(&CustomerId::from("missing"))
        .await
        .expect_err("404");

    assert!(err.is_not_found());
    match err {
        ApiFailure::Status { status, message, .. } => {
            assert_eq!(status, 404);
            assert_eq!(message, "Customer not found with id: missing");
        }
        other => panic!("unexpected failure: {other:?}"),
    }
}

#[tokio::test]
async fn server_side_validation_errors_are_joined() {
    let state = ServerState::default();
    let client = client_for(&state).await;

    let draft = InternetPlanDraft {
        name: "Fiber 100".into(),
        speed: "100".into(),
        price: 29.9,
        bandwidth: "unlimited".into(),
        is_active: true,
    };
    let err = client
        .create_internet_plan(&draft)
        .await
        .expect_err("rejected");
    assert!(matches!(
        err,
        ApiFailure::Status { status: 400, ref message, .. } if message == "name: Plan name already exists"
    ));
}

#[tokio::test]
async fn invalid_draft_never_reaches_the_server() {
    let state = ServerState::default();
    let client = client_for(&state).await;

    let draft = InternetPlanDraft {
        name: "Broken".into(),
        speed: String::new(),
        price: -5.0,
        bandwidth: "unlimited".into(),
        is_active: false,
    };
    let err = client
        .create_internet_plan(&draft)
        .await
        .expect_err("invalid");
    assert!(matches!(err, ApiFailure::Validation(ref errors) if errors.fields().len() == 2));
    assert!(state.seen.lock().await.is_empty());
}

#[tokio::test]
async fn subscription_editor_loads_subscription_and_plans() {
    let state = ServerState::default();
    let client = client_for(&state).await;

    let (subscription, plans) = client
        .load_subscription_editor(&CustomerId::from("c-7"))
        .await
        .expect("editor");

    assert_eq!(subscription.customer.id, CustomerId::from("c-7"));
    assert_eq!(subscription.internet_plan.id, InternetPlanId::from("p-1"));
    assert_eq!(plans.len(), 2);
    assert!(plans.iter().all(|plan| plan.is_active));
}

#[tokio::test]
async fn marking_invoice_paid_settles_the_full_amount() {
    let state = ServerState::default();
    let client = client_for(&state).await;

    let paid = client
        .mark_invoice_paid(&sample_invoice(false))
        .await
        .expect("paid");
    assert!(paid.is_paid);
    assert_eq!(paid.amount_paid, 29.9);
    assert_eq!(paid.outstanding(), 0.0);

    let untouched = client
        .mark_invoice_paid(&sample_invoice(true))
        .await
        .expect("already paid");
    assert!(untouched.is_paid);
    assert_eq!(state.seen.lock().await.len(), 1);
}

#[test]
fn overpayment_does_not_mark_an_invoice_paid() {
    let invoice = sample_invoice(false);
    let exact = InvoicePayment {
        id: invoice.id.clone(),
        amount_paid: 29.9,
    };
    assert!(apply_payment(&invoice, &exact).is_paid);

    let over = InvoicePayment {
        id: invoice.id.clone(),
        amount_paid: 35.0,
    };
    let settled = apply_payment(&invoice, &over);
    assert!(!settled.is_paid);
    assert_eq!(settled.amount_paid, 35.0);

    let partial = InvoicePayment {
        id: invoice.id.clone(),
        amount_paid: 10.0,
    };
    assert!(!apply_payment(&invoice, &partial).is_paid);
}

#[tokio::test]
async fn session_probe_maps_unauthorized_to_anonymous() {
    let anonymous = ServerState::default();
    let client = client_for(&anonymous).await;
    assert_eq!(client.current_user().await.expect("probe"), None);

    let signed_in = ServerState {
        signed_in: true,
        ..ServerState::default()
    };
    let client = client_for(&signed_in).await;
    let user = client.current_user().await.expect("probe").expect("user");
    assert_eq!(user.username, "octocat");
}

#[tokio::test]
async fn unreachable_server_is_a_network_failure() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let client = HttpBackofficeClient::new(
        &format!("http://{addr}/api"),
        Some(Duration::from_secs(2)),
    )
    .expect("client");
    let err = client
        .get_customer(&CustomerId::from("c-1"))
        .await
        .expect_err("unreachable");
    assert!(matches!(err, ApiFailure::Network(_)));
}
