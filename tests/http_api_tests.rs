mod common;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use common::{MockGateway, RecordingNotifier, order};
use confpay::application::intake::IntakeService;
use confpay::application::reconciliation::ReconciliationEngine;
use confpay::application::registration::RegistrationService;
use confpay::domain::order::GatewayKind;
use confpay::domain::ports::{Gateways, OrderStore};
use confpay::infrastructure::in_memory::{InMemoryOrderStore, InMemorySponsorshipStore};
use confpay::interfaces::http::build_router;
use confpay::interfaces::http::state::AppState;
use rust_decimal_macros::dec;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

struct TestApp {
    app: Router,
    orders: Arc<InMemoryOrderStore>,
    gateway: Arc<MockGateway>,
    notifier: Arc<RecordingNotifier>,
}

fn test_app() -> TestApp {
    let orders = Arc::new(InMemoryOrderStore::new());
    let sponsorships = Arc::new(InMemorySponsorshipStore::new());
    let gateway = Arc::new(MockGateway::new(GatewayKind::Razorpay));
    let notifier = Arc::new(RecordingNotifier::new());

    let mut gateways = Gateways::new();
    gateways.register(gateway.clone());

    let state = AppState::new(
        ReconciliationEngine::new(orders.clone(), gateways.clone(), notifier.clone()),
        RegistrationService::new(orders.clone(), gateways),
        IntakeService::new(sponsorships, notifier.clone()),
    );
    TestApp {
        app: build_router(state),
        orders,
        gateway,
        notifier,
    }
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn signed_webhook_request(uri: &str, body: Value) -> Request<Body> {
    let bytes = body.to_string();
    let signature = MockGateway::webhook_signature(bytes.as_bytes());
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-razorpay-signature", signature)
        .body(Body::from(bytes))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn sponsorship_payload(email: &str) -> Value {
    json!({
        "sponsorshipType": "Gold",
        "sponsorshipPrice": "250000",
        "sponsorshipCategory": "Standard",
        "companyName": "Acme Pharma",
        "contactPerson": "Jordan Lee",
        "email": email,
        "phone": "9876543210",
        "address": "1 Industrial Estate",
        "city": "Bhubaneswar",
        "state": "Odisha",
        "country": "India",
        "agreedToTerms": true,
    })
}

#[tokio::test]
async fn healthz_responds() {
    let t = test_app();
    let response = t
        .app
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn registration_creates_an_order_and_session() {
    let t = test_app();
    let response = t
        .app
        .oneshot(post_json(
            "/api/registration",
            json!({
                "gateway": "razorpay",
                "amount": 500,
                "customerName": "Asha Patel",
                "customerEmail": "asha@example.com",
                "customerPhone": "9876543210",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    let order_id = body["data"]["orderId"].as_str().unwrap();
    assert!(order_id.starts_with("REG-"));
    assert_eq!(
        body["data"]["gatewayOrderId"].as_str().unwrap(),
        format!("mock_{order_id}")
    );

    let stored = t.orders.get(order_id).await.unwrap().unwrap();
    assert_eq!(
        stored.gateway_order_id.as_deref(),
        Some(format!("mock_{order_id}").as_str())
    );
}

#[tokio::test]
async fn registration_with_bad_customer_data_is_a_field_level_400() {
    let t = test_app();
    let response = t
        .app
        .oneshot(post_json(
            "/api/registration",
            json!({
                "gateway": "razorpay",
                "amount": 500,
                "customerEmail": "not-an-email",
                "customerPhone": "12",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["success"], json!(false));
    assert!(body["errors"]["customerName"].is_array());
    assert!(body["errors"]["customerEmail"].is_array());
}

#[tokio::test]
async fn verify_endpoint_rejects_missing_fields() {
    let t = test_app();
    let response = t
        .app
        .oneshot(post_json(
            "/api/registration/verify",
            json!({"orderId": "REG-1"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn verify_endpoint_returns_404_for_unknown_orders() {
    let t = test_app();
    let response = t
        .app
        .oneshot(post_json(
            "/api/registration/verify",
            json!({
                "orderId": "REG-missing",
                "gateway": "razorpay",
                "gatewayOrderId": "order_g1",
                "gatewayPaymentId": "pay_1",
                "signature": MockGateway::redirect_signature("order_g1", "pay_1"),
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn verify_endpoint_completes_a_paid_order() {
    let t = test_app();
    t.orders
        .insert(order("REG-1", GatewayKind::Razorpay, dec!(500)))
        .await
        .unwrap();
    t.gateway.set_payment("pay_1", true, dec!(500));

    let response = t
        .app
        .oneshot(post_json(
            "/api/registration/verify",
            json!({
                "orderId": "REG-1",
                "gateway": "razorpay",
                "gatewayOrderId": "order_g1",
                "gatewayPaymentId": "pay_1",
                "signature": MockGateway::redirect_signature("order_g1", "pay_1"),
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["status"], json!("Completed"));
    assert_eq!(t.notifier.completions(), 1);
}

#[tokio::test]
async fn webhook_with_bad_signature_is_a_4xx() {
    let t = test_app();
    let body = json!({"event": "captured", "order_id": "REG-1"});
    let request = Request::builder()
        .method("POST")
        .uri("/api/registration/webhook/razorpay")
        .header("content-type", "application/json")
        .header("x-razorpay-signature", "forged")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = t.app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unmatched_webhook_is_acknowledged_with_200() {
    let t = test_app();
    let response = t
        .app
        .oneshot(signed_webhook_request(
            "/api/registration/webhook/razorpay",
            json!({
                "event": "captured",
                "order_id": "REG-unknown",
                "payment_id": "pay_1",
                "amount": 500,
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(t.orders.get("REG-unknown").await.unwrap().is_none());
}

#[tokio::test]
async fn webhook_completes_a_known_order() {
    let t = test_app();
    t.orders
        .insert(order("REG-1", GatewayKind::Razorpay, dec!(500)))
        .await
        .unwrap();

    let response = t
        .app
        .oneshot(signed_webhook_request(
            "/api/registration/webhook/razorpay",
            json!({
                "event": "captured",
                "order_id": "REG-1",
                "payment_id": "pay_1",
                "amount": 500,
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(t.notifier.completions(), 1);
}

#[tokio::test]
async fn unknown_gateway_path_segment_is_a_400() {
    let t = test_app();
    let response = t
        .app
        .oneshot(post_json(
            "/api/registration/webhook/stripe",
            json!({"event": "captured"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn sponsorship_submit_then_conflict_then_listing() {
    let t = test_app();

    let response = t
        .app
        .clone()
        .oneshot(post_json("/api/sponsorship", sponsorship_payload("a@b.example")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    let id = body["sponsorshipId"].as_str().unwrap().to_string();
    // The confirmation payload is redacted, not the whole record.
    assert!(body["data"]["address"].is_null());

    let response = t
        .app
        .clone()
        .oneshot(post_json("/api/sponsorship", sponsorship_payload("a@b.example")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let conflict = body_json(response).await;
    assert_eq!(conflict["sponsorshipId"].as_str().unwrap(), id);

    let response = t
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/sponsorship?status=Pending&email=a@b.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let listing = body_json(response).await;
    assert_eq!(listing["pagination"]["totalCount"], json!(1));
    assert_eq!(listing["data"][0]["id"].as_str().unwrap(), id);
}

#[tokio::test]
async fn sponsorship_validation_failure_maps_fields() {
    let t = test_app();
    let response = t
        .app
        .oneshot(post_json("/api/sponsorship", json!({"email": "nope"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["errors"]["companyName"].is_array());
    assert!(body["errors"]["email"].is_array());
}

#[tokio::test]
async fn sponsorship_update_ignores_non_whitelisted_fields() {
    let t = test_app();
    let response = t
        .app
        .clone()
        .oneshot(post_json("/api/sponsorship", sponsorship_payload("a@b.example")))
        .await
        .unwrap();
    let id = body_json(response).await["sponsorshipId"]
        .as_str()
        .unwrap()
        .to_string();

    let response = t
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(format!("/api/sponsorship/{id}"))
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({
                        "status": "Under Review",
                        "notes": "call back next week",
                        // Not reviewer-editable; silently dropped.
                        "email": "hijack@example.com",
                        "companyName": "Hijacked Inc",
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["status"], json!("Under Review"));
    assert_eq!(body["data"]["email"], json!("a@b.example"));
    assert_eq!(body["data"]["companyName"], json!("Acme Pharma"));
}

#[tokio::test]
async fn sponsorship_delete_then_404() {
    let t = test_app();
    let response = t
        .app
        .clone()
        .oneshot(post_json("/api/sponsorship", sponsorship_payload("a@b.example")))
        .await
        .unwrap();
    let id = body_json(response).await["sponsorshipId"]
        .as_str()
        .unwrap()
        .to_string();

    let delete = |method: &str| {
        Request::builder()
            .method(method)
            .uri(format!("/api/sponsorship/{id}"))
            .body(Body::empty())
            .unwrap()
    };

    let response = t.app.clone().oneshot(delete("DELETE")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = t.app.clone().oneshot(delete("GET")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = t.app.clone().oneshot(delete("DELETE")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
