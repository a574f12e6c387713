use super::error::ApiResult;
use super::state::AppState;
use crate::application::reconciliation::{WebhookHeaders, WebhookOutcome};
use crate::application::registration::NewRegistration;
use crate::domain::order::{GatewayKind, OrderRecord};
use crate::domain::ports::RedirectClaims;
use crate::error::Error;
use axum::Json;
use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    success: bool,
    data: SessionData,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionData {
    order_id: String,
    gateway: GatewayKind,
    gateway_order_id: String,
    payment_handle: String,
    amount: Decimal,
}

fn session_response(order: &OrderRecord, gateway_order_id: String, handle: String) -> SessionResponse {
    SessionResponse {
        success: true,
        data: SessionData {
            order_id: order.order_id.clone(),
            gateway: order.gateway,
            gateway_order_id,
            payment_handle: handle,
            amount: order.amount.value(),
        },
    }
}

pub async fn create_order(
    State(state): State<AppState>,
    body: Result<Json<NewRegistration>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SessionResponse>)> {
    let Json(request) = body.map_err(|err| Error::MalformedPayload(err.to_string()))?;
    let (order, session) = state.registration.create_order(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(session_response(
            &order,
            session.gateway_order_id,
            session.payment_handle,
        )),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSessionRequest {
    #[serde(default)]
    gateway: Option<GatewayKind>,
    #[serde(default)]
    amount: Option<Decimal>,
}

/// Manual gateway check with placeholder customer data.
pub async fn create_test_session(
    State(state): State<AppState>,
    body: Result<Json<TestSessionRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SessionResponse>)> {
    let Json(request) = body.map_err(|err| Error::MalformedPayload(err.to_string()))?;
    let gateway = request.gateway.unwrap_or(GatewayKind::Cashfree);
    let (order, session) = state
        .registration
        .create_test_order(gateway, request.amount)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(session_response(
            &order,
            session.gateway_order_id,
            session.payment_handle,
        )),
    ))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    success: bool,
    message: String,
    data: OrderRecord,
}

/// Redirect-driven verification: the payer's browser asserts gateway
/// identifiers plus a signature; the engine does the rest.
pub async fn verify_payment(
    State(state): State<AppState>,
    body: Result<Json<RedirectClaims>, JsonRejection>,
) -> ApiResult<Json<VerifyResponse>> {
    let Json(claims) = body.map_err(|err| Error::MalformedPayload(err.to_string()))?;
    let record = state.engine.reconcile_from_redirect(&claims).await?;
    Ok(Json(VerifyResponse {
        success: true,
        message: "payment verified successfully".to_string(),
        data: record,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AckResponse {
    success: bool,
    message: String,
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

/// Webhook ingestion. The body is taken as raw bytes: signature verification
/// must run over exactly what was received, before any JSON parsing.
pub async fn webhook(
    State(state): State<AppState>,
    Path(gateway): Path<String>,
    headers: HeaderMap,
    raw_body: Bytes,
) -> ApiResult<Json<AckResponse>> {
    let kind = GatewayKind::parse(&gateway)
        .ok_or_else(|| Error::MalformedPayload(format!("unknown gateway: {gateway}")))?;

    let webhook_headers = match kind {
        GatewayKind::Razorpay => WebhookHeaders {
            signature: header_value(&headers, "x-razorpay-signature"),
            timestamp: None,
        },
        GatewayKind::Cashfree => WebhookHeaders {
            signature: header_value(&headers, "x-webhook-signature"),
            timestamp: header_value(&headers, "x-webhook-timestamp"),
        },
    };

    let outcome = state
        .engine
        .reconcile_from_webhook(kind, &raw_body, &webhook_headers)
        .await?;

    let message = match outcome {
        WebhookOutcome::Completed(_) => "payment processed",
        WebhookOutcome::AlreadyCompleted(_) => "payment already processed",
        WebhookOutcome::FailureRecorded(_) => "payment failure recorded",
        WebhookOutcome::Unmatched => "no matching order, event acknowledged",
        WebhookOutcome::Ignored => "event acknowledged",
    };
    Ok(Json(AckResponse {
        success: true,
        message: message.to_string(),
    }))
}
