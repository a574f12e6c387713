//! HTTP surface: webhook/redirect reconciliation endpoints, registration
//! session creation, and the sponsorship intake/review API.

pub mod error;
pub mod registration;
pub mod sponsorship;
pub mod state;

use axum::Router;
use axum::routing::{get, post};
use state::AppState;
use tower_http::trace::TraceLayer;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/registration", post(registration::create_order))
        .route(
            "/api/registration/test-session",
            post(registration::create_test_session),
        )
        .route("/api/registration/verify", post(registration::verify_payment))
        .route(
            "/api/registration/webhook/:gateway",
            post(registration::webhook),
        )
        .route(
            "/api/sponsorship",
            post(sponsorship::submit).get(sponsorship::list),
        )
        .route(
            "/api/sponsorship/:id",
            get(sponsorship::get_by_id)
                .put(sponsorship::update)
                .delete(sponsorship::remove),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}
