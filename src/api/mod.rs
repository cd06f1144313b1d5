pub mod payments;
pub mod webhooks;

use crate::database::OrderStore;
use crate::middleware::{request_logging_middleware, UuidRequestId};
use crate::services::ReconciliationService;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use webhooks::WebhookConfig;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ReconciliationService>,
    pub store: Arc<dyn OrderStore>,
    pub webhooks: Arc<WebhookConfig>,
    pub db_pool: Option<sqlx::PgPool>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(crate::health::health))
        .route("/health/live", get(crate::health::liveness))
        .route("/api/payments/deposit", post(payments::deposit))
        .route("/api/payments/withdraw", post(payments::withdraw))
        .route("/api/orders/{id}", get(payments::get_order))
        .route("/api/orders/{id}/reconcile", post(payments::reconcile_order))
        .route("/webhooks/{provider}", post(webhooks::handle_webhook))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
                .layer(axum::middleware::from_fn(request_logging_middleware))
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
}

async fn root() -> &'static str {
    "Mosolo payments API"
}
