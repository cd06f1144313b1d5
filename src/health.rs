//! Health endpoints.

use crate::api::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::warn;

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: HealthState,
    pub database: ComponentHealth,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// GET /health — checks the database and reports overall state.
pub async fn health(
    State(state): State<AppState>,
) -> Result<Json<HealthStatus>, (StatusCode, String)> {
    let database = match state.db_pool.as_ref() {
        Some(pool) => match crate::database::health_check(pool).await {
            Ok(()) => ComponentHealth {
                healthy: true,
                error: None,
            },
            Err(e) => {
                warn!(error = %e, "Database health check failed");
                ComponentHealth {
                    healthy: false,
                    error: Some(e.to_string()),
                }
            }
        },
        None => ComponentHealth {
            healthy: false,
            error: Some("database disabled by configuration".to_string()),
        },
    };

    let status = if database.healthy {
        HealthState::Healthy
    } else {
        HealthState::Unhealthy
    };

    if status == HealthState::Unhealthy {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            "Service Unavailable".to_string(),
        ));
    }

    Ok(Json(HealthStatus {
        status,
        database,
        version: env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /health/live — alive as long as the process answers.
pub async fn liveness() -> &'static str {
    "OK"
}
