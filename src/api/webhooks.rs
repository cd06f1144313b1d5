//! Provider callback endpoint.
//!
//! Flexpay and wonyapay callbacks carry a final status we trust once the
//! signature checks out. Cinetpay callbacks are only a nudge: the order is
//! settled by calling the provider's check endpoint, never from the callback
//! body itself.

use crate::api::AppState;
use crate::payments::utils::verify_hmac_sha256_hex;
use crate::payments::{ProviderName, TxStatus};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::Value as JsonValue;
use std::str::FromStr;
use tracing::{error, info, warn};

/// Shared secrets for callback signatures, one per provider. A missing
/// secret disables verification for that provider.
#[derive(Debug, Clone, Default)]
pub struct WebhookConfig {
    pub flexpay_secret: Option<String>,
    pub cinetpay_secret: Option<String>,
    pub wonyapay_secret: Option<String>,
}

impl WebhookConfig {
    pub fn from_env() -> Self {
        Self {
            flexpay_secret: std::env::var("FLEXPAY_WEBHOOK_SECRET").ok(),
            cinetpay_secret: std::env::var("CINETPAY_WEBHOOK_SECRET").ok(),
            wonyapay_secret: std::env::var("WONYAPAY_WEBHOOK_SECRET").ok(),
        }
    }

    fn secret_for(&self, provider: &ProviderName) -> Option<&str> {
        match provider {
            ProviderName::Flexpay => self.flexpay_secret.as_deref(),
            ProviderName::Cinetpay => self.cinetpay_secret.as_deref(),
            ProviderName::Wonyapay => self.wonyapay_secret.as_deref(),
        }
    }
}

fn signature_header(provider: &ProviderName) -> &'static str {
    match provider {
        ProviderName::Flexpay => "x-signature",
        ProviderName::Cinetpay => "x-token",
        ProviderName::Wonyapay => "x-signature",
    }
}

/// How to find the order a callback refers to.
#[derive(Debug, PartialEq, Eq)]
enum Lookup {
    ByReference(String),
    ByProviderOrderNumber(String),
}

/// What to do with the order once found.
#[derive(Debug, PartialEq, Eq)]
enum Action {
    Confirm(TxStatus, String),
    Recheck,
}

/// Interpret a callback body. Returns None when the payload misses the
/// fields the provider always sends.
fn parse_webhook(provider: &ProviderName, payload: &JsonValue) -> Option<(Lookup, Action)> {
    match provider {
        ProviderName::Flexpay => {
            let reference = payload.get("reference")?.as_str()?.to_string();
            let code = payload.get("code")?;
            // Flexpay sends code as either a string or a number.
            let code = code
                .as_str()
                .map(|s| s.to_string())
                .or_else(|| code.as_i64().map(|n| n.to_string()))?;
            let status = if code == "0" {
                TxStatus::Paid
            } else {
                TxStatus::Failed
            };
            let message = payload
                .get("message")
                .and_then(|v| v.as_str())
                .unwrap_or("flexpay callback")
                .to_string();
            Some((Lookup::ByReference(reference), Action::Confirm(status, message)))
        }
        ProviderName::Cinetpay => {
            // cpm_trans_id is the reference we handed cinetpay at initiation.
            let reference = payload.get("cpm_trans_id")?.as_str()?.to_string();
            Some((Lookup::ByReference(reference), Action::Recheck))
        }
        ProviderName::Wonyapay => {
            let order_id = payload.get("order_id")?.as_str()?.to_string();
            let status = match payload.get("payment_status")?.as_str()? {
                "paid" => TxStatus::Paid,
                "failed" | "cancelled" => TxStatus::Failed,
                "pending" => TxStatus::Pending,
                _ => TxStatus::Unknown,
            };
            let message = payload
                .get("message")
                .and_then(|v| v.as_str())
                .unwrap_or("wonyapay callback")
                .to_string();
            Some((
                Lookup::ByProviderOrderNumber(order_id),
                Action::Confirm(status, message),
            ))
        }
    }
}

/// POST /webhooks/{provider}
pub async fn handle_webhook(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    headers: axum::http::HeaderMap,
    body: String,
) -> impl IntoResponse {
    info!(provider = %provider, "Received webhook");

    let provider = match ProviderName::from_str(&provider) {
        Ok(p) => p,
        Err(_) => {
            warn!(provider = %provider, "Webhook for unknown provider");
            return (StatusCode::NOT_FOUND, "Unknown provider").into_response();
        }
    };

    if let Some(secret) = state.webhooks.secret_for(&provider) {
        let signature = headers
            .get(signature_header(&provider))
            .and_then(|v| v.to_str().ok());
        let Some(signature) = signature else {
            warn!(provider = %provider, "Missing webhook signature");
            return (StatusCode::UNAUTHORIZED, "Missing signature").into_response();
        };
        if !verify_hmac_sha256_hex(body.as_bytes(), secret, signature) {
            warn!(provider = %provider, "Invalid webhook signature");
            return (StatusCode::UNAUTHORIZED, "Invalid signature").into_response();
        }
    } else {
        warn!(provider = %provider, "No webhook secret configured, skipping verification");
    }

    let payload: JsonValue = match serde_json::from_str(&body) {
        Ok(p) => p,
        Err(e) => {
            error!(provider = %provider, error = %e, "Invalid JSON payload");
            return (StatusCode::BAD_REQUEST, "Invalid JSON").into_response();
        }
    };

    let Some((lookup, action)) = parse_webhook(&provider, &payload) else {
        warn!(provider = %provider, "Webhook payload missing expected fields");
        return (StatusCode::BAD_REQUEST, "Malformed payload").into_response();
    };

    let order = match &lookup {
        Lookup::ByReference(reference) => state.store.find_by_reference(reference).await,
        Lookup::ByProviderOrderNumber(number) => {
            state
                .store
                .find_by_provider_order_number(provider.as_str(), number)
                .await
        }
    };

    let order = match order {
        Ok(Some(order)) => order,
        Ok(None) => {
            // May arrive before the initiation response was persisted; the
            // provider will retry.
            warn!(provider = %provider, lookup = ?lookup, "Webhook for unknown order");
            return (StatusCode::NOT_FOUND, "Unknown order").into_response();
        }
        Err(e) => {
            error!(provider = %provider, error = %e, "Order lookup failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Lookup failed").into_response();
        }
    };

    let result = match action {
        Action::Confirm(status, message) => {
            state
                .service
                .apply_confirmation(order.id, status, Some(message))
                .await
        }
        Action::Recheck => state.service.reconcile(order.id).await,
    };

    match result {
        Ok(order) => {
            info!(provider = %provider, order_id = %order.id, status = %order.status, "Webhook processed");
            (StatusCode::OK, Json(serde_json::json!({"status": "ok"}))).into_response()
        }
        Err(e) => {
            error!(provider = %provider, order_id = %order.id, error = %e, "Webhook processing failed");
            // 5xx makes the provider redeliver; the confirmation paths are
            // idempotent, so the retry is safe.
            (StatusCode::INTERNAL_SERVER_ERROR, "Processing failed").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flexpay_success_callback_confirms_by_reference() {
        let payload = serde_json::json!({
            "code": "0",
            "message": "Transaction reussie",
            "reference": "MSL-1",
            "orderNumber": "ORD-77"
        });
        let (lookup, action) = parse_webhook(&ProviderName::Flexpay, &payload).unwrap();
        assert_eq!(lookup, Lookup::ByReference("MSL-1".to_string()));
        assert_eq!(
            action,
            Action::Confirm(TxStatus::Paid, "Transaction reussie".to_string())
        );
    }

    #[test]
    fn flexpay_numeric_code_is_accepted() {
        let payload = serde_json::json!({ "code": 1, "reference": "MSL-1" });
        let (_, action) = parse_webhook(&ProviderName::Flexpay, &payload).unwrap();
        assert!(matches!(action, Action::Confirm(TxStatus::Failed, _)));
    }

    #[test]
    fn cinetpay_callback_only_triggers_a_recheck() {
        let payload = serde_json::json!({
            "cpm_trans_id": "MSL-2",
            "cpm_site_id": "5871",
            "cpm_trans_status": "ACCEPTED"
        });
        let (lookup, action) = parse_webhook(&ProviderName::Cinetpay, &payload).unwrap();
        assert_eq!(lookup, Lookup::ByReference("MSL-2".to_string()));
        assert_eq!(action, Action::Recheck);
    }

    #[test]
    fn wonyapay_callback_confirms_by_provider_order_number() {
        let payload = serde_json::json!({
            "order_id": "WP-9",
            "payment_status": "cancelled"
        });
        let (lookup, action) = parse_webhook(&ProviderName::Wonyapay, &payload).unwrap();
        assert_eq!(lookup, Lookup::ByProviderOrderNumber("WP-9".to_string()));
        assert!(matches!(action, Action::Confirm(TxStatus::Failed, _)));
    }

    #[test]
    fn missing_fields_are_rejected() {
        assert!(parse_webhook(&ProviderName::Flexpay, &serde_json::json!({})).is_none());
        assert!(parse_webhook(
            &ProviderName::Wonyapay,
            &serde_json::json!({ "order_id": "WP-9" })
        )
        .is_none());
    }
}
