use crate::payments::error::{PaymentError, PaymentResult};
use crate::payments::provider::PaymentGateway;
use crate::payments::token::{BearerToken, TokenCache, DEFAULT_TTL_SECS};
use crate::payments::types::{
    CheckRequest, DepositRequest, PayResult, PaymentChannel, ProviderName, TxStatus,
    WithdrawRequest,
};
use crate::payments::utils::{normalize_msisdn, PaymentHttpClient};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::info;

const COUNTRY_CODE: &str = "243";

#[derive(Debug, Clone)]
pub struct WonyapayConfig {
    pub base_url: String,
    /// Static key for deposits and status checks.
    pub api_key: String,
    /// Credentials exchanged for a short-lived payout token.
    pub username: String,
    pub password: String,
    /// Merchant cash-desk identifier.
    pub caisse_id: String,
    pub callback_url: String,
    pub timeout_secs: u64,
}

impl WonyapayConfig {
    pub fn from_env() -> PaymentResult<Self> {
        let config = Self {
            base_url: std::env::var("WONYAPAY_BASE_URL")
                .unwrap_or_else(|_| "https://api.wonyapay.com".to_string()),
            api_key: std::env::var("WONYAPAY_API_KEY").unwrap_or_default(),
            username: std::env::var("WONYAPAY_USERNAME").unwrap_or_default(),
            password: std::env::var("WONYAPAY_PASSWORD").unwrap_or_default(),
            caisse_id: std::env::var("WONYAPAY_CAISSE_ID").unwrap_or_default(),
            callback_url: std::env::var("WONYAPAY_CALLBACK_URL").unwrap_or_default(),
            timeout_secs: std::env::var("WONYAPAY_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(30),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> PaymentResult<()> {
        let required = [
            ("WONYAPAY_BASE_URL", &self.base_url),
            ("WONYAPAY_API_KEY", &self.api_key),
            ("WONYAPAY_USERNAME", &self.username),
            ("WONYAPAY_PASSWORD", &self.password),
            ("WONYAPAY_CAISSE_ID", &self.caisse_id),
            ("WONYAPAY_CALLBACK_URL", &self.callback_url),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(PaymentError::Configuration {
                    message: format!("{} is required", name),
                    field: Some(name.to_string()),
                });
            }
        }
        Ok(())
    }
}

/// WonyaPay mobile-money gateway. Deposits and checks use the static API
/// key; payouts require a bearer token obtained from username/password. The
/// token cache re-authenticates transparently when less than 30 seconds
/// remain before expiry — callers never see the token.
///
/// One instance is shared process-wide (see `GatewayFactory`) so the cached
/// token survives across calls.
#[derive(Debug)]
pub struct WonyapayGateway {
    config: WonyapayConfig,
    http: PaymentHttpClient,
    tokens: TokenCache,
}

impl WonyapayGateway {
    pub fn new(config: WonyapayConfig) -> PaymentResult<Self> {
        config.validate()?;
        let http = PaymentHttpClient::new(Duration::from_secs(config.timeout_secs))?;
        Ok(Self {
            config,
            http,
            tokens: TokenCache::new(),
        })
    }

    pub fn from_env() -> PaymentResult<Self> {
        Self::new(WonyapayConfig::from_env()?)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn authenticate(&self) -> PaymentResult<BearerToken> {
        let payload = serde_json::json!({
            "username": self.config.username,
            "password": self.config.password,
        });

        let raw: WonyapayAuthResponse = self
            .http
            .request_json(
                reqwest::Method::POST,
                &self.endpoint("/auth/token"),
                None,
                Some(&payload),
                &[("Content-Type", "application/json")],
            )
            .await
            .map_err(|e| match e {
                PaymentError::Http { status, body } => PaymentError::Authentication {
                    provider: "wonyapay".to_string(),
                    message: format!("token request rejected with HTTP {}: {}", status, body),
                },
                other => other,
            })?;

        let token = raw.token.filter(|t| !t.is_empty()).ok_or_else(|| {
            PaymentError::Authentication {
                provider: "wonyapay".to_string(),
                message: raw
                    .message
                    .unwrap_or_else(|| "token response carries no token".to_string()),
            }
        })?;

        info!("wonyapay payout token acquired");
        Ok(BearerToken::from_ttl(
            token,
            raw.expires_in.unwrap_or(DEFAULT_TTL_SECS),
        ))
    }
}

#[async_trait]
impl PaymentGateway for WonyapayGateway {
    async fn deposit(&self, request: DepositRequest) -> PaymentResult<PayResult> {
        request.amount.validate_positive("amount")?;
        if request.channel != PaymentChannel::Mobile {
            return Err(PaymentError::Validation {
                message: "wonyapay supports the mobile money channel only".to_string(),
                field: Some("channel".to_string()),
            });
        }
        let phone = request.phone.as_deref().ok_or(PaymentError::Validation {
            message: "phone is required for a wonyapay deposit".to_string(),
            field: Some("phone".to_string()),
        })?;
        let phone = normalize_msisdn(phone, COUNTRY_CODE)?;

        let payload = serde_json::json!({
            "caisse_id": self.config.caisse_id,
            "amount": request.amount.amount,
            "currency": request.amount.currency,
            "phone": phone,
            "reference": request.reference,
            "callback_url": self.config.callback_url,
        });

        let raw: WonyapayEnvelope = self
            .http
            .request_json(
                reqwest::Method::POST,
                &self.endpoint("/api/v1/payments"),
                None,
                Some(&payload),
                &[
                    ("Content-Type", "application/json"),
                    ("X-Api-Key", &self.config.api_key),
                ],
            )
            .await?;

        info!(
            reference = %request.reference,
            status = %raw.status,
            "wonyapay deposit initiated"
        );

        Ok(map_movement_response(raw))
    }

    async fn check(&self, request: CheckRequest) -> PaymentResult<PayResult> {
        let order_id = request.identifier()?;
        let url = self.endpoint(&format!("/api/v1/payments/{}", order_id));

        let raw: WonyapayEnvelope = self
            .http
            .request_json(
                reqwest::Method::GET,
                &url,
                None,
                None,
                &[("X-Api-Key", &self.config.api_key)],
            )
            .await?;

        Ok(map_check_response(raw))
    }

    async fn withdraw(&self, request: WithdrawRequest) -> PaymentResult<PayResult> {
        request.amount.validate_positive("amount")?;
        let phone = normalize_msisdn(&request.phone, COUNTRY_CODE)?;

        // Lazy token acquisition with the 30s staleness margin; concurrent
        // payouts share one refresh.
        let bearer = self.tokens.bearer(|| self.authenticate()).await?;

        let payload = serde_json::json!({
            "caisse_id": self.config.caisse_id,
            "amount": request.amount.amount,
            "currency": request.amount.currency,
            "phone": phone,
            "reference": request.reference,
            "motif": request.reason,
        });

        let raw: WonyapayEnvelope = self
            .http
            .request_json(
                reqwest::Method::POST,
                &self.endpoint("/api/v1/payouts"),
                Some(bearer.as_str()),
                Some(&payload),
                &[("Content-Type", "application/json")],
            )
            .await?;

        info!(
            reference = %request.reference,
            status = %raw.status,
            "wonyapay payout initiated"
        );

        Ok(map_movement_response(raw))
    }

    fn name(&self) -> ProviderName {
        ProviderName::Wonyapay
    }
}

#[derive(Debug, Deserialize)]
struct WonyapayAuthResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WonyapayEnvelope {
    /// Literal string flag: "success", "pending" or "failed".
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

/// Deposit/payout initiation: the literal flag "success" (or "pending")
/// means the request was taken; "failed" is a reported failure.
fn map_movement_response(raw: WonyapayEnvelope) -> PayResult {
    let message = raw
        .message
        .unwrap_or_else(|| "no message from wonyapay".to_string());
    match raw.status.as_str() {
        "success" => PayResult::accepted(message, raw.data),
        "pending" => PayResult {
            success: true,
            message,
            status: TxStatus::Pending,
            data: raw.data,
        },
        "failed" => PayResult::rejected(message, TxStatus::Failed, raw.data),
        other => PayResult::rejected(
            format!("unrecognized wonyapay status {}: {}", other, message),
            TxStatus::Unknown,
            raw.data,
        ),
    }
}

/// Status check: the settled state lives in `data.payment_status`.
fn map_check_response(raw: WonyapayEnvelope) -> PayResult {
    let message = raw
        .message
        .unwrap_or_else(|| "no message from wonyapay".to_string());

    if raw.status == "failed" {
        // Lookup rejected, e.g. unknown order id.
        return PayResult::rejected(message, TxStatus::Unknown, raw.data);
    }

    let payment_status = raw
        .data
        .as_ref()
        .and_then(|d| d.get("payment_status"))
        .and_then(|v| v.as_str())
        .unwrap_or("");

    match payment_status {
        "paid" => PayResult {
            success: true,
            message,
            status: TxStatus::Paid,
            data: raw.data,
        },
        "pending" => PayResult {
            success: true,
            message,
            status: TxStatus::Pending,
            data: raw.data,
        },
        "failed" | "cancelled" => PayResult::rejected(message, TxStatus::Failed, raw.data),
        other => PayResult::rejected(
            format!("unrecognized wonyapay payment_status {}", other),
            TxStatus::Unknown,
            raw.data,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::types::Money;

    fn config() -> WonyapayConfig {
        WonyapayConfig {
            base_url: "https://api.wonyapay.com".to_string(),
            api_key: "wk_test".to_string(),
            username: "mosolo".to_string(),
            password: "secret".to_string(),
            caisse_id: "CAISSE-7".to_string(),
            callback_url: "https://mosolo.example/webhooks/wonyapay".to_string(),
            timeout_secs: 5,
        }
    }

    #[test]
    fn construction_fails_when_any_required_value_is_missing() {
        for blank in [
            |c: &mut WonyapayConfig| c.api_key.clear(),
            |c: &mut WonyapayConfig| c.username.clear(),
            |c: &mut WonyapayConfig| c.password.clear(),
            |c: &mut WonyapayConfig| c.caisse_id.clear(),
            |c: &mut WonyapayConfig| c.callback_url.clear(),
        ] {
            let mut cfg = config();
            blank(&mut cfg);
            assert!(matches!(
                WonyapayGateway::new(cfg),
                Err(PaymentError::Configuration { .. })
            ));
        }
        assert!(WonyapayGateway::new(config()).is_ok());
    }

    #[tokio::test]
    async fn deposit_requires_a_phone_on_the_mobile_channel() {
        let gateway = WonyapayGateway::new(config()).unwrap();
        let result = gateway
            .deposit(DepositRequest {
                amount: Money {
                    amount: "10".to_string(),
                    currency: "USD".to_string(),
                },
                channel: PaymentChannel::Mobile,
                phone: None,
                customer: None,
                reference: "TXN-1".to_string(),
                metadata: None,
            })
            .await;
        assert!(matches!(result, Err(PaymentError::Validation { .. })));
    }

    #[test]
    fn movement_success_flag_is_accepted() {
        let raw: WonyapayEnvelope = serde_json::from_value(serde_json::json!({
            "status": "success",
            "message": "payment initiated",
            "data": { "order_id": "WP-551" }
        }))
        .unwrap();
        let result = map_movement_response(raw);
        assert!(result.success);
        assert_eq!(result.status, TxStatus::Accepted);
        assert_eq!(result.data.unwrap()["order_id"], "WP-551");
    }

    #[test]
    fn movement_failed_flag_is_a_business_failure() {
        let raw: WonyapayEnvelope = serde_json::from_value(serde_json::json!({
            "status": "failed",
            "message": "insufficient subscriber balance"
        }))
        .unwrap();
        let result = map_movement_response(raw);
        assert!(!result.success);
        assert_eq!(result.status, TxStatus::Failed);
    }

    #[test]
    fn unrecognized_flag_maps_to_unknown() {
        let raw: WonyapayEnvelope = serde_json::from_value(serde_json::json!({
            "status": "processing?"
        }))
        .unwrap();
        assert_eq!(map_movement_response(raw).status, TxStatus::Unknown);
    }

    #[test]
    fn check_maps_payment_status() {
        let paid: WonyapayEnvelope = serde_json::from_value(serde_json::json!({
            "status": "success",
            "data": { "payment_status": "paid", "order_id": "WP-551" }
        }))
        .unwrap();
        let paid = map_check_response(paid);
        assert!(paid.success);
        assert_eq!(paid.status, TxStatus::Paid);

        let pending: WonyapayEnvelope = serde_json::from_value(serde_json::json!({
            "status": "success",
            "data": { "payment_status": "pending" }
        }))
        .unwrap();
        assert_eq!(map_check_response(pending).status, TxStatus::Pending);

        let cancelled: WonyapayEnvelope = serde_json::from_value(serde_json::json!({
            "status": "success",
            "data": { "payment_status": "cancelled" }
        }))
        .unwrap();
        assert_eq!(map_check_response(cancelled).status, TxStatus::Failed);
    }

    #[test]
    fn check_of_unknown_order_stays_unknown() {
        let raw: WonyapayEnvelope = serde_json::from_value(serde_json::json!({
            "status": "failed",
            "message": "order not found"
        }))
        .unwrap();
        let result = map_check_response(raw);
        assert!(!result.success);
        assert_eq!(result.status, TxStatus::Unknown);
    }
}
