use crate::payments::error::{PaymentError, PaymentResult};
use crate::payments::provider::PaymentGateway;
use crate::payments::types::{
    CheckRequest, DepositRequest, PayResult, PaymentChannel, ProviderName, TxStatus,
    WithdrawRequest,
};
use crate::payments::utils::{normalize_msisdn, PaymentHttpClient};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::info;

const COUNTRY_CODE: &str = "243";

#[derive(Debug, Clone)]
pub struct CinetpayConfig {
    pub api_key: String,
    /// Site ids are per-currency merchant identifiers.
    pub site_id_usd: String,
    pub site_id_cdf: String,
    pub base_url: String,
    pub notify_url: String,
    pub return_url: String,
    pub timeout_secs: u64,
}

impl CinetpayConfig {
    pub fn from_env() -> PaymentResult<Self> {
        let config = Self {
            api_key: std::env::var("CINETPAY_API_KEY").unwrap_or_default(),
            site_id_usd: std::env::var("CINETPAY_SITE_ID_USD").unwrap_or_default(),
            site_id_cdf: std::env::var("CINETPAY_SITE_ID_CDF").unwrap_or_default(),
            base_url: std::env::var("CINETPAY_BASE_URL")
                .unwrap_or_else(|_| "https://api-checkout.cinetpay.com/v2".to_string()),
            notify_url: std::env::var("CINETPAY_NOTIFY_URL").unwrap_or_default(),
            return_url: std::env::var("CINETPAY_RETURN_URL").unwrap_or_default(),
            timeout_secs: std::env::var("CINETPAY_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(30),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> PaymentResult<()> {
        let required = [
            ("CINETPAY_API_KEY", &self.api_key),
            ("CINETPAY_SITE_ID_USD", &self.site_id_usd),
            ("CINETPAY_SITE_ID_CDF", &self.site_id_cdf),
            ("CINETPAY_BASE_URL", &self.base_url),
            ("CINETPAY_NOTIFY_URL", &self.notify_url),
            ("CINETPAY_RETURN_URL", &self.return_url),
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

    pub fn site_id_for(&self, currency: &str) -> PaymentResult<&str> {
        match currency.trim().to_uppercase().as_str() {
            "USD" => Ok(&self.site_id_usd),
            "CDF" => Ok(&self.site_id_cdf),
            other => Err(PaymentError::Validation {
                message: format!("cinetpay has no site id for currency {}", other),
                field: Some("currency".to_string()),
            }),
        }
    }
}

/// CinetPay card + mobile-money gateway. The payment channel is an explicit
/// request field and selects the request shape: card deposits carry the full
/// customer identity block, mobile deposits carry phone + amount + currency.
#[derive(Debug)]
pub struct CinetpayGateway {
    config: CinetpayConfig,
    http: PaymentHttpClient,
}

impl CinetpayGateway {
    pub fn new(config: CinetpayConfig) -> PaymentResult<Self> {
        config.validate()?;
        let http = PaymentHttpClient::new(Duration::from_secs(config.timeout_secs))?;
        Ok(Self { config, http })
    }

    pub fn from_env() -> PaymentResult<Self> {
        Self::new(CinetpayConfig::from_env()?)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn deposit_payload(&self, request: &DepositRequest) -> PaymentResult<JsonValue> {
        let site_id = self.config.site_id_for(&request.amount.currency)?;
        let mut payload = serde_json::json!({
            "apikey": self.config.api_key,
            "site_id": site_id,
            "transaction_id": request.reference,
            "amount": request.amount.amount,
            "currency": request.amount.currency,
            "description": "Mosolo order payment",
            "notify_url": self.config.notify_url,
            "return_url": self.config.return_url,
        });

        match request.channel {
            PaymentChannel::Mobile => {
                let phone = request.phone.as_deref().ok_or(PaymentError::Validation {
                    message: "phone is required for a cinetpay mobile deposit".to_string(),
                    field: Some("phone".to_string()),
                })?;
                payload["channels"] = JsonValue::from("MOBILE_MONEY");
                payload["customer_phone_number"] =
                    JsonValue::from(normalize_msisdn(phone, COUNTRY_CODE)?);
            }
            PaymentChannel::Card => {
                let customer = request.customer.as_ref().ok_or(PaymentError::Validation {
                    message: "customer identity is required for a cinetpay card deposit"
                        .to_string(),
                    field: Some("customer".to_string()),
                })?;
                payload["channels"] = JsonValue::from("CREDIT_CARD");
                payload["customer_name"] = JsonValue::from(customer.name.clone());
                payload["customer_surname"] = JsonValue::from(customer.surname.clone());
                payload["customer_email"] = JsonValue::from(customer.email.clone());
                payload["customer_address"] = JsonValue::from(customer.address.clone());
                payload["customer_city"] = JsonValue::from(customer.city.clone());
                payload["customer_country"] = JsonValue::from(customer.country.clone());
                payload["customer_state"] = JsonValue::from(customer.state.clone());
                payload["customer_zip_code"] = JsonValue::from(customer.zip_code.clone());
                if let Some(metadata) = &request.metadata {
                    payload["metadata"] = metadata.clone();
                }
            }
        }

        Ok(payload)
    }

    fn check_payload(&self, request: &CheckRequest) -> PaymentResult<JsonValue> {
        // CinetPay checks by the caller's transaction id, not the payment
        // token it assigns.
        let transaction_id = request
            .reference
            .as_deref()
            .or(request.order_number.as_deref())
            .filter(|v| !v.trim().is_empty())
            .ok_or(PaymentError::Validation {
                message: "reference is required for a cinetpay check".to_string(),
                field: Some("reference".to_string()),
            })?;

        let site_id = self.config.site_id_for(&request.currency)?;
        Ok(serde_json::json!({
            "apikey": self.config.api_key,
            "site_id": site_id,
            "transaction_id": transaction_id,
        }))
    }
}

#[async_trait]
impl PaymentGateway for CinetpayGateway {
    async fn deposit(&self, request: DepositRequest) -> PaymentResult<PayResult> {
        request.amount.validate_positive("amount")?;
        let payload = self.deposit_payload(&request)?;

        let raw: CinetpayEnvelope = self
            .http
            .request_json(
                reqwest::Method::POST,
                &self.endpoint("/payment"),
                None,
                Some(&payload),
                &[("Content-Type", "application/json")],
            )
            .await?;

        info!(
            reference = %request.reference,
            channel = %request.channel,
            code = %raw.code,
            "cinetpay deposit initiated"
        );

        Ok(map_deposit_response(raw))
    }

    async fn check(&self, request: CheckRequest) -> PaymentResult<PayResult> {
        let payload = self.check_payload(&request)?;

        let raw: CinetpayEnvelope = self
            .http
            .request_json(
                reqwest::Method::POST,
                &self.endpoint("/payment/check"),
                None,
                Some(&payload),
                &[("Content-Type", "application/json")],
            )
            .await?;

        Ok(map_check_response(raw))
    }

    async fn withdraw(&self, _request: WithdrawRequest) -> PaymentResult<PayResult> {
        Err(PaymentError::UnsupportedOperation {
            provider: "cinetpay".to_string(),
            operation: "withdraw".to_string(),
        })
    }

    fn name(&self) -> ProviderName {
        ProviderName::Cinetpay
    }
}

#[derive(Debug, Deserialize)]
struct CinetpayEnvelope {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<JsonValue>,
}

/// Deposit initiation: "201" means the payment was created. Known rejection
/// codes map to a failure; everything else is unrecognized.
fn map_deposit_response(raw: CinetpayEnvelope) -> PayResult {
    let message = raw
        .message
        .unwrap_or_else(|| "no message from cinetpay".to_string());
    match raw.code.as_str() {
        "201" => PayResult::accepted(message, raw.data),
        // MINIMUM_REQUIRED_FIELDS, AUTH_NOT_FOUND, amount/currency rejections
        "608" | "609" | "613" | "624" => {
            PayResult::rejected(message, TxStatus::Failed, raw.data)
        }
        other => PayResult::rejected(
            format!("unrecognized cinetpay code {}: {}", other, message),
            TxStatus::Unknown,
            raw.data,
        ),
    }
}

/// Status check: "00" is a settled payment, waiting codes stay pending,
/// explicit failure codes fail, anything else is unrecognized (including the
/// not-found code, which must not complete or fail an order).
fn map_check_response(raw: CinetpayEnvelope) -> PayResult {
    let message = raw
        .message
        .unwrap_or_else(|| "no message from cinetpay".to_string());
    match raw.code.as_str() {
        "00" => PayResult {
            success: true,
            message,
            status: TxStatus::Paid,
            data: raw.data,
        },
        "623" | "662" => PayResult {
            success: true,
            message,
            status: TxStatus::Pending,
            data: raw.data,
        },
        "600" | "627" => PayResult::rejected(message, TxStatus::Failed, raw.data),
        other => PayResult::rejected(
            format!("unrecognized cinetpay code {}: {}", other, message),
            TxStatus::Unknown,
            raw.data,
        ),
    }
}
