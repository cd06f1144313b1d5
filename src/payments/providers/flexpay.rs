use crate::payments::error::{PaymentError, PaymentResult};
use crate::payments::provider::PaymentGateway;
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

/// FlexPay transaction kinds on the shared payment endpoint.
const TYPE_DEPOSIT: u8 = 1;
const TYPE_PAYOUT: u8 = 2;

#[derive(Debug, Clone)]
pub struct FlexpayConfig {
    pub api_token: String,
    pub merchant: String,
    pub deposit_url: String,
    pub check_url: String,
    pub payout_url: String,
    pub callback_url: String,
    pub timeout_secs: u64,
}

impl FlexpayConfig {
    pub fn from_env() -> PaymentResult<Self> {
        let config = Self {
            api_token: std::env::var("FLEXPAY_API_TOKEN").unwrap_or_default(),
            merchant: std::env::var("FLEXPAY_MERCHANT").unwrap_or_default(),
            deposit_url: std::env::var("FLEXPAY_DEPOSIT_URL").unwrap_or_else(|_| {
                "https://backend.flexpay.cd/api/rest/v1/paymentService".to_string()
            }),
            check_url: std::env::var("FLEXPAY_CHECK_URL")
                .unwrap_or_else(|_| "https://backend.flexpay.cd/api/rest/v1/check".to_string()),
            payout_url: std::env::var("FLEXPAY_PAYOUT_URL").unwrap_or_else(|_| {
                "https://backend.flexpay.cd/api/rest/v1/merchantPayOutService".to_string()
            }),
            callback_url: std::env::var("FLEXPAY_CALLBACK_URL").unwrap_or_default(),
            timeout_secs: std::env::var("FLEXPAY_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(30),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> PaymentResult<()> {
        let required = [
            ("FLEXPAY_API_TOKEN", &self.api_token),
            ("FLEXPAY_MERCHANT", &self.merchant),
            ("FLEXPAY_DEPOSIT_URL", &self.deposit_url),
            ("FLEXPAY_CHECK_URL", &self.check_url),
            ("FLEXPAY_PAYOUT_URL", &self.payout_url),
            ("FLEXPAY_CALLBACK_URL", &self.callback_url),
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

/// FlexPay mobile-money gateway (DRC). Static bearer token, no payout auth
/// exchange; deposit, payout and check are three endpoints sharing one
/// status vocabulary: the string "0" means accepted/ok.
#[derive(Debug)]
pub struct FlexpayGateway {
    config: FlexpayConfig,
    http: PaymentHttpClient,
}

impl FlexpayGateway {
    pub fn new(config: FlexpayConfig) -> PaymentResult<Self> {
        config.validate()?;
        let http = PaymentHttpClient::new(Duration::from_secs(config.timeout_secs))?;
        Ok(Self { config, http })
    }

    pub fn from_env() -> PaymentResult<Self> {
        Self::new(FlexpayConfig::from_env()?)
    }

    fn movement_payload(
        &self,
        kind: u8,
        phone: &str,
        reference: &str,
        amount: &str,
        currency: &str,
    ) -> serde_json::Value {
        serde_json::json!({
            "merchant": self.config.merchant,
            "type": kind,
            "phone": phone,
            "reference": reference,
            "amount": amount,
            "currency": currency,
            "callbackUrl": self.config.callback_url,
        })
    }
}

#[async_trait]
impl PaymentGateway for FlexpayGateway {
    async fn deposit(&self, request: DepositRequest) -> PaymentResult<PayResult> {
        request.amount.validate_positive("amount")?;
        if request.channel != PaymentChannel::Mobile {
            return Err(PaymentError::Validation {
                message: "flexpay supports the mobile money channel only".to_string(),
                field: Some("channel".to_string()),
            });
        }
        let phone = request.phone.as_deref().ok_or(PaymentError::Validation {
            message: "phone is required for a flexpay deposit".to_string(),
            field: Some("phone".to_string()),
        })?;
        let phone = normalize_msisdn(phone, COUNTRY_CODE)?;

        let payload = self.movement_payload(
            TYPE_DEPOSIT,
            &phone,
            &request.reference,
            &request.amount.amount,
            &request.amount.currency,
        );

        let raw: FlexpayMovementResponse = self
            .http
            .request_json(
                reqwest::Method::POST,
                &self.config.deposit_url,
                Some(&self.config.api_token),
                Some(&payload),
                &[("Content-Type", "application/json")],
            )
            .await?;

        info!(
            reference = %request.reference,
            code = %raw.code,
            "flexpay deposit initiated"
        );

        Ok(map_movement_response(raw))
    }

    async fn check(&self, request: CheckRequest) -> PaymentResult<PayResult> {
        let order_number = request.identifier()?;
        let url = format!(
            "{}/{}",
            self.config.check_url.trim_end_matches('/'),
            order_number
        );

        let raw: FlexpayCheckResponse = self
            .http
            .request_json(
                reqwest::Method::GET,
                &url,
                Some(&self.config.api_token),
                None,
                &[],
            )
            .await?;

        Ok(map_check_response(raw))
    }

    async fn withdraw(&self, request: WithdrawRequest) -> PaymentResult<PayResult> {
        request.amount.validate_positive("amount")?;
        let phone = normalize_msisdn(&request.phone, COUNTRY_CODE)?;

        let payload = self.movement_payload(
            TYPE_PAYOUT,
            &phone,
            &request.reference,
            &request.amount.amount,
            &request.amount.currency,
        );

        let raw: FlexpayMovementResponse = self
            .http
            .request_json(
                reqwest::Method::POST,
                &self.config.payout_url,
                Some(&self.config.api_token),
                Some(&payload),
                &[("Content-Type", "application/json")],
            )
            .await?;

        info!(
            reference = %request.reference,
            code = %raw.code,
            "flexpay payout initiated"
        );

        Ok(map_movement_response(raw))
    }

    fn name(&self) -> ProviderName {
        ProviderName::Flexpay
    }
}

#[derive(Debug, Deserialize)]
struct FlexpayMovementResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(rename = "orderNumber", default)]
    order_number: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FlexpayCheckResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    transaction: Option<FlexpayTransaction>,
}

#[derive(Debug, Deserialize)]
struct FlexpayTransaction {
    status: String,
    #[serde(default)]
    reference: Option<String>,
    #[serde(rename = "orderNumber", default)]
    order_number: Option<String>,
}

/// Deposit/payout response mapping: "0" is accepted, "1" is a reported
/// failure, anything else is an unrecognized code.
fn map_movement_response(raw: FlexpayMovementResponse) -> PayResult {
    let message = raw
        .message
        .unwrap_or_else(|| "no message from flexpay".to_string());
    let data = raw.order_number.as_ref().map(|n| {
        serde_json::json!({
            "orderNumber": n,
            "code": raw.code,
        })
    });

    match raw.code.as_str() {
        "0" => PayResult::accepted(message, data),
        "1" => PayResult::rejected(message, TxStatus::Failed, data),
        _ => PayResult::rejected(
            format!("unrecognized flexpay code {}: {}", raw.code, message),
            TxStatus::Unknown,
            data,
        ),
    }
}

/// Check response mapping: the outer code says whether the lookup worked; the
/// transaction status is "0" paid, "1" failed, "2" still pending.
fn map_check_response(raw: FlexpayCheckResponse) -> PayResult {
    let message = raw
        .message
        .unwrap_or_else(|| "no message from flexpay".to_string());

    if raw.code != "0" {
        // Lookup itself rejected, e.g. unknown order number. Business
        // outcome, not a transport fault.
        return PayResult::rejected(message, TxStatus::Unknown, None);
    }

    let Some(transaction) = raw.transaction else {
        return PayResult::rejected(
            "flexpay check response carries no transaction".to_string(),
            TxStatus::Unknown,
            None,
        );
    };

    let data = serde_json::json!({
        "status": transaction.status,
        "reference": transaction.reference,
        "orderNumber": transaction.order_number,
    });

    match transaction.status.as_str() {
        "0" => PayResult {
            success: true,
            message,
            status: TxStatus::Paid,
            data: Some(data),
        },
        "1" => PayResult::rejected(message, TxStatus::Failed, Some(data)),
        "2" => PayResult {
            success: true,
            message,
            status: TxStatus::Pending,
            data: Some(data),
        },
        other => PayResult::rejected(
            format!("unrecognized flexpay transaction status {}", other),
            TxStatus::Unknown,
            Some(data),
        ),
    }
}
