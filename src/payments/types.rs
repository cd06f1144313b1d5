use crate::payments::error::PaymentError;
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProviderName {
    Flexpay,
    Cinetpay,
    Wonyapay,
}

impl ProviderName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderName::Flexpay => "flexpay",
            ProviderName::Cinetpay => "cinetpay",
            ProviderName::Wonyapay => "wonyapay",
        }
    }
}

impl std::fmt::Display for ProviderName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProviderName {
    type Err = PaymentError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "flexpay" => Ok(ProviderName::Flexpay),
            "cinetpay" => Ok(ProviderName::Cinetpay),
            "wonyapay" => Ok(ProviderName::Wonyapay),
            _ => Err(PaymentError::Validation {
                message: format!("unsupported provider: {}", value),
                field: Some("provider".to_string()),
            }),
        }
    }
}

/// Payment channel, passed explicitly by the caller instead of being sniffed
/// out of the reference string.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentChannel {
    Mobile,
    Card,
}

impl std::fmt::Display for PaymentChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentChannel::Mobile => write!(f, "mobile"),
            PaymentChannel::Card => write!(f, "card"),
        }
    }
}

/// Normalized transaction outcome. Every raw provider status code maps into
/// exactly one of these through a per-provider lookup; codes the adapter does
/// not recognize become `Unknown`, never a silent success or failure.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TxStatus {
    /// Provider accepted the request; money has not necessarily moved.
    Accepted,
    /// Provider confirmed the payment as settled.
    Paid,
    /// Still in flight on the provider side.
    Pending,
    /// Provider reported a definitive failure.
    Failed,
    /// Unrecognized provider code.
    Unknown,
}

impl TxStatus {
    pub fn is_final(&self) -> bool {
        matches!(self, TxStatus::Paid | TxStatus::Failed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Money {
    pub amount: String,
    pub currency: String,
}

impl Money {
    pub fn validate_positive(&self, field: &str) -> Result<(), PaymentError> {
        let parsed =
            BigDecimal::from_str(&self.amount).map_err(|_| PaymentError::Validation {
                message: format!("invalid decimal amount: {}", self.amount),
                field: Some(field.to_string()),
            })?;
        if parsed <= BigDecimal::from(0) {
            return Err(PaymentError::Validation {
                message: "amount must be greater than zero".to_string(),
                field: Some(field.to_string()),
            });
        }
        if self.currency.trim().is_empty() {
            return Err(PaymentError::Validation {
                message: "currency is required".to_string(),
                field: Some("currency".to_string()),
            });
        }
        Ok(())
    }
}

/// Customer identity block required by card-channel deposits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardCustomer {
    pub name: String,
    pub surname: String,
    pub email: String,
    pub address: String,
    pub city: String,
    pub country: String,
    pub state: String,
    pub zip_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositRequest {
    pub amount: Money,
    pub channel: PaymentChannel,
    /// Subscriber phone, required for the mobile channel.
    pub phone: Option<String>,
    /// Customer identity, required for the card channel.
    pub customer: Option<CardCustomer>,
    /// Caller-assigned reference, unique per attempt.
    pub reference: String,
    pub metadata: Option<JsonValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawRequest {
    pub amount: Money,
    pub phone: String,
    pub reference: String,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckRequest {
    /// Provider-assigned identifier persisted after a successful deposit.
    pub order_number: Option<String>,
    /// Caller-assigned reference, used where the provider checks by it.
    pub reference: Option<String>,
    /// Currency of the order being checked, for providers with per-currency
    /// merchant identifiers.
    pub currency: String,
}

impl CheckRequest {
    pub fn identifier(&self) -> Result<&str, PaymentError> {
        self.order_number
            .as_deref()
            .or(self.reference.as_deref())
            .filter(|v| !v.trim().is_empty())
            .ok_or(PaymentError::Validation {
                message: "order_number or reference is required".to_string(),
                field: Some("order_number".to_string()),
            })
    }
}

/// Uniform envelope returned by every gateway operation.
///
/// `data` stays provider-specific; callers pattern-match on the provider name
/// to interpret it. `status` is the normalized outcome the reconciliation
/// layer keys off.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayResult {
    pub success: bool,
    pub message: String,
    pub status: TxStatus,
    pub data: Option<JsonValue>,
}

impl PayResult {
    pub fn accepted(message: impl Into<String>, data: Option<JsonValue>) -> Self {
        Self {
            success: true,
            message: message.into(),
            status: TxStatus::Accepted,
            data,
        }
    }

    pub fn rejected(
        message: impl Into<String>,
        status: TxStatus,
        data: Option<JsonValue>,
    ) -> Self {
        Self {
            success: false,
            message: message.into(),
            status,
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deposit_request_serializes_to_json() {
        let request = DepositRequest {
            amount: Money {
                amount: "45.50".to_string(),
                currency: "USD".to_string(),
            },
            channel: PaymentChannel::Mobile,
            phone: Some("+243123456789".to_string()),
            customer: None,
            reference: "TXN-12345".to_string(),
            metadata: None,
        };
        let json = serde_json::to_value(&request).expect("serialization should succeed");
        assert_eq!(json["amount"]["currency"], "USD");
        assert_eq!(json["channel"], "mobile");
        assert_eq!(json["reference"], "TXN-12345");
    }

    #[test]
    fn money_rejects_non_positive_amounts() {
        let zero = Money {
            amount: "0".to_string(),
            currency: "CDF".to_string(),
        };
        assert!(zero.validate_positive("amount").is_err());

        let garbage = Money {
            amount: "abc".to_string(),
            currency: "CDF".to_string(),
        };
        assert!(garbage.validate_positive("amount").is_err());

        let fine = Money {
            amount: "1500.00".to_string(),
            currency: "CDF".to_string(),
        };
        assert!(fine.validate_positive("amount").is_ok());
    }

    #[test]
    fn provider_name_round_trips() {
        for name in ["flexpay", "cinetpay", "wonyapay"] {
            let parsed: ProviderName = name.parse().expect("known provider should parse");
            assert_eq!(parsed.as_str(), name);
        }
        assert!("paypal".parse::<ProviderName>().is_err());
    }

    #[test]
    fn check_request_requires_an_identifier() {
        let empty = CheckRequest {
            order_number: None,
            reference: Some("  ".to_string()),
            currency: "USD".to_string(),
        };
        assert!(empty.identifier().is_err());

        let by_number = CheckRequest {
            order_number: Some("ORD-9".to_string()),
            reference: None,
            currency: "USD".to_string(),
        };
        assert_eq!(by_number.identifier().unwrap(), "ORD-9");
    }
}
