use thiserror::Error;

pub type PaymentResult<T> = Result<T, PaymentError>;

/// Errors raised by the payment gateway layer.
///
/// Business failures reported by a provider (insufficient funds, declined
/// payment, unknown transaction) are NOT errors: they come back as
/// `PayResult { success: false, .. }`. Everything here is an infrastructure
/// fault the caller must treat as a hard failure.
#[derive(Debug, Clone, Error)]
pub enum PaymentError {
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        field: Option<String>,
    },

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Provider returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Authentication with {provider} failed: {message}")]
    Authentication { provider: String, message: String },

    #[error("{provider} does not support {operation}")]
    UnsupportedOperation { provider: String, operation: String },

    #[error("Provider error: provider={provider}, message={message}")]
    Provider {
        provider: String,
        message: String,
        code: Option<String>,
    },
}

impl PaymentError {
    pub fn is_retryable(&self) -> bool {
        match self {
            PaymentError::Configuration { .. } => false,
            PaymentError::Validation { .. } => false,
            PaymentError::Network { .. } => true,
            PaymentError::Http { status, .. } => *status >= 500,
            PaymentError::Authentication { .. } => false,
            PaymentError::UnsupportedOperation { .. } => false,
            PaymentError::Provider { .. } => false,
        }
    }

    pub fn http_status_code(&self) -> u16 {
        match self {
            PaymentError::Configuration { .. } => 500,
            PaymentError::Validation { .. } => 400,
            PaymentError::Network { .. } => 503,
            PaymentError::Http { .. } => 502,
            PaymentError::Authentication { .. } => 502,
            PaymentError::UnsupportedOperation { .. } => 400,
            PaymentError::Provider { .. } => 502,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            PaymentError::Configuration { .. } => "Payment provider is misconfigured".to_string(),
            PaymentError::Validation { message, .. } => message.clone(),
            PaymentError::Network { .. } => {
                "Payment provider is temporarily unavailable".to_string()
            }
            PaymentError::Http { .. } => {
                "Payment provider returned an unexpected response".to_string()
            }
            PaymentError::Authentication { .. } => {
                "Could not authenticate with the payment provider".to_string()
            }
            PaymentError::UnsupportedOperation {
                provider,
                operation,
            } => {
                format!("{} does not support {}", provider, operation)
            }
            PaymentError::Provider { .. } => "Payment provider returned an error".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_are_retryable() {
        assert!(PaymentError::Network {
            message: "timeout".to_string()
        }
        .is_retryable());
        assert!(PaymentError::Http {
            status: 503,
            body: String::new()
        }
        .is_retryable());
        assert!(!PaymentError::Http {
            status: 404,
            body: String::new()
        }
        .is_retryable());
    }

    #[test]
    fn configuration_errors_are_terminal() {
        let err = PaymentError::Configuration {
            message: "FLEXPAY_API_TOKEN is required".to_string(),
            field: Some("FLEXPAY_API_TOKEN".to_string()),
        };
        assert!(!err.is_retryable());
        assert_eq!(err.http_status_code(), 500);
    }

    #[test]
    fn http_status_mapping_is_correct() {
        assert_eq!(
            PaymentError::Validation {
                message: "bad".to_string(),
                field: None
            }
            .http_status_code(),
            400
        );
        assert_eq!(
            PaymentError::Authentication {
                provider: "wonyapay".to_string(),
                message: "rejected".to_string()
            }
            .http_status_code(),
            502
        );
    }
}
