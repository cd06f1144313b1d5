use crate::payments::error::{PaymentError, PaymentResult};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::time::Duration;

/// Thin HTTP client shared by the gateway adapters.
///
/// Every call carries an explicit timeout. Non-2xx responses and transport
/// failures become typed errors; the caller decides what to do with them —
/// there is no automatic retry here, a failed deposit must surface as-is so
/// the order can be marked failed or left pending.
#[derive(Debug, Clone)]
pub struct PaymentHttpClient {
    client: Client,
    timeout: Duration,
}

impl PaymentHttpClient {
    pub fn new(timeout: Duration) -> PaymentResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PaymentError::Network {
                message: format!("failed to initialize HTTP client: {}", e),
            })?;

        Ok(Self { client, timeout })
    }

    pub async fn request_json<T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        url: &str,
        bearer_token: Option<&str>,
        body: Option<&JsonValue>,
        additional_headers: &[(&str, &str)],
    ) -> PaymentResult<T> {
        let mut request = self.client.request(method, url).timeout(self.timeout);

        if let Some(token) = bearer_token {
            request = request.bearer_auth(token);
        }
        for (k, v) in additional_headers {
            request = request.header(*k, *v);
        }
        if let Some(payload) = body {
            request = request.json(payload);
        }

        let response = request.send().await.map_err(|e| PaymentError::Network {
            message: format!("provider request failed: {}", e),
        })?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(PaymentError::Http {
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_str::<T>(&text).map_err(|e| PaymentError::Provider {
            provider: "http".to_string(),
            message: format!("invalid provider JSON response: {}", e),
            code: None,
        })
    }
}

/// Number of local subscriber digits in a DRC MSISDN.
pub const LOCAL_DIGITS: usize = 9;

/// Normalize a phone number to the wire format the gateways expect: the last
/// 9 local digits prefixed with the country code, no plus sign.
///
/// `"+243123456789"`, `"0123456789"` and `"123456789"` all normalize to
/// `"243123456789"` for country code `"243"`.
pub fn normalize_msisdn(raw: &str, country_code: &str) -> PaymentResult<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < LOCAL_DIGITS {
        return Err(PaymentError::Validation {
            message: format!(
                "phone number '{}' has fewer than {} digits",
                raw, LOCAL_DIGITS
            ),
            field: Some("phone".to_string()),
        });
    }
    let local = &digits[digits.len() - LOCAL_DIGITS..];
    Ok(format!("{}{}", country_code, local))
}

/// HMAC-SHA256 signature check for inbound webhooks, hex-encoded digest.
pub fn verify_hmac_sha256_hex(payload: &[u8], secret: &str, signature: &str) -> bool {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    type HmacSha256 = Hmac<Sha256>;
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(v) => v,
        Err(_) => return false,
    };
    mac.update(payload);
    let computed = hex::encode(mac.finalize().into_bytes());
    secure_eq(computed.as_bytes(), signature.trim().as_bytes())
}

pub fn secure_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter()
        .zip(b.iter())
        .fold(0_u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}
