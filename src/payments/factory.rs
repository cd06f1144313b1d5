use crate::payments::error::{PaymentError, PaymentResult};
use crate::payments::provider::PaymentGateway;
use crate::payments::providers::{
    CinetpayConfig, CinetpayGateway, FlexpayConfig, FlexpayGateway, WonyapayConfig,
    WonyapayGateway,
};
use crate::payments::types::ProviderName;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::info;

/// Per-provider configuration handed to the factory at startup. Providers
/// absent here are disabled and cannot be resolved.
#[derive(Default)]
pub struct FactoryConfig {
    pub flexpay: Option<FlexpayConfig>,
    pub cinetpay: Option<CinetpayConfig>,
    pub wonyapay: Option<WonyapayConfig>,
}

impl FactoryConfig {
    /// Load configuration for every provider named in `PAYMENT_PROVIDERS`
    /// (comma-separated, defaults to all three). A listed provider with
    /// missing credentials fails startup rather than failing at first use.
    pub fn from_env() -> PaymentResult<Self> {
        let enabled = std::env::var("PAYMENT_PROVIDERS")
            .unwrap_or_else(|_| "flexpay,cinetpay,wonyapay".to_string());
        let enabled: HashSet<String> = enabled
            .split(',')
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();

        let mut config = Self::default();
        for name in &enabled {
            match name.parse::<ProviderName>()? {
                ProviderName::Flexpay => config.flexpay = Some(FlexpayConfig::from_env()?),
                ProviderName::Cinetpay => config.cinetpay = Some(CinetpayConfig::from_env()?),
                ProviderName::Wonyapay => config.wonyapay = Some(WonyapayConfig::from_env()?),
            }
        }
        Ok(config)
    }
}

/// Resolves a provider name to a ready-to-use gateway.
///
/// Flexpay and cinetpay adapters are stateless, so each resolve hands out a
/// fresh instance. The wonyapay adapter caches its payout bearer token, so
/// the factory builds it once and every resolve shares that instance.
pub struct GatewayFactory {
    flexpay: Option<FlexpayConfig>,
    cinetpay: Option<CinetpayConfig>,
    wonyapay: Option<Arc<WonyapayGateway>>,
    /// Pre-built gateways that take precedence over configuration. Lets the
    /// composition root (and tests) inject substitutes.
    overrides: HashMap<ProviderName, Arc<dyn PaymentGateway>>,
}

impl GatewayFactory {
    pub fn new(config: FactoryConfig) -> PaymentResult<Self> {
        let wonyapay = config
            .wonyapay
            .map(|c| WonyapayGateway::new(c).map(Arc::new))
            .transpose()?;

        let factory = Self {
            flexpay: config.flexpay,
            cinetpay: config.cinetpay,
            wonyapay,
            overrides: HashMap::new(),
        };
        info!(providers = ?factory.enabled(), "payment gateway factory ready");
        Ok(factory)
    }

    pub fn from_env() -> PaymentResult<Self> {
        Self::new(FactoryConfig::from_env()?)
    }

    /// Factory serving a single injected gateway.
    pub fn with_gateway(name: ProviderName, gateway: Arc<dyn PaymentGateway>) -> Self {
        let mut factory = Self {
            flexpay: None,
            cinetpay: None,
            wonyapay: None,
            overrides: HashMap::new(),
        };
        factory.overrides.insert(name, gateway);
        factory
    }

    pub fn enabled(&self) -> Vec<ProviderName> {
        let mut names = Vec::new();
        for name in [
            ProviderName::Flexpay,
            ProviderName::Cinetpay,
            ProviderName::Wonyapay,
        ] {
            let configured = match name {
                ProviderName::Flexpay => self.flexpay.is_some(),
                ProviderName::Cinetpay => self.cinetpay.is_some(),
                ProviderName::Wonyapay => self.wonyapay.is_some(),
            };
            if configured || self.overrides.contains_key(&name) {
                names.push(name);
            }
        }
        names
    }

    pub fn resolve(&self, name: ProviderName) -> PaymentResult<Arc<dyn PaymentGateway>> {
        if let Some(gateway) = self.overrides.get(&name) {
            return Ok(gateway.clone());
        }
        match name {
            ProviderName::Flexpay => {
                let config = self.flexpay.clone().ok_or_else(|| disabled(name))?;
                Ok(Arc::new(FlexpayGateway::new(config)?))
            }
            ProviderName::Cinetpay => {
                let config = self.cinetpay.clone().ok_or_else(|| disabled(name))?;
                Ok(Arc::new(CinetpayGateway::new(config)?))
            }
            ProviderName::Wonyapay => {
                let gateway = self.wonyapay.as_ref().ok_or_else(|| disabled(name))?;
                Ok(gateway.clone())
            }
        }
    }
}

fn disabled(name: ProviderName) -> PaymentError {
    PaymentError::Configuration {
        message: format!("payment provider {} is not enabled", name),
        field: Some("PAYMENT_PROVIDERS".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flexpay_config() -> FlexpayConfig {
        FlexpayConfig {
            api_token: "ft_test".to_string(),
            merchant: "MOSOLO".to_string(),
            deposit_url: "https://backend.flexpay.cd/api/rest/v1/paymentService".to_string(),
            check_url: "https://backend.flexpay.cd/api/rest/v1/check".to_string(),
            payout_url: "https://backend.flexpay.cd/api/rest/v1/merchantPayOutService"
                .to_string(),
            callback_url: "https://mosolo.example/webhooks/flexpay".to_string(),
            timeout_secs: 5,
        }
    }

    fn wonyapay_config() -> WonyapayConfig {
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
    fn resolving_a_disabled_provider_names_it() {
        let factory = GatewayFactory::new(FactoryConfig {
            flexpay: Some(flexpay_config()),
            ..FactoryConfig::default()
        })
        .unwrap();

        assert!(factory.resolve(ProviderName::Flexpay).is_ok());
        let err = factory.resolve(ProviderName::Cinetpay).unwrap_err();
        match err {
            PaymentError::Configuration { message, .. } => {
                assert!(message.contains("cinetpay"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn wonyapay_resolves_to_the_same_shared_instance() {
        let factory = GatewayFactory::new(FactoryConfig {
            wonyapay: Some(wonyapay_config()),
            ..FactoryConfig::default()
        })
        .unwrap();

        let a = factory.resolve(ProviderName::Wonyapay).unwrap();
        let b = factory.resolve(ProviderName::Wonyapay).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn flexpay_resolves_to_independent_instances() {
        let factory = GatewayFactory::new(FactoryConfig {
            flexpay: Some(flexpay_config()),
            ..FactoryConfig::default()
        })
        .unwrap();

        let a = factory.resolve(ProviderName::Flexpay).unwrap();
        let b = factory.resolve(ProviderName::Flexpay).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn enabled_lists_configured_providers_only() {
        let factory = GatewayFactory::new(FactoryConfig {
            flexpay: Some(flexpay_config()),
            wonyapay: Some(wonyapay_config()),
            ..FactoryConfig::default()
        })
        .unwrap();
        assert_eq!(
            factory.enabled(),
            vec![ProviderName::Flexpay, ProviderName::Wonyapay]
        );
    }
}
