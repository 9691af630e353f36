use std::env;

/// Runtime configuration for external collaborators.
///
/// Every value can be overridden through a `PAYFLOW_*` environment variable;
/// defaults point at local development endpoints.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the hosted-checkout gateway API.
    pub gateway_base_url: String,
    /// Merchant identity registered with the gateway.
    pub gateway_merchant_id: String,
    /// Shared secret used to authenticate gateway API calls.
    pub gateway_api_password: String,
    /// ISO currency code used for all payments.
    pub currency: String,
    /// Base URL the gateway redirects browsers back to.
    pub callback_base_url: String,
    /// Base URL of the order subsystem receiving outcome notifications.
    pub orders_base_url: String,
    /// Timeout for each gateway API call, in seconds.
    pub gateway_timeout_secs: u64,
    /// Timeout for each order notification call, in seconds.
    pub notifier_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gateway_base_url: "http://127.0.0.1:9790".to_string(),
            gateway_merchant_id: "TESTMERCHANT".to_string(),
            gateway_api_password: String::new(),
            currency: "USD".to_string(),
            callback_base_url: "http://127.0.0.1:8080".to_string(),
            orders_base_url: "http://127.0.0.1:9791".to_string(),
            gateway_timeout_secs: 15,
            notifier_timeout_secs: 5,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            gateway_base_url: env::var("PAYFLOW_GATEWAY_URL").unwrap_or(defaults.gateway_base_url),
            gateway_merchant_id: env::var("PAYFLOW_GATEWAY_MERCHANT_ID")
                .unwrap_or(defaults.gateway_merchant_id),
            gateway_api_password: env::var("PAYFLOW_GATEWAY_API_PASSWORD")
                .unwrap_or(defaults.gateway_api_password),
            currency: env::var("PAYFLOW_CURRENCY").unwrap_or(defaults.currency),
            callback_base_url: env::var("PAYFLOW_CALLBACK_BASE_URL")
                .unwrap_or(defaults.callback_base_url),
            orders_base_url: env::var("PAYFLOW_ORDERS_BASE_URL")
                .unwrap_or(defaults.orders_base_url),
            gateway_timeout_secs: env::var("PAYFLOW_GATEWAY_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.gateway_timeout_secs),
            notifier_timeout_secs: env::var("PAYFLOW_NOTIFIER_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.notifier_timeout_secs),
        }
    }
}
