use crate::config::Config;
use crate::domain::ports::{OrderNotifier, PaymentNotice};
use crate::error::NotifyError;
use async_trait::async_trait;
use std::time::Duration;

/// Posts terminal payment outcomes to the order subsystem.
///
/// Order status is a downstream projection of payment truth; a failure here
/// is reported to the caller for background retry and nothing more.
pub struct HttpOrderNotifier {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpOrderNotifier {
    pub fn new(config: &Config) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.notifier_timeout_secs))
            .build()
            .map_err(|e| NotifyError(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: format!(
                "{}/orders/payment-outcome",
                config.orders_base_url.trim_end_matches('/')
            ),
        })
    }
}

#[async_trait]
impl OrderNotifier for HttpOrderNotifier {
    async fn notify(&self, notice: &PaymentNotice) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(notice)
            .send()
            .await
            .map_err(|e| NotifyError(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(NotifyError(format!(
                "order subsystem answered {}",
                response.status()
            )))
        }
    }
}
