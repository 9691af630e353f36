use crate::config::Config;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// The five remote operations of the hosted-checkout protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayOp {
    CreateSession,
    CheckAuthentication,
    SubmitAuthentication,
    Capture,
    Verify,
}

impl GatewayOp {
    pub fn path(&self) -> &'static str {
        match self {
            Self::CreateSession => "session/create",
            Self::CheckAuthentication => "session/check-authentication",
            Self::SubmitAuthentication => "session/authenticate",
            Self::Capture => "session/capture",
            Self::Verify => "session/verify",
        }
    }
}

#[derive(Error, Debug)]
pub enum TransportError {
    /// Timeout, connection refused, interrupted transfer. Retryable.
    #[error("network failure: {0}")]
    Network(String),
    /// The gateway answered with something that is not a protocol reply.
    #[error("malformed gateway reply: {0}")]
    Malformed(String),
}

/// Carries one protocol request to the gateway and returns its raw reply.
///
/// Kept separate from the protocol client so tests can script replies without
/// a network.
#[async_trait]
pub trait GatewayTransport: Send + Sync {
    async fn send(&self, op: GatewayOp, body: Value) -> Result<Value, TransportError>;
}

/// HTTPS transport authenticating with the merchant identity and shared
/// secret. Every call is bounded by the configured timeout.
pub struct HttpGatewayTransport {
    client: reqwest::Client,
    base_url: String,
    merchant_id: String,
    api_password: String,
}

impl HttpGatewayTransport {
    pub fn new(config: &Config) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.gateway_timeout_secs))
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.gateway_base_url.trim_end_matches('/').to_string(),
            merchant_id: config.gateway_merchant_id.clone(),
            api_password: config.gateway_api_password.clone(),
        })
    }
}

#[async_trait]
impl GatewayTransport for HttpGatewayTransport {
    async fn send(&self, op: GatewayOp, body: Value) -> Result<Value, TransportError> {
        let url = format!("{}/{}", self.base_url, op.path());
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.merchant_id, Some(&self.api_password))
            .json(&body)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        // Business failures are encoded in the reply body; any parseable JSON
        // reply is handed to the protocol client regardless of HTTP status.
        response
            .json()
            .await
            .map_err(|e| TransportError::Malformed(e.to_string()))
    }
}
