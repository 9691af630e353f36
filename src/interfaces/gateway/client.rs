use crate::domain::ports::{
    AuthenticationOutcome, AuthenticationRequirement, CaptureResult, CreateSessionRequest,
    GatewaySession, SessionCreated, VerificationResult, ACQUIRER_APPROVED,
};
use crate::error::GatewayError;
use crate::interfaces::gateway::transport::{GatewayOp, GatewayTransport, TransportError};
use crate::interfaces::gateway::wire::{
    AuthCheckReply, AuthSubmitReply, CaptureReply, CreateSessionBody, CreateSessionReply,
    SessionScopedBody, VerifyReply, RESULT_SUCCESS,
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tokio::time::sleep;

/// Protocol client for the multi-step hosted-checkout flow.
///
/// Network-level failures are retried with bounded backoff because every
/// protocol step is safe to repeat at the transport level. A definitive
/// business reply is never retried; declines carry the remote code verbatim.
pub struct HostedCheckoutClient<T: GatewayTransport> {
    transport: T,
    merchant_id: String,
    max_attempts: u32,
    retry_delay: Duration,
}

impl<T: GatewayTransport> HostedCheckoutClient<T> {
    pub fn new(transport: T, merchant_id: impl Into<String>) -> Self {
        Self {
            transport,
            merchant_id: merchant_id.into(),
            max_attempts: 3,
            retry_delay: Duration::from_millis(250),
        }
    }

    pub fn with_retry(mut self, max_attempts: u32, retry_delay: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.retry_delay = retry_delay;
        self
    }

    async fn call(&self, op: GatewayOp, body: Value) -> Result<Value, GatewayError> {
        let mut delay = self.retry_delay;
        let mut last_failure = String::new();
        for attempt in 1..=self.max_attempts {
            match self.transport.send(op, body.clone()).await {
                Ok(reply) => return Ok(reply),
                Err(TransportError::Malformed(detail)) => {
                    return Err(GatewayError::Protocol(detail));
                }
                Err(TransportError::Network(detail)) => {
                    tracing::warn!(?op, attempt, %detail, "gateway call failed");
                    last_failure = detail;
                    if attempt < self.max_attempts {
                        sleep(delay).await;
                        delay *= 2;
                    }
                }
            }
        }
        Err(GatewayError::Unreachable(last_failure))
    }

    fn encode<B: Serialize>(body: &B) -> Result<Value, GatewayError> {
        serde_json::to_value(body).map_err(|e| GatewayError::Protocol(e.to_string()))
    }

    fn decode<R: DeserializeOwned>(reply: Value) -> Result<R, GatewayError> {
        serde_json::from_value(reply).map_err(|e| GatewayError::Protocol(e.to_string()))
    }

    fn session_body(
        &self,
        session_id: &str,
        order_ref: &str,
        challenge_response: Option<&str>,
    ) -> SessionScopedBody {
        SessionScopedBody {
            merchant_id: self.merchant_id.clone(),
            session_id: session_id.to_string(),
            order_ref: order_ref.to_string(),
            challenge_response: challenge_response.map(str::to_string),
        }
    }

    fn declined(result: String, error_code: Option<String>) -> GatewayError {
        GatewayError::Declined {
            code: error_code.unwrap_or(result),
        }
    }
}

#[async_trait]
impl<T: GatewayTransport> GatewaySession for HostedCheckoutClient<T> {
    async fn create_session(
        &self,
        request: &CreateSessionRequest,
    ) -> Result<SessionCreated, GatewayError> {
        let body = Self::encode(&CreateSessionBody {
            merchant_id: self.merchant_id.clone(),
            order_ref: request.order_ref.clone(),
            amount: request.amount.value(),
            currency: request.currency.clone(),
            customer: request.customer.clone(),
        })?;
        let reply: CreateSessionReply =
            Self::decode(self.call(GatewayOp::CreateSession, body).await?)?;

        if reply.result != RESULT_SUCCESS {
            return Err(Self::declined(reply.result, reply.error_code));
        }
        let session_id = reply
            .session_id
            .ok_or_else(|| GatewayError::Protocol("reply is missing sessionId".to_string()))?;
        let checkout_url = reply
            .checkout_url
            .ok_or_else(|| GatewayError::Protocol("reply is missing checkoutUrl".to_string()))?;
        Ok(SessionCreated {
            session_id,
            correlation_token: reply.result_indicator,
            checkout_url,
        })
    }

    async fn check_authentication(
        &self,
        session_id: &str,
        order_ref: &str,
    ) -> Result<AuthenticationRequirement, GatewayError> {
        let body = Self::encode(&self.session_body(session_id, order_ref, None))?;
        let reply: AuthCheckReply =
            Self::decode(self.call(GatewayOp::CheckAuthentication, body).await?)?;

        if reply.result != RESULT_SUCCESS {
            return Err(Self::declined(reply.result, reply.error_code));
        }
        Ok(AuthenticationRequirement {
            required: reply.authentication_required.unwrap_or(false),
            redirect_url: reply.redirect_url,
        })
    }

    async fn submit_authentication(
        &self,
        session_id: &str,
        order_ref: &str,
        challenge_response: &str,
    ) -> Result<AuthenticationOutcome, GatewayError> {
        let body =
            Self::encode(&self.session_body(session_id, order_ref, Some(challenge_response)))?;
        let reply: AuthSubmitReply =
            Self::decode(self.call(GatewayOp::SubmitAuthentication, body).await?)?;

        if reply.result != RESULT_SUCCESS {
            return Err(Self::declined(reply.result, reply.error_code));
        }
        Ok(AuthenticationOutcome {
            // Absence of an explicit confirmation is not authentication.
            authenticated: reply.authenticated.unwrap_or(false),
        })
    }

    async fn capture(
        &self,
        session_id: &str,
        order_ref: &str,
    ) -> Result<CaptureResult, GatewayError> {
        let body = Self::encode(&self.session_body(session_id, order_ref, None))?;
        let reply: CaptureReply = Self::decode(self.call(GatewayOp::Capture, body).await?)?;

        if reply.result != RESULT_SUCCESS {
            return Err(Self::declined(reply.result, reply.error_code));
        }
        let transaction_id = reply
            .transaction_id
            .ok_or_else(|| GatewayError::Protocol("reply is missing transactionId".to_string()))?;
        let acquirer_response_code = reply.acquirer_response_code.unwrap_or_default();
        Ok(CaptureResult {
            approved: acquirer_response_code == ACQUIRER_APPROVED,
            transaction_id,
            acquirer_response_code,
            receipt_number: reply.receipt_number,
        })
    }

    async fn verify_session(
        &self,
        session_id: &str,
        order_ref: &str,
    ) -> Result<VerificationResult, GatewayError> {
        let body = Self::encode(&self.session_body(session_id, order_ref, None))?;
        let reply: VerifyReply = Self::decode(self.call(GatewayOp::Verify, body).await?)?;

        // A definitive reply, success or not, is a verification result. Only
        // the exact success-plus-approval combination verifies; partial or
        // ambiguous replies never do.
        let verified = reply.result == RESULT_SUCCESS
            && reply.acquirer_response_code.as_deref() == Some(ACQUIRER_APPROVED);
        Ok(VerificationResult {
            verified,
            transaction_id: reply.transaction_id,
            acquirer_response_code: reply.acquirer_response_code,
            receipt_number: reply.receipt_number,
            amount: reply.amount,
            currency: reply.currency,
        })
    }
}
