use crate::domain::money::Amount;
use crate::domain::payment::{PaymentMethod, PaymentRecord, PaymentStatus};
use crate::domain::wallet::Wallet;
use crate::error::{GatewayError, NotifyError, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Durable keyed store for payment records.
///
/// Secondary lookups (`find_by_session`, `find_by_hint`) must return a record
/// only when exactly one matches; an ambiguous match is treated as no match,
/// because correlation must never guess.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn store(&self, record: PaymentRecord) -> Result<()>;
    async fn get(&self, payment_id: &str) -> Result<Option<PaymentRecord>>;
    async fn find_by_session(&self, session_id: &str) -> Result<Option<PaymentRecord>>;
    async fn find_by_hint(&self, key: &str, value: &str) -> Result<Option<PaymentRecord>>;
    async fn completed_for_order(&self, order_id: &str) -> Result<Option<PaymentRecord>>;
    async fn all(&self) -> Result<Vec<PaymentRecord>>;
}

/// Durable keyed store for wallets.
#[async_trait]
pub trait WalletStore: Send + Sync {
    async fn store(&self, wallet: Wallet) -> Result<()>;
    async fn get(&self, payer_id: &str) -> Result<Option<Wallet>>;
    async fn all(&self) -> Result<Vec<Wallet>>;
}

/// The card network's canonical "approved" acquirer response code.
pub const ACQUIRER_APPROVED: &str = "00";

#[derive(Debug, Clone)]
pub struct CreateSessionRequest {
    /// Merchant-side reference echoed back by the gateway; we use the payment id.
    pub order_ref: String,
    pub amount: Amount,
    pub currency: String,
    pub customer: String,
}

#[derive(Debug, Clone)]
pub struct SessionCreated {
    pub session_id: String,
    /// Opaque token the gateway echoes on browser return, if it issues one.
    pub correlation_token: Option<String>,
    /// Hosted-checkout page to redirect the customer to.
    pub checkout_url: String,
}

#[derive(Debug, Clone)]
pub struct AuthenticationRequirement {
    pub required: bool,
    pub redirect_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AuthenticationOutcome {
    pub authenticated: bool,
}

#[derive(Debug, Clone)]
pub struct CaptureResult {
    pub approved: bool,
    pub transaction_id: String,
    pub acquirer_response_code: String,
    pub receipt_number: Option<String>,
}

/// Authoritative session outcome, independent of how many times the browser
/// round-trips. `verified` is true only when the gateway reports a success
/// result AND the acquirer's canonical approval code; anything ambiguous is
/// not verified.
#[derive(Debug, Clone)]
pub struct VerificationResult {
    pub verified: bool,
    pub transaction_id: Option<String>,
    pub acquirer_response_code: Option<String>,
    pub receipt_number: Option<String>,
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
}

/// Client for the multi-step hosted-checkout protocol.
///
/// Each call is a bounded, blocking network operation from the caller's
/// perspective. Implementations retry network-level failures with backoff but
/// never retry after a definitive business response.
#[async_trait]
pub trait GatewaySession: Send + Sync {
    async fn create_session(
        &self,
        request: &CreateSessionRequest,
    ) -> std::result::Result<SessionCreated, GatewayError>;

    async fn check_authentication(
        &self,
        session_id: &str,
        order_ref: &str,
    ) -> std::result::Result<AuthenticationRequirement, GatewayError>;

    async fn submit_authentication(
        &self,
        session_id: &str,
        order_ref: &str,
        challenge_response: &str,
    ) -> std::result::Result<AuthenticationOutcome, GatewayError>;

    async fn capture(
        &self,
        session_id: &str,
        order_ref: &str,
    ) -> std::result::Result<CaptureResult, GatewayError>;

    async fn verify_session(
        &self,
        session_id: &str,
        order_ref: &str,
    ) -> std::result::Result<VerificationResult, GatewayError>;
}

/// Final payment outcome projected to the order subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentNotice {
    pub order_id: String,
    pub payment_id: String,
    pub status: PaymentStatus,
    pub method: PaymentMethod,
}

/// Outbound interface informing the order subsystem of a terminal payment
/// outcome. Failures are retryable background work and never revert a record.
#[async_trait]
pub trait OrderNotifier: Send + Sync {
    async fn notify(&self, notice: &PaymentNotice) -> std::result::Result<(), NotifyError>;
}

pub type PaymentStoreRef = Arc<dyn PaymentStore>;
pub type WalletStoreRef = Arc<dyn WalletStore>;
pub type GatewaySessionRef = Arc<dyn GatewaySession>;
pub type OrderNotifierRef = Arc<dyn OrderNotifier>;
