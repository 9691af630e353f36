//! Wire-level request/response shapes for the hosted-checkout gateway API.
//!
//! The gateway reports a coarse `result` on every reply; business details
//! (approval, codes, receipts) ride alongside. Success is never assumed from
//! the absence of explicit failure.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Result code the gateway uses for a successfully processed request.
pub const RESULT_SUCCESS: &str = "SUCCESS";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionBody {
    pub merchant_id: String,
    pub order_ref: String,
    pub amount: Decimal,
    pub currency: String,
    pub customer: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionReply {
    pub result: String,
    pub session_id: Option<String>,
    /// Opaque token echoed on browser return.
    pub result_indicator: Option<String>,
    pub checkout_url: Option<String>,
    pub error_code: Option<String>,
}

/// Body shared by the session-scoped protocol steps.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionScopedBody {
    pub merchant_id: String,
    pub session_id: String,
    pub order_ref: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub challenge_response: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthCheckReply {
    pub result: String,
    pub authentication_required: Option<bool>,
    pub redirect_url: Option<String>,
    pub error_code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSubmitReply {
    pub result: String,
    pub authenticated: Option<bool>,
    pub error_code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureReply {
    pub result: String,
    pub transaction_id: Option<String>,
    pub acquirer_response_code: Option<String>,
    pub receipt_number: Option<String>,
    pub error_code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyReply {
    pub result: String,
    pub transaction_id: Option<String>,
    pub acquirer_response_code: Option<String>,
    pub receipt_number: Option<String>,
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub error_code: Option<String>,
}
