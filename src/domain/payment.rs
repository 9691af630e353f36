use crate::domain::money::{Amount, Balance};
use crate::error::PaymentError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Machine-readable failure reasons recorded on failed payments.
pub mod reason {
    pub const INSUFFICIENT_BALANCE: &str = "insufficient_balance";
    pub const GATEWAY_UNREACHABLE: &str = "gateway_unreachable";
    pub const NOT_APPROVED: &str = "not_approved";
    pub const AUTHENTICATION_FAILED: &str = "authentication_failed";
    pub const CASH_DECLINED: &str = "cash_declined";
    pub const DUPLICATE_SETTLEMENT: &str = "duplicate_settlement";
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Wallet,
    GatewayCard,
    Cash,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wallet => "wallet",
            Self::GatewayCard => "gateway_card",
            Self::Cash => "cash",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "wallet" => Ok(Self::Wallet),
            "gateway_card" => Ok(Self::GatewayCard),
            "cash" => Ok(Self::Cash),
            other => Err(PaymentError::Validation(format!(
                "unsupported payment method: {other}"
            ))),
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a payment record.
///
/// `Pending`, `SessionCreated` and `Processing` are non-terminal; `Completed`
/// and `Failed` are terminal and may never be left.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    SessionCreated,
    Processing,
    Completed,
    Failed,
}

impl PaymentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Valid edges of the payment state machine.
    pub fn can_transition_to(&self, next: Self) -> bool {
        match self {
            Self::Pending => matches!(
                next,
                Self::SessionCreated | Self::Processing | Self::Completed | Self::Failed
            ),
            Self::SessionCreated => {
                matches!(next, Self::Processing | Self::Completed | Self::Failed)
            }
            Self::Processing => matches!(next, Self::Completed | Self::Failed),
            Self::Completed | Self::Failed => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::SessionCreated => "session_created",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a completed payment settles: an order, or a wallet top-up.
///
/// Top-up payments credit the payer's wallet when they complete instead of
/// notifying the order subsystem.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum PaymentPurpose {
    OrderSettlement,
    WalletTopUp,
}

/// Durable record of one payment attempt and its lifecycle state.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct PaymentRecord {
    pub payment_id: String,
    pub order_id: String,
    pub payer_id: String,
    pub amount: Amount,
    pub currency: String,
    pub method: PaymentMethod,
    pub purpose: PaymentPurpose,
    pub status: PaymentStatus,
    /// Set once a hosted-checkout session exists for this payment.
    pub gateway_session_id: Option<String>,
    /// Secondary identifiers the gateway may echo back. Used only for
    /// reconciliation, never for authorization decisions.
    pub correlation_hints: HashMap<String, String>,
    /// Method-specific details: wallet balances, receipt numbers, failure reasons.
    pub metadata: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentRecord {
    pub fn new(
        order_id: impl Into<String>,
        payer_id: impl Into<String>,
        amount: Amount,
        currency: impl Into<String>,
        method: PaymentMethod,
        purpose: PaymentPurpose,
    ) -> Self {
        let now = Utc::now();
        Self {
            payment_id: Uuid::new_v4().to_string(),
            order_id: order_id.into(),
            payer_id: payer_id.into(),
            amount,
            currency: currency.into(),
            method,
            purpose,
            status: PaymentStatus::Pending,
            gateway_session_id: None,
            correlation_hints: HashMap::new(),
            metadata: Map::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a state transition, rejecting any edge the state machine does
    /// not allow. The single mutation point for `status`.
    pub fn transition(&mut self, next: PaymentStatus) -> Result<(), PaymentError> {
        if !self.status.can_transition_to(next) {
            return Err(PaymentError::Validation(format!(
                "invalid payment transition {} -> {} for {}",
                self.status, next, self.payment_id
            )));
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn set_failure_reason(&mut self, reason: &str) {
        self.metadata
            .insert("failure_reason".to_string(), Value::String(reason.to_string()));
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.metadata.get("failure_reason").and_then(Value::as_str)
    }
}

/// The caller-facing result of an orchestration step.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentOutcome {
    pub payment_id: String,
    pub order_id: String,
    pub status: PaymentStatus,
    pub method: PaymentMethod,
    pub reason: Option<String>,
    /// Where to send the customer's browser for hosted checkout, if anywhere.
    pub redirect_url: Option<String>,
    pub gateway_session_id: Option<String>,
    /// Wallet balance after the operation, for wallet-backed payments.
    pub new_balance: Option<Balance>,
}

impl PaymentOutcome {
    pub fn from_record(record: &PaymentRecord) -> Self {
        Self {
            payment_id: record.payment_id.clone(),
            order_id: record.order_id.clone(),
            status: record.status,
            method: record.method,
            reason: record.failure_reason().map(str::to_string),
            redirect_url: None,
            gateway_session_id: record.gateway_session_id.clone(),
            new_balance: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn record() -> PaymentRecord {
        PaymentRecord::new(
            "order-1",
            "payer-1",
            Amount::new(dec!(10.0)).unwrap(),
            "USD",
            PaymentMethod::Wallet,
            PaymentPurpose::OrderSettlement,
        )
    }

    #[test]
    fn test_direct_completion_from_pending() {
        let mut record = record();
        assert!(record.transition(PaymentStatus::Completed).is_ok());
        assert_eq!(record.status, PaymentStatus::Completed);
    }

    #[test]
    fn test_gateway_path_transitions() {
        let mut record = record();
        record.transition(PaymentStatus::SessionCreated).unwrap();
        record.transition(PaymentStatus::Processing).unwrap();
        record.transition(PaymentStatus::Completed).unwrap();
        assert_eq!(record.status, PaymentStatus::Completed);
    }

    #[test]
    fn test_terminal_states_are_final() {
        let mut record = record();
        record.transition(PaymentStatus::Failed).unwrap();
        for next in [
            PaymentStatus::Pending,
            PaymentStatus::SessionCreated,
            PaymentStatus::Processing,
            PaymentStatus::Completed,
            PaymentStatus::Failed,
        ] {
            assert!(matches!(
                record.transition(next),
                Err(PaymentError::Validation(_))
            ));
        }
        assert_eq!(record.status, PaymentStatus::Failed);
    }

    #[test]
    fn test_no_backwards_transitions() {
        let mut record = record();
        record.transition(PaymentStatus::Processing).unwrap();
        assert!(record.transition(PaymentStatus::Pending).is_err());
        assert!(record.transition(PaymentStatus::SessionCreated).is_err());
    }

    #[test]
    fn test_failure_reason_round_trip() {
        let mut record = record();
        record.set_failure_reason(reason::INSUFFICIENT_BALANCE);
        assert_eq!(record.failure_reason(), Some(reason::INSUFFICIENT_BALANCE));

        let outcome = PaymentOutcome::from_record(&record);
        assert_eq!(outcome.reason.as_deref(), Some(reason::INSUFFICIENT_BALANCE));
    }
}
