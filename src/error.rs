use thiserror::Error;

pub type Result<T> = std::result::Result<T, PaymentError>;

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Internal error: {0}")]
    Internal(Box<dyn std::error::Error + Send + Sync>),
}

/// Failures reported by the hosted-checkout gateway.
///
/// Network-level failures are retryable by the caller; business declines are
/// terminal and carry the remote error code unmodified for audit.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("gateway unreachable: {0}")]
    Unreachable(String),
    #[error("gateway declined: {code}")]
    Declined { code: String },
    #[error("gateway protocol error: {0}")]
    Protocol(String),
}

/// Failure to deliver a payment outcome to the order subsystem.
///
/// Always retryable background work; never a reason to revert a payment record.
#[derive(Error, Debug)]
#[error("order notification failed: {0}")]
pub struct NotifyError(pub String);
