use crate::application::orchestrator::PaymentOrchestrator;
use crate::domain::payment::{PaymentOutcome, PaymentRecord};
use crate::domain::ports::{GatewaySessionRef, PaymentStoreRef};
use crate::error::{PaymentError, Result};
use std::sync::Arc;

/// An asynchronous completion signal from the gateway.
///
/// Server callbacks usually carry our payment reference; browser returns may
/// only carry the opaque correlation token issued at session creation.
#[derive(Debug, Clone, Default)]
pub struct CallbackSignal {
    /// Server-supplied payment/order reference, when present.
    pub payment_ref: Option<String>,
    /// Gateway session identifier, when present.
    pub session_id: Option<String>,
    /// Result token echoed by the browser redirect.
    pub result_indicator: Option<String>,
}

#[derive(Debug, Clone)]
pub enum ReconcileOutcome {
    Finalized(PaymentOutcome),
    /// No record matched any exact correlation key. The signal is logged for
    /// administrative reconciliation; nothing is mutated and nothing guessed.
    NotFound,
}

/// Maps weakly-correlated gateway notifications back to a payment record and
/// drives its finalization.
///
/// Safe under at-least-once delivery: finalization is idempotent, and a
/// signal matching an already-terminal record short-circuits without another
/// gateway call.
pub struct CallbackReconciler {
    payments: PaymentStoreRef,
    gateway: GatewaySessionRef,
    orchestrator: Arc<PaymentOrchestrator>,
}

impl CallbackReconciler {
    pub fn new(
        payments: PaymentStoreRef,
        gateway: GatewaySessionRef,
        orchestrator: Arc<PaymentOrchestrator>,
    ) -> Self {
        Self {
            payments,
            gateway,
            orchestrator,
        }
    }

    pub async fn reconcile(&self, signal: &CallbackSignal) -> Result<ReconcileOutcome> {
        let Some(record) = self.correlate(signal).await? else {
            tracing::warn!(?signal, "gateway callback matched no payment record");
            return Ok(ReconcileOutcome::NotFound);
        };

        if record.status.is_terminal() {
            return Ok(ReconcileOutcome::Finalized(PaymentOutcome::from_record(
                &record,
            )));
        }

        let session_id = record.gateway_session_id.clone().ok_or_else(|| {
            PaymentError::Validation(format!(
                "matched payment {} has no gateway session",
                record.payment_id
            ))
        })?;

        // The gateway's stored result is authoritative, independent of how
        // many times the browser round-trips.
        let verification = self
            .gateway
            .verify_session(&session_id, &record.payment_id)
            .await?;
        let outcome = self
            .orchestrator
            .finalize_gateway_payment(&record.payment_id, &verification)
            .await?;
        Ok(ReconcileOutcome::Finalized(outcome))
    }

    /// Correlation in strict priority order: exact payment reference, then
    /// gateway session id, then the correlation hint stored at
    /// session-creation time. No fallback guessing.
    async fn correlate(&self, signal: &CallbackSignal) -> Result<Option<PaymentRecord>> {
        if let Some(payment_ref) = &signal.payment_ref {
            if let Some(record) = self.payments.get(payment_ref).await? {
                return Ok(Some(record));
            }
        }
        if let Some(session_id) = &signal.session_id {
            if let Some(record) = self.payments.find_by_session(session_id).await? {
                return Ok(Some(record));
            }
        }
        if let Some(token) = &signal.result_indicator {
            if let Some(record) = self
                .payments
                .find_by_hint("result_indicator", token)
                .await?
            {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }
}
