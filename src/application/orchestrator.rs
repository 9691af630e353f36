use crate::application::ledger::WalletLedger;
use crate::application::locks::KeyedMutex;
use crate::domain::money::{Amount, Balance};
use crate::domain::payment::{
    reason, PaymentMethod, PaymentOutcome, PaymentPurpose, PaymentRecord, PaymentStatus,
};
use crate::domain::ports::{
    AuthenticationRequirement, CreateSessionRequest, GatewaySessionRef, OrderNotifierRef,
    PaymentNotice, PaymentStoreRef, VerificationResult, ACQUIRER_APPROVED,
};
use crate::domain::wallet::{DebitOutcome, TopUpMethod};
use crate::error::{GatewayError, PaymentError, Result};
use rust_decimal::Decimal;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use uuid::Uuid;

/// A payment intent as submitted by a caller.
#[derive(Debug, Clone)]
pub struct SubmitPaymentRequest {
    pub order_id: String,
    pub payer_id: String,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub metadata: Option<Map<String, Value>>,
}

/// Result of a wallet top-up request.
#[derive(Debug, Clone)]
pub struct TopUpOutcome {
    pub topup_id: String,
    pub new_balance: Option<Balance>,
    /// Hosted-checkout page for gateway-funded top-ups.
    pub redirect_url: Option<String>,
    /// Payment record backing a gateway-funded top-up.
    pub payment_id: Option<String>,
}

/// Drives a payment intent through wallet debit, gateway session creation or
/// manual recording, and owns every status transition of a payment record.
///
/// Transitions for one payment id are serialized through a per-payment lock.
/// The lock is never held across a gateway or notifier call.
pub struct PaymentOrchestrator {
    payments: PaymentStoreRef,
    ledger: WalletLedger,
    gateway: GatewaySessionRef,
    notifier: OrderNotifierRef,
    currency: String,
    payment_locks: KeyedMutex,
    // Serializes the completed-for-order check with the terminal transition
    // so an order can never be settled by two payments. Always acquired
    // before the payment lock.
    order_locks: KeyedMutex,
}

impl PaymentOrchestrator {
    pub fn new(
        payments: PaymentStoreRef,
        ledger: WalletLedger,
        gateway: GatewaySessionRef,
        notifier: OrderNotifierRef,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            payments,
            ledger,
            gateway,
            notifier,
            currency: currency.into(),
            payment_locks: KeyedMutex::new(),
            order_locks: KeyedMutex::new(),
        }
    }

    /// Submits a payment intent for an order.
    ///
    /// Input errors reject synchronously before any record is created.
    /// Business declines come back as failed outcomes, not errors.
    pub async fn submit_payment(&self, request: SubmitPaymentRequest) -> Result<PaymentOutcome> {
        self.submit_with_purpose(request, PaymentPurpose::OrderSettlement)
            .await
    }

    async fn submit_with_purpose(
        &self,
        request: SubmitPaymentRequest,
        purpose: PaymentPurpose,
    ) -> Result<PaymentOutcome> {
        let amount = Amount::new(request.amount)?;
        // Fast-fail for callers; the authoritative check happens again under
        // the order lock wherever a completing transition is applied.
        if purpose == PaymentPurpose::OrderSettlement
            && self
                .payments
                .completed_for_order(&request.order_id)
                .await?
                .is_some()
        {
            return Err(PaymentError::Validation(format!(
                "order {} is already settled",
                request.order_id
            )));
        }

        let mut record = PaymentRecord::new(
            request.order_id,
            request.payer_id,
            amount,
            self.currency.clone(),
            request.method,
            purpose,
        );
        if let Some(metadata) = request.metadata {
            record.metadata.extend(metadata);
        }
        self.payments.store(record.clone()).await?;
        tracing::info!(
            payment_id = %record.payment_id,
            order_id = %record.order_id,
            method = %record.method,
            "payment record created"
        );

        match record.method {
            PaymentMethod::Wallet => self.submit_wallet(record).await,
            PaymentMethod::GatewayCard => self.submit_gateway(record).await,
            PaymentMethod::Cash => self.submit_cash(record).await,
        }
    }

    async fn submit_wallet(&self, mut record: PaymentRecord) -> Result<PaymentOutcome> {
        let order_guard = self.order_locks.lock(&record.order_id).await;
        // Recheck under the order lock: a concurrent attempt may have settled
        // the order between the fast-fail check and here. Checked before the
        // debit so the loser never touches the wallet.
        if record.purpose == PaymentPurpose::OrderSettlement
            && self
                .payments
                .completed_for_order(&record.order_id)
                .await?
                .is_some()
        {
            record.set_failure_reason(reason::DUPLICATE_SETTLEMENT);
            let guard = self.payment_locks.lock(&record.payment_id).await;
            self.settle(&mut record, PaymentStatus::Failed).await?;
            drop(guard);
            drop(order_guard);
            self.after_terminal(&record).await?;
            return Ok(PaymentOutcome::from_record(&record));
        }

        let debit = self
            .ledger
            .debit(&record.payer_id, record.amount, &record.payment_id)
            .await?;

        let guard = self.payment_locks.lock(&record.payment_id).await;
        let new_balance = match debit {
            DebitOutcome::Applied { new_balance } => {
                record
                    .metadata
                    .insert("balance_after".to_string(), json!(new_balance));
                self.settle(&mut record, PaymentStatus::Completed).await?;
                new_balance
            }
            DebitOutcome::InsufficientFunds { balance } => {
                record.set_failure_reason(reason::INSUFFICIENT_BALANCE);
                record
                    .metadata
                    .insert("balance".to_string(), json!(balance));
                record.metadata.insert(
                    "shortfall".to_string(),
                    json!(record.amount.value() - balance.0),
                );
                self.settle(&mut record, PaymentStatus::Failed).await?;
                balance
            }
        };
        drop(guard);
        drop(order_guard);
        self.after_terminal(&record).await?;

        let mut outcome = PaymentOutcome::from_record(&record);
        outcome.new_balance = Some(new_balance);
        Ok(outcome)
    }

    async fn submit_gateway(&self, record: PaymentRecord) -> Result<PaymentOutcome> {
        let request = CreateSessionRequest {
            order_ref: record.payment_id.clone(),
            amount: record.amount,
            currency: record.currency.clone(),
            customer: record.payer_id.clone(),
        };
        // No lock is held while the gateway call is in flight.
        let session = self.gateway.create_session(&request).await;

        let guard = self.payment_locks.lock(&record.payment_id).await;
        let mut record = self
            .payments
            .get(&record.payment_id)
            .await?
            .ok_or_else(|| PaymentError::NotFound(record.payment_id.clone()))?;
        if record.status.is_terminal() {
            // A callback already resolved this payment while the session call
            // was outstanding.
            return Ok(PaymentOutcome::from_record(&record));
        }

        match session {
            Ok(session) => {
                record.gateway_session_id = Some(session.session_id.clone());
                if let Some(token) = &session.correlation_token {
                    record
                        .correlation_hints
                        .insert("result_indicator".to_string(), token.clone());
                }
                record.transition(PaymentStatus::SessionCreated)?;
                self.payments.store(record.clone()).await?;

                let mut outcome = PaymentOutcome::from_record(&record);
                outcome.redirect_url = Some(session.checkout_url);
                Ok(outcome)
            }
            Err(GatewayError::Unreachable(detail)) => {
                record
                    .metadata
                    .insert("gateway_error_detail".to_string(), Value::String(detail));
                record.set_failure_reason(reason::GATEWAY_UNREACHABLE);
                self.settle(&mut record, PaymentStatus::Failed).await?;
                drop(guard);
                self.after_terminal(&record).await?;
                Ok(PaymentOutcome::from_record(&record))
            }
            Err(GatewayError::Declined { code }) => {
                // The remote error code is preserved verbatim for audit.
                record
                    .metadata
                    .insert("gateway_error_code".to_string(), Value::String(code.clone()));
                record.set_failure_reason(&code);
                self.settle(&mut record, PaymentStatus::Failed).await?;
                drop(guard);
                self.after_terminal(&record).await?;
                Ok(PaymentOutcome::from_record(&record))
            }
            Err(GatewayError::Protocol(detail)) => {
                record
                    .metadata
                    .insert("gateway_error_detail".to_string(), Value::String(detail));
                record.set_failure_reason("gateway_error");
                self.settle(&mut record, PaymentStatus::Failed).await?;
                drop(guard);
                self.after_terminal(&record).await?;
                Ok(PaymentOutcome::from_record(&record))
            }
        }
    }

    async fn submit_cash(&self, mut record: PaymentRecord) -> Result<PaymentOutcome> {
        record
            .metadata
            .insert("requires_confirmation".to_string(), Value::Bool(true));
        self.payments.store(record.clone()).await?;
        Ok(PaymentOutcome::from_record(&record))
    }

    /// Applies the authoritative gateway verification to a payment.
    ///
    /// Invoked by the callback reconciler and the capture path. Idempotent: a
    /// payment that already reached a terminal state is returned as-is, with
    /// no further transition and no repeated notification.
    pub async fn finalize_gateway_payment(
        &self,
        payment_id: &str,
        verification: &VerificationResult,
    ) -> Result<PaymentOutcome> {
        // The order id is immutable after creation, so it can be read before
        // any lock is taken. The order lock comes first so the
        // completed-for-order check and the terminal transition are atomic
        // per order.
        let order_id = self
            .payments
            .get(payment_id)
            .await?
            .ok_or_else(|| PaymentError::NotFound(payment_id.to_string()))?
            .order_id;
        let order_guard = self.order_locks.lock(&order_id).await;
        let guard = self.payment_locks.lock(payment_id).await;
        let mut record = self
            .payments
            .get(payment_id)
            .await?
            .ok_or_else(|| PaymentError::NotFound(payment_id.to_string()))?;
        if record.status.is_terminal() {
            return Ok(PaymentOutcome::from_record(&record));
        }
        if record.method != PaymentMethod::GatewayCard {
            return Err(PaymentError::Validation(format!(
                "payment {payment_id} is not a gateway payment"
            )));
        }

        if let Some(transaction_id) = &verification.transaction_id {
            record.metadata.insert(
                "gateway_transaction_id".to_string(),
                Value::String(transaction_id.clone()),
            );
        }
        if let Some(code) = &verification.acquirer_response_code {
            record.metadata.insert(
                "acquirer_response_code".to_string(),
                Value::String(code.clone()),
            );
        }
        if let Some(receipt) = &verification.receipt_number {
            record.metadata.insert(
                "receipt_number".to_string(),
                Value::String(receipt.clone()),
            );
        }

        if verification.verified {
            if let Some(other) = self.payments.completed_for_order(&record.order_id).await? {
                if other.payment_id != record.payment_id {
                    tracing::error!(
                        payment_id = %record.payment_id,
                        order_id = %record.order_id,
                        settled_by = %other.payment_id,
                        "gateway approved a payment for an order already settled"
                    );
                    record.set_failure_reason(reason::DUPLICATE_SETTLEMENT);
                    self.settle(&mut record, PaymentStatus::Failed).await?;
                    drop(guard);
                    drop(order_guard);
                    self.after_terminal(&record).await?;
                    return Ok(PaymentOutcome::from_record(&record));
                }
            }
            self.settle(&mut record, PaymentStatus::Completed).await?;
            drop(guard);
            drop(order_guard);
            let credited = self.after_terminal(&record).await?;
            let mut outcome = PaymentOutcome::from_record(&record);
            outcome.new_balance = credited;
            Ok(outcome)
        } else {
            record.set_failure_reason(reason::NOT_APPROVED);
            self.settle(&mut record, PaymentStatus::Failed).await?;
            drop(guard);
            drop(order_guard);
            self.after_terminal(&record).await?;
            Ok(PaymentOutcome::from_record(&record))
        }
    }

    /// Asks the gateway whether the customer needs a step-up challenge.
    ///
    /// A required challenge moves the record to `processing` while the
    /// redirect is outstanding.
    pub async fn check_gateway_authentication(
        &self,
        payment_id: &str,
    ) -> Result<AuthenticationRequirement> {
        let record = self.gateway_record(payment_id).await?;
        if record.status.is_terminal() {
            // Nothing left to authenticate once the payment is settled.
            return Ok(AuthenticationRequirement {
                required: false,
                redirect_url: None,
            });
        }
        let session_id = self.session_id(&record)?;

        let requirement = self
            .gateway
            .check_authentication(&session_id, &record.payment_id)
            .await?;

        if requirement.required {
            let _guard = self.payment_locks.lock(payment_id).await;
            let mut record = self
                .payments
                .get(payment_id)
                .await?
                .ok_or_else(|| PaymentError::NotFound(payment_id.to_string()))?;
            if record.status == PaymentStatus::SessionCreated {
                record.transition(PaymentStatus::Processing)?;
                self.payments.store(record).await?;
            }
        }
        Ok(requirement)
    }

    /// Completes authentication (if a challenge response is supplied) and
    /// captures the payment, then finalizes from the capture result.
    ///
    /// A network failure mid-flow leaves the record non-terminal; the
    /// callback reconciler or a verify sweep closes it out later.
    pub async fn capture_gateway_payment(
        &self,
        payment_id: &str,
        challenge_response: Option<&str>,
    ) -> Result<PaymentOutcome> {
        let record = self.gateway_record(payment_id).await?;
        if record.status.is_terminal() {
            return Ok(PaymentOutcome::from_record(&record));
        }
        let session_id = self.session_id(&record)?;

        if let Some(challenge) = challenge_response {
            let auth = self
                .gateway
                .submit_authentication(&session_id, &record.payment_id, challenge)
                .await?;
            if !auth.authenticated {
                let guard = self.payment_locks.lock(payment_id).await;
                let mut record = self
                    .payments
                    .get(payment_id)
                    .await?
                    .ok_or_else(|| PaymentError::NotFound(payment_id.to_string()))?;
                if record.status.is_terminal() {
                    return Ok(PaymentOutcome::from_record(&record));
                }
                record.set_failure_reason(reason::AUTHENTICATION_FAILED);
                self.settle(&mut record, PaymentStatus::Failed).await?;
                drop(guard);
                self.after_terminal(&record).await?;
                return Ok(PaymentOutcome::from_record(&record));
            }
        }

        match self.gateway.capture(&session_id, &record.payment_id).await {
            Ok(capture) => {
                let verification = VerificationResult {
                    verified: capture.approved
                        && capture.acquirer_response_code == ACQUIRER_APPROVED,
                    transaction_id: Some(capture.transaction_id),
                    acquirer_response_code: Some(capture.acquirer_response_code),
                    receipt_number: capture.receipt_number,
                    amount: None,
                    currency: None,
                };
                self.finalize_gateway_payment(payment_id, &verification)
                    .await
            }
            Err(GatewayError::Declined { code }) => {
                let verification = VerificationResult {
                    verified: false,
                    transaction_id: None,
                    acquirer_response_code: Some(code),
                    receipt_number: None,
                    amount: None,
                    currency: None,
                };
                self.finalize_gateway_payment(payment_id, &verification)
                    .await
            }
            // Ambiguous: the capture may or may not have landed remotely.
            // Leave the record non-terminal for reconciliation.
            Err(err) => Err(err.into()),
        }
    }

    /// Administrative confirmation of a cash payment. Idempotent.
    pub async fn confirm_cash_payment(
        &self,
        payment_id: &str,
        approved: bool,
    ) -> Result<PaymentOutcome> {
        let order_id = self
            .payments
            .get(payment_id)
            .await?
            .ok_or_else(|| PaymentError::NotFound(payment_id.to_string()))?
            .order_id;
        let order_guard = self.order_locks.lock(&order_id).await;
        let guard = self.payment_locks.lock(payment_id).await;
        let mut record = self
            .payments
            .get(payment_id)
            .await?
            .ok_or_else(|| PaymentError::NotFound(payment_id.to_string()))?;
        if record.status.is_terminal() {
            return Ok(PaymentOutcome::from_record(&record));
        }
        if record.method != PaymentMethod::Cash {
            return Err(PaymentError::Validation(format!(
                "payment {payment_id} is not a cash payment"
            )));
        }

        if approved {
            if let Some(other) = self.payments.completed_for_order(&record.order_id).await? {
                if other.payment_id != record.payment_id {
                    record.set_failure_reason(reason::DUPLICATE_SETTLEMENT);
                    self.settle(&mut record, PaymentStatus::Failed).await?;
                    drop(guard);
                    drop(order_guard);
                    self.after_terminal(&record).await?;
                    return Ok(PaymentOutcome::from_record(&record));
                }
            }
            self.settle(&mut record, PaymentStatus::Completed).await?;
        } else {
            record.set_failure_reason(reason::CASH_DECLINED);
            self.settle(&mut record, PaymentStatus::Failed).await?;
        }
        drop(guard);
        drop(order_guard);
        self.after_terminal(&record).await?;
        Ok(PaymentOutcome::from_record(&record))
    }

    /// Read-only projection of a payment record.
    pub async fn payment_status(&self, payment_id: &str) -> Result<PaymentRecord> {
        self.payments
            .get(payment_id)
            .await?
            .ok_or_else(|| PaymentError::NotFound(payment_id.to_string()))
    }

    /// Tops up a wallet. Subsidy and cash top-ups credit immediately; gateway
    /// top-ups go through hosted checkout and credit on finalization.
    pub async fn top_up_wallet(
        &self,
        payer_id: &str,
        amount: Decimal,
        method: TopUpMethod,
    ) -> Result<TopUpOutcome> {
        let amount = Amount::new(amount)?;
        match method {
            TopUpMethod::Subsidy | TopUpMethod::Cash => {
                let description = match method {
                    TopUpMethod::Subsidy => "subsidy top-up",
                    _ => "cash top-up",
                };
                let receipt = self
                    .ledger
                    .credit(payer_id, amount, None, Some(description))
                    .await?;
                Ok(TopUpOutcome {
                    topup_id: receipt.transaction_id,
                    new_balance: Some(receipt.new_balance),
                    redirect_url: None,
                    payment_id: None,
                })
            }
            TopUpMethod::GatewayCard => {
                let request = SubmitPaymentRequest {
                    order_id: format!("topup-{}", Uuid::new_v4()),
                    payer_id: payer_id.to_string(),
                    amount: amount.value(),
                    method: PaymentMethod::GatewayCard,
                    metadata: None,
                };
                let outcome = self
                    .submit_with_purpose(request, PaymentPurpose::WalletTopUp)
                    .await?;
                Ok(TopUpOutcome {
                    topup_id: outcome.payment_id.clone(),
                    new_balance: None,
                    redirect_url: outcome.redirect_url.clone(),
                    payment_id: Some(outcome.payment_id),
                })
            }
        }
    }

    async fn gateway_record(&self, payment_id: &str) -> Result<PaymentRecord> {
        let record = self
            .payments
            .get(payment_id)
            .await?
            .ok_or_else(|| PaymentError::NotFound(payment_id.to_string()))?;
        if record.method != PaymentMethod::GatewayCard {
            return Err(PaymentError::Validation(format!(
                "payment {payment_id} is not a gateway payment"
            )));
        }
        Ok(record)
    }

    fn session_id(&self, record: &PaymentRecord) -> Result<String> {
        record
            .gateway_session_id
            .clone()
            .ok_or_else(|| {
                PaymentError::Validation(format!(
                    "payment {} has no gateway session",
                    record.payment_id
                ))
            })
    }

    /// Applies a terminal transition and persists it. Caller holds the
    /// payment lock.
    async fn settle(&self, record: &mut PaymentRecord, status: PaymentStatus) -> Result<()> {
        record.transition(status)?;
        self.payments.store(record.clone()).await?;
        tracing::info!(
            payment_id = %record.payment_id,
            order_id = %record.order_id,
            status = %record.status,
            reason = record.failure_reason().unwrap_or(""),
            "payment settled"
        );
        Ok(())
    }

    /// Post-terminal effects, run without the payment lock: credit the wallet
    /// for completed top-ups, notify the order subsystem for settlements.
    async fn after_terminal(&self, record: &PaymentRecord) -> Result<Option<Balance>> {
        let mut credited = None;
        if record.status == PaymentStatus::Completed
            && record.purpose == PaymentPurpose::WalletTopUp
        {
            let receipt = self
                .ledger
                .credit(
                    &record.payer_id,
                    record.amount,
                    Some(&record.payment_id),
                    Some("wallet top-up"),
                )
                .await?;
            credited = Some(receipt.new_balance);
        }
        if record.purpose == PaymentPurpose::OrderSettlement {
            self.notify_terminal(record).await;
        }
        Ok(credited)
    }

    /// One notification per terminal transition. The first attempt is awaited;
    /// failures hand off to bounded background retries and never block or
    /// revert the record.
    async fn notify_terminal(&self, record: &PaymentRecord) {
        let notice = PaymentNotice {
            order_id: record.order_id.clone(),
            payment_id: record.payment_id.clone(),
            status: record.status,
            method: record.method,
        };
        if self.notifier.notify(&notice).await.is_ok() {
            return;
        }
        tracing::warn!(
            payment_id = %notice.payment_id,
            "order notification failed; retrying in background"
        );
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            let mut delay = Duration::from_millis(500);
            for attempt in 1..=3u32 {
                sleep(delay).await;
                match notifier.notify(&notice).await {
                    Ok(()) => return,
                    Err(err) => {
                        tracing::warn!(attempt, %err, "order notification retry failed");
                    }
                }
                delay *= 2;
            }
            tracing::error!(
                payment_id = %notice.payment_id,
                "order notification abandoned after retries"
            );
        });
    }
}
