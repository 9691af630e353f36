#![allow(dead_code)]

use async_trait::async_trait;
use payflow::application::ledger::WalletLedger;
use payflow::application::orchestrator::PaymentOrchestrator;
use payflow::application::reconciler::CallbackReconciler;
use payflow::domain::payment::PaymentRecord;
use payflow::domain::ports::{
    AuthenticationOutcome, AuthenticationRequirement, CaptureResult, CreateSessionRequest,
    GatewaySession, GatewaySessionRef, OrderNotifier, OrderNotifierRef, PaymentNotice,
    PaymentStore, PaymentStoreRef, SessionCreated, VerificationResult, WalletStoreRef,
    ACQUIRER_APPROVED,
};
use payflow::error::{GatewayError, NotifyError, PaymentError};
use payflow::infrastructure::in_memory::{InMemoryPaymentStore, InMemoryWalletStore};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Gateway double with scripted session creation and verification outcomes.
pub struct ScriptedGateway {
    sessions_issued: AtomicUsize,
    create_calls: AtomicUsize,
    verify_calls: AtomicUsize,
    auth_check_calls: AtomicUsize,
    fail_next_create: Mutex<Option<GatewayError>>,
    verification: Mutex<VerificationResult>,
}

impl Default for ScriptedGateway {
    fn default() -> Self {
        Self {
            sessions_issued: AtomicUsize::new(0),
            create_calls: AtomicUsize::new(0),
            verify_calls: AtomicUsize::new(0),
            auth_check_calls: AtomicUsize::new(0),
            fail_next_create: Mutex::new(None),
            verification: Mutex::new(approved_verification()),
        }
    }
}

impl ScriptedGateway {
    pub fn set_verification(&self, verification: VerificationResult) {
        *self.verification.lock().unwrap() = verification;
    }

    pub fn fail_next_create(&self, error: GatewayError) {
        *self.fail_next_create.lock().unwrap() = Some(error);
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }

    pub fn auth_check_calls(&self) -> usize {
        self.auth_check_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GatewaySession for ScriptedGateway {
    async fn create_session(
        &self,
        _request: &CreateSessionRequest,
    ) -> Result<SessionCreated, GatewayError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.fail_next_create.lock().unwrap().take() {
            return Err(error);
        }
        let n = self.sessions_issued.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(SessionCreated {
            session_id: format!("SESSION{n:03}"),
            correlation_token: Some(format!("token-{n}")),
            checkout_url: format!("https://gateway.test/checkout/SESSION{n:03}"),
        })
    }

    async fn check_authentication(
        &self,
        _session_id: &str,
        _order_ref: &str,
    ) -> Result<AuthenticationRequirement, GatewayError> {
        self.auth_check_calls.fetch_add(1, Ordering::SeqCst);
        Ok(AuthenticationRequirement {
            required: false,
            redirect_url: None,
        })
    }

    async fn submit_authentication(
        &self,
        _session_id: &str,
        _order_ref: &str,
        _challenge_response: &str,
    ) -> Result<AuthenticationOutcome, GatewayError> {
        Ok(AuthenticationOutcome {
            authenticated: true,
        })
    }

    async fn capture(
        &self,
        _session_id: &str,
        _order_ref: &str,
    ) -> Result<CaptureResult, GatewayError> {
        Ok(CaptureResult {
            approved: true,
            transaction_id: "TXN1".to_string(),
            acquirer_response_code: ACQUIRER_APPROVED.to_string(),
            receipt_number: Some("RCPT-1".to_string()),
        })
    }

    async fn verify_session(
        &self,
        _session_id: &str,
        _order_ref: &str,
    ) -> Result<VerificationResult, GatewayError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.verification.lock().unwrap().clone())
    }
}

pub fn approved_verification() -> VerificationResult {
    VerificationResult {
        verified: true,
        transaction_id: Some("TXN1".to_string()),
        acquirer_response_code: Some(ACQUIRER_APPROVED.to_string()),
        receipt_number: Some("RCPT-1".to_string()),
        amount: None,
        currency: None,
    }
}

pub fn declined_verification() -> VerificationResult {
    VerificationResult {
        verified: false,
        transaction_id: Some("TXN1".to_string()),
        acquirer_response_code: Some("05".to_string()),
        receipt_number: None,
        amount: None,
        currency: None,
    }
}

/// Payment store that answers order-settlement lookups with a delay,
/// approximating the round trip of a remote durable store. Used to widen
/// check-then-settle race windows.
pub struct LaggedPaymentStore {
    inner: InMemoryPaymentStore,
    lookup_delay: Duration,
}

impl LaggedPaymentStore {
    pub fn new(lookup_delay: Duration) -> Self {
        Self {
            inner: InMemoryPaymentStore::new(),
            lookup_delay,
        }
    }
}

#[async_trait]
impl PaymentStore for LaggedPaymentStore {
    async fn store(&self, record: PaymentRecord) -> Result<(), PaymentError> {
        self.inner.store(record).await
    }

    async fn get(&self, payment_id: &str) -> Result<Option<PaymentRecord>, PaymentError> {
        self.inner.get(payment_id).await
    }

    async fn find_by_session(
        &self,
        session_id: &str,
    ) -> Result<Option<PaymentRecord>, PaymentError> {
        self.inner.find_by_session(session_id).await
    }

    async fn find_by_hint(
        &self,
        key: &str,
        value: &str,
    ) -> Result<Option<PaymentRecord>, PaymentError> {
        self.inner.find_by_hint(key, value).await
    }

    async fn completed_for_order(
        &self,
        order_id: &str,
    ) -> Result<Option<PaymentRecord>, PaymentError> {
        tokio::time::sleep(self.lookup_delay).await;
        self.inner.completed_for_order(order_id).await
    }

    async fn all(&self) -> Result<Vec<PaymentRecord>, PaymentError> {
        self.inner.all().await
    }
}

/// Notifier double recording every notice; can fail the first N attempts.
#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<PaymentNotice>>,
    failures_remaining: AtomicUsize,
}

impl RecordingNotifier {
    pub fn fail_next_attempts(&self, count: usize) {
        self.failures_remaining.store(count, Ordering::SeqCst);
    }

    pub fn count(&self) -> usize {
        self.notices.lock().unwrap().len()
    }

    pub fn notices(&self) -> Vec<PaymentNotice> {
        self.notices.lock().unwrap().clone()
    }
}

#[async_trait]
impl OrderNotifier for RecordingNotifier {
    async fn notify(&self, notice: &PaymentNotice) -> Result<(), NotifyError> {
        if self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(NotifyError("order subsystem unavailable".to_string()));
        }
        self.notices.lock().unwrap().push(notice.clone());
        Ok(())
    }
}

/// Fully wired engine over in-memory stores and test doubles.
pub struct Harness {
    pub payments: PaymentStoreRef,
    pub wallets: Arc<InMemoryWalletStore>,
    pub ledger: WalletLedger,
    pub gateway: Arc<ScriptedGateway>,
    pub notifier: Arc<RecordingNotifier>,
    pub orchestrator: Arc<PaymentOrchestrator>,
    pub reconciler: CallbackReconciler,
}

pub fn harness() -> Harness {
    harness_with_payments(Arc::new(InMemoryPaymentStore::new()))
}

pub fn harness_with_payments(payments: PaymentStoreRef) -> Harness {
    let wallets = Arc::new(InMemoryWalletStore::new());
    let gateway = Arc::new(ScriptedGateway::default());
    let notifier = Arc::new(RecordingNotifier::default());

    let wallets_ref: WalletStoreRef = wallets.clone();
    let gateway_ref: GatewaySessionRef = gateway.clone();
    let notifier_ref: OrderNotifierRef = notifier.clone();

    let ledger = WalletLedger::new(wallets_ref);
    let orchestrator = Arc::new(PaymentOrchestrator::new(
        payments.clone(),
        ledger.clone(),
        gateway_ref.clone(),
        notifier_ref,
        "USD",
    ));
    let reconciler = CallbackReconciler::new(payments.clone(), gateway_ref, orchestrator.clone());

    Harness {
        payments,
        wallets,
        ledger,
        gateway,
        notifier,
        orchestrator,
        reconciler,
    }
}
