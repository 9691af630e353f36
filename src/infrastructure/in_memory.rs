use crate::domain::payment::{PaymentRecord, PaymentStatus};
use crate::domain::ports::{PaymentStore, WalletStore};
use crate::domain::wallet::Wallet;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory store for payment records.
///
/// Uses `Arc<RwLock<HashMap>>` to allow shared concurrent access. Ideal for
/// testing or single-process deployments where persistence is not required.
#[derive(Default, Clone)]
pub struct InMemoryPaymentStore {
    records: Arc<RwLock<HashMap<String, PaymentRecord>>>,
}

impl InMemoryPaymentStore {
    /// Creates a new, empty in-memory payment store.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Returns the record only when exactly one matches; an ambiguous match is no
/// match, because reconciliation must never guess.
fn unique_match<'a, I>(matches: I) -> Option<&'a PaymentRecord>
where
    I: Iterator<Item = &'a PaymentRecord>,
{
    let mut found = None;
    for record in matches {
        if found.is_some() {
            return None;
        }
        found = Some(record);
    }
    found
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn store(&self, record: PaymentRecord) -> Result<()> {
        let mut records = self.records.write().await;
        records.insert(record.payment_id.clone(), record);
        Ok(())
    }

    async fn get(&self, payment_id: &str) -> Result<Option<PaymentRecord>> {
        let records = self.records.read().await;
        Ok(records.get(payment_id).cloned())
    }

    async fn find_by_session(&self, session_id: &str) -> Result<Option<PaymentRecord>> {
        let records = self.records.read().await;
        Ok(unique_match(
            records
                .values()
                .filter(|r| r.gateway_session_id.as_deref() == Some(session_id)),
        )
        .cloned())
    }

    async fn find_by_hint(&self, key: &str, value: &str) -> Result<Option<PaymentRecord>> {
        let records = self.records.read().await;
        Ok(unique_match(
            records
                .values()
                .filter(|r| r.correlation_hints.get(key).map(String::as_str) == Some(value)),
        )
        .cloned())
    }

    async fn completed_for_order(&self, order_id: &str) -> Result<Option<PaymentRecord>> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .find(|r| r.order_id == order_id && r.status == PaymentStatus::Completed)
            .cloned())
    }

    async fn all(&self) -> Result<Vec<PaymentRecord>> {
        let records = self.records.read().await;
        Ok(records.values().cloned().collect())
    }
}

/// A thread-safe in-memory store for wallets.
#[derive(Default, Clone)]
pub struct InMemoryWalletStore {
    wallets: Arc<RwLock<HashMap<String, Wallet>>>,
}

impl InMemoryWalletStore {
    /// Creates a new, empty in-memory wallet store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WalletStore for InMemoryWalletStore {
    async fn store(&self, wallet: Wallet) -> Result<()> {
        let mut wallets = self.wallets.write().await;
        wallets.insert(wallet.payer_id.clone(), wallet);
        Ok(())
    }

    async fn get(&self, payer_id: &str) -> Result<Option<Wallet>> {
        let wallets = self.wallets.read().await;
        Ok(wallets.get(payer_id).cloned())
    }

    async fn all(&self) -> Result<Vec<Wallet>> {
        let wallets = self.wallets.read().await;
        Ok(wallets.values().cloned().collect())
    }
}
