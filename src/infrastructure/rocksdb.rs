use crate::domain::payment::{PaymentRecord, PaymentStatus};
use crate::domain::ports::{PaymentStore, WalletStore};
use crate::domain::wallet::Wallet;
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Options};
use std::path::Path;
use std::sync::Arc;

/// Column Family for payment records.
pub const CF_PAYMENTS: &str = "payments";
/// Column Family for wallets.
pub const CF_WALLETS: &str = "wallets";

/// A persistent store implementation using RocksDB.
///
/// Handles storage for both `PaymentRecord` and `Wallet` entities using
/// separate Column Families.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDbStore {
    db: Arc<DB>,
}

impl RocksDbStore {
    /// Opens or creates a RocksDB instance at the specified path, ensuring
    /// the required column families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_payments = ColumnFamilyDescriptor::new(CF_PAYMENTS, Options::default());
        let cf_wallets = ColumnFamilyDescriptor::new(CF_WALLETS, Options::default());

        let db = DB::open_cf_descriptors(&opts, path, vec![cf_payments, cf_wallets])
            .map_err(|e| PaymentError::Internal(Box::new(e)))?;

        Ok(Self { db: Arc::new(db) })
    }

    fn cf_handle(&self, name: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            PaymentError::Internal(Box::new(std::io::Error::other(format!(
                "{name} column family not found"
            ))))
        })
    }

    fn scan_payments<F>(&self, mut predicate: F) -> Result<Vec<PaymentRecord>>
    where
        F: FnMut(&PaymentRecord) -> bool,
    {
        let cf = self.cf_handle(CF_PAYMENTS)?;
        let mut records = Vec::new();
        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (_key, value) = item.map_err(|e| PaymentError::Internal(Box::new(e)))?;
            let record: PaymentRecord = serde_json::from_slice(&value)
                .map_err(|e| PaymentError::Internal(Box::new(e)))?;
            if predicate(&record) {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Returns the record only when exactly one matches; ambiguity is treated
    /// as no match.
    fn unique_payment<F>(&self, predicate: F) -> Result<Option<PaymentRecord>>
    where
        F: FnMut(&PaymentRecord) -> bool,
    {
        let mut matches = self.scan_payments(predicate)?;
        if matches.len() == 1 {
            Ok(matches.pop())
        } else {
            Ok(None)
        }
    }
}

#[async_trait]
impl PaymentStore for RocksDbStore {
    async fn store(&self, record: PaymentRecord) -> Result<()> {
        let cf = self.cf_handle(CF_PAYMENTS)?;
        let value =
            serde_json::to_vec(&record).map_err(|e| PaymentError::Internal(Box::new(e)))?;
        self.db
            .put_cf(cf, record.payment_id.as_bytes(), value)
            .map_err(|e| PaymentError::Internal(Box::new(e)))?;
        Ok(())
    }

    async fn get(&self, payment_id: &str) -> Result<Option<PaymentRecord>> {
        let cf = self.cf_handle(CF_PAYMENTS)?;
        let result = self
            .db
            .get_cf(cf, payment_id.as_bytes())
            .map_err(|e| PaymentError::Internal(Box::new(e)))?;

        match result {
            Some(bytes) => Ok(Some(
                serde_json::from_slice(&bytes).map_err(|e| PaymentError::Internal(Box::new(e)))?,
            )),
            None => Ok(None),
        }
    }

    async fn find_by_session(&self, session_id: &str) -> Result<Option<PaymentRecord>> {
        self.unique_payment(|r| r.gateway_session_id.as_deref() == Some(session_id))
    }

    async fn find_by_hint(&self, key: &str, value: &str) -> Result<Option<PaymentRecord>> {
        self.unique_payment(|r| r.correlation_hints.get(key).map(String::as_str) == Some(value))
    }

    async fn completed_for_order(&self, order_id: &str) -> Result<Option<PaymentRecord>> {
        let mut matches =
            self.scan_payments(|r| r.order_id == order_id && r.status == PaymentStatus::Completed)?;
        Ok(matches.pop())
    }

    async fn all(&self) -> Result<Vec<PaymentRecord>> {
        self.scan_payments(|_| true)
    }
}

#[async_trait]
impl WalletStore for RocksDbStore {
    async fn store(&self, wallet: Wallet) -> Result<()> {
        let cf = self.cf_handle(CF_WALLETS)?;
        let value =
            serde_json::to_vec(&wallet).map_err(|e| PaymentError::Internal(Box::new(e)))?;
        self.db
            .put_cf(cf, wallet.payer_id.as_bytes(), value)
            .map_err(|e| PaymentError::Internal(Box::new(e)))?;
        Ok(())
    }

    async fn get(&self, payer_id: &str) -> Result<Option<Wallet>> {
        let cf = self.cf_handle(CF_WALLETS)?;
        let result = self
            .db
            .get_cf(cf, payer_id.as_bytes())
            .map_err(|e| PaymentError::Internal(Box::new(e)))?;

        match result {
            Some(bytes) => Ok(Some(
                serde_json::from_slice(&bytes).map_err(|e| PaymentError::Internal(Box::new(e)))?,
            )),
            None => Ok(None),
        }
    }

    async fn all(&self) -> Result<Vec<Wallet>> {
        let cf = self.cf_handle(CF_WALLETS)?;
        let mut wallets = Vec::new();
        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (_key, value) = item.map_err(|e| PaymentError::Internal(Box::new(e)))?;
            wallets.push(
                serde_json::from_slice(&value).map_err(|e| PaymentError::Internal(Box::new(e)))?,
            );
        }
        Ok(wallets)
    }
}
