use crate::application::locks::KeyedMutex;
use crate::domain::money::{Amount, Balance};
use crate::domain::ports::WalletStoreRef;
use crate::domain::wallet::{DebitOutcome, Wallet};
use crate::error::Result;

/// Receipt for an applied wallet credit.
#[derive(Debug, Clone)]
pub struct CreditReceipt {
    pub transaction_id: String,
    pub new_balance: Balance,
}

/// Owns per-payer stored-value balances and their transaction histories.
///
/// All mutations for one payer are serialized through a per-payer lock so the
/// check-then-append of a debit is atomic with respect to concurrent debits.
/// Operations on different payers proceed concurrently.
#[derive(Clone)]
pub struct WalletLedger {
    wallets: WalletStoreRef,
    payer_locks: KeyedMutex,
}

impl WalletLedger {
    pub fn new(wallets: WalletStoreRef) -> Self {
        Self {
            wallets,
            payer_locks: KeyedMutex::new(),
        }
    }

    /// Wallets are created lazily on first reference, with balance zero.
    async fn load_or_create(&self, payer_id: &str) -> Result<Wallet> {
        Ok(self
            .wallets
            .get(payer_id)
            .await?
            .unwrap_or_else(|| Wallet::new(payer_id)))
    }

    /// Atomically checks cover and applies a debit tagged with the payment id.
    ///
    /// Two concurrent debits that would individually succeed but jointly
    /// overdraw cannot both succeed.
    pub async fn debit(
        &self,
        payer_id: &str,
        amount: Amount,
        related_payment_id: &str,
    ) -> Result<DebitOutcome> {
        let _guard = self.payer_locks.lock(payer_id).await;
        let mut wallet = self.load_or_create(payer_id).await?;
        let outcome = wallet.debit(amount, related_payment_id);
        if matches!(outcome, DebitOutcome::Applied { .. }) {
            self.wallets.store(wallet).await?;
        }
        Ok(outcome)
    }

    /// Appends a credit and increases the balance. Used for top-ups and
    /// subsidy grants; always succeeds.
    pub async fn credit(
        &self,
        payer_id: &str,
        amount: Amount,
        related_payment_id: Option<&str>,
        description: Option<&str>,
    ) -> Result<CreditReceipt> {
        let _guard = self.payer_locks.lock(payer_id).await;
        let mut wallet = self.load_or_create(payer_id).await?;
        let entry = wallet.credit(amount, related_payment_id, description);
        let receipt = CreditReceipt {
            transaction_id: entry.id,
            new_balance: wallet.balance,
        };
        self.wallets.store(wallet).await?;
        Ok(receipt)
    }

    /// Read-only balance snapshot.
    pub async fn balance(&self, payer_id: &str) -> Result<Balance> {
        Ok(self.load_or_create(payer_id).await?.balance)
    }

    /// Snapshot of the wallet including its transaction history.
    pub async fn statement(&self, payer_id: &str) -> Result<Wallet> {
        self.load_or_create(payer_id).await
    }
}
