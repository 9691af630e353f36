use crate::domain::money::{Amount, Balance};
use crate::error::PaymentError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum WalletEntryKind {
    Credit,
    Debit,
}

/// One append-only entry in a wallet's transaction log.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct WalletTransaction {
    pub id: String,
    pub kind: WalletEntryKind,
    pub amount: Amount,
    pub related_payment_id: Option<String>,
    pub description: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// How a wallet top-up is funded.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum TopUpMethod {
    GatewayCard,
    Cash,
    Subsidy,
}

impl FromStr for TopUpMethod {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gateway_card" => Ok(Self::GatewayCard),
            "cash" => Ok(Self::Cash),
            "subsidy" => Ok(Self::Subsidy),
            other => Err(PaymentError::Validation(format!(
                "unsupported top-up method: {other}"
            ))),
        }
    }
}

/// Result of attempting a wallet debit.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum DebitOutcome {
    Applied { new_balance: Balance },
    InsufficientFunds { balance: Balance },
}

/// Per-payer stored-value balance with its append-only transaction history.
///
/// Invariant: `balance` always equals the sum of credits minus debits in
/// `transactions`, and is never negative. A debit that would overdraw is
/// rejected before being appended, never applied and rolled back.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Wallet {
    pub payer_id: String,
    pub balance: Balance,
    pub transactions: Vec<WalletTransaction>,
}

impl Wallet {
    /// Creates an empty wallet. Wallets are created lazily on first reference.
    pub fn new(payer_id: impl Into<String>) -> Self {
        Self {
            payer_id: payer_id.into(),
            balance: Balance::ZERO,
            transactions: Vec::new(),
        }
    }

    /// Appends a credit entry and increases the balance. Always succeeds.
    pub fn credit(
        &mut self,
        amount: Amount,
        related_payment_id: Option<&str>,
        description: Option<&str>,
    ) -> WalletTransaction {
        self.balance += amount;
        let entry = WalletTransaction {
            id: Uuid::new_v4().to_string(),
            kind: WalletEntryKind::Credit,
            amount,
            related_payment_id: related_payment_id.map(str::to_string),
            description: description.map(str::to_string),
            timestamp: Utc::now(),
        };
        self.transactions.push(entry.clone());
        entry
    }

    /// Checks cover and appends a debit entry, or makes no change at all.
    pub fn debit(&mut self, amount: Amount, related_payment_id: &str) -> DebitOutcome {
        if !self.balance.covers(amount) {
            return DebitOutcome::InsufficientFunds {
                balance: self.balance,
            };
        }
        self.balance -= amount;
        self.transactions.push(WalletTransaction {
            id: Uuid::new_v4().to_string(),
            kind: WalletEntryKind::Debit,
            amount,
            related_payment_id: Some(related_payment_id.to_string()),
            description: None,
            timestamp: Utc::now(),
        });
        DebitOutcome::Applied {
            new_balance: self.balance,
        }
    }

    /// Recomputes the balance from the transaction log. Used by tests and
    /// consistency checks; must always equal `balance`.
    pub fn ledger_sum(&self) -> Balance {
        self.transactions
            .iter()
            .fold(Balance::ZERO, |acc, entry| match entry.kind {
                WalletEntryKind::Credit => acc + entry.amount,
                WalletEntryKind::Debit => acc - entry.amount,
            })
    }
}
