mod common;

use common::harness;
use payflow::domain::money::{Amount, Balance};
use payflow::domain::wallet::DebitOutcome;
use rust_decimal_macros::dec;

#[tokio::test]
async fn test_balance_always_equals_ledger_sum() {
    let h = harness();
    h.ledger
        .credit("alice", Amount::new(dec!(100)).unwrap(), None, None)
        .await
        .unwrap();
    h.ledger
        .debit("alice", Amount::new(dec!(33)).unwrap(), "payment-1")
        .await
        .unwrap();
    h.ledger
        .credit("alice", Amount::new(dec!(7.50)).unwrap(), None, Some("refund"))
        .await
        .unwrap();
    h.ledger
        .debit("alice", Amount::new(dec!(200)).unwrap(), "payment-2")
        .await
        .unwrap();

    let statement = h.ledger.statement("alice").await.unwrap();
    assert_eq!(statement.balance, Balance::new(dec!(74.50)));
    assert_eq!(statement.ledger_sum(), statement.balance);
    // The rejected debit left no trace in the history.
    assert_eq!(statement.transactions.len(), 3);
}

#[tokio::test]
async fn test_concurrent_debits_never_overdraw() {
    let h = harness();
    h.ledger
        .credit("alice", Amount::new(dec!(100)).unwrap(), None, None)
        .await
        .unwrap();

    // 20 concurrent debits of 7 against 100: exactly 14 can land.
    let mut handles = Vec::new();
    for i in 0..20 {
        let ledger = h.ledger.clone();
        handles.push(tokio::spawn(async move {
            ledger
                .debit("alice", Amount::new(dec!(7)).unwrap(), &format!("payment-{i}"))
                .await
                .unwrap()
        }));
    }

    let mut applied = 0;
    for handle in handles {
        if matches!(handle.await.unwrap(), DebitOutcome::Applied { .. }) {
            applied += 1;
        }
    }

    assert_eq!(applied, 14);
    let statement = h.ledger.statement("alice").await.unwrap();
    assert_eq!(statement.balance, Balance::new(dec!(2)));
    assert_eq!(statement.ledger_sum(), statement.balance);
    assert_eq!(statement.transactions.len(), 15);
}
