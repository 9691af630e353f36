mod common;

use common::harness;
use payflow::application::orchestrator::SubmitPaymentRequest;
use payflow::application::reconciler::{CallbackSignal, ReconcileOutcome};
use payflow::domain::payment::{PaymentMethod, PaymentOutcome, PaymentStatus};
use rust_decimal_macros::dec;

async fn gateway_payment(h: &common::Harness, order: &str) -> PaymentOutcome {
    h.orchestrator
        .submit_payment(SubmitPaymentRequest {
            order_id: order.to_string(),
            payer_id: "alice".to_string(),
            amount: dec!(25),
            method: PaymentMethod::GatewayCard,
            metadata: None,
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn test_matches_by_payment_reference() {
    let h = harness();
    let outcome = gateway_payment(&h, "order-1").await;

    let signal = CallbackSignal {
        payment_ref: Some(outcome.payment_id.clone()),
        ..Default::default()
    };
    let ReconcileOutcome::Finalized(finalized) = h.reconciler.reconcile(&signal).await.unwrap()
    else {
        panic!("expected a finalized outcome");
    };
    assert_eq!(finalized.payment_id, outcome.payment_id);
    assert_eq!(finalized.status, PaymentStatus::Completed);
}

#[tokio::test]
async fn test_matches_by_session_id() {
    let h = harness();
    let outcome = gateway_payment(&h, "order-1").await;

    let signal = CallbackSignal {
        session_id: outcome.gateway_session_id.clone(),
        ..Default::default()
    };
    let ReconcileOutcome::Finalized(finalized) = h.reconciler.reconcile(&signal).await.unwrap()
    else {
        panic!("expected a finalized outcome");
    };
    assert_eq!(finalized.payment_id, outcome.payment_id);
    assert_eq!(finalized.status, PaymentStatus::Completed);
}

#[tokio::test]
async fn test_matches_by_result_indicator_hint() {
    let h = harness();
    let outcome = gateway_payment(&h, "order-1").await;

    // The scripted gateway issues "token-{n}" as the correlation token.
    let signal = CallbackSignal {
        result_indicator: Some("token-1".to_string()),
        ..Default::default()
    };
    let ReconcileOutcome::Finalized(finalized) = h.reconciler.reconcile(&signal).await.unwrap()
    else {
        panic!("expected a finalized outcome");
    };
    assert_eq!(finalized.payment_id, outcome.payment_id);
}

#[tokio::test]
async fn test_payment_reference_beats_session_id() {
    let h = harness();
    let first = gateway_payment(&h, "order-1").await;
    let second = gateway_payment(&h, "order-2").await;

    // Conflicting keys: the payment reference wins and the session id of the
    // other payment is ignored.
    let signal = CallbackSignal {
        payment_ref: Some(first.payment_id.clone()),
        session_id: second.gateway_session_id.clone(),
        result_indicator: None,
    };
    let ReconcileOutcome::Finalized(finalized) = h.reconciler.reconcile(&signal).await.unwrap()
    else {
        panic!("expected a finalized outcome");
    };
    assert_eq!(finalized.payment_id, first.payment_id);

    let other = h.orchestrator.payment_status(&second.payment_id).await.unwrap();
    assert_eq!(other.status, PaymentStatus::SessionCreated);
}

#[tokio::test]
async fn test_unmatched_signal_mutates_nothing() {
    let h = harness();
    let outcome = gateway_payment(&h, "order-1").await;

    let signal = CallbackSignal {
        payment_ref: Some("no-such-payment".to_string()),
        session_id: Some("no-such-session".to_string()),
        result_indicator: Some("no-such-token".to_string()),
    };
    let result = h.reconciler.reconcile(&signal).await.unwrap();
    assert!(matches!(result, ReconcileOutcome::NotFound));
    assert_eq!(h.gateway.verify_calls(), 0);
    assert_eq!(h.notifier.count(), 0);

    let record = h.orchestrator.payment_status(&outcome.payment_id).await.unwrap();
    assert_eq!(record.status, PaymentStatus::SessionCreated);
}

#[tokio::test]
async fn test_empty_signal_is_not_found() {
    let h = harness();
    gateway_payment(&h, "order-1").await;

    let result = h.reconciler.reconcile(&CallbackSignal::default()).await.unwrap();
    assert!(matches!(result, ReconcileOutcome::NotFound));
}

#[tokio::test]
async fn test_duplicate_delivery_is_idempotent() {
    let h = harness();
    let outcome = gateway_payment(&h, "order-1").await;
    let signal = CallbackSignal {
        session_id: outcome.gateway_session_id.clone(),
        ..Default::default()
    };

    let first = h.reconciler.reconcile(&signal).await.unwrap();
    let second = h.reconciler.reconcile(&signal).await.unwrap();
    let third = h.reconciler.reconcile(&signal).await.unwrap();

    for result in [first, second, third] {
        let ReconcileOutcome::Finalized(finalized) = result else {
            panic!("expected a finalized outcome");
        };
        assert_eq!(finalized.status, PaymentStatus::Completed);
    }
    // Only the first delivery reaches the gateway or the order subsystem.
    assert_eq!(h.gateway.verify_calls(), 1);
    assert_eq!(h.notifier.count(), 1);
}
