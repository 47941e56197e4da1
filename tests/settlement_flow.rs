use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use settlement_core::domain::booking::{
    AdditionalPaymentMethod, BookingPaymentStatus, BookingRecord, SettlementStatus,
};
use settlement_core::domain::payment::{CustomerDetails, PaymentMethod};
use settlement_core::domain::reconciliation::ReconciliationKind;
use settlement_core::domain::wallet::WalletEntryKind;
use settlement_core::error::SettlementError;
use settlement_core::gateways::mock::MockGateway;
use settlement_core::pricing::StaticPricingRules;
use settlement_core::store::memory::MemoryStore;
use settlement_core::store::SettlementStore;
use settlement_core::SettlementCore;

fn booking() -> BookingRecord {
    BookingRecord {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        provider_id: Uuid::new_v4(),
        payment_status: BookingPaymentStatus::Pending,
        created_at: Utc::now(),
    }
}

fn customer() -> CustomerDetails {
    CustomerDetails {
        name: "Meera Iyer".to_string(),
        email: "meera@example.com".to_string(),
        phone: "9999900003".to_string(),
    }
}

fn core_with(store: MemoryStore, behavior: &str) -> SettlementCore {
    // RUST_LOG-gated output for debugging settlement runs under test.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    SettlementCore::new(
        Arc::new(store),
        Arc::new(MockGateway::new(behavior)),
        Arc::new(StaticPricingRules::empty()),
        "INR".to_string(),
    )
}

async fn authorized_booking(
    store: &MemoryStore,
    core: &SettlementCore,
    estimated: Decimal,
    gateway_payment_id: &str,
) -> BookingRecord {
    let b = booking();
    store.seed_booking(b.clone()).await;
    core.create_pre_auth_payment(b.id, b.user_id, estimated, "INR", customer())
        .await
        .unwrap();
    core.mark_authorized(b.id, gateway_payment_id).await.unwrap();
    b
}

async fn booking_status(store: &MemoryStore, booking_id: Uuid) -> BookingPaymentStatus {
    store
        .find_booking(booking_id)
        .await
        .unwrap()
        .unwrap()
        .payment_status
}

#[tokio::test]
async fn fare_within_authorization_settles_cleanly() {
    let store = MemoryStore::new();
    let core = core_with(store.clone(), "ALWAYS_SUCCESS");
    let b = authorized_booking(&store, &core, dec!(500.00), "pay_3001").await;

    let outcome = core.settle_payment(b.id, dec!(450.00)).await.unwrap();

    assert_eq!(outcome.status, SettlementStatus::Settled);
    assert_eq!(outcome.settlement.payment_method, PaymentMethod::Razorpay);
    assert_eq!(outcome.settlement.captured_amount, dec!(450.00));
    assert!(!outcome.settlement.additional_payment_needed);
    assert_eq!(outcome.settlement.additional_payment_method, None);

    assert_eq!(booking_status(&store, b.id).await, BookingPaymentStatus::Completed);
    let (payment, _) = store
        .find_captured_payment(b.id, "pay_3001")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payment.captured_amount, dec!(450.00));
}

#[tokio::test]
async fn earnings_accompany_every_settlement() {
    let store = MemoryStore::new();
    let core = core_with(store.clone(), "ALWAYS_SUCCESS");
    let b = authorized_booking(&store, &core, dec!(1000.00), "pay_3002").await;

    let outcome = core.settle_payment(b.id, dec!(1000.00)).await.unwrap();

    assert_eq!(outcome.earnings.platform_commission, dec!(200.00));
    assert_eq!(outcome.earnings.gst_amount, dec!(36.00));
    assert_eq!(outcome.earnings.provider_earnings, dec!(764.00));

    let record = store.find_earnings(b.id).await.unwrap().unwrap();
    assert_eq!(record.provider_id, b.provider_id);
    assert_eq!(record.breakdown(), outcome.earnings);
}

#[tokio::test]
async fn overrun_collected_from_wallet_when_balance_covers() {
    let store = MemoryStore::new();
    let core = core_with(store.clone(), "ALWAYS_SUCCESS");
    let b = authorized_booking(&store, &core, dec!(500.00), "pay_3003").await;
    core.adjust_wallet(b.user_id, None, dec!(200.00), WalletEntryKind::Topup, "topup")
        .await
        .unwrap();

    let outcome = core.settle_payment(b.id, dec!(620.00)).await.unwrap();

    assert_eq!(outcome.status, SettlementStatus::Settled);
    assert_eq!(outcome.settlement.captured_amount, dec!(500.00));
    assert!(outcome.settlement.additional_payment_needed);
    assert_eq!(outcome.settlement.additional_amount, Some(dec!(120.00)));
    assert_eq!(
        outcome.settlement.additional_payment_method,
        Some(AdditionalPaymentMethod::Wallet)
    );

    assert_eq!(core.wallet_balance(b.user_id).await.unwrap(), dec!(80.00));
    let history = core.wallet_history(b.user_id).await.unwrap();
    let debit = history.last().unwrap();
    assert_eq!(debit.amount, dec!(-120.00));
    assert_eq!(debit.kind, WalletEntryKind::FareDeduction);
    assert_eq!(debit.booking_id, Some(b.id));
}

#[tokio::test]
async fn overrun_defers_to_payment_link_when_wallet_is_short() {
    let store = MemoryStore::new();
    let core = core_with(store.clone(), "ALWAYS_SUCCESS");
    let b = authorized_booking(&store, &core, dec!(500.00), "pay_3004").await;
    core.adjust_wallet(b.user_id, None, dec!(50.00), WalletEntryKind::Topup, "topup")
        .await
        .unwrap();

    let outcome = core.settle_payment(b.id, dec!(620.00)).await.unwrap();

    // The provider is paid and the booking is settled; only the overrun
    // collection is deferred.
    assert_eq!(outcome.status, SettlementStatus::AdditionalPaymentPending);
    assert_eq!(
        outcome.settlement.additional_payment_method,
        Some(AdditionalPaymentMethod::PaymentLink)
    );
    assert_eq!(outcome.settlement.additional_amount, Some(dec!(120.00)));

    assert_eq!(core.wallet_balance(b.user_id).await.unwrap(), dec!(50.00));
    assert_eq!(core.wallet_history(b.user_id).await.unwrap().len(), 1);
    assert_eq!(booking_status(&store, b.id).await, BookingPaymentStatus::Completed);
    assert!(store.find_earnings(b.id).await.unwrap().is_some());
}

#[tokio::test]
async fn offline_booking_settles_as_cash() {
    let store = MemoryStore::new();
    let core = core_with(store.clone(), "ALWAYS_SUCCESS");
    let b = booking();
    store.seed_booking(b.clone()).await;

    let outcome = core.settle_payment(b.id, dec!(350.00)).await.unwrap();

    assert_eq!(outcome.status, SettlementStatus::Settled);
    assert_eq!(outcome.settlement.payment_method, PaymentMethod::Cash);
    assert_eq!(outcome.settlement.captured_amount, dec!(350.00));
    assert!(!outcome.settlement.additional_payment_needed);

    assert_eq!(booking_status(&store, b.id).await, BookingPaymentStatus::Completed);
    assert!(store.find_earnings(b.id).await.unwrap().is_some());
}

#[tokio::test]
async fn missing_booking_is_not_found() {
    let core = core_with(MemoryStore::new(), "ALWAYS_SUCCESS");

    let err = core
        .settle_payment(Uuid::new_v4(), dec!(100.00))
        .await
        .unwrap_err();
    assert!(matches!(err, SettlementError::NotFound { .. }));
}

#[tokio::test]
async fn non_positive_fare_is_rejected() {
    let core = core_with(MemoryStore::new(), "ALWAYS_SUCCESS");

    let err = core.settle_payment(Uuid::new_v4(), dec!(0)).await.unwrap_err();
    assert!(matches!(err, SettlementError::Validation(_)));
}

#[tokio::test]
async fn settled_booking_cannot_settle_again() {
    let store = MemoryStore::new();
    let core = core_with(store.clone(), "ALWAYS_SUCCESS");
    let b = authorized_booking(&store, &core, dec!(500.00), "pay_3005").await;

    core.settle_payment(b.id, dec!(450.00)).await.unwrap();
    let err = core.settle_payment(b.id, dec!(450.00)).await.unwrap_err();
    assert!(matches!(err, SettlementError::Validation(_)));
}

#[tokio::test]
async fn declined_capture_aborts_and_allows_retry() {
    let store = MemoryStore::new();
    let declining = core_with(store.clone(), "DECLINE_CAPTURE");
    let b = authorized_booking(&store, &declining, dec!(500.00), "pay_3006").await;

    let err = declining.settle_payment(b.id, dec!(450.00)).await.unwrap_err();
    assert!(matches!(err, SettlementError::Gateway(_)));
    assert_eq!(booking_status(&store, b.id).await, BookingPaymentStatus::Pending);
    assert!(store.find_earnings(b.id).await.unwrap().is_none());

    // The record is still pre-capture, so retrying later is safe.
    let retrying = core_with(store.clone(), "ALWAYS_SUCCESS");
    let outcome = retrying.settle_payment(b.id, dec!(450.00)).await.unwrap();
    assert_eq!(outcome.status, SettlementStatus::Settled);
    assert_eq!(outcome.settlement.captured_amount, dec!(450.00));
}

#[tokio::test]
async fn unrecorded_settlement_capture_lands_in_outbox() {
    let store = MemoryStore::new();
    let core = core_with(store.clone(), "ALWAYS_SUCCESS");
    let b = authorized_booking(&store, &core, dec!(500.00), "pay_3007").await;

    store.fail_next("persist_settlement").await;
    let err = core.settle_payment(b.id, dec!(450.00)).await.unwrap_err();
    assert!(matches!(err, SettlementError::Capture(_)));

    assert_eq!(booking_status(&store, b.id).await, BookingPaymentStatus::Pending);
    let pending = core.pending_reconciliations().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].kind, ReconciliationKind::CaptureUnrecorded);
    assert_eq!(pending[0].booking_id, b.id);
    assert_eq!(pending[0].amount, dec!(450.00));
}

#[tokio::test]
async fn wallet_write_failure_defers_instead_of_failing_settlement() {
    let store = MemoryStore::new();
    let core = core_with(store.clone(), "ALWAYS_SUCCESS");
    let b = authorized_booking(&store, &core, dec!(500.00), "pay_3008").await;
    core.adjust_wallet(b.user_id, None, dec!(200.00), WalletEntryKind::Topup, "topup")
        .await
        .unwrap();

    // The capture has committed by the time the wallet debit runs; its
    // failure downgrades the collection, never the settlement.
    store.fail_next("collect_shortfall").await;
    let outcome = core.settle_payment(b.id, dec!(620.00)).await.unwrap();

    assert_eq!(outcome.status, SettlementStatus::AdditionalPaymentPending);
    assert_eq!(
        outcome.settlement.additional_payment_method,
        Some(AdditionalPaymentMethod::PaymentLink)
    );
    assert_eq!(core.wallet_balance(b.user_id).await.unwrap(), dec!(200.00));
    assert_eq!(booking_status(&store, b.id).await, BookingPaymentStatus::Completed);
}

#[tokio::test]
async fn wallet_collection_captures_the_shortfall_row() {
    let store = MemoryStore::new();
    let core = core_with(store.clone(), "ALWAYS_SUCCESS");
    let b = authorized_booking(&store, &core, dec!(500.00), "pay_3009").await;
    core.adjust_wallet(b.user_id, None, dec!(500.00), WalletEntryKind::Topup, "topup")
        .await
        .unwrap();

    core.settle_payment(b.id, dec!(620.00)).await.unwrap();

    // Nothing pending remains for the booking once the wallet covered the
    // overage: total collected equals the fare.
    let (gateway_payment, _) = store
        .find_captured_payment(b.id, "pay_3009")
        .await
        .unwrap()
        .unwrap();
    let collected = gateway_payment.captured_amount
        + (dec!(500.00) - core.wallet_balance(b.user_id).await.unwrap());
    assert_eq!(collected, dec!(620.00));
    assert_eq!(
        core.wallet_history(b.user_id).await.unwrap().last().unwrap().amount,
        dec!(-120.00)
    );
}
