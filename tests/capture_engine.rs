use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use settlement_core::domain::booking::{BookingPaymentStatus, BookingRecord};
use settlement_core::domain::payment::{CustomerDetails, PaymentStatus};
use settlement_core::domain::reconciliation::ReconciliationKind;
use settlement_core::error::SettlementError;
use settlement_core::gateways::mock::MockGateway;
use settlement_core::pricing::StaticPricingRules;
use settlement_core::service::capture::plan_capture;
use settlement_core::store::memory::MemoryStore;
use settlement_core::store::SettlementStore;
use settlement_core::SettlementCore;

#[test]
fn fare_within_authorization_captures_fare() {
    let plan = plan_capture(dec!(450.00), dec!(500.00)).unwrap();
    assert_eq!(plan.capture_amount, dec!(450.00));
    assert_eq!(plan.shortfall, None);
}

#[test]
fn fare_at_authorization_has_no_shortfall() {
    let plan = plan_capture(dec!(500.00), dec!(500.00)).unwrap();
    assert_eq!(plan.capture_amount, dec!(500.00));
    assert_eq!(plan.shortfall, None);
}

#[test]
fn fare_overrun_splits_into_capture_and_shortfall() {
    let plan = plan_capture(dec!(620.00), dec!(500.00)).unwrap();
    assert_eq!(plan.capture_amount, dec!(500.00));
    assert_eq!(plan.shortfall, Some(dec!(120.00)));
}

#[test]
fn non_positive_amounts_are_rejected() {
    assert!(matches!(
        plan_capture(dec!(0), dec!(500.00)),
        Err(SettlementError::Validation(_))
    ));
    assert!(matches!(
        plan_capture(dec!(-1.00), dec!(500.00)),
        Err(SettlementError::Validation(_))
    ));
    assert!(matches!(
        plan_capture(dec!(100.00), dec!(0)),
        Err(SettlementError::Validation(_))
    ));
}

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
        name: "Vikram Singh".to_string(),
        email: "vikram@example.com".to_string(),
        phone: "9999900002".to_string(),
    }
}

fn core_with(store: MemoryStore, behavior: &str) -> SettlementCore {
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

#[tokio::test]
async fn capture_within_authorization() {
    let store = MemoryStore::new();
    let core = core_with(store.clone(), "ALWAYS_SUCCESS");
    let b = authorized_booking(&store, &core, dec!(500.00), "pay_2001").await;

    let result = core
        .capture_payment(b.id, "pay_2001", dec!(450.00), dec!(500.00))
        .await
        .unwrap();

    assert_eq!(result.captured_amount, dec!(450.00));
    assert_eq!(result.status, PaymentStatus::Captured);
    assert!(!result.additional_payment_needed);
    assert_eq!(result.additional_amount, None);
    assert_eq!(result.additional_payment_id, None);

    let (payment, refunded) = store
        .find_captured_payment(b.id, "pay_2001")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payment.captured_amount, dec!(450.00));
    assert!(payment.captured_at.is_some());
    assert_eq!(refunded, Decimal::ZERO);
}

#[tokio::test]
async fn capture_overrun_creates_pending_shortfall() {
    let store = MemoryStore::new();
    let core = core_with(store.clone(), "ALWAYS_SUCCESS");
    let b = authorized_booking(&store, &core, dec!(500.00), "pay_2002").await;

    let result = core
        .capture_payment(b.id, "pay_2002", dec!(620.00), dec!(500.00))
        .await
        .unwrap();

    assert_eq!(result.captured_amount, dec!(500.00));
    assert!(result.additional_payment_needed);
    assert_eq!(result.additional_amount, Some(dec!(120.00)));
    assert!(result.additional_payment_id.is_some());
}

#[tokio::test]
async fn capture_stamps_gateway_payment_id_when_unset() {
    let store = MemoryStore::new();
    let core = core_with(store.clone(), "ALWAYS_SUCCESS");
    let b = booking();
    store.seed_booking(b.clone()).await;
    core.create_pre_auth_payment(b.id, b.user_id, dec!(300.00), "INR", customer())
        .await
        .unwrap();

    // Never marked authorized: the capture attaches the id itself.
    let result = core
        .capture_payment(b.id, "pay_2003", dec!(300.00), dec!(300.00))
        .await
        .unwrap();
    assert_eq!(result.captured_amount, dec!(300.00));

    let (payment, _) = store
        .find_captured_payment(b.id, "pay_2003")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payment.gateway_payment_id.as_deref(), Some("pay_2003"));
}

#[tokio::test]
async fn capture_rejects_authorized_amount_disagreeing_with_record() {
    let store = MemoryStore::new();
    // A declining gateway turns any capture call into a Gateway error, so a
    // Validation error proves the gateway was never reached.
    let core = core_with(store.clone(), "DECLINE_CAPTURE");
    let b = authorized_booking(&store, &core, dec!(500.00), "pay_2007").await;

    // An inflated claim would capture past the real authorization with no
    // shortfall row; an understated one would invent a shortfall.
    for claimed in [dec!(700.00), dec!(450.00)] {
        let err = core
            .capture_payment(b.id, "pay_2007", dec!(620.00), claimed)
            .await
            .unwrap_err();
        assert!(matches!(err, SettlementError::Validation(_)), "{claimed}");
    }

    let payment = store
        .find_payment_for_capture(b.id, "pay_2007")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payment.status, PaymentStatus::Authorized);
    assert_eq!(payment.authorized_amount, dec!(500.00));
    assert_eq!(payment.captured_amount, dec!(0));
}

#[tokio::test]
async fn capture_is_single_shot_per_payment() {
    let store = MemoryStore::new();
    let core = core_with(store.clone(), "ALWAYS_SUCCESS");
    let b = authorized_booking(&store, &core, dec!(500.00), "pay_2004").await;

    core.capture_payment(b.id, "pay_2004", dec!(500.00), dec!(500.00))
        .await
        .unwrap();

    let err = core
        .capture_payment(b.id, "pay_2004", dec!(500.00), dec!(500.00))
        .await
        .unwrap_err();
    assert!(matches!(err, SettlementError::NotFound { .. }));
}

#[tokio::test]
async fn declined_capture_leaves_record_pre_capture() {
    let store = MemoryStore::new();
    let core = core_with(store.clone(), "DECLINE_CAPTURE");
    let b = authorized_booking(&store, &core, dec!(500.00), "pay_2005").await;

    let err = core
        .capture_payment(b.id, "pay_2005", dec!(450.00), dec!(500.00))
        .await
        .unwrap_err();
    assert!(matches!(err, SettlementError::Gateway(_)));

    let payment = store
        .find_payment_for_capture(b.id, "pay_2005")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payment.status, PaymentStatus::Authorized);
    assert_eq!(payment.captured_amount, dec!(0));
}

#[tokio::test]
async fn unrecorded_capture_lands_in_reconciliation_outbox() {
    let store = MemoryStore::new();
    let core = core_with(store.clone(), "ALWAYS_SUCCESS");
    let b = authorized_booking(&store, &core, dec!(500.00), "pay_2006").await;

    store.fail_next("apply_capture").await;
    let err = core
        .capture_payment(b.id, "pay_2006", dec!(450.00), dec!(500.00))
        .await
        .unwrap_err();
    assert!(matches!(err, SettlementError::Capture(_)));

    let pending = core.pending_reconciliations().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].kind, ReconciliationKind::CaptureUnrecorded);
    assert_eq!(pending[0].amount, dec!(450.00));
    assert_eq!(pending[0].booking_id, b.id);
    assert_eq!(pending[0].gateway_payment_id.as_deref(), Some("pay_2006"));

    assert!(core.resolve_reconciliation(pending[0].id).await.unwrap());
    assert!(!core.resolve_reconciliation(pending[0].id).await.unwrap());
    assert!(core.pending_reconciliations().await.unwrap().is_empty());
}
