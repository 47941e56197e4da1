use std::sync::Arc;

use rust_decimal_macros::dec;
use uuid::Uuid;

use settlement_core::error::SettlementError;
use settlement_core::gateways::mock::MockGateway;
use settlement_core::pricing::{StaticPricingRules, COMMISSION_PERCENTAGE, GST_PERCENTAGE};
use settlement_core::service::earnings::compute_earnings;
use settlement_core::store::memory::MemoryStore;
use settlement_core::SettlementCore;

fn core_with_rules(rules: StaticPricingRules) -> SettlementCore {
    SettlementCore::new(
        Arc::new(MemoryStore::new()),
        Arc::new(MockGateway::new("ALWAYS_SUCCESS")),
        Arc::new(rules),
        "INR".to_string(),
    )
}

#[test]
fn splits_fare_into_commission_gst_and_earnings() {
    let breakdown = compute_earnings(dec!(1000.00), dec!(20), dec!(18));

    assert_eq!(breakdown.platform_commission, dec!(200.00));
    assert_eq!(breakdown.gst_amount, dec!(36.00));
    assert_eq!(breakdown.provider_earnings, dec!(764.00));
}

#[test]
fn parts_sum_back_to_the_fare() {
    for fare in [dec!(1000.00), dec!(999.99), dec!(123.45), dec!(0.03)] {
        let b = compute_earnings(fare, dec!(20), dec!(18));
        assert_eq!(
            b.platform_commission + b.gst_amount + b.provider_earnings,
            fare,
            "fare {fare}"
        );
    }
}

#[test]
fn component_amounts_are_rounded_to_two_decimals() {
    // 123.45 * 20% = 24.69, GST 18% of that = 4.4442 -> 4.44.
    let b = compute_earnings(dec!(123.45), dec!(20), dec!(18));
    assert_eq!(b.platform_commission, dec!(24.69));
    assert_eq!(b.gst_amount, dec!(4.44));
    assert_eq!(b.provider_earnings, dec!(94.32));
}

#[tokio::test]
async fn unset_rules_fall_back_to_defaults() {
    let core = core_with_rules(StaticPricingRules::empty());

    let record = core
        .calculate_provider_earnings(Uuid::new_v4(), Uuid::new_v4(), dec!(1000.00))
        .await
        .unwrap();

    assert_eq!(record.commission_percentage, dec!(20));
    assert_eq!(record.gst_percentage, dec!(18));
    assert_eq!(record.platform_commission, dec!(200.00));
    assert_eq!(record.gst_amount, dec!(36.00));
    assert_eq!(record.provider_earnings, dec!(764.00));
}

#[tokio::test]
async fn configured_rules_override_defaults() {
    let rules = StaticPricingRules::empty()
        .with(COMMISSION_PERCENTAGE, dec!(25))
        .with(GST_PERCENTAGE, dec!(12));
    let core = core_with_rules(rules);

    let record = core
        .calculate_provider_earnings(Uuid::new_v4(), Uuid::new_v4(), dec!(800.00))
        .await
        .unwrap();

    assert_eq!(record.commission_percentage, dec!(25));
    assert_eq!(record.platform_commission, dec!(200.00));
    assert_eq!(record.gst_amount, dec!(24.00));
    assert_eq!(record.provider_earnings, dec!(576.00));
}

#[tokio::test]
async fn repeat_calculation_returns_identical_breakdown() {
    let core = core_with_rules(StaticPricingRules::empty());
    let booking = Uuid::new_v4();
    let provider = Uuid::new_v4();

    let first = core
        .calculate_provider_earnings(booking, provider, dec!(1000.00))
        .await
        .unwrap();
    let second = core
        .calculate_provider_earnings(booking, provider, dec!(1000.00))
        .await
        .unwrap();

    assert_eq!(first.breakdown(), second.breakdown());
    assert_eq!(first.calculated_at, second.calculated_at);
}

#[tokio::test]
async fn persisted_record_keeps_the_rules_in_force_at_settlement() {
    // First write under 20/18; the stored record wins over any later rules.
    let core = core_with_rules(StaticPricingRules::empty());
    let booking = Uuid::new_v4();
    let provider = Uuid::new_v4();
    core.calculate_provider_earnings(booking, provider, dec!(1000.00))
        .await
        .unwrap();

    let changed = SettlementCore::new(
        core.store.clone(),
        Arc::new(MockGateway::new("ALWAYS_SUCCESS")),
        Arc::new(StaticPricingRules::empty().with(COMMISSION_PERCENTAGE, dec!(30))),
        "INR".to_string(),
    );
    let record = changed
        .calculate_provider_earnings(booking, provider, dec!(1000.00))
        .await
        .unwrap();

    assert_eq!(record.commission_percentage, dec!(20));
    assert_eq!(record.provider_earnings, dec!(764.00));
}

#[tokio::test]
async fn non_positive_fare_is_rejected() {
    let core = core_with_rules(StaticPricingRules::empty());

    for fare in [dec!(0), dec!(-100.00)] {
        let err = core
            .calculate_provider_earnings(Uuid::new_v4(), Uuid::new_v4(), fare)
            .await
            .unwrap_err();
        assert!(matches!(err, SettlementError::Validation(_)), "{fare}");
    }
}
