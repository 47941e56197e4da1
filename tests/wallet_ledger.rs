use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use settlement_core::domain::wallet::{WalletAdjustment, WalletEntryKind};
use settlement_core::error::SettlementError;
use settlement_core::gateways::mock::MockGateway;
use settlement_core::pricing::StaticPricingRules;
use settlement_core::store::memory::MemoryStore;
use settlement_core::SettlementCore;

fn core() -> SettlementCore {
    SettlementCore::new(
        Arc::new(MemoryStore::new()),
        Arc::new(MockGateway::new("ALWAYS_SUCCESS")),
        Arc::new(StaticPricingRules::empty()),
        "INR".to_string(),
    )
}

#[tokio::test]
async fn first_adjustment_creates_account_at_zero() {
    let core = core();
    let user = Uuid::new_v4();

    let receipt = core
        .adjust_wallet(user, None, dec!(250.00), WalletEntryKind::Topup, "first topup")
        .await
        .unwrap();

    assert_eq!(receipt.balance_before, dec!(0));
    assert_eq!(receipt.balance_after, dec!(250.00));
    assert_eq!(receipt.transaction_amount, dec!(250.00));
    assert_eq!(core.wallet_balance(user).await.unwrap(), dec!(250.00));
}

#[tokio::test]
async fn balance_equals_sum_of_applied_deltas() {
    let core = core();
    let user = Uuid::new_v4();

    let deltas = [dec!(500.00), dec!(-120.00), dec!(75.50), dec!(-30.25)];
    for delta in deltas {
        let kind = if delta < Decimal::ZERO {
            WalletEntryKind::FareDeduction
        } else {
            WalletEntryKind::Topup
        };
        core.adjust_wallet(user, None, delta, kind, "ledger entry")
            .await
            .unwrap();
    }

    let expected: Decimal = deltas.iter().copied().sum();
    assert_eq!(core.wallet_balance(user).await.unwrap(), expected);

    // The log alone reconstructs the balance at every point.
    let history = core.wallet_history(user).await.unwrap();
    assert_eq!(history.len(), deltas.len());
    let mut running = Decimal::ZERO;
    for (entry, delta) in history.iter().zip(deltas) {
        assert_eq!(entry.amount, delta);
        assert_eq!(entry.balance_before, running);
        running += delta;
        assert_eq!(entry.balance_after, running);
    }
}

#[tokio::test]
async fn overdraft_debit_is_rejected_and_writes_nothing() {
    let core = core();
    let user = Uuid::new_v4();

    core.adjust_wallet(user, None, dec!(100.00), WalletEntryKind::Topup, "topup")
        .await
        .unwrap();

    let err = core
        .adjust_wallet(
            user,
            None,
            dec!(-150.00),
            WalletEntryKind::FareDeduction,
            "fare",
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SettlementError::InsufficientBalance {
            balance,
            requested,
        } if balance == dec!(100.00) && requested == dec!(150.00)
    ));

    assert_eq!(core.wallet_balance(user).await.unwrap(), dec!(100.00));
    assert_eq!(core.wallet_history(user).await.unwrap().len(), 1);
}

#[tokio::test]
async fn debit_to_exactly_zero_is_allowed() {
    let core = core();
    let user = Uuid::new_v4();

    core.adjust_wallet(user, None, dec!(80.00), WalletEntryKind::Topup, "topup")
        .await
        .unwrap();
    let receipt = core
        .adjust_wallet(
            user,
            None,
            dec!(-80.00),
            WalletEntryKind::FareDeduction,
            "fare",
        )
        .await
        .unwrap();

    assert_eq!(receipt.balance_after, dec!(0));
}

#[tokio::test]
async fn tagged_adjustment_reports_insufficient_balance_as_a_value() {
    let core = core();
    let user = Uuid::new_v4();

    let adjustment = core
        .wallet
        .adjust(user, None, dec!(-50.00), WalletEntryKind::FareDeduction, "fare")
        .await
        .unwrap();

    match adjustment {
        WalletAdjustment::InsufficientBalance { balance, requested } => {
            assert_eq!(balance, dec!(0));
            assert_eq!(requested, dec!(50.00));
        }
        WalletAdjustment::Applied(_) => panic!("debit against an empty wallet must not apply"),
    }
}

#[tokio::test]
async fn zero_adjustment_is_rejected() {
    let core = core();
    let err = core
        .adjust_wallet(
            Uuid::new_v4(),
            None,
            dec!(0),
            WalletEntryKind::Adjustment,
            "noop",
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SettlementError::Validation(_)));
}

#[tokio::test]
async fn wallets_are_isolated_per_user() {
    let core = core();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();

    core.adjust_wallet(alice, None, dec!(300.00), WalletEntryKind::Topup, "topup")
        .await
        .unwrap();

    assert_eq!(core.wallet_balance(alice).await.unwrap(), dec!(300.00));
    assert_eq!(core.wallet_balance(bob).await.unwrap(), dec!(0));
    assert!(core.wallet_history(bob).await.unwrap().is_empty());
}

#[tokio::test]
async fn concurrent_adjustments_serialize_per_user() {
    let core = core();
    let user = Uuid::new_v4();

    let mut handles = Vec::new();
    for _ in 0..20 {
        let core = core.clone();
        handles.push(tokio::spawn(async move {
            core.adjust_wallet(user, None, dec!(10.00), WalletEntryKind::Topup, "topup")
                .await
                .unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(core.wallet_balance(user).await.unwrap(), dec!(200.00));

    // Every snapshot reflects the latest committed balance, so the log forms
    // one unbroken chain.
    let history = core.wallet_history(user).await.unwrap();
    assert_eq!(history.len(), 20);
    for pair in history.windows(2) {
        assert_eq!(pair[0].balance_after, pair[1].balance_before);
    }
}
