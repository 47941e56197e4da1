use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SettlementError;

#[derive(Debug, Clone, Serialize)]
pub struct WalletAccount {
    pub user_id: Uuid,
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletEntryKind {
    Topup,
    Refund,
    FareDeduction,
    Adjustment,
}

impl WalletEntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WalletEntryKind::Topup => "topup",
            WalletEntryKind::Refund => "refund",
            WalletEntryKind::FareDeduction => "fare_deduction",
            WalletEntryKind::Adjustment => "adjustment",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "topup" => Some(WalletEntryKind::Topup),
            "refund" => Some(WalletEntryKind::Refund),
            "fare_deduction" => Some(WalletEntryKind::FareDeduction),
            "adjustment" => Some(WalletEntryKind::Adjustment),
            _ => None,
        }
    }
}

/// One append-only ledger entry; `amount` is the signed delta and the
/// before/after snapshots let the balance be audited from the log alone.
#[derive(Debug, Clone, Serialize)]
pub struct WalletTransaction {
    pub user_id: Uuid,
    pub booking_id: Option<Uuid>,
    pub amount: Decimal,
    pub kind: WalletEntryKind,
    pub description: String,
    pub balance_before: Decimal,
    pub balance_after: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WalletReceipt {
    pub balance_before: Decimal,
    pub balance_after: Decimal,
    pub transaction_amount: Decimal,
}

/// Outcome of a wallet adjustment. A debit that would drive the balance
/// negative is a value, not an error, so the settlement orchestrator can
/// branch into its payment-link fallback without catching anything.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WalletAdjustment {
    Applied(WalletReceipt),
    InsufficientBalance { balance: Decimal, requested: Decimal },
}

impl WalletAdjustment {
    pub fn into_result(self) -> Result<WalletReceipt, SettlementError> {
        match self {
            WalletAdjustment::Applied(receipt) => Ok(receipt),
            WalletAdjustment::InsufficientBalance { balance, requested } => {
                Err(SettlementError::InsufficientBalance { balance, requested })
            }
        }
    }
}
