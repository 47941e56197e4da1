use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::wallet::{WalletAdjustment, WalletEntryKind, WalletTransaction};
use crate::error::SettlementError;
use crate::store::{SettlementStore, ShortfallCollect, WalletEntry};

#[derive(Clone)]
pub struct WalletService {
    pub store: Arc<dyn SettlementStore>,
}

impl WalletService {
    pub fn new(store: Arc<dyn SettlementStore>) -> Self {
        Self { store }
    }

    /// Applies a signed balance delta and appends the matching ledger entry.
    /// A debit that would drive the balance negative changes nothing and
    /// comes back as `WalletAdjustment::InsufficientBalance`.
    pub async fn adjust(
        &self,
        user_id: Uuid,
        booking_id: Option<Uuid>,
        amount: Decimal,
        kind: WalletEntryKind,
        description: &str,
    ) -> Result<WalletAdjustment, SettlementError> {
        if amount == Decimal::ZERO {
            return Err(SettlementError::Validation(
                "amount must be non-zero".to_string(),
            ));
        }

        let adjustment = self
            .store
            .adjust_wallet(WalletEntry {
                user_id,
                booking_id,
                amount,
                kind,
                description: description.to_string(),
            })
            .await?;

        match &adjustment {
            WalletAdjustment::Applied(receipt) => {
                tracing::info!(
                    "wallet {} {} {} (balance {} -> {})",
                    user_id,
                    kind.as_str(),
                    amount,
                    receipt.balance_before,
                    receipt.balance_after
                );
            }
            WalletAdjustment::InsufficientBalance { balance, requested } => {
                tracing::warn!(
                    "wallet {} debit {} rejected, balance {}",
                    user_id,
                    requested,
                    balance
                );
            }
        }

        Ok(adjustment)
    }

    /// Settlement-side shortfall debit: the wallet debit and the pending
    /// shortfall row's move to `captured` commit together or not at all.
    pub async fn collect_shortfall(
        &self,
        payment_id: Uuid,
        user_id: Uuid,
        booking_id: Uuid,
        amount: Decimal,
    ) -> Result<WalletAdjustment, SettlementError> {
        if amount <= Decimal::ZERO {
            return Err(SettlementError::Validation(
                "shortfall amount must be greater than zero".to_string(),
            ));
        }

        let adjustment = self
            .store
            .collect_shortfall(ShortfallCollect {
                payment_id,
                user_id,
                booking_id,
                amount,
                description: format!("Fare shortfall for booking {booking_id}"),
            })
            .await?;

        if let WalletAdjustment::InsufficientBalance { balance, .. } = &adjustment {
            tracing::warn!(
                "wallet {} cannot cover shortfall {} for booking {} (balance {})",
                user_id,
                amount,
                booking_id,
                balance
            );
        }

        Ok(adjustment)
    }

    pub async fn balance(&self, user_id: Uuid) -> Result<Decimal, SettlementError> {
        Ok(self.store.wallet_balance(user_id).await?)
    }

    /// Append-only transaction log, oldest first; the before/after snapshots
    /// reconstruct the balance at every point.
    pub async fn history(&self, user_id: Uuid) -> Result<Vec<WalletTransaction>, SettlementError> {
        Ok(self.store.wallet_history(user_id).await?)
    }
}
