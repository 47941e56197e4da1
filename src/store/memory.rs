use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::booking::{BookingPaymentStatus, BookingRecord};
use crate::domain::earnings::EarningsRecord;
use crate::domain::payment::{
    PaymentMethod, PaymentRecord, PaymentStatus, RefundRecord, RefundStatus,
};
use crate::domain::reconciliation::{ReconciliationRecord, ReconciliationStatus};
use crate::domain::wallet::{
    WalletAccount, WalletAdjustment, WalletEntryKind, WalletReceipt, WalletTransaction,
};
use crate::error::StoreError;
use crate::store::{
    CaptureApplied, CaptureApply, NewPayment, NewReconciliation, RefundApplied, RefundApply,
    SettlementPersist, SettlementPersisted, SettlementStore, ShortfallCollect, WalletEntry,
};

#[derive(Default)]
struct MemoryState {
    bookings: HashMap<Uuid, BookingRecord>,
    payments: Vec<PaymentRecord>,
    refunds: Vec<RefundRecord>,
    wallets: HashMap<Uuid, WalletAccount>,
    wallet_log: Vec<WalletTransaction>,
    earnings: HashMap<Uuid, EarningsRecord>,
    outbox: Vec<ReconciliationRecord>,
    next_outbox_id: i64,
    fail_next: Option<String>,
}

/// In-memory `SettlementStore` with the same atomicity contract as the
/// Postgres backend: one lock guards all entities, so every mutating method
/// observes and leaves a consistent whole.
#[derive(Default, Clone)]
pub struct MemoryStore {
    inner: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bookings are owned by the wider application; tests and demos seed
    /// them directly.
    pub async fn seed_booking(&self, booking: BookingRecord) {
        let mut state = self.inner.write().await;
        state.bookings.insert(booking.id, booking);
    }

    /// Arms a one-shot fault: the next call to the named mutating method
    /// fails with `StoreError::Unavailable` before writing anything.
    pub async fn fail_next(&self, op: &str) {
        let mut state = self.inner.write().await;
        state.fail_next = Some(op.to_string());
    }

    fn take_fault(state: &mut MemoryState, op: &str) -> Result<(), StoreError> {
        if state.fail_next.as_deref() == Some(op) {
            state.fail_next = None;
            return Err(StoreError::Unavailable(format!("{op} fault injected")));
        }
        Ok(())
    }

    fn is_pre_capture_gateway(payment: &PaymentRecord, booking_id: Uuid) -> bool {
        payment.booking_id == booking_id
            && payment.method == PaymentMethod::Razorpay
            && payment.status.is_pre_capture()
    }

    /// Mirrors the Postgres lookup: the newest pre-capture gateway row
    /// already carrying the id wins, then the newest row with no id yet.
    fn locate_for_capture(
        state: &MemoryState,
        booking_id: Uuid,
        gateway_payment_id: &str,
    ) -> Option<usize> {
        let attached = state
            .payments
            .iter()
            .enumerate()
            .rev()
            .find(|(_, p)| {
                Self::is_pre_capture_gateway(p, booking_id)
                    && p.gateway_payment_id.as_deref() == Some(gateway_payment_id)
            })
            .map(|(i, _)| i);

        attached.or_else(|| {
            state
                .payments
                .iter()
                .enumerate()
                .rev()
                .find(|(_, p)| {
                    Self::is_pre_capture_gateway(p, booking_id) && p.gateway_payment_id.is_none()
                })
                .map(|(i, _)| i)
        })
    }

    fn capture_locked(
        state: &mut MemoryState,
        apply: &CaptureApply,
    ) -> Result<(Uuid, Option<Uuid>), StoreError> {
        let idx = Self::locate_for_capture(state, apply.booking_id, &apply.gateway_payment_id)
            .ok_or_else(|| StoreError::Conflict("payment is not pre-capture".to_string()))?;

        let (payment_id, user_id, currency) = {
            let payment = &mut state.payments[idx];
            payment.status = PaymentStatus::Captured;
            payment.captured_amount = apply.capture_amount;
            payment.captured_at = Some(apply.captured_at);
            payment.gateway_payment_id = Some(apply.gateway_payment_id.clone());
            (payment.payment_id, payment.user_id, payment.currency.clone())
        };

        let mut shortfall_payment_id = None;
        if let Some(shortfall) = &apply.shortfall {
            state.payments.push(PaymentRecord {
                payment_id: shortfall.payment_id,
                booking_id: apply.booking_id,
                user_id,
                gateway_order_id: None,
                gateway_payment_id: None,
                method: PaymentMethod::WalletDeduction,
                status: PaymentStatus::Pending,
                authorized_amount: shortfall.amount,
                captured_amount: Decimal::ZERO,
                currency,
                created_at: Utc::now(),
                captured_at: None,
            });
            shortfall_payment_id = Some(shortfall.payment_id);
        }

        Ok((payment_id, shortfall_payment_id))
    }

    fn insert_payment_locked(state: &mut MemoryState, new: &NewPayment) -> PaymentRecord {
        let record = PaymentRecord {
            payment_id: new.payment_id,
            booking_id: new.booking_id,
            user_id: new.user_id,
            gateway_order_id: new.gateway_order_id.clone(),
            gateway_payment_id: new.gateway_payment_id.clone(),
            method: new.method,
            status: new.status,
            authorized_amount: new.authorized_amount,
            captured_amount: new.captured_amount,
            currency: new.currency.clone(),
            created_at: Utc::now(),
            captured_at: new.captured_at,
        };
        state.payments.push(record.clone());
        record
    }

    fn wallet_adjust_locked(state: &mut MemoryState, entry: &WalletEntry) -> WalletAdjustment {
        let now = Utc::now();
        let wallet = state
            .wallets
            .entry(entry.user_id)
            .or_insert_with(|| WalletAccount {
                user_id: entry.user_id,
                balance: Decimal::ZERO,
                created_at: now,
                updated_at: now,
            });

        let balance_before = wallet.balance;
        let balance_after = balance_before + entry.amount;

        if entry.amount < Decimal::ZERO && balance_after < Decimal::ZERO {
            return WalletAdjustment::InsufficientBalance {
                balance: balance_before,
                requested: entry.amount.abs(),
            };
        }

        wallet.balance = balance_after;
        wallet.updated_at = now;
        state.wallet_log.push(WalletTransaction {
            user_id: entry.user_id,
            booking_id: entry.booking_id,
            amount: entry.amount,
            kind: entry.kind,
            description: entry.description.clone(),
            balance_before,
            balance_after,
            created_at: now,
        });

        WalletAdjustment::Applied(WalletReceipt {
            balance_before,
            balance_after,
            transaction_amount: entry.amount,
        })
    }
}

#[async_trait::async_trait]
impl SettlementStore for MemoryStore {
    async fn find_booking(&self, booking_id: Uuid) -> Result<Option<BookingRecord>, StoreError> {
        let state = self.inner.read().await;
        Ok(state.bookings.get(&booking_id).cloned())
    }

    async fn find_active_payment(
        &self,
        booking_id: Uuid,
    ) -> Result<Option<PaymentRecord>, StoreError> {
        let state = self.inner.read().await;
        Ok(state
            .payments
            .iter()
            .rev()
            .find(|p| {
                p.booking_id == booking_id
                    && p.method == PaymentMethod::Razorpay
                    && p.status != PaymentStatus::Refunded
            })
            .cloned())
    }

    async fn find_payment_for_capture(
        &self,
        booking_id: Uuid,
        gateway_payment_id: &str,
    ) -> Result<Option<PaymentRecord>, StoreError> {
        let state = self.inner.read().await;
        Ok(Self::locate_for_capture(&state, booking_id, gateway_payment_id)
            .map(|idx| state.payments[idx].clone()))
    }

    async fn find_captured_payment(
        &self,
        booking_id: Uuid,
        gateway_payment_id: &str,
    ) -> Result<Option<(PaymentRecord, Decimal)>, StoreError> {
        let state = self.inner.read().await;
        let found = state.payments.iter().find(|p| {
            p.booking_id == booking_id
                && p.gateway_payment_id.as_deref() == Some(gateway_payment_id)
                && matches!(p.status, PaymentStatus::Captured | PaymentStatus::Refunded)
        });

        Ok(found.map(|p| {
            let refunded = state
                .refunds
                .iter()
                .filter(|r| r.payment_id == p.payment_id)
                .map(|r| r.amount)
                .sum::<Decimal>();
            (p.clone(), refunded)
        }))
    }

    async fn refunds_for(&self, payment_id: Uuid) -> Result<Vec<RefundRecord>, StoreError> {
        let state = self.inner.read().await;
        Ok(state
            .refunds
            .iter()
            .filter(|r| r.payment_id == payment_id)
            .cloned()
            .collect())
    }

    async fn find_earnings(
        &self,
        booking_id: Uuid,
    ) -> Result<Option<EarningsRecord>, StoreError> {
        let state = self.inner.read().await;
        Ok(state.earnings.get(&booking_id).cloned())
    }

    async fn wallet_balance(&self, user_id: Uuid) -> Result<Decimal, StoreError> {
        let state = self.inner.read().await;
        Ok(state
            .wallets
            .get(&user_id)
            .map(|w| w.balance)
            .unwrap_or(Decimal::ZERO))
    }

    async fn wallet_history(&self, user_id: Uuid) -> Result<Vec<WalletTransaction>, StoreError> {
        let state = self.inner.read().await;
        Ok(state
            .wallet_log
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn insert_payment(&self, new: NewPayment) -> Result<PaymentRecord, StoreError> {
        let mut state = self.inner.write().await;
        Self::take_fault(&mut state, "insert_payment")?;
        Ok(Self::insert_payment_locked(&mut state, &new))
    }

    async fn mark_authorized(
        &self,
        booking_id: Uuid,
        gateway_payment_id: &str,
    ) -> Result<Option<PaymentRecord>, StoreError> {
        let mut state = self.inner.write().await;
        let found = state.payments.iter_mut().rev().find(|p| {
            p.booking_id == booking_id
                && p.method == PaymentMethod::Razorpay
                && p.status == PaymentStatus::Created
        });

        Ok(found.map(|payment| {
            payment.gateway_payment_id = Some(gateway_payment_id.to_string());
            payment.status = PaymentStatus::Authorized;
            payment.clone()
        }))
    }

    async fn apply_capture(&self, apply: CaptureApply) -> Result<CaptureApplied, StoreError> {
        let mut state = self.inner.write().await;
        Self::take_fault(&mut state, "apply_capture")?;
        let (payment_id, _) = Self::capture_locked(&mut state, &apply)?;
        Ok(CaptureApplied { payment_id })
    }

    async fn apply_refund(&self, apply: RefundApply) -> Result<RefundApplied, StoreError> {
        let mut state = self.inner.write().await;
        Self::take_fault(&mut state, "apply_refund")?;

        let (payment_id, captured_amount) = state
            .payments
            .iter()
            .find(|p| {
                p.booking_id == apply.booking_id
                    && p.gateway_payment_id.as_deref() == Some(apply.gateway_payment_id.as_str())
                    && matches!(p.status, PaymentStatus::Captured | PaymentStatus::Refunded)
            })
            .map(|p| (p.payment_id, p.captured_amount))
            .ok_or_else(|| StoreError::Conflict("payment is not refundable".to_string()))?;

        let refunded = state
            .refunds
            .iter()
            .filter(|r| r.payment_id == payment_id)
            .map(|r| r.amount)
            .sum::<Decimal>();
        if refunded + apply.refund.amount > captured_amount {
            return Err(StoreError::Conflict(
                "refund would exceed captured amount".to_string(),
            ));
        }

        state.refunds.push(RefundRecord {
            refund_id: apply.refund.refund_id,
            payment_id,
            gateway_refund_id: apply.refund.gateway_refund_id.clone(),
            amount: apply.refund.amount,
            reason: apply.refund.reason.clone(),
            status: RefundStatus::Processed,
            refunded_at: apply.refund.refunded_at,
        });

        let payment_status = if refunded + apply.refund.amount == captured_amount {
            if let Some(payment) = state
                .payments
                .iter_mut()
                .find(|p| p.payment_id == payment_id)
            {
                payment.status = PaymentStatus::Refunded;
            }
            PaymentStatus::Refunded
        } else {
            PaymentStatus::Captured
        };

        Ok(RefundApplied {
            payment_id,
            payment_status,
        })
    }

    async fn adjust_wallet(&self, entry: WalletEntry) -> Result<WalletAdjustment, StoreError> {
        let mut state = self.inner.write().await;
        Self::take_fault(&mut state, "adjust_wallet")?;
        Ok(Self::wallet_adjust_locked(&mut state, &entry))
    }

    async fn collect_shortfall(
        &self,
        collect: ShortfallCollect,
    ) -> Result<WalletAdjustment, StoreError> {
        let mut state = self.inner.write().await;
        Self::take_fault(&mut state, "collect_shortfall")?;

        // Verified before the debit so a missing row leaves the wallet alone.
        let idx = state
            .payments
            .iter()
            .position(|p| {
                p.payment_id == collect.payment_id && p.status == PaymentStatus::Pending
            })
            .ok_or_else(|| StoreError::Conflict("shortfall payment is not pending".to_string()))?;

        let entry = WalletEntry {
            user_id: collect.user_id,
            booking_id: Some(collect.booking_id),
            amount: -collect.amount,
            kind: WalletEntryKind::FareDeduction,
            description: collect.description.clone(),
        };
        let adjustment = Self::wallet_adjust_locked(&mut state, &entry);

        if let WalletAdjustment::Applied(_) = &adjustment {
            let payment = &mut state.payments[idx];
            payment.status = PaymentStatus::Captured;
            payment.captured_amount = collect.amount;
            payment.captured_at = Some(Utc::now());
        }

        Ok(adjustment)
    }

    async fn insert_earnings(&self, record: EarningsRecord) -> Result<(), StoreError> {
        let mut state = self.inner.write().await;
        Self::take_fault(&mut state, "insert_earnings")?;
        state.earnings.entry(record.booking_id).or_insert(record);
        Ok(())
    }

    async fn persist_settlement(
        &self,
        persist: SettlementPersist,
    ) -> Result<SettlementPersisted, StoreError> {
        let mut state = self.inner.write().await;
        Self::take_fault(&mut state, "persist_settlement")?;

        let booking_id = persist.booking_id();
        if !state.bookings.contains_key(&booking_id) {
            return Err(StoreError::Conflict(format!("booking {booking_id} missing")));
        }

        let persisted = match &persist {
            SettlementPersist::Capture { apply, earnings } => {
                let (payment_id, shortfall_payment_id) =
                    Self::capture_locked(&mut state, apply)?;
                state
                    .earnings
                    .entry(earnings.booking_id)
                    .or_insert_with(|| earnings.clone());
                SettlementPersisted {
                    payment_id,
                    shortfall_payment_id,
                }
            }
            SettlementPersist::Cash { payment, earnings } => {
                let record = Self::insert_payment_locked(&mut state, payment);
                state
                    .earnings
                    .entry(earnings.booking_id)
                    .or_insert_with(|| earnings.clone());
                SettlementPersisted {
                    payment_id: record.payment_id,
                    shortfall_payment_id: None,
                }
            }
        };

        if let Some(booking) = state.bookings.get_mut(&booking_id) {
            booking.payment_status = BookingPaymentStatus::Completed;
        }

        Ok(persisted)
    }

    async fn record_reconciliation(&self, new: NewReconciliation) -> Result<(), StoreError> {
        let mut state = self.inner.write().await;
        state.next_outbox_id += 1;
        let id = state.next_outbox_id;
        state.outbox.push(ReconciliationRecord {
            id,
            booking_id: new.booking_id,
            gateway_payment_id: new.gateway_payment_id,
            kind: new.kind,
            amount: new.amount,
            currency: new.currency,
            payload_json: new.payload_json,
            status: ReconciliationStatus::Pending,
            created_at: Utc::now(),
            resolved_at: None,
        });
        Ok(())
    }

    async fn pending_reconciliations(&self) -> Result<Vec<ReconciliationRecord>, StoreError> {
        let state = self.inner.read().await;
        Ok(state
            .outbox
            .iter()
            .filter(|r| r.status == ReconciliationStatus::Pending)
            .cloned()
            .collect())
    }

    async fn resolve_reconciliation(&self, id: i64) -> Result<bool, StoreError> {
        let mut state = self.inner.write().await;
        let found = state
            .outbox
            .iter_mut()
            .find(|r| r.id == id && r.status == ReconciliationStatus::Pending);

        Ok(match found {
            Some(record) => {
                record.status = ReconciliationStatus::Resolved;
                record.resolved_at = Some(Utc::now());
                true
            }
            None => false,
        })
    }
}
