use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::booking::BookingRecord;
use crate::domain::earnings::EarningsRecord;
use crate::domain::payment::{PaymentMethod, PaymentRecord, PaymentStatus, RefundRecord};
use crate::domain::reconciliation::{ReconciliationKind, ReconciliationRecord};
use crate::domain::wallet::{WalletAdjustment, WalletEntryKind, WalletTransaction};
use crate::error::StoreError;

pub mod memory;
pub mod postgres;

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub payment_id: Uuid,
    pub booking_id: Uuid,
    pub user_id: Uuid,
    pub gateway_order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub authorized_amount: Decimal,
    pub captured_amount: Decimal,
    pub currency: String,
    pub captured_at: Option<DateTime<Utc>>,
}

/// Capture writes for one payment, applied in a single transaction. The
/// shortfall row, when present, copies user and currency from the captured
/// parent under the same lock.
#[derive(Debug, Clone)]
pub struct CaptureApply {
    pub booking_id: Uuid,
    pub gateway_payment_id: String,
    pub capture_amount: Decimal,
    pub captured_at: DateTime<Utc>,
    pub shortfall: Option<NewShortfall>,
}

#[derive(Debug, Clone)]
pub struct NewShortfall {
    pub payment_id: Uuid,
    pub amount: Decimal,
}

#[derive(Debug, Clone)]
pub struct CaptureApplied {
    pub payment_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct NewRefund {
    pub refund_id: Uuid,
    pub gateway_refund_id: Option<String>,
    pub amount: Decimal,
    pub reason: String,
    pub refunded_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct RefundApply {
    pub booking_id: Uuid,
    pub gateway_payment_id: String,
    pub refund: NewRefund,
}

#[derive(Debug, Clone)]
pub struct RefundApplied {
    pub payment_id: Uuid,
    pub payment_status: PaymentStatus,
}

#[derive(Debug, Clone)]
pub struct WalletEntry {
    pub user_id: Uuid,
    pub booking_id: Option<Uuid>,
    pub amount: Decimal,
    pub kind: WalletEntryKind,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct ShortfallCollect {
    pub payment_id: Uuid,
    pub user_id: Uuid,
    pub booking_id: Uuid,
    pub amount: Decimal,
    pub description: String,
}

/// The one top-level settlement transaction: customer-side collection writes,
/// the earnings record, and the booking payment_status update commit together
/// or not at all.
#[derive(Debug, Clone)]
pub enum SettlementPersist {
    Capture {
        apply: CaptureApply,
        earnings: EarningsRecord,
    },
    Cash {
        payment: NewPayment,
        earnings: EarningsRecord,
    },
}

impl SettlementPersist {
    pub fn booking_id(&self) -> Uuid {
        match self {
            SettlementPersist::Capture { apply, .. } => apply.booking_id,
            SettlementPersist::Cash { payment, .. } => payment.booking_id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SettlementPersisted {
    pub payment_id: Uuid,
    pub shortfall_payment_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct NewReconciliation {
    pub booking_id: Uuid,
    pub gateway_payment_id: Option<String>,
    pub kind: ReconciliationKind,
    pub amount: Decimal,
    pub currency: String,
    pub payload_json: serde_json::Value,
}

/// Persistence seam for the settlement ledger. Every mutating method is one
/// atomic unit: it either commits all of its writes or none of them. Row
/// locks serialize concurrent work on one booking or one wallet; callers
/// never hold a transaction across a gateway call.
#[async_trait::async_trait]
pub trait SettlementStore: Send + Sync {
    async fn find_booking(&self, booking_id: Uuid) -> Result<Option<BookingRecord>, StoreError>;

    /// Latest gateway-method payment still participating in settlement
    /// (anything but a fully refunded one).
    async fn find_active_payment(
        &self,
        booking_id: Uuid,
    ) -> Result<Option<PaymentRecord>, StoreError>;

    /// Pre-capture record for (booking, gateway payment): matches a row
    /// already carrying the id, or one whose id is still unset.
    async fn find_payment_for_capture(
        &self,
        booking_id: Uuid,
        gateway_payment_id: &str,
    ) -> Result<Option<PaymentRecord>, StoreError>;

    /// Captured (or already refunded) record plus the sum of its processed
    /// refunds.
    async fn find_captured_payment(
        &self,
        booking_id: Uuid,
        gateway_payment_id: &str,
    ) -> Result<Option<(PaymentRecord, Decimal)>, StoreError>;

    async fn refunds_for(&self, payment_id: Uuid) -> Result<Vec<RefundRecord>, StoreError>;

    async fn find_earnings(&self, booking_id: Uuid)
        -> Result<Option<EarningsRecord>, StoreError>;

    async fn wallet_balance(&self, user_id: Uuid) -> Result<Decimal, StoreError>;

    async fn wallet_history(&self, user_id: Uuid) -> Result<Vec<WalletTransaction>, StoreError>;

    async fn insert_payment(&self, new: NewPayment) -> Result<PaymentRecord, StoreError>;

    /// Attaches the verified gateway payment id and moves `created` to
    /// `authorized`. `None` when the booking has no created gateway payment.
    async fn mark_authorized(
        &self,
        booking_id: Uuid,
        gateway_payment_id: &str,
    ) -> Result<Option<PaymentRecord>, StoreError>;

    /// Fails with `Conflict` when the record is no longer pre-capture.
    async fn apply_capture(&self, apply: CaptureApply) -> Result<CaptureApplied, StoreError>;

    /// Re-verifies the cumulative refund bound under the payment row lock;
    /// `Conflict` when the bound would be exceeded or the record is not
    /// refundable.
    async fn apply_refund(&self, apply: RefundApply) -> Result<RefundApplied, StoreError>;

    async fn adjust_wallet(&self, entry: WalletEntry) -> Result<WalletAdjustment, StoreError>;

    /// Wallet debit plus the pending shortfall row's move to `captured`,
    /// atomically. An insufficient balance leaves both untouched.
    async fn collect_shortfall(
        &self,
        collect: ShortfallCollect,
    ) -> Result<WalletAdjustment, StoreError>;

    /// No-op when an earnings record already exists for the booking.
    async fn insert_earnings(&self, record: EarningsRecord) -> Result<(), StoreError>;

    async fn persist_settlement(
        &self,
        persist: SettlementPersist,
    ) -> Result<SettlementPersisted, StoreError>;

    async fn record_reconciliation(&self, new: NewReconciliation) -> Result<(), StoreError>;

    async fn pending_reconciliations(&self) -> Result<Vec<ReconciliationRecord>, StoreError>;

    async fn resolve_reconciliation(&self, id: i64) -> Result<bool, StoreError>;
}
