use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Why a reconciliation row exists: the gateway accepted the call named by
/// the kind, but the ledger write that should have recorded it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationKind {
    CaptureUnrecorded,
    RefundUnrecorded,
}

impl ReconciliationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconciliationKind::CaptureUnrecorded => "capture_unrecorded",
            ReconciliationKind::RefundUnrecorded => "refund_unrecorded",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "capture_unrecorded" => Some(ReconciliationKind::CaptureUnrecorded),
            "refund_unrecorded" => Some(ReconciliationKind::RefundUnrecorded),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationStatus {
    Pending,
    Resolved,
}

impl ReconciliationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconciliationStatus::Pending => "pending",
            ReconciliationStatus::Resolved => "resolved",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ReconciliationStatus::Pending),
            "resolved" => Some(ReconciliationStatus::Resolved),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconciliationRecord {
    pub id: i64,
    pub booking_id: Uuid,
    pub gateway_payment_id: Option<String>,
    pub kind: ReconciliationKind,
    pub amount: Decimal,
    pub currency: String,
    pub payload_json: serde_json::Value,
    pub status: ReconciliationStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}
