use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::earnings::EarningsBreakdown;
use crate::domain::payment::PaymentMethod;

/// Read-only view of a booking. This subsystem only ever writes
/// `payment_status`.
#[derive(Debug, Clone, Serialize)]
pub struct BookingRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub provider_id: Uuid,
    pub payment_status: BookingPaymentStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingPaymentStatus {
    Pending,
    Completed,
}

impl BookingPaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingPaymentStatus::Pending => "pending",
            BookingPaymentStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BookingPaymentStatus::Pending),
            "completed" => Some(BookingPaymentStatus::Completed),
            _ => None,
        }
    }
}

/// Terminal outcome of one settlement run: fully settled, or settled with
/// the fare overrun deferred to a payment link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementStatus {
    Settled,
    AdditionalPaymentPending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdditionalPaymentMethod {
    Wallet,
    PaymentLink,
}

/// Customer-side collection summary for one settlement.
#[derive(Debug, Clone, Serialize)]
pub struct SettlementSummary {
    pub payment_method: PaymentMethod,
    pub captured_amount: Decimal,
    pub additional_payment_needed: bool,
    pub additional_amount: Option<Decimal>,
    pub additional_payment_method: Option<AdditionalPaymentMethod>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SettlementOutcome {
    pub booking_id: Uuid,
    pub final_fare: Decimal,
    pub settlement: SettlementSummary,
    pub earnings: EarningsBreakdown,
    pub status: SettlementStatus,
}
