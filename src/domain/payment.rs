use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Razorpay,
    WalletDeduction,
    Cash,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Razorpay => "razorpay",
            PaymentMethod::WalletDeduction => "wallet_deduction",
            PaymentMethod::Cash => "cash",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "razorpay" => Some(PaymentMethod::Razorpay),
            "wallet_deduction" => Some(PaymentMethod::WalletDeduction),
            "cash" => Some(PaymentMethod::Cash),
            _ => None,
        }
    }
}

/// `Created -> Authorized -> Captured | Refunded` for gateway payments.
/// `Pending` marks a fare-overrun shortfall row awaiting secondary collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Created,
    Authorized,
    Captured,
    Refunded,
    Pending,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Created => "created",
            PaymentStatus::Authorized => "authorized",
            PaymentStatus::Captured => "captured",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::Pending => "pending",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "created" => Some(PaymentStatus::Created),
            "authorized" => Some(PaymentStatus::Authorized),
            "captured" => Some(PaymentStatus::Captured),
            "refunded" => Some(PaymentStatus::Refunded),
            "pending" => Some(PaymentStatus::Pending),
            _ => None,
        }
    }

    /// True while a gateway capture may still be attempted against the record.
    pub fn is_pre_capture(&self) -> bool {
        matches!(self, PaymentStatus::Created | PaymentStatus::Authorized)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentRecord {
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
    pub created_at: DateTime<Utc>,
    pub captured_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
    Processed,
}

impl RefundStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefundStatus::Processed => "processed",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RefundRecord {
    pub refund_id: Uuid,
    pub payment_id: Uuid,
    pub gateway_refund_id: Option<String>,
    pub amount: Decimal,
    pub reason: String,
    pub status: RefundStatus,
    pub refunded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustomerDetails {
    pub name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PreAuthPayment {
    pub payment_id: Uuid,
    pub gateway_order_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub status: PaymentStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct CaptureResult {
    pub payment_id: Uuid,
    pub captured_amount: Decimal,
    pub status: PaymentStatus,
    pub additional_payment_needed: bool,
    pub additional_amount: Option<Decimal>,
    pub additional_payment_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefundResult {
    pub refund_id: Uuid,
    pub payment_id: Uuid,
    pub gateway_refund_id: Option<String>,
    pub amount: Decimal,
    pub payment_status: PaymentStatus,
}
