use serde::{Deserialize, Serialize};

use crate::domain::payment::CustomerDetails;
use crate::error::GatewayError;

pub mod mock;
pub mod razorpay;

/// Order creation parameters. `manual_capture` keeps the authorization open
/// until an explicit capture, which is what fare pre-authorization needs.
#[derive(Debug, Clone)]
pub struct CreateOrderRequest {
    pub amount_minor: i64,
    pub currency: String,
    pub receipt: String,
    pub manual_capture: bool,
    pub customer: CustomerDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayOrder {
    pub order_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayCapture {
    pub capture_id: String,
}

#[derive(Debug, Clone)]
pub struct RefundRequest {
    pub amount_minor: i64,
    pub notes: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayRefund {
    pub refund_id: String,
}

/// Seam to the external payment gateway. Amounts cross this boundary in
/// integer minor currency units; every call carries a bounded timeout and is
/// never issued inside an open ledger transaction.
#[async_trait::async_trait]
pub trait PaymentGateway: Send + Sync {
    fn name(&self) -> &'static str;

    async fn create_order(&self, request: CreateOrderRequest) -> Result<GatewayOrder, GatewayError>;

    async fn capture(
        &self,
        gateway_payment_id: &str,
        amount_minor: i64,
        currency: &str,
    ) -> Result<GatewayCapture, GatewayError>;

    async fn refund(
        &self,
        gateway_payment_id: &str,
        request: RefundRequest,
    ) -> Result<GatewayRefund, GatewayError>;
}
