use crate::error::GatewayError;
use crate::gateways::{
    CreateOrderRequest, GatewayCapture, GatewayOrder, GatewayRefund, PaymentGateway, RefundRequest,
};

/// Scriptable stand-in for the real gateway, used by tests and offline
/// development. Behaviors: ALWAYS_SUCCESS, DECLINE_ORDER, DECLINE_CAPTURE,
/// DECLINE_REFUND, ALWAYS_TIMEOUT.
pub struct MockGateway {
    pub behavior: String,
}

impl MockGateway {
    pub fn new(behavior: &str) -> Self {
        Self {
            behavior: behavior.to_string(),
        }
    }

    fn declined(&self, op: &str) -> GatewayError {
        GatewayError::Rejected {
            code: "MOCK_DECLINED".to_string(),
            message: format!("mock declined {op}"),
        }
    }
}

#[async_trait::async_trait]
impl PaymentGateway for MockGateway {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn create_order(&self, request: CreateOrderRequest) -> Result<GatewayOrder, GatewayError> {
        match self.behavior.as_str() {
            "ALWAYS_TIMEOUT" => Err(GatewayError::Timeout(0)),
            "DECLINE_ORDER" => Err(self.declined("order")),
            _ => Ok(GatewayOrder {
                order_id: format!("order_mock_{}", request.receipt),
            }),
        }
    }

    async fn capture(
        &self,
        gateway_payment_id: &str,
        _amount_minor: i64,
        _currency: &str,
    ) -> Result<GatewayCapture, GatewayError> {
        match self.behavior.as_str() {
            "ALWAYS_TIMEOUT" => Err(GatewayError::Timeout(0)),
            "DECLINE_CAPTURE" => Err(self.declined("capture")),
            _ => Ok(GatewayCapture {
                capture_id: gateway_payment_id.to_string(),
            }),
        }
    }

    async fn refund(
        &self,
        gateway_payment_id: &str,
        _request: RefundRequest,
    ) -> Result<GatewayRefund, GatewayError> {
        match self.behavior.as_str() {
            "ALWAYS_TIMEOUT" => Err(GatewayError::Timeout(0)),
            "DECLINE_REFUND" => Err(self.declined("refund")),
            _ => Ok(GatewayRefund {
                refund_id: format!("rfnd_mock_{gateway_payment_id}"),
            }),
        }
    }
}
