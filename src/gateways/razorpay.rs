use reqwest::StatusCode;
use serde_json::json;

use crate::config::AppConfig;
use crate::error::GatewayError;
use crate::gateways::{
    CreateOrderRequest, GatewayCapture, GatewayOrder, GatewayRefund, PaymentGateway, RefundRequest,
};

pub struct RazorpayGateway {
    pub base_url: String,
    pub key_id: String,
    pub key_secret: String,
    pub timeout_ms: u64,
    pub client: reqwest::Client,
}

impl RazorpayGateway {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            base_url: cfg.razorpay_base_url.clone(),
            key_id: cfg.razorpay_key_id.clone(),
            key_secret: cfg.razorpay_key_secret.clone(),
            timeout_ms: cfg.gateway_timeout_ms,
            client: reqwest::Client::new(),
        }
    }

    async fn post(
        &self,
        url: String,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, GatewayError> {
        let resp = self
            .client
            .post(url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&body)
            .timeout(std::time::Duration::from_millis(self.timeout_ms))
            .send()
            .await;

        match resp {
            Ok(r) if r.status().is_success() => r
                .json()
                .await
                .map_err(|e| GatewayError::Network(e.to_string())),
            Ok(r) => {
                let status = r.status();
                let body = r.text().await.unwrap_or_default();
                if status == StatusCode::REQUEST_TIMEOUT {
                    return Err(GatewayError::Timeout(self.timeout_ms));
                }
                Err(GatewayError::Rejected {
                    code: format!("HTTP_{}", status.as_u16()),
                    message: body.chars().take(200).collect(),
                })
            }
            Err(e) if e.is_timeout() => Err(GatewayError::Timeout(self.timeout_ms)),
            Err(e) => Err(GatewayError::Network(e.to_string())),
        }
    }
}

fn entity_id(value: &serde_json::Value) -> Result<String, GatewayError> {
    value
        .get("id")
        .and_then(|id| id.as_str())
        .map(ToString::to_string)
        .ok_or_else(|| GatewayError::Rejected {
            code: "MALFORMED_RESPONSE".to_string(),
            message: "response body carries no entity id".to_string(),
        })
}

#[async_trait::async_trait]
impl PaymentGateway for RazorpayGateway {
    fn name(&self) -> &'static str {
        "razorpay"
    }

    async fn create_order(&self, request: CreateOrderRequest) -> Result<GatewayOrder, GatewayError> {
        let url = format!("{}/v1/orders", self.base_url);
        // payment_capture: 0 leaves the authorization open for manual capture.
        let body = json!({
            "amount": request.amount_minor,
            "currency": request.currency,
            "receipt": request.receipt,
            "payment_capture": if request.manual_capture { 0 } else { 1 },
            "notes": {
                "customer_name": request.customer.name,
                "customer_email": request.customer.email,
                "customer_phone": request.customer.phone,
            }
        });

        let v = self.post(url, body).await?;
        Ok(GatewayOrder { order_id: entity_id(&v)? })
    }

    async fn capture(
        &self,
        gateway_payment_id: &str,
        amount_minor: i64,
        currency: &str,
    ) -> Result<GatewayCapture, GatewayError> {
        let url = format!("{}/v1/payments/{}/capture", self.base_url, gateway_payment_id);
        let body = json!({
            "amount": amount_minor,
            "currency": currency,
        });

        let v = self.post(url, body).await?;
        Ok(GatewayCapture { capture_id: entity_id(&v)? })
    }

    async fn refund(
        &self,
        gateway_payment_id: &str,
        request: RefundRequest,
    ) -> Result<GatewayRefund, GatewayError> {
        let url = format!("{}/v1/payments/{}/refund", self.base_url, gateway_payment_id);
        let body = json!({
            "amount": request.amount_minor,
            "notes": { "reason": request.notes },
        });

        let v = self.post(url, body).await?;
        Ok(GatewayRefund { refund_id: entity_id(&v)? })
    }
}
