use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

use crate::domain::money::to_minor_units;
use crate::domain::payment::RefundResult;
use crate::domain::reconciliation::ReconciliationKind;
use crate::error::{SettlementError, StoreError};
use crate::gateways::{PaymentGateway, RefundRequest};
use crate::store::{NewReconciliation, NewRefund, RefundApply, SettlementStore};

#[derive(Clone)]
pub struct RefundService {
    pub store: Arc<dyn SettlementStore>,
    pub gateway: Arc<dyn PaymentGateway>,
}

impl RefundService {
    pub fn new(store: Arc<dyn SettlementStore>, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { store, gateway }
    }

    /// Refunds part or all of a captured payment. The cumulative bound is
    /// checked before the gateway call and re-verified inside the recording
    /// transaction, so concurrent refunds cannot overshoot the captured
    /// amount.
    pub async fn process_refund(
        &self,
        booking_id: Uuid,
        gateway_payment_id: &str,
        refund_amount: Decimal,
        reason: &str,
    ) -> Result<RefundResult, SettlementError> {
        if refund_amount <= Decimal::ZERO {
            return Err(SettlementError::Validation(
                "refund_amount must be greater than zero".to_string(),
            ));
        }

        let (payment, refunded) = self
            .store
            .find_captured_payment(booking_id, gateway_payment_id)
            .await?
            .ok_or_else(|| SettlementError::not_found("payment", booking_id))?;

        let refundable = payment.captured_amount - refunded;
        if refund_amount > refundable {
            return Err(SettlementError::Validation(format!(
                "refund {refund_amount} exceeds refundable {refundable}"
            )));
        }

        let gateway_refund = self
            .gateway
            .refund(
                gateway_payment_id,
                RefundRequest {
                    amount_minor: to_minor_units(refund_amount)?,
                    notes: reason.to_string(),
                },
            )
            .await?;

        let refund = NewRefund {
            refund_id: Uuid::new_v4(),
            gateway_refund_id: Some(gateway_refund.refund_id.clone()),
            amount: refund_amount,
            reason: reason.to_string(),
            refunded_at: Utc::now(),
        };
        let apply = RefundApply {
            booking_id,
            gateway_payment_id: gateway_payment_id.to_string(),
            refund: refund.clone(),
        };

        let applied = match self.store.apply_refund(apply).await {
            Ok(applied) => applied,
            Err(err) => {
                return Err(self
                    .unrecorded_refund(
                        booking_id,
                        gateway_payment_id,
                        refund_amount,
                        &payment.currency,
                        &gateway_refund.refund_id,
                        err,
                    )
                    .await)
            }
        };

        tracing::info!(
            "refunded {} {} for booking {} (payment {} now {})",
            refund_amount,
            payment.currency,
            booking_id,
            applied.payment_id,
            applied.payment_status.as_str()
        );

        Ok(RefundResult {
            refund_id: refund.refund_id,
            payment_id: applied.payment_id,
            gateway_refund_id: refund.gateway_refund_id,
            amount: refund_amount,
            payment_status: applied.payment_status,
        })
    }

    async fn unrecorded_refund(
        &self,
        booking_id: Uuid,
        gateway_payment_id: &str,
        amount: Decimal,
        currency: &str,
        gateway_refund_id: &str,
        cause: StoreError,
    ) -> SettlementError {
        tracing::error!(
            "gateway refund {} for booking {} not recorded: {}",
            gateway_refund_id,
            booking_id,
            cause
        );

        let outbox = NewReconciliation {
            booking_id,
            gateway_payment_id: Some(gateway_payment_id.to_string()),
            kind: ReconciliationKind::RefundUnrecorded,
            amount,
            currency: currency.to_string(),
            payload_json: json!({
                "gateway_refund_id": gateway_refund_id,
                "amount": amount,
                "cause": cause.to_string(),
            }),
        };
        if let Err(outbox_err) = self.store.record_reconciliation(outbox).await {
            tracing::error!(
                "reconciliation write failed for booking {}: {}",
                booking_id,
                outbox_err
            );
        }

        SettlementError::Refund(format!(
            "gateway refund {gateway_refund_id} accepted but not recorded: {cause}"
        ))
    }
}
