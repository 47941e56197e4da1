use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

use crate::domain::money::to_minor_units;
use crate::domain::payment::{CaptureResult, PaymentStatus};
use crate::domain::reconciliation::ReconciliationKind;
use crate::error::{SettlementError, StoreError};
use crate::gateways::PaymentGateway;
use crate::store::{CaptureApply, NewReconciliation, NewShortfall, SettlementStore};

/// Split of a final fare against the pre-authorized amount. A manual-capture
/// gateway can never capture more than it authorized, so any overage becomes
/// a shortfall collected through a secondary path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturePlan {
    pub capture_amount: Decimal,
    pub shortfall: Option<Decimal>,
}

pub fn plan_capture(
    final_amount: Decimal,
    authorized_amount: Decimal,
) -> Result<CapturePlan, SettlementError> {
    if final_amount <= Decimal::ZERO {
        return Err(SettlementError::Validation(
            "final_amount must be greater than zero".to_string(),
        ));
    }
    if authorized_amount <= Decimal::ZERO {
        return Err(SettlementError::Validation(
            "authorized_amount must be greater than zero".to_string(),
        ));
    }

    if final_amount <= authorized_amount {
        Ok(CapturePlan {
            capture_amount: final_amount,
            shortfall: None,
        })
    } else {
        Ok(CapturePlan {
            capture_amount: authorized_amount,
            shortfall: Some(final_amount - authorized_amount),
        })
    }
}

#[derive(Clone)]
pub struct CaptureService {
    pub store: Arc<dyn SettlementStore>,
    pub gateway: Arc<dyn PaymentGateway>,
}

impl CaptureService {
    pub fn new(store: Arc<dyn SettlementStore>, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { store, gateway }
    }

    /// Captures the planned amount at the gateway, then records the result in
    /// one transaction. The loaded record is authoritative for the authorized
    /// amount; a caller-supplied value that disagrees with it is rejected
    /// before any money moves. If the recording transaction fails after the
    /// gateway accepted the capture, the discrepancy lands in the
    /// reconciliation outbox and the call fails with
    /// `SettlementError::Capture`.
    pub async fn capture_payment(
        &self,
        booking_id: Uuid,
        gateway_payment_id: &str,
        final_amount: Decimal,
        authorized_amount: Decimal,
    ) -> Result<CaptureResult, SettlementError> {
        let payment = self
            .store
            .find_payment_for_capture(booking_id, gateway_payment_id)
            .await?
            .ok_or_else(|| SettlementError::not_found("payment", booking_id))?;

        if authorized_amount != payment.authorized_amount {
            return Err(SettlementError::Validation(format!(
                "authorized_amount {authorized_amount} does not match the record's {}",
                payment.authorized_amount
            )));
        }

        let plan = plan_capture(final_amount, authorized_amount)?;

        let gateway_capture = self
            .gateway
            .capture(
                gateway_payment_id,
                to_minor_units(plan.capture_amount)?,
                &payment.currency,
            )
            .await?;

        let shortfall = plan.shortfall.map(|amount| NewShortfall {
            payment_id: Uuid::new_v4(),
            amount,
        });
        let apply = CaptureApply {
            booking_id,
            gateway_payment_id: gateway_payment_id.to_string(),
            capture_amount: plan.capture_amount,
            captured_at: Utc::now(),
            shortfall: shortfall.clone(),
        };

        let applied = match self.store.apply_capture(apply).await {
            Ok(applied) => applied,
            Err(err) => {
                return Err(record_unrecorded_capture(
                    self.store.as_ref(),
                    booking_id,
                    payment.payment_id,
                    gateway_payment_id,
                    &payment.currency,
                    plan.capture_amount,
                    &gateway_capture.capture_id,
                    err,
                )
                .await)
            }
        };

        tracing::info!(
            "captured {} {} for booking {} (payment {})",
            plan.capture_amount,
            payment.currency,
            booking_id,
            applied.payment_id
        );

        Ok(CaptureResult {
            payment_id: applied.payment_id,
            captured_amount: plan.capture_amount,
            status: PaymentStatus::Captured,
            additional_payment_needed: shortfall.is_some(),
            additional_amount: plan.shortfall,
            additional_payment_id: shortfall.map(|s| s.payment_id),
        })
    }
}

/// Failure path shared with the settlement orchestrator: the gateway accepted
/// a capture the ledger could not record. The outbox row goes out on its own
/// connection so it survives the failed transaction.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn record_unrecorded_capture(
    store: &dyn SettlementStore,
    booking_id: Uuid,
    payment_id: Uuid,
    gateway_payment_id: &str,
    currency: &str,
    amount: Decimal,
    capture_id: &str,
    cause: StoreError,
) -> SettlementError {
    tracing::error!(
        "gateway capture {} for booking {} not recorded: {}",
        capture_id,
        booking_id,
        cause
    );

    let outbox = NewReconciliation {
        booking_id,
        gateway_payment_id: Some(gateway_payment_id.to_string()),
        kind: ReconciliationKind::CaptureUnrecorded,
        amount,
        currency: currency.to_string(),
        payload_json: json!({
            "capture_id": capture_id,
            "payment_id": payment_id,
            "amount": amount,
            "cause": cause.to_string(),
        }),
    };
    if let Err(outbox_err) = store.record_reconciliation(outbox).await {
        tracing::error!(
            "reconciliation write failed for booking {}: {}",
            booking_id,
            outbox_err
        );
    }

    SettlementError::Capture(format!(
        "gateway capture {capture_id} accepted but not recorded: {cause}"
    ))
}
