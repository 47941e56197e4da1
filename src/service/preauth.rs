use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::money::to_minor_units;
use crate::domain::payment::{
    CustomerDetails, PaymentMethod, PaymentRecord, PaymentStatus, PreAuthPayment,
};
use crate::error::SettlementError;
use crate::gateways::{CreateOrderRequest, PaymentGateway};
use crate::store::{NewPayment, SettlementStore};

#[derive(Clone)]
pub struct PreAuthService {
    pub store: Arc<dyn SettlementStore>,
    pub gateway: Arc<dyn PaymentGateway>,
}

impl PreAuthService {
    pub fn new(store: Arc<dyn SettlementStore>, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { store, gateway }
    }

    /// Creates a manual-capture gateway order for the fare estimate and the
    /// `created` payment record behind it. No money moves yet; the customer's
    /// authorization against this order is attached later by
    /// `mark_authorized`.
    pub async fn create_pre_auth_payment(
        &self,
        booking_id: Uuid,
        user_id: Uuid,
        estimated_amount: Decimal,
        currency: &str,
        customer: CustomerDetails,
    ) -> Result<PreAuthPayment, SettlementError> {
        validate_pre_auth(estimated_amount, currency)?;

        let order = self
            .gateway
            .create_order(CreateOrderRequest {
                amount_minor: to_minor_units(estimated_amount)?,
                currency: currency.to_string(),
                receipt: format!("booking_{booking_id}"),
                manual_capture: true,
                customer,
            })
            .await?;

        let record = self
            .store
            .insert_payment(NewPayment {
                payment_id: Uuid::new_v4(),
                booking_id,
                user_id,
                gateway_order_id: Some(order.order_id.clone()),
                gateway_payment_id: None,
                method: PaymentMethod::Razorpay,
                status: PaymentStatus::Created,
                authorized_amount: estimated_amount,
                captured_amount: Decimal::ZERO,
                currency: currency.to_string(),
                captured_at: None,
            })
            .await?;

        tracing::info!(
            "pre-auth order {} created for booking {} ({} {})",
            order.order_id,
            booking_id,
            estimated_amount,
            currency
        );

        Ok(PreAuthPayment {
            payment_id: record.payment_id,
            gateway_order_id: order.order_id,
            amount: estimated_amount,
            currency: record.currency,
            status: record.status,
        })
    }

    /// Attaches the verified gateway payment id to the booking's `created`
    /// record and moves it to `authorized`. Checkout verification feeds this
    /// once the customer completes payment authorization.
    pub async fn mark_authorized(
        &self,
        booking_id: Uuid,
        gateway_payment_id: &str,
    ) -> Result<PaymentRecord, SettlementError> {
        let updated = self
            .store
            .mark_authorized(booking_id, gateway_payment_id)
            .await?
            .ok_or_else(|| SettlementError::not_found("payment", booking_id))?;

        tracing::info!(
            "payment {} authorized for booking {}",
            gateway_payment_id,
            booking_id
        );

        Ok(updated)
    }
}

fn validate_pre_auth(estimated_amount: Decimal, currency: &str) -> Result<(), SettlementError> {
    if estimated_amount <= Decimal::ZERO {
        return Err(SettlementError::Validation(
            "estimated_amount must be greater than zero".to_string(),
        ));
    }
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(SettlementError::Validation(format!(
            "currency must be a 3-letter code, got {currency:?}"
        )));
    }
    Ok(())
}
