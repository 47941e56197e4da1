use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::booking::{
    AdditionalPaymentMethod, BookingPaymentStatus, BookingRecord, SettlementOutcome,
    SettlementStatus, SettlementSummary,
};
use crate::domain::money::to_minor_units;
use crate::domain::payment::{PaymentMethod, PaymentRecord, PaymentStatus};
use crate::domain::wallet::WalletAdjustment;
use crate::error::SettlementError;
use crate::gateways::PaymentGateway;
use crate::service::capture::{plan_capture, record_unrecorded_capture};
use crate::service::earnings::EarningsService;
use crate::service::wallet::WalletService;
use crate::store::{CaptureApply, NewPayment, NewShortfall, SettlementPersist, SettlementStore};

#[derive(Clone)]
pub struct SettlementService {
    pub store: Arc<dyn SettlementStore>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub wallet: WalletService,
    pub earnings: EarningsService,
    pub currency: String,
}

impl SettlementService {
    pub fn new(
        store: Arc<dyn SettlementStore>,
        gateway: Arc<dyn PaymentGateway>,
        wallet: WalletService,
        earnings: EarningsService,
        currency: String,
    ) -> Self {
        Self {
            store,
            gateway,
            wallet,
            earnings,
            currency,
        }
    }

    /// Settles a finished booking for its final fare: collects the customer
    /// side, records provider earnings, and marks the booking paid, all in
    /// one transaction. A fare overrun beyond the pre-authorization is
    /// collected from the wallet when the balance covers it and deferred to a
    /// payment link when it does not; a deferred overrun never fails the
    /// settlement.
    pub async fn settle_payment(
        &self,
        booking_id: Uuid,
        final_fare: Decimal,
    ) -> Result<SettlementOutcome, SettlementError> {
        if final_fare <= Decimal::ZERO {
            return Err(SettlementError::Validation(
                "final_fare must be greater than zero".to_string(),
            ));
        }

        let booking = self
            .store
            .find_booking(booking_id)
            .await?
            .ok_or_else(|| SettlementError::not_found("booking", booking_id))?;
        if booking.payment_status == BookingPaymentStatus::Completed {
            return Err(SettlementError::Validation(format!(
                "booking {booking_id} is already settled"
            )));
        }

        match self.store.find_active_payment(booking_id).await? {
            Some(payment) if payment.status == PaymentStatus::Captured => {
                Err(SettlementError::Validation(format!(
                    "payment for booking {booking_id} is already captured"
                )))
            }
            Some(payment)
                if payment.gateway_payment_id.is_some() && payment.status.is_pre_capture() =>
            {
                self.settle_gateway(&booking, &payment, final_fare).await
            }
            // No usable gateway authorization: the fare was collected
            // offline, record it as cash.
            _ => self.settle_cash(&booking, final_fare).await,
        }
    }

    async fn settle_gateway(
        &self,
        booking: &BookingRecord,
        payment: &PaymentRecord,
        final_fare: Decimal,
    ) -> Result<SettlementOutcome, SettlementError> {
        let Some(gateway_payment_id) = payment.gateway_payment_id.clone() else {
            return Err(SettlementError::not_found("gateway payment", payment.payment_id));
        };

        let plan = plan_capture(final_fare, payment.authorized_amount)?;
        let breakdown = self.earnings.breakdown(final_fare).await?;

        let capture = self
            .gateway
            .capture(
                &gateway_payment_id,
                to_minor_units(plan.capture_amount)?,
                &payment.currency,
            )
            .await?;

        let shortfall = plan.shortfall.map(|amount| NewShortfall {
            payment_id: Uuid::new_v4(),
            amount,
        });
        let apply = CaptureApply {
            booking_id: booking.id,
            gateway_payment_id: gateway_payment_id.clone(),
            capture_amount: plan.capture_amount,
            captured_at: Utc::now(),
            shortfall,
        };
        let earnings = breakdown
            .clone()
            .into_record(booking.id, booking.provider_id);

        let persisted = match self
            .store
            .persist_settlement(SettlementPersist::Capture { apply, earnings })
            .await
        {
            Ok(persisted) => persisted,
            Err(err) => {
                return Err(record_unrecorded_capture(
                    self.store.as_ref(),
                    booking.id,
                    payment.payment_id,
                    &gateway_payment_id,
                    &payment.currency,
                    plan.capture_amount,
                    &capture.capture_id,
                    err,
                )
                .await)
            }
        };

        let mut summary = SettlementSummary {
            payment_method: PaymentMethod::Razorpay,
            captured_amount: plan.capture_amount,
            additional_payment_needed: false,
            additional_amount: None,
            additional_payment_method: None,
        };
        let mut status = SettlementStatus::Settled;

        if let (Some(amount), Some(shortfall_payment_id)) =
            (plan.shortfall, persisted.shortfall_payment_id)
        {
            summary.additional_payment_needed = true;
            summary.additional_amount = Some(amount);

            match self
                .wallet
                .collect_shortfall(shortfall_payment_id, booking.user_id, booking.id, amount)
                .await
            {
                Ok(WalletAdjustment::Applied(_)) => {
                    summary.additional_payment_method = Some(AdditionalPaymentMethod::Wallet);
                }
                Ok(WalletAdjustment::InsufficientBalance { .. }) => {
                    summary.additional_payment_method = Some(AdditionalPaymentMethod::PaymentLink);
                    status = SettlementStatus::AdditionalPaymentPending;
                }
                // The settlement itself is committed; a wallet-side failure
                // only defers the overrun.
                Err(err) => {
                    tracing::warn!(
                        "wallet collection for booking {} failed, deferring {} to payment link: {}",
                        booking.id,
                        amount,
                        err
                    );
                    summary.additional_payment_method = Some(AdditionalPaymentMethod::PaymentLink);
                    status = SettlementStatus::AdditionalPaymentPending;
                }
            }
        }

        tracing::info!(
            "booking {} settled: captured {} {} via {}, additional {:?}",
            booking.id,
            plan.capture_amount,
            payment.currency,
            self.gateway.name(),
            summary.additional_amount
        );

        Ok(SettlementOutcome {
            booking_id: booking.id,
            final_fare,
            settlement: summary,
            earnings: breakdown,
            status,
        })
    }

    async fn settle_cash(
        &self,
        booking: &BookingRecord,
        final_fare: Decimal,
    ) -> Result<SettlementOutcome, SettlementError> {
        let breakdown = self.earnings.breakdown(final_fare).await?;
        let earnings = breakdown
            .clone()
            .into_record(booking.id, booking.provider_id);

        let payment = NewPayment {
            payment_id: Uuid::new_v4(),
            booking_id: booking.id,
            user_id: booking.user_id,
            gateway_order_id: None,
            gateway_payment_id: None,
            method: PaymentMethod::Cash,
            status: PaymentStatus::Captured,
            authorized_amount: final_fare,
            captured_amount: final_fare,
            currency: self.currency.clone(),
            captured_at: Some(Utc::now()),
        };

        let persisted = self
            .store
            .persist_settlement(SettlementPersist::Cash { payment, earnings })
            .await?;

        tracing::info!(
            "booking {} settled in cash for {} {} (payment {})",
            booking.id,
            final_fare,
            self.currency,
            persisted.payment_id
        );

        Ok(SettlementOutcome {
            booking_id: booking.id,
            final_fare,
            settlement: SettlementSummary {
                payment_method: PaymentMethod::Cash,
                captured_amount: final_fare,
                additional_payment_needed: false,
                additional_amount: None,
                additional_payment_method: None,
            },
            earnings: breakdown,
            status: SettlementStatus::Settled,
        })
    }
}
