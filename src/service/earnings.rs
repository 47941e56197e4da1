use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use crate::domain::earnings::{EarningsBreakdown, EarningsRecord};
use crate::domain::money::round_money;
use crate::error::SettlementError;
use crate::pricing::{PricingRules, COMMISSION_PERCENTAGE, GST_PERCENTAGE};
use crate::store::SettlementStore;

pub const DEFAULT_COMMISSION_PERCENTAGE: Decimal = dec!(20);
pub const DEFAULT_GST_PERCENTAGE: Decimal = dec!(18);

/// Splits a fare into platform commission, GST on that commission, and the
/// provider's remainder. Commission and GST are each rounded to two decimal
/// places first, so the three parts sum back to `final_fare` exactly.
pub fn compute_earnings(
    final_fare: Decimal,
    commission_percentage: Decimal,
    gst_percentage: Decimal,
) -> EarningsBreakdown {
    let platform_commission = round_money(final_fare * commission_percentage / dec!(100));
    let gst_amount = round_money(platform_commission * gst_percentage / dec!(100));
    let provider_earnings = final_fare - platform_commission - gst_amount;

    EarningsBreakdown {
        final_fare,
        platform_commission,
        gst_amount,
        provider_earnings,
        commission_percentage,
        gst_percentage,
    }
}

#[derive(Clone)]
pub struct EarningsService {
    pub store: Arc<dyn SettlementStore>,
    pub rules: Arc<dyn PricingRules>,
}

impl EarningsService {
    pub fn new(store: Arc<dyn SettlementStore>, rules: Arc<dyn PricingRules>) -> Self {
        Self { store, rules }
    }

    /// Rules lookup plus the pure split; persists nothing. The settlement
    /// orchestrator uses this and writes the record inside its own
    /// transaction.
    pub async fn breakdown(&self, final_fare: Decimal) -> Result<EarningsBreakdown, SettlementError> {
        let commission_percentage = self
            .percentage_or_default(COMMISSION_PERCENTAGE, DEFAULT_COMMISSION_PERCENTAGE)
            .await?;
        let gst_percentage = self
            .percentage_or_default(GST_PERCENTAGE, DEFAULT_GST_PERCENTAGE)
            .await?;

        Ok(compute_earnings(final_fare, commission_percentage, gst_percentage))
    }

    /// Computes and persists the per-booking earnings record. A record that
    /// already exists for the booking is returned unchanged; earnings reflect
    /// the rules in force when settlement first ran.
    pub async fn calculate_provider_earnings(
        &self,
        booking_id: Uuid,
        provider_id: Uuid,
        final_fare: Decimal,
    ) -> Result<EarningsRecord, SettlementError> {
        if final_fare <= Decimal::ZERO {
            return Err(SettlementError::Validation(
                "final_fare must be greater than zero".to_string(),
            ));
        }

        if let Some(existing) = self.store.find_earnings(booking_id).await? {
            return Ok(existing);
        }

        let record = self
            .breakdown(final_fare)
            .await?
            .into_record(booking_id, provider_id);
        self.store.insert_earnings(record.clone()).await?;

        tracing::info!(
            "earnings for booking {}: fare {}, commission {}, gst {}, provider {}",
            booking_id,
            record.final_fare,
            record.platform_commission,
            record.gst_amount,
            record.provider_earnings
        );

        Ok(record)
    }

    async fn percentage_or_default(
        &self,
        rule_key: &str,
        default: Decimal,
    ) -> Result<Decimal, SettlementError> {
        Ok(self.rules.percentage(rule_key).await?.unwrap_or(default))
    }
}
