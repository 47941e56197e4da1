use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EarningsBreakdown {
    pub final_fare: Decimal,
    pub platform_commission: Decimal,
    pub gst_amount: Decimal,
    pub provider_earnings: Decimal,
    pub commission_percentage: Decimal,
    pub gst_percentage: Decimal,
}

impl EarningsBreakdown {
    pub fn into_record(self, booking_id: Uuid, provider_id: Uuid) -> EarningsRecord {
        EarningsRecord {
            booking_id,
            provider_id,
            final_fare: self.final_fare,
            platform_commission: self.platform_commission,
            gst_amount: self.gst_amount,
            provider_earnings: self.provider_earnings,
            commission_percentage: self.commission_percentage,
            gst_percentage: self.gst_percentage,
            calculated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EarningsRecord {
    pub booking_id: Uuid,
    pub provider_id: Uuid,
    pub final_fare: Decimal,
    pub platform_commission: Decimal,
    pub gst_amount: Decimal,
    pub provider_earnings: Decimal,
    pub commission_percentage: Decimal,
    pub gst_percentage: Decimal,
    pub calculated_at: DateTime<Utc>,
}

impl EarningsRecord {
    pub fn breakdown(&self) -> EarningsBreakdown {
        EarningsBreakdown {
            final_fare: self.final_fare,
            platform_commission: self.platform_commission,
            gst_amount: self.gst_amount,
            provider_earnings: self.provider_earnings,
            commission_percentage: self.commission_percentage,
            gst_percentage: self.gst_percentage,
        }
    }
}
