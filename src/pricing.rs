use std::collections::HashMap;

use rust_decimal::Decimal;
use sqlx::{PgPool, Row};

use crate::error::StoreError;

pub const COMMISSION_PERCENTAGE: &str = "commission_percentage";
pub const GST_PERCENTAGE: &str = "gst_percentage";

/// Configuration provider for commission/GST percentages. Injected rather
/// than read from global state so earnings stay deterministic under test
/// with a fixed rule set.
#[async_trait::async_trait]
pub trait PricingRules: Send + Sync {
    /// Returns the active value for a rule key, or `None` when the key is
    /// unset or inactive; the caller applies its own default.
    async fn percentage(&self, rule_key: &str) -> Result<Option<Decimal>, StoreError>;
}

#[derive(Clone)]
pub struct PgPricingRules {
    pub pool: PgPool,
}

#[async_trait::async_trait]
impl PricingRules for PgPricingRules {
    async fn percentage(&self, rule_key: &str) -> Result<Option<Decimal>, StoreError> {
        let row = sqlx::query("SELECT value FROM pricing_rules WHERE rule_key=$1 AND is_active")
            .bind(rule_key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.get("value")))
    }
}

/// Fixed rule set for tests and offline development.
#[derive(Default)]
pub struct StaticPricingRules {
    pub values: HashMap<String, Decimal>,
}

impl StaticPricingRules {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with(mut self, rule_key: &str, value: Decimal) -> Self {
        self.values.insert(rule_key.to_string(), value);
        self
    }
}

#[async_trait::async_trait]
impl PricingRules for StaticPricingRules {
    async fn percentage(&self, rule_key: &str) -> Result<Option<Decimal>, StoreError> {
        Ok(self.values.get(rule_key).copied())
    }
}
