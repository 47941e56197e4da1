use rust_decimal::Decimal;
use thiserror::Error;

/// Failure from the external payment gateway. The gateway is authoritative
/// for real money movement, so callers must treat `Timeout` as unknown
/// outcome, not as failure.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway timed out after {0}ms")]
    Timeout(u64),
    #[error("gateway rejected request: {code} {message}")]
    Rejected { code: String, message: String },
    #[error("gateway network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("conflicting ledger state: {0}")]
    Conflict(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("insufficient wallet balance: have {balance}, need {requested}")]
    InsufficientBalance { balance: Decimal, requested: Decimal },
    #[error("capture failed: {0}")]
    Capture(String),
    #[error("refund failed: {0}")]
    Refund(String),
    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl SettlementError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}
