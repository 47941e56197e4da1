pub mod config;
pub mod domain {
    pub mod booking;
    pub mod earnings;
    pub mod money;
    pub mod payment;
    pub mod reconciliation;
    pub mod wallet;
}
pub mod error;
pub mod gateways;
pub mod pricing;
pub mod service {
    pub mod capture;
    pub mod earnings;
    pub mod preauth;
    pub mod refunds;
    pub mod settlement;
    pub mod wallet;
}
pub mod store;

use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use config::AppConfig;
use domain::booking::SettlementOutcome;
use domain::earnings::EarningsRecord;
use domain::payment::{CaptureResult, CustomerDetails, PaymentRecord, PreAuthPayment, RefundResult};
use domain::reconciliation::ReconciliationRecord;
use domain::wallet::{WalletEntryKind, WalletReceipt, WalletTransaction};
use error::SettlementError;
use gateways::razorpay::RazorpayGateway;
use gateways::PaymentGateway;
use pricing::{PgPricingRules, PricingRules};
use service::capture::CaptureService;
use service::earnings::EarningsService;
use service::preauth::PreAuthService;
use service::refunds::RefundService;
use service::settlement::SettlementService;
use service::wallet::WalletService;
use store::postgres::PgSettlementStore;
use store::SettlementStore;

/// Everything a route handler needs to settle bookings: the six settlement
/// services over one shared store, gateway, and pricing-rules seam.
#[derive(Clone)]
pub struct SettlementCore {
    pub preauth: PreAuthService,
    pub capture: CaptureService,
    pub refunds: RefundService,
    pub wallet: WalletService,
    pub earnings: EarningsService,
    pub settlement: SettlementService,
    pub store: Arc<dyn SettlementStore>,
}

impl SettlementCore {
    pub fn new(
        store: Arc<dyn SettlementStore>,
        gateway: Arc<dyn PaymentGateway>,
        rules: Arc<dyn PricingRules>,
        currency: String,
    ) -> Self {
        let wallet = WalletService::new(store.clone());
        let earnings = EarningsService::new(store.clone(), rules);

        Self {
            preauth: PreAuthService::new(store.clone(), gateway.clone()),
            capture: CaptureService::new(store.clone(), gateway.clone()),
            refunds: RefundService::new(store.clone(), gateway.clone()),
            settlement: SettlementService::new(
                store.clone(),
                gateway,
                wallet.clone(),
                earnings.clone(),
                currency,
            ),
            wallet,
            earnings,
            store,
        }
    }

    /// Production wiring: Postgres-backed store and pricing rules, live
    /// Razorpay adapter, migrations applied.
    pub async fn connect(cfg: &AppConfig) -> Result<Self, SettlementError> {
        let store = PgSettlementStore::connect(&cfg.database_url).await?;
        store.migrate().await?;
        let rules = PgPricingRules {
            pool: store.pool.clone(),
        };

        Ok(Self::new(
            Arc::new(store),
            Arc::new(RazorpayGateway::from_config(cfg)),
            Arc::new(rules),
            cfg.settlement_currency.clone(),
        ))
    }

    pub async fn create_pre_auth_payment(
        &self,
        booking_id: Uuid,
        user_id: Uuid,
        estimated_amount: Decimal,
        currency: &str,
        customer: CustomerDetails,
    ) -> Result<PreAuthPayment, SettlementError> {
        self.preauth
            .create_pre_auth_payment(booking_id, user_id, estimated_amount, currency, customer)
            .await
    }

    pub async fn mark_authorized(
        &self,
        booking_id: Uuid,
        gateway_payment_id: &str,
    ) -> Result<PaymentRecord, SettlementError> {
        self.preauth
            .mark_authorized(booking_id, gateway_payment_id)
            .await
    }

    pub async fn capture_payment(
        &self,
        booking_id: Uuid,
        gateway_payment_id: &str,
        final_amount: Decimal,
        authorized_amount: Decimal,
    ) -> Result<CaptureResult, SettlementError> {
        self.capture
            .capture_payment(booking_id, gateway_payment_id, final_amount, authorized_amount)
            .await
    }

    pub async fn process_refund(
        &self,
        booking_id: Uuid,
        gateway_payment_id: &str,
        refund_amount: Decimal,
        reason: &str,
    ) -> Result<RefundResult, SettlementError> {
        self.refunds
            .process_refund(booking_id, gateway_payment_id, refund_amount, reason)
            .await
    }

    /// Signed wallet adjustment. An insufficient balance surfaces here as
    /// `SettlementError::InsufficientBalance`; callers that want to branch on
    /// the outcome instead use `wallet.adjust` directly.
    pub async fn adjust_wallet(
        &self,
        user_id: Uuid,
        booking_id: Option<Uuid>,
        amount: Decimal,
        kind: WalletEntryKind,
        description: &str,
    ) -> Result<WalletReceipt, SettlementError> {
        self.wallet
            .adjust(user_id, booking_id, amount, kind, description)
            .await?
            .into_result()
    }

    pub async fn calculate_provider_earnings(
        &self,
        booking_id: Uuid,
        provider_id: Uuid,
        final_fare: Decimal,
    ) -> Result<EarningsRecord, SettlementError> {
        self.earnings
            .calculate_provider_earnings(booking_id, provider_id, final_fare)
            .await
    }

    pub async fn settle_payment(
        &self,
        booking_id: Uuid,
        final_fare: Decimal,
    ) -> Result<SettlementOutcome, SettlementError> {
        self.settlement.settle_payment(booking_id, final_fare).await
    }

    pub async fn wallet_balance(&self, user_id: Uuid) -> Result<Decimal, SettlementError> {
        self.wallet.balance(user_id).await
    }

    pub async fn wallet_history(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<WalletTransaction>, SettlementError> {
        self.wallet.history(user_id).await
    }

    /// Gateway-accepted captures and refunds the ledger failed to record,
    /// awaiting manual resolution.
    pub async fn pending_reconciliations(
        &self,
    ) -> Result<Vec<ReconciliationRecord>, SettlementError> {
        Ok(self.store.pending_reconciliations().await?)
    }

    pub async fn resolve_reconciliation(&self, id: i64) -> Result<bool, SettlementError> {
        Ok(self.store.resolve_reconciliation(id).await?)
    }
}
