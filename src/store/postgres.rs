use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::domain::booking::{BookingPaymentStatus, BookingRecord};
use crate::domain::earnings::EarningsRecord;
use crate::domain::payment::{PaymentMethod, PaymentRecord, PaymentStatus, RefundRecord, RefundStatus};
use crate::domain::reconciliation::{ReconciliationKind, ReconciliationRecord, ReconciliationStatus};
use crate::domain::wallet::{WalletAdjustment, WalletEntryKind, WalletReceipt, WalletTransaction};
use crate::error::StoreError;
use crate::store::{
    CaptureApplied, CaptureApply, NewPayment, NewReconciliation, RefundApplied, RefundApply,
    SettlementPersist, SettlementPersisted, SettlementStore, ShortfallCollect, WalletEntry,
};

const PAYMENT_COLUMNS: &str = "payment_id, booking_id, user_id, gateway_order_id, \
     gateway_payment_id, method, status, authorized_amount, captured_amount, currency, \
     created_at, captured_at";

#[derive(Clone)]
pub struct PgSettlementStore {
    pub pool: PgPool,
}

impl PgSettlementStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    /// Serializes all settlement writes for one booking within the enclosing
    /// transaction.
    async fn lock_booking(
        tx: &mut Transaction<'_, Postgres>,
        booking_id: Uuid,
    ) -> Result<(), StoreError> {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::text, 0))")
            .bind(booking_id)
            .execute(tx.as_mut())
            .await?;
        Ok(())
    }

    async fn insert_payment_tx(
        tx: &mut Transaction<'_, Postgres>,
        new: &NewPayment,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO payments (
                payment_id, booking_id, user_id, gateway_order_id, gateway_payment_id,
                method, status, authorized_amount, captured_amount, currency,
                created_at, captured_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(new.payment_id)
        .bind(new.booking_id)
        .bind(new.user_id)
        .bind(new.gateway_order_id.clone())
        .bind(new.gateway_payment_id.clone())
        .bind(new.method.as_str())
        .bind(new.status.as_str())
        .bind(new.authorized_amount)
        .bind(new.captured_amount)
        .bind(new.currency.clone())
        .bind(Utc::now())
        .bind(new.captured_at)
        .execute(tx.as_mut())
        .await?;

        Ok(())
    }

    async fn capture_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        apply: &CaptureApply,
    ) -> Result<(Uuid, Option<Uuid>), StoreError> {
        let locked = sqlx::query(
            r#"
            SELECT payment_id, user_id, currency
            FROM payments
            WHERE booking_id = $1 AND method = 'razorpay'
              AND (gateway_payment_id = $2 OR gateway_payment_id IS NULL)
              AND status IN ('created', 'authorized')
            ORDER BY (gateway_payment_id = $2) DESC NULLS LAST, created_at DESC
            LIMIT 1
            FOR UPDATE
            "#,
        )
        .bind(apply.booking_id)
        .bind(&apply.gateway_payment_id)
        .fetch_optional(tx.as_mut())
        .await?
        .ok_or_else(|| StoreError::Conflict("payment is not pre-capture".to_string()))?;

        let payment_id: Uuid = locked.get("payment_id");
        let user_id: Uuid = locked.get("user_id");
        let currency: String = locked.get("currency");

        sqlx::query(
            r#"
            UPDATE payments
            SET status = 'captured', captured_amount = $2, captured_at = $3,
                gateway_payment_id = $4
            WHERE payment_id = $1
            "#,
        )
        .bind(payment_id)
        .bind(apply.capture_amount)
        .bind(apply.captured_at)
        .bind(&apply.gateway_payment_id)
        .execute(tx.as_mut())
        .await?;

        let mut shortfall_payment_id = None;
        if let Some(shortfall) = &apply.shortfall {
            sqlx::query(
                r#"
                INSERT INTO payments (
                    payment_id, booking_id, user_id, method, status,
                    authorized_amount, captured_amount, currency, created_at
                ) VALUES ($1, $2, $3, 'wallet_deduction', 'pending', $4, 0, $5, $6)
                "#,
            )
            .bind(shortfall.payment_id)
            .bind(apply.booking_id)
            .bind(user_id)
            .bind(shortfall.amount)
            .bind(currency)
            .bind(Utc::now())
            .execute(tx.as_mut())
            .await?;
            shortfall_payment_id = Some(shortfall.payment_id);
        }

        Ok((payment_id, shortfall_payment_id))
    }

    async fn earnings_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        record: &EarningsRecord,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO provider_earnings (
                booking_id, provider_id, final_fare, platform_commission, gst_amount,
                provider_earnings, commission_percentage, gst_percentage, calculated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (booking_id) DO NOTHING
            "#,
        )
        .bind(record.booking_id)
        .bind(record.provider_id)
        .bind(record.final_fare)
        .bind(record.platform_commission)
        .bind(record.gst_amount)
        .bind(record.provider_earnings)
        .bind(record.commission_percentage)
        .bind(record.gst_percentage)
        .bind(record.calculated_at)
        .execute(tx.as_mut())
        .await?;

        Ok(())
    }

    async fn complete_booking_tx(
        tx: &mut Transaction<'_, Postgres>,
        booking_id: Uuid,
    ) -> Result<(), StoreError> {
        let updated = sqlx::query("UPDATE bookings SET payment_status = 'completed' WHERE id = $1")
            .bind(booking_id)
            .execute(tx.as_mut())
            .await?;

        if updated.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!("booking {booking_id} missing")));
        }
        Ok(())
    }

    async fn wallet_adjust_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        entry: &WalletEntry,
    ) -> Result<WalletAdjustment, StoreError> {
        sqlx::query("INSERT INTO wallets (user_id, balance) VALUES ($1, 0) ON CONFLICT (user_id) DO NOTHING")
            .bind(entry.user_id)
            .execute(tx.as_mut())
            .await?;

        let row = sqlx::query("SELECT balance FROM wallets WHERE user_id = $1 FOR UPDATE")
            .bind(entry.user_id)
            .fetch_one(tx.as_mut())
            .await?;
        let balance_before: Decimal = row.get("balance");
        let balance_after = balance_before + entry.amount;

        if entry.amount < Decimal::ZERO && balance_after < Decimal::ZERO {
            return Ok(WalletAdjustment::InsufficientBalance {
                balance: balance_before,
                requested: entry.amount.abs(),
            });
        }

        sqlx::query("UPDATE wallets SET balance = $2, updated_at = now() WHERE user_id = $1")
            .bind(entry.user_id)
            .bind(balance_after)
            .execute(tx.as_mut())
            .await?;

        sqlx::query(
            r#"
            INSERT INTO wallet_transactions (
                user_id, booking_id, amount, kind, description,
                balance_before, balance_after, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(entry.user_id)
        .bind(entry.booking_id)
        .bind(entry.amount)
        .bind(entry.kind.as_str())
        .bind(&entry.description)
        .bind(balance_before)
        .bind(balance_after)
        .bind(Utc::now())
        .execute(tx.as_mut())
        .await?;

        Ok(WalletAdjustment::Applied(WalletReceipt {
            balance_before,
            balance_after,
            transaction_amount: entry.amount,
        }))
    }
}

fn parse_payment_status(s: &str) -> Result<PaymentStatus, StoreError> {
    PaymentStatus::parse(s).ok_or_else(|| StoreError::Conflict(format!("unknown payment status {s}")))
}

fn parse_payment_method(s: &str) -> Result<PaymentMethod, StoreError> {
    PaymentMethod::parse(s).ok_or_else(|| StoreError::Conflict(format!("unknown payment method {s}")))
}

fn payment_from_row(row: &PgRow) -> Result<PaymentRecord, StoreError> {
    Ok(PaymentRecord {
        payment_id: row.get("payment_id"),
        booking_id: row.get("booking_id"),
        user_id: row.get("user_id"),
        gateway_order_id: row.get("gateway_order_id"),
        gateway_payment_id: row.get("gateway_payment_id"),
        method: parse_payment_method(row.get("method"))?,
        status: parse_payment_status(row.get("status"))?,
        authorized_amount: row.get("authorized_amount"),
        captured_amount: row.get("captured_amount"),
        currency: row.get("currency"),
        created_at: row.get("created_at"),
        captured_at: row.get("captured_at"),
    })
}

fn refund_from_row(row: &PgRow) -> RefundRecord {
    RefundRecord {
        refund_id: row.get("refund_id"),
        payment_id: row.get("payment_id"),
        gateway_refund_id: row.get("gateway_refund_id"),
        amount: row.get("amount"),
        reason: row.get("reason"),
        status: RefundStatus::Processed,
        refunded_at: row.get("refunded_at"),
    }
}

fn earnings_from_row(row: &PgRow) -> EarningsRecord {
    EarningsRecord {
        booking_id: row.get("booking_id"),
        provider_id: row.get("provider_id"),
        final_fare: row.get("final_fare"),
        platform_commission: row.get("platform_commission"),
        gst_amount: row.get("gst_amount"),
        provider_earnings: row.get("provider_earnings"),
        commission_percentage: row.get("commission_percentage"),
        gst_percentage: row.get("gst_percentage"),
        calculated_at: row.get("calculated_at"),
    }
}

#[async_trait::async_trait]
impl SettlementStore for PgSettlementStore {
    async fn find_booking(&self, booking_id: Uuid) -> Result<Option<BookingRecord>, StoreError> {
        let row = sqlx::query(
            "SELECT id, user_id, provider_id, payment_status, created_at FROM bookings WHERE id = $1",
        )
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| {
            let status: String = r.get("payment_status");
            Ok(BookingRecord {
                id: r.get("id"),
                user_id: r.get("user_id"),
                provider_id: r.get("provider_id"),
                payment_status: BookingPaymentStatus::parse(&status).ok_or_else(|| {
                    StoreError::Conflict(format!("unknown booking payment status {status}"))
                })?,
                created_at: r.get("created_at"),
            })
        })
        .transpose()
    }

    async fn find_active_payment(
        &self,
        booking_id: Uuid,
    ) -> Result<Option<PaymentRecord>, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {PAYMENT_COLUMNS}
            FROM payments
            WHERE booking_id = $1 AND method = 'razorpay' AND status <> 'refunded'
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        ))
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| payment_from_row(&r)).transpose()
    }

    async fn find_payment_for_capture(
        &self,
        booking_id: Uuid,
        gateway_payment_id: &str,
    ) -> Result<Option<PaymentRecord>, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {PAYMENT_COLUMNS}
            FROM payments
            WHERE booking_id = $1 AND method = 'razorpay'
              AND (gateway_payment_id = $2 OR gateway_payment_id IS NULL)
              AND status IN ('created', 'authorized')
            ORDER BY (gateway_payment_id = $2) DESC NULLS LAST, created_at DESC
            LIMIT 1
            "#,
        ))
        .bind(booking_id)
        .bind(gateway_payment_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| payment_from_row(&r)).transpose()
    }

    async fn find_captured_payment(
        &self,
        booking_id: Uuid,
        gateway_payment_id: &str,
    ) -> Result<Option<(PaymentRecord, Decimal)>, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {PAYMENT_COLUMNS},
                   COALESCE((SELECT SUM(r.amount) FROM refunds r WHERE r.payment_id = payments.payment_id), 0)
                       AS refunded_total
            FROM payments
            WHERE booking_id = $1 AND gateway_payment_id = $2
              AND status IN ('captured', 'refunded')
            LIMIT 1
            "#,
        ))
        .bind(booking_id)
        .bind(gateway_payment_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| {
            let refunded: Decimal = r.get("refunded_total");
            Ok((payment_from_row(&r)?, refunded))
        })
        .transpose()
    }

    async fn refunds_for(&self, payment_id: Uuid) -> Result<Vec<RefundRecord>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT refund_id, payment_id, gateway_refund_id, amount, reason, status, refunded_at
            FROM refunds
            WHERE payment_id = $1
            ORDER BY refunded_at ASC, refund_id ASC
            "#,
        )
        .bind(payment_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(refund_from_row).collect())
    }

    async fn find_earnings(
        &self,
        booking_id: Uuid,
    ) -> Result<Option<EarningsRecord>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT booking_id, provider_id, final_fare, platform_commission, gst_amount,
                   provider_earnings, commission_percentage, gst_percentage, calculated_at
            FROM provider_earnings
            WHERE booking_id = $1
            "#,
        )
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| earnings_from_row(&r)))
    }

    async fn wallet_balance(&self, user_id: Uuid) -> Result<Decimal, StoreError> {
        let row = sqlx::query("SELECT balance FROM wallets WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.get("balance")).unwrap_or(Decimal::ZERO))
    }

    async fn wallet_history(&self, user_id: Uuid) -> Result<Vec<WalletTransaction>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT user_id, booking_id, amount, kind, description,
                   balance_before, balance_after, created_at
            FROM wallet_transactions
            WHERE user_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                let kind: String = r.get("kind");
                Ok(WalletTransaction {
                    user_id: r.get("user_id"),
                    booking_id: r.get("booking_id"),
                    amount: r.get("amount"),
                    kind: WalletEntryKind::parse(&kind).ok_or_else(|| {
                        StoreError::Conflict(format!("unknown wallet entry kind {kind}"))
                    })?,
                    description: r.get("description"),
                    balance_before: r.get("balance_before"),
                    balance_after: r.get("balance_after"),
                    created_at: r.get("created_at"),
                })
            })
            .collect()
    }

    async fn insert_payment(&self, new: NewPayment) -> Result<PaymentRecord, StoreError> {
        let mut tx = self.pool.begin().await?;
        Self::insert_payment_tx(&mut tx, &new).await?;
        tx.commit().await?;

        Ok(PaymentRecord {
            payment_id: new.payment_id,
            booking_id: new.booking_id,
            user_id: new.user_id,
            gateway_order_id: new.gateway_order_id,
            gateway_payment_id: new.gateway_payment_id,
            method: new.method,
            status: new.status,
            authorized_amount: new.authorized_amount,
            captured_amount: new.captured_amount,
            currency: new.currency,
            created_at: Utc::now(),
            captured_at: new.captured_at,
        })
    }

    async fn mark_authorized(
        &self,
        booking_id: Uuid,
        gateway_payment_id: &str,
    ) -> Result<Option<PaymentRecord>, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE payments
            SET gateway_payment_id = $2, status = 'authorized'
            WHERE payment_id = (
                SELECT payment_id FROM payments
                WHERE booking_id = $1 AND method = 'razorpay' AND status = 'created'
                ORDER BY created_at DESC
                LIMIT 1
            )
            RETURNING {PAYMENT_COLUMNS}
            "#,
        ))
        .bind(booking_id)
        .bind(gateway_payment_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| payment_from_row(&r)).transpose()
    }

    async fn apply_capture(&self, apply: CaptureApply) -> Result<CaptureApplied, StoreError> {
        let mut tx = self.pool.begin().await?;
        Self::lock_booking(&mut tx, apply.booking_id).await?;
        let (payment_id, _) = Self::capture_in_tx(&mut tx, &apply).await?;
        tx.commit().await?;

        Ok(CaptureApplied { payment_id })
    }

    async fn apply_refund(&self, apply: RefundApply) -> Result<RefundApplied, StoreError> {
        let mut tx = self.pool.begin().await?;

        let locked = sqlx::query(
            r#"
            SELECT payment_id, captured_amount
            FROM payments
            WHERE booking_id = $1 AND gateway_payment_id = $2
              AND status IN ('captured', 'refunded')
            LIMIT 1
            FOR UPDATE
            "#,
        )
        .bind(apply.booking_id)
        .bind(&apply.gateway_payment_id)
        .fetch_optional(tx.as_mut())
        .await?
        .ok_or_else(|| StoreError::Conflict("payment is not refundable".to_string()))?;

        let payment_id: Uuid = locked.get("payment_id");
        let captured_amount: Decimal = locked.get("captured_amount");

        let refunded: Decimal =
            sqlx::query("SELECT COALESCE(SUM(amount), 0) AS total FROM refunds WHERE payment_id = $1")
                .bind(payment_id)
                .fetch_one(tx.as_mut())
                .await?
                .get("total");

        if refunded + apply.refund.amount > captured_amount {
            return Err(StoreError::Conflict(
                "refund would exceed captured amount".to_string(),
            ));
        }

        sqlx::query(
            r#"
            INSERT INTO refunds (
                refund_id, payment_id, gateway_refund_id, amount, reason, status, refunded_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(apply.refund.refund_id)
        .bind(payment_id)
        .bind(apply.refund.gateway_refund_id.clone())
        .bind(apply.refund.amount)
        .bind(&apply.refund.reason)
        .bind(RefundStatus::Processed.as_str())
        .bind(apply.refund.refunded_at)
        .execute(tx.as_mut())
        .await?;

        let payment_status = if refunded + apply.refund.amount == captured_amount {
            sqlx::query("UPDATE payments SET status = 'refunded' WHERE payment_id = $1")
                .bind(payment_id)
                .execute(tx.as_mut())
                .await?;
            PaymentStatus::Refunded
        } else {
            PaymentStatus::Captured
        };

        tx.commit().await?;

        Ok(RefundApplied {
            payment_id,
            payment_status,
        })
    }

    async fn adjust_wallet(&self, entry: WalletEntry) -> Result<WalletAdjustment, StoreError> {
        let mut tx = self.pool.begin().await?;
        let adjustment = Self::wallet_adjust_in_tx(&mut tx, &entry).await?;

        match adjustment {
            WalletAdjustment::Applied(_) => tx.commit().await?,
            // Nothing was written; dropping the transaction discards the lock.
            WalletAdjustment::InsufficientBalance { .. } => tx.rollback().await?,
        }

        Ok(adjustment)
    }

    async fn collect_shortfall(
        &self,
        collect: ShortfallCollect,
    ) -> Result<WalletAdjustment, StoreError> {
        let mut tx = self.pool.begin().await?;

        let entry = WalletEntry {
            user_id: collect.user_id,
            booking_id: Some(collect.booking_id),
            amount: -collect.amount,
            kind: WalletEntryKind::FareDeduction,
            description: collect.description.clone(),
        };
        let adjustment = Self::wallet_adjust_in_tx(&mut tx, &entry).await?;

        match adjustment {
            WalletAdjustment::Applied(_) => {
                let updated = sqlx::query(
                    r#"
                    UPDATE payments
                    SET status = 'captured', captured_amount = $2, captured_at = $3
                    WHERE payment_id = $1 AND status = 'pending'
                    "#,
                )
                .bind(collect.payment_id)
                .bind(collect.amount)
                .bind(Utc::now())
                .execute(tx.as_mut())
                .await?;

                if updated.rows_affected() == 0 {
                    return Err(StoreError::Conflict(
                        "shortfall payment is not pending".to_string(),
                    ));
                }
                tx.commit().await?;
            }
            WalletAdjustment::InsufficientBalance { .. } => tx.rollback().await?,
        }

        Ok(adjustment)
    }

    async fn insert_earnings(&self, record: EarningsRecord) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        Self::earnings_in_tx(&mut tx, &record).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn persist_settlement(
        &self,
        persist: SettlementPersist,
    ) -> Result<SettlementPersisted, StoreError> {
        let mut tx = self.pool.begin().await?;
        Self::lock_booking(&mut tx, persist.booking_id()).await?;

        let persisted = match &persist {
            SettlementPersist::Capture { apply, earnings } => {
                let (payment_id, shortfall_payment_id) =
                    Self::capture_in_tx(&mut tx, apply).await?;
                Self::earnings_in_tx(&mut tx, earnings).await?;
                Self::complete_booking_tx(&mut tx, apply.booking_id).await?;
                SettlementPersisted {
                    payment_id,
                    shortfall_payment_id,
                }
            }
            SettlementPersist::Cash { payment, earnings } => {
                Self::insert_payment_tx(&mut tx, payment).await?;
                Self::earnings_in_tx(&mut tx, earnings).await?;
                Self::complete_booking_tx(&mut tx, payment.booking_id).await?;
                SettlementPersisted {
                    payment_id: payment.payment_id,
                    shortfall_payment_id: None,
                }
            }
        };

        tx.commit().await?;
        Ok(persisted)
    }

    async fn record_reconciliation(&self, new: NewReconciliation) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO payment_reconciliation_outbox (
                booking_id, gateway_payment_id, kind, amount, currency,
                payload_json, status, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(new.booking_id)
        .bind(new.gateway_payment_id.clone())
        .bind(new.kind.as_str())
        .bind(new.amount)
        .bind(new.currency.clone())
        .bind(new.payload_json)
        .bind(ReconciliationStatus::Pending.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn pending_reconciliations(&self) -> Result<Vec<ReconciliationRecord>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, booking_id, gateway_payment_id, kind, amount, currency,
                   payload_json, status, created_at, resolved_at
            FROM payment_reconciliation_outbox
            WHERE status = $1
            ORDER BY id ASC
            "#,
        )
        .bind(ReconciliationStatus::Pending.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                let kind: String = r.get("kind");
                let status: String = r.get("status");
                Ok(ReconciliationRecord {
                    id: r.get("id"),
                    booking_id: r.get("booking_id"),
                    gateway_payment_id: r.get("gateway_payment_id"),
                    kind: ReconciliationKind::parse(&kind).ok_or_else(|| {
                        StoreError::Conflict(format!("unknown reconciliation kind {kind}"))
                    })?,
                    amount: r.get("amount"),
                    currency: r.get("currency"),
                    payload_json: r.get("payload_json"),
                    status: ReconciliationStatus::parse(&status).ok_or_else(|| {
                        StoreError::Conflict(format!("unknown reconciliation status {status}"))
                    })?,
                    created_at: r.get("created_at"),
                    resolved_at: r.get("resolved_at"),
                })
            })
            .collect()
    }

    async fn resolve_reconciliation(&self, id: i64) -> Result<bool, StoreError> {
        let updated = sqlx::query(
            r#"
            UPDATE payment_reconciliation_outbox
            SET status = $2, resolved_at = now()
            WHERE id = $1 AND status = $3
            "#,
        )
        .bind(id)
        .bind(ReconciliationStatus::Resolved.as_str())
        .bind(ReconciliationStatus::Pending.as_str())
        .execute(&self.pool)
        .await?;

        Ok(updated.rows_affected() > 0)
    }
}
