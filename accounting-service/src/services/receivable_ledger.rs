//! Customer receivable running-balance ledger.
//!
//! Rows are append-only. Each movement locks the customer row, recomputes
//! the new balance, persists it on the customer, and inserts one ledger row
//! snapshotting `balance_after`. Two concurrent movements against the same
//! customer serialize on the row lock; the second sees the first's committed
//! balance as its starting point.

use chrono::NaiveDate;
use service_core::error::AppError;
use sqlx::PgConnection;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::models::ReceivableLedgerEntry;
use crate::services::metrics::{BALANCE_DRIFT_CORRECTED, DB_QUERY_DURATION, LEDGER_ENTRIES_TOTAL};
use crate::services::Reconciliation;

#[derive(Debug, Clone, Default)]
pub struct ReceivableLedgerService;

impl ReceivableLedgerService {
    pub fn new() -> Self {
        Self
    }

    /// Grow the customer's receivable and append the ledger row.
    #[instrument(skip(self, conn), fields(customer_id = %customer_id, amount = amount))]
    pub async fn add_debit(
        &self,
        conn: &mut PgConnection,
        customer_id: Uuid,
        reference_id: Option<Uuid>,
        entry_date: NaiveDate,
        amount: i64,
        period_code: &str,
        description: Option<&str>,
    ) -> Result<ReceivableLedgerEntry, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["receivable_add_debit"])
            .start_timer();

        let current = self.lock_balance(conn, customer_id).await?;
        let next = current + amount;

        self.write_balance(conn, customer_id, next).await?;
        let row = self
            .insert_row(
                conn,
                customer_id,
                reference_id,
                entry_date,
                period_code,
                amount,
                0,
                next,
                description,
            )
            .await?;

        timer.observe_duration();
        LEDGER_ENTRIES_TOTAL
            .with_label_values(&["receivable", "debit"])
            .inc();
        info!(balance_after = next, "Receivable debit appended");

        Ok(row)
    }

    /// Shrink the customer's receivable (clamped at zero) and append the
    /// ledger row.
    #[instrument(skip(self, conn), fields(customer_id = %customer_id, amount = amount))]
    pub async fn add_credit(
        &self,
        conn: &mut PgConnection,
        customer_id: Uuid,
        reference_id: Option<Uuid>,
        entry_date: NaiveDate,
        amount: i64,
        period_code: &str,
        description: Option<&str>,
    ) -> Result<ReceivableLedgerEntry, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["receivable_add_credit"])
            .start_timer();

        let current = self.lock_balance(conn, customer_id).await?;
        let next = (current - amount).max(0);

        self.write_balance(conn, customer_id, next).await?;
        let row = self
            .insert_row(
                conn,
                customer_id,
                reference_id,
                entry_date,
                period_code,
                0,
                amount,
                next,
                description,
            )
            .await?;

        timer.observe_duration();
        LEDGER_ENTRIES_TOTAL
            .with_label_values(&["receivable", "credit"])
            .inc();
        info!(balance_after = next, "Receivable credit appended");

        Ok(row)
    }

    /// Recompute `sum(debit - credit)` from the ledger rows and rewrite the
    /// cached `outstanding_receivable` if it drifted. Corrects silently; a
    /// drift is logged, not raised.
    #[instrument(skip(self, conn), fields(customer_id = %customer_id))]
    pub async fn sync_outstanding_from_ledger(
        &self,
        conn: &mut PgConnection,
        customer_id: Uuid,
    ) -> Result<Reconciliation, AppError> {
        let cached = self.lock_balance(conn, customer_id).await?;

        let computed: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(debit - credit), 0)::bigint
            FROM receivable_ledgers
            WHERE customer_id = $1
            "#,
        )
        .bind(customer_id)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to sum receivable ledger: {}", e))
        })?;
        let computed = computed.max(0);

        if computed == cached {
            return Ok(Reconciliation {
                balance: computed,
                changed: false,
            });
        }

        warn!(
            cached = cached,
            computed = computed,
            "Cached outstanding receivable drifted from ledger; rewriting"
        );
        self.write_balance(conn, customer_id, computed).await?;
        BALANCE_DRIFT_CORRECTED
            .with_label_values(&["receivable"])
            .inc();

        Ok(Reconciliation {
            balance: computed,
            changed: true,
        })
    }

    /// Lock the customer row and read the current cached balance.
    async fn lock_balance(
        &self,
        conn: &mut PgConnection,
        customer_id: Uuid,
    ) -> Result<i64, AppError> {
        sqlx::query_scalar(
            r#"
            SELECT outstanding_receivable
            FROM customers
            WHERE customer_id = $1
            FOR UPDATE
            "#,
        )
        .bind(customer_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to lock customer: {}", e)))?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Customer {} not found", customer_id)))
    }

    async fn write_balance(
        &self,
        conn: &mut PgConnection,
        customer_id: Uuid,
        balance: i64,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE customers SET outstanding_receivable = $2 WHERE customer_id = $1")
            .bind(customer_id)
            .bind(balance)
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to update customer balance: {}", e))
            })?;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn insert_row(
        &self,
        conn: &mut PgConnection,
        customer_id: Uuid,
        reference_id: Option<Uuid>,
        entry_date: NaiveDate,
        period_code: &str,
        debit: i64,
        credit: i64,
        balance_after: i64,
        description: Option<&str>,
    ) -> Result<ReceivableLedgerEntry, AppError> {
        sqlx::query_as::<_, ReceivableLedgerEntry>(
            r#"
            INSERT INTO receivable_ledgers
                (ledger_id, customer_id, reference_id, entry_date, period_code, debit, credit, balance_after, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING ledger_id, customer_id, reference_id, entry_date, period_code, debit, credit, balance_after, description, created_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(customer_id)
        .bind(reference_id)
        .bind(entry_date)
        .bind(period_code)
        .bind(debit)
        .bind(credit)
        .bind(balance_after)
        .bind(description)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to insert receivable row: {}", e))
        })
    }
}
