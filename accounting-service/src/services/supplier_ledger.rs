//! Supplier payable running-balance ledger.
//!
//! Mirrors the receivable side: append-only rows, balance recomputed under a
//! row lock on the supplier. A debit here grows the amount owed to the
//! supplier; the cached `outstanding_payable` never goes below zero.

use chrono::NaiveDate;
use service_core::error::AppError;
use sqlx::PgConnection;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::models::SupplierLedgerEntry;
use crate::services::metrics::{BALANCE_DRIFT_CORRECTED, DB_QUERY_DURATION, LEDGER_ENTRIES_TOTAL};
use crate::services::Reconciliation;

#[derive(Debug, Clone, Default)]
pub struct SupplierLedgerService;

impl SupplierLedgerService {
    pub fn new() -> Self {
        Self
    }

    /// Grow the amount owed to the supplier and append the ledger row.
    #[instrument(skip(self, conn), fields(supplier_id = %supplier_id, amount = amount))]
    pub async fn add_debit(
        &self,
        conn: &mut PgConnection,
        supplier_id: Uuid,
        reference_id: Option<Uuid>,
        entry_date: NaiveDate,
        amount: i64,
        period_code: &str,
        description: Option<&str>,
    ) -> Result<SupplierLedgerEntry, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["supplier_add_debit"])
            .start_timer();

        let current = self.lock_balance(conn, supplier_id).await?;
        let next = (current + amount).max(0);

        self.write_balance(conn, supplier_id, next).await?;
        let row = self
            .insert_row(
                conn,
                supplier_id,
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
            .with_label_values(&["supplier", "debit"])
            .inc();
        info!(balance_after = next, "Supplier debit appended");

        Ok(row)
    }

    /// Shrink the amount owed (clamped at zero) and append the ledger row.
    #[instrument(skip(self, conn), fields(supplier_id = %supplier_id, amount = amount))]
    pub async fn add_credit(
        &self,
        conn: &mut PgConnection,
        supplier_id: Uuid,
        reference_id: Option<Uuid>,
        entry_date: NaiveDate,
        amount: i64,
        period_code: &str,
        description: Option<&str>,
    ) -> Result<SupplierLedgerEntry, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["supplier_add_credit"])
            .start_timer();

        let current = self.lock_balance(conn, supplier_id).await?;
        let next = (current - amount).max(0);

        self.write_balance(conn, supplier_id, next).await?;
        let row = self
            .insert_row(
                conn,
                supplier_id,
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
            .with_label_values(&["supplier", "credit"])
            .inc();
        info!(balance_after = next, "Supplier credit appended");

        Ok(row)
    }

    /// Recompute `sum(debit - credit)` from the ledger rows and rewrite the
    /// cached `outstanding_payable` if it drifted. Runs after every supplier
    /// posting as a self-healing pass; corrects silently.
    #[instrument(skip(self, conn), fields(supplier_id = %supplier_id))]
    pub async fn sync_outstanding_from_ledger(
        &self,
        conn: &mut PgConnection,
        supplier_id: Uuid,
    ) -> Result<Reconciliation, AppError> {
        let cached = self.lock_balance(conn, supplier_id).await?;

        let computed: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(debit - credit), 0)::bigint
            FROM supplier_ledgers
            WHERE supplier_id = $1
            "#,
        )
        .bind(supplier_id)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to sum supplier ledger: {}", e))
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
            "Cached outstanding payable drifted from ledger; rewriting"
        );
        self.write_balance(conn, supplier_id, computed).await?;
        BALANCE_DRIFT_CORRECTED
            .with_label_values(&["supplier"])
            .inc();

        Ok(Reconciliation {
            balance: computed,
            changed: true,
        })
    }

    /// Lock the supplier row and read the current cached balance.
    async fn lock_balance(
        &self,
        conn: &mut PgConnection,
        supplier_id: Uuid,
    ) -> Result<i64, AppError> {
        sqlx::query_scalar(
            r#"
            SELECT outstanding_payable
            FROM suppliers
            WHERE supplier_id = $1
            FOR UPDATE
            "#,
        )
        .bind(supplier_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to lock supplier: {}", e)))?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Supplier {} not found", supplier_id)))
    }

    async fn write_balance(
        &self,
        conn: &mut PgConnection,
        supplier_id: Uuid,
        balance: i64,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE suppliers SET outstanding_payable = $2 WHERE supplier_id = $1")
            .bind(supplier_id)
            .bind(balance)
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to update supplier balance: {}", e))
            })?;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn insert_row(
        &self,
        conn: &mut PgConnection,
        supplier_id: Uuid,
        reference_id: Option<Uuid>,
        entry_date: NaiveDate,
        period_code: &str,
        debit: i64,
        credit: i64,
        balance_after: i64,
        description: Option<&str>,
    ) -> Result<SupplierLedgerEntry, AppError> {
        sqlx::query_as::<_, SupplierLedgerEntry>(
            r#"
            INSERT INTO supplier_ledgers
                (ledger_id, supplier_id, reference_id, entry_date, period_code, debit, credit, balance_after, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING ledger_id, supplier_id, reference_id, entry_date, period_code, debit, credit, balance_after, description, created_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(supplier_id)
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
            AppError::DatabaseError(anyhow::anyhow!("Failed to insert supplier row: {}", e))
        })
    }
}
