//! Journal posting engine.
//!
//! `post_entry` validates fully before any write: normalization, the
//! debit-equals-credit check, and account resolution all happen first, so a
//! validation failure leaves nothing behind. All methods run on a
//! caller-owned transaction; the caller opens it before creating the business
//! record and commits only after the journal and ledger writes succeed.

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use service_core::error::AppError;
use sqlx::PgConnection;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::chart;
use crate::models::{EntryType, JournalEntry, JournalLine};
use crate::services::metrics::{DB_QUERY_DURATION, JOURNAL_ENTRIES_POSTED};

/// A line after normalization: whole integer amounts, non-empty code.
#[derive(Debug, Clone, PartialEq, Eq)]
struct NormalizedLine {
    code: String,
    debit: i64,
    credit: i64,
    memo: Option<String>,
}

/// Posts balanced journal entries for each business event type.
#[derive(Debug, Clone, Default)]
pub struct AccountingService;

impl AccountingService {
    pub fn new() -> Self {
        Self
    }

    /// Post a balanced journal entry.
    ///
    /// Fails with a `journal`-keyed validation error when no usable lines
    /// remain after normalization, when debits and credits disagree, or when
    /// any referenced account code does not exist. Returns the persisted
    /// entry; lines are persisted but not loaded back onto it.
    #[instrument(
        skip(self, conn, lines),
        fields(entry_type = %entry_type, entry_date = %entry_date, line_count = lines.len())
    )]
    pub async fn post_entry(
        &self,
        conn: &mut PgConnection,
        entry_type: EntryType,
        entry_date: NaiveDate,
        reference_type: Option<&str>,
        reference_id: Option<Uuid>,
        description: Option<&str>,
        lines: &[JournalLine],
    ) -> Result<JournalEntry, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["post_entry"])
            .start_timer();

        let normalized = normalize_lines(lines);
        if normalized.is_empty() {
            return Err(AppError::validation(
                "journal",
                "journal entry has no usable lines",
            ));
        }

        let debit_total: i64 = normalized.iter().map(|l| l.debit).sum();
        let credit_total: i64 = normalized.iter().map(|l| l.credit).sum();
        if debit_total != credit_total {
            return Err(AppError::validation(
                "journal",
                format!(
                    "journal entry is not balanced: debit {} != credit {}",
                    debit_total, credit_total
                ),
            ));
        }

        let account_ids = self.resolve_accounts(conn, &normalized).await?;

        let entry_number = self.next_entry_number(conn, entry_date).await?;

        let entry = sqlx::query_as::<_, JournalEntry>(
            r#"
            INSERT INTO journal_entries
                (entry_id, entry_number, entry_date, entry_type, reference_type, reference_id, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING entry_id, entry_number, entry_date, entry_type, reference_type, reference_id, description, created_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&entry_number)
        .bind(entry_date)
        .bind(entry_type.as_str())
        .bind(reference_type)
        .bind(reference_id)
        .bind(description)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!(
                    "Entry number '{}' already exists",
                    entry_number
                ))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to insert journal entry: {}", e)),
        })?;

        for (i, line) in normalized.iter().enumerate() {
            let account_id = account_ids[line.code.as_str()];
            sqlx::query(
                r#"
                INSERT INTO journal_entry_lines
                    (line_id, entry_id, account_id, line_no, debit, credit, memo)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(entry.entry_id)
            .bind(account_id)
            .bind((i + 1) as i32)
            .bind(line.debit)
            .bind(line.credit)
            .bind(&line.memo)
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to insert journal line: {}", e))
            })?;
        }

        timer.observe_duration();
        JOURNAL_ENTRIES_POSTED
            .with_label_values(&[entry_type.as_str()])
            .inc();

        info!(
            entry_number = %entry.entry_number,
            total = debit_total,
            line_count = normalized.len(),
            "Journal entry posted"
        );

        Ok(entry)
    }

    /// Sales invoice: debit cash or receivable, credit sales revenue.
    /// Silently a no-op for non-positive amounts.
    #[instrument(skip(self, conn), fields(invoice_id = %invoice_id, amount = amount))]
    pub async fn post_sales_invoice(
        &self,
        conn: &mut PgConnection,
        invoice_id: Uuid,
        entry_date: NaiveDate,
        amount: i64,
        cash: bool,
        description: &str,
    ) -> Result<Option<JournalEntry>, AppError> {
        if amount <= 0 {
            debug!(amount = amount, "Nothing to post for sales invoice");
            return Ok(None);
        }

        let debit_account = if cash {
            chart::CASH
        } else {
            chart::ACCOUNTS_RECEIVABLE
        };
        let lines = [
            JournalLine::debit(debit_account, Decimal::from(amount)),
            JournalLine::credit(chart::SALES_REVENUE, Decimal::from(amount)),
        ];

        self.post_entry(
            conn,
            EntryType::SalesInvoiceCreate,
            entry_date,
            Some("sales_invoice"),
            Some(invoice_id),
            Some(description),
            &lines,
        )
        .await
        .map(Some)
    }

    /// Sales return: debit the sales-returns contra account, credit the
    /// customer receivable.
    #[instrument(skip(self, conn), fields(return_id = %return_id, amount = amount))]
    pub async fn post_sales_return(
        &self,
        conn: &mut PgConnection,
        return_id: Uuid,
        entry_date: NaiveDate,
        amount: i64,
        description: &str,
    ) -> Result<Option<JournalEntry>, AppError> {
        if amount <= 0 {
            debug!(amount = amount, "Nothing to post for sales return");
            return Ok(None);
        }

        let lines = [
            JournalLine::debit(chart::SALES_RETURNS, Decimal::from(amount)),
            JournalLine::credit(chart::ACCOUNTS_RECEIVABLE, Decimal::from(amount)),
        ];

        self.post_entry(
            conn,
            EntryType::SalesReturnCreate,
            entry_date,
            Some("sales_return"),
            Some(return_id),
            Some(description),
            &lines,
        )
        .await
        .map(Some)
    }

    /// Customer payment against a receivable. The paid amount over the
    /// invoice balance is held as a customer advance (liability), not
    /// credited to the receivable.
    #[instrument(
        skip(self, conn),
        fields(payment_id = %payment_id, applied = applied, overpayment = overpayment)
    )]
    pub async fn post_receivable_payment(
        &self,
        conn: &mut PgConnection,
        payment_id: Uuid,
        entry_date: NaiveDate,
        applied: i64,
        overpayment: i64,
        description: &str,
    ) -> Result<Option<JournalEntry>, AppError> {
        let applied = applied.max(0);
        let overpayment = overpayment.max(0);
        let total = applied + overpayment;
        if total <= 0 {
            debug!("Nothing to post for receivable payment");
            return Ok(None);
        }

        let mut lines = vec![JournalLine::debit(chart::CASH, Decimal::from(total))];
        if applied > 0 {
            lines.push(JournalLine::credit(
                chart::ACCOUNTS_RECEIVABLE,
                Decimal::from(applied),
            ));
        }
        if overpayment > 0 {
            lines.push(
                JournalLine::credit(chart::CUSTOMER_ADVANCES, Decimal::from(overpayment))
                    .with_memo("held as customer advance"),
            );
        }

        self.post_entry(
            conn,
            EntryType::ReceivablePayment,
            entry_date,
            Some("receivable_payment"),
            Some(payment_id),
            Some(description),
            &lines,
        )
        .await
        .map(Some)
    }

    /// Outgoing supplier transaction (goods received): debit inventory,
    /// credit the supplier payable.
    #[instrument(skip(self, conn), fields(transaction_id = %transaction_id, amount = amount))]
    pub async fn post_outgoing_transaction(
        &self,
        conn: &mut PgConnection,
        transaction_id: Uuid,
        entry_date: NaiveDate,
        amount: i64,
        description: &str,
    ) -> Result<Option<JournalEntry>, AppError> {
        if amount <= 0 {
            debug!(amount = amount, "Nothing to post for supplier transaction");
            return Ok(None);
        }

        let lines = [
            JournalLine::debit(chart::INVENTORY, Decimal::from(amount)),
            JournalLine::credit(chart::ACCOUNTS_PAYABLE, Decimal::from(amount)),
        ];

        self.post_entry(
            conn,
            EntryType::SupplierTransaction,
            entry_date,
            Some("supplier_transaction"),
            Some(transaction_id),
            Some(description),
            &lines,
        )
        .await
        .map(Some)
    }

    /// Supplier payment: debit the payable, credit cash.
    #[instrument(skip(self, conn), fields(payment_id = %payment_id, amount = amount))]
    pub async fn post_supplier_payment(
        &self,
        conn: &mut PgConnection,
        payment_id: Uuid,
        entry_date: NaiveDate,
        amount: i64,
        description: &str,
    ) -> Result<Option<JournalEntry>, AppError> {
        if amount <= 0 {
            debug!(amount = amount, "Nothing to post for supplier payment");
            return Ok(None);
        }

        let lines = [
            JournalLine::debit(chart::ACCOUNTS_PAYABLE, Decimal::from(amount)),
            JournalLine::credit(chart::CASH, Decimal::from(amount)),
        ];

        self.post_entry(
            conn,
            EntryType::SupplierPayment,
            entry_date,
            Some("supplier_payment"),
            Some(payment_id),
            Some(description),
            &lines,
        )
        .await
        .map(Some)
    }

    /// Delivery trip expense paid in cash.
    #[instrument(skip(self, conn), fields(trip_id = %trip_id, amount = amount))]
    pub async fn post_delivery_trip_expense(
        &self,
        conn: &mut PgConnection,
        trip_id: Uuid,
        entry_date: NaiveDate,
        amount: i64,
        description: &str,
    ) -> Result<Option<JournalEntry>, AppError> {
        if amount <= 0 {
            debug!(amount = amount, "Nothing to post for trip expense");
            return Ok(None);
        }

        let lines = [
            JournalLine::debit(chart::DELIVERY_EXPENSE, Decimal::from(amount)),
            JournalLine::credit(chart::CASH, Decimal::from(amount)),
        ];

        self.post_entry(
            conn,
            EntryType::DeliveryTripExpense,
            entry_date,
            Some("delivery_trip"),
            Some(trip_id),
            Some(description),
            &lines,
        )
        .await
        .map(Some)
    }

    /// Correction after a trip's actual cost is known. A positive difference
    /// means the cost grew and cash flows out; a negative difference means
    /// cash comes back in. Zero posts nothing.
    #[instrument(skip(self, conn), fields(trip_id = %trip_id, difference = difference))]
    pub async fn post_delivery_trip_adjustment(
        &self,
        conn: &mut PgConnection,
        trip_id: Uuid,
        entry_date: NaiveDate,
        difference: i64,
        description: &str,
    ) -> Result<Option<JournalEntry>, AppError> {
        if difference == 0 {
            debug!("Nothing to post for trip adjustment");
            return Ok(None);
        }

        let amount = Decimal::from(difference.abs());
        let lines = if difference > 0 {
            [
                JournalLine::debit(chart::DELIVERY_EXPENSE, amount),
                JournalLine::credit(chart::CASH, amount),
            ]
        } else {
            [
                JournalLine::debit(chart::CASH, amount),
                JournalLine::credit(chart::DELIVERY_EXPENSE, amount),
            ]
        };

        self.post_entry(
            conn,
            EntryType::DeliveryTripAdjustment,
            entry_date,
            Some("delivery_trip"),
            Some(trip_id),
            Some(description),
            &lines,
        )
        .await
        .map(Some)
    }

    /// Resolve every distinct account code to its id, failing with one
    /// validation error listing all unknown codes.
    async fn resolve_accounts(
        &self,
        conn: &mut PgConnection,
        lines: &[NormalizedLine],
    ) -> Result<HashMap<String, Uuid>, AppError> {
        let codes: Vec<String> = lines
            .iter()
            .map(|l| l.code.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let rows: Vec<(String, Uuid)> = sqlx::query_as(
            r#"
            SELECT code, account_id
            FROM accounts
            WHERE code = ANY($1)
            "#,
        )
        .bind(&codes)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to resolve accounts: {}", e)))?;

        let resolved: HashMap<String, Uuid> = rows.into_iter().collect();

        let missing: Vec<&str> = codes
            .iter()
            .filter(|c| !resolved.contains_key(c.as_str()))
            .map(|c| c.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(AppError::validation(
                "journal",
                format!("accounts not found: {}", missing.join(", ")),
            ));
        }

        Ok(resolved)
    }

    /// Next number in the day's dense sequence, formatted `JR-YYYYMMDD-NNNN`.
    ///
    /// The upsert takes a row lock on the day's counter, so concurrent
    /// postings within the same (caller-owned) transaction scope serialize on
    /// it and no two entries share a number.
    async fn next_entry_number(
        &self,
        conn: &mut PgConnection,
        entry_date: NaiveDate,
    ) -> Result<String, AppError> {
        let seq: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO journal_day_counters (entry_date, last_number)
            VALUES ($1, 1)
            ON CONFLICT (entry_date)
            DO UPDATE SET last_number = journal_day_counters.last_number + 1
            RETURNING last_number
            "#,
        )
        .bind(entry_date)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to advance entry counter: {}", e))
        })?;

        Ok(format_entry_number(entry_date, seq))
    }
}

fn format_entry_number(entry_date: NaiveDate, seq: i32) -> String {
    format!("JR-{}-{:04}", entry_date.format("%Y%m%d"), seq)
}

/// Round to a whole non-negative integer amount (half away from zero).
fn normalize_amount(amount: Decimal) -> i64 {
    amount
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or(0)
        .max(0)
}

/// Drop unusable lines and coerce amounts to non-negative integers.
fn normalize_lines(lines: &[JournalLine]) -> Vec<NormalizedLine> {
    lines
        .iter()
        .filter_map(|line| {
            let code = line.code.trim();
            if code.is_empty() {
                return None;
            }
            let debit = normalize_amount(line.debit);
            let credit = normalize_amount(line.credit);
            if debit == 0 && credit == 0 {
                return None;
            }
            Some(NormalizedLine {
                code: code.to_string(),
                debit,
                credit,
                memo: line.memo.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str_exact(s).unwrap()
    }

    #[test]
    fn normalization_drops_empty_codes_and_zero_lines() {
        let lines = vec![
            JournalLine::debit("", Decimal::from(100)),
            JournalLine::debit("1101", Decimal::ZERO),
            JournalLine::debit("1101", Decimal::from(100)),
            JournalLine::credit("4101", Decimal::from(100)),
        ];
        let normalized = normalize_lines(&lines);
        assert_eq!(normalized.len(), 2);
        assert_eq!(normalized[0].code, "1101");
        assert_eq!(normalized[0].debit, 100);
        assert_eq!(normalized[1].credit, 100);
    }

    #[test]
    fn normalization_rounds_half_away_from_zero_and_clamps_negatives() {
        let lines = vec![
            JournalLine::debit("1101", dec("99.5")),
            JournalLine::credit("4101", dec("100.4")),
            JournalLine::debit("1102", dec("-25")),
        ];
        let normalized = normalize_lines(&lines);
        assert_eq!(normalized.len(), 2);
        assert_eq!(normalized[0].debit, 100);
        assert_eq!(normalized[1].credit, 100);
    }

    #[test]
    fn entry_numbers_are_date_scoped_and_zero_padded() {
        let date = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap();
        assert_eq!(format_entry_number(date, 1), "JR-20250901-0001");
        assert_eq!(format_entry_number(date, 42), "JR-20250901-0042");
        assert_eq!(format_entry_number(date, 12345), "JR-20250901-12345");
    }
}
