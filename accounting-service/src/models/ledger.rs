//! Append-only running-balance ledger rows.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One movement on a customer's receivable balance. Never mutated or deleted
/// after insert; corrections post new offsetting rows.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ReceivableLedgerEntry {
    pub ledger_id: Uuid,
    pub customer_id: Uuid,
    pub reference_id: Option<Uuid>,
    pub entry_date: NaiveDate,
    pub period_code: String,
    pub debit: i64,
    pub credit: i64,
    /// Customer balance at the instant this row was posted. Authoritative for
    /// that instant; callers should trust it over any locally computed value.
    pub balance_after: i64,
    pub description: Option<String>,
    pub created_utc: DateTime<Utc>,
}

impl ReceivableLedgerEntry {
    /// Signed movement (positive grows the receivable).
    pub fn signed_amount(&self) -> i64 {
        self.debit - self.credit
    }
}

/// One movement on a supplier's payable balance. Same append-only contract
/// as the receivable side; debit grows the amount owed to the supplier.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SupplierLedgerEntry {
    pub ledger_id: Uuid,
    pub supplier_id: Uuid,
    pub reference_id: Option<Uuid>,
    pub entry_date: NaiveDate,
    pub period_code: String,
    pub debit: i64,
    pub credit: i64,
    pub balance_after: i64,
    pub description: Option<String>,
    pub created_utc: DateTime<Utc>,
}

impl SupplierLedgerEntry {
    pub fn signed_amount(&self) -> i64 {
        self.debit - self.credit
    }
}
