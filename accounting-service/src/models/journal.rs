//! Journal entry models for double-entry posting.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Tag identifying the business event an entry was posted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    SalesInvoiceCreate,
    SalesReturnCreate,
    ReceivablePayment,
    SupplierTransaction,
    SupplierPayment,
    DeliveryTripExpense,
    DeliveryTripAdjustment,
    Manual,
}

impl EntryType {
    /// Get string representation for database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SalesInvoiceCreate => "sales_invoice_create",
            Self::SalesReturnCreate => "sales_return_create",
            Self::ReceivablePayment => "receivable_payment",
            Self::SupplierTransaction => "supplier_transaction",
            Self::SupplierPayment => "supplier_payment",
            Self::DeliveryTripExpense => "delivery_trip_expense",
            Self::DeliveryTripAdjustment => "delivery_trip_adjustment",
            Self::Manual => "manual",
        }
    }
}

impl std::fmt::Display for EntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A posted journal entry. Created once, never updated or deleted.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct JournalEntry {
    pub entry_id: Uuid,
    /// Unique, `JR-YYYYMMDD-NNNN`, sequential per day.
    pub entry_number: String,
    pub entry_date: NaiveDate,
    pub entry_type: String,
    pub reference_type: Option<String>,
    pub reference_id: Option<Uuid>,
    pub description: Option<String>,
    pub created_utc: DateTime<Utc>,
}

/// A single debit-or-credit line of a posted entry.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct JournalEntryLine {
    pub line_id: Uuid,
    pub entry_id: Uuid,
    pub account_id: Uuid,
    pub line_no: i32,
    pub debit: i64,
    pub credit: i64,
    pub memo: Option<String>,
}

impl JournalEntryLine {
    /// Signed amount (positive for debit, negative for credit).
    pub fn signed_amount(&self) -> i64 {
        self.debit - self.credit
    }
}

/// Input line for `post_entry`. Amounts arrive as decimals from callers and
/// are rounded to whole integer amounts during normalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalLine {
    pub code: String,
    pub debit: Decimal,
    pub credit: Decimal,
    pub memo: Option<String>,
}

impl JournalLine {
    pub fn debit(code: impl Into<String>, amount: impl Into<Decimal>) -> Self {
        Self {
            code: code.into(),
            debit: amount.into(),
            credit: Decimal::ZERO,
            memo: None,
        }
    }

    pub fn credit(code: impl Into<String>, amount: impl Into<Decimal>) -> Self {
        Self {
            code: code.into(),
            debit: Decimal::ZERO,
            credit: amount.into(),
            memo: None,
        }
    }

    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }
}
