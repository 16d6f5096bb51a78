//! Service layer: posting engine, ledgers, period gate, infrastructure.

pub mod accounting;
pub mod database;
pub mod gate;
pub mod metrics;
pub mod receivable_ledger;
pub mod semester;
pub mod settings;
pub mod supplier_ledger;

pub use accounting::AccountingService;
pub use database::Database;
pub use gate::{GateInput, GateScope, SemesterAccess, SemesterGate};
pub use receivable_ledger::ReceivableLedgerService;
pub use semester::SemesterBookService;
pub use settings::AppSettings;
pub use supplier_ledger::SupplierLedgerService;

use serde::Serialize;

/// Outcome of a ledger-vs-cache reconciliation pass.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Reconciliation {
    /// The balance recomputed from the ledger rows (clamped at zero).
    pub balance: i64,
    /// Whether the cached column had drifted and was rewritten.
    pub changed: bool,
}
