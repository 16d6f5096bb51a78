//! Domain models for accounting-service.

mod account;
mod journal;
mod ledger;
mod party;
mod semester;

pub use account::{Account, AccountType};
pub use journal::{EntryType, JournalEntry, JournalEntryLine, JournalLine};
pub use ledger::{ReceivableLedgerEntry, SupplierLedgerEntry};
pub use party::{Customer, PartyKind, Supplier};
pub use semester::SemesterBook;
