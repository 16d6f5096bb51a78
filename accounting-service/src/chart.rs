//! Chart-of-accounts codes the per-event posting templates are keyed by.
//!
//! These mirror the seeded `accounts` rows; the posting templates fail with a
//! validation error if a code here is missing from the table.

/// Cash on hand.
pub const CASH: &str = "1101";
/// Trade receivables (customers).
pub const ACCOUNTS_RECEIVABLE: &str = "1102";
/// Merchandise inventory.
pub const INVENTORY: &str = "1103";
/// Customer advances held as a liability (overpayments).
pub const CUSTOMER_ADVANCES: &str = "2101";
/// Trade payables (suppliers).
pub const ACCOUNTS_PAYABLE: &str = "2102";
/// Sales revenue.
pub const SALES_REVENUE: &str = "4101";
/// Sales returns (contra revenue).
pub const SALES_RETURNS: &str = "4102";
/// Delivery trip expenses.
pub const DELIVERY_EXPENSE: &str = "6101";
