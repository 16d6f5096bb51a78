//! Customer and supplier records carrying the denormalized running balances.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Which side of the ledger a party sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyKind {
    Customer,
    Supplier,
}

impl PartyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Supplier => "supplier",
        }
    }
}

impl std::fmt::Display for PartyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A customer. `outstanding_receivable` is a cache over the receivable
/// ledger; the ledger rows stay the source of truth.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Customer {
    pub customer_id: Uuid,
    pub name: String,
    pub outstanding_receivable: i64,
    pub created_utc: DateTime<Utc>,
}

/// A supplier. `outstanding_payable` is a cache over the supplier ledger,
/// clamped at zero.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Supplier {
    pub supplier_id: Uuid,
    pub name: String,
    pub outstanding_payable: i64,
    pub created_utc: DateTime<Utc>,
}
