//! Semester book periods gating transaction writes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A semester bookkeeping period, e.g. `S1-2526`. The posting core only
/// reads this state; opening and closing periods happens elsewhere.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SemesterBook {
    pub period_code: String,
    pub is_active: bool,
    pub is_closed: bool,
    pub created_utc: DateTime<Utc>,
}

impl SemesterBook {
    /// Whether new transactions may be written into this period.
    pub fn accepts_writes(&self) -> bool {
        self.is_active && !self.is_closed
    }
}
