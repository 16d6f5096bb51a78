//! Semester gate: the request-side check that must pass before any posting
//! or ledger write runs.
//!
//! The caller hands the gate the inbound write's parameters; the gate
//! resolves the semester period and the affected customer or supplier,
//! consults the period oracle, and rejects the write when the period is
//! closed, inactive, or the party is individually locked. The posting and
//! ledger services themselves assume this has already happened.

use service_core::error::AppError;
use sqlx::PgConnection;
use std::collections::HashMap;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::models::PartyKind;
use crate::services::settings::{AppSettings, ACTIVE_PERIOD_KEY};
use crate::services::SemesterBookService;

/// Which side of the books an inbound write touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateScope {
    /// Receivable-affecting actions: invoices, returns, customer payments.
    Receivable,
    /// Payable-affecting actions: supplier transactions and payments.
    Payable,
}

impl GateScope {
    fn party_kind(&self) -> PartyKind {
        match self {
            Self::Receivable => PartyKind::Customer,
            Self::Payable => PartyKind::Supplier,
        }
    }

    fn party_params(&self) -> [&'static str; 2] {
        match self {
            Self::Receivable => ["customer_id", "customer"],
            Self::Payable => ["supplier_id", "supplier"],
        }
    }
}

/// The inbound write's parameters as the request layer hands them over:
/// merged route and body fields, plus whether the actor is an admin.
#[derive(Debug, Clone, Default)]
pub struct GateInput {
    pub params: HashMap<String, String>,
    pub is_admin: bool,
}

impl GateInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn admin(mut self) -> Self {
        self.is_admin = true;
        self
    }

    fn first_of(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .find_map(|k| self.params.get(*k))
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }
}

/// What the gate resolved and approved.
#[derive(Debug, Clone)]
pub struct SemesterAccess {
    pub period_code: String,
    pub party: Option<(PartyKind, Uuid)>,
}

#[derive(Debug, Clone)]
pub struct SemesterGate {
    books: SemesterBookService,
    settings: AppSettings,
}

impl SemesterGate {
    pub fn new(books: SemesterBookService, settings: AppSettings) -> Self {
        Self { books, settings }
    }

    /// Run the three checks, in order: period globally closed, party locked
    /// within the period (admins bypass this one), period active. Returns
    /// the resolved access on success.
    #[instrument(skip(self, conn, input), fields(scope = ?scope, is_admin = input.is_admin))]
    pub async fn authorize(
        &self,
        conn: &mut PgConnection,
        scope: GateScope,
        input: &GateInput,
    ) -> Result<SemesterAccess, AppError> {
        let period_code = self.resolve_period(conn, input).await?;
        let party = resolve_party(scope, input)?;

        if self.books.is_period_closed(conn, &period_code).await? {
            return Err(AppError::Forbidden(anyhow::anyhow!(
                "semester period {} is closed",
                period_code
            )));
        }

        if let Some((kind, party_id)) = party {
            let locked = self
                .books
                .is_party_locked(conn, &period_code, kind, party_id)
                .await?;
            if locked && !input.is_admin {
                return Err(AppError::Forbidden(anyhow::anyhow!(
                    "{} {} is locked for period {}",
                    kind,
                    party_id,
                    period_code
                )));
            }
            if locked {
                debug!(%party_id, "Admin bypassing party lock");
            }
        }

        if !self.books.is_period_active(conn, &period_code).await? {
            return Err(AppError::Forbidden(anyhow::anyhow!(
                "semester period {} is not an open book period",
                period_code
            )));
        }

        Ok(SemesterAccess { period_code, party })
    }

    /// The explicit `semester`/`period_code` field wins; otherwise fall back
    /// to the configured active period.
    pub async fn resolve_period(
        &self,
        conn: &mut PgConnection,
        input: &GateInput,
    ) -> Result<String, AppError> {
        if let Some(explicit) = input.first_of(&["semester", "period_code"]) {
            return Ok(explicit.to_string());
        }

        self.settings
            .get(conn, ACTIVE_PERIOD_KEY)
            .await?
            .ok_or_else(|| {
                AppError::validation(
                    "semester",
                    "no semester supplied and no active period configured",
                )
            })
    }
}

/// Pull the affected party id out of the request parameters. Absent party
/// fields are allowed (some gated writes are party-less); malformed ids are
/// not.
fn resolve_party(
    scope: GateScope,
    input: &GateInput,
) -> Result<Option<(PartyKind, Uuid)>, AppError> {
    let raw = match input.first_of(&scope.party_params()) {
        Some(raw) => raw,
        None => return Ok(None),
    };

    let party_id = Uuid::parse_str(raw.trim()).map_err(|_| {
        AppError::validation(
            "semester",
            format!("{} id '{}' is not a valid id", scope.party_kind(), raw),
        )
    })?;

    Ok(Some((scope.party_kind(), party_id)))
}
