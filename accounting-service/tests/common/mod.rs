//! Common test utilities for accounting-service integration tests.
#![allow(dead_code)] // not every test binary uses every helper

use accounting_service::services::Database;
use chrono::NaiveDate;
use sqlx::PgPool;
use std::sync::Once;
use uuid::Uuid;

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,accounting_service=debug,sqlx=warn")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Connect to the test database and run migrations.
pub async fn setup() -> PgPool {
    init_tracing();

    let database_url = std::env::var("TEST_DATABASE_URL")
        .expect("TEST_DATABASE_URL must be set to run integration tests");

    let db = Database::new(&database_url, 5, 1)
        .await
        .expect("Failed to connect to test database");
    db.run_migrations()
        .await
        .expect("Failed to run migrations");

    db.pool().clone()
}

/// Create a customer with an opening receivable balance.
pub async fn create_customer(pool: &PgPool, opening_balance: i64) -> Uuid {
    let customer_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO customers (customer_id, name, outstanding_receivable) VALUES ($1, $2, $3)",
    )
    .bind(customer_id)
    .bind(format!("Test Customer {}", customer_id))
    .bind(opening_balance)
    .execute(pool)
    .await
    .expect("Failed to create customer");
    customer_id
}

/// Create a supplier with an opening payable balance.
pub async fn create_supplier(pool: &PgPool, opening_balance: i64) -> Uuid {
    let supplier_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO suppliers (supplier_id, name, outstanding_payable) VALUES ($1, $2, $3)",
    )
    .bind(supplier_id)
    .bind(format!("Test Supplier {}", supplier_id))
    .bind(opening_balance)
    .execute(pool)
    .await
    .expect("Failed to create supplier");
    supplier_id
}

/// Insert (or reset) a semester book period.
pub async fn seed_period(pool: &PgPool, period_code: &str, is_active: bool, is_closed: bool) {
    sqlx::query(
        r#"
        INSERT INTO semester_books (period_code, is_active, is_closed)
        VALUES ($1, $2, $3)
        ON CONFLICT (period_code)
        DO UPDATE SET is_active = EXCLUDED.is_active, is_closed = EXCLUDED.is_closed
        "#,
    )
    .bind(period_code)
    .bind(is_active)
    .bind(is_closed)
    .execute(pool)
    .await
    .expect("Failed to seed period");
}

/// Lock a party within a period.
pub async fn lock_party(pool: &PgPool, period_code: &str, party_kind: &str, party_id: Uuid) {
    sqlx::query(
        r#"
        INSERT INTO semester_party_locks (period_code, party_kind, party_id)
        VALUES ($1, $2, $3)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(period_code)
    .bind(party_kind)
    .bind(party_id)
    .execute(pool)
    .await
    .expect("Failed to lock party");
}

/// A short period code unique to this test run.
pub fn unique_period() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("S1-{}", &suffix[..8])
}

/// A date unlikely to collide with any other test's day counter.
pub fn unique_date() -> NaiveDate {
    let offset = (Uuid::new_v4().as_u128() % 200_000) as i64;
    NaiveDate::from_ymd_opt(1600, 1, 1)
        .unwrap()
        .checked_add_signed(chrono::Duration::days(offset))
        .unwrap()
}

/// Count journal entries pointing at a reference id.
pub async fn entries_for_reference(pool: &PgPool, reference_id: Uuid) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM journal_entries WHERE reference_id = $1")
        .bind(reference_id)
        .fetch_one(pool)
        .await
        .expect("Failed to count entries")
}
