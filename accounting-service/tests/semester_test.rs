//! Integration tests for the semester gate.

mod common;

use accounting_service::services::settings::ACTIVE_PERIOD_KEY;
use accounting_service::services::{
    AppSettings, GateInput, GateScope, SemesterBookService, SemesterGate,
};
use serial_test::serial;
use service_core::error::AppError;
use std::time::Duration;

fn gate() -> SemesterGate {
    SemesterGate::new(SemesterBookService::new(), AppSettings::new(Duration::from_secs(60)))
}

#[tokio::test]
async fn open_period_with_unlocked_party_passes() {
    let pool = common::setup().await;
    let period = common::unique_period();
    common::seed_period(&pool, &period, true, false).await;
    let customer_id = common::create_customer(&pool, 0).await;

    let input = GateInput::new()
        .with_param("semester", &period)
        .with_param("customer_id", customer_id.to_string());

    let mut conn = pool.acquire().await.unwrap();
    let access = gate()
        .authorize(&mut conn, GateScope::Receivable, &input)
        .await
        .expect("open period must pass");

    assert_eq!(access.period_code, period);
    assert_eq!(access.party.map(|(_, id)| id), Some(customer_id));
}

#[tokio::test]
async fn closed_period_is_rejected_even_for_admins() {
    let pool = common::setup().await;
    let period = common::unique_period();
    common::seed_period(&pool, &period, true, true).await;

    let mut conn = pool.acquire().await.unwrap();

    let input = GateInput::new().with_param("semester", &period);
    let err = gate()
        .authorize(&mut conn, GateScope::Receivable, &input)
        .await
        .expect_err("closed period must be rejected");
    assert!(matches!(err, AppError::Forbidden(_)));

    let admin_input = GateInput::new().with_param("semester", &period).admin();
    let err = gate()
        .authorize(&mut conn, GateScope::Receivable, &admin_input)
        .await
        .expect_err("admins do not bypass a closed period");
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[tokio::test]
async fn locked_party_is_rejected_unless_admin() {
    let pool = common::setup().await;
    let period = common::unique_period();
    common::seed_period(&pool, &period, true, false).await;
    let supplier_id = common::create_supplier(&pool, 0).await;
    common::lock_party(&pool, &period, "supplier", supplier_id).await;

    let mut conn = pool.acquire().await.unwrap();

    let input = GateInput::new()
        .with_param("semester", &period)
        .with_param("supplier_id", supplier_id.to_string());
    let err = gate()
        .authorize(&mut conn, GateScope::Payable, &input)
        .await
        .expect_err("locked supplier must be rejected");
    assert!(matches!(err, AppError::Forbidden(_)));

    let admin_input = input.clone().admin();
    gate()
        .authorize(&mut conn, GateScope::Payable, &admin_input)
        .await
        .expect("admin bypasses the party lock");
}

#[tokio::test]
async fn inactive_and_unknown_periods_are_rejected() {
    let pool = common::setup().await;
    let inactive = common::unique_period();
    common::seed_period(&pool, &inactive, false, false).await;

    let mut conn = pool.acquire().await.unwrap();

    let err = gate()
        .authorize(
            &mut conn,
            GateScope::Receivable,
            &GateInput::new().with_param("semester", &inactive),
        )
        .await
        .expect_err("inactive period must be rejected");
    assert!(matches!(err, AppError::Forbidden(_)));

    // Unknown periods report closed.
    let err = gate()
        .authorize(
            &mut conn,
            GateScope::Receivable,
            &GateInput::new().with_param("semester", common::unique_period()),
        )
        .await
        .expect_err("unknown period must be rejected");
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[tokio::test]
#[serial(app_settings)]
async fn explicit_period_beats_the_configured_active_period() {
    let pool = common::setup().await;
    let configured = common::unique_period();
    let explicit = common::unique_period();
    common::seed_period(&pool, &configured, true, false).await;
    common::seed_period(&pool, &explicit, true, false).await;

    let settings = AppSettings::new(Duration::from_secs(60));
    let gate = SemesterGate::new(SemesterBookService::new(), settings.clone());

    let mut conn = pool.acquire().await.unwrap();
    settings
        .set(&mut conn, ACTIVE_PERIOD_KEY, &configured)
        .await
        .unwrap();

    let access = gate
        .authorize(
            &mut conn,
            GateScope::Receivable,
            &GateInput::new().with_param("semester", &explicit),
        )
        .await
        .unwrap();
    assert_eq!(access.period_code, explicit);

    let access = gate
        .authorize(&mut conn, GateScope::Receivable, &GateInput::new())
        .await
        .unwrap();
    assert_eq!(access.period_code, configured);
}

#[tokio::test]
#[serial(app_settings)]
async fn missing_period_with_no_configuration_is_a_validation_error() {
    let pool = common::setup().await;
    let mut conn = pool.acquire().await.unwrap();

    // Make sure no active period is configured.
    sqlx::query("DELETE FROM app_settings WHERE key = $1")
        .bind(ACTIVE_PERIOD_KEY)
        .execute(&pool)
        .await
        .unwrap();

    let err = gate()
        .authorize(&mut conn, GateScope::Receivable, &GateInput::new())
        .await
        .expect_err("missing period must be rejected");
    assert_eq!(err.validation_field(), Some("semester"));
}
