use chrono::NaiveDate;
use entity_lite::prelude::*;
use rust_decimal::Decimal;

async fn measurement_context() -> Result<Context, EntityLiteError> {
    let ctx = Context::builder(":memory:").build()?;
    ctx.register(
        EntityDef::new("Measurement")
            .field("taken_at", FieldDef::timestamp())
            .field("ok", FieldDef::boolean())
            .field("amount", FieldDef::decimal())
            .field("score", FieldDef::real()),
    )?;
    ctx.initialize().await?;
    Ok(ctx)
}

#[tokio::test]
async fn timestamps_round_trip_with_fraction() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = measurement_context().await?;
    let taken_at = NaiveDate::from_ymd_opt(2024, 3, 1)
        .unwrap()
        .and_hms_micro_opt(12, 34, 56, 789_012)
        .unwrap();

    let mut row = ctx.new_record("Measurement")?;
    row.set("taken_at", taken_at)?;
    row.save(&ctx).await?;

    let fetched = ctx.get_by_id("Measurement", row.id().unwrap()).await?.unwrap();
    assert_eq!(fetched.get("taken_at")?.as_timestamp(), Some(taken_at));
    Ok(())
}

#[tokio::test]
async fn booleans_store_as_integers() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = measurement_context().await?;
    let mut row = ctx.new_record("Measurement")?;
    row.set("ok", false)?;
    row.save(&ctx).await?;

    // On disk the column is INTEGER 0/1.
    let rs = ctx
        .connection()
        .query("SELECT ok FROM measurements WHERE id = ?", &[FieldValue::Int(row.id().unwrap())])
        .await?;
    assert_eq!(rs.rows[0].get("ok"), Some(&FieldValue::Int(0)));

    let fetched = ctx.get_by_id("Measurement", row.id().unwrap()).await?.unwrap();
    assert_eq!(fetched.get("ok")?, &FieldValue::Bool(false));
    Ok(())
}

#[tokio::test]
async fn decimals_survive_real_storage() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = measurement_context().await?;
    let amount = Decimal::new(1999, 2); // 19.99
    let mut row = ctx.new_record("Measurement")?;
    row.set("amount", amount)?;
    row.save(&ctx).await?;

    let fetched = ctx.get_by_id("Measurement", row.id().unwrap()).await?.unwrap();
    let got = fetched.get("amount")?.as_decimal().unwrap();
    assert!((got - amount).abs() < Decimal::new(1, 9));
    Ok(())
}

#[tokio::test]
async fn invalid_stored_text_fails_decode() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = measurement_context().await?;
    let outcome = ctx
        .connection()
        .execute(
            "INSERT INTO measurements (taken_at) VALUES (?)",
            &[FieldValue::Text("not-a-time".into())],
        )
        .await?;

    let err = ctx
        .get_by_id("Measurement", outcome.last_insert_id)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EntityLiteError::TypeCoercion { column, .. } if column == "taken_at"
    ));
    Ok(())
}

#[tokio::test]
async fn out_of_range_boolean_fails_decode() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = measurement_context().await?;
    let outcome = ctx
        .connection()
        .execute(
            "INSERT INTO measurements (ok) VALUES (?)",
            &[FieldValue::Int(7)],
        )
        .await?;

    let err = ctx
        .get_by_id("Measurement", outcome.last_insert_id)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EntityLiteError::TypeCoercion { column, .. } if column == "ok"
    ));
    Ok(())
}

#[tokio::test]
async fn integers_widen_on_assignment() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = measurement_context().await?;
    let mut row = ctx.new_record("Measurement")?;
    row.set("score", 5_i64)?;
    row.set("amount", 7_i64)?;
    assert_eq!(row.get("score")?, &FieldValue::Real(5.0));
    assert_eq!(row.get("amount")?, &FieldValue::Decimal(Decimal::from(7)));

    // Widening is one way; a float does not narrow into an integer column.
    ctx.register(EntityDef::new("Counter").field("hits", FieldDef::integer()))?;
    let mut counter = ctx.new_record("Counter")?;
    let err = counter.set("hits", 1.5).unwrap_err();
    assert!(matches!(err, EntityLiteError::TypeCoercion { .. }));
    Ok(())
}

#[tokio::test]
async fn undeclared_live_columns_are_ignored() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = measurement_context().await?;
    ctx.connection()
        .execute_batch("ALTER TABLE measurements ADD COLUMN extra TEXT")
        .await?;
    let outcome = ctx
        .connection()
        .execute(
            "INSERT INTO measurements (score, extra) VALUES (?, ?)",
            &[FieldValue::Real(1.0), FieldValue::Text("spare".into())],
        )
        .await?;

    let fetched = ctx
        .get_by_id("Measurement", outcome.last_insert_id)
        .await?
        .unwrap();
    assert_eq!(fetched.get("score")?, &FieldValue::Real(1.0));
    let err = fetched.get("extra").unwrap_err();
    assert!(matches!(err, EntityLiteError::UnknownAttribute { .. }));
    Ok(())
}
