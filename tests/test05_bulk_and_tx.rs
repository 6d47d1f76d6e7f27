use entity_lite::prelude::*;

async fn item_context() -> Result<Context, EntityLiteError> {
    let ctx = Context::builder(":memory:").build()?;
    ctx.register(
        EntityDef::new("Item")
            .field("name", FieldDef::text().not_null())
            .field("qty", FieldDef::integer().default_value(0_i64)),
    )?;
    ctx.initialize().await?;
    Ok(ctx)
}

#[tokio::test]
async fn insert_many_assigns_keys_in_one_batch() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = item_context().await?;
    let mut records = Vec::new();
    for name in ["bolt", "nut", "washer"] {
        let mut record = ctx.new_record("Item")?;
        record.set("name", name)?;
        records.push(record);
    }
    ctx.insert_many(&mut records).await?;

    assert!(records.iter().all(Record::is_persisted));
    let ids: Vec<i64> = records.iter().filter_map(Record::id).collect();
    assert_eq!(ids, [1, 2, 3]);
    assert_eq!(ctx.query("Item")?.count().await?, 3);
    Ok(())
}

#[tokio::test]
async fn insert_many_rolls_back_on_first_failure() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = item_context().await?;
    let mut good = ctx.new_record("Item")?;
    good.set("name", "bolt")?;
    // name stays NULL, so the second row violates its NOT NULL constraint.
    let bad = ctx.new_record("Item")?;
    let mut records = vec![good, bad];

    let err = ctx.insert_many(&mut records).await.unwrap_err();
    assert!(matches!(err, EntityLiteError::SqliteError(_)));

    assert_eq!(ctx.query("Item")?.count().await?, 0);
    // The row that did execute was rolled back with the batch, so its
    // record must not claim persistence.
    assert!(!records[0].is_persisted());
    assert_eq!(records[0].id(), None);
    Ok(())
}

#[tokio::test]
async fn update_many_commits_as_a_unit() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = item_context().await?;
    let mut records = Vec::new();
    for name in ["bolt", "nut"] {
        let mut record = ctx.new_record("Item")?;
        record.set("name", name)?;
        record.save(&ctx).await?;
        records.push(record);
    }

    records[0].set("qty", 10_i64)?;
    records[1].set("qty", 20_i64)?;
    ctx.update_many(&mut records).await?;

    let bolt = ctx.get_by_id("Item", records[0].id().unwrap()).await?.unwrap();
    assert_eq!(bolt.get("qty")?.as_int(), Some(&10));
    let nut = ctx.get_by_id("Item", records[1].id().unwrap()).await?.unwrap();
    assert_eq!(nut.get("qty")?.as_int(), Some(&20));
    Ok(())
}

#[tokio::test]
async fn update_many_aborts_on_a_transient_record() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = item_context().await?;
    let mut saved = ctx.new_record("Item")?;
    saved.set("name", "bolt")?;
    saved.save(&ctx).await?;
    let saved_id = saved.id().unwrap();

    saved.set("qty", 99_i64)?;
    let transient = ctx.new_record("Item")?;
    let mut records = vec![saved, transient];

    let err = ctx.update_many(&mut records).await.unwrap_err();
    assert!(matches!(err, EntityLiteError::NotPersisted { .. }));

    // The batch never committed, so the first record's change is not stored.
    let bolt = ctx.get_by_id("Item", saved_id).await?.unwrap();
    assert_eq!(bolt.get("qty")?.as_int(), Some(&0));
    Ok(())
}

#[tokio::test]
async fn explicit_tx_commits() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = item_context().await?;
    let tx = ctx.begin().await?;
    tx.execute(
        "INSERT INTO items (name, qty) VALUES (?, ?)",
        &[FieldValue::Text("bolt".into()), FieldValue::Int(4)],
    )
    .await?;

    // Statements inside the transaction see the uncommitted row.
    let rs = tx.query("SELECT COUNT(*) AS cnt FROM items", &[]).await?;
    assert_eq!(rs.rows[0].get("cnt").and_then(|v| v.as_int()), Some(&1));

    tx.commit().await?;
    assert_eq!(ctx.query("Item")?.count().await?, 1);
    Ok(())
}

#[tokio::test]
async fn explicit_tx_rolls_back() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = item_context().await?;
    let tx = ctx.begin().await?;
    tx.execute(
        "INSERT INTO items (name, qty) VALUES (?, ?)",
        &[FieldValue::Text("bolt".into()), FieldValue::Int(4)],
    )
    .await?;
    tx.rollback().await?;
    assert_eq!(ctx.query("Item")?.count().await?, 0);
    Ok(())
}

#[tokio::test]
async fn dropped_tx_rolls_back() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = item_context().await?;
    {
        let tx = ctx.begin().await?;
        tx.execute(
            "INSERT INTO items (name, qty) VALUES (?, ?)",
            &[FieldValue::Text("bolt".into()), FieldValue::Int(4)],
        )
        .await?;
        // No commit; dropping the guard must roll the insert back.
    }
    assert_eq!(ctx.query("Item")?.count().await?, 0);
    Ok(())
}

#[tokio::test]
async fn open_tx_blocks_non_tx_commands() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = item_context().await?;
    let tx = ctx.begin().await?;

    let err = ctx.query("Item").unwrap().count().await.unwrap_err();
    assert!(
        format!("{err}").contains("SQLite transaction in progress; operation not permitted")
    );

    let err = ctx
        .connection()
        .execute(
            "INSERT INTO items (name) VALUES (?)",
            &[FieldValue::Text("bolt".into())],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EntityLiteError::ExecutionError(_)));

    tx.rollback().await?;
    assert_eq!(ctx.query("Item")?.count().await?, 0);
    Ok(())
}
