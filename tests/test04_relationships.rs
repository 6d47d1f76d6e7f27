use entity_lite::prelude::*;

async fn blog_context() -> Result<Context, EntityLiteError> {
    let ctx = Context::builder(":memory:").build()?;
    ctx.register(EntityDef::new("User").field("name", FieldDef::text().not_null()))?;
    ctx.register(
        EntityDef::new("Post")
            .field("title", FieldDef::text().not_null())
            .foreign_key(
                "user_id",
                ForeignKeyDef::new("User").back_populates("posts"),
            ),
    )?;
    ctx.initialize().await?;
    Ok(ctx)
}

async fn save_user(ctx: &Context, name: &str) -> Result<Record, EntityLiteError> {
    let mut user = ctx.new_record("User")?;
    user.set("name", name)?;
    user.save(ctx).await?;
    Ok(user)
}

async fn save_post(
    ctx: &Context,
    title: &str,
    author: Option<&Record>,
) -> Result<Record, EntityLiteError> {
    let mut post = ctx.new_record("Post")?;
    post.set("title", title)?;
    if let Some(author) = author {
        post.set_to_one("user", author)?;
    }
    post.save(ctx).await?;
    Ok(post)
}

#[tokio::test]
async fn to_many_scopes_to_its_owner() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = blog_context().await?;
    let alice = save_user(&ctx, "alice").await?;
    let bob = save_user(&ctx, "bob").await?;
    save_post(&ctx, "first", Some(&alice)).await?;
    save_post(&ctx, "second", Some(&alice)).await?;
    save_post(&ctx, "other", Some(&bob)).await?;

    assert_eq!(alice.to_many(&ctx, "posts")?.count().await?, 2);
    assert_eq!(bob.to_many(&ctx, "posts")?.count().await?, 1);

    let alice_posts = alice.to_many(&ctx, "posts")?.all().await?;
    assert!(alice_posts.iter().all(|p| p.entity_name() == "Post"));
    Ok(())
}

#[tokio::test]
async fn to_many_queries_filter_further() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = blog_context().await?;
    let alice = save_user(&ctx, "alice").await?;
    save_post(&ctx, "release notes", Some(&alice)).await?;
    save_post(&ctx, "roadmap", Some(&alice)).await?;

    let matching = alice
        .to_many(&ctx, "posts")?
        .filter(col("title").like("release%"))
        .all()
        .await?;
    assert_eq!(matching.len(), 1);
    assert_eq!(matching[0].get("title")?.as_text(), Some("release notes"));
    Ok(())
}

#[tokio::test]
async fn transient_owner_matches_nothing() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = blog_context().await?;
    let alice = save_user(&ctx, "alice").await?;
    save_post(&ctx, "first", Some(&alice)).await?;

    let ghost = ctx.new_record("User")?;
    assert_eq!(ghost.to_many(&ctx, "posts")?.count().await?, 0);
    Ok(())
}

#[tokio::test]
async fn child_delete_shrinks_to_many() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = blog_context().await?;
    let alice = save_user(&ctx, "alice").await?;
    save_post(&ctx, "keep", Some(&alice)).await?;
    let mut doomed = save_post(&ctx, "drop", Some(&alice)).await?;

    assert_eq!(alice.to_many(&ctx, "posts")?.count().await?, 2);
    doomed.delete(&ctx).await?;
    assert_eq!(alice.to_many(&ctx, "posts")?.count().await?, 1);
    Ok(())
}

#[tokio::test]
async fn unknown_relations_error() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = blog_context().await?;
    let alice = save_user(&ctx, "alice").await?;
    let err = alice.to_many(&ctx, "comments").unwrap_err();
    assert!(matches!(
        err,
        EntityLiteError::UnknownAttribute { entity, attribute }
            if entity == "User" && attribute == "comments"
    ));

    let mut post = save_post(&ctx, "first", Some(&alice)).await?;
    let err = post.to_one(&ctx, "author").await.unwrap_err();
    assert!(matches!(err, EntityLiteError::UnknownAttribute { .. }));

    // back_populates installs the relation on the target, not the source.
    let err = post.to_many(&ctx, "posts").unwrap_err();
    assert!(matches!(err, EntityLiteError::UnknownAttribute { .. }));
    Ok(())
}

#[tokio::test]
async fn to_one_resolves_and_caches() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = blog_context().await?;
    let alice = save_user(&ctx, "alice").await?;
    let bob = save_user(&ctx, "bob").await?;
    let mut post = save_post(&ctx, "first", Some(&alice)).await?;

    let author = post.to_one(&ctx, "user").await?.unwrap();
    assert_eq!(author.get("name")?.as_text(), Some("alice"));

    // Remove the row behind the cache; the cached resolution still answers.
    ctx.connection()
        .execute(
            "DELETE FROM users WHERE id = ?",
            &[FieldValue::Int(alice.id().unwrap())],
        )
        .await?;
    let cached = post.to_one(&ctx, "user").await?.unwrap();
    assert_eq!(cached.get("name")?.as_text(), Some("alice"));

    // Reassigning the key column invalidates the cache.
    post.set("user_id", bob.id().unwrap())?;
    let reloaded = post.to_one(&ctx, "user").await?.unwrap();
    assert_eq!(reloaded.get("name")?.as_text(), Some("bob"));
    Ok(())
}

#[tokio::test]
async fn null_fk_resolves_to_none() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = blog_context().await?;
    let mut post = save_post(&ctx, "unowned", None).await?;
    assert!(post.to_one(&ctx, "user").await?.is_none());
    assert!(post.to_one(&ctx, "user").await?.is_none());
    Ok(())
}

#[tokio::test]
async fn set_to_one_copies_or_clears_the_key() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = blog_context().await?;
    let alice = save_user(&ctx, "alice").await?;
    let mut post = ctx.new_record("Post")?;
    post.set("title", "draft")?;

    post.set_to_one("user", &alice)?;
    assert_eq!(post.get("user_id")?, &FieldValue::Int(alice.id().unwrap()));

    let ghost = ctx.new_record("User")?;
    post.set_to_one("user", &ghost)?;
    assert_eq!(post.get("user_id")?, &FieldValue::Null);
    Ok(())
}

#[tokio::test]
async fn to_one_target_must_be_registered() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::builder(":memory:").build()?;
    ctx.register(
        EntityDef::new("Orphan")
            .field("label", FieldDef::text())
            .foreign_key("owner_id", ForeignKeyDef::new("Owner")),
    )?;
    let mut orphan = ctx.new_record("Orphan")?;
    orphan.set("owner_id", 5_i64)?;
    let err = orphan.to_one(&ctx, "owner").await.unwrap_err();
    assert!(matches!(err, EntityLiteError::UnknownEntity { name } if name == "Owner"));
    Ok(())
}
