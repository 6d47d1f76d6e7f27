//! An async object mapper for SQLite built on a dedicated worker thread.
//!
//! Entity shapes are declared at runtime with [`metadata::EntityDef`], registered
//! on a [`context::Context`], and synchronized into SQLite tables. Records move
//! through a uniform save/delete lifecycle, and reads go through a chainable
//! [`query::Query`] builder that compiles filter expressions to parameterized SQL.
//!
//! ```rust,no_run
//! use entity_lite::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), EntityLiteError> {
//!     let ctx = Context::builder(":memory:").build()?;
//!     ctx.register(
//!         EntityDef::new("Product")
//!             .field("name", FieldDef::text().not_null())
//!             .field("price", FieldDef::real()),
//!     )?;
//!     ctx.initialize().await?;
//!
//!     let mut widget = ctx.new_record("Product")?;
//!     widget.set("name", "widget")?;
//!     widget.set("price", 59.5)?;
//!     widget.save(&ctx).await?;
//!
//!     let expensive = ctx
//!         .query("Product")?
//!         .filter(col("price").gt(50.0))
//!         .order_by([col("price").desc()])
//!         .all()
//!         .await?;
//!     println!("{} expensive products", expensive.len());
//!     Ok(())
//! }
//! ```

pub mod context;
pub mod error;
pub mod expr;
pub mod metadata;
pub mod prelude;
pub mod query;
pub mod record;
pub mod results;
pub mod schema;
pub mod sqlite;
pub mod value;

pub use error::EntityLiteError;
