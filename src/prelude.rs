//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::context::{Context, ContextBuilder, SeedData};

pub use crate::error::EntityLiteError;

pub use crate::expr::{Col, Expr, OrderKey, col};

pub use crate::metadata::{
    EntityDef, EntityMeta, EntityRegistry, FieldDef, ForeignKeyDef,
};

pub use crate::query::Query;
pub use crate::record::Record;

pub use crate::results::{DbRow, DmlOutcome, ResultSet};

pub use crate::schema::metadata::ColumnMetadata;

pub use crate::sqlite::{
    SqliteConnection, SqliteOptions, SqliteOptionsBuilder, Transaction,
};

pub use crate::value::{FieldType, FieldValue};
