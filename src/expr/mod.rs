// Filter and ordering expressions. `col` is the entry point: it names a
// column, comparison methods on the handle produce `Expr` leaves, and
// `asc`/`desc` produce ordering keys. Compilation to parameterized SQL
// lives in `compile`.

pub(crate) mod compile;

use crate::value::FieldValue;

/// Reference a column for predicate or ordering construction.
///
/// ```rust
/// use entity_lite::prelude::*;
///
/// let adults = col("age").gte(18_i64);
/// let newest_first = col("created_at").desc();
/// # let _ = (adults, newest_first);
/// ```
#[must_use]
pub fn col(name: impl Into<String>) -> Col {
    Col { name: name.into() }
}

/// A column handle produced by [`col`].
#[derive(Debug, Clone)]
pub struct Col {
    name: String,
}

/// Comparison operators between a column and a bound value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl CompareOp {
    #[must_use]
    pub(crate) fn sql(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
        }
    }
}

/// One predicate leaf. Filters are flat: a query ANDs its expressions
/// together, with no nested boolean grouping.
#[derive(Debug, Clone)]
pub enum Expr {
    /// `column <op> ?`
    Compare {
        column: String,
        op: CompareOp,
        value: FieldValue,
    },
    /// `column IN (?, ...)`, one placeholder per value
    InSet {
        column: String,
        values: Vec<FieldValue>,
    },
    /// `column IS NULL` / `column IS NOT NULL`
    NullCheck { column: String, negated: bool },
    /// `column LIKE ?`, pattern passed through with its SQL wildcards
    Like { column: String, pattern: String },
}

/// One ORDER BY key with an explicit direction.
#[derive(Debug, Clone)]
pub struct OrderKey {
    pub(crate) column: String,
    pub(crate) descending: bool,
}

impl Col {
    fn compare(self, op: CompareOp, value: impl Into<FieldValue>) -> Expr {
        Expr::Compare {
            column: self.name,
            op,
            value: value.into(),
        }
    }

    #[must_use]
    pub fn eq(self, value: impl Into<FieldValue>) -> Expr {
        self.compare(CompareOp::Eq, value)
    }

    #[must_use]
    pub fn ne(self, value: impl Into<FieldValue>) -> Expr {
        self.compare(CompareOp::Ne, value)
    }

    #[must_use]
    pub fn lt(self, value: impl Into<FieldValue>) -> Expr {
        self.compare(CompareOp::Lt, value)
    }

    #[must_use]
    pub fn lte(self, value: impl Into<FieldValue>) -> Expr {
        self.compare(CompareOp::Lte, value)
    }

    #[must_use]
    pub fn gt(self, value: impl Into<FieldValue>) -> Expr {
        self.compare(CompareOp::Gt, value)
    }

    #[must_use]
    pub fn gte(self, value: impl Into<FieldValue>) -> Expr {
        self.compare(CompareOp::Gte, value)
    }

    /// SQL LIKE; the caller supplies wildcard syntax in the pattern.
    #[must_use]
    pub fn like(self, pattern: impl Into<String>) -> Expr {
        Expr::Like {
            column: self.name,
            pattern: pattern.into(),
        }
    }

    /// SQL IN over a set of values. An empty set fails with
    /// [`EntityLiteError::EmptyMembership`](crate::EntityLiteError::EmptyMembership)
    /// when the query runs.
    #[must_use]
    pub fn is_in<V, I>(self, values: I) -> Expr
    where
        V: Into<FieldValue>,
        I: IntoIterator<Item = V>,
    {
        Expr::InSet {
            column: self.name,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn is_null(self) -> Expr {
        Expr::NullCheck {
            column: self.name,
            negated: false,
        }
    }

    #[must_use]
    pub fn is_not_null(self) -> Expr {
        Expr::NullCheck {
            column: self.name,
            negated: true,
        }
    }

    #[must_use]
    pub fn asc(self) -> OrderKey {
        OrderKey {
            column: self.name,
            descending: false,
        }
    }

    #[must_use]
    pub fn desc(self) -> OrderKey {
        OrderKey {
            column: self.name,
            descending: true,
        }
    }
}
