use crate::error::EntityLiteError;
use crate::metadata::naming::quote_ident;
use crate::value::FieldValue;

use super::{Expr, OrderKey};

/// A rendered WHERE clause: the SQL text (without the `WHERE` keyword) and
/// the values to bind, in placeholder order.
#[derive(Debug)]
pub(crate) struct WhereClause {
    pub sql: String,
    pub params: Vec<FieldValue>,
}

/// Render filter expressions to a conjunctive WHERE clause. Every literal
/// becomes a bound parameter; nothing is interpolated into the SQL text.
///
/// Returns `Ok(None)` when there are no filters.
///
/// # Errors
///
/// Returns [`EntityLiteError::EmptyMembership`] for an IN filter with zero
/// values, which would otherwise render invalid SQL.
pub(crate) fn compile_where(exprs: &[Expr]) -> Result<Option<WhereClause>, EntityLiteError> {
    if exprs.is_empty() {
        return Ok(None);
    }

    let mut fragments = Vec::with_capacity(exprs.len());
    let mut params = Vec::new();

    for expr in exprs {
        match expr {
            Expr::Compare { column, op, value } => {
                fragments.push(format!("{} {} ?", quote_ident(column), op.sql()));
                params.push(value.clone());
            }
            Expr::InSet { column, values } => {
                if values.is_empty() {
                    return Err(EntityLiteError::EmptyMembership {
                        column: column.clone(),
                    });
                }
                let placeholders = vec!["?"; values.len()].join(", ");
                fragments.push(format!("{} IN ({placeholders})", quote_ident(column)));
                params.extend(values.iter().cloned());
            }
            Expr::NullCheck { column, negated } => {
                let check = if *negated { "IS NOT NULL" } else { "IS NULL" };
                fragments.push(format!("{} {check}", quote_ident(column)));
            }
            Expr::Like { column, pattern } => {
                fragments.push(format!("{} LIKE ?", quote_ident(column)));
                params.push(FieldValue::Text(pattern.clone()));
            }
        }
    }

    Ok(Some(WhereClause {
        sql: fragments.join(" AND "),
        params,
    }))
}

/// Render ORDER BY keys; `None` when there are none.
#[must_use]
pub(crate) fn compile_order(keys: &[OrderKey]) -> Option<String> {
    if keys.is_empty() {
        return None;
    }
    let rendered: Vec<String> = keys
        .iter()
        .map(|key| {
            let direction = if key.descending { "DESC" } else { "ASC" };
            format!("{} {direction}", quote_ident(&key.column))
        })
        .collect();
    Some(rendered.join(", "))
}
