use std::collections::HashSet;

use lazy_static::lazy_static;

lazy_static! {
    // SQL keywords that need bracket escaping when used as identifiers.
    static ref KEYWORDS: HashSet<&'static str> = [
        "order", "group", "limit", "select", "from", "where", "to", "index",
        "table", "values", "transaction", "default", "references", "set",
        "update", "delete", "insert", "join", "union", "case", "when", "then",
        "end", "check", "primary", "key", "foreign", "not", "null", "and",
        "or", "in", "is", "like", "between", "exists", "all", "distinct",
    ]
    .into_iter()
    .collect();
}

/// Render an identifier for SQL, bracket-escaping it when it collides with
/// a SQL keyword.
#[must_use]
pub(crate) fn quote_ident(name: &str) -> String {
    if KEYWORDS.contains(name.to_ascii_lowercase().as_str()) {
        format!("[{name}]")
    } else {
        name.to_string()
    }
}

/// Convert a shape name to snake case: `UserProfile` -> `user_profile`,
/// `HTTPServer` -> `http_server`.
#[must_use]
pub(crate) fn snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev_lower = i > 0 && (chars[i - 1].is_lowercase() || chars[i - 1].is_ascii_digit());
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if i > 0 && (prev_lower || (chars[i - 1].is_uppercase() && next_lower)) {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Naive English pluralization for derived table names.
#[must_use]
pub(crate) fn pluralize(name: &str) -> String {
    if let Some(stem) = name.strip_suffix('y') {
        let vowel_before = stem
            .chars()
            .last()
            .is_some_and(|c| matches!(c, 'a' | 'e' | 'i' | 'o' | 'u'));
        if !vowel_before && !stem.is_empty() {
            return format!("{stem}ies");
        }
    }
    if name.ends_with('s')
        || name.ends_with('x')
        || name.ends_with('z')
        || name.ends_with("ch")
        || name.ends_with("sh")
    {
        return format!("{name}es");
    }
    format!("{name}s")
}

/// Derive the physical table name for an entity shape name.
#[must_use]
pub(crate) fn derive_table_name(entity_name: &str) -> String {
    pluralize(&snake_case(entity_name))
}

/// The to-one relationship name a foreign-key column induces, if any:
/// `user_id` -> `user`. Columns without the `_id` suffix induce none.
#[must_use]
pub(crate) fn relation_name_for_fk(column: &str) -> Option<&str> {
    column.strip_suffix("_id").filter(|stem| !stem.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snake_case_handles_mixed_casing() {
        assert_eq!(snake_case("User"), "user");
        assert_eq!(snake_case("UserProfile"), "user_profile");
        assert_eq!(snake_case("HTTPServer"), "http_server");
        assert_eq!(snake_case("already_snake"), "already_snake");
    }

    #[test]
    fn pluralize_common_forms() {
        assert_eq!(pluralize("user"), "users");
        assert_eq!(pluralize("category"), "categories");
        assert_eq!(pluralize("day"), "days");
        assert_eq!(pluralize("box"), "boxes");
        assert_eq!(pluralize("batch"), "batches");
    }

    #[test]
    fn table_name_derivation() {
        assert_eq!(derive_table_name("User"), "users");
        assert_eq!(derive_table_name("OrderItem"), "order_items");
        assert_eq!(derive_table_name("Category"), "categories");
    }

    #[test]
    fn keyword_identifiers_are_bracketed() {
        assert_eq!(quote_ident("order"), "[order]");
        assert_eq!(quote_ident("Order"), "[Order]");
        assert_eq!(quote_ident("name"), "name");
    }

    #[test]
    fn relation_names_need_id_suffix() {
        assert_eq!(relation_name_for_fk("user_id"), Some("user"));
        assert_eq!(relation_name_for_fk("owner"), None);
        assert_eq!(relation_name_for_fk("_id"), None);
    }
}
