//! SQL identifier quoting utilities
//!
//! Used when a configured name (such as the version table) is interpolated
//! into generated SQL.

/// Quote a SQL identifier.
///
/// Wraps the identifier in double quotes and escapes embedded double quotes
/// by doubling them.
///
/// # Examples
/// ```
/// use sm_sql::quote_ident;
/// assert_eq!(quote_ident("schema_migrations"), r#""schema_migrations""#);
/// assert_eq!(quote_ident(r#"my"table"#), r#""my""table""#);
/// ```
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote a potentially schema-qualified name (e.g. `meta.schema_migrations`).
///
/// # Examples
/// ```
/// use sm_sql::quote_qualified;
/// assert_eq!(quote_qualified("meta.versions"), r#""meta"."versions""#);
/// ```
pub fn quote_qualified(name: &str) -> String {
    name.split('.')
        .map(quote_ident)
        .collect::<Vec<_>>()
        .join(".")
}
