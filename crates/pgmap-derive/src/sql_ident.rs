use proc_macro2::Span;
use syn::{Error, LitStr, Result};

pub(crate) fn is_valid_sql_ident(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_ascii_alphabetic() || first == '_') {
        return false;
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Validate a table or column name, allowing one `schema.` qualifier for tables.
pub(crate) fn parse_sql_ident(lit: &LitStr, what: &str, allow_qualified: bool) -> Result<String> {
    let raw = lit.value();
    let s = raw.trim();
    let span = lit.span();

    if s.is_empty() {
        return Err(Error::new(span, format!("{what} must not be empty")));
    }

    let parts: Vec<&str> = if allow_qualified {
        s.splitn(2, '.').collect()
    } else {
        vec![s]
    };
    if !parts.iter().all(|p| is_valid_sql_ident(p)) {
        return Err(invalid(span, what, allow_qualified));
    }
    Ok(s.to_string())
}

fn invalid(span: Span, what: &str, allow_qualified: bool) -> Error {
    let expected = if allow_qualified {
        "[schema.]name with [A-Za-z_][A-Za-z0-9_]* parts"
    } else {
        "[A-Za-z_][A-Za-z0-9_]*"
    };
    Error::new(
        span,
        format!("{what} must be a valid SQL identifier (expected {expected})"),
    )
}
