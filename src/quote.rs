//! Shell Quoting and Template Interpolation
//!
//! Assembles command strings from literal fragments and caller-supplied
//! values so that a value can never escape its argument position. Values
//! wrapped in [`Value::Raw`] are spliced verbatim; everything else is quoted
//! according to what the string contains.

use lazy_static::lazy_static;
use regex_lite::Regex;

lazy_static! {
    /// Strings matching this pattern are shell-legal without quoting.
    static ref SAFE_TOKEN: Regex = Regex::new(r"^[A-Za-z0-9_\-./=,+@:]+$").unwrap();
}

/// A value to interpolate into a command template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Absent value; renders as `''`.
    Null,
    /// A scalar quoted per the quoting rules.
    Str(String),
    /// Space-joined, element-wise quoted.
    List(Vec<String>),
    /// Spliced verbatim, no quoting.
    Raw(String),
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Value::List(items)
    }
}

impl From<Vec<&str>> for Value {
    fn from(items: Vec<&str>) -> Self {
        Value::List(items.into_iter().map(String::from).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

/// Mark a value for verbatim splicing.
pub fn raw(s: impl Into<String>) -> Value {
    Value::Raw(s.into())
}

/// Quote a single string for safe use as one shell token.
///
/// Never fails; pathological inputs degrade to explicit single-quoting with
/// embedded quotes escaped as `'\''`.
pub fn quote(s: &str) -> String {
    if s.is_empty() {
        return "''".to_string();
    }
    if SAFE_TOKEN.is_match(s) {
        return s.to_string();
    }
    // Already single-quoted with no inner single quotes: trust it.
    if s.len() >= 2
        && s.starts_with('\'')
        && s.ends_with('\'')
        && !s[1..s.len() - 1].contains('\'')
    {
        return s.to_string();
    }
    // Already double-quoted: re-wrap the inner text in single quotes.
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        let inner = &s[1..s.len() - 1];
        return format!("'{}'", inner.replace('\'', "'\\''"));
    }
    format!("'{}'", s.replace('\'', "'\\''"))
}

fn render(value: &Value) -> String {
    match value {
        Value::Null => "''".to_string(),
        Value::Raw(s) => s.clone(),
        Value::Str(s) => quote(s),
        Value::List(items) => items
            .iter()
            .map(|item| quote(item))
            .collect::<Vec<_>>()
            .join(" "),
    }
}

/// Assemble a command string from interleaved fragments and values.
///
/// `fragments` has one more element than `values`; the output is
/// `s0 v0 s1 v1 ... sn` with each value quoted into a single token
/// position. A single-value template whose fragments are all empty and
/// whose value is already shell-legal passes through as-is, so a raw
/// command string used as the sole value is not re-quoted.
pub fn interpolate(fragments: &[&str], values: &[Value]) -> String {
    // Sole-value template with empty fragments: pass plain strings through.
    if values.len() == 1 && fragments.iter().all(|f| f.is_empty()) {
        if let Value::Str(s) = &values[0] {
            if !s.is_empty() && !s.contains('\'') && !s.contains('"') {
                return s.clone();
            }
        }
    }

    let mut out = String::new();
    for (i, fragment) in fragments.iter().enumerate() {
        out.push_str(fragment);
        if let Some(value) = values.get(i) {
            out.push_str(&render(value));
        }
    }
    out
}
