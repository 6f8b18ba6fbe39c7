//! Identifier and literal quoting.
//!
//! Every user-supplied name or value goes through one of these functions
//! before it is interpolated into a statement. Input is truncated at the
//! first NUL byte, then backslashes and the delimiter are escaped.

use std::collections::BTreeMap;

fn quote_with(value: &str, delimiter: char) -> String {
    let value = value.split('\0').next().unwrap_or_default();

    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push(delimiter);
    for ch in value.chars() {
        if ch == '\\' || ch == delimiter {
            quoted.push('\\');
        }
        quoted.push(ch);
    }
    quoted.push(delimiter);
    quoted
}

/// Quotes an identifier with double quotes.
#[must_use]
pub fn quote_identifier(name: &str) -> String {
    quote_with(name, '"')
}

/// Quotes a string literal with single quotes.
#[must_use]
pub fn quote_literal(value: &str) -> String {
    quote_with(value, '\'')
}

/// Quotes an identifier with backticks.
#[must_use]
pub fn quote_with_ticks(name: &str) -> String {
    quote_with(name, '`')
}

/// Quotes every value with the given delimiter.
#[must_use]
pub fn quote_list<S: AsRef<str>>(values: &[S], delimiter: char) -> Vec<String> {
    values
        .iter()
        .map(|v| quote_with(v.as_ref(), delimiter))
        .collect()
}

/// Quotes every value with backticks and joins them with `, `.
#[must_use]
pub fn quote_list_with_ticks_and_join<S: AsRef<str>>(values: &[S]) -> String {
    quote_list(values, '`').join(", ")
}

/// Renders `` `key` = 'value' `` pairs joined with `, `, in key order.
#[must_use]
pub fn quote_map_and_join(data: &BTreeMap<String, String>) -> String {
    data.iter()
        .map(|(k, v)| format!("{} = {}", quote_with_ticks(k), quote_literal(v)))
        .collect::<Vec<_>>()
        .join(", ")
}
