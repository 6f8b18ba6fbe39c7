//! Engine descriptor parsing.
//!
//! `system.tables.engine_full` holds the whole engine clause as free text,
//! for example:
//!
//! ```text
//! ReplacingMergeTree(version) PARTITION BY toYYYYMM(date) ORDER BY (id, date) SETTINGS index_granularity = 8192
//! ```
//!
//! Settings and engine parameters are extracted structurally from that
//! rendering. This is not a grammar: it only handles the format the server
//! produces for the engines we manage.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Result, SchemaError};

const SETTINGS_MARKER: &str = "SETTINGS ";

static ENGINE_PARAMS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\w+\((.*?)\)").unwrap_or_else(|e| unreachable!("invalid regex: {e}"))
});

/// Extracts the trailing `SETTINGS k = v, ...` segment.
///
/// Single quotes around values are trimmed.
///
/// # Errors
///
/// Returns [`SchemaError::InvalidDescriptor`] when a setting does not split
/// into exactly one key and one value.
pub fn parse_settings(engine_full: &str) -> Result<BTreeMap<String, String>> {
    let mut settings = BTreeMap::new();

    let Some(index) = engine_full.find(SETTINGS_MARKER) else {
        return Ok(settings);
    };
    let input = engine_full[index + SETTINGS_MARKER.len()..].trim();
    if input.is_empty() {
        return Ok(settings);
    }

    for part in input.split(", ") {
        let pieces: Vec<&str> = part.split(" = ").collect();
        let [key, value] = pieces.as_slice() else {
            return Err(SchemaError::InvalidDescriptor {
                descriptor: engine_full.to_string(),
                message: format!("cannot parse setting '{part}'"),
            });
        };
        settings.insert((*key).to_string(), value.trim_matches('\'').to_string());
    }

    Ok(settings)
}

/// Extracts the argument list directly following the engine name.
///
/// Returns an empty list when the engine takes no arguments.
#[must_use]
pub fn parse_engine_params(engine_full: &str) -> Vec<String> {
    ENGINE_PARAMS
        .captures(engine_full)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|args| !args.is_empty())
        .map(|args| args.split(", ").map(str::to_string).collect())
        .unwrap_or_default()
}

/// Splits a `sorting_key` or `primary_key` column from `system.tables`.
#[must_use]
pub fn split_expression_list(key: &str) -> Vec<String> {
    let key = key.trim();
    if key.is_empty() {
        return Vec::new();
    }
    key.split(", ").map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_settings() {
        let settings = parse_settings(
            "MergeTree ORDER BY date SETTINGS index_granularity = 8192, storage_policy = 'hot'",
        )
        .unwrap();
        assert_eq!(settings.len(), 2);
        assert_eq!(settings["index_granularity"], "8192");
        assert_eq!(settings["storage_policy"], "hot");
    }

    #[test]
    fn test_parse_settings_absent() {
        assert!(parse_settings("Memory").unwrap().is_empty());
        assert!(parse_settings("MergeTree ORDER BY id SETTINGS ").unwrap().is_empty());
    }

    #[test]
    fn test_parse_settings_malformed() {
        let err = parse_settings("MergeTree SETTINGS index_granularity").unwrap_err();
        assert!(matches!(err, SchemaError::InvalidDescriptor { .. }));
    }

    #[test]
    fn test_parse_engine_params() {
        assert_eq!(
            parse_engine_params("ReplacingMergeTree(version) ORDER BY id"),
            vec!["version"]
        );
        assert_eq!(
            parse_engine_params("CollapsingMergeTree(sign, ver) ORDER BY id"),
            vec!["sign", "ver"]
        );
    }

    #[test]
    fn test_parse_engine_params_ignores_clause_expressions() {
        assert!(parse_engine_params("MergeTree PARTITION BY toYYYYMM(date) ORDER BY date").is_empty());
        assert!(parse_engine_params("MergeTree() ORDER BY date").is_empty());
        assert!(parse_engine_params("").is_empty());
    }

    #[test]
    fn test_split_expression_list() {
        assert_eq!(split_expression_list("id, date"), vec!["id", "date"]);
        assert_eq!(split_expression_list("id"), vec!["id"]);
        assert!(split_expression_list("").is_empty());
    }
}
