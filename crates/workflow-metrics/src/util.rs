// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Small parsing helpers shared by the decoder, fetcher and configuration.

use serde::{Deserialize, Deserializer};
use serde_json::Value as JsonValue;

/// Deserializes an identifier that producers emit either as a JSON string or as
/// a JSON number, normalising it to a `String`.
///
/// Log services send event ids as strings, while fixtures and some workflow
/// engine versions send integers.
pub fn deserialize_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value: JsonValue = Deserialize::deserialize(deserializer)?;
    match value {
        JsonValue::String(s) => Ok(s),
        JsonValue::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or number identifier, got {other}"
        ))),
    }
}

/// Parses and validates a metric namespace.
///
/// A valid namespace starts with an ASCII letter and otherwise contains only
/// ASCII alphanumerics, underscores, periods or slashes. Surrounding whitespace
/// is trimmed. Returns `None` when the namespace is empty or invalid.
///
/// ```
/// use workflow_metrics::util::parse_metric_namespace;
///
/// assert_eq!(parse_metric_namespace(" Opencast "), Some("Opencast".to_string()));
/// assert_eq!(parse_metric_namespace("oc/prod.workflows"), Some("oc/prod.workflows".to_string()));
/// assert_eq!(parse_metric_namespace("1invalid"), None);
/// ```
pub fn parse_metric_namespace(namespace: &str) -> Option<String> {
    let trimmed = namespace.trim();
    let mut chars = trimmed.chars();

    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        Some(_) => {
            tracing::error!("Metric namespace must start with a letter, got: '{trimmed}'");
            return None;
        }
        None => return None,
    }

    if let Some(invalid) =
        chars.find(|&ch| !ch.is_ascii_alphanumeric() && !matches!(ch, '_' | '.' | '/'))
    {
        tracing::error!("Metric namespace contains invalid character '{invalid}' in '{trimmed}'");
        return None;
    }

    Some(trimmed.to_string())
}

/// Splits a comma-separated list, trimming entries and dropping empty ones.
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
