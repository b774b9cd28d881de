// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Workflow records as served by the workflow engine's REST API.
//!
//! The engine nests operations as `{"operations": {"operation": [...]}}` and
//! collapses single-element lists into a bare object, while simpler
//! deployments return a flat `{"operations": [...]}`. Both are accepted.

use serde::{Deserialize, Deserializer};
use serde_json::Value as JsonValue;

use crate::errors::IncompleteRecordError;
use crate::util::deserialize_string_or_number;

/// One operation of a workflow instance.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Operation {
    /// Operation type, e.g. `encode` or `publish-engage`.
    #[serde(rename = "type", alias = "id")]
    pub operation_type: String,
    /// Epoch milliseconds the operation started, if it ran.
    #[serde(default)]
    pub started: Option<i64>,
    /// Epoch milliseconds the operation completed, if it did.
    #[serde(default)]
    pub completed: Option<i64>,
}

/// The authoritative state of a workflow instance. Fetched per event, never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowRecord {
    pub id: String,
    pub title: String,
    pub operations: Vec<Operation>,
    /// Total duration in milliseconds.
    pub duration: Option<i64>,
}

#[derive(Deserialize)]
struct RawWorkflowRecord {
    #[serde(deserialize_with = "deserialize_string_or_number")]
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default, deserialize_with = "deserialize_operations")]
    operations: Vec<Operation>,
    #[serde(default)]
    duration: Option<i64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WorkflowResponse {
    Wrapped { workflow: RawWorkflowRecord },
    Bare(RawWorkflowRecord),
}

impl<'de> Deserialize<'de> for WorkflowRecord {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = match WorkflowResponse::deserialize(deserializer)? {
            WorkflowResponse::Wrapped { workflow } => workflow,
            WorkflowResponse::Bare(record) => record,
        };
        Ok(WorkflowRecord {
            id: raw.id,
            title: raw.title,
            operations: raw.operations,
            duration: raw.duration,
        })
    }
}

/// Accepts `[op, ...]`, `{"operation": [op, ...]}` or `{"operation": op}`.
fn deserialize_operations<'de, D>(deserializer: D) -> Result<Vec<Operation>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: JsonValue = Deserialize::deserialize(deserializer)?;

    let list = match value {
        JsonValue::Null => return Ok(Vec::new()),
        JsonValue::Array(_) => value,
        JsonValue::Object(mut map) => match map.remove("operation") {
            Some(JsonValue::Array(items)) => JsonValue::Array(items),
            Some(JsonValue::Null) | None => return Ok(Vec::new()),
            Some(single) => JsonValue::Array(vec![single]),
        },
        other => {
            return Err(serde::de::Error::custom(format!(
                "unexpected operations value: {other}"
            )))
        }
    };

    serde_json::from_value(list).map_err(serde::de::Error::custom)
}

impl WorkflowRecord {
    /// The last operation, in list order, that carries a completion timestamp.
    #[must_use]
    pub fn last_completed_operation(&self) -> Option<&Operation> {
        self.operations.iter().rev().find(|op| op.completed.is_some())
    }

    /// Total duration in milliseconds.
    ///
    /// Uses the engine-reported duration when present, otherwise the span from
    /// the first started operation to the last completed one. A span that
    /// overflows or runs backwards counts as incomplete.
    pub fn duration_ms(&self) -> Result<i64, IncompleteRecordError> {
        if let Some(duration) = self.duration {
            return Ok(duration);
        }
        let incomplete = || IncompleteRecordError {
            workflow_id: self.id.clone(),
        };
        let completed = self
            .last_completed_operation()
            .and_then(|op| op.completed)
            .ok_or_else(incomplete)?;
        let started = self
            .operations
            .iter()
            .find_map(|op| op.started)
            .ok_or_else(incomplete)?;
        completed
            .checked_sub(started)
            .filter(|duration| *duration >= 0)
            .ok_or_else(incomplete)
    }
}
