// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Helper functions for integration tests

use serde_json::json;
use workflow_metrics::{
    decoder::{encode, BatchEnvelope, RawLogRecord},
    workflow::{Operation, WorkflowRecord},
};

/// Build a batch whose records carry the given messages, ids starting at 1.
pub fn create_test_batch(messages: &[&str]) -> BatchEnvelope {
    BatchEnvelope::new(
        messages
            .iter()
            .enumerate()
            .map(|(idx, message)| RawLogRecord {
                id: (idx + 1).to_string(),
                timestamp: 1_700_000_000_000 + idx as i64,
                message: (*message).to_string(),
            })
            .collect(),
    )
}

/// base64(gzip(json)) payload for the given messages.
pub fn create_test_payload(messages: &[&str]) -> String {
    encode(&create_test_batch(messages)).expect("Failed to encode test batch")
}

/// A subscription delivery body wrapping the given messages.
#[allow(dead_code)]
pub fn create_subscription_body(messages: &[&str]) -> String {
    json!({ "awslogs": { "data": create_test_payload(messages) } }).to_string()
}

/// The record the workflow engine returns for workflow 12345.
pub fn create_completed_workflow() -> WorkflowRecord {
    WorkflowRecord {
        id: "12345".to_string(),
        title: "Lecture 1".to_string(),
        operations: vec![
            Operation {
                operation_type: "ingest".to_string(),
                started: Some(1_699_999_995_800),
                completed: Some(1_699_999_996_000),
            },
            Operation {
                operation_type: "encode".to_string(),
                started: Some(1_699_999_996_000),
                completed: Some(1_700_000_000_000),
            },
        ],
        duration: Some(4200),
    }
}
