// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Error taxonomy for the log-to-metric pipeline.
//!
//! Only [`DecodeError`] (and a publish failure under the strict policy) ever
//! escapes a batch; every other error is scoped to a single log record and is
//! handled by the batch driver.

use reqwest::StatusCode;

/// The batch payload could not be turned into log records.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("failed to decompress payload: {0}")]
    Decompress(#[source] std::io::Error),

    #[error("invalid log payload JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to encode payload: {0}")]
    Encode(String),
}

/// The workflow engine could not provide a workflow record.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("workflow {0} not found")]
    NotFound(String),

    #[error("transient failure fetching workflow {workflow_id}: {reason}")]
    Transient { workflow_id: String, reason: String },
}

/// A fetched workflow record lacks the data needed to compute its duration.
#[derive(Debug, thiserror::Error)]
#[error("workflow {workflow_id} has no completed operation")]
pub struct IncompleteRecordError {
    pub workflow_id: String,
}

/// The metrics sink rejected or never received a metric point.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("failed to serialize metric payload: {0}")]
    Payload(String),

    #[error("metrics sink request failed: {0}")]
    Request(String),

    #[error("metrics sink responded with {status}: {body}")]
    Status { status: StatusCode, body: String },
}

/// Any failure confined to the processing of a single log record.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Incomplete(#[from] IncompleteRecordError),

    #[error(transparent)]
    Publish(#[from] PublishError),
}

/// Failures that abort a whole batch.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("failed to decode batch: {0}")]
    Decode(#[from] DecodeError),

    #[error("aborting batch at record {record_id}: {source}")]
    PublishAborted {
        record_id: String,
        #[source]
        source: PublishError,
    },
}

/// Configuration could not be loaded or failed validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is not set")]
    Missing(&'static str),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = FetchError::NotFound("12345".to_string());
        assert_eq!(error.to_string(), "workflow 12345 not found");

        let error = IncompleteRecordError {
            workflow_id: "42".to_string(),
        };
        assert_eq!(error.to_string(), "workflow 42 has no completed operation");

        let error = ConfigError::Missing("OC_CLUSTER");
        assert_eq!(
            error.to_string(),
            "OC_CLUSTER environment variable is not set"
        );
    }

    #[test]
    fn test_record_error_is_transparent() {
        let error: RecordError = PublishError::Status {
            status: StatusCode::BAD_GATEWAY,
            body: "upstream down".to_string(),
        }
        .into();
        assert_eq!(
            error.to_string(),
            "metrics sink responded with 502 Bad Gateway: upstream down"
        );
    }

    #[test]
    fn test_batch_error_wraps_decode_error() {
        let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error = BatchError::from(DecodeError::from(json_error));
        assert!(error.to_string().starts_with("failed to decode batch: invalid log payload JSON"));
    }
}
