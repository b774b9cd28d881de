// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Decoding of log-subscription batch payloads.
//!
//! A payload is base64 text wrapping a gzip stream wrapping a JSON document
//! whose `logEvents` field lists the delivered log records:
//!
//! ```text
//!   base64 ──> gzip ──> {"messageType": ..., "logEvents": [{id, timestamp, message}, ...]}
//! ```
//!
//! Decoding is all-or-nothing: the structure is fully nested, so a failure at
//! any layer makes the whole batch unusable.

use std::io::{self, Read, Write};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use serde::{Deserialize, Serialize};

use crate::errors::DecodeError;
use crate::util::deserialize_string_or_number;

/// Outer wrapper of a log-subscription delivery: `{"awslogs": {"data": "..."}}`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubscriptionEvent {
    pub awslogs: AwsLogs,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AwsLogs {
    /// base64(gzip(json)) batch payload.
    pub data: String,
}

/// Kind of delivery. Control messages only probe the destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    #[default]
    DataMessage,
    ControlMessage,
    #[serde(other)]
    Unknown,
}

/// A single log line as delivered in a batch.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RawLogRecord {
    #[serde(deserialize_with = "deserialize_string_or_number")]
    pub id: String,
    /// Unix epoch milliseconds.
    pub timestamp: i64,
    pub message: String,
}

/// An ordered batch of log records plus its delivery metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchEnvelope {
    #[serde(default)]
    pub message_type: MessageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_stream: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subscription_filters: Vec<String>,
    #[serde(rename = "logEvents")]
    pub records: Vec<RawLogRecord>,
}

impl BatchEnvelope {
    #[must_use]
    pub fn new(records: Vec<RawLogRecord>) -> Self {
        Self {
            records,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn is_control_message(&self) -> bool {
        self.message_type == MessageType::ControlMessage
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Upper bound on the decompressed JSON of one batch.
pub const DEFAULT_MAX_DECOMPRESSED_LENGTH: usize = 64 * 1024 * 1024; // 64MB in Bytes

/// Decodes a base64 + gzip + JSON batch payload.
///
/// Leading and trailing whitespace around the base64 text is ignored.
pub fn decode(data: &str) -> Result<BatchEnvelope, DecodeError> {
    decode_with_limit(data, DEFAULT_MAX_DECOMPRESSED_LENGTH)
}

/// Same as [`decode`], failing with [`DecodeError::Decompress`] once the
/// decompressed JSON grows past `max_decompressed_length` bytes.
pub fn decode_with_limit(
    data: &str,
    max_decompressed_length: usize,
) -> Result<BatchEnvelope, DecodeError> {
    let compressed = STANDARD.decode(data.trim())?;

    let read_limit = u64::try_from(max_decompressed_length)
        .unwrap_or(u64::MAX)
        .saturating_add(1);
    let mut json = Vec::new();
    GzDecoder::new(&compressed[..])
        .take(read_limit)
        .read_to_end(&mut json)
        .map_err(DecodeError::Decompress)?;
    if json.len() > max_decompressed_length {
        return Err(DecodeError::Decompress(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("decompressed payload exceeds {max_decompressed_length} bytes"),
        )));
    }

    let envelope: BatchEnvelope = serde_json::from_slice(&json)?;
    tracing::trace!(
        "Decoded {} log records from {:?}/{:?}",
        envelope.records.len(),
        envelope.log_group,
        envelope.log_stream
    );
    Ok(envelope)
}

/// Inverse of [`decode`]: serializes, compresses and base64-encodes a batch.
pub fn encode(envelope: &BatchEnvelope) -> Result<String, DecodeError> {
    let json = serde_json::to_vec(envelope)?;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&json)
        .map_err(|e| DecodeError::Encode(e.to_string()))?;
    let compressed = encoder
        .finish()
        .map_err(|e| DecodeError::Encode(e.to_string()))?;

    Ok(STANDARD.encode(compressed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn gzip_base64(json: &str) -> String {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(json.as_bytes()).unwrap();
        STANDARD.encode(encoder.finish().unwrap())
    }

    #[test]
    fn test_decode_subscription_payload() {
        let data = gzip_base64(
            r#"{
              "messageType": "DATA_MESSAGE",
              "owner": "542186135646",
              "logGroup": "/aws/lambda/foo",
              "logStream": "2018/06/19/[33]abcd1234",
              "subscriptionFilters": ["filter-a"],
              "logEvents": [
                {"id": "12345", "timestamp": 1529421105754, "message": "{\"hello\": \"world!\"}"},
                {"id": 67890, "timestamp": 1529421105756, "message": "second", "exception": "ignored"}
              ]
            }"#,
        );

        let envelope = decode(&data).unwrap();
        assert_eq!(envelope.message_type, MessageType::DataMessage);
        assert_eq!(envelope.log_group.as_deref(), Some("/aws/lambda/foo"));
        assert_eq!(envelope.subscription_filters, vec!["filter-a"]);
        assert_eq!(envelope.len(), 2);
        assert_eq!(envelope.records[0].id, "12345");
        assert_eq!(envelope.records[0].message, r#"{"hello": "world!"}"#);
        assert_eq!(envelope.records[1].id, "67890");
        assert_eq!(envelope.records[1].timestamp, 1529421105756);
    }

    #[test]
    fn test_decode_defaults_to_data_message() {
        let data = gzip_base64(r#"{"logEvents": []}"#);
        let envelope = decode(&data).unwrap();
        assert_eq!(envelope.message_type, MessageType::DataMessage);
        assert!(envelope.is_empty());
    }

    #[test]
    fn test_decode_control_message() {
        let data = gzip_base64(
            r#"{"messageType": "CONTROL_MESSAGE", "logEvents": [
                {"id": "", "timestamp": 1, "message": "CWL CONTROL MESSAGE: Checking health of destination Kinesis stream."}
            ]}"#,
        );
        assert!(decode(&data).unwrap().is_control_message());
    }

    #[test]
    fn test_decode_unknown_message_type() {
        let data = gzip_base64(r#"{"messageType": "SOMETHING_NEW", "logEvents": []}"#);
        assert_eq!(decode(&data).unwrap().message_type, MessageType::Unknown);
    }

    #[test]
    fn test_decode_tolerates_surrounding_whitespace() {
        let data = format!("  {}\n", gzip_base64(r#"{"logEvents": []}"#));
        assert!(decode(&data).is_ok());
    }

    #[test]
    fn test_decode_invalid_base64() {
        let result = decode("not base64 at all!!");
        assert!(matches!(result, Err(DecodeError::Base64(_))));
    }

    #[test]
    fn test_decode_not_gzip() {
        let data = STANDARD.encode(br#"{"logEvents": []}"#);
        let result = decode(&data);
        assert!(matches!(result, Err(DecodeError::Decompress(_))));
    }

    #[test]
    fn test_decode_rejects_oversized_decompression() {
        let data = gzip_base64(&" ".repeat(1024 * 1024));
        let result = decode_with_limit(&data, 1024);
        match result {
            Err(DecodeError::Decompress(e)) => {
                assert_eq!(e.kind(), io::ErrorKind::InvalidData);
            }
            other => panic!("expected a decompression error, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_accepts_payload_at_limit() {
        let json = r#"{"logEvents": []}"#;
        let data = gzip_base64(json);
        assert!(decode_with_limit(&data, json.len()).is_ok());
        assert!(decode_with_limit(&data, json.len() - 1).is_err());
    }

    #[test]
    fn test_decode_invalid_json() {
        let result = decode(&gzip_base64("{\"logEvents\": [}"));
        assert!(matches!(result, Err(DecodeError::Json(_))));
    }

    #[test]
    fn test_decode_missing_log_events() {
        let result = decode(&gzip_base64(r#"{"messageType": "DATA_MESSAGE"}"#));
        assert!(matches!(result, Err(DecodeError::Json(_))));
    }

    #[test]
    fn test_subscription_event_shape() {
        let event: SubscriptionEvent =
            serde_json::from_str(r#"{"awslogs": {"data": "H4sIAAAA"}}"#).unwrap();
        assert_eq!(event.awslogs.data, "H4sIAAAA");
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(
            entries in proptest::collection::vec((any::<i64>(), ".*"), 0..16)
        ) {
            let records: Vec<RawLogRecord> = entries
                .iter()
                .enumerate()
                .map(|(idx, (timestamp, message))| RawLogRecord {
                    id: (idx + 1).to_string(),
                    timestamp: *timestamp,
                    message: message.clone(),
                })
                .collect();
            let envelope = BatchEnvelope::new(records);

            let decoded = decode(&encode(&envelope).unwrap()).unwrap();

            prop_assert_eq!(decoded.records.len(), entries.len());
            for (record, (timestamp, message)) in decoded.records.iter().zip(entries.iter()) {
                prop_assert_eq!(record.timestamp, *timestamp);
                prop_assert_eq!(&record.message, message);
            }
        }
    }
}
