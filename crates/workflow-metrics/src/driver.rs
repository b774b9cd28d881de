// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Sequences decode, classify, correlate, fetch and publish for each batch.
//!
//! Records are processed one at a time and independently. A failure while
//! processing one record is logged with its reason and the driver moves on to
//! the next; only a decode failure, or a publish failure under
//! [`PublishFailurePolicy::FailBatch`], ends the batch early.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::classifier::{ClassifiedEvent, Classifier};
use crate::config::{Config, PublishFailurePolicy};
use crate::correlator::{Correlator, Eligibility};
use crate::decoder::{self, BatchEnvelope, RawLogRecord};
use crate::errors::{BatchError, RecordError};
use crate::fetcher::WorkflowFetcher;
use crate::metric::MetricPoint;
use crate::publisher::{MetricsSink, Publisher};

/// Per-batch outcome counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub records: usize,
    pub unclassified: usize,
    pub ineligible: usize,
    pub published: usize,
    pub skipped: usize,
}

enum RecordOutcome {
    Unclassified,
    Ineligible(ClassifiedEvent),
    Published(MetricPoint),
}

pub struct BatchDriver {
    classifier: Classifier,
    correlator: Correlator,
    fetcher: Arc<dyn WorkflowFetcher + Send + Sync>,
    publisher: Publisher,
    publish_failure_policy: PublishFailurePolicy,
    max_decompressed_length: usize,
}

impl BatchDriver {
    #[must_use]
    pub fn new(
        classifier: Classifier,
        correlator: Correlator,
        fetcher: Arc<dyn WorkflowFetcher + Send + Sync>,
        publisher: Publisher,
        publish_failure_policy: PublishFailurePolicy,
    ) -> Self {
        Self {
            classifier,
            correlator,
            fetcher,
            publisher,
            publish_failure_policy,
            max_decompressed_length: decoder::DEFAULT_MAX_DECOMPRESSED_LENGTH,
        }
    }

    #[must_use]
    pub fn with_max_decompressed_length(mut self, max_decompressed_length: usize) -> Self {
        self.max_decompressed_length = max_decompressed_length;
        self
    }

    /// Builds a driver with the built-in matcher table and the configured
    /// cluster, terminal states and failure policy.
    #[must_use]
    pub fn from_config(
        config: &Config,
        fetcher: Arc<dyn WorkflowFetcher + Send + Sync>,
        sink: Arc<dyn MetricsSink + Send + Sync>,
    ) -> Self {
        Self::new(
            Classifier::default(),
            Correlator::new(config.terminal_states.clone()),
            fetcher,
            Publisher::new(config.cluster.clone(), sink),
            config.publish_failure_policy,
        )
        .with_max_decompressed_length(config.max_decompressed_length)
    }

    /// Decodes a base64 + gzip + JSON payload and processes it.
    pub async fn process_payload(&self, data: &str) -> Result<BatchSummary, BatchError> {
        let envelope = decoder::decode_with_limit(data, self.max_decompressed_length)?;
        self.process_batch(&envelope).await
    }

    /// Processes every record of an already decoded batch.
    pub async fn process_batch(&self, envelope: &BatchEnvelope) -> Result<BatchSummary, BatchError> {
        let mut summary = BatchSummary {
            records: envelope.len(),
            ..Default::default()
        };

        if envelope.is_control_message() {
            info!(
                records = envelope.len(),
                "Skipping control message batch"
            );
            return Ok(summary);
        }

        for record in &envelope.records {
            match self.process_record(record).await {
                Ok(RecordOutcome::Unclassified) => {
                    debug!(record_id = %record.id, "Record unclassified");
                    summary.unclassified += 1;
                }
                Ok(RecordOutcome::Ineligible(event)) => {
                    info!(record_id = %record.id, event = ?event, "Record ineligible, no metric");
                    summary.ineligible += 1;
                }
                Ok(RecordOutcome::Published(point)) => {
                    info!(
                        record_id = %record.id,
                        metric = %point.name,
                        value = point.value,
                        "Published metric"
                    );
                    summary.published += 1;
                }
                Err(RecordError::Publish(source))
                    if self.publish_failure_policy == PublishFailurePolicy::FailBatch =>
                {
                    error!(record_id = %record.id, reason = %source, "Publish failed, aborting batch");
                    return Err(BatchError::PublishAborted {
                        record_id: record.id.clone(),
                        source,
                    });
                }
                Err(e) => {
                    warn!(record_id = %record.id, reason = %e, "Skipping record");
                    summary.skipped += 1;
                }
            }
        }

        info!(
            records = summary.records,
            published = summary.published,
            skipped = summary.skipped,
            "Batch done"
        );
        Ok(summary)
    }

    async fn process_record(&self, record: &RawLogRecord) -> Result<RecordOutcome, RecordError> {
        let event = self.classifier.classify(&record.message);
        if event == ClassifiedEvent::Unclassified {
            return Ok(RecordOutcome::Unclassified);
        }

        match self.correlator.correlate(&event) {
            Eligibility::FetchWorkflow { workflow_id } => {
                let workflow = self.fetcher.fetch(&workflow_id).await?;
                let point = self.publisher.publish_workflow_duration(&workflow).await?;
                Ok(RecordOutcome::Published(point))
            }
            Eligibility::PublishOperation {
                operation_type,
                duration_ms,
            } => {
                let point = self
                    .publisher
                    .publish_operation_duration(&operation_type, duration_ms)
                    .await?;
                Ok(RecordOutcome::Published(point))
            }
            Eligibility::Ineligible => Ok(RecordOutcome::Ineligible(event)),
        }
    }
}
