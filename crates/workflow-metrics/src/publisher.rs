// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Formats metric points and emits them to the time-series sink.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{CONTENT_ENCODING, CONTENT_TYPE};
use serde::Serialize;
use tracing::debug;

use crate::config::MetricsSinkConfig;
use crate::errors::{IncompleteRecordError, PublishError, RecordError};
use crate::metric::{
    operation_duration_metric, MetricPoint, Unit, CLUSTER_DIMENSION, WORKFLOW_DIMENSION,
    WORKFLOW_DURATION_METRIC,
};
use crate::workflow::WorkflowRecord;

const API_KEY_HEADER: &str = "X-Api-Key";

#[async_trait]
pub trait MetricsSink {
    /// Sends a single point. Not retried.
    async fn publish(&self, point: &MetricPoint) -> Result<(), PublishError>;
}

#[derive(Serialize)]
struct SinkPayload<'a> {
    namespace: &'a str,
    metric_data: [SinkDatum<'a>; 1],
}

#[derive(Serialize)]
struct SinkDatum<'a> {
    metric_name: &'a str,
    dimensions: Vec<SinkDimension<'a>>,
    timestamp: i64,
    value: f64,
    unit: Unit,
}

#[derive(Serialize)]
struct SinkDimension<'a> {
    name: &'a str,
    value: &'a str,
}

/// Posts metric points as JSON to an HTTP metrics endpoint.
#[derive(Clone)]
pub struct HttpMetricsSink {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    namespace: String,
    compression_level: Option<i32>,
}

impl HttpMetricsSink {
    #[must_use]
    pub fn new(client: reqwest::Client, config: &MetricsSinkConfig) -> Self {
        Self {
            client,
            url: config.url.clone(),
            api_key: config.api_key.clone(),
            namespace: config.namespace.clone(),
            compression_level: config.compression_level,
        }
    }

    fn encode(&self, point: &MetricPoint) -> Result<Vec<u8>, PublishError> {
        let payload = SinkPayload {
            namespace: &self.namespace,
            metric_data: [SinkDatum {
                metric_name: &point.name,
                dimensions: point
                    .dimensions
                    .iter()
                    .map(|(name, value)| SinkDimension {
                        name: name.as_str(),
                        value: value.as_str(),
                    })
                    .collect(),
                timestamp: point.timestamp,
                value: point.value,
                unit: point.unit,
            }],
        };
        let body =
            serde_json::to_vec(&payload).map_err(|e| PublishError::Payload(e.to_string()))?;

        match self.compression_level {
            Some(level) => zstd::encode_all(body.as_slice(), level)
                .map_err(|e| PublishError::Payload(format!("failed to compress payload: {e}"))),
            None => Ok(body),
        }
    }
}

#[async_trait]
impl MetricsSink for HttpMetricsSink {
    async fn publish(&self, point: &MetricPoint) -> Result<(), PublishError> {
        let body = self.encode(point)?;

        let mut request = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json");
        if self.compression_level.is_some() {
            request = request.header(CONTENT_ENCODING, "zstd");
        }
        if let Some(api_key) = &self.api_key {
            request = request.header(API_KEY_HEADER, api_key);
        }

        let response = request
            .body(body)
            .send()
            .await
            .map_err(|e| PublishError::Request(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            debug!("Metrics sink accepted {} with status {status}", point.name);
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(PublishError::Status { status, body })
        }
    }
}

/// Builds workflow and operation duration points for a cluster and hands them
/// to a [`MetricsSink`].
#[derive(Clone)]
pub struct Publisher {
    cluster: String,
    sink: Arc<dyn MetricsSink + Send + Sync>,
}

impl Publisher {
    #[must_use]
    pub fn new(cluster: impl Into<String>, sink: Arc<dyn MetricsSink + Send + Sync>) -> Self {
        Self {
            cluster: cluster.into(),
            sink,
        }
    }

    #[must_use]
    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    /// Publishes `workflow_duration` for a completed workflow.
    ///
    /// Fails with [`IncompleteRecordError`] when no operation of the record has
    /// completed. The point is timestamped at publish time.
    pub async fn publish_workflow_duration(
        &self,
        record: &WorkflowRecord,
    ) -> Result<MetricPoint, RecordError> {
        let last = record
            .last_completed_operation()
            .ok_or_else(|| IncompleteRecordError {
                workflow_id: record.id.clone(),
            })?;
        debug!(
            "Workflow {} last completed operation {} at {:?}",
            record.id, last.operation_type, last.completed
        );

        let duration = record.duration_ms()?;
        let point = MetricPoint::now(WORKFLOW_DURATION_METRIC, duration as f64, Unit::Milliseconds)
            .with_dimension(CLUSTER_DIMENSION, self.cluster.as_str())
            .with_dimension(WORKFLOW_DIMENSION, record.title.as_str());

        self.sink.publish(&point).await?;
        Ok(point)
    }

    /// Publishes `<operation_type>-duration`, timestamped at publish time.
    pub async fn publish_operation_duration(
        &self,
        operation_type: &str,
        duration_ms: u64,
    ) -> Result<MetricPoint, PublishError> {
        let point = MetricPoint::now(
            operation_duration_metric(operation_type),
            duration_ms as f64,
            Unit::Milliseconds,
        )
        .with_dimension(CLUSTER_DIMENSION, self.cluster.as_str());

        self.sink.publish(&point).await?;
        Ok(point)
    }
}
