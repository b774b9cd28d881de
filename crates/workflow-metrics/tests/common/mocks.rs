// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Mock implementations of the fetcher and sink seams for testing

use std::collections::HashMap;
use std::sync::Mutex;

use reqwest::StatusCode;
use workflow_metrics::{
    errors::{FetchError, PublishError},
    fetcher::WorkflowFetcher,
    metric::MetricPoint,
    publisher::MetricsSink,
    workflow::WorkflowRecord,
};

/// Mock fetcher that serves canned records and records every call.
/// Unknown workflow ids are `NotFound`.
#[derive(Default)]
pub struct MockFetcher {
    records: HashMap<String, WorkflowRecord>,
    pub calls: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn with_record(mut self, record: WorkflowRecord) -> Self {
        self.records.insert(record.id.clone(), record);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl WorkflowFetcher for MockFetcher {
    async fn fetch(&self, workflow_id: &str) -> Result<WorkflowRecord, FetchError> {
        self.calls.lock().unwrap().push(workflow_id.to_string());
        self.records
            .get(workflow_id)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(workflow_id.to_string()))
    }
}

/// Mock sink that keeps every point it is handed, optionally rejecting them.
#[derive(Default)]
pub struct MockSink {
    reject: bool,
    points: Mutex<Vec<MetricPoint>>,
}

impl MockSink {
    #[allow(dead_code)]
    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Default::default()
        }
    }

    pub fn points(&self) -> Vec<MetricPoint> {
        self.points.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl MetricsSink for MockSink {
    async fn publish(&self, point: &MetricPoint) -> Result<(), PublishError> {
        self.points.lock().unwrap().push(point.clone());
        if self.reject {
            return Err(PublishError::Status {
                status: StatusCode::TOO_MANY_REQUESTS,
                body: "throttled".to_string(),
            });
        }
        Ok(())
    }
}
