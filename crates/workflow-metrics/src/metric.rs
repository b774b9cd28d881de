// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Metric points emitted to the time-series sink.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

pub const WORKFLOW_DURATION_METRIC: &str = "workflow_duration";
pub const CLUSTER_DIMENSION: &str = "Cluster";
pub const WORKFLOW_DIMENSION: &str = "Workflow";

/// Unit tag attached to a metric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Unit {
    Milliseconds,
    Seconds,
    Count,
    None,
}

/// A single data point, built immediately before it is published.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricPoint {
    pub name: String,
    pub dimensions: BTreeMap<String, String>,
    /// Unix epoch milliseconds.
    pub timestamp: i64,
    pub value: f64,
    pub unit: Unit,
}

impl MetricPoint {
    /// A point timestamped at the current wall-clock time.
    #[must_use]
    pub fn now(name: impl Into<String>, value: f64, unit: Unit) -> Self {
        Self {
            name: name.into(),
            dimensions: BTreeMap::new(),
            timestamp: now_millis(),
            value,
            unit,
        }
    }

    #[must_use]
    pub fn with_dimension(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.dimensions.insert(name.into(), value.into());
        self
    }
}

/// Metric name for an operation-duration point, e.g. `encode-duration`.
#[must_use]
pub fn operation_duration_metric(operation_type: &str) -> String {
    format!("{operation_type}-duration")
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}
