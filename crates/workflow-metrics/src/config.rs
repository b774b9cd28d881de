// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeSet;
use std::env;
use std::time::Duration;

use crate::decoder::DEFAULT_MAX_DECOMPRESSED_LENGTH;
use crate::errors::ConfigError;
use crate::util::{parse_list, parse_metric_namespace};

const DEFAULT_RECEIVER_PORT: u16 = 8127;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_NAMESPACE: &str = "Opencast";
const DEFAULT_TERMINAL_STATES: [&str; 2] = ["FAILED", "SUCCEEDED"];
const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// What the batch driver does when the metrics sink rejects a point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PublishFailurePolicy {
    /// Log the failure and continue with the next record.
    #[default]
    SkipRecord,
    /// Stop processing and fail the whole batch.
    FailBatch,
}

impl PublishFailurePolicy {
    fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.trim().to_lowercase().as_str() {
            "skip" | "skip_record" => Ok(Self::SkipRecord),
            "fail" | "fail_batch" => Ok(Self::FailBatch),
            other => Err(ConfigError::Invalid(format!(
                "Invalid publish failure policy '{other}'. Must be one of: skip, fail_batch"
            ))),
        }
    }
}

/// Connection parameters for the workflow engine REST API.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowApiConfig {
    /// Base URL, e.g. `http://10.0.0.12`.
    pub base_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Connection parameters for the metrics sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSinkConfig {
    /// Endpoint that accepts metric data posts.
    pub url: String,
    pub api_key: Option<String>,
    pub namespace: String,
    /// zstd level for request bodies; `None` sends them uncompressed.
    pub compression_level: Option<i32>,
}

impl Default for MetricsSinkConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: None,
            namespace: DEFAULT_NAMESPACE.to_string(),
            compression_level: None,
        }
    }
}

/// Process-wide configuration. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Cluster label attached as a dimension to every metric.
    pub cluster: String,
    pub workflow_api: WorkflowApiConfig,
    pub metrics_sink: MetricsSinkConfig,
    /// Workflow states after which a duration metric is published.
    pub terminal_states: BTreeSet<String>,
    pub publish_failure_policy: PublishFailurePolicy,
    /// Bound on each fetch and publish call.
    pub request_timeout: Duration,
    pub https_proxy: Option<String>,
    pub receiver_port: u16,
    /// Maximum accepted size of a delivery body, in bytes.
    pub max_request_content_length: usize,
    /// Maximum size of a delivery's decompressed JSON, in bytes.
    pub max_decompressed_length: usize,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cluster: String::new(),
            workflow_api: WorkflowApiConfig::default(),
            metrics_sink: MetricsSinkConfig::default(),
            terminal_states: DEFAULT_TERMINAL_STATES
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            publish_failure_policy: PublishFailurePolicy::default(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            https_proxy: None,
            receiver_port: DEFAULT_RECEIVER_PORT,
            max_request_content_length: 6 * 1024 * 1024, // 6MB in Bytes
            max_decompressed_length: DEFAULT_MAX_DECOMPRESSED_LENGTH,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Reads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads configuration through an arbitrary key lookup, so callers can
    /// build a config without touching the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let cluster = lookup("OC_CLUSTER").ok_or(ConfigError::Missing("OC_CLUSTER"))?;

        let base_url = lookup("OC_ADMIN_URL")
            .or_else(|| lookup("OC_ADMIN_IP").map(|ip| format!("http://{}", ip.trim())))
            .ok_or(ConfigError::Missing("OC_ADMIN_URL"))?;

        let sink_url =
            lookup("WF_METRICS_SINK_URL").ok_or(ConfigError::Missing("WF_METRICS_SINK_URL"))?;

        let namespace = match lookup("WF_METRICS_NAMESPACE") {
            Some(raw) => parse_metric_namespace(&raw).ok_or_else(|| {
                ConfigError::Invalid(format!("Invalid metric namespace '{raw}'"))
            })?,
            None => defaults.metrics_sink.namespace.clone(),
        };

        let compression_level = lookup("WF_METRICS_COMPRESSION_LEVEL")
            .map(|raw| {
                raw.trim().parse::<i32>().map_err(|_| {
                    ConfigError::Invalid(format!("Invalid compression level '{raw}'"))
                })
            })
            .transpose()?;

        let terminal_states = match lookup("WF_TERMINAL_STATES") {
            Some(raw) => parse_list(&raw)
                .into_iter()
                .map(|state| state.to_uppercase())
                .collect(),
            None => defaults.terminal_states.clone(),
        };

        let publish_failure_policy = lookup("WF_PUBLISH_FAILURE_POLICY")
            .map(|raw| PublishFailurePolicy::parse(&raw))
            .transpose()?
            .unwrap_or_default();

        let request_timeout = lookup("WF_REQUEST_TIMEOUT_SECS")
            .map(|raw| {
                raw.trim()
                    .parse::<u64>()
                    .map(Duration::from_secs)
                    .map_err(|_| ConfigError::Invalid(format!("Invalid request timeout '{raw}'")))
            })
            .transpose()?
            .unwrap_or(defaults.request_timeout);

        let receiver_port = lookup("WF_RECEIVER_PORT")
            .and_then(|port| port.trim().parse::<u16>().ok())
            .unwrap_or(defaults.receiver_port);

        let log_level = lookup("WF_LOG_LEVEL")
            .map(|val| val.to_lowercase())
            .unwrap_or(defaults.log_level.clone());

        let config = Self {
            cluster,
            workflow_api: WorkflowApiConfig {
                base_url: base_url.trim_end_matches('/').to_string(),
                username: lookup("OC_ADMIN_USER"),
                password: lookup("OC_ADMIN_PASS"),
            },
            metrics_sink: MetricsSinkConfig {
                url: sink_url,
                api_key: lookup("WF_METRICS_API_KEY"),
                namespace,
                compression_level,
            },
            terminal_states,
            publish_failure_policy,
            request_timeout,
            https_proxy: lookup("WF_PROXY_HTTPS").or_else(|| lookup("HTTPS_PROXY")),
            receiver_port,
            log_level,
            ..defaults
        };

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cluster.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "OC_CLUSTER cannot be empty".to_string(),
            ));
        }

        if !is_http_url(&self.workflow_api.base_url) {
            return Err(ConfigError::Invalid(format!(
                "Workflow API URL '{}' must start with http:// or https://",
                self.workflow_api.base_url
            )));
        }

        if !is_http_url(&self.metrics_sink.url) {
            return Err(ConfigError::Invalid(format!(
                "Metrics sink URL '{}' must start with http:// or https://",
                self.metrics_sink.url
            )));
        }

        if self.workflow_api.password.is_some() && self.workflow_api.username.is_none() {
            return Err(ConfigError::Invalid(
                "OC_ADMIN_PASS requires OC_ADMIN_USER".to_string(),
            ));
        }

        if self.terminal_states.is_empty() {
            return Err(ConfigError::Invalid(
                "At least one terminal workflow state is required".to_string(),
            ));
        }

        if let Some(level) = self.metrics_sink.compression_level {
            if !(1..=22).contains(&level) {
                return Err(ConfigError::Invalid(format!(
                    "Compression level {level} must be between 1 and 22"
                )));
            }
        }

        if self.request_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "Request timeout must be greater than 0".to_string(),
            ));
        }

        if self.receiver_port == 0 {
            return Err(ConfigError::Invalid(
                "Receiver port must be greater than 0".to_string(),
            ));
        }

        if !VALID_LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.log_level
            )));
        }

        Ok(())
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
