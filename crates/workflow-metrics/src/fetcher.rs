// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Retrieval of authoritative workflow records from the workflow engine.

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;

use crate::config::WorkflowApiConfig;
use crate::errors::FetchError;
use crate::workflow::WorkflowRecord;

#[async_trait]
pub trait WorkflowFetcher {
    /// Fetches the current record of a workflow instance. Never cached.
    async fn fetch(&self, workflow_id: &str) -> Result<WorkflowRecord, FetchError>;
}

/// Fetches workflow records over the engine's REST API at
/// `GET {base_url}/workflow/instance/{id}.json`.
#[derive(Clone)]
pub struct HttpWorkflowFetcher {
    client: reqwest::Client,
    base_url: String,
    username: Option<String>,
    password: Option<String>,
}

impl HttpWorkflowFetcher {
    /// The request timeout is whatever `client` was built with.
    #[must_use]
    pub fn new(client: reqwest::Client, config: &WorkflowApiConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
        }
    }

    fn instance_url(&self, workflow_id: &str) -> String {
        format!("{}/workflow/instance/{workflow_id}.json", self.base_url)
    }
}

#[async_trait]
impl WorkflowFetcher for HttpWorkflowFetcher {
    async fn fetch(&self, workflow_id: &str) -> Result<WorkflowRecord, FetchError> {
        let transient = |reason: String| FetchError::Transient {
            workflow_id: workflow_id.to_string(),
            reason,
        };

        let url = self.instance_url(workflow_id);
        debug!("Fetching workflow {workflow_id} from {url}");

        let mut request = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(username) = &self.username {
            request = request.basic_auth(username, self.password.as_ref());
        }

        let response = request
            .send()
            .await
            .map_err(|e| transient(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(FetchError::NotFound(workflow_id.to_string())),
            status if status.is_success() => {
                let record = response
                    .json::<WorkflowRecord>()
                    .await
                    .map_err(|e| transient(format!("malformed workflow record: {e}")))?;
                Ok(record)
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(transient(format!("unexpected status {status}: {body}")))
            }
        }
    }
}
