//! Source proxy client
//!
//! Fetches raw integration payloads through the application's third-party
//! API proxy. The payload shape is integration-specific and opaque here;
//! the ingestion transformer is what understands it.

use async_trait::async_trait;
use uuid::Uuid;

use crate::pipeline::PipelineError;

/// Client for the third-party API proxy
#[async_trait]
pub trait SourceClient: Send + Sync {
    /// Fetches the raw payload for a metric's integration.
    async fn fetch_raw(
        &self,
        integration: &str,
        metric_id: Uuid,
    ) -> Result<serde_json::Value, PipelineError>;
}

/// HTTP implementation talking to the proxy service
pub struct HttpSourceClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpSourceClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl SourceClient for HttpSourceClient {
    async fn fetch_raw(
        &self,
        integration: &str,
        metric_id: Uuid,
    ) -> Result<serde_json::Value, PipelineError> {
        let url = format!("{}/fetch/{}/{}", self.base_url, integration, metric_id);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PipelineError::Source(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PipelineError::Source(format!(
                "proxy returned {} for integration '{}'",
                response.status(),
                integration
            )));
        }

        response
            .json()
            .await
            .map_err(|e| PipelineError::Source(e.to_string()))
    }
}
