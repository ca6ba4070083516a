//! Generated-code service client
//!
//! The generated-code service turns a sample payload into transformation
//! code, and executes that code against an input. Both the code and its
//! output are opaque values here.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use pulse_core::domain::data::TransformerKind;

use crate::pipeline::PipelineError;

/// Client for the generated-code execution service
#[async_trait]
pub trait TransformerClient: Send + Sync {
    /// Generates transformer code of the given kind from a sample input.
    async fn generate(
        &self,
        kind: TransformerKind,
        sample: &serde_json::Value,
    ) -> Result<String, PipelineError>;

    /// Executes transformer code against an input, returning its output.
    async fn execute(
        &self,
        kind: TransformerKind,
        code: &str,
        input: &serde_json::Value,
    ) -> Result<serde_json::Value, PipelineError>;
}

/// HTTP implementation talking to the generated-code service
pub struct HttpTransformerClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpTransformerClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    async fn post<Req: Serialize, Resp: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        req: &Req,
    ) -> Result<Resp, PipelineError> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .post(&url)
            .json(req)
            .send()
            .await
            .map_err(|e| PipelineError::Transformer(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PipelineError::Transformer(format!(
                "transformer service returned {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| PipelineError::Transformer(e.to_string()))
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    kind: TransformerKind,
    sample: &'a serde_json::Value,
}

#[derive(Deserialize)]
struct GenerateResponse {
    code: String,
}

#[derive(Serialize)]
struct ExecuteRequest<'a> {
    kind: TransformerKind,
    code: &'a str,
    input: &'a serde_json::Value,
}

#[derive(Deserialize)]
struct ExecuteResponse {
    output: serde_json::Value,
}

#[async_trait]
impl TransformerClient for HttpTransformerClient {
    async fn generate(
        &self,
        kind: TransformerKind,
        sample: &serde_json::Value,
    ) -> Result<String, PipelineError> {
        let resp: GenerateResponse = self.post("/generate", &GenerateRequest { kind, sample }).await?;
        Ok(resp.code)
    }

    async fn execute(
        &self,
        kind: TransformerKind,
        code: &str,
        input: &serde_json::Value,
    ) -> Result<serde_json::Value, PipelineError> {
        let resp: ExecuteResponse = self
            .post("/execute", &ExecuteRequest { kind, code, input })
            .await?;
        Ok(resp.output)
    }
}
