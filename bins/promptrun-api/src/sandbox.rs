// Judge0 execution adapter
// Synchronous submission (wait=true): the caller blocks until Judge0 has compiled and run the code.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::config::Judge0Config;

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("execution service unavailable: {0}")]
    Unavailable(String),

    #[error("execution service rejected the submission (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("execution service returned a malformed response: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait ExecutionClient: Send + Sync {
    /// Run `source` and return the service's result object verbatim
    async fn execute(
        &self,
        source: &str,
        language_id: u32,
    ) -> Result<serde_json::Value, SandboxError>;
}

#[derive(Debug, Serialize)]
struct Submission<'a> {
    language_id: u32,
    source_code: &'a str,
}

pub struct Judge0Client {
    client: reqwest::Client,
    submissions_url: String,
    auth_token: Option<String>,
}

impl Judge0Client {
    pub fn new(config: &Judge0Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            submissions_url: format!(
                "{}/submissions?base64_encoded=false&wait=true",
                config.base_url.trim_end_matches('/')
            ),
            auth_token: config.auth_token.clone(),
        }
    }
}

#[async_trait]
impl ExecutionClient for Judge0Client {
    async fn execute(
        &self,
        source: &str,
        language_id: u32,
    ) -> Result<serde_json::Value, SandboxError> {
        debug!(url = %self.submissions_url, language_id, source_size = source.len(), "Submitting to Judge0");

        let mut request = self.client.post(&self.submissions_url).json(&Submission {
            language_id,
            source_code: source,
        });
        if let Some(token) = &self.auth_token {
            request = request.header("X-Auth-Token", token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SandboxError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SandboxError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| SandboxError::Malformed(e.to_string()))
    }
}
