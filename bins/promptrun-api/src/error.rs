// Request-scoped failures and their HTTP mapping.
// Nothing here is fatal to the process.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use promptrun_common::languages::LanguageError;
use promptrun_common::types::ErrorBody;
use thiserror::Error;

use crate::extractor::ExtractionError;
use crate::llm::LlmError;
use crate::sandbox::SandboxError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid JSON body")]
    InvalidBody,

    #[error("Prompt is missing")]
    MissingPrompt,

    #[error(transparent)]
    Language(#[from] LanguageError),

    #[error("Failed to generate code via API")]
    Generation(#[source] LlmError),

    #[error("AI did not return any code.")]
    Extraction(#[source] ExtractionError),

    #[error("Failed to run code on the Judge0 execution service")]
    Execution(#[source] SandboxError),
}

impl From<LlmError> for ApiError {
    fn from(e: LlmError) -> Self {
        ApiError::Generation(e)
    }
}

impl From<ExtractionError> for ApiError {
    fn from(e: ExtractionError) -> Self {
        ApiError::Extraction(e)
    }
}

impl From<SandboxError> for ApiError {
    fn from(e: SandboxError) -> Self {
        ApiError::Execution(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidBody | ApiError::MissingPrompt | ApiError::Language(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Generation(_) | ApiError::Extraction(_) | ApiError::Execution(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Metrics label
    pub fn outcome(&self) -> &'static str {
        match self {
            ApiError::InvalidBody | ApiError::MissingPrompt => "invalid_input",
            ApiError::Language(_) => "unsupported_language",
            ApiError::Generation(_) => "llm_error",
            ApiError::Extraction(_) => "extraction_error",
            ApiError::Execution(_) => "sandbox_error",
        }
    }

    fn details(&self) -> Option<String> {
        match self {
            ApiError::Generation(e) => Some(e.to_string()),
            ApiError::Extraction(e) => Some(e.to_string()),
            ApiError::Execution(e) => Some(e.to_string()),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.to_string(),
            details: self.details(),
        };
        (self.status(), Json(body)).into_response()
    }
}
