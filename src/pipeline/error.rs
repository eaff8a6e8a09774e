//! Pipeline failure taxonomy.

use axum::http::StatusCode;
use thiserror::Error;

/// Fixed message returned to callers when the downstream cannot be reached.
pub const DOWNSTREAM_UNAVAILABLE_MESSAGE: &str = "downstream service unavailable";

/// Fixed message returned to callers when re-encoding fails.
pub const ENCODE_FAILED_MESSAGE: &str = "failed to re-encode upload";

/// Why a request left the pipeline before being relayed.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The inbound body is not valid multipart/form-data.
    #[error("failed to parse form: {0}")]
    Parse(String),

    /// A file part could not be stored or read back while re-encoding.
    #[error("failed to re-encode upload: {0}")]
    Encode(String),

    /// Connection refused/reset or timeout before a full response arrived.
    #[error("downstream service unavailable")]
    DownstreamUnavailable,
}

impl PipelineError {
    pub fn status(&self) -> StatusCode {
        match self {
            PipelineError::Parse(_) => StatusCode::BAD_REQUEST,
            PipelineError::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
            PipelineError::DownstreamUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Metric/log label.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Parse(_) => "parse",
            PipelineError::Encode(_) => "encode",
            PipelineError::DownstreamUnavailable => "downstream_unavailable",
        }
    }

    /// Message safe to show the caller. Encode details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            PipelineError::Parse(_) => self.to_string(),
            PipelineError::Encode(_) => ENCODE_FAILED_MESSAGE.to_string(),
            PipelineError::DownstreamUnavailable => DOWNSTREAM_UNAVAILABLE_MESSAGE.to_string(),
        }
    }
}
