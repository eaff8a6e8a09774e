//! Downstream dispatch.
//!
//! # Responsibilities
//! - POST the encoded payload to the route's downstream URL
//! - Bound the exchange with a fixed timeout
//! - Hand back the raw response, whatever its status
//!
//! # Design Decisions
//! - Exactly one attempt per request: no retry, no backoff
//! - Connection errors and timeouts collapse into `DownstreamUnavailable`;
//!   the underlying error is logged, never returned to the caller
//! - The client is built once and shared; its settings never change

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;

use crate::pipeline::encoder::OutboundPayload;
use crate::pipeline::error::PipelineError;
use crate::routing::DownstreamTarget;

/// Sends payloads to the downstream service.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        // Downstream is an internal address; ambient proxy env vars don't apply.
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .no_proxy()
            .build()?;
        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send one POST. Any HTTP status counts as success.
    pub async fn dispatch(
        &self,
        target: &DownstreamTarget,
        payload: OutboundPayload,
    ) -> Result<reqwest::Response, PipelineError> {
        let content_type = payload.content_type().to_string();
        let result = self
            .client
            .post(&target.url)
            .header(CONTENT_TYPE, content_type)
            .body(payload.into_body())
            .send()
            .await;

        match result {
            Ok(response) => {
                tracing::debug!(
                    route = %target.route,
                    downstream = %target.url,
                    status = %response.status(),
                    "Downstream responded"
                );
                Ok(response)
            }
            Err(e) => {
                tracing::error!(
                    route = %target.route,
                    downstream = %target.url,
                    timeout = e.is_timeout(),
                    connect = e.is_connect(),
                    error = %e,
                    "Downstream request failed"
                );
                Err(PipelineError::DownstreamUnavailable)
            }
        }
    }
}
