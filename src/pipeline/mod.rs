//! Upload forwarding pipeline.
//!
//! # Data Flow
//! ```text
//! Request<Body> (multipart/form-data)
//!     → decoder.rs (parse once → DecodedForm)
//!     → encoder.rs (fresh boundary → OutboundPayload)
//!     → dispatcher.rs (POST downstream, bounded timeout)
//!     → relay.rs (buffer body → RelayedResponse)
//!
//! Per-request states:
//!     Received → Decoded → Encoded → Dispatched → Relayed
//!     any stage ─▶ Failed(Parse | Encode | DownstreamUnavailable)
//! ```
//!
//! # Design Decisions
//! - Stages run strictly in order; each needs its predecessor's full output
//! - Nothing is shared between requests except the immutable client
//! - Every failure ends the request; there is no partial success

pub mod decoder;
pub mod dispatcher;
pub mod encoder;
pub mod error;
pub mod form;
pub mod relay;

use std::fmt;
use std::time::Duration;

use axum::{body::Body, http::Request};

use crate::config::GatewayConfig;
use crate::routing::DownstreamTarget;

pub use decoder::FormDecoder;
pub use dispatcher::Dispatcher;
pub use encoder::{encode, OutboundPayload};
pub use error::PipelineError;
pub use form::{DecodedForm, FileContent, FilePart, PartReader};
pub use relay::{relay, RelayedResponse};

/// Where a request currently is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Decoded,
    Encoded,
    Dispatched,
    Relayed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Received => "received",
            Stage::Decoded => "decoded",
            Stage::Encoded => "encoded",
            Stage::Dispatched => "dispatched",
            Stage::Relayed => "relayed",
        };
        f.write_str(name)
    }
}

/// Decode → encode → dispatch → relay, for one request at a time.
#[derive(Debug, Clone)]
pub struct Pipeline {
    decoder: FormDecoder,
    dispatcher: Dispatcher,
}

impl Pipeline {
    pub fn new(decoder: FormDecoder, dispatcher: Dispatcher) -> Self {
        Self {
            decoder,
            dispatcher,
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Result<Self, reqwest::Error> {
        let decoder = FormDecoder::new(config.limits.spool_threshold_bytes);
        let dispatcher =
            Dispatcher::new(Duration::from_secs(config.downstream.timeout_secs))?;
        Ok(Self::new(decoder, dispatcher))
    }

    /// Run one request through every stage.
    pub async fn forward(
        &self,
        target: &DownstreamTarget,
        request: Request<Body>,
    ) -> Result<RelayedResponse, PipelineError> {
        let mut stage = Stage::Received;
        let result = self.run(target, request, &mut stage).await;
        if let Err(e) = &result {
            tracing::warn!(
                route = %target.route,
                stage = %stage,
                kind = e.kind(),
                error = %e,
                "Pipeline failed"
            );
        }
        result
    }

    async fn run(
        &self,
        target: &DownstreamTarget,
        request: Request<Body>,
        stage: &mut Stage,
    ) -> Result<RelayedResponse, PipelineError> {
        let form = self.decoder.decode(request).await?;
        *stage = Stage::Decoded;

        let payload = encode(form).await?;
        *stage = Stage::Encoded;

        let response = self.dispatcher.dispatch(target, payload).await?;
        *stage = Stage::Dispatched;

        let relayed = relay(response).await?;
        *stage = Stage::Relayed;

        tracing::debug!(
            route = %target.route,
            stage = %stage,
            status = %relayed.status,
            bytes = relayed.body.len(),
            "Response relayed"
        );
        Ok(relayed)
    }
}
