//! Downstream response relay.
//!
//! # Responsibilities
//! - Read the downstream body fully into memory
//! - Copy status and headers, keeping repeated headers in order
//! - Drop framing headers the HTTP layer recomputes for the buffered body
//!
//! # Design Decisions
//! - No streaming pass-through; a fully read body can be written even if
//!   the downstream connection errors afterwards
//! - A body read failure means nothing was relayed yet, so it is reported
//!   as `DownstreamUnavailable`

use axum::http::{header, HeaderMap, HeaderName, StatusCode};
use bytes::Bytes;

use crate::pipeline::error::PipelineError;

/// Headers describing the downstream connection's framing, not the content.
const FRAMING_HEADERS: [HeaderName; 5] = [
    header::CONNECTION,
    header::CONTENT_LENGTH,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
];

const HOP_BY_HOP_EXTRA: [&str; 3] = ["keep-alive", "proxy-connection", "upgrade"];

/// A downstream response, materialized.
#[derive(Debug, Clone)]
pub struct RelayedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Read a downstream response into a `RelayedResponse`.
pub async fn relay(response: reqwest::Response) -> Result<RelayedResponse, PipelineError> {
    let status = response.status();
    let headers = relay_headers(response.headers());

    let body = response.bytes().await.map_err(|e| {
        tracing::error!(status = %status, error = %e, "Failed reading downstream body");
        PipelineError::DownstreamUnavailable
    })?;

    Ok(RelayedResponse {
        status,
        headers,
        body,
    })
}

/// Copy every header except framing ones, preserving multiplicity.
pub fn relay_headers(source: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(source.len());
    for (name, value) in source {
        if is_framing_header(name) {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    headers
}

fn is_framing_header(name: &HeaderName) -> bool {
    FRAMING_HEADERS.contains(name) || HOP_BY_HOP_EXTRA.contains(&name.as_str())
}
