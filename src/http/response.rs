//! Response construction for the caller.
//!
//! # Responsibilities
//! - Turn a relayed downstream response into the caller's response
//! - Map pipeline failures to status codes with a JSON `error` body
//!
//! # Design Decisions
//! - Relayed status/headers/body are written as-is; the server computes
//!   content-length from the buffered body
//! - Failure bodies never include raw network error text

use axum::{
    body::Body,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::pipeline::{PipelineError, RelayedResponse};

/// JSON body for pipeline failures.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.public_message(),
        };
        (self.status(), Json(body)).into_response()
    }
}

impl IntoResponse for RelayedResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
    use bytes::Bytes;

    #[tokio::test]
    async fn test_error_json_body() {
        let response = PipelineError::DownstreamUnavailable.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "downstream service unavailable");
    }

    #[tokio::test]
    async fn test_relayed_response_is_verbatim() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.append("x-trace", HeaderValue::from_static("1"));
        headers.append("x-trace", HeaderValue::from_static("2"));

        let relayed = RelayedResponse {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            headers,
            body: Bytes::from_static(br#"{"detail":"bad input"}"#),
        };
        let response = relayed.into_response();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(response.headers().get_all("x-trace").iter().count(), 2);
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], br#"{"detail":"bad input"}"#);
    }
}
