//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with one POST handler per configured route
//! - Wire up middleware (request ID, tracing, CORS, body limit)
//! - Bind server to listener
//! - Hand each upload to the forwarding pipeline
//! - Observability (metrics, correlation IDs)

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, State},
    http::{Method, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::lifecycle::signals::shutdown_signal;
use crate::observability::metrics;
use crate::pipeline::Pipeline;
use crate::routing::RouteTable;

/// Header carrying the per-request correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub routes: Arc<RouteTable>,
}

/// Errors building the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to build downstream client: {0}")]
    Client(#[from] reqwest::Error),
}

/// HTTP server for the upload gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
    routes: Arc<RouteTable>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GatewayConfig) -> Result<Self, ServerError> {
        let routes = Arc::new(RouteTable::from_config(
            &config.downstream.base_url,
            &config.routes,
        ));
        let state = AppState {
            pipeline: Arc::new(Pipeline::from_config(&config)?),
            routes: routes.clone(),
        };

        let router = Self::build_router(&config, &routes, state);
        Ok(Self {
            router,
            config,
            routes,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &GatewayConfig, routes: &RouteTable, state: AppState) -> Router {
        let mut router = Router::new();
        for route in routes.routes() {
            router = router.route(&route.path, post(forward_handler));
        }

        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::HEAD,
                Method::PUT,
                Method::DELETE,
                Method::PATCH,
            ])
            .allow_headers(Any);

        router
            .with_state(state)
            .layer(DefaultBodyLimit::max(config.limits.max_body_bytes))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http().make_span_with(
                        |request: &Request<Body>| {
                            tracing::info_span!(
                                "request",
                                method = %request.method(),
                                path = %request.uri().path(),
                                request_id = %request_id(request),
                            )
                        },
                    ))
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(cors),
            )
    }

    /// The assembled router, for embedding or in-process tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until Ctrl+C/SIGTERM or a message on `shutdown`.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            routes = self.routes.len(),
            downstream = %self.config.downstream.base_url,
            "HTTP server starting"
        );
        for route in self.routes.routes() {
            tracing::debug!(path = %route.path, downstream = %route.target.url, "Route registered");
        }

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

fn request_id<B>(request: &Request<B>) -> &str {
    request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Forward one upload through the pipeline and relay the outcome.
async fn forward_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let request_id = request_id(&request).to_string();

    let target = match state.routes.resolve(request.uri().path()) {
        Some(target) => target.clone(),
        None => {
            tracing::warn!(
                request_id = %request_id,
                path = %request.uri().path(),
                "No route matched"
            );
            return (StatusCode::NOT_FOUND, "No matching route found").into_response();
        }
    };

    tracing::debug!(
        request_id = %request_id,
        route = %target.route,
        downstream = %target.url,
        "Forwarding upload"
    );

    match state.pipeline.forward(&target, request).await {
        Ok(relayed) => {
            let status = relayed.status;
            metrics::record_request(&target.route, status.as_u16(), start_time);
            tracing::info!(
                request_id = %request_id,
                route = %target.route,
                status = %status,
                elapsed_ms = start_time.elapsed().as_millis() as u64,
                "Upload relayed"
            );
            relayed.into_response()
        }
        Err(e) => {
            metrics::record_failure(&target.route, e.kind());
            metrics::record_request(&target.route, e.status().as_u16(), start_time);
            tracing::warn!(
                request_id = %request_id,
                route = %target.route,
                status = %e.status(),
                elapsed_ms = start_time.elapsed().as_millis() as u64,
                "Upload failed"
            );
            e.into_response()
        }
    }
}
