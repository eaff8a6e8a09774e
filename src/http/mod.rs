//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, CORS, body limit)
//!     → [pipeline: decode → encode → dispatch → relay]
//!     → response.rs (relayed response or JSON error)
//!     → Send to client
//! ```

pub mod response;
pub mod server;

pub use response::ErrorBody;
pub use server::{AppState, HttpServer, ServerError, X_REQUEST_ID};
