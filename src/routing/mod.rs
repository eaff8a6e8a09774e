//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at startup):
//!     RouteConfig[] + downstream base URL
//!     → router.rs (join downstream URLs)
//!     → Freeze as immutable RouteTable
//!
//! Per request:
//!     public path → RouteTable → DownstreamTarget
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Deterministic: same path always maps to the same target

pub mod router;

pub use router::{DownstreamTarget, Route, RouteTable};
