//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Init logging/metrics → Bind → Serve
//!
//! Shutdown (shutdown.rs, signals.rs):
//!     Signal or broadcast → Stop accepting → Drain in-flight uploads → Exit
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
