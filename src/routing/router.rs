//! Route table construction and lookup.
//!
//! # Responsibilities
//! - Compile route configs into downstream targets
//! - Look up the target for a public path
//! - Return matched route or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Exact path match; the HTTP layer registers one handler per route
//! - Downstream URL is joined once, at construction

use std::sync::Arc;

use crate::config::RouteConfig;

/// Where a public route's uploads are forwarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownstreamTarget {
    /// Route name, for logs and metrics.
    pub route: String,
    /// Absolute downstream URL (base URL + downstream path).
    pub url: String,
}

/// A compiled public route.
#[derive(Debug, Clone)]
pub struct Route {
    pub path: String,
    pub target: Arc<DownstreamTarget>,
}

/// Immutable mapping from public path to downstream target.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Compile the table from config against a downstream base URL.
    pub fn from_config(base_url: &str, configs: &[RouteConfig]) -> Self {
        let base = base_url.trim_end_matches('/');
        let routes = configs
            .iter()
            .map(|config| Route {
                path: config.path.clone(),
                target: Arc::new(DownstreamTarget {
                    route: config.name.clone(),
                    url: format!("{}{}", base, config.downstream_path),
                }),
            })
            .collect();

        Self { routes }
    }

    /// All routes, in declaration order.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Find the target for a public path.
    pub fn resolve(&self, path: &str) -> Option<&Arc<DownstreamTarget>> {
        self.routes
            .iter()
            .find(|route| route.path == path)
            .map(|route| &route.target)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
