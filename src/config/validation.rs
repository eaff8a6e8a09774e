//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check the downstream base URL is a usable http(s) URL
//! - Validate value ranges (timeouts > 0, limits > 0)
//! - Detect conflicting routes
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::GatewayConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address '{0}' is not a socket address")]
    BindAddress(String),

    #[error("downstream.base_url '{0}' is not an http(s) URL")]
    BaseUrl(String),

    #[error("downstream.timeout_secs must be greater than zero")]
    ZeroTimeout,

    #[error("limits.max_body_bytes must be greater than zero")]
    ZeroBodyLimit,

    #[error("route #{0} has an empty name")]
    EmptyRouteName(usize),

    #[error("route '{name}': {field} '{value}' must start with '/'")]
    RelativePath {
        name: String,
        field: &'static str,
        value: String,
    },

    #[error("route path '{0}' is declared more than once")]
    DuplicatePath(String),
}

/// Check a parsed configuration, collecting every error found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    match Url::parse(&config.downstream.base_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {}
        _ => errors.push(ValidationError::BaseUrl(config.downstream.base_url.clone())),
    }

    if config.downstream.timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    if config.limits.max_body_bytes == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    let mut seen = HashSet::new();
    for (i, route) in config.routes.iter().enumerate() {
        if route.name.trim().is_empty() {
            errors.push(ValidationError::EmptyRouteName(i));
        }
        for (field, value) in [("path", &route.path), ("downstream_path", &route.downstream_path)] {
            if !value.starts_with('/') {
                errors.push(ValidationError::RelativePath {
                    name: route.name.clone(),
                    field,
                    value: value.clone(),
                });
            }
        }
        if !seen.insert(route.path.as_str()) {
            errors.push(ValidationError::DuplicatePath(route.path.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::RouteConfig;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&GatewayConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = GatewayConfig::default();
        config.downstream.base_url = "ftp://files".into();
        config.downstream.timeout_secs = 0;
        config.routes.push(RouteConfig::new("", "api/x", "/x"));

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::BaseUrl("ftp://files".into())));
        assert!(errors.contains(&ValidationError::ZeroTimeout));
        assert!(errors.contains(&ValidationError::EmptyRouteName(4)));
        assert!(errors.iter().any(|e| matches!(
            e,
            ValidationError::RelativePath { field: "path", .. }
        )));
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn test_duplicate_route_path() {
        let mut config = GatewayConfig::default();
        config
            .routes
            .push(RouteConfig::new("again", "/api/summarize", "/summarize"));

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::DuplicatePath("/api/summarize".into())]
        );
    }
}
