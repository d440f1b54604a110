//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges and address/URL syntax
//! - Return all validation errors, not just the first

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::RelayConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("ingest.bind_address '{0}' is not a valid socket address")]
    InvalidBindAddress(String),

    #[error("ingest.max_connections must be greater than zero")]
    ZeroMaxConnections,

    #[error("downstream.endpoint '{0}' is not a valid URL")]
    InvalidEndpoint(String),

    #[error("downstream.endpoint '{0}' must use the ws or wss scheme")]
    NonWebSocketEndpoint(String),

    #[error("downstream.send_queue_size must be greater than zero")]
    ZeroQueueSize,

    #[error("correlation.sweep_interval_secs must be greater than zero")]
    ZeroSweepInterval,

    #[error("correlation.max_pending_age_secs must be greater than zero when set")]
    ZeroPendingAge,

    #[error("filter.blocked_domains contains an invalid entry '{0}'")]
    InvalidBlockedDomain(String),

    #[error("observability.metrics_address '{0}' is not a valid socket address")]
    InvalidMetricsAddress(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.ingest.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(config.ingest.bind_address.clone()));
    }
    if config.ingest.max_connections == 0 {
        errors.push(ValidationError::ZeroMaxConnections);
    }

    match Url::parse(&config.downstream.endpoint) {
        Ok(url) if url.scheme() == "ws" || url.scheme() == "wss" => {}
        Ok(_) => {
            errors.push(ValidationError::NonWebSocketEndpoint(config.downstream.endpoint.clone()));
        }
        Err(_) => {
            errors.push(ValidationError::InvalidEndpoint(config.downstream.endpoint.clone()));
        }
    }
    if config.downstream.send_queue_size == 0 {
        errors.push(ValidationError::ZeroQueueSize);
    }

    if config.correlation.sweep_interval_secs == 0 {
        errors.push(ValidationError::ZeroSweepInterval);
    }
    if config.correlation.max_pending_age_secs == Some(0) {
        errors.push(ValidationError::ZeroPendingAge);
    }

    for domain in &config.filter.blocked_domains {
        let trimmed = domain.trim();
        if trimmed.is_empty() || trimmed.contains(char::is_whitespace) || trimmed.contains('/') {
            errors.push(ValidationError::InvalidBlockedDomain(domain.clone()));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
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

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&RelayConfig::default()).is_ok());
    }

    #[test]
    fn rejects_non_websocket_endpoint() {
        let mut config = RelayConfig::default();
        config.downstream.endpoint = "http://localhost:9090".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::NonWebSocketEndpoint(_))));
    }

    #[test]
    fn collects_multiple_errors() {
        let mut config = RelayConfig::default();
        config.ingest.bind_address = "bogus".to_string();
        config.ingest.max_connections = 0;
        config.downstream.send_queue_size = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn rejects_blocked_domain_with_path() {
        let mut config = RelayConfig::default();
        config.filter.blocked_domains = vec!["example.com/path".to_string()];
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn rejects_zero_pending_age() {
        let mut config = RelayConfig::default();
        config.correlation.max_pending_age_secs = Some(0);
        assert!(validate_config(&config).is_err());
    }
}
