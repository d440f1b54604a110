//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the mirror relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// Ingest surface (where the host traffic tool connects).
    pub ingest: IngestConfig,

    /// Downstream feed connection.
    pub downstream: DownstreamConfig,

    /// Correlation engine settings.
    pub correlation: CorrelationConfig,

    /// Domain blocklist.
    pub filter: FilterConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Ingest listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Bind address (e.g., "127.0.0.1:9191").
    pub bind_address: String,

    /// Maximum concurrent ingest connections (backpressure).
    pub max_connections: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:9191".to_string(),
            max_connections: 64,
        }
    }
}

/// Downstream feed configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DownstreamConfig {
    /// WebSocket endpoint of the downstream consumer.
    pub endpoint: String,

    /// Capacity of the record queue between correlator and sink.
    pub send_queue_size: usize,

    /// Byte budget for records held while disconnected (0 disables
    /// buffering: strict fire-and-forget).
    pub buffer_on_disconnect_bytes: usize,

    /// Reconnect behavior after send failures.
    pub reconnect: ReconnectConfig,
}

impl Default for DownstreamConfig {
    fn default() -> Self {
        Self {
            endpoint: "ws://localhost:9090".to_string(),
            send_queue_size: 1024,
            buffer_on_disconnect_bytes: 1024 * 1024,
            reconnect: ReconnectConfig::default(),
        }
    }
}

/// Reconnect configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Enable reconnect after send failures.
    pub enabled: bool,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_delay_ms: 100,
            max_delay_ms: 5000,
        }
    }
}

/// Correlation engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorrelationConfig {
    /// Pair key strategy.
    pub strategy: KeyStrategyKind,

    /// Maximum age of a pending exchange before eviction, in seconds.
    /// Absent means pendings wait indefinitely.
    pub max_pending_age_secs: Option<u64>,

    /// Interval between stale sweeps in seconds.
    pub sweep_interval_secs: u64,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            strategy: KeyStrategyKind::OpaqueTag,
            max_pending_age_secs: None,
            sweep_interval_secs: 30,
        }
    }
}

/// Which pair key strategy the engine runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum KeyStrategyKind {
    /// Engine-minted unique tag per exchange (preferred).
    #[default]
    OpaqueTag,
    /// `host|method|path` derived key (degraded fallback, collision-prone
    /// for concurrent identical requests).
    DerivedKey,
}

/// Domain blocklist configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct FilterConfig {
    /// Domains whose pairs are dropped before encoding. Matches the exact
    /// domain and all subdomains.
    pub blocked_domains: Vec<String>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9900".to_string(),
        }
    }
}
