//! Configuration sections
//!
//! Every field carries a serde default so a partial (or empty) file yields a
//! complete configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the related-items engine
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KinshipConfig {
    /// Optional queries and host features
    #[serde(default)]
    pub features: FeatureConfig,

    /// Cache lifetimes
    #[serde(default)]
    pub cache: CacheConfig,

    /// Breadcrumb ("contained in") lookup behaviour
    #[serde(default)]
    pub breadcrumb: BreadcrumbConfig,

    /// Search indexing
    #[serde(default)]
    pub search: SearchConfig,

    /// Log filtering
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Feature switches honoured by the aggregator and item builder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Run the two-hop alias backref query.
    ///
    /// It is the most expensive collector; disabling it drops the
    /// `backref-alias-blocks` category entirely.
    #[serde(default = "default_true")]
    pub alias_backref_query: bool,

    /// Resolve journal pages for date-like property references
    #[serde(default = "default_true")]
    pub journal_pages: bool,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            alias_backref_query: true,
            journal_pages: true,
        }
    }
}

/// Cache lifetimes, in seconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Lifetime of a per-root relationship snapshot
    #[serde(default = "default_snapshot_ttl")]
    pub snapshot_ttl_secs: u64,

    /// Lifetime of a memoized raw store call
    #[serde(default = "default_gateway_ttl")]
    pub gateway_ttl_secs: u64,

    /// Lifetime of a resolved journal page id
    #[serde(default = "default_journal_ttl")]
    pub journal_ttl_secs: u64,

    /// Interval between active sweeps of expired entries
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl CacheConfig {
    /// Snapshot lifetime as a [`Duration`]
    pub fn snapshot_ttl(&self) -> Duration {
        Duration::from_secs(self.snapshot_ttl_secs)
    }

    /// Store-call memo lifetime as a [`Duration`]
    pub fn gateway_ttl(&self) -> Duration {
        Duration::from_secs(self.gateway_ttl_secs)
    }

    /// Journal cache lifetime as a [`Duration`]
    pub fn journal_ttl(&self) -> Duration {
        Duration::from_secs(self.journal_ttl_secs)
    }

    /// Sweep interval as a [`Duration`]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            snapshot_ttl_secs: default_snapshot_ttl(),
            gateway_ttl_secs: default_gateway_ttl(),
            journal_ttl_secs: default_journal_ttl(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

/// Retry policy for reading the rendered tag-hierarchy breadcrumb
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreadcrumbConfig {
    /// Total attempts, including the first one
    #[serde(default = "default_breadcrumb_attempts")]
    pub max_attempts: u32,

    /// Fixed delay between attempts, in milliseconds
    #[serde(default = "default_breadcrumb_backoff")]
    pub backoff_ms: u64,
}

impl BreadcrumbConfig {
    /// Delay between attempts as a [`Duration`]
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

impl Default for BreadcrumbConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_breadcrumb_attempts(),
            backoff_ms: default_breadcrumb_backoff(),
        }
    }
}

/// Search indexing over each item's descendants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Walk descendants into the searchable text at all
    #[serde(default = "default_true")]
    pub index_descendants: bool,

    /// Depth cap for the descendant walk; `None` walks the whole subtree
    #[serde(default)]
    pub max_descendant_depth: Option<usize>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            index_descendants: true,
            max_descendant_depth: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level for kinship crates (`trace`, `debug`, `info`, `warn`, `error`)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Full `EnvFilter` directive; overrides `level` when set
    #[serde(default)]
    pub filter: Option<String>,
}

impl LoggingConfig {
    /// Filter directive to install, honouring the explicit override
    pub fn directive(&self) -> String {
        match &self.filter {
            Some(filter) => filter.clone(),
            None => format!("kinship_core={0},kinship_cli={0}", self.level),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            filter: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_snapshot_ttl() -> u64 {
    300
}

fn default_gateway_ttl() -> u64 {
    30
}

fn default_journal_ttl() -> u64 {
    1800
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_breadcrumb_attempts() -> u32 {
    3
}

fn default_breadcrumb_backoff() -> u64 {
    200
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = KinshipConfig::default();
        assert!(config.features.alias_backref_query);
        assert!(config.features.journal_pages);
        assert_eq!(config.cache.snapshot_ttl(), Duration::from_secs(300));
        assert_eq!(config.cache.gateway_ttl(), Duration::from_secs(30));
        assert_eq!(config.cache.journal_ttl(), Duration::from_secs(1800));
        assert_eq!(config.breadcrumb.max_attempts, 3);
        assert_eq!(config.breadcrumb.backoff(), Duration::from_millis(200));
        assert!(config.search.max_descendant_depth.is_none());
    }

    #[test]
    fn test_deserialize_empty_uses_defaults() {
        let config: KinshipConfig = toml::from_str("").unwrap();
        assert_eq!(config, KinshipConfig::default());
    }

    #[test]
    fn test_deserialize_partial_section() {
        let toml = r#"
            [features]
            alias_backref_query = false

            [cache]
            snapshot_ttl_secs = 60
        "#;
        let config: KinshipConfig = toml::from_str(toml).unwrap();
        assert!(!config.features.alias_backref_query);
        assert!(config.features.journal_pages);
        assert_eq!(config.cache.snapshot_ttl_secs, 60);
        assert_eq!(config.cache.gateway_ttl_secs, 30);
    }

    #[test]
    fn test_logging_directive() {
        let logging = LoggingConfig::default();
        assert_eq!(logging.directive(), "kinship_core=info,kinship_cli=info");

        let logging = LoggingConfig {
            level: "debug".to_string(),
            filter: Some("warn".to_string()),
        };
        assert_eq!(logging.directive(), "warn");
    }
}
