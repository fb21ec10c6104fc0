//! Configuration file parsing and management.
//!
//! This module handles loading configuration from TOML files and `DS_*`
//! environment variables, and merging configurations with proper precedence
//! rules. Turning the merged values into a [`CheckConfig`](crate::CheckConfig)
//! happens in the CLI, which also layers its own arguments on top.

use crate::error::SieveError;
use crate::protocols::registry::{PriceCatalog, WhoisServer, WhoisServerTable};
use crate::utils::{normalize_suffix, validate_suffix};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration loaded from TOML files.
///
/// ```toml
/// [defaults]
/// concurrency = 5
/// timeout = "8s"
/// rate_limit = 1.5
/// burst = 2
/// ledger_dir = "~/domains"
///
/// [servers]
/// ".io" = "whois.nic.io"
///
/// [prices]
/// ".io" = "3.530.000"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FileConfig {
    /// Default values for CLI options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,

    /// Suffix -> `host[:port]` WHOIS server overrides
    #[serde(skip_serializing_if = "Option::is_none")]
    pub servers: Option<HashMap<String, String>>,

    /// Suffix -> price overrides for the catalogue
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prices: Option<HashMap<String, String>>,
}

/// Default configuration values that map to CLI options.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DefaultsConfig {
    /// Default concurrency level
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,

    /// Default timeout (as string, e.g., "5s", "2m")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    /// Requests per second per WHOIS host
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<f64>,

    /// Requests allowed back-to-back per host
    #[serde(skip_serializing_if = "Option::is_none")]
    pub burst: Option<u32>,

    /// Directory holding ledger files
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ledger_dir: Option<String>,
}

impl FileConfig {
    /// Built-in server table with this file's `[servers]` applied.
    pub fn server_table(&self) -> Result<WhoisServerTable, SieveError> {
        match &self.servers {
            Some(servers) => WhoisServerTable::builtin().with_overrides(servers),
            None => Ok(WhoisServerTable::builtin()),
        }
    }

    /// Built-in price catalogue with this file's `[prices]` applied.
    pub fn price_catalog(&self) -> Result<PriceCatalog, SieveError> {
        match &self.prices {
            Some(prices) => PriceCatalog::builtin().with_overrides(prices),
            None => Ok(PriceCatalog::builtin()),
        }
    }
}

/// Configuration discovery and loading functionality.
pub struct ConfigManager {
    /// Directory searched for project-local config files
    local_dir: PathBuf,
}

impl ConfigManager {
    /// Create a manager that looks for local config in the working directory.
    pub fn new() -> Self {
        Self {
            local_dir: PathBuf::from("."),
        }
    }

    /// Look for project-local config files in `dir` instead.
    pub fn with_local_dir<P: Into<PathBuf>>(dir: P) -> Self {
        Self {
            local_dir: dir.into(),
        }
    }

    /// Load configuration from a specific file.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, SieveError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(SieveError::file_error(
                path.to_string_lossy(),
                "Configuration file not found",
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            SieveError::file_error(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let config: FileConfig = toml::from_str(&content).map_err(|e| {
            SieveError::config(format!(
                "Failed to parse TOML configuration '{}': {}",
                path.display(),
                e
            ))
        })?;

        self.validate_config(&config)?;

        tracing::debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    /// Discover and load configuration files in precedence order.
    ///
    /// XDG config is loaded first, then the home-directory file, then the
    /// project-local one; later files override earlier ones field by field.
    /// A file that exists but fails to parse or validate is an error.
    pub fn discover_and_load(&self) -> Result<FileConfig, SieveError> {
        let mut merged_config = FileConfig::default();
        let mut loaded_files = Vec::new();

        let candidates = [
            self.get_xdg_config_path(),
            self.get_global_config_path(),
            self.get_local_config_path(),
        ];

        for path in candidates.into_iter().flatten() {
            let config = self.load_file(&path)?;
            merged_config = self.merge_configs(merged_config, config);
            loaded_files.push(path);
        }

        if loaded_files.len() > 1 {
            tracing::debug!(
                files = ?loaded_files,
                "multiple config files found, later files take precedence"
            );
        }

        Ok(merged_config)
    }

    /// Get the local configuration file path.
    fn get_local_config_path(&self) -> Option<PathBuf> {
        ["domain-sieve.toml", ".domain-sieve.toml"]
            .iter()
            .map(|name| self.local_dir.join(name))
            .find(|path| path.exists())
    }

    /// Get the global configuration file path.
    fn get_global_config_path(&self) -> Option<PathBuf> {
        let home = env::var_os("HOME")?;
        [".domain-sieve.toml", "domain-sieve.toml"]
            .iter()
            .map(|name| Path::new(&home).join(name))
            .find(|path| path.exists())
    }

    /// Get the XDG configuration file path.
    fn get_xdg_config_path(&self) -> Option<PathBuf> {
        let config_dir = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))?;

        let path = config_dir.join("domain-sieve").join("config.toml");
        path.exists().then_some(path)
    }

    /// Merge two configurations with proper precedence.
    ///
    /// Values from `higher` take precedence over values from `lower`.
    pub fn merge_configs(&self, lower: FileConfig, higher: FileConfig) -> FileConfig {
        FileConfig {
            defaults: match (lower.defaults, higher.defaults) {
                (Some(lower_defaults), Some(higher_defaults)) => Some(DefaultsConfig {
                    concurrency: higher_defaults.concurrency.or(lower_defaults.concurrency),
                    timeout: higher_defaults.timeout.or(lower_defaults.timeout),
                    rate_limit: higher_defaults.rate_limit.or(lower_defaults.rate_limit),
                    burst: higher_defaults.burst.or(lower_defaults.burst),
                    ledger_dir: higher_defaults.ledger_dir.or(lower_defaults.ledger_dir),
                }),
                (lower_defaults, higher_defaults) => higher_defaults.or(lower_defaults),
            },
            servers: merge_maps(lower.servers, higher.servers),
            prices: merge_maps(lower.prices, higher.prices),
        }
    }

    /// Validate a configuration for common issues.
    fn validate_config(&self, config: &FileConfig) -> Result<(), SieveError> {
        if let Some(defaults) = &config.defaults {
            if let Some(concurrency) = defaults.concurrency {
                if concurrency == 0 || concurrency > 100 {
                    return Err(SieveError::config("Concurrency must be between 1 and 100"));
                }
            }

            if let Some(timeout_str) = &defaults.timeout {
                if parse_timeout_string(timeout_str).is_none() {
                    return Err(SieveError::config(format!(
                        "Invalid timeout format '{}'. Use format like '5s', '30s', '2m'",
                        timeout_str
                    )));
                }
            }

            if let Some(rate) = defaults.rate_limit {
                if !rate.is_finite() || rate <= 0.0 {
                    return Err(SieveError::config(
                        "rate_limit must be a positive number of requests per second",
                    ));
                }
            }

            if defaults.burst == Some(0) {
                return Err(SieveError::config("burst must be at least 1"));
            }
        }

        if let Some(servers) = &config.servers {
            for (suffix, server) in servers {
                validate_suffix_key(suffix)?;
                WhoisServer::parse(server)?;
            }
        }

        if let Some(prices) = &config.prices {
            for suffix in prices.keys() {
                validate_suffix_key(suffix)?;
            }
        }

        Ok(())
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

fn merge_maps(
    lower: Option<HashMap<String, String>>,
    higher: Option<HashMap<String, String>>,
) -> Option<HashMap<String, String>> {
    match (lower, higher) {
        (Some(mut lower_map), Some(higher_map)) => {
            lower_map.extend(higher_map);
            Some(lower_map)
        }
        (lower_map, higher_map) => higher_map.or(lower_map),
    }
}

fn validate_suffix_key(suffix: &str) -> Result<(), SieveError> {
    validate_suffix(&normalize_suffix(suffix))
        .map_err(|_| SieveError::config(format!("Invalid suffix key '{}'", suffix)))
}

/// Environment variable configuration that mirrors CLI options.
///
/// This represents configuration values that can be set via `DS_*`
/// environment variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvConfig {
    pub concurrency: Option<usize>,
    pub timeout: Option<String>,
    pub rate_limit: Option<f64>,
    pub ledger_dir: Option<String>,
    pub config: Option<String>,
}

impl EnvConfig {
    /// Build from an arbitrary variable lookup.
    ///
    /// Invalid values are logged as warnings and ignored.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut env_config = EnvConfig::default();

        // DS_CONCURRENCY - concurrent lookups
        if let Some(val) = lookup("DS_CONCURRENCY") {
            match val.trim().parse::<usize>() {
                Ok(concurrency) if (1..=100).contains(&concurrency) => {
                    tracing::debug!(concurrency, "using DS_CONCURRENCY");
                    env_config.concurrency = Some(concurrency);
                }
                _ => tracing::warn!(value = %val, "invalid DS_CONCURRENCY, must be 1-100"),
            }
        }

        // DS_TIMEOUT - per-lookup deadline
        if let Some(val) = lookup("DS_TIMEOUT") {
            if parse_timeout_string(&val).is_some() {
                tracing::debug!(timeout = %val, "using DS_TIMEOUT");
                env_config.timeout = Some(val);
            } else {
                tracing::warn!(value = %val, "invalid DS_TIMEOUT, use format like '5s', '30s', '2m'");
            }
        }

        // DS_RATE_LIMIT - requests per second per host
        if let Some(val) = lookup("DS_RATE_LIMIT") {
            match val.trim().parse::<f64>() {
                Ok(rate) if rate.is_finite() && rate > 0.0 => {
                    tracing::debug!(rate, "using DS_RATE_LIMIT");
                    env_config.rate_limit = Some(rate);
                }
                _ => tracing::warn!(value = %val, "invalid DS_RATE_LIMIT, must be a positive number"),
            }
        }

        // DS_LEDGER_DIR - where ledger files live
        if let Some(val) = lookup("DS_LEDGER_DIR") {
            if !val.trim().is_empty() {
                env_config.ledger_dir = Some(val);
            }
        }

        // DS_CONFIG - explicit config file
        if let Some(val) = lookup("DS_CONFIG") {
            if !val.trim().is_empty() {
                env_config.config = Some(val);
            }
        }

        env_config
    }
}

/// Load configuration from the process environment.
pub fn load_env_config() -> EnvConfig {
    EnvConfig::from_lookup(|key| env::var(key).ok())
}

/// Parse a timeout string like "500ms", "5s" or "2m".
///
/// A bare number is taken as seconds. Zero is rejected.
pub fn parse_timeout_string(timeout_str: &str) -> Option<Duration> {
    let timeout_str = timeout_str.trim().to_lowercase();

    let duration = if let Some(ms) = timeout_str.strip_suffix("ms") {
        ms.parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = timeout_str.strip_suffix('s') {
        secs.parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = timeout_str.strip_suffix('m') {
        mins.parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        timeout_str.parse::<u64>().ok().map(Duration::from_secs)
    };

    duration.filter(|d| !d.is_zero())
}

/// Expand a leading `~` to the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~") {
        Some(rest) => match env::var_os("HOME") {
            Some(home) => Path::new(&home).join(rest.trim_start_matches('/')),
            None => PathBuf::from(path),
        },
        None => PathBuf::from(path),
    }
}
