//! Configuration for certificate sweeps.
//!
//! Settings can come from three places, merged with clear precedence:
//!
//! 1. Default values (lowest priority)
//! 2. Configuration file (TOML, via `--config`)
//! 3. Command-line arguments (highest priority)
//!
//! The merged [`Config`] is validated into an immutable [`Settings`] that is
//! handed to the checker and dispatcher at construction time. Validation
//! happens before any network activity; violations surface as fatal
//! configuration errors.
//!
//! # Example Configuration File
//!
//! ```toml
//! hosts = ["example.com", "example.com:8443"]
//! days = 30
//! concurrency = 8
//! timeout = 30
//! output = "summary"
//! exit_code = 1
//!
//! [prometheus]
//! enabled = true
//! address = "http://localhost:9091"
//! ```

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CheckError;
use crate::report::OutputFormat;

/// Default look-ahead window in days.
pub const DEFAULT_DAYS: u32 = 30;
/// Default worker pool size.
pub const DEFAULT_CONCURRENCY: usize = 8;
/// Default handshake timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Upper bound on the look-ahead window (100 years).
const MAX_DAYS: u32 = 36_500;

const DEFAULT_PUSH_GATEWAY: &str = "http://localhost:9091";

/// Raw configuration, all fields optional to support partial sources and
/// merging.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// Hostnames to check, `host` or `host:port`
    pub hosts: Option<Vec<String>>,
    /// Look-ahead window in days
    pub days: Option<u32>,
    /// Worker pool size
    pub concurrency: Option<usize>,
    /// Handshake timeout in seconds
    pub timeout: Option<u64>,
    /// Output format: text, summary or json
    pub output: Option<String>,
    /// Exit code to use when any host fails its check
    pub exit_code: Option<i32>,
    /// Prometheus push configuration
    pub prometheus: Option<PrometheusConfig>,
}

/// Prometheus Push Gateway integration.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PrometheusConfig {
    /// Enable metrics pushing
    pub enabled: Option<bool>,
    /// Push gateway address, e.g. "http://localhost:9091"
    pub address: Option<String>,
}

impl Config {
    /// Baseline configuration with default values; merge file and CLI
    /// sources on top of it.
    pub fn default() -> Self {
        Config {
            hosts: None,
            days: Some(DEFAULT_DAYS),
            concurrency: Some(DEFAULT_CONCURRENCY),
            timeout: Some(DEFAULT_TIMEOUT_SECS),
            output: Some("text".to_string()),
            exit_code: Some(1),
            prometheus: Some(PrometheusConfig {
                enabled: Some(false),
                address: Some(DEFAULT_PUSH_GATEWAY.to_string()),
            }),
        }
    }

    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CheckError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            CheckError::config(format!("config file {}: {}", path.display(), e))
        })?;
        toml::from_str(&content)
            .map_err(|e| CheckError::config(format!("config file {}: {}", path.display(), e)))
    }

    /// Merge with another configuration, the other's values taking
    /// precedence wherever present.
    pub fn merge_with(mut self, other: Config) -> Self {
        if other.hosts.is_some() {
            self.hosts = other.hosts;
        }
        if other.days.is_some() {
            self.days = other.days;
        }
        if other.concurrency.is_some() {
            self.concurrency = other.concurrency;
        }
        if other.timeout.is_some() {
            self.timeout = other.timeout;
        }
        if other.output.is_some() {
            self.output = other.output;
        }
        if other.exit_code.is_some() {
            self.exit_code = other.exit_code;
        }
        if let Some(other_prom) = other.prometheus {
            if let Some(ref mut self_prom) = self.prometheus {
                if other_prom.enabled.is_some() {
                    self_prom.enabled = other_prom.enabled;
                }
                if other_prom.address.is_some() {
                    self_prom.address = other_prom.address;
                }
            } else {
                self.prometheus = Some(other_prom);
            }
        }
        self
    }

    /// Build a configuration from command-line arguments for merging. Only
    /// provided values override other sources.
    #[allow(clippy::too_many_arguments)]
    pub fn from_cli_args(
        hosts: Option<Vec<String>>,
        days: Option<u32>,
        concurrency: Option<usize>,
        timeout: Option<u64>,
        output: Option<String>,
        exit_code: Option<i32>,
        prometheus: Option<bool>,
        prometheus_address: Option<String>,
    ) -> Self {
        Config {
            hosts,
            days,
            concurrency,
            timeout,
            output,
            exit_code,
            prometheus: Some(PrometheusConfig {
                enabled: prometheus,
                address: prometheus_address,
            }),
        }
    }

    /// Generate an example configuration file in TOML format.
    pub fn example_toml() -> String {
        let example = Config {
            hosts: Some(vec![
                "example.com".to_string(),
                "example.com:8443".to_string(),
                "https://secure.example.com:9443".to_string(),
            ]),
            days: Some(DEFAULT_DAYS),
            concurrency: Some(DEFAULT_CONCURRENCY),
            timeout: Some(DEFAULT_TIMEOUT_SECS),
            output: Some("summary".to_string()),
            exit_code: Some(1),
            prometheus: Some(PrometheusConfig {
                enabled: Some(false),
                address: Some(DEFAULT_PUSH_GATEWAY.to_string()),
            }),
        };

        toml::to_string_pretty(&example)
            .unwrap_or_else(|_| "# error generating example".to_string())
    }
}

/// Validated, immutable run settings consumed by the checker and
/// dispatcher.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Hostnames to check, in input order
    pub hosts: Vec<String>,
    /// Look-ahead window in days
    pub days: u32,
    /// Worker pool size, at least 1
    pub concurrency: usize,
    /// Per-connection handshake timeout
    pub timeout: Duration,
    /// Report format
    pub output: OutputFormat,
    /// Exit code when any host fails
    pub exit_code: i32,
    /// Push gateway address when metrics are enabled
    pub prometheus: Option<String>,
}

impl Settings {
    /// Validate a merged configuration. Every violation is a fatal
    /// configuration error raised before dispatch begins.
    pub fn from_config(config: Config) -> Result<Settings, CheckError> {
        let hosts = config.hosts.unwrap_or_default();
        if hosts.is_empty() {
            return Err(CheckError::config(
                "no hosts to check; pass hostnames or --hosts-file",
            ));
        }

        let days = config.days.unwrap_or(DEFAULT_DAYS);
        if days > MAX_DAYS {
            return Err(CheckError::config(format!(
                "days must be at most {}",
                MAX_DAYS
            )));
        }

        let concurrency = config.concurrency.unwrap_or(DEFAULT_CONCURRENCY);
        if concurrency == 0 {
            return Err(CheckError::config("concurrency must be at least 1"));
        }

        let timeout = config.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout == 0 {
            return Err(CheckError::config("timeout must be at least 1 second"));
        }

        let output = match config.output {
            Some(name) => OutputFormat::from_str(&name)
                .map_err(|_| CheckError::config(format!("unknown output format: {}", name)))?,
            None => OutputFormat::Text,
        };

        let prometheus = match config.prometheus {
            Some(prom) if prom.enabled.unwrap_or(false) => {
                Some(prom.address.unwrap_or_else(|| DEFAULT_PUSH_GATEWAY.to_string()))
            }
            _ => None,
        };

        Ok(Settings {
            hosts,
            days,
            concurrency,
            timeout: Duration::from_secs(timeout),
            output,
            exit_code: config.exit_code.unwrap_or(1),
            prometheus,
        })
    }
}

/// Read a line-oriented hosts file: one hostname per line, whitespace
/// trimmed, blank lines skipped.
pub fn read_hosts_file<P: AsRef<Path>>(path: P) -> Result<Vec<String>, CheckError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(CheckError::config(format!(
            "provided hosts file {} does not exist",
            path.display()
        )));
    }

    let file = fs::File::open(path).map_err(|e| {
        CheckError::config(format!("error opening hosts file {}: {}", path.display(), e))
    })?;

    let mut hosts = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|e| {
            CheckError::config(format!("error reading hosts file {}: {}", path.display(), e))
        })?;
        let host = line.trim();
        if !host.is_empty() {
            hosts.push(host.to_string());
        }
    }
    Ok(hosts)
}
