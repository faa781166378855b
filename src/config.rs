//! Configuration file parser for ~/.config/feedprobe/config.toml.
//!
//! The config file is optional; a missing file yields `Config::default()`.
//! Unknown keys are silently ignored by serde (with `deny_unknown_fields` off),
//! though we log a warning when the file contains potential typos.
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    /// A value parsed fine but cannot drive the engine (e.g. zero workers).
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level discovery configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// Missing keys fall back to `Default::default()`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Maximum number of sites resolved at the same time.
    pub site_concurrency: usize,

    /// Maximum number of candidate probes in flight within one site resolution.
    pub probe_concurrency: usize,

    /// Timeout for a single probe request, body sample included.
    pub probe_timeout_secs: u64,

    /// Number of leading body bytes inspected by the content sniff.
    pub sample_bytes: usize,

    /// Maximum redirect hops followed per probe.
    pub max_redirects: usize,

    /// Treat non-2xx responses as "not found" without sniffing the body.
    pub require_success_status: bool,

    /// Refuse to probe sites hosted on localhost or private IP ranges.
    pub block_private_hosts: bool,

    /// `User-Agent` header sent with every probe.
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site_concurrency: 10,
            probe_concurrency: 10,
            probe_timeout_secs: 10,
            sample_bytes: 512,
            max_redirects: 10,
            require_success_status: false,
            block_private_hosts: false,
            user_agent: concat!("feedprobe/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 8] = [
        "site_concurrency",
        "probe_concurrency",
        "probe_timeout_secs",
        "sample_bytes",
        "max_redirects",
        "require_success_status",
        "block_private_hosts",
        "user_agent",
    ];

    /// Default config location: `$HOME/.config/feedprobe/config.toml`.
    ///
    /// Returns `None` when `HOME` is not set.
    pub fn default_path() -> Option<PathBuf> {
        let home = std::env::var_os("HOME")?;
        Some(
            PathBuf::from(home)
                .join(".config")
                .join("feedprobe")
                .join("config.toml"),
        )
    }

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → silently accepted (serde default behavior), logged as warning
    ///
    /// The loaded values are not validated here; call [`Config::validate`]
    /// once CLI overrides have been applied.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // File deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(
            path = %path.display(),
            site_concurrency = config.site_concurrency,
            probe_concurrency = config.probe_concurrency,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Rejects values that would stall or disable discovery.
    ///
    /// A zero-permit worker pool never grants a permit, so zero concurrency
    /// would hang forever instead of failing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.site_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "site_concurrency must be at least 1".to_string(),
            ));
        }
        if self.probe_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "probe_concurrency must be at least 1".to_string(),
            ));
        }
        if self.probe_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "probe_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.sample_bytes == 0 {
            return Err(ConfigError::Invalid(
                "sample_bytes must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

// ============================================================================
// Tests
// ============================================================================
