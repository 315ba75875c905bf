//! Configuration file loading with precedence handling.

use crate::layout::params::{DEFAULT_GAP, DEFAULT_OFFSET, DEFAULT_TOP_MARGIN};
use crate::layout::LayoutParams;
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "MARGINALIA_CONFIG";

/// Environment variable overriding the log file path.
pub const LOG_FILE_ENV_VAR: &str = "MARGINALIA_LOG_FILE";

/// Errors that can occur during config loading.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Config file path contains invalid UTF-8 or cannot be resolved.
    #[error("Invalid config path: {0}")]
    InvalidPath(String),

    /// Failed to read config file (file may not exist or have permission issues).
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError {
        /// Path that failed to read.
        path: PathBuf,
        /// Reason for failure.
        reason: String,
    },

    /// Config file contains invalid TOML syntax.
    #[error("Invalid TOML in {path}: {reason}")]
    ParseError {
        /// Path with invalid TOML.
        path: PathBuf,
        /// Parse error details.
        reason: String,
    },
}

/// TOML configuration file structure.
///
/// All fields are optional - if not specified, hardcoded defaults are used.
/// Corresponds to `~/.config/marginalia/config.toml`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Vertical gap between stacked cards, in pixels.
    #[serde(default)]
    pub gap: Option<f64>,

    /// Space kept free above the first card when nothing is pinned.
    #[serde(default)]
    pub top_margin: Option<f64>,

    /// Shift applied to every annotation's desired position.
    #[serde(default)]
    pub offset: Option<f64>,

    /// Path to log file for tracing output.
    #[serde(default)]
    pub log_file_path: Option<PathBuf>,

    /// Pretty-print JSON output.
    #[serde(default)]
    pub pretty: Option<bool>,
}

/// Resolved configuration after applying precedence rules.
///
/// Created by merging defaults, config file, env vars, and CLI args.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    /// Gap between cards.
    pub gap: f64,
    /// Top margin.
    pub top_margin: f64,
    /// Anchor offset.
    pub offset: f64,
    /// Path to log file for tracing output.
    pub log_file_path: PathBuf,
    /// Pretty-print JSON output.
    pub pretty: bool,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            gap: DEFAULT_GAP,
            top_margin: DEFAULT_TOP_MARGIN,
            offset: DEFAULT_OFFSET,
            log_file_path: default_log_path(),
            pretty: false,
        }
    }
}

impl ResolvedConfig {
    /// Layout parameters for the engine.
    pub fn layout_params(&self) -> LayoutParams {
        LayoutParams::new(self.gap, self.top_margin, self.offset)
    }
}

/// Resolve default log file path.
///
/// Returns `~/.local/state/marginalia/marginalia.log` on Linux, or the
/// platform state directory elsewhere. Falls back to the current directory.
pub fn default_log_path() -> PathBuf {
    if let Some(state_dir) = dirs::state_dir() {
        state_dir.join("marginalia").join("marginalia.log")
    } else {
        PathBuf::from("marginalia.log")
    }
}

/// Load configuration file from a specific path.
///
/// Returns `Ok(None)` if file doesn't exist (not an error - use defaults).
///
/// # Errors
///
/// Returns error if file exists but has read or parse errors.
pub fn load_config_file(path: impl Into<PathBuf>) -> Result<Option<ConfigFile>, ConfigError> {
    let path = path.into();

    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path).map_err(|e| ConfigError::ReadError {
        path: path.clone(),
        reason: e.to_string(),
    })?;

    let config: ConfigFile = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        reason: e.to_string(),
    })?;

    Ok(Some(config))
}

/// Resolve default config file path.
///
/// Returns `~/.config/marginalia/config.toml` on Linux, appropriate path on
/// other platforms. Returns `None` if home directory cannot be determined.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("marginalia").join("config.toml"))
}

/// Load configuration with precedence handling.
///
/// Precedence (highest to lowest):
/// 1. Explicit `config_path` argument (CLI `--config`)
/// 2. `MARGINALIA_CONFIG` environment variable
/// 3. Default path `~/.config/marginalia/config.toml`
///
/// Missing config files are NOT errors - defaults are used.
///
/// # Errors
///
/// Returns error only if a config file exists but cannot be read or parsed,
/// or if `MARGINALIA_CONFIG` is not valid Unicode.
pub fn load_config_with_precedence(
    config_path: Option<PathBuf>,
) -> Result<Option<ConfigFile>, ConfigError> {
    if let Some(path) = config_path {
        return load_config_file(path);
    }

    match std::env::var(CONFIG_ENV_VAR) {
        Ok(env_path) => return load_config_file(PathBuf::from(env_path)),
        Err(std::env::VarError::NotUnicode(raw)) => {
            return Err(ConfigError::InvalidPath(raw.to_string_lossy().into_owned()));
        }
        Err(std::env::VarError::NotPresent) => {}
    }

    if let Some(default_path) = default_config_path() {
        return load_config_file(default_path);
    }

    Ok(None)
}

/// Merge config file into defaults to create resolved config.
///
/// For each field in `ConfigFile`, if `Some(value)`, use it; otherwise use default.
pub fn merge_config(config_file: Option<ConfigFile>) -> ResolvedConfig {
    let defaults = ResolvedConfig::default();

    let Some(config) = config_file else {
        return defaults;
    };

    ResolvedConfig {
        gap: config.gap.unwrap_or(defaults.gap),
        top_margin: config.top_margin.unwrap_or(defaults.top_margin),
        offset: config.offset.unwrap_or(defaults.offset),
        log_file_path: config.log_file_path.unwrap_or(defaults.log_file_path),
        pretty: config.pretty.unwrap_or(defaults.pretty),
    }
}

/// Apply environment variable overrides to resolved config.
///
/// Checks for:
/// - `MARGINALIA_LOG_FILE`: Override log file path
pub fn apply_env_overrides(mut config: ResolvedConfig) -> ResolvedConfig {
    if let Some(path) = std::env::var_os(LOG_FILE_ENV_VAR) {
        config.log_file_path = PathBuf::from(path);
    }

    config
}

/// Overrides taken from command line flags.
///
/// `None` means the flag was not given.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliOverrides {
    /// `--gap`
    pub gap: Option<f64>,
    /// `--top-margin`
    pub top_margin: Option<f64>,
    /// `--offset`
    pub offset: Option<f64>,
    /// `--pretty`
    pub pretty: Option<bool>,
}

/// Apply CLI argument overrides to resolved config.
///
/// Precedence chain: Defaults → Config File → Env Vars → CLI Args (highest)
pub fn apply_cli_overrides(mut config: ResolvedConfig, overrides: CliOverrides) -> ResolvedConfig {
    if let Some(gap) = overrides.gap {
        config.gap = gap;
    }

    if let Some(top_margin) = overrides.top_margin {
        config.top_margin = top_margin;
    }

    if let Some(offset) = overrides.offset {
        config.offset = offset;
    }

    if let Some(pretty) = overrides.pretty {
        config.pretty = pretty;
    }

    config
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;
