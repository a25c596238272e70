//! Structured logging built on `tracing`.
//!
//! Level, format and destination come from the config file with
//! `PULSE_LOG*` environment variables taking precedence, so a host can
//! crank up verbosity on a single deployment without editing config.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error, off
    #[serde(default = "default_level")]
    pub level: String,

    /// Output format: text or json
    #[serde(default = "default_format")]
    pub format: String,

    /// Output destination: stdout or file
    #[serde(default = "default_output")]
    pub output: String,

    /// Log file path, used when output is "file"
    #[serde(default = "default_file")]
    pub file: PathBuf,

    /// Colored output (text format on stdout only)
    #[serde(default = "default_true")]
    pub color: bool,

    /// Per-module level overrides, e.g. `pulse_lifecycle::machine = "trace"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

fn default_output() -> String {
    "stdout".to_string()
}

fn default_file() -> PathBuf {
    PathBuf::from("pulse-lifecycle.log")
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: default_format(),
            output: default_output(),
            file: default_file(),
            color: default_true(),
            modules: HashMap::new(),
        }
    }
}

/// Install the global subscriber.
///
/// Precedence, highest first: `PULSE_LOG` / `PULSE_LOG_FORMAT` /
/// `PULSE_LOG_OUTPUT` environment variables, then `config`, then defaults.
pub fn init_logging(config: Option<&LoggingConfig>) -> Result<(), ConfigError> {
    let filter = build_env_filter(config)?;
    let format = resolve_format(config)?;
    let to_file = resolve_output(config)?;
    let use_color = config.map(|c| c.color).unwrap_or(true);

    let base = Registry::default().with(filter);

    let open_log_file = || -> Result<std::fs::File, ConfigError> {
        let path = config.map(|c| c.file.clone()).unwrap_or_else(default_file);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| ConfigError::Io { path, source })
    };

    match (format.as_str(), to_file) {
        ("json", true) => base
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_writer(open_log_file()?),
            )
            .init(),
        ("json", false) => base
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_writer(std::io::stdout),
            )
            .init(),
        (_, true) => base
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(false)
                    .with_writer(open_log_file()?),
            )
            .init(),
        (_, false) => base
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(use_color)
                    .with_writer(std::io::stdout),
            )
            .init(),
    }

    Ok(())
}

fn build_env_filter(config: Option<&LoggingConfig>) -> Result<EnvFilter, ConfigError> {
    if let Ok(filter) = EnvFilter::try_from_env("PULSE_LOG") {
        return Ok(filter);
    }

    let level = config.map(|c| c.level.as_str()).unwrap_or("info");
    let mut filter = EnvFilter::new(level);

    if let Some(config) = config {
        for (module, module_level) in &config.modules {
            let directive = format!("{module}={module_level}");
            filter = filter.add_directive(
                directive
                    .parse()
                    .map_err(|e| ConfigError::InvalidLogDirective(format!("{directive}: {e}")))?,
            );
        }
    }

    Ok(filter)
}

fn resolve_format(config: Option<&LoggingConfig>) -> Result<String, ConfigError> {
    let format = match std::env::var("PULSE_LOG_FORMAT") {
        Ok(value) => value,
        Err(_) => config
            .map(|c| c.format.clone())
            .unwrap_or_else(default_format),
    };
    match format.as_str() {
        "text" | "json" => Ok(format),
        other => Err(ConfigError::InvalidValue {
            key: "logging.format".to_string(),
            detail: format!("{other} (must be 'text' or 'json')"),
        }),
    }
}

fn resolve_output(config: Option<&LoggingConfig>) -> Result<bool, ConfigError> {
    let output = match std::env::var("PULSE_LOG_OUTPUT") {
        Ok(value) => value,
        Err(_) => config
            .map(|c| c.output.clone())
            .unwrap_or_else(default_output),
    };
    match output.as_str() {
        "stdout" => Ok(false),
        "file" => Ok(true),
        other => Err(ConfigError::InvalidValue {
            key: "logging.output".to_string(),
            detail: format!("{other} (must be 'stdout' or 'file')"),
        }),
    }
}
