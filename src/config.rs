//! Engine configuration.
//!
//! Precedence: explicit path > `NEXUS_QUERY_CONFIG` > `./nexus-query.toml` > defaults,
//! followed by environment overrides for individual knobs.

use crate::errors::DbError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "nexus-query.toml";

/// How `$regex` patterns are anchored when matched against strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegexAnchor {
    /// Search anywhere in the string; `^`/`$` anchor explicitly.
    #[default]
    Unanchored,
    /// Patterns implicitly match from the start of the string.
    Start,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Maximum members accepted by `$in`/`$nin`.
    pub max_in_set: usize,
    /// Compiled-size limit handed to the regex engine.
    pub regex_size_limit: usize,
    pub regex_case_insensitive: bool,
    pub regex_anchor: RegexAnchor,
    pub max_pipeline_stages: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_in_set: 1000,
            regex_size_limit: 1 << 20,
            regex_case_insensitive: false,
            regex_anchor: RegexAnchor::Unanchored,
            max_pipeline_stages: 64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub slow_query_ms: u64,
    pub enable_audit: bool,
    /// When set, query and audit lines are appended to this file as JSON.
    pub query_log_path: Option<PathBuf>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self { slow_query_ms: 500, enable_audit: false, query_log_path: None }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Install the rolling-file logger when the engine is created.
    pub enabled: bool,
    pub dir: Option<PathBuf>,
    /// error|warn|info|debug|trace
    pub level: Option<String>,
    pub retention: Option<usize>,
    pub dev6: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub query: QueryConfig,
    pub telemetry: TelemetryConfig,
    pub logging: LogConfig,
}

impl EngineConfig {
    /// # Errors
    /// Returns an error if the text is not valid TOML for this structure or fails validation.
    pub fn from_toml_str(s: &str) -> Result<Self, DbError> {
        let cfg: Self = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, DbError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Resolves the configuration from files and environment.
    ///
    /// # Errors
    /// Returns an error if an explicitly named file (argument or `NEXUS_QUERY_CONFIG`) is unreadable
    /// or invalid, or if an override produces an invalid configuration.
    pub fn load(explicit: Option<&Path>) -> Result<Self, DbError> {
        let mut cfg = if let Some(p) = explicit {
            Self::from_file(p)?
        } else if let Ok(p) = std::env::var("NEXUS_QUERY_CONFIG") {
            Self::from_file(Path::new(&p))?
        } else {
            let local = std::env::current_dir()
                .map(|d| d.join(DEFAULT_CONFIG_FILE))
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));
            if local.exists() { Self::from_file(&local)? } else { Self::default() }
        };
        cfg.apply_env_overrides();
        cfg.validate()?;
        log::debug!("engine configuration resolved: {cfg:?}");
        Ok(cfg)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Some(ms) =
            std::env::var("NEXUS_SLOW_QUERY_MS").ok().and_then(|s| s.parse::<u64>().ok())
        {
            self.telemetry.slow_query_ms = ms;
        }
        if let Some(n) =
            std::env::var("NEXUS_QUERY_MAX_IN_SET").ok().and_then(|s| s.parse::<usize>().ok())
        {
            self.query.max_in_set = n;
        }
    }

    /// # Errors
    /// Returns `Config` when a limit is zero or the log level is unknown.
    pub fn validate(&self) -> Result<(), DbError> {
        if self.query.max_in_set == 0 {
            return Err(DbError::Config("query.max_in_set must be positive".into()));
        }
        if self.query.max_pipeline_stages == 0 {
            return Err(DbError::Config("query.max_pipeline_stages must be positive".into()));
        }
        if let Some(level) = &self.logging.level
            && !matches!(
                level.to_ascii_lowercase().as_str(),
                "error" | "warn" | "info" | "debug" | "trace"
            )
        {
            return Err(DbError::Config(format!("unknown log level '{level}'")));
        }
        Ok(())
    }
}
