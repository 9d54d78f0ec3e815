//! Layered configuration loading: defaults, an optional TOML file, then
//! `PLACEMENT_`-prefixed environment variables, in that order of
//! increasing precedence.

use std::path::Path;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use placement_application::MatcherConfig;

/// Configuration load/validation failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `figment` failed to merge or deserialize a configuration source.
    #[error("failed to load configuration: {0}")]
    Load(#[from] figment::Error),
    /// A loaded value fails validation (currently: `default_candidate_limit == 0`).
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Log output format, mirrored from [`crate::logging::LogFormat`] so this
/// crate's config module doesn't need `placement-infrastructure`'s own
/// `logging` module to depend back on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable, for local development.
    #[default]
    Text,
    /// Newline-delimited JSON, for log aggregation.
    Json,
}

impl From<LogFormat> for crate::logging::LogFormat {
    fn from(value: LogFormat) -> Self {
        match value {
            LogFormat::Text => crate::logging::LogFormat::Text,
            LogFormat::Json => crate::logging::LogFormat::Json,
        }
    }
}

/// The engine's full configuration surface: matcher behavior plus the
/// ambient concerns (logging) the matcher itself doesn't know about.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct EngineConfig {
    /// See [`MatcherConfig::randomize_allocation_candidates`].
    pub randomize_allocation_candidates: bool,
    /// See [`MatcherConfig::default_candidate_limit`].
    pub default_candidate_limit: Option<usize>,
    /// Output format for the process-wide tracing subscriber.
    pub log_format: LogFormat,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            randomize_allocation_candidates: false,
            default_candidate_limit: None,
            log_format: LogFormat::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration: defaults, then `path` if it exists, then
    /// `PLACEMENT_`-prefixed environment variables (e.g.
    /// `PLACEMENT_RANDOMIZE_ALLOCATION_CANDIDATES=true`).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] if the file exists but fails to
    /// parse, or [`ConfigError::Invalid`] if the merged configuration
    /// fails validation.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));
        let path = path.as_ref();
        if path.exists() {
            figment = figment.merge(Toml::file(path));
        }
        let config: Self = figment
            .merge(Env::prefixed("PLACEMENT_"))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from defaults and environment only, skipping
    /// any file lookup. Used by tests and by callers that manage their
    /// own file discovery.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the merged configuration
    /// fails validation.
    pub fn load_from_env() -> Result<Self, ConfigError> {
        let config: Self = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Env::prefixed("PLACEMENT_"))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.default_candidate_limit == Some(0) {
            return Err(ConfigError::Invalid(
                "default_candidate_limit must be at least 1 when set".to_owned(),
            ));
        }
        Ok(())
    }
}

impl From<EngineConfig> for MatcherConfig {
    fn from(config: EngineConfig) -> Self {
        Self {
            randomize_allocation_candidates: config.randomize_allocation_candidates,
            default_candidate_limit: config.default_candidate_limit,
        }
    }
}
