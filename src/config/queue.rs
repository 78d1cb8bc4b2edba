//! Queue configuration and loaders.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fallback tier count when the configured one is not positive.
pub const DEFAULT_TOTAL_TIERS: i64 = 1;
/// Fallback time index fan-out.
pub const DEFAULT_INDEX_FANOUT: usize = 16;
/// Fallback starvation time weight.
pub const DEFAULT_STARVATION_TIME_WEIGHT: f64 = 1.0;
/// Default global max-wait cap in seconds.
pub const DEFAULT_MAX_WAIT_SECONDS: u64 = 600;
/// Upper bound on tiers; one bucket is allocated per tier.
pub const MAX_TOTAL_TIERS: i64 = 65_536;

/// Prefix of the environment variables read by [`QueueConfig::from_env`].
pub const ENV_PREFIX: &str = "AD_QUEUE_";

/// Errors produced while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// JSON could not be parsed.
    #[error("parse error: {0}")]
    Json(#[from] serde_json::Error),
    /// YAML could not be parsed.
    #[error("parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// Config file could not be read.
    #[error("cannot read config `{path}`: {source}")]
    Io {
        /// File that failed.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },
    /// Environment variable held an unparsable value.
    #[error("environment variable `{var}` has invalid value `{value}`")]
    Env {
        /// Variable name.
        var: String,
        /// Offending value.
        value: String,
    },
    /// Values parsed but are not acceptable.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Queue engine configuration.
///
/// Field names accept both the current names and the keys used by earlier deployments
/// (`totalPriority`, `maximumWaitSeconds`, `timeBoost`, `btreeDegree`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueueConfig {
    /// Number of tiers. Non-positive values fall back to 1.
    #[serde(alias = "totalPriority")]
    pub total_tiers: i64,
    /// Whether starved ads may preempt higher tiers.
    pub enable_anti_starvation: bool,
    /// Global cap on per-ad max wait. Zero is accepted: every ad is starved on admission
    /// and the starvation score divides by 1 instead of 0.
    #[serde(alias = "maximumWaitSeconds")]
    pub max_wait_seconds: u64,
    /// Multiplier on the wait term of the starvation score. Non-positive values fall back to 1.
    #[serde(alias = "timeBoost")]
    pub starvation_time_weight: f64,
    /// Time index fan-out hint. Zero falls back to 16.
    #[serde(alias = "btreeDegree")]
    pub index_fanout: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            total_tiers: DEFAULT_TOTAL_TIERS,
            enable_anti_starvation: true,
            max_wait_seconds: DEFAULT_MAX_WAIT_SECONDS,
            starvation_time_weight: DEFAULT_STARVATION_TIME_WEIGHT,
            index_fanout: DEFAULT_INDEX_FANOUT,
        }
    }
}

impl QueueConfig {
    /// Default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of tiers.
    #[must_use]
    pub const fn with_total_tiers(mut self, total_tiers: i64) -> Self {
        self.total_tiers = total_tiers;
        self
    }

    /// Enable or disable anti-starvation.
    #[must_use]
    pub const fn with_anti_starvation(mut self, enabled: bool) -> Self {
        self.enable_anti_starvation = enabled;
        self
    }

    /// Set the global max-wait cap.
    #[must_use]
    pub const fn with_max_wait_seconds(mut self, seconds: u64) -> Self {
        self.max_wait_seconds = seconds;
        self
    }

    /// Set the starvation time weight.
    #[must_use]
    pub const fn with_starvation_time_weight(mut self, weight: f64) -> Self {
        self.starvation_time_weight = weight;
        self
    }

    /// Set the time index fan-out hint.
    #[must_use]
    pub const fn with_index_fanout(mut self, fanout: usize) -> Self {
        self.index_fanout = fanout;
        self
    }

    /// Copy with defaults substituted for out-of-range values.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let mut cfg = self.clone();
        if cfg.total_tiers <= 0 {
            cfg.total_tiers = DEFAULT_TOTAL_TIERS;
        }
        cfg.total_tiers = cfg.total_tiers.min(MAX_TOTAL_TIERS);
        if !(cfg.starvation_time_weight.is_finite() && cfg.starvation_time_weight > 0.0) {
            cfg.starvation_time_weight = DEFAULT_STARVATION_TIME_WEIGHT;
        }
        if cfg.index_fanout == 0 {
            cfg.index_fanout = DEFAULT_INDEX_FANOUT;
        }
        cfg
    }

    /// Validate configuration values that cannot be defaulted.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.total_tiers > MAX_TOTAL_TIERS {
            return Err(ConfigError::Invalid(format!(
                "totalTiers must be at most {MAX_TOTAL_TIERS}, got {}",
                self.total_tiers
            )));
        }
        if self.starvation_time_weight.is_nan() || self.starvation_time_weight.is_infinite() {
            return Err(ConfigError::Invalid(
                "starvationTimeWeight must be finite".into(),
            ));
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(input)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse configuration from a YAML string and validate.
    pub fn from_yaml_str(input: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_yaml::from_str(input)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from a file; `.json` is parsed as JSON, anything else as YAML.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&input)
        } else {
            Self::from_yaml_str(&input)
        }
    }

    /// Build from `AD_QUEUE_*` environment variables, loading `.env` first if present.
    ///
    /// Recognized variables: `AD_QUEUE_TOTAL_TIERS`, `AD_QUEUE_ENABLE_ANTI_STARVATION`,
    /// `AD_QUEUE_MAX_WAIT_SECONDS`, `AD_QUEUE_STARVATION_TIME_WEIGHT`,
    /// `AD_QUEUE_INDEX_FANOUT`. Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable lookup, using the same names as
    /// [`from_env`](Self::from_env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parse<T: std::str::FromStr>(
            lookup: &impl Fn(&str) -> Option<String>,
            name: &str,
        ) -> Result<Option<T>, ConfigError> {
            let var = format!("{ENV_PREFIX}{name}");
            match lookup(&var) {
                None => Ok(None),
                Some(value) => value
                    .trim()
                    .parse()
                    .map(Some)
                    .map_err(|_| ConfigError::Env { var, value }),
            }
        }

        let mut cfg = Self::default();
        if let Some(v) = parse(&lookup, "TOTAL_TIERS")? {
            cfg.total_tiers = v;
        }
        if let Some(v) = parse(&lookup, "ENABLE_ANTI_STARVATION")? {
            cfg.enable_anti_starvation = v;
        }
        if let Some(v) = parse(&lookup, "MAX_WAIT_SECONDS")? {
            cfg.max_wait_seconds = v;
        }
        if let Some(v) = parse(&lookup, "STARVATION_TIME_WEIGHT")? {
            cfg.starvation_time_weight = v;
        }
        if let Some(v) = parse(&lookup, "INDEX_FANOUT")? {
            cfg.index_fanout = v;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}
