//! Service configuration.
//!
//! Sources, later overriding earlier:
//! 1. built-in defaults
//! 2. `config/default.toml` (optional)
//! 3. the file named by `BABELCACHE_CONFIG` (optional)
//! 4. environment variables, e.g. `BABELCACHE__DETECTION__CONFIDENCE_THRESHOLD=0.9`
//!
//! The API key falls back to `GOOGLE_API_KEY` when not set anywhere else.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::translate::retry::RetryPolicy;

pub const DEFAULT_API_URL: &str = "https://translation.googleapis.com/language/translate/v2";

/// Upper bound for any cache TTL: one year.
pub const MAX_TTL_SECS: u64 = 365 * 24 * 3600;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub translation: TranslationSettings,
    pub detection: DetectionSettings,
    pub retry: RetrySettings,
    pub stats: StatsSettings,
}

/// Size/expiry/sweep settings for one cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSettings {
    pub max_size: usize,
    pub ttl_secs: u64,
    pub sweep_interval_secs: u64,
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationSettings {
    pub api_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub request_timeout_secs: u64,
    pub default_target_language: String,
    pub supported_languages: Vec<String>,
    pub cache: CacheSettings,
}

impl Default for TranslationSettings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: None,
            request_timeout_secs: 30,
            default_target_language: "ja".to_string(),
            supported_languages: [
                "en", "ja", "es", "fr", "de", "zh", "ko", "ru", "it", "pt", "ar", "hi", "th", "vi",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            cache: CacheSettings {
                max_size: 1000,
                ttl_secs: 24 * 3600,
                sweep_interval_secs: 30 * 60,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionSettings {
    pub confidence_threshold: f64,
    pub cache: CacheSettings,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.8,
            cache: CacheSettings {
                max_size: 2000,
                ttl_secs: 7 * 24 * 3600,
                sweep_interval_secs: 3600,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    /// Treat HTTP 429 as transient.
    pub retry_rate_limited: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 500,
            retry_rate_limited: true,
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, Duration::from_millis(self.base_delay_ms))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsSettings {
    /// Latency samples kept per operation.
    pub history_limit: usize,
    pub log_interval_secs: u64,
}

impl Default for StatsSettings {
    fn default() -> Self {
        Self {
            history_limit: crate::metrics::DEFAULT_HISTORY_LIMIT,
            log_interval_secs: 3600,
        }
    }
}

impl StatsSettings {
    pub fn log_interval(&self) -> Duration {
        Duration::from_secs(self.log_interval_secs)
    }
}

/// Configured limits, without credentials or endpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LimitsReport {
    pub translation_cache: CacheSettings,
    pub detection_cache: CacheSettings,
    pub confidence_threshold: f64,
    pub retry: RetrySettings,
    pub stats: StatsSettings,
    pub default_target_language: String,
    pub supported_languages: Vec<String>,
}

impl Settings {
    pub fn limits(&self) -> LimitsReport {
        LimitsReport {
            translation_cache: self.translation.cache,
            detection_cache: self.detection.cache,
            confidence_threshold: self.detection.confidence_threshold,
            retry: self.retry.clone(),
            stats: self.stats.clone(),
            default_target_language: self.translation.default_target_language.clone(),
            supported_languages: self.translation.supported_languages.clone(),
        }
    }

    /// Load from defaults, config files and the environment, then validate.
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&Settings::default())?)
            .add_source(config::File::with_name("config/default").required(false));

        if let Ok(path) = std::env::var("BABELCACHE_CONFIG") {
            builder = builder.add_source(config::File::with_name(&path));
        }

        let settings: Settings = builder
            .add_source(
                config::Environment::with_prefix("BABELCACHE")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("translation.supported_languages")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.finish()
    }

    /// Parse a TOML document layered over the defaults.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let settings: Settings = config::Config::builder()
            .add_source(config::Config::try_from(&Settings::default())?)
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;

        settings.finish()
    }

    fn finish(mut self) -> Result<Self, ConfigError> {
        if self.translation.api_key.is_none() {
            self.translation.api_key = std::env::var("GOOGLE_API_KEY").ok();
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.translation.cache.max_size == 0 || self.detection.cache.max_size == 0 {
            return Err(ConfigError::Invalid("cache max_size must be > 0".into()));
        }
        for (name, cache) in [
            ("translation", &self.translation.cache),
            ("detection", &self.detection.cache),
        ] {
            if cache.ttl_secs > MAX_TTL_SECS {
                return Err(ConfigError::Invalid(format!(
                    "{name} cache ttl_secs must be at most {MAX_TTL_SECS}, got {}",
                    cache.ttl_secs
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.detection.confidence_threshold) {
            return Err(ConfigError::Invalid(format!(
                "confidence_threshold must be within [0, 1], got {}",
                self.detection.confidence_threshold
            )));
        }
        if self.translation.supported_languages.is_empty() {
            return Err(ConfigError::Invalid("supported_languages is empty".into()));
        }
        if !self.is_supported(&self.translation.default_target_language) {
            return Err(ConfigError::Invalid(format!(
                "default target language {} is not in supported_languages",
                self.translation.default_target_language
            )));
        }
        Ok(())
    }

    pub fn is_supported(&self, language: &str) -> bool {
        self.translation
            .supported_languages
            .iter()
            .any(|l| l == language)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.translation.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::default();
        settings.validate().unwrap();
        assert_eq!(settings.translation.default_target_language, "ja");
        assert_eq!(settings.detection.cache.max_size, 2000);
        assert_eq!(settings.detection.cache.ttl(), Duration::from_secs(7 * 24 * 3600));
        assert_eq!(settings.translation.cache.sweep_interval(), Duration::from_secs(1800));
        assert_eq!(
            settings.retry.policy(),
            RetryPolicy::new(2, Duration::from_millis(500))
        );
    }

    #[test]
    fn toml_overrides_layer_over_defaults() {
        let settings = Settings::from_toml_str(
            r#"
            [detection]
            confidence_threshold = 0.9

            [translation.cache]
            max_size = 10

            [retry]
            max_retries = 5
            "#,
        )
        .unwrap();

        assert_eq!(settings.detection.confidence_threshold, 0.9);
        assert_eq!(settings.translation.cache.max_size, 10);
        assert_eq!(settings.translation.cache.ttl_secs, 24 * 3600);
        assert_eq!(settings.retry.max_retries, 5);
        assert_eq!(settings.retry.base_delay_ms, 500);
    }

    #[test]
    fn threshold_out_of_range_is_rejected() {
        let err = Settings::from_toml_str("[detection]\nconfidence_threshold = 1.5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn oversized_ttl_is_rejected() {
        let err = Settings::from_toml_str("[translation.cache]\nttl_secs = 9223372036854775807\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let mut settings = Settings::default();
        settings.detection.cache.ttl_secs = MAX_TTL_SECS;
        settings.validate().unwrap();
        settings.detection.cache.ttl_secs = MAX_TTL_SECS + 1;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn limits_report_omits_credentials() {
        let mut settings = Settings::default();
        settings.translation.api_key = Some("secret".into());

        let json = serde_json::to_value(settings.limits()).unwrap();
        assert_eq!(json["translation_cache"]["max_size"], 1000);
        assert_eq!(json["detection_cache"]["ttl_secs"], 7 * 24 * 3600);
        assert_eq!(json["retry"]["max_retries"], 2);
        assert!(json.get("size").is_none());
        assert!(!json.to_string().contains("secret"));
    }

    #[test]
    fn default_target_must_be_supported() {
        let mut settings = Settings::default();
        settings.translation.default_target_language = "xx".into();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn zero_cache_size_is_rejected() {
        let mut settings = Settings::default();
        settings.detection.cache.max_size = 0;
        assert!(settings.validate().is_err());
    }
}
