//! Runtime settings, read once at startup.
//!
//! Settings come from an optional YAML file; every field has a default so an
//! absent file or a partial one is fine. CLI flags may override the crawl
//! window and the summary limit after loading.
//!
//! ```yaml
//! crawl:
//!   window_days: 7
//!   body_char_limit: 1000
//!   max_pages: 50
//! http:
//!   timeout_secs: 30
//! llm:
//!   model: gpt-5-mini
//!   max_retries: 2
//! ```

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tracing::{info, instrument};

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36";

/// Errors raised while loading [`Settings`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Top-level settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub crawl: CrawlSettings,
    pub http: HttpSettings,
    pub llm: LlmSettings,
}

/// Values every scraper reads.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlSettings {
    /// Recency window in days; the boundary day is included.
    pub window_days: u64,
    /// Maximum summary length in characters before the ellipsis.
    pub body_char_limit: usize,
    /// Upper bound on listing pages for the paginated courts.
    pub max_pages: usize,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            window_days: 7,
            body_char_limit: 1000,
            max_pages: 50,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            user_agent: BROWSER_USER_AGENT.to_string(),
            timeout_secs: 30,
        }
    }
}

/// Chat-completion endpoint settings. The API key is never read from here.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    pub max_retries: usize,
    pub retry_base_delay_ms: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-5-mini".to_string(),
            timeout_secs: 300,
            max_retries: 2,
            retry_base_delay_ms: 1000,
        }
    }
}

impl Settings {
    /// Load settings from `path`, or defaults when no path is given.
    #[instrument(level = "info")]
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            info!("No config file given; using defaults");
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(Path::new(path)).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        let settings = Self::from_yaml(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })?;
        info!(
            window_days = settings.crawl.window_days,
            body_char_limit = settings.crawl.body_char_limit,
            model = %settings.llm.model,
            "Loaded configuration"
        );
        Ok(settings)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        // An empty document deserializes to unit, not to a mapping.
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.crawl.window_days, 7);
        assert_eq!(settings.crawl.body_char_limit, 1000);
        assert_eq!(settings.llm.model, "gpt-5-mini");
    }

    #[test]
    fn test_partial_yaml_keeps_other_defaults() {
        let yaml = "crawl:\n  window_days: 3\nllm:\n  model: gpt-4o-mini\n";
        let settings = Settings::from_yaml(yaml).unwrap();
        assert_eq!(settings.crawl.window_days, 3);
        assert_eq!(settings.crawl.body_char_limit, 1000);
        assert_eq!(settings.crawl.max_pages, 50);
        assert_eq!(settings.llm.model, "gpt-4o-mini");
        assert_eq!(settings.llm.max_retries, 2);
        assert_eq!(settings.http.timeout_secs, 30);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let settings = Settings::from_yaml("  \n").unwrap();
        assert_eq!(settings.crawl.window_days, 7);
    }

    #[test]
    fn test_invalid_yaml_is_error() {
        assert!(Settings::from_yaml("crawl: [1, 2").is_err());
        assert!(Settings::from_yaml("crawl:\n  window_days: soon\n").is_err());
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = Settings::load(Some("/nonexistent/court_news_watch.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
