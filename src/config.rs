use std::time::Duration;

use config::builder::DefaultState;
use config::{Config as ConfigLoader, ConfigBuilder, ConfigError, Environment, Source};
use serde::Deserialize;
use url::Url;

use crate::error::Result;
use crate::utils::time::TimeUnit;

pub const DEFAULT_API_URL: &str = "https://ismp.crpt.ru/api/v3/lk/documents/create";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    // General
    pub log_level: String,
    pub log_json: bool,

    // Remote API
    pub api_url: String,
    pub token: String,
    pub signature: Option<String>,

    // Throttling: at most `request_limit` requests per one `time_unit`
    pub request_limit: usize,
    pub time_unit: TimeUnit,

    // HTTP
    pub request_timeout_ms: u64,
    pub https_only: bool,
}

impl Config {
    /// Load from `.env` and `CRPT_*` environment variables on top of the defaults.
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        Self::from_source(Environment::with_prefix("CRPT").try_parsing(true))
    }

    /// Layer a single source over the defaults and validate the result.
    pub fn from_source<S>(source: S) -> Result<Self>
    where
        S: Source + Send + Sync + 'static,
    {
        let config: Config = Self::defaults()?
            .add_source(source)
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn defaults() -> std::result::Result<ConfigBuilder<DefaultState>, ConfigError> {
        ConfigLoader::builder()
            .set_default("log_level", "info")?
            .set_default("log_json", false)?
            .set_default("api_url", DEFAULT_API_URL)?
            .set_default("request_limit", 10)?
            .set_default("time_unit", "minutes")?
            .set_default("request_timeout_ms", 10_000)?
            .set_default("https_only", true)
    }

    fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.token.trim().is_empty() {
            return Err(ConfigError::Message("token must not be empty".into()));
        }
        if self.request_limit == 0 {
            return Err(ConfigError::Message("request_limit must be at least 1".into()));
        }
        let url = Url::parse(&self.api_url)
            .map_err(|e| ConfigError::Message(format!("invalid api_url {}: {}", self.api_url, e)))?;
        if self.https_only && url.scheme() != "https" {
            return Err(ConfigError::Message(format!(
                "api_url {} is not https but https_only is set",
                self.api_url
            )));
        }
        Ok(())
    }

    /// Window after which the gate snaps back to `request_limit` slots.
    pub fn refill_interval(&self) -> Duration {
        self.time_unit.duration()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use config::{File, FileFormat};

    fn from_toml(toml: &str) -> Result<Config> {
        Config::from_source(File::from_str(toml, FileFormat::Toml))
    }

    #[test]
    fn test_defaults_applied() {
        let config = from_toml(r#"token = "  secret  ""#).unwrap();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.request_limit, 10);
        assert_eq!(config.time_unit, TimeUnit::Minutes);
        assert_eq!(config.refill_interval(), Duration::from_secs(60));
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert!(config.https_only);
        assert!(config.signature.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = from_toml(
            r#"
            token = "secret"
            signature = "sig"
            request_limit = 3
            time_unit = "seconds"
            api_url = "http://127.0.0.1:8080/create"
            https_only = false
            "#,
        )
        .unwrap();
        assert_eq!(config.request_limit, 3);
        assert_eq!(config.refill_interval(), Duration::from_secs(1));
        assert_eq!(config.signature.as_deref(), Some("sig"));
    }

    #[test]
    fn test_validation_errors() {
        assert!(matches!(from_toml(r#"token = " ""#), Err(AppError::Config(_))));
        assert!(matches!(
            from_toml("token = \"t\"\nrequest_limit = 0"),
            Err(AppError::Config(_))
        ));
        assert!(matches!(
            from_toml("token = \"t\"\napi_url = \"not a url\""),
            Err(AppError::Config(_))
        ));
        assert!(matches!(
            from_toml("token = \"t\"\napi_url = \"http://example.com\""),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_missing_token() {
        assert!(matches!(from_toml(""), Err(AppError::Config(_))));
    }
}
