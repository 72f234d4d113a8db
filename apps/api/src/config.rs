use std::time::Duration;

use anyhow::{bail, Context, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionBackend {
    Memory,
    Redis,
}

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub backend_graphql_url: String,
    pub backend_api_key: Option<String>,
    pub session_backend: SessionBackend,
    /// Only read when `session_backend` is `Redis`.
    pub redis_url: Option<String>,
    pub session_ttl_secs: u64,
    pub llm_timeout: Duration,
    pub submission_timeout: Duration,
    pub request_timeout: Duration,
    pub default_currency: String,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let require = |key: &str| -> Result<String> {
            get(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("Required environment variable '{key}' is not set"))
        };
        let secs = |key: &str, default: u64| -> Result<Duration> {
            let value = get(key).unwrap_or_else(|| default.to_string());
            let secs = value
                .parse::<u64>()
                .with_context(|| format!("{key} must be a whole number of seconds"))?;
            Ok(Duration::from_secs(secs))
        };

        let session_backend = match get("SESSION_STORE")
            .unwrap_or_else(|| "memory".to_string())
            .to_lowercase()
            .as_str()
        {
            "memory" => SessionBackend::Memory,
            "redis" => SessionBackend::Redis,
            other => bail!("SESSION_STORE must be 'memory' or 'redis', got '{other}'"),
        };
        let redis_url = match session_backend {
            SessionBackend::Redis => Some(require("REDIS_URL")?),
            SessionBackend::Memory => None,
        };

        let default_currency = get("DEFAULT_CURRENCY")
            .unwrap_or_else(|| "JOD".to_string())
            .trim()
            .to_uppercase();
        if default_currency.len() != 3 || !default_currency.chars().all(|c| c.is_ascii_alphabetic()) {
            bail!("DEFAULT_CURRENCY must be a 3-letter code, got '{default_currency}'");
        }

        Ok(Config {
            anthropic_api_key: require("ANTHROPIC_API_KEY")?,
            backend_graphql_url: require("BACKEND_GRAPHQL_URL")?,
            backend_api_key: get("BACKEND_API_KEY").filter(|v| !v.trim().is_empty()),
            session_backend,
            redis_url,
            session_ttl_secs: secs("SESSION_TTL_SECS", 86_400)?.as_secs(),
            llm_timeout: secs("LLM_TIMEOUT_SECS", 20)?,
            submission_timeout: secs("SUBMISSION_TIMEOUT_SECS", 20)?,
            request_timeout: secs("REQUEST_TIMEOUT_SECS", 60)?,
            default_currency,
            port: get("PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: get("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    const REQUIRED: &[(&str, &str)] = &[
        ("ANTHROPIC_API_KEY", "sk-test"),
        ("BACKEND_GRAPHQL_URL", "http://localhost:4005/graphql"),
    ];

    #[test]
    fn test_defaults() {
        let config = config_from(REQUIRED).unwrap();
        assert_eq!(config.session_backend, SessionBackend::Memory);
        assert!(config.redis_url.is_none());
        assert_eq!(config.session_ttl_secs, 86_400);
        assert_eq!(config.llm_timeout, Duration::from_secs(20));
        assert_eq!(config.request_timeout, Duration::from_secs(60));
        assert_eq!(config.default_currency, "JOD");
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_missing_required_variable() {
        let err = config_from(&[("ANTHROPIC_API_KEY", "sk-test")]).unwrap_err();
        assert!(err.to_string().contains("BACKEND_GRAPHQL_URL"));
    }

    #[test]
    fn test_redis_backend_requires_url() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("SESSION_STORE", "redis"));
        assert!(config_from(&pairs).unwrap_err().to_string().contains("REDIS_URL"));

        pairs.push(("REDIS_URL", "redis://localhost:6379"));
        let config = config_from(&pairs).unwrap();
        assert_eq!(config.session_backend, SessionBackend::Redis);
    }

    #[test]
    fn test_invalid_currency_and_timeout() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("DEFAULT_CURRENCY", "dollars"));
        assert!(config_from(&pairs).is_err());

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("LLM_TIMEOUT_SECS", "soon"));
        assert!(config_from(&pairs).is_err());

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("DEFAULT_CURRENCY", "usd"));
        assert_eq!(config_from(&pairs).unwrap().default_currency, "USD");
    }
}
