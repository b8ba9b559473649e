use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

fn default_chain() -> String {
    "engine".to_string()
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

/// Connection settings for one execution node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineClientConfig {
    /// Authenticated Engine API endpoint, e.g. `http://localhost:8551`.
    pub rpc_url: String,

    /// Chain label attached to logs and metrics.
    #[serde(default = "default_chain")]
    pub chain: String,

    /// Path to the hex encoded JWT secret. Requests are unauthenticated when unset.
    #[serde(default)]
    pub jwt_secret: Option<PathBuf>,

    /// Per-call deadline, capped at [`crate::MAX_REQUEST_TIMEOUT`].
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl EngineClientConfig {
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            chain: default_chain(),
            jwt_secret: None,
            request_timeout_ms: default_request_timeout_ms(),
        }
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::{client::EngineClient, errors::EngineClientError};

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = EngineClientConfig::from_toml(r#"rpc_url = "http://localhost:8551""#)
            .expect("valid config");

        assert_eq!(config, EngineClientConfig::new("http://localhost:8551"));
        assert_eq!(config.chain, "engine");
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_full_config() {
        let raw = r#"
            rpc_url = "http://10.0.0.2:8551"
            chain = "l2-a"
            jwt_secret = "/etc/interop/jwt.hex"
            request_timeout_ms = 2500
        "#;
        let config = EngineClientConfig::from_toml(raw).expect("valid config");

        assert_eq!(config.chain, "l2-a");
        assert_eq!(config.jwt_secret, Some(PathBuf::from("/etc/interop/jwt.hex")));
        assert_eq!(config.request_timeout(), Duration::from_millis(2500));
    }

    #[test]
    fn test_missing_url_is_rejected() {
        let res = EngineClientConfig::from_toml(r#"chain = "l2""#);
        assert!(matches!(res, Err(ConfigError::Toml(_))));
    }

    #[tokio::test]
    async fn test_from_config_loads_secret() {
        let dir = tempfile::tempdir().unwrap();
        let secret = dir.path().join("jwt.hex");
        fs::write(&secret, "0x".to_string() + &"ab".repeat(32)).unwrap();

        let mut config = EngineClientConfig::new("http://127.0.0.1:8551");
        config.chain = "l2-b".to_string();
        config.jwt_secret = Some(secret);
        config.request_timeout_ms = 1_000;

        let client = EngineClient::from_config(&config).expect("client builds");
        assert_eq!(client.chain(), "l2-b");
        assert_eq!(client.options().deadline, Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_from_config_rejects_bad_secret() {
        let dir = tempfile::tempdir().unwrap();
        let secret = dir.path().join("jwt.hex");
        fs::write(&secret, "zz").unwrap();

        let mut config = EngineClientConfig::new("http://127.0.0.1:8551");
        config.jwt_secret = Some(secret);

        let err = EngineClient::from_config(&config).unwrap_err();
        assert!(matches!(
            err,
            EngineClientError::Config(ConfigError::MalformedJwtSecret { .. })
        ));
    }
}
