use crate::core::kernel::signer::{Ed25519Signer, HmacSigner, Signer};
use secrecy::{ExposeSecret, Secret};
use serde::{Serialize, Serializer};
use std::env;
use std::fmt;
use std::sync::Arc;

/// Production WebSocket API endpoint
pub const WS_API_URL: &str = "wss://ws-api.binance.com:443/ws-api/v3";
/// Spot testnet WebSocket API endpoint
pub const TESTNET_WS_API_URL: &str = "wss://testnet.binance.vision/ws-api/v3";

/// Client configuration, fixed at construction
#[derive(Clone)]
pub struct ClientConfig {
    api_key: Secret<String>,
    signer: Option<Arc<dyn Signer>>,
    base_url: String,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"[REDACTED]")
            .field("signer", &self.signer.as_ref().map(|_| "[SIGNER]"))
            .field("base_url", &self.base_url)
            .finish()
    }
}

// Custom Serialize implementation - never expose secrets in serialization
impl Serialize for ClientConfig {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("ClientConfig", 3)?;
        state.serialize_field("api_key", "[REDACTED]")?;
        state.serialize_field("has_signer", &self.signer.is_some())?;
        state.serialize_field("base_url", &self.base_url)?;
        state.end()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::read_only()
    }
}

impl ClientConfig {
    /// Full configuration: credentials plus an explicit endpoint
    pub fn new(api_key: String, signer: Option<Arc<dyn Signer>>, base_url: String) -> Self {
        Self {
            api_key: Secret::new(api_key),
            signer,
            base_url,
        }
    }

    /// No credentials, default endpoint. Enough for public market data.
    #[must_use]
    pub fn read_only() -> Self {
        Self::new(String::new(), None, WS_API_URL.to_string())
    }

    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `{PREFIX}_API_KEY`
    /// - `{PREFIX}_ED25519_KEY` (optional, PEM or base64 raw key; preferred over HMAC)
    /// - `{PREFIX}_SECRET_KEY` (optional, HMAC secret)
    /// - `{PREFIX}_TESTNET` (optional, defaults to false)
    /// - `{PREFIX}_WS_API_URL` (optional, overrides the endpoint)
    pub fn from_env(prefix: &str) -> Result<Self, ConfigError> {
        let prefix = prefix.to_uppercase();
        let api_key_var = format!("{}_API_KEY", prefix);

        let api_key = env::var(&api_key_var)
            .map_err(|_| ConfigError::MissingEnvironmentVariable(api_key_var))?;

        let signer: Option<Arc<dyn Signer>> =
            if let Ok(key) = env::var(format!("{}_ED25519_KEY", prefix)) {
                let signer = if key.contains("BEGIN") {
                    Ed25519Signer::from_pem(&key)
                } else {
                    Ed25519Signer::new(&key)
                }
                .map_err(|e| ConfigError::InvalidConfiguration(e.to_string()))?;
                Some(Arc::new(signer))
            } else if let Ok(secret) = env::var(format!("{}_SECRET_KEY", prefix)) {
                Some(Arc::new(HmacSigner::new(secret)))
            } else {
                None
            };

        let testnet = env::var(format!("{}_TESTNET", prefix))
            .unwrap_or_else(|_| "false".to_string())
            .parse::<bool>()
            .unwrap_or(false);

        let base_url = env::var(format!("{}_WS_API_URL", prefix)).unwrap_or_else(|_| {
            if testnet {
                TESTNET_WS_API_URL.to_string()
            } else {
                WS_API_URL.to_string()
            }
        });

        Ok(Self::new(api_key, signer, base_url))
    }

    /// Load a .env file (if present) and then read the environment
    ///
    /// **Security Warning**: Never commit .env files to version control!
    #[cfg(feature = "env-file")]
    pub fn from_env_file(prefix: &str, env_file_path: &str) -> Result<Self, ConfigError> {
        match dotenv::from_path(env_file_path) {
            Ok(()) => {}
            Err(dotenv::Error::Io(io_err)) if io_err.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(ConfigError::InvalidConfiguration(format!(
                    "Failed to load .env file '{}': {}",
                    env_file_path, e
                )));
            }
        }

        Self::from_env(prefix)
    }

    /// Get API key (use carefully - exposes secret)
    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }

    pub fn signer(&self) -> Option<&Arc<dyn Signer>> {
        self.signer.as_ref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.expose_secret().is_empty()
    }

    /// Whether signed (trade/account) requests can be made
    pub fn can_sign(&self) -> bool {
        self.has_api_key() && self.signer.is_some()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvironmentVariable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_only_defaults() {
        let config = ClientConfig::read_only();
        assert_eq!(config.api_key(), "");
        assert!(config.signer().is_none());
        assert_eq!(config.base_url(), WS_API_URL);
        assert!(!config.can_sign());
    }

    #[test]
    fn test_debug_and_serialize_redact_api_key() {
        let config = ClientConfig::new(
            "super-secret-key".to_string(),
            Some(Arc::new(HmacSigner::new("secret".to_string()))),
            TESTNET_WS_API_URL.to_string(),
        );

        let debug = format!("{:?}", config);
        assert!(!debug.contains("super-secret-key"));

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["api_key"], "[REDACTED]");
        assert_eq!(json["has_signer"], true);
        assert_eq!(json["base_url"], TESTNET_WS_API_URL);
        assert!(config.can_sign());
    }

    #[test]
    fn test_from_env() {
        env::set_var("WSAPI_CFG_TEST_API_KEY", "key");
        env::set_var("WSAPI_CFG_TEST_SECRET_KEY", "secret");
        env::set_var("WSAPI_CFG_TEST_TESTNET", "true");

        let config = ClientConfig::from_env("wsapi_cfg_test").unwrap();
        assert_eq!(config.api_key(), "key");
        assert!(config.can_sign());
        assert_eq!(config.base_url(), TESTNET_WS_API_URL);
    }

    #[test]
    fn test_from_env_missing_key() {
        let result = ClientConfig::from_env("WSAPI_CFG_ABSENT");
        assert!(matches!(
            result,
            Err(ConfigError::MissingEnvironmentVariable(var)) if var == "WSAPI_CFG_ABSENT_API_KEY"
        ));
    }

    #[test]
    fn test_from_env_rejects_bad_ed25519_key() {
        env::set_var("WSAPI_CFG_BAD_API_KEY", "key");
        env::set_var("WSAPI_CFG_BAD_ED25519_KEY", "!!!");
        assert!(matches!(
            ClientConfig::from_env("WSAPI_CFG_BAD"),
            Err(ConfigError::InvalidConfiguration(_))
        ));
    }
}
