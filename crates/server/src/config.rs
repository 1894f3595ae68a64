use std::net::{IpAddr, SocketAddr};

use secrecy::SecretString;
use services::services::gemini_api::DEFAULT_MODEL;
use thiserror::Error;

const DEFAULT_DATABASE_URL: &str = "sqlite://affirmations.db";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 5000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: SecretString,
    pub gemini_model: String,
    pub gemini_base_url: Option<String>,
    pub database_url: String,
    pub host: IpAddr,
    pub port: u16,
    pub auth_url: String,
    pub auth_service_key: SecretString,
    pub auth_jwt_secret: SecretString,
    pub cors_origin: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let required = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let host = get("HOST")
            .unwrap_or_else(|| DEFAULT_HOST.to_string())
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::Invalid {
                name: "HOST",
                reason: e.to_string(),
            })?;

        let port_var = get("BACKEND_PORT")
            .map(|v| ("BACKEND_PORT", v))
            .or_else(|| get("PORT").map(|v| ("PORT", v)));
        let port = match port_var {
            Some((name, raw)) => raw.trim().parse::<u16>().map_err(|e| ConfigError::Invalid {
                name,
                reason: e.to_string(),
            })?,
            None => DEFAULT_PORT,
        };

        let auth_url = required("AUTH_URL")?;
        if url::Url::parse(&auth_url).is_err() {
            return Err(ConfigError::Invalid {
                name: "AUTH_URL",
                reason: format!("'{auth_url}' is not a URL"),
            });
        }

        Ok(Self {
            gemini_api_key: SecretString::from(required("GEMINI_API_KEY")?),
            gemini_model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            gemini_base_url: get("GEMINI_BASE_URL"),
            database_url: get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            host,
            port,
            auth_url,
            auth_service_key: SecretString::from(required("AUTH_SERVICE_KEY")?),
            auth_jwt_secret: SecretString::from(required("AUTH_JWT_SECRET")?),
            cors_origin: get("CORS_ORIGIN"),
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    const REQUIRED: &[(&str, &str)] = &[
        ("GEMINI_API_KEY", "gm-key"),
        ("AUTH_URL", "https://auth.example.com"),
        ("AUTH_SERVICE_KEY", "service-key"),
        ("AUTH_JWT_SECRET", "jwt-secret"),
    ];

    #[test]
    fn defaults_apply_when_optional_vars_unset() {
        let config = Config::from_lookup(vars(REQUIRED)).unwrap();
        assert_eq!(config.gemini_api_key.expose_secret(), "gm-key");
        assert_eq!(config.gemini_model, DEFAULT_MODEL);
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:5000");
        assert!(config.cors_origin.is_none());
        assert!(config.gemini_base_url.is_none());
    }

    #[test]
    fn missing_api_key_fails_startup() {
        let without_key: Vec<_> = REQUIRED
            .iter()
            .copied()
            .filter(|(k, _)| *k != "GEMINI_API_KEY")
            .collect();
        assert!(matches!(
            Config::from_lookup(vars(&without_key)),
            Err(ConfigError::Missing("GEMINI_API_KEY"))
        ));

        let mut blank_key = without_key.clone();
        blank_key.push(("GEMINI_API_KEY", "   "));
        assert!(matches!(
            Config::from_lookup(vars(&blank_key)),
            Err(ConfigError::Missing("GEMINI_API_KEY"))
        ));
    }

    #[test]
    fn backend_port_wins_over_port() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("PORT", "8080"));
        assert_eq!(Config::from_lookup(vars(&pairs)).unwrap().port, 8080);

        pairs.push(("BACKEND_PORT", "9090"));
        assert_eq!(Config::from_lookup(vars(&pairs)).unwrap().port, 9090);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("PORT", "not-a-port"));
        assert!(matches!(
            Config::from_lookup(vars(&pairs)),
            Err(ConfigError::Invalid { name: "PORT", .. })
        ));

        let mut pairs: Vec<_> = REQUIRED
            .iter()
            .copied()
            .filter(|(k, _)| *k != "AUTH_URL")
            .collect();
        pairs.push(("AUTH_URL", "auth.example.com"));
        assert!(matches!(
            Config::from_lookup(vars(&pairs)),
            Err(ConfigError::Invalid { name: "AUTH_URL", .. })
        ));
    }
}
