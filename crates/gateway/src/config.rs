//! Environment configuration.
//!
//! Loaded once at startup. The backend application identifier must be a
//! valid integer or the process refuses to start.

use std::net::SocketAddr;

use {
    anyhow::{Context, Result},
    secrecy::Secret,
};

const DEFAULT_BRIDGE_URL: &str = "http://127.0.0.1:8081";
const DEFAULT_BIND: &str = "0.0.0.0:8000";

#[derive(Clone)]
pub struct GatewayConfig {
    /// Backend application identifier.
    pub app_id: i32,
    /// Backend application secret; never logged.
    pub app_secret: Secret<String>,
    /// Base URL of the messaging bridge daemon.
    pub bridge_url: String,
    /// Default account phone, used by integration tests.
    pub default_phone: Option<String>,
    /// Listen address for the HTTP server.
    pub bind: SocketAddr,
}

impl GatewayConfig {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let app_id_raw = var("TGRELAY_APP_ID").context("TGRELAY_APP_ID is not set")?;
        let app_id: i32 = app_id_raw
            .trim()
            .parse()
            .with_context(|| format!("TGRELAY_APP_ID is not a valid integer: {app_id_raw}"))?;

        let app_secret =
            Secret::new(var("TGRELAY_APP_SECRET").context("TGRELAY_APP_SECRET is not set")?);

        let bridge_url = var("TGRELAY_BRIDGE_URL").unwrap_or_else(|| DEFAULT_BRIDGE_URL.into());
        let default_phone = var("TGRELAY_PHONE");
        let bind = var("TGRELAY_BIND")
            .unwrap_or_else(|| DEFAULT_BIND.into())
            .parse()
            .context("TGRELAY_BIND is not a valid socket address")?;

        Ok(Self {
            app_id,
            app_secret,
            bridge_url,
            default_phone,
            bind,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn minimal_environment_parses() {
        let env = vars(&[("TGRELAY_APP_ID", "12345"), ("TGRELAY_APP_SECRET", "hash")]);
        let config = GatewayConfig::from_vars(|k| env.get(k).cloned())
            .unwrap_or_else(|e| panic!("parse failed: {e}"));
        assert_eq!(config.app_id, 12345);
        assert_eq!(config.bridge_url, DEFAULT_BRIDGE_URL);
        assert_eq!(config.bind.port(), 8000);
        assert!(config.default_phone.is_none());
    }

    #[test]
    fn non_integer_app_id_fails_fast() {
        let env = vars(&[("TGRELAY_APP_ID", "abc"), ("TGRELAY_APP_SECRET", "hash")]);
        let err = match GatewayConfig::from_vars(|k| env.get(k).cloned()) {
            Err(e) => e,
            Ok(_) => panic!("expected an error"),
        };
        assert!(err.to_string().contains("TGRELAY_APP_ID"));
    }

    #[test]
    fn missing_app_id_fails_fast() {
        let env = vars(&[("TGRELAY_APP_SECRET", "hash")]);
        assert!(GatewayConfig::from_vars(|k| env.get(k).cloned()).is_err());
    }

    #[test]
    fn overrides_are_honored() {
        let env = vars(&[
            ("TGRELAY_APP_ID", "1"),
            ("TGRELAY_APP_SECRET", "hash"),
            ("TGRELAY_BRIDGE_URL", "http://bridge.internal:9000"),
            ("TGRELAY_PHONE", "+15550001"),
            ("TGRELAY_BIND", "127.0.0.1:9099"),
        ]);
        let config = GatewayConfig::from_vars(|k| env.get(k).cloned())
            .unwrap_or_else(|e| panic!("parse failed: {e}"));
        assert_eq!(config.bridge_url, "http://bridge.internal:9000");
        assert_eq!(config.default_phone.as_deref(), Some("+15550001"));
        assert_eq!(config.bind.port(), 9099);
    }
}
