//! Connection settings, usually read from the environment.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::auth::{Auth, PasswordAuth, TokenAuth};
use crate::error::{ApiError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub token: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl Config {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Read `PLANKA_URL`, `PLANKA_USERNAME`, `PLANKA_PASSWORD`, `PLANKA_TOKEN`
    /// and `PLANKA_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Like `from_env` with a custom variable source.
    pub fn from_vars<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| get(name).filter(|v| !v.trim().is_empty());
        let url = non_empty("PLANKA_URL").ok_or_else(|| ApiError::validation("PLANKA_URL is not set"))?;
        let timeout_secs = match non_empty("PLANKA_TIMEOUT_SECS") {
            Some(raw) => Some(raw.trim().parse::<u64>().map_err(|_| {
                ApiError::validation(format!("PLANKA_TIMEOUT_SECS must be a whole number of seconds, got {raw:?}"))
            })?),
            None => None,
        };
        Ok(Self {
            url,
            username: non_empty("PLANKA_USERNAME"),
            password: non_empty("PLANKA_PASSWORD"),
            token: non_empty("PLANKA_TOKEN"),
            timeout_secs,
        })
    }

    pub fn with_password(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Token auth wins when both are configured.
    pub fn auth(&self) -> Result<Box<dyn Auth>> {
        if let Some(token) = &self.token {
            return Ok(Box::new(TokenAuth::new(token.clone())));
        }
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Ok(Box::new(PasswordAuth::new(username.clone(), password.clone()))),
            _ => Err(ApiError::validation(
                "no credentials configured: set PLANKA_TOKEN, or PLANKA_USERNAME and PLANKA_PASSWORD",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn reads_all_variables() {
        let cfg = Config::from_vars(vars(&[
            ("PLANKA_URL", "http://localhost:3000"),
            ("PLANKA_USERNAME", "demo"),
            ("PLANKA_PASSWORD", "demo"),
            ("PLANKA_TIMEOUT_SECS", "15"),
        ]))
        .unwrap();
        assert_eq!(cfg.url, "http://localhost:3000");
        assert_eq!(cfg.username.as_deref(), Some("demo"));
        assert_eq!(cfg.timeout(), Some(Duration::from_secs(15)));
        assert!(cfg.token.is_none());
    }

    #[test]
    fn url_is_mandatory() {
        let err = Config::from_vars(vars(&[("PLANKA_TOKEN", "t")])).unwrap_err();
        assert!(matches!(err, ApiError::Validation(ref m) if m.contains("PLANKA_URL")));
    }

    #[test]
    fn bad_timeout_is_rejected() {
        let err = Config::from_vars(vars(&[("PLANKA_URL", "http://x"), ("PLANKA_TIMEOUT_SECS", "soon")])).unwrap_err();
        assert!(err.is_local());
    }

    #[test]
    fn blank_values_count_as_unset() {
        let cfg = Config::from_vars(vars(&[("PLANKA_URL", "http://x"), ("PLANKA_TOKEN", "  ")])).unwrap();
        assert!(cfg.token.is_none());
        assert!(cfg.auth().is_err());
    }

    #[test]
    fn deserializes_from_json() {
        let cfg: Config = serde_json::from_str(r#"{"url": "http://x", "token": "t", "timeout_secs": 5}"#).unwrap();
        assert_eq!(cfg, Config::new("http://x").with_token("t").with_timeout_secs(5));
    }
}
