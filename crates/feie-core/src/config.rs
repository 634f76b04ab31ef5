// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Client configuration.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FeieError, Result};
use crate::fields::{DEFAULT_GATEWAY, DEFAULT_USER_AGENT};
use crate::types::Credentials;

/// Settings read once when a client is built.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Account identifier registered in the vendor console.
    pub user: String,
    /// Shared secret (`UKEY`) used to sign every request.
    pub ukey: String,
    /// Gateway URL receiving every operation.
    pub gateway: String,
    /// Vendor RSA public key for callback verification: PEM (SPKI or
    /// PKCS#1) or bare base64 DER. Callbacks cannot be verified without it.
    pub public_key: Option<String>,
    /// Connect timeout in milliseconds.
    pub timeout_ms: u64,
    /// Optional whole-request timeout in milliseconds (connect + send + read).
    pub request_timeout_ms: Option<u64>,
    /// `User-Agent` header sent to the gateway.
    pub user_agent: String,
    /// Directory for the `feie.log` file; log to stdout when unset.
    pub log_path: Option<PathBuf>,
    /// `tracing` filter directive (e.g. "info", "feie_client=debug").
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user: String::new(),
            ukey: String::new(),
            gateway: DEFAULT_GATEWAY.to_owned(),
            public_key: None,
            timeout_ms: 30_000,
            request_timeout_ms: None,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            log_path: None,
            log_level: "info".to_owned(),
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("user", &self.user)
            .field("ukey", &"<redacted>")
            .field("gateway", &self.gateway)
            .field("public_key", &self.public_key.as_ref().map(|_| "<set>"))
            .field("timeout_ms", &self.timeout_ms)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("user_agent", &self.user_agent)
            .field("log_path", &self.log_path)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl ClientConfig {
    pub fn new(user: impl Into<String>, ukey: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            ukey: ukey.into(),
            ..Default::default()
        }
    }

    pub fn with_gateway(mut self, gateway: impl Into<String>) -> Self {
        self.gateway = gateway.into();
        self
    }

    pub fn with_public_key(mut self, public_key: impl Into<String>) -> Self {
        self.public_key = Some(public_key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = millis(timeout);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = Some(millis(timeout));
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_log_path(mut self, log_path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(log_path.into());
        self
    }

    pub fn with_log_level(mut self, log_level: impl Into<String>) -> Self {
        self.log_level = log_level.into();
        self
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.user.clone(), self.ukey.clone())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    /// Defaults overlaid with `FEIE_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overlaid with whatever `lookup` returns for each `FEIE_*`
    /// variable. Timeouts are seconds and may be fractional ("1.5");
    /// unparsable or negative values keep the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(user) = lookup("FEIE_USER") {
            config.user = user;
        }
        if let Some(ukey) = lookup("FEIE_UKEY") {
            config.ukey = ukey;
        }
        if let Some(gateway) = lookup("FEIE_GATEWAY") {
            config.gateway = gateway;
        }
        if let Some(public_key) = lookup("FEIE_PUBLIC_KEY") {
            config.public_key = Some(public_key);
        }
        if let Some(timeout) = lookup("FEIE_TIMEOUT_SECS").and_then(|v| parse_secs(&v)) {
            config.timeout_ms = millis(timeout);
        }
        if let Some(timeout) = lookup("FEIE_REQUEST_TIMEOUT_SECS").and_then(|v| parse_secs(&v)) {
            config.request_timeout_ms = Some(millis(timeout));
        }
        if let Some(user_agent) = lookup("FEIE_USER_AGENT") {
            config.user_agent = user_agent;
        }
        if let Some(log_path) = lookup("FEIE_LOG_PATH") {
            config.log_path = Some(PathBuf::from(log_path));
        }
        if let Some(log_level) = lookup("FEIE_LOG_LEVEL") {
            config.log_level = log_level;
        }
        config
    }

    /// Read a JSON config file. Missing keys fall back to defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)?;
        serde_json::from_str(&data)
            .map_err(|e| FeieError::Config(format!("{}: {e}", path.display())))
    }

    /// Write this config as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn parse_secs(raw: &str) -> Option<Duration> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_point_at_vendor_gateway() {
        let config = ClientConfig::default();
        assert_eq!(config.gateway, "https://api.feieyun.cn/Api/Open/");
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert!(config.public_key.is_none());
        assert!(config.user_agent.starts_with("Mozilla/5.0"));
    }

    #[test]
    fn lookup_overrides_defaults() {
        let env: HashMap<&str, &str> = [
            ("FEIE_USER", "demo@example.com"),
            ("FEIE_UKEY", "ukey"),
            ("FEIE_TIMEOUT_SECS", "5"),
            ("FEIE_LOG_LEVEL", "debug"),
        ]
        .into_iter()
        .collect();
        let config = ClientConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.user, "demo@example.com");
        assert_eq!(config.ukey, "ukey");
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.gateway, DEFAULT_GATEWAY);
    }

    #[test]
    fn bad_timeout_keeps_default() {
        let config = ClientConfig::from_lookup(|k| {
            (k == "FEIE_TIMEOUT_SECS").then(|| "soon".to_string())
        });
        assert_eq!(config.timeout_ms, 30_000);
    }

    #[test]
    fn fractional_and_request_timeouts_from_lookup() {
        let env: HashMap<&str, &str> = [
            ("FEIE_TIMEOUT_SECS", "0.5"),
            ("FEIE_REQUEST_TIMEOUT_SECS", "4.25"),
        ]
        .into_iter()
        .collect();
        let config = ClientConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.timeout(), Duration::from_millis(500));
        assert_eq!(config.request_timeout(), Some(Duration::from_millis(4250)));

        let config = ClientConfig::from_lookup(|k| {
            (k == "FEIE_REQUEST_TIMEOUT_SECS").then(|| "-1".to_string())
        });
        assert_eq!(config.request_timeout(), None);
    }

    #[test]
    fn sub_second_timeouts_survive_persistence() {
        let config = ClientConfig::new("u", "k")
            .with_timeout(Duration::from_millis(500))
            .with_request_timeout(Duration::from_millis(1500));
        assert_eq!(config.timeout(), Duration::from_millis(500));
        assert_eq!(config.request_timeout(), Some(Duration::from_millis(1500)));

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("feie.json");
        config.save(&path).expect("save");
        let loaded = ClientConfig::load(&path).expect("load");
        assert_eq!(loaded.timeout(), Duration::from_millis(500));
        assert_eq!(loaded.request_timeout(), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn malformed_file_is_config_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("feie.json");
        std::fs::write(&path, "{ user: ").unwrap();
        assert!(matches!(
            ClientConfig::load(&path),
            Err(FeieError::Config(_))
        ));
    }

    #[test]
    fn save_and_load_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("feie.json");
        let config = ClientConfig::new("demo@example.com", "ukey")
            .with_timeout(Duration::from_secs(3))
            .with_log_level("warn");
        config.save(&path).expect("save");

        let loaded = ClientConfig::load(&path).expect("load");
        assert_eq!(loaded.user, "demo@example.com");
        assert_eq!(loaded.timeout(), Duration::from_secs(3));
        assert_eq!(loaded.log_level, "warn");
    }

    #[test]
    fn partial_json_uses_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("feie.json");
        std::fs::write(&path, r#"{"user":"u","ukey":"k"}"#).unwrap();
        let loaded = ClientConfig::load(&path).expect("load");
        assert_eq!(loaded.gateway, DEFAULT_GATEWAY);
        assert_eq!(loaded.timeout_ms, 30_000);
    }

    #[test]
    fn debug_redacts_secret() {
        let shown = format!("{:?}", ClientConfig::new("u", "very-secret"));
        assert!(!shown.contains("very-secret"));
    }
}
