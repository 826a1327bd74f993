use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;

use crate::error::{ApiError, ApiResult};

pub const DEFAULT_API_BASE: &str = "https://prolens.ccs4thyear.com/api";
pub const DEFAULT_FRONTEND_HOST: &str = "prolens.ccs4thyear.com";
pub const DEFAULT_POLL_SECS: u64 = 30;

pub const ENV_API_BASE: &str = "PROLENS_API_BASE";
pub const ENV_POLL_SECS: &str = "PROLENS_POLL_SECS";
pub const ENV_TIMEOUT_SECS: &str = "PROLENS_TIMEOUT_SECS";
pub const ENV_STORE: &str = "PROLENS_STORE";
pub const ENV_FRONTEND_HOST: &str = "PROLENS_FRONTEND_HOST";

/// Runtime settings for a client session.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base: Url,
    /// Role-change poll period.
    pub poll_interval: Duration,
    /// Per-request timeout; `None` leaves it to the transport.
    pub request_timeout: Option<Duration>,
    /// Credential file used by the file-backed store.
    pub store_path: PathBuf,
    /// Host the frontend is served from; decides the shape of patched login links.
    pub frontend_host: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: Url::parse(DEFAULT_API_BASE).expect("DEFAULT_API_BASE is a valid URL"),
            poll_interval: Duration::from_secs(DEFAULT_POLL_SECS),
            request_timeout: None,
            store_path: default_store_path(|k| std::env::var(k).ok()),
            frontend_host: DEFAULT_FRONTEND_HOST.to_string(),
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by `PROLENS_*` environment variables.
    pub fn from_env() -> ApiResult<Self> { Self::from_lookup(|k| std::env::var(k).ok()) }

    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> ApiResult<Self> {
        let mut cfg = ClientConfig { store_path: default_store_path(&lookup), ..Default::default() };
        if let Some(v) = non_empty(lookup(ENV_API_BASE)) {
            cfg.api_base = Url::parse(&v).map_err(|e| ApiError::invalid(ENV_API_BASE.to_string(), format!("{}: {}", v, e)))?;
            if !matches!(cfg.api_base.scheme(), "http" | "https") {
                return Err(ApiError::invalid(ENV_API_BASE.to_string(), format!("{}: scheme must be http or https", v)));
            }
        }
        if let Some(v) = non_empty(lookup(ENV_POLL_SECS)) {
            let secs = parse_secs(ENV_POLL_SECS, &v)?;
            if secs == 0 {
                return Err(ApiError::invalid(ENV_POLL_SECS, "must be at least 1 second"));
            }
            cfg.poll_interval = Duration::from_secs(secs);
        }
        if let Some(v) = non_empty(lookup(ENV_TIMEOUT_SECS)) {
            let secs = parse_secs(ENV_TIMEOUT_SECS, &v)?;
            cfg.request_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(v) = non_empty(lookup(ENV_STORE)) {
            cfg.store_path = PathBuf::from(v);
        }
        if let Some(v) = non_empty(lookup(ENV_FRONTEND_HOST)) {
            cfg.frontend_host = v;
        }
        Ok(cfg)
    }
}

fn non_empty(v: Option<String>) -> Option<String> { v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()) }

fn parse_secs(var: &str, v: &str) -> ApiResult<u64> {
    v.parse::<u64>().map_err(|e| ApiError::invalid(var.to_string(), format!("{}: {}", v, e)))
}

/// `$HOME/.prolens/session.json` (or `%USERPROFILE%`), else relative to the CWD.
fn default_store_path<F: Fn(&str) -> Option<String>>(lookup: F) -> PathBuf {
    let home = lookup("HOME").or_else(|| lookup("USERPROFILE"));
    let root = home.map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
    root.join(".prolens").join("session.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let m: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| m.get(k).cloned()
    }

    #[test]
    fn defaults_without_env() {
        let cfg = ClientConfig::from_lookup(lookup_from(&[("HOME", "/home/ana")])).unwrap();
        assert_eq!(cfg.api_base.as_str(), DEFAULT_API_BASE);
        assert_eq!(cfg.poll_interval, Duration::from_secs(30));
        assert_eq!(cfg.request_timeout, None);
        assert_eq!(cfg.store_path, PathBuf::from("/home/ana/.prolens/session.json"));
        assert_eq!(cfg.frontend_host, DEFAULT_FRONTEND_HOST);
    }

    #[test]
    fn env_overrides() {
        let cfg = ClientConfig::from_lookup(lookup_from(&[
            (ENV_API_BASE, "http://127.0.0.1:8000/api"),
            (ENV_POLL_SECS, "5"),
            (ENV_TIMEOUT_SECS, "12"),
            (ENV_STORE, "/tmp/s.json"),
            (ENV_FRONTEND_HOST, "localhost"),
        ]))
        .unwrap();
        assert_eq!(cfg.api_base.as_str(), "http://127.0.0.1:8000/api");
        assert_eq!(cfg.poll_interval, Duration::from_secs(5));
        assert_eq!(cfg.request_timeout, Some(Duration::from_secs(12)));
        assert_eq!(cfg.store_path, PathBuf::from("/tmp/s.json"));
        assert_eq!(cfg.frontend_host, "localhost");
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(ClientConfig::from_lookup(lookup_from(&[(ENV_POLL_SECS, "soon")])).is_err());
        assert!(ClientConfig::from_lookup(lookup_from(&[(ENV_POLL_SECS, "0")])).is_err());
        assert!(ClientConfig::from_lookup(lookup_from(&[(ENV_API_BASE, "ftp://x/api")])).is_err());
        assert!(ClientConfig::from_lookup(lookup_from(&[(ENV_API_BASE, "not a url")])).is_err());
    }
}
