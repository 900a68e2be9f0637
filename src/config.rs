//! Client configuration: API location, identity/auth endpoint paths and request timeout.
//! Values come from defaults, then environment variables; binaries layer their flags on top.

use std::env;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000/api";
pub const DEFAULT_MOCK_PORT: u16 = 8000;

pub const ENV_API_URL: &str = "STOREFRONT_API_URL";
pub const ENV_TIMEOUT_SECS: &str = "STOREFRONT_TIMEOUT_SECS";
pub const ENV_MOCK_PORT: &str = "STOREFRONT_MOCK_PORT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub identity_path: String,
    pub login_path: String,
    pub logout_path: String,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            identity_path: "/me".to_string(),
            login_path: "/auth".to_string(),
            logout_path: "/logout".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), ..Default::default() }
    }

    /// Defaults overridden by `STOREFRONT_API_URL` / `STOREFRONT_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(url) = env::var(ENV_API_URL) {
            if !url.trim().is_empty() { cfg.base_url = url.trim().to_string(); }
        }
        if let Some(secs) = parse_u64_env(ENV_TIMEOUT_SECS) {
            cfg.timeout = Duration::from_secs(secs.max(1));
        }
        cfg
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

pub fn parse_u64_env(name: &str) -> Option<u64> {
    match env::var(name) {
        Ok(val) => val.trim().parse::<u64>().ok(),
        Err(_) => None,
    }
}

pub fn parse_port_env(name: &str) -> Option<u16> {
    match env::var(name) {
        Ok(val) => val.trim().parse::<u16>().ok(),
        Err(_) => None,
    }
}

/// Value following `flag` in an argv-style list.
pub fn flag_value(args: &[String], flag: &str) -> Option<String> {
    let mut i = 0;
    while i < args.len() {
        if args[i] == flag && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
        i += 1;
    }
    None
}

pub fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}
