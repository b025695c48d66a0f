//! Runtime settings read from the environment

use crate::error::{Error, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Default merge backend URL
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:3001/api";

/// Default history page size
pub const DEFAULT_LOG_LIMIT: u32 = 50;

/// How long a completed step shows as completed before returning to pending
pub const DEFAULT_REST_DELAY: Duration = Duration::from_millis(500);

/// Which svn backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// Spawn the svn command-line client
    #[default]
    Cli,
    /// Call the JSON merge backend
    Http,
}

impl FromStr for Backend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cli" | "svn" => Ok(Self::Cli),
            "http" | "api" => Ok(Self::Http),
            other => Err(Error::Config(format!(
                "unknown backend '{other}' (expected cli or http)"
            ))),
        }
    }
}

/// Runtime settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// svn backend
    pub backend: Backend,
    /// svn executable for the command-line backend
    pub svn_program: String,
    /// Base URL of the HTTP backend
    pub api_url: String,
    /// Profile book location override
    pub config_path: Option<PathBuf>,
    /// History entries fetched per request
    pub log_limit: u32,
    /// Delay before a completed step returns to pending
    pub rest_delay: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            svn_program: "svn".to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            config_path: None,
            log_limit: DEFAULT_LOG_LIMIT,
            rest_delay: DEFAULT_REST_DELAY,
        }
    }
}

impl Settings {
    /// Read settings from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`, which maps a variable name to its value
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut settings = Self::default();

        if let Some(backend) = get("SVN_CASCADE_BACKEND") {
            settings.backend = backend.parse()?;
        }
        if let Some(program) = get("SVN_CASCADE_SVN") {
            settings.svn_program = program;
        }
        if let Some(url) = get("SVN_CASCADE_API_URL") {
            url::Url::parse(&url)
                .map_err(|e| Error::Config(format!("invalid SVN_CASCADE_API_URL '{url}': {e}")))?;
            settings.api_url = url;
        }
        settings.config_path = get("SVN_CASCADE_CONFIG").map(PathBuf::from);
        if let Some(limit) = get("SVN_CASCADE_LOG_LIMIT") {
            settings.log_limit = limit
                .trim()
                .parse()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| {
                    Error::Config(format!(
                        "invalid SVN_CASCADE_LOG_LIMIT '{limit}' (expected a positive number)"
                    ))
                })?;
        }

        if let Some(ms) = get("SVN_CASCADE_REST_DELAY_MS") {
            let ms: u64 = ms.trim().parse().map_err(|_| {
                Error::Config(format!(
                    "invalid SVN_CASCADE_REST_DELAY_MS '{ms}' (expected milliseconds)"
                ))
            })?;
            settings.rest_delay = Duration::from_millis(ms);
        }

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.api_url, DEFAULT_API_URL);
        assert_eq!(settings.rest_delay, Duration::from_millis(500));
    }

    #[test]
    fn test_overrides() {
        let settings = Settings::from_lookup(lookup(&[
            ("SVN_CASCADE_BACKEND", "HTTP"),
            ("SVN_CASCADE_SVN", "/opt/svn/bin/svn"),
            ("SVN_CASCADE_API_URL", "http://build-box:3001/api"),
            ("SVN_CASCADE_CONFIG", "/etc/cascade.toml"),
            ("SVN_CASCADE_LOG_LIMIT", "200"),
            ("SVN_CASCADE_REST_DELAY_MS", "0"),
        ]))
        .unwrap();

        assert_eq!(settings.backend, Backend::Http);
        assert_eq!(settings.svn_program, "/opt/svn/bin/svn");
        assert_eq!(settings.api_url, "http://build-box:3001/api");
        assert_eq!(settings.config_path, Some(PathBuf::from("/etc/cascade.toml")));
        assert_eq!(settings.log_limit, 200);
        assert!(settings.rest_delay.is_zero());
    }

    #[test]
    fn test_blank_values_ignored() {
        let settings = Settings::from_lookup(lookup(&[("SVN_CASCADE_SVN", "  ")])).unwrap();
        assert_eq!(settings.svn_program, "svn");
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(Settings::from_lookup(lookup(&[("SVN_CASCADE_BACKEND", "git")])).is_err());
        assert!(Settings::from_lookup(lookup(&[("SVN_CASCADE_LOG_LIMIT", "0")])).is_err());
        assert!(Settings::from_lookup(lookup(&[("SVN_CASCADE_API_URL", "not a url")])).is_err());
        assert!(Settings::from_lookup(lookup(&[("SVN_CASCADE_REST_DELAY_MS", "-1")])).is_err());
    }
}
