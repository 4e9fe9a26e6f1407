//! Client configuration.
//!
//! Hosts, credentials and the parameter-combination lists are operational
//! facts about the backend rather than logic, so all of them live here and
//! can be overridden from a TOML file.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::combo::ComboList;

/// Default attempts per request, including the first.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default wait when a throttle response carries no usable hint (40 seconds).
pub const DEFAULT_THROTTLE_WAIT_SECS: u64 = 40;

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_READ_TIMEOUT_SECS: u64 = 30;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`ClientConfig`].
    #[error("failed to parse config file '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A value is outside its accepted range or shape.
    #[error("invalid config value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Query-string suffix lists tried in priority order per endpoint.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ComboConfig {
    pub details: Vec<String>,
    pub chapters: Vec<String>,
    pub pages: Vec<String>,
}

impl Default for ComboConfig {
    fn default() -> Self {
        // Current platform on the mainland line first, then overseas, then legacy.
        Self {
            details: strings(&[
                "?platform=3&_update=true",
                "?in_mainland=true&request_id=",
                "?platform=1",
                "",
            ]),
            chapters: strings(&["&platform=3&_update=true", "&in_mainland=true", "&platform=1"]),
            pages: strings(&[
                "?platform=3&_update=true",
                "?in_mainland=true&request_id=",
                "?platform=1",
                "",
            ]),
        }
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(ToString::to_string).collect()
}

/// Complete client configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// URL scheme used for API hosts (`https` in production).
    pub scheme: String,
    /// Host used when discovery is disabled or fails.
    pub default_host: String,
    /// Alternate hosts tried in order when the active host fails.
    pub fallback_hosts: Vec<String>,
    /// Full URL of the host discovery endpoint; `None` disables discovery.
    pub discovery_url: Option<String>,
    /// Domain of the public website whose cookies may hold the token.
    pub site_domain: String,
    /// Fixed API key sent with every request and mixed into signatures.
    pub api_key: String,
    /// Shared signing secret.
    pub secret: String,
    /// Line/region selector (`0` mainland, `1` overseas).
    pub region: String,
    /// Platform identifier sent in headers.
    pub platform: String,
    /// Attempts per request including the first (1..=10).
    pub max_attempts: u32,
    /// Wait used for throttle responses without a parseable hint.
    pub throttle_wait_secs: u64,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
    /// Resolution tier substituted into unsigned image URLs (`c<tier>x.ext`).
    pub image_quality: Option<u32>,
    /// Cookie names searched for the bearer token, in order.
    pub token_cookie_names: Vec<String>,
    pub combos: ComboConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            scheme: "https".to_string(),
            default_host: "api.mangacopy.com".to_string(),
            fallback_hosts: strings(&["api.copymanga.tv", "api.copymanga.site"]),
            discovery_url: Some(
                "https://api.mangacopy.com/api/v3/system/network2?platform=3".to_string(),
            ),
            site_domain: "www.mangacopy.com".to_string(),
            api_key: String::new(),
            secret: String::new(),
            region: "1".to_string(),
            platform: "3".to_string(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            throttle_wait_secs: DEFAULT_THROTTLE_WAIT_SECS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            read_timeout_secs: DEFAULT_READ_TIMEOUT_SECS,
            image_quality: Some(1500),
            token_cookie_names: crate::auth::DEFAULT_TOKEN_COOKIE_NAMES
                .iter()
                .map(ToString::to_string)
                .collect(),
            combos: ComboConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Reads and validates a TOML config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file is unreadable, malformed or invalid.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validates values against the ranges the client supports.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(self.scheme.as_str(), "http" | "https") {
            return Err(ConfigError::invalid(
                "scheme",
                format!("{}. Expected `http` or `https`", self.scheme),
            ));
        }
        if self.default_host.trim().is_empty() {
            return Err(ConfigError::invalid("default_host", "must not be empty"));
        }
        if self.fallback_hosts.iter().any(|host| host.trim().is_empty()) {
            return Err(ConfigError::invalid("fallback_hosts", "hosts must not be empty"));
        }
        if self.api_key.is_empty() {
            return Err(ConfigError::invalid("api_key", "must not be empty"));
        }
        if self.secret.is_empty() {
            return Err(ConfigError::invalid("secret", "must not be empty"));
        }
        if !(1..=10).contains(&self.max_attempts) {
            return Err(ConfigError::invalid(
                "max_attempts",
                format!("{}. Expected range: 1..=10", self.max_attempts),
            ));
        }
        if self.throttle_wait_secs > 600 {
            return Err(ConfigError::invalid(
                "throttle_wait_secs",
                format!("{}. Expected range: 0..=600", self.throttle_wait_secs),
            ));
        }
        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        validate_timeout_secs("read_timeout_secs", self.read_timeout_secs)?;
        if self.token_cookie_names.is_empty() {
            return Err(ConfigError::invalid("token_cookie_names", "must not be empty"));
        }

        ComboList::new(self.combos.details.clone()).map_err(|e| e.for_field("combos.details"))?;
        ComboList::new(self.combos.chapters.clone())
            .map_err(|e| e.for_field("combos.chapters"))?;
        ComboList::new(self.combos.pages.clone()).map_err(|e| e.for_field("combos.pages"))?;
        Ok(())
    }

    /// Base URL (`scheme://host`) for an API host.
    #[must_use]
    pub fn base_url(&self, host: &str) -> String {
        format!("{}://{}", self.scheme, host.trim_end_matches('/'))
    }

    #[must_use]
    pub fn throttle_wait(&self) -> Duration {
        Duration::from_secs(self.throttle_wait_secs)
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}

fn validate_timeout_secs(field: &'static str, value: u64) -> Result<(), ConfigError> {
    if (1..=3600).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::invalid(
            field,
            format!("{value}. Expected range: 1..=3600"),
        ))
    }
}

/// Resolves the default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/comicapi/config.toml`
/// 2. `$HOME/.config/comicapi/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg_config_home).join("comicapi").join("config.toml"));
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("comicapi")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}
