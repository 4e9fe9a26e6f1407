//! Error types for the API client.
//!
//! Transport failures never escape the public fetch operations; they are
//! logged and turned into empty results. These types carry the context for
//! that log line and for construction-time failures.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised while building the client or sending a single request.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network-level error (DNS, connection refused, TLS, reset).
    #[error("network error requesting {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The request timed out.
    #[error("timeout requesting {url}")]
    Timeout { url: String },

    /// The URL could not be parsed.
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },

    /// A header value contained bytes HTTP does not allow.
    #[error("invalid value for header `{name}`")]
    InvalidHeader { name: &'static str },

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client construction failed: {reason}")]
    ClientBuild { reason: String },

    /// Configuration rejected at construction time.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ApiError {
    /// Creates a network error, mapping reqwest timeouts to [`ApiError::Timeout`].
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        let url = url.into();
        if source.is_timeout() {
            Self::Timeout { url }
        } else {
            Self::Network { url, source }
        }
    }

    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    pub fn client_build(reason: impl Into<String>) -> Self {
        Self::ClientBuild {
            reason: reason.into(),
        }
    }

    /// Whether the failure looks host-permanent (TLS/certificate/DNS) rather than a one-off.
    ///
    /// Only used to annotate logs; every transport failure is treated as "no data".
    #[must_use]
    pub fn looks_permanent(&self) -> bool {
        match self {
            Self::Network { source, .. } => {
                let message = error_chain_text(source).to_lowercase();
                ["certificate", "tls", "ssl", "handshake", "dns", "resolve"]
                    .iter()
                    .any(|marker| message.contains(marker))
            }
            Self::InvalidUrl { .. } | Self::InvalidHeader { .. } => true,
            Self::Timeout { .. } | Self::ClientBuild { .. } | Self::Config(_) => false,
        }
    }
}

fn error_chain_text(error: &(dyn std::error::Error + 'static)) -> String {
    let mut text = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}
