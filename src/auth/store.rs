//! Credential store capability and its in-memory implementation.

use dashmap::DashMap;
use tracing::debug;

/// Domain-keyed cookie lookup and propagation.
///
/// The API client only depends on this interface; persistence and browser
/// integration are the embedder's concern.
pub trait CredentialStore: Send + Sync {
    /// Returns the value of cookie `name` on `domain`.
    fn get(&self, domain: &str, name: &str) -> Option<String>;

    /// Copies the named cookies present on `from` to `to`, returning how many were copied.
    fn copy(&self, from: &str, to: &str, names: &[String]) -> usize;
}

/// Thread-safe in-memory [`CredentialStore`].
///
/// Writes are last-writer-wins; there is no cross-key transaction.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    cookies: DashMap<(String, String), String>,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` for cookie `name` on `domain`.
    pub fn set(&self, domain: &str, name: &str, value: &str) {
        self.cookies
            .insert((normalize_domain(domain), name.to_string()), value.to_string());
    }

    /// Number of stored cookies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, domain: &str, name: &str) -> Option<String> {
        self.cookies
            .get(&(normalize_domain(domain), name.to_string()))
            .map(|entry| entry.value().clone())
    }

    fn copy(&self, from: &str, to: &str, names: &[String]) -> usize {
        let mut copied = 0;
        for name in names {
            // Clone out before inserting; holding a shard guard across insert can deadlock.
            let Some(value) = self.get(from, name) else {
                continue;
            };
            self.set(to, name, &value);
            copied += 1;
        }
        if copied > 0 {
            debug!(from, to, copied, "propagated credentials across domains");
        }
        copied
    }
}

/// Normalizes a cookie domain or host into a store key.
///
/// Lowercases, strips a leading `.`, any scheme, path, and port.
#[must_use]
pub fn normalize_domain(domain: &str) -> String {
    let trimmed = domain.trim();
    let without_scheme = trimmed
        .split_once("://")
        .map_or(trimmed, |(_, rest)| rest);
    let host = without_scheme.split('/').next().unwrap_or_default();
    let host = host.rsplit_once(':').map_or(host, |(name, port)| {
        if port.chars().all(|c| c.is_ascii_digit()) {
            name
        } else {
            host
        }
    });
    host.trim_start_matches('.').to_ascii_lowercase()
}
