//! API host selection with one-shot discovery and sticky failover.
//!
//! The memoized host is shared by every operation on a client. Updates are
//! last-writer-wins: two operations failing over at the same time may each
//! promote a different working host, and whichever writes last is used from
//! then on. Both hosts work, so this is eventually consistent rather than
//! linearizable.

use std::sync::{Arc, RwLock};

use reqwest::header::HeaderMap;
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};

use crate::client::ApiClient;
use crate::config::ClientConfig;

/// Resolves and remembers the active API host.
#[derive(Debug)]
pub struct HostResolver {
    client: ApiClient,
    default_host: String,
    fallback_hosts: Vec<String>,
    discovery_url: Option<String>,
    discovered: OnceCell<Option<String>>,
    active: RwLock<Option<Arc<str>>>,
}

impl HostResolver {
    #[must_use]
    pub fn new(client: ApiClient, config: &ClientConfig) -> Self {
        Self {
            client,
            default_host: clean_host(&config.default_host),
            fallback_hosts: config.fallback_hosts.iter().map(|h| clean_host(h)).collect(),
            discovery_url: config.discovery_url.clone(),
            discovered: OnceCell::new(),
            active: RwLock::new(None),
        }
    }

    /// Returns the memoized host, resolving it on first use.
    ///
    /// Resolution tries discovery once per resolver lifetime, then the
    /// configured default host.
    #[instrument(skip(self))]
    pub async fn resolve_api_host(&self) -> Arc<str> {
        if let Some(host) = self.active_host() {
            return host;
        }

        let discovered = self
            .discovered
            .get_or_init(|| self.discover())
            .await
            .clone();
        let candidate: Arc<str> = Arc::from(discovered.unwrap_or_else(|| self.default_host.clone()));

        let Ok(mut active) = self.active.write() else {
            return candidate;
        };
        // A concurrent promotion wins over the initial resolution.
        active.get_or_insert(candidate).clone()
    }

    /// Currently memoized host, if any.
    #[must_use]
    pub fn active_host(&self) -> Option<Arc<str>> {
        self.active.read().ok().and_then(|guard| guard.clone())
    }

    /// Overwrites the memoized host after a successful failover.
    pub fn promote(&self, host: &str) {
        let host = clean_host(host);
        if let Ok(mut active) = self.active.write() {
            let previous = active.replace(Arc::from(host.as_str()));
            info!(
                host = %host,
                previous = previous.as_deref().unwrap_or("<none>"),
                "promoted working API host"
            );
        }
    }

    /// Clears the memoized host. Discovery is not repeated.
    pub fn reset(&self) {
        if let Ok(mut active) = self.active.write() {
            *active = None;
        }
    }

    /// Fallback hosts to try after `current` failed, in configured order.
    #[must_use]
    pub fn alternates(&self, current: &str) -> Vec<String> {
        let mut seen = vec![clean_host(current)];
        let mut alternates = Vec::new();
        for host in self
            .fallback_hosts
            .iter()
            .chain(std::iter::once(&self.default_host))
        {
            if !seen.contains(host) {
                seen.push(host.clone());
                alternates.push(host.clone());
            }
        }
        alternates
    }

    async fn discover(&self) -> Option<String> {
        let url = self.discovery_url.as_deref()?;
        let payload = self.client.get_json(url, &HeaderMap::new(), 1).await;
        let host = payload
            .get("results")
            .and_then(|results| results.pointer("/api/0/0"))
            .and_then(Value::as_str)
            .map(clean_host)
            .filter(|host| !host.is_empty());

        match &host {
            Some(host) => debug!(host = %host, "discovered API host"),
            None => warn!(url, "host discovery returned no usable host; using default"),
        }
        host
    }
}

/// Strips scheme and trailing slashes from a configured host.
fn clean_host(host: &str) -> String {
    let host = host.trim();
    let host = host
        .split_once("://")
        .map_or(host, |(_, rest)| rest);
    host.trim_end_matches('/').to_string()
}
