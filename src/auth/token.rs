//! Bearer token resolution across the site and API domains.

use std::sync::Arc;

use tracing::{debug, instrument};

use super::CredentialStore;

/// Cookie names that carry the session token by default.
pub const DEFAULT_TOKEN_COOKIE_NAMES: [&str; 3] = ["token", "access_token", "authorization"];

/// Resolves the bearer token from a shared [`CredentialStore`].
///
/// Logging in happens elsewhere (browser, external tooling); this only reads
/// what the store already holds.
#[derive(Clone)]
pub struct TokenStore {
    store: Arc<dyn CredentialStore>,
    names: Vec<String>,
}

impl TokenStore {
    /// Creates a token store that looks for the default token cookie names.
    #[must_use]
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self::with_names(
            store,
            DEFAULT_TOKEN_COOKIE_NAMES.iter().map(ToString::to_string).collect(),
        )
    }

    /// Creates a token store with custom cookie names, checked in order.
    #[must_use]
    pub fn with_names(store: Arc<dyn CredentialStore>, names: Vec<String>) -> Self {
        Self { store, names }
    }

    /// Returns the token for `api_domain`, propagating it from `site_domain` if needed.
    ///
    /// A missing token is a normal state: requests go out unauthenticated.
    #[instrument(skip(self))]
    pub fn resolve_token(&self, api_domain: &str, site_domain: &str) -> Option<String> {
        if let Some(token) = self.lookup(api_domain) {
            return Some(token);
        }

        let copied = self.store.copy(site_domain, api_domain, &self.names);
        if copied == 0 {
            debug!("no token cookie on site or api domain; continuing unauthenticated");
            return None;
        }
        self.lookup(api_domain)
    }

    fn lookup(&self, domain: &str) -> Option<String> {
        self.names
            .iter()
            .find_map(|name| self.store.get(domain, name))
            .filter(|token| !token.is_empty())
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("names", &self.names)
            .finish_non_exhaustive()
    }
}
