//! Request signing for the comic API.
//!
//! Every API request carries a timestamp, a request-unique nonce and an
//! HMAC-SHA256 signature over the request path. The backend recomputes the
//! signature and rejects the request when it differs, so the path passed to
//! [`sign`] must be exactly the path that goes on the wire.
//!
//! # Example
//!
//! ```
//! use comicapi_core::signing::sign;
//!
//! let signature = sign("/api/v3/comic2/12345", "GET", "1700000000", "abc", "secret", "key");
//! assert_eq!(signature.len(), 64);
//! ```

use std::time::{SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use rand::Rng;
use rand::distributions::Alphanumeric;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Length of generated nonces.
const NONCE_LEN: usize = 32;

/// Computes the hex-encoded request signature.
///
/// The signed message is `lowercase(path + timestamp + nonce + method + api_key)`.
/// The path is used verbatim: `/api/x` and `api/x` sign differently.
#[must_use]
pub fn sign(
    path: &str,
    method: &str,
    timestamp: &str,
    nonce: &str,
    secret: &str,
    api_key: &str,
) -> String {
    let message = format!("{path}{timestamp}{nonce}{method}{api_key}").to_lowercase();

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        unreachable!("HMAC-SHA256 accepts keys of any length");
    };
    mac.update(message.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// A request stamped with the values needed by the signing headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    /// Request path the signature covers.
    pub path: String,
    /// Upper-case HTTP method.
    pub method: String,
    /// Unix seconds at signing time.
    pub timestamp: String,
    /// Random, request-unique nonce.
    pub nonce: String,
    /// Hex HMAC-SHA256 signature.
    pub signature: String,
}

impl SignedRequest {
    /// Signs `path` for `method` using the current wall clock and a fresh nonce.
    ///
    /// Call this immediately before sending; the backend rejects stale timestamps.
    #[must_use]
    pub fn new(path: &str, method: &str, secret: &str, api_key: &str) -> Self {
        Self::with_values(path, method, &unix_timestamp(), &generate_nonce(), secret, api_key)
    }

    /// Signs with an explicit timestamp and nonce.
    #[must_use]
    pub fn with_values(
        path: &str,
        method: &str,
        timestamp: &str,
        nonce: &str,
        secret: &str,
        api_key: &str,
    ) -> Self {
        let method = method.to_ascii_uppercase();
        let signature = sign(path, &method, timestamp, nonce, secret, api_key);
        Self {
            path: path.to_string(),
            method,
            timestamp: timestamp.to_string(),
            nonce: nonce.to_string(),
            signature,
        }
    }
}

/// Returns the current unix time in whole seconds.
#[must_use]
pub fn unix_timestamp() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
        .to_string()
}

/// Generates a 32-character alphanumeric nonce.
#[must_use]
pub fn generate_nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(NONCE_LEN)
        .map(char::from)
        .collect()
}
