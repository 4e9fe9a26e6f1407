//! Header contract with the backend.
//!
//! Targeting a different backend means replacing the names here; the
//! signing, backoff and failover logic stays the same.

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};

use super::ApiError;
use crate::session::SessionIdentity;
use crate::signing::SignedRequest;

pub const DEVICE: &str = "device";
pub const DEVICE_INFO: &str = "deviceinfo";
pub const PSEUDO_ID: &str = "pseudoid";
pub const TIMESTAMP: &str = "x-auth-timestamp";
pub const NONCE: &str = "x-auth-nonce";
pub const SIGNATURE: &str = "x-auth-signature";
pub const API_KEY: &str = "x-api-key";
pub const REGION: &str = "region";
pub const PLATFORM: &str = "platform";

/// Static values that accompany every signed request.
#[derive(Debug, Clone)]
pub(crate) struct HeaderContext<'a> {
    pub identity: &'a SessionIdentity,
    pub api_key: &'a str,
    pub region: &'a str,
    pub platform: &'a str,
}

/// Authorization header value for an optional token.
///
/// An absent token is sent as an empty header, which the backend accepts
/// for anonymous access.
#[must_use]
pub fn authorization_value(token: Option<&str>) -> HeaderValue {
    token
        .filter(|token| !token.is_empty())
        .and_then(|token| HeaderValue::from_str(&format!("Token {token}")).ok())
        .unwrap_or_else(|| HeaderValue::from_static(""))
}

/// Builds a header map holding only the authorization header.
#[must_use]
pub fn auth_headers(token: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, authorization_value(token));
    headers
}

/// Assembles the full header set for one signed request.
///
/// Caller-supplied headers are applied last, except that signing headers
/// cannot be overridden.
pub(crate) fn signed_headers(
    context: &HeaderContext<'_>,
    signed: &SignedRequest,
    extra: &HeaderMap,
) -> Result<HeaderMap, ApiError> {
    let mut headers = HeaderMap::new();
    insert(&mut headers, DEVICE, context.identity.device_id())?;
    insert(&mut headers, DEVICE_INFO, context.identity.device_info())?;
    insert(&mut headers, PSEUDO_ID, context.identity.pseudo_id())?;
    insert(&mut headers, API_KEY, context.api_key)?;
    insert(&mut headers, REGION, context.region)?;
    insert(&mut headers, PLATFORM, context.platform)?;
    headers.insert(AUTHORIZATION, HeaderValue::from_static(""));

    for (name, value) in extra {
        headers.insert(name.clone(), value.clone());
    }

    insert(&mut headers, TIMESTAMP, &signed.timestamp)?;
    insert(&mut headers, NONCE, &signed.nonce)?;
    insert(&mut headers, SIGNATURE, &signed.signature)?;
    Ok(headers)
}

fn insert(headers: &mut HeaderMap, name: &'static str, value: &str) -> Result<(), ApiError> {
    let value = HeaderValue::from_str(value).map_err(|_| ApiError::InvalidHeader { name })?;
    headers.insert(HeaderName::from_static(name), value);
    Ok(())
}
