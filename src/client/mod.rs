//! Signed API client with throttle-aware retries.
//!
//! [`ApiClient`] signs every request, attaches the session identity and
//! handles the backend's HTTP 210 throttle signal. Callers never see an
//! error from [`ApiClient::get_json`] or [`ApiClient::post_form`]: anything
//! that is not a usable body comes back as an empty [`JsonObject`].
//!
//! # Per-request state machine
//!
//! ```text
//! Sending -> Evaluating -> Success    (any non-210 status, or terminal 210)
//!                       -> Retryable  (210 with rate-limit wording; sleep, send again)
//!                       -> Failed     (transport error or attempts exhausted; empty)
//! ```

mod backoff;
mod error;
pub mod headers;
mod http;

pub use backoff::{
    MAX_JITTER, MAX_THROTTLE_WAIT, Sleeper, THROTTLE_STATUS, ThrottleVerdict, TokioSleeper,
    classify_throttle, jitter, throttle_message,
};
pub use error::ApiError;
pub use http::{HttpTimeouts, build_api_http_client};

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use reqwest::header::HeaderMap;
use serde_json::{Map, Value, json};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::config::ClientConfig;
use crate::session::SessionIdentity;
use crate::signing::SignedRequest;
use crate::user_agent;

use headers::HeaderContext;

/// JSON object returned by the API; empty means "no data".
pub type JsonObject = Map<String, Value>;

/// Result of evaluating one response.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    /// Hand this body to the caller.
    Done(JsonObject),
    /// Rate limited; wait this long (before jitter) and send again.
    RetryAfter(Duration),
}

/// Evaluates a response status and body.
///
/// Non-throttle statuses return their JSON body regardless of the code;
/// callers inspect the payload for business-level success.
#[must_use]
pub fn evaluate_response(status: u16, body: &str, default_wait: Duration) -> Evaluation {
    if status != THROTTLE_STATUS {
        return Evaluation::Done(parse_object(body));
    }

    let message = throttle_message(body);
    match classify_throttle(&message) {
        ThrottleVerdict::WaitFor(wait) => Evaluation::RetryAfter(wait),
        ThrottleVerdict::WaitDefault => Evaluation::RetryAfter(default_wait),
        ThrottleVerdict::NotThrottled => {
            let object = parse_object(body);
            if object.is_empty() {
                // Keep the server's wording visible to the caller.
                Evaluation::Done(wrap_message(status, &message))
            } else {
                Evaluation::Done(object)
            }
        }
    }
}

fn parse_object(body: &str) -> JsonObject {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(object)) => object,
        _ => JsonObject::new(),
    }
}

fn wrap_message(status: u16, message: &str) -> JsonObject {
    match json!({ "code": status, "message": message }) {
        Value::Object(object) => object,
        _ => JsonObject::new(),
    }
}

/// Signed, throttle-aware JSON client.
///
/// Holds one [`SessionIdentity`] for its whole lifetime. Cloning shares the
/// underlying connection pool, identity and cancellation token.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    identity: Arc<SessionIdentity>,
    api_key: String,
    secret: String,
    region: String,
    platform: String,
    throttle_wait: Duration,
    sleeper: Arc<dyn Sleeper>,
    cancel: CancellationToken,
}

impl ApiClient {
    /// Builds a client from validated configuration with a fresh session identity.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Config`] for missing credentials or
    /// [`ApiError::ClientBuild`] when the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        if config.api_key.is_empty() || config.secret.is_empty() {
            return Err(crate::config::ConfigError::invalid(
                "secret",
                "api_key and secret are required for request signing",
            )
            .into());
        }

        let http = build_api_http_client(
            &user_agent::default_api_user_agent(),
            HttpTimeouts {
                connect: config.connect_timeout(),
                read: config.read_timeout(),
            },
        )?;

        Ok(Self {
            http,
            identity: Arc::new(SessionIdentity::generate()),
            api_key: config.api_key.clone(),
            secret: config.secret.clone(),
            region: config.region.clone(),
            platform: config.platform.clone(),
            throttle_wait: config.throttle_wait(),
            sleeper: Arc::new(TokioSleeper),
            cancel: CancellationToken::new(),
        })
    }

    /// Replaces the backoff sleeper.
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Replaces the session identity (e.g. to restore a known device).
    #[must_use]
    pub fn with_identity(mut self, identity: SessionIdentity) -> Self {
        self.identity = Arc::new(identity);
        self
    }

    #[must_use]
    pub fn identity(&self) -> &SessionIdentity {
        &self.identity
    }

    /// Token that aborts pending backoff sleeps and suppresses further sends.
    ///
    /// Cancelling is permanent for this client: every later request returns
    /// an empty object without touching the network. Build a new client to
    /// continue.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Signed GET returning the JSON object body, or an empty object.
    #[instrument(skip(self, headers), fields(method = "GET"))]
    pub async fn get_json(&self, url: &str, headers: &HeaderMap, max_attempts: u32) -> JsonObject {
        self.request_json(Method::GET, url, None, headers, max_attempts)
            .await
    }

    /// Signed form POST returning the JSON object body, or an empty object.
    #[instrument(skip(self, form, headers), fields(method = "POST"))]
    pub async fn post_form(
        &self,
        url: &str,
        form: &[(&str, &str)],
        headers: &HeaderMap,
        max_attempts: u32,
    ) -> JsonObject {
        self.request_json(Method::POST, url, Some(form), headers, max_attempts)
            .await
    }

    async fn request_json(
        &self,
        method: Method,
        url: &str,
        form: Option<&[(&str, &str)]>,
        headers: &HeaderMap,
        max_attempts: u32,
    ) -> JsonObject {
        let max_attempts = max_attempts.max(1);
        let mut attempt = 1;

        loop {
            if self.cancel.is_cancelled() {
                debug!(url, "request cancelled before send");
                return JsonObject::new();
            }

            let (status, body) = match self.send_once(&method, url, form, headers).await {
                Ok(response) => response,
                Err(error) => {
                    warn!(
                        url,
                        error = %error,
                        looks_permanent = error.looks_permanent(),
                        "request failed; treating as no data"
                    );
                    return JsonObject::new();
                }
            };

            let wait = match evaluate_response(status, &body, self.throttle_wait) {
                Evaluation::Done(object) => {
                    debug!(url, status, attempt, "response evaluated");
                    return object;
                }
                Evaluation::RetryAfter(wait) => wait,
            };

            if attempt >= max_attempts {
                warn!(url, attempt, max_attempts, "throttled; attempts exhausted");
                return JsonObject::new();
            }

            let delay = wait + jitter();
            debug!(
                url,
                attempt,
                next_attempt = attempt + 1,
                delay_ms = delay.as_millis(),
                "throttled; backing off"
            );
            tokio::select! {
                () = self.sleeper.sleep(delay) => {}
                () = self.cancel.cancelled() => {
                    debug!(url, "backoff cancelled");
                    return JsonObject::new();
                }
            }
            attempt += 1;
        }
    }

    async fn send_once(
        &self,
        method: &Method,
        url: &str,
        form: Option<&[(&str, &str)]>,
        extra: &HeaderMap,
    ) -> Result<(u16, String), ApiError> {
        let parsed = url::Url::parse(url).map_err(|_| ApiError::invalid_url(url))?;

        // Signed path must be exactly what goes on the wire; Url::path is always slash-prefixed.
        let signed = SignedRequest::new(parsed.path(), method.as_str(), &self.secret, &self.api_key);
        let context = HeaderContext {
            identity: &self.identity,
            api_key: &self.api_key,
            region: &self.region,
            platform: &self.platform,
        };
        let headers = headers::signed_headers(&context, &signed, extra)?;

        let mut request = self.http.request(method.clone(), parsed).headers(headers);
        if let Some(form) = form {
            request = request.form(form);
        }

        let response = request
            .send()
            .await
            .map_err(|source| ApiError::network(url, source))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|source| ApiError::network(url, source))?;
        Ok((status, body))
    }
}
