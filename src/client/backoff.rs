//! Classification of the backend's throttle responses.
//!
//! The backend signals "slow down" with HTTP 210 and a free-text message.
//! Whether to retry, and after how long, depends on that wording, so every
//! wording rule lives in [`classify_throttle`] and nowhere else.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use comicapi_core::client::{ThrottleVerdict, classify_throttle};
//!
//! assert_eq!(
//!     classify_throttle("Request was throttled. Expected available in 12 seconds."),
//!     ThrottleVerdict::WaitFor(Duration::from_secs(12))
//! );
//! assert_eq!(classify_throttle("server under maintenance"), ThrottleVerdict::NotThrottled);
//! ```

use std::fmt;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use regex::Regex;
use serde_json::Value;

/// Non-standard status the backend uses for rate limiting.
pub const THROTTLE_STATUS: u16 = 210;

/// Upper bound on a server-provided wait hint (10 minutes).
pub const MAX_THROTTLE_WAIT: Duration = Duration::from_secs(600);

const MAX_JITTER_MS: u64 = 500;

/// Maximum jitter added to throttle waits (500ms).
pub const MAX_JITTER: Duration = Duration::from_millis(MAX_JITTER_MS);

#[allow(clippy::expect_used)]
static WAIT_HINT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+)\s*seconds?").expect("wait hint regex is valid") // Static pattern, safe to panic
});

/// How a throttle-status message should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleVerdict {
    /// Rate limited with an explicit wait hint.
    WaitFor(Duration),
    /// Rate limited, but the wait could not be parsed.
    WaitDefault,
    /// Some other condition (maintenance, permanent restriction). Do not retry.
    NotThrottled,
}

/// Classifies the message of a throttle-status response.
#[must_use]
pub fn classify_throttle(message: &str) -> ThrottleVerdict {
    if let Some(seconds) = WAIT_HINT_PATTERN
        .captures(message)
        .and_then(|captures| captures.get(1))
        .and_then(|digits| digits.as_str().parse::<u64>().ok())
    {
        return ThrottleVerdict::WaitFor(Duration::from_secs(seconds).min(MAX_THROTTLE_WAIT));
    }

    let lowered = message.to_lowercase();
    if lowered.contains("seconds") || lowered.contains("available in") {
        ThrottleVerdict::WaitDefault
    } else {
        ThrottleVerdict::NotThrottled
    }
}

/// Extracts the human-readable message from a throttle response body.
///
/// Looks at `message`, `detail` and `results.detail` of a JSON body and falls
/// back to the raw text.
#[must_use]
pub fn throttle_message(body: &str) -> String {
    let Ok(json) = serde_json::from_str::<Value>(body) else {
        return body.to_string();
    };
    ["/message", "/detail", "/results/detail"]
        .iter()
        .find_map(|pointer| json.pointer(pointer).and_then(Value::as_str))
        .map_or_else(|| body.to_string(), ToString::to_string)
}

/// Random jitter between 0 and [`MAX_JITTER`].
#[must_use]
pub fn jitter() -> Duration {
    let jitter_ms = rand::thread_rng().gen_range(0..=MAX_JITTER_MS);
    Duration::from_millis(jitter_ms)
}

/// Suspends the calling operation during backoff.
///
/// Injectable so embedders can observe or shorten waits.
#[async_trait]
pub trait Sleeper: Send + Sync + fmt::Debug {
    async fn sleep(&self, duration: Duration);
}

/// [`Sleeper`] backed by the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
