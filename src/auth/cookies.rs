//! Netscape cookie file import.
//!
//! Browser-exported cookie files (7 TAB-separated fields per line) are the
//! usual way to hand an already logged-in session to the client. Parsed
//! cookies are loaded into a [`MemoryCredentialStore`], where the token store
//! picks up the bearer token.

use std::fmt;
use std::io::BufRead;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, instrument, warn};

use super::MemoryCredentialStore;

/// A single cookie parsed from a Netscape-format file.
///
/// The value is redacted in Debug output.
#[derive(Clone)]
pub struct CookieLine {
    /// Cookie domain as written in the file (may start with `.`).
    pub domain: String,
    /// Cookie name.
    pub name: String,
    /// Unix timestamp for expiry (0 = session cookie).
    pub expires: u64,
    value: String,
}

impl CookieLine {
    #[must_use]
    pub fn new(domain: String, name: String, expires: u64, value: String) -> Self {
        Self {
            domain,
            name,
            expires,
            value,
        }
    }

    /// Returns the cookie value. Never log it.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Whether the cookie has a non-zero expiry before `now` (unix seconds).
    #[must_use]
    pub fn is_expired_at(&self, now: u64) -> bool {
        self.expires != 0 && self.expires < now
    }
}

impl fmt::Debug for CookieLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieLine")
            .field("domain", &self.domain)
            .field("name", &self.name)
            .field("expires", &self.expires)
            .field("value", &"[REDACTED]")
            .finish()
    }
}

/// Errors raised while reading a cookie file.
#[derive(Debug, thiserror::Error)]
pub enum CookieError {
    /// A line does not follow the Netscape format.
    #[error("line {line_number}: {reason}")]
    InvalidLine {
        /// 1-based line number.
        line_number: usize,
        /// What was wrong with the line.
        reason: String,
    },

    /// The cookie file could not be read.
    #[error("failed to read cookie file: {0}")]
    Io(#[from] std::io::Error),

    /// A non-empty file produced no usable cookie.
    #[error("no valid cookies found in file ({malformed_count} lines failed to parse)")]
    NoCookiesFound {
        /// Number of malformed lines encountered.
        malformed_count: usize,
    },
}

/// Cookies parsed from a file plus the malformed lines that were skipped.
#[derive(Debug)]
pub struct ParseResult {
    pub cookies: Vec<CookieLine>,
    pub warnings: Vec<(usize, String)>,
}

/// Parses a Netscape-format cookie file.
///
/// Comment and blank lines are skipped; `#HttpOnly_` lines are cookies.
/// Malformed lines are collected as warnings.
///
/// # Errors
///
/// Returns [`CookieError::Io`] on read failure, or
/// [`CookieError::NoCookiesFound`] when data lines exist but none parse.
#[instrument(level = "debug", skip(reader))]
pub fn parse_netscape_cookies(reader: impl BufRead) -> Result<ParseResult, CookieError> {
    let mut cookies = Vec::new();
    let mut warnings = Vec::new();
    let mut data_lines = 0;

    for (idx, line_result) in reader.lines().enumerate() {
        let line_number = idx + 1;
        let line = line_result?;
        let line = line.trim_end();

        // curl and browser exporters mark HttpOnly cookies with this prefix.
        let line = line.strip_prefix("#HttpOnly_").unwrap_or(line);
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        data_lines += 1;

        match parse_cookie_line(line, line_number) {
            Ok(cookie) => {
                debug!(line = line_number, domain = %cookie.domain, name = %cookie.name, "parsed cookie");
                cookies.push(cookie);
            }
            Err(e) => {
                warn!(line = line_number, reason = %e, "skipping malformed cookie line");
                warnings.push((line_number, e.to_string()));
            }
        }
    }

    if cookies.is_empty() && data_lines > 0 {
        return Err(CookieError::NoCookiesFound {
            malformed_count: warnings.len(),
        });
    }

    Ok(ParseResult { cookies, warnings })
}

fn parse_cookie_line(line: &str, line_number: usize) -> Result<CookieLine, CookieError> {
    let fields: Vec<&str> = line.split('\t').collect();
    let invalid = |reason: String| CookieError::InvalidLine {
        line_number,
        reason,
    };

    if fields.len() != 7 {
        return Err(invalid(format!(
            "expected 7 TAB-separated fields, found {}",
            fields.len()
        )));
    }

    for (index, name) in [(1, "tailmatch"), (3, "secure")] {
        if !matches!(fields[index], "TRUE" | "FALSE") {
            return Err(invalid(format!(
                "{name} field must be TRUE or FALSE, got '{}'",
                fields[index]
            )));
        }
    }

    let expires = fields[4].parse::<u64>().map_err(|_| {
        invalid(format!(
            "expires field must be a non-negative integer, got '{}'",
            fields[4]
        ))
    })?;

    if fields[0].is_empty() {
        return Err(invalid("domain field is empty".to_string()));
    }
    if fields[5].is_empty() {
        return Err(invalid("cookie name field is empty".to_string()));
    }

    Ok(CookieLine::new(
        fields[0].to_string(),
        fields[5].to_string(),
        expires,
        fields[6].to_string(),
    ))
}

/// Loads unexpired cookies into the credential store and returns how many were stored.
#[instrument(level = "debug", skip(cookies, store))]
pub fn load_cookies_into_store(cookies: &[CookieLine], store: &MemoryCredentialStore) -> usize {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default();

    let mut loaded = 0;
    for cookie in cookies {
        if cookie.is_expired_at(now) {
            debug!(domain = %cookie.domain, name = %cookie.name, "skipping expired cookie");
            continue;
        }
        store.set(&cookie.domain, &cookie.name, cookie.value());
        loaded += 1;
    }
    loaded
}

/// Reads a cookie file from disk into a fresh credential store.
///
/// # Errors
///
/// Returns [`CookieError`] when the file cannot be read or holds no valid cookie.
pub fn load_cookie_file(path: &Path) -> Result<MemoryCredentialStore, CookieError> {
    let file = std::fs::File::open(path)?;
    let parsed = parse_netscape_cookies(std::io::BufReader::new(file))?;
    let store = MemoryCredentialStore::new();
    let loaded = load_cookies_into_store(&parsed.cookies, &store);
    debug!(
        loaded,
        skipped = parsed.warnings.len(),
        path = %path.display(),
        "loaded cookie file"
    );
    Ok(store)
}
