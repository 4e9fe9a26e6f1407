//! Query-parameter combination fallback.
//!
//! Some endpoints only answer for a particular combination of query flags
//! (content line, platform generation) and which one works depends on region
//! and account state. [`ComboFetcher`] tries an ordered [`ComboList`] one
//! suffix at a time until a response has the expected shape.
//!
//! A response with `total = 0` means the server understood the request and
//! there is legitimately nothing there; the fallback stops instead of moving on.

use reqwest::header::HeaderMap;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::client::{ApiClient, JsonObject};
use crate::config::ConfigError;

/// Programmer errors in a combo list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComboError {
    #[error("combo list is empty")]
    Empty,

    #[error("combo suffix '{0}' must be empty or start with '?' or '&'")]
    MalformedSuffix(String),
}

impl ComboError {
    pub(crate) fn for_field(self, field: &'static str) -> ConfigError {
        ConfigError::invalid(field, self.to_string())
    }
}

/// Non-empty, ordered list of query-string suffixes. Earlier entries are preferred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComboList {
    suffixes: Vec<String>,
}

impl ComboList {
    /// Validates and wraps a suffix list.
    ///
    /// # Errors
    ///
    /// Returns [`ComboError`] for an empty list or a suffix that is neither
    /// empty nor starts with `?`/`&`.
    pub fn new(suffixes: Vec<String>) -> Result<Self, ComboError> {
        if suffixes.is_empty() {
            return Err(ComboError::Empty);
        }
        if let Some(bad) = suffixes
            .iter()
            .find(|s| !(s.is_empty() || s.starts_with('?') || s.starts_with('&')))
        {
            return Err(ComboError::MalformedSuffix(bad.clone()));
        }
        Ok(Self { suffixes })
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.suffixes.iter().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.suffixes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.suffixes.is_empty()
    }

    /// Same list with `first` moved to the front (if present).
    #[must_use]
    pub fn prioritized(&self, first: &str) -> Self {
        let mut suffixes = Vec::with_capacity(self.suffixes.len());
        if self.suffixes.iter().any(|s| s == first) {
            suffixes.push(first.to_string());
        }
        suffixes.extend(self.suffixes.iter().filter(|s| *s != first).cloned());
        Self { suffixes }
    }
}

/// Appends a combo suffix, using `&` when the base already carries a query.
#[must_use]
pub fn append_suffix(base_url: &str, suffix: &str) -> String {
    let Some(params) = suffix.strip_prefix(['?', '&']) else {
        return format!("{base_url}{suffix}");
    };
    if params.is_empty() {
        return base_url.to_string();
    }
    let separator = if base_url.contains('?') { '&' } else { '?' };
    format!("{base_url}{separator}{params}")
}

/// Shape a response must have for a combo to count as understood.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    /// Array at `pointer` must be non-empty. A `total` of zero at
    /// `total_pointer`, or an empty array when `empty_array_answers` is set,
    /// is an explicit empty answer.
    NonEmptyArray {
        pointer: &'static str,
        total_pointer: Option<&'static str>,
        empty_array_answers: bool,
    },
    /// Object at `pointer` must be non-empty.
    NonEmptyObject { pointer: &'static str },
}

/// What a single combo response means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Data,
    ExplicitEmpty,
    Mismatch,
}

/// Classifies a response payload against the expected shape.
#[must_use]
pub fn classify(payload: &JsonObject, expect: Expect) -> Verdict {
    match expect {
        Expect::NonEmptyArray {
            pointer,
            total_pointer,
            empty_array_answers,
        } => {
            match lookup(payload, pointer).and_then(Value::as_array) {
                Some(items) if !items.is_empty() => return Verdict::Data,
                Some(_) if empty_array_answers => return Verdict::ExplicitEmpty,
                _ => {}
            }
            if total_pointer
                .and_then(|total| lookup(payload, total))
                .and_then(Value::as_i64)
                .is_some_and(|total| total == 0)
            {
                return Verdict::ExplicitEmpty;
            }
            Verdict::Mismatch
        }
        Expect::NonEmptyObject { pointer } => {
            if lookup(payload, pointer)
                .and_then(Value::as_object)
                .is_some_and(|object| !object.is_empty())
            {
                Verdict::Data
            } else {
                Verdict::Mismatch
            }
        }
    }
}

/// JSON-pointer lookup on a top-level object.
fn lookup<'a>(payload: &'a JsonObject, pointer: &str) -> Option<&'a Value> {
    let mut parts = pointer.trim_start_matches('/').splitn(2, '/');
    let root = payload.get(parts.next()?)?;
    match parts.next() {
        Some(rest) => root.pointer(&format!("/{rest}")),
        None => Some(root),
    }
}

/// A combo that produced a definitive answer.
#[derive(Debug, Clone, PartialEq)]
pub struct ComboHit {
    /// Suffix that worked; reuse it first on follow-up requests.
    pub suffix: String,
    pub payload: JsonObject,
    /// `true` when the server explicitly answered "nothing here".
    pub explicit_empty: bool,
}

/// Sequential combo fallback over an [`ApiClient`].
#[derive(Debug, Clone)]
pub struct ComboFetcher {
    client: ApiClient,
    max_attempts: u32,
}

impl ComboFetcher {
    #[must_use]
    pub fn new(client: ApiClient, max_attempts: u32) -> Self {
        Self {
            client,
            max_attempts,
        }
    }

    /// Tries each suffix in order until one yields data or an explicit empty answer.
    ///
    /// Combo `n + 1` is never sent before combo `n` has been fully evaluated.
    /// Returns `None` once every combo has been tried without a definitive answer.
    #[instrument(skip(self, combos, headers), fields(combos = combos.len()))]
    pub async fn fetch_with_fallback_params(
        &self,
        base_url: &str,
        combos: &ComboList,
        headers: &HeaderMap,
        expect: Expect,
    ) -> Option<ComboHit> {
        for suffix in combos.iter() {
            let url = append_suffix(base_url, suffix);
            let payload = self.client.get_json(&url, headers, self.max_attempts).await;

            match classify(&payload, expect) {
                Verdict::Data => {
                    debug!(suffix, "combo returned data");
                    return Some(ComboHit {
                        suffix: suffix.to_string(),
                        payload,
                        explicit_empty: false,
                    });
                }
                Verdict::ExplicitEmpty => {
                    debug!(suffix, "combo returned explicit empty result");
                    return Some(ComboHit {
                        suffix: suffix.to_string(),
                        payload,
                        explicit_empty: true,
                    });
                }
                Verdict::Mismatch => debug!(suffix, "combo did not match; trying next"),
            }
        }

        debug!(base_url, "all combos exhausted without data");
        None
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn object(value: Value) -> JsonObject {
        match value {
            Value::Object(object) => object,
            _ => panic!("expected object"),
        }
    }

    const LIST: Expect = Expect::NonEmptyArray {
        pointer: "/results/list",
        total_pointer: Some("/results/total"),
        empty_array_answers: false,
    };

    #[test]
    fn test_combo_list_rejects_empty_and_malformed() {
        assert_eq!(ComboList::new(vec![]), Err(ComboError::Empty));
        assert_eq!(
            ComboList::new(vec!["?a=1".into(), "b=2".into()]),
            Err(ComboError::MalformedSuffix("b=2".into()))
        );
        assert!(ComboList::new(vec!["".into(), "&a=1".into()]).is_ok());
    }

    #[test]
    fn test_prioritized_moves_winner_first() {
        let list = ComboList::new(vec!["?a".into(), "?b".into(), "?c".into()]).unwrap();
        let reordered: Vec<String> = list.prioritized("?c").iter().map(str::to_string).collect();
        assert_eq!(reordered, vec!["?c", "?a", "?b"]);
        assert_eq!(list.prioritized("?zzz"), list);
    }

    #[test]
    fn test_append_suffix_picks_separator() {
        assert_eq!(append_suffix("https://h/p", "?a=1"), "https://h/p?a=1");
        assert_eq!(append_suffix("https://h/p?limit=100", "?a=1"), "https://h/p?limit=100&a=1");
        assert_eq!(append_suffix("https://h/p?limit=100", "&a=1"), "https://h/p?limit=100&a=1");
        assert_eq!(append_suffix("https://h/p", "&a=1"), "https://h/p?a=1");
        assert_eq!(append_suffix("https://h/p", ""), "https://h/p");
        assert_eq!(append_suffix("https://h/p", "?"), "https://h/p");
    }

    #[test]
    fn test_classify_non_empty_list_is_data() {
        let payload = object(json!({"results": {"list": [{"uuid": "a"}], "total": 1}}));
        assert_eq!(classify(&payload, LIST), Verdict::Data);
    }

    #[test]
    fn test_classify_total_zero_is_explicit_empty() {
        let payload = object(json!({"results": {"list": [], "total": 0}}));
        assert_eq!(classify(&payload, LIST), Verdict::ExplicitEmpty);
    }

    #[test]
    fn test_classify_missing_or_malformed_is_mismatch() {
        assert_eq!(classify(&JsonObject::new(), LIST), Verdict::Mismatch);
        let payload = object(json!({"results": {"list": "oops"}}));
        assert_eq!(classify(&payload, LIST), Verdict::Mismatch);
        let payload = object(json!({"results": {"list": [], "total": 5}}));
        assert_eq!(classify(&payload, LIST), Verdict::Mismatch);
    }

    #[test]
    fn test_empty_array_counts_as_answer_when_enabled() {
        let expect = Expect::NonEmptyArray {
            pointer: "/results/chapter/contents",
            total_pointer: None,
            empty_array_answers: true,
        };
        let payload = object(json!({"results": {"chapter": {"contents": []}}}));
        assert_eq!(classify(&payload, expect), Verdict::ExplicitEmpty);
        let payload = object(json!({"results": {"chapter": {"contents": null}}}));
        assert_eq!(classify(&payload, expect), Verdict::Mismatch);
        assert_eq!(classify(&JsonObject::new(), expect), Verdict::Mismatch);
        // Without the flag an empty list is still a mismatch.
        let payload = object(json!({"results": {"list": []}}));
        assert_eq!(classify(&payload, LIST), Verdict::Mismatch);
    }

    #[test]
    fn test_classify_object_expectation() {
        let expect = Expect::NonEmptyObject {
            pointer: "/results/comic",
        };
        let payload = object(json!({"results": {"comic": {"name": "x"}}}));
        assert_eq!(classify(&payload, expect), Verdict::Data);
        let payload = object(json!({"results": {"comic": {}}}));
        assert_eq!(classify(&payload, expect), Verdict::Mismatch);
    }
}
