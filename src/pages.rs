//! Page ordering and image quality substitution.
//!
//! The chapter endpoint returns page URLs in one array and their display
//! positions in a second, independently indexed array. [`PageAssembler`]
//! merges the two, and falls back to the received order whenever the
//! ordering array does not describe a complete permutation. Pages are never
//! dropped because of a broken ordering array.
//!
//! # Example
//!
//! ```
//! use comicapi_core::pages::{PageAssembler, RawContentItem};
//!
//! let contents: Vec<RawContentItem> = ["u0", "u1", "u2"].into_iter().map(RawContentItem::new).collect();
//! let pages = PageAssembler::new(None).assemble(&contents, &[2, 0, 1]);
//! let urls: Vec<&str> = pages.iter().map(|p| p.url.as_str()).collect();
//! assert_eq!(urls, ["u1", "u2", "u0"]);
//! ```

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

#[allow(clippy::expect_used)]
static QUALITY_TOKEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"c(\d+)x\.([A-Za-z0-9]+)$").expect("quality token regex is valid") // Static pattern, safe to panic
});

/// Query keys and path fragments that indicate a signed or tokenized URL.
const AUTH_MARKERS: [&str; 7] = [
    "token",
    "sign",
    "auth=",
    "expires=",
    "x-amz-",
    "policy=",
    "key-pair-id=",
];

/// A page URL as received from the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawContentItem {
    pub url: String,
    /// Derived from the URL; rewriting such URLs would break their signature.
    pub may_have_embedded_auth: bool,
}

impl RawContentItem {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        let may_have_embedded_auth = has_auth_markers(&url);
        Self {
            url,
            may_have_embedded_auth,
        }
    }
}

/// Whether a URL carries something that looks like a token or signature.
#[must_use]
pub fn has_auth_markers(url: &str) -> bool {
    let lowered = url.to_ascii_lowercase();
    AUTH_MARKERS.iter().any(|marker| lowered.contains(marker))
}

/// A page in final display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderedPage {
    pub index: usize,
    pub url: String,
}

/// Orders chapter pages and optionally upgrades their image quality.
#[derive(Debug, Clone, Copy, Default)]
pub struct PageAssembler {
    preferred_quality: Option<u32>,
}

impl PageAssembler {
    /// `preferred_quality` is the `c<N>x` tier to request; `None` keeps URLs as received.
    #[must_use]
    pub fn new(preferred_quality: Option<u32>) -> Self {
        Self { preferred_quality }
    }

    /// Places `contents[i]` at display slot `order[i]`.
    ///
    /// Missing `order` entries default to `i`. Out-of-range or duplicate
    /// targets leave a gap, and any gap makes the whole chapter fall back to
    /// the received order.
    #[must_use]
    pub fn assemble(&self, contents: &[RawContentItem], order: &[i64]) -> Vec<OrderedPage> {
        let mut slots: Vec<Option<&RawContentItem>> = vec![None; contents.len()];

        for (i, item) in contents.iter().enumerate() {
            let target = order.get(i).map_or(Ok(i), |&target| usize::try_from(target));
            if let Some(slot) = target.ok().and_then(|target| slots.get_mut(target)) {
                *slot = Some(item);
            }
        }

        let ordered: Option<Vec<&RawContentItem>> = slots.into_iter().collect();
        let items: Vec<&RawContentItem> = match ordered {
            Some(items) => items,
            None => {
                warn!(
                    pages = contents.len(),
                    order_len = order.len(),
                    "ordering array is inconsistent; keeping received order"
                );
                contents.iter().collect()
            }
        };

        items
            .into_iter()
            .enumerate()
            .map(|(index, item)| OrderedPage {
                index,
                url: self.substitute_quality(item),
            })
            .collect()
    }

    /// Rewrites a trailing `c<N>x.<ext>` token to the preferred tier.
    ///
    /// URLs with auth markers are returned unchanged.
    #[must_use]
    pub fn substitute_quality(&self, item: &RawContentItem) -> String {
        let Some(quality) = self.preferred_quality else {
            return item.url.clone();
        };
        if item.may_have_embedded_auth {
            debug!("skipping quality substitution for signed URL");
            return item.url.clone();
        }

        let (path, query) = match item.url.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (item.url.as_str(), None),
        };
        let replacement = format!("c{quality}x.$2");
        let rewritten = QUALITY_TOKEN_PATTERN.replace(path, replacement.as_str());
        match query {
            Some(query) => format!("{rewritten}?{query}"),
            None => rewritten.into_owned(),
        }
    }
}
