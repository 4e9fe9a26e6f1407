//! Comic API Core Library
//!
//! Client for a rate-limited, request-signing comic metadata API that is
//! served from several interchangeable hosts.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`signing`] - HMAC request signatures
//! - [`session`] - Per-client synthetic device identity
//! - [`auth`] - Cookie import and bearer token lookup
//! - [`client`] - Signed HTTP client with HTTP 210 throttle backoff
//! - [`host`] - Host discovery, memoization and failover bookkeeping
//! - [`combo`] - Ordered query-parameter combination fallback
//! - [`pages`] - Page ordering and image quality substitution
//! - [`models`] - Typed response payloads
//! - [`api`] - High-level operations tying it all together

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod auth;
pub mod client;
pub mod combo;
pub mod config;
pub mod host;
pub mod models;
pub mod pages;
pub mod session;
pub mod signing;
mod user_agent;

// Re-export commonly used types
pub use api::{CHAPTER_PAGE_SIZE, ComicApi};
pub use auth::{CredentialStore, MemoryCredentialStore, TokenStore, load_cookie_file};
pub use client::{ApiClient, ApiError, JsonObject, Sleeper, TokioSleeper};
pub use combo::{ComboFetcher, ComboHit, ComboList, Expect};
pub use config::{ClientConfig, ConfigError};
pub use host::HostResolver;
pub use models::{Chapter, ChapterGroup, ChapterPages, ComicDetails};
pub use pages::{OrderedPage, PageAssembler, RawContentItem};
pub use session::SessionIdentity;
pub use signing::{SignedRequest, sign};
