//! Credentials: cookie import, the credential store capability and token resolution.

mod cookies;
mod store;
mod token;

pub use cookies::{
    CookieError, CookieLine, ParseResult, load_cookie_file, load_cookies_into_store,
    parse_netscape_cookies,
};
pub use store::{CredentialStore, MemoryCredentialStore, normalize_domain};
pub use token::{DEFAULT_TOKEN_COOKIE_NAMES, TokenStore};
