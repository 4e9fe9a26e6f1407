//! High-level comic operations with host failover.
//!
//! Every operation resolves the active host, tries the endpoint's combo
//! list there, and on "no data" retries the whole operation on each
//! alternate host. The first alternate that answers is promoted so later
//! operations go straight to it.
//!
//! Nothing here returns an error once constructed: rate limiting, transport
//! failures and missing data all end in `None` or an empty `Vec`.

use std::future::Future;
use std::sync::Arc;

use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::auth::{CredentialStore, TokenStore, normalize_domain};
use crate::client::{ApiClient, ApiError, JsonObject, Sleeper, headers};
use crate::combo::{ComboFetcher, ComboList, Expect};
use crate::config::ClientConfig;
use crate::host::HostResolver;
use crate::models::{Chapter, ChapterListPage, ChapterPages, ComicDetails, RawChapter};
use crate::pages::{PageAssembler, RawContentItem};

/// Chapters requested per listing page.
pub const CHAPTER_PAGE_SIZE: usize = 100;

const DETAILS_EXPECT: Expect = Expect::NonEmptyObject {
    pointer: "/results/comic",
};
const CHAPTERS_EXPECT: Expect = Expect::NonEmptyArray {
    pointer: "/results/list",
    total_pointer: Some("/results/total"),
    empty_array_answers: false,
};
const PAGES_EXPECT: Expect = Expect::NonEmptyArray {
    pointer: "/results/chapter/contents",
    total_pointer: None,
    // A chapter object with an empty `contents` array really has no pages.
    empty_array_answers: true,
};

#[derive(Debug, Clone)]
struct EndpointCombos {
    details: ComboList,
    chapters: ComboList,
    pages: ComboList,
}

/// Entry point for fetching comic metadata, chapter lists and page URLs.
#[derive(Debug)]
pub struct ComicApi {
    config: ClientConfig,
    client: ApiClient,
    hosts: HostResolver,
    fetcher: ComboFetcher,
    tokens: TokenStore,
    combos: EndpointCombos,
    assembler: PageAssembler,
}

impl ComicApi {
    /// Builds the API from configuration and a credential store.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Config`] when the configuration is invalid and
    /// [`ApiError::ClientBuild`] when the HTTP client cannot be built.
    pub fn new(config: ClientConfig, store: Arc<dyn CredentialStore>) -> Result<Self, ApiError> {
        config.validate()?;
        let client = ApiClient::new(&config)?;
        Self::from_client(config, store, client)
    }

    /// Like [`ComicApi::new`] with a custom backoff sleeper.
    ///
    /// # Errors
    ///
    /// Same as [`ComicApi::new`].
    pub fn with_sleeper(
        config: ClientConfig,
        store: Arc<dyn CredentialStore>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Result<Self, ApiError> {
        config.validate()?;
        let client = ApiClient::new(&config)?.with_sleeper(sleeper);
        Self::from_client(config, store, client)
    }

    fn from_client(
        config: ClientConfig,
        store: Arc<dyn CredentialStore>,
        client: ApiClient,
    ) -> Result<Self, ApiError> {
        let combos = EndpointCombos {
            details: ComboList::new(config.combos.details.clone())
                .map_err(|e| e.for_field("combos.details"))?,
            chapters: ComboList::new(config.combos.chapters.clone())
                .map_err(|e| e.for_field("combos.chapters"))?,
            pages: ComboList::new(config.combos.pages.clone())
                .map_err(|e| e.for_field("combos.pages"))?,
        };

        Ok(Self {
            hosts: HostResolver::new(client.clone(), &config),
            fetcher: ComboFetcher::new(client.clone(), config.max_attempts),
            tokens: TokenStore::with_names(store, config.token_cookie_names.clone()),
            assembler: PageAssembler::new(config.image_quality),
            combos,
            client,
            config,
        })
    }

    #[must_use]
    pub fn hosts(&self) -> &HostResolver {
        &self.hosts
    }

    #[must_use]
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Cancels pending backoff sleeps; in-flight operations return empty.
    ///
    /// The token cannot be reset. Once cancelled, this `ComicApi` answers
    /// every call with `None` or an empty list and sends nothing, so a caller
    /// that wants to resume must construct a new one.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.client.cancellation_token()
    }

    /// Comic metadata and its chapter groups.
    #[instrument(skip(self))]
    pub async fn comic_details(&self, comic_id: &str) -> Option<ComicDetails> {
        self.with_failover("comic_details", |host| async move {
            self.details_on(&host, comic_id).await
        })
        .await
    }

    /// Every chapter of one group, across all listing pages.
    ///
    /// An explicit empty answer returns an empty list without failover. If a
    /// later page fails, the chapters gathered so far are returned.
    #[instrument(skip(self))]
    pub async fn chapter_list(&self, comic_id: &str, group: &str) -> Vec<Chapter> {
        self.with_failover("chapter_list", |host| async move {
            self.chapters_on(&host, comic_id, group).await
        })
        .await
        .unwrap_or_default()
    }

    /// Chapters of every group listed in the comic's details.
    #[instrument(skip(self))]
    pub async fn all_chapters(&self, comic_id: &str) -> Vec<Chapter> {
        let Some(details) = self.comic_details(comic_id).await else {
            return Vec::new();
        };

        let mut chapters = Vec::new();
        for group in details.group_path_words() {
            let listed = self.chapter_list(comic_id, group).await;
            debug!(group, count = listed.len(), "listed group chapters");
            chapters.extend(listed);
        }
        chapters
    }

    /// Page URLs of one chapter in display order.
    #[instrument(skip(self))]
    pub async fn chapter_pages(&self, branch: &str, chapter_id: &str) -> Option<ChapterPages> {
        self.with_failover("chapter_pages", |host| async move {
            self.pages_on(&host, branch, chapter_id).await
        })
        .await
    }

    /// Runs `attempt` on the active host, then on each alternate until one returns data.
    async fn with_failover<T, F, Fut>(&self, operation: &'static str, mut attempt: F) -> Option<T>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Option<T>>,
    {
        let primary = self.hosts.resolve_api_host().await;
        if let Some(result) = attempt(primary.to_string()).await {
            return Some(result);
        }

        for host in self.hosts.alternates(&primary) {
            if self.client.cancellation_token().is_cancelled() {
                return None;
            }
            debug!(operation, host = %host, failed = %primary, "trying alternate host");
            if let Some(result) = attempt(host.clone()).await {
                info!(operation, host = %host, "alternate host answered");
                self.hosts.promote(&host);
                return Some(result);
            }
        }

        warn!(operation, "no host returned data");
        None
    }

    fn auth_headers_for(&self, host: &str) -> HeaderMap {
        let token = self
            .tokens
            .resolve_token(&normalize_domain(host), &self.config.site_domain);
        headers::auth_headers(token.as_deref())
    }

    async fn details_on(&self, host: &str, comic_id: &str) -> Option<ComicDetails> {
        let url = format!(
            "{}/api/v3/comic2/{}",
            self.config.base_url(host),
            urlencoding::encode(comic_id)
        );
        let hit = self
            .fetcher
            .fetch_with_fallback_params(
                &url,
                &self.combos.details,
                &self.auth_headers_for(host),
                DETAILS_EXPECT,
            )
            .await?;
        decode_results(&hit.payload, "")
    }

    async fn chapters_on(&self, host: &str, comic_id: &str, group: &str) -> Option<Vec<Chapter>> {
        let base = format!(
            "{}/api/v3/comic/{}/group/{}/chapters",
            self.config.base_url(host),
            urlencoding::encode(comic_id),
            urlencoding::encode(group)
        );
        let headers = self.auth_headers_for(host);
        let mut combos = self.combos.chapters.clone();
        let mut chapters: Vec<Chapter> = Vec::new();

        loop {
            let offset = chapters.len();
            let url = format!("{base}?limit={CHAPTER_PAGE_SIZE}&offset={offset}");
            let Some(hit) = self
                .fetcher
                .fetch_with_fallback_params(&url, &combos, &headers, CHAPTERS_EXPECT)
                .await
            else {
                if offset == 0 {
                    return None;
                }
                warn!(offset, "chapter page failed; returning partial list");
                return Some(chapters);
            };

            if hit.explicit_empty {
                return Some(chapters);
            }
            combos = combos.prioritized(&hit.suffix);

            let Some(page) = decode_results::<ChapterListPage>(&hit.payload, "") else {
                return (offset > 0).then_some(chapters);
            };
            let received = page.list.len();
            chapters.extend(page.list);

            // Some lines omit `total`; a short page still ends the listing.
            let total = usize::try_from(page.total).unwrap_or(usize::MAX);
            if received < CHAPTER_PAGE_SIZE || (total > 0 && chapters.len() >= total) {
                debug!(count = chapters.len(), total, "chapter listing complete");
                return Some(chapters);
            }
        }
    }

    async fn pages_on(&self, host: &str, branch: &str, chapter_id: &str) -> Option<ChapterPages> {
        let url = format!(
            "{}/api/v3/comic/{}/chapter2/{}",
            self.config.base_url(host),
            urlencoding::encode(branch),
            urlencoding::encode(chapter_id)
        );
        let hit = self
            .fetcher
            .fetch_with_fallback_params(
                &url,
                &self.combos.pages,
                &self.auth_headers_for(host),
                PAGES_EXPECT,
            )
            .await?;
        let chapter: RawChapter = decode_results(&hit.payload, "/chapter")?;

        let contents: Vec<RawContentItem> = chapter
            .contents
            .into_iter()
            .map(|content| RawContentItem::new(content.url))
            .collect();
        Some(ChapterPages {
            uuid: chapter.uuid,
            name: chapter.name,
            pages: self.assembler.assemble(&contents, &chapter.words),
        })
    }
}

/// Deserializes `results` (or a pointer below it) from a response envelope.
fn decode_results<T: DeserializeOwned>(payload: &JsonObject, pointer: &str) -> Option<T> {
    let value = payload.get("results")?;
    let value = if pointer.is_empty() {
        value
    } else {
        value.pointer(pointer)?
    };
    match T::deserialize(value) {
        Ok(decoded) => Some(decoded),
        Err(error) => {
            warn!(error = %error, "unexpected response shape");
            None
        }
    }
}
