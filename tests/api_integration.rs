//! Integration tests for the high-level API: combo fallback, pagination,
//! page assembly and host failover.

use std::sync::Arc;

use comicapi_core::{ComicApi, MemoryCredentialStore};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod support;
use support::fixtures::{
    RecordingSleeper, chapters_payload, details_payload, host_of, no_data, test_config,
};
use support::socket_guard::{start_mock_server_or_skip, start_mock_servers_or_skip};

fn api_for(config: comicapi_core::ClientConfig) -> ComicApi {
    ComicApi::with_sleeper(config, Arc::new(MemoryCredentialStore::new()), RecordingSleeper::new())
        .unwrap()
}

#[tokio::test]
async fn test_details_falls_through_combos_in_order() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };

    Mock::given(path("/api/v3/comic2/12345"))
        .and(query_param("a", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(no_data()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(path("/api/v3/comic2/12345"))
        .and(query_param("a", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(details_payload("Blade")))
        .expect(1)
        .mount(&server)
        .await;

    let details = api_for(test_config(&server)).comic_details("12345").await.unwrap();
    assert_eq!(details.comic.name, "Blade");

    let requests = server.received_requests().await.unwrap();
    let queries: Vec<_> = requests.iter().map(|r| r.url.query().unwrap_or("").to_string()).collect();
    assert_eq!(queries, ["a=1", "a=2"]);
}

#[tokio::test]
async fn test_explicit_empty_stops_combos_and_failover() {
    let Some(servers) = start_mock_servers_or_skip(2).await else {
        return;
    };
    let (primary, fallback) = (&servers[0], &servers[1]);

    Mock::given(path("/api/v3/comic/12345/group/default/chapters"))
        .and(query_param("c", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"code": 200, "results": {"list": [], "total": 0}})),
        )
        .expect(1)
        .mount(primary)
        .await;
    Mock::given(query_param("c", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chapters_payload(0..1, 1)))
        .expect(0)
        .mount(primary)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chapters_payload(0..1, 1)))
        .expect(0)
        .mount(fallback)
        .await;

    let mut config = test_config(primary);
    config.fallback_hosts = vec![host_of(fallback)];
    let chapters = api_for(config).chapter_list("12345", "default").await;
    assert!(chapters.is_empty());
}

#[tokio::test]
async fn test_chapter_pagination_reuses_winning_combo() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let chapters_path = "/api/v3/comic/12345/group/default/chapters";

    Mock::given(path(chapters_path))
        .and(query_param("offset", "0"))
        .and(query_param("c", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(no_data()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(path(chapters_path))
        .and(query_param("offset", "0"))
        .and(query_param("c", "2"))
        .and(query_param("limit", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chapters_payload(0..100, 150)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(path(chapters_path))
        .and(query_param("offset", "100"))
        .and(query_param("c", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chapters_payload(100..150, 150)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(path(chapters_path))
        .and(query_param("offset", "100"))
        .and(query_param("c", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(no_data()))
        .expect(0)
        .mount(&server)
        .await;

    let chapters = api_for(test_config(&server)).chapter_list("12345", "default").await;
    assert_eq!(chapters.len(), 150);
    assert_eq!(chapters[0].uuid, "ch-0");
    assert_eq!(chapters[149].uuid, "ch-149");
}

#[tokio::test]
async fn test_all_chapters_walks_every_group() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };

    Mock::given(path("/api/v3/comic2/12345"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200,
            "results": {
                "comic": {"name": "Blade"},
                "groups": {
                    "default": {"path_word": "default", "count": 2},
                    "tankobon": {"path_word": "tankobon", "count": 1}
                }
            }
        })))
        .mount(&server)
        .await;
    Mock::given(path("/api/v3/comic/12345/group/default/chapters"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chapters_payload(0..2, 2)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(path("/api/v3/comic/12345/group/tankobon/chapters"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chapters_payload(7..8, 1)))
        .expect(1)
        .mount(&server)
        .await;

    let chapters = api_for(test_config(&server)).all_chapters("12345").await;
    let uuids: Vec<&str> = chapters.iter().map(|c| c.uuid.as_str()).collect();
    assert_eq!(uuids, ["ch-0", "ch-1", "ch-7"]);
}

#[tokio::test]
async fn test_chapter_pages_are_ordered_and_signed_urls_untouched() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };

    Mock::given(path("/api/v3/comic/blade/chapter2/ch-1"))
        .and(query_param("a", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200,
            "results": {
                "chapter": {
                    "uuid": "ch-1",
                    "name": "第1話",
                    "contents": [
                        {"url": "https://img.example.test/p0/c800x.webp"},
                        {"url": "https://img.example.test/p1/c800x.webp?token=abc"},
                        {"url": "https://img.example.test/p2/c800x.webp"}
                    ],
                    "words": [2, 0, 1]
                }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = test_config(&server);
    config.image_quality = Some(1500);
    let pages = api_for(config).chapter_pages("blade", "ch-1").await.unwrap();

    let urls: Vec<&str> = pages.pages.iter().map(|p| p.url.as_str()).collect();
    assert_eq!(
        urls,
        [
            "https://img.example.test/p1/c800x.webp?token=abc",
            "https://img.example.test/p2/c1500x.webp",
            "https://img.example.test/p0/c1500x.webp",
        ]
    );
}

fn chapter_payload(words: serde_json::Value) -> serde_json::Value {
    json!({
        "code": 200,
        "results": {
            "chapter": {
                "uuid": "ch-1",
                "name": "第1話",
                "contents": [
                    {"url": "https://img.example.test/p0.webp"},
                    {"url": "https://img.example.test/p1.webp"},
                    {"url": "https://img.example.test/p2.webp"}
                ],
                "words": words
            }
        }
    })
}

#[tokio::test]
async fn test_unusable_ordering_keeps_every_page_in_received_order() {
    for words in [json!(null), json!([2, "0", 1])] {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };

        Mock::given(path("/api/v3/comic/blade/chapter2/ch-1"))
            .and(query_param("a", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chapter_payload(words.clone())))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(query_param("a", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(no_data()))
            .expect(0)
            .mount(&server)
            .await;

        let pages = api_for(test_config(&server))
            .chapter_pages("blade", "ch-1")
            .await
            .unwrap_or_else(|| panic!("no pages for words={words}"));
        let urls: Vec<&str> = pages.pages.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(
            urls,
            [
                "https://img.example.test/p0.webp",
                "https://img.example.test/p1.webp",
                "https://img.example.test/p2.webp",
            ],
            "words={words}"
        );
    }
}

#[tokio::test]
async fn test_details_with_null_metadata_is_accepted_on_first_combo() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };

    Mock::given(path("/api/v3/comic2/12345"))
        .and(query_param("a", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200,
            "results": {
                "comic": {
                    "uuid": "c-uuid",
                    "name": "Blade",
                    "path_word": "12345",
                    "brief": null,
                    "cover": null,
                    "author": null,
                    "datetime_updated": null
                },
                "groups": null
            }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(query_param("a", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(details_payload("other")))
        .expect(0)
        .mount(&server)
        .await;

    let details = api_for(test_config(&server)).comic_details("12345").await.unwrap();
    assert_eq!(details.comic.name, "Blade");
    assert_eq!(details.comic.brief, "");
    assert_eq!(details.comic.cover, "");
    assert_eq!(details.group_path_words().count(), 0);
}

#[tokio::test]
async fn test_chapter_without_pages_is_an_answer() {
    let Some(servers) = start_mock_servers_or_skip(2).await else {
        return;
    };
    let (primary, fallback) = (&servers[0], &servers[1]);

    Mock::given(path("/api/v3/comic/blade/chapter2/ch-1"))
        .and(query_param("a", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200,
            "results": {"chapter": {"uuid": "ch-1", "name": "告知", "contents": [], "words": []}}
        })))
        .expect(1)
        .mount(primary)
        .await;
    Mock::given(query_param("a", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chapter_payload(json!([0, 1, 2]))))
        .expect(0)
        .mount(primary)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chapter_payload(json!([0, 1, 2]))))
        .expect(0)
        .mount(fallback)
        .await;

    let mut config = test_config(primary);
    config.fallback_hosts = vec![host_of(fallback)];
    let pages = api_for(config).chapter_pages("blade", "ch-1").await.unwrap();
    assert_eq!(pages.uuid, "ch-1");
    assert!(pages.pages.is_empty());
}

#[tokio::test]
async fn test_failover_promotes_working_host_and_discovers_once() {
    let Some(servers) = start_mock_servers_or_skip(3).await else {
        return;
    };
    let (primary, alt1, alt2) = (&servers[0], &servers[1], &servers[2]);

    Mock::given(path("/api/v3/system/network2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200,
            "results": {"api": [[host_of(primary)]]}
        })))
        .expect(1)
        .mount(primary)
        .await;
    // Primary and first alternate are broken: one request per combo per call.
    mount_broken(primary, 2).await;
    mount_broken(alt1, 2).await;
    Mock::given(path("/api/v3/comic2/12345"))
        .and(query_param("a", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(details_payload("Blade")))
        .expect(2)
        .mount(alt2)
        .await;

    let mut config = test_config(primary);
    config.discovery_url = Some(format!("{}/api/v3/system/network2", primary.uri()));
    config.fallback_hosts = vec![host_of(alt1), host_of(alt2)];
    let api = api_for(config);

    assert!(api.comic_details("12345").await.is_some());
    assert_eq!(api.hosts().active_host().as_deref(), Some(host_of(alt2).as_str()));

    // Second call goes straight to the promoted host.
    assert!(api.comic_details("12345").await.is_some());
    assert_eq!(api.hosts().active_host().as_deref(), Some(host_of(alt2).as_str()));
}

#[tokio::test]
async fn test_token_from_site_cookie_is_sent() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };

    Mock::given(path("/api/v3/comic2/12345"))
        .and(header("authorization", "Token secret-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(details_payload("Blade")))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryCredentialStore::new());
    store.set("www.example.test", "token", "secret-token");
    let api = ComicApi::with_sleeper(test_config(&server), store, RecordingSleeper::new()).unwrap();

    assert!(api.comic_details("12345").await.is_some());
}

async fn mount_broken(server: &MockServer, expected: u64) {
    Mock::given(path("/api/v3/comic2/12345"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
        .expect(expected)
        .mount(server)
        .await;
}
