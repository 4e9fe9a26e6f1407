#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use comicapi_core::config::ComboConfig;
use comicapi_core::{ClientConfig, Sleeper};
use serde_json::{Value, json};
use tokio::sync::Notify;
use wiremock::MockServer;

pub const API_KEY: &str = "test-api-key";
pub const SECRET: &str = "test-secret";

/// `host:port` of a mock server, as configured hosts are written.
pub fn host_of(server: &MockServer) -> String {
    server.address().to_string()
}

/// Plain-HTTP config pointed at `primary`, no discovery, no fallbacks.
pub fn test_config(primary: &MockServer) -> ClientConfig {
    ClientConfig {
        scheme: "http".into(),
        default_host: host_of(primary),
        fallback_hosts: Vec::new(),
        discovery_url: None,
        site_domain: "www.example.test".into(),
        api_key: API_KEY.into(),
        secret: SECRET.into(),
        max_attempts: 3,
        throttle_wait_secs: 40,
        connect_timeout_secs: 5,
        read_timeout_secs: 5,
        image_quality: None,
        combos: ComboConfig {
            details: vec!["?a=1".into(), "?a=2".into()],
            chapters: vec!["&c=1".into(), "&c=2".into()],
            pages: vec!["?a=1".into(), "?a=2".into()],
        },
        ..ClientConfig::default()
    }
}

/// Sleeper that returns immediately and remembers every requested delay.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}

/// Sleeper that never wakes; signals `entered` when a backoff begins.
#[derive(Debug, Default)]
pub struct StuckSleeper {
    pub entered: Notify,
}

#[async_trait]
impl Sleeper for StuckSleeper {
    async fn sleep(&self, _duration: Duration) {
        self.entered.notify_one();
        std::future::pending::<()>().await;
    }
}

pub fn throttled(message: &str) -> Value {
    json!({"code": 210, "message": message})
}

pub fn details_payload(name: &str) -> Value {
    json!({
        "code": 200,
        "message": "请求成功",
        "results": {
            "comic": {"uuid": "c-uuid", "name": name, "path_word": "12345"},
            "groups": {"default": {"path_word": "default", "name": "默認", "count": 1}}
        }
    })
}

pub fn chapters_payload(range: std::ops::Range<u64>, total: u64) -> Value {
    let list: Vec<Value> = range
        .map(|i| json!({"uuid": format!("ch-{i}"), "name": format!("第{i}話"), "index": i}))
        .collect();
    json!({"code": 200, "results": {"list": list, "total": total, "limit": 100}})
}

pub fn no_data() -> Value {
    json!({"code": 200, "results": {}})
}
