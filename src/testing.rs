//! Scripted [`HttpClient`] and fixtures for pipeline tests.

use crate::config::Config;
use crate::error::{MinerError, Result};
use crate::http::{HttpClient, HttpResponse};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

pub const TOP_URL: &str = "https://hn.test/v0/topstories.json";
pub const UPLOAD_URL: &str = "https://ingest.test/stories";

pub fn item_url(id: u64) -> String {
    format!("https://hn.test/v0/item/{id}.json")
}

/// Configuration pointing at the fake hosts with the ledger under `dir`.
pub fn test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.source.name = "HN".to_string();
    config.source.base = "https://hn.test/v0/".to_string();
    config.upload.url = UPLOAD_URL.to_string();
    config.request.retries = 3;
    config.request.interval_secs = 60;
    config.ledger.dir = dir.join("ledger");
    config
}

#[derive(Debug, Clone)]
enum Reply {
    Status(u16, String),
    Down,
}

/// Answers from a fixed route table and records every request.
///
/// Unknown URLs behave like an unreachable host.
#[derive(Debug, Default)]
pub struct FakeClient {
    routes: Mutex<HashMap<String, Reply>>,
    gets: Mutex<Vec<String>>,
    posts: Mutex<Vec<(String, serde_json::Value)>>,
}

impl FakeClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, url: &str, status: u16, body: &str) -> Self {
        self.set(url, status, body);
        self
    }

    pub fn set(&self, url: &str, status: u16, body: &str) {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), Reply::Status(status, body.to_string()));
    }

    pub fn set_down(&self, url: &str) {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), Reply::Down);
    }

    pub fn gets(&self) -> Vec<String> {
        self.gets.lock().unwrap().clone()
    }

    pub fn get_count(&self, url: &str) -> usize {
        self.gets.lock().unwrap().iter().filter(|u| *u == url).count()
    }

    pub fn posts(&self) -> Vec<(String, serde_json::Value)> {
        self.posts.lock().unwrap().clone()
    }

    fn reply(&self, url: &str) -> Result<HttpResponse> {
        match self.routes.lock().unwrap().get(url).cloned() {
            Some(Reply::Status(status, body)) => Ok(HttpResponse { status, body }),
            Some(Reply::Down) | None => Err(MinerError::Transport {
                url: url.to_string(),
                message: "connection refused".to_string(),
            }),
        }
    }
}

impl HttpClient for FakeClient {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        self.gets.lock().unwrap().push(url.to_string());
        self.reply(url)
    }

    async fn post_json<T>(&self, url: &str, body: &T) -> Result<HttpResponse>
    where
        T: Serialize + ?Sized,
    {
        let value = serde_json::to_value(body).unwrap();
        self.posts.lock().unwrap().push((url.to_string(), value));
        self.reply(url)
    }
}
