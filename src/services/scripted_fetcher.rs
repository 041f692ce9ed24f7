use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;

use super::page_fetcher::{FetchError, PageFetcher};

/// Canned-page fetcher for tests and offline runs. Unknown URLs answer 404.
#[derive(Default)]
pub struct ScriptedFetcher {
    pages: Mutex<HashMap<String, Result<String, u16>>>,
    calls: Mutex<Vec<String>>,
    call_count: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, url: &str, body: &str) -> Self {
        self.set_page(url, body);
        self
    }

    pub fn with_status(self, url: &str, status: u16) -> Self {
        self.set_status(url, status);
        self
    }

    pub fn set_page(&self, url: &str, body: &str) {
        if let Ok(mut pages) = self.pages.lock() {
            pages.insert(url.to_string(), Ok(body.to_string()));
        }
    }

    pub fn set_status(&self, url: &str, status: u16) {
        if let Ok(mut pages) = self.pages.lock() {
            pages.insert(url.to_string(), Err(status));
        }
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// URLs fetched so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn reset(&self) {
        self.call_count.store(0, Ordering::SeqCst);
        if let Ok(mut calls) = self.calls.lock() {
            calls.clear();
        }
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(url.to_string());
        }

        let page = self
            .pages
            .lock()
            .ok()
            .and_then(|pages| pages.get(url).cloned())
            .unwrap_or(Err(404));

        page.map_err(|status| FetchError::Status {
            url: url.to_string(),
            status,
        })
    }
}
