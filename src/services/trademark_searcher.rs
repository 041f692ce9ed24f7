use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use futures::{stream, StreamExt};
use itertools::Itertools;
use tokio::sync::Mutex;

use crate::{
    dal::{
        blob_store::BlobStore,
        name_cache_db::{load_detail_cache, save_detail_cache},
    },
    domain::{detail_record::DetailRecord, search_result::SearchResult},
};

use super::{
    detail_parser::parse_detail,
    link_extractor::extract_detail_links,
    page_fetcher::{FetchError, PageFetcher},
    registry::Registry,
};

const LOCK_REGISTRY_PRUNE_LEN: usize = 10_000;

/// Checks names against the registry: search page, detail pages, per-name
/// cache, risk score.
pub struct TrademarkSearcher {
    registry: Registry,
    fetcher: Arc<dyn PageFetcher>,
    store: Arc<dyn BlobStore>,
    detail_concurrency: usize,
    name_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl TrademarkSearcher {
    pub fn new(
        registry: Registry,
        fetcher: Arc<dyn PageFetcher>,
        store: Arc<dyn BlobStore>,
        detail_concurrency: usize,
    ) -> Self {
        TrademarkSearcher {
            registry,
            fetcher,
            store,
            detail_concurrency: detail_concurrency.max(1),
            name_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Processes each distinct, non-blank name in turn. A failing name never
    /// stops the others.
    pub async fn process_batch<I, S>(&self, names: I) -> BTreeMap<String, SearchResult>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names: Vec<String> = names
            .into_iter()
            .map(|name| name.as_ref().trim().to_string())
            .filter(|name| !name.is_empty())
            .unique()
            .collect();

        let mut results = BTreeMap::new();
        for name in names {
            let result = self.process_name(&name).await;
            results.insert(name, result);
        }
        results
    }

    pub async fn process_name(&self, name: &str) -> SearchResult {
        let page_source = match self.fetch_search_page(name).await {
            Ok(page_source) => page_source,
            Err(e) => {
                log::error!("Failed to fetch search page for {:?}: {}", name, e);
                return SearchResult::failed(e);
            }
        };

        let detail_urls: Vec<String> = extract_detail_links(&page_source)
            .iter()
            .filter_map(|path| match self.registry.detail_url(path) {
                Ok(url) => Some(url.to_string()),
                Err(e) => {
                    log::warn!("Skipping unresolvable detail link {}: {}", path, e);
                    None
                }
            })
            .collect();

        if detail_urls.is_empty() {
            log::info!("No filings found for {:?}", name);
            return SearchResult::from_details(vec![]);
        }

        let details = self.resolve_details(name, &detail_urls).await;
        let result = SearchResult::from_details(details);

        log::info!(
            "Checked {:?}: {} filings, score {:?}",
            name,
            detail_urls.len(),
            result.score()
        );

        result
    }

    async fn fetch_search_page(&self, name: &str) -> Result<String, FetchError> {
        let url = self.registry.search_url(name)?;
        self.fetcher.fetch(url.as_str()).await
    }

    async fn fetch_detail(&self, url: &str) -> Result<DetailRecord, FetchError> {
        let page_source = self.fetcher.fetch(url).await?;
        Ok(parse_detail(&page_source).with_detail_url(url))
    }

    /// Cached records are reused, the rest fetched concurrently. Failed
    /// fetches come back as error records and stay out of the cache.
    async fn resolve_details(&self, name: &str, detail_urls: &[String]) -> Vec<DetailRecord> {
        let lock = self.name_lock(name).await;
        let _guard = lock.lock().await;

        let mut cache = load_detail_cache(self.store.as_ref(), name).await;

        let misses: Vec<&String> = detail_urls
            .iter()
            .filter(|url| !cache.contains_key(url.as_str()))
            .collect();
        let cache_hits = detail_urls.len() - misses.len();

        let fetched: Vec<(&String, Result<DetailRecord, FetchError>)> = stream::iter(misses)
            .map(|url| async move { (url, self.fetch_detail(url).await) })
            .buffered(self.detail_concurrency)
            .collect()
            .await;

        let mut failures = HashMap::new();
        for (url, result) in fetched {
            match result {
                Ok(record) => {
                    cache.insert(url.clone(), record);
                }
                Err(e) => {
                    log::warn!("Failed to fetch detail page {}: {}", url, e);
                    failures.insert(url.as_str(), e.to_string());
                }
            }
        }

        log::info!(
            "Resolved details for {:?}: {} from cache, {} fetched, {} failed",
            name,
            cache_hits,
            detail_urls.len() - cache_hits - failures.len(),
            failures.len()
        );

        save_detail_cache(self.store.as_ref(), name, &cache).await;

        detail_urls
            .iter()
            .map(|url| match cache.get(url) {
                Some(record) => record.clone(),
                None => DetailRecord::failed(
                    url,
                    failures.get(url.as_str()).cloned().unwrap_or_default(),
                ),
            })
            .collect()
    }

    /// Serializes load/modify/save of one name's cache across concurrent calls.
    async fn name_lock(&self, name: &str) -> Arc<Mutex<()>> {
        let mut locks = self.name_locks.lock().await;
        if locks.len() > LOCK_REGISTRY_PRUNE_LEN {
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        }
        locks.entry(name.to_string()).or_default().clone()
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::VecDeque, io};

    use async_trait::async_trait;

    use super::*;
    use crate::{
        configuration::RegistrySettings,
        dal::{blob_store::MemoryBlobStore, name_cache_db::cache_key},
        domain::{detail_record::TrademarkStatus, risk::Score},
        services::scripted_fetcher::ScriptedFetcher,
    };

    const BASE: &str = "https://www.trademarkelite.com";
    const PATH_A: &str = "/us/trademark/trademark-detail/88000001/ACME";
    const PATH_B: &str = "/us/trademark/trademark-detail/88000002/ACME-TOYS";

    fn search_url(name: &str) -> String {
        registry().search_url(name).unwrap().to_string()
    }

    fn registry() -> Registry {
        Registry::new(&RegistrySettings::default()).unwrap()
    }

    fn search_page(paths: &[&str]) -> String {
        paths
            .iter()
            .map(|p| format!(r#"<a href="{}">result</a>"#, p))
            .collect()
    }

    fn detail_page(status: &str, classes: &[&str]) -> String {
        let classes: String = classes
            .iter()
            .map(|c| format!("<li>Class {}</li>", c))
            .collect();
        format!(
            "<table><tr><td>Serial Number</td><td>1</td></tr></table>\
             <span>{}</span><ul>{}</ul>",
            status, classes
        )
    }

    fn searcher(fetcher: Arc<ScriptedFetcher>, store: Arc<MemoryBlobStore>) -> TrademarkSearcher {
        TrademarkSearcher::new(registry(), fetcher, store, 2)
    }

    fn live_and_dead_fetcher() -> ScriptedFetcher {
        ScriptedFetcher::new()
            .with_page(&search_url("acme"), &search_page(&[PATH_A, PATH_B, PATH_A]))
            .with_page(&format!("{}{}", BASE, PATH_A), &detail_page("LIVE", &["028"]))
            .with_page(&format!("{}{}", BASE, PATH_B), &detail_page("DEAD", &[]))
    }

    #[tokio::test]
    async fn live_filing_in_flagged_class_scores_red() {
        let fetcher = Arc::new(live_and_dead_fetcher());
        let searcher = searcher(fetcher.clone(), Arc::new(MemoryBlobStore::new()));

        let result = searcher.process_name("acme").await;

        let SearchResult::Scored {
            score,
            explanation,
            details,
        } = result
        else {
            panic!("expected a scored result");
        };
        assert_eq!(score, Score::Red);
        assert!(explanation.contains("028"));
        assert_eq!(details.len(), 2);
        assert_eq!(details[0].detail_url, format!("{}{}", BASE, PATH_A));
        assert_eq!(details[0].status, TrademarkStatus::Live);
        assert_eq!(details[1].detail_url, format!("{}{}", BASE, PATH_B));
        assert_eq!(details[1].status, TrademarkStatus::Dead);
        assert_eq!(fetcher.call_count(), 3);
    }

    #[tokio::test]
    async fn no_links_scores_green_without_touching_cache() {
        let fetcher = Arc::new(
            ScriptedFetcher::new().with_page(&search_url("zyxx"), "<p>No results</p>"),
        );
        let store = Arc::new(MemoryBlobStore::new());
        let searcher = searcher(fetcher, store.clone());

        let result = searcher.process_name("zyxx").await;

        assert_eq!(result.score(), Some(Score::Green));
        assert!(result.details().is_empty());
        assert_eq!(store.read(&cache_key("zyxx")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn search_page_failure_fails_whole_name() {
        let fetcher = Arc::new(ScriptedFetcher::new().with_status(&search_url("acme"), 503));
        let store = Arc::new(MemoryBlobStore::new());
        let searcher = searcher(fetcher, store.clone());

        let result = searcher.process_name("acme").await;

        match result {
            SearchResult::Failed { error } => assert!(error.contains("503")),
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(store.read(&cache_key("acme")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn second_call_is_served_from_cache() {
        let fetcher = Arc::new(live_and_dead_fetcher());
        let searcher = searcher(fetcher.clone(), Arc::new(MemoryBlobStore::new()));

        let first = searcher.process_name("acme").await;
        fetcher.reset();
        let second = searcher.process_name("acme").await;

        assert_eq!(first, second);
        assert_eq!(fetcher.calls(), vec![search_url("acme")]);
    }

    #[tokio::test]
    async fn failed_detail_is_reported_and_retried_later() {
        let fetcher = Arc::new(
            ScriptedFetcher::new()
                .with_page(&search_url("acme"), &search_page(&[PATH_A, PATH_B]))
                .with_status(&format!("{}{}", BASE, PATH_A), 500)
                .with_page(&format!("{}{}", BASE, PATH_B), &detail_page("LIVE", &["025"])),
        );
        let searcher = searcher(fetcher.clone(), Arc::new(MemoryBlobStore::new()));

        let result = searcher.process_name("acme").await;

        assert_eq!(result.score(), Some(Score::Yellow));
        let details = result.details();
        assert_eq!(details.len(), 2);
        assert!(details[0].error.as_deref().unwrap_or_default().contains("500"));
        assert_eq!(details[0].detail_url, format!("{}{}", BASE, PATH_A));
        assert!(details[1].error.is_none());

        fetcher.set_page(&format!("{}{}", BASE, PATH_A), &detail_page("LIVE", &["041"]));
        fetcher.reset();
        let result = searcher.process_name("acme").await;

        assert_eq!(result.score(), Some(Score::Red));
        assert_eq!(
            fetcher.calls(),
            vec![search_url("acme"), format!("{}{}", BASE, PATH_A)]
        );
    }

    #[tokio::test]
    async fn new_filings_are_fetched_alongside_cached_ones() {
        let fetcher = Arc::new(
            ScriptedFetcher::new()
                .with_page(&search_url("acme"), &search_page(&[PATH_A]))
                .with_page(&format!("{}{}", BASE, PATH_A), &detail_page("DEAD", &[]))
                .with_page(&format!("{}{}", BASE, PATH_B), &detail_page("LIVE", &["035"])),
        );
        let searcher = searcher(fetcher.clone(), Arc::new(MemoryBlobStore::new()));

        assert_eq!(searcher.process_name("acme").await.score(), Some(Score::Green));

        fetcher.set_page(&search_url("acme"), &search_page(&[PATH_B, PATH_A]));
        fetcher.reset();
        let result = searcher.process_name("acme").await;

        assert_eq!(result.score(), Some(Score::Yellow));
        let urls: Vec<&str> = result.details().iter().map(|d| d.detail_url.as_str()).collect();
        assert_eq!(
            urls,
            vec![format!("{}{}", BASE, PATH_B), format!("{}{}", BASE, PATH_A)]
        );
        assert_eq!(fetcher.call_count(), 2);
    }

    #[tokio::test]
    async fn batch_isolates_failures_and_skips_blank_names() {
        let fetcher = Arc::new(
            live_and_dead_fetcher().with_status(&search_url("broken"), 502),
        );
        let searcher = searcher(fetcher, Arc::new(MemoryBlobStore::new()));

        let results = searcher
            .process_batch(["acme", " broken ", "", "acme", "   "])
            .await;

        assert_eq!(results.len(), 2);
        assert_eq!(results["acme"].score(), Some(Score::Red));
        assert!(matches!(results["broken"], SearchResult::Failed { .. }));
    }

    /// Serves a different search page on each call, yielding before every
    /// response so concurrent calls interleave.
    struct ShiftingSearchFetcher {
        search_url: String,
        search_pages: std::sync::Mutex<VecDeque<String>>,
        details: ScriptedFetcher,
    }

    #[async_trait]
    impl PageFetcher for ShiftingSearchFetcher {
        async fn fetch(&self, url: &str) -> Result<String, FetchError> {
            tokio::task::yield_now().await;
            if url == self.search_url {
                let page = self.search_pages.lock().unwrap().pop_front();
                return Ok(page.unwrap_or_default());
            }
            self.details.fetch(url).await
        }
    }

    /// Memory store that yields around every access.
    #[derive(Default)]
    struct YieldingStore {
        inner: MemoryBlobStore,
    }

    #[async_trait]
    impl BlobStore for YieldingStore {
        async fn read(&self, key: &str) -> io::Result<Option<String>> {
            tokio::task::yield_now().await;
            let contents = self.inner.read(key).await;
            tokio::task::yield_now().await;
            contents
        }

        async fn write(&self, key: &str, contents: &str) -> io::Result<()> {
            tokio::task::yield_now().await;
            self.inner.write(key, contents).await
        }
    }

    #[tokio::test]
    async fn concurrent_calls_for_one_name_keep_both_filings() {
        let url_a = format!("{}{}", BASE, PATH_A);
        let url_b = format!("{}{}", BASE, PATH_B);
        let fetcher = Arc::new(ShiftingSearchFetcher {
            search_url: search_url("acme"),
            search_pages: std::sync::Mutex::new(VecDeque::from([
                search_page(&[PATH_A]),
                search_page(&[PATH_B]),
            ])),
            details: ScriptedFetcher::new()
                .with_page(&url_a, &detail_page("LIVE", &["035"]))
                .with_page(&url_b, &detail_page("DEAD", &[])),
        });
        let store = Arc::new(YieldingStore::default());
        let searcher = TrademarkSearcher::new(registry(), fetcher, store.clone(), 2);

        let (first, second) =
            tokio::join!(searcher.process_name("acme"), searcher.process_name("acme"));

        assert_eq!(first.details().len(), 1);
        assert_eq!(second.details().len(), 1);
        let cache = load_detail_cache(store.as_ref(), "acme").await;
        assert!(cache.contains_key(&url_a));
        assert!(cache.contains_key(&url_b));
    }

    #[tokio::test]
    async fn lock_registry_prunes_idle_names_only() {
        let searcher = searcher(
            Arc::new(ScriptedFetcher::new()),
            Arc::new(MemoryBlobStore::new()),
        );
        let held = searcher.name_lock("held").await;

        for i in 0..LOCK_REGISTRY_PRUNE_LEN {
            searcher.name_lock(&format!("idle {}", i)).await;
        }
        assert_eq!(searcher.name_locks.lock().await.len(), LOCK_REGISTRY_PRUNE_LEN + 1);

        let next = searcher.name_lock("next").await;

        let locks = searcher.name_locks.lock().await;
        assert_eq!(locks.len(), 2);
        assert!(Arc::ptr_eq(&locks["held"], &held));
        assert!(Arc::ptr_eq(&locks["next"], &next));
    }
}
