//! Rendered-post cache
//!
//! Posts are fetched on first request and kept for `revalidate_secs`. After
//! that the stale copy keeps being served while a background task refreshes
//! it. A slug that has never been fetched either blocks the request or
//! answers with a loading placeholder, depending on [`FallbackMode`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::cms::ContentSource;
use crate::config::{FallbackMode, SiteConfig};
use crate::content::PostDetail;

/// Outcome of a post lookup
#[derive(Debug, Clone)]
pub enum Lookup {
    Ready(Arc<PostDetail>),
    /// The fetch has not resolved yet
    Loading,
    NotFound,
    /// The last fetch failed; the next lookup retries
    Failed(String),
}

#[derive(Debug)]
enum Entry {
    Pending,
    Ready {
        post: Arc<PostDetail>,
        fetched_at: Instant,
        refreshing: bool,
    },
    /// Outcome of a background fetch, kept until the next lookup reports it
    Missing {
        fetched_at: Instant,
    },
    Failed {
        message: String,
        fetched_at: Instant,
    },
}

impl Entry {
    fn unclaimed_since(&self) -> Option<Instant> {
        match self {
            Entry::Missing { fetched_at } | Entry::Failed { fetched_at, .. } => Some(*fetched_at),
            _ => None,
        }
    }
}

pub struct PostCache {
    source: Arc<dyn ContentSource>,
    doc_type: String,
    fallback: FallbackMode,
    revalidate: Duration,
    entries: RwLock<HashMap<String, Entry>>,
}

impl PostCache {
    pub fn new(source: Arc<dyn ContentSource>, config: &SiteConfig) -> Self {
        Self {
            source,
            doc_type: config.cms.document_type.clone(),
            fallback: config.fallback,
            revalidate: Duration::from_secs(config.revalidate_secs),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Look up a post, fetching or refreshing it as needed
    pub async fn lookup(self: &Arc<Self>, slug: &str) -> Lookup {
        {
            let entries = self.entries.read().await;
            match entries.get(slug) {
                Some(Entry::Pending) => return Lookup::Loading,
                Some(Entry::Ready {
                    post,
                    fetched_at,
                    refreshing,
                }) => {
                    if *refreshing || fetched_at.elapsed() < self.revalidate {
                        return Lookup::Ready(post.clone());
                    }
                }
                _ => {}
            }
        }

        let mut entries = self.entries.write().await;
        // State may have moved on while waiting for the write lock
        match entries.get_mut(slug) {
            Some(Entry::Pending) => return Lookup::Loading,
            Some(Entry::Ready {
                post,
                fetched_at,
                refreshing,
            }) => {
                if !*refreshing && fetched_at.elapsed() >= self.revalidate {
                    *refreshing = true;
                    tracing::debug!("Revalidating post {}", slug);
                    self.spawn_fetch(slug.to_string());
                }
                return Lookup::Ready(post.clone());
            }
            Some(Entry::Missing { .. }) => {
                entries.remove(slug);
                return Lookup::NotFound;
            }
            Some(Entry::Failed { message, .. }) => {
                let message = message.clone();
                entries.remove(slug);
                return Lookup::Failed(message);
            }
            None => {}
        }

        match self.fallback {
            FallbackMode::Placeholder => {
                // Outcomes nobody came back for
                let revalidate = self.revalidate;
                entries.retain(|_, entry| {
                    entry
                        .unclaimed_since()
                        .map_or(true, |since| since.elapsed() < revalidate)
                });
                entries.insert(slug.to_string(), Entry::Pending);
                drop(entries);
                self.spawn_fetch(slug.to_string());
                Lookup::Loading
            }
            FallbackMode::Blocking => {
                drop(entries);
                self.fetch(slug.to_string()).await
            }
        }
    }

    /// Fetch and store posts ahead of the first request
    pub async fn prebuild<I>(self: &Arc<Self>, slugs: I) -> usize
    where
        I: IntoIterator<Item = String>,
    {
        let mut built = 0;
        for slug in slugs {
            if let Lookup::Ready(_) = self.fetch(slug).await {
                built += 1;
            }
        }
        built
    }

    fn spawn_fetch(self: &Arc<Self>, slug: String) {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            cache.fetch(slug).await;
        });
    }

    async fn fetch(&self, slug: String) -> Lookup {
        let result = self.source.get_by_uid(&self.doc_type, &slug).await;
        let mut entries = self.entries.write().await;

        match result {
            Ok(Some(post)) => {
                tracing::debug!("Fetched post {}", slug);
                let post = Arc::new(post);
                entries.insert(
                    slug,
                    Entry::Ready {
                        post: post.clone(),
                        fetched_at: Instant::now(),
                        refreshing: false,
                    },
                );
                Lookup::Ready(post)
            }
            Ok(None) => {
                tracing::debug!("No post with uid {}", slug);
                if let Some(Entry::Pending) = entries.get(&slug) {
                    entries.insert(
                        slug,
                        Entry::Missing {
                            fetched_at: Instant::now(),
                        },
                    );
                } else {
                    entries.remove(&slug);
                }
                Lookup::NotFound
            }
            Err(e) => {
                tracing::error!("Failed to fetch post {}: {}", slug, e);
                let message = e.to_string();
                match entries.get_mut(&slug) {
                    // Keep serving the stale copy, retry on a later request
                    Some(Entry::Ready {
                        post, refreshing, ..
                    }) => {
                        *refreshing = false;
                        Lookup::Ready(post.clone())
                    }
                    Some(Entry::Pending) => {
                        entries.insert(
                            slug,
                            Entry::Failed {
                                message: message.clone(),
                                fetched_at: Instant::now(),
                            },
                        );
                        Lookup::Failed(message)
                    }
                    _ => Lookup::Failed(message),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::{CmsError, MemorySource, Predicate, QueryOptions};
    use crate::content::PostPage;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Semaphore;

    fn post(uid: &str, title: &str) -> PostDetail {
        PostDetail {
            uid: uid.to_string(),
            first_publication_date: None,
            title: title.to_string(),
            banner_url: String::new(),
            author: String::new(),
            content: Vec::new(),
        }
    }

    /// Each fetch consumes one permit, waiting until one is released
    struct GatedSource {
        gate: Semaphore,
        calls: AtomicUsize,
        inner: MemorySource,
    }

    impl GatedSource {
        fn new(posts: Vec<PostDetail>) -> Self {
            Self {
                gate: Semaphore::new(0),
                calls: AtomicUsize::new(0),
                inner: MemorySource::new(vec![], posts),
            }
        }
    }

    #[async_trait]
    impl ContentSource for GatedSource {
        async fn query(&self, p: &Predicate, o: &QueryOptions) -> Result<PostPage, CmsError> {
            self.inner.query(p, o).await
        }

        async fn get_by_uid(&self, t: &str, uid: &str) -> Result<Option<PostDetail>, CmsError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.gate.acquire().await.unwrap().forget();
            self.inner.get_by_uid(t, uid).await
        }

        async fn fetch_next(&self, url: &str) -> Result<PostPage, CmsError> {
            self.inner.fetch_next(url).await
        }
    }

    /// Fails the first `get_by_uid`, then answers from the inner source
    struct FlakySource {
        calls: AtomicUsize,
        inner: MemorySource,
    }

    impl FlakySource {
        fn new(posts: Vec<PostDetail>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                inner: MemorySource::new(vec![], posts),
            }
        }
    }

    #[async_trait]
    impl ContentSource for FlakySource {
        async fn query(&self, p: &Predicate, o: &QueryOptions) -> Result<PostPage, CmsError> {
            self.inner.query(p, o).await
        }

        async fn get_by_uid(&self, t: &str, uid: &str) -> Result<Option<PostDetail>, CmsError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(CmsError::NoMasterRef);
            }
            self.inner.get_by_uid(t, uid).await
        }

        async fn fetch_next(&self, url: &str) -> Result<PostPage, CmsError> {
            self.inner.fetch_next(url).await
        }
    }

    fn cache(source: Arc<dyn ContentSource>, fallback: FallbackMode, revalidate_secs: u64) -> Arc<PostCache> {
        let config = SiteConfig {
            fallback,
            revalidate_secs,
            ..SiteConfig::default()
        };
        Arc::new(PostCache::new(source, &config))
    }

    async fn wait_ready(cache: &Arc<PostCache>, slug: &str) -> Lookup {
        for _ in 0..100 {
            match cache.lookup(slug).await {
                Lookup::Loading => tokio::time::sleep(Duration::from_millis(10)).await,
                other => return other,
            }
        }
        panic!("post {} never resolved", slug);
    }

    #[tokio::test]
    async fn test_placeholder_until_fetch_resolves() {
        let source = Arc::new(GatedSource::new(vec![post("hooks", "Hooks")]));
        let cache = cache(source.clone(), FallbackMode::Placeholder, 1800);

        assert!(matches!(cache.lookup("hooks").await, Lookup::Loading));
        // A second request while pending does not start another fetch
        assert!(matches!(cache.lookup("hooks").await, Lookup::Loading));

        source.gate.add_permits(10);
        match wait_ready(&cache, "hooks").await {
            Lookup::Ready(post) => assert_eq!(post.title, "Hooks"),
            other => panic!("unexpected lookup: {:?}", other),
        }
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_blocking_waits_for_fetch() {
        let source = Arc::new(GatedSource::new(vec![post("hooks", "Hooks")]));
        source.gate.add_permits(10);
        let cache = cache(source, FallbackMode::Blocking, 1800);

        assert!(matches!(cache.lookup("hooks").await, Lookup::Ready(_)));
        assert!(matches!(cache.lookup("missing").await, Lookup::NotFound));
    }

    #[tokio::test]
    async fn test_blocking_failure_is_retried() {
        let source = Arc::new(FlakySource::new(vec![post("hooks", "Hooks")]));
        let cache = cache(source.clone(), FallbackMode::Blocking, 1800);

        assert!(matches!(cache.lookup("hooks").await, Lookup::Failed(_)));
        // The source recovered, so the next request fetches again and succeeds
        assert!(matches!(cache.lookup("hooks").await, Lookup::Ready(_)));
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_placeholder_failure_is_reported_once_then_retried() {
        let source = Arc::new(FlakySource::new(vec![post("hooks", "Hooks")]));
        let cache = cache(source.clone(), FallbackMode::Placeholder, 1800);

        assert!(matches!(cache.lookup("hooks").await, Lookup::Loading));
        assert!(matches!(wait_ready(&cache, "hooks").await, Lookup::Failed(_)));

        assert!(matches!(cache.lookup("hooks").await, Lookup::Loading));
        assert!(matches!(wait_ready(&cache, "hooks").await, Lookup::Ready(_)));
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_blocking_missing_slugs_leave_no_entries() {
        let cache = cache(Arc::new(MemorySource::default()), FallbackMode::Blocking, 1800);

        for i in 0..1000 {
            let slug = format!("junk-{}", i);
            assert!(matches!(cache.lookup(&slug).await, Lookup::NotFound));
        }
        assert_eq!(cache.entries.read().await.len(), 0);
    }

    #[tokio::test]
    async fn test_placeholder_missing_slug_entry_dropped_once_reported() {
        let cache = cache(Arc::new(MemorySource::default()), FallbackMode::Placeholder, 1800);

        assert!(matches!(cache.lookup("nope").await, Lookup::Loading));
        assert!(matches!(wait_ready(&cache, "nope").await, Lookup::NotFound));
        assert_eq!(cache.entries.read().await.len(), 0);
    }

    #[tokio::test]
    async fn test_unclaimed_outcomes_are_evicted() {
        let cache = cache(Arc::new(MemorySource::default()), FallbackMode::Placeholder, 0);

        // Nobody comes back for these; each new fetch sweeps the expired ones
        for i in 0..100 {
            let slug = format!("junk-{}", i);
            assert!(matches!(cache.lookup(&slug).await, Lookup::Loading));
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(cache.entries.read().await.len() < 10);
    }

    #[tokio::test]
    async fn test_stale_post_served_while_revalidating() {
        let source = Arc::new(GatedSource::new(vec![post("hooks", "Hooks")]));
        source.gate.add_permits(1);
        let cache = cache(source.clone(), FallbackMode::Blocking, 0);

        assert!(matches!(cache.lookup("hooks").await, Lookup::Ready(_)));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        // Entry is immediately stale; the refresh is gated, the stale copy is served
        assert!(matches!(cache.lookup("hooks").await, Lookup::Ready(_)));
        assert!(matches!(cache.lookup("hooks").await, Lookup::Ready(_)));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_prebuild() {
        let source = Arc::new(MemorySource::new(vec![], vec![post("a", "A"), post("b", "B")]));
        let cache = cache(source, FallbackMode::Placeholder, 1800);

        let built = cache
            .prebuild(vec!["a".to_string(), "b".to_string(), "c".to_string()])
            .await;
        assert_eq!(built, 2);
        assert!(matches!(cache.lookup("a").await, Lookup::Ready(_)));
    }
}
