use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{Locale, PageSnapshot, PageSource};
use crate::progress::ConsoleProgress;

pub const DEFAULT_MAX_AGE_DAYS: u64 = 30;

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    locale: Locale,
    term: String,
    fetched_at: u64,
    page: PageSnapshot,
}

/// On-disk page snapshots keyed by (locale, term).
///
/// Layout: `<dir>/<locale>/<sha256(term)>.json`. An entry older than
/// `max_age` is treated as absent; so is any file that fails to parse.
#[derive(Debug, Clone)]
pub struct PageCache {
    dir: PathBuf,
    max_age: Duration,
}

impl PageCache {
    pub fn new(dir: PathBuf, max_age: Duration) -> Self {
        Self { dir, max_age }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, locale: Locale, term: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(term.as_bytes());
        let name = format!("{}.json", hex::encode(hasher.finalize()));
        self.dir.join(locale.code()).join(name)
    }

    pub fn get(&self, locale: Locale, term: &str) -> Option<PageSnapshot> {
        self.get_at(locale, term, SystemTime::now())
    }

    pub fn get_at(&self, locale: Locale, term: &str, now: SystemTime) -> Option<PageSnapshot> {
        let path = self.entry_path(locale, term);
        let text = std::fs::read_to_string(&path).ok()?;
        let entry: CacheEntry = serde_json::from_str(&text).ok()?;
        if entry.locale != locale || entry.term != term {
            return None;
        }
        let age = unix_secs(now).saturating_sub(entry.fetched_at);
        if age > self.max_age.as_secs() {
            return None;
        }
        Some(entry.page)
    }

    pub fn put(&self, locale: Locale, term: &str, page: &PageSnapshot) -> anyhow::Result<()> {
        self.put_at(locale, term, page, SystemTime::now())
    }

    pub fn put_at(
        &self,
        locale: Locale,
        term: &str,
        page: &PageSnapshot,
        now: SystemTime,
    ) -> anyhow::Result<()> {
        let path = self.entry_path(locale, term);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create cache dir: {}", parent.display()))?;
        }
        let entry = CacheEntry {
            locale,
            term: term.to_string(),
            fetched_at: unix_secs(now),
            page: page.clone(),
        };
        let json = serde_json::to_string_pretty(&entry).context("serialize cache entry")?;
        std::fs::write(&path, json)
            .with_context(|| format!("write cache entry: {}", path.display()))?;
        Ok(())
    }
}

fn unix_secs(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

/// Serves pages from a [`PageCache`] and falls back to `inner` on a miss.
pub struct CachedPageSource<S> {
    inner: S,
    cache: PageCache,
    progress: ConsoleProgress,
}

impl<S: PageSource> CachedPageSource<S> {
    pub fn new(inner: S, cache: PageCache, progress: ConsoleProgress) -> Self {
        Self {
            inner,
            cache,
            progress,
        }
    }
}

impl<S: PageSource> PageSource for CachedPageSource<S> {
    fn page(&self, locale: Locale, title: &str) -> anyhow::Result<PageSnapshot> {
        if let Some(hit) = self.cache.get(locale, title) {
            self.progress.info(format!("Cache hit: {locale}:{title}"));
            return Ok(hit);
        }
        let page = self.inner.page(locale, title)?;
        if let Err(e) = self.cache.put(locale, title, &page) {
            self.progress.warn(format!("cache write skipped: {e:#}"));
        }
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::collections::BTreeMap;

    fn temp_cache(tag: &str, max_age: Duration) -> PageCache {
        let dir = std::env::temp_dir().join(format!(
            "zh-simplifier-cache-{tag}-{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        PageCache::new(dir, max_age)
    }

    fn dog() -> PageSnapshot {
        let mut langlinks = BTreeMap::new();
        langlinks.insert("zh".to_string(), "狗".to_string());
        PageSnapshot {
            title: "Dog".to_string(),
            exists: true,
            summary: "The dog is a domesticated wolf.".to_string(),
            langlinks,
        }
    }

    #[test]
    fn fresh_entry_is_returned() {
        let cache = temp_cache("fresh", Duration::from_secs(3600));
        let now = SystemTime::now();
        cache.put_at(Locale::English, "Dog", &dog(), now).expect("put");

        assert_eq!(cache.get_at(Locale::English, "Dog", now), Some(dog()));
        // Same term, other locale: separate key.
        assert_eq!(cache.get_at(Locale::Chinese, "Dog", now), None);
        let _ = std::fs::remove_dir_all(cache.dir());
    }

    #[test]
    fn stale_entry_is_dropped() {
        let cache = temp_cache("stale", Duration::from_secs(60));
        let then = SystemTime::now() - Duration::from_secs(120);
        cache.put_at(Locale::English, "Dog", &dog(), then).expect("put");

        assert_eq!(cache.get_at(Locale::English, "Dog", SystemTime::now()), None);
        let _ = std::fs::remove_dir_all(cache.dir());
    }

    #[test]
    fn corrupt_entry_is_a_miss() {
        let cache = temp_cache("corrupt", Duration::from_secs(3600));
        let path = cache.entry_path(Locale::Chinese, "狗");
        std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        std::fs::write(&path, "{ not json").expect("write");

        assert_eq!(cache.get(Locale::Chinese, "狗"), None);
        let _ = std::fs::remove_dir_all(cache.dir());
    }

    struct CountingSource {
        calls: Cell<usize>,
    }

    impl PageSource for CountingSource {
        fn page(&self, _locale: Locale, title: &str) -> anyhow::Result<PageSnapshot> {
            self.calls.set(self.calls.get() + 1);
            Ok(PageSnapshot::missing(title))
        }
    }

    #[test]
    fn cached_source_fetches_once() {
        let cache = temp_cache("source", Duration::from_secs(3600));
        let source = CachedPageSource::new(
            CountingSource { calls: Cell::new(0) },
            cache.clone(),
            ConsoleProgress::new(false),
        );

        let first = source.page(Locale::English, "Nowhere").expect("first");
        let second = source.page(Locale::English, "Nowhere").expect("second");
        assert_eq!(first, second);
        assert!(!second.exists);
        assert_eq!(source.inner.calls.get(), 1);
        let _ = std::fs::remove_dir_all(cache.dir());
    }
}
