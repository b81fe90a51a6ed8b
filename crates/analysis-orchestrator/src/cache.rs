use analysis_core::{Bar, CompanyProfile};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use dashmap::DashMap;

/// Cache key: the loader inputs of one request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub symbol: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl CacheKey {
    pub fn new(symbol: &str, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            symbol: symbol.trim().to_uppercase(),
            start,
            end,
        }
    }
}

/// What the loader returned for one key.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub bars: Vec<Bar>,
    pub profile: CompanyProfile,
}

/// Internal cache entry with timestamp
struct CacheEntry<T> {
    data: T,
    cached_at: DateTime<Utc>,
}

/// Loader results keyed by (ticker, start, end).
///
/// Entries older than `ttl` are stale and never served. When the cache is
/// full, inserting evicts the oldest entry.
pub struct DataCache {
    entries: DashMap<CacheKey, CacheEntry<LoadedData>>,
    ttl: Duration,
    max_entries: usize,
}

impl DataCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<LoadedData> {
        self.get_at(key, Utc::now())
    }

    fn get_at(&self, key: &CacheKey, now: DateTime<Utc>) -> Option<LoadedData> {
        if let Some(entry) = self.entries.get(key) {
            if now - entry.cached_at < self.ttl {
                return Some(entry.data.clone());
            }
        }
        // The read guard is released above; removing while holding it deadlocks.
        if self.entries.remove_if(key, |_, entry| now - entry.cached_at >= self.ttl).is_some() {
            tracing::debug!("Cache entry for {}:{}:{} expired", key.symbol, key.start, key.end);
        }
        None
    }

    pub fn insert(&self, key: CacheKey, data: LoadedData) {
        self.insert_at(key, data, Utc::now());
    }

    fn insert_at(&self, key: CacheKey, data: LoadedData, now: DateTime<Utc>) {
        self.entries.retain(|_, entry| now - entry.cached_at < self.ttl);

        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_entries {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|entry| entry.value().cached_at)
                .map(|entry| entry.key().clone());
            if let Some(oldest) = oldest {
                tracing::debug!("Evicting cache entry for {}", oldest.symbol);
                self.entries.remove(&oldest);
            }
        }

        self.entries.insert(key, CacheEntry { data, cached_at: now });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
