use crate::models::MarksConfig;
use moka::sync::Cache;
use std::time::Duration;

/// Cache-aside store of marks weight configurations keyed by subject code.
///
/// Entries expire after the configured time-to-live, and any write through
/// the service clears the whole cache.
#[derive(Clone)]
pub struct MarksConfigCache {
    entries: Cache<String, MarksConfig>,
}

impl MarksConfigCache {
    /// Create a cache holding at most `max_capacity` subjects for `ttl`
    #[must_use]
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl)
            .build();

        Self { entries }
    }

    /// Cached configuration for the subject, if still fresh
    #[must_use]
    pub fn get(&self, subject_code: &str) -> Option<MarksConfig> {
        self.entries.get(subject_code)
    }

    /// Store one configuration
    pub fn insert(&self, config: MarksConfig) {
        self.entries.insert(config.subject_code.clone(), config);
    }

    /// Fill the cache from a freshly fetched list
    pub fn prime(&self, configs: &[MarksConfig]) {
        for config in configs {
            self.insert(config.clone());
        }
    }

    /// Drop every entry
    pub fn invalidate_all(&self) {
        self.entries.invalidate_all();
    }
}

impl std::fmt::Debug for MarksConfigCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarksConfigCache")
            .field("entries", &self.entries.entry_count())
            .finish()
    }
}
