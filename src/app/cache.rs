/// Memoizes request outcomes for a fixed window, keyed by exact URL string.
/// Failures are stored too, so an identical failing request is not repeated
/// within the window. A zero TTL disables the cache entirely.
#[derive(Clone)]
struct TtlCache<T: Clone> {
    ttl: Duration,
    entries: Arc<Mutex<HashMap<String, (Instant, T)>>>,
}

impl<T: Clone> TtlCache<T> {
    fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn get(&self, key: &str) -> Option<T> {
        if self.ttl.is_zero() {
            return None;
        }
        let mut entries = self.entries.lock().ok()?;
        let expired = match entries.get(key) {
            Some((stored, value)) => {
                if stored.elapsed() < self.ttl {
                    return Some(value.clone());
                }
                true
            }
            None => false,
        };
        if expired {
            entries.remove(key);
        }
        None
    }

    fn put(&self, key: &str, value: T) {
        if self.ttl.is_zero() {
            return;
        }
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), (Instant::now(), value));
        }
    }
}

#[cfg(test)]
mod cache_tests {
    use super::*;

    #[test]
    fn stores_and_returns_within_ttl() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.put("https://example.test/", 7u16);
        assert_eq!(cache.get("https://example.test/"), Some(7));
        assert_eq!(cache.get("https://example.test/other"), None);
    }

    #[test]
    fn zero_ttl_disables_the_cache() {
        let cache = TtlCache::new(Duration::ZERO);
        cache.put("https://example.test/", 7u16);
        assert_eq!(cache.get("https://example.test/"), None);
    }

    #[test]
    fn entries_expire_after_the_window() {
        let cache = TtlCache::new(Duration::from_millis(5));
        cache.put("https://example.test/", 7u16);
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(cache.get("https://example.test/"), None);
    }

    #[test]
    fn failures_are_memoized_like_successes() {
        let cache: TtlCache<Result<u16, FetchError>> = TtlCache::new(Duration::from_secs(60));
        cache.put("https://example.test/down", Err(FetchError::Timeout));
        assert_eq!(
            cache.get("https://example.test/down"),
            Some(Err(FetchError::Timeout))
        );
    }
}
