// Time-bounded cache for loaded roster data.
//
// The caller owns the cache and passes the current time in, so freshness is
// deterministic under test. The scoring engine never sees it.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use crate::ingest::RosterData;

pub type RosterCache = ExpiringCache<RosterData>;

#[derive(Debug, Clone)]
pub struct ExpiringCache<T> {
    entry: Option<T>,
    expires_at: Option<DateTime<Utc>>,
    ttl: Duration,
}

impl<T> ExpiringCache<T> {
    pub fn new(ttl: Duration) -> Self {
        ExpiringCache {
            entry: None,
            expires_at: None,
            ttl,
        }
    }

    pub fn with_ttl_minutes(minutes: i64) -> Self {
        Self::new(Duration::minutes(minutes))
    }

    /// True when an entry is held and `now` is before its expiry.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        match (&self.entry, self.expires_at) {
            (Some(_), Some(expires_at)) => now < expires_at,
            _ => false,
        }
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Cached entry, if fresh at `now`.
    pub fn get(&self, now: DateTime<Utc>) -> Option<&T> {
        if self.is_fresh(now) {
            self.entry.as_ref()
        } else {
            None
        }
    }

    /// Return the cached entry, calling `load` first when it is missing or
    /// expired. A failed load leaves the previous entry in place.
    pub fn get_or_load<F, E>(&mut self, now: DateTime<Utc>, load: F) -> Result<&T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let fresh = self.is_fresh(now);
        let entry = match self.entry.take() {
            Some(entry) if fresh => {
                debug!("cache hit, expires at {:?}", self.expires_at);
                entry
            }
            previous => match load() {
                Ok(value) => {
                    let expires_at = now + self.ttl;
                    info!("cache loaded, expires at {}", expires_at);
                    self.expires_at = Some(expires_at);
                    value
                }
                Err(e) => {
                    self.entry = previous;
                    return Err(e);
                }
            },
        };
        Ok(self.entry.insert(entry))
    }

    /// Mark the entry stale so the next `get_or_load` reloads.
    pub fn force_refresh(&mut self) {
        debug!("cache invalidated");
        self.expires_at = None;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
