use std::collections::HashMap;
use std::fmt;
use std::future::Future;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::api::ApiError;

/// Consider cached queries stale after 5 minutes.
const CACHE_STALE_MINUTES: i64 = 5;

#[derive(Debug, Clone, Serialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        let now = Utc::now();
        (now - self.cached_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            // Includes negative ages from clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            format!("{}h ago", minutes / 60)
        } else {
            format!("{}d ago", minutes / 1440)
        }
    }

    pub fn is_stale(&self, stale_after: Duration) -> bool {
        Utc::now() - self.cached_at > stale_after
    }
}

/// Hierarchical query key, e.g. `["student", "7"]`.
/// A key invalidates every key it is a prefix of.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(parts.into_iter().map(Into::into).collect())
    }

    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

/// In-memory cache of server-derived data owned by the application layer.
///
/// Entries are kept as JSON so one cache can hold any response type.
pub struct QueryCache {
    entries: RwLock<HashMap<QueryKey, CachedData<Value>>>,
    stale_after: Duration,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(Duration::minutes(CACHE_STALE_MINUTES))
    }
}

impl QueryCache {
    pub fn new(stale_after: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            stale_after,
        }
    }

    pub fn get<T: DeserializeOwned>(&self, key: &QueryKey) -> Result<Option<CachedData<T>>> {
        let entries = self.entries.read();
        let Some(cached) = entries.get(key) else {
            return Ok(None);
        };
        let data = serde_json::from_value(cached.data.clone())?;
        Ok(Some(CachedData {
            data,
            cached_at: cached.cached_at,
        }))
    }

    pub fn set<T: Serialize>(&self, key: QueryKey, data: &T) -> Result<()> {
        let value = serde_json::to_value(data)?;
        self.entries.write().insert(key, CachedData::new(value));
        Ok(())
    }

    /// Cached data if fresh, otherwise run `loader` and cache its result.
    /// Loader failures are returned as-is and leave the cache untouched.
    pub async fn fetch<T, F, Fut>(&self, key: QueryKey, loader: F) -> Result<T, ApiError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        match self.get::<T>(&key) {
            Ok(Some(cached)) if !cached.is_stale(self.stale_after) => {
                debug!(key = %key, age = %cached.age_display(), "Query cache hit");
                return Ok(cached.data);
            }
            Ok(_) => {}
            Err(e) => debug!(key = %key, error = %e, "Cached entry unreadable, refetching"),
        }

        let data = loader().await?;
        if let Err(e) = self.set(key.clone(), &data) {
            debug!(key = %key, error = %e, "Failed to cache query result");
        }
        Ok(data)
    }

    /// Drop every entry under `prefix`; returns how many were removed
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        let removed = before - entries.len();
        debug!(prefix = %prefix, removed, "Query cache invalidated");
        removed
    }

    pub fn clear(&self) {
        let mut entries = self.entries.write();
        debug!(entries = entries.len(), "Query cache cleared");
        entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
