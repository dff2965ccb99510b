//! Refresh suppression
//!
//! `CachedSource` answers repeated day requests from memory for a fixed
//! window; `RefreshGate` keeps the service loop from starting a full refresh
//! while the last one is still fresh.

use crate::error::Result;
use crate::usage::{Datapoint, UsageSource};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

type CacheKey = (NaiveDate, bool);

/// Day results keyed by (date, granular), each stamped with its fetch time.
/// Shared across credential refreshes so a new session starts warm.
#[derive(Debug)]
pub struct UsageCache {
    window: Duration,
    entries: Mutex<HashMap<CacheKey, (Instant, Vec<Datapoint>)>>,
}

impl UsageCache {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Cached datapoints if fetched less than `window` before `now`
    pub async fn get(&self, key: CacheKey, now: Instant) -> Option<Vec<Datapoint>> {
        let entries = self.entries.lock().await;
        entries
            .get(&key)
            .filter(|(at, _)| now.saturating_duration_since(*at) < self.window)
            .map(|(_, points)| points.clone())
    }

    pub async fn put(&self, key: CacheKey, now: Instant, points: Vec<Datapoint>) {
        let mut entries = self.entries.lock().await;
        entries.retain(|_, (at, _)| now.saturating_duration_since(*at) < self.window);
        entries.insert(key, (now, points));
    }

    pub async fn invalidate(&self) {
        self.entries.lock().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// `UsageSource` decorator backed by a `UsageCache`. Errors pass through
/// uncached.
#[derive(Debug)]
pub struct CachedSource<S> {
    inner: S,
    cache: Arc<UsageCache>,
}

impl<S: UsageSource> CachedSource<S> {
    pub fn new(inner: S, window: Duration) -> Self {
        Self::with_cache(inner, Arc::new(UsageCache::new(window)))
    }

    pub fn with_cache(inner: S, cache: Arc<UsageCache>) -> Self {
        Self { inner, cache }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub async fn invalidate(&self) {
        self.cache.invalidate().await;
    }
}

#[async_trait]
impl<S: UsageSource> UsageSource for CachedSource<S> {
    async fn get_data(&self, date: NaiveDate, granular: bool) -> Result<Vec<Datapoint>> {
        let key = (date, granular && self.inner.honours_granularity());
        if let Some(points) = self.cache.get(key, Instant::now()).await {
            return Ok(points);
        }
        let points = self.inner.get_data(date, granular).await?;
        self.cache.put(key, Instant::now(), points.clone()).await;
        Ok(points)
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn honours_granularity(&self) -> bool {
        self.inner.honours_granularity()
    }
}

/// Time-window gate for full refreshes
#[derive(Debug, Clone)]
pub struct RefreshGate {
    window: Duration,
    last: Option<Instant>,
}

impl RefreshGate {
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    /// True when no refresh was marked within `window` of `now`
    pub fn should_refresh(&self, now: Instant) -> bool {
        match self.last {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.window,
        }
    }

    pub fn mark(&mut self, now: Instant) {
        self.last = Some(now);
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}
