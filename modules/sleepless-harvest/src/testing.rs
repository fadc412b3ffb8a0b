// Test mocks for the harvester.
//
// MockSource (PostSource): scripted queue of responses, optionally slow,
// records every request with the virtual time it arrived at.
//
// Plus helpers for building posts and sources.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use tokio::time::Instant;

use sleepless_common::{Post, Source};

use crate::source::{PostSource, SearchRequest, SourceError};

// ---------------------------------------------------------------------------
// MockSource
// ---------------------------------------------------------------------------

type Scripted = (std::time::Duration, Result<Vec<Post>, SourceError>);

/// Returns scripted responses in order, then empty batches forever.
/// Builder pattern: `.then_posts()`, `.then_posts_after()`, `.then_empty()`,
/// `.then_error()`.
pub struct MockSource {
    script: Mutex<VecDeque<Scripted>>,
    calls: Mutex<Vec<(Instant, SearchRequest)>>,
}

impl MockSource {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn then_posts(self, posts: Vec<Post>) -> Self {
        self.then_posts_after(std::time::Duration::ZERO, posts)
    }

    /// Answer with `posts` only after the search has been in flight for `delay`.
    pub fn then_posts_after(self, delay: std::time::Duration, posts: Vec<Post>) -> Self {
        self.script.lock().unwrap().push_back((delay, Ok(posts)));
        self
    }

    pub fn then_empty(self) -> Self {
        self.then_posts(Vec::new())
    }

    pub fn then_error(self, message: &str) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back((
                std::time::Duration::ZERO,
                Err(SourceError::Transient(message.to_string())),
            ));
        self
    }

    /// Every request seen so far, with the instant it arrived.
    pub fn calls(&self) -> Vec<(Instant, SearchRequest)> {
        self.calls.lock().unwrap().clone()
    }

    /// Gaps between consecutive requests.
    pub fn gaps(&self) -> Vec<std::time::Duration> {
        let calls = self.calls();
        calls.windows(2).map(|w| w[1].0 - w[0].0).collect()
    }
}

impl Default for MockSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PostSource for MockSource {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<Post>, SourceError> {
        self.calls
            .lock()
            .unwrap()
            .push((Instant::now(), request.clone()));
        let next = self.script.lock().unwrap().pop_front();
        let (delay, result) = next.unwrap_or_else(|| (std::time::Duration::ZERO, Ok(Vec::new())));
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        result
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2017, 4, 1, 0, 0, 0).unwrap()
}

/// A post by `author` at `minutes` past [`epoch`].
pub fn post_at(author: &str, minutes: i64) -> Post {
    Post::new(author, epoch() + Duration::minutes(minutes), format!("{author} at {minutes}"))
}

/// `count` posts by distinct authors, starting at `first_minute`.
pub fn distinct_posts(count: usize, first_minute: i64) -> Vec<Post> {
    (0..count)
        .map(|i| post_at(&format!("user{i}"), first_minute + i as i64))
        .collect()
}

pub fn source(name: &str, lat: f64, lng: f64) -> Source {
    Source {
        name: name.to_string(),
        region: "MN".to_string(),
        lat,
        lng,
        population: 250_000,
    }
}

/// Minneapolis, St. Paul and Duluth.
pub fn twin_cities_and_duluth() -> Vec<Source> {
    vec![
        source("Minneapolis", 44.9778, -93.2650),
        source("St. Paul", 44.9537, -93.0900),
        source("Duluth", 46.7867, -92.1005),
    ]
}
