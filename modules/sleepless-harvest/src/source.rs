// The remote search boundary.
//
// PostSource is the only thing the harvester knows about the network: one
// bounded search around a point, returning posts in whatever order the remote
// side produced them. ApifyClient is the production implementation;
// testing::MockSource scripts responses for tests.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use apify_client::{ApifyClient, ApifyError, Tweet};
use sleepless_common::{GeoPoint, Post};

#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: String,
    pub origin: GeoPoint,
    pub radius_km: u32,
    pub max_results: u32,
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Search service unavailable: {0}")]
    Transient(String),

    #[error("Malformed search response: {0}")]
    Malformed(String),

    #[error("Search rejected: {0}")]
    Rejected(String),
}

impl From<ApifyError> for SourceError {
    fn from(err: ApifyError) -> Self {
        match err {
            ApifyError::Parse(msg) => SourceError::Malformed(msg),
            other if other.is_retryable() => SourceError::Transient(other.to_string()),
            other => SourceError::Rejected(other.to_string()),
        }
    }
}

#[async_trait]
pub trait PostSource: Send + Sync {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<Post>, SourceError>;
}

#[async_trait]
impl<T: PostSource + ?Sized> PostSource for Arc<T> {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<Post>, SourceError> {
        (**self).search(request).await
    }
}

// --- PostSource impl for ApifyClient ---

#[async_trait]
impl PostSource for ApifyClient {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<Post>, SourceError> {
        let tweets = self
            .search_tweets(
                &request.query,
                request.origin.lat,
                request.origin.lng,
                request.radius_km,
                request.max_results,
            )
            .await?;
        let total = tweets.len();
        let posts: Vec<Post> = tweets.into_iter().filter_map(tweet_to_post).collect();
        if posts.len() < total {
            debug!(total, kept = posts.len(), "Dropped tweets without author or timestamp");
        }
        Ok(posts)
    }
}

/// Tweets without an author handle or a parseable timestamp cannot be keyed
/// and are dropped.
pub fn tweet_to_post(tweet: Tweet) -> Option<Post> {
    let author = tweet.author_handle()?.to_string();
    let created_at = tweet.created_at_utc()?;
    let body = tweet.content().unwrap_or_default().to_string();
    Some(Post {
        author,
        created_at,
        body,
        in_reply_to: tweet.in_reply_to_username,
        remote_id: tweet.id,
        url: tweet.url,
    })
}
