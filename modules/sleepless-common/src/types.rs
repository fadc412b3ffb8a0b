use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// --- Posts ---

/// A single short post as harvested from a remote search.
///
/// Immutable once built. The `(author, created_at)` pair is the identity used
/// for dedup; `remote_id` and `url` are carried for provenance only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    /// Author handle, without the leading `@`.
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Post {
    pub fn new(
        author: impl Into<String>,
        created_at: DateTime<Utc>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            author: author.into(),
            created_at,
            body: body.into(),
            in_reply_to: None,
            remote_id: None,
            url: None,
        }
    }

    pub fn replying_to(mut self, target: impl Into<String>) -> Self {
        self.in_reply_to = Some(target.into());
        self
    }
}

impl fmt::Display for Post {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "@{} - {}", self.author, self.body)?;
        writeln!(f, "date: {}", self.created_at.to_rfc2822())?;
        write!(
            f,
            "reply to: {}",
            self.in_reply_to.as_deref().unwrap_or("-")
        )
    }
}

// --- Sources ---

/// A geographic search origin loaded from the source list.
///
/// Population only decides eligibility; it never weights selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub name: String,
    pub region: String,
    pub lat: f64,
    pub lng: f64,
    pub population: u64,
}

impl Source {
    pub fn origin(&self) -> GeoPoint {
        GeoPoint {
            lat: self.lat,
            lng: self.lng,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}, {}", self.name, self.region, self.population)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lng)
    }
}
