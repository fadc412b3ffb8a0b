//! Wakefulness heuristic.
//!
//! Walks an author's timeline once, treating any gap of at most
//! [`MIN_SLEEP_HOURS`] as time spent awake. The longest such awake span is
//! compared with a typical waking day; authors who stay "awake" longer than
//! that get their bot score scaled by the ratio.

use chrono::{DateTime, Utc};

use crate::author::Author;

/// Typical hours awake per day.
pub const AWAKE_HOURS: f64 = 17.0;

/// Shortest gap between two posts assumed to contain sleep.
pub const MIN_SLEEP_HOURS: f64 = 24.0 - AWAKE_HOURS;

/// Timelines shorter than this carry no usable gap signal.
pub const MIN_POSTS_FOR_SIGNAL: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Wakefulness {
    pub max_awake_span: f64,
    /// Factor applied to the bot score, if the span reached [`AWAKE_HOURS`].
    pub multiplier: Option<f64>,
}

/// Longest awake span, in hours, over timestamps in ascending order.
pub fn max_awake_span(timestamps: impl IntoIterator<Item = DateTime<Utc>>) -> f64 {
    let mut current = MIN_SLEEP_HOURS;
    let mut max = MIN_SLEEP_HOURS;
    let mut prev: Option<DateTime<Utc>> = None;

    for ts in timestamps {
        if let Some(p) = prev {
            let gap = hours_between(p, ts);
            if gap <= MIN_SLEEP_HOURS {
                current += gap;
                if current > max {
                    max = current;
                }
            } else {
                current = MIN_SLEEP_HOURS;
            }
        }
        prev = Some(ts);
    }
    max
}

/// Run the heuristic over `author` and apply the multiplier to its score.
///
/// Not idempotent: every call on the same timeline multiplies again. Callers
/// that may revisit an author go through [`crate::analysis::score_authors`].
pub fn apply_wakefulness(author: &mut Author) -> Wakefulness {
    let span = max_awake_span(author.posts().map(|p| p.created_at));
    let multiplier = (span >= AWAKE_HOURS).then(|| span / AWAKE_HOURS);
    if let Some(m) = multiplier {
        author.scale_bot_score(m);
    }
    Wakefulness {
        max_awake_span: span,
        multiplier,
    }
}

fn hours_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    (later - earlier).num_milliseconds() as f64 / 3_600_000.0
}
