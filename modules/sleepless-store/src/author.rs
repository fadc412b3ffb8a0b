use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use sleepless_common::Post;

use crate::index::OrderedIndex;

/// Everything known about one handle: its timeline and accumulated score.
#[derive(Debug, Clone)]
pub struct Author {
    handle: String,
    timeline: BTreeMap<DateTime<Utc>, Post>,
    bot_score: f64,
    /// Timeline size at the last heuristic pass, if any.
    scored_at: Option<usize>,
}

impl Author {
    pub fn new(handle: impl Into<String>) -> Self {
        Self {
            handle: handle.into(),
            timeline: BTreeMap::new(),
            bot_score: 1.0,
            scored_at: None,
        }
    }

    pub fn handle(&self) -> &str {
        &self.handle
    }

    pub fn bot_score(&self) -> f64 {
        self.bot_score
    }

    /// Add a post to the timeline. A post at an already-present timestamp is
    /// dropped; returns whether the timeline grew.
    pub fn insert(&mut self, post: Post) -> bool {
        debug_assert_eq!(post.author, self.handle);
        self.timeline.insert_if_absent(post.created_at, post)
    }

    pub fn post_count(&self) -> usize {
        self.timeline.size()
    }

    pub fn post_at(&self, at: &DateTime<Utc>) -> Option<&Post> {
        self.timeline.lookup(at)
    }

    /// Posts in ascending timestamp order.
    pub fn posts(&self) -> impl Iterator<Item = &Post> + '_ {
        self.timeline.ascending()
    }

    /// Scale the score. Multipliers below 1.0 are ignored; the score only
    /// ever grows.
    pub fn scale_bot_score(&mut self, multiplier: f64) {
        if multiplier >= 1.0 {
            self.bot_score *= multiplier;
        }
    }

    /// Whether the timeline changed since the last recorded heuristic pass.
    pub fn needs_scoring(&self) -> bool {
        self.scored_at != Some(self.post_count())
    }

    pub(crate) fn mark_scored(&mut self) {
        self.scored_at = Some(self.post_count());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2017, 4, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn same_timestamp_keeps_first_post() {
        let mut author = Author::new("owl");
        assert!(author.insert(Post::new("owl", at(3), "first")));
        assert!(!author.insert(Post::new("owl", at(3), "second")));
        assert_eq!(author.post_count(), 1);
        assert_eq!(author.post_at(&at(3)).unwrap().body, "first");
    }

    #[test]
    fn posts_come_back_in_time_order() {
        let mut author = Author::new("owl");
        for hour in [9, 1, 5] {
            author.insert(Post::new("owl", at(hour), format!("h{hour}")));
        }
        let bodies: Vec<_> = author.posts().map(|p| p.body.as_str()).collect();
        assert_eq!(bodies, vec!["h1", "h5", "h9"]);
    }

    #[test]
    fn score_starts_at_one_and_never_shrinks() {
        let mut author = Author::new("owl");
        assert_eq!(author.bot_score(), 1.0);
        author.scale_bot_score(0.5);
        assert_eq!(author.bot_score(), 1.0);
        author.scale_bot_score(2.0);
        author.scale_bot_score(1.5);
        assert_eq!(author.bot_score(), 3.0);
    }

    #[test]
    fn scoring_mark_tracks_timeline_size() {
        let mut author = Author::new("owl");
        author.insert(Post::new("owl", at(1), "a"));
        assert!(author.needs_scoring());
        author.mark_scored();
        assert!(!author.needs_scoring());
        author.insert(Post::new("owl", at(2), "b"));
        assert!(author.needs_scoring());
    }
}
