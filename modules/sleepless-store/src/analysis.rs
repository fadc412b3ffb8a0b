//! Offline analysis pass over a loaded store.

use serde::Serialize;
use tracing::info;

use crate::author::Author;
use crate::index::AuthorTable;
use crate::key::AuthorKey;
use crate::store::ActivityStore;
use crate::wakefulness::{apply_wakefulness, max_awake_span, MIN_POSTS_FOR_SIGNAL};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScoringStats {
    pub scored: usize,
    pub raised: usize,
    pub too_sparse: usize,
    pub unchanged: usize,
}

/// Run the wakefulness heuristic once per timeline state.
///
/// Authors with fewer than three posts are skipped, as are authors whose
/// timeline has not grown since they were last scored, so calling this again
/// after a reload or a new harvest never double-applies a multiplier.
pub fn score_authors<T: AuthorTable<Author>>(store: &mut ActivityStore<T>) -> ScoringStats {
    let mut stats = ScoringStats::default();
    for author in store.authors_mut() {
        if author.post_count() < MIN_POSTS_FOR_SIGNAL {
            stats.too_sparse += 1;
            continue;
        }
        if !author.needs_scoring() {
            stats.unchanged += 1;
            continue;
        }
        let result = apply_wakefulness(author);
        author.mark_scored();
        stats.scored += 1;
        if result.multiplier.is_some_and(|m| m > 1.0) {
            stats.raised += 1;
        }
    }
    info!(
        scored = stats.scored,
        raised = stats.raised,
        too_sparse = stats.too_sparse,
        unchanged = stats.unchanged,
        "Wakefulness pass complete"
    );
    stats
}

/// One flagged author in the analysis report.
#[derive(Debug, Clone, Serialize)]
pub struct Suspect {
    pub handle: String,
    pub key: AuthorKey,
    pub bot_score: f64,
    pub max_awake_span: f64,
    pub posts: usize,
    /// Handle contains "bot". Reported only; never folded into the score.
    pub self_declared: bool,
}

/// Authors whose score rose above 1.0 or whose handle declares a bot,
/// highest score first.
pub fn suspects<T: AuthorTable<Author>>(store: &ActivityStore<T>) -> Vec<Suspect> {
    let mut out: Vec<Suspect> = store
        .authors()
        .filter_map(|author| {
            let self_declared = author.handle().to_lowercase().contains("bot");
            if author.bot_score() <= 1.0 && !self_declared {
                return None;
            }
            Some(Suspect {
                handle: author.handle().to_string(),
                key: store.key_for(author.handle()),
                bot_score: author.bot_score(),
                max_awake_span: max_awake_span(author.posts().map(|p| p.created_at)),
                posts: author.post_count(),
                self_declared,
            })
        })
        .collect();
    out.sort_by(|a, b| {
        b.bot_score
            .partial_cmp(&a.bot_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.handle.cmp(&b.handle))
    });
    out
}
