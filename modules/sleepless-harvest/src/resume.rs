//! Startup corpus recovery.
//!
//! A corpus load that stops on a bad record still leaves everything before
//! it in the store, and the run goes on with that. The file itself is moved
//! aside before any save can replace it, so the records after the bad one
//! stay on disk.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{error, info};

use sleepless_store::{load_corpus, set_aside, ActivityStore, StoreError};

/// Load `path` into `store`. A failed load is logged and handed back rather
/// than propagated; posts read before the failure stay in the store.
pub fn load_tolerant(store: &mut ActivityStore, path: &Path) -> Option<StoreError> {
    match load_corpus(store, path) {
        Ok(stats) => {
            info!(
                read = stats.read,
                new = stats.new,
                longest_chain = store.longest_chain(),
                "Prior corpus ingested"
            );
            None
        }
        Err(e) => {
            error!(
                path = %path.display(),
                error = %e,
                kept = store.post_count(),
                "Corpus load aborted, continuing with what was read"
            );
            Some(e)
        }
    }
}

/// Load the primary corpus for a harvest run. If the load failed part way,
/// rename the file to `<name>.damaged-<tag>` and return the new path.
///
/// Errors only when a damaged corpus cannot be moved out of the way.
pub fn resume_corpus(store: &mut ActivityStore, path: &Path, tag: &str) -> Result<Option<PathBuf>> {
    if load_tolerant(store, path).is_none() {
        return Ok(None);
    }
    let aside = set_aside(path, tag)
        .with_context(|| format!("Failed to set aside damaged corpus {}", path.display()))?;
    Ok(Some(aside))
}
