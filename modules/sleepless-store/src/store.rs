use tracing::debug;

use sleepless_common::Post;

use crate::author::Author;
use crate::error::Result;
use crate::index::{AuthorTable, ChainedTable};
use crate::key::{AuthorKey, KeySpace};

/// Result of routing one post through [`ActivityStore::ingest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOutcome {
    pub key: AuthorKey,
    pub is_new: bool,
}

/// All harvested posts, indexed by author.
///
/// The bucket count is fixed when the store is built. Every post, whether it
/// comes from a poll or from a corpus load, enters through [`ingest`], which
/// is the only place dedup happens.
///
/// [`ingest`]: ActivityStore::ingest
pub struct ActivityStore<T = ChainedTable<Author>> {
    space: KeySpace,
    authors: T,
    post_count: usize,
}

/// Upper bound on the bucket count of a store built from a size hint.
/// Larger hints still work; chains just get longer.
pub const MAX_BUCKETS: usize = 1 << 20;

impl ActivityStore {
    /// Build a store sized from the number of posts the run expects to hold,
    /// capped at [`MAX_BUCKETS`].
    pub fn with_capacity_hint(expected_posts: usize) -> Result<Self> {
        let space = KeySpace::new(expected_posts.clamp(1, MAX_BUCKETS))?;
        Ok(Self::with_table(space, ChainedTable::new(space)))
    }

    /// Longest bucket chain, for load diagnostics.
    pub fn longest_chain(&self) -> usize {
        self.authors.longest_chain()
    }
}

impl<T: AuthorTable<Author>> ActivityStore<T> {
    pub fn with_table(space: KeySpace, authors: T) -> Self {
        Self {
            space,
            authors,
            post_count: 0,
        }
    }

    pub fn key_space(&self) -> KeySpace {
        self.space
    }

    pub fn key_for(&self, handle: &str) -> AuthorKey {
        self.space.key(handle)
    }

    /// Route one post to its author, creating the author on first sight.
    pub fn ingest(&mut self, post: Post) -> IngestOutcome {
        let key = self.space.key(&post.author);
        let author = self
            .authors
            .get_or_insert_with(key, &post.author, || Author::new(post.author.clone()));
        let is_new = author.insert(post);
        if is_new {
            self.post_count += 1;
        }
        IngestOutcome { key, is_new }
    }

    /// Ingest posts in arrival order; returns how many were new.
    pub fn ingest_batch(&mut self, posts: impl IntoIterator<Item = Post>) -> usize {
        let mut offered = 0usize;
        let mut fresh = 0usize;
        for post in posts {
            offered += 1;
            if self.ingest(post).is_new {
                fresh += 1;
            }
        }
        debug!(offered, fresh, "Batch ingested");
        fresh
    }

    pub fn author(&self, handle: &str) -> Option<&Author> {
        self.authors.get(self.space.key(handle), handle)
    }

    pub fn authors(&self) -> impl Iterator<Item = &Author> + '_ {
        self.authors.values()
    }

    pub fn authors_mut(&mut self) -> impl Iterator<Item = &mut Author> + '_ {
        self.authors.values_mut()
    }

    /// Every post, author by author, each timeline ascending.
    pub fn posts(&self) -> impl Iterator<Item = &Post> + '_ {
        self.authors.values().flat_map(|a| a.posts())
    }

    pub fn author_count(&self) -> usize {
        self.authors.len()
    }

    /// Distinct posts held.
    pub fn post_count(&self) -> usize {
        self.post_count
    }
}
