//! The acquisition scheduler.
//!
//! One task owns the store and drives it through a simple cycle: wait, poll
//! the next source, ingest, decide the next delay. Waiting and polling both
//! race the shutdown signal, and whichever way the run ends the harvester
//! writes the final snapshot itself.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Result};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use typed_builder::TypedBuilder;
use uuid::Uuid;

use sleepless_common::{HarvestSettings, Source};
use sleepless_store::{encode_corpus, write_atomic, ActivityStore};

use crate::session::{HarvestState, Session};
use crate::shutdown;
use crate::source::{PostSource, SearchRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEnd {
    /// Distinct-post target reached; final save went to the corpus.
    TargetReached,
    /// Shutdown requested; final save went to the snapshot target.
    Shutdown,
}

#[derive(Debug, Clone)]
pub struct HarvestReport {
    pub run_id: Uuid,
    pub end: RunEnd,
    pub polls: u64,
    pub collected: usize,
    pub collected_this_run: usize,
    pub saves: u32,
    pub failed_saves: u32,
}

impl fmt::Display for HarvestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "run {} ended ({:?}) after {} polls: {} posts held, {} new this run, {} saves ({} failed)",
            self.run_id,
            self.end,
            self.polls,
            self.collected,
            self.collected_this_run,
            self.saves,
            self.failed_saves
        )
    }
}

#[derive(TypedBuilder)]
pub struct Harvester<S> {
    source: S,
    store: ActivityStore,
    sources: Vec<Source>,
    #[builder(setter(into))]
    query: String,
    target: usize,
    #[builder(default)]
    settings: HarvestSettings,
    #[builder(setter(into))]
    corpus_path: PathBuf,
    #[builder(setter(into))]
    snapshot_path: PathBuf,
    #[builder(default = HarvestState::Idle, setter(skip))]
    state: HarvestState,
    #[builder(default, setter(skip))]
    saves: u32,
    #[builder(default, setter(skip))]
    failed_saves: u32,
}

impl<S: PostSource> Harvester<S> {
    pub fn store(&self) -> &ActivityStore {
        &self.store
    }

    pub fn state(&self) -> HarvestState {
        self.state
    }

    /// Run until the target is reached or `stop` flips to true.
    ///
    /// Source failures and failed saves are logged and absorbed; the only
    /// error returned is a run that cannot start.
    pub async fn run(&mut self, mut stop: watch::Receiver<bool>) -> Result<HarvestReport> {
        if self.sources.is_empty() {
            bail!("no eligible sources to poll");
        }

        let mut session = Session::new(self.target, self.store.post_count(), self.sources.len());
        info!(
            run_id = %session.run_id,
            target = session.target,
            already_collected = session.collected,
            sources = self.sources.len(),
            query = self.query.as_str(),
            "Harvest starting"
        );

        self.state = if session.target_reached() {
            HarvestState::Draining
        } else {
            HarvestState::Scheduled(self.settings.gather_delay)
        };

        loop {
            if self.state == HarvestState::Draining {
                return Ok(self.drain(&session).await);
            }

            let delay = self.state.delay().unwrap_or(self.settings.gather_delay);
            if !self.wait(delay, &mut stop).await {
                return Ok(self.flush_on_shutdown(&session).await);
            }

            self.transition(HarvestState::Polling);
            let polled = tokio::select! {
                fresh = self.poll(&mut session) => Some(fresh),
                _ = shutdown::requested(&mut stop) => None,
            };
            let Some(fresh) = polled else {
                return Ok(self.flush_on_shutdown(&session).await);
            };

            let decision = session.record_poll(fresh, &self.settings);
            if decision.save_due {
                info!(polls = session.polls, "Periodic save");
                let path = self.corpus_path.clone();
                self.save(&path).await;
            }
            if let HarvestState::Backoff(d) = decision.next {
                warn!(
                    consecutive_empty = session.consecutive_empty,
                    cooldown_secs = d.as_secs(),
                    "Repeated empty polls, backing off"
                );
            }
            self.transition(decision.next);
        }
    }

    /// Sleep for `delay`. Returns false if shutdown was requested first.
    async fn wait(&self, delay: Duration, stop: &mut watch::Receiver<bool>) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(delay) => true,
            _ = shutdown::requested(stop) => false,
        }
    }

    /// One bounded search against the next source. Returns the number of new
    /// posts; a failed search counts as zero.
    async fn poll(&mut self, session: &mut Session) -> usize {
        let idx = session.next_source();
        let source = &self.sources[idx];
        let request = SearchRequest {
            query: self.query.clone(),
            origin: source.origin(),
            radius_km: self.settings.radius_km,
            max_results: self.settings.max_results,
        };

        match self.source.search(&request).await {
            Ok(posts) => {
                let offered = posts.len();
                let fresh = self.store.ingest_batch(posts);
                info!(
                    source = %source,
                    offered,
                    fresh,
                    collected = session.collected + fresh,
                    "Poll complete"
                );
                fresh
            }
            Err(e) => {
                warn!(source = %source, error = %e, "Search failed, counting as an empty poll");
                0
            }
        }
    }

    async fn drain(&mut self, session: &Session) -> HarvestReport {
        info!(collected = session.collected, "Target reached, draining");
        let path = self.corpus_path.clone();
        self.save(&path).await;
        self.transition(HarvestState::Idle);
        self.report(session, RunEnd::TargetReached)
    }

    async fn flush_on_shutdown(&mut self, session: &Session) -> HarvestReport {
        info!(
            collected = session.collected,
            path = %self.snapshot_path.display(),
            "Shutdown requested, writing final snapshot"
        );
        let path = self.snapshot_path.clone();
        self.save(&path).await;
        self.transition(HarvestState::Idle);
        self.report(session, RunEnd::Shutdown)
    }

    /// Full snapshot to `path`. Failures are logged and the run carries on.
    async fn save(&mut self, path: &Path) {
        match write_snapshot(&self.store, path).await {
            Ok(posts) => {
                self.saves += 1;
                info!(path = %path.display(), posts, "Corpus saved");
            }
            Err(e) => {
                self.failed_saves += 1;
                error!(path = %path.display(), error = %e, "Save failed, skipping");
            }
        }
    }

    fn transition(&mut self, next: HarvestState) {
        debug!(from = ?self.state, to = ?next, "Harvest state");
        self.state = next;
    }

    fn report(&self, session: &Session, end: RunEnd) -> HarvestReport {
        HarvestReport {
            run_id: session.run_id,
            end,
            polls: session.polls,
            collected: session.collected,
            collected_this_run: session.collected_this_run,
            saves: self.saves,
            failed_saves: self.failed_saves,
        }
    }
}

/// Encode on the scheduler task, then do the file write and fsync on the
/// blocking pool.
async fn write_snapshot(store: &ActivityStore, path: &Path) -> Result<usize> {
    let (bytes, written) = encode_corpus(store)?;
    let target = path.to_path_buf();
    tokio::task::spawn_blocking(move || write_atomic(&target, &bytes)).await??;
    Ok(written)
}
