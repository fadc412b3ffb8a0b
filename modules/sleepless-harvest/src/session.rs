use std::time::Duration;

use uuid::Uuid;

use sleepless_common::HarvestSettings;

/// Where the acquisition schedule currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarvestState {
    Idle,
    Polling,
    /// Waiting the short delay before the next poll.
    Scheduled(Duration),
    /// Waiting out a remote cool-down after repeated empty polls.
    Backoff(Duration),
    /// Target reached; final save pending.
    Draining,
}

impl HarvestState {
    pub fn delay(&self) -> Option<Duration> {
        match self {
            HarvestState::Scheduled(d) | HarvestState::Backoff(d) => Some(*d),
            _ => None,
        }
    }
}

/// What the scheduler should do after one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollDecision {
    pub next: HarvestState,
    /// A periodic full save is due.
    pub save_due: bool,
}

/// Counters for one acquisition run. Not persisted: a reload recomputes
/// `collected` from the corpus.
#[derive(Debug, Clone)]
pub struct Session {
    pub run_id: Uuid,
    pub target: usize,
    /// Distinct posts held, including those loaded at startup.
    pub collected: usize,
    /// Distinct posts added by polls in this run.
    pub collected_this_run: usize,
    pub polls: u64,
    pub polls_since_save: u32,
    pub consecutive_empty: u32,
    cursor: usize,
    source_count: usize,
}

impl Session {
    pub fn new(target: usize, already_collected: usize, source_count: usize) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            target,
            collected: already_collected,
            collected_this_run: 0,
            polls: 0,
            polls_since_save: 0,
            consecutive_empty: 0,
            cursor: 0,
            source_count: source_count.max(1),
        }
    }

    /// Index of the source to poll now; advances the round-robin cursor.
    pub fn next_source(&mut self) -> usize {
        let idx = self.cursor;
        self.cursor = (self.cursor + 1) % self.source_count;
        idx
    }

    pub fn target_reached(&self) -> bool {
        self.collected >= self.target
    }

    /// Fold one poll's result into the counters and pick the next state.
    /// Failed polls are recorded as `fresh = 0`.
    pub fn record_poll(&mut self, fresh: usize, settings: &HarvestSettings) -> PollDecision {
        self.polls += 1;
        self.collected += fresh;
        self.collected_this_run += fresh;

        self.polls_since_save += 1;
        let save_due = self.polls_since_save >= settings.save_every;
        if save_due {
            self.polls_since_save = 0;
        }

        let next = if self.target_reached() {
            HarvestState::Draining
        } else if fresh > 0 {
            self.consecutive_empty = 0;
            HarvestState::Scheduled(settings.gather_delay)
        } else {
            self.consecutive_empty += 1;
            if self.consecutive_empty > settings.failure_threshold {
                HarvestState::Backoff(settings.backoff_delay)
            } else {
                HarvestState::Scheduled(settings.gather_delay)
            }
        };

        PollDecision { next, save_due }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> HarvestSettings {
        HarvestSettings::default()
    }

    #[test]
    fn round_robin_visits_each_source_once_per_cycle() {
        let mut session = Session::new(100, 0, 4);
        let first: Vec<_> = (0..4).map(|_| session.next_source()).collect();
        assert_eq!(first, vec![0, 1, 2, 3]);
        assert_eq!(session.next_source(), 0);
    }

    #[test]
    fn third_empty_poll_switches_to_backoff() {
        let s = settings();
        let mut session = Session::new(100, 0, 1);
        assert_eq!(session.record_poll(0, &s).next, HarvestState::Scheduled(s.gather_delay));
        assert_eq!(session.record_poll(0, &s).next, HarvestState::Scheduled(s.gather_delay));
        assert_eq!(session.record_poll(0, &s).next, HarvestState::Backoff(s.backoff_delay));
        assert_eq!(session.consecutive_empty, 3);
    }

    #[test]
    fn non_empty_poll_resets_backoff() {
        let s = settings();
        let mut session = Session::new(100, 0, 1);
        for _ in 0..4 {
            session.record_poll(0, &s);
        }
        let decision = session.record_poll(3, &s);
        assert_eq!(session.consecutive_empty, 0);
        assert_eq!(decision.next, HarvestState::Scheduled(s.gather_delay));
        assert_eq!(decision.next.delay(), Some(s.gather_delay));
    }

    #[test]
    fn save_is_due_every_configured_polls() {
        let s = settings();
        let mut session = Session::new(10_000, 0, 1);
        let due: Vec<u64> = (1..=25)
            .filter_map(|i| session.record_poll(1, &s).save_due.then_some(i))
            .collect();
        assert_eq!(due, vec![10, 20]);
    }

    #[test]
    fn reaching_target_drains() {
        let s = settings();
        let mut session = Session::new(10, 4, 1);
        assert!(!session.target_reached());
        assert_eq!(session.record_poll(6, &s).next, HarvestState::Draining);
        assert_eq!(session.collected, 10);
        assert_eq!(session.collected_this_run, 6);
        assert_eq!(HarvestState::Draining.delay(), None);
    }

    #[test]
    fn loaded_corpus_counts_toward_target() {
        let session = Session::new(10, 12, 1);
        assert!(session.target_reached());
    }
}
