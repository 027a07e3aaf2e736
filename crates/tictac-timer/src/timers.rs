//! Keyed, cancellable one-shot deadlines.

use std::fmt::Debug;
use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::trace;

/// A set of pending deadlines, at most one per key.
///
/// Scheduling a key that is already pending replaces its deadline.
/// Dropping the `Timers` cancels everything, which is how a deleted room
/// guarantees that no stale timer fires afterwards.
///
/// A fired key only tells the owner that *something* was due. The owner
/// must re-check its own state before acting: the world may have moved on
/// since the deadline was set.
#[derive(Debug)]
pub struct Timers<K> {
    pending: Vec<(K, Instant)>,
}

impl<K> Default for Timers<K> {
    fn default() -> Self {
        Self {
            pending: Vec::new(),
        }
    }
}

impl<K: Copy + Eq + Debug> Timers<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `key` to fire `delay` from now.
    pub fn schedule(&mut self, key: K, delay: Duration) {
        self.schedule_at(key, Instant::now() + delay);
    }

    /// Schedules `key` to fire at `deadline`, replacing any earlier
    /// deadline for the same key.
    pub fn schedule_at(&mut self, key: K, deadline: Instant) {
        match self.pending.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = deadline,
            None => self.pending.push((key, deadline)),
        }
        trace!(?key, "timer scheduled");
    }

    /// Cancels `key`. Returns `true` if it was pending.
    pub fn cancel(&mut self, key: K) -> bool {
        let before = self.pending.len();
        self.pending.retain(|(k, _)| *k != key);
        let removed = self.pending.len() != before;
        if removed {
            trace!(?key, "timer cancelled");
        }
        removed
    }

    /// Cancels every pending key.
    pub fn cancel_all(&mut self) {
        self.pending.clear();
    }

    pub fn is_scheduled(&self, key: K) -> bool {
        self.pending.iter().any(|(k, _)| *k == key)
    }

    /// The deadline for `key`, if pending.
    pub fn deadline(&self, key: K) -> Option<Instant> {
        self.pending
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, at)| *at)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Waits for the earliest pending deadline and returns its key.
    ///
    /// The key is removed only once it fires, so dropping this future
    /// (e.g. when another `select!` branch wins) leaves the set unchanged.
    /// With nothing pending the future never resolves.
    pub async fn next_due(&mut self) -> K {
        let Some((key, deadline)) = self
            .pending
            .iter()
            .copied()
            .min_by_key(|(_, at)| *at)
        else {
            return std::future::pending::<K>().await;
        };

        time::sleep_until(deadline).await;

        self.pending.retain(|(k, _)| *k != key);
        trace!(?key, "timer fired");
        key
    }
}
