//! Idempotency tracker
//!
//! Remembers request ids whose dispatch sequence finished. A per-id claim makes
//! "check, dispatch, mark" single-flight: one caller owns an id at a time, the
//! others wait for it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::debug;

#[derive(Debug)]
enum Entry {
    /// Owned by a live `ClaimGuard`
    Pending(watch::Receiver<()>),
    Done,
}

type Entries = Arc<Mutex<HashMap<String, Entry>>>;

fn lock(entries: &Entries) -> MutexGuard<'_, HashMap<String, Entry>> {
    entries.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Result of [`IdempotencyTracker::claim`]
#[derive(Debug)]
pub enum Claim {
    /// Caller is now the only dispatcher for this id
    Claimed(ClaimGuard),
    /// Id already finished
    Processed,
    /// Another caller owns the id
    InFlight(InFlight),
}

/// Tracks finished and in-flight request ids
#[derive(Debug, Default)]
pub struct IdempotencyTracker {
    entries: Entries,
}

impl IdempotencyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once the id's sequence finished
    pub fn is_duplicate(&self, request_id: &str) -> bool {
        matches!(lock(&self.entries).get(request_id), Some(Entry::Done))
    }

    /// Record the id as finished
    pub fn mark_processed(&self, request_id: &str) {
        lock(&self.entries).insert(request_id.to_string(), Entry::Done);
    }

    /// Atomically check and take ownership of `request_id`
    pub fn claim(&self, request_id: &str) -> Claim {
        let mut entries = lock(&self.entries);
        match entries.get(request_id) {
            Some(Entry::Done) => Claim::Processed,
            Some(Entry::Pending(rx)) => Claim::InFlight(InFlight { rx: rx.clone() }),
            None => {
                let (tx, rx) = watch::channel(());
                entries.insert(request_id.to_string(), Entry::Pending(rx));
                Claim::Claimed(ClaimGuard {
                    request_id: request_id.to_string(),
                    entries: Arc::clone(&self.entries),
                    _finished: tx,
                    completed: false,
                })
            }
        }
    }

    /// Number of finished ids
    pub fn processed_count(&self) -> usize {
        lock(&self.entries)
            .values()
            .filter(|entry| matches!(entry, Entry::Done))
            .count()
    }
}

/// Ownership of one request id
///
/// `complete()` marks the id processed. Dropping the guard without completing
/// (rate limiting, cancellation, panic) releases the id. Waiters are woken in
/// both cases.
#[derive(Debug)]
pub struct ClaimGuard {
    request_id: String,
    entries: Entries,
    // dropped after the map update in Drop, which wakes waiters
    _finished: watch::Sender<()>,
    completed: bool,
}

impl ClaimGuard {
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Mark the id processed and wake waiters
    pub fn complete(mut self) {
        lock(&self.entries).insert(self.request_id.clone(), Entry::Done);
        self.completed = true;
    }

    /// Give the id back without marking it
    pub fn release(self) {}
}

impl Drop for ClaimGuard {
    fn drop(&mut self) {
        if self.completed {
            return;
        }
        let mut entries = lock(&self.entries);
        if matches!(entries.get(&self.request_id), Some(Entry::Pending(_))) {
            entries.remove(&self.request_id);
            debug!(request_id = %self.request_id, "Claim released");
        }
    }
}

/// Handle for waiting on another caller's claim
#[derive(Debug)]
pub struct InFlight {
    rx: watch::Receiver<()>,
}

impl InFlight {
    /// Resolve once the owning guard completes or is dropped
    pub async fn wait(mut self) {
        // the sender never sends; changed() errors once it is dropped
        while self.rx.changed().await.is_ok() {}
    }
}
