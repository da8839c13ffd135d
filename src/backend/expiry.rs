//! Expiry sweeper for the in-memory backend.
//!
//! A single background task per store owns a min-heap of pending
//! expirations and sleeps until the earliest deadline. Each expiration is
//! tied to one insertion (by id), not to the key: when it fires, the entry is
//! removed only if the entry currently stored under that key is the same
//! insertion. A key that was re-set, removed, or wiped by `reset` in the
//! meantime is left alone.
//!
//! Superseded expirations stay queued until their deadline. When the queue
//! grows well past the number of stored entries, it is compacted down to the
//! expirations that still match a stored insertion, so a key rewritten with
//! a long TTL cannot grow the queue without bound.
//!
//! The task holds a `Weak` reference to the store and stops once the store
//! is dropped (its sender closes) or can no longer be upgraded.

use super::inmemory::Shared;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};

/// Channel used by the store to hand new expirations to the sweeper.
pub(crate) type ExpirySender = mpsc::UnboundedSender<Expiration>;

/// Queue length below which the sweeper never compacts.
pub(crate) const COMPACT_FLOOR: usize = 64;

/// A scheduled removal of one specific insertion.
#[derive(Debug)]
pub(crate) struct Expiration {
    pub deadline: Instant,
    pub id: u64,
    pub key: String,
}

impl PartialEq for Expiration {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.id == other.id
    }
}

impl Eq for Expiration {}

impl PartialOrd for Expiration {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Expiration {
    fn cmp(&self, other: &Self) -> Ordering {
        self.deadline
            .cmp(&other.deadline)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Start the sweeper on `handle` and return the sender that feeds it.
///
/// The sweeper publishes its queue length to `pending`.
pub(crate) fn spawn(
    handle: &Handle,
    store: Weak<Shared>,
    pending: Arc<AtomicUsize>,
) -> ExpirySender {
    let (tx, rx) = mpsc::unbounded_channel();
    handle.spawn(run(store, rx, pending));
    tx
}

async fn run(
    store: Weak<Shared>,
    mut rx: mpsc::UnboundedReceiver<Expiration>,
    pending: Arc<AtomicUsize>,
) {
    let mut queue: BinaryHeap<Reverse<Expiration>> = BinaryHeap::new();
    debug!("✓ InMemory expiry sweeper started");

    loop {
        pending.store(queue.len(), AtomicOrdering::Relaxed);
        let next = queue.peek().map(|Reverse(expiration)| expiration.deadline);

        tokio::select! {
            scheduled = rx.recv() => match scheduled {
                Some(expiration) => {
                    queue.push(Reverse(expiration));
                    if queue.len() > COMPACT_FLOOR {
                        let Some(store) = store.upgrade() else {
                            break;
                        };
                        if queue.len() > 2 * store.entry_count() + COMPACT_FLOOR {
                            compact(&mut queue, |e| store.is_scheduled(&e.key, e.id));
                        }
                    }
                }
                None => break,
            },
            _ = sleep_until(next.unwrap_or_else(Instant::now)), if next.is_some() => {
                let Some(store) = store.upgrade() else {
                    break;
                };
                let due = pop_due(&mut queue, Instant::now());
                store.expire(&due).await;
            }
        }
    }

    pending.store(0, AtomicOrdering::Relaxed);
    debug!(
        "InMemory expiry sweeper stopped ({} expirations dropped)",
        queue.len()
    );
}

/// Remove and return every expiration whose deadline is at or before `now`.
fn pop_due(queue: &mut BinaryHeap<Reverse<Expiration>>, now: Instant) -> Vec<Expiration> {
    let mut due = Vec::new();
    while queue
        .peek()
        .is_some_and(|Reverse(expiration)| expiration.deadline <= now)
    {
        if let Some(Reverse(expiration)) = queue.pop() {
            due.push(expiration);
        }
    }
    due
}

/// Drop every queued expiration for which `live` is false.
fn compact<F>(queue: &mut BinaryHeap<Reverse<Expiration>>, live: F)
where
    F: Fn(&Expiration) -> bool,
{
    let before = queue.len();
    queue.retain(|Reverse(expiration)| live(expiration));
    debug!(
        "InMemory expiry queue compacted: {} -> {} expirations",
        before,
        queue.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn expiration(key: &str, id: u64, deadline: Instant) -> Reverse<Expiration> {
        Reverse(Expiration {
            deadline,
            id,
            key: key.to_string(),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_pop_due_in_deadline_order() {
        let now = Instant::now();
        let mut queue = BinaryHeap::new();
        queue.push(expiration("late", 1, now + Duration::from_secs(5)));
        queue.push(expiration("second", 2, now + Duration::from_secs(2)));
        queue.push(expiration("first", 3, now + Duration::from_secs(1)));

        let due = pop_due(&mut queue, now + Duration::from_secs(2));
        let keys: Vec<&str> = due.iter().map(|e| e.key.as_str()).collect();

        assert_eq!(keys, vec!["first", "second"]);
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pop_due_nothing_ready() {
        let now = Instant::now();
        let mut queue = BinaryHeap::new();
        queue.push(expiration("key", 1, now + Duration::from_secs(1)));

        assert!(pop_due(&mut queue, now).is_empty());
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_deadline_ordered_by_insertion() {
        let now = Instant::now();
        let mut queue = BinaryHeap::new();
        queue.push(expiration("b", 9, now));
        queue.push(expiration("a", 4, now));

        let due = pop_due(&mut queue, now);
        assert_eq!(due[0].id, 4);
        assert_eq!(due[1].id, 9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_compact_keeps_live_expirations_in_order() {
        let now = Instant::now();
        let mut queue = BinaryHeap::new();
        for id in 0..10 {
            queue.push(expiration("hot", id, now + Duration::from_secs(id)));
        }
        queue.push(expiration("other", 10, now + Duration::from_secs(3)));

        compact(&mut queue, |e| e.id == 9 || e.key == "other");

        let due = pop_due(&mut queue, now + Duration::from_secs(60));
        let ids: Vec<u64> = due.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![10, 9]);
    }
}
