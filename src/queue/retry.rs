//! Bounded per-backend queues of deferred operations.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::Notify;
use uuid::Uuid;

use crate::clients::Backend;
use crate::config::RetryConfig;
use crate::observability::metrics;
use crate::queue::QueuedOperation;
use crate::resilience::calculate_backoff;

/// One deferred operation waiting for replay.
#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub id: Uuid,
    pub operation: QueuedOperation,
    /// Failed replay attempts so far.
    pub attempts: u32,
    pub next_attempt_at: Instant,
    pub created_at: DateTime<Utc>,
}

/// Bounded FIFO of deferred operations for one backend.
///
/// At capacity the oldest entry is evicted and reported; the incoming
/// operation is always accepted, so the caller's pending acknowledgment
/// stays truthful.
pub struct RetryQueue {
    backend: Backend,
    capacity: usize,
    entries: Mutex<VecDeque<QueueEntry>>,
    notify: Notify,
    dropped: AtomicU64,
}

impl RetryQueue {
    pub fn new(backend: Backend, capacity: usize) -> Self {
        Self {
            backend,
            capacity,
            entries: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            dropped: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<QueueEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn enqueue(&self, operation: QueuedOperation, initial_delay: Duration) -> Uuid {
        let entry = QueueEntry {
            id: Uuid::new_v4(),
            operation,
            attempts: 0,
            next_attempt_at: Instant::now() + initial_delay,
            created_at: Utc::now(),
        };
        let id = entry.id;
        let kind = entry.operation.kind();
        let resource = entry.operation.resource_key();

        let depth = {
            let mut entries = self.lock();
            if entries.len() == self.capacity {
                if let Some(evicted) = entries.pop_front() {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    metrics::operation_dropped(self.backend.name());
                    tracing::warn!(
                        backend = %self.backend,
                        operation = evicted.operation.kind(),
                        resource = %evicted.operation.resource_key(),
                        attempts = evicted.attempts,
                        "Retry queue full, oldest operation dropped"
                    );
                }
            }
            entries.push_back(entry);
            entries.len()
        };

        tracing::info!(
            backend = %self.backend,
            operation = kind,
            resource = %resource,
            depth,
            "Operation queued for replay"
        );
        metrics::queue_depth(self.backend.name(), depth);
        self.notify.notify_one();
        id
    }

    /// First entry that is due and not behind an earlier entry for the
    /// same resource. Entries are not removed here; the worker settles
    /// each one via `complete`, `reschedule` or `remove`.
    pub fn next_ready(&self, now: Instant) -> Option<QueueEntry> {
        let entries = self.lock();
        let mut deferred: HashSet<Uuid> = HashSet::new();
        for entry in entries.iter() {
            let key = entry.operation.resource_key();
            if deferred.contains(&key) {
                continue;
            }
            if entry.next_attempt_at <= now {
                return Some(entry.clone());
            }
            deferred.insert(key);
        }
        None
    }

    /// Drop a successfully replayed entry.
    pub fn complete(&self, id: Uuid) -> bool {
        let depth = {
            let mut entries = self.lock();
            let Some(index) = entries.iter().position(|entry| entry.id == id) else {
                return false;
            };
            entries.remove(index);
            entries.len()
        };
        metrics::queue_depth(self.backend.name(), depth);
        true
    }

    /// Remove an entry, e.g. for dead-lettering.
    pub fn remove(&self, id: Uuid) -> Option<QueueEntry> {
        let (entry, depth) = {
            let mut entries = self.lock();
            let index = entries.iter().position(|entry| entry.id == id)?;
            let entry = entries.remove(index);
            (entry, entries.len())
        };
        metrics::queue_depth(self.backend.name(), depth);
        entry
    }

    /// Record a failed replay: bump the attempt count and push the next
    /// try out. Returns the new attempt count, or None if the entry was
    /// evicted in the meantime.
    pub fn reschedule(&self, id: Uuid, next_attempt_at: Instant) -> Option<u32> {
        let mut entries = self.lock();
        let entry = entries.iter_mut().find(|entry| entry.id == id)?;
        entry.attempts += 1;
        entry.next_attempt_at = next_attempt_at;
        Some(entry.attempts)
    }

    pub fn depth(&self) -> usize {
        self.lock().len()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Resolves when new work arrives. Used by the worker alongside its
    /// periodic poll, so a missed signal is never fatal.
    pub async fn notified(&self) {
        self.notify.notified().await;
    }
}

/// The gateway's queues, one per backend, plus the enqueue entry point
/// that applies the configured initial delay.
pub struct QueueSet {
    cars: Arc<RetryQueue>,
    rental: Arc<RetryQueue>,
    payment: Arc<RetryQueue>,
    base_delay_ms: u64,
    max_delay_ms: u64,
}

impl QueueSet {
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            cars: Arc::new(RetryQueue::new(Backend::Cars, config.capacity)),
            rental: Arc::new(RetryQueue::new(Backend::Rental, config.capacity)),
            payment: Arc::new(RetryQueue::new(Backend::Payment, config.capacity)),
            base_delay_ms: config.base_delay_ms,
            max_delay_ms: config.max_delay_ms,
        }
    }

    pub fn get(&self, backend: Backend) -> &Arc<RetryQueue> {
        match backend {
            Backend::Cars => &self.cars,
            Backend::Rental => &self.rental,
            Backend::Payment => &self.payment,
        }
    }

    /// Queue an operation on its owning backend with the first-attempt
    /// backoff delay.
    pub fn enqueue(&self, operation: QueuedOperation) -> Uuid {
        let delay = calculate_backoff(1, self.base_delay_ms, self.max_delay_ms);
        self.get(operation.backend()).enqueue(operation, delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue(capacity: usize) -> RetryQueue {
        RetryQueue::new(Backend::Cars, capacity)
    }

    fn release(car_uid: Uuid) -> QueuedOperation {
        QueuedOperation::ReleaseCar { car_uid }
    }

    #[test]
    fn drains_in_fifo_order() {
        let q = queue(8);
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        q.enqueue(release(first), Duration::ZERO);
        q.enqueue(release(second), Duration::ZERO);

        let entry = q.next_ready(Instant::now()).unwrap();
        assert_eq!(entry.operation.resource_key(), first);
        assert!(q.complete(entry.id));

        let entry = q.next_ready(Instant::now()).unwrap();
        assert_eq!(entry.operation.resource_key(), second);
    }

    #[test]
    fn evicts_oldest_at_capacity() {
        let q = queue(2);
        let uids: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        for uid in &uids {
            q.enqueue(release(*uid), Duration::ZERO);
        }
        assert_eq!(q.depth(), 2);
        assert_eq!(q.dropped(), 1);
        let head = q.next_ready(Instant::now()).unwrap();
        assert_eq!(
            head.operation.resource_key(),
            uids[1],
            "oldest entry should be the one evicted"
        );
    }

    #[test]
    fn not_yet_due_entries_are_skipped() {
        let q = queue(8);
        let waiting = Uuid::new_v4();
        let due = Uuid::new_v4();
        q.enqueue(release(waiting), Duration::from_secs(60));
        q.enqueue(release(due), Duration::ZERO);

        let entry = q.next_ready(Instant::now()).unwrap();
        assert_eq!(
            entry.operation.resource_key(),
            due,
            "a due entry for another resource overtakes a waiting one"
        );
    }

    #[test]
    fn same_resource_entries_never_overtake() {
        let q = queue(8);
        let shared = Uuid::new_v4();
        let other = Uuid::new_v4();
        let first = q.enqueue(release(shared), Duration::ZERO);
        q.enqueue(release(shared), Duration::ZERO);
        q.enqueue(release(other), Duration::ZERO);

        // Push the head entry into the future, as a failed replay would.
        q.reschedule(first, Instant::now() + Duration::from_secs(60));

        let entry = q.next_ready(Instant::now()).unwrap();
        assert_eq!(
            entry.operation.resource_key(),
            other,
            "the second entry for the shared resource must stay blocked"
        );
        assert!(q.complete(entry.id));
        assert!(
            q.next_ready(Instant::now()).is_none(),
            "both remaining entries belong to the deferred resource"
        );
    }

    #[test]
    fn reschedule_counts_attempts() {
        let q = queue(8);
        let id = q.enqueue(release(Uuid::new_v4()), Duration::ZERO);
        assert_eq!(q.reschedule(id, Instant::now()), Some(1));
        assert_eq!(q.reschedule(id, Instant::now()), Some(2));
        assert_eq!(q.reschedule(Uuid::new_v4(), Instant::now()), None);
    }

    #[test]
    fn queue_set_routes_by_owning_backend() {
        let set = QueueSet::new(&RetryConfig {
            capacity: 8,
            max_attempts: 5,
            base_delay_ms: 0,
            max_delay_ms: 0,
            dead_letter_capacity: 16,
        });
        set.enqueue(release(Uuid::new_v4()));
        set.enqueue(QueuedOperation::CancelPayment {
            payment_uid: Uuid::new_v4(),
        });
        assert_eq!(set.get(Backend::Cars).depth(), 1);
        assert_eq!(set.get(Backend::Payment).depth(), 1);
        assert_eq!(set.get(Backend::Rental).depth(), 0);
    }
}
