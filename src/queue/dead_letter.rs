//! Terminal records for operations that exhausted their retry budget.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::observability::metrics;
use crate::queue::QueuedOperation;

/// One operation removed from active retry, kept for operator inspection.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadLetterRecord {
    pub operation: QueuedOperation,
    pub attempts: u32,
    pub reason: String,
    pub dead_lettered_at: DateTime<Utc>,
}

/// Bounded in-memory dead-letter log. Records are reported, never
/// replayed automatically.
pub struct DeadLetterLog {
    records: Mutex<VecDeque<DeadLetterRecord>>,
    capacity: usize,
    total: AtomicU64,
}

impl DeadLetterLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            total: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<DeadLetterRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, operation: QueuedOperation, attempts: u32, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::error!(
            target: "dead_letter",
            backend = %operation.backend(),
            operation = operation.kind(),
            resource = %operation.resource_key(),
            attempts,
            reason = %reason,
            "Operation dead-lettered"
        );
        metrics::dead_letter(operation.backend().name());
        self.total.fetch_add(1, Ordering::Relaxed);

        let record = DeadLetterRecord {
            operation,
            attempts,
            reason,
            dead_lettered_at: Utc::now(),
        };
        let mut records = self.lock();
        if records.len() == self.capacity {
            records.pop_front();
        }
        records.push_back(record);
    }

    /// Total dead-lettered since startup, including records the bounded
    /// log has already rotated out.
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> Vec<DeadLetterRecord> {
        self.lock().iter().cloned().collect()
    }
}
