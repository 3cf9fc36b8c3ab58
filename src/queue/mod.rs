//! Retry queue subsystem.
//!
//! # Data Flow
//! ```text
//! Handler write fails transiently (or breaker is open):
//!     → op.rs (closed set of deferred operation variants)
//!     → retry.rs (bounded per-backend FIFO, oldest evicted at capacity)
//!     → worker.rs (one drain loop per backend, breaker-gated replay,
//!       exponential backoff between attempts)
//!     → dead_letter.rs (terminal record once the attempt budget is spent)
//! ```
//!
//! # Design Decisions
//! - Only mutating calls are queued; a deferred read would be stale on
//!   arrival, so reads fall back immediately instead
//! - Entries for the same resource replay in submission order; entries for
//!   different resources may overtake a backing-off predecessor
//! - Queues are independent per backend and never block each other

pub mod dead_letter;
pub mod op;
pub mod retry;
pub mod worker;

pub use dead_letter::{DeadLetterLog, DeadLetterRecord};
pub use op::QueuedOperation;
pub use retry::{QueueEntry, QueueSet, RetryQueue};
pub use worker::RetryWorker;
