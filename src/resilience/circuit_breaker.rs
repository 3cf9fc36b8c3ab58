//! Circuit breaker for backend protection.
//!
//! # States
//! - Closed: normal operation, call outcomes fill a sliding window
//! - Open: backend assumed down, calls fail fast while a cool-down runs
//! - Half-Open: a capped number of concurrent probes test recovery
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure ratio over the window >= threshold
//!                (once at least min_calls outcomes are present)
//! Open → Half-Open: cool-down elapsed, next allow() becomes a probe
//! Half-Open → Closed: a probe succeeds (window cleared)
//! Half-Open → Open: a probe fails (cool-down restarts)
//! ```
//!
//! Well-formed 4xx answers are recorded as successes; a backend that
//! rejects bad input is working. Rejections issued here never enter the
//! window.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::clients::{Backend, CallError};
use crate::config::BreakerConfig;
use crate::observability::metrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

impl BreakerState {
    fn label(self) -> &'static str {
        match self {
            BreakerState::Closed => "closed",
            BreakerState::Open => "open",
            BreakerState::HalfOpen => "half_open",
        }
    }

    fn gauge_value(self) -> f64 {
        match self {
            BreakerState::Closed => 0.0,
            BreakerState::HalfOpen => 1.0,
            BreakerState::Open => 2.0,
        }
    }
}

/// Breaker tunables, converted once from config.
#[derive(Debug, Clone, Copy)]
pub struct BreakerSettings {
    pub window_size: usize,
    pub min_calls: usize,
    pub failure_ratio: f64,
    pub open_cooldown: Duration,
    pub half_open_max_probes: usize,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            window_size: 10,
            min_calls: 5,
            failure_ratio: 0.5,
            open_cooldown: Duration::from_secs(30),
            half_open_max_probes: 3,
        }
    }
}

impl From<&BreakerConfig> for BreakerSettings {
    fn from(config: &BreakerConfig) -> Self {
        Self {
            window_size: config.window_size,
            min_calls: config.min_calls,
            failure_ratio: config.failure_ratio,
            open_cooldown: Duration::from_secs(config.open_cooldown_secs),
            half_open_max_probes: config.half_open_max_probes,
        }
    }
}

#[derive(Debug)]
struct Inner {
    state: BreakerState,
    /// Trailing call outcomes, true = failure. Only filled while Closed.
    window: VecDeque<bool>,
    opened_at: Option<Instant>,
    probes_in_flight: usize,
    times_opened: u64,
}

/// One breaker guards one backend dependency.
pub struct CircuitBreaker {
    backend: Backend,
    settings: BreakerSettings,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(backend: Backend, settings: BreakerSettings) -> Self {
        Self {
            backend,
            settings,
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                window: VecDeque::with_capacity(settings.window_size),
                opened_at: None,
                probes_in_flight: 0,
                times_opened: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether a call may proceed right now.
    ///
    /// In Half-Open a `true` hands out one of the capped probe slots; the
    /// matching `record_success`/`record_failure` returns it.
    pub fn allow(&self) -> bool {
        let mut inner = self.lock();
        match inner.state {
            BreakerState::Closed => true,
            BreakerState::Open => {
                let cooled = inner
                    .opened_at
                    .map(|at| at.elapsed() >= self.settings.open_cooldown)
                    .unwrap_or(true);
                if cooled {
                    self.transition(&mut inner, BreakerState::HalfOpen);
                    inner.probes_in_flight = 1;
                    true
                } else {
                    false
                }
            }
            BreakerState::HalfOpen => {
                if inner.probes_in_flight < self.settings.half_open_max_probes {
                    inner.probes_in_flight += 1;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Like `allow`, but without claiming a probe slot. The retry workers
    /// use this to skip drain passes that cannot reach the backend.
    pub fn would_allow(&self) -> bool {
        let inner = self.lock();
        match inner.state {
            BreakerState::Closed => true,
            BreakerState::Open => inner
                .opened_at
                .map(|at| at.elapsed() >= self.settings.open_cooldown)
                .unwrap_or(true),
            BreakerState::HalfOpen => inner.probes_in_flight < self.settings.half_open_max_probes,
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.lock();
        match inner.state {
            BreakerState::Closed => {
                self.push_outcome(&mut inner, false);
            }
            BreakerState::HalfOpen => {
                self.transition(&mut inner, BreakerState::Closed);
                inner.window.clear();
                inner.opened_at = None;
                inner.probes_in_flight = 0;
            }
            // Late result from a call admitted before the trip.
            BreakerState::Open => {}
        }
    }

    pub fn record_failure(&self) {
        let mut inner = self.lock();
        match inner.state {
            BreakerState::Closed => {
                self.push_outcome(&mut inner, true);
            }
            BreakerState::HalfOpen => {
                self.transition(&mut inner, BreakerState::Open);
                inner.opened_at = Some(Instant::now());
                inner.probes_in_flight = 0;
                inner.window.clear();
            }
            BreakerState::Open => {}
        }
    }

    /// Record a completed backend call. Transient failures count against
    /// the window; well-formed 4xx answers count as successes.
    pub fn record_call<T>(&self, result: &Result<T, CallError>) {
        match result {
            Ok(_) => self.record_success(),
            Err(err) if err.is_transient() => self.record_failure(),
            Err(_) => self.record_success(),
        }
    }

    pub fn state(&self) -> BreakerState {
        self.lock().state
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let inner = self.lock();
        let calls = inner.window.len();
        let failures = inner.window.iter().filter(|failed| **failed).count();
        let seconds_until_probe = match inner.state {
            BreakerState::Open => inner.opened_at.map(|at| {
                self.settings
                    .open_cooldown
                    .saturating_sub(at.elapsed())
                    .as_secs()
            }),
            _ => None,
        };
        BreakerSnapshot {
            backend: self.backend.name(),
            state: inner.state,
            window_calls: calls,
            window_failures: failures,
            failure_ratio: if calls == 0 {
                0.0
            } else {
                failures as f64 / calls as f64
            },
            seconds_until_probe,
            times_opened: inner.times_opened,
        }
    }

    fn push_outcome(&self, inner: &mut Inner, failed: bool) {
        if inner.window.len() == self.settings.window_size {
            inner.window.pop_front();
        }
        inner.window.push_back(failed);
        if inner.window.len() < self.settings.min_calls {
            return;
        }
        let failures = inner.window.iter().filter(|failed| **failed).count();
        let ratio = failures as f64 / inner.window.len() as f64;
        if ratio >= self.settings.failure_ratio {
            self.transition(inner, BreakerState::Open);
            inner.opened_at = Some(Instant::now());
            inner.window.clear();
            inner.probes_in_flight = 0;
        }
    }

    fn transition(&self, inner: &mut Inner, to: BreakerState) {
        if inner.state == to {
            return;
        }
        let from = inner.state;
        inner.state = to;
        if to == BreakerState::Open {
            inner.times_opened += 1;
            tracing::warn!(
                backend = %self.backend,
                from = from.label(),
                "Breaker opened"
            );
        } else {
            tracing::info!(
                backend = %self.backend,
                from = from.label(),
                to = to.label(),
                "Breaker state changed"
            );
        }
        metrics::breaker_transition(self.backend.name(), to.label());
        metrics::breaker_state(self.backend.name(), to.gauge_value());
    }
}

/// Serializable view of one breaker for the manage surface.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakerSnapshot {
    pub backend: &'static str,
    pub state: BreakerState,
    pub window_calls: usize,
    pub window_failures: usize,
    pub failure_ratio: f64,
    pub seconds_until_probe: Option<u64>,
    pub times_opened: u64,
}

/// The gateway's breakers, one per backend dependency.
pub struct BreakerSet {
    cars: CircuitBreaker,
    rental: CircuitBreaker,
    payment: CircuitBreaker,
}

impl BreakerSet {
    pub fn new(settings: BreakerSettings) -> Self {
        Self {
            cars: CircuitBreaker::new(Backend::Cars, settings),
            rental: CircuitBreaker::new(Backend::Rental, settings),
            payment: CircuitBreaker::new(Backend::Payment, settings),
        }
    }

    pub fn get(&self, backend: Backend) -> &CircuitBreaker {
        match backend {
            Backend::Cars => &self.cars,
            Backend::Rental => &self.rental,
            Backend::Payment => &self.payment,
        }
    }

    pub fn snapshots(&self) -> Vec<BreakerSnapshot> {
        Backend::ALL
            .iter()
            .map(|backend| self.get(*backend).snapshot())
            .collect()
    }
}
