//! Last-known probe results per backend.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::clients::Backend;

#[derive(Debug, Clone, Copy)]
struct ProbeRecord {
    healthy: bool,
    latency: Duration,
    at: Instant,
    consecutive_failures: u32,
}

/// One dependency's line in the aggregate report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyHealth {
    pub name: &'static str,
    /// "ok", "down" or "unknown" (never probed).
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checked_seconds_ago: Option<u64>,
    pub consecutive_failures: u32,
}

/// Body of `/manage/health`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateHealth {
    /// "ok" unless some probed dependency failed or went stale.
    pub status: &'static str,
    pub dependencies: Vec<DependencyHealth>,
}

/// Shared store of probe outcomes, written by the monitor and read by
/// the manage endpoints.
pub struct HealthRegistry {
    freshness: Duration,
    cars: Mutex<Option<ProbeRecord>>,
    rental: Mutex<Option<ProbeRecord>>,
    payment: Mutex<Option<ProbeRecord>>,
}

impl HealthRegistry {
    pub fn new(freshness: Duration) -> Self {
        Self {
            freshness,
            cars: Mutex::new(None),
            rental: Mutex::new(None),
            payment: Mutex::new(None),
        }
    }

    fn slot(&self, backend: Backend) -> MutexGuard<'_, Option<ProbeRecord>> {
        let slot = match backend {
            Backend::Cars => &self.cars,
            Backend::Rental => &self.rental,
            Backend::Payment => &self.payment,
        };
        slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record(&self, backend: Backend, healthy: bool, latency: Duration) {
        let mut slot = self.slot(backend);
        let consecutive_failures = if healthy {
            0
        } else {
            slot.map(|prev| prev.consecutive_failures).unwrap_or(0) + 1
        };
        *slot = Some(ProbeRecord {
            healthy,
            latency,
            at: Instant::now(),
            consecutive_failures,
        });
    }

    /// Aggregate view. A dependency that was never probed shows up as
    /// "unknown" without degrading the aggregate; a failed or stale probe
    /// does degrade it.
    pub fn report(&self) -> AggregateHealth {
        let mut dependencies = Vec::with_capacity(Backend::ALL.len());
        let mut degraded = false;

        for backend in Backend::ALL {
            let record = *self.slot(backend);
            let dependency = match record {
                None => DependencyHealth {
                    name: backend.name(),
                    status: "unknown",
                    latency_ms: None,
                    checked_seconds_ago: None,
                    consecutive_failures: 0,
                },
                Some(record) => {
                    let age = record.at.elapsed();
                    let ok = record.healthy && age <= self.freshness;
                    if !ok {
                        degraded = true;
                    }
                    DependencyHealth {
                        name: backend.name(),
                        status: if ok { "ok" } else { "down" },
                        latency_ms: Some(record.latency.as_millis() as u64),
                        checked_seconds_ago: Some(age.as_secs()),
                        consecutive_failures: record.consecutive_failures,
                    }
                }
            };
            dependencies.push(dependency);
        }

        AggregateHealth {
            status: if degraded { "degraded" } else { "ok" },
            dependencies,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> HealthRegistry {
        HealthRegistry::new(Duration::from_secs(30))
    }

    #[test]
    fn unprobed_dependencies_do_not_degrade() {
        let r = registry();
        let report = r.report();
        assert_eq!(report.status, "ok");
        assert!(report.dependencies.iter().all(|d| d.status == "unknown"));

        r.record(Backend::Cars, true, Duration::from_millis(4));
        let report = r.report();
        assert_eq!(report.status, "ok");
        assert_eq!(report.dependencies[0].status, "ok");
        assert_eq!(report.dependencies[0].latency_ms, Some(4));
    }

    #[test]
    fn failed_probe_degrades_and_counts_failures() {
        let r = registry();
        r.record(Backend::Rental, false, Duration::from_millis(50));
        r.record(Backend::Rental, false, Duration::from_millis(50));

        let report = r.report();
        assert_eq!(report.status, "degraded");
        let rental = report
            .dependencies
            .iter()
            .find(|d| d.name == "rental")
            .unwrap();
        assert_eq!(rental.status, "down");
        assert_eq!(rental.consecutive_failures, 2);

        r.record(Backend::Rental, true, Duration::from_millis(5));
        let report = r.report();
        assert_eq!(report.status, "ok");
        let rental = report
            .dependencies
            .iter()
            .find(|d| d.name == "rental")
            .unwrap();
        assert_eq!(rental.consecutive_failures, 0);
    }

    #[test]
    fn stale_success_counts_as_down() {
        let r = HealthRegistry::new(Duration::from_millis(10));
        r.record(Backend::Payment, true, Duration::from_millis(2));
        std::thread::sleep(Duration::from_millis(30));

        let report = r.report();
        assert_eq!(report.status, "degraded");
        let payment = report
            .dependencies
            .iter()
            .find(|d| d.name == "payment")
            .unwrap();
        assert_eq!(payment.status, "down");
    }
}
