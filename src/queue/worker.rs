//! Replay loop draining one backend's retry queue.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tokio::time;

use crate::clients::{Backend, Backends, CallError};
use crate::config::RetryConfig;
use crate::model::{BackendRentalCreate, CreatePaymentRequest};
use crate::observability::metrics;
use crate::queue::{DeadLetterLog, QueuedOperation, RetryQueue};
use crate::resilience::{calculate_backoff, BreakerSet};

/// Why a replay did not finish.
enum ReplayError {
    /// Worth another attempt once the backoff elapses.
    Transient(String),
    /// The backend rejected the operation itself; retrying cannot help.
    Fatal(String),
}

/// Drains one backend's queue, replaying deferred operations as the
/// backend allows. Each worker runs on its own task; replays happen one
/// at a time so per-resource ordering is preserved.
pub struct RetryWorker {
    backend: Backend,
    queue: Arc<RetryQueue>,
    breakers: Arc<BreakerSet>,
    clients: Arc<Backends>,
    dead_letters: Arc<DeadLetterLog>,
    config: RetryConfig,
}

impl RetryWorker {
    pub fn new(
        backend: Backend,
        queue: Arc<RetryQueue>,
        breakers: Arc<BreakerSet>,
        clients: Arc<Backends>,
        dead_letters: Arc<DeadLetterLog>,
        config: RetryConfig,
    ) -> Self {
        Self {
            backend,
            queue,
            breakers,
            clients,
            dead_letters,
            config,
        }
    }

    /// Worker loop. Wakes on new work, on a periodic poll for entries
    /// whose backoff has elapsed, and on shutdown. The final drain on
    /// shutdown flushes whatever the backends will still accept.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let poll = Duration::from_millis(self.config.base_delay_ms.clamp(50, 1_000));
        tracing::debug!(backend = %self.backend, "Retry worker started");
        loop {
            tokio::select! {
                _ = self.queue.notified() => {}
                _ = time::sleep(poll) => {}
                _ = shutdown.recv() => {
                    self.drain().await;
                    tracing::debug!(backend = %self.backend, "Retry worker stopped");
                    return;
                }
            }
            self.drain().await;
        }
    }

    /// Replay every due entry. Stops early when the owning backend's
    /// breaker would reject calls anyway, so a dead backend does not
    /// burn through attempt budgets.
    async fn drain(&self) {
        loop {
            if !self.breakers.get(self.backend).would_allow() {
                return;
            }
            let Some(entry) = self.queue.next_ready(Instant::now()) else {
                return;
            };
            match self.try_replay(&entry.operation).await {
                Ok(()) => {
                    self.queue.complete(entry.id);
                    metrics::replay(self.backend.name(), entry.operation.kind(), "completed");
                    tracing::info!(
                        backend = %self.backend,
                        operation = entry.operation.kind(),
                        resource = %entry.operation.resource_key(),
                        attempts = entry.attempts + 1,
                        "Replay completed"
                    );
                }
                Err(ReplayError::Fatal(reason)) => {
                    if let Some(removed) = self.queue.remove(entry.id) {
                        metrics::replay(self.backend.name(), removed.operation.kind(), "dead_lettered");
                        self.dead_letters
                            .push(removed.operation, removed.attempts + 1, reason);
                    }
                }
                Err(ReplayError::Transient(reason)) => {
                    let failed_attempts = entry.attempts + 1;
                    if failed_attempts >= self.config.max_attempts {
                        if let Some(removed) = self.queue.remove(entry.id) {
                            metrics::replay(
                                self.backend.name(),
                                removed.operation.kind(),
                                "dead_lettered",
                            );
                            self.dead_letters
                                .push(removed.operation, failed_attempts, reason);
                        }
                    } else {
                        let delay = calculate_backoff(
                            failed_attempts + 1,
                            self.config.base_delay_ms,
                            self.config.max_delay_ms,
                        );
                        if self
                            .queue
                            .reschedule(entry.id, Instant::now() + delay)
                            .is_some()
                        {
                            metrics::replay(
                                self.backend.name(),
                                entry.operation.kind(),
                                "rescheduled",
                            );
                            tracing::debug!(
                                backend = %self.backend,
                                operation = entry.operation.kind(),
                                resource = %entry.operation.resource_key(),
                                attempts = failed_attempts,
                                delay_ms = delay.as_millis() as u64,
                                reason = %reason,
                                "Replay failed, backing off"
                            );
                        }
                    }
                }
            }
        }
    }

    /// One breaker-guarded backend call inside a replay. Every call goes
    /// through its target's breaker, which may differ from the queue's
    /// owning backend for multi-service operations.
    async fn step<T, F>(&self, backend: Backend, call: F) -> Result<T, ReplayError>
    where
        F: Future<Output = Result<T, CallError>>,
    {
        let breaker = self.breakers.get(backend);
        if !breaker.allow() {
            return Err(ReplayError::Transient(format!("{backend} breaker open")));
        }
        let result = call.await;
        breaker.record_call(&result);
        result.map_err(|err| {
            if err.is_transient() {
                ReplayError::Transient(err.to_string())
            } else {
                ReplayError::Fatal(err.to_string())
            }
        })
    }

    /// Replays re-send the identifiers minted when the operation was
    /// accepted, so a partially applied earlier attempt is converged
    /// rather than duplicated.
    async fn try_replay(&self, operation: &QueuedOperation) -> Result<(), ReplayError> {
        match operation {
            QueuedOperation::CreateRental {
                rental_uid,
                payment_uid,
                username,
                car_uid,
                date_from,
                date_to,
            } => {
                let car = self
                    .step(Backend::Cars, self.clients.cars.get(*car_uid))
                    .await?;
                let price = (*date_to - *date_from).num_days() * car.price;
                let payment = CreatePaymentRequest {
                    payment_uid: Some(*payment_uid),
                    price,
                };
                self.step(Backend::Payment, self.clients.payment.create(&payment))
                    .await?;
                self.step(
                    Backend::Cars,
                    self.clients.cars.set_availability(*car_uid, false),
                )
                .await?;
                let rental = BackendRentalCreate {
                    rental_uid: Some(*rental_uid),
                    username: username.clone(),
                    payment_uid: *payment_uid,
                    car_uid: *car_uid,
                    date_from: *date_from,
                    date_to: *date_to,
                };
                self.step(Backend::Rental, self.clients.rental.create(&rental))
                    .await?;
                Ok(())
            }
            QueuedOperation::CancelRental {
                rental_uid,
                username,
            } => {
                let rental = self
                    .step(Backend::Rental, self.clients.rental.get(*rental_uid, username))
                    .await?;
                self.step(Backend::Rental, self.clients.rental.cancel(*rental_uid))
                    .await?;
                self.step(
                    Backend::Cars,
                    self.clients.cars.set_availability(rental.car_uid, true),
                )
                .await?;
                self.step(
                    Backend::Payment,
                    self.clients.payment.cancel(rental.payment_uid),
                )
                .await?;
                Ok(())
            }
            QueuedOperation::FinishRental {
                rental_uid,
                username,
            } => {
                let rental = self
                    .step(Backend::Rental, self.clients.rental.get(*rental_uid, username))
                    .await?;
                self.step(Backend::Rental, self.clients.rental.finish(*rental_uid))
                    .await?;
                self.step(
                    Backend::Cars,
                    self.clients.cars.set_availability(rental.car_uid, true),
                )
                .await?;
                Ok(())
            }
            QueuedOperation::ReleaseCar { car_uid } => {
                self.step(
                    Backend::Cars,
                    self.clients.cars.set_availability(*car_uid, true),
                )
                .await?;
                Ok(())
            }
            QueuedOperation::CreatePayment { payment_uid, price } => {
                let request = CreatePaymentRequest {
                    payment_uid: Some(*payment_uid),
                    price: *price,
                };
                self.step(Backend::Payment, self.clients.payment.create(&request))
                    .await?;
                Ok(())
            }
            QueuedOperation::CancelPayment { payment_uid } => {
                self.step(Backend::Payment, self.clients.payment.cancel(*payment_uid))
                    .await?;
                Ok(())
            }
        }
    }
}
