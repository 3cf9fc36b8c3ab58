//! Periodic probing of every backend's manage endpoint.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::Request;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::sync::broadcast;
use tokio::time;

use crate::clients::Backend;
use crate::config::{BackendsConfig, HealthConfig};
use crate::health::HealthRegistry;
use crate::observability::metrics;

pub struct HealthMonitor {
    registry: Arc<HealthRegistry>,
    targets: Vec<(Backend, String)>,
    config: HealthConfig,
    client: Client<HttpConnector, Body>,
}

impl HealthMonitor {
    pub fn new(
        registry: Arc<HealthRegistry>,
        backends: &BackendsConfig,
        config: HealthConfig,
    ) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        let targets = Backend::ALL
            .iter()
            .map(|backend| {
                let base = backends.url(*backend).trim_end_matches('/');
                (*backend, format!("{base}/manage/health"))
            })
            .collect();

        Self {
            registry,
            targets,
            config,
            client,
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Backend health probes disabled");
            return;
        }

        tracing::info!(
            interval = self.config.interval_secs,
            timeout = self.config.timeout_secs,
            "Health monitor started"
        );

        let mut ticker = time::interval(Duration::from_secs(self.config.interval_secs));
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.probe_all().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor stopped");
                    return;
                }
            }
        }
    }

    async fn probe_all(&self) {
        let timeout = Duration::from_secs(self.config.timeout_secs);

        for (backend, url) in &self.targets {
            let request = match Request::builder()
                .method("GET")
                .uri(url.as_str())
                .header("user-agent", "rental-gateway-health")
                .body(Body::empty())
            {
                Ok(request) => request,
                Err(err) => {
                    tracing::error!(backend = %backend, error = %err, "Probe request build failed");
                    continue;
                }
            };

            let started = Instant::now();
            let healthy = match time::timeout(timeout, self.client.request(request)).await {
                Ok(Ok(response)) => {
                    let ok = response.status().is_success();
                    if !ok {
                        tracing::warn!(
                            backend = %backend,
                            status = %response.status(),
                            "Probe answered non-success"
                        );
                    }
                    ok
                }
                Ok(Err(err)) => {
                    tracing::warn!(backend = %backend, error = %err, "Probe connection failed");
                    false
                }
                Err(_) => {
                    tracing::warn!(backend = %backend, "Probe timed out");
                    false
                }
            };
            let latency = started.elapsed();

            self.registry.record(*backend, healthy, latency);
            metrics::backend_up(backend.name(), healthy);
            metrics::probe_duration(backend.name(), latency.as_secs_f64());
        }
    }
}
