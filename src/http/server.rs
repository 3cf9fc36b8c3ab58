//! Axum server wiring for the gateway.
//!
//! Responsibilities:
//! - Build the router and attach the shared middleware stack
//! - Own the shared state handed to every handler
//! - Spawn the health monitor and one retry worker per backend
//! - Serve until the shutdown channel fires, then drain gracefully

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{MatchedPath, Request};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::clients::{Backend, Backends};
use crate::config::GatewayConfig;
use crate::health::{HealthMonitor, HealthRegistry};
use crate::http::cache::CarCache;
use crate::http::handlers;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::queue::{DeadLetterLog, QueueSet, RetryWorker};
use crate::resilience::{BreakerSet, BreakerSettings};

/// Shared state cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub backends: Arc<Backends>,
    pub breakers: Arc<BreakerSet>,
    pub queues: Arc<QueueSet>,
    pub dead_letters: Arc<DeadLetterLog>,
    pub cache: CarCache,
    pub health: Arc<HealthRegistry>,
}

pub struct GatewayServer {
    state: AppState,
    router: Router,
}

impl GatewayServer {
    pub fn new(config: GatewayConfig) -> Result<Self, reqwest::Error> {
        let backends = Arc::new(Backends::from_config(&config)?);
        let breakers = Arc::new(BreakerSet::new(BreakerSettings::from(&config.breaker)));
        let queues = Arc::new(QueueSet::new(&config.retry));
        let dead_letters = Arc::new(DeadLetterLog::new(config.retry.dead_letter_capacity));
        let health = Arc::new(HealthRegistry::new(Duration::from_secs(
            config.health.stale_after_secs,
        )));

        let state = AppState {
            config: Arc::new(config),
            backends,
            breakers,
            queues,
            dead_letters,
            cache: CarCache::new(),
            health,
        };
        let router = build_router(state.clone());

        Ok(Self { state, router })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Serve on `listener` until `shutdown` fires. Background tasks get
    /// their own shutdown receivers; the retry workers run one final
    /// drain pass before exiting.
    pub async fn run(self, listener: TcpListener, shutdown: &Shutdown) -> std::io::Result<()> {
        let address = listener.local_addr()?;
        let config = self.state.config.clone();

        let monitor = HealthMonitor::new(
            self.state.health.clone(),
            &config.backends,
            config.health.clone(),
        );
        let monitor_shutdown = shutdown.subscribe();
        tokio::spawn(monitor.run(monitor_shutdown));

        for backend in Backend::ALL {
            let worker = RetryWorker::new(
                backend,
                self.state.queues.get(backend).clone(),
                self.state.breakers.clone(),
                self.state.backends.clone(),
                self.state.dead_letters.clone(),
                config.retry.clone(),
            );
            tokio::spawn(worker.run(shutdown.subscribe()));
        }

        tracing::info!(address = %address, "Gateway listening");

        let mut serve_shutdown = shutdown.subscribe();
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = serve_shutdown.recv().await;
            })
            .await?;

        tracing::info!("Gateway stopped");
        Ok(())
    }
}

fn build_router(state: AppState) -> Router {
    let config = state.config.clone();
    Router::new()
        .route("/manage/health", get(handlers::manage_health))
        .route("/manage/breakers", get(handlers::manage_breakers))
        .route("/manage/queue", get(handlers::manage_queue))
        .route("/manage/cache", get(handlers::manage_cache))
        .route("/api/v1/cars", get(handlers::list_cars))
        .route("/api/v1/cars/{car_uid}", get(handlers::get_car))
        .route(
            "/api/v1/rental",
            get(handlers::list_rentals).post(handlers::create_rental),
        )
        .route(
            "/api/v1/rental/{rental_uid}",
            get(handlers::get_rental).delete(handlers::cancel_rental),
        )
        .route(
            "/api/v1/rental/{rental_uid}/finish",
            post(handlers::finish_rental),
        )
        .route("/api/v1/payment", post(handlers::create_payment))
        .route("/api/v1/payment/{payment_uid}", get(handlers::get_payment))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(TimeoutLayer::new(Duration::from_secs(
                    config.timeouts.request_secs,
                )))
                .layer(middleware::from_fn(track_requests))
                .layer(RequestBodyLimitLayer::new(config.listener.max_body_bytes)),
        )
}

/// Records one counter and one latency sample per request, labelled with
/// the matched route template rather than the raw path.
async fn track_requests(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_owned())
        .unwrap_or_else(|| request.uri().path().to_owned());
    let started = Instant::now();

    let response = next.run(request).await;

    metrics::http_request(
        &method,
        &path,
        response.status().as_u16(),
        started.elapsed().as_secs_f64(),
    );
    response
}
