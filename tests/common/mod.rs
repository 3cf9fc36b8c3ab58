//! Shared utilities for the gateway integration tests.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use rental_gateway::config::GatewayConfig;
use rental_gateway::lifecycle::Shutdown;
use rental_gateway::GatewayServer;

/// One parsed request seen by a mock backend.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub method: String,
    pub path: String,
    pub body: String,
}

/// Handle to a programmable mock backend.
pub struct MockBackend {
    pub url: String,
    hits: Arc<AtomicU32>,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
}

impl MockBackend {
    #[allow(dead_code)]
    pub fn hits(&self) -> u32 {
        self.hits.load(Ordering::SeqCst)
    }

    #[allow(dead_code)]
    pub fn seen(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }

    /// Requests whose method matches and whose path starts with `prefix`.
    #[allow(dead_code)]
    pub fn seen_matching(&self, method: &str, prefix: &str) -> Vec<SeenRequest> {
        self.seen()
            .into_iter()
            .filter(|r| r.method == method && r.path.starts_with(prefix))
            .collect()
    }
}

/// Start a raw-TCP mock backend. `respond` maps (method, path, body) to
/// a status code and JSON body; the path keeps its query string.
pub async fn start_mock_backend<F>(respond: F) -> MockBackend
where
    F: Fn(&str, &str, &str) -> (u16, Value) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicU32::new(0));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let respond = Arc::new(respond);

    let task_hits = hits.clone();
    let task_seen = seen.clone();
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    let respond = respond.clone();
                    let hits = task_hits.clone();
                    let seen = task_seen.clone();
                    tokio::spawn(async move {
                        let _ = serve_one(socket, respond, hits, seen).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    MockBackend {
        url: format!("http://{}", addr),
        hits,
        seen,
    }
}

async fn serve_one<F>(
    mut socket: TcpStream,
    respond: Arc<F>,
    hits: Arc<AtomicU32>,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
) -> std::io::Result<()>
where
    F: Fn(&str, &str, &str) -> (u16, Value),
{
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    // Read up to the end of the headers.
    let header_end = loop {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = find_subslice(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
        if buf.len() > 64 * 1024 {
            return Ok(());
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let request_line = head.lines().next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();

    let content_length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            if name.eq_ignore_ascii_case("content-length") {
                value.trim().parse::<usize>().ok()
            } else {
                None
            }
        })
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body_end = (header_end + content_length).min(buf.len());
    let body = String::from_utf8_lossy(&buf[header_end..body_end]).to_string();

    hits.fetch_add(1, Ordering::SeqCst);
    seen.lock().unwrap().push(SeenRequest {
        method: method.clone(),
        path: path.clone(),
        body: body.clone(),
    });

    let (status, json) = respond(&method, &path, &body);
    let payload = json.to_string();
    let reason = match status {
        200 => "OK",
        201 => "Created",
        400 => "Bad Request",
        404 => "Not Found",
        409 => "Conflict",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "OK",
    };
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reason,
        payload.len(),
        payload
    );
    socket.write_all(response.as_bytes()).await?;
    socket.shutdown().await?;
    Ok(())
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Gateway config pointed at the given backend URLs, hardened for tests:
/// health probing off, metrics off, short breaker and retry timings.
pub fn test_config(cars: &str, rental: &str, payment: &str) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.backends.cars.base_url = cars.to_string();
    config.backends.rental.base_url = rental.to_string();
    config.backends.payment.base_url = payment.to_string();
    config.breaker.window_size = 4;
    config.breaker.min_calls = 2;
    config.breaker.open_cooldown_secs = 1;
    config.breaker.half_open_max_probes = 1;
    config.retry.base_delay_ms = 50;
    config.retry.max_delay_ms = 200;
    config.timeouts.backend_call_secs = 2;
    config.health.enabled = false;
    config.observability.metrics_enabled = false;
    config
}

/// Boot a gateway on an ephemeral port; returns its base URL and the
/// shutdown handle.
pub async fn spawn_gateway(config: GatewayConfig) -> (String, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = GatewayServer::new(config).unwrap();
    let shutdown = Shutdown::new();
    let handle = shutdown.clone();
    tokio::spawn(async move {
        let _ = server.run(listener, &handle).await;
    });
    (format!("http://{}", addr), shutdown)
}

pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Poll `check` until it passes or the deadline expires.
#[allow(dead_code)]
pub async fn wait_for<F>(deadline: Duration, mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    let start = tokio::time::Instant::now();
    while start.elapsed() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    false
}
