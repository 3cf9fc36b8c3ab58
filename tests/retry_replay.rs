//! Replay behavior of the retry queue: queued writes acknowledged with
//! 202 PENDING, idempotent replay after recovery, compensation queuing,
//! and dead-lettering once attempts run out.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use uuid::Uuid;

mod common;

const DOWN: &str = "http://127.0.0.1:9";

fn sample_car(car_uid: Uuid) -> Value {
    json!({
        "carUid": car_uid,
        "brand": "Kia",
        "model": "Rio",
        "registrationNumber": "K777KK77",
        "power": 100,
        "price": 3000,
        "type": "SEDAN",
        "available": true,
    })
}

async fn manage_queue(client: &reqwest::Client, gateway: &str) -> Value {
    client
        .get(format!("{gateway}/manage/queue"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

fn queue_depth(report: &Value, backend: &str) -> i64 {
    report["queues"]
        .as_array()
        .unwrap()
        .iter()
        .find(|q| q["backend"] == backend)
        .unwrap()["depth"]
        .as_i64()
        .unwrap()
}

#[tokio::test]
async fn queued_rental_create_replays_once_after_recovery() {
    let car_uid = Uuid::new_v4();
    let car = sample_car(car_uid);
    let cars = common::start_mock_backend(move |method, _path, _body| {
        if method == "PATCH" {
            (200, json!({}))
        } else {
            (200, car.clone())
        }
    })
    .await;

    let payments = common::start_mock_backend(|_method, _path, body| {
        let request: Value = serde_json::from_str(body).unwrap_or_else(|_| json!({}));
        (
            200,
            json!({
                "paymentUid": request["paymentUid"],
                "status": "PAID",
                "price": request["price"],
            }),
        )
    })
    .await;

    let failing = Arc::new(AtomicBool::new(true));
    let flag = failing.clone();
    let rentals = common::start_mock_backend(move |_method, _path, body| {
        if flag.load(Ordering::SeqCst) {
            return (503, json!({"message": "maintenance"}));
        }
        let request: Value = serde_json::from_str(body).unwrap_or_else(|_| json!({}));
        (
            200,
            json!({
                "rentalUid": request["rentalUid"],
                "username": request["username"],
                "paymentUid": request["paymentUid"],
                "carUid": request["carUid"],
                "dateFrom": request["dateFrom"],
                "dateTo": request["dateTo"],
                "status": "IN_PROGRESS",
            }),
        )
    })
    .await;

    let (gateway, shutdown) = common::spawn_gateway(common::test_config(
        &cars.url,
        &rentals.url,
        &payments.url,
    ))
    .await;
    let client = common::http_client();

    let response = client
        .post(format!("{gateway}/api/v1/rental"))
        .header("X-User-Name", "alice")
        .json(&json!({
            "carUid": car_uid,
            "dateFrom": "2024-03-01",
            "dateTo": "2024-03-05",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 202);
    let ack: Value = response.json().await.unwrap();
    assert_eq!(ack["status"], "PENDING");
    let acked_rental_uid = ack["rentalUid"].clone();
    assert!(acked_rental_uid.is_string());

    // The backend heals; the queued operation should land exactly once.
    failing.store(false, Ordering::SeqCst);

    let deadline = tokio::time::Instant::now() + Duration::from_secs(4);
    loop {
        if rentals.seen_matching("POST", "/api/v1/rental").len() >= 2 {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "replay never reached the rental service"
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    // Every attempt carried the same gateway-minted identifiers, so the
    // backends can deduplicate no matter how many times the replay fired.
    let rental_posts = rentals.seen_matching("POST", "/api/v1/rental");
    assert!(rental_posts.len() >= 2);
    for post in &rental_posts {
        let body: Value = serde_json::from_str(&post.body).unwrap();
        assert_eq!(body["rentalUid"], acked_rental_uid);
    }

    let payment_posts = payments.seen_matching("POST", "/api/v1/payment");
    assert!(payment_posts.len() >= 2);
    let first: Value = serde_json::from_str(&payment_posts[0].body).unwrap();
    for post in &payment_posts {
        let body: Value = serde_json::from_str(&post.body).unwrap();
        assert_eq!(body["paymentUid"], first["paymentUid"]);
    }

    // The queue drains and nothing dead-letters.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let report = manage_queue(&client, &gateway).await;
        if queue_depth(&report, "rental") == 0 {
            assert_eq!(report["deadLetters"]["total"], 0);
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "queue never drained"
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    shutdown.trigger();
}

#[tokio::test]
async fn exhausted_payment_create_moves_to_dead_letters() {
    let mut config = common::test_config(DOWN, DOWN, DOWN);
    // Keep the breaker quiet so every attempt reaches the dead socket.
    config.breaker.window_size = 10;
    config.breaker.min_calls = 5;
    config.retry.max_attempts = 3;

    let (gateway, shutdown) = common::spawn_gateway(config).await;
    let client = common::http_client();

    let response = client
        .post(format!("{gateway}/api/v1/payment"))
        .json(&json!({"price": 100}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 202);
    let ack: Value = response.json().await.unwrap();
    assert_eq!(ack["status"], "PENDING");
    assert_eq!(ack["price"], 100);

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    let report = loop {
        let report = manage_queue(&client, &gateway).await;
        if report["deadLetters"]["total"] == 1 {
            break report;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "operation never dead-lettered"
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
    };

    assert_eq!(queue_depth(&report, "payment"), 0);
    let record = &report["deadLetters"]["records"][0];
    assert_eq!(record["operation"]["operation"], "create_payment");
    assert_eq!(record["operation"]["paymentUid"], ack["paymentUid"]);
    assert_eq!(record["attempts"], 3);

    shutdown.trigger();
}

#[tokio::test]
async fn cancel_compensations_queue_while_payment_is_down() {
    let car_uid = Uuid::new_v4();
    let rental_uid = Uuid::new_v4();
    let payment_uid = Uuid::new_v4();

    let cars = common::start_mock_backend(|_method, _path, _body| (200, json!({}))).await;

    let rental = json!({
        "rentalUid": rental_uid,
        "username": "alice",
        "paymentUid": payment_uid,
        "carUid": car_uid,
        "dateFrom": "2024-03-01",
        "dateTo": "2024-03-05",
        "status": "IN_PROGRESS",
    });
    let rentals = common::start_mock_backend(move |method, _path, _body| match method {
        "GET" => (200, rental.clone()),
        _ => (200, json!({})),
    })
    .await;

    let mut config = common::test_config(&cars.url, &rentals.url, DOWN);
    // Slow the worker down so the queued compensation is observable.
    config.retry.base_delay_ms = 500;
    config.retry.max_delay_ms = 2_000;
    config.retry.max_attempts = 10;

    let (gateway, shutdown) = common::spawn_gateway(config).await;
    let client = common::http_client();

    let response = client
        .delete(format!("{gateway}/api/v1/rental/{rental_uid}"))
        .header("X-User-Name", "alice")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 204);

    // The car release went through live.
    let releases = cars.seen_matching(
        "PATCH",
        &format!("/api/v1/cars/{car_uid}/availability"),
    );
    assert_eq!(releases.len(), 1);
    assert!(releases[0].path.contains("available=true"));

    // The payment cancel could not, so it waits in the queue.
    let report = manage_queue(&client, &gateway).await;
    assert_eq!(queue_depth(&report, "payment"), 1);
    assert_eq!(report["deadLetters"]["total"], 0);

    shutdown.trigger();
}

#[tokio::test]
async fn finish_is_acknowledged_pending_and_replayed() {
    let car_uid = Uuid::new_v4();
    let rental_uid = Uuid::new_v4();
    let payment_uid = Uuid::new_v4();

    let cars = common::start_mock_backend(|_method, _path, _body| (200, json!({}))).await;

    let rental = json!({
        "rentalUid": rental_uid,
        "username": "alice",
        "paymentUid": payment_uid,
        "carUid": car_uid,
        "dateFrom": "2024-03-01",
        "dateTo": "2024-03-05",
        "status": "IN_PROGRESS",
    });
    let failing = Arc::new(AtomicBool::new(true));
    let flag = failing.clone();
    let rentals = common::start_mock_backend(move |method, _path, _body| {
        if flag.load(Ordering::SeqCst) {
            return (503, json!({"message": "maintenance"}));
        }
        match method {
            "GET" => (200, rental.clone()),
            _ => (200, json!({})),
        }
    })
    .await;

    let (gateway, shutdown) =
        common::spawn_gateway(common::test_config(&cars.url, &rentals.url, DOWN)).await;
    let client = common::http_client();

    let response = client
        .post(format!("{gateway}/api/v1/rental/{rental_uid}/finish"))
        .header("X-User-Name", "alice")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 202);
    let ack: Value = response.json().await.unwrap();
    assert_eq!(ack["status"], "PENDING");
    assert_eq!(ack["rentalUid"], json!(rental_uid));

    failing.store(false, Ordering::SeqCst);

    // The live attempt died on the lookup, so the only finish POST the
    // backend ever sees comes from the replay.
    let finish_path = format!("/api/v1/rental/{rental_uid}/finish");
    let deadline = tokio::time::Instant::now() + Duration::from_secs(4);
    loop {
        if !rentals.seen_matching("POST", &finish_path).is_empty() {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "finish was never replayed"
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    // The replay also returned the car to the pool.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let releases = cars.seen_matching(
            "PATCH",
            &format!("/api/v1/cars/{car_uid}/availability"),
        );
        if releases.iter().any(|r| r.path.contains("available=true")) {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "car release never happened"
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    shutdown.trigger();
}
