use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use axum_prom_exporter::services::metrics::{
    push::instance_name, Exporter, PushError, PushGatewayClient, PushGatewaySettings,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::common::{spawn_server, wait_for};

// =============================================================================
// INTEGRATION TESTS - PUSH GATEWAY FORWARDING
// =============================================================================

#[derive(Debug, Clone)]
struct Push {
    job: String,
    instance: String,
    body: String,
}

type Pushes = Arc<Mutex<Vec<Push>>>;

/// Gateway recording every push, answering with `status`
async fn spawn_gateway(status: StatusCode) -> (String, Pushes) {
    let pushes: Pushes = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route(
            "/metrics/job/{job}/instance/{instance}",
            post(
                move |State(pushes): State<Pushes>,
                      Path((job, instance)): Path<(String, String)>,
                      body: String| async move {
                    pushes.lock().unwrap().push(Push {
                        job,
                        instance,
                        body,
                    });
                    status
                },
            ),
        )
        .with_state(pushes.clone());

    let addr = spawn_server(app).await;
    (format!("http://{}", addr), pushes)
}

fn push_count(pushes: &Pushes) -> usize {
    pushes.lock().unwrap().len()
}

#[tokio::test]
async fn test_push_ticker_forwards_local_exposition() {
    let (gateway_url, pushes) = spawn_gateway(StatusCode::OK).await;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let exporter = Exporter::builder("gin")
        .with_push_gateway(
            gateway_url,
            format!("http://{}/metrics", addr),
            Duration::from_millis(50),
        )
        .with_push_gateway_job("custom")
        .build();
    let app = exporter.attach(Router::new().route("/", get(|| async { "Hello world!" })));
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    reqwest::get(format!("http://{}/", addr)).await.unwrap();

    assert!(wait_for(Duration::from_secs(5), || push_count(&pushes) >= 2).await);

    let last = pushes.lock().unwrap().last().cloned().unwrap();
    assert_eq!(last.job, "custom");
    assert_eq!(last.instance, instance_name());
    assert!(last.body.contains("gin_request_size_bytes_count 1"));
    assert!(last.body.contains("gin_requests_total"));

    // Scrapes made by the ticker are not measured
    assert_eq!(
        exporter
            .metrics()
            .request_size_bytes
            .as_ref()
            .unwrap()
            .get_sample_count(),
        1
    );
}

#[tokio::test]
async fn test_no_push_without_push_gateway() {
    let (_gateway_url, pushes) = spawn_gateway(StatusCode::OK).await;

    let exporter = Exporter::builder("gin").build();
    let app = exporter.attach(Router::new().route("/", get(|| async { "ok" })));
    let addr = spawn_server(app).await;
    reqwest::get(format!("http://{}/", addr)).await.unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(push_count(&pushes), 0);
    assert!(exporter.push_gateway().is_none());
}

#[tokio::test]
async fn test_push_once_reports_gateway_status() {
    let (gateway_url, pushes) = spawn_gateway(StatusCode::INTERNAL_SERVER_ERROR).await;
    let source = spawn_server(Router::new().route("/metrics", get(|| async { "up 1\n" }))).await;

    let settings = PushGatewaySettings::new(
        gateway_url,
        format!("http://{}/metrics", source),
        Duration::from_secs(1),
    );
    let client = PushGatewayClient::new(settings);

    let result = client.push_once().await;
    assert!(matches!(result, Err(PushError::Status { status: 500, .. })));
    assert_eq!(pushes.lock().unwrap()[0].body, "up 1\n");
    assert_eq!(pushes.lock().unwrap()[0].job, "gin");
}

#[tokio::test]
async fn test_push_ticker_survives_failures() {
    let (gateway_url, pushes) = spawn_gateway(StatusCode::INTERNAL_SERVER_ERROR).await;
    let source = spawn_server(Router::new().route("/metrics", get(|| async { "up 1\n" }))).await;

    let settings = PushGatewaySettings::new(
        gateway_url,
        format!("http://{}/metrics", source),
        Duration::from_millis(30),
    );
    tokio::spawn(PushGatewayClient::new(settings).run());

    assert!(wait_for(Duration::from_secs(5), || push_count(&pushes) >= 3).await);
}
