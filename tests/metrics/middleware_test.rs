use axum::{body::Body, extract::Path, routing::get, Extension, Router};
use std::time::Duration;
use axum_prom_exporter::services::metrics::{ContextValues, Exporter, RouteContext};

use crate::common::{wait_for, TestContext};

// =============================================================================
// INTEGRATION TESTS - REQUEST INTERCEPTOR
// =============================================================================

fn greeting_router() -> Router {
    Router::new()
        .route("/", get(|| async { "Hello world!" }))
        .route(
            "/{name}",
            get(|Path(name): Path<String>| async move { format!("Hello {}!", name) }),
        )
        .route(
            "/{name}/{surname}",
            get(|Path((name, surname)): Path<(String, String)>| async move {
                format!("Hello {} {}!", name, surname)
            }),
        )
}

#[tokio::test]
async fn test_metrics_path_is_not_measured() {
    let ctx = TestContext::new(Exporter::builder("gin").build(), greeting_router());

    for _ in 0..3 {
        ctx.server.get("/metrics").await.assert_status_ok();
    }

    assert_eq!(ctx.counter_total("gin_requests_total"), 0.0);
    assert_eq!(ctx.histogram_count("gin_request_duration_seconds"), 0);
    assert_eq!(ctx.summary_count("gin_request_size_bytes"), 0);
    assert_eq!(ctx.summary_count("gin_response_size_bytes"), 0);
}

#[tokio::test]
async fn test_each_request_observed_once_per_metric() {
    let ctx = TestContext::new(Exporter::builder("gin").build(), greeting_router());

    ctx.server.get("/").await.assert_status_ok();
    ctx.server.get("/alice").await.assert_status_ok();
    ctx.server.get("/ada/lovelace").await.assert_status_ok();

    assert_eq!(ctx.counter_total("gin_requests_total"), 3.0);
    assert_eq!(ctx.histogram_count("gin_request_duration_seconds"), 3);
    assert_eq!(ctx.summary_count("gin_request_size_bytes"), 3);
    assert_eq!(ctx.summary_count("gin_response_size_bytes"), 3);
}

#[tokio::test]
async fn test_response_size_is_recorded() {
    let ctx = TestContext::new(Exporter::builder("gin").build(), greeting_router());

    ctx.server.get("/").await.assert_status_ok();

    let sizes = ctx.exporter.metrics().response_size_bytes.as_ref().unwrap();
    assert_eq!(sizes.get_sample_count(), 1);
    assert_eq!(sizes.get_sample_sum(), "Hello world!".len() as f64);

    let request_sizes = ctx.exporter.metrics().request_size_bytes.as_ref().unwrap();
    assert!(request_sizes.get_sample_sum() >= ("GET".len() + "HTTP/1.1".len() + 1) as f64);
}

#[tokio::test]
async fn test_default_url_label_is_raw_path() {
    let ctx = TestContext::new(Exporter::builder("gin").build(), greeting_router());

    ctx.server.get("/alice").await.assert_status_ok();
    ctx.server.get("/bob").await.assert_status_ok();

    assert_eq!(
        ctx.label_values("gin_requests_total", "url"),
        ["/alice", "/bob"]
    );
}

#[tokio::test]
async fn test_low_cardinality_url_collapses_parameters() {
    let exporter = Exporter::builder("gin").with_low_cardinality_url().build();
    let ctx = TestContext::new(exporter, greeting_router());

    ctx.server.get("/alice").await.assert_status_ok();
    ctx.server.get("/bob").await.assert_status_ok();
    ctx.server.get("/ada/lovelace").await.assert_status_ok();

    assert_eq!(
        ctx.label_values("gin_requests_total", "url"),
        ["/:name", "/:name/:surname"]
    );

    let requests = ctx.exporter.metrics().requests_total.as_ref().unwrap();
    let family = ctx.family("gin_requests_total").unwrap();
    let host = crate::common::label_value(&family.get_metric()[0], "host").unwrap_or_default();
    assert_eq!(
        requests
            .with_label_values(&["200", "GET", "/{name}", &host, "/:name"])
            .get(),
        2.0
    );
}

#[tokio::test]
async fn test_custom_url_label_mapping() {
    let exporter = Exporter::builder("gin")
        .with_url_label_mapping_fn(|route: &RouteContext| {
            route.matched_path.clone().unwrap_or_else(|| "other".to_string())
        })
        .build();
    let ctx = TestContext::new(exporter, greeting_router());

    ctx.server.get("/alice").await.assert_status_ok();

    assert_eq!(
        ctx.label_values("gin_request_duration_seconds", "url"),
        ["/{name}"]
    );
}

#[tokio::test]
async fn test_handler_and_code_labels() {
    let ctx = TestContext::new(Exporter::builder("gin").build(), greeting_router());

    ctx.server.get("/alice").await.assert_status_ok();
    ctx.server.get("/a/b/c").await.assert_status_not_found();

    assert_eq!(
        ctx.label_values("gin_requests_total", "handler"),
        ["/{name}", "unmatched"]
    );
    assert_eq!(ctx.label_values("gin_requests_total", "code"), ["200", "404"]);
    assert_eq!(ctx.label_values("gin_requests_total", "method"), ["GET", "GET"]);
}

#[tokio::test]
async fn test_url_label_from_handler_context() {
    let router = Router::new()
        .route(
            "/labeled",
            get(|| async {
                (
                    Extension(ContextValues::new().with("route", "/from-handler")),
                    "ok",
                )
            }),
        )
        .route("/plain", get(|| async { "ok" }));

    let exporter = Exporter::builder("gin")
        .with_url_label_from_context("route")
        .build();
    let ctx = TestContext::new(exporter, router);

    ctx.server.get("/labeled").await.assert_status_ok();
    ctx.server.get("/plain").await.assert_status_ok();

    assert_eq!(
        ctx.label_values("gin_requests_total", "url"),
        ["/from-handler", "unknown"]
    );
}

#[tokio::test]
async fn test_url_label_from_outer_layer_context() {
    let exporter = Exporter::builder("gin")
        .with_url_label_from_context("route")
        .build();
    let app = exporter
        .attach(Router::new().route("/plain", get(|| async { "ok" })))
        .layer(Extension(ContextValues::new().with("route", "/from-layer")));
    let server = axum_test::TestServer::new(app).expect("Failed to create test server");

    server.get("/plain").await.assert_status_ok();

    let family = crate::common::family(&exporter, "gin_requests_total").unwrap();
    assert_eq!(
        crate::common::label_value(&family.get_metric()[0], "url").as_deref(),
        Some("/from-layer")
    );
}

#[tokio::test]
async fn test_demo_app_low_cardinality_labels() {
    let exporter = Exporter::builder("gin").with_low_cardinality_url().build();
    let server = axum_test::TestServer::new(axum_prom_exporter::create_app(&exporter))
        .expect("Failed to create test server");

    let response = server.get("/ada/lovelace").await;
    response.assert_status_ok();
    assert_eq!(response.text(), "\"Hello ada lovelace!\"");

    let family = crate::common::family(&exporter, "gin_requests_total").unwrap();
    assert_eq!(
        crate::common::label_value(&family.get_metric()[0], "url").as_deref(),
        Some("/:name/:surname")
    );
}

#[tokio::test]
async fn test_streamed_response_size_is_recorded() {
    let router = Router::new().route(
        "/stream",
        get(|| async {
            Body::from_stream(futures::stream::iter(vec![
                Ok::<_, std::io::Error>("hello "),
                Ok("world"),
            ]))
        }),
    );
    let ctx = TestContext::new(Exporter::builder("gin").build(), router);

    let response = ctx.server.get("/stream").await;
    response.assert_status_ok();
    assert_eq!(response.text(), "hello world");

    let sizes = ctx.exporter.metrics().response_size_bytes.as_ref().unwrap();
    assert!(wait_for(Duration::from_secs(1), || sizes.get_sample_count() == 1).await);
    assert_eq!(sizes.get_sample_sum(), "hello world".len() as f64);
}

#[tokio::test]
async fn test_low_cardinality_wildcard_route() {
    let router = Router::new().route(
        "/files/{*path}",
        get(|Path(path): Path<String>| async move { path }),
    );
    let exporter = Exporter::builder("gin").with_low_cardinality_url().build();
    let ctx = TestContext::new(exporter, router);

    ctx.server.get("/files/a/b.txt").await.assert_status_ok();
    ctx.server.get("/files/c.txt").await.assert_status_ok();

    assert_eq!(
        ctx.label_values("gin_requests_total", "url"),
        ["/files/:path", "/files/:path"]
    );
    assert_eq!(
        ctx.label_values("gin_requests_total", "handler"),
        ["/files/{*path}", "/files/{*path}"]
    );
}
