pub mod config;
pub mod modules;
pub mod services;

use axum::{extract::Path, routing::get, Json, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use services::metrics::Exporter;

pub use modules::metrics::Accounts;
pub use services::metrics::{
    ContextValues, ExporterConfig, Metric, MetricCollector, MetricType, RouteContext,
};

/// Demo application: greeting routes instrumented by `exporter`
pub fn create_app(exporter: &Arc<Exporter>) -> Router {
    let router = Router::new()
        .route("/", get(root))
        .route("/{name}", get(greet))
        .route("/{name}/{surname}", get(greet_full));

    exporter.attach(router).layer(TraceLayer::new_for_http())
}

async fn root() -> Json<&'static str> {
    Json("Hello world!")
}

async fn greet(Path(name): Path<String>) -> Json<String> {
    Json(format!("Hello {}!", name))
}

async fn greet_full(Path((name, surname)): Path<(String, String)>) -> Json<String> {
    Json(format!("Hello {} {}!", name, surname))
}
