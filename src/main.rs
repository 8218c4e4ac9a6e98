use axum_prom_exporter::config::Config;
use axum_prom_exporter::services::metrics::{Exporter, Metric, MetricType};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "axum_prom_exporter=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().expect("Failed to load environment configuration");

    let test_metric = Metric::new("test_metric", "Counter test metric", MetricType::Counter)
        .with_id("1234");
    let test_metric_2 = Metric::new("test_metric_2", "Summary test metric", MetricType::Summary)
        .with_id("1235");

    let exporter = config
        .apply(
            Exporter::builder(config.subsystem.as_str())
                .with_custom_metric(test_metric)
                .with_custom_metric(test_metric_2),
        )
        .build();

    let app = axum_prom_exporter::create_app(&exporter);

    let listener = tokio::net::TcpListener::bind(&config.server_address)
        .await
        .expect("Failed to bind server address");
    tracing::info!("Server running on http://{}", config.server_address);
    axum::serve(listener, app).await.expect("Server error");
}
