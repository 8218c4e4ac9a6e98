use axum::Router;
use axum_prom_exporter::services::metrics::Exporter;
use axum_test::TestServer;
use prometheus::proto::{Metric, MetricFamily};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

// Allow dead_code for utilities used by other test files
#[allow(dead_code)]
pub struct TestContext {
    pub server: TestServer,
    pub exporter: Arc<Exporter>,
}

#[allow(dead_code)]
impl TestContext {
    pub fn new(exporter: Arc<Exporter>, router: Router) -> Self {
        let app = exporter.attach(router);
        let server = TestServer::new(app).expect("Failed to create test server");
        Self { server, exporter }
    }

    pub fn family(&self, name: &str) -> Option<MetricFamily> {
        family(&self.exporter, name)
    }

    /// Sum of all series of a counter family
    pub fn counter_total(&self, name: &str) -> f64 {
        self.family(name)
            .map(|mf| mf.get_metric().iter().map(|m| m.get_counter().get_value()).sum())
            .unwrap_or(0.0)
    }

    /// Observations across all series of a histogram family
    pub fn histogram_count(&self, name: &str) -> u64 {
        self.family(name)
            .map(|mf| {
                mf.get_metric()
                    .iter()
                    .map(|m| m.get_histogram().get_sample_count())
                    .sum()
            })
            .unwrap_or(0)
    }

    /// Observations across all series of a summary family
    pub fn summary_count(&self, name: &str) -> u64 {
        self.family(name)
            .map(|mf| {
                mf.get_metric()
                    .iter()
                    .map(|m| m.get_summary().get_sample_count())
                    .sum()
            })
            .unwrap_or(0)
    }

    /// Values of `label` across the series of a family
    pub fn label_values(&self, name: &str, label: &str) -> Vec<String> {
        let mut values: Vec<String> = self
            .family(name)
            .map(|mf| {
                mf.get_metric()
                    .iter()
                    .filter_map(|m| label_value(m, label))
                    .collect()
            })
            .unwrap_or_default();
        values.sort();
        values
    }
}

#[allow(dead_code)]
pub fn family(exporter: &Exporter, name: &str) -> Option<MetricFamily> {
    exporter
        .metrics()
        .registry()
        .gather()
        .into_iter()
        .find(|mf| mf.get_name() == name)
}

#[allow(dead_code)]
pub fn label_value(metric: &Metric, label: &str) -> Option<String> {
    metric
        .get_label()
        .iter()
        .find(|pair| pair.get_name() == label)
        .map(|pair| pair.get_value().to_string())
}

/// An address nothing listens on right now
#[allow(dead_code)]
pub fn free_address() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("Failed to bind");
    listener.local_addr().expect("Failed to read local address")
}

/// Serve `app` on an ephemeral port
#[allow(dead_code)]
pub async fn spawn_server(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to read local address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    addr
}

/// Poll `condition` every 20ms until it holds or `timeout` elapses
#[allow(dead_code)]
pub async fn wait_for<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}
