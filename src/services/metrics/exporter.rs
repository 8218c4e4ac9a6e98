use axum::{middleware, Router};
use prometheus::Registry;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

use super::metric::Metric;
use super::middleware::metrics_middleware;
use super::push::{PushGatewayClient, PushGatewaySettings};
use super::registry::MetricsRegistry;
use super::url_label::{self, RouteContext, UrlLabelMappingFn};
use crate::modules::metrics::{metrics_handler, metrics_routes, Accounts};

pub const DEFAULT_METRICS_PATH: &str = "/metrics";

/// Dedicated listener for the metrics endpoint
#[derive(Clone)]
pub struct ListenConfig {
    pub address: String,
    /// Caller supplied router; a default one is built when `None`
    pub router: Option<Router>,
}

/// Exporter options. Defaults first, then every `with_*` call overrides.
pub struct ExporterConfig {
    subsystem: String,
    metrics_path: String,
    listen: Option<ListenConfig>,
    accounts: Option<Accounts>,
    push_gateway: Option<PushGatewaySettings>,
    push_gateway_job: Option<String>,
    registry: Option<Registry>,
    url_label_fn: UrlLabelMappingFn,
    url_label_from_context: Option<String>,
    metrics: Vec<Metric>,
}

impl ExporterConfig {
    pub fn new(subsystem: impl Into<String>) -> Self {
        Self {
            subsystem: subsystem.into(),
            metrics_path: DEFAULT_METRICS_PATH.to_string(),
            listen: None,
            accounts: None,
            push_gateway: None,
            push_gateway_job: None,
            registry: None,
            url_label_fn: url_label::identity(),
            url_label_from_context: None,
            metrics: Vec::new(),
        }
    }

    /// Push metrics fetched from `metrics_url` to `gateway_url` every
    /// `interval`. A zero interval is logged and nothing is pushed.
    pub fn with_push_gateway(
        mut self,
        gateway_url: impl Into<String>,
        metrics_url: impl Into<String>,
        interval: Duration,
    ) -> Self {
        self.push_gateway = Some(PushGatewaySettings::new(gateway_url, metrics_url, interval));
        self
    }

    /// Push gateway job name, defaults to "gin"
    pub fn with_push_gateway_job(mut self, job: impl Into<String>) -> Self {
        self.push_gateway_job = Some(job.into());
        self
    }

    /// Serve the metrics endpoint on its own listener with a default router.
    /// An empty address keeps it on the instrumented router.
    pub fn with_listen_address(mut self, address: impl Into<String>) -> Self {
        let address = address.into();
        self.listen = (!address.is_empty()).then_some(ListenConfig {
            address,
            router: None,
        });
        self
    }

    /// Serve the metrics endpoint on its own listener using `router`, which
    /// keeps scrapes out of the main service's access log.
    ///
    /// The metrics path takes precedence over a route of `router` with the
    /// same path; every other request is handed to `router`.
    pub fn with_listen_address_with_router(
        mut self,
        address: impl Into<String>,
        router: Router,
    ) -> Self {
        let address = address.into();
        self.listen = (!address.is_empty()).then_some(ListenConfig {
            address,
            router: Some(router),
        });
        self
    }

    /// Require basic auth with one of `accounts` on the metrics endpoint
    pub fn with_metrics_auth(mut self, accounts: Accounts) -> Self {
        self.accounts = Some(accounts);
        self
    }

    /// Register an additional metric; may be repeated
    pub fn with_custom_metric(mut self, metric: Metric) -> Self {
        self.metrics.push(metric);
        self
    }

    /// Register into `registry` instead of a registry owned by the exporter.
    /// Process metrics are only added to the owned registry.
    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_url_label_mapping_fn<F>(mut self, mapping: F) -> Self
    where
        F: Fn(&RouteContext) -> String + Send + Sync + 'static,
    {
        self.url_label_fn = Arc::new(mapping);
        self
    }

    /// Replace route parameter values with their names in the `url` label
    pub fn with_low_cardinality_url(mut self) -> Self {
        self.url_label_fn = url_label::low_cardinality();
        self
    }

    /// Take the `url` label from the per-request `ContextValues` under `key`
    pub fn with_url_label_from_context(mut self, key: impl Into<String>) -> Self {
        self.url_label_from_context = Some(key.into());
        self
    }

    pub fn with_metrics_path(mut self, path: impl Into<String>) -> Self {
        self.metrics_path = path.into();
        self
    }

    /// Register the standard and custom metrics and freeze the configuration
    pub fn build(self) -> Arc<Exporter> {
        let mut push_gateway = self.push_gateway;
        if let (Some(settings), Some(job)) = (push_gateway.as_mut(), self.push_gateway_job) {
            settings.job = job;
        }

        let registry = self.registry.unwrap_or_else(|| {
            let registry = Registry::new();
            register_process_collector(&registry);
            registry
        });
        let metrics = MetricsRegistry::register(registry, &self.subsystem, self.metrics);

        Arc::new(Exporter {
            subsystem: self.subsystem,
            metrics_path: self.metrics_path,
            listen: self.listen,
            accounts: self.accounts,
            push_gateway,
            url_label_fn: self.url_label_fn,
            url_label_from_context: self.url_label_from_context,
            metrics,
        })
    }
}

/// `process_*` metrics of the current process
#[cfg(target_os = "linux")]
fn register_process_collector(registry: &Registry) {
    let collector = prometheus::process_collector::ProcessCollector::for_self();
    if let Err(e) = registry.register(Box::new(collector)) {
        tracing::error!(error = %e, "Process metrics could not be registered in exporter");
    }
}

#[cfg(not(target_os = "linux"))]
fn register_process_collector(_registry: &Registry) {}

/// Prometheus exporter for an axum application
pub struct Exporter {
    subsystem: String,
    metrics_path: String,
    listen: Option<ListenConfig>,
    accounts: Option<Accounts>,
    push_gateway: Option<PushGatewaySettings>,
    url_label_fn: UrlLabelMappingFn,
    url_label_from_context: Option<String>,
    metrics: MetricsRegistry,
}

impl Exporter {
    pub fn builder(subsystem: impl Into<String>) -> ExporterConfig {
        ExporterConfig::new(subsystem)
    }

    /// Instrument `router`.
    ///
    /// Mounts the metrics endpoint on `router`, or spawns the dedicated
    /// metrics server, starts the push ticker when configured and wraps
    /// every route in the metrics middleware. Must be called from within a
    /// Tokio runtime when a listener or push gateway is configured.
    pub fn attach<S>(self: &Arc<Self>, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        let router = match &self.listen {
            Some(listen) => {
                self.spawn_metrics_server(listen);
                router
            }
            None => router.route(&self.metrics_path, metrics_handler(self.clone())),
        };

        if let Some(settings) = &self.push_gateway {
            self.spawn_push_ticker(settings.clone());
        }

        router.layer(middleware::from_fn_with_state(
            self.clone(),
            metrics_middleware,
        ))
    }

    fn spawn_metrics_server(self: &Arc<Self>, listen: &ListenConfig) {
        let router = match &listen.router {
            Some(router) => Router::new()
                .route(&self.metrics_path, metrics_handler(self.clone()))
                .fallback_service(router.clone()),
            None => metrics_routes(self.clone()).layer(TraceLayer::new_for_http()),
        };
        let address = listen.address.clone();

        tokio::spawn(async move {
            let listener = match tokio::net::TcpListener::bind(&address).await {
                Ok(listener) => listener,
                Err(e) => {
                    tracing::error!(address = %address, error = %e, "Error running metrics server");
                    return;
                }
            };
            tracing::info!("Metrics server running on http://{}", address);

            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!(address = %address, error = %e, "Error running metrics server");
            }
        });
    }

    fn spawn_push_ticker(&self, settings: PushGatewaySettings) {
        let client = PushGatewayClient::new(settings);
        tracing::info!(
            target_url = %client.target_url(),
            "Pushing metrics to push gateway"
        );
        tokio::spawn(client.run());
    }

    pub fn subsystem(&self) -> &str {
        &self.subsystem
    }

    pub fn metrics_path(&self) -> &str {
        &self.metrics_path
    }

    pub fn listen_address(&self) -> Option<&str> {
        self.listen.as_ref().map(|l| l.address.as_str())
    }

    pub fn accounts(&self) -> Option<&Accounts> {
        self.accounts.as_ref()
    }

    pub fn push_gateway(&self) -> Option<&PushGatewaySettings> {
        self.push_gateway.as_ref()
    }

    pub fn url_label_fn(&self) -> &UrlLabelMappingFn {
        &self.url_label_fn
    }

    pub fn url_label_from_context(&self) -> Option<&str> {
        self.url_label_from_context.as_deref()
    }

    pub fn metrics(&self) -> &MetricsRegistry {
        &self.metrics
    }
}
