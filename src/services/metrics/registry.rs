use prometheus::{CounterVec, Encoder, HistogramVec, Registry, TextEncoder};

use super::error::MetricsError;
use super::metric::{
    standard_metrics, Metric, MetricCollector, REQUESTS_TOTAL, REQUEST_DURATION_SECONDS,
    REQUEST_SIZE_BYTES, RESPONSE_SIZE_BYTES,
};
use super::summary::Summary;

/// Registered HTTP metrics of one exporter.
///
/// Standard handles are `None` when their registration failed; the
/// middleware skips those.
pub struct MetricsRegistry {
    registry: Registry,

    pub requests_total: Option<CounterVec>,
    pub request_duration_seconds: Option<HistogramVec>,
    pub response_size_bytes: Option<Summary>,
    pub request_size_bytes: Option<Summary>,

    custom: Vec<Metric>,
}

impl MetricsRegistry {
    /// Register the standard metrics followed by `custom` under `subsystem`.
    ///
    /// A definition that cannot be built or registered is logged and left
    /// unbound; the remaining definitions are still registered.
    pub fn register(registry: Registry, subsystem: &str, custom: Vec<Metric>) -> Self {
        let mut metrics = Self {
            registry,
            requests_total: None,
            request_duration_seconds: None,
            response_size_bytes: None,
            request_size_bytes: None,
            custom: Vec::with_capacity(custom.len()),
        };

        for definition in standard_metrics() {
            let Some(collector) = metrics.register_one(&definition, subsystem) else {
                continue;
            };
            match (definition.name.as_str(), collector) {
                (REQUESTS_TOTAL, MetricCollector::CounterVec(c)) => metrics.requests_total = Some(c),
                (REQUEST_DURATION_SECONDS, MetricCollector::HistogramVec(h)) => {
                    metrics.request_duration_seconds = Some(h)
                }
                (RESPONSE_SIZE_BYTES, MetricCollector::Summary(s)) => {
                    metrics.response_size_bytes = Some(s)
                }
                (REQUEST_SIZE_BYTES, MetricCollector::Summary(s)) => {
                    metrics.request_size_bytes = Some(s)
                }
                _ => {}
            }
        }

        for mut definition in custom {
            if let Some(collector) = metrics.register_one(&definition, subsystem) {
                definition.bind(collector);
            }
            metrics.custom.push(definition);
        }

        metrics
    }

    fn register_one(&self, definition: &Metric, subsystem: &str) -> Option<MetricCollector> {
        let result = definition
            .build_collector(subsystem)
            .and_then(|collector| {
                self.registry.register(collector.boxed())?;
                Ok(collector)
            });

        match result {
            Ok(collector) => Some(collector),
            Err(e) => {
                tracing::error!(
                    metric = %definition.name,
                    id = %definition.id,
                    error = %e,
                    "{} could not be registered in exporter",
                    definition.name
                );
                None
            }
        }
    }

    /// Custom metric definitions in the order they were supplied
    pub fn custom_metrics(&self) -> &[Metric] {
        &self.custom
    }

    /// Bound collector of the custom metric called `name`
    pub fn metric(&self, name: &str) -> Option<&MetricCollector> {
        self.custom
            .iter()
            .find(|m| m.name == name)
            .and_then(Metric::collector)
    }

    /// Bound collector of the custom metric with identifier `id`
    pub fn metric_by_id(&self, id: &str) -> Option<&MetricCollector> {
        self.custom
            .iter()
            .find(|m| !m.id.is_empty() && m.id == id)
            .and_then(Metric::collector)
    }

    /// Export metrics in Prometheus text format
    pub fn export(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// Get the underlying registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
