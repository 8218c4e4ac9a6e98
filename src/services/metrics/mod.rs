pub mod body;
pub mod error;
pub mod exporter;
pub mod metric;
pub mod middleware;
pub mod push;
pub mod registry;
pub mod summary;
pub mod url_label;

pub use error::{MetricsError, PushError};
pub use exporter::{Exporter, ExporterConfig, ListenConfig, DEFAULT_METRICS_PATH};
pub use metric::{Metric, MetricCollector, MetricType};
pub use middleware::{compute_approximate_request_size, metrics_middleware};
pub use push::{PushGatewayClient, PushGatewaySettings};
pub use registry::MetricsRegistry;
pub use summary::{Summary, SummaryVec};
pub use url_label::{ContextValues, RouteContext, UrlLabelMappingFn};
