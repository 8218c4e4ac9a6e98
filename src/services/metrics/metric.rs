use std::fmt;

use prometheus::core::Collector;
use prometheus::{
    Counter, CounterVec, Gauge, GaugeVec, Histogram, HistogramOpts, HistogramVec, Opts,
};

use super::error::MetricsError;
use super::summary::{Summary, SummaryVec};

/// Collector kind of a metric definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricType {
    CounterVec,
    Counter,
    GaugeVec,
    Gauge,
    HistogramVec,
    Histogram,
    SummaryVec,
    Summary,
}

impl MetricType {
    /// Whether the kind is partitioned by label values
    pub fn is_vec(&self) -> bool {
        matches!(
            self,
            Self::CounterVec | Self::GaugeVec | Self::HistogramVec | Self::SummaryVec
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CounterVec => "counter_vec",
            Self::Counter => "counter",
            Self::GaugeVec => "gauge_vec",
            Self::Gauge => "gauge",
            Self::HistogramVec => "histogram_vec",
            Self::Histogram => "histogram",
            Self::SummaryVec => "summary_vec",
            Self::Summary => "summary",
        }
    }
}

/// A constructed collector, one variant per [`MetricType`]
#[derive(Clone)]
pub enum MetricCollector {
    CounterVec(CounterVec),
    Counter(Counter),
    GaugeVec(GaugeVec),
    Gauge(Gauge),
    HistogramVec(HistogramVec),
    Histogram(Histogram),
    SummaryVec(SummaryVec),
    Summary(Summary),
}

impl MetricCollector {
    pub fn metric_type(&self) -> MetricType {
        match self {
            Self::CounterVec(_) => MetricType::CounterVec,
            Self::Counter(_) => MetricType::Counter,
            Self::GaugeVec(_) => MetricType::GaugeVec,
            Self::Gauge(_) => MetricType::Gauge,
            Self::HistogramVec(_) => MetricType::HistogramVec,
            Self::Histogram(_) => MetricType::Histogram,
            Self::SummaryVec(_) => MetricType::SummaryVec,
            Self::Summary(_) => MetricType::Summary,
        }
    }

    /// Boxed clone suitable for `Registry::register`
    pub fn boxed(&self) -> Box<dyn Collector> {
        match self {
            Self::CounterVec(c) => Box::new(c.clone()),
            Self::Counter(c) => Box::new(c.clone()),
            Self::GaugeVec(c) => Box::new(c.clone()),
            Self::Gauge(c) => Box::new(c.clone()),
            Self::HistogramVec(c) => Box::new(c.clone()),
            Self::Histogram(c) => Box::new(c.clone()),
            Self::SummaryVec(c) => Box::new(c.clone()),
            Self::Summary(c) => Box::new(c.clone()),
        }
    }

    pub fn as_counter_vec(&self) -> Option<&CounterVec> {
        match self {
            Self::CounterVec(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_counter(&self) -> Option<&Counter> {
        match self {
            Self::Counter(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_gauge_vec(&self) -> Option<&GaugeVec> {
        match self {
            Self::GaugeVec(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_gauge(&self) -> Option<&Gauge> {
        match self {
            Self::Gauge(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_histogram_vec(&self) -> Option<&HistogramVec> {
        match self {
            Self::HistogramVec(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_histogram(&self) -> Option<&Histogram> {
        match self {
            Self::Histogram(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_summary_vec(&self) -> Option<&SummaryVec> {
        match self {
            Self::SummaryVec(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_summary(&self) -> Option<&Summary> {
        match self {
            Self::Summary(c) => Some(c),
            _ => None,
        }
    }
}

impl fmt::Debug for MetricCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MetricCollector::{}", self.metric_type().as_str())
    }
}

/// Definition of a metric: name, help text, kind and label names, plus the
/// collector bound to it once registered
#[derive(Debug, Clone)]
pub struct Metric {
    pub id: String,
    pub name: String,
    pub description: String,
    pub metric_type: MetricType,
    pub labels: Vec<String>,
    collector: Option<MetricCollector>,
}

impl Metric {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        metric_type: MetricType,
    ) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            description: description.into(),
            metric_type,
            labels: Vec::new(),
            collector: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    /// Collector bound during registration, `None` if registration failed
    pub fn collector(&self) -> Option<&MetricCollector> {
        self.collector.as_ref()
    }

    pub(crate) fn bind(&mut self, collector: MetricCollector) {
        self.collector = Some(collector);
    }

    fn validate(&self) -> Result<(), MetricsError> {
        let invalid = |reason: &str| MetricsError::InvalidDefinition {
            name: self.name.clone(),
            reason: reason.to_string(),
        };

        if self.name.is_empty() {
            return Err(invalid("name is required"));
        }
        if !self.metric_type.is_vec() && !self.labels.is_empty() {
            return Err(invalid(&format!(
                "{} takes no labels, got {}",
                self.metric_type.as_str(),
                self.labels.len()
            )));
        }
        Ok(())
    }

    /// Construct the collector matching this definition's kind, named
    /// `<subsystem>_<name>`
    pub fn build_collector(&self, subsystem: &str) -> Result<MetricCollector, MetricsError> {
        self.validate()?;

        let opts = Opts::new(self.name.as_str(), self.description.as_str()).subsystem(subsystem);
        let histogram_opts =
            || HistogramOpts::new(self.name.as_str(), self.description.as_str()).subsystem(subsystem);
        let labels: Vec<&str> = self.labels.iter().map(String::as_str).collect();

        let collector = match self.metric_type {
            MetricType::CounterVec => MetricCollector::CounterVec(CounterVec::new(opts, &labels)?),
            MetricType::Counter => MetricCollector::Counter(Counter::with_opts(opts)?),
            MetricType::GaugeVec => MetricCollector::GaugeVec(GaugeVec::new(opts, &labels)?),
            MetricType::Gauge => MetricCollector::Gauge(Gauge::with_opts(opts)?),
            MetricType::HistogramVec => {
                MetricCollector::HistogramVec(HistogramVec::new(histogram_opts(), &labels)?)
            }
            MetricType::Histogram => {
                MetricCollector::Histogram(Histogram::with_opts(histogram_opts())?)
            }
            MetricType::SummaryVec => MetricCollector::SummaryVec(SummaryVec::new(opts, &labels)?),
            MetricType::Summary => MetricCollector::Summary(Summary::with_opts(opts)?),
        };
        Ok(collector)
    }
}

// Standard metrics, registered ahead of any custom metric

pub const REQUESTS_TOTAL: &str = "requests_total";
pub const REQUEST_DURATION_SECONDS: &str = "request_duration_seconds";
pub const RESPONSE_SIZE_BYTES: &str = "response_size_bytes";
pub const REQUEST_SIZE_BYTES: &str = "request_size_bytes";

pub fn standard_metrics() -> Vec<Metric> {
    vec![
        Metric::new(
            REQUESTS_TOTAL,
            "How many HTTP requests processed, partitioned by status code and HTTP method.",
            MetricType::CounterVec,
        )
        .with_id("reqCnt")
        .with_labels(["code", "method", "handler", "host", "url"]),
        Metric::new(
            REQUEST_DURATION_SECONDS,
            "The HTTP request latencies in seconds.",
            MetricType::HistogramVec,
        )
        .with_id("reqDur")
        .with_labels(["code", "method", "url"]),
        Metric::new(
            RESPONSE_SIZE_BYTES,
            "The HTTP response sizes in bytes.",
            MetricType::Summary,
        )
        .with_id("resSz"),
        Metric::new(
            REQUEST_SIZE_BYTES,
            "The HTTP request sizes in bytes.",
            MetricType::Summary,
        )
        .with_id("reqSz"),
    ]
}
