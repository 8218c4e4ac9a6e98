#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("Invalid metric definition {name:?}: {reason}")]
    InvalidDefinition { name: String, reason: String },
    #[error("Prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
    #[error("Encoding error: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

#[derive(Debug, thiserror::Error)]
pub enum PushError {
    #[error("Failed to fetch metrics from {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Failed to forward metrics to {url}: {source}")]
    Forward {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },
}
