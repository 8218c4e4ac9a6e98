use reqwest::Client;
use std::time::Duration;

use super::error::PushError;

pub const DEFAULT_JOB: &str = "gin";

/// Push gateway forwarding settings
#[derive(Debug, Clone)]
pub struct PushGatewaySettings {
    /// Time between two pushes
    pub interval: Duration,
    /// Push gateway URL in format http://domain:port
    pub gateway_url: String,
    /// Metrics endpoint the snapshot is fetched from
    pub metrics_url: String,
    /// Job name, defaults to "gin"
    pub job: String,
}

impl PushGatewaySettings {
    pub fn new(
        gateway_url: impl Into<String>,
        metrics_url: impl Into<String>,
        interval: Duration,
    ) -> Self {
        Self {
            interval,
            gateway_url: gateway_url.into(),
            metrics_url: metrics_url.into(),
            job: String::new(),
        }
    }

    pub fn job(&self) -> &str {
        if self.job.is_empty() {
            DEFAULT_JOB
        } else {
            &self.job
        }
    }

    /// `<gateway>/metrics/job/<job>/instance/<instance>`
    pub fn target_url(&self, instance: &str) -> String {
        format!(
            "{}/metrics/job/{}/instance/{}",
            self.gateway_url.trim_end_matches('/'),
            self.job(),
            instance
        )
    }
}

/// Name of this host, used as the push gateway instance
pub fn instance_name() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_default()
}

/// Fetches the local exposition and forwards it to the gateway
pub struct PushGatewayClient {
    client: Client,
    settings: PushGatewaySettings,
    target_url: String,
}

impl PushGatewayClient {
    pub fn new(settings: PushGatewaySettings) -> Self {
        let target_url = settings.target_url(&instance_name());
        Self {
            client: Client::new(),
            settings,
            target_url,
        }
    }

    pub fn target_url(&self) -> &str {
        &self.target_url
    }

    async fn fetch_metrics(&self) -> Result<Vec<u8>, PushError> {
        let url = &self.settings.metrics_url;
        let fetch_err = |source: reqwest::Error| PushError::Fetch {
            url: url.clone(),
            source,
        };

        let response = self.client.get(url).send().await.map_err(fetch_err)?;
        if !response.status().is_success() {
            return Err(PushError::Status {
                url: url.clone(),
                status: response.status().as_u16(),
            });
        }
        let body = response.bytes().await.map_err(fetch_err)?;
        Ok(body.to_vec())
    }

    async fn send_metrics(&self, metrics: Vec<u8>) -> Result<(), PushError> {
        let response = self
            .client
            .post(&self.target_url)
            .body(metrics)
            .send()
            .await
            .map_err(|source| PushError::Forward {
                url: self.target_url.clone(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(PushError::Status {
                url: self.target_url.clone(),
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }

    /// One fetch-and-forward cycle
    pub async fn push_once(&self) -> Result<(), PushError> {
        let metrics = self.fetch_metrics().await?;
        self.send_metrics(metrics).await
    }

    /// Push every interval until the process exits. Failures are logged and
    /// the next tick proceeds.
    pub async fn run(self) {
        if self.settings.interval.is_zero() {
            tracing::error!(
                target_url = %self.target_url,
                "Push gateway interval must be positive, not pushing"
            );
            return;
        }

        let mut interval = tokio::time::interval(self.settings.interval);
        // The first tick completes immediately
        interval.tick().await;

        loop {
            interval.tick().await;

            if let Err(e) = self.push_once().await {
                tracing::error!(error = %e, "Error sending to push gateway");
            }
        }
    }
}
