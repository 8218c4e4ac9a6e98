use std::env;
use std::time::Duration;

use crate::modules::metrics::Accounts;
use crate::services::metrics::ExporterConfig;

/// Environment configuration
/// Loads and validates environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub subsystem: String,
    pub metrics_path: Option<String>,
    pub metrics_listen_address: Option<String>,
    pub metrics_auth: Option<(String, String)>,
    pub push_gateway: Option<PushGatewayConfig>,
    pub low_cardinality_url: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PushGatewayConfig {
    pub url: String,
    pub metrics_url: String,
    pub interval: Duration,
    pub job: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        dotenvy::dotenv().ok();

        let server_address =
            env::var("SERVER_ADDRESS").unwrap_or_else(|_| "0.0.0.0:29090".to_string());

        let subsystem = env::var("METRICS_SUBSYSTEM").unwrap_or_else(|_| "gin".to_string());

        let metrics_path = non_empty("METRICS_PATH");
        if let Some(path) = &metrics_path {
            if !path.starts_with('/') {
                return Err(format!("METRICS_PATH must start with '/': {}", path));
            }
        }

        let metrics_listen_address = non_empty("METRICS_LISTEN_ADDRESS");

        let metrics_auth = match (non_empty("METRICS_AUTH_USER"), non_empty("METRICS_AUTH_PASSWORD")) {
            (Some(user), Some(password)) => Some((user, password)),
            (None, None) => None,
            _ => {
                return Err(
                    "METRICS_AUTH_USER and METRICS_AUTH_PASSWORD must be set together".to_string(),
                )
            }
        };

        let push_gateway = match non_empty("PUSHGATEWAY_URL") {
            Some(url) => {
                let metrics_url = non_empty("PUSHGATEWAY_METRICS_URL")
                    .ok_or_else(|| "PUSHGATEWAY_METRICS_URL must be set".to_string())?;
                let interval_secs: u64 = match non_empty("PUSHGATEWAY_INTERVAL_SECS") {
                    Some(val) => val
                        .parse()
                        .map_err(|e| format!("Invalid PUSHGATEWAY_INTERVAL_SECS: {}", e))?,
                    None => 15,
                };
                if interval_secs == 0 {
                    return Err("PUSHGATEWAY_INTERVAL_SECS must be positive".to_string());
                }

                Some(PushGatewayConfig {
                    url,
                    metrics_url,
                    interval: Duration::from_secs(interval_secs),
                    job: non_empty("PUSHGATEWAY_JOB"),
                })
            }
            None => None,
        };

        let low_cardinality_url = match non_empty("METRICS_LOW_CARDINALITY") {
            Some(val) => val
                .parse()
                .map_err(|e| format!("Invalid METRICS_LOW_CARDINALITY: {}", e))?,
            None => true,
        };

        Ok(Self {
            server_address,
            subsystem,
            metrics_path,
            metrics_listen_address,
            metrics_auth,
            push_gateway,
            low_cardinality_url,
        })
    }

    /// Apply the environment-driven options on top of `exporter`
    pub fn apply(&self, mut exporter: ExporterConfig) -> ExporterConfig {
        if let Some(path) = &self.metrics_path {
            exporter = exporter.with_metrics_path(path);
        }
        if let Some(address) = &self.metrics_listen_address {
            exporter = exporter.with_listen_address(address);
        }
        if let Some((user, password)) = &self.metrics_auth {
            let mut accounts = Accounts::new();
            accounts.insert(user.clone(), password.clone());
            exporter = exporter.with_metrics_auth(accounts);
        }
        if let Some(push) = &self.push_gateway {
            exporter = exporter.with_push_gateway(&push.url, &push.metrics_url, push.interval);
            if let Some(job) = &push.job {
                exporter = exporter.with_push_gateway_job(job);
            }
        }
        if self.low_cardinality_url {
            exporter = exporter.with_low_cardinality_url();
        }
        exporter
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
