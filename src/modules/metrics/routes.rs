use axum::{
    middleware,
    routing::{get, MethodRouter},
    Router,
};
use std::sync::Arc;

use super::auth::{require_basic_auth, BasicAuth};
use super::controller::get_metrics;
use crate::services::metrics::Exporter;

/// GET handler of the metrics path, behind basic auth when accounts are set
pub fn metrics_handler<S>(exporter: Arc<Exporter>) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    let handler: MethodRouter<Arc<Exporter>> = get(get_metrics);
    let handler = match exporter.accounts() {
        Some(accounts) => handler.route_layer(middleware::from_fn_with_state(
            Arc::new(BasicAuth::new(accounts)),
            require_basic_auth,
        )),
        None => handler,
    };
    handler.with_state(exporter)
}

pub fn metrics_routes(exporter: Arc<Exporter>) -> Router {
    let path = exporter.metrics_path().to_string();
    Router::new().route(&path, metrics_handler(exporter))
}
