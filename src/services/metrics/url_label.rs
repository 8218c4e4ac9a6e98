use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{MatchedPath, RawPathParams, Request};
use axum::RequestExt;

/// Maps a request to the value of the `url` label.
///
/// Controls the cardinality of the request metrics. For a
/// `/customer/{name}` route, mapping every customer to one series:
///
/// ```ignore
/// Exporter::builder("gin").with_url_label_mapping_fn(|route: &RouteContext| {
///     let mut url = route.path.clone();
///     if let Some(value) = route.param("name") {
///         url = url.replacen(value, ":name", 1);
///     }
///     url
/// });
/// ```
///
/// maps "/customer/alice" and "/customer/bob" to "/customer/:name".
pub type UrlLabelMappingFn = Arc<dyn Fn(&RouteContext) -> String + Send + Sync>;

/// Per-request key/value store consulted for the URL label override.
///
/// Outer layers insert it into the request extensions; handlers return it
/// as a response extension, e.g. `(Extension(values), body)`.
#[derive(Debug, Clone, Default)]
pub struct ContextValues(HashMap<String, String>);

impl ContextValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }
}

/// What the URL label mapping gets to see of a request
#[derive(Debug, Clone, Default)]
pub struct RouteContext {
    /// Request path without the query string
    pub path: String,
    /// Route template that matched, e.g. `/customer/{name}`
    pub matched_path: Option<String>,
    /// Route parameters as captured by the router, in template order
    pub params: Vec<(String, String)>,
}

impl RouteContext {
    /// Snapshot the path, the matched template and the router's captures.
    /// Requests that matched no route have neither.
    pub async fn from_request(request: &mut Request) -> Self {
        let path = request.uri().path().to_string();
        let matched_path = request
            .extensions()
            .get::<MatchedPath>()
            .map(|m| m.as_str().to_string());
        let params = match request.extract_parts::<RawPathParams>().await {
            Ok(params) => params
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
            Err(_) => Vec::new(),
        };

        Self {
            path,
            matched_path,
            params,
        }
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Default mapping: the raw request path
pub fn identity() -> UrlLabelMappingFn {
    Arc::new(|route: &RouteContext| route.path.clone())
}

/// Replace each route parameter's value with `:<name>`.
///
/// Only the first occurrence of each value is replaced, in parameter order,
/// so a value that also appears earlier in the path is replaced there.
pub fn low_cardinality() -> UrlLabelMappingFn {
    Arc::new(|route: &RouteContext| low_cardinality_url(&route.path, &route.params))
}

pub fn low_cardinality_url(path: &str, params: &[(String, String)]) -> String {
    let mut url = path.to_string();
    for (key, value) in params {
        if value.is_empty() {
            continue;
        }
        url = url.replacen(value.as_str(), &format!(":{}", key), 1);
    }
    url
}
