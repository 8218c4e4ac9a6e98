use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::collections::HashMap;
use std::sync::Arc;

/// Basic-auth accounts: user name -> password
pub type Accounts = HashMap<String, String>;

const CHALLENGE: &str = "Basic realm=\"Authorization Required\"";

/// Precomputed `Authorization` header values of a fixed account set
pub struct BasicAuth {
    credentials: Vec<(String, String)>,
}

impl BasicAuth {
    pub fn new(accounts: &Accounts) -> Self {
        let credentials = accounts
            .iter()
            .map(|(user, password)| {
                let encoded = STANDARD.encode(format!("{}:{}", user, password));
                (user.clone(), format!("Basic {}", encoded))
            })
            .collect();
        Self { credentials }
    }

    /// User whose credentials match the header value
    pub fn authenticate(&self, authorization: &str) -> Option<&str> {
        self.credentials
            .iter()
            .find(|(_, expected)| constant_time_eq(expected.as_bytes(), authorization.as_bytes()))
            .map(|(user, _)| user.as_str())
    }
}

/// Middleware rejecting requests without valid basic-auth credentials
pub async fn require_basic_auth(
    State(auth): State<Arc<BasicAuth>>,
    req: Request,
    next: Next,
) -> Response {
    let authorized = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| auth.authenticate(v))
        .is_some();

    if !authorized {
        return (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, HeaderValue::from_static(CHALLENGE))],
        )
            .into_response();
    }

    next.run(req).await
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
