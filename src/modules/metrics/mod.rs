pub mod auth;
pub mod controller;
pub mod routes;

pub use auth::{Accounts, BasicAuth};
pub use routes::{metrics_handler, metrics_routes};
