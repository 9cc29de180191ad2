//! Router assembly: wires the route tree to the shared [`ims_config::Config`]
//! state and installs the best-effort auth middleware ahead of every
//! handler.

pub mod authz;
pub mod dto;
pub mod edit;
pub mod errors;
pub mod listing;
pub mod routes;

use std::sync::Arc;

use axum::middleware;
use axum::Router;

use ims_config::Config;

pub fn build_app(config: Arc<Config>) -> Router {
    Router::new()
        .nest("/ims/api", routes::router())
        .layer(middleware::from_fn_with_state(config.clone(), crate::middleware::auth_middleware))
        .with_state(config)
}
