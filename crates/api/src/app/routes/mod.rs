use axum::{routing::get, Router};

use crate::middleware;

pub mod accounts;
pub mod login;
pub mod system;

/// Routes that require an authenticated caller.
pub fn router() -> Router {
    let accounts = Router::new()
        .route("/accounts/:id", get(accounts::get_account))
        .route_layer(axum::middleware::from_fn(middleware::ownership_middleware));

    Router::new()
        .route("/whoami", get(system::whoami))
        .merge(accounts)
}
