use axum::{extract::Extension, http::StatusCode, Json};
use serde_json::json;

use wms_auth::SessionClaims;

use crate::context::PrincipalContext;

pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Echo the verified claims of the caller.
pub async fn whoami(Extension(principal): Extension<PrincipalContext>) -> Json<SessionClaims> {
    Json(principal.claims().clone())
}
