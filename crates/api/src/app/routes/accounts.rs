use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use wms_core::AccountId;

use crate::app::dto::AccountProfile;
use crate::app::errors::{directory_error_to_response, json_error};
use crate::app::AppServices;

/// Account profile. Ownership is enforced by the route layer.
pub async fn get_account(
    Extension(services): Extension<AppServices>,
    Path(id): Path<String>,
) -> Response {
    let Ok(id) = id.parse::<AccountId>() else {
        return json_error(StatusCode::BAD_REQUEST, "invalid_id", "account id must be an integer");
    };

    match services.authenticator.directory().find_by_id(id).await {
        Ok(Some(record)) => Json(AccountProfile::from(record)).into_response(),
        Ok(None) => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        Err(e) => directory_error_to_response(e),
    }
}
