use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use wms_auth::{DirectoryError, LoginError};

/// Map a login failure to its HTTP response.
///
/// Every credential failure gets the same body. Server-side failures are
/// logged by the authenticator and reported without detail.
pub fn login_error_to_response(err: LoginError) -> axum::response::Response {
    match err {
        LoginError::InvalidCredentials(_) => {
            json_error(StatusCode::UNAUTHORIZED, "invalid_credentials", "invalid credentials")
        }
        LoginError::Directory(_) => json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "directory_unavailable",
            "account directory unavailable",
        ),
        LoginError::Token(_) | LoginError::Internal(_) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal error")
        }
    }
}

pub fn directory_error_to_response(err: DirectoryError) -> axum::response::Response {
    tracing::error!(error = %err, "account lookup failed");
    json_error(
        StatusCode::SERVICE_UNAVAILABLE,
        "directory_unavailable",
        "account directory unavailable",
    )
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
