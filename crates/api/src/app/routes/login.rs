use axum::{
    async_trait,
    extract::{Extension, FromRequest, Request},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};

use crate::app::dto::LoginRequest;
use crate::app::errors::{json_error, login_error_to_response};
use crate::app::AppServices;

/// Login body in either encoding the client sends.
pub struct LoginForm(pub LoginRequest);

#[async_trait]
impl<S> FromRequest<S> for LoginForm
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("application/json"));

        let body = if is_json {
            Json::<LoginRequest>::from_request(req, state).await.map(|Json(b)| b).ok()
        } else {
            Form::<LoginRequest>::from_request(req, state).await.map(|Form(b)| b).ok()
        };

        body.map(LoginForm)
            .ok_or_else(|| json_error(StatusCode::BAD_REQUEST, "bad_request", "malformed login body"))
    }
}

/// `POST /login`: exchange a username and password for a session token.
pub async fn login(Extension(services): Extension<AppServices>, LoginForm(body): LoginForm) -> Response {
    if !body.is_complete() {
        return json_error(
            StatusCode::BAD_REQUEST,
            "bad_request",
            "username and password are required",
        );
    }

    match services.authenticator.login(&body.username, &body.password).await {
        Ok(token) => (StatusCode::ACCEPTED, Json(token)).into_response(),
        Err(e) => login_error_to_response(e),
    }
}
