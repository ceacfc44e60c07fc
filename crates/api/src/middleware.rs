use std::sync::Arc;

use axum::{
    extract::{OriginalUri, RawPathParams, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use wms_auth::{check_ownership, JwtValidator};
use wms_core::AccountId;

use crate::app::errors::json_error;
use crate::context::PrincipalContext;

const PATH_ID_PARAM: &str = "id";

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
}

/// Require a valid bearer token and attach the caller's claims.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let token = extract_bearer(req.headers()).map_err(|_| unauthorized("missing or malformed bearer token"))?;

    let claims = state.jwt.validate(token, Utc::now()).map_err(|e| {
        tracing::debug!(error = %e, "rejected bearer token");
        unauthorized("invalid or expired token")
    })?;

    req.extensions_mut().insert(PrincipalContext::new(claims));

    Ok(next.run(req).await)
}

/// Enforce account ownership on routes carrying an `:id` path parameter.
///
/// Installed as a route layer so path parameters are already matched.
/// A non-numeric id is treated as no id at all.
pub async fn ownership_middleware(
    OriginalUri(uri): OriginalUri,
    params: RawPathParams,
    req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let Some(principal) = req.extensions().get::<PrincipalContext>() else {
        return Err(unauthorized("missing principal"));
    };

    let path_id = params
        .iter()
        .find(|(key, _)| *key == PATH_ID_PARAM)
        .and_then(|(_, value)| value.parse::<AccountId>().ok());

    check_ownership(principal.claims(), uri.path(), path_id)
        .map_err(|e| json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string()))?;

    Ok(next.run(req).await)
}

fn unauthorized(message: &str) -> Response {
    json_error(StatusCode::UNAUTHORIZED, "unauthorized", message)
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, StatusCode> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let header = header.to_str().map_err(|_| StatusCode::UNAUTHORIZED)?;

    let header = header
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token = header.trim();
    if token.is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header::AUTHORIZATION, HeaderValue};

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn bearer_token_is_extracted() {
        assert_eq!(extract_bearer(&headers("Bearer abc.def.ghi")), Ok("abc.def.ghi"));
        assert_eq!(extract_bearer(&headers("Bearer  abc ")), Ok("abc"));
    }

    #[test]
    fn missing_or_foreign_schemes_are_refused() {
        assert_eq!(extract_bearer(&HeaderMap::new()), Err(StatusCode::UNAUTHORIZED));
        assert_eq!(extract_bearer(&headers("Basic dXNlcjpwdw==")), Err(StatusCode::UNAUTHORIZED));
        assert_eq!(extract_bearer(&headers("Bearer ")), Err(StatusCode::UNAUTHORIZED));
    }
}
