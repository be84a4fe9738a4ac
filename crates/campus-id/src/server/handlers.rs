//! Endpoint handlers for the token and resource endpoints.
//!
//! - RFC 6749: token endpoint (authorization_code + refresh_token grants)
//! - RFC 6750: bearer-authenticated resource endpoint
//!
//! The token endpoint accepts `application/x-www-form-urlencoded` or
//! `application/json` bodies with the same parameter names.

use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use axum_extra::TypedHeader;
use axum_extra::headers::{Authorization, authorization::Bearer};

use super::HttpState;
use crate::error::GrantError;
use crate::grants::{self, TokenRequest};
use crate::models::TokenPair;
use crate::tokens;

// ─── Token Endpoint ──────────────────────────────────────────────────────────

/// `POST /oauth2/token`
pub async fn handle_token(
    State(state): State<Arc<HttpState>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let content_type =
        headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()).unwrap_or_default();

    let parsed: Result<TokenRequest, ()> =
        if content_type.contains("application/x-www-form-urlencoded") {
            serde_urlencoded::from_str(&body).map_err(|_| ())
        } else if content_type.contains("application/json") {
            serde_json::from_str(&body).map_err(|_| ())
        } else {
            return grant_error(&GrantError::InvalidRequest("Unsupported content type"));
        };

    let Ok(req) = parsed else {
        return grant_error(&GrantError::InvalidRequest("Malformed request body"));
    };

    match grants::handle_token_request(&state.store, &req).await {
        Ok(pair) => token_success(&pair),
        Err(err) => {
            tracing::debug!(
                client_id = %req.client_id,
                grant_type = %req.grant_type,
                error = err.error_code(),
                "Token request rejected"
            );
            grant_error(&err)
        }
    }
}

/// Build a token response with the cache headers RFC 6749 §5.1 requires.
fn token_success(pair: &TokenPair) -> Response {
    let mut response = Json(pair).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    response
}

fn grant_error(err: &GrantError) -> Response {
    let status = StatusCode::from_u16(err.status()).unwrap_or(StatusCode::BAD_REQUEST);
    (
        status,
        Json(serde_json::json!({
            "error": err.error_code(),
            "error_description": err.description()
        })),
    )
        .into_response()
}

// ─── Resource Endpoint ───────────────────────────────────────────────────────

/// `GET /api/v1/user`
///
/// Validates the bearer token and returns the user's profile filtered to the
/// fields the user consented to, per scope. An authenticated token whose
/// grants cover no present field yields `insufficient_scope`.
pub async fn handle_user_info(
    State(state): State<Arc<HttpState>>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
) -> Response {
    let Some(TypedHeader(Authorization(bearer))) = bearer else {
        return resource_error(
            StatusCode::UNAUTHORIZED,
            "invalid_token",
            "Missing or malformed Authorization header",
        );
    };

    let Some(token) = tokens::validate_access_token(&state.store, bearer.token()).await else {
        return resource_error(
            StatusCode::UNAUTHORIZED,
            "invalid_token",
            "Token is invalid or expired",
        );
    };

    let Some(profile) = state.store.user_profile(token.user_id).await else {
        return resource_error(StatusCode::UNAUTHORIZED, "invalid_token", "User not found");
    };

    let mut response = serde_json::Map::new();
    for scope in token.scope.split_whitespace() {
        let Some(fields) = token.granted_fields.get(scope) else { continue };
        for field in fields {
            if let Some(value) = profile.get(field) {
                response.insert(field.clone(), value.clone());
            }
        }
    }

    if response.is_empty() {
        return resource_error(
            StatusCode::FORBIDDEN,
            "insufficient_scope",
            "No data available with granted permissions",
        );
    }

    let mut response = Json(serde_json::Value::Object(response)).into_response();
    response.headers_mut().insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

fn resource_error(status: StatusCode, error: &str, message: &str) -> Response {
    (
        status,
        Json(serde_json::json!({
            "error": error,
            "message": message
        })),
    )
        .into_response()
}
