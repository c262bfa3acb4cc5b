//! The "current session" accessor.
//!
//! Session issuance (sign-up, sign-in) happens outside this service; we
//! only resolve opaque bearer tokens to users. Routes behind
//! `session_auth` get a `CurrentUser` extension; catalog routes that
//! merely personalize (e.g. `is_purchased`) use `maybe_current_user`.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::db::{queries, AppState};
use crate::error::Result;
use crate::models::User;

/// The authenticated buyer for this request.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

pub async fn session_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> std::result::Result<Response, StatusCode> {
    let token = bearer_token(request.headers()).ok_or(StatusCode::UNAUTHORIZED)?;

    let conn = state.db.get().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let user = queries::get_user_by_session_token(&conn, token)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::UNAUTHORIZED)?;

    request.extensions_mut().insert(CurrentUser(user));

    Ok(next.run(request).await)
}

/// Resolve the current user if a valid bearer token is present, `None`
/// otherwise. Invalid tokens are treated as anonymous, not rejected.
pub fn maybe_current_user(state: &AppState, headers: &HeaderMap) -> Result<Option<User>> {
    let Some(token) = bearer_token(headers) else {
        return Ok(None);
    };
    let conn = state.db.get()?;
    queries::get_user_by_session_token(&conn, token)
}
