use axum::extract::{Request, State};
use axum::http::{header, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use ring::constant_time::verify_slices_are_equal;
use std::sync::Arc;

use crate::api::response::ApiError;
use crate::config::AdminConfig;
use crate::AppState;

const REALM_CHALLENGE: &str = "Basic realm=\"Admin Area\"";

/// HTTP Basic authentication for the admin area.
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let credentials = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_basic);

    match credentials {
        Some((user, password)) if credentials_match(&state.config.admin, &user, &password) => {
            next.run(request).await
        }
        Some((user, _)) => {
            tracing::warn!(user = %user, "Rejected admin credentials");
            challenge()
        }
        None => challenge(),
    }
}

fn challenge() -> Response {
    let mut response = ApiError::unauthorized("Authentication required").into_response();
    response.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static(REALM_CHALLENGE),
    );
    response
}

/// Decode `Basic <base64(user:password)>`.
fn parse_basic(value: &str) -> Option<(String, String)> {
    let (scheme, encoded) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, password) = decoded.split_once(':')?;
    Some((user.to_string(), password.to_string()))
}

fn credentials_match(admin: &AdminConfig, user: &str, password: &str) -> bool {
    if admin.password.is_empty() {
        return false;
    }
    let user_ok = verify_slices_are_equal(user.as_bytes(), admin.username.as_bytes()).is_ok();
    let password_ok =
        verify_slices_are_equal(password.as_bytes(), admin.password.as_bytes()).is_ok();
    user_ok & password_ok
}
