//! Request gate: token extraction, caller resolution and permission checks.
//!
//! The token comes from `Authorization: Bearer <token>` when present, else
//! from the `accessToken` cookie.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use storefront_core::auth::permissions::ensure_permission;
use storefront_core::models::auth::{Principal, TokenClaims};
use storefront_core::models::permissions::{Action, Resource};

use crate::AppState;
use crate::error::AppError;
use crate::services::cookies::ACCESS_COOKIE;

/// Verified access-token claims, stored in request extensions.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub TokenClaims);

/// Resolved administrative caller, stored in request extensions.
#[derive(Debug, Clone)]
pub struct AdminPrincipal(pub Principal);

/// Access token carried by a request, bearer header first.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    bearer_token(headers).or_else(|| {
        CookieJar::from_headers(headers)
            .get(ACCESS_COOKIE)
            .map(|cookie| cookie.value().trim().to_string())
            .filter(|value| !value.is_empty())
    })
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))?
        .trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// Axum middleware: verifies the access token and injects
/// [`AuthenticatedUser`] into request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_token(request.headers());
    let claims = state.sessions.authenticate(token.as_deref())?;
    request.extensions_mut().insert(AuthenticatedUser(claims));
    Ok(next.run(request).await)
}

/// Axum middleware: resolves the caller to a staff, admin or super-admin
/// principal and injects [`AdminPrincipal`] into request extensions.
pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_token(request.headers());
    let principal = state.sessions.verify_admin_token(token.as_deref()).await?;
    request.extensions_mut().insert(AdminPrincipal(principal));
    Ok(next.run(request).await)
}

/// Resource and action a route requires.
#[derive(Debug, Clone, Copy)]
pub struct PermissionGate {
    pub resource: Resource,
    pub action: Action,
}

impl PermissionGate {
    pub fn new(resource: Resource, action: Action) -> Self {
        Self { resource, action }
    }
}

/// Axum middleware: checks the [`AdminPrincipal`] left by [`require_admin`]
/// against the route's [`PermissionGate`].
pub async fn require_permission(
    State(gate): State<PermissionGate>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let AdminPrincipal(principal) = request
        .extensions()
        .get::<AdminPrincipal>()
        .ok_or_else(|| AppError::Unauthorized("Authorization token required".into()))?;
    ensure_permission(principal, gate.resource, gate.action)?;
    Ok(next.run(request).await)
}
