//! Administrative handlers.
//!
//! Everything except signin runs behind `require_admin`; per-route
//! permission gates are attached in the router.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum_extra::extract::cookie::CookieJar;
use storefront_core::auth::admin::NewAdmin;
use storefront_core::auth::permissions::route_access;

use super::parse_id;
use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::AdminPrincipal;
use crate::models::{
    AccessQuery, AccessResponse, AccountResponse, AdminAuthResponse, AdminListResponse,
    AdminResponse, CreateAdminRequest, MessageResponse, SigninRequest, UpdatePermissionsRequest,
    UpdateStatusRequest,
};
use crate::services::cookies;

// =============================================================================
// Session
// =============================================================================

/// `POST /admin/auth/signin`: super-admin or staff/admin signin.
pub async fn admin_signin_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<SigninRequest>, JsonRejection>,
) -> AppResult<(CookieJar, Json<AdminAuthResponse>)> {
    let Json(body) = payload?;
    let session = state
        .sessions
        .admin_signin(&body.email, &body.password)
        .await?;
    let jar = cookies::with_session(jar, &session.tokens, state.config.cookie_secure);
    Ok((
        jar,
        Json(AdminAuthResponse {
            success: true,
            admin: session.principal.into(),
            access_token: session.tokens.access_token,
            refresh_token: session.tokens.refresh_token,
        }),
    ))
}

/// `GET /admin/me`: the caller with its effective permissions.
pub async fn admin_me_handler(
    Extension(AdminPrincipal(principal)): Extension<AdminPrincipal>,
) -> Json<AdminResponse> {
    Json(AdminResponse {
        success: true,
        admin: principal.into(),
    })
}

/// `GET /admin/access?path=`: may the caller open this admin UI page?
pub async fn route_access_handler(
    Extension(AdminPrincipal(principal)): Extension<AdminPrincipal>,
    Query(query): Query<AccessQuery>,
) -> Json<AccessResponse> {
    Json(AccessResponse {
        success: true,
        access: route_access(&principal, &query.path),
    })
}

// =============================================================================
// Admin accounts
// =============================================================================

/// `GET /admin/admins`: list staff and admin accounts.
pub async fn list_admins_handler(
    State(state): State<AppState>,
    Extension(AdminPrincipal(principal)): Extension<AdminPrincipal>,
) -> AppResult<Json<AdminListResponse>> {
    let admins = state.admins.list_admins(&principal).await?;
    Ok(Json(AdminListResponse {
        success: true,
        admins,
    }))
}

/// `POST /admin/admins`: create a staff or admin account.
pub async fn create_admin_handler(
    State(state): State<AppState>,
    Extension(AdminPrincipal(principal)): Extension<AdminPrincipal>,
    payload: Result<Json<CreateAdminRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<AccountResponse>)> {
    let Json(body) = payload?;
    let account = state
        .admins
        .create_admin(
            &principal,
            NewAdmin {
                email: body.email,
                password: body.password,
                first_name: body.first_name,
                last_name: body.last_name,
                role: body.role,
                permissions: body.permissions,
            },
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(AccountResponse {
            success: true,
            account,
        }),
    ))
}

/// `PUT /admin/admins/{id}/permissions`: replace an admin's matrix.
pub async fn update_admin_permissions_handler(
    State(state): State<AppState>,
    Extension(AdminPrincipal(principal)): Extension<AdminPrincipal>,
    Path(id): Path<String>,
    payload: Result<Json<UpdatePermissionsRequest>, JsonRejection>,
) -> AppResult<Json<AccountResponse>> {
    let id = parse_id(&id)?;
    let Json(body) = payload?;
    let account = state
        .admins
        .update_permissions(&principal, id, body.permissions)
        .await?;
    Ok(Json(AccountResponse {
        success: true,
        account,
    }))
}

/// `DELETE /admin/admins/{id}`: delete a staff or admin account.
pub async fn delete_admin_handler(
    State(state): State<AppState>,
    Extension(AdminPrincipal(principal)): Extension<AdminPrincipal>,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    let id = parse_id(&id)?;
    state.admins.delete_admin(&principal, id).await?;
    Ok(Json(MessageResponse::ok("Admin deleted successfully")))
}

// =============================================================================
// Customer accounts
// =============================================================================

/// `PATCH /admin/users/{id}/status`: activate, deactivate or suspend.
pub async fn update_user_status_handler(
    State(state): State<AppState>,
    Extension(AdminPrincipal(principal)): Extension<AdminPrincipal>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> AppResult<Json<AccountResponse>> {
    let id = parse_id(&id)?;
    let Json(body) = payload?;
    let account = state
        .admins
        .set_account_status(&principal, id, body.status)
        .await?;
    Ok(Json(AccountResponse {
        success: true,
        account,
    }))
}

/// `DELETE /admin/users/{id}`: delete an account.
pub async fn delete_user_handler(
    State(state): State<AppState>,
    Extension(AdminPrincipal(principal)): Extension<AdminPrincipal>,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    let id = parse_id(&id)?;
    state.admins.delete_user(&principal, id).await?;
    Ok(Json(MessageResponse::ok("User deleted successfully")))
}
