//! Customer authentication handlers.

use axum::Json;
use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;
use tracing::debug;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{
    AuthResponse, ChangePasswordRequest, MessageResponse, RefreshRequest, RefreshResponse,
    SigninRequest, SignupRequest, UserResponse,
};
use crate::services::cookies::{self, REFRESH_COOKIE};

/// `POST /auth/signup`: register a customer and start a session.
pub async fn signup_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> AppResult<(StatusCode, CookieJar, Json<AuthResponse>)> {
    let Json(body) = payload?;
    let session = state.sessions.signup(body.into()).await?;
    let jar = cookies::with_session(jar, &session.tokens, state.config.cookie_secure);
    Ok((
        StatusCode::CREATED,
        jar,
        Json(AuthResponse {
            success: true,
            user: session.account,
            access_token: session.tokens.access_token,
            refresh_token: session.tokens.refresh_token,
        }),
    ))
}

/// `POST /auth/signin`: authenticate with email + password.
pub async fn signin_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<SigninRequest>, JsonRejection>,
) -> AppResult<(CookieJar, Json<AuthResponse>)> {
    let Json(body) = payload?;
    let session = state.sessions.signin(&body.email, &body.password).await?;
    let jar = cookies::with_session(jar, &session.tokens, state.config.cookie_secure);
    Ok((
        jar,
        Json(AuthResponse {
            success: true,
            user: session.account,
            access_token: session.tokens.access_token,
            refresh_token: session.tokens.refresh_token,
        }),
    ))
}

/// `POST /auth/refresh`: rotate the session from a refresh token in the
/// body or the `refreshToken` cookie. Any failure clears both cookies.
pub async fn refresh_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Bytes,
) -> Response {
    let secure = state.config.cookie_secure;

    let from_body = if body.is_empty() {
        None
    } else {
        serde_json::from_slice::<RefreshRequest>(&body)
            .inspect_err(|e| debug!(error = %e, "ignoring unparseable refresh body"))
            .ok()
            .and_then(|req| req.refresh_token)
    };
    let token = from_body
        .or_else(|| jar.get(REFRESH_COOKIE).map(|c| c.value().to_string()))
        .filter(|t| !t.trim().is_empty());

    let Some(token) = token else {
        let err = AppError::Unauthorized("Refresh token required".into());
        return (cookies::cleared(jar, secure), err).into_response();
    };

    match state.sessions.refresh(&token).await {
        Ok(tokens) => {
            let jar = cookies::with_session(jar, &tokens, secure);
            (
                jar,
                Json(RefreshResponse {
                    success: true,
                    token: tokens.access_token,
                    refresh_token: tokens.refresh_token,
                }),
            )
                .into_response()
        }
        Err(e) => (cookies::cleared(jar, secure), AppError::from(e)).into_response(),
    }
}

/// `POST /auth/logout`: clear both auth cookies.
pub async fn logout_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<MessageResponse>) {
    (
        cookies::cleared(jar, state.config.cookie_secure),
        Json(MessageResponse::ok("Logged out successfully")),
    )
}

/// `GET /auth/me`: the caller's own profile.
pub async fn me_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(claims)): Extension<AuthenticatedUser>,
) -> AppResult<Json<UserResponse>> {
    let user = state.sessions.current_account(claims.sub).await?;
    Ok(Json(UserResponse {
        success: true,
        user,
    }))
}

/// `POST /auth/change-password`: change the caller's password.
pub async fn change_password_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(claims)): Extension<AuthenticatedUser>,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> AppResult<Json<MessageResponse>> {
    let Json(body) = payload?;
    state
        .sessions
        .change_password(claims.sub, &body.current_password, &body.new_password)
        .await?;
    Ok(Json(MessageResponse::ok("Password changed successfully")))
}
