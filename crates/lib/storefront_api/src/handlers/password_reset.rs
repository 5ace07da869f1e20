//! Password-reset handlers.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};

use crate::AppState;
use crate::error::AppResult;
use crate::models::{
    ForgotPasswordRequest, MessageResponse, ResetPasswordRequest, ResetTokenQuery,
    VerifyResetResponse,
};

/// Same answer whether or not the email belongs to an account.
const FORGOT_PASSWORD_MESSAGE: &str =
    "If an account with that email exists, a password reset link has been sent";

/// `POST /auth/forgot-password`: issue a reset ticket if the account exists.
pub async fn forgot_password_handler(
    State(state): State<AppState>,
    payload: Result<Json<ForgotPasswordRequest>, JsonRejection>,
) -> AppResult<Json<MessageResponse>> {
    let Json(body) = payload?;
    state.resets.create_reset(&body.email).await?;
    Ok(Json(MessageResponse::ok(FORGOT_PASSWORD_MESSAGE)))
}

/// `GET /auth/reset-password?token=`: check a reset secret without using it.
pub async fn verify_reset_handler(
    State(state): State<AppState>,
    Query(query): Query<ResetTokenQuery>,
) -> AppResult<Json<VerifyResetResponse>> {
    let email = state.resets.verify_reset_token(&query.token).await?;
    Ok(Json(VerifyResetResponse {
        success: true,
        email,
    }))
}

/// `POST /auth/reset-password`, `POST /auth/verify-password-reset`: set a
/// new password with a reset secret.
pub async fn reset_password_handler(
    State(state): State<AppState>,
    payload: Result<Json<ResetPasswordRequest>, JsonRejection>,
) -> AppResult<Json<MessageResponse>> {
    let Json(body) = payload?;
    state
        .resets
        .reset_password(body.secret(), &body.new_password)
        .await?;
    Ok(Json(MessageResponse::ok("Password has been reset successfully")))
}
