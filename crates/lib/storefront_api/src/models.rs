//! Request and response bodies.
//!
//! Request fields default to empty so that missing input reaches the core
//! validation and comes back as a 400 with a JSON body.

use serde::{Deserialize, Serialize};
use storefront_core::auth::permissions::RouteAccess;
use storefront_core::auth::session::SignupData;
use storefront_core::models::auth::{AccountProfile, AccountStatus, Principal, Role};
use storefront_core::models::permissions::PermissionMatrix;
use uuid::Uuid;

// =============================================================================
// Common
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

// =============================================================================
// Customer auth
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
}

impl From<SignupRequest> for SignupData {
    fn from(req: SignupRequest) -> Self {
        SignupData {
            email: req.email,
            password: req.password,
            first_name: req.first_name,
            last_name: req.last_name,
            phone: req.phone,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub success: bool,
    pub user: AccountProfile,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub success: bool,
    pub token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub success: bool,
    pub user: AccountProfile,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

// =============================================================================
// Password reset
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ResetTokenQuery {
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyResetResponse {
    pub success: bool,
    pub email: String,
}

/// Accepts the secret as either `token` or `code`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResetPasswordRequest {
    pub token: Option<String>,
    pub code: Option<String>,
    pub new_password: String,
}

impl ResetPasswordRequest {
    pub fn secret(&self) -> &str {
        self.token
            .as_deref()
            .or(self.code.as_deref())
            .unwrap_or_default()
    }
}

// =============================================================================
// Admin
// =============================================================================

/// Administrative identity as returned to the admin UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminView {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub permissions: PermissionMatrix,
}

impl From<Principal> for AdminView {
    fn from(principal: Principal) -> Self {
        Self {
            id: principal.id,
            email: principal.email,
            role: principal.role,
            permissions: principal.permissions,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminAuthResponse {
    pub success: bool,
    pub admin: AdminView,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminResponse {
    pub success: bool,
    pub admin: AdminView,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AccessQuery {
    pub path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccessResponse {
    pub success: bool,
    #[serde(flatten)]
    pub access: RouteAccess,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAdminRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default = "default_admin_role")]
    pub role: Role,
    #[serde(default)]
    pub permissions: Option<PermissionMatrix>,
}

fn default_admin_role() -> Role {
    Role::Staff
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountResponse {
    pub success: bool,
    pub account: AccountProfile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminListResponse {
    pub success: bool,
    pub admins: Vec<AccountProfile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdatePermissionsRequest {
    pub permissions: PermissionMatrix,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: AccountStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_request_accepts_token_or_code() {
        let by_token: ResetPasswordRequest =
            serde_json::from_str(r#"{"token":"abc","newPassword":"Abc12345"}"#).unwrap();
        assert_eq!(by_token.secret(), "abc");

        let by_code: ResetPasswordRequest =
            serde_json::from_str(r#"{"code":"xyz","newPassword":"Abc12345"}"#).unwrap();
        assert_eq!(by_code.secret(), "xyz");

        let neither: ResetPasswordRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(neither.secret(), "");
    }

    #[test]
    fn create_admin_defaults_to_staff() {
        let req: CreateAdminRequest =
            serde_json::from_str(r#"{"email":"a@b.com","password":"Abc12345"}"#).unwrap();
        assert_eq!(req.role, Role::Staff);
        assert!(req.permissions.is_none());
    }
}
