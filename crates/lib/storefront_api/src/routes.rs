//! Route paths.

pub const GET_API_HEALTH: &str = "/api/health";

pub const POST_AUTH_SIGNUP: &str = "/auth/signup";
pub const POST_AUTH_SIGNIN: &str = "/auth/signin";
pub const POST_AUTH_REFRESH: &str = "/auth/refresh";
pub const POST_AUTH_LOGOUT: &str = "/auth/logout";
pub const GET_AUTH_ME: &str = "/auth/me";
pub const POST_AUTH_CHANGE_PASSWORD: &str = "/auth/change-password";

pub const POST_AUTH_FORGOT_PASSWORD: &str = "/auth/forgot-password";
pub const AUTH_RESET_PASSWORD: &str = "/auth/reset-password";
pub const POST_AUTH_VERIFY_PASSWORD_RESET: &str = "/auth/verify-password-reset";

pub const POST_ADMIN_AUTH_SIGNIN: &str = "/admin/auth/signin";
pub const GET_ADMIN_ME: &str = "/admin/me";
pub const GET_ADMIN_ACCESS: &str = "/admin/access";
pub const ADMIN_ADMINS: &str = "/admin/admins";
pub const DELETE_ADMIN_ADMINS_ID: &str = "/admin/admins/{id}";
pub const PUT_ADMIN_ADMINS_ID_PERMISSIONS: &str = "/admin/admins/{id}/permissions";
pub const PATCH_ADMIN_USERS_ID_STATUS: &str = "/admin/users/{id}/status";
pub const DELETE_ADMIN_USERS_ID: &str = "/admin/users/{id}";
