//! Authentication settings shared by the core services.

use std::fmt;

use chrono::Duration;

use crate::auth::jwt::{DEFAULT_ACCESS_TOKEN_TTL_SECS, DEFAULT_REFRESH_TOKEN_TTL_DAYS};
use crate::auth::password::DEFAULT_BCRYPT_COST;
use crate::auth::reset::DEFAULT_RESET_TICKET_TTL_MINS;

/// Token, hashing, reset and super-admin settings.
#[derive(Clone)]
pub struct AuthSettings {
    /// HS256 secret for access tokens.
    pub jwt_secret: String,
    /// HS256 secret for refresh tokens; falls back to `jwt_secret`.
    pub refresh_secret: Option<String>,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    pub reset_ticket_ttl: Duration,
    pub bcrypt_cost: u32,
    /// Configured super-admin credentials; `None` disables the identity.
    pub super_admin: Option<SuperAdminCredentials>,
}

impl AuthSettings {
    /// Settings with default lifetimes and cost for the given secret.
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            refresh_secret: None,
            access_token_ttl: Duration::seconds(DEFAULT_ACCESS_TOKEN_TTL_SECS),
            refresh_token_ttl: Duration::days(DEFAULT_REFRESH_TOKEN_TTL_DAYS),
            reset_ticket_ttl: Duration::minutes(DEFAULT_RESET_TICKET_TTL_MINS),
            bcrypt_cost: DEFAULT_BCRYPT_COST,
            super_admin: None,
        }
    }

    pub fn with_super_admin(
        mut self,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.super_admin = Some(SuperAdminCredentials {
            email: email.into(),
            password: password.into(),
        });
        self
    }

    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    /// Secret used for refresh tokens.
    pub fn refresh_secret(&self) -> &str {
        self.refresh_secret.as_deref().unwrap_or(&self.jwt_secret)
    }
}

impl fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSettings")
            .field("jwt_secret", &"<redacted>")
            .field("refresh_secret", &self.refresh_secret.as_ref().map(|_| "<redacted>"))
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .field("reset_ticket_ttl", &self.reset_ticket_ttl)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("super_admin", &self.super_admin)
            .finish()
    }
}

/// Plaintext super-admin credentials as read from the environment.
///
/// The password is hashed once when the session service starts and the
/// plaintext is not retained there.
#[derive(Clone)]
pub struct SuperAdminCredentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for SuperAdminCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuperAdminCredentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}
