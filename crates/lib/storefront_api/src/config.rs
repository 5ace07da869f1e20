//! API server configuration.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::Duration;
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use storefront_core::auth::jwt::{DEFAULT_ACCESS_TOKEN_TTL_SECS, DEFAULT_REFRESH_TOKEN_TTL_DAYS};
use storefront_core::auth::password::DEFAULT_BCRYPT_COST;
use storefront_core::auth::reset::DEFAULT_RESET_TICKET_TTL_MINS;
use storefront_core::settings::AuthSettings;
use tracing::{info, warn};

/// Length of a generated signing secret.
const GENERATED_SECRET_LENGTH: usize = 64;

/// Configuration for the API server.
#[derive(Clone)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:3100").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub pg_connection_url: String,
    /// JWT signing secret for access tokens.
    pub jwt_secret: String,
    /// Separate signing secret for refresh tokens.
    pub jwt_refresh_secret: Option<String>,
    pub access_token_ttl_secs: i64,
    pub refresh_token_ttl_days: i64,
    pub reset_token_ttl_mins: i64,
    pub bcrypt_cost: u32,
    pub super_admin_email: Option<String>,
    pub super_admin_password: Option<String>,
    /// Mark auth cookies `Secure`.
    pub cookie_secure: bool,
    /// Storefront UI origin used in password-reset links.
    pub public_base_url: String,
}

impl ApiConfig {
    /// Defaults for everything but the signing secret.
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            bind_addr: "127.0.0.1:3100".into(),
            pg_connection_url: "postgres://localhost:5432/storefront".into(),
            jwt_secret: jwt_secret.into(),
            jwt_refresh_secret: None,
            access_token_ttl_secs: DEFAULT_ACCESS_TOKEN_TTL_SECS,
            refresh_token_ttl_days: DEFAULT_REFRESH_TOKEN_TTL_DAYS,
            reset_token_ttl_mins: DEFAULT_RESET_TICKET_TTL_MINS,
            bcrypt_cost: DEFAULT_BCRYPT_COST,
            super_admin_email: None,
            super_admin_password: None,
            cookie_secure: false,
            public_base_url: "http://localhost:3000".into(),
        }
    }

    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable                 | Default                                  |
    /// |--------------------------|------------------------------------------|
    /// | `BIND_ADDR`              | `127.0.0.1:3100`                         |
    /// | `DATABASE_URL`           | `postgres://localhost:5432/storefront`   |
    /// | `JWT_SECRET` / `AUTH_SECRET` | generated, kept in the data dir      |
    /// | `JWT_REFRESH_SECRET`     | same as the access secret                |
    /// | `ACCESS_TOKEN_TTL_SECS`  | `900`                                    |
    /// | `REFRESH_TOKEN_TTL_DAYS` | `7`                                      |
    /// | `RESET_TOKEN_TTL_MINS`   | `15`                                     |
    /// | `BCRYPT_COST`            | `10`                                     |
    /// | `SUPER_ADMIN_EMAIL`      | unset (super-admin disabled)             |
    /// | `SUPER_ADMIN_PASSWORD`   | unset (super-admin disabled)             |
    /// | `COOKIE_SECURE`          | `false`                                  |
    /// | `PUBLIC_BASE_URL`        | `http://localhost:3000`                  |
    pub fn from_env() -> Self {
        let defaults = Self::new(signing_secret());
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            pg_connection_url: std::env::var("DATABASE_URL")
                .unwrap_or(defaults.pg_connection_url),
            jwt_refresh_secret: non_empty_var("JWT_REFRESH_SECRET"),
            access_token_ttl_secs: parsed_var(
                "ACCESS_TOKEN_TTL_SECS",
                defaults.access_token_ttl_secs,
            ),
            refresh_token_ttl_days: parsed_var(
                "REFRESH_TOKEN_TTL_DAYS",
                defaults.refresh_token_ttl_days,
            ),
            reset_token_ttl_mins: parsed_var(
                "RESET_TOKEN_TTL_MINS",
                defaults.reset_token_ttl_mins,
            ),
            bcrypt_cost: parsed_var("BCRYPT_COST", defaults.bcrypt_cost),
            super_admin_email: non_empty_var("SUPER_ADMIN_EMAIL"),
            super_admin_password: non_empty_var("SUPER_ADMIN_PASSWORD"),
            cookie_secure: parsed_var("COOKIE_SECURE", defaults.cookie_secure),
            public_base_url: std::env::var("PUBLIC_BASE_URL")
                .unwrap_or(defaults.public_base_url),
            jwt_secret: defaults.jwt_secret,
        }
    }

    /// Core settings derived from this configuration.
    pub fn auth_settings(&self) -> AuthSettings {
        let mut settings =
            AuthSettings::new(self.jwt_secret.clone()).with_bcrypt_cost(self.bcrypt_cost);
        settings.refresh_secret = self.jwt_refresh_secret.clone();
        settings.access_token_ttl = Duration::seconds(self.access_token_ttl_secs);
        settings.refresh_token_ttl = Duration::days(self.refresh_token_ttl_days);
        settings.reset_ticket_ttl = Duration::minutes(self.reset_token_ttl_mins);
        if let (Some(email), Some(password)) =
            (&self.super_admin_email, &self.super_admin_password)
        {
            settings = settings.with_super_admin(email.clone(), password.clone());
        }
        settings
    }
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("bind_addr", &self.bind_addr)
            .field("access_token_ttl_secs", &self.access_token_ttl_secs)
            .field("refresh_token_ttl_days", &self.refresh_token_ttl_days)
            .field("reset_token_ttl_mins", &self.reset_token_ttl_mins)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("super_admin_email", &self.super_admin_email)
            .field("cookie_secure", &self.cookie_secure)
            .field("public_base_url", &self.public_base_url)
            .finish_non_exhaustive()
    }
}

/// Signing secret from `JWT_SECRET`, then `AUTH_SECRET`, then the file under
/// the user data dir, generating that file on first start.
fn signing_secret() -> String {
    non_empty_var("JWT_SECRET")
        .or_else(|| non_empty_var("AUTH_SECRET"))
        .unwrap_or_else(|| stored_secret(&secret_file()))
}

fn secret_file() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("storefront")
        .join("jwt-secret")
}

/// Read the secret kept at `path`, or generate and keep a new one. A secret
/// that cannot be written is still used for this process.
fn stored_secret(path: &Path) -> String {
    if let Ok(existing) = fs::read_to_string(path) {
        let existing = existing.trim();
        if !existing.is_empty() {
            return existing.to_string();
        }
    }

    let secret: String = rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_SECRET_LENGTH)
        .map(char::from)
        .collect();
    let written = match path.parent() {
        Some(dir) => fs::create_dir_all(dir).and_then(|()| fs::write(path, &secret)),
        None => fs::write(path, &secret),
    };
    match written {
        Ok(()) => info!(path = %path.display(), "generated new signing secret"),
        Err(e) => warn!(
            path = %path.display(),
            error = %e,
            "could not persist signing secret; tokens will not survive a restart"
        ),
    }
    secret
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_var<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, "unparseable config value, using default");
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_follow_config_values() {
        let mut config = ApiConfig::new("secret");
        config.access_token_ttl_secs = 60;
        config.refresh_token_ttl_days = 1;
        config.reset_token_ttl_mins = 5;
        config.super_admin_email = Some("root@shop.test".into());
        config.super_admin_password = Some("RootPass123".into());

        let settings = config.auth_settings();
        assert_eq!(settings.access_token_ttl.num_seconds(), 60);
        assert_eq!(settings.refresh_token_ttl.num_hours(), 24);
        assert_eq!(settings.reset_ticket_ttl.num_minutes(), 5);
        assert_eq!(settings.refresh_secret(), "secret");
        assert!(settings.super_admin.is_some());
    }

    #[test]
    fn super_admin_needs_both_halves() {
        let mut config = ApiConfig::new("secret");
        config.super_admin_email = Some("root@shop.test".into());
        assert!(config.auth_settings().super_admin.is_none());
    }

    #[test]
    fn generated_secret_is_kept_and_reused() {
        let dir = std::env::temp_dir().join(format!("storefront-{}", uuid::Uuid::now_v7()));
        let path = dir.join("nested").join("jwt-secret");

        let first = stored_secret(&path);
        assert_eq!(first.len(), GENERATED_SECRET_LENGTH);
        assert!(first.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(fs::read_to_string(&path).unwrap(), first);
        assert_eq!(stored_secret(&path), first);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn blank_secret_file_is_replaced() {
        let dir = std::env::temp_dir().join(format!("storefront-{}", uuid::Uuid::now_v7()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("jwt-secret");
        fs::write(&path, "  \n").unwrap();

        let secret = stored_secret(&path);
        assert_eq!(secret.len(), GENERATED_SECRET_LENGTH);
        assert_eq!(fs::read_to_string(&path).unwrap(), secret);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn debug_hides_secrets() {
        let mut config = ApiConfig::new("very-secret");
        config.super_admin_password = Some("hunter2".into());
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("very-secret"));
        assert!(!rendered.contains("hunter2"));
    }
}
