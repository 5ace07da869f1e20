//! Password-reset tickets.
//!
//! A ticket moves from issued to exactly one of consumed, expired or
//! superseded. The raw secret is handed out once at issuance; only its
//! SHA-256 digest is stored, so a leaked table cannot be replayed.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use super::password::{hash_password_with_cost, validate_password};
use super::{AuthError, normalize_email};
use crate::clock::Clock;
use crate::models::auth::ResetTicket;
use crate::notify::ResetNotifier;
use crate::settings::AuthSettings;
use crate::store::AuthStore;

/// Reset ticket lifetime: 15 minutes.
pub const DEFAULT_RESET_TICKET_TTL_MINS: i64 = 15;

/// Length of the raw reset secret.
pub const RESET_SECRET_LENGTH: usize = 64;

/// Generate a random reset secret.
fn generate_secret() -> String {
    rng()
        .sample_iter(&Alphanumeric)
        .take(RESET_SECRET_LENGTH)
        .map(char::from)
        .collect()
}

/// SHA-256 hash a secret for storage and lookup.
fn digest_secret(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// A newly issued ticket with its raw secret.
#[derive(Clone)]
pub struct IssuedReset {
    pub email: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl fmt::Debug for IssuedReset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedReset")
            .field("email", &self.email)
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Issues, validates and consumes password-reset tickets.
pub struct PasswordResetService {
    store: Arc<dyn AuthStore>,
    notifier: Arc<dyn ResetNotifier>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    bcrypt_cost: u32,
}

impl PasswordResetService {
    pub fn new(
        store: Arc<dyn AuthStore>,
        notifier: Arc<dyn ResetNotifier>,
        clock: Arc<dyn Clock>,
        settings: &AuthSettings,
    ) -> Self {
        Self {
            store,
            notifier,
            clock,
            ttl: settings.reset_ticket_ttl,
            bcrypt_cost: settings.bcrypt_cost,
        }
    }

    /// Issue a ticket for `email` and hand it to the notifier.
    ///
    /// Unknown and non-active accounts yield `Ok(None)` with no ticket and no
    /// notification; callers must answer both cases identically. Any earlier
    /// tickets of the account are superseded.
    pub async fn create_reset(&self, email: &str) -> Result<Option<IssuedReset>, AuthError> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(AuthError::Validation("Email is required".into()));
        }

        let Some(account) = self.store.find_account_by_email(&email).await? else {
            debug!("password reset requested for unknown email");
            return Ok(None);
        };
        if !account.is_active() {
            debug!(account_id = %account.id, "password reset requested for inactive account");
            return Ok(None);
        }

        let superseded = self
            .store
            .delete_reset_tickets_for_account(account.id)
            .await?;

        let secret = generate_secret();
        let now = self.clock.now();
        let ticket = ResetTicket {
            token_hash: digest_secret(&secret),
            account_id: account.id,
            email: account.email.clone(),
            created_at: now,
            expires_at: now + self.ttl,
        };
        self.store.insert_reset_ticket(&ticket).await?;
        info!(account_id = %account.id, superseded, "password reset ticket issued");

        if let Err(e) = self
            .notifier
            .send_password_reset(&ticket.email, &secret, ticket.expires_at)
            .await
        {
            warn!(account_id = %account.id, error = %e, "password reset notification failed");
        }

        Ok(Some(IssuedReset {
            email: ticket.email,
            token: secret,
            expires_at: ticket.expires_at,
        }))
    }

    /// Check a secret without consuming it; returns the owning email.
    ///
    /// An expired ticket is deleted on the way out.
    pub async fn verify_reset_token(&self, token: &str) -> Result<String, AuthError> {
        let ticket = self.live_ticket(token).await?;
        Ok(ticket.email)
    }

    /// Install `new_password` on the ticket's account and consume the ticket.
    ///
    /// Policy failures leave both the ticket and the credential untouched.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), AuthError> {
        let ticket = self.live_ticket(token).await?;
        validate_password(new_password)?;

        let password_hash = hash_password_with_cost(new_password, self.bcrypt_cost)?;
        let consumed = self
            .store
            .consume_reset_ticket(&ticket.token_hash, &password_hash, self.clock.now())
            .await?;
        if !consumed {
            // Another request consumed the ticket between lookup and claim.
            return Err(AuthError::NotFound("Invalid or expired reset token".into()));
        }

        info!(account_id = %ticket.account_id, "password reset completed");
        Ok(())
    }

    async fn live_ticket(&self, token: &str) -> Result<ResetTicket, AuthError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::Validation("Reset token is required".into()));
        }

        let token_hash = digest_secret(token);
        let Some(ticket) = self.store.find_reset_ticket(&token_hash).await? else {
            return Err(AuthError::NotFound("Invalid or expired reset token".into()));
        };
        if ticket.is_expired(self.clock.now()) {
            self.store.delete_reset_ticket(&token_hash).await?;
            debug!(account_id = %ticket.account_id, "expired reset ticket removed");
            return Err(AuthError::ResetExpired);
        }
        Ok(ticket)
    }
}
