//! Persistence seam for accounts and password-reset tickets.
//!
//! [`AuthStore`] is implemented by [`postgres::PgStore`] for deployments and
//! by [`memory::MemoryStore`] for tests and local development.

pub mod memory;
pub mod postgres;
pub mod registry;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::ParseTagError;
use crate::models::auth::{Account, AccountStatus, ResetTicket, Role};
use crate::models::permissions::PermissionMatrix;

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint was violated (duplicate email or id).
    #[error("Duplicate entry: {0}")]
    Conflict(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Database error: {0}")]
    DbError(#[from] sqlx::Error),
}

impl From<ParseTagError> for StoreError {
    fn from(e: ParseTagError) -> Self {
        StoreError::Corrupt(e.to_string())
    }
}

/// Storage operations the auth core depends on.
///
/// Emails passed in are already normalized; implementations still compare
/// them case-insensitively.
#[async_trait]
pub trait AuthStore: Send + Sync {
    // -------------------------------------------------------------------------
    // Accounts
    // -------------------------------------------------------------------------

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    async fn find_account_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError>;

    /// Insert a new account. Fails with [`StoreError::Conflict`] on a
    /// duplicate email.
    async fn insert_account(&self, account: &Account) -> Result<(), StoreError>;

    /// Accounts holding any of `roles`, oldest first.
    async fn list_accounts_by_role(&self, roles: &[Role]) -> Result<Vec<Account>, StoreError>;

    /// Returns `false` when no account has that id.
    async fn update_password(
        &self,
        id: Uuid,
        password_hash: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    async fn update_permissions(
        &self,
        id: Uuid,
        permissions: &PermissionMatrix,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    async fn update_status(
        &self,
        id: Uuid,
        status: AccountStatus,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Delete an account together with its reset tickets.
    async fn delete_account(&self, id: Uuid) -> Result<bool, StoreError>;

    // -------------------------------------------------------------------------
    // Password-reset tickets
    // -------------------------------------------------------------------------

    async fn insert_reset_ticket(&self, ticket: &ResetTicket) -> Result<(), StoreError>;

    async fn find_reset_ticket(&self, token_hash: &str) -> Result<Option<ResetTicket>, StoreError>;

    async fn delete_reset_ticket(&self, token_hash: &str) -> Result<bool, StoreError>;

    /// Delete every ticket owned by an account; returns how many were removed.
    async fn delete_reset_tickets_for_account(&self, account_id: Uuid) -> Result<u64, StoreError>;

    /// Consume a ticket and install a new password hash on its account as one
    /// unit. Returns `false`, changing nothing, if the ticket no longer
    /// exists, has expired as of `at`, or its account is gone.
    async fn consume_reset_ticket(
        &self,
        token_hash: &str,
        password_hash: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;
}
