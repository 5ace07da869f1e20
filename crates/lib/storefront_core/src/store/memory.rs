//! In-memory [`AuthStore`] for tests and local development.
//!
//! All state sits behind one async mutex, so every trait method, including
//! ticket consumption, is atomic with respect to the others.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{AuthStore, StoreError};
use crate::models::auth::{Account, AccountStatus, ResetTicket, Role};
use crate::models::permissions::PermissionMatrix;

#[derive(Debug, Default)]
struct Inner {
    accounts: HashMap<Uuid, Account>,
    tickets: HashMap<String, ResetTicket>,
}

impl Inner {
    fn email_taken(&self, email: &str) -> bool {
        self.accounts
            .values()
            .any(|a| a.email.eq_ignore_ascii_case(email))
    }
}

/// Process-local store; contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored reset tickets.
    pub async fn reset_ticket_count(&self) -> usize {
        self.inner.lock().await.tickets.len()
    }
}

#[async_trait]
impl AuthStore for MemoryStore {
    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .accounts
            .values()
            .find(|a| a.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_account_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        Ok(self.inner.lock().await.accounts.get(&id).cloned())
    }

    async fn insert_account(&self, account: &Account) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if inner.email_taken(&account.email) {
            return Err(StoreError::Conflict(format!("email {}", account.email)));
        }
        if inner.accounts.contains_key(&account.id) {
            return Err(StoreError::Conflict(format!("account id {}", account.id)));
        }
        inner.accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn list_accounts_by_role(&self, roles: &[Role]) -> Result<Vec<Account>, StoreError> {
        let inner = self.inner.lock().await;
        let mut accounts: Vec<Account> = inner
            .accounts
            .values()
            .filter(|a| roles.contains(&a.role))
            .cloned()
            .collect();
        accounts.sort_by_key(|a| (a.created_at, a.id));
        Ok(accounts)
    }

    async fn update_password(
        &self,
        id: Uuid,
        password_hash: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        Ok(match inner.accounts.get_mut(&id) {
            Some(account) => {
                account.password_hash = password_hash.to_string();
                account.updated_at = at;
                true
            }
            None => false,
        })
    }

    async fn update_permissions(
        &self,
        id: Uuid,
        permissions: &PermissionMatrix,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        Ok(match inner.accounts.get_mut(&id) {
            Some(account) => {
                account.permissions = Some(permissions.clone());
                account.updated_at = at;
                true
            }
            None => false,
        })
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: AccountStatus,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        Ok(match inner.accounts.get_mut(&id) {
            Some(account) => {
                account.status = status;
                account.updated_at = at;
                true
            }
            None => false,
        })
    }

    async fn delete_account(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        let removed = inner.accounts.remove(&id).is_some();
        if removed {
            inner.tickets.retain(|_, t| t.account_id != id);
        }
        Ok(removed)
    }

    async fn insert_reset_ticket(&self, ticket: &ResetTicket) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if inner.tickets.contains_key(&ticket.token_hash) {
            return Err(StoreError::Conflict("reset ticket".into()));
        }
        inner
            .tickets
            .insert(ticket.token_hash.clone(), ticket.clone());
        Ok(())
    }

    async fn find_reset_ticket(&self, token_hash: &str) -> Result<Option<ResetTicket>, StoreError> {
        Ok(self.inner.lock().await.tickets.get(token_hash).cloned())
    }

    async fn delete_reset_ticket(&self, token_hash: &str) -> Result<bool, StoreError> {
        Ok(self.inner.lock().await.tickets.remove(token_hash).is_some())
    }

    async fn delete_reset_tickets_for_account(&self, account_id: Uuid) -> Result<u64, StoreError> {
        let mut inner = self.inner.lock().await;
        let before = inner.tickets.len();
        inner.tickets.retain(|_, t| t.account_id != account_id);
        Ok((before - inner.tickets.len()) as u64)
    }

    async fn consume_reset_ticket(
        &self,
        token_hash: &str,
        password_hash: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        let Some(account_id) = inner
            .tickets
            .get(token_hash)
            .filter(|t| !t.is_expired(at))
            .map(|t| t.account_id)
        else {
            return Ok(false);
        };
        let Some(account) = inner.accounts.get_mut(&account_id) else {
            return Ok(false);
        };
        account.password_hash = password_hash.to_string();
        account.updated_at = at;
        inner.tickets.remove(token_hash);
        Ok(true)
    }
}
