//! Administrative account management.
//!
//! Staff and admin accounts live under the `admins` resource, which only the
//! super-admin holds. Customer status changes and deletions live under
//! `users`.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use super::password::{hash_password_with_cost, validate_password};
use super::permissions::{default_permissions, effective_permissions, ensure_permission};
use super::{AuthError, is_plausible_email, normalize_email};
use crate::clock::Clock;
use crate::models::auth::{Account, AccountProfile, AccountStatus, Principal, Role, SUPER_ADMIN_ID};
use crate::models::permissions::{Action, PermissionMatrix, Resource};
use crate::settings::AuthSettings;
use crate::store::{AuthStore, StoreError};

/// Input for creating a staff or admin account.
#[derive(Debug, Clone)]
pub struct NewAdmin {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    /// Initial grants; the role default when absent.
    pub permissions: Option<PermissionMatrix>,
}

pub struct AdminService {
    store: Arc<dyn AuthStore>,
    clock: Arc<dyn Clock>,
    bcrypt_cost: u32,
    super_admin_email: Option<String>,
}

impl AdminService {
    pub fn new(store: Arc<dyn AuthStore>, clock: Arc<dyn Clock>, settings: &AuthSettings) -> Self {
        Self {
            store,
            clock,
            bcrypt_cost: settings.bcrypt_cost,
            super_admin_email: settings
                .super_admin
                .as_ref()
                .map(|creds| normalize_email(&creds.email)),
        }
    }

    // -------------------------------------------------------------------------
    // Admin accounts
    // -------------------------------------------------------------------------

    pub async fn create_admin(
        &self,
        actor: &Principal,
        data: NewAdmin,
    ) -> Result<AccountProfile, AuthError> {
        ensure_permission(actor, Resource::Admins, Action::Create)?;

        if !matches!(data.role, Role::Staff | Role::Admin) {
            return Err(AuthError::Validation("Role must be staff or admin".into()));
        }
        let email = normalize_email(&data.email);
        let first_name = data.first_name.trim().to_string();
        let last_name = data.last_name.trim().to_string();
        if email.is_empty() || first_name.is_empty() || last_name.is_empty() {
            return Err(AuthError::Validation(
                "Email, first name and last name are required".into(),
            ));
        }
        if !is_plausible_email(&email) {
            return Err(AuthError::Validation("Invalid email address".into()));
        }
        validate_password(&data.password)?;

        let permissions = match data.permissions {
            Some(matrix) => {
                check_grantable(&matrix)?;
                matrix
            }
            None => default_permissions(data.role),
        };

        if self.super_admin_email.as_deref() == Some(email.as_str())
            || self.store.find_account_by_email(&email).await?.is_some()
        {
            return Err(AuthError::Conflict(
                "An account with this email already exists".into(),
            ));
        }

        let password_hash = hash_password_with_cost(&data.password, self.bcrypt_cost)?;
        let mut account = Account::new(
            email,
            password_hash,
            first_name,
            last_name,
            data.role,
            self.clock.now(),
        );
        account.permissions = Some(permissions);

        self.store
            .insert_account(&account)
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => {
                    AuthError::Conflict("An account with this email already exists".into())
                }
                other => AuthError::Store(other),
            })?;
        info!(account_id = %account.id, role = %account.role, "admin account created");
        Ok(admin_profile(&account))
    }

    pub async fn list_admins(&self, actor: &Principal) -> Result<Vec<AccountProfile>, AuthError> {
        ensure_permission(actor, Resource::Admins, Action::View)?;
        let admins = self
            .store
            .list_accounts_by_role(&[Role::Staff, Role::Admin])
            .await?;
        Ok(admins.iter().map(admin_profile).collect())
    }

    /// Replace an admin's stored matrix. Only the super-admin may do this,
    /// and its own matrix is fixed.
    pub async fn update_permissions(
        &self,
        actor: &Principal,
        admin_id: Uuid,
        permissions: PermissionMatrix,
    ) -> Result<AccountProfile, AuthError> {
        if !actor.is_super_admin() {
            return Err(AuthError::Forbidden(
                "Only the super admin can update permissions".into(),
            ));
        }
        if admin_id == SUPER_ADMIN_ID {
            return Err(AuthError::Forbidden(
                "Super admin permissions cannot be modified".into(),
            ));
        }
        check_grantable(&permissions)?;

        let mut account = self.find_admin(admin_id).await?;
        let now = self.clock.now();
        if !self
            .store
            .update_permissions(account.id, &permissions, now)
            .await?
        {
            return Err(AuthError::NotFound("Admin not found".into()));
        }
        account.permissions = Some(permissions);
        account.updated_at = now;
        info!(account_id = %account.id, "admin permissions updated");
        Ok(admin_profile(&account))
    }

    pub async fn delete_admin(&self, actor: &Principal, admin_id: Uuid) -> Result<(), AuthError> {
        ensure_permission(actor, Resource::Admins, Action::Delete)?;
        check_deletable(actor, admin_id)?;

        let account = self.find_admin(admin_id).await?;
        self.delete(&account).await
    }

    // -------------------------------------------------------------------------
    // Any account
    // -------------------------------------------------------------------------

    /// Activate, deactivate or suspend an account. Administrative targets
    /// additionally need the `admins` grant.
    pub async fn set_account_status(
        &self,
        actor: &Principal,
        account_id: Uuid,
        status: AccountStatus,
    ) -> Result<AccountProfile, AuthError> {
        ensure_permission(actor, Resource::Users, Action::Update)?;
        if account_id == SUPER_ADMIN_ID {
            return Err(AuthError::Forbidden(
                "Super admin account cannot be modified".into(),
            ));
        }
        if account_id == actor.id {
            return Err(AuthError::Forbidden(
                "You cannot change your own account status".into(),
            ));
        }

        let mut account = self.find_account(account_id).await?;
        if account.role.is_administrative() {
            ensure_permission(actor, Resource::Admins, Action::Update)?;
        }

        let now = self.clock.now();
        if !self.store.update_status(account.id, status, now).await? {
            return Err(AuthError::NotFound("User not found".into()));
        }
        account.status = status;
        account.updated_at = now;
        info!(account_id = %account.id, %status, "account status changed");
        Ok(account.profile())
    }

    /// Delete an account. Administrative targets additionally need the
    /// `admins` grant.
    pub async fn delete_user(&self, actor: &Principal, account_id: Uuid) -> Result<(), AuthError> {
        ensure_permission(actor, Resource::Users, Action::Delete)?;
        check_deletable(actor, account_id)?;

        let account = self.find_account(account_id).await?;
        if account.role.is_administrative() {
            ensure_permission(actor, Resource::Admins, Action::Delete)?;
        }
        self.delete(&account).await
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    async fn find_account(&self, id: Uuid) -> Result<Account, AuthError> {
        self.store
            .find_account_by_id(id)
            .await?
            .ok_or_else(|| AuthError::NotFound("User not found".into()))
    }

    async fn find_admin(&self, id: Uuid) -> Result<Account, AuthError> {
        self.store
            .find_account_by_id(id)
            .await?
            .filter(|account| matches!(account.role, Role::Staff | Role::Admin))
            .ok_or_else(|| AuthError::NotFound("Admin not found".into()))
    }

    async fn delete(&self, account: &Account) -> Result<(), AuthError> {
        if !self.store.delete_account(account.id).await? {
            return Err(AuthError::NotFound("User not found".into()));
        }
        info!(account_id = %account.id, role = %account.role, "account deleted");
        Ok(())
    }
}

/// Profile with the matrix the account actually operates under.
fn admin_profile(account: &Account) -> AccountProfile {
    let mut profile = account.profile();
    profile.permissions = Some(effective_permissions(
        account.role,
        account.permissions.as_ref(),
    ));
    profile
}

fn check_grantable(matrix: &PermissionMatrix) -> Result<(), AuthError> {
    if matrix.grants_any(Resource::Admins) {
        return Err(AuthError::Validation(
            "The admins resource can only be held by the super admin".into(),
        ));
    }
    Ok(())
}

fn check_deletable(actor: &Principal, target: Uuid) -> Result<(), AuthError> {
    if target == SUPER_ADMIN_ID {
        return Err(AuthError::Forbidden(
            "Super admin account cannot be deleted".into(),
        ));
    }
    if target == actor.id {
        return Err(AuthError::Forbidden("You cannot delete your own account".into()));
    }
    Ok(())
}
