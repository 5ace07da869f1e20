//! Session lifecycle: signup, signin, refresh, admin signin and token-based
//! caller resolution.

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use super::jwt::TokenCodec;
use super::password::{
    equalize_timing, hash_password_with_cost, timing_equalizer_hash, validate_password,
    verify_password,
};
use super::permissions::{effective_permissions, super_admin_permissions};
use super::{AuthError, is_plausible_email, normalize_email};
use crate::clock::Clock;
use crate::models::auth::{
    Account, AccountProfile, Principal, Role, SUPER_ADMIN_ID, SessionTokens, TokenClaims,
    TokenSubject,
};
use crate::settings::AuthSettings;
use crate::store::{AuthStore, StoreError};

/// Customer signup input.
#[derive(Debug, Clone, Default)]
pub struct SignupData {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
}

/// A signed-in account and its fresh token pair.
#[derive(Debug, Clone)]
pub struct Session {
    pub account: AccountProfile,
    pub tokens: SessionTokens,
}

/// A signed-in administrative principal and its fresh token pair.
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub principal: Principal,
    pub tokens: SessionTokens,
}

/// Super-admin identity with the password already hashed.
struct SuperAdmin {
    email: String,
    password_hash: String,
}

impl SuperAdmin {
    fn principal(&self) -> Principal {
        Principal {
            id: SUPER_ADMIN_ID,
            email: self.email.clone(),
            role: Role::SuperAdmin,
            permissions: super_admin_permissions(),
        }
    }
}

pub struct SessionService {
    store: Arc<dyn AuthStore>,
    codec: TokenCodec,
    clock: Arc<dyn Clock>,
    bcrypt_cost: u32,
    timing_hash: String,
    super_admin: Option<SuperAdmin>,
}

impl SessionService {
    /// Build the service; hashes the configured super-admin password once.
    pub fn new(
        store: Arc<dyn AuthStore>,
        clock: Arc<dyn Clock>,
        settings: &AuthSettings,
    ) -> Result<Self, AuthError> {
        let super_admin = match &settings.super_admin {
            Some(creds) if !creds.email.trim().is_empty() && !creds.password.is_empty() => {
                Some(SuperAdmin {
                    email: normalize_email(&creds.email),
                    password_hash: hash_password_with_cost(&creds.password, settings.bcrypt_cost)?,
                })
            }
            Some(_) => {
                warn!("super-admin credentials incomplete; super-admin disabled");
                None
            }
            None => None,
        };

        Ok(Self {
            codec: TokenCodec::new(settings, clock.clone()),
            store,
            clock,
            bcrypt_cost: settings.bcrypt_cost,
            timing_hash: timing_equalizer_hash(settings.bcrypt_cost)?,
            super_admin,
        })
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Configured super-admin email, if the identity is enabled.
    pub fn super_admin_email(&self) -> Option<&str> {
        self.super_admin.as_ref().map(|s| s.email.as_str())
    }

    // -------------------------------------------------------------------------
    // Customer sessions
    // -------------------------------------------------------------------------

    /// Register a customer account and sign it in.
    pub async fn signup(&self, data: SignupData) -> Result<Session, AuthError> {
        let email = normalize_email(&data.email);
        let first_name = data.first_name.trim().to_string();
        let last_name = data.last_name.trim().to_string();

        if email.is_empty()
            || data.password.is_empty()
            || first_name.is_empty()
            || last_name.is_empty()
        {
            return Err(AuthError::Validation(
                "Email, password, first name and last name are required".into(),
            ));
        }
        if !is_plausible_email(&email) {
            return Err(AuthError::Validation("Invalid email address".into()));
        }
        validate_password(&data.password)?;

        if self.super_admin_email() == Some(email.as_str())
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
            Role::Customer,
            self.clock.now(),
        );
        account.phone = data
            .phone
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());

        self.store
            .insert_account(&account)
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => {
                    AuthError::Conflict("An account with this email already exists".into())
                }
                other => AuthError::Store(other),
            })?;
        info!(account_id = %account.id, "account created");

        let tokens = self.issue_pair(&TokenSubject::from(&account))?;
        Ok(Session {
            account: account.profile(),
            tokens,
        })
    }

    /// Sign in with email and password.
    ///
    /// Unknown email and wrong password fail identically. The active check
    /// only runs once the password matched.
    pub async fn signin(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let account = self.check_credentials(email, password).await?;
        if !account.is_active() {
            return Err(AuthError::InactiveAccount);
        }
        info!(account_id = %account.id, "signin");

        let tokens = self.issue_pair(&TokenSubject::from(&account))?;
        Ok(Session {
            account: account.profile(),
            tokens,
        })
    }

    /// Exchange a refresh token for a new access token and a rotated refresh
    /// token. The subject is re-read so a deleted or deactivated account
    /// cannot keep refreshing.
    pub async fn refresh(&self, refresh_token: &str) -> Result<SessionTokens, AuthError> {
        let invalid = || AuthError::Unauthorized("Invalid refresh token".into());

        let claims = self.codec.verify_refresh_token(refresh_token).map_err(|e| {
            debug!(error = %e, "refresh token rejected");
            invalid()
        })?;

        let subject = if claims.role == Role::SuperAdmin {
            let principal = self.super_admin_for(&claims).ok_or_else(invalid)?;
            TokenSubject::from(&principal)
        } else {
            let account = self
                .store
                .find_account_by_id(claims.sub)
                .await?
                .filter(Account::is_active)
                .ok_or_else(invalid)?;
            TokenSubject::from(&account)
        };

        self.issue_pair(&subject)
    }

    // -------------------------------------------------------------------------
    // Admin sessions
    // -------------------------------------------------------------------------

    /// Sign in to the administrative surface.
    ///
    /// The configured super-admin is checked first; otherwise the account
    /// must hold the `staff` or `admin` role.
    pub async fn admin_signin(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AdminSession, AuthError> {
        let normalized = normalize_email(email);
        if let Some(root) = &self.super_admin
            && root.email == normalized
        {
            if !verify_password(password, &root.password_hash) {
                return Err(AuthError::InvalidCredentials);
            }
            let principal = root.principal();
            info!("super-admin signin");
            let tokens = self.issue_pair(&TokenSubject::from(&principal))?;
            return Ok(AdminSession { principal, tokens });
        }

        let account = self.check_credentials(email, password).await?;
        if !account.role.is_administrative() {
            return Err(AuthError::Forbidden("Admin access required".into()));
        }
        if !account.is_active() {
            return Err(AuthError::InactiveAccount);
        }

        let principal = principal_for(&account);
        info!(account_id = %account.id, role = %account.role, "admin signin");
        let tokens = self.issue_pair(&TokenSubject::from(&principal))?;
        Ok(AdminSession { principal, tokens })
    }

    // -------------------------------------------------------------------------
    // Token resolution
    // -------------------------------------------------------------------------

    /// Verify an access token taken from a request.
    pub fn authenticate(&self, token: Option<&str>) -> Result<TokenClaims, AuthError> {
        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::Unauthorized("Authorization token required".into()))?;
        Ok(self.codec.verify_access_token(token)?)
    }

    /// Resolve an access token to an administrative principal.
    ///
    /// Regular admins are re-read from the store so role, status and matrix
    /// changes apply to already issued tokens.
    pub async fn verify_admin_token(&self, token: Option<&str>) -> Result<Principal, AuthError> {
        let claims = self.authenticate(token)?;
        match claims.role {
            Role::SuperAdmin => self
                .super_admin_for(&claims)
                .ok_or_else(|| AuthError::Unauthorized("Invalid or expired token".into())),
            Role::Staff | Role::Admin => {
                let account = self
                    .store
                    .find_account_by_id(claims.sub)
                    .await?
                    .ok_or_else(|| AuthError::Unauthorized("Invalid or expired token".into()))?;
                if !account.role.is_administrative() {
                    return Err(AuthError::Forbidden("Admin access required".into()));
                }
                if !account.is_active() {
                    return Err(AuthError::InactiveAccount);
                }
                Ok(principal_for(&account))
            }
            Role::Customer => Err(AuthError::Forbidden("Admin access required".into())),
        }
    }

    // -------------------------------------------------------------------------
    // Account self-service
    // -------------------------------------------------------------------------

    pub async fn current_account(&self, account_id: Uuid) -> Result<AccountProfile, AuthError> {
        self.store
            .find_account_by_id(account_id)
            .await?
            .map(|account| account.profile())
            .ok_or_else(|| AuthError::NotFound("User not found".into()))
    }

    /// Change a password after re-checking the current one. Outstanding
    /// reset tickets for the account are discarded.
    pub async fn change_password(
        &self,
        account_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let account = self
            .store
            .find_account_by_id(account_id)
            .await?
            .ok_or_else(|| AuthError::NotFound("User not found".into()))?;
        if !verify_password(current_password, &account.password_hash) {
            return Err(AuthError::Unauthorized("Current password is incorrect".into()));
        }
        validate_password(new_password)?;

        let password_hash = hash_password_with_cost(new_password, self.bcrypt_cost)?;
        if !self
            .store
            .update_password(account.id, &password_hash, self.clock.now())
            .await?
        {
            return Err(AuthError::NotFound("User not found".into()));
        }
        self.store
            .delete_reset_tickets_for_account(account.id)
            .await?;
        info!(account_id = %account.id, "password changed");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    async fn check_credentials(&self, email: &str, password: &str) -> Result<Account, AuthError> {
        let email = normalize_email(email);
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::Validation("Email and password are required".into()));
        }

        let Some(account) = self.store.find_account_by_email(&email).await? else {
            equalize_timing(password, &self.timing_hash);
            return Err(AuthError::InvalidCredentials);
        };
        if !verify_password(password, &account.password_hash) {
            debug!(account_id = %account.id, "password mismatch");
            return Err(AuthError::InvalidCredentials);
        }
        Ok(account)
    }

    /// The super-admin principal, if `claims` name it and it is still
    /// configured under the same email.
    fn super_admin_for(&self, claims: &TokenClaims) -> Option<Principal> {
        let root = self.super_admin.as_ref()?;
        (claims.sub == SUPER_ADMIN_ID && claims.email == root.email).then(|| root.principal())
    }

    fn issue_pair(&self, subject: &TokenSubject) -> Result<SessionTokens, AuthError> {
        Ok(SessionTokens {
            access_token: self.codec.issue_access_token(subject)?,
            refresh_token: self.codec.issue_refresh_token(subject)?,
            access_expires_in: self.codec.access_ttl().num_seconds(),
            refresh_expires_in: self.codec.refresh_ttl().num_seconds(),
        })
    }
}

fn principal_for(account: &Account) -> Principal {
    Principal {
        id: account.id,
        email: account.email.clone(),
        role: account.role,
        permissions: effective_permissions(account.role, account.permissions.as_ref()),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::auth::jwt::TokenError;
    use crate::auth::password::MIN_BCRYPT_COST;
    use crate::auth::permissions::default_permissions;
    use crate::clock::ManualClock;
    use crate::models::auth::AccountStatus;
    use crate::models::permissions::{Action, PermissionMatrix, Resource};
    use crate::store::memory::MemoryStore;

    const ROOT_EMAIL: &str = "root@shop.test";
    const ROOT_PASSWORD: &str = "RootPass123";

    struct Fixture {
        store: Arc<MemoryStore>,
        clock: Arc<ManualClock>,
        service: SessionService,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::starting_now());
        let settings = AuthSettings::new("test-secret")
            .with_bcrypt_cost(MIN_BCRYPT_COST)
            .with_super_admin(ROOT_EMAIL, ROOT_PASSWORD);
        let service = SessionService::new(store.clone(), clock.clone(), &settings).unwrap();
        Fixture {
            store,
            clock,
            service,
        }
    }

    fn signup_data(email: &str) -> SignupData {
        SignupData {
            email: email.into(),
            password: "Shopper123".into(),
            first_name: "Grace".into(),
            last_name: "Hopper".into(),
            phone: None,
        }
    }

    async fn seed_admin(f: &Fixture, email: &str, role: Role, matrix: PermissionMatrix) -> Account {
        let mut account = Account::new(
            email.into(),
            hash_password_with_cost("AdminPass1", MIN_BCRYPT_COST).unwrap(),
            "Staff".into(),
            "Member".into(),
            role,
            f.clock.now(),
        );
        account.permissions = Some(matrix);
        f.store.insert_account(&account).await.unwrap();
        account
    }

    #[tokio::test]
    async fn signup_then_signin_yields_same_subject() {
        let f = fixture();
        let signed_up = f.service.signup(signup_data("Grace@Shop.test")).await.unwrap();
        assert_eq!(signed_up.account.email, "grace@shop.test");
        assert_eq!(signed_up.account.role, Role::Customer);
        assert!(signed_up.account.addresses.is_empty());

        let signed_in = f
            .service
            .signin("grace@shop.test", "Shopper123")
            .await
            .unwrap();
        assert_eq!(signed_in.account.id, signed_up.account.id);

        let claims = f
            .service
            .codec()
            .verify_access_token(&signed_in.tokens.access_token)
            .unwrap();
        assert_eq!(claims.sub, signed_up.account.id);
    }

    #[tokio::test]
    async fn duplicate_signup_conflicts_case_insensitively() {
        let f = fixture();
        f.service.signup(signup_data("grace@shop.test")).await.unwrap();
        let err = f
            .service
            .signup(signup_data(" GRACE@shop.test"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Conflict(_)));
    }

    #[tokio::test]
    async fn signup_cannot_claim_super_admin_email() {
        let f = fixture();
        let err = f.service.signup(signup_data(ROOT_EMAIL)).await.unwrap_err();
        assert!(matches!(err, AuthError::Conflict(_)));
    }

    #[tokio::test]
    async fn signup_validates_input() {
        let f = fixture();
        let mut missing = signup_data("grace@shop.test");
        missing.first_name = "  ".into();
        assert!(matches!(
            f.service.signup(missing).await,
            Err(AuthError::Validation(_))
        ));

        let mut weak = signup_data("grace@shop.test");
        weak.password = "password".into();
        assert!(matches!(
            f.service.signup(weak).await,
            Err(AuthError::Password(_))
        ));

        assert!(matches!(
            f.service.signup(signup_data("not-an-email")).await,
            Err(AuthError::Validation(_))
        ));
    }

    #[test]
    fn equalizer_hash_uses_configured_cost() {
        let f = fixture();
        assert!(f.service.timing_hash.starts_with("$2b$04$"));

        let settings = AuthSettings::new("test-secret").with_bcrypt_cost(MIN_BCRYPT_COST + 1);
        let service = SessionService::new(f.store.clone(), f.clock.clone(), &settings).unwrap();
        assert!(service.timing_hash.starts_with("$2b$05$"));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_fail_identically() {
        let f = fixture();
        f.service.signup(signup_data("grace@shop.test")).await.unwrap();

        let wrong = f
            .service
            .signin("grace@shop.test", "Wrong1234")
            .await
            .unwrap_err();
        let unknown = f
            .service
            .signin("nobody@shop.test", "Shopper123")
            .await
            .unwrap_err();
        assert!(matches!(wrong, AuthError::InvalidCredentials));
        assert!(matches!(unknown, AuthError::InvalidCredentials));
        assert_eq!(wrong.to_string(), "Invalid email or password");
        assert_eq!(wrong.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn inactive_account_is_refused_after_password_check() {
        let f = fixture();
        let session = f.service.signup(signup_data("grace@shop.test")).await.unwrap();
        f.store
            .update_status(session.account.id, AccountStatus::Suspended, f.clock.now())
            .await
            .unwrap();

        assert!(matches!(
            f.service.signin("grace@shop.test", "Shopper123").await,
            Err(AuthError::InactiveAccount)
        ));
        assert!(matches!(
            f.service.signin("grace@shop.test", "Wrong1234").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn refresh_rotates_and_only_accepts_refresh_tokens() {
        let f = fixture();
        let session = f.service.signup(signup_data("grace@shop.test")).await.unwrap();

        assert!(matches!(
            f.service.refresh(&session.tokens.access_token).await,
            Err(AuthError::Unauthorized(_))
        ));

        f.clock.advance(Duration::minutes(1));
        let rotated = f.service.refresh(&session.tokens.refresh_token).await.unwrap();
        assert_ne!(rotated.refresh_token, session.tokens.refresh_token);
        let claims = f
            .service
            .codec()
            .verify_access_token(&rotated.access_token)
            .unwrap();
        assert_eq!(claims.sub, session.account.id);
    }

    #[tokio::test]
    async fn refresh_fails_once_account_is_gone() {
        let f = fixture();
        let session = f.service.signup(signup_data("grace@shop.test")).await.unwrap();
        f.store.delete_account(session.account.id).await.unwrap();
        assert!(matches!(
            f.service.refresh(&session.tokens.refresh_token).await,
            Err(AuthError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn expired_access_token_is_rejected() {
        let f = fixture();
        let session = f.service.signup(signup_data("grace@shop.test")).await.unwrap();
        f.clock.advance(Duration::minutes(15));
        assert!(matches!(
            f.service.authenticate(Some(&session.tokens.access_token)),
            Err(AuthError::Token(TokenError::Expired))
        ));
    }

    #[tokio::test]
    async fn super_admin_signin_uses_nil_subject_and_full_matrix() {
        let f = fixture();
        let session = f
            .service
            .admin_signin("ROOT@shop.test", ROOT_PASSWORD)
            .await
            .unwrap();
        assert_eq!(session.principal.id, SUPER_ADMIN_ID);
        assert!(session.principal.is_super_admin());
        assert!(session.principal.permissions.allows(Resource::Admins, Action::Delete));

        let principal = f
            .service
            .verify_admin_token(Some(&session.tokens.access_token))
            .await
            .unwrap();
        assert_eq!(principal, session.principal);

        assert!(matches!(
            f.service.admin_signin(ROOT_EMAIL, "Nope12345").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn staff_signin_carries_stored_matrix() {
        let f = fixture();
        let matrix = PermissionMatrix::new().with(Resource::Orders, &[Action::View]);
        seed_admin(&f, "staff@shop.test", Role::Staff, matrix.clone()).await;

        let session = f
            .service
            .admin_signin("staff@shop.test", "AdminPass1")
            .await
            .unwrap();
        assert_eq!(session.principal.role, Role::Staff);
        assert_eq!(session.principal.permissions, matrix);
    }

    #[tokio::test]
    async fn admin_token_sees_permission_changes() {
        let f = fixture();
        let account = seed_admin(
            &f,
            "admin@shop.test",
            Role::Admin,
            default_permissions(Role::Admin),
        )
        .await;
        let session = f
            .service
            .admin_signin("admin@shop.test", "AdminPass1")
            .await
            .unwrap();

        let narrowed = PermissionMatrix::new().with(Resource::Dashboard, &[Action::View]);
        f.store
            .update_permissions(account.id, &narrowed, f.clock.now())
            .await
            .unwrap();

        let principal = f
            .service
            .verify_admin_token(Some(&session.tokens.access_token))
            .await
            .unwrap();
        assert_eq!(principal.permissions, narrowed);
    }

    #[tokio::test]
    async fn customer_cannot_use_admin_surface() {
        let f = fixture();
        let session = f.service.signup(signup_data("grace@shop.test")).await.unwrap();

        assert!(matches!(
            f.service.admin_signin("grace@shop.test", "Shopper123").await,
            Err(AuthError::Forbidden(_))
        ));
        let err = f
            .service
            .verify_admin_token(Some(&session.tokens.access_token))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Forbidden(ref m) if m == "Admin access required"));
    }

    #[tokio::test]
    async fn admin_token_verification_failures() {
        let f = fixture();
        let missing = f.service.verify_admin_token(None).await.unwrap_err();
        assert!(matches!(
            missing,
            AuthError::Unauthorized(ref m) if m == "Authorization token required"
        ));

        let garbage = f.service.verify_admin_token(Some("not.a.jwt")).await.unwrap_err();
        assert!(matches!(garbage, AuthError::Token(_)));
    }

    #[tokio::test]
    async fn change_password_requires_current_password() {
        let f = fixture();
        let session = f.service.signup(signup_data("grace@shop.test")).await.unwrap();
        let id = session.account.id;

        assert!(matches!(
            f.service.change_password(id, "Wrong1234", "Fresh1234").await,
            Err(AuthError::Unauthorized(_))
        ));
        assert!(matches!(
            f.service.change_password(id, "Shopper123", "weak").await,
            Err(AuthError::Password(_))
        ));

        f.service
            .change_password(id, "Shopper123", "Fresh1234")
            .await
            .unwrap();
        assert!(f.service.signin("grace@shop.test", "Fresh1234").await.is_ok());
        assert!(f.service.signin("grace@shop.test", "Shopper123").await.is_err());
    }
}
