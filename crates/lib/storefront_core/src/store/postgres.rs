//! PostgreSQL-backed [`AuthStore`].
//!
//! Preferences, addresses and permission matrices are stored as JSONB
//! documents on the account row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;
use tracing::debug;
use uuid::Uuid;

use super::registry::{EntitySchema, register_once};
use super::{AuthStore, StoreError};
use crate::models::auth::{Account, AccountStatus, Address, Preferences, ResetTicket, Role};
use crate::models::permissions::PermissionMatrix;

pub const ACCOUNTS: EntitySchema = EntitySchema {
    name: "accounts",
    ddl: r#"
        CREATE TABLE IF NOT EXISTS accounts (
            id              UUID PRIMARY KEY,
            email           TEXT NOT NULL,
            password_hash   TEXT NOT NULL,
            first_name      TEXT NOT NULL,
            last_name       TEXT NOT NULL,
            phone           TEXT,
            role            TEXT NOT NULL,
            status          TEXT NOT NULL,
            email_verified  BOOLEAN NOT NULL DEFAULT false,
            phone_verified  BOOLEAN NOT NULL DEFAULT false,
            preferences     JSONB NOT NULL DEFAULT '{}'::jsonb,
            addresses       JSONB NOT NULL DEFAULT '[]'::jsonb,
            permissions     JSONB,
            created_at      TIMESTAMPTZ NOT NULL,
            updated_at      TIMESTAMPTZ NOT NULL
        );
        CREATE UNIQUE INDEX IF NOT EXISTS accounts_email_lower_idx ON accounts (lower(email));
        CREATE INDEX IF NOT EXISTS accounts_role_idx ON accounts (role);
    "#,
};

pub const PASSWORD_RESET_TICKETS: EntitySchema = EntitySchema {
    name: "password_reset_tickets",
    ddl: r#"
        CREATE TABLE IF NOT EXISTS password_reset_tickets (
            token_hash  TEXT PRIMARY KEY,
            account_id  UUID NOT NULL REFERENCES accounts (id) ON DELETE CASCADE,
            email       TEXT NOT NULL,
            created_at  TIMESTAMPTZ NOT NULL,
            expires_at  TIMESTAMPTZ NOT NULL
        );
        CREATE INDEX IF NOT EXISTS password_reset_tickets_account_idx
            ON password_reset_tickets (account_id);
    "#,
};

/// Entities in dependency order.
pub const ENTITIES: [EntitySchema; 2] = [ACCOUNTS, PASSWORD_RESET_TICKETS];

const ACCOUNT_COLUMNS: &str = "id, email, password_hash, first_name, last_name, phone, role, \
     status, email_verified, phone_verified, preferences, addresses, permissions, \
     created_at, updated_at";

#[derive(sqlx::FromRow)]
struct AccountRow {
    id: Uuid,
    email: String,
    password_hash: String,
    first_name: String,
    last_name: String,
    phone: Option<String>,
    role: String,
    status: String,
    email_verified: bool,
    phone_verified: bool,
    preferences: Json<Preferences>,
    addresses: Json<Vec<Address>>,
    permissions: Option<Json<PermissionMatrix>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = StoreError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        Ok(Account {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            first_name: row.first_name,
            last_name: row.last_name,
            phone: row.phone,
            role: row.role.parse()?,
            status: row.status.parse()?,
            email_verified: row.email_verified,
            phone_verified: row.phone_verified,
            preferences: row.preferences.0,
            addresses: row.addresses.0,
            permissions: row.permissions.map(|p| p.0),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

type TicketRow = (String, Uuid, String, DateTime<Utc>, DateTime<Utc>);

fn ticket_from_row(
    (token_hash, account_id, email, created_at, expires_at): TicketRow,
) -> ResetTicket {
    ResetTicket {
        token_hash,
        account_id,
        email,
        created_at,
        expires_at,
    }
}

fn conflict_or_db(e: sqlx::Error, what: &str) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(what.to_string())
        }
        _ => StoreError::DbError(e),
    }
}

/// Postgres store over a shared pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap `pool`, creating the auth tables on first use in this process.
    pub async fn connect(pool: PgPool) -> Result<Self, StoreError> {
        let pool_ref = &pool;
        for entity in ENTITIES {
            let created = register_once(entity.name, move || async move {
                sqlx::raw_sql(entity.ddl)
                    .execute(pool_ref)
                    .await
                    .map(|_| ())
            })
            .await?;
            if created {
                debug!(entity = entity.name, "registered entity schema");
            }
        }
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl AuthStore for PgStore {
    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE lower(email) = lower($1)"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Account::try_from).transpose()
    }

    async fn find_account_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Account::try_from).transpose()
    }

    async fn insert_account(&self, account: &Account) -> Result<(), StoreError> {
        sqlx::query(&format!(
            "INSERT INTO accounts ({ACCOUNT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)"
        ))
        .bind(account.id)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(&account.first_name)
        .bind(&account.last_name)
        .bind(&account.phone)
        .bind(account.role.as_str())
        .bind(account.status.as_str())
        .bind(account.email_verified)
        .bind(account.phone_verified)
        .bind(Json(&account.preferences))
        .bind(Json(&account.addresses))
        .bind(account.permissions.as_ref().map(Json))
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_or_db(e, &format!("email {}", account.email)))?;
        Ok(())
    }

    async fn list_accounts_by_role(&self, roles: &[Role]) -> Result<Vec<Account>, StoreError> {
        let tags: Vec<String> = roles.iter().map(|r| r.as_str().to_string()).collect();
        let rows = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE role = ANY($1) ORDER BY created_at, id"
        ))
        .bind(tags)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Account::try_from).collect()
    }

    async fn update_password(
        &self,
        id: Uuid,
        password_hash: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result =
            sqlx::query("UPDATE accounts SET password_hash = $2, updated_at = $3 WHERE id = $1")
                .bind(id)
                .bind(password_hash)
                .bind(at)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_permissions(
        &self,
        id: Uuid,
        permissions: &PermissionMatrix,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result =
            sqlx::query("UPDATE accounts SET permissions = $2, updated_at = $3 WHERE id = $1")
                .bind(id)
                .bind(Json(permissions))
                .bind(at)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: AccountStatus,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE accounts SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_account(&self, id: Uuid) -> Result<bool, StoreError> {
        // Tickets go with the account via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_reset_ticket(&self, ticket: &ResetTicket) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO password_reset_tickets \
             (token_hash, account_id, email, created_at, expires_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&ticket.token_hash)
        .bind(ticket.account_id)
        .bind(&ticket.email)
        .bind(ticket.created_at)
        .bind(ticket.expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_or_db(e, "reset ticket"))?;
        Ok(())
    }

    async fn find_reset_ticket(&self, token_hash: &str) -> Result<Option<ResetTicket>, StoreError> {
        let row = sqlx::query_as::<_, TicketRow>(
            "SELECT token_hash, account_id, email, created_at, expires_at \
             FROM password_reset_tickets WHERE token_hash = $1",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(ticket_from_row))
    }

    async fn delete_reset_ticket(&self, token_hash: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM password_reset_tickets WHERE token_hash = $1")
            .bind(token_hash)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_reset_tickets_for_account(&self, account_id: Uuid) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM password_reset_tickets WHERE account_id = $1")
            .bind(account_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn consume_reset_ticket(
        &self,
        token_hash: &str,
        password_hash: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        // The conditional delete is the claim: a concurrent consumer blocks on
        // the row lock and then finds nothing to delete. Expired rows are
        // never claimed.
        let account_id = sqlx::query_scalar::<_, Uuid>(
            "DELETE FROM password_reset_tickets \
             WHERE token_hash = $1 AND expires_at > $2 \
             RETURNING account_id",
        )
        .bind(token_hash)
        .bind(at)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(account_id) = account_id else {
            tx.rollback().await?;
            return Ok(false);
        };

        let updated =
            sqlx::query("UPDATE accounts SET password_hash = $2, updated_at = $3 WHERE id = $1")
                .bind(account_id)
                .bind(password_hash)
                .bind(at)
                .execute(&mut *tx)
                .await?
                .rows_affected();

        if updated == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        tx.commit().await?;
        Ok(true)
    }
}
