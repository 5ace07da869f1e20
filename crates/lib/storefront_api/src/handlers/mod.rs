//! Request handlers.

pub mod admin;
pub mod auth;
pub mod health;
pub mod password_reset;

use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Parse a path id.
pub(crate) fn parse_id(raw: &str) -> AppResult<Uuid> {
    raw.parse()
        .map_err(|_| AppError::Validation(format!("Invalid id: {raw}")))
}
