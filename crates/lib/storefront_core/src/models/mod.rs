//! Domain models.

pub mod auth;
pub mod permissions;

use thiserror::Error;

/// Failure to parse a stored or transmitted enum tag.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value:?}")]
pub struct ParseTagError {
    pub kind: &'static str,
    pub value: String,
}
