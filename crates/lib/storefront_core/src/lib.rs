//! # storefront_core
//!
//! Authentication and authorization core for the storefront: credential
//! hashing, session tokens, password-reset tickets, the administrative
//! permission model and the persistence seam they share.

pub mod auth;
pub mod clock;
pub mod models;
pub mod notify;
pub mod settings;
pub mod store;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
