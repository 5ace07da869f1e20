//! Response-side helpers shared by handlers.

pub mod cookies;
