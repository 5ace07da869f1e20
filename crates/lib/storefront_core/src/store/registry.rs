//! Process-wide entity registry.
//!
//! Each persisted entity registers its schema at most once per process.
//! Concurrent callers for the same entity wait on the first registration
//! instead of repeating it; a failed registration leaves the entry
//! unregistered so a later caller can retry.

use std::future::Future;
use std::sync::{Arc, LazyLock};

use dashmap::DashMap;
use tokio::sync::OnceCell;

static REGISTRY: LazyLock<DashMap<&'static str, Arc<OnceCell<()>>>> = LazyLock::new(DashMap::new);

/// Schema definition for one persisted entity.
#[derive(Debug, Clone, Copy)]
pub struct EntitySchema {
    pub name: &'static str,
    /// Idempotent DDL (`CREATE ... IF NOT EXISTS`).
    pub ddl: &'static str,
}

/// Run `init` for `entity` unless it already ran successfully in this process.
///
/// Returns `true` if this call performed the registration.
pub async fn register_once<F, Fut, E>(entity: &'static str, init: F) -> Result<bool, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<(), E>>,
{
    let cell = REGISTRY
        .entry(entity)
        .or_insert_with(|| Arc::new(OnceCell::new()))
        .value()
        .clone();

    let mut performed = false;
    cell.get_or_try_init(|| {
        performed = true;
        init()
    })
    .await?;
    Ok(performed)
}

/// Whether `entity` has been registered in this process.
pub fn is_registered(entity: &str) -> bool {
    REGISTRY
        .get(entity)
        .is_some_and(|cell| cell.initialized())
}
