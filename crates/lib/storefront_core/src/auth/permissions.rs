//! Role-based permission evaluation.
//!
//! Every check goes through [`has_permission`]: the super-admin passes
//! unconditionally, `admins` is never granted to anyone else, staff and admin
//! accounts are judged by their effective matrix, and customers are denied.

use serde::Serialize;

use super::AuthError;
use crate::models::auth::{Principal, Role};
use crate::models::permissions::{Action, PermissionMatrix, Resource};

// =============================================================================
// Matrices
// =============================================================================

/// Matrix assigned to a newly created account of `role`.
pub fn default_permissions(role: Role) -> PermissionMatrix {
    use Action::*;
    match role {
        Role::Customer => PermissionMatrix::new(),
        Role::Staff => PermissionMatrix::new()
            .with(Resource::Dashboard, &[View])
            .with(Resource::Users, &[View])
            .with(Resource::Products, &[View])
            .with(Resource::Categories, &[View])
            .with(Resource::PromoCodes, &[View])
            .with(Resource::Orders, &[View, Update])
            .with(Resource::Messages, &[View, Update])
            .with(Resource::Subscriptions, &[View]),
        Role::Admin => Resource::ALL
            .iter()
            .filter(|resource| **resource != Resource::Admins)
            .fold(PermissionMatrix::new(), |matrix, resource| {
                matrix.with(*resource, resource.actions())
            }),
        Role::SuperAdmin => super_admin_permissions(),
    }
}

/// Every action on every resource.
pub fn super_admin_permissions() -> PermissionMatrix {
    Resource::ALL
        .iter()
        .fold(PermissionMatrix::new(), |matrix, resource| {
            matrix.with(*resource, &Action::ALL)
        })
}

/// Matrix actually in force for an account of `role` with `stored` grants.
///
/// Staff and admin accounts without a stored matrix fall back to their role
/// default. `admins` entries are dropped for everyone but the super-admin.
pub fn effective_permissions(role: Role, stored: Option<&PermissionMatrix>) -> PermissionMatrix {
    match role {
        Role::SuperAdmin => super_admin_permissions(),
        Role::Staff | Role::Admin => {
            let mut matrix = stored
                .cloned()
                .unwrap_or_else(|| default_permissions(role));
            matrix.clear(Resource::Admins);
            matrix
        }
        Role::Customer => PermissionMatrix::new(),
    }
}

// =============================================================================
// Checks
// =============================================================================

/// Whether `principal` may perform `action` on `resource`.
pub fn has_permission(principal: &Principal, resource: Resource, action: Action) -> bool {
    match (principal.role, resource) {
        (Role::SuperAdmin, _) => true,
        (_, Resource::Admins) => false,
        (Role::Staff | Role::Admin, _) => principal.permissions.allows(resource, action),
        (Role::Customer, _) => false,
    }
}

/// [`has_permission`] as a `Result`.
pub fn ensure_permission(
    principal: &Principal,
    resource: Resource,
    action: Action,
) -> Result<(), AuthError> {
    if has_permission(principal, resource, action) {
        Ok(())
    } else {
        Err(AuthError::Forbidden("Insufficient permissions".into()))
    }
}

// =============================================================================
// UI routes
// =============================================================================

/// Admin UI route for each resource.
pub fn route_for(resource: Resource) -> &'static str {
    match resource {
        Resource::Dashboard => "/admin/dashboard",
        Resource::Users => "/admin/users",
        Resource::Products => "/admin/products",
        Resource::Orders => "/admin/orders",
        Resource::Categories => "/admin/categories",
        Resource::PromoCodes => "/admin/promo-codes",
        Resource::Subscriptions => "/admin/subscriptions",
        Resource::Messages => "/admin/messages",
        Resource::Stats => "/admin/stats",
        Resource::Admins => "/admin/admins",
    }
}

/// Resource guarding an admin UI path, if any.
///
/// `/admin` alone maps to the dashboard; query strings and fragments are
/// ignored. Unknown sections map to `None`.
pub fn resource_for_path(path: &str) -> Option<Resource> {
    let path = path
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .trim_matches('/');
    let mut segments = path.split('/').filter(|s| !s.is_empty()).peekable();
    if segments.peek() == Some(&"admin") {
        segments.next();
    }
    let Some(section) = segments.next() else {
        return Some(Resource::Dashboard);
    };
    match section.to_ascii_lowercase().as_str() {
        "dashboard" => Some(Resource::Dashboard),
        "users" | "customers" => Some(Resource::Users),
        "products" => Some(Resource::Products),
        "orders" => Some(Resource::Orders),
        "categories" => Some(Resource::Categories),
        "promo-codes" | "promocodes" => Some(Resource::PromoCodes),
        "subscriptions" | "newsletter" => Some(Resource::Subscriptions),
        "messages" => Some(Resource::Messages),
        "stats" | "analytics" => Some(Resource::Stats),
        "admins" => Some(Resource::Admins),
        _ => None,
    }
}

/// Whether `principal` may open the admin UI page at `path` (needs `view`).
pub fn can_access_route(principal: &Principal, path: &str) -> bool {
    resource_for_path(path)
        .is_some_and(|resource| has_permission(principal, resource, Action::View))
}

/// First admin UI route `principal` can view, in resource order.
pub fn first_accessible_route(principal: &Principal) -> Option<&'static str> {
    Resource::ALL
        .iter()
        .find(|resource| has_permission(principal, **resource, Action::View))
        .map(|resource| route_for(*resource))
}

/// UI gate answer: allowed, or where to send the caller instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteAccess {
    pub allowed: bool,
    pub redirect: Option<&'static str>,
}

pub fn route_access(principal: &Principal, path: &str) -> RouteAccess {
    if can_access_route(principal, path) {
        RouteAccess {
            allowed: true,
            redirect: None,
        }
    } else {
        RouteAccess {
            allowed: false,
            redirect: first_accessible_route(principal),
        }
    }
}
