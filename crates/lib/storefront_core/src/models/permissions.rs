//! Permission matrix types.
//!
//! A matrix maps each administrative resource to the actions granted on it.
//! Its JSON form is a nested object, e.g.
//! `{"products": {"view": true, "create": true}, "orders": {"view": true}}`.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Administrative resources guarded by the permission model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Resource {
    Dashboard,
    Users,
    Products,
    Orders,
    Categories,
    PromoCodes,
    Subscriptions,
    Messages,
    Stats,
    Admins,
}

impl Resource {
    pub const ALL: [Resource; 10] = [
        Resource::Dashboard,
        Resource::Users,
        Resource::Products,
        Resource::Orders,
        Resource::Categories,
        Resource::PromoCodes,
        Resource::Subscriptions,
        Resource::Messages,
        Resource::Stats,
        Resource::Admins,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Dashboard => "dashboard",
            Resource::Users => "users",
            Resource::Products => "products",
            Resource::Orders => "orders",
            Resource::Categories => "categories",
            Resource::PromoCodes => "promoCodes",
            Resource::Subscriptions => "subscriptions",
            Resource::Messages => "messages",
            Resource::Stats => "stats",
            Resource::Admins => "admins",
        }
    }

    /// Actions that are meaningful for this resource.
    pub fn actions(&self) -> &'static [Action] {
        use Action::*;
        match self {
            Resource::Dashboard => &[View],
            Resource::Stats => &[View, Export],
            Resource::Messages => &[View, Update, Delete],
            Resource::Subscriptions => &[View, Delete, Export],
            Resource::Users | Resource::Orders => &[View, Create, Update, Delete, Export],
            Resource::Products | Resource::Categories | Resource::PromoCodes | Resource::Admins => {
                &[View, Create, Update, Delete]
            }
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operations a grant can allow on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    View,
    Create,
    Update,
    Delete,
    Export,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::View,
        Action::Create,
        Action::Update,
        Action::Delete,
        Action::Export,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::View => "view",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Export => "export",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resource → action → granted. Absent entries are denials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionMatrix(BTreeMap<Resource, BTreeMap<Action, bool>>);

impl PermissionMatrix {
    /// An empty matrix; denies everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style grant of several actions on one resource.
    pub fn with(mut self, resource: Resource, actions: &[Action]) -> Self {
        for action in actions {
            self.set(resource, *action, true);
        }
        self
    }

    pub fn set(&mut self, resource: Resource, action: Action, granted: bool) {
        self.0.entry(resource).or_default().insert(action, granted);
    }

    /// Drop every entry for `resource`.
    pub fn clear(&mut self, resource: Resource) {
        self.0.remove(&resource);
    }

    pub fn allows(&self, resource: Resource, action: Action) -> bool {
        self.0
            .get(&resource)
            .and_then(|grants| grants.get(&action))
            .copied()
            .unwrap_or(false)
    }

    /// Whether any action on `resource` is granted.
    pub fn grants_any(&self, resource: Resource) -> bool {
        self.0
            .get(&resource)
            .is_some_and(|grants| grants.values().any(|granted| *granted))
    }

    /// Every granted `(resource, action)` pair, in a stable order.
    pub fn granted(&self) -> impl Iterator<Item = (Resource, Action)> + '_ {
        self.0.iter().flat_map(|(resource, grants)| {
            grants
                .iter()
                .filter(|(_, granted)| **granted)
                .map(move |(action, _)| (*resource, *action))
        })
    }
}
