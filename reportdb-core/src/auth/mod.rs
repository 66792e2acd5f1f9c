use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::config::PermissionConfig;
use crate::errors::{CoreError, CoreResult};

pub const ANONYMOUS_USER: &str = "Anonymous";

/// Product-level permissions. Each one implies every weaker one.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum Permission {
    #[serde(rename = "PRODUCT_ACCESS")]
    Access,
    #[serde(rename = "PRODUCT_STORE")]
    Store,
    #[serde(rename = "PRODUCT_ADMIN")]
    Admin,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::Access => "PRODUCT_ACCESS",
            Permission::Store => "PRODUCT_STORE",
            Permission::Admin => "PRODUCT_ADMIN",
        }
    }

    pub fn implies(&self, other: Permission) -> bool {
        *self >= other
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Actor {
    username: Option<String>,
    permissions: BTreeSet<Permission>,
    is_system: bool,
}

impl Actor {
    pub fn user(username: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            permissions: BTreeSet::new(),
            is_system: false,
        }
    }

    pub fn anonymous() -> Self {
        Self {
            username: None,
            permissions: BTreeSet::new(),
            is_system: false,
        }
    }

    pub fn system() -> Self {
        Self {
            username: None,
            permissions: BTreeSet::from([Permission::Admin]),
            is_system: true,
        }
    }

    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.permissions.insert(permission);
        self
    }

    pub fn with_permissions(mut self, permissions: impl IntoIterator<Item = Permission>) -> Self {
        self.permissions.extend(permissions);
        self
    }

    /// Name recorded as author or lock holder.
    pub fn username(&self) -> &str {
        self.username.as_deref().unwrap_or(ANONYMOUS_USER)
    }

    pub fn is_authenticated(&self) -> bool {
        self.username.is_some()
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.is_system || self.permissions.iter().any(|p| p.implies(permission))
    }

    pub fn is_system(&self) -> bool {
        self.is_system
    }
}

/// Build the actor for a request from the configured grants.
pub fn resolve_actor(config: &PermissionConfig, username: Option<&str>) -> Actor {
    match username.map(str::trim).filter(|name| !name.is_empty()) {
        Some(name) => {
            let granted = config.users.get(name).cloned().unwrap_or_default();
            Actor::user(name).with_permissions(granted)
        }
        None => Actor::anonymous().with_permissions(config.anonymous.iter().copied()),
    }
}

pub trait Authorizer: Send + Sync {
    fn authorize(&self, actor: &Actor, permission: Permission) -> CoreResult<()>;
}

pub struct AllowAllAuthorizer;

impl Authorizer for AllowAllAuthorizer {
    fn authorize(&self, _actor: &Actor, _permission: Permission) -> CoreResult<()> {
        Ok(())
    }
}

/// Checks the permissions the actor was resolved with.
pub struct GrantAuthorizer;

impl Authorizer for GrantAuthorizer {
    fn authorize(&self, actor: &Actor, permission: Permission) -> CoreResult<()> {
        if actor.has_permission(permission) {
            Ok(())
        } else {
            Err(CoreError::unauthorized(format!(
                "You are not authorized to execute this action. {} permission is required.",
                permission.as_str()
            ))
            .with_field("permission", permission.as_str())
            .with_field("user", actor.username()))
        }
    }
}
