//! Capability permissions
//!
//! A permission grants one action on one resource for a set of identities
//! (addresses, recovery phrase ids or session ids). `"*"` is the wildcard
//! for all three positions. Permission sets are built once with
//! [`PermissionsBuilder`] and never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Wildcard identity
pub const ANY_IDENTITY: &str = "*";

/// Protected resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionResource {
    /// Accounts, keyed by address
    Account,
    /// Transactions and signatures, keyed by sender address
    Transaction,
    /// Sessions, keyed by session id
    Session,
    /// Recovery phrases, keyed by phrase id
    Seed,
    /// Every resource
    #[serde(rename = "*")]
    Any,
}

/// Action on a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionAction {
    /// Create
    Create,
    /// Read
    Read,
    /// Update
    Update,
    /// Delete
    Delete,
    /// Send or sign
    Send,
    /// Revoke
    Revoke,
    /// List
    List,
    /// Every action
    #[serde(rename = "*")]
    Any,
}

impl fmt::Display for PermissionResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Account => "account",
            Self::Transaction => "transaction",
            Self::Session => "session",
            Self::Seed => "seed",
            Self::Any => "*",
        };
        f.write_str(s)
    }
}

impl fmt::Display for PermissionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Send => "send",
            Self::Revoke => "revoke",
            Self::List => "list",
            Self::Any => "*",
        };
        f.write_str(s)
    }
}

/// One grant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    /// Resource
    pub resource: PermissionResource,
    /// Action
    pub action: PermissionAction,
    /// Identities covered, or `["*"]`
    pub identities: Vec<String>,
}

impl Permission {
    /// Whether the grant covers `action` on `resource` for every id in `ids`
    pub fn allows(
        &self,
        resource: PermissionResource,
        action: PermissionAction,
        ids: &[String],
    ) -> bool {
        let resource_ok = self.resource == PermissionResource::Any || self.resource == resource;
        let action_ok = self.action == PermissionAction::Any || self.action == action;
        if !(resource_ok && action_ok) {
            return false;
        }
        self.is_wildcard() || ids.iter().all(|id| self.identities.iter().any(|g| g == id))
    }

    /// Identity set is the wildcard
    pub fn is_wildcard(&self) -> bool {
        self.identities.iter().any(|id| id == ANY_IDENTITY)
    }
}

/// Immutable ordered permission set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permissions(Vec<Permission>);

impl Permissions {
    /// Whether any grant allows the request
    pub fn is_allowed(
        &self,
        resource: PermissionResource,
        action: PermissionAction,
        ids: &[String],
    ) -> bool {
        self.0.iter().any(|p| p.allows(resource, action, ids))
    }

    /// Copy with an extra grant appended
    pub fn with(&self, permission: Permission) -> Self {
        let mut grants = self.0.clone();
        grants.push(permission);
        Self(grants)
    }

    /// Grants in order
    pub fn iter(&self) -> impl Iterator<Item = &Permission> {
        self.0.iter()
    }

    /// Number of grants
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// No grants at all
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Permission>> for Permissions {
    fn from(grants: Vec<Permission>) -> Self {
        Self(grants)
    }
}

/// Fluent permission builder.
///
/// ```
/// use teller_core::permission::{PermissionsBuilder, PermissionResource, PermissionAction};
///
/// let permissions = PermissionsBuilder::new()
///     .for_resource(PermissionResource::Account)
///     .allow(PermissionAction::Read)
///     .on(["addr-1"])
///     .for_resource(PermissionResource::Transaction)
///     .allow(PermissionAction::Send)
///     .on(["addr-1"])
///     .build();
///
/// assert!(permissions.is_allowed(
///     PermissionResource::Account,
///     PermissionAction::Read,
///     &["addr-1".to_string()],
/// ));
/// ```
#[derive(Debug, Clone, Default)]
pub struct PermissionsBuilder {
    grants: Vec<Permission>,
    resource: Option<PermissionResource>,
    actions: Vec<PermissionAction>,
}

impl PermissionsBuilder {
    /// Empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the resource for the following `allow` calls
    pub fn for_resource(mut self, resource: PermissionResource) -> Self {
        self.resource = Some(resource);
        self.actions.clear();
        self
    }

    /// Add an action for the selected resource
    pub fn allow(mut self, action: PermissionAction) -> Self {
        if !self.actions.contains(&action) {
            self.actions.push(action);
        }
        self
    }

    /// Every action on every resource
    pub fn allow_everything(self) -> Self {
        self.for_resource(PermissionResource::Any)
            .allow(PermissionAction::Any)
    }

    /// Close the pending actions over `ids`
    pub fn on<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let identities: Vec<String> = ids.into_iter().map(Into::into).collect();
        let resource = self.resource.unwrap_or(PermissionResource::Any);
        for action in self.actions.drain(..) {
            self.grants.push(Permission {
                resource,
                action,
                identities: identities.clone(),
            });
        }
        self
    }

    /// Close the pending actions over every identity
    pub fn on_any(self) -> Self {
        self.on([ANY_IDENTITY])
    }

    /// Finish
    pub fn build(self) -> Permissions {
        Permissions(self.grants)
    }
}
