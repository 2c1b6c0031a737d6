//! Sessions: time-boxed, permission-scoped grants
//!
//! Created → Active on unlock or external authorization, Active → Invalid on
//! revocation or expiry. Invalid is terminal. Expiry is evaluated lazily
//! whenever a session is checked.

use crate::account::AccountReference;
use crate::permission::{Permission, PermissionAction, PermissionResource, Permissions};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use teller_params::SupportedProtocol;

/// Capability grant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    id: String,
    permissions: Permissions,
    created_at: DateTime<Utc>,
    last_activity_at: DateTime<Utc>,
    #[serde(rename = "maxAgeMs", with = "max_age_ms")]
    max_age: Option<Duration>,
    origin: Option<String>,
    protocol: Option<SupportedProtocol>,
    accounts: Vec<AccountReference>,
    #[serde(default)]
    invalidated: bool,
}

impl Session {
    /// Local session minted by unlocking the vault
    pub fn local(permissions: Permissions, max_age: Option<Duration>) -> Self {
        Self::create(permissions, max_age, None, None, Vec::new())
    }

    /// Scoped session for a remote origin.
    ///
    /// The session is granted the right to revoke itself.
    pub fn external(
        permissions: Permissions,
        max_age: Option<Duration>,
        origin: impl Into<String>,
        protocol: Option<SupportedProtocol>,
        accounts: Vec<AccountReference>,
    ) -> Self {
        let mut session = Self::create(
            permissions,
            max_age,
            Some(origin.into()),
            protocol,
            accounts,
        );
        session.permissions = session.permissions.with(Permission {
            resource: PermissionResource::Session,
            action: PermissionAction::Revoke,
            identities: vec![session.id.clone()],
        });
        session
    }

    fn create(
        permissions: Permissions,
        max_age: Option<Duration>,
        origin: Option<String>,
        protocol: Option<SupportedProtocol>,
        accounts: Vec<AccountReference>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            permissions,
            created_at: now,
            last_activity_at: now,
            max_age,
            origin,
            protocol,
            accounts,
            invalidated: false,
        }
    }

    /// Session id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Granted permissions
    pub fn permissions(&self) -> &Permissions {
        &self.permissions
    }

    /// Creation time
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Last authorized access
    pub fn last_activity_at(&self) -> DateTime<Utc> {
        self.last_activity_at
    }

    /// Maximum lifetime measured from creation
    pub fn max_age(&self) -> Option<Duration> {
        self.max_age
    }

    /// Remote origin for external sessions
    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    /// Protocol an external session was authorized for
    pub fn protocol(&self) -> Option<SupportedProtocol> {
        self.protocol
    }

    /// Accounts exposed to the session
    pub fn accounts(&self) -> &[AccountReference] {
        &self.accounts
    }

    /// Valid now
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    /// Not revoked and younger than `max_age` at `now`
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        if self.invalidated {
            return false;
        }
        match self.max_age {
            Some(max_age) => now - self.created_at < max_age,
            None => true,
        }
    }

    /// Permission check
    pub fn is_allowed(
        &self,
        resource: PermissionResource,
        action: PermissionAction,
        ids: &[String],
    ) -> bool {
        self.permissions.is_allowed(resource, action, ids)
    }

    /// Refresh the activity timestamp
    pub fn touch(&mut self) {
        self.last_activity_at = Utc::now();
    }

    /// Revoke. Irreversible.
    pub fn invalidate(&mut self) {
        self.invalidated = true;
    }

    /// Drop an account from the exposed set; true if it was present
    pub fn remove_account(&mut self, account_id: &str) -> bool {
        let before = self.accounts.len();
        self.accounts.retain(|a| a.id != account_id);
        before != self.accounts.len()
    }
}

mod max_age_ms {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&d.num_milliseconds()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<i64>::deserialize(d)?.map(Duration::milliseconds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::PermissionsBuilder;

    fn all() -> Permissions {
        PermissionsBuilder::new().allow_everything().on_any().build()
    }

    #[test]
    fn test_session_without_max_age_never_expires() {
        let session = Session::local(all(), None);
        let far_future = Utc::now() + Duration::days(3650);
        assert!(session.is_valid_at(far_future));
    }

    #[test]
    fn test_session_expires_after_max_age() {
        let session = Session::local(all(), Some(Duration::minutes(5)));
        assert!(session.is_valid_at(session.created_at() + Duration::minutes(4)));
        assert!(!session.is_valid_at(session.created_at() + Duration::minutes(5)));
    }

    #[test]
    fn test_zero_max_age_is_immediately_invalid() {
        let session = Session::local(all(), Some(Duration::zero()));
        assert!(!session.is_valid());
    }

    #[test]
    fn test_touch_does_not_extend_lifetime() {
        let mut session = Session::local(all(), Some(Duration::minutes(1)));
        let created = session.created_at();
        session.touch();
        assert!(session.last_activity_at() >= created);
        assert!(!session.is_valid_at(created + Duration::minutes(2)));
    }

    #[test]
    fn test_invalidate_is_terminal() {
        let mut session = Session::local(all(), None);
        session.invalidate();
        session.touch();
        assert!(!session.is_valid());
    }

    #[test]
    fn test_external_session_can_revoke_itself_only() {
        let perms = PermissionsBuilder::new()
            .for_resource(PermissionResource::Account)
            .allow(PermissionAction::Read)
            .on(["A"])
            .build();
        let session = Session::external(perms, None, "https://dapp.example", None, Vec::new());

        assert!(session.is_allowed(
            PermissionResource::Session,
            PermissionAction::Revoke,
            &[session.id().to_string()]
        ));
        assert!(!session.is_allowed(
            PermissionResource::Session,
            PermissionAction::Revoke,
            &["someone-else".to_string()]
        ));
        assert_eq!(session.origin(), Some("https://dapp.example"));
    }

    #[test]
    fn test_serde_round_trip_keeps_max_age() {
        let session = Session::local(all(), Some(Duration::milliseconds(90_000)));
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["maxAgeMs"], 90_000);
        let back: Session = serde_json::from_value(json).unwrap();
        assert_eq!(back, session);
    }
}
