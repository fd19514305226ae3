use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Identity of one record in the entity store.
///
/// Conferences get random identities. Profiles get name-based identities
/// derived from the owning user, so a user always maps to the same record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregateId(Uuid);

impl AggregateId {
    /// Creates a new random record identity.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Derives a stable identity for `name` within `namespace` (UUIDv5).
    pub fn from_name(namespace: &Uuid, name: &str) -> Self {
        Self(Uuid::new_v5(namespace, name.as_bytes()))
    }

    /// Parses the canonical string form, returning `None` when malformed.
    pub fn parse(value: &str) -> Option<Self> {
        Uuid::parse_str(value.trim()).ok().map(Self)
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for AggregateId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AggregateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for AggregateId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<AggregateId> for Uuid {
    fn from(id: AggregateId) -> Self {
        id.0
    }
}

/// Error returned when a user identifier is blank.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("user id must not be blank")]
pub struct InvalidUserId;

/// Durable identifier of an authenticated user, as issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Creates a user id, rejecting blank values.
    pub fn new(id: impl Into<String>) -> Result<Self, InvalidUserId> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(InvalidUserId);
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_id_new_creates_unique_ids() {
        let id1 = AggregateId::new();
        let id2 = AggregateId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn aggregate_id_from_name_is_stable() {
        let namespace = Uuid::new_v4();
        let a = AggregateId::from_name(&namespace, "user-1");
        let b = AggregateId::from_name(&namespace, "user-1");
        let c = AggregateId::from_name(&namespace, "user-2");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn aggregate_id_parse_accepts_canonical_and_uppercase() {
        let id = AggregateId::new();
        assert_eq!(AggregateId::parse(&id.to_string()), Some(id));
        assert_eq!(AggregateId::parse(&id.to_string().to_uppercase()), Some(id));
    }

    #[test]
    fn aggregate_id_parse_rejects_garbage() {
        assert_eq!(AggregateId::parse("nonexistent-key"), None);
        assert_eq!(AggregateId::parse(""), None);
    }

    #[test]
    fn aggregate_id_serializes_as_plain_uuid() {
        let id = AggregateId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
    }

    #[test]
    fn user_id_rejects_blank() {
        assert_eq!(UserId::new(""), Err(InvalidUserId));
        assert_eq!(UserId::new("   "), Err(InvalidUserId));
        assert_eq!(InvalidUserId.to_string(), "user id must not be blank");
        assert_eq!(UserId::new("1234").unwrap().as_str(), "1234");
    }
}
