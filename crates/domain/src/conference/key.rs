use common::AggregateId;
use serde::{Deserialize, Serialize};

/// Opaque key callers use to name a conference.
///
/// The string form is the canonical hyphenated UUID of the conference
/// record. Keys compare by value, so any spelling that parses to the same
/// UUID is the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConferenceKey(AggregateId);

impl ConferenceKey {
    /// Parses a caller-supplied key. Malformed input yields `None`.
    pub fn parse(value: &str) -> Option<Self> {
        AggregateId::parse(value).map(Self)
    }

    pub fn from_record_id(id: AggregateId) -> Self {
        Self(id)
    }

    /// Identity of the conference record this key names.
    pub fn record_id(&self) -> AggregateId {
        self.0
    }
}

impl std::fmt::Display for ConferenceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<AggregateId> for ConferenceKey {
    fn from(id: AggregateId) -> Self {
        Self(id)
    }
}
