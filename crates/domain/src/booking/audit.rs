use std::collections::HashMap;

use entity_store::EntityStore;

use crate::aggregate::Aggregate;
use crate::conference::{Conference, ConferenceKey};
use crate::error::DomainError;
use crate::profile::Profile;
use crate::repository::load_record;

/// A conference whose seat count disagrees with the profiles holding seats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatViolation {
    pub conference_key: ConferenceKey,

    /// `0` when profiles name a conference that doesn't exist.
    pub max_attendees: u32,
    pub seats_available: u32,

    /// Profiles listing this conference.
    pub holders: u32,
}

/// Result of [`audit_seat_consistency`].
#[derive(Debug, Clone, Default)]
pub struct SeatAudit {
    pub conferences_checked: usize,
    pub profiles_checked: usize,
    pub violations: Vec<SeatViolation>,
}

impl SeatAudit {
    pub fn is_consistent(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Checks that every conference satisfies
/// `seats_available + holders == max_attendees`.
///
/// Records are read one at a time, so run this against a quiescent store.
#[tracing::instrument(skip(store))]
pub async fn audit_seat_consistency<S>(store: &S) -> Result<SeatAudit, DomainError>
where
    S: EntityStore + ?Sized,
{
    let mut holders: HashMap<ConferenceKey, u32> = HashMap::new();
    let profile_ids = store.list_records(Profile::aggregate_type()).await?;
    for id in &profile_ids {
        let profile: Profile = load_record(store, *id).await?;
        for key in profile.conference_keys_to_attend() {
            *holders.entry(*key).or_default() += 1;
        }
    }

    let mut audit = SeatAudit {
        profiles_checked: profile_ids.len(),
        ..SeatAudit::default()
    };

    for id in store.list_records(Conference::aggregate_type()).await? {
        let conference: Conference = load_record(store, id).await?;
        let key = ConferenceKey::from_record_id(id);
        let held = holders.remove(&key).unwrap_or(0);
        audit.conferences_checked += 1;

        if conference.seats_available() + held != conference.max_attendees() {
            audit.violations.push(SeatViolation {
                conference_key: key,
                max_attendees: conference.max_attendees(),
                seats_available: conference.seats_available(),
                holders: held,
            });
        }
    }

    // Whatever is left names conferences that were never created.
    let mut dangling: Vec<_> = holders.into_iter().collect();
    dangling.sort();
    for (conference_key, held) in dangling {
        audit.violations.push(SeatViolation {
            conference_key,
            max_attendees: 0,
            seats_available: 0,
            holders: held,
        });
    }

    if !audit.is_consistent() {
        tracing::warn!(violations = audit.violations.len(), "seat counts out of sync");
    }

    Ok(audit)
}
