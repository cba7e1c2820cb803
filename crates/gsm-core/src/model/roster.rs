// ── Roster collection ──
//
// Immutable once built. The roster poller builds a fresh `Roster` every
// cycle and publishes it whole; nothing edits a published roster.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;

use super::identity::PlayerIdentity;
use super::player::PlayerRecord;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Roster {
    players: IndexMap<PlayerIdentity, PlayerRecord>,
    built_at: Option<DateTime<Utc>>,
}

impl Roster {
    /// Build a roster from records in display order. A later record with an
    /// identity already present replaces the earlier one in place.
    pub fn from_records(records: impl IntoIterator<Item = PlayerRecord>) -> Self {
        let players = records
            .into_iter()
            .map(|record| (record.identity.clone(), record))
            .collect();
        Self {
            players,
            built_at: Some(Utc::now()),
        }
    }

    pub fn get(&self, identity: &PlayerIdentity) -> Option<&PlayerRecord> {
        self.players.get(identity)
    }

    pub fn contains(&self, identity: &PlayerIdentity) -> bool {
        self.players.contains_key(identity)
    }

    /// Records in display order.
    pub fn players(&self) -> impl Iterator<Item = &PlayerRecord> {
        self.players.values()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn online_count(&self) -> usize {
        self.players.values().filter(|p| p.online).count()
    }

    /// When this roster was built; `None` for the initial empty roster.
    pub fn built_at(&self) -> Option<DateTime<Utc>> {
        self.built_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_duplicate_replaces_earlier() {
        let mut first = PlayerRecord::new(PlayerIdentity::Steam(1));
        first.name = "old".into();
        let mut second = PlayerRecord::new(PlayerIdentity::Steam(1));
        second.name = "new".into();
        second.online = true;

        let roster = Roster::from_records([first, second, PlayerRecord::new(2u64.into())]);
        assert_eq!(roster.len(), 2);
        assert_eq!(roster.get(&1u64.into()).map(|p| p.name.as_str()), Some("new"));
        assert_eq!(roster.online_count(), 1);
        assert!(roster.built_at().is_some());
    }

    #[test]
    fn default_roster_is_empty_and_unbuilt() {
        let roster = Roster::default();
        assert!(roster.is_empty());
        assert!(roster.built_at().is_none());
    }
}
