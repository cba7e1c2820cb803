// ── Roster merge ──
//
// Pure reconciliation of one cycle's inputs against the previous roster.
// Identity is the merge key: a saved profile and a live entry with the same
// identity become one record.

use std::collections::{HashMap, HashSet};

use crate::model::{CORRUPTED_PROFILE_NAME, PlayerIdentity, PlayerRecord, Roster, Validity};
use crate::savedata::SavedProfile;

use super::live::LivePlayer;

/// Build the next cycle's records in display order.
///
/// `live` is `None` when the player query failed this cycle. Online flags
/// are then carried over from `previous` rather than cleared, and players
/// that were online without a saved profile are kept.
pub(crate) fn merge(
    previous: &Roster,
    live: Option<&[LivePlayer]>,
    saved: &[SavedProfile],
) -> Vec<PlayerRecord> {
    let live_by_id: HashMap<&PlayerIdentity, &LivePlayer> = live
        .unwrap_or_default()
        .iter()
        .map(|player| (&player.identity, player))
        .collect();

    let mut seen = HashSet::new();
    let mut records = Vec::with_capacity(saved.len() + live_by_id.len());

    for entry in saved {
        let identity = PlayerIdentity::parse(&entry.raw_identity);
        if !seen.insert(identity.clone()) {
            continue;
        }
        let mut record = previous
            .get(&identity)
            .cloned()
            .unwrap_or_else(|| PlayerRecord::new(identity.clone()));

        record.profile = entry.profile.clone();
        record.profile.file = Some(entry.path.clone());
        record.profile.last_saved = entry.modified;

        let live_entry = live_by_id.get(&identity).copied();
        if identity.is_parsed() {
            record.validity = Validity::Valid;
            if let Some(name) = live_entry
                .map(|p| p.name.as_str())
                .filter(|name| !name.is_empty())
                .or(entry.profile.player_name.as_deref())
            {
                name.clone_into(&mut record.name);
            }
        } else {
            record.validity = Validity::Invalid;
            CORRUPTED_PROFILE_NAME.clone_into(&mut record.name);
        }

        apply_live(&mut record, live_entry, live.is_some());
        records.push(record);
    }

    // Live-only players keep their prior profile data and validity.
    for player in live.unwrap_or_default() {
        if !seen.insert(player.identity.clone()) {
            continue;
        }
        let mut record = previous
            .get(&player.identity)
            .cloned()
            .unwrap_or_else(|| PlayerRecord::new(player.identity.clone()));
        if !player.name.is_empty() && record.validity != Validity::Invalid {
            player.name.clone_into(&mut record.name);
        }
        apply_live(&mut record, Some(player), true);
        records.push(record);
    }

    // Without a live answer, players last seen online stay visible.
    if live.is_none() {
        for record in previous.players() {
            if record.online && seen.insert(record.identity.clone()) {
                records.push(record.clone());
            }
        }
    }

    records.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.identity.cmp(&b.identity))
    });
    records
}

fn apply_live(record: &mut PlayerRecord, entry: Option<&LivePlayer>, live_known: bool) {
    match entry {
        Some(player) => {
            record.online = true;
            record.score = player.score;
            record.connected_for = player.connected_for;
        }
        None if live_known => {
            record.online = false;
            record.score = None;
            record.connected_for = None;
        }
        None => {}
    }
}
