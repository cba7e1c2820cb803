// ── Live player list parsing ──
//
// The player list command answers with one line per connected player:
//
//     0. Survivor, 76561198000000001
//     1. Name, With Comma, 76561198000000002, 12, 340
//
// i.e. `<index>. <name>, <id>[, <score>[, <seconds connected>]]`, or the
// literal "No Players Connected". Lines without the index prefix (such as
// "Server received, But no response!!") are skipped.

use std::time::Duration;

use crate::model::PlayerIdentity;

const NO_PLAYERS: &str = "No Players Connected";

/// One player as reported by the live query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LivePlayer {
    pub identity: PlayerIdentity,
    pub name: String,
    pub score: Option<i64>,
    pub connected_for: Option<Duration>,
}

pub fn parse_player_list(lines: &[String]) -> Vec<LivePlayer> {
    lines.iter().filter_map(|line| parse_line(line)).collect()
}

fn parse_line(line: &str) -> Option<LivePlayer> {
    let line = line.trim();
    if line.is_empty() || line.eq_ignore_ascii_case(NO_PLAYERS) {
        return None;
    }

    let (index, rest) = line.split_once('.')?;
    if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let parts: Vec<&str> = rest.split(',').map(str::trim).collect();
    if parts.len() < 2 {
        return None;
    }

    // Names may contain commas; the id is the first numeric field after one.
    let id_at = (1..parts.len())
        .find(|&i| parts.get(i).is_some_and(|p| p.parse::<u64>().is_ok()))
        .unwrap_or(1);

    let name = parts.get(..id_at).map(|name| name.join(", ")).unwrap_or_default();
    let identity = PlayerIdentity::parse(parts.get(id_at)?);
    let score = parts.get(id_at + 1).and_then(|s| s.parse().ok());
    let connected_for = parts
        .get(id_at + 2)
        .and_then(|s| s.parse().ok())
        .map(Duration::from_secs);

    Some(LivePlayer {
        identity,
        name,
        score,
        connected_for,
    })
}
