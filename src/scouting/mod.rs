//! Crowd-sourced scouting submissions.
//!
//! One record per (event, team) holds at most one pit entry and one match
//! entry per match key. Resubmitting for the same match replaces the prior
//! entry wholesale, so the latest submission always wins and double-taps
//! never duplicate.

use std::sync::Arc;

use tracing::debug;

use crate::models::{MatchScouting, PitScouting, ScoutingRecord};
use crate::store::ScoutingCollection;

pub struct ScoutingStore {
    collection: Arc<dyn ScoutingCollection>,
}

impl ScoutingStore {
    pub fn new(collection: Arc<dyn ScoutingCollection>) -> ScoutingStore {
        ScoutingStore { collection }
    }

    /// Store a match scouting entry. Returns `true` when the entry was
    /// written, whether that replaced an existing entry for the match or
    /// added a new one; the submitter is acknowledged either way.
    pub fn upsert_match(&self, entry: MatchScouting) -> bool {
        if self.collection.update_match_entry(&entry) {
            debug!(
                event_key = %entry.event_key,
                team_key = %entry.team_key,
                match_key = %entry.match_key,
                "Replaced match scouting entry"
            );
            return true;
        }
        self.collection.push_match_entry(&entry);
        debug!(
            event_key = %entry.event_key,
            team_key = %entry.team_key,
            match_key = %entry.match_key,
            "Added match scouting entry"
        );
        true
    }

    /// Store a pit scouting entry, replacing any prior one for the team.
    /// Returns `true` when the payload was written, the acknowledgment an
    /// outbound-notification layer keys on.
    pub fn upsert_pit(&self, pit: PitScouting) -> bool {
        let changed = self.collection.set_pit(&pit);
        debug!(
            event_key = %pit.event_key,
            team_key = %pit.team_key,
            changed,
            "Stored pit scouting entry"
        );
        changed
    }

    /// All scouting records for an event, ordered by team key.
    pub fn event_records(&self, event_key: &str) -> Vec<ScoutingRecord> {
        self.collection.find_event(event_key)
    }

    /// The stored match entry for one team in one match, if any.
    pub fn match_entry(&self, event_key: &str, team_key: &str, match_key: &str) -> Option<MatchScouting> {
        self.collection
            .find_team(event_key, team_key)
            .and_then(|r| r.matches.into_iter().find(|m| m.match_key == match_key))
    }

    /// The stored pit entry for one team, if any.
    pub fn pit(&self, event_key: &str, team_key: &str) -> Option<PitScouting> {
        self.collection.find_team(event_key, team_key).and_then(|r| r.pit)
    }

    /// Team keys with a pit entry at an event, in team key order.
    pub fn pit_teams(&self, event_key: &str) -> Vec<String> {
        self.collection
            .find_event(event_key)
            .into_iter()
            .filter(|r| r.pit.is_some())
            .map(|r| r.team_key)
            .collect()
    }
}
