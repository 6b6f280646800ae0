use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::event::TeamColor;

/// A crowd-submitted observation of one team in one match.
///
/// Season-specific fields (scores, climb state, free-text comments and so on)
/// are carried opaquely in `data`; the engine only interprets the identifying
/// fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchScouting {
    pub event_key: String,
    pub team_key: String,
    pub match_key: String,
    pub team_color: TeamColor,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

/// A one-time "pit" profile of a team at an event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PitScouting {
    pub event_key: String,
    pub team_key: String,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

/// All scouting submitted for one `(event, team)` pair. Unique per pair;
/// append/update only, never deleted by the engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoutingRecord {
    pub event_key: String,
    pub team_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pit: Option<PitScouting>,
    #[serde(default)]
    pub matches: Vec<MatchScouting>,
}

impl ScoutingRecord {
    pub fn new(event_key: impl Into<String>, team_key: impl Into<String>) -> ScoutingRecord {
        ScoutingRecord {
            event_key: event_key.into(),
            team_key: team_key.into(),
            pit: None,
            matches: Vec::new(),
        }
    }
}
