//! Data models for the synced replica and scouting submissions.
//!
//! - `Team`, `Event`, `Match`: local replicas of remote records, written only
//!   by the reconciliation engine
//! - `MatchKey`, `CompLevel`: the match key grammar and canonical ordering
//! - `ScoutingRecord`, `MatchScouting`, `PitScouting`: crowd-submitted data

pub mod event;
pub mod scouting;
pub mod team;

pub use event::{
    sort_key, Alliance, Alliances, CompLevel, District, Event, MalformedKey, Match, MatchKey,
    TeamColor,
};
pub use scouting::{MatchScouting, PitScouting, ScoutingRecord};
pub use team::{number_from_key, Team};
