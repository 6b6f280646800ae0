//! Document store contract required by the engines.
//!
//! The engine does not prescribe a storage backend; it needs per-collection
//! filter/upsert/distinct operations with these semantics:
//!
//! - upserts are atomic per document and stamp `modified_timestamp` on every
//!   write and `created_timestamp` only on first insert
//! - upserts overlay only present/non-empty fields (see `Team::apply` and
//!   `Event::apply`), so a sparse fetch never erases stored data
//! - concurrent writers need no external locking; correctness relies on
//!   per-document upsert atomicity keyed by unique identifiers
//!
//! [`MemoryStore`] is the in-process reference backend, used by tests and by
//! deployments small enough to snapshot to disk.

pub mod memory;

use chrono::{DateTime, Utc};

use crate::models::{Event, MatchScouting, PitScouting, ScoutingRecord, Team};

pub use memory::MemoryStore;

/// Result of an upsert: whether the document was newly created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Upserted {
    pub created: bool,
}

/// Count, min, and max of stored team numbers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TeamNumberStats {
    pub count: usize,
    pub min: u32,
    pub max: u32,
}

pub trait TeamStore: Send + Sync {
    fn find(&self, key: &str) -> Option<Team>;
    /// Resolve keys to full teams, ordered by team number. Unknown keys are
    /// skipped.
    fn find_keys(&self, keys: &[String]) -> Vec<Team>;
    fn all(&self) -> Vec<Team>;
    fn all_keys(&self) -> Vec<String>;
    /// Page through teams by team-number block, `limit` numbers per page.
    fn page(&self, page: u32, limit: u32) -> Vec<Team>;
    fn number_stats(&self) -> TeamNumberStats;
    fn upsert(&self, team: Team, now: DateTime<Utc>) -> Upserted;
    fn delete_keys(&self, keys: &[String]) -> usize;
}

pub trait EventStore: Send + Sync {
    fn find(&self, key: &str) -> Option<Event>;
    /// All events in a year, ordered by start date, district, name.
    fn find_by_year(&self, year: i32) -> Vec<Event>;
    /// All events sharing an event code, newest year first.
    fn find_by_code(&self, event_code: &str) -> Vec<Event>;
    fn keys_for_year(&self, year: i32) -> Vec<String>;
    /// Distinct years with stored events, newest first.
    fn distinct_years(&self) -> Vec<i32>;
    /// Distinct non-null weeks in a year, ascending.
    fn distinct_weeks(&self, year: i32) -> Vec<i64>;
    /// Events in a year whose roster contains the team, ordered by start date.
    fn find_for_team_year(&self, team_key: &str, year: i32) -> Vec<Event>;
    /// Distinct years in which any event roster contains the team, newest
    /// first.
    fn years_for_team(&self, team_key: &str) -> Vec<i32>;
    fn upsert(&self, event: Event, now: DateTime<Utc>) -> Upserted;
    fn delete_keys(&self, keys: &[String]) -> usize;
}

pub trait ScoutingCollection: Send + Sync {
    fn find_event(&self, event_key: &str) -> Vec<ScoutingRecord>;
    fn find_team(&self, event_key: &str, team_key: &str) -> Option<ScoutingRecord>;
    /// Replace the embedded match entry matching the entry's
    /// `(event_key, team_key, match_key)` in place. Returns false when no
    /// document or array element matched.
    fn update_match_entry(&self, entry: &MatchScouting) -> bool;
    /// Append a match entry under `(event_key, team_key)`, creating the parent
    /// document if absent.
    fn push_match_entry(&self, entry: &MatchScouting);
    /// Set the pit payload for `(event_key, team_key)`, creating the document
    /// if absent. Returns `true` whenever the payload was written, matched
    /// document or fresh insert alike.
    fn set_pit(&self, pit: &PitScouting) -> bool;
}
