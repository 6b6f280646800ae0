//! Reconciliation between the remote authoritative source and local storage.
//!
//! Each operation fetches from the remote, merges into the store via
//! field-level upserts, and reports what changed. An unchanged or empty
//! remote result never erases locally stored detail, so repeated syncs are
//! idempotent and a thin listing cannot clobber a previously enriched
//! document.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::api::{ApiError, RemoteSource};
use crate::store::{EventStore, TeamStore};

/// Fetch fan-out width for bulk operations.
const SYNC_CHUNK_SIZE: usize = 5;

/// Counts of what a sync operation touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    /// Documents written (includes creations).
    pub upserted: usize,
    /// Documents that did not exist before.
    pub created: usize,
    /// Orphaned documents removed.
    pub deleted: usize,
    /// Sub-operations in a bulk sync that failed and were skipped.
    pub failed: usize,
}

impl SyncSummary {
    fn record(&mut self, created: bool) {
        self.upserted += 1;
        if created {
            self.created += 1;
        }
    }

    fn merge(&mut self, other: SyncSummary) {
        self.upserted += other.upserted;
        self.created += other.created;
        self.deleted += other.deleted;
        self.failed += other.failed;
    }
}

/// Drives sync operations against a remote source and the local stores.
pub struct ReconciliationEngine<R: RemoteSource> {
    remote: R,
    teams: Arc<dyn TeamStore>,
    events: Arc<dyn EventStore>,
}

impl<R: RemoteSource> ReconciliationEngine<R> {
    pub fn new(remote: R, teams: Arc<dyn TeamStore>, events: Arc<dyn EventStore>) -> Self {
        ReconciliationEngine { remote, teams, events }
    }

    /// Refresh the full team listing. Teams no longer present remotely are
    /// deleted, but only when the remote returned a non-empty listing; an
    /// empty fetch is indistinguishable from an outage and must not wipe
    /// local data.
    pub async fn sync_teams(&self) -> Result<SyncSummary, ApiError> {
        let listed = self.remote.teams_all(false).await?;
        let mut summary = SyncSummary::default();
        let now = Utc::now();

        let mut listed_keys: HashSet<String> = HashSet::with_capacity(listed.len());
        for team in listed {
            listed_keys.insert(team.key.clone());
            summary.record(self.teams.upsert(team, now).created);
        }

        if !listed_keys.is_empty() {
            let orphans: Vec<String> = self
                .teams
                .all_keys()
                .into_iter()
                .filter(|k| !listed_keys.contains(k))
                .collect();
            summary.deleted = self.teams.delete_keys(&orphans);
        }

        debug!(
            upserted = summary.upserted,
            created = summary.created,
            deleted = summary.deleted,
            "Synced team listing"
        );
        Ok(summary)
    }

    /// Refresh the event listing for one year, deleting that year's orphans
    /// under the same non-empty guard as `sync_teams`.
    pub async fn sync_events(&self, year: i32) -> Result<SyncSummary, ApiError> {
        let listed = self.remote.events(year, true).await?;
        let mut summary = SyncSummary::default();
        let now = Utc::now();

        let mut listed_keys: HashSet<String> = HashSet::with_capacity(listed.len());
        for event in listed {
            listed_keys.insert(event.key.clone());
            summary.record(self.events.upsert(event, now).created);
        }

        if !listed_keys.is_empty() {
            let orphans: Vec<String> = self
                .events
                .keys_for_year(year)
                .into_iter()
                .filter(|k| !listed_keys.contains(k))
                .collect();
            summary.deleted = self.events.delete_keys(&orphans);
        }

        debug!(year, upserted = summary.upserted, deleted = summary.deleted, "Synced event listing");
        Ok(summary)
    }

    /// Deep refresh of a single event: roster, match schedule, and (once the
    /// event has started) outcome sub-resources. Roster teams are upserted
    /// into the team store along the way.
    pub async fn sync_event(&self, event_key: &str) -> Result<SyncSummary, ApiError> {
        let Some(mut event) = self.remote.event(event_key, false).await? else {
            warn!(event_key, "Event not available remotely, nothing to sync");
            return Ok(SyncSummary::default());
        };
        let mut summary = SyncSummary::default();
        let now = Utc::now();

        let roster = self.remote.event_teams(event_key, true).await?;
        if !roster.is_empty() {
            let mut keys: Vec<String> = roster.iter().map(|t| t.key.clone()).collect();
            keys.sort();
            event.teams = Some(keys);
            for team in roster {
                summary.record(self.teams.upsert(team, now).created);
            }
        }

        let matches = self.remote.event_matches(event_key, true).await?;
        if !matches.is_empty() {
            event.matches = Some(matches);
        }

        // Outcome data only exists once play has begun; skip the fetches
        // entirely for future events.
        if event.has_started(now.date_naive()) {
            event.rankings = self.remote.event_rankings(event_key, true).await?;
            event.stats = self.remote.event_oprs(event_key, true).await?;
            event.awards = self.remote.event_awards(event_key, true).await?;
            event.alliances = self.remote.event_alliances(event_key, true).await?;
        }

        summary.record(self.events.upsert(event, now).created);
        debug!(event_key, upserted = summary.upserted, "Synced event");
        Ok(summary)
    }

    /// Refresh every event of a year in depth: the listing first, then each
    /// event's roster, schedule, and outcomes, fetched a few events at a
    /// time. A failed event is counted and skipped so one outage does not
    /// abort the rest of the year.
    pub async fn sync_events_deep(&self, year: i32) -> Result<SyncSummary, ApiError> {
        let mut summary = self.sync_events(year).await?;

        let keys = self.events.keys_for_year(year);
        for chunk in keys.chunks(SYNC_CHUNK_SIZE) {
            let fetches: Vec<_> = chunk.iter().map(|key| self.sync_event(key)).collect();
            for (key, result) in chunk.iter().zip(futures::future::join_all(fetches).await) {
                match result {
                    Ok(event_summary) => summary.merge(event_summary),
                    Err(error) => {
                        warn!(event_key = %key, %error, "Event sync failed, skipping");
                        summary.failed += 1;
                    }
                }
            }
        }

        debug!(year, upserted = summary.upserted, failed = summary.failed, "Deep-synced year");
        Ok(summary)
    }

    /// Refresh one team's profile plus its award, district, and media
    /// history.
    pub async fn sync_team(&self, team_key: &str, year: i32) -> Result<SyncSummary, ApiError> {
        let Some(mut team) = self.remote.team(team_key, true).await? else {
            warn!(team_key, "Team not available remotely, nothing to sync");
            return Ok(SyncSummary::default());
        };
        let mut summary = SyncSummary::default();

        team.awards = self.remote.team_awards(team_key, true).await?;
        team.districts = self.remote.team_districts(team_key, true).await?.map(districts_by_year);
        team.media = self.remote.team_media(team_key, year, true).await?.map(media_by_type);

        summary.record(self.teams.upsert(team, Utc::now()).created);
        debug!(team_key, "Synced team");
        Ok(summary)
    }

    /// Deep-sync every event a team is attending in a year. No orphan
    /// deletion: this listing is per-team and says nothing about other
    /// events.
    pub async fn sync_team_events(&self, team_key: &str, year: i32) -> Result<SyncSummary, ApiError> {
        let listed = self.remote.team_events(team_key, year, true).await?;
        let mut summary = SyncSummary::default();
        let now = Utc::now();

        let mut keys: Vec<String> = Vec::with_capacity(listed.len());
        for event in listed {
            keys.push(event.key.clone());
            summary.record(self.events.upsert(event, now).created);
        }
        for chunk in keys.chunks(SYNC_CHUNK_SIZE) {
            let fetches: Vec<_> = chunk.iter().map(|key| self.sync_event(key)).collect();
            for (key, result) in chunk.iter().zip(futures::future::join_all(fetches).await) {
                match result {
                    Ok(event_summary) => summary.merge(event_summary),
                    Err(error) => {
                        warn!(event_key = %key, %error, "Event sync failed, skipping");
                        summary.failed += 1;
                    }
                }
            }
        }

        debug!(team_key, year, upserted = summary.upserted, "Synced team events");
        Ok(summary)
    }
}

/// Reshape a district participation list into a map keyed by year.
fn districts_by_year(districts: Value) -> Value {
    let Value::Array(items) = districts else { return districts };
    let mut map = Map::new();
    for item in items {
        let Some(year) = item.get("year").and_then(Value::as_i64) else { continue };
        map.insert(year.to_string(), item);
    }
    Value::Object(map)
}

/// Reshape a media list into a map keyed by media type, last entry wins.
fn media_by_type(media: Value) -> Value {
    let Value::Array(items) = media else { return media };
    let mut map = Map::new();
    for item in items {
        let Some(kind) = item.get("type").and_then(Value::as_str).map(str::to_string) else {
            continue;
        };
        map.insert(kind, item);
    }
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Event, Match, Team};
    use crate::store::MemoryStore;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Scripted remote returning canned payloads per endpoint family.
    #[derive(Default)]
    struct FakeRemote {
        teams: Vec<Team>,
        team_details: HashMap<String, Team>,
        events: Vec<Event>,
        event_details: HashMap<String, Event>,
        event_teams: HashMap<String, Vec<Team>>,
        event_matches: HashMap<String, Vec<Match>>,
        rankings: HashMap<String, Value>,
        outcome_fetches: Mutex<Vec<String>>,
    }

    impl RemoteSource for FakeRemote {
        async fn teams_all(&self, _use_cache: bool) -> Result<Vec<Team>, ApiError> {
            Ok(self.teams.clone())
        }
        async fn team(&self, team_key: &str, _use_cache: bool) -> Result<Option<Team>, ApiError> {
            Ok(self.team_details.get(team_key).cloned())
        }
        async fn team_events(&self, _team_key: &str, year: i32, _use_cache: bool) -> Result<Vec<Event>, ApiError> {
            Ok(self.events.iter().filter(|e| e.year == year).cloned().collect())
        }
        async fn team_awards(&self, _team_key: &str, _use_cache: bool) -> Result<Option<Value>, ApiError> {
            Ok(None)
        }
        async fn team_districts(&self, _team_key: &str, _use_cache: bool) -> Result<Option<Value>, ApiError> {
            Ok(Some(json!([{"year": 2020, "abbreviation": "fim"}])))
        }
        async fn team_media(&self, _team_key: &str, _year: i32, _use_cache: bool) -> Result<Option<Value>, ApiError> {
            Ok(None)
        }
        async fn events(&self, year: i32, _use_cache: bool) -> Result<Vec<Event>, ApiError> {
            Ok(self.events.iter().filter(|e| e.year == year).cloned().collect())
        }
        async fn event(&self, event_key: &str, _use_cache: bool) -> Result<Option<Event>, ApiError> {
            Ok(self.event_details.get(event_key).cloned())
        }
        async fn event_teams(&self, event_key: &str, _use_cache: bool) -> Result<Vec<Team>, ApiError> {
            Ok(self.event_teams.get(event_key).cloned().unwrap_or_default())
        }
        async fn event_matches(&self, event_key: &str, _use_cache: bool) -> Result<Vec<Match>, ApiError> {
            Ok(self.event_matches.get(event_key).cloned().unwrap_or_default())
        }
        async fn event_rankings(&self, event_key: &str, _use_cache: bool) -> Result<Option<Value>, ApiError> {
            self.outcome_fetches.lock().unwrap().push(format!("rankings/{event_key}"));
            Ok(self.rankings.get(event_key).cloned())
        }
        async fn event_oprs(&self, event_key: &str, _use_cache: bool) -> Result<Option<Value>, ApiError> {
            self.outcome_fetches.lock().unwrap().push(format!("oprs/{event_key}"));
            Ok(None)
        }
        async fn event_awards(&self, event_key: &str, _use_cache: bool) -> Result<Option<Value>, ApiError> {
            self.outcome_fetches.lock().unwrap().push(format!("awards/{event_key}"));
            Ok(None)
        }
        async fn event_alliances(&self, event_key: &str, _use_cache: bool) -> Result<Option<Value>, ApiError> {
            self.outcome_fetches.lock().unwrap().push(format!("alliances/{event_key}"));
            Ok(None)
        }
    }

    fn team(key: &str, number: u32) -> Team {
        Team { key: key.into(), team_number: number, ..Default::default() }
    }

    fn event(key: &str, year: i32, start_date: &str) -> Event {
        Event {
            key: key.into(),
            event_code: key[4..].into(),
            name: key.into(),
            year,
            start_date: Some(start_date.into()),
            end_date: Some(start_date.into()),
            ..Default::default()
        }
    }

    fn engine(remote: FakeRemote) -> (ReconciliationEngine<FakeRemote>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let engine = ReconciliationEngine::new(remote, store.clone(), store.clone());
        (engine, store)
    }

    #[tokio::test]
    async fn sync_teams_upserts_and_deletes_orphans() {
        let remote = FakeRemote { teams: vec![team("frc1", 1), team("frc2", 2)], ..Default::default() };
        let (engine, store) = engine(remote);
        TeamStore::upsert(store.as_ref(), team("frc999", 999), Utc::now());

        let summary = engine.sync_teams().await.unwrap();
        assert_eq!(summary.upserted, 2);
        assert_eq!(summary.created, 2);
        assert_eq!(summary.deleted, 1);
        assert!(TeamStore::find(store.as_ref(), "frc999").is_none());
    }

    #[tokio::test]
    async fn empty_team_listing_deletes_nothing() {
        let (engine, store) = engine(FakeRemote::default());
        TeamStore::upsert(store.as_ref(), team("frc999", 999), Utc::now());

        let summary = engine.sync_teams().await.unwrap();
        assert_eq!(summary, SyncSummary::default());
        assert!(TeamStore::find(store.as_ref(), "frc999").is_some());
    }

    #[tokio::test]
    async fn sync_events_scopes_orphan_deletion_to_year() {
        let remote = FakeRemote { events: vec![event("2020casj", 2020, "2020-03-01")], ..Default::default() };
        let (engine, store) = engine(remote);
        EventStore::upsert(store.as_ref(), event("2020gone", 2020, "2020-04-01"), Utc::now());
        EventStore::upsert(store.as_ref(), event("2019casj", 2019, "2019-03-01"), Utc::now());

        let summary = engine.sync_events(2020).await.unwrap();
        assert_eq!(summary.deleted, 1);
        assert!(EventStore::find(store.as_ref(), "2019casj").is_some());
        assert!(EventStore::find(store.as_ref(), "2020gone").is_none());
    }

    #[tokio::test]
    async fn sync_event_attaches_roster_and_gates_outcomes() {
        let mut remote = FakeRemote::default();
        remote.event_details.insert("2020casj".into(), event("2020casj", 2020, "2020-03-01"));
        remote.event_teams.insert("2020casj".into(), vec![team("frc254", 254), team("frc1114", 1114)]);
        remote.rankings.insert("2020casj".into(), json!({"frc254": {"rank": 1}}));
        let (engine, store) = engine(remote);

        engine.sync_event("2020casj").await.unwrap();

        let stored = EventStore::find(store.as_ref(), "2020casj").unwrap();
        assert_eq!(stored.teams, Some(vec!["frc1114".to_string(), "frc254".to_string()]));
        assert_eq!(stored.rankings, Some(json!({"frc254": {"rank": 1}})));
        assert!(TeamStore::find(store.as_ref(), "frc254").is_some());
    }

    #[tokio::test]
    async fn sync_event_skips_outcomes_for_future_events() {
        let mut remote = FakeRemote::default();
        remote.event_details.insert("2999casj".into(), event("2999casj", 2999, "2999-03-01"));
        let (engine, _store) = engine(remote);

        engine.sync_event("2999casj").await.unwrap();
        assert!(engine.remote.outcome_fetches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn sync_event_missing_remotely_is_a_noop() {
        let (engine, store) = engine(FakeRemote::default());
        let summary = engine.sync_event("2020nope").await.unwrap();
        assert_eq!(summary, SyncSummary::default());
        assert!(EventStore::find(store.as_ref(), "2020nope").is_none());
    }

    #[tokio::test]
    async fn sync_events_deep_refreshes_each_listed_event() {
        let mut remote = FakeRemote {
            events: vec![event("2020casj", 2020, "2020-03-01"), event("2020mike2", 2020, "2020-03-08")],
            ..Default::default()
        };
        remote.event_details.insert("2020casj".into(), event("2020casj", 2020, "2020-03-01"));
        remote.event_teams.insert("2020casj".into(), vec![team("frc254", 254)]);
        remote.event_details.insert("2020mike2".into(), event("2020mike2", 2020, "2020-03-08"));
        let (engine, store) = engine(remote);

        let summary = engine.sync_events_deep(2020).await.unwrap();
        assert_eq!(summary.failed, 0);
        // 2 listing upserts, 1 roster team, 2 per-event upserts.
        assert_eq!(summary.upserted, 5);
        let stored = EventStore::find(store.as_ref(), "2020casj").unwrap();
        assert_eq!(stored.teams, Some(vec!["frc254".to_string()]));
    }

    #[tokio::test]
    async fn sync_team_reshapes_district_history() {
        let mut remote = FakeRemote::default();
        remote.team_details.insert("frc33".into(), team("frc33", 33));
        let (engine, store) = engine(remote);

        engine.sync_team("frc33", 2020).await.unwrap();
        let stored = TeamStore::find(store.as_ref(), "frc33").unwrap();
        assert_eq!(stored.districts, Some(json!({"2020": {"year": 2020, "abbreviation": "fim"}})));
    }

    #[test]
    fn media_by_type_keys_entries() {
        let reshaped = media_by_type(json!([
            {"type": "avatar", "key": "a"},
            {"type": "youtube", "key": "b"}
        ]));
        assert_eq!(reshaped["avatar"]["key"], "a");
        assert_eq!(reshaped["youtube"]["key"], "b");
    }
}
