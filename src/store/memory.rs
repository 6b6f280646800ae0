//! In-process document store backend.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use crate::models::{Event, MatchScouting, PitScouting, ScoutingRecord, Team};

use super::{EventStore, ScoutingCollection, TeamNumberStats, TeamStore, Upserted};

/// HashMap-backed store guarded by per-collection locks. Writes are atomic
/// per document, matching the contract a server-side document store provides.
#[derive(Debug, Default)]
pub struct MemoryStore {
    teams: RwLock<HashMap<String, Team>>,
    events: RwLock<HashMap<String, Event>>,
    scouting: RwLock<HashMap<(String, String), ScoutingRecord>>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }
}

impl TeamStore for MemoryStore {
    fn find(&self, key: &str) -> Option<Team> {
        self.teams.read().expect("teams lock poisoned").get(key).cloned()
    }

    fn find_keys(&self, keys: &[String]) -> Vec<Team> {
        let teams = self.teams.read().expect("teams lock poisoned");
        let mut found: Vec<Team> = keys.iter().filter_map(|k| teams.get(k).cloned()).collect();
        found.sort_by_key(|t| t.team_number);
        found
    }

    fn all(&self) -> Vec<Team> {
        let mut all: Vec<Team> =
            self.teams.read().expect("teams lock poisoned").values().cloned().collect();
        all.sort_by_key(|t| t.team_number);
        all
    }

    fn all_keys(&self) -> Vec<String> {
        self.teams.read().expect("teams lock poisoned").keys().cloned().collect()
    }

    fn page(&self, page: u32, limit: u32) -> Vec<Team> {
        let min = page * limit;
        let max = (page + 1) * limit - 1;
        let mut teams: Vec<Team> = self
            .teams
            .read()
            .expect("teams lock poisoned")
            .values()
            .filter(|t| t.team_number >= min && t.team_number <= max)
            .cloned()
            .collect();
        teams.sort_by_key(|t| t.team_number);
        teams
    }

    fn number_stats(&self) -> TeamNumberStats {
        let teams = self.teams.read().expect("teams lock poisoned");
        let mut stats = TeamNumberStats::default();
        for team in teams.values() {
            if stats.count == 0 {
                stats.min = team.team_number;
                stats.max = team.team_number;
            } else {
                stats.min = stats.min.min(team.team_number);
                stats.max = stats.max.max(team.team_number);
            }
            stats.count += 1;
        }
        stats
    }

    fn upsert(&self, team: Team, now: DateTime<Utc>) -> Upserted {
        let mut teams = self.teams.write().expect("teams lock poisoned");
        match teams.get_mut(&team.key) {
            Some(stored) => {
                stored.apply(team);
                stored.modified_timestamp = Some(now);
                Upserted { created: false }
            }
            None => {
                let mut team = team;
                team.created_timestamp = Some(now);
                team.modified_timestamp = Some(now);
                teams.insert(team.key.clone(), team);
                Upserted { created: true }
            }
        }
    }

    fn delete_keys(&self, keys: &[String]) -> usize {
        let mut teams = self.teams.write().expect("teams lock poisoned");
        keys.iter().filter(|k| teams.remove(*k).is_some()).count()
    }
}

fn event_listing_order(a: &Event, b: &Event) -> std::cmp::Ordering {
    let district = |e: &Event| e.district.as_ref().and_then(|d| d.abbreviation.clone());
    (a.start_date.clone(), district(a), a.name.clone()).cmp(&(
        b.start_date.clone(),
        district(b),
        b.name.clone(),
    ))
}

impl EventStore for MemoryStore {
    fn find(&self, key: &str) -> Option<Event> {
        self.events.read().expect("events lock poisoned").get(key).cloned()
    }

    fn find_by_year(&self, year: i32) -> Vec<Event> {
        let mut events: Vec<Event> = self
            .events
            .read()
            .expect("events lock poisoned")
            .values()
            .filter(|e| e.year == year)
            .cloned()
            .collect();
        events.sort_by(event_listing_order);
        events
    }

    fn find_by_code(&self, event_code: &str) -> Vec<Event> {
        let mut events: Vec<Event> = self
            .events
            .read()
            .expect("events lock poisoned")
            .values()
            .filter(|e| e.event_code == event_code)
            .cloned()
            .collect();
        events.sort_by_key(|e| std::cmp::Reverse(e.year));
        events
    }

    fn keys_for_year(&self, year: i32) -> Vec<String> {
        self.events
            .read()
            .expect("events lock poisoned")
            .values()
            .filter(|e| e.year == year)
            .map(|e| e.key.clone())
            .collect()
    }

    fn distinct_years(&self) -> Vec<i32> {
        let mut years: Vec<i32> =
            self.events.read().expect("events lock poisoned").values().map(|e| e.year).collect();
        years.sort_unstable_by(|a, b| b.cmp(a));
        years.dedup();
        years
    }

    fn distinct_weeks(&self, year: i32) -> Vec<i64> {
        let mut weeks: Vec<i64> = self
            .events
            .read()
            .expect("events lock poisoned")
            .values()
            .filter(|e| e.year == year)
            .filter_map(|e| e.week)
            .collect();
        weeks.sort_unstable();
        weeks.dedup();
        weeks
    }

    fn find_for_team_year(&self, team_key: &str, year: i32) -> Vec<Event> {
        let mut events: Vec<Event> = self
            .events
            .read()
            .expect("events lock poisoned")
            .values()
            .filter(|e| e.year == year)
            .filter(|e| e.teams.as_ref().is_some_and(|t| t.iter().any(|k| k == team_key)))
            .cloned()
            .collect();
        events.sort_by_key(|e| e.start_date.clone());
        events
    }

    fn years_for_team(&self, team_key: &str) -> Vec<i32> {
        let mut years: Vec<i32> = self
            .events
            .read()
            .expect("events lock poisoned")
            .values()
            .filter(|e| e.teams.as_ref().is_some_and(|t| t.iter().any(|k| k == team_key)))
            .map(|e| e.year)
            .collect();
        years.sort_unstable_by(|a, b| b.cmp(a));
        years.dedup();
        years
    }

    fn upsert(&self, event: Event, now: DateTime<Utc>) -> Upserted {
        let mut events = self.events.write().expect("events lock poisoned");
        match events.get_mut(&event.key) {
            Some(stored) => {
                stored.apply(event);
                stored.modified_timestamp = Some(now);
                Upserted { created: false }
            }
            None => {
                let mut event = event;
                event.created_timestamp = Some(now);
                event.modified_timestamp = Some(now);
                events.insert(event.key.clone(), event);
                Upserted { created: true }
            }
        }
    }

    fn delete_keys(&self, keys: &[String]) -> usize {
        let mut events = self.events.write().expect("events lock poisoned");
        keys.iter().filter(|k| events.remove(*k).is_some()).count()
    }
}

impl ScoutingCollection for MemoryStore {
    fn find_event(&self, event_key: &str) -> Vec<ScoutingRecord> {
        let mut records: Vec<ScoutingRecord> = self
            .scouting
            .read()
            .expect("scouting lock poisoned")
            .values()
            .filter(|r| r.event_key == event_key)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.team_key.clone());
        records
    }

    fn find_team(&self, event_key: &str, team_key: &str) -> Option<ScoutingRecord> {
        self.scouting
            .read()
            .expect("scouting lock poisoned")
            .get(&(event_key.to_string(), team_key.to_string()))
            .cloned()
    }

    fn update_match_entry(&self, entry: &MatchScouting) -> bool {
        let mut scouting = self.scouting.write().expect("scouting lock poisoned");
        let Some(record) = scouting.get_mut(&(entry.event_key.clone(), entry.team_key.clone()))
        else {
            return false;
        };
        match record.matches.iter_mut().find(|m| m.match_key == entry.match_key) {
            Some(stored) => {
                *stored = entry.clone();
                true
            }
            None => false,
        }
    }

    fn push_match_entry(&self, entry: &MatchScouting) {
        let mut scouting = self.scouting.write().expect("scouting lock poisoned");
        scouting
            .entry((entry.event_key.clone(), entry.team_key.clone()))
            .or_insert_with(|| ScoutingRecord::new(&entry.event_key, &entry.team_key))
            .matches
            .push(entry.clone());
    }

    fn set_pit(&self, pit: &PitScouting) -> bool {
        let mut scouting = self.scouting.write().expect("scouting lock poisoned");
        scouting
            .entry((pit.event_key.clone(), pit.team_key.clone()))
            .or_insert_with(|| ScoutingRecord::new(&pit.event_key, &pit.team_key))
            .pit = Some(pit.clone());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn team(key: &str, number: u32) -> Team {
        Team { key: key.into(), team_number: number, ..Default::default() }
    }

    fn now(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn upsert_stamps_created_only_once() {
        let store = MemoryStore::new();
        let first = TeamStore::upsert(&store, team("frc1", 1), now(100));
        assert!(first.created);

        let mut updated = team("frc1", 1);
        updated.nickname = Some("The Juggernauts".into());
        let second = TeamStore::upsert(&store, updated, now(200));
        assert!(!second.created);

        let stored = TeamStore::find(&store, "frc1").unwrap();
        assert_eq!(stored.created_timestamp, Some(now(100)));
        assert_eq!(stored.modified_timestamp, Some(now(200)));
        assert_eq!(stored.nickname.as_deref(), Some("The Juggernauts"));
    }

    #[test]
    fn find_keys_sorts_by_number_and_skips_unknown() {
        let store = MemoryStore::new();
        TeamStore::upsert(&store, team("frc254", 254), now(0));
        TeamStore::upsert(&store, team("frc33", 33), now(0));
        let found = store.find_keys(&["frc254".into(), "frc33".into(), "frc9999".into()]);
        assert_eq!(found.iter().map(|t| t.team_number).collect::<Vec<_>>(), vec![33, 254]);
    }

    #[test]
    fn page_selects_by_number_block() {
        let store = MemoryStore::new();
        for n in [33u32, 254, 499, 500, 1024] {
            TeamStore::upsert(&store, team(&format!("frc{n}"), n), now(0));
        }
        let first = store.page(0, 500);
        assert_eq!(first.iter().map(|t| t.team_number).collect::<Vec<_>>(), vec![33, 254, 499]);
        let second = store.page(1, 500);
        assert_eq!(second.iter().map(|t| t.team_number).collect::<Vec<_>>(), vec![500]);
    }

    #[test]
    fn distinct_years_and_weeks() {
        let store = MemoryStore::new();
        for (key, year, week) in
            [("2019casj", 2019, None), ("2020casj", 2020, Some(1)), ("2020mike2", 2020, Some(3))]
        {
            let event = Event {
                key: key.into(),
                event_code: key[4..].into(),
                name: key.into(),
                year,
                week,
                ..Default::default()
            };
            EventStore::upsert(&store, event, now(0));
        }
        assert_eq!(store.distinct_years(), vec![2020, 2019]);
        assert_eq!(store.distinct_weeks(2020), vec![1, 3]);
        assert_eq!(store.distinct_weeks(2019), Vec::<i64>::new());
    }
}
