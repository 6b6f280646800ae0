//! Merged read views over authoritative data and scouting submissions.
//!
//! Pages never read a single collection directly: the view of an event is
//! the union of what the remote source published and what scouts observed.
//! A team that only exists in a pit scouting entry still shows up, and a
//! match schedule is reconstructed from scouting entries when the remote
//! never published one.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::models::{
    number_from_key, Alliance, Event, Match, MatchKey, PitScouting, ScoutingRecord, Team, TeamColor,
};
use crate::store::{EventStore, ScoutingCollection, TeamNumberStats, TeamStore};

/// An event with its roster and schedule merged against scouting coverage.
#[derive(Debug, Clone)]
pub struct EventView {
    pub event: Event,
    pub teams: Vec<TeamEntry>,
    pub matches: Vec<MatchView>,
}

/// One team at an event, with its scouting coverage.
#[derive(Debug, Clone)]
pub struct TeamEntry {
    pub team: Team,
    pub pit: Option<PitScouting>,
    pub matches_scouted: usize,
}

/// One match with the team keys that have a scouting entry for it.
#[derive(Debug, Clone)]
pub struct MatchView {
    pub record: Match,
    pub scouted: Vec<String>,
}

/// A team with its event participation history.
#[derive(Debug, Clone)]
pub struct TeamView {
    pub team: Team,
    pub years: Vec<i32>,
    pub events: Vec<TeamEventView>,
}

/// One event on a team's schedule, matches narrowed to that team.
#[derive(Debug, Clone)]
pub struct TeamEventView {
    pub event: Event,
    pub matches: Vec<MatchView>,
}

/// Scouting coverage counts alongside an event listing row.
#[derive(Debug, Clone)]
pub struct EventSummary {
    pub event: Event,
    pub teams_scouted: usize,
    pub entries: usize,
}

pub struct MergeEngine {
    teams: Arc<dyn TeamStore>,
    events: Arc<dyn EventStore>,
    scouting: Arc<dyn ScoutingCollection>,
}

impl MergeEngine {
    pub fn new(
        teams: Arc<dyn TeamStore>,
        events: Arc<dyn EventStore>,
        scouting: Arc<dyn ScoutingCollection>,
    ) -> MergeEngine {
        MergeEngine { teams, events, scouting }
    }

    /// The merged view of one event, or `None` when it was never stored.
    pub fn event(&self, event_key: &str) -> Option<EventView> {
        let event = self.events.find(event_key)?;
        let records = self.scouting.find_event(event_key);

        let teams = self.merge_teams(&event, &records);
        let matches = match event.matches.as_deref() {
            Some(published) if !published.is_empty() => annotate_matches(published, &records),
            _ => derive_matches(event_key, &records),
        };

        Some(EventView { event, teams, matches })
    }

    /// Roster union: published attendance plus every team a scout recorded,
    /// ordered by team number. Unknown keys get a synthesized stub so
    /// scouting-only teams still render.
    fn merge_teams(&self, event: &Event, records: &[ScoutingRecord]) -> Vec<TeamEntry> {
        let mut keys: Vec<String> = event.teams.clone().unwrap_or_default();
        for record in records {
            if !keys.contains(&record.team_key) {
                keys.push(record.team_key.clone());
            }
        }

        let mut resolved: BTreeMap<String, Team> =
            self.teams.find_keys(&keys).into_iter().map(|t| (t.key.clone(), t)).collect();
        let mut entries: Vec<TeamEntry> = keys
            .iter()
            .map(|key| {
                let team = resolved.remove(key).unwrap_or_else(|| stub_team(key));
                let record = records.iter().find(|r| &r.team_key == key);
                TeamEntry {
                    team,
                    pit: record.and_then(|r| r.pit.clone()),
                    matches_scouted: record.map_or(0, |r| r.matches.len()),
                }
            })
            .collect();
        entries.sort_by(|a, b| {
            (a.team.team_number, &a.team.key).cmp(&(b.team.team_number, &b.team.key))
        });
        entries
    }

    /// A team's profile with its stored event history for one year. Each
    /// event's matches are narrowed to those the team plays in, scouting
    /// coverage attached.
    pub fn team(&self, team_key: &str, year: i32) -> Option<TeamView> {
        let team = self.teams.find(team_key)?;
        let events = self
            .events
            .find_for_team_year(team_key, year)
            .into_iter()
            .map(|event| {
                let records: Vec<ScoutingRecord> = self
                    .scouting
                    .find_team(&event.key, team_key)
                    .into_iter()
                    .collect();
                let mut matches = match event.matches.as_deref() {
                    Some(published) if !published.is_empty() => {
                        annotate_matches(published, &records)
                    }
                    _ => derive_matches(&event.key, &records),
                };
                matches.retain(|v| v.record.alliances.contains(team_key));
                TeamEventView { event, matches }
            })
            .collect();
        Some(TeamView { years: self.events.years_for_team(team_key), events, team })
    }

    /// Years any event is stored for, newest first.
    pub fn years(&self) -> Vec<i32> {
        self.events.distinct_years()
    }

    /// Every year's edition of one recurring event, newest first.
    pub fn event_years(&self, event_code: &str) -> Vec<Event> {
        self.events.find_by_code(event_code)
    }

    /// Competition weeks present in a year, ascending.
    pub fn event_weeks(&self, year: i32) -> Vec<i64> {
        self.events.distinct_weeks(year)
    }

    /// Event listing for a year, in start date order.
    pub fn events(&self, year: i32) -> Vec<Event> {
        self.events.find_by_year(year)
    }

    /// Event listing with scouting coverage counts.
    pub fn events_stats(&self, year: i32) -> Vec<EventSummary> {
        self.events
            .find_by_year(year)
            .into_iter()
            .map(|event| {
                let records = self.scouting.find_event(&event.key);
                EventSummary {
                    teams_scouted: records.len(),
                    entries: records
                        .iter()
                        .map(|r| r.matches.len() + usize::from(r.pit.is_some()))
                        .sum(),
                    event,
                }
            })
            .collect()
    }

    /// One block of the paged team directory.
    pub fn teams_paged(&self, page: u32, limit: u32) -> Vec<Team> {
        self.teams.page(page, limit)
    }

    /// Count and number range of the team directory, for pagination.
    pub fn teams_stats(&self) -> TeamNumberStats {
        self.teams.number_stats()
    }
}

/// Stand-in for a team key nothing else knows about.
fn stub_team(key: &str) -> Team {
    Team { key: key.to_string(), team_number: number_from_key(key), ..Default::default() }
}

/// Attach scouting coverage to a published schedule. A scouted team missing
/// from its claimed alliance is unioned in rather than dropped.
fn annotate_matches(published: &[Match], records: &[ScoutingRecord]) -> Vec<MatchView> {
    let mut views: Vec<MatchView> = published
        .iter()
        .map(|record| MatchView { record: record.clone(), scouted: Vec::new() })
        .collect();

    for record in records {
        for entry in &record.matches {
            let Some(view) = views.iter_mut().find(|v| v.record.key == entry.match_key) else {
                continue;
            };
            if !view.scouted.contains(&record.team_key) {
                view.scouted.push(record.team_key.clone());
            }
            if !view.record.alliances.contains(&record.team_key) {
                view.record.alliances.get_mut(entry.team_color).teams.push(record.team_key.clone());
            }
        }
    }

    for view in &mut views {
        view.scouted.sort();
    }
    views
}

/// Reconstruct a schedule purely from scouting entries. Entries group by
/// the submitted match key; unparseable keys fold into the `qm0` placeholder
/// so they sort ahead of real matches instead of vanishing.
fn derive_matches(event_key: &str, records: &[ScoutingRecord]) -> Vec<MatchView> {
    let mut grouped: BTreeMap<String, MatchView> = BTreeMap::new();

    for record in records {
        for entry in &record.matches {
            let parsed = MatchKey::parse_or_placeholder(&entry.match_key, event_key);
            let key = parsed.to_string();
            let view = grouped.entry(key.clone()).or_insert_with(|| MatchView {
                record: Match {
                    key,
                    event_key: event_key.to_string(),
                    comp_level: parsed.comp_level,
                    match_number: parsed.match_number,
                    set_number: parsed.set_number,
                    time: None,
                    alliances: Default::default(),
                    extra: Default::default(),
                },
                scouted: Vec::new(),
            });
            let alliance: &mut Alliance = view.record.alliances.get_mut(entry.team_color);
            if !alliance.teams.contains(&record.team_key) {
                alliance.teams.push(record.team_key.clone());
            }
            if !view.scouted.contains(&record.team_key) {
                view.scouted.push(record.team_key.clone());
            }
        }
    }

    let mut views: Vec<MatchView> = grouped.into_values().collect();
    for view in &mut views {
        for color in TeamColor::ALL {
            view.record.alliances.get_mut(color).teams.sort();
        }
        view.scouted.sort();
    }
    views.sort_by_key(|v| v.record.sort_key());
    views
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MatchScouting, PitScouting};
    use crate::store::MemoryStore;
    use chrono::Utc;
    use serde_json::Map;

    fn store_with_event(teams: &[(&str, u32)], event: Event) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        for (key, number) in teams {
            TeamStore::upsert(
                store.as_ref(),
                Team { key: (*key).into(), team_number: *number, ..Default::default() },
                Utc::now(),
            );
        }
        EventStore::upsert(store.as_ref(), event, Utc::now());
        store
    }

    fn engine(store: &Arc<MemoryStore>) -> MergeEngine {
        MergeEngine::new(store.clone(), store.clone(), store.clone())
    }

    fn event(key: &str, teams: Option<Vec<&str>>) -> Event {
        Event {
            key: key.into(),
            event_code: key[4..].into(),
            name: key.into(),
            year: key[..4].parse().unwrap(),
            teams: teams.map(|t| t.into_iter().map(String::from).collect()),
            ..Default::default()
        }
    }

    fn match_entry(team_key: &str, match_key: &str, color: TeamColor) -> MatchScouting {
        MatchScouting {
            event_key: "2020casj".into(),
            team_key: team_key.into(),
            match_key: match_key.into(),
            team_color: color,
            data: Map::new(),
        }
    }

    #[test]
    fn roster_unions_scouting_only_teams() {
        let store = store_with_event(
            &[("frc254", 254), ("frc33", 33)],
            event("2020casj", Some(vec!["frc254", "frc33"])),
        );
        store.set_pit(&PitScouting {
            event_key: "2020casj".into(),
            team_key: "frc1114".into(),
            data: Map::new(),
        });

        let view = engine(&store).event("2020casj").unwrap();
        let numbers: Vec<u32> = view.teams.iter().map(|t| t.team.team_number).collect();
        assert_eq!(numbers, vec![33, 254, 1114]);

        let pit_only = view.teams.iter().find(|t| t.team.key == "frc1114").unwrap();
        assert!(pit_only.pit.is_some());
        assert!(pit_only.team.nickname.is_none());
    }

    #[test]
    fn schedule_derives_from_scouting_when_unpublished() {
        let store = store_with_event(&[("frc254", 254)], event("2020casj", None));
        store.push_match_entry(&match_entry("frc254", "2020casj_qm3", TeamColor::Red));
        store.push_match_entry(&match_entry("frc33", "2020casj_qm3", TeamColor::Blue));
        store.push_match_entry(&match_entry("frc33", "not-a-key", TeamColor::Blue));

        let view = engine(&store).event("2020casj").unwrap();
        let keys: Vec<&str> = view.matches.iter().map(|v| v.record.key.as_str()).collect();
        assert_eq!(keys, vec!["2020casj_qm0", "2020casj_qm3"]);

        let qm3 = &view.matches[1];
        assert_eq!(qm3.record.alliances.get(TeamColor::Blue).teams, vec!["frc33"]);
        assert_eq!(qm3.record.alliances.get(TeamColor::Red).teams, vec!["frc254"]);
        assert_eq!(qm3.scouted, vec!["frc254", "frc33"]);
    }

    #[test]
    fn published_schedule_gains_scouted_markers() {
        let mut published = event("2020casj", Some(vec!["frc254"]));
        published.matches = Some(vec![Match {
            key: "2020casj_qm1".into(),
            event_key: "2020casj".into(),
            comp_level: crate::models::CompLevel::Qm,
            match_number: 1,
            set_number: None,
            time: None,
            alliances: Default::default(),
            extra: Default::default(),
        }]);
        let store = store_with_event(&[("frc254", 254)], published);
        store.push_match_entry(&match_entry("frc254", "2020casj_qm1", TeamColor::Blue));

        let view = engine(&store).event("2020casj").unwrap();
        assert_eq!(view.matches[0].scouted, vec!["frc254"]);
        assert_eq!(view.matches[0].record.alliances.get(TeamColor::Blue).teams, vec!["frc254"]);
    }

    #[test]
    fn team_view_narrows_matches_to_the_team() {
        let mut published = event("2020casj", Some(vec!["frc254", "frc33"]));
        let qm = |n: u32, blue: &str| Match {
            key: format!("2020casj_qm{n}"),
            event_key: "2020casj".into(),
            comp_level: crate::models::CompLevel::Qm,
            match_number: n,
            alliances: crate::models::Alliances {
                blue: Alliance { teams: vec![blue.into()], score: 0 },
                red: Alliance::default(),
            },
            ..Default::default()
        };
        published.matches = Some(vec![qm(1, "frc254"), qm(2, "frc33")]);
        let store = store_with_event(&[("frc254", 254)], published);
        store.push_match_entry(&match_entry("frc254", "2020casj_qm1", TeamColor::Blue));

        let view = engine(&store).team("frc254", 2020).unwrap();
        assert_eq!(view.years, vec![2020]);
        assert_eq!(view.events.len(), 1);
        let keys: Vec<&str> =
            view.events[0].matches.iter().map(|v| v.record.key.as_str()).collect();
        assert_eq!(keys, vec!["2020casj_qm1"]);
        assert_eq!(view.events[0].matches[0].scouted, vec!["frc254"]);
    }

    #[test]
    fn event_years_lists_editions_newest_first() {
        let store = store_with_event(&[], event("2019casj", None));
        EventStore::upsert(store.as_ref(), event("2020casj", None), Utc::now());

        let editions = engine(&store).event_years("casj");
        let years: Vec<i32> = editions.iter().map(|e| e.year).collect();
        assert_eq!(years, vec![2020, 2019]);
        assert_eq!(engine(&store).years(), vec![2020, 2019]);
    }

    #[test]
    fn events_stats_counts_coverage() {
        let store = store_with_event(&[("frc254", 254)], event("2020casj", Some(vec!["frc254"])));
        store.push_match_entry(&match_entry("frc254", "2020casj_qm1", TeamColor::Blue));
        store.set_pit(&PitScouting {
            event_key: "2020casj".into(),
            team_key: "frc254".into(),
            data: Map::new(),
        });

        let stats = engine(&store).events_stats(2020);
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].teams_scouted, 1);
        assert_eq!(stats[0].entries, 2);
    }
}
