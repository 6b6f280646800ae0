use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::team::apply_opt;

/// Competition stage, ordered qualification first, finals last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CompLevel {
    #[default]
    Qm,
    Ef,
    Qf,
    Sf,
    F,
}

impl CompLevel {
    pub fn rank(self) -> u64 {
        match self {
            CompLevel::Qm => 0,
            CompLevel::Ef => 1,
            CompLevel::Qf => 2,
            CompLevel::Sf => 3,
            CompLevel::F => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CompLevel::Qm => "qm",
            CompLevel::Ef => "ef",
            CompLevel::Qf => "qf",
            CompLevel::Sf => "sf",
            CompLevel::F => "f",
        }
    }
}

impl FromStr for CompLevel {
    type Err = MalformedKey;

    fn from_str(s: &str) -> Result<Self, MalformedKey> {
        match s {
            "qm" => Ok(CompLevel::Qm),
            "ef" => Ok(CompLevel::Ef),
            "qf" => Ok(CompLevel::Qf),
            "sf" => Ok(CompLevel::Sf),
            "f" => Ok(CompLevel::F),
            _ => Err(MalformedKey),
        }
    }
}

/// A match key that does not follow the `{event}_{level}{num}[m{set}]` grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("malformed match key")]
pub struct MalformedKey;

/// Parsed form of a match key, e.g. `"2020casj_sf2m1"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchKey {
    pub event_key: String,
    pub comp_level: CompLevel,
    pub match_number: u32,
    pub set_number: Option<u32>,
}

impl MatchKey {
    pub fn parse(key: &str) -> Result<MatchKey, MalformedKey> {
        let (event_key, rest) = key.split_once('_').ok_or(MalformedKey)?;
        if event_key.is_empty() {
            return Err(MalformedKey);
        }
        let level_len = rest.chars().take_while(|c| c.is_ascii_alphabetic()).count();
        let comp_level: CompLevel = rest[..level_len].parse()?;
        let digits: String = rest[level_len..].chars().take_while(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            return Err(MalformedKey);
        }
        let match_number: u32 = digits.parse().map_err(|_| MalformedKey)?;
        let tail = &rest[level_len + digits.len()..];
        let set_number = match tail.strip_prefix('m') {
            None if tail.is_empty() => None,
            Some(set) if !set.is_empty() && set.chars().all(|c| c.is_ascii_digit()) => {
                Some(set.parse().map_err(|_| MalformedKey)?)
            }
            _ => return Err(MalformedKey),
        };
        Ok(MatchKey {
            event_key: event_key.to_string(),
            comp_level,
            match_number,
            set_number,
        })
    }

    /// Parse a key, degrading to the `{event_key}_qm0` placeholder when the
    /// key does not follow the grammar. Poorly-formatted submissions are
    /// quietly accepted rather than rejected.
    pub fn parse_or_placeholder(key: &str, event_key: &str) -> MatchKey {
        MatchKey::parse(key).unwrap_or_else(|MalformedKey| MatchKey {
            event_key: event_key.to_string(),
            comp_level: CompLevel::Qm,
            match_number: 0,
            set_number: None,
        })
    }

    /// Canonical ordering: comp level dominates match number dominates set
    /// number, so qualification always sorts before eliminations.
    pub fn sort_key(&self) -> u64 {
        sort_key(self.comp_level, self.match_number, self.set_number)
    }
}

pub fn sort_key(comp_level: CompLevel, match_number: u32, set_number: Option<u32>) -> u64 {
    comp_level.rank() * 1_000_000 + u64::from(match_number) * 1_000 + u64::from(set_number.unwrap_or(0))
}

impl std::fmt::Display for MatchKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}{}", self.event_key, self.comp_level.as_str(), self.match_number)?;
        if let Some(set) = self.set_number {
            write!(f, "m{}", set)?;
        }
        Ok(())
    }
}

/// One of the two competing groups of teams in a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamColor {
    Blue,
    Red,
}

impl TeamColor {
    pub const ALL: [TeamColor; 2] = [TeamColor::Blue, TeamColor::Red];
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Alliance {
    #[serde(default)]
    pub teams: Vec<String>,
    #[serde(default)]
    pub score: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Alliances {
    pub blue: Alliance,
    pub red: Alliance,
}

impl Alliances {
    pub fn get(&self, color: TeamColor) -> &Alliance {
        match color {
            TeamColor::Blue => &self.blue,
            TeamColor::Red => &self.red,
        }
    }

    pub fn get_mut(&mut self, color: TeamColor) -> &mut Alliance {
        match color {
            TeamColor::Blue => &mut self.blue,
            TeamColor::Red => &mut self.red,
        }
    }

    pub fn contains(&self, team_key: &str) -> bool {
        self.blue.teams.iter().any(|t| t == team_key) || self.red.teams.iter().any(|t| t == team_key)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Match {
    pub key: String,
    pub event_key: String,
    pub comp_level: CompLevel,
    pub match_number: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub set_number: Option<u32>,
    /// Scheduled time, epoch seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<i64>,
    pub alliances: Alliances,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Match {
    pub fn sort_key(&self) -> u64 {
        sort_key(self.comp_level, self.match_number, self.set_number)
    }
}

/// District membership copied out of the remote source's nested object.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct District {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abbreviation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// A local replica of a remote event record.
///
/// `teams` and `matches` are authoritative when present; absence means "not
/// yet known from the remote source", not "empty".
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Event {
    pub key: String,
    pub event_code: String,
    pub name: String,
    pub year: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub week: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_type: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_type_string: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district: Option<District>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub venue_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    /// Official roster, sorted team keys.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teams: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matches: Option<Vec<Match>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rankings: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub awards: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alliances: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_timestamp: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Event {
    /// Overlay a freshly fetched event, applying only present/non-empty
    /// fields. A fetch that came back empty leaves the stored record intact.
    pub fn apply(&mut self, fetched: Event) {
        self.key = fetched.key;
        self.event_code = fetched.event_code;
        if !fetched.name.is_empty() {
            self.name = fetched.name;
        }
        self.year = fetched.year;
        apply_opt(&mut self.week, fetched.week);
        apply_opt(&mut self.event_type, fetched.event_type);
        apply_opt(&mut self.event_type_string, fetched.event_type_string);
        apply_opt(&mut self.district, fetched.district);
        apply_opt(&mut self.location, fetched.location);
        apply_opt(&mut self.venue_address, fetched.venue_address);
        apply_opt(&mut self.website, fetched.website);
        apply_opt(&mut self.start_date, fetched.start_date);
        apply_opt(&mut self.end_date, fetched.end_date);
        if fetched.teams.as_ref().is_some_and(|t| !t.is_empty()) {
            self.teams = fetched.teams;
        }
        if fetched.matches.as_ref().is_some_and(|m| !m.is_empty()) {
            self.matches = fetched.matches;
        }
        apply_opt(&mut self.rankings, fetched.rankings);
        apply_opt(&mut self.stats, fetched.stats);
        apply_opt(&mut self.awards, fetched.awards);
        apply_opt(&mut self.alliances, fetched.alliances);
        if !fetched.extra.is_empty() {
            self.extra.extend(fetched.extra);
        }
    }

    /// Whether the event has begun, judged by its start date. Events with a
    /// missing or unparseable start date are treated as started, matching the
    /// remote source's behavior for TBD schedules.
    pub fn has_started(&self, today: NaiveDate) -> bool {
        match self.start_date.as_deref() {
            Some(date) if !date.is_empty() => match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
                Ok(start) => start <= today,
                Err(_) => true,
            },
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_key_parses_all_forms() {
        let qm = MatchKey::parse("2020casj_qm12").unwrap();
        assert_eq!(qm.comp_level, CompLevel::Qm);
        assert_eq!(qm.match_number, 12);
        assert_eq!(qm.set_number, None);

        let sf = MatchKey::parse("2020casj_sf2m1").unwrap();
        assert_eq!(sf.comp_level, CompLevel::Sf);
        assert_eq!(sf.match_number, 2);
        assert_eq!(sf.set_number, Some(1));
        assert_eq!(sf.to_string(), "2020casj_sf2m1");
    }

    #[test]
    fn match_key_rejects_bad_grammar() {
        assert!(MatchKey::parse("2020casj").is_err());
        assert!(MatchKey::parse("2020casj_").is_err());
        assert!(MatchKey::parse("2020casj_zz1").is_err());
        assert!(MatchKey::parse("2020casj_qm").is_err());
        assert!(MatchKey::parse("2020casj_qm1m").is_err());
        assert!(MatchKey::parse("2020casj_p3").is_err()); // practice slots never parse
    }

    #[test]
    fn malformed_keys_coerce_to_placeholder() {
        let key = MatchKey::parse_or_placeholder("garbage", "2020casj");
        assert_eq!(key.to_string(), "2020casj_qm0");
    }

    #[test]
    fn sort_key_values() {
        assert_eq!(MatchKey::parse("2020casj_qm5").unwrap().sort_key(), 5_000);
        assert_eq!(MatchKey::parse("2020casj_sf2m1").unwrap().sort_key(), 3_002_001);
    }

    #[test]
    fn sort_key_orders_levels_before_numbers() {
        let mut keys = vec!["2020casj_f1m1", "2020casj_qm12", "2020casj_sf1m1"];
        keys.sort_by_key(|k| MatchKey::parse(k).unwrap().sort_key());
        assert_eq!(keys, vec!["2020casj_qm12", "2020casj_sf1m1", "2020casj_f1m1"]);
    }

    #[test]
    fn apply_never_clears_authoritative_lists() {
        let mut event = Event {
            key: "2020casj".into(),
            event_code: "casj".into(),
            name: "Silicon Valley Regional".into(),
            year: 2020,
            teams: Some(vec!["frc254".into()]),
            ..Default::default()
        };
        event.apply(Event {
            key: "2020casj".into(),
            event_code: "casj".into(),
            name: "Silicon Valley Regional".into(),
            year: 2020,
            website: Some("https://example.org".into()),
            ..Default::default()
        });
        assert_eq!(event.teams, Some(vec!["frc254".to_string()]));
        assert_eq!(event.website.as_deref(), Some("https://example.org"));
    }

    #[test]
    fn has_started_gates_on_start_date() {
        let today = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        let mut event = Event { start_date: Some("2020-02-27".into()), ..Default::default() };
        assert!(event.has_started(today));
        event.start_date = Some("2020-03-01".into());
        assert!(event.has_started(today));
        event.start_date = Some("2020-03-02".into());
        assert!(!event.has_started(today));
        event.start_date = None;
        assert!(event.has_started(today));
    }
}
