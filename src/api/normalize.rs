//! Reshaping of wire records into the internal entity shape.
//!
//! Incoming records are cleaned (whitespace, boilerplate name suffixes,
//! sponsor text) and their address sub-fields are unified into a single
//! `location` string. US state names are mapped to two-letter codes.

use serde_json::{Map, Value};
use tracing::warn;

use crate::models::{Alliance, Alliances, CompLevel, District, Event, Match, MatchKey, Team};

use super::raw::{RawEvent, RawMatch, RawRankings, RawTeam};

/// Full US state/territory names to postal abbreviations.
const US_STATES: [(&str, &str); 55] = [
    ("Alaska", "AK"),
    ("Alabama", "AL"),
    ("Arkansas", "AR"),
    ("American Samoa", "AS"),
    ("Arizona", "AZ"),
    ("California", "CA"),
    ("Colorado", "CO"),
    ("Connecticut", "CT"),
    ("District of Columbia", "DC"),
    ("Delaware", "DE"),
    ("Florida", "FL"),
    ("Georgia", "GA"),
    ("Guam", "GU"),
    ("Hawaii", "HI"),
    ("Iowa", "IA"),
    ("Idaho", "ID"),
    ("Illinois", "IL"),
    ("Indiana", "IN"),
    ("Kansas", "KS"),
    ("Kentucky", "KY"),
    ("Louisiana", "LA"),
    ("Massachusetts", "MA"),
    ("Maryland", "MD"),
    ("Maine", "ME"),
    ("Michigan", "MI"),
    ("Minnesota", "MN"),
    ("Missouri", "MO"),
    ("Northern Mariana Islands", "MP"),
    ("Mississippi", "MS"),
    ("Montana", "MT"),
    ("North Carolina", "NC"),
    ("North Dakota", "ND"),
    ("Nebraska", "NE"),
    ("New Hampshire", "NH"),
    ("New Jersey", "NJ"),
    ("New Mexico", "NM"),
    ("Nevada", "NV"),
    ("New York", "NY"),
    ("Ohio", "OH"),
    ("Oklahoma", "OK"),
    ("Oregon", "OR"),
    ("Pennsylvania", "PA"),
    ("Puerto Rico", "PR"),
    ("Rhode Island", "RI"),
    ("South Carolina", "SC"),
    ("South Dakota", "SD"),
    ("Tennessee", "TN"),
    ("Texas", "TX"),
    ("Utah", "UT"),
    ("Virginia", "VA"),
    ("Virgin Islands", "VI"),
    ("Vermont", "VT"),
    ("Washington", "WA"),
    ("Wisconsin", "WI"),
    ("West Virginia", "WV"),
];

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Strip sponsor boilerplate from an event name and undo the remote source's
/// "... District Event" phrasing.
pub fn clean_event_name(name: &str) -> String {
    let lowered = name.to_lowercase();
    let mut name = match lowered.find("sponsored by") {
        Some(mut at) => {
            if lowered[..at].ends_with("co-") {
                at -= 3;
            }
            name[..at].to_string()
        }
        None => name.to_string(),
    };
    if name.contains("Event") && name.contains("District") {
        name = name.replace(" District", "").replace("Event", "District");
    }
    name.trim().to_string()
}

/// Strip a trailing team number from a nickname, a placeholder the remote
/// source appends when a team never set one.
pub fn clean_nickname(nickname: &str, team_number: u32) -> String {
    let number = team_number.to_string();
    nickname.strip_suffix(number.as_str()).unwrap_or(nickname).trim().to_string()
}

/// Unify address sub-fields into one "city, state postal, country" string.
pub fn location(
    city: Option<&str>,
    state_prov: Option<&str>,
    postal_code: Option<&str>,
    country: Option<&str>,
) -> Option<String> {
    let joined = format!(
        "{}, {} {}, {}",
        city.unwrap_or(""),
        state_prov.unwrap_or(""),
        postal_code.unwrap_or(""),
        country.unwrap_or("")
    );
    let joined = joined.replace("  ", " ").replace(" ,", ",");
    let joined = joined.trim_matches(|c: char| c == ',' || c == ' ');
    (!joined.is_empty()).then(|| joined.to_string())
}

/// Map a full US state/territory name to its two-letter code. Other countries
/// pass through unchanged.
pub fn map_region(country: Option<&str>, state_prov: Option<String>) -> Option<String> {
    let state_prov = state_prov?;
    if country == Some("USA") {
        if let Some((_, code)) = US_STATES.iter().find(|(name, _)| *name == state_prov) {
            return Some((*code).to_string());
        }
    }
    Some(state_prov)
}

/// Listing pages include placeholder teams that never registered a profile;
/// they carry no nickname or a generated "Team {number}" name.
pub fn is_placeholder_team(raw: &RawTeam) -> bool {
    let no_nickname = raw.nickname.as_deref().map_or(true, |n| n.trim().is_empty());
    let generated_name =
        raw.name.as_deref().map(str::trim) == Some(format!("Team {}", raw.team_number).as_str());
    no_nickname || generated_name
}

pub fn team(raw: RawTeam) -> Team {
    let city = trimmed(raw.city);
    let state_prov = map_region(raw.country.as_deref(), trimmed(raw.state_prov));
    let postal_code = trimmed(raw.postal_code);
    let country = trimmed(raw.country);
    let location = location(
        city.as_deref(),
        state_prov.as_deref(),
        postal_code.as_deref(),
        country.as_deref(),
    );
    Team {
        key: raw.key,
        team_number: raw.team_number,
        nickname: trimmed(raw.nickname)
            .map(|n| clean_nickname(&n, raw.team_number))
            .filter(|n| !n.is_empty()),
        name: trimmed(raw.name),
        city,
        state_prov,
        postal_code,
        country,
        location,
        website: trimmed(raw.website),
        rookie_year: raw.rookie_year,
        motto: trimmed(raw.motto),
        awards: None,
        districts: None,
        media: None,
        created_timestamp: None,
        modified_timestamp: None,
        extra: raw.extra,
    }
}

pub fn event(raw: RawEvent) -> Event {
    let city = trimmed(raw.city);
    let state_prov = trimmed(raw.state_prov);
    let postal_code = trimmed(raw.postal_code);
    let country = trimmed(raw.country);
    let location = location(
        city.as_deref(),
        state_prov.as_deref(),
        postal_code.as_deref(),
        country.as_deref(),
    );
    Event {
        key: raw.key,
        event_code: raw.event_code,
        name: trimmed(raw.name).map(|n| clean_event_name(&n)).unwrap_or_default(),
        year: raw.year,
        week: raw.week,
        event_type: raw.event_type,
        event_type_string: trimmed(raw.event_type_string),
        district: raw.district.map(|d| District {
            abbreviation: trimmed(d.abbreviation),
            display_name: trimmed(d.display_name),
        }),
        location,
        venue_address: trimmed(raw.address),
        website: trimmed(raw.website),
        start_date: trimmed(raw.start_date),
        end_date: trimmed(raw.end_date),
        teams: None,
        matches: None,
        rankings: None,
        stats: None,
        awards: None,
        alliances: None,
        created_timestamp: None,
        modified_timestamp: None,
        extra: raw.extra,
    }
}

/// Reshape a raw match. Returns None when the comp level cannot be resolved
/// from either the field or the key; such records are dropped with a warning
/// rather than failing the whole listing.
pub fn match_record(raw: RawMatch) -> Option<Match> {
    let comp_level: CompLevel = match raw.comp_level.parse() {
        Ok(level) => level,
        Err(_) => match MatchKey::parse(&raw.key) {
            Ok(parsed) => parsed.comp_level,
            Err(_) => {
                warn!(key = %raw.key, comp_level = %raw.comp_level, "Dropping match with unknown comp level");
                return None;
            }
        },
    };
    Some(Match {
        key: raw.key,
        event_key: raw.event_key,
        comp_level,
        match_number: raw.match_number,
        set_number: raw.set_number,
        time: raw.time,
        alliances: Alliances {
            blue: Alliance {
                teams: raw.alliances.blue.team_keys,
                score: raw.alliances.blue.score.unwrap_or(0),
            },
            red: Alliance {
                teams: raw.alliances.red.team_keys,
                score: raw.alliances.red.score.unwrap_or(0),
            },
        },
        extra: raw.extra,
    })
}

/// Flatten raw rankings into a per-team map: snake-cased sort-order names,
/// the W-L-T record split into wins/losses/ties, and matches played.
pub fn rankings(raw: RawRankings) -> Option<Value> {
    if raw.rankings.is_empty() {
        return None;
    }
    let names: Vec<String> = raw.sort_order_info.iter().map(|i| snake_case(&i.name)).collect();
    let mut by_team = Map::new();
    for ranking in raw.rankings {
        let mut row = Map::new();
        row.insert("rank".into(), ranking.rank.into());
        row.insert("team".into(), ranking.team_key.clone().into());
        for (name, value) in names.iter().zip(ranking.sort_orders.into_iter()) {
            row.insert(name.clone(), value);
        }
        let record = ranking.record.unwrap_or(super::raw::RawRankingRecord {
            wins: 0,
            losses: 0,
            ties: 0,
        });
        row.insert("wins".into(), record.wins.into());
        row.insert("losses".into(), record.losses.into());
        row.insert("ties".into(), record.ties.into());
        row.insert("played".into(), ranking.matches_played.into());
        by_team.insert(ranking.team_key, Value::Object(row));
    }
    Some(Value::Object(by_team))
}

fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_was_sep = true;
    for c in name.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            out.push(c);
            last_was_sep = false;
        } else if !last_was_sep {
            out.push('_');
            last_was_sep = true;
        }
    }
    out.trim_end_matches('_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn event_name_sponsor_text_collapses() {
        assert_eq!(
            clean_event_name("Silicon Valley Regional sponsored by Google.org"),
            "Silicon Valley Regional"
        );
        assert_eq!(
            clean_event_name("Lake Superior Regional co-sponsored by DuPont"),
            "Lake Superior Regional"
        );
        assert_eq!(clean_event_name("Kettering University #1 Event"), "Kettering University #1 Event");
    }

    #[test]
    fn event_name_district_rename() {
        assert_eq!(clean_event_name("FIM District Kettering Event"), "FIM Kettering District");
    }

    #[test]
    fn nickname_trailing_number_stripped() {
        assert_eq!(clean_nickname("The Holy Cows 1538", 1538), "The Holy Cows");
        assert_eq!(clean_nickname("Team 1538", 254), "Team 1538");
    }

    #[test]
    fn location_joins_and_collapses() {
        assert_eq!(
            location(Some("San Jose"), Some("CA"), Some("95112"), Some("USA")).as_deref(),
            Some("San Jose, CA 95112, USA")
        );
        assert_eq!(
            location(Some("San Jose"), None, None, Some("USA")).as_deref(),
            Some("San Jose,, USA")
        );
        assert_eq!(location(None, None, None, None), None);
    }

    #[test]
    fn region_maps_us_states_only() {
        assert_eq!(map_region(Some("USA"), Some("Michigan".into())).as_deref(), Some("MI"));
        assert_eq!(map_region(Some("USA"), Some("MI".into())).as_deref(), Some("MI"));
        assert_eq!(map_region(Some("Canada"), Some("Ontario".into())).as_deref(), Some("Ontario"));
        assert_eq!(map_region(Some("USA"), None), None);
    }

    #[test]
    fn placeholder_teams_detected() {
        let raw: RawTeam = serde_json::from_value(json!({
            "key": "frc9990", "team_number": 9990, "name": "Team 9990"
        }))
        .unwrap();
        assert!(is_placeholder_team(&raw));

        let raw: RawTeam = serde_json::from_value(json!({
            "key": "frc254", "team_number": 254,
            "nickname": "The Cheesy Poofs", "name": "NASA Ames Research Center & Team 254"
        }))
        .unwrap();
        assert!(!is_placeholder_team(&raw));
    }

    #[test]
    fn rankings_flatten_per_team() {
        let raw: RawRankings = serde_json::from_value(json!({
            "rankings": [{
                "rank": 1,
                "team_key": "frc254",
                "sort_orders": [2.0, 100.5],
                "record": {"wins": 10, "losses": 0, "ties": 1},
                "matches_played": 11
            }],
            "sort_order_info": [{"name": "Ranking Score"}, {"name": "Avg Match"}]
        }))
        .unwrap();
        let value = rankings(raw).unwrap();
        let row = &value["frc254"];
        assert_eq!(row["rank"], json!(1));
        assert_eq!(row["ranking_score"], json!(2.0));
        assert_eq!(row["avg_match"], json!(100.5));
        assert_eq!(row["wins"], json!(10));
        assert_eq!(row["ties"], json!(1));
        assert_eq!(row["played"], json!(11));
    }

    #[test]
    fn empty_rankings_are_absent() {
        let raw: RawRankings = serde_json::from_value(json!({})).unwrap();
        assert!(rankings(raw).is_none());
    }

    #[test]
    fn match_with_unknown_level_is_dropped() {
        let raw: RawMatch = serde_json::from_value(json!({
            "key": "2020casj_xx1", "event_key": "2020casj",
            "comp_level": "xx", "match_number": 1
        }))
        .unwrap();
        assert!(match_record(raw).is_none());
    }
}
