//! Turns scouting submissions into a per-team stats report.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::models::{number_from_key, Event, ScoutingRecord};
use crate::store::{EventStore, ScoutingCollection};

use super::config::{ScatterSpec, SeasonConfig};
use super::pipeline;

/// Synthetic schedule bounds used when an event has no published matches:
/// scouts may have recorded any plausible match key, so candidates cover the
/// whole space a season can produce.
const SYNTHETIC_QUALS: u32 = 250;
const SYNTHETIC_ELIM_MATCHES: u32 = 8;
const SYNTHETIC_ELIM_SETS: u32 = 3;
const SYNTHETIC_PRACTICE: u32 = 50;

/// Key pit-only submissions are reported under; lives in the practice range
/// so it survives candidate selection without ever colliding with a real
/// match.
fn pit_key(event_key: &str) -> String {
    format!("{event_key}_p1")
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StatsReport {
    /// One row per team, sorted by team number.
    pub individual: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scatter: Option<ScatterReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScatterReport {
    pub axes: Value,
    /// Team number to its `label -> value` map, one value per dataset label.
    pub dataset: BTreeMap<i64, BTreeMap<String, Value>>,
}

pub struct StatsCompiler {
    events: Arc<dyn EventStore>,
    scouting: Arc<dyn ScoutingCollection>,
}

impl StatsCompiler {
    pub fn new(events: Arc<dyn EventStore>, scouting: Arc<dyn ScoutingCollection>) -> StatsCompiler {
        StatsCompiler { events, scouting }
    }

    /// Compile the report for one event.
    ///
    /// `window` narrows each team's entries, taken in schedule order with
    /// pit rows last: 0 keeps them all, +N the first N, -N the last N. A
    /// missing event or season definition yields an empty report.
    pub fn event_stats(
        &self,
        event_key: &str,
        window: i64,
        config: Option<&SeasonConfig>,
    ) -> StatsReport {
        let Some(config) = config else {
            debug!(event_key, "No season stat definition, empty report");
            return StatsReport::default();
        };
        let Some(event) = self.events.find(event_key) else {
            return StatsReport::default();
        };
        let records = self.scouting.find_event(event_key);

        let mut keys = schedule_keys(&event);
        keys.extend((0..SYNTHETIC_PRACTICE).map(|n| format!("{event_key}_p{n}")));

        let rows = build_rows(event_key, &keys, window, &records);
        let mut individual = pipeline::run(&config.individual, rows);
        for row in &mut individual {
            round_numbers(row);
        }
        individual.sort_by(|a, b| {
            pipeline::compare_values(&row_sort_key(a), &row_sort_key(b))
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let scatter = config.scatter.as_ref().map(|spec| scatter_report(spec, &individual));
        debug!(event_key, rows = individual.len(), "Compiled stats report");
        StatsReport { individual, scatter }
    }
}

/// Match keys the report may draw from, in play order. Falls back to a
/// synthetic schedule when the event never published one.
fn schedule_keys(event: &Event) -> Vec<String> {
    match event.matches.as_deref() {
        Some(matches) if !matches.is_empty() => matches.iter().map(|m| m.key.clone()).collect(),
        _ => {
            let mut keys: Vec<String> =
                (0..SYNTHETIC_QUALS).map(|n| format!("{}_qm{}", event.key, n)).collect();
            for level in ["ef", "qf", "sf", "f"] {
                for num in 0..SYNTHETIC_ELIM_MATCHES {
                    for set in 0..SYNTHETIC_ELIM_SETS {
                        keys.push(format!("{}_{}{}m{}", event.key, level, num, set));
                    }
                }
            }
            keys
        }
    }
}

fn window_slice<T>(items: Vec<T>, window: i64) -> Vec<T> {
    if window > 0 {
        let mut items = items;
        items.truncate(window as usize);
        items
    } else if window < 0 {
        let n = window.unsigned_abs() as usize;
        let skip = items.len().saturating_sub(n);
        items.into_iter().skip(skip).collect()
    } else {
        items
    }
}

/// Flatten scouting records into pipeline rows. Each team's entries are put
/// in schedule order, pit row last, then narrowed to the requested window
/// before feeding the pipeline, so order-sensitive accumulators see matches
/// as they were played rather than as they were submitted.
fn build_rows(
    event_key: &str,
    keys: &[String],
    window: i64,
    records: &[ScoutingRecord],
) -> Vec<Value> {
    let position: HashMap<&str, usize> =
        keys.iter().enumerate().map(|(i, k)| (k.as_str(), i)).collect();
    let pit_key = pit_key(event_key);
    let mut rows = Vec::new();

    for record in records {
        let mut team_rows: Vec<(usize, Value)> = record
            .matches
            .iter()
            .filter_map(|entry| {
                position.get(entry.match_key.as_str()).map(|&pos| {
                    (pos, row(event_key, &record.team_key, &entry.match_key, &entry.data))
                })
            })
            .collect();
        if let Some(pit) = &record.pit {
            if let Some(&pos) = position.get(pit_key.as_str()) {
                team_rows.push((pos, row(event_key, &record.team_key, &pit_key, &pit.data)));
            }
        }
        team_rows.sort_by_key(|(pos, _)| *pos);
        rows.extend(window_slice(team_rows, window).into_iter().map(|(_, row)| row));
    }
    rows
}

fn row(event_key: &str, team_key: &str, match_key: &str, data: &Map<String, Value>) -> Value {
    let mut map = Map::new();
    map.insert("event_key".to_string(), Value::from(event_key));
    map.insert("team".to_string(), Value::from(team_key));
    map.insert("team_number".to_string(), Value::from(number_from_key(team_key)));
    map.insert("match_key".to_string(), Value::from(match_key));
    for (name, value) in data {
        map.insert(name.clone(), value.clone());
    }
    Value::Object(map)
}

/// Report rows sort by team number when a projection exposed it, otherwise
/// by the group key.
fn row_sort_key(row: &Value) -> Value {
    match row.get("_team_number") {
        Some(value) if !value.is_null() => value.clone(),
        _ => row.get("_id").cloned().unwrap_or(Value::Null),
    }
}

/// Round every float to two decimals, collapsing integral results back to
/// integers so reports render as `3` rather than `3.0`.
fn round_numbers(value: &mut Value) {
    match value {
        Value::Number(n) => {
            if n.is_f64() {
                if let Some(f) = n.as_f64() {
                    let rounded = (f * 100.0).round() / 100.0;
                    *value = if rounded.fract() == 0.0 && rounded.abs() < 9.0e15 {
                        Value::from(rounded as i64)
                    } else {
                        serde_json::Number::from_f64(rounded).map(Value::Number).unwrap_or(Value::Null)
                    };
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(round_numbers),
        Value::Object(map) => map.values_mut().for_each(round_numbers),
        _ => {}
    }
}

fn scatter_report(spec: &ScatterSpec, individual: &[Value]) -> ScatterReport {
    let mut dataset = BTreeMap::new();
    for row in individual {
        let Some(team_number) = row_sort_key(row).as_i64() else {
            continue;
        };
        let values: BTreeMap<String, Value> = spec
            .dataset
            .iter()
            .map(|(label, path)| (label.clone(), pipeline::lookup(row, path)))
            .collect();
        dataset.insert(team_number, values);
    }
    ScatterReport { axes: spec.axes.clone(), dataset }
}
