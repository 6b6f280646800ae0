//! Wire shapes as the remote source returns them, before normalization.
//!
//! The endpoint called already determines which shape to expect, so each
//! fetch deserializes into exactly one of these and is then reshaped into the
//! internal entity by `normalize`.

use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct RawTeam {
    pub key: String,
    pub team_number: u32,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state_prov: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub rookie_year: Option<i32>,
    #[serde(default)]
    pub motto: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawDistrict {
    #[serde(default)]
    pub abbreviation: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawEvent {
    pub key: String,
    pub event_code: String,
    #[serde(default)]
    pub name: Option<String>,
    pub year: i32,
    #[serde(default)]
    pub week: Option<i64>,
    #[serde(default)]
    pub event_type: Option<i64>,
    #[serde(default)]
    pub event_type_string: Option<String>,
    #[serde(default)]
    pub district: Option<RawDistrict>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state_prov: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawAlliance {
    #[serde(default)]
    pub team_keys: Vec<String>,
    #[serde(default)]
    pub score: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawAlliances {
    #[serde(default)]
    pub blue: RawAlliance,
    #[serde(default)]
    pub red: RawAlliance,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawMatch {
    pub key: String,
    pub event_key: String,
    pub comp_level: String,
    pub match_number: u32,
    #[serde(default)]
    pub set_number: Option<u32>,
    #[serde(default)]
    pub time: Option<i64>,
    #[serde(default)]
    pub alliances: RawAlliances,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawRankingRecord {
    pub wins: i64,
    pub losses: i64,
    pub ties: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawRanking {
    pub rank: i64,
    pub team_key: String,
    #[serde(default)]
    pub sort_orders: Vec<Value>,
    #[serde(default)]
    pub record: Option<RawRankingRecord>,
    #[serde(default)]
    pub matches_played: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawSortOrderInfo {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawRankings {
    #[serde(default)]
    pub rankings: Vec<RawRanking>,
    #[serde(default)]
    pub sort_order_info: Vec<RawSortOrderInfo>,
}
