use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A local replica of a remote team record.
///
/// Mutated only by the reconciliation engine; the merge engine and stats
/// compiler read it. `created_timestamp`/`modified_timestamp` are stamped by
/// the store on upsert, never by callers.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Team {
    pub key: String,
    pub team_number: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_prov: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// Unified "city, state postal, country" string built at normalization time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rookie_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub motto: Option<String>,
    /// Award history, fetched as a sub-resource on a single-team sync.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub awards: Option<Value>,
    /// District membership keyed by year.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub districts: Option<Value>,
    /// Media keyed by media type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_timestamp: Option<DateTime<Utc>>,
    /// Remote fields the replica does not model explicitly.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Team {
    /// Overlay a freshly fetched team onto this stored one, applying only
    /// present/non-empty fields. Applying a team with every optional field
    /// absent is the identity, so an empty fetch never erases stored data.
    pub fn apply(&mut self, fetched: Team) {
        self.key = fetched.key;
        self.team_number = fetched.team_number;
        apply_opt(&mut self.nickname, fetched.nickname);
        apply_opt(&mut self.name, fetched.name);
        apply_opt(&mut self.city, fetched.city);
        apply_opt(&mut self.state_prov, fetched.state_prov);
        apply_opt(&mut self.postal_code, fetched.postal_code);
        apply_opt(&mut self.country, fetched.country);
        apply_opt(&mut self.location, fetched.location);
        apply_opt(&mut self.website, fetched.website);
        apply_opt(&mut self.rookie_year, fetched.rookie_year);
        apply_opt(&mut self.motto, fetched.motto);
        apply_opt(&mut self.awards, fetched.awards);
        apply_opt(&mut self.districts, fetched.districts);
        apply_opt(&mut self.media, fetched.media);
        if !fetched.extra.is_empty() {
            self.extra.extend(fetched.extra);
        }
    }
}

/// Overwrite `stored` only when the fetched value is present.
pub(crate) fn apply_opt<T>(stored: &mut Option<T>, fetched: Option<T>) {
    if fetched.is_some() {
        *stored = fetched;
    }
}

/// Best-effort team number from a `frc###` key, 0 when none is embedded.
pub fn number_from_key(key: &str) -> u32 {
    key.chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect::<String>()
        .parse()
        .unwrap_or(0)
}
