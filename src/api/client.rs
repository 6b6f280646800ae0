//! HTTP client for the remote authoritative data source.
//!
//! Fetches are conditional when an endpoint has a cached last-modified
//! marker, retried with exponential backoff on network/5xx conditions, and
//! normalized into the internal entity shape before being returned.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use reqwest::{header, Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::ResponseCache;
use crate::config::RemoteConfig;
use crate::models::{Event, Match, Team};

use super::raw::{RawEvent, RawMatch, RawRankings, RawTeam};
use super::{normalize, ApiError};

/// Maximum fetch attempts for a single endpoint. Applied only around the
/// network call; 4xx and 304 outcomes are never retried.
const MAX_FETCH_ATTEMPTS: u32 = 3;

/// Initial backoff delay in milliseconds, doubled after each failed attempt.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Read-side contract of the remote source. The reconciliation engine is
/// generic over this so tests can drive it with a scripted fake.
///
/// `use_cache` asks the source to reply "unchanged" when nothing changed
/// since the prior fetch; an unchanged or missing entity comes back as
/// `None`/empty, indistinguishable from "fetched but absent".
#[allow(async_fn_in_trait)]
pub trait RemoteSource {
    async fn teams_all(&self, use_cache: bool) -> Result<Vec<Team>, ApiError>;
    async fn team(&self, team_key: &str, use_cache: bool) -> Result<Option<Team>, ApiError>;
    async fn team_events(&self, team_key: &str, year: i32, use_cache: bool) -> Result<Vec<Event>, ApiError>;
    async fn team_awards(&self, team_key: &str, use_cache: bool) -> Result<Option<Value>, ApiError>;
    async fn team_districts(&self, team_key: &str, use_cache: bool) -> Result<Option<Value>, ApiError>;
    async fn team_media(&self, team_key: &str, year: i32, use_cache: bool) -> Result<Option<Value>, ApiError>;
    async fn events(&self, year: i32, use_cache: bool) -> Result<Vec<Event>, ApiError>;
    async fn event(&self, event_key: &str, use_cache: bool) -> Result<Option<Event>, ApiError>;
    async fn event_teams(&self, event_key: &str, use_cache: bool) -> Result<Vec<Team>, ApiError>;
    async fn event_matches(&self, event_key: &str, use_cache: bool) -> Result<Vec<Match>, ApiError>;
    async fn event_rankings(&self, event_key: &str, use_cache: bool) -> Result<Option<Value>, ApiError>;
    async fn event_oprs(&self, event_key: &str, use_cache: bool) -> Result<Option<Value>, ApiError>;
    async fn event_awards(&self, event_key: &str, use_cache: bool) -> Result<Option<Value>, ApiError>;
    async fn event_alliances(&self, event_key: &str, use_cache: bool) -> Result<Option<Value>, ApiError>;
}

/// Authenticated client for the remote source.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct RemoteClient {
    client: Client,
    auth_key: String,
    base_url: String,
    cache: Arc<dyn ResponseCache>,
}

impl RemoteClient {
    /// Build a client from injected configuration. The auth key and response
    /// cache are constructed once at startup and shared; there is no implicit
    /// static state.
    pub fn new(config: &RemoteConfig, cache: Arc<dyn ResponseCache>) -> Result<RemoteClient> {
        if config.auth_key.trim().is_empty() {
            return Err(ApiError::MissingAuthKey.into());
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(RemoteClient {
            client,
            auth_key: config.auth_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            cache,
        })
    }

    /// GET an endpoint, returning `None` for "not modified" and client-error
    /// outcomes. Network and 5xx failures are retried with exponential
    /// backoff before surfacing as a transient error.
    async fn get_value(&self, endpoint: &str, use_cache: bool) -> Result<Option<Value>, ApiError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let mut attempts = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            attempts += 1;
            let mut request = self
                .client
                .get(&url)
                .header("X-TBA-Auth-Key", &self.auth_key)
                .header(header::USER_AGENT, "Mozilla/5.0");
            if use_cache {
                if let Some(marker) = self.cache.get(endpoint) {
                    request = request.header(header::IF_MODIFIED_SINCE, marker);
                }
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status == StatusCode::NOT_MODIFIED {
                        debug!(endpoint, "Not modified");
                        return Ok(None);
                    }
                    if status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS {
                        warn!(endpoint, status = status.as_u16(), "Client error, treating as empty");
                        return Ok(None);
                    }
                    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                        if attempts >= MAX_FETCH_ATTEMPTS {
                            return Err(ApiError::ServerError {
                                endpoint: endpoint.to_string(),
                                status: status.as_u16(),
                                attempts,
                            });
                        }
                    } else {
                        let marker = response
                            .headers()
                            .get(header::LAST_MODIFIED)
                            .and_then(|v| v.to_str().ok())
                            .map(str::to_string);
                        match response.text().await {
                            Ok(body) => {
                                let value: Value = serde_json::from_str(&body).map_err(|source| {
                                    ApiError::InvalidResponse {
                                        endpoint: endpoint.to_string(),
                                        source,
                                    }
                                })?;
                                // Only a real 200 refreshes the marker.
                                if let Some(marker) = marker {
                                    self.cache.put(endpoint, &marker);
                                }
                                return Ok(Some(value));
                            }
                            Err(source) => {
                                if attempts >= MAX_FETCH_ATTEMPTS {
                                    return Err(ApiError::Transient {
                                        endpoint: endpoint.to_string(),
                                        attempts,
                                        source,
                                    });
                                }
                            }
                        }
                    }
                }
                Err(source) => {
                    if attempts >= MAX_FETCH_ATTEMPTS {
                        return Err(ApiError::Transient {
                            endpoint: endpoint.to_string(),
                            attempts,
                            source,
                        });
                    }
                }
            }

            warn!(endpoint, attempt = attempts, backoff_ms, "Fetch failed, backing off");
            tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
            backoff_ms *= 2;
        }
    }

    async fn get_list<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        use_cache: bool,
    ) -> Result<Vec<T>, ApiError> {
        match self.get_value(endpoint, use_cache).await? {
            Some(value) => serde_json::from_value(value).map_err(|source| {
                ApiError::InvalidResponse { endpoint: endpoint.to_string(), source }
            }),
            None => Ok(Vec::new()),
        }
    }

    async fn get_one<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        use_cache: bool,
    ) -> Result<Option<T>, ApiError> {
        match self.get_value(endpoint, use_cache).await? {
            Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value).map(Some).map_err(|source| {
                ApiError::InvalidResponse { endpoint: endpoint.to_string(), source }
            }),
            None => Ok(None),
        }
    }

    /// Passthrough sub-resources: keep the payload opaque, drop empties.
    async fn get_passthrough(&self, endpoint: &str, use_cache: bool) -> Result<Option<Value>, ApiError> {
        Ok(self.get_value(endpoint, use_cache).await?.and_then(non_empty))
    }

    /// One page of the full team listing, placeholders dropped.
    pub async fn teams(&self, page: u32, use_cache: bool) -> Result<Vec<Team>, ApiError> {
        let raws: Vec<RawTeam> = self.get_list(&format!("teams/{page}"), use_cache).await?;
        Ok(raws
            .into_iter()
            .filter(|raw| !normalize::is_placeholder_team(raw))
            .map(normalize::team)
            .collect())
    }
}

fn non_empty(value: Value) -> Option<Value> {
    match &value {
        Value::Null => None,
        Value::Array(items) if items.is_empty() => None,
        Value::Object(map) if map.is_empty() => None,
        _ => Some(value),
    }
}

impl RemoteSource for RemoteClient {
    async fn teams_all(&self, use_cache: bool) -> Result<Vec<Team>, ApiError> {
        let mut teams = Vec::new();
        for page in 0.. {
            let listed: Vec<RawTeam> = self.get_list(&format!("teams/{page}"), use_cache).await?;
            if listed.is_empty() {
                break;
            }
            teams.extend(
                listed
                    .into_iter()
                    .filter(|raw| !normalize::is_placeholder_team(raw))
                    .map(normalize::team),
            );
        }
        debug!(count = teams.len(), "Fetched full team listing");
        Ok(teams)
    }

    async fn team(&self, team_key: &str, use_cache: bool) -> Result<Option<Team>, ApiError> {
        let raw: Option<RawTeam> = self.get_one(&format!("team/{team_key}"), use_cache).await?;
        Ok(raw.map(normalize::team))
    }

    async fn team_events(&self, team_key: &str, year: i32, use_cache: bool) -> Result<Vec<Event>, ApiError> {
        let raws: Vec<RawEvent> =
            self.get_list(&format!("team/{team_key}/events/{year}"), use_cache).await?;
        Ok(raws.into_iter().map(normalize::event).collect())
    }

    async fn team_awards(&self, team_key: &str, use_cache: bool) -> Result<Option<Value>, ApiError> {
        self.get_passthrough(&format!("team/{team_key}/awards"), use_cache).await
    }

    async fn team_districts(&self, team_key: &str, use_cache: bool) -> Result<Option<Value>, ApiError> {
        self.get_passthrough(&format!("team/{team_key}/districts"), use_cache).await
    }

    async fn team_media(&self, team_key: &str, year: i32, use_cache: bool) -> Result<Option<Value>, ApiError> {
        self.get_passthrough(&format!("team/{team_key}/media/{year}"), use_cache).await
    }

    async fn events(&self, year: i32, use_cache: bool) -> Result<Vec<Event>, ApiError> {
        let raws: Vec<RawEvent> = self.get_list(&format!("events/{year}"), use_cache).await?;
        Ok(raws.into_iter().map(normalize::event).collect())
    }

    async fn event(&self, event_key: &str, use_cache: bool) -> Result<Option<Event>, ApiError> {
        let raw: Option<RawEvent> = self.get_one(&format!("event/{event_key}"), use_cache).await?;
        Ok(raw.map(normalize::event))
    }

    async fn event_teams(&self, event_key: &str, use_cache: bool) -> Result<Vec<Team>, ApiError> {
        let raws: Vec<RawTeam> =
            self.get_list(&format!("event/{event_key}/teams"), use_cache).await?;
        Ok(raws.into_iter().map(normalize::team).collect())
    }

    async fn event_matches(&self, event_key: &str, use_cache: bool) -> Result<Vec<Match>, ApiError> {
        let raws: Vec<RawMatch> =
            self.get_list(&format!("event/{event_key}/matches"), use_cache).await?;
        let mut matches: Vec<Match> =
            raws.into_iter().filter_map(normalize::match_record).collect();
        // Schedule order, unscheduled matches first.
        matches.sort_by_key(|m| m.time.unwrap_or(0));
        Ok(matches)
    }

    async fn event_rankings(&self, event_key: &str, use_cache: bool) -> Result<Option<Value>, ApiError> {
        let raw: Option<RawRankings> =
            self.get_one(&format!("event/{event_key}/rankings"), use_cache).await?;
        Ok(raw.and_then(normalize::rankings))
    }

    async fn event_oprs(&self, event_key: &str, use_cache: bool) -> Result<Option<Value>, ApiError> {
        self.get_passthrough(&format!("event/{event_key}/oprs"), use_cache).await
    }

    async fn event_awards(&self, event_key: &str, use_cache: bool) -> Result<Option<Value>, ApiError> {
        self.get_passthrough(&format!("event/{event_key}/awards"), use_cache).await
    }

    async fn event_alliances(&self, event_key: &str, use_cache: bool) -> Result<Option<Value>, ApiError> {
        self.get_passthrough(&format!("event/{event_key}/alliances"), use_cache).await
    }
}
