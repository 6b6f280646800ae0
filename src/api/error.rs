use thiserror::Error;

/// Errors the remote client can surface.
///
/// 4xx statuses and 304 Not Modified are *not* errors: they come back as empty
/// results so a single missing entity never halts a batch sync. Only
/// `Transient` (after retry exhaustion) propagates out of the engines.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("network error fetching {endpoint} after {attempts} attempts: {source}")]
    Transient {
        endpoint: String,
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    #[error("server error {status} fetching {endpoint} after {attempts} attempts")]
    ServerError { endpoint: String, status: u16, attempts: u32 },

    #[error("invalid response from {endpoint}: {source}")]
    InvalidResponse {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("remote auth key is missing or empty")]
    MissingAuthKey,
}

impl ApiError {
    /// Whether the failure was a retried network/5xx condition.
    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::Transient { .. } | ApiError::ServerError { .. })
    }
}
