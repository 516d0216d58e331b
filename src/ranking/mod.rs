//! Leaderboard access over a remote score endpoint with a local fallback.
//!
//! The backend is decided once from configuration. When the remote endpoint is configured but
//! fails, the call degrades to the local list and the remote error is handed back in the report
//! so the caller can log or surface it; it is never raised as a failure of its own.

/// Local JSON-file ranking.
pub mod local;
/// HTTP client of the `/scores` endpoint.
pub mod remote;

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing::{debug, warn};

use self::{
    local::{LocalRanking, LocalScore},
    remote::{HttpScoreApi, RemoteError, RemoteResult, ScoreApi, ScoreSubmission},
};

/// Longest player name kept, in characters.
pub const MAX_NAME_CHARS: usize = 50;
/// Entries shown on the leaderboard.
pub const DEFAULT_RANKING_LIMIT: usize = 10;
/// Upper bound accepted by the remote endpoint for one read.
pub const MAX_RANKING_LIMIT: usize = 100;

/// Where scores go, resolved once from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RankingBackend {
    /// Remote endpoint base URL, with the local list as fallback.
    Remote {
        /// Base URL the `/scores` path is appended to.
        endpoint: String,
    },
    /// No endpoint configured; only the local list is used.
    LocalOnly,
}

/// Result of a finished round, as submitted to the leaderboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreRecord {
    /// Trimmed and capped player name.
    pub name: String,
    /// Pairs found.
    pub pairs: u32,
    /// Final time in seconds.
    pub seconds: u64,
    /// When the round ended.
    pub played_at: OffsetDateTime,
}

impl ScoreRecord {
    /// Record a round finished just now.
    pub fn new(name: &str, pairs: u32, seconds: u64) -> Self {
        Self::at(name, pairs, seconds, OffsetDateTime::now_utc())
    }

    /// Record a round finished at `played_at`.
    pub fn at(name: &str, pairs: u32, seconds: u64, played_at: OffsetDateTime) -> Self {
        Self {
            name: normalize_name(name),
            pairs,
            seconds,
            played_at,
        }
    }

    /// Sort key used by the remote store.
    pub fn remote_score(&self) -> i64 {
        i64::from(self.pairs) * 10_000 - i64::try_from(self.seconds).unwrap_or(i64::MAX)
    }

    /// Score stored alongside local entries.
    pub fn local_score(&self) -> i64 {
        i64::from(self.pairs) * 100 - i64::try_from(self.seconds).unwrap_or(i64::MAX)
    }

    /// [`Self::played_at`] as RFC 3339 text.
    pub fn played_at_rfc3339(&self) -> String {
        self.played_at
            .format(&Rfc3339)
            .unwrap_or_else(|_| "invalid-timestamp".into())
    }

    /// Body posted to the remote endpoint.
    pub fn to_submission(&self) -> ScoreSubmission {
        ScoreSubmission {
            name: self.name.clone(),
            pairs: self.pairs,
            seconds: self.seconds,
            played_at: self.played_at_rfc3339(),
        }
    }
}

/// Trim a player name and cap it at [`MAX_NAME_CHARS`].
pub fn normalize_name(raw: &str) -> String {
    raw.trim().chars().take(MAX_NAME_CHARS).collect()
}

/// Backend that produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingSource {
    /// The remote endpoint.
    Remote,
    /// The local file.
    Local,
}

/// Display shape shared by remote and local entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankingEntry {
    /// Player name.
    pub name: String,
    /// Pairs found.
    pub pairs: u32,
    /// Final time in seconds.
    pub seconds: u64,
    /// RFC 3339 timestamp, remote entries only.
    pub played_at: Option<String>,
    /// Calendar date label, local entries only.
    pub date: String,
}

impl RankingEntry {
    /// Normalize a raw `{name, pairs, seconds, playedAt}` item.
    pub fn from_remote(value: &Value) -> Self {
        let played_at = text_field(value, "playedAt");
        Self {
            name: text_field(value, "name"),
            pairs: u32::try_from(count_field(value, "pairs")).unwrap_or(u32::MAX),
            seconds: count_field(value, "seconds"),
            played_at: (!played_at.is_empty()).then_some(played_at),
            date: String::new(),
        }
    }

    /// Normalize a local `{name, pairs, time, date}` entry.
    pub fn from_local(score: &LocalScore) -> Self {
        Self {
            name: score.name.clone(),
            pairs: score.pairs,
            seconds: score.time,
            played_at: None,
            date: score.date.clone(),
        }
    }

    /// Elapsed time as `m:ss`.
    pub fn time_label(&self) -> String {
        format!("{}:{:02}", self.seconds / 60, self.seconds % 60)
    }
}

/// String field of a JSON object, empty when missing or not a string.
pub(crate) fn text_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .unwrap_or_default()
}

/// Non-negative whole number field of a JSON object, zero when missing or malformed.
pub(crate) fn count_field(value: &Value, key: &str) -> u64 {
    let number = match value.get(key) {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    match number {
        Some(number) if number.is_finite() && number > 0.0 => number.trunc() as u64,
        _ => 0,
    }
}

/// Outcome of [`RankingStore::submit`].
#[derive(Debug)]
pub struct SubmitReport {
    /// Backend that took the score.
    pub source: RankingSource,
    /// Remote failure that sent the score to the local list.
    pub fallback: Option<RemoteError>,
    /// False when even the local write failed.
    pub persisted: bool,
}

/// Outcome of [`RankingStore::fetch_top`].
#[derive(Debug)]
pub struct RankingView {
    /// Backend the rows came from.
    pub source: RankingSource,
    /// Remote failure that made the view come from the local list.
    pub fallback: Option<RemoteError>,
    /// Leaderboard rows, best first.
    pub entries: Vec<RankingEntry>,
}

/// Leaderboard facade used by the game controller.
pub struct RankingStore {
    remote: Option<Arc<dyn ScoreApi>>,
    local: LocalRanking,
}

impl RankingStore {
    /// Wire the store for the configured backend.
    pub fn from_backend(backend: &RankingBackend, local: LocalRanking) -> RemoteResult<Self> {
        match backend {
            RankingBackend::Remote { endpoint } => {
                let api = HttpScoreApi::new(endpoint)?;
                Ok(Self::with_remote(Arc::new(api), local))
            }
            RankingBackend::LocalOnly => Ok(Self::local_only(local)),
        }
    }

    /// Use `remote` first and `local` as fallback.
    pub fn with_remote(remote: Arc<dyn ScoreApi>, local: LocalRanking) -> Self {
        Self {
            remote: Some(remote),
            local,
        }
    }

    /// Use only the local list.
    pub fn local_only(local: LocalRanking) -> Self {
        Self {
            remote: None,
            local,
        }
    }

    /// Whether a remote endpoint is configured.
    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Persist one result: remote when configured, local otherwise or when the remote fails.
    pub async fn submit(&self, record: &ScoreRecord) -> SubmitReport {
        let fallback = match &self.remote {
            Some(remote) => match remote.post_score(record.to_submission()).await {
                Ok(()) => {
                    debug!(name = %record.name, pairs = record.pairs, "score submitted remotely");
                    return SubmitReport {
                        source: RankingSource::Remote,
                        fallback: None,
                        persisted: true,
                    };
                }
                Err(err) => {
                    warn!(error = %err, "score submission failed; falling back to local ranking");
                    Some(err)
                }
            },
            None => None,
        };

        let persisted = match self.local.save(record).await {
            Ok(_) => true,
            Err(err) => {
                warn!(error = %err, "failed to save local ranking");
                false
            }
        };

        SubmitReport {
            source: RankingSource::Local,
            fallback,
            persisted,
        }
    }

    /// Best `limit` entries from exactly one backend, best first.
    pub async fn fetch_top(&self, limit: usize) -> RankingView {
        let limit = limit.clamp(1, MAX_RANKING_LIMIT);

        let fallback = match &self.remote {
            Some(remote) => match remote.fetch_scores(limit).await {
                Ok(items) => {
                    return RankingView {
                        source: RankingSource::Remote,
                        fallback: None,
                        entries: items
                            .iter()
                            .take(limit)
                            .map(RankingEntry::from_remote)
                            .collect(),
                    };
                }
                Err(err) => {
                    warn!(error = %err, "ranking fetch failed; falling back to local ranking");
                    Some(err)
                }
            },
            None => None,
        };

        let entries = self
            .local
            .records()
            .await
            .iter()
            .take(limit)
            .map(RankingEntry::from_local)
            .collect();

        RankingView {
            source: RankingSource::Local,
            fallback,
            entries,
        }
    }
}
