//! Bounded leaderboard persisted as JSON on the local machine.

use std::{
    cmp::Ordering,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::{fs, sync::Mutex};
use tracing::warn;

use super::{ScoreRecord, count_field, text_field};

/// Well-known key the list is stored under.
pub const STORAGE_KEY: &str = "memoryGameRanking";
/// Maximum number of entries kept.
pub const LOCAL_CAPACITY: usize = 10;

/// Failures raised while persisting the local leaderboard.
#[derive(Debug, Error)]
pub enum LocalStoreError {
    /// The ranking directory could not be created.
    #[error("failed to create ranking directory `{path}`")]
    CreateDir {
        /// Directory path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The ranking file could not be written or renamed into place.
    #[error("failed to write ranking file `{path}`")]
    Write {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The list could not be serialized.
    #[error("failed to encode ranking list")]
    Encode {
        /// Underlying encode error.
        #[source]
        source: serde_json::Error,
    },
}

/// One entry of the local leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalScore {
    /// Player name.
    pub name: String,
    /// Pairs found.
    pub pairs: u32,
    /// Elapsed seconds.
    pub time: u64,
    /// Calendar date of the round (`YYYY/M/D`).
    pub date: String,
    /// `pairs * 100 - time`; kept for display, not used for ordering.
    pub score: i64,
}

impl LocalScore {
    /// Build the local entry for a finished round.
    pub fn from_record(record: &ScoreRecord) -> Self {
        let date = record.played_at.date();
        Self {
            name: record.name.clone(),
            pairs: record.pairs,
            time: record.seconds,
            date: format!(
                "{}/{}/{}",
                date.year(),
                u8::from(date.month()),
                date.day()
            ),
            score: record.local_score(),
        }
    }

    /// Read an entry leniently: malformed or missing fields fall back to empty/zero.
    pub fn from_value(value: &Value) -> Self {
        let pairs = u32::try_from(count_field(value, "pairs")).unwrap_or(u32::MAX);
        let time = count_field(value, "time");
        Self {
            name: text_field(value, "name"),
            pairs,
            time,
            date: text_field(value, "date"),
            score: value
                .get("score")
                .and_then(Value::as_i64)
                .unwrap_or_else(|| {
                    i64::from(pairs) * 100 - i64::try_from(time).unwrap_or(i64::MAX)
                }),
        }
    }
}

/// Leaderboard order: more pairs first, then less time.
fn ranked_order(a: &LocalScore, b: &LocalScore) -> Ordering {
    b.pairs.cmp(&a.pairs).then(a.time.cmp(&b.time))
}

/// Insert `score` into `list`, keep it ordered and capped at [`LOCAL_CAPACITY`].
pub fn insert_ranked(mut list: Vec<LocalScore>, score: LocalScore) -> Vec<LocalScore> {
    list.push(score);
    list.sort_by(ranked_order);
    list.truncate(LOCAL_CAPACITY);
    list
}

/// Local leaderboard file.
///
/// Every save is a read-modify-write of the whole list behind an in-process gate, written to a
/// temporary file and renamed over the previous one.
pub struct LocalRanking {
    path: PathBuf,
    gate: Mutex<()>,
}

impl LocalRanking {
    /// Keep the leaderboard in `dir`, under [`STORAGE_KEY`].
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(format!("{STORAGE_KEY}.json")),
            gate: Mutex::new(()),
        }
    }

    /// File holding the list.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current list, best first. Unreadable data counts as an empty list.
    pub async fn records(&self) -> Vec<LocalScore> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Vec::new(),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "failed to read local ranking");
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<Value>>(&contents) {
            Ok(items) => items.iter().map(LocalScore::from_value).collect(),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "failed to parse local ranking");
                Vec::new()
            }
        }
    }

    /// Record a finished round and return the updated list.
    pub async fn save(&self, record: &ScoreRecord) -> Result<Vec<LocalScore>, LocalStoreError> {
        let _gate = self.gate.lock().await;

        let list = insert_ranked(self.records().await, LocalScore::from_record(record));
        let encoded =
            serde_json::to_vec(&list).map_err(|source| LocalStoreError::Encode { source })?;

        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)
                .await
                .map_err(|source| LocalStoreError::CreateDir {
                    path: dir.to_path_buf(),
                    source,
                })?;
        }

        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, &encoded)
            .await
            .map_err(|source| LocalStoreError::Write {
                path: staging.clone(),
                source,
            })?;
        fs::rename(&staging, &self.path)
            .await
            .map_err(|source| LocalStoreError::Write {
                path: self.path.clone(),
                source,
            })?;

        Ok(list)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use time::{Date, Month, PrimitiveDateTime, Time};

    use super::*;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("memory-match-local-{}", uuid::Uuid::new_v4()))
    }

    fn entry(pairs: u32, time: u64) -> LocalScore {
        LocalScore {
            name: format!("p{pairs}-{time}"),
            pairs,
            time,
            date: String::new(),
            score: i64::from(pairs) * 100 - time as i64,
        }
    }

    #[test]
    fn ties_on_pairs_break_on_time() {
        let mut list = Vec::new();
        for (pairs, time) in [(3, 10), (5, 20), (5, 15)] {
            list = insert_ranked(list, entry(pairs, time));
        }

        let order: Vec<(u32, u64)> = list.iter().map(|s| (s.pairs, s.time)).collect();
        assert_eq!(order, vec![(5, 15), (5, 20), (3, 10)]);
    }

    #[test]
    fn list_is_capped() {
        let mut list = Vec::new();
        for time in 0..15 {
            list = insert_ranked(list, entry(1, time));
        }
        assert_eq!(list.len(), LOCAL_CAPACITY);
        assert_eq!(list.last().map(|s| s.time), Some(9));
    }

    #[test]
    fn malformed_fields_default_to_zero() {
        let parsed = LocalScore::from_value(&json!({ "name": 12, "pairs": "x", "time": 40 }));
        assert_eq!(parsed.name, "");
        assert_eq!(parsed.pairs, 0);
        assert_eq!(parsed.time, 40);
        assert_eq!(parsed.date, "");
        assert_eq!(parsed.score, -40);
    }

    #[test]
    fn oversized_pairs_saturate() {
        let parsed = LocalScore::from_value(&json!({ "pairs": 5e9, "time": 1 }));
        assert_eq!(parsed.pairs, u32::MAX);
        assert_eq!(parsed.score, i64::from(u32::MAX) * 100 - 1);
    }

    #[test]
    fn record_maps_to_local_shape() {
        let played_at = PrimitiveDateTime::new(
            Date::from_calendar_date(2025, Month::March, 7).unwrap(),
            Time::MIDNIGHT,
        )
        .assume_utc();
        let record = ScoreRecord::at("Aki", 12, 95, played_at);

        let local = LocalScore::from_record(&record);
        assert_eq!(local.date, "2025/3/7");
        assert_eq!(local.time, 95);
        assert_eq!(local.score, 1105);
    }

    #[tokio::test]
    async fn save_round_trips_through_disk() {
        let dir = temp_dir();
        let ranking = LocalRanking::new(&dir);
        assert!(ranking.records().await.is_empty());

        ranking.save(&ScoreRecord::new("a", 3, 10)).await.unwrap();
        ranking.save(&ScoreRecord::new("b", 5, 20)).await.unwrap();
        ranking.save(&ScoreRecord::new("c", 5, 15)).await.unwrap();

        let names: Vec<String> = ranking.records().await.into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["c", "b", "a"]);
        assert!(ranking.path().ends_with("memoryGameRanking.json"));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn corrupt_file_reads_as_empty() {
        let dir = temp_dir();
        std::fs::create_dir_all(&dir).unwrap();
        let ranking = LocalRanking::new(&dir);
        std::fs::write(ranking.path(), b"{not json").unwrap();

        assert!(ranking.records().await.is_empty());
        let list = ranking.save(&ScoreRecord::new("d", 1, 1)).await.unwrap();
        assert_eq!(list.len(), 1);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
