use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Partition tag shared by every ranked score.
pub const RANK_PARTITION: &str = "RANK";

/// One submitted result as persisted by the score endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoreEntity {
    /// Fresh identifier assigned on submission.
    pub id: Uuid,
    /// Player name, trimmed and capped.
    pub name: String,
    /// Pairs found, as submitted.
    pub pairs: f64,
    /// Seconds spent, as submitted.
    pub seconds: f64,
    /// RFC 3339 timestamp supplied by the client or stamped by the server.
    pub played_at: String,
    /// Ranking key, higher is better.
    pub score: f64,
    /// Always [`RANK_PARTITION`].
    pub partition: String,
}

impl ScoreEntity {
    /// Build a ranked entity with a fresh identifier.
    pub fn new(name: String, pairs: f64, seconds: f64, played_at: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            pairs,
            seconds,
            played_at,
            score: rank_score(pairs, seconds),
            partition: RANK_PARTITION.to_string(),
        }
    }
}

/// `pairs * 10000 - seconds`, kept within the finite `f64` range.
pub fn rank_score(pairs: f64, seconds: f64) -> f64 {
    (pairs * 10_000.0 - seconds).clamp(f64::MIN, f64::MAX)
}

/// Unsigned key whose numeric order is the order of `score`.
pub fn rank_order(score: f64) -> u64 {
    // Adding zero folds -0.0 into 0.0.
    let bits = (score + 0.0).to_bits();
    if bits >> 63 == 1 { !bits } else { bits | 1 << 63 }
}
