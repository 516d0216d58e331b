use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::dao::models::{ScoreEntity, rank_order};

/// Prefix of every ranked score document id.
pub const RANK_PREFIX: &str = "rank::";
/// Upper bound appended to a prefix for `_all_docs` range scans.
pub const END_SUFFIX: &str = "\u{ffff}";

#[derive(Debug, Deserialize)]
pub struct AllDocsResponse {
    pub rows: Vec<AllDocsRow>,
}

#[derive(Debug, Deserialize)]
pub struct AllDocsRow {
    pub id: String,
    #[serde(default)]
    pub doc: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchScoreDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub score: ScoreBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreBody {
    pub score_id: Uuid,
    pub name: String,
    pub pairs: f64,
    pub seconds: f64,
    #[serde(rename = "playedAt")]
    pub played_at: String,
    pub score: f64,
    pub partition: String,
}

impl From<ScoreEntity> for CouchScoreDocument {
    fn from(entity: ScoreEntity) -> Self {
        Self {
            id: rank_doc_id(entity.score, entity.id),
            rev: None,
            score: ScoreBody {
                score_id: entity.id,
                name: entity.name,
                pairs: entity.pairs,
                seconds: entity.seconds,
                played_at: entity.played_at,
                score: entity.score,
                partition: entity.partition,
            },
        }
    }
}

impl CouchScoreDocument {
    pub fn into_entity(self) -> ScoreEntity {
        ScoreEntity {
            id: self.score.score_id,
            name: self.score.name,
            pairs: self.score.pairs,
            seconds: self.score.seconds,
            played_at: self.score.played_at,
            score: self.score.score,
            partition: self.score.partition,
        }
    }
}

/// Document id whose ascending order is descending score order.
///
/// The inverted [`rank_order`] key is zero-padded so that lexical and numeric order agree.
pub fn rank_doc_id(score: f64, id: Uuid) -> String {
    let inverted = !rank_order(score);
    format!("{RANK_PREFIX}{inverted:020}::{id}")
}
