//! DTOs of the `/scores` endpoint.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationErrors};

use crate::{
    dao::models::ScoreEntity,
    dto::validation::{json_number, number_of, validate_count, validate_player_name},
};

/// Result submitted at the end of a round.
///
/// Fields are read loosely: scalars are coerced to the expected type and only the final
/// values are validated.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitScoreRequest {
    /// Player name; numbers and booleans are taken as their text.
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub name: Option<Value>,
    /// Pairs found; missing counts as zero.
    #[serde(default)]
    #[schema(value_type = Option<f64>)]
    pub pairs: Option<Value>,
    /// Seconds spent; missing counts as zero.
    #[serde(default)]
    #[schema(value_type = Option<f64>)]
    pub seconds: Option<Value>,
    /// RFC 3339 timestamp; the server clock is used when absent or empty.
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub played_at: Option<Value>,
}

impl SubmitScoreRequest {
    /// Submitted name as text, empty when absent.
    pub fn name(&self) -> String {
        self.name.as_ref().map(text_of).unwrap_or_default()
    }

    /// Submitted pair count, zero when absent or unreadable.
    pub fn pairs(&self) -> f64 {
        self.pairs.as_ref().and_then(number_of).unwrap_or(0.0)
    }

    /// Submitted duration in seconds, zero when absent or unreadable.
    pub fn seconds(&self) -> f64 {
        self.seconds.as_ref().and_then(number_of).unwrap_or(0.0)
    }

    /// Submitted timestamp, `None` when absent or empty.
    pub fn played_at(&self) -> Option<String> {
        let played_at = self.played_at.as_ref().map(text_of)?;
        let played_at = played_at.trim();
        (!played_at.is_empty()).then(|| played_at.to_string())
    }
}

fn text_of(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

impl Validate for SubmitScoreRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(e) = validate_player_name(&self.name()) {
            errors.add("name", e);
        }
        if let Some(Err(e)) = self.pairs.as_ref().map(validate_count) {
            errors.add("pairs", e);
        }
        if let Some(Err(e)) = self.seconds.as_ref().map(validate_count) {
            errors.add("seconds", e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Acknowledgement of a stored score.
#[derive(Debug, Serialize, ToSchema)]
pub struct SubmitScoreResponse {
    /// Always `true` once stored.
    pub ok: bool,
}

/// One leaderboard row.
#[derive(Debug, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScoreItem {
    /// Player name.
    pub name: String,
    /// Pairs found.
    #[schema(value_type = f64)]
    pub pairs: Number,
    /// Seconds spent.
    #[schema(value_type = f64)]
    pub seconds: Number,
    /// When the round was played.
    pub played_at: String,
}

impl From<ScoreEntity> for ScoreItem {
    fn from(entity: ScoreEntity) -> Self {
        Self {
            name: entity.name,
            pairs: json_number(entity.pairs),
            seconds: json_number(entity.seconds),
            played_at: entity.played_at,
        }
    }
}

/// Query of `GET /scores`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ScoresQuery {
    /// Number of rows, clamped to 1..=100; defaults to 10 when absent or unparsable.
    pub limit: Option<String>,
}
