use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing::info;
use validator::Validate;

use crate::{
    dao::models::ScoreEntity,
    dto::score::{ScoreItem, ScoresQuery, SubmitScoreRequest},
    error::ServiceError,
    ranking::{DEFAULT_RANKING_LIMIT, MAX_RANKING_LIMIT, normalize_name},
    state::SharedState,
};

/// Validate and persist one submitted result.
pub async fn submit_score(
    state: &SharedState,
    request: SubmitScoreRequest,
) -> Result<ScoreEntity, ServiceError> {
    request.validate()?;

    let played_at = request.played_at().unwrap_or_else(now_rfc3339);
    let entity = ScoreEntity::new(
        normalize_name(&request.name()),
        request.pairs(),
        request.seconds(),
        played_at,
    );

    let store = state.require_score_store().await?;
    store.put_score(entity.clone()).await?;
    info!(id = %entity.id, name = %entity.name, score = entity.score, "score stored");

    Ok(entity)
}

/// Best scores, highest first.
pub async fn top_scores(
    state: &SharedState,
    query: ScoresQuery,
) -> Result<Vec<ScoreItem>, ServiceError> {
    let limit = parse_limit(query.limit.as_deref());
    let store = state.require_score_store().await?;
    let scores = store.top_scores(limit).await?;
    Ok(scores.into_iter().take(limit).map(ScoreItem::from).collect())
}

/// Requested row count clamped to `1..=100`; absent or unparsable values give the default.
pub fn parse_limit(raw: Option<&str>) -> usize {
    let Some(requested) = raw.and_then(|raw| raw.trim().parse::<f64>().ok()) else {
        return DEFAULT_RANKING_LIMIT;
    };
    if requested.is_nan() {
        return DEFAULT_RANKING_LIMIT;
    }
    requested.clamp(1.0, MAX_RANKING_LIMIT as f64) as usize
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}
