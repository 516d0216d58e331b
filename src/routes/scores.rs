use axum::{
    Json, Router,
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
    routing::get,
};

use crate::{
    dto::score::{ScoreItem, ScoresQuery, SubmitScoreRequest, SubmitScoreResponse},
    error::AppError,
    services::score_service,
    state::SharedState,
};

/// Routes of the leaderboard endpoint.
pub fn router() -> Router<SharedState> {
    Router::new().route(
        "/scores",
        get(list_scores).post(submit_score).options(preflight),
    )
}

/// Store one finished round.
#[utoipa::path(
    post,
    path = "/scores",
    tag = "scores",
    request_body = SubmitScoreRequest,
    responses(
        (status = 201, description = "Score stored", body = SubmitScoreResponse),
        (status = 400, description = "Invalid input")
    )
)]
pub async fn submit_score(
    State(state): State<SharedState>,
    payload: Result<Json<SubmitScoreRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SubmitScoreResponse>), AppError> {
    let Json(payload) = payload?;
    score_service::submit_score(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(SubmitScoreResponse { ok: true })))
}

/// Best scores, highest first.
#[utoipa::path(
    get,
    path = "/scores",
    tag = "scores",
    params(ScoresQuery),
    responses(
        (status = 200, description = "Leaderboard rows", body = [ScoreItem])
    )
)]
pub async fn list_scores(
    State(state): State<SharedState>,
    Query(query): Query<ScoresQuery>,
) -> Result<Json<Vec<ScoreItem>>, AppError> {
    Ok(Json(score_service::top_scores(&state, query).await?))
}

/// Plain `OPTIONS` succeeds with an empty body; real preflights are answered by the CORS layer.
async fn preflight() -> StatusCode {
    StatusCode::OK
}
