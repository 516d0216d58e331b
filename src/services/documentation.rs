use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification of the score endpoint.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::scores::submit_score,
        crate::routes::scores::list_scores,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::health::HealthStatus,
            crate::dto::score::SubmitScoreRequest,
            crate::dto::score::SubmitScoreResponse,
            crate::dto::score::ScoreItem,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "scores", description = "Leaderboard submission and reads"),
    )
)]
pub struct ApiDoc;
