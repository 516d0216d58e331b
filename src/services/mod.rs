/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Score submission and leaderboard reads.
pub mod score_service;
/// Background connection supervisor for the score database.
pub mod storage_supervisor;
