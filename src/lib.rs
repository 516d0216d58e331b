//! Memory-match game core and its leaderboard service, exposed for binaries and integration tests.

/// Application configuration loaded from disk and environment.
pub mod config;
/// Score persistence layer.
pub mod dao;
/// Request and response shapes of the HTTP API.
pub mod dto;
/// Service and HTTP error types.
pub mod error;
/// Deck, timer, match engine and round controller.
pub mod game;
/// Leaderboard storage with remote and local backends.
pub mod ranking;
/// HTTP routes.
pub mod routes;
/// Business logic behind the routes.
pub mod services;
/// Shared application state.
pub mod state;
