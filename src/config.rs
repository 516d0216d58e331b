//! Application-level configuration loading: board layout, timings and the ranking backend.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::ranking::RankingBackend;

/// Default location on disk where the game looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "MEMORY_MATCH_CONFIG_PATH";
/// Environment variable that overrides the ranking endpoint from the file.
const SCORES_API_ENV: &str = "SCORES_API_BASE";
const DEFAULT_RANKING_DIR: &str = "data";
const DEFAULT_ASSETS_DIR: &str = "images";

/// Board layout and timings of a round.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Round length in seconds.
    pub time_limit_secs: u64,
    /// Pairs dealt per round.
    pub total_pairs: usize,
    /// Number of distinct images available to pick pairs from.
    pub total_images: usize,
    /// Rows of the board.
    pub grid_rows: usize,
    /// Columns of the board.
    pub grid_cols: usize,
    /// Delay between the second flip and the match decision.
    pub flip_delay_ms: u64,
    /// Length of the pre-round countdown; zero starts immediately.
    pub countdown_secs: u8,
}

impl GameConfig {
    /// Cards on the board.
    pub fn total_cards(&self) -> usize {
        self.grid_rows * self.grid_cols
    }

    /// [`Self::flip_delay_ms`] as a [`Duration`].
    pub fn flip_delay(&self) -> Duration {
        Duration::from_millis(self.flip_delay_ms)
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            time_limit_secs: 300,
            total_pairs: 16,
            total_images: 16,
            grid_rows: 4,
            grid_cols: 8,
            flip_delay_ms: 700,
            countdown_secs: 3,
        }
    }
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Board layout and timings.
    pub game: GameConfig,
    /// Where scores are submitted and read from.
    pub ranking: RankingBackend,
    /// Directory holding the local leaderboard file.
    pub ranking_dir: PathBuf,
    /// Directory holding the `NN.png` card images.
    pub assets_dir: PathBuf,
}

impl AppConfig {
    /// Load the configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let raw = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    info!(path = %path.display(), "loaded game config");
                    raw
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    RawConfig::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                RawConfig::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                RawConfig::default()
            }
        };

        raw.resolve(env::var(SCORES_API_ENV).ok())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        RawConfig::default().resolve(None)
    }
}

#[derive(Debug, Default, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    game: GameConfig,
    #[serde(default)]
    ranking: RawRanking,
    #[serde(default)]
    assets_dir: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawRanking {
    /// Base URL of the score endpoint; empty or absent means local only.
    #[serde(default)]
    endpoint: Option<String>,
    #[serde(default)]
    local_dir: Option<String>,
}

impl RawConfig {
    /// Settle the backend once; the environment wins over the file.
    fn resolve(self, endpoint_override: Option<String>) -> AppConfig {
        let endpoint = endpoint_override
            .or(self.ranking.endpoint)
            .map(|endpoint| endpoint.trim().to_string())
            .filter(|endpoint| !endpoint.is_empty());

        let ranking = match endpoint {
            Some(endpoint) => RankingBackend::Remote { endpoint },
            None => RankingBackend::LocalOnly,
        };

        AppConfig {
            game: self.game,
            ranking,
            ranking_dir: PathBuf::from(
                self.ranking
                    .local_dir
                    .unwrap_or_else(|| DEFAULT_RANKING_DIR.into()),
            ),
            assets_dir: PathBuf::from(
                self.assets_dir
                    .unwrap_or_else(|| DEFAULT_ASSETS_DIR.into()),
            ),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
