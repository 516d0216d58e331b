//! Headless round played by a perfect-memory bot, printing every game notice.
//!
//! Usage: `autoplay [PLAYER_NAME]`. Scores go to the configured ranking backend.

use std::{collections::HashMap, env, path::Path};

use anyhow::{Context, bail};
use tokio::sync::broadcast::{Receiver, error::RecvError};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use memory_match::{
    config::AppConfig,
    game::{
        FlipOutcome, GameController, GameNotice, StartOutcome,
        deck::{Card, CardFace, card_face},
        timer::format_clock,
    },
    ranking::{RankingStore, local::LocalRanking},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let name = env::args().nth(1).unwrap_or_else(|| "autoplay".into());
    let config = AppConfig::load();
    let ranking =
        RankingStore::from_backend(&config.ranking, LocalRanking::new(&config.ranking_dir))
            .context("building ranking client")?;
    let controller = GameController::new(config.game.clone(), ranking);
    let mut notices = controller.subscribe();

    let outcome = controller
        .start_game(&name, |player| {
            info!(%player, "starting round");
            true
        })
        .await
        .context("starting round")?;
    if outcome != StartOutcome::Started {
        bail!("round did not start: {outcome:?}");
    }

    let mut bot = Bot::default();
    while controller.state().is_playing {
        let Some(first) = bot.pick_first(&controller.state().cards) else {
            break;
        };
        if !bot.flip(&controller, first) {
            break;
        }
        let Some(second) = bot.pick_second(&controller.state().cards, first) else {
            break;
        };
        if !bot.flip(&controller, second) {
            break;
        }

        let ended = drain_until(&mut notices, &config.assets_dir, |notice| {
            matches!(
                notice,
                GameNotice::PairMatched { .. }
                    | GameNotice::PairMismatched { .. }
                    | GameNotice::RoundEnded { .. }
            )
        })
        .await;
        if ended.is_none() {
            break;
        }
    }

    drain_until(&mut notices, &config.assets_dir, |notice| {
        matches!(notice, GameNotice::RankingUpdated { .. })
    })
    .await;

    Ok(())
}

/// Remembers every face it has seen.
#[derive(Default)]
struct Bot {
    seen: HashMap<usize, u32>,
}

impl Bot {
    fn flip(&mut self, controller: &GameController, index: usize) -> bool {
        if matches!(controller.flip(index), FlipOutcome::Ignored(_)) {
            return false;
        }
        if let Some(card) = controller.state().cards.get(index) {
            self.seen.insert(index, card.image_id);
        }
        true
    }

    /// A card of a known pair first, an unknown card otherwise.
    fn pick_first(&self, cards: &[Card]) -> Option<usize> {
        self.known_pair(cards)
            .map(|(first, _)| first)
            .or_else(|| self.unknown(cards, None))
    }

    /// The partner of `first` when it is known, an unknown card otherwise.
    fn pick_second(&self, cards: &[Card], first: usize) -> Option<usize> {
        let image_id = self.seen.get(&first)?;
        self.seen
            .iter()
            .find(|(index, seen)| {
                **index != first && *seen == image_id && !cards[**index].is_matched
            })
            .map(|(index, _)| *index)
            .or_else(|| self.unknown(cards, Some(first)))
    }

    fn known_pair(&self, cards: &[Card]) -> Option<(usize, usize)> {
        let mut by_image: HashMap<u32, usize> = HashMap::new();
        for (index, image_id) in &self.seen {
            if cards[*index].is_matched {
                continue;
            }
            if let Some(other) = by_image.insert(*image_id, *index) {
                return Some((other, *index));
            }
        }
        None
    }

    fn unknown(&self, cards: &[Card], except: Option<usize>) -> Option<usize> {
        cards.iter().position(|card| {
            let index = card.position.index;
            !card.is_matched && !self.seen.contains_key(&index) && Some(index) != except
        })
    }
}

/// Print notices until one matches `stop`; `None` when the channel closed.
async fn drain_until<F>(
    notices: &mut Receiver<GameNotice>,
    assets: &Path,
    stop: F,
) -> Option<GameNotice>
where
    F: Fn(&GameNotice) -> bool,
{
    loop {
        match notices.recv().await {
            Ok(notice) => {
                describe(&notice, assets);
                if stop(&notice) {
                    return Some(notice);
                }
            }
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "missed game notices"),
            Err(RecvError::Closed) => return None,
        }
    }
}

fn describe(notice: &GameNotice, assets: &Path) {
    match notice {
        GameNotice::Countdown { remaining } => info!("{remaining}..."),
        GameNotice::CountdownFinished => info!("START!"),
        GameNotice::RoundStarted {
            cards,
            time_limit_secs,
        } => info!(
            cards = cards.len(),
            limit = %format_clock(*time_limit_secs),
            "cards dealt"
        ),
        GameNotice::Tick {
            remaining_secs,
            matched_pairs,
            total_pairs,
        } => info!(
            remaining = %format_clock(*remaining_secs),
            "{matched_pairs}/{total_pairs} pairs"
        ),
        GameNotice::CardFlipped { index, image_id } => match card_face(*image_id, assets) {
            CardFace::Image(path) => info!(index, %path, "card flipped"),
            CardFace::Placeholder(glyph) => info!(index, %glyph, "card flipped (no image)"),
        },
        GameNotice::PairMatched {
            first,
            second,
            matched_pairs,
        } => info!(first, second, matched_pairs, "pair found"),
        GameNotice::PairMismatched { first, second } => info!(first, second, "no match"),
        GameNotice::RoundEnded {
            won,
            pairs,
            total_pairs,
            seconds,
        } => info!(
            won,
            time = %format_clock(*seconds),
            "round over with {pairs}/{total_pairs} pairs"
        ),
        GameNotice::RankingUpdated { source, entries } => {
            info!(?source, "leaderboard");
            for (rank, entry) in entries.iter().enumerate() {
                info!(
                    "{:>2}. {:<20} {:>2} pairs {}",
                    rank + 1,
                    entry.name,
                    entry.pairs,
                    entry.time_label()
                );
            }
        }
        GameNotice::Reset => info!("game reset"),
    }
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
