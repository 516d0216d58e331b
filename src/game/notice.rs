use serde::Serialize;
use tokio::sync::broadcast;

use crate::{
    game::deck::Card,
    ranking::{RankingEntry, RankingSource},
};

/// Event pushed to whoever renders the game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameNotice {
    /// Countdown before the deal, from the configured value down to 1.
    Countdown {
        /// Seconds left before the deal.
        remaining: u8,
    },
    /// The "START!" beat right before the cards appear.
    CountdownFinished,
    /// Cards are dealt face down and the timer runs.
    RoundStarted {
        /// The dealt deck in grid order.
        cards: Vec<Card>,
        /// Round length in seconds.
        time_limit_secs: u64,
    },
    /// Once per second while the round runs.
    Tick {
        /// Seconds left.
        remaining_secs: u64,
        /// Pairs found so far.
        matched_pairs: usize,
        /// Pairs dealt.
        total_pairs: usize,
    },
    /// A card was turned face up.
    CardFlipped {
        /// Grid index of the card.
        index: usize,
        /// Image shown by the card.
        image_id: u32,
    },
    /// Two face-up cards matched.
    PairMatched {
        /// Grid index of the first card.
        first: usize,
        /// Grid index of the second card.
        second: usize,
        /// Pairs found so far.
        matched_pairs: usize,
    },
    /// Two face-up cards were turned back.
    PairMismatched {
        /// Grid index of the first card.
        first: usize,
        /// Grid index of the second card.
        second: usize,
    },
    /// The round is over.
    RoundEnded {
        /// Every pair was found in time.
        won: bool,
        /// Pairs found.
        pairs: usize,
        /// Pairs dealt.
        total_pairs: usize,
        /// Final time.
        seconds: u64,
    },
    /// Fresh leaderboard after a round or on request.
    RankingUpdated {
        /// Backend the rows came from.
        source: RankingSource,
        /// Leaderboard rows, best first.
        entries: Vec<RankingEntry>,
    },
    /// The board was cleared.
    Reset,
}

/// Simple broadcast hub wrapper used by the controller.
pub struct NoticeHub {
    sender: broadcast::Sender<GameNotice>,
}

impl NoticeHub {
    /// Construct a new hub backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent notices.
    pub fn subscribe(&self) -> broadcast::Receiver<GameNotice> {
        self.sender.subscribe()
    }

    /// Send a notice to all current subscribers, ignoring delivery errors.
    pub fn publish(&self, notice: GameNotice) {
        let _ = self.sender.send(notice);
    }
}
