//! Match engine: the flip / resolve / finish state machine of a round.

use serde::Serialize;
use thiserror::Error;

use crate::game::deck::{Card, Deck};

/// High-level phases a round can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "phase")]
pub enum EnginePhase {
    /// No cards dealt yet.
    Idle,
    /// Flips are accepted.
    Playing,
    /// Two cards are face up and waiting for the delayed adjudication.
    Resolving,
    /// Round is over, either cleared or timed out.
    Ended {
        /// True when every pair was found.
        won: bool,
    },
}

/// Generation counter invalidating deferred resolutions from an earlier round state.
pub type Epoch = u64;

/// Why a flip was ignored. None of these are errors for the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipRejection {
    /// Flips are locked (not playing, or a pair is resolving).
    Locked,
    /// No card at that grid index.
    OutOfRange,
    /// The card is already face up.
    AlreadyFlipped,
    /// The card already belongs to a found pair.
    AlreadyMatched,
}

/// Outcome of a flip request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipOutcome {
    /// Nothing changed.
    Ignored(FlipRejection),
    /// First card of a pair is up.
    AwaitingSecond {
        /// Grid index of the card.
        index: usize,
    },
    /// Second card is up; adjudication must be scheduled for `epoch`.
    ResolutionPending {
        /// Grid index of the first card.
        first: usize,
        /// Grid index of the second card.
        second: usize,
        /// Epoch to pass back to [`MatchEngine::resolve`].
        epoch: Epoch,
    },
}

/// Outcome of a deferred resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The round moved on since the resolution was scheduled; nothing changed.
    Stale,
    /// Both cards share an image and stay face up.
    Matched {
        /// Grid index of the first card.
        first: usize,
        /// Grid index of the second card.
        second: usize,
        /// Pairs found so far, this one included.
        matched_pairs: usize,
        /// Every pair is now found.
        cleared: bool,
    },
    /// The cards differ and were turned back.
    Mismatched {
        /// Grid index of the first card.
        first: usize,
        /// Grid index of the second card.
        second: usize,
    },
}

/// Error returned when a lifecycle call does not fit the current phase.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot {action} while in {from:?}")]
pub struct InvalidTransition {
    /// Phase the engine was in.
    pub from: EnginePhase,
    /// Rejected lifecycle call.
    pub action: &'static str,
}

/// Read-only view of the round for rendering and tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameStateView {
    /// Current phase.
    pub phase: EnginePhase,
    /// A round is running, resolving included.
    pub is_playing: bool,
    /// Flips are accepted right now.
    pub can_flip: bool,
    /// Pairs found so far.
    pub matched_pairs: usize,
    /// Pairs dealt.
    pub total_pairs: usize,
    /// Face-up cards not yet matched, in flip order.
    pub flipped_cards: Vec<usize>,
    /// The round result was already handed out.
    pub posted: bool,
    /// Cards in grid order.
    pub cards: Vec<Card>,
}

/// State machine owning the dealt cards and the pending selection.
#[derive(Debug, Clone)]
pub struct MatchEngine {
    phase: EnginePhase,
    cards: Vec<Card>,
    total_pairs: usize,
    matched_pairs: usize,
    flipped: Vec<usize>,
    epoch: Epoch,
    posted: bool,
}

impl Default for MatchEngine {
    fn default() -> Self {
        Self {
            phase: EnginePhase::Idle,
            cards: Vec::new(),
            total_pairs: 0,
            matched_pairs: 0,
            flipped: Vec::with_capacity(2),
            epoch: 0,
            posted: false,
        }
    }
}

impl MatchEngine {
    /// Create an engine in the idle phase.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase.
    pub fn phase(&self) -> EnginePhase {
        self.phase
    }

    /// Current epoch.
    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// Pairs found so far.
    pub fn matched_pairs(&self) -> usize {
        self.matched_pairs
    }

    /// Pairs dealt.
    pub fn total_pairs(&self) -> usize {
        self.total_pairs
    }

    /// Cards in grid order.
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    /// A round is running, resolving included.
    pub fn is_playing(&self) -> bool {
        matches!(self.phase, EnginePhase::Playing | EnginePhase::Resolving)
    }

    /// Flips are accepted right now.
    pub fn can_flip(&self) -> bool {
        self.phase == EnginePhase::Playing
    }

    /// Snapshot the round state.
    pub fn view(&self) -> GameStateView {
        GameStateView {
            phase: self.phase,
            is_playing: self.is_playing(),
            can_flip: self.can_flip(),
            matched_pairs: self.matched_pairs,
            total_pairs: self.total_pairs,
            flipped_cards: self.flipped.clone(),
            posted: self.posted,
            cards: self.cards.clone(),
        }
    }

    /// Deal a fresh deck and enter [`EnginePhase::Playing`].
    pub fn begin_round(&mut self, deck: Deck) -> Result<Epoch, InvalidTransition> {
        if !matches!(self.phase, EnginePhase::Idle | EnginePhase::Ended { .. }) {
            return Err(InvalidTransition {
                from: self.phase,
                action: "begin a round",
            });
        }

        self.cards = deck.into_cards();
        self.total_pairs = self.cards.len() / 2;
        self.matched_pairs = 0;
        self.flipped.clear();
        self.posted = false;
        self.epoch += 1;
        self.phase = EnginePhase::Playing;
        Ok(self.epoch)
    }

    /// Turn the card at `index` face up.
    ///
    /// The second card of a selection locks flipping synchronously; the caller is expected to
    /// call [`MatchEngine::resolve`] with the returned epoch after the display delay.
    pub fn flip(&mut self, index: usize) -> FlipOutcome {
        if !self.can_flip() {
            return FlipOutcome::Ignored(FlipRejection::Locked);
        }

        let Some(card) = self.cards.get_mut(index) else {
            return FlipOutcome::Ignored(FlipRejection::OutOfRange);
        };
        if card.is_matched {
            return FlipOutcome::Ignored(FlipRejection::AlreadyMatched);
        }
        if card.is_flipped {
            return FlipOutcome::Ignored(FlipRejection::AlreadyFlipped);
        }

        card.is_flipped = true;
        self.flipped.push(index);

        match self.flipped.as_slice() {
            [first, second] => {
                self.phase = EnginePhase::Resolving;
                FlipOutcome::ResolutionPending {
                    first: *first,
                    second: *second,
                    epoch: self.epoch,
                }
            }
            _ => FlipOutcome::AwaitingSecond { index },
        }
    }

    /// Adjudicate the pending pair scheduled at `epoch`.
    pub fn resolve(&mut self, epoch: Epoch) -> Resolution {
        if epoch != self.epoch || self.phase != EnginePhase::Resolving {
            return Resolution::Stale;
        }

        let [first, second] = match self.flipped.as_slice() {
            [first, second] => [*first, *second],
            _ => return Resolution::Stale,
        };
        self.flipped.clear();
        self.phase = EnginePhase::Playing;

        if self.cards[first].image_id == self.cards[second].image_id {
            self.cards[first].is_matched = true;
            self.cards[second].is_matched = true;
            self.matched_pairs += 1;
            Resolution::Matched {
                first,
                second,
                matched_pairs: self.matched_pairs,
                cleared: self.matched_pairs >= self.total_pairs,
            }
        } else {
            self.cards[first].is_flipped = false;
            self.cards[second].is_flipped = false;
            Resolution::Mismatched { first, second }
        }
    }

    /// Enter [`EnginePhase::Ended`]. Returns `true` only for the first terminal trigger of a
    /// round; that caller owns the one score submission.
    pub fn finish(&mut self, won: bool) -> bool {
        if self.posted || !self.is_playing() {
            return false;
        }

        self.posted = true;
        self.phase = EnginePhase::Ended { won };
        self.epoch += 1;
        true
    }

    /// Drop the dealt cards and return to [`EnginePhase::Idle`].
    pub fn reset(&mut self) {
        self.phase = EnginePhase::Idle;
        self.cards.clear();
        self.total_pairs = 0;
        self.matched_pairs = 0;
        self.flipped.clear();
        self.posted = false;
        self.epoch += 1;
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn dealt(seed: u64) -> MatchEngine {
        let deck = Deck::generate(8, 4, 2, 4, &mut StdRng::seed_from_u64(seed)).unwrap();
        let mut engine = MatchEngine::new();
        engine.begin_round(deck).unwrap();
        engine
    }

    /// Grid indices of the two cards sharing each image, plus one mismatching couple.
    fn pairs_of(engine: &MatchEngine) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for (i, card) in engine.cards().iter().enumerate() {
            if let Some(j) = engine.cards()[i + 1..]
                .iter()
                .position(|other| other.image_id == card.image_id)
            {
                pairs.push((i, i + 1 + j));
            }
        }
        pairs
    }

    fn mismatch_of(engine: &MatchEngine) -> (usize, usize) {
        let first = &engine.cards()[0];
        let second = engine
            .cards()
            .iter()
            .position(|card| card.image_id != first.image_id)
            .unwrap();
        (0, second)
    }

    #[test]
    fn initial_state_is_idle() {
        let mut engine = MatchEngine::new();
        assert_eq!(engine.phase(), EnginePhase::Idle);
        assert!(!engine.can_flip());
        assert_eq!(engine.flip(0), FlipOutcome::Ignored(FlipRejection::Locked));
    }

    #[test]
    fn flipping_same_card_twice_counts_once() {
        let mut engine = dealt(1);
        assert_eq!(engine.flip(2), FlipOutcome::AwaitingSecond { index: 2 });
        assert_eq!(
            engine.flip(2),
            FlipOutcome::Ignored(FlipRejection::AlreadyFlipped)
        );
        assert_eq!(engine.view().flipped_cards, vec![2]);
        assert!(engine.can_flip());
    }

    #[test]
    fn second_flip_locks_until_resolved() {
        let mut engine = dealt(2);
        let (a, b) = mismatch_of(&engine);
        let third = (0..engine.cards().len()).find(|i| *i != a && *i != b).unwrap();

        engine.flip(a);
        let outcome = engine.flip(b);
        assert!(matches!(outcome, FlipOutcome::ResolutionPending { .. }));
        assert_eq!(engine.phase(), EnginePhase::Resolving);
        assert!(!engine.can_flip());

        assert_eq!(
            engine.flip(third),
            FlipOutcome::Ignored(FlipRejection::Locked)
        );
        assert_eq!(engine.view().flipped_cards.len(), 2);
        assert!(!engine.cards()[third].is_flipped);
    }

    #[test]
    fn matching_pair_stays_up() {
        let mut engine = dealt(3);
        let (a, b) = pairs_of(&engine)[0];
        engine.flip(a);
        let FlipOutcome::ResolutionPending { epoch, .. } = engine.flip(b) else {
            panic!("expected pending resolution");
        };

        let resolution = engine.resolve(epoch);
        assert_eq!(
            resolution,
            Resolution::Matched {
                first: a,
                second: b,
                matched_pairs: 1,
                cleared: false
            }
        );
        assert!(engine.cards()[a].is_matched && engine.cards()[a].is_flipped);
        assert!(engine.cards()[b].is_matched && engine.cards()[b].is_flipped);
        assert_eq!(engine.phase(), EnginePhase::Playing);
        assert_eq!(
            engine.flip(a),
            FlipOutcome::Ignored(FlipRejection::AlreadyMatched)
        );
    }

    #[test]
    fn mismatching_pair_turns_back_down() {
        let mut engine = dealt(4);
        let (a, b) = mismatch_of(&engine);
        engine.flip(a);
        let FlipOutcome::ResolutionPending { epoch, .. } = engine.flip(b) else {
            panic!("expected pending resolution");
        };

        assert_eq!(
            engine.resolve(epoch),
            Resolution::Mismatched { first: a, second: b }
        );
        assert!(!engine.cards()[a].is_flipped);
        assert!(!engine.cards()[b].is_flipped);
        assert_eq!(engine.matched_pairs(), 0);
        assert!(engine.can_flip());
    }

    #[test]
    fn last_pair_clears_the_board() {
        let mut engine = dealt(5);
        let pairs = pairs_of(&engine);
        let mut last = None;
        for (a, b) in pairs {
            engine.flip(a);
            let FlipOutcome::ResolutionPending { epoch, .. } = engine.flip(b) else {
                panic!("expected pending resolution");
            };
            last = Some(engine.resolve(epoch));
        }

        assert!(matches!(
            last,
            Some(Resolution::Matched {
                matched_pairs: 4,
                cleared: true,
                ..
            })
        ));
        assert!(engine.finish(true));
        assert_eq!(engine.phase(), EnginePhase::Ended { won: true });
    }

    #[test]
    fn finish_happens_once_per_round() {
        let mut engine = dealt(6);
        assert!(engine.finish(false));
        assert!(!engine.finish(true));
        assert!(!engine.finish(false));
        assert_eq!(engine.phase(), EnginePhase::Ended { won: false });
        assert!(engine.view().posted);
        assert_eq!(engine.flip(0), FlipOutcome::Ignored(FlipRejection::Locked));
    }

    #[test]
    fn resolution_after_reset_is_stale() {
        let mut engine = dealt(7);
        let (a, b) = pairs_of(&engine)[0];
        engine.flip(a);
        let FlipOutcome::ResolutionPending { epoch, .. } = engine.flip(b) else {
            panic!("expected pending resolution");
        };

        engine.reset();
        assert_eq!(engine.resolve(epoch), Resolution::Stale);
        assert_eq!(engine.phase(), EnginePhase::Idle);
        assert!(engine.cards().is_empty());
        assert_eq!(engine.matched_pairs(), 0);
    }

    #[test]
    fn resolution_after_time_up_is_stale() {
        let mut engine = dealt(8);
        let (a, b) = pairs_of(&engine)[0];
        engine.flip(a);
        let FlipOutcome::ResolutionPending { epoch, .. } = engine.flip(b) else {
            panic!("expected pending resolution");
        };

        assert!(engine.finish(false));
        assert_eq!(engine.resolve(epoch), Resolution::Stale);
        assert_eq!(engine.matched_pairs(), 0);
    }

    #[test]
    fn begin_round_rejected_while_playing() {
        let mut engine = dealt(9);
        let deck = Deck::generate(8, 4, 2, 4, &mut StdRng::seed_from_u64(9)).unwrap();
        let err = engine.begin_round(deck).unwrap_err();
        assert_eq!(err.from, EnginePhase::Playing);
    }

    #[test]
    fn out_of_range_flip_is_ignored() {
        let mut engine = dealt(10);
        assert_eq!(
            engine.flip(99),
            FlipOutcome::Ignored(FlipRejection::OutOfRange)
        );
    }
}
