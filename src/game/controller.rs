//! Game controller: lifecycle of a round and the glue between engine, timer and leaderboard.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use rand::{SeedableRng, rngs::StdRng};
use thiserror::Error;
use tokio::{sync::broadcast, time::sleep};
use tracing::{debug, error, info};

use crate::{
    config::GameConfig,
    game::{
        deck::{Deck, DeckError},
        engine::{
            EnginePhase, FlipOutcome, GameStateView, InvalidTransition, MatchEngine, Resolution,
        },
        lock,
        notice::{GameNotice, NoticeHub},
        timer::{RoundTimer, TimerCallback},
    },
    ranking::{
        DEFAULT_RANKING_LIMIT, RankingStore, RankingView, ScoreRecord, SubmitReport,
        normalize_name,
    },
};

const COUNTDOWN_STEP: Duration = Duration::from_secs(1);
const NOTICE_CAPACITY: usize = 64;

/// Why a round could not start.
#[derive(Debug, Error)]
pub enum StartError {
    /// The trimmed name was empty.
    #[error("player name must not be empty")]
    MissingName,
    /// A round is already running.
    #[error("a round is already in progress")]
    AlreadyRunning(#[from] InvalidTransition),
    /// The board settings cannot produce a deck.
    #[error("invalid deck configuration")]
    Deck(#[from] DeckError),
}

/// How a start request ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// Cards are dealt and the timer runs.
    Started,
    /// The player did not confirm the name.
    Declined,
    /// A reset or another start happened during the countdown.
    Cancelled,
}

/// Result of a finished round, returned to whoever triggered the end.
#[derive(Debug)]
pub struct RoundSummary {
    /// Every pair was found before the limit.
    pub won: bool,
    /// Pairs found.
    pub pairs: usize,
    /// Pairs dealt.
    pub total_pairs: usize,
    /// Final time of the round.
    pub seconds: u64,
    /// Where the score went.
    pub submit: SubmitReport,
    /// Leaderboard read after the submission.
    pub ranking: RankingView,
}

/// Handle on one game. Cheap to clone; every UI handler gets its own copy.
#[derive(Clone)]
pub struct GameController {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: GameConfig,
    engine: Mutex<MatchEngine>,
    timer: RoundTimer,
    ranking: RankingStore,
    player: Mutex<String>,
    rng: Mutex<StdRng>,
    notices: NoticeHub,
}

impl GameController {
    /// Build a controller dealing decks from OS randomness.
    pub fn new(config: GameConfig, ranking: RankingStore) -> Self {
        Self::with_rng(config, ranking, StdRng::from_os_rng())
    }

    /// Build a controller dealing decks from `rng`, e.g. a seeded generator.
    pub fn with_rng(config: GameConfig, ranking: RankingStore, rng: StdRng) -> Self {
        Self {
            inner: Arc::new(ControllerInner {
                timer: RoundTimer::new(config.time_limit_secs),
                config,
                engine: Mutex::new(MatchEngine::new()),
                ranking,
                player: Mutex::new(String::new()),
                rng: Mutex::new(rng),
                notices: NoticeHub::new(NOTICE_CAPACITY),
            }),
        }
    }

    /// Board settings this controller deals with.
    pub fn config(&self) -> &GameConfig {
        &self.inner.config
    }

    /// Register a new subscriber for game notices.
    pub fn subscribe(&self) -> broadcast::Receiver<GameNotice> {
        self.inner.notices.subscribe()
    }

    /// Snapshot of the current round.
    pub fn state(&self) -> GameStateView {
        lock(&self.inner.engine).view()
    }

    /// Current engine phase.
    pub fn phase(&self) -> EnginePhase {
        lock(&self.inner.engine).phase()
    }

    /// Seconds left in the round.
    pub fn remaining_seconds(&self) -> u64 {
        self.inner.timer.remaining_seconds()
    }

    /// Seconds spent in the round.
    pub fn elapsed_seconds(&self) -> u64 {
        self.inner.timer.elapsed_seconds()
    }

    /// Name of the current player.
    pub fn player_name(&self) -> String {
        lock(&self.inner.player).clone()
    }

    /// Start a round for `name`.
    ///
    /// The trimmed name must not be empty and `confirm` must accept it. A countdown runs before
    /// the deck is dealt and the timer starts; a reset during the countdown cancels the start.
    pub async fn start_game<F>(&self, name: &str, confirm: F) -> Result<StartOutcome, StartError>
    where
        F: FnOnce(&str) -> bool,
    {
        let name = normalize_name(name);
        if name.is_empty() {
            return Err(StartError::MissingName);
        }

        let epoch = {
            let engine = lock(&self.inner.engine);
            if engine.is_playing() {
                return Err(StartError::AlreadyRunning(InvalidTransition {
                    from: engine.phase(),
                    action: "start a round",
                }));
            }
            engine.epoch()
        };

        if !confirm(&name) {
            debug!(player = %name, "start declined");
            return Ok(StartOutcome::Declined);
        }

        self.run_countdown().await;

        let config = &self.inner.config;
        let deck = {
            let mut rng = lock(&self.inner.rng);
            Deck::generate(
                config.total_images,
                config.total_pairs,
                config.grid_rows,
                config.grid_cols,
                &mut *rng,
            )
        };
        let deck = match deck {
            Ok(deck) => deck,
            Err(err) => {
                error!(error = %err, "invalid deck configuration; round not started");
                return Err(err.into());
            }
        };

        let cards = {
            let mut engine = lock(&self.inner.engine);
            if engine.epoch() != epoch {
                info!(player = %name, "start cancelled during countdown");
                return Ok(StartOutcome::Cancelled);
            }
            engine.begin_round(deck)?;
            engine.cards().to_vec()
        };

        *lock(&self.inner.player) = name.clone();
        info!(player = %name, cards = cards.len(), "round started");
        self.inner.notices.publish(GameNotice::RoundStarted {
            cards,
            time_limit_secs: config.time_limit_secs,
        });
        self.start_timer();

        Ok(StartOutcome::Started)
    }

    /// Flip the card at grid `index`. Ignored flips are not errors.
    pub fn flip(&self, index: usize) -> FlipOutcome {
        let (outcome, image_id) = {
            let mut engine = lock(&self.inner.engine);
            let outcome = engine.flip(index);
            let image_id = engine.cards().get(index).map(|card| card.image_id);
            (outcome, image_id)
        };

        match outcome {
            FlipOutcome::Ignored(reason) => {
                debug!(index, ?reason, "flip ignored");
            }
            FlipOutcome::AwaitingSecond { index } => {
                self.publish_flip(index, image_id);
            }
            FlipOutcome::ResolutionPending { second, epoch, .. } => {
                self.publish_flip(second, image_id);
                self.schedule_resolution(epoch);
            }
        }

        outcome
    }

    /// Adjudicate the pending pair of `epoch`, ending the round when the board is cleared.
    ///
    /// Normally driven by the delayed task spawned from [`GameController::flip`].
    pub async fn resolve_pending(&self, epoch: u64) -> Resolution {
        let resolution = lock(&self.inner.engine).resolve(epoch);

        match resolution {
            Resolution::Stale => debug!(epoch, "stale resolution dropped"),
            Resolution::Matched {
                first,
                second,
                matched_pairs,
                cleared,
            } => {
                self.inner.notices.publish(GameNotice::PairMatched {
                    first,
                    second,
                    matched_pairs,
                });
                if cleared {
                    self.end_game(true).await;
                }
            }
            Resolution::Mismatched { first, second } => {
                self.inner
                    .notices
                    .publish(GameNotice::PairMismatched { first, second });
            }
        }

        resolution
    }

    /// End the round: stop the timer, submit the score once, then refresh the leaderboard.
    ///
    /// Returns `None` when the round had already ended (or never started), so duplicate
    /// terminal triggers never submit twice.
    pub async fn end_game(&self, won: bool) -> Option<RoundSummary> {
        let (pairs, total_pairs) = {
            let mut engine = lock(&self.inner.engine);
            if !engine.finish(won) {
                debug!(won, "round already ended; ignoring terminal trigger");
                return None;
            }
            (engine.matched_pairs(), engine.total_pairs())
        };

        self.inner.timer.stop();
        let seconds = self.inner.timer.elapsed_seconds();
        info!(won, pairs, total_pairs, seconds, "round ended");
        self.inner.notices.publish(GameNotice::RoundEnded {
            won,
            pairs,
            total_pairs,
            seconds,
        });

        let record = ScoreRecord::new(&self.player_name(), pairs as u32, seconds);
        let submit = self.inner.ranking.submit(&record).await;
        info!(
            source = ?submit.source,
            fell_back = submit.fallback.is_some(),
            persisted = submit.persisted,
            "score recorded"
        );

        let ranking = self.load_ranking().await;

        Some(RoundSummary {
            won,
            pairs,
            total_pairs,
            seconds,
            submit,
            ranking,
        })
    }

    /// Tear the round down to idle: timer cleared, deck dropped.
    pub fn reset_game(&self) {
        lock(&self.inner.engine).reset();
        self.inner.timer.reset();
        info!("game reset");
        self.inner.notices.publish(GameNotice::Reset);
    }

    /// Fetch the leaderboard and publish it.
    pub async fn load_ranking(&self) -> RankingView {
        let view = self.inner.ranking.fetch_top(DEFAULT_RANKING_LIMIT).await;
        self.inner.notices.publish(GameNotice::RankingUpdated {
            source: view.source,
            entries: view.entries.clone(),
        });
        view
    }

    async fn run_countdown(&self) {
        let steps = self.inner.config.countdown_secs;
        if steps == 0 {
            return;
        }

        for remaining in (1..=steps).rev() {
            self.inner
                .notices
                .publish(GameNotice::Countdown { remaining });
            sleep(COUNTDOWN_STEP).await;
        }
        self.inner.notices.publish(GameNotice::CountdownFinished);
        sleep(COUNTDOWN_STEP).await;
    }

    fn start_timer(&self) {
        let on_tick: TimerCallback = {
            let inner = Arc::downgrade(&self.inner);
            Arc::new(move || {
                if let Some(inner) = inner.upgrade() {
                    inner.publish_tick();
                }
            })
        };

        let on_expire: TimerCallback = {
            let inner = Arc::downgrade(&self.inner);
            Arc::new(move || {
                if let Some(inner) = inner.upgrade() {
                    let controller = GameController { inner };
                    tokio::spawn(async move {
                        controller.end_game(false).await;
                    });
                }
            })
        };

        self.inner.timer.start(on_tick, on_expire);
    }

    fn schedule_resolution(&self, epoch: u64) {
        let controller = self.clone();
        let delay = self.inner.config.flip_delay();
        tokio::spawn(async move {
            sleep(delay).await;
            controller.resolve_pending(epoch).await;
        });
    }

    fn publish_flip(&self, index: usize, image_id: Option<u32>) {
        if let Some(image_id) = image_id {
            self.inner
                .notices
                .publish(GameNotice::CardFlipped { index, image_id });
        }
    }
}

impl ControllerInner {
    fn publish_tick(&self) {
        let (matched_pairs, total_pairs) = {
            let engine = lock(&self.engine);
            (engine.matched_pairs(), engine.total_pairs())
        };
        self.notices.publish(GameNotice::Tick {
            remaining_secs: self.timer.remaining_seconds(),
            matched_pairs,
            total_pairs,
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::time::{Instant, sleep};

    use super::*;
    use crate::ranking::{
        RankingSource,
        local::LocalRanking,
        tests::{FailingApi, RecordingApi, temp_dir},
    };

    const SEED: u64 = 7;

    fn small_config() -> GameConfig {
        GameConfig {
            time_limit_secs: 30,
            total_pairs: 4,
            total_images: 8,
            grid_rows: 2,
            grid_cols: 4,
            flip_delay_ms: 700,
            countdown_secs: 3,
        }
    }

    fn recording_controller(config: GameConfig) -> (GameController, Arc<RecordingApi>) {
        let api = Arc::new(RecordingApi::default());
        let ranking = RankingStore::with_remote(api.clone(), LocalRanking::new(temp_dir()));
        let controller =
            GameController::with_rng(config, ranking, StdRng::seed_from_u64(SEED));
        (controller, api)
    }

    fn expected_deck(config: &GameConfig) -> Deck {
        Deck::generate(
            config.total_images,
            config.total_pairs,
            config.grid_rows,
            config.grid_cols,
            &mut StdRng::seed_from_u64(SEED),
        )
        .unwrap()
    }

    /// Index couples of every pair in `deck`, in grid order of their first card.
    fn pairs_in(deck: &Deck) -> Vec<(usize, usize)> {
        let cards = deck.cards();
        let mut pairs = Vec::new();
        for (i, card) in cards.iter().enumerate() {
            if let Some(j) = cards[i + 1..]
                .iter()
                .position(|other| other.image_id == card.image_id)
            {
                pairs.push((i, i + 1 + j));
            }
        }
        pairs
    }

    async fn started(config: GameConfig) -> (GameController, Arc<RecordingApi>) {
        let (controller, api) = recording_controller(config);
        let outcome = controller.start_game("Yui", |_| true).await.unwrap();
        assert_eq!(outcome, StartOutcome::Started);
        (controller, api)
    }

    #[tokio::test(start_paused = true)]
    async fn empty_name_is_rejected() {
        let (controller, _) = recording_controller(small_config());
        let err = controller.start_game("   ", |_| true).await.unwrap_err();
        assert!(matches!(err, StartError::MissingName));
        assert_eq!(controller.phase(), EnginePhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn declined_confirmation_keeps_idle() {
        let (controller, _) = recording_controller(small_config());
        let mut asked = String::new();
        let outcome = controller
            .start_game(" Hana ", |name| {
                asked = name.to_string();
                false
            })
            .await
            .unwrap();

        assert_eq!(outcome, StartOutcome::Declined);
        assert_eq!(asked, "Hana");
        assert_eq!(controller.phase(), EnginePhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_precedes_the_deal() {
        let (controller, _) = recording_controller(small_config());
        let mut notices = controller.subscribe();
        let begun = Instant::now();

        controller.start_game("Yui", |_| true).await.unwrap();

        assert_eq!(begun.elapsed(), Duration::from_secs(4));
        assert_eq!(
            notices.recv().await.unwrap(),
            GameNotice::Countdown { remaining: 3 }
        );
        assert_eq!(
            notices.recv().await.unwrap(),
            GameNotice::Countdown { remaining: 2 }
        );
        assert_eq!(
            notices.recv().await.unwrap(),
            GameNotice::Countdown { remaining: 1 }
        );
        assert_eq!(notices.recv().await.unwrap(), GameNotice::CountdownFinished);
        assert!(matches!(
            notices.recv().await.unwrap(),
            GameNotice::RoundStarted { .. }
        ));

        let state = controller.state();
        assert_eq!(state.phase, EnginePhase::Playing);
        assert!(state.can_flip);
        assert_eq!(state.cards.len(), 8);
        assert_eq!(controller.remaining_seconds(), 30);
    }

    #[tokio::test(start_paused = true)]
    async fn seeded_pair_matches_after_delay() {
        let config = small_config();
        let deck = expected_deck(&config);
        let (controller, _) = started(config).await;
        assert_eq!(controller.state().cards, deck.cards().to_vec());

        let (a, b) = pairs_in(&deck)[0];
        controller.flip(a);
        assert!(matches!(
            controller.flip(b),
            FlipOutcome::ResolutionPending { .. }
        ));
        assert!(!controller.state().can_flip);

        sleep(Duration::from_millis(800)).await;

        let state = controller.state();
        assert_eq!(state.matched_pairs, 1);
        assert!(state.cards[a].is_matched && state.cards[b].is_matched);
        assert!(state.cards[a].is_flipped && state.cards[b].is_flipped);
        assert!(state.flipped_cards.is_empty());
        assert!(state.can_flip);
        let face_up = state.cards.iter().filter(|card| card.is_flipped).count();
        assert_eq!(face_up, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn mismatch_turns_cards_back() {
        let config = small_config();
        let deck = expected_deck(&config);
        let (controller, _) = started(config).await;

        let first = deck.cards()[0].image_id;
        let other = deck
            .cards()
            .iter()
            .position(|card| card.image_id != first)
            .unwrap();

        controller.flip(0);
        controller.flip(other);
        sleep(Duration::from_millis(300)).await;
        assert!(controller.state().cards[0].is_flipped);

        sleep(Duration::from_millis(500)).await;
        let state = controller.state();
        assert!(!state.cards[0].is_flipped);
        assert!(!state.cards[other].is_flipped);
        assert_eq!(state.matched_pairs, 0);
        assert!(state.can_flip);
    }

    #[tokio::test(start_paused = true)]
    async fn third_flip_during_resolution_is_rejected() {
        let config = small_config();
        let deck = expected_deck(&config);
        let (controller, _) = started(config).await;
        let (a, b) = pairs_in(&deck)[0];
        let third = (0..8).find(|i| *i != a && *i != b).unwrap();

        controller.flip(a);
        controller.flip(b);
        assert!(matches!(controller.flip(third), FlipOutcome::Ignored(_)));
        assert!(!controller.state().cards[third].is_flipped);
    }

    #[tokio::test(start_paused = true)]
    async fn clearing_the_board_wins_and_submits_once() {
        let config = small_config();
        let deck = expected_deck(&config);
        let (controller, api) = started(config).await;

        for (a, b) in pairs_in(&deck) {
            controller.flip(a);
            controller.flip(b);
            sleep(Duration::from_millis(800)).await;
        }

        assert_eq!(controller.phase(), EnginePhase::Ended { won: true });
        assert!(controller.state().posted);
        let submissions = api.submissions.lock().unwrap().clone();
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].name, "Yui");
        assert_eq!(submissions[0].pairs, 4);
        assert_eq!(submissions[0].seconds, 3);

        // The round timer is stopped, so expiry never fires a second submission.
        sleep(Duration::from_secs(60)).await;
        assert_eq!(api.submissions.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn time_up_ends_the_round() {
        let config = GameConfig {
            time_limit_secs: 5,
            ..small_config()
        };
        let (controller, api) = started(config).await;
        let mut notices = controller.subscribe();

        sleep(Duration::from_secs(6)).await;

        assert_eq!(controller.phase(), EnginePhase::Ended { won: false });
        assert_eq!(controller.remaining_seconds(), 0);
        let submissions = api.submissions.lock().unwrap().clone();
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].seconds, 5);
        assert_eq!(submissions[0].pairs, 0);

        let mut ended = 0;
        while let Ok(notice) = notices.try_recv() {
            if matches!(notice, GameNotice::RoundEnded { won: false, .. }) {
                ended += 1;
            }
        }
        assert_eq!(ended, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn simultaneous_terminal_triggers_submit_once() {
        let (controller, api) = started(small_config()).await;

        let (first, second) = tokio::join!(controller.end_game(true), controller.end_game(false));

        assert_eq!(first.is_some() as u8 + second.is_some() as u8, 1);
        assert_eq!(api.submissions.lock().unwrap().len(), 1);
        assert!(controller.end_game(false).await.is_none());
        assert_eq!(api.submissions.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_during_resolution_is_harmless() {
        let config = small_config();
        let deck = expected_deck(&config);
        let (controller, api) = started(config).await;
        let (a, b) = pairs_in(&deck)[0];

        controller.flip(a);
        controller.flip(b);
        controller.reset_game();
        sleep(Duration::from_secs(40)).await;

        let state = controller.state();
        assert_eq!(state.phase, EnginePhase::Idle);
        assert!(state.cards.is_empty());
        assert_eq!(state.matched_pairs, 0);
        assert_eq!(controller.elapsed_seconds(), 0);
        assert!(api.submissions.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn reset_during_countdown_cancels_start() {
        let (controller, _) = recording_controller(small_config());

        let starter = controller.clone();
        let pending = tokio::spawn(async move { starter.start_game("Yui", |_| true).await });

        sleep(Duration::from_millis(1500)).await;
        controller.reset_game();

        let outcome = pending.await.unwrap().unwrap();
        assert_eq!(outcome, StartOutcome::Cancelled);
        assert_eq!(controller.phase(), EnginePhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn start_while_playing_is_rejected() {
        let (controller, _) = started(small_config()).await;
        let err = controller.start_game("Yui", |_| true).await.unwrap_err();
        assert!(matches!(err, StartError::AlreadyRunning(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn impossible_deck_aborts_cleanly() {
        let config = GameConfig {
            total_images: 2,
            ..small_config()
        };
        let (controller, _) = recording_controller(config);

        let err = controller.start_game("Yui", |_| true).await.unwrap_err();
        assert!(matches!(err, StartError::Deck(DeckError::NotEnoughImages { .. })));
        assert_eq!(controller.phase(), EnginePhase::Idle);
        assert!(controller.state().cards.is_empty());
    }

    #[tokio::test]
    async fn failing_remote_still_records_the_round() {
        let dir = temp_dir();
        let ranking = RankingStore::with_remote(Arc::new(FailingApi), LocalRanking::new(&dir));
        let config = GameConfig {
            countdown_secs: 0,
            ..small_config()
        };
        let controller = GameController::with_rng(config, ranking, StdRng::seed_from_u64(SEED));
        controller.start_game("Yui", |_| true).await.unwrap();

        let summary = controller.end_game(false).await.unwrap();

        assert_eq!(summary.submit.source, RankingSource::Local);
        assert!(summary.submit.fallback.is_some());
        assert_eq!(summary.ranking.source, RankingSource::Local);
        assert_eq!(summary.ranking.entries.len(), 1);
        assert_eq!(summary.ranking.entries[0].name, "Yui");

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
