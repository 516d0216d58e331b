/// Round orchestration exposed to the UI boundary.
pub mod controller;
/// Card deck generation and layout.
pub mod deck;
/// Flip / match state machine.
pub mod engine;
/// Broadcast of game notices to UI subscribers.
pub mod notice;
/// Round countdown timer.
pub mod timer;

use std::sync::{Mutex, MutexGuard, PoisonError};

pub use self::controller::{GameController, RoundSummary, StartError, StartOutcome};
pub use self::engine::{EnginePhase, FlipOutcome, GameStateView, MatchEngine, Resolution};
pub use self::notice::{GameNotice, NoticeHub};

/// Lock a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
