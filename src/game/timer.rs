//! Round timer counting elapsed seconds against a fixed limit.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use tokio::{
    task::JoinHandle,
    time::{Instant, MissedTickBehavior, interval_at},
};

use super::lock;

/// Period between two tick callbacks.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Callback invoked by the timer task.
pub type TimerCallback = Arc<dyn Fn() + Send + Sync>;

/// Countdown timer for a round.
///
/// Elapsed time is always derived from the captured start instant so late ticks never skew it.
/// Once stopped, the last captured value is kept and serves as the final time of the round.
pub struct RoundTimer {
    limit_secs: u64,
    inner: Arc<Mutex<TimerState>>,
}

#[derive(Default)]
struct TimerState {
    started_at: Option<Instant>,
    elapsed_secs: u64,
    running: bool,
    on_tick: Option<TimerCallback>,
    on_expire: Option<TimerCallback>,
    ticker: Option<JoinHandle<()>>,
}

impl RoundTimer {
    /// Create a stopped timer with the given limit in seconds.
    pub fn new(limit_secs: u64) -> Self {
        Self {
            limit_secs,
            inner: Arc::new(Mutex::new(TimerState::default())),
        }
    }

    /// Round length in seconds.
    pub fn limit_secs(&self) -> u64 {
        self.limit_secs
    }

    /// Start counting. Fires `on_tick` right away and then every [`TICK_PERIOD`]; once the
    /// limit is reached the timer stops itself and fires `on_expire` once.
    ///
    /// Returns `false` without touching anything when the timer is already running.
    /// Must be called from within a Tokio runtime.
    pub fn start(&self, on_tick: TimerCallback, on_expire: TimerCallback) -> bool {
        let started_at = Instant::now();
        {
            let mut state = lock(&self.inner);
            if state.running {
                return false;
            }

            if let Some(stale) = state.ticker.take() {
                stale.abort();
            }
            state.started_at = Some(started_at);
            state.elapsed_secs = 0;
            state.running = true;
            state.on_tick = Some(on_tick.clone());
            state.on_expire = Some(on_expire);
            state.ticker = Some(tokio::spawn(run_ticker(
                Arc::clone(&self.inner),
                started_at,
                self.limit_secs,
            )));
        }

        on_tick();
        true
    }

    /// Stop ticking and freeze the elapsed time. Calling it on a stopped timer is harmless.
    pub fn stop(&self) {
        let mut state = lock(&self.inner);
        if state.running {
            if let Some(started_at) = state.started_at {
                let elapsed = started_at.elapsed().as_secs();
                state.elapsed_secs = state.elapsed_secs.max(elapsed).min(self.limit_secs);
            }
            state.running = false;
        }
        if let Some(ticker) = state.ticker.take() {
            ticker.abort();
        }
    }

    /// Stop and forget everything, registered callbacks included.
    pub fn reset(&self) {
        self.stop();
        let mut state = lock(&self.inner);
        state.started_at = None;
        state.elapsed_secs = 0;
        state.on_tick = None;
        state.on_expire = None;
    }

    /// Whole seconds elapsed since start; the frozen final value once stopped.
    pub fn elapsed_seconds(&self) -> u64 {
        let mut state = lock(&self.inner);
        if state.running {
            if let Some(started_at) = state.started_at {
                let elapsed = started_at.elapsed().as_secs();
                state.elapsed_secs = state.elapsed_secs.max(elapsed);
            }
        }
        state.elapsed_secs
    }

    /// Seconds left before the limit, never negative.
    pub fn remaining_seconds(&self) -> u64 {
        self.limit_secs.saturating_sub(self.elapsed_seconds())
    }

    /// Whether the timer is counting.
    pub fn is_running(&self) -> bool {
        lock(&self.inner).running
    }
}

impl Drop for RoundTimer {
    fn drop(&mut self) {
        if let Some(ticker) = lock(&self.inner).ticker.take() {
            ticker.abort();
        }
    }
}

async fn run_ticker(inner: Arc<Mutex<TimerState>>, started_at: Instant, limit_secs: u64) {
    let mut ticker = interval_at(started_at + TICK_PERIOD, TICK_PERIOD);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let (on_tick, on_expire) = {
            let mut state = lock(&inner);
            // A restart or reset replaced the round this task was counting for.
            if !state.running || state.started_at != Some(started_at) {
                return;
            }

            let elapsed = started_at.elapsed().as_secs();
            state.elapsed_secs = state.elapsed_secs.max(elapsed);
            if state.elapsed_secs >= limit_secs {
                state.elapsed_secs = limit_secs;
                state.running = false;
                state.ticker = None;
                (state.on_tick.clone(), state.on_expire.take())
            } else {
                (state.on_tick.clone(), None)
            }
        };

        if let Some(on_tick) = on_tick {
            on_tick();
        }
        if let Some(on_expire) = on_expire {
            on_expire();
            return;
        }
    }
}

/// Render seconds as `MM:SS`.
pub fn format_clock(total_secs: u64) -> String {
    format!("{:02}:{:02}", total_secs / 60, total_secs % 60)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::time::{advance, sleep};

    use super::*;

    fn counter() -> (Arc<AtomicUsize>, TimerCallback) {
        let count = Arc::new(AtomicUsize::new(0));
        let handle = Arc::clone(&count);
        let callback: TimerCallback = Arc::new(move || {
            handle.fetch_add(1, Ordering::SeqCst);
        });
        (count, callback)
    }

    #[tokio::test(start_paused = true)]
    async fn expire_fires_once_and_stops() {
        let timer = RoundTimer::new(3);
        let (ticks, on_tick) = counter();
        let (expired, on_expire) = counter();

        assert!(timer.start(on_tick, on_expire));
        assert_eq!(ticks.load(Ordering::SeqCst), 1);

        sleep(Duration::from_secs(10)).await;

        assert_eq!(expired.load(Ordering::SeqCst), 1);
        assert_eq!(ticks.load(Ordering::SeqCst), 4);
        assert!(!timer.is_running());
        assert_eq!(timer.elapsed_seconds(), 3);
        assert_eq!(timer.remaining_seconds(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn second_start_is_ignored() {
        let timer = RoundTimer::new(60);
        let (ticks, on_tick) = counter();
        let (_, on_expire) = counter();

        assert!(timer.start(on_tick.clone(), on_expire.clone()));
        sleep(Duration::from_millis(1500)).await;
        assert!(!timer.start(on_tick, on_expire));

        assert_eq!(ticks.load(Ordering::SeqCst), 2);
        assert_eq!(timer.elapsed_seconds(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn elapsed_follows_the_clock_not_the_ticks() {
        let timer = RoundTimer::new(100);
        let (_, on_tick) = counter();
        let (_, on_expire) = counter();
        timer.start(on_tick, on_expire);

        advance(Duration::from_secs(42)).await;
        assert_eq!(timer.elapsed_seconds(), 42);
        assert_eq!(timer.remaining_seconds(), 58);
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_timer_keeps_final_time() {
        let timer = RoundTimer::new(60);
        let (_, on_tick) = counter();
        let (_, on_expire) = counter();
        timer.start(on_tick, on_expire);

        sleep(Duration::from_millis(2500)).await;
        timer.stop();
        sleep(Duration::from_secs(5)).await;

        assert!(!timer.is_running());
        assert_eq!(timer.elapsed_seconds(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_cancels_pending_expiry() {
        let timer = RoundTimer::new(2);
        let (ticks, on_tick) = counter();
        let (expired, on_expire) = counter();
        timer.start(on_tick, on_expire);

        timer.reset();
        sleep(Duration::from_secs(5)).await;

        assert_eq!(expired.load(Ordering::SeqCst), 0);
        assert_eq!(ticks.load(Ordering::SeqCst), 1);
        assert_eq!(timer.elapsed_seconds(), 0);
        assert_eq!(timer.remaining_seconds(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn timer_can_restart_after_reset() {
        let timer = RoundTimer::new(2);
        let (_, on_tick) = counter();
        let (expired, on_expire) = counter();

        timer.start(on_tick.clone(), on_expire.clone());
        sleep(Duration::from_secs(5)).await;
        timer.reset();
        assert!(timer.start(on_tick, on_expire));
        sleep(Duration::from_secs(5)).await;

        assert_eq!(expired.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn reset_on_idle_timer_is_safe() {
        let timer = RoundTimer::new(5);
        timer.reset();
        timer.stop();
        assert_eq!(timer.remaining_seconds(), 5);
    }

    #[test]
    fn clock_format_pads_minutes_and_seconds() {
        assert_eq!(format_clock(300), "05:00");
        assert_eq!(format_clock(61), "01:01");
        assert_eq!(format_clock(9), "00:09");
    }
}
