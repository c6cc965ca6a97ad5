//! Session timer
//!
//! Counts whole seconds of active exercise on a background tokio task.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

const TICK: Duration = Duration::from_secs(1);

/// Snapshot of the timer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub elapsed_seconds: u64,
    pub running: bool,
}

/// Elapsed-time counter that only advances while running
#[derive(Default)]
pub struct SessionTimer {
    state: Arc<Mutex<TimerState>>,
    ticker: Option<JoinHandle<()>>,
}

impl SessionTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start ticking. Calling this while already running has no effect.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) {
        if self.ticker.is_some() {
            return;
        }

        self.state.lock().running = true;

        let state = self.state.clone();
        self.ticker = Some(tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + TICK, TICK);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let mut state = state.lock();
                if !state.running {
                    break;
                }
                state.elapsed_seconds += 1;
            }
        }));

        tracing::debug!("Timer started at {}", self.display());
    }

    /// Stop advancing, keeping the elapsed time
    pub fn pause(&mut self) {
        self.state.lock().running = false;
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
            tracing::debug!("Timer paused at {}", self.display());
        }
    }

    /// Stop and zero
    pub fn reset(&mut self) {
        self.pause();
        self.state.lock().elapsed_seconds = 0;
    }

    pub fn state(&self) -> TimerState {
        *self.state.lock()
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.state.lock().elapsed_seconds
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().running
    }

    /// Elapsed time as `mm:ss`
    pub fn display(&self) -> String {
        format_elapsed(self.elapsed_seconds())
    }
}

impl Drop for SessionTimer {
    fn drop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}

/// Format seconds as zero-padded `mm:ss`. Minutes are not capped at 59.
pub fn format_elapsed(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(0), "00:00");
        assert_eq!(format_elapsed(65), "01:05");
        assert_eq!(format_elapsed(3599), "59:59");
        assert_eq!(format_elapsed(6000), "100:00");
    }

    #[tokio::test(start_paused = true)]
    async fn test_advances_once_per_second() {
        let mut timer = SessionTimer::new();
        timer.start();

        sleep(Duration::from_millis(3500)).await;
        assert_eq!(timer.elapsed_seconds(), 3);
        assert!(timer.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_is_idempotent() {
        let mut timer = SessionTimer::new();
        timer.start();
        sleep(Duration::from_millis(500)).await;
        timer.start();
        timer.start();

        sleep(Duration::from_millis(2000)).await;
        assert_eq!(timer.elapsed_seconds(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_freezes_and_reset_zeroes() {
        let mut timer = SessionTimer::new();
        timer.start();
        sleep(Duration::from_millis(2500)).await;

        timer.pause();
        sleep(Duration::from_secs(10)).await;
        assert_eq!(
            timer.state(),
            TimerState {
                elapsed_seconds: 2,
                running: false
            }
        );

        timer.start();
        sleep(Duration::from_millis(1500)).await;
        assert_eq!(timer.elapsed_seconds(), 3);

        timer.reset();
        assert_eq!(timer.state(), TimerState::default());
    }
}
