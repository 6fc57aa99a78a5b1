//! Fixed-period tick timer polled from the UI loop.
//!
//! The timer never spawns a thread. The owner calls [`TickTimer::poll`] (or
//! [`TickTimer::due_ticks`]) from the same loop that handles input and drawing,
//! so tick delivery and view mutation always happen on one thread.

use std::time::{Duration, Instant};

/// Default interval between ticks.
pub const DEFAULT_PERIOD: Duration = Duration::from_millis(60);

/// Default delay before the first tick after `start()`.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(100);

/// Receives timer ticks.
pub trait TickListener {
    /// Called once per tick with the cumulative elapsed duration since `start()`.
    fn on_tick(&mut self, elapsed: Duration);
}

impl<F: FnMut(Duration)> TickListener for F {
    fn on_tick(&mut self, elapsed: Duration) {
        self(elapsed)
    }
}

/// Periodic tick source carrying elapsed-duration state.
#[derive(Debug, Clone)]
pub struct TickTimer {
    period: Duration,
    initial_delay: Duration,
    elapsed: Duration,
    /// Deadline of the next tick; `None` while stopped.
    next_deadline: Option<Instant>,
}

impl TickTimer {
    pub fn new(period: Duration, initial_delay: Duration) -> Self {
        Self {
            period: period.max(Duration::from_millis(1)),
            initial_delay,
            elapsed: Duration::ZERO,
            next_deadline: None,
        }
    }

    /// Starts emitting ticks, the first one `initial_delay` after `now`.
    ///
    /// Starting a running timer restarts its schedule from zero.
    pub fn start(&mut self, now: Instant) {
        if self.is_running() {
            tracing::debug!("Timer restarted while running");
        }
        self.elapsed = Duration::ZERO;
        self.next_deadline = Some(now + self.initial_delay);
    }

    /// Cancels all pending ticks and resets the elapsed duration.
    pub fn stop(&mut self) {
        self.next_deadline = None;
        self.elapsed = Duration::ZERO;
    }

    pub fn is_running(&self) -> bool {
        self.next_deadline.is_some()
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// When the next tick is due, if running. The UI loop uses this to bound
    /// how long it waits for input.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.next_deadline
    }

    /// Advances the timer to `now` and returns the elapsed value of every
    /// tick that became due, oldest first.
    pub fn due_ticks(&mut self, now: Instant) -> Vec<Duration> {
        let mut ticks = Vec::new();
        while let Some(deadline) = self.next_deadline {
            if deadline > now {
                break;
            }
            self.elapsed += self.period;
            self.next_deadline = Some(deadline + self.period);
            ticks.push(self.elapsed);
        }
        ticks
    }

    /// Delivers every due tick to `listener`. Returns the number delivered.
    pub fn poll(&mut self, now: Instant, listener: &mut impl TickListener) -> usize {
        let ticks = self.due_ticks(now);
        for &elapsed in &ticks {
            listener.on_tick(elapsed);
        }
        ticks.len()
    }
}

impl Default for TickTimer {
    fn default() -> Self {
        Self::new(DEFAULT_PERIOD, DEFAULT_INITIAL_DELAY)
    }
}

/// Formats an elapsed duration as `MM:SS.cc` (minutes, seconds, hundredths).
pub fn format_elapsed(elapsed: Duration) -> String {
    let millis = elapsed.as_millis();
    let hundredths = millis % 1000 / 10;
    let seconds = (millis / 1000) % 60;
    let minutes = millis / 1000 / 60;
    format!("{minutes:02}:{seconds:02}.{hundredths:02}")
}
