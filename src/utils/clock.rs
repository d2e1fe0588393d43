//! Frame clock.

#[cfg(not(target_arch = "wasm32"))]
use std::time::{Duration, Instant};

#[cfg(target_arch = "wasm32")]
use web_time::{Duration, Instant};

/// Stopwatch for animation loops.
///
/// [`delta`](Self::delta) returns the seconds since the previous call and
/// accumulates them into the elapsed time. A clock built with `auto_start`
/// starts itself on the first query.
#[derive(Debug, Clone)]
pub struct Clock {
    pub auto_start: bool,
    start_time: Option<Instant>,
    old_time: Option<Instant>,
    elapsed: Duration,
    running: bool,
}

impl Default for Clock {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Clock {
    #[must_use]
    pub fn new(auto_start: bool) -> Self {
        Self {
            auto_start,
            start_time: None,
            old_time: None,
            elapsed: Duration::ZERO,
            running: false,
        }
    }

    /// Restarts from zero.
    pub fn start(&mut self) {
        let now = Instant::now();
        self.start_time = Some(now);
        self.old_time = Some(now);
        self.elapsed = Duration::ZERO;
        self.running = true;
    }

    /// Folds the pending delta into the elapsed time and pauses.
    pub fn stop(&mut self) {
        self.delta();
        self.running = false;
    }

    #[inline]
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Instant of the last [`start`](Self::start).
    #[must_use]
    pub fn start_time(&self) -> Option<Instant> {
        self.start_time
    }

    /// Seconds since the previous call, 0 while stopped.
    pub fn delta(&mut self) -> f32 {
        if self.auto_start && !self.running && self.start_time.is_none() {
            self.start();
        }
        if !self.running {
            return 0.0;
        }

        let now = Instant::now();
        let diff = self.old_time.map_or(Duration::ZERO, |old| now - old);
        self.old_time = Some(now);
        self.elapsed += diff;
        diff.as_secs_f32()
    }

    /// Seconds accumulated while running, updated by this call.
    pub fn elapsed_time(&mut self) -> f32 {
        self.delta();
        self.elapsed.as_secs_f32()
    }
}
