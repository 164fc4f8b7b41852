//! Stopwatch used to derive the per-frame delta time.

use instant::{Duration, Instant};

/// A stopwatch. Starts running on construction.
///
/// [`time`](Self::time) reports the running time since the last start/reset,
/// excluding periods where the timer was stopped. [`lap_time`](Self::lap_time)
/// reports the time since its previous call and is what the frame loop uses
/// as `dt`.
#[derive(Debug, Clone)]
pub struct Timer {
    start: Instant,
    lap: Instant,
    // Set while the timer is stopped
    stopped_at: Option<Instant>,
}

impl Timer {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            lap: now,
            stopped_at: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.stopped_at.is_none()
    }

    /// Resume a stopped timer. Time spent stopped is not counted.
    pub fn start(&mut self) {
        if let Some(stopped_at) = self.stopped_at.take() {
            let paused = stopped_at.elapsed();
            self.start += paused;
            self.lap += paused;
        }
    }

    pub fn stop(&mut self) {
        if self.stopped_at.is_none() {
            self.stopped_at = Some(Instant::now());
        }
    }

    /// Reset to zero. A stopped timer stays stopped.
    pub fn reset(&mut self) {
        let now = Instant::now();
        self.start = now;
        self.lap = now;
        if self.stopped_at.is_some() {
            self.stopped_at = Some(now);
        }
    }

    /// Counts per second of the underlying clock.
    pub fn frequency(&self) -> f32 {
        Duration::from_secs(1).as_nanos() as f32
    }

    /// Seconds since the timer was started or last reset.
    pub fn time(&self) -> f32 {
        self.now().duration_since(self.start).as_secs_f32()
    }

    /// Seconds since the last call to this function, or since start/reset on
    /// the first call.
    pub fn lap_time(&mut self) -> f32 {
        let now = self.now();
        let lap = now.duration_since(self.lap);
        self.lap = now;
        lap.as_secs_f32()
    }

    fn now(&self) -> Instant {
        self.stopped_at.unwrap_or_else(Instant::now)
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::thread::sleep;

    use super::*;

    const TICK: Duration = Duration::from_millis(20);

    #[test]
    fn running_timer_advances() {
        let timer = Timer::new();
        sleep(TICK);
        assert!(timer.is_running());
        assert!(timer.time() >= TICK.as_secs_f32());
    }

    #[test]
    fn stopped_timer_does_not_advance() {
        let mut timer = Timer::new();
        timer.stop();
        let frozen = timer.time();
        sleep(TICK);
        assert!(!timer.is_running());
        assert_eq!(timer.time(), frozen);
    }

    #[test]
    fn paused_time_is_excluded_after_restart() {
        let mut timer = Timer::new();
        timer.stop();
        sleep(TICK * 5);
        timer.start();
        assert!(timer.time() < (TICK * 5).as_secs_f32());
    }

    #[test]
    fn lap_time_measures_since_previous_lap() {
        let mut timer = Timer::new();
        sleep(TICK);
        let first = timer.lap_time();
        assert!(first >= TICK.as_secs_f32());
        let second = timer.lap_time();
        assert!(second < first);
        assert!(timer.time() >= first);
    }

    #[test]
    fn reset_restarts_from_zero() {
        let mut timer = Timer::new();
        sleep(TICK);
        timer.reset();
        assert!(timer.time() < TICK.as_secs_f32());
    }

    #[test]
    fn frequency_is_nanoseconds() {
        assert_eq!(Timer::new().frequency(), 1.0e9);
    }
}
