use std::{
    cell::Cell,
    rc::Rc,
    thread,
    time::{Duration, Instant},
};

use crate::{Result, VisualiserError};

/// Throttles an uncapped frame callback to a target rate.
///
/// Timestamps are milliseconds from any monotonic origin. A timestamp is
/// accepted when at least `1000 / fps` ms have passed since the last
/// accepted one; the first timestamp is always accepted.
#[derive(Debug, Clone)]
pub struct FrameTimer {
    interval_ms: f64,
    last_drawn: Option<f64>,
}

impl FrameTimer {
    pub fn new(target_fps: f64) -> Result<Self> {
        if !target_fps.is_finite() || target_fps <= 0.0 {
            return Err(VisualiserError::config(format!(
                "target_fps must be a positive number, got {target_fps}"
            )));
        }

        Ok(Self {
            interval_ms: 1000.0 / target_fps,
            last_drawn: None,
        })
    }

    pub fn interval_ms(&self) -> f64 {
        self.interval_ms
    }

    pub fn last_drawn(&self) -> Option<f64> {
        self.last_drawn
    }

    /// Returns `true` and records `timestamp` when a frame is due. A
    /// rejected timestamp leaves the timer untouched. Non-finite timestamps
    /// are always rejected, otherwise one would poison every later gap.
    pub fn should_draw_frame(&mut self, timestamp: f64) -> bool {
        if !timestamp.is_finite() {
            return false;
        }

        let due = match self.last_drawn {
            None => true,
            Some(last) => timestamp - last >= self.interval_ms,
        };

        if due {
            self.last_drawn = Some(timestamp);
        }
        due
    }
}

/// Source of wall-clock milliseconds for time-driven effects.
pub trait Clock {
    fn now_ms(&self) -> f64;
}

/// Monotonic clock counting from its creation.
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Hand-driven clock. Clones share the same reading, so a test can keep a
/// handle while the renderer owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<f64>>,
}

impl ManualClock {
    pub fn new(start_ms: f64) -> Self {
        Self {
            now: Rc::new(Cell::new(start_ms)),
        }
    }

    pub fn set(&self, now_ms: f64) {
        self.now.set(now_ms);
    }

    pub fn advance(&self, delta_ms: f64) {
        self.now.set(self.now.get() + delta_ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }
}

/// Host facility handing out paint opportunities.
///
/// Each call suspends until the next opportunity and returns its timestamp
/// in milliseconds, or `None` once the host stops offering frames.
pub trait FrameScheduler {
    fn next_frame(&mut self) -> Option<f64>;
}

/// Emits synthetic timestamps at a fixed cadence without waiting. Used for
/// offline rendering and tests.
#[derive(Debug, Clone)]
pub struct FixedStepScheduler {
    step_ms: f64,
    next_ms: f64,
    remaining: Option<u64>,
}

impl FixedStepScheduler {
    /// Cadence of a display refreshing at `refresh_hz`, stopping after
    /// `frames` opportunities (`None` runs forever).
    pub fn new(refresh_hz: f64, frames: Option<u64>) -> Result<Self> {
        if !refresh_hz.is_finite() || refresh_hz <= 0.0 {
            return Err(VisualiserError::config(format!(
                "refresh rate must be a positive number, got {refresh_hz}"
            )));
        }

        Ok(Self {
            step_ms: 1000.0 / refresh_hz,
            next_ms: 0.0,
            remaining: frames,
        })
    }

    pub fn step_ms(&self) -> f64 {
        self.step_ms
    }
}

impl FrameScheduler for FixedStepScheduler {
    fn next_frame(&mut self) -> Option<f64> {
        if let Some(remaining) = self.remaining.as_mut() {
            if *remaining == 0 {
                return None;
            }
            *remaining -= 1;
        }

        let timestamp = self.next_ms;
        self.next_ms += self.step_ms;
        Some(timestamp)
    }
}

/// Blocks the calling thread until each deadline of a fixed cadence. Meant
/// for a dedicated render thread when no host paint scheduler exists.
#[derive(Debug, Clone)]
pub struct PacedScheduler {
    origin: Instant,
    interval: Duration,
    next_deadline: Duration,
    remaining: Option<u64>,
}

impl PacedScheduler {
    pub fn new(refresh_hz: f64, frames: Option<u64>) -> Result<Self> {
        if !refresh_hz.is_finite() || refresh_hz <= 0.0 {
            return Err(VisualiserError::config(format!(
                "refresh rate must be a positive number, got {refresh_hz}"
            )));
        }

        let interval = Duration::try_from_secs_f64(1.0 / refresh_hz).map_err(|_| {
            VisualiserError::config(format!("refresh rate {refresh_hz} Hz is too low to pace"))
        })?;

        Ok(Self {
            origin: Instant::now(),
            interval,
            next_deadline: Duration::ZERO,
            remaining: frames,
        })
    }
}

impl FrameScheduler for PacedScheduler {
    fn next_frame(&mut self) -> Option<f64> {
        if let Some(remaining) = self.remaining.as_mut() {
            if *remaining == 0 {
                return None;
            }
            *remaining -= 1;
        }

        let elapsed = self.origin.elapsed();
        if let Some(wait) = self.next_deadline.checked_sub(elapsed) {
            thread::sleep(wait);
        }

        // A late frame resynchronises instead of bursting to catch up.
        let now = self.origin.elapsed();
        self.next_deadline = now.max(self.next_deadline) + self.interval;
        Some(now.as_secs_f64() * 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_timestamp_is_always_accepted() {
        let mut timer = FrameTimer::new(60.0).unwrap();
        assert!(timer.should_draw_frame(123_456.0));
        assert_eq!(timer.last_drawn(), Some(123_456.0));
    }

    #[test]
    fn rejects_early_timestamps_without_mutation() {
        let mut timer = FrameTimer::new(10.0).unwrap();
        assert!(timer.should_draw_frame(0.0));
        assert!(!timer.should_draw_frame(99.0));
        assert_eq!(timer.last_drawn(), Some(0.0));
        assert!(timer.should_draw_frame(100.0));
        assert_eq!(timer.last_drawn(), Some(100.0));
    }

    #[test]
    fn non_finite_timestamps_never_lock_the_gate() {
        let mut timer = FrameTimer::new(60.0).unwrap();
        assert!(!timer.should_draw_frame(f64::NAN));
        assert!(!timer.should_draw_frame(f64::INFINITY));
        assert_eq!(timer.last_drawn(), None);

        assert!(timer.should_draw_frame(100.0));
        assert!(!timer.should_draw_frame(f64::NEG_INFINITY));
        assert!(timer.should_draw_frame(200.0));
        assert_eq!(timer.last_drawn(), Some(200.0));
    }

    #[test]
    fn accepted_gaps_respect_the_interval() {
        let mut timer = FrameTimer::new(60.0).unwrap();
        let interval = timer.interval_ms();
        let mut accepted = Vec::new();

        // Irregular 144 Hz-ish host with jitter.
        let mut timestamp = 0.0;
        for step in 0..500 {
            timestamp += 6.944 + (step % 5) as f64 * 0.7;
            if timer.should_draw_frame(timestamp) {
                accepted.push(timestamp);
            }
        }

        assert!(accepted.len() > 100);
        for pair in accepted.windows(2) {
            assert!(pair[1] - pair[0] >= interval);
        }
    }

    #[test]
    fn rejects_invalid_rates() {
        assert!(FrameTimer::new(0.0).is_err());
        assert!(FrameTimer::new(f64::NAN).is_err());
        assert!(FixedStepScheduler::new(-1.0, None).is_err());
        assert!(PacedScheduler::new(0.0, None).is_err());
        assert!(matches!(
            PacedScheduler::new(1e-300, None),
            Err(VisualiserError::InvalidConfig(_))
        ));
    }

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::new(5.0);
        let handle = clock.clone();
        handle.advance(10.0);
        assert_eq!(clock.now_ms(), 15.0);
        handle.set(1.0);
        assert_eq!(clock.now_ms(), 1.0);
    }

    #[test]
    fn fixed_step_scheduler_is_bounded() {
        let mut scheduler = FixedStepScheduler::new(100.0, Some(3)).unwrap();
        assert_eq!(scheduler.next_frame(), Some(0.0));
        assert_eq!(scheduler.next_frame(), Some(10.0));
        assert_eq!(scheduler.next_frame(), Some(20.0));
        assert_eq!(scheduler.next_frame(), None);
    }

    #[test]
    fn paced_scheduler_waits_between_frames() {
        let mut scheduler = PacedScheduler::new(200.0, Some(3)).unwrap();
        let first = scheduler.next_frame().unwrap();
        scheduler.next_frame().unwrap();
        let third = scheduler.next_frame().unwrap();

        assert!(third - first >= 9.0);
        assert_eq!(scheduler.next_frame(), None);
    }
}
