use std::time::Duration;

use crate::clock::Clock;

/// Refresh rate of the real LCD, in frames per second.
pub const FRAME_RATE: f64 = 59.737;

/// CPU cycles in one frame: 228 scanlines of 1232 cycles.
pub const CYCLES_PER_FRAME: u32 = 280_896;

/// Keeps emulation in step with the wall clock.
///
/// Time is accumulated across frames so a late frame is made up by shorter sleeps
/// on the following ones instead of drifting.
#[derive(Debug, Default)]
pub struct FramePacer {
    last_measured: Duration,
    accumulated: Duration,
    frame_budget: Duration,
}

impl FramePacer {
    #[must_use]
    pub fn new(clock: &impl Clock) -> Self {
        Self {
            last_measured: clock.now(),
            ..Default::default()
        }
    }

    /// Wall-clock time one frame should take at `speed`, zero when unbounded.
    ///
    /// Any nonzero speed gets at least a nanosecond, so only speed 0 is unbounded.
    #[must_use]
    pub fn budget_for(speed: u32) -> Duration {
        if speed == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(1.0 / FRAME_RATE / f64::from(speed))
                .max(Duration::from_nanos(1))
        }
    }

    #[must_use]
    pub const fn frame_budget(&self) -> Duration {
        self.frame_budget
    }

    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        self.frame_budget.is_zero()
    }

    pub fn set_speed(&mut self, speed: u32) {
        self.frame_budget = Self::budget_for(speed);
        if speed != 0 {
            self.accumulated = Duration::ZERO;
        }
    }

    fn measure(&mut self, clock: &impl Clock) {
        let now = clock.now();
        self.accumulated += now.saturating_sub(self.last_measured);
        self.last_measured = now;
    }

    /// Sleep whatever is left of the current frame budget.
    pub fn pace(&mut self, clock: &mut impl Clock) {
        if self.is_unbounded() {
            self.last_measured = clock.now();
            self.accumulated = Duration::ZERO;
            return;
        }

        self.measure(clock);
        if self.accumulated < self.frame_budget {
            clock.sleep(self.frame_budget - self.accumulated);
            self.measure(clock);
        }
        self.accumulated = self.accumulated.saturating_sub(self.frame_budget);
    }
}
