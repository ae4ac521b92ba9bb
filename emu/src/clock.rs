use std::thread;
use std::time::{Duration, Instant};

/// Monotonic time source used to pace emulation against the wall clock.
pub trait Clock: Send {
    /// Time elapsed since an arbitrary, fixed origin.
    fn now(&self) -> Duration;

    fn sleep(&mut self, duration: Duration);
}

#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&mut self, duration: Duration) {
        thread::sleep(duration);
    }
}
