use emu::gba::Gba;
use emu::hardware::Hardware;

/// Roughly one second of emulated time.
const REPORT_EVERY: u64 = 60;

/// Hardware with no CPU attached: it only keeps track of emulated time.
///
/// Lets the frontend exercise loading, pacing and backup handling on its own.
#[derive(Debug, Default)]
pub struct Idle {
    cycles: u64,
    frames: u64,
}

impl Hardware for Idle {
    fn cleanup(&mut self) {
        self.cycles = 0;
        self.frames = 0;
    }

    fn init(&mut self, gba: &mut Gba) {
        tracing::debug!(
            "idle hardware over {} bytes of memory",
            gba.bus.memory_size()
        );
    }

    fn run_for(&mut self, _gba: &mut Gba, cycles: u32) {
        self.cycles += u64::from(cycles);
        self.frames += 1;

        if self.frames % REPORT_EVERY == 0 {
            tracing::debug!("{} frames, {} cycles", self.frames, self.cycles);
        }
    }
}
