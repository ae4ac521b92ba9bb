//! The components the emulator thread drives but does not implement itself: CPU
//! core, scheduler, video, audio and GPIO.

use std::path::Path;

use crate::backup::{self, BackupType};
use crate::cartridge_header::CartridgeHeader;
use crate::gba::{Gba, GameInfo};
use crate::save_state::{self, SaveStateError};

/// Everything the emulator thread needs from the rest of the system.
///
/// All calls happen on the emulator thread, one at a time.
pub trait Hardware: Send {
    /// Tear down pending scheduler events before a reset.
    fn cleanup(&mut self);

    /// Reinitialize scheduler, CPU, video, audio and GPIO after `gba` memory and I/O
    /// were brought back to their power-on state.
    fn init(&mut self, gba: &mut Gba);

    /// Advance emulation by `cycles` CPU cycles.
    fn run_for(&mut self, gba: &mut Gba, cycles: u32);

    /// Identify the freshly loaded ROM.
    fn lookup_game(&mut self, gba: &mut Gba) {
        gba.game = match CartridgeHeader::new(gba.memory.rom()) {
            Ok(header) => {
                tracing::info!("{} ({})", header.game_title(), header.game_code());
                Some(GameInfo {
                    title: header.game_title().to_string(),
                    code: header.game_code().to_string(),
                })
            }
            Err(e) => {
                tracing::debug!("no usable cartridge header: {e}");
                None
            }
        };
    }

    fn detect_backup(&mut self, gba: &Gba) -> BackupType {
        backup::detect(gba.memory.rom())
    }

    fn quicksave(&mut self, gba: &Gba, path: &Path) -> Result<(), SaveStateError> {
        save_state::quicksave(gba, path)
    }

    fn quickload(&mut self, gba: &mut Gba, path: &Path) -> Result<(), SaveStateError> {
        save_state::quickload(gba, path)
    }
}
