use serde::{Deserialize, Serialize};

use crate::bus::AddressSpace;
use crate::keypad::{Key, Keypad};
use crate::memory::Memory;

/// IF bit raised by the keypad.
pub const IRQ_KEYPAD: u16 = 1 << 12;

/// Size of the flat address space handed to the CPU core when nothing else is asked.
pub const DEFAULT_MEMORY_SIZE: usize = 0x0004_0000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GbaConfig {
    pub memory_size: usize,
    pub big_endian: bool,
}

impl Default for GbaConfig {
    fn default() -> Self {
        Self {
            memory_size: DEFAULT_MEMORY_SIZE,
            big_endian: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    #[default]
    Paused,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rtc {
    pub auto_detect: bool,
    pub enabled: bool,
}

impl Default for Rtc {
    fn default() -> Self {
        Self {
            auto_detect: true,
            enabled: false,
        }
    }
}

/// Identity of the loaded game, filled by the game lookup on ROM load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameInfo {
    pub title: String,
    pub code: String,
}

/// The emulated console: everything the emulator thread owns and mutates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gba {
    pub bus: AddressSpace,
    pub memory: Memory,
    pub keypad: Keypad,
    /// IF register.
    pub interrupt_request: u16,

    pub run_state: RunState,
    /// Set once a ROM started executing, cleared by a reset.
    pub started: bool,
    pub speed: u32,
    pub color_correction: bool,
    pub resample_frequency: u64,
    pub rtc: Rtc,
    pub game: Option<GameInfo>,
}

impl Default for Gba {
    fn default() -> Self {
        Self::new(GbaConfig::default())
    }
}

impl Gba {
    #[must_use]
    pub fn new(config: GbaConfig) -> Self {
        Self {
            bus: AddressSpace::new(config.memory_size, config.big_endian),
            memory: Memory::default(),
            keypad: Keypad::new(),
            interrupt_request: 0,
            run_state: RunState::Paused,
            started: false,
            speed: 0,
            color_correction: false,
            resample_frequency: 0,
            rtc: Rtc::default(),
            game: None,
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.run_state == RunState::Running
    }

    /// Bring work memory and I/O registers back to their power-on state.
    ///
    /// BIOS, ROM and backup storage survive: they are reloaded by producers, not by
    /// the console itself.
    pub fn reset_memory_and_io(&mut self) {
        self.bus.reset();
        self.keypad = Keypad::new();
        self.interrupt_request = 0;
    }

    pub fn set_key(&mut self, key: Key, pressed: bool) {
        self.keypad.set_key(key, pressed);
        self.scan_keypad_irq();
    }

    pub fn scan_keypad_irq(&mut self) {
        if self.keypad.irq_condition_met() {
            self.interrupt_request |= IRQ_KEYPAD;
        }
    }

    /// Backup content to persist, if emulated code wrote it since the last call.
    pub fn take_dirty_backup(&mut self) -> Option<&[u8]> {
        let backup = &mut self.memory.backup;
        if backup.dirty {
            backup.dirty = false;
            Some(backup.data())
        } else {
            None
        }
    }
}
