use serde::{Deserialize, Serialize};

/// Button bit positions in the KEYINPUT register (when pressed are set to 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    A = 1 << 0,
    B = 1 << 1,
    Select = 1 << 2,
    Start = 1 << 3,
    Right = 1 << 4,
    Left = 1 << 5,
    Up = 1 << 6,
    Down = 1 << 7,
    R = 1 << 8,
    L = 1 << 9,
}

impl Key {
    pub const ALL: [Self; 10] = [
        Self::A,
        Self::B,
        Self::Select,
        Self::Start,
        Self::Right,
        Self::Left,
        Self::Up,
        Self::Down,
        Self::R,
        Self::L,
    ];

    #[must_use]
    pub const fn mask(self) -> u16 {
        self as u16
    }
}

/// Bits 0-9 of both KEYINPUT and KEYCNT.
const KEYS_MASK: u16 = 0x03FF;

/// KEYCNT bit 14: raise an interrupt when the condition holds.
const IRQ_ENABLE: u16 = 1 << 14;

/// KEYCNT bit 15: 0 = any selected key pressed, 1 = all selected keys pressed.
const IRQ_CONDITION_AND: u16 = 1 << 15;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keypad {
    pub key_input: u16,
    pub key_interrupt_control: u16,
}

impl Default for Keypad {
    fn default() -> Self {
        Self::new()
    }
}

impl Keypad {
    /// Create a new Keypad with all buttons released (all bits set to 1).
    #[must_use]
    pub const fn new() -> Self {
        Self {
            key_input: KEYS_MASK,
            key_interrupt_control: 0,
        }
    }

    /// Set key state: pressed = true, released = false.
    /// The register is active-low: bit 0 = pressed, bit 1 = released.
    pub const fn set_key(&mut self, key: Key, pressed: bool) {
        if pressed {
            self.key_input &= !key.mask();
        } else {
            self.key_input |= key.mask();
        }
    }

    #[must_use]
    pub const fn is_pressed(&self, key: Key) -> bool {
        self.key_input & key.mask() == 0
    }

    /// Whether KEYCNT asks for a keypad interrupt given the current KEYINPUT.
    #[must_use]
    pub const fn irq_condition_met(&self) -> bool {
        if self.key_interrupt_control & IRQ_ENABLE == 0 {
            return false;
        }

        let pressed = !self.key_input & KEYS_MASK;
        let selected = self.key_interrupt_control & KEYS_MASK;

        if self.key_interrupt_control & IRQ_CONDITION_AND == 0 {
            pressed & selected != 0
        } else {
            pressed & selected == selected
        }
    }
}
