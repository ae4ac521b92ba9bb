pub mod backup;
pub mod backup_mailbox;

#[allow(clippy::missing_panics_doc)]
pub mod bus;

pub mod cartridge_header;
pub mod clock;

#[allow(clippy::module_name_repetitions)]
pub mod emu_thread;

pub mod frame_pacer;
pub mod gba;
pub mod hardware;
pub mod keypad;
pub mod memory;
pub mod message;

#[allow(clippy::module_name_repetitions)]
pub mod message_queue;

#[allow(clippy::missing_errors_doc)]
pub mod save_state;
