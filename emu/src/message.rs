use std::path::PathBuf;

use crate::backup::BackupSelection;
use crate::keypad::Key;

/// Presence of an optional cartridge device such as the real time clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    AutoDetect,
    Enabled,
    Disabled,
}

/// Commands sent from producer threads to the emulator thread.
///
/// Buffers are owned by the message and released once the emulator thread is done
/// applying it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Stop the emulator thread. Anything queued after it is dropped.
    Exit,
    /// Replace the BIOS, zero padded or truncated to 16 `KBytes`.
    LoadBios(Vec<u8>),
    /// Replace the Game Pak ROM, truncated to 32 `MBytes`.
    LoadRom(Vec<u8>),
    /// Replace the backup storage content, sized by the current backup type.
    LoadBackup(Vec<u8>),
    /// Ignored once the game started running.
    SetBackupType(BackupSelection),
    Reset,
    /// Run continuously. `speed` is a multiplier of the real frame rate, 0 means unbounded.
    Run { speed: u32 },
    Pause,
    KeyInput { key: Key, pressed: bool },
    Quickload(PathBuf),
    Quicksave(PathBuf),
    SetAudioResampleFreq(u64),
    SetColorCorrection(bool),
    /// Ignored once the game started running.
    SetRtcState(DeviceState),
}
