//! Everything between files on disk and the emulator thread: reading BIOS, ROM and
//! save files, queueing them in the right order, and writing the save back.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use emu::backup::BackupSelection;
use emu::backup_mailbox::BackupMailbox;
use emu::emu_thread::EmuHandle;
use emu::memory::{BIOS_SIZE, CART_SIZE};
use emu::message::{DeviceState, Message};
use thiserror::Error;

/// Smallest file that can hold a cartridge header.
const MIN_ROM_SIZE: u64 = 192;

#[derive(Debug, Error)]
pub enum GameError {
    #[error("failed to open {}: {source}", path.display())]
    Open { path: PathBuf, source: io::Error },
    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("the BIOS is invalid: expected {BIOS_SIZE} bytes, got {0}")]
    InvalidBios(u64),
    #[error("the ROM is invalid: {0} bytes is not a valid cartridge size")]
    InvalidRom(u64),
}

/// User choices that shape how a game is booted.
#[derive(Debug, Clone)]
pub struct Settings {
    pub bios_path: PathBuf,
    pub speed: u32,
    pub unbounded: bool,
    pub backup_type: BackupSelection,
    pub rtc: DeviceState,
    pub color_correction: bool,
    pub resample_frequency: Option<u64>,
}

/// A game being played: its files and the emulator thread running it.
pub struct Game {
    settings: Settings,
    rom_path: PathBuf,
    quicksave_path: PathBuf,
    backup_path: PathBuf,
    backup_file: Option<File>,
}

impl Game {
    #[must_use]
    pub fn new(rom_path: PathBuf, settings: Settings) -> Self {
        Self {
            quicksave_path: rom_path.with_extension("hds"),
            backup_path: rom_path.with_extension("sav"),
            rom_path,
            settings,
            backup_file: None,
        }
    }

    #[must_use]
    pub fn quicksave_path(&self) -> &Path {
        &self.quicksave_path
    }

    #[must_use]
    pub fn backup_path(&self) -> &Path {
        &self.backup_path
    }

    /// Load BIOS, ROM and save into the emulator and start running.
    ///
    /// Nothing is started if one of the files is unusable; the emulator is left paused
    /// and reset.
    pub fn start(&mut self, emu: &EmuHandle) -> Result<(), GameError> {
        emu.send(Message::Pause);
        emu.send(Message::Reset);

        let bios = load_bios(&self.settings.bios_path)?;
        let rom = load_rom(&self.rom_path)?;
        let backup = self.open_backup()?;

        emu.send(Message::LoadBios(bios));
        emu.send(Message::LoadRom(rom));
        emu.send(Message::SetBackupType(self.settings.backup_type));
        emu.send(Message::SetRtcState(self.settings.rtc));
        if let Some(backup) = backup {
            emu.send(Message::LoadBackup(backup));
        }
        emu.send(Message::SetColorCorrection(self.settings.color_correction));
        if let Some(frequency) = self.settings.resample_frequency {
            emu.send(Message::SetAudioResampleFreq(frequency));
        }
        emu.send(Message::Reset);
        self.run(emu);

        Ok(())
    }

    pub fn run(&self, emu: &EmuHandle) {
        let speed = if self.settings.unbounded {
            0
        } else {
            self.settings.speed
        };
        emu.send(Message::Run { speed });
    }

    pub fn quicksave(&self, emu: &EmuHandle) {
        emu.send(Message::Quicksave(self.quicksave_path.clone()));
    }

    pub fn quickload(&self, emu: &EmuHandle) {
        emu.send(Message::Quickload(self.quicksave_path.clone()));
    }

    /// Open the save file next to the ROM, creating an empty one if there is none.
    fn open_backup(&mut self) -> Result<Option<Vec<u8>>, GameError> {
        let path = &self.backup_path;
        if let Ok(mut file) = OpenOptions::new().read(true).write(true).open(path) {
            let mut data = Vec::new();
            let backup = match file.read_to_end(&mut data) {
                Ok(_) => {
                    tracing::info!("save data successfully loaded");
                    Some(data)
                }
                Err(e) => {
                    tracing::warn!("failed to read the save file, is it corrupted? {e}");
                    None
                }
            };
            self.backup_file = Some(file);
            return Ok(backup);
        }

        tracing::warn!("failed to open the save file, a new one is created instead");
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|source| GameError::Open {
                path: path.clone(),
                source,
            })?;
        self.backup_file = Some(file);

        Ok(None)
    }

    /// Write the backup storage back to the save file if the game changed it since the
    /// last call.
    pub fn write_backup(&mut self, backup_mailbox: &BackupMailbox) -> Result<(), GameError> {
        let Some(file) = self.backup_file.as_mut() else {
            return Ok(());
        };
        let Some(data) = backup_mailbox.take() else {
            return Ok(());
        };

        let write = |file: &mut File| -> io::Result<()> {
            file.seek(SeekFrom::Start(0))?;
            file.write_all(&data)?;
            file.set_len(data.len() as u64)?;
            file.flush()
        };
        write(file).map_err(|source| GameError::Write {
            path: self.backup_path.clone(),
            source,
        })?;

        tracing::debug!("{} bytes written to {}", data.len(), self.backup_path.display());
        Ok(())
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, GameError> {
    fs::read(path).map_err(|source| GameError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn file_len(path: &Path) -> Result<u64, GameError> {
    fs::metadata(path)
        .map(|metadata| metadata.len())
        .map_err(|source| GameError::Open {
            path: path.to_path_buf(),
            source,
        })
}

pub fn load_bios(path: &Path) -> Result<Vec<u8>, GameError> {
    let len = file_len(path)?;
    if len != BIOS_SIZE as u64 {
        return Err(GameError::InvalidBios(len));
    }

    read_file(path)
}

pub fn load_rom(path: &Path) -> Result<Vec<u8>, GameError> {
    let len = file_len(path)?;
    if !(MIN_ROM_SIZE..=CART_SIZE as u64).contains(&len) {
        return Err(GameError::InvalidRom(len));
    }

    read_file(path)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use emu::backup::{BackupSelection, BackupType};
    use emu::backup_mailbox::BackupMailbox;
    use emu::memory::BIOS_SIZE;
    use emu::message::DeviceState;
    use pretty_assertions::assert_eq;

    use super::{Game, GameError, Settings, load_bios, load_rom};

    fn settings(bios_path: PathBuf) -> Settings {
        Settings {
            bios_path,
            speed: 1,
            unbounded: false,
            backup_type: BackupSelection::AutoDetect,
            rtc: DeviceState::AutoDetect,
            color_correction: false,
            resample_frequency: None,
        }
    }

    #[test]
    fn bios_must_be_16k() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bios.bin");

        fs::write(&path, vec![0; 100]).unwrap();
        assert!(matches!(load_bios(&path), Err(GameError::InvalidBios(100))));

        fs::write(&path, vec![1; BIOS_SIZE]).unwrap();
        assert_eq!(load_bios(&path).unwrap().len(), BIOS_SIZE);
    }

    #[test]
    fn rom_size_is_checked() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("game.gba");

        fs::write(&path, vec![0; 191]).unwrap();
        assert!(matches!(load_rom(&path), Err(GameError::InvalidRom(191))));

        fs::write(&path, vec![0; 192]).unwrap();
        assert_eq!(load_rom(&path).unwrap().len(), 192);

        assert!(matches!(
            load_rom(&dir.path().join("missing.gba")),
            Err(GameError::Open { .. })
        ));
    }

    #[test]
    fn paths_follow_the_rom() {
        let game = Game::new(
            PathBuf::from("/roms/advance.gba"),
            settings(PathBuf::from("bios.bin")),
        );

        assert_eq!(game.quicksave_path(), PathBuf::from("/roms/advance.hds"));
        assert_eq!(game.backup_path(), PathBuf::from("/roms/advance.sav"));
    }

    #[test]
    fn missing_save_is_created_and_written_back() {
        let dir = tempfile::tempdir().unwrap();
        let mut game = Game::new(
            dir.path().join("advance.gba"),
            settings(dir.path().join("bios.bin")),
        );

        assert_eq!(game.open_backup().unwrap(), None);
        assert!(game.backup_path().exists());

        // Nothing written while nothing was published.
        let backup_mailbox = BackupMailbox::new();
        game.write_backup(&backup_mailbox).unwrap();
        assert_eq!(fs::read(game.backup_path()).unwrap().len(), 0);

        let mut data = vec![0; BackupType::Sram.size()];
        data[0] = 0x99;
        backup_mailbox.publish(&data);
        game.write_backup(&backup_mailbox).unwrap();
        let saved = fs::read(game.backup_path()).unwrap();
        assert_eq!(saved.len(), BackupType::Sram.size());
        assert_eq!(saved[0], 0x99);
        assert_eq!(backup_mailbox.take(), None);
    }

    #[test]
    fn every_flush_overwrites_the_save() {
        let dir = tempfile::tempdir().unwrap();
        let mut game = Game::new(
            dir.path().join("advance.gba"),
            settings(dir.path().join("bios.bin")),
        );
        fs::write(game.backup_path(), [0xEE; 8]).unwrap();
        game.open_backup().unwrap();

        let backup_mailbox = BackupMailbox::new();
        backup_mailbox.publish(&[1, 2, 3, 4]);
        game.write_backup(&backup_mailbox).unwrap();
        assert_eq!(fs::read(game.backup_path()).unwrap(), [1, 2, 3, 4]);

        backup_mailbox.publish(&[5, 6, 7, 8]);
        game.write_backup(&backup_mailbox).unwrap();
        assert_eq!(fs::read(game.backup_path()).unwrap(), [5, 6, 7, 8]);
    }

    #[test]
    fn existing_save_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let mut game = Game::new(
            dir.path().join("advance.gba"),
            settings(dir.path().join("bios.bin")),
        );
        fs::write(game.backup_path(), [1, 2, 3]).unwrap();

        assert_eq!(game.open_backup().unwrap(), Some(vec![1, 2, 3]));
    }
}
