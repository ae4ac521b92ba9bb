use serde::{Deserialize, Serialize};
use serde_with::{Bytes, serde_as};

use crate::backup::BackupStorage;

/// From 0x00000000 to 0x00003FFF (16 `KBytes`).
pub const BIOS_SIZE: usize = 0x0000_4000;

/// Largest Game Pak ROM the cartridge bus can address (32 `MBytes`).
pub const CART_SIZE: usize = 0x0200_0000;

/// Regions filled from producer supplied buffers.
///
/// Loading never fails: a buffer larger than its region is truncated and the
/// number of dropped bytes is returned so the caller can report it.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memory {
    #[serde_as(as = "Box<[_; BIOS_SIZE]>")]
    bios: Box<[u8; BIOS_SIZE]>,

    #[serde_as(as = "Bytes")]
    rom: Vec<u8>,

    pub backup: BackupStorage,
}

impl Default for Memory {
    fn default() -> Self {
        Self {
            bios: Box::new([0; BIOS_SIZE]),
            rom: Vec::new(),
            backup: BackupStorage::default(),
        }
    }
}

impl Memory {
    pub fn load_bios(&mut self, data: &[u8]) -> usize {
        let len = data.len().min(BIOS_SIZE);
        self.bios.fill(0);
        self.bios[..len].copy_from_slice(&data[..len]);

        data.len() - len
    }

    pub fn load_rom(&mut self, data: &[u8]) -> usize {
        let len = data.len().min(CART_SIZE);
        self.rom.clear();
        self.rom.extend_from_slice(&data[..len]);

        data.len() - len
    }

    pub fn load_backup(&mut self, data: &[u8]) -> usize {
        self.backup.load(data)
    }

    #[must_use]
    pub fn bios(&self) -> &[u8; BIOS_SIZE] {
        &self.bios
    }

    #[must_use]
    pub fn rom(&self) -> &[u8] {
        &self.rom
    }

    #[must_use]
    pub fn rom_size(&self) -> usize {
        self.rom.len()
    }
}
