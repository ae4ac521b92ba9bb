//! Cartridge backup storage (the battery backed save memory).

use serde::{Deserialize, Serialize};
use serde_with::{Bytes, serde_as};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackupType {
    #[default]
    None,
    Eeprom4k,
    Eeprom64k,
    Sram,
    Flash64,
    Flash128,
}

impl BackupType {
    /// Size in bytes of the storage, and of the save file backing it.
    #[must_use]
    pub const fn size(self) -> usize {
        match self {
            Self::None => 0,
            Self::Eeprom4k => 0x200,
            Self::Eeprom64k => 0x2000,
            Self::Sram => 0x8000,
            Self::Flash64 => 0x1_0000,
            Self::Flash128 => 0x2_0000,
        }
    }

    /// Value of a freshly erased cell.
    const fn erased(self) -> u8 {
        match self {
            Self::None | Self::Sram => 0x00,
            Self::Eeprom4k | Self::Eeprom64k | Self::Flash64 | Self::Flash128 => 0xFF,
        }
    }
}

/// How the backup type was chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackupSource {
    #[default]
    AutoDetect,
    Manual,
}

/// Backup type requested by a producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupSelection {
    AutoDetect,
    Manual(BackupType),
}

/// Library identifiers the official SDK links into every game using backup storage.
/// EEPROM size cannot be told from the identifier, the 64 Kbit layout is the superset.
const SIGNATURES: [(&[u8], BackupType); 6] = [
    (b"FLASH1M_V", BackupType::Flash128),
    (b"FLASH512_V", BackupType::Flash64),
    (b"FLASH_V", BackupType::Flash64),
    (b"EEPROM_V", BackupType::Eeprom64k),
    (b"SRAM_F_V", BackupType::Sram),
    (b"SRAM_V", BackupType::Sram),
];

/// Guess the backup type by looking for the save library identifier in the ROM.
#[must_use]
pub fn detect(rom: &[u8]) -> BackupType {
    // The identifiers are word aligned in every commercial ROM.
    for offset in (0..rom.len()).step_by(4) {
        for (signature, kind) in SIGNATURES {
            if rom[offset..].starts_with(signature) {
                return kind;
            }
        }
    }

    BackupType::None
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupStorage {
    pub kind: BackupType,
    pub source: BackupSource,
    #[serde_as(as = "Bytes")]
    data: Vec<u8>,
    /// Set whenever emulated code writes the storage, cleared by whoever flushes it.
    pub dirty: bool,
}

impl BackupStorage {
    /// Allocate a fresh, erased storage for the current `kind`.
    pub fn init(&mut self) {
        self.data = vec![self.kind.erased(); self.kind.size()];
        self.dirty = false;
    }

    /// Replace the content with `data`, returning how many bytes did not fit.
    pub fn load(&mut self, data: &[u8]) -> usize {
        self.data.clear();
        self.data.resize(self.kind.size(), 0);

        let len = data.len().min(self.data.len());
        self.data[..len].copy_from_slice(&data[..len]);

        data.len() - len
    }

    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Write access for the emulated cartridge; marks the storage dirty.
    pub fn data_mut(&mut self) -> &mut [u8] {
        self.dirty = true;
        &mut self.data
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{BackupSource, BackupStorage, BackupType, detect};

    fn rom_with(signature: &[u8], offset: usize) -> Vec<u8> {
        let mut rom = vec![0; 0x400];
        rom[offset..offset + signature.len()].copy_from_slice(signature);
        rom
    }

    #[test]
    fn detect_by_signature() {
        assert_eq!(detect(&rom_with(b"EEPROM_V124", 0x100)), BackupType::Eeprom64k);
        assert_eq!(detect(&rom_with(b"SRAM_V113", 0x200)), BackupType::Sram);
        assert_eq!(detect(&rom_with(b"SRAM_F_V100", 0x200)), BackupType::Sram);
        assert_eq!(detect(&rom_with(b"FLASH_V126", 0x300)), BackupType::Flash64);
        assert_eq!(detect(&rom_with(b"FLASH512_V131", 0x300)), BackupType::Flash64);
        assert_eq!(detect(&rom_with(b"FLASH1M_V103", 0x300)), BackupType::Flash128);
    }

    #[test]
    fn detect_nothing() {
        assert_eq!(detect(&[0; 0x100]), BackupType::None);
        assert_eq!(detect(&[]), BackupType::None);
        // Truncated identifier at the very end of the ROM.
        assert_eq!(detect(b"\0\0\0\0SRAM"), BackupType::None);
    }

    #[test]
    fn init_sizes_and_erases() {
        let mut storage = BackupStorage {
            kind: BackupType::Flash128,
            source: BackupSource::Manual,
            ..Default::default()
        };
        storage.init();

        assert_eq!(storage.data().len(), 0x2_0000);
        assert!(storage.data().iter().all(|b| *b == 0xFF));
        assert!(!storage.dirty);

        storage.kind = BackupType::Sram;
        storage.init();
        assert_eq!(storage.data().len(), 0x8000);
        assert!(storage.data().iter().all(|b| *b == 0));
    }

    #[test]
    fn load_truncates_and_pads() {
        let mut storage = BackupStorage {
            kind: BackupType::Eeprom4k,
            ..Default::default()
        };
        storage.init();

        assert_eq!(storage.load(&[7; 0x300]), 0x100);
        assert_eq!(storage.data(), &[7; 0x200][..]);

        assert_eq!(storage.load(&[1, 2, 3]), 0);
        assert_eq!(&storage.data()[..4], &[1, 2, 3, 0]);
        assert_eq!(storage.data().len(), 0x200);
    }

    #[test]
    fn writes_mark_dirty() {
        let mut storage = BackupStorage {
            kind: BackupType::Sram,
            ..Default::default()
        };
        storage.init();
        storage.data_mut()[0] = 0x42;

        assert!(storage.dirty);
        assert_eq!(storage.data()[0], 0x42);
    }
}
