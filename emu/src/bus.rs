//! Flat, byte-addressable memory as seen by the CPU core.
//!
//! The bus does not know about memory mapped I/O or mirrors: whoever drives it is
//! expected to have translated the address already. What it does guarantee is the
//! byte order of multi-byte accesses and the ARM7TDMI behaviour on misaligned loads,
//! which rotate the naturally aligned value instead of fetching across the boundary.

use serde::{Deserialize, Serialize};
use serde_with::{Bytes, serde_as};

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressSpace {
    #[serde_as(as = "Bytes")]
    memory: Vec<u8>,
    big_endian: bool,
}

#[derive(Debug, Clone, Copy)]
enum Access {
    Read,
    Write,
}

impl std::fmt::Display for Access {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read => f.write_str("read"),
            Self::Write => f.write_str("write"),
        }
    }
}

impl AddressSpace {
    #[must_use]
    pub fn new(memory_size: usize, big_endian: bool) -> Self {
        Self {
            memory: vec![0; memory_size],
            big_endian,
        }
    }

    #[must_use]
    pub const fn memory_size(&self) -> usize {
        self.memory.len()
    }

    #[must_use]
    pub const fn is_big_endian(&self) -> bool {
        self.big_endian
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.memory
    }

    /// Zero the whole address space, keeping its size and byte order.
    pub fn reset(&mut self) {
        self.memory.fill(0);
    }

    /// Start index of an access of `N` bytes at the aligned `address`.
    ///
    /// The bounds are checked on `[requested, requested + N)`, before alignment.
    ///
    /// # Panics
    ///
    /// An access that does not fit entirely inside the address space is a fatal
    /// condition: it means the core or the memory map handed us a wrong address.
    fn span<const N: usize>(&self, address: u32, requested: u32, access: Access) -> usize {
        match (requested as usize).checked_add(N) {
            Some(end) if end <= self.memory.len() => address as usize,
            _ => panic!(
                "Segmentation fault: invalid {access} of size {} at address {requested:#010x}",
                N * 8
            ),
        }
    }

    fn load<const N: usize>(&self, address: u32, requested: u32) -> [u8; N] {
        let start = self.span::<N>(address, requested, Access::Read);
        let mut bytes = [0; N];
        bytes.copy_from_slice(&self.memory[start..start + N]);
        bytes
    }

    fn store<const N: usize>(&mut self, address: u32, requested: u32, bytes: [u8; N]) {
        let start = self.span::<N>(address, requested, Access::Write);
        self.memory[start..start + N].copy_from_slice(&bytes);
    }

    #[must_use]
    pub fn read8(&self, address: u32) -> u8 {
        let [value] = self.load::<1>(address, address);
        value
    }

    pub fn write8(&mut self, address: u32, value: u8) {
        self.store(address, address, [value]);
    }

    /// Reads the half-word containing `address`.
    ///
    /// The result is 32 bits wide: an odd address rotates the half-word right by 8
    /// inside the whole register, so the low byte ends up in bits 24..=31.
    #[must_use]
    pub fn read16(&self, address: u32) -> u32 {
        let rotate = (address % 2) * 8;
        let bytes = self.load::<2>(address & !0b1, address);
        let value = if self.big_endian {
            u16::from_be_bytes(bytes)
        } else {
            u16::from_le_bytes(bytes)
        };

        u32::from(value).rotate_right(rotate)
    }

    pub fn write16(&mut self, address: u32, value: u16) {
        let bytes = if self.big_endian {
            value.to_be_bytes()
        } else {
            value.to_le_bytes()
        };

        self.store(address & !0b1, address, bytes);
    }

    /// Reads the word containing `address`, rotated right by the misalignment.
    #[must_use]
    pub fn read32(&self, address: u32) -> u32 {
        let rotate = (address % 4) * 8;
        let bytes = self.load::<4>(address & !0b11, address);
        let value = if self.big_endian {
            u32::from_be_bytes(bytes)
        } else {
            u32::from_le_bytes(bytes)
        };

        value.rotate_right(rotate)
    }

    pub fn write32(&mut self, address: u32, value: u32) {
        let bytes = if self.big_endian {
            value.to_be_bytes()
        } else {
            value.to_le_bytes()
        };

        self.store(address & !0b11, address, bytes);
    }
}
