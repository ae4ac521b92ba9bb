//! Quicksave/quickload of the state owned by the core.
//!
//! Only what lives in [`Gba`] is captured; a CPU or video implementation plugged in
//! through [`crate::hardware::Hardware`] persists its own state on top of this.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use bincode::Options;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::gba::Gba;

const SAVE_STATE_MAGIC: [u8; 4] = *b"KQSS";
const SAVE_STATE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum SaveStateError {
    #[error("cannot access save state: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot encode save state: {0}")]
    Encoding(#[from] bincode::Error),
    #[error("not a save state")]
    BadMagic,
    #[error("incompatible save state version: expected {SAVE_STATE_VERSION}, got {0}")]
    Version(u32),
    #[error(
        "save state is for a {saved} byte address space, this console has {running} bytes"
    )]
    MemorySize { saved: usize, running: usize },
    #[error("save state byte order does not match this console")]
    Endianness,
}

#[derive(Serialize, Deserialize)]
struct Header {
    magic: [u8; 4],
    version: u32,
}

/// Encoding shared by both directions. Decoding is bounded by `limit` bytes so a
/// corrupt length prefix is an error instead of a huge allocation.
fn options(limit: u64) -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .allow_trailing_bytes()
        .with_limit(limit)
}

pub fn quicksave(gba: &Gba, path: &Path) -> Result<(), SaveStateError> {
    let mut writer = BufWriter::new(File::create(path)?);
    let header = Header {
        magic: SAVE_STATE_MAGIC,
        version: SAVE_STATE_VERSION,
    };

    options(u64::MAX).serialize_into(&mut writer, &header)?;
    options(u64::MAX).serialize_into(&mut writer, gba)?;
    writer.flush()?;

    Ok(())
}

/// Replace `gba` with the state stored at `path`, leaving it untouched when the file
/// cannot be decoded or was saved by a console with another memory layout.
pub fn quickload(gba: &mut Gba, path: &Path) -> Result<(), SaveStateError> {
    let file = File::open(path)?;
    // Nothing in the file can claim more bytes than the file holds.
    let limit = file.metadata()?.len();
    let mut reader = BufReader::new(file);

    let header: Header = options(limit).deserialize_from(&mut reader)?;
    if header.magic != SAVE_STATE_MAGIC {
        return Err(SaveStateError::BadMagic);
    }
    if header.version != SAVE_STATE_VERSION {
        return Err(SaveStateError::Version(header.version));
    }

    let state: Gba = options(limit).deserialize_from(&mut reader)?;
    if state.bus.memory_size() != gba.bus.memory_size() {
        return Err(SaveStateError::MemorySize {
            saved: state.bus.memory_size(),
            running: gba.bus.memory_size(),
        });
    }
    if state.bus.is_big_endian() != gba.bus.is_big_endian() {
        return Err(SaveStateError::Endianness);
    }
    *gba = state;

    Ok(())
}
