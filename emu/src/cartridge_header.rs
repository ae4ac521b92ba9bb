use thiserror::Error;

/// The header occupies the first 192 bytes of every Game Pak ROM.
pub const HEADER_SIZE: usize = 0xC0;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HeaderError {
    #[error("ROM is {0} bytes long, too short to hold a cartridge header")]
    TooShort(usize),
    #[error("wrong fixed value {0:#04x} at 0xB2")]
    WrongFixedValue(u8),
    #[error("header checksum mismatch: expected {expected:#04x} but got {got:#04x}")]
    Checksum { expected: u8, got: u8 },
    #[error("{field} is not a valid ASCII sequence")]
    NotAscii { field: &'static str },
}

/// Contains the information of the cartridge header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartridgeHeader {
    rom_entry_point: u32,
    game_title: String,
    game_code: String,
    maker_code: String,
    software_version: u8,
    complement_check: u8,
}

impl CartridgeHeader {
    pub fn new(data: &[u8]) -> Result<Self, HeaderError> {
        execute_checks(data)?;

        let rom_entry_point = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        let game_title = into_ascii_str(&data[0xA0..0xAC], "game title")?;
        let game_code = into_ascii_str(&data[0xAC..0xB0], "game code")?;
        let maker_code = into_ascii_str(&data[0xB0..0xB2], "maker code")?;

        Ok(Self {
            rom_entry_point,
            game_title,
            game_code,
            maker_code,
            software_version: data[0xBC],
            complement_check: data[0xBD],
        })
    }

    /// 32bit ARM branch opcode
    #[must_use]
    pub const fn rom_entry_point(&self) -> u32 {
        self.rom_entry_point
    }

    #[must_use]
    pub fn game_title(&self) -> &str {
        &self.game_title
    }

    /// Four characters, e.g. `AXVE` for the US release of Pokemon Ruby.
    #[must_use]
    pub fn game_code(&self) -> &str {
        &self.game_code
    }

    #[must_use]
    pub fn maker_code(&self) -> &str {
        &self.maker_code
    }

    /// Usually 0x00
    #[must_use]
    pub const fn software_version(&self) -> u8 {
        self.software_version
    }

    #[must_use]
    pub const fn complement_check(&self) -> u8 {
        self.complement_check
    }
}

/// Header checksum over 0xA0..=0xBC, as verified by the BIOS.
#[must_use]
pub fn checksum(data: &[u8]) -> u8 {
    data[0xA0..0xBD]
        .iter()
        .fold(0u8, |acc, &item| acc.wrapping_sub(item))
        .wrapping_sub(0x19)
}

fn execute_checks(data: &[u8]) -> Result<(), HeaderError> {
    if data.len() < HEADER_SIZE {
        return Err(HeaderError::TooShort(data.len()));
    }

    if data[0xB2] != 0x96 {
        return Err(HeaderError::WrongFixedValue(data[0xB2]));
    }

    let expected = data[0xBD];
    let got = checksum(data);
    if got != expected {
        return Err(HeaderError::Checksum { expected, got });
    }

    Ok(())
}

fn into_ascii_str(data: &[u8], field: &'static str) -> Result<String, HeaderError> {
    if !data.is_ascii() {
        return Err(HeaderError::NotAscii { field });
    }

    // Titles shorter than the field are padded with NULs.
    Ok(String::from_utf8_lossy(data)
        .trim_end_matches('\0')
        .to_string())
}
