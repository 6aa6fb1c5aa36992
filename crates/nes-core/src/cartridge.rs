//! Cartridge ROM loading
//!
//! This module parses iNES images and hands out program and character banks.
//! Bank switching is not modelled; banks are extracted flat, by index.

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use log::{info, warn};

use crate::error::{Component, Error, Result};

/// iNES header size
pub const HEADER_SIZE: usize = 16;
/// Trainer block size, present when flags 6 bit 2 is set
pub const TRAINER_SIZE: usize = 512;
/// Program bank size
pub const PRG_BANK_SIZE: usize = 16 * 1024;
/// Character bank size
pub const CHR_BANK_SIZE: usize = 8 * 1024;
/// Magic number: "NES\x1A"
pub const NES_MAGIC: [u8; 4] = [b'N', b'E', b'S', 0x1A];

/// Nametable mirroring from flags 6 bit 0
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mirroring {
    Horizontal,
    Vertical,
}

/// Header layout selected by flags 7 bits 2-3
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ines,
    Ines2,
}

/// Bytes 8-15 interpreted per format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extension {
    Ines1 {
        /// PRG RAM size in 8KB units
        prg_ram_size: u8,
        /// Flags 9 bit 0: 0 = NTSC, 1 = PAL
        tv_system: u8,
        flags_10: u8,
    },
    Ines2 {
        /// Mapper bits 8-11
        mapper_msb: u8,
        submapper: u8,
        prg_banks_msb: u8,
        chr_banks_msb: u8,
        prg_ram_shift: u8,
        prg_nvram_shift: u8,
        chr_ram_shift: u8,
        chr_nvram_shift: u8,
        tv_mode: u8,
        vs_ppu: u8,
        vs_mode: u8,
    },
}

/// iNES header, kept as raw bytes with bit accessors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InesHeader([u8; HEADER_SIZE]);

impl InesHeader {
    /// Copy the header out of the first bytes of an image
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let raw: [u8; HEADER_SIZE] = bytes
            .get(..HEADER_SIZE)
            .and_then(|b| b.try_into().ok())
            .ok_or_else(|| {
                Error::Malformed(format!(
                    "image is {} bytes, header needs {}",
                    bytes.len(),
                    HEADER_SIZE
                ))
            })?;
        Ok(Self(raw))
    }

    /// The magic number must match before any other field is trusted
    pub fn validate(&self) -> bool {
        self.magic() == NES_MAGIC
    }

    pub fn magic(&self) -> [u8; 4] {
        [self.0[0], self.0[1], self.0[2], self.0[3]]
    }

    /// PRG ROM size in 16KB units
    pub fn prg_banks(&self) -> u8 {
        self.0[4]
    }

    /// CHR ROM size in 8KB units
    pub fn chr_banks(&self) -> u8 {
        self.0[5]
    }

    pub fn flags_6(&self) -> u8 {
        self.0[6]
    }

    pub fn flags_7(&self) -> u8 {
        self.0[7]
    }

    pub fn mirroring(&self) -> Mirroring {
        if self.flags_6() & 0x01 != 0 {
            Mirroring::Vertical
        } else {
            Mirroring::Horizontal
        }
    }

    /// Check if SRAM is present
    pub fn has_sram(&self) -> bool {
        (self.flags_6() & 0x02) != 0
    }

    /// Check if trainer is present
    pub fn has_trainer(&self) -> bool {
        (self.flags_6() & 0x04) != 0
    }

    pub fn four_screen(&self) -> bool {
        (self.flags_6() & 0x08) != 0
    }

    /// Mapper number: low nibble from flags 6, high nibble from flags 7
    pub fn mapper_number(&self) -> u8 {
        (self.flags_6() >> 4) | (self.flags_7() & 0xF0)
    }

    pub fn vs_unisystem(&self) -> bool {
        (self.flags_7() & 0x01) != 0
    }

    pub fn playchoice(&self) -> bool {
        (self.flags_7() & 0x02) != 0
    }

    pub fn format(&self) -> Format {
        if (self.flags_7() >> 2) & 0x03 == 2 {
            Format::Ines2
        } else {
            Format::Ines
        }
    }

    pub fn extension(&self) -> Extension {
        let b = &self.0;
        match self.format() {
            Format::Ines => Extension::Ines1 {
                prg_ram_size: b[8],
                tv_system: b[9] & 0x01,
                flags_10: b[10],
            },
            Format::Ines2 => Extension::Ines2 {
                mapper_msb: b[8] & 0x0F,
                submapper: b[8] >> 4,
                prg_banks_msb: b[9] & 0x0F,
                chr_banks_msb: b[9] >> 4,
                prg_ram_shift: b[10] & 0x0F,
                prg_nvram_shift: b[10] >> 4,
                chr_ram_shift: b[11] & 0x0F,
                chr_nvram_shift: b[11] >> 4,
                tv_mode: b[12] & 0x03,
                vs_ppu: b[13] & 0x0F,
                vs_mode: b[13] >> 4,
            },
        }
    }

    /// Offset of the first program bank
    fn prg_offset(&self) -> usize {
        HEADER_SIZE + if self.has_trainer() { TRAINER_SIZE } else { 0 }
    }
}

impl fmt::Display for InesHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} PRG:{}x16KB CHR:{}x8KB mapper:{} mirroring:{:?} ",
            self.format(),
            self.prg_banks(),
            self.chr_banks(),
            self.mapper_number(),
            self.mirroring()
        )?;
        write!(
            f,
            "sram:{} trainer:{} four-screen:{}",
            self.has_sram() as u8,
            self.has_trainer() as u8,
            self.four_screen() as u8
        )
    }
}

/// Cartridge image loader
#[derive(Debug, Clone, Default)]
pub struct Cartridge {
    image: Vec<u8>,
    initialized: bool,
    loaded: bool,
}

impl Cartridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initialize(&mut self) -> Result<()> {
        if self.initialized {
            return Err(Error::AlreadyInitialized(Component::Rom));
        }
        self.initialized = true;
        Ok(())
    }

    /// Unloads first if a cartridge is loaded
    pub fn uninitialize(&mut self) -> Result<()> {
        self.ensure_initialized()?;
        if self.loaded {
            self.unload()?;
        }
        self.initialized = false;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Read a whole file and load it
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.ensure_initialized()?;
        let path = path.as_ref();
        let block = fs::read(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::FileNotFound(path.to_path_buf()),
            _ => Error::Io(e),
        })?;
        info!("read {} bytes from {}", block.len(), path.display());
        self.load(&block)
    }

    /// Load an image from memory.
    ///
    /// A short, malformed or iNES 2.0 image is rejected before anything is
    /// replaced, so a previously loaded cartridge stays loaded.
    pub fn load(&mut self, block: &[u8]) -> Result<()> {
        self.ensure_initialized()?;
        let header = InesHeader::parse(block)?;
        if let Err(e) = check_header(&header) {
            warn!("rejected cartridge: {}", e);
            return Err(e);
        }

        self.image = block.to_vec();
        self.loaded = true;
        info!("cartridge loaded: {}", header);
        Ok(())
    }

    pub fn unload(&mut self) -> Result<()> {
        self.ensure_loaded()?;
        self.image = Vec::new();
        self.loaded = false;
        info!("cartridge unloaded");
        Ok(())
    }

    /// Get the iNES header
    pub fn header(&self) -> Result<InesHeader> {
        self.ensure_loaded()?;
        InesHeader::parse(&self.image)
    }

    /// Copy out program bank `index`
    pub fn block_program(&self, index: usize) -> Result<Vec<u8>> {
        let header = self.header()?;
        if index >= header.prg_banks() as usize {
            return Err(Error::InvalidIndex(index));
        }
        self.bank(header.prg_offset() + index * PRG_BANK_SIZE, PRG_BANK_SIZE)
    }

    /// Copy out character bank `index`; character banks follow all program banks
    pub fn block_character(&self, index: usize) -> Result<Vec<u8>> {
        let header = self.header()?;
        if index >= header.chr_banks() as usize {
            return Err(Error::InvalidIndex(index));
        }
        let base = header.prg_offset() + header.prg_banks() as usize * PRG_BANK_SIZE;
        self.bank(base + index * CHR_BANK_SIZE, CHR_BANK_SIZE)
    }

    fn bank(&self, offset: usize, size: usize) -> Result<Vec<u8>> {
        self.image
            .get(offset..offset + size)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| {
                Error::Malformed(format!(
                    "bank at {:#X}..{:#X} exceeds image of {} bytes",
                    offset,
                    offset + size,
                    self.image.len()
                ))
            })
    }

    /// Total image length in bytes
    pub fn size(&self) -> Result<usize> {
        self.ensure_initialized()?;
        Ok(self.image.len())
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(Error::Uninitialized(Component::Rom))
        }
    }

    fn ensure_loaded(&self) -> Result<()> {
        self.ensure_initialized()?;
        if self.loaded {
            Ok(())
        } else {
            Err(Error::Unloaded)
        }
    }
}

fn check_header(header: &InesHeader) -> Result<()> {
    if !header.validate() {
        return Err(Error::Malformed(format!("bad magic {:02X?}", header.magic())));
    }
    if header.format() == Format::Ines2 {
        return Err(Error::Unsupported("iNES 2.0 images".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_bytes(prg: u8, chr: u8, flags_6: u8, flags_7: u8) -> Vec<u8> {
        let mut rom = Vec::new();
        rom.extend_from_slice(&NES_MAGIC);
        rom.push(prg);
        rom.push(chr);
        rom.push(flags_6);
        rom.push(flags_7);
        rom.extend_from_slice(&[0u8; 8]);
        rom
    }

    #[test]
    fn test_header_parsing() {
        let header = InesHeader::parse(&header_bytes(1, 1, 0x13, 0x20)).unwrap();
        assert!(header.validate());
        assert_eq!(header.prg_banks(), 1);
        assert_eq!(header.chr_banks(), 1);
        assert_eq!(header.mapper_number(), 0x21);
        assert_eq!(header.mirroring(), Mirroring::Vertical);
        assert!(header.has_sram());
        assert!(!header.has_trainer());
        assert_eq!(header.format(), Format::Ines);
    }

    #[test]
    fn test_ines2_extension() {
        let mut bytes = header_bytes(1, 0, 0, 0x08);
        bytes[8] = 0x52;
        bytes[12] = 0x01;
        let header = InesHeader::parse(&bytes).unwrap();
        assert_eq!(header.format(), Format::Ines2);
        match header.extension() {
            Extension::Ines2 { mapper_msb, submapper, tv_mode, .. } => {
                assert_eq!(mapper_msb, 2);
                assert_eq!(submapper, 5);
                assert_eq!(tv_mode, 1);
            }
            other => panic!("unexpected extension {:?}", other),
        }
    }

    #[test]
    fn test_trainer_offset() {
        let mut rom = header_bytes(1, 1, 0x04, 0);
        rom.extend_from_slice(&[0xEE; TRAINER_SIZE]);
        rom.extend_from_slice(&[0x11; PRG_BANK_SIZE]);
        rom.extend_from_slice(&[0x22; CHR_BANK_SIZE]);

        let mut cart = Cartridge::new();
        cart.initialize().unwrap();
        cart.load(&rom).unwrap();
        assert!(cart.block_program(0).unwrap().iter().all(|&b| b == 0x11));
        assert!(cart.block_character(0).unwrap().iter().all(|&b| b == 0x22));
    }

    #[test]
    fn test_ines2_rolls_back() {
        let mut cart = Cartridge::new();
        cart.initialize().unwrap();
        let err = cart.load(&header_bytes(1, 0, 0, 0x08)).unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)));
        assert!(!cart.is_loaded());
        assert_eq!(cart.size().unwrap(), 0);
    }
}
