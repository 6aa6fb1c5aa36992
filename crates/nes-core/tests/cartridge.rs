//! Cartridge loading tests

use std::fs;
use std::path::PathBuf;

use nes_core::cartridge::{
    Cartridge, Extension, Format, Mirroring, CHR_BANK_SIZE, HEADER_SIZE, PRG_BANK_SIZE,
    TRAINER_SIZE,
};
use nes_core::harness::synthetic_rom;
use nes_core::{Component, Error};

fn cartridge() -> Cartridge {
    let mut cartridge = Cartridge::new();
    cartridge.initialize().unwrap();
    cartridge
}

fn temp_rom(name: &str, bytes: &[u8]) -> PathBuf {
    let path = std::env::temp_dir().join(format!("nes-core-{}-{}.nes", name, std::process::id()));
    fs::write(&path, bytes).unwrap();
    path
}

#[test]
fn test_load_file_and_extract_banks() {
    let rom = synthetic_rom(2, 1);
    let path = temp_rom("banks", &rom);
    let mut cartridge = cartridge();

    cartridge.load_file(&path).unwrap();
    fs::remove_file(&path).ok();

    assert!(cartridge.is_loaded());
    assert_eq!(cartridge.size().unwrap(), HEADER_SIZE + 2 * PRG_BANK_SIZE + CHR_BANK_SIZE);

    let prg0 = cartridge.block_program(0).unwrap();
    let prg1 = cartridge.block_program(1).unwrap();
    assert_eq!(prg0.len(), PRG_BANK_SIZE);
    assert_eq!(prg0, rom[HEADER_SIZE..HEADER_SIZE + PRG_BANK_SIZE]);
    assert_eq!(prg1, rom[HEADER_SIZE + PRG_BANK_SIZE..HEADER_SIZE + 2 * PRG_BANK_SIZE]);
    assert!(prg1.iter().all(|&b| b == 2));

    let chr0 = cartridge.block_character(0).unwrap();
    assert_eq!(chr0.len(), CHR_BANK_SIZE);
    assert!(chr0.iter().all(|&b| b == 0x80));

    assert!(matches!(cartridge.block_program(2), Err(Error::InvalidIndex(2))));
    assert!(matches!(cartridge.block_character(1), Err(Error::InvalidIndex(1))));
}

#[test]
fn test_header_fields() {
    let mut rom = synthetic_rom(1, 1);
    rom[6] = 0x31; // mapper low nibble 3, vertical mirroring
    rom[7] = 0x10; // mapper high nibble 1
    rom[8] = 2;
    let mut cartridge = cartridge();
    cartridge.load(&rom).unwrap();

    let header = cartridge.header().unwrap();
    assert!(header.validate());
    assert_eq!(header.prg_banks(), 1);
    assert_eq!(header.chr_banks(), 1);
    assert_eq!(header.mapper_number(), 0x13);
    assert_eq!(header.mirroring(), Mirroring::Vertical);
    assert!(!header.has_trainer());
    assert!(!header.has_sram());
    assert_eq!(header.format(), Format::Ines);
    assert!(matches!(
        header.extension(),
        Extension::Ines1 { prg_ram_size: 2, .. }
    ));
}

#[test]
fn test_trainer_is_skipped() {
    let mut rom = synthetic_rom(1, 0);
    rom[6] = 0x04;
    let mut image = rom[..HEADER_SIZE].to_vec();
    image.extend_from_slice(&[0xEE; TRAINER_SIZE]);
    image.extend_from_slice(&rom[HEADER_SIZE..]);

    let mut cartridge = cartridge();
    cartridge.load(&image).unwrap();
    assert!(cartridge.header().unwrap().has_trainer());
    assert!(cartridge.block_program(0).unwrap().iter().all(|&b| b == 1));
}

#[test]
fn test_bad_magic_is_rejected() {
    let mut rom = synthetic_rom(1, 0);
    rom[0] = b'X';
    let mut cartridge = cartridge();
    assert!(matches!(cartridge.load(&rom), Err(Error::Malformed(_))));
    assert!(!cartridge.is_loaded());
    assert!(matches!(cartridge.header(), Err(Error::Unloaded)));
}

#[test]
fn test_ines2_is_unsupported() {
    let mut rom = synthetic_rom(1, 0);
    rom[7] = 0x08;
    let mut cartridge = cartridge();
    assert!(matches!(cartridge.load(&rom), Err(Error::Unsupported(_))));
    assert!(!cartridge.is_loaded());
    assert_eq!(cartridge.size().unwrap(), 0);
}

#[test]
fn test_short_image() {
    let mut cartridge = cartridge();
    assert!(matches!(cartridge.load(&[0x4E, 0x45, 0x53]), Err(Error::Malformed(_))));
    assert!(!cartridge.is_loaded());

    // Header claims two banks but only one is present
    let mut rom = synthetic_rom(1, 0);
    rom[4] = 2;
    cartridge.load(&rom).unwrap();
    assert!(cartridge.block_program(0).is_ok());
    assert!(matches!(cartridge.block_program(1), Err(Error::Malformed(_))));
}

#[test]
fn test_missing_file() {
    let mut cartridge = cartridge();
    let path = std::env::temp_dir().join("nes-core-does-not-exist.nes");
    assert!(matches!(cartridge.load_file(&path), Err(Error::FileNotFound(p)) if p == path));
    assert!(!cartridge.is_loaded());
}

#[test]
fn test_unload() {
    let mut cartridge = cartridge();
    assert!(matches!(cartridge.unload(), Err(Error::Unloaded)));

    cartridge.load(&synthetic_rom(1, 0)).unwrap();
    cartridge.unload().unwrap();
    assert!(!cartridge.is_loaded());
    assert!(matches!(cartridge.block_program(0), Err(Error::Unloaded)));
}

#[test]
fn test_lifecycle() {
    let mut cartridge = Cartridge::new();
    assert!(matches!(
        cartridge.load(&synthetic_rom(1, 0)),
        Err(Error::Uninitialized(Component::Rom))
    ));

    cartridge.initialize().unwrap();
    assert!(matches!(
        cartridge.initialize(),
        Err(Error::AlreadyInitialized(Component::Rom))
    ));

    cartridge.load(&synthetic_rom(1, 0)).unwrap();
    cartridge.uninitialize().unwrap();
    assert!(!cartridge.is_loaded());
    assert!(!cartridge.is_initialized());
}

#[test]
fn test_rejected_image_keeps_previous_cartridge() {
    let mut cartridge = cartridge();
    cartridge.load(&synthetic_rom(2, 1)).unwrap();
    let size = cartridge.size().unwrap();

    let mut bad_magic = synthetic_rom(1, 0);
    bad_magic[0] = b'X';
    let mut ines2 = synthetic_rom(1, 0);
    ines2[7] = 0x08;

    assert!(matches!(cartridge.load(&bad_magic), Err(Error::Malformed(_))));
    assert!(matches!(cartridge.load(&ines2), Err(Error::Unsupported(_))));
    assert!(matches!(cartridge.load(&[0x4E, 0x45]), Err(Error::Malformed(_))));

    assert!(cartridge.is_loaded());
    assert_eq!(cartridge.size().unwrap(), size);
    assert_eq!(cartridge.header().unwrap().prg_banks(), 2);
    assert!(cartridge.block_program(1).unwrap().iter().all(|&b| b == 2));
}
