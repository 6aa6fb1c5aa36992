//! Self-test harness
//!
//! Black-box conformance checks over the public contracts of memory, CPU
//! and cartridge. Each check builds its own components, so checks are
//! independent of each other and of any loaded ROM.

use std::fmt;

use crate::cartridge::{Cartridge, CHR_BANK_SIZE, HEADER_SIZE, NES_MAGIC, PRG_BANK_SIZE};
use crate::cpu::{Cpu, StatusFlags, IRQ_VECTOR, NMI_VECTOR, RESET_VECTOR};
use crate::error::{Error, Result};
use crate::memory::{Memory, MEMORY_SIZE};
use crate::system::{NesSystem, RunMode};

/// Result of one check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Pass,
    Fail,
    /// The check's own setup failed, so nothing was verified
    Inconclusive,
}

/// A named check and its outcome
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: &'static str,
    pub outcome: Outcome,
    /// Setup error for inconclusive checks
    pub detail: Option<String>,
}

/// Pass/fail/inconclusive counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub passed: usize,
    pub failed: usize,
    pub inconclusive: usize,
}

impl Tally {
    pub fn from_results(results: &[CheckResult]) -> Self {
        let mut tally = Tally::default();
        for result in results {
            match result.outcome {
                Outcome::Pass => tally.passed += 1,
                Outcome::Fail => tally.failed += 1,
                Outcome::Inconclusive => tally.inconclusive += 1,
            }
        }
        tally
    }

    pub fn total(&self) -> usize {
        self.passed + self.failed + self.inconclusive
    }

    /// True when nothing failed
    pub fn ok(&self) -> bool {
        self.failed == 0
    }
}

impl fmt::Display for Tally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} passed, {} failed, {} inconclusive ({} total)",
            self.passed,
            self.failed,
            self.inconclusive,
            self.total()
        )
    }
}

type Check = fn() -> Result<bool>;

const CHECKS: &[(&str, Check)] = &[
    ("memory: zeroed after initialize", memory_zeroed),
    ("memory: out-of-range access rejected", memory_out_of_range),
    ("memory: lifecycle errors", memory_lifecycle),
    ("cpu: power-on registers", cpu_power_on),
    ("cpu: stack round trip", cpu_stack_round_trip),
    ("cpu: reset vector", cpu_reset_vector),
    ("cpu: irq ignored while masked", cpu_irq_masked),
    ("cpu: irq sequence", cpu_irq_sequence),
    ("cpu: nmi ignores mask", cpu_nmi),
    ("cpu: counted loop", cpu_counted_loop),
    ("rom: bank extraction", rom_banks),
    ("rom: bad magic rejected", rom_bad_magic),
    ("rom: iNES 2.0 unsupported", rom_ines2),
    ("system: load and run", system_load_and_run),
];

/// Run every check in order
pub fn run_all() -> Vec<CheckResult> {
    CHECKS
        .iter()
        .map(|&(name, check)| {
            let (outcome, detail) = match check() {
                Ok(true) => (Outcome::Pass, None),
                Ok(false) => (Outcome::Fail, None),
                Err(e) => (Outcome::Inconclusive, Some(e.to_string())),
            };
            CheckResult { name, outcome, detail }
        })
        .collect()
}

/// Minimal iNES image with counted banks; each bank is filled with its own
/// index plus one (PRG) or 0x80 plus its index (CHR), wrapping at 0xFF
pub fn synthetic_rom(prg_banks: u8, chr_banks: u8) -> Vec<u8> {
    let mut rom = Vec::with_capacity(
        HEADER_SIZE + prg_banks as usize * PRG_BANK_SIZE + chr_banks as usize * CHR_BANK_SIZE,
    );
    rom.extend_from_slice(&NES_MAGIC);
    rom.push(prg_banks);
    rom.push(chr_banks);
    rom.extend_from_slice(&[0u8; HEADER_SIZE - 6]);
    for bank in 0..prg_banks {
        rom.extend(std::iter::repeat(bank.wrapping_add(1)).take(PRG_BANK_SIZE));
    }
    for bank in 0..chr_banks {
        rom.extend(std::iter::repeat(0x80u8.wrapping_add(bank)).take(CHR_BANK_SIZE));
    }
    rom
}

fn memory() -> Result<Memory> {
    let mut memory = Memory::new();
    memory.initialize()?;
    Ok(memory)
}

fn cpu_with_memory() -> Result<(Cpu, Memory)> {
    let memory = memory()?;
    let mut cpu = Cpu::new();
    cpu.initialize()?;
    Ok((cpu, memory))
}

fn memory_zeroed() -> Result<bool> {
    let mut memory = memory()?;
    for address in 0..MEMORY_SIZE {
        if *memory.at(address)? != 0 {
            return Ok(false);
        }
    }
    Ok(true)
}

fn memory_out_of_range() -> Result<bool> {
    let mut memory = memory()?;
    let read = matches!(memory.at(MEMORY_SIZE), Err(Error::InvalidAddress(MEMORY_SIZE)));
    let write = matches!(memory.write(MEMORY_SIZE - 1, &[0, 0]), Err(Error::InvalidAddress(_)));
    Ok(read && write)
}

fn memory_lifecycle() -> Result<bool> {
    let mut memory = Memory::new();
    let before = matches!(memory.at(0), Err(Error::Uninitialized(_)));
    memory.initialize()?;
    let twice = matches!(memory.initialize(), Err(Error::AlreadyInitialized(_)));
    Ok(before && twice)
}

fn cpu_power_on() -> Result<bool> {
    let (cpu, _) = cpu_with_memory()?;
    let r = cpu.registers();
    Ok(r.a == 0
        && r.x == 0
        && r.y == 0
        && r.p.bits() == 0x06
        && r.sp == 0xFF
        && r.pc == 0
        && cpu.cycles() == 0)
}

fn cpu_stack_round_trip() -> Result<bool> {
    let (mut cpu, mut memory) = cpu_with_memory()?;
    let sp = cpu.registers().sp;
    cpu.push(&mut memory, 0x5A)?;
    let byte_ok = cpu.pop(&mut memory)? == 0x5A && cpu.registers().sp == sp;
    cpu.push_word(&mut memory, 0xBEEF)?;
    let word_ok = cpu.pop_word(&mut memory)? == 0xBEEF && cpu.registers().sp == sp;
    Ok(byte_ok && word_ok)
}

fn cpu_reset_vector() -> Result<bool> {
    let (mut cpu, mut memory) = cpu_with_memory()?;
    memory.write(RESET_VECTOR as usize, &[0x34, 0x12])?;
    cpu.reset(&mut memory)?;
    Ok(cpu.registers().pc == 0x1234)
}

fn cpu_irq_masked() -> Result<bool> {
    let (mut cpu, mut memory) = cpu_with_memory()?;
    cpu.registers_mut().p.set_interrupt(false);
    let before = *cpu.registers();
    cpu.irq(&mut memory)?;
    Ok(*cpu.registers() == before && cpu.cycles() == 0 && memory.peek(0x01FF)? == 0)
}

fn cpu_irq_sequence() -> Result<bool> {
    let (mut cpu, mut memory) = cpu_with_memory()?;
    memory.write(IRQ_VECTOR as usize, &[0x00, 0x90])?;
    cpu.registers_mut().pc = 0x1234;
    cpu.registers_mut().p.set(StatusFlags::BREAK, true);
    let p = cpu.registers().p.bits();
    cpu.irq(&mut memory)?;
    Ok(cpu.registers().pc == 0x9000
        && cpu.cycles() == 7
        && cpu.registers().sp == 0xFC
        && memory.peek(0x01FF)? == 0x12
        && memory.peek(0x01FE)? == 0x34
        && memory.peek(0x01FD)? == p & !StatusFlags::BREAK)
}

fn cpu_nmi() -> Result<bool> {
    let (mut cpu, mut memory) = cpu_with_memory()?;
    memory.write(NMI_VECTOR as usize, &[0x00, 0xA0])?;
    cpu.registers_mut().p.set_interrupt(false);
    cpu.nmi(&mut memory)?;
    Ok(cpu.registers().pc == 0xA000 && cpu.cycles() == 7)
}

fn cpu_counted_loop() -> Result<bool> {
    // LDX #$05; DEX; BNE -3; BRK
    let (mut cpu, mut memory) = cpu_with_memory()?;
    memory.write(0x0200, &[0xA2, 0x05, 0xCA, 0xD0, 0xFD, 0x00])?;
    cpu.registers_mut().pc = 0x0200;
    while cpu.registers().pc != 0x0205 {
        cpu.step(&mut memory)?;
    }
    // 2 + 5 * (DEX 2) + 4 taken branches * 3 + final untaken 2
    Ok(cpu.registers().x == 0 && cpu.status().zero() && cpu.cycles() == 2 + 10 + 12 + 2)
}

fn loaded_cartridge(rom: &[u8]) -> Result<Cartridge> {
    let mut cartridge = Cartridge::new();
    cartridge.initialize()?;
    cartridge.load(rom)?;
    Ok(cartridge)
}

fn rom_banks() -> Result<bool> {
    let rom = synthetic_rom(2, 1);
    let cartridge = loaded_cartridge(&rom)?;
    let prg0 = cartridge.block_program(0)?;
    let prg1 = cartridge.block_program(1)?;
    let chr0 = cartridge.block_character(0)?;
    Ok(cartridge.size()? == rom.len()
        && prg0 == rom[HEADER_SIZE..HEADER_SIZE + PRG_BANK_SIZE]
        && prg1 == rom[HEADER_SIZE + PRG_BANK_SIZE..HEADER_SIZE + 2 * PRG_BANK_SIZE]
        && chr0 == rom[HEADER_SIZE + 2 * PRG_BANK_SIZE..]
        && matches!(cartridge.block_program(2), Err(Error::InvalidIndex(2))))
}

fn rom_bad_magic() -> Result<bool> {
    let mut rom = synthetic_rom(1, 0);
    rom[3] = 0x00;
    let mut cartridge = Cartridge::new();
    cartridge.initialize()?;
    Ok(matches!(cartridge.load(&rom), Err(Error::Malformed(_))) && !cartridge.is_loaded())
}

fn rom_ines2() -> Result<bool> {
    let mut rom = synthetic_rom(1, 0);
    rom[7] = 0x08;
    let mut cartridge = Cartridge::new();
    cartridge.initialize()?;
    Ok(matches!(cartridge.load(&rom), Err(Error::Unsupported(_))) && !cartridge.is_loaded())
}

fn system_load_and_run() -> Result<bool> {
    // Program at $8000: LDA #$42; STA $10; JMP $8004
    let mut rom = synthetic_rom(1, 0);
    let program = [0xA9, 0x42, 0x85, 0x10, 0x4C, 0x04, 0x80];
    rom[HEADER_SIZE..HEADER_SIZE + program.len()].copy_from_slice(&program);
    let vector = HEADER_SIZE + PRG_BANK_SIZE - 4;
    rom[vector..vector + 2].copy_from_slice(&[0x00, 0x80]);

    let mut system = NesSystem::new();
    system.initialize()?;
    system.load_rom(&rom)?;
    let summary = system.run(RunMode::Normal, 100)?;
    Ok(summary.halted && system.memory().peek(0x10)? == 0x42)
}
