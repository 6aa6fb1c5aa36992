//! NES System Integration
//!
//! This module ties memory, CPU and cartridge together into one machine
//! that is initialized, loaded, run and torn down as a unit.

use std::fmt;
use std::path::Path;

use log::{debug, info, warn};

use crate::cartridge::{Cartridge, PRG_BANK_SIZE};
use crate::cpu::Cpu;
use crate::error::{Component, Error, Result};
use crate::memory::Memory;
use crate::opcodes;

/// Where the first program bank is mapped
pub const PRG_LOWER: u16 = 0x8000;
/// Where the second (or mirrored first) program bank is mapped
pub const PRG_UPPER: u16 = 0xC000;
/// Default instruction budget for [`NesSystem::run`]
pub const DEFAULT_STEP_LIMIT: u64 = 10_000;

/// How [`NesSystem::run`] reports progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    #[default]
    Normal,
    /// Log a trace line per instruction at debug level
    Debug,
}

/// Outcome of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Instructions executed
    pub steps: u64,
    /// Cycles consumed by those instructions
    pub cycles: u64,
    /// True if the run stopped on a jump or branch to itself
    pub halted: bool,
}

/// NES System - owns every component
#[derive(Debug, Clone, Default)]
pub struct NesSystem {
    memory: Memory,
    cpu: Cpu,
    cartridge: Cartridge,
    initialized: bool,
}

impl NesSystem {
    /// Create a new, uninitialized system
    pub fn new() -> Self {
        Self::default()
    }

    /// Initialize memory, then CPU, then cartridge.
    ///
    /// If a later component fails, the earlier ones are torn down again.
    pub fn initialize(&mut self) -> Result<()> {
        if self.initialized {
            return Err(Error::AlreadyInitialized(Component::System));
        }

        self.memory.initialize()?;
        if let Err(e) = self.cpu.initialize() {
            self.memory.uninitialize()?;
            return Err(e);
        }
        if let Err(e) = self.cartridge.initialize() {
            self.cpu.uninitialize()?;
            self.memory.uninitialize()?;
            return Err(e);
        }

        self.initialized = true;
        info!("system initialized");
        Ok(())
    }

    /// Tear down in reverse order
    pub fn uninitialize(&mut self) -> Result<()> {
        self.ensure_initialized()?;
        self.cartridge.uninitialize()?;
        self.cpu.uninitialize()?;
        self.memory.uninitialize()?;
        self.initialized = false;
        info!("system uninitialized");
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Load an iNES image, map its program banks and reset the CPU
    pub fn load_rom(&mut self, rom_data: &[u8]) -> Result<()> {
        self.ensure_initialized()?;
        self.cartridge.load(rom_data)?;
        self.map_or_unload()
    }

    /// Load an iNES file, map its program banks and reset the CPU
    pub fn load_rom_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.ensure_initialized()?;
        self.cartridge.load_file(path)?;
        self.map_or_unload()
    }

    /// A cartridge that cannot be mapped does not stay loaded
    fn map_or_unload(&mut self) -> Result<()> {
        if let Err(e) = self.map_cartridge() {
            warn!("unmappable cartridge: {}", e);
            self.cartridge.unload()?;
            return Err(e);
        }
        Ok(())
    }

    /// Flat NROM placement: bank 0 at $8000, bank 1 (or bank 0 again) at $C000
    fn map_cartridge(&mut self) -> Result<()> {
        let header = self.cartridge.header()?;
        let banks = header.prg_banks() as usize;
        if banks == 0 {
            return Err(Error::Malformed("no program banks".to_string()));
        }
        if banks > 2 {
            warn!("{} program banks, only the first two are mapped", banks);
        }

        let lower = self.cartridge.block_program(0)?;
        let upper = if banks > 1 {
            self.cartridge.block_program(1)?
        } else {
            lower.clone()
        };
        self.memory.write(PRG_LOWER as usize, &lower)?;
        self.memory.write(PRG_UPPER as usize, &upper)?;
        debug!("mapped {} bytes of program data", 2 * PRG_BANK_SIZE);

        self.reset()
    }

    /// Reset the CPU from the RESET vector
    pub fn reset(&mut self) -> Result<()> {
        self.ensure_initialized()?;
        self.cpu.reset(&mut self.memory)?;
        info!("reset, PC={:04X}", self.cpu.registers().pc);
        Ok(())
    }

    /// Step one instruction; returns the cycles it took
    pub fn step(&mut self) -> Result<u32> {
        self.ensure_initialized()?;
        self.cpu.step(&mut self.memory)
    }

    pub fn irq(&mut self) -> Result<()> {
        self.ensure_initialized()?;
        self.cpu.irq(&mut self.memory)
    }

    pub fn nmi(&mut self) -> Result<()> {
        self.ensure_initialized()?;
        self.cpu.nmi(&mut self.memory)
    }

    /// Run up to `max_steps` instructions, stopping early on a jump to self
    pub fn run(&mut self, mode: RunMode, max_steps: u64) -> Result<RunSummary> {
        self.ensure_initialized()?;

        let mut summary = RunSummary {
            steps: 0,
            cycles: 0,
            halted: false,
        };
        while summary.steps < max_steps {
            if mode == RunMode::Debug {
                debug!("{}", self.trace_line()?);
            }
            let pc = self.cpu.registers().pc;
            summary.cycles += self.step()? as u64;
            summary.steps += 1;
            if self.cpu.registers().pc == pc {
                summary.halted = true;
                break;
            }
        }

        info!(
            "ran {} instructions, {} cycles{}",
            summary.steps,
            summary.cycles,
            if summary.halted { " (halted)" } else { "" }
        );
        Ok(summary)
    }

    /// Disassembly of the instruction at PC followed by the register state,
    /// e.g. `8000  A9 10     LDA #$10      A:00 X:00 Y:00 P:06 SP:FF PC:8000 CYC:0`
    pub fn trace_line(&self) -> Result<String> {
        self.ensure_initialized()?;
        let pc = self.cpu.registers().pc;
        let opcode = self.memory.peek(pc as usize)?;

        let (bytes, text) = match opcodes::decode(opcode) {
            Some(info) => {
                let mut bytes = vec![opcode];
                for i in 1..info.length() as u16 {
                    bytes.push(self.memory.peek(pc.wrapping_add(i) as usize)?);
                }
                let operand = match bytes.len() {
                    2 => bytes[1] as u16,
                    3 => u16::from_le_bytes([bytes[1], bytes[2]]),
                    _ => 0,
                };
                (bytes, info.disassemble(operand, pc))
            }
            None => (vec![opcode], "???".to_string()),
        };

        let hex: Vec<String> = bytes.iter().map(|b| format!("{:02X}", b)).collect();
        Ok(format!("{:04X}  {:<8}  {:<12}  {}", pc, hex.join(" "), text, self.cpu))
    }

    /// Get CPU reference
    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    /// Get mutable CPU reference
    pub fn cpu_mut(&mut self) -> &mut Cpu {
        &mut self.cpu
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    pub fn cartridge(&self) -> &Cartridge {
        &self.cartridge
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(Error::Uninitialized(Component::System))
        }
    }
}

/// Machine state dump: registers, cartridge, zero page and stack page
impl fmt::Display for NesSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.initialized {
            return write!(f, "System: uninitialized");
        }
        writeln!(f, "System: initialized")?;
        writeln!(f, "CPU: {}", self.cpu)?;
        writeln!(f, "Flags: {}", self.cpu.status())?;

        match self.cartridge.header() {
            Ok(header) => writeln!(f, "Cartridge: {}", header)?,
            Err(_) => writeln!(f, "Cartridge: none")?,
        }

        let pages = self
            .memory
            .block_as_string(0x0000, 0x100)
            .and_then(|zero| Ok((zero, self.memory.block_as_string(0x0100, 0x100)?)));
        match pages {
            Ok((zero, stack)) => {
                writeln!(f, "Zero page:\n{}", zero)?;
                write!(f, "Stack page:\n{}", stack)
            }
            Err(e) => write!(f, "Memory: {}", e),
        }
    }
}
