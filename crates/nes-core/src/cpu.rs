//! CPU module - 2A03 (6502 variant) implementation
//!
//! The NES uses a modified 6502 CPU without decimal mode. The CPU does not
//! own memory: every operation that touches the address space borrows a
//! [`Bus`] for the duration of the call.

use std::fmt;

use log::trace;

use crate::error::{Component, Error, Result};
use crate::opcodes::{self, AddressingMode, Mnemonic, OpcodeInfo};

/// Base address of the hardware stack page
pub const STACK_BASE: u16 = 0x0100;
/// NMI vector address
pub const NMI_VECTOR: u16 = 0xFFFA;
/// RESET vector address
pub const RESET_VECTOR: u16 = 0xFFFC;
/// IRQ/BRK vector address
pub const IRQ_VECTOR: u16 = 0xFFFE;
/// Cycles consumed by a hardware interrupt sequence
pub const INTERRUPT_CYCLES: u32 = 7;

/// Byte-level access to the CPU address space
pub trait Bus {
    /// Read a byte from the given address
    fn read_byte(&mut self, address: u16) -> Result<u8>;
    /// Write a byte to the given address
    fn write_byte(&mut self, address: u16, value: u8) -> Result<()>;
}

/// CPU status flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusFlags(u8);

impl StatusFlags {
    pub const CARRY: u8 = 0b0000_0001;
    pub const ZERO: u8 = 0b0000_0010;
    /// IRQ is serviced only while this bit is set
    pub const INTERRUPT: u8 = 0b0000_0100;
    pub const DECIMAL: u8 = 0b0000_1000;
    pub const BREAK: u8 = 0b0001_0000;
    pub const OVERFLOW: u8 = 0b0100_0000;
    pub const NEGATIVE: u8 = 0b1000_0000;

    /// Power-on value: interrupt and zero set
    pub const POWER_ON: u8 = Self::INTERRUPT | Self::ZERO;

    pub fn new(flags: u8) -> Self {
        Self(flags)
    }

    pub fn bits(&self) -> u8 {
        self.0
    }

    pub fn contains(&self, mask: u8) -> bool {
        (self.0 & mask) == mask
    }

    pub fn set(&mut self, mask: u8, val: bool) {
        self.0 = if val { self.0 | mask } else { self.0 & !mask };
    }

    pub fn carry(&self) -> bool {
        self.contains(Self::CARRY)
    }

    pub fn zero(&self) -> bool {
        self.contains(Self::ZERO)
    }

    pub fn interrupt(&self) -> bool {
        self.contains(Self::INTERRUPT)
    }

    pub fn decimal(&self) -> bool {
        self.contains(Self::DECIMAL)
    }

    pub fn brk(&self) -> bool {
        self.contains(Self::BREAK)
    }

    pub fn overflow(&self) -> bool {
        self.contains(Self::OVERFLOW)
    }

    pub fn negative(&self) -> bool {
        self.contains(Self::NEGATIVE)
    }

    pub fn set_carry(&mut self, val: bool) {
        self.set(Self::CARRY, val);
    }

    pub fn set_zero(&mut self, val: bool) {
        self.set(Self::ZERO, val);
    }

    pub fn set_interrupt(&mut self, val: bool) {
        self.set(Self::INTERRUPT, val);
    }

    pub fn set_decimal(&mut self, val: bool) {
        self.set(Self::DECIMAL, val);
    }

    pub fn set_overflow(&mut self, val: bool) {
        self.set(Self::OVERFLOW, val);
    }

    pub fn set_negative(&mut self, val: bool) {
        self.set(Self::NEGATIVE, val);
    }

    /// Update zero and negative from a result byte
    pub fn set_zn(&mut self, value: u8) {
        self.set_zero(value == 0);
        self.set_negative(value & 0x80 != 0);
    }
}

impl Default for StatusFlags {
    fn default() -> Self {
        Self(Self::POWER_ON)
    }
}

impl fmt::Display for StatusFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "C:{} Z:{} I:{} D:{} B:{} V:{} N:{}",
            self.carry() as u8,
            self.zero() as u8,
            self.interrupt() as u8,
            self.decimal() as u8,
            self.brk() as u8,
            self.overflow() as u8,
            self.negative() as u8
        )
    }
}

/// 2A03 CPU registers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuRegisters {
    pub a: u8,    // Accumulator
    pub x: u8,    // X index register
    pub y: u8,    // Y index register
    pub p: StatusFlags,
    pub sp: u8,   // Stack pointer, offset from $0100
    pub pc: u16,  // Program counter
}

impl Default for CpuRegisters {
    fn default() -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            p: StatusFlags::default(),
            sp: 0xFF,
            pc: 0,
        }
    }
}

/// Resolved operand of the instruction being executed
#[derive(Debug, Clone, Copy)]
enum Operand {
    Implied,
    Accumulator,
    Immediate(u8),
    Address { address: u16, page_crossed: bool },
    Branch(u16),
}

/// CPU emulator state
#[derive(Debug, Clone, Default)]
pub struct Cpu {
    registers: CpuRegisters,
    /// Total cycles executed; wraps silently
    cycles: u32,
    initialized: bool,
}

impl Cpu {
    /// Create an uninitialized CPU
    pub fn new() -> Self {
        Self {
            registers: CpuRegisters::default(),
            cycles: 0,
            initialized: false,
        }
    }

    pub fn initialize(&mut self) -> Result<()> {
        if self.initialized {
            return Err(Error::AlreadyInitialized(Component::Cpu));
        }
        self.initialized = true;
        self.clear()
    }

    pub fn uninitialize(&mut self) -> Result<()> {
        self.clear()?;
        self.initialized = false;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Restore power-on register values
    pub fn clear(&mut self) -> Result<()> {
        self.ensure_initialized()?;
        self.registers = CpuRegisters::default();
        self.cycles = 0;
        Ok(())
    }

    /// Clear, then load PC from the RESET vector
    pub fn reset(&mut self, bus: &mut impl Bus) -> Result<()> {
        self.clear()?;
        self.registers.pc = self.load_word(bus, RESET_VECTOR)?;
        Ok(())
    }

    /// Maskable interrupt; ignored while the interrupt flag is clear
    pub fn irq(&mut self, bus: &mut impl Bus) -> Result<()> {
        self.ensure_initialized()?;
        if !self.registers.p.interrupt() {
            return Ok(());
        }
        trace!("IRQ at PC={:04X}", self.registers.pc);
        self.enter_interrupt(bus, IRQ_VECTOR, false)?;
        self.cycles = self.cycles.wrapping_add(INTERRUPT_CYCLES);
        Ok(())
    }

    /// Non-maskable interrupt
    pub fn nmi(&mut self, bus: &mut impl Bus) -> Result<()> {
        self.ensure_initialized()?;
        trace!("NMI at PC={:04X}", self.registers.pc);
        self.enter_interrupt(bus, NMI_VECTOR, false)?;
        self.cycles = self.cycles.wrapping_add(INTERRUPT_CYCLES);
        Ok(())
    }

    /// Pop P (break flag cleared) then PC
    pub fn interrupt_return(&mut self, bus: &mut impl Bus) -> Result<()> {
        let mut p = StatusFlags::new(self.pop(bus)?);
        p.set(StatusFlags::BREAK, false);
        self.registers.p = p;
        self.registers.pc = self.pop_word(bus)?;
        Ok(())
    }

    fn enter_interrupt(&mut self, bus: &mut impl Bus, vector: u16, brk: bool) -> Result<()> {
        self.push_word(bus, self.registers.pc)?;
        let mut p = self.registers.p;
        p.set(StatusFlags::BREAK, brk);
        self.push(bus, p.bits())?;
        self.registers.pc = self.load_word(bus, vector)?;
        Ok(())
    }

    pub fn load(&mut self, bus: &mut impl Bus, address: u16) -> Result<u8> {
        self.ensure_initialized()?;
        bus.read_byte(address)
    }

    /// Little-endian word at `address`
    pub fn load_word(&mut self, bus: &mut impl Bus, address: u16) -> Result<u16> {
        let lo = self.load(bus, address)? as u16;
        let hi = self.load(bus, address.wrapping_add(1))? as u16;
        Ok((hi << 8) | lo)
    }

    pub fn store(&mut self, bus: &mut impl Bus, address: u16, value: u8) -> Result<()> {
        self.ensure_initialized()?;
        bus.write_byte(address, value)
    }

    /// Low byte at `address`, high byte at `address + 1`
    pub fn store_word(&mut self, bus: &mut impl Bus, address: u16, value: u16) -> Result<()> {
        self.store(bus, address, value as u8)?;
        self.store(bus, address.wrapping_add(1), (value >> 8) as u8)
    }

    /// Store at SP, then decrement SP
    pub fn push(&mut self, bus: &mut impl Bus, value: u8) -> Result<()> {
        self.store(bus, STACK_BASE + self.registers.sp as u16, value)?;
        self.registers.sp = self.registers.sp.wrapping_sub(1);
        Ok(())
    }

    /// Increment SP, then load
    pub fn pop(&mut self, bus: &mut impl Bus) -> Result<u8> {
        self.ensure_initialized()?;
        self.registers.sp = self.registers.sp.wrapping_add(1);
        self.load(bus, STACK_BASE + self.registers.sp as u16)
    }

    /// High byte first, so the low byte sits at the lower address
    pub fn push_word(&mut self, bus: &mut impl Bus, value: u16) -> Result<()> {
        self.push(bus, (value >> 8) as u8)?;
        self.push(bus, value as u8)
    }

    pub fn pop_word(&mut self, bus: &mut impl Bus) -> Result<u16> {
        let lo = self.pop(bus)? as u16;
        let hi = self.pop(bus)? as u16;
        Ok((hi << 8) | lo)
    }

    /// Get CPU registers
    pub fn registers(&self) -> &CpuRegisters {
        &self.registers
    }

    /// Mutable registers, for loaders and test setup
    pub fn registers_mut(&mut self) -> &mut CpuRegisters {
        &mut self.registers
    }

    /// Get CPU status flags
    pub fn status(&self) -> &StatusFlags {
        &self.registers.p
    }

    /// Get total cycles executed
    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    /// Execute one instruction and return the cycles it consumed.
    ///
    /// An undocumented opcode fails with [`Error::InvalidOpcode`] and leaves
    /// PC on the offending byte.
    pub fn step(&mut self, bus: &mut impl Bus) -> Result<u32> {
        let pc = self.registers.pc;
        let opcode = self.load(bus, pc)?;
        let info = opcodes::decode(opcode).ok_or(Error::InvalidOpcode { opcode, address: pc })?;
        self.registers.pc = pc.wrapping_add(1);

        let operand = self.fetch_operand(bus, info.mode)?;
        let cycles = info.cycles as u32 + self.execute(bus, &info, operand)?;
        self.cycles = self.cycles.wrapping_add(cycles);
        Ok(cycles)
    }

    fn fetch_byte(&mut self, bus: &mut impl Bus) -> Result<u8> {
        let value = self.load(bus, self.registers.pc)?;
        self.registers.pc = self.registers.pc.wrapping_add(1);
        Ok(value)
    }

    fn fetch_word(&mut self, bus: &mut impl Bus) -> Result<u16> {
        let value = self.load_word(bus, self.registers.pc)?;
        self.registers.pc = self.registers.pc.wrapping_add(2);
        Ok(value)
    }

    /// Word from the zero page; the high byte wraps within page zero
    fn load_zero_page_word(&mut self, bus: &mut impl Bus, pointer: u8) -> Result<u16> {
        let lo = self.load(bus, pointer as u16)? as u16;
        let hi = self.load(bus, pointer.wrapping_add(1) as u16)? as u16;
        Ok((hi << 8) | lo)
    }

    fn fetch_operand(&mut self, bus: &mut impl Bus, mode: AddressingMode) -> Result<Operand> {
        let operand = match mode {
            AddressingMode::Implied => Operand::Implied,
            AddressingMode::Accumulator => Operand::Accumulator,
            AddressingMode::Immediate => Operand::Immediate(self.fetch_byte(bus)?),
            AddressingMode::ZeroPage => direct(self.fetch_byte(bus)? as u16),
            AddressingMode::ZeroPageX => {
                let base = self.fetch_byte(bus)?;
                direct(base.wrapping_add(self.registers.x) as u16)
            }
            AddressingMode::ZeroPageY => {
                let base = self.fetch_byte(bus)?;
                direct(base.wrapping_add(self.registers.y) as u16)
            }
            AddressingMode::Absolute => direct(self.fetch_word(bus)?),
            AddressingMode::AbsoluteX => {
                let base = self.fetch_word(bus)?;
                indexed(base, self.registers.x)
            }
            AddressingMode::AbsoluteY => {
                let base = self.fetch_word(bus)?;
                indexed(base, self.registers.y)
            }
            AddressingMode::Indirect => {
                // The pointer's high byte is fetched without carrying into the next page
                let pointer = self.fetch_word(bus)?;
                let lo = self.load(bus, pointer)? as u16;
                let hi_address = (pointer & 0xFF00) | (pointer.wrapping_add(1) & 0x00FF);
                let hi = self.load(bus, hi_address)? as u16;
                direct((hi << 8) | lo)
            }
            AddressingMode::IndirectX => {
                let pointer = self.fetch_byte(bus)?.wrapping_add(self.registers.x);
                direct(self.load_zero_page_word(bus, pointer)?)
            }
            AddressingMode::IndirectY => {
                let pointer = self.fetch_byte(bus)?;
                let base = self.load_zero_page_word(bus, pointer)?;
                indexed(base, self.registers.y)
            }
            AddressingMode::Relative => {
                let offset = self.fetch_byte(bus)? as i8;
                Operand::Branch(self.registers.pc.wrapping_add(offset as u16))
            }
        };
        Ok(operand)
    }

    fn read_operand(&mut self, bus: &mut impl Bus, operand: Operand) -> Result<u8> {
        match operand {
            Operand::Immediate(value) => Ok(value),
            Operand::Accumulator => Ok(self.registers.a),
            Operand::Address { address, .. } => self.load(bus, address),
            Operand::Implied | Operand::Branch(_) => Ok(0),
        }
    }

    fn operand_address(operand: Operand) -> u16 {
        match operand {
            Operand::Address { address, .. } | Operand::Branch(address) => address,
            _ => 0,
        }
    }

    /// Read-modify-write on the accumulator or memory
    fn modify(
        &mut self,
        bus: &mut impl Bus,
        operand: Operand,
        f: impl FnOnce(&mut StatusFlags, u8) -> u8,
    ) -> Result<()> {
        let value = self.read_operand(bus, operand)?;
        let result = f(&mut self.registers.p, value);
        self.registers.p.set_zn(result);
        match operand {
            Operand::Accumulator => self.registers.a = result,
            Operand::Address { address, .. } => self.store(bus, address, result)?,
            _ => {}
        }
        Ok(())
    }

    fn add_with_carry(&mut self, value: u8) {
        let a = self.registers.a;
        let sum = a as u16 + value as u16 + self.registers.p.carry() as u16;
        let result = sum as u8;
        self.registers.p.set_carry(sum > 0xFF);
        self.registers.p.set_overflow((!(a ^ value) & (a ^ result) & 0x80) != 0);
        self.registers.p.set_zn(result);
        self.registers.a = result;
    }

    fn compare(&mut self, register: u8, value: u8) {
        self.registers.p.set_carry(register >= value);
        self.registers.p.set_zn(register.wrapping_sub(value));
    }

    /// Returns the cycles taken on top of the base cost
    fn branch(&mut self, condition: bool, target: u16) -> u32 {
        if !condition {
            return 0;
        }
        let pc = self.registers.pc;
        self.registers.pc = target;
        if (pc & 0xFF00) != (target & 0xFF00) {
            2
        } else {
            1
        }
    }

    /// Run the instruction; returns extra cycles (page cross / branch taken)
    fn execute(&mut self, bus: &mut impl Bus, info: &OpcodeInfo, operand: Operand) -> Result<u32> {
        let mut extra = match operand {
            Operand::Address { page_crossed: true, .. } if info.page_cycle => 1,
            _ => 0,
        };
        let address = Self::operand_address(operand);
        let p = self.registers.p;

        match info.mnemonic {
            // Loads and stores
            Mnemonic::LDA => {
                self.registers.a = self.read_operand(bus, operand)?;
                self.registers.p.set_zn(self.registers.a);
            }
            Mnemonic::LDX => {
                self.registers.x = self.read_operand(bus, operand)?;
                self.registers.p.set_zn(self.registers.x);
            }
            Mnemonic::LDY => {
                self.registers.y = self.read_operand(bus, operand)?;
                self.registers.p.set_zn(self.registers.y);
            }
            Mnemonic::STA => self.store(bus, address, self.registers.a)?,
            Mnemonic::STX => self.store(bus, address, self.registers.x)?,
            Mnemonic::STY => self.store(bus, address, self.registers.y)?,

            // Register transfers
            Mnemonic::TAX => {
                self.registers.x = self.registers.a;
                self.registers.p.set_zn(self.registers.x);
            }
            Mnemonic::TAY => {
                self.registers.y = self.registers.a;
                self.registers.p.set_zn(self.registers.y);
            }
            Mnemonic::TSX => {
                self.registers.x = self.registers.sp;
                self.registers.p.set_zn(self.registers.x);
            }
            Mnemonic::TXA => {
                self.registers.a = self.registers.x;
                self.registers.p.set_zn(self.registers.a);
            }
            Mnemonic::TXS => self.registers.sp = self.registers.x,
            Mnemonic::TYA => {
                self.registers.a = self.registers.y;
                self.registers.p.set_zn(self.registers.a);
            }

            // Arithmetic
            Mnemonic::ADC => {
                let value = self.read_operand(bus, operand)?;
                self.add_with_carry(value);
            }
            Mnemonic::SBC => {
                let value = self.read_operand(bus, operand)?;
                self.add_with_carry(!value);
            }
            Mnemonic::CMP => {
                let value = self.read_operand(bus, operand)?;
                self.compare(self.registers.a, value);
            }
            Mnemonic::CPX => {
                let value = self.read_operand(bus, operand)?;
                self.compare(self.registers.x, value);
            }
            Mnemonic::CPY => {
                let value = self.read_operand(bus, operand)?;
                self.compare(self.registers.y, value);
            }

            // Logic
            Mnemonic::AND => {
                let value = self.read_operand(bus, operand)?;
                self.registers.a &= value;
                self.registers.p.set_zn(self.registers.a);
            }
            Mnemonic::EOR => {
                let value = self.read_operand(bus, operand)?;
                self.registers.a ^= value;
                self.registers.p.set_zn(self.registers.a);
            }
            Mnemonic::ORA => {
                let value = self.read_operand(bus, operand)?;
                self.registers.a |= value;
                self.registers.p.set_zn(self.registers.a);
            }
            Mnemonic::BIT => {
                let value = self.read_operand(bus, operand)?;
                self.registers.p.set_zero(self.registers.a & value == 0);
                self.registers.p.set_overflow(value & 0x40 != 0);
                self.registers.p.set_negative(value & 0x80 != 0);
            }

            // Shifts and rotates
            Mnemonic::ASL => self.modify(bus, operand, |p, v| {
                p.set_carry(v & 0x80 != 0);
                v << 1
            })?,
            Mnemonic::LSR => self.modify(bus, operand, |p, v| {
                p.set_carry(v & 0x01 != 0);
                v >> 1
            })?,
            Mnemonic::ROL => self.modify(bus, operand, |p, v| {
                let carry_in = p.carry() as u8;
                p.set_carry(v & 0x80 != 0);
                (v << 1) | carry_in
            })?,
            Mnemonic::ROR => self.modify(bus, operand, |p, v| {
                let carry_in = (p.carry() as u8) << 7;
                p.set_carry(v & 0x01 != 0);
                (v >> 1) | carry_in
            })?,

            // Increments and decrements
            Mnemonic::INC => self.modify(bus, operand, |_, v| v.wrapping_add(1))?,
            Mnemonic::DEC => self.modify(bus, operand, |_, v| v.wrapping_sub(1))?,
            Mnemonic::INX => {
                self.registers.x = self.registers.x.wrapping_add(1);
                self.registers.p.set_zn(self.registers.x);
            }
            Mnemonic::INY => {
                self.registers.y = self.registers.y.wrapping_add(1);
                self.registers.p.set_zn(self.registers.y);
            }
            Mnemonic::DEX => {
                self.registers.x = self.registers.x.wrapping_sub(1);
                self.registers.p.set_zn(self.registers.x);
            }
            Mnemonic::DEY => {
                self.registers.y = self.registers.y.wrapping_sub(1);
                self.registers.p.set_zn(self.registers.y);
            }

            // Branches
            Mnemonic::BCC => extra += self.branch(!p.carry(), address),
            Mnemonic::BCS => extra += self.branch(p.carry(), address),
            Mnemonic::BEQ => extra += self.branch(p.zero(), address),
            Mnemonic::BNE => extra += self.branch(!p.zero(), address),
            Mnemonic::BMI => extra += self.branch(p.negative(), address),
            Mnemonic::BPL => extra += self.branch(!p.negative(), address),
            Mnemonic::BVS => extra += self.branch(p.overflow(), address),
            Mnemonic::BVC => extra += self.branch(!p.overflow(), address),

            // Jumps and subroutines
            Mnemonic::JMP => self.registers.pc = address,
            Mnemonic::JSR => {
                // Return address is the last byte of the JSR instruction
                self.push_word(bus, self.registers.pc.wrapping_sub(1))?;
                self.registers.pc = address;
            }
            Mnemonic::RTS => {
                self.registers.pc = self.pop_word(bus)?.wrapping_add(1);
            }
            Mnemonic::RTI => self.interrupt_return(bus)?,
            Mnemonic::BRK => {
                // Skip the padding byte after BRK
                self.registers.pc = self.registers.pc.wrapping_add(1);
                self.enter_interrupt(bus, IRQ_VECTOR, true)?;
            }

            // Stack
            Mnemonic::PHA => self.push(bus, self.registers.a)?,
            Mnemonic::PHP => self.push(bus, p.bits() | StatusFlags::BREAK)?,
            Mnemonic::PLA => {
                self.registers.a = self.pop(bus)?;
                self.registers.p.set_zn(self.registers.a);
            }
            Mnemonic::PLP => {
                let mut flags = StatusFlags::new(self.pop(bus)?);
                flags.set(StatusFlags::BREAK, false);
                self.registers.p = flags;
            }

            // Flags
            Mnemonic::CLC => self.registers.p.set_carry(false),
            Mnemonic::SEC => self.registers.p.set_carry(true),
            Mnemonic::CLD => self.registers.p.set_decimal(false),
            Mnemonic::SED => self.registers.p.set_decimal(true),
            Mnemonic::CLI => self.registers.p.set_interrupt(false),
            Mnemonic::SEI => self.registers.p.set_interrupt(true),
            Mnemonic::CLV => self.registers.p.set_overflow(false),

            Mnemonic::NOP => {}
        }

        Ok(extra)
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(Error::Uninitialized(Component::Cpu))
        }
    }
}

fn direct(address: u16) -> Operand {
    Operand::Address { address, page_crossed: false }
}

fn indexed(base: u16, index: u8) -> Operand {
    let address = base.wrapping_add(index as u16);
    Operand::Address {
        address,
        page_crossed: (base & 0xFF00) != (address & 0xFF00),
    }
}

/// One-line register trace, e.g. `A:00 X:00 Y:00 P:06 SP:FF PC:0000 CYC:0`
impl fmt::Display for Cpu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = &self.registers;
        write!(
            f,
            "A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X} PC:{:04X} CYC:{}",
            r.a,
            r.x,
            r.y,
            r.p.bits(),
            r.sp,
            r.pc,
            self.cycles
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Memory;

    fn setup(program: &[u8]) -> (Cpu, Memory) {
        let mut memory = Memory::new();
        memory.initialize().unwrap();
        memory.write(0x8000, program).unwrap();
        memory.write(RESET_VECTOR as usize, &[0x00, 0x80]).unwrap();

        let mut cpu = Cpu::new();
        cpu.initialize().unwrap();
        cpu.reset(&mut memory).unwrap();
        (cpu, memory)
    }

    #[test]
    fn test_cpu_reset() {
        let (cpu, _) = setup(&[]);
        assert_eq!(cpu.registers().pc, 0x8000);
        assert_eq!(cpu.registers().sp, 0xFF);
        assert_eq!(cpu.status().bits(), 0x06);
    }

    #[test]
    fn test_status_set_and_zn() {
        let mut flags = StatusFlags::new(StatusFlags::CARRY | StatusFlags::ZERO);
        flags.set(StatusFlags::OVERFLOW | StatusFlags::NEGATIVE, true);
        assert_eq!(flags.bits(), 0xC3);
        flags.set(StatusFlags::CARRY | StatusFlags::NEGATIVE, false);
        assert_eq!(flags.bits(), 0x42);

        flags.set_zn(0x00);
        assert!(flags.zero() && !flags.negative());
        flags.set_zn(0xF0);
        assert!(!flags.zero() && flags.negative());
        assert!(flags.overflow());
        assert_eq!(flags.to_string(), "C:0 Z:0 I:0 D:0 B:0 V:1 N:1");
    }

    #[test]
    fn test_adc_overflow() {
        // LDA #$50; ADC #$50
        let (mut cpu, mut memory) = setup(&[0xA9, 0x50, 0x69, 0x50]);
        cpu.step(&mut memory).unwrap();
        cpu.step(&mut memory).unwrap();
        assert_eq!(cpu.registers().a, 0xA0);
        assert!(cpu.status().overflow());
        assert!(cpu.status().negative());
        assert!(!cpu.status().carry());
    }

    #[test]
    fn test_undocumented_opcode_leaves_pc() {
        let (mut cpu, mut memory) = setup(&[0x02]);
        let err = cpu.step(&mut memory).unwrap_err();
        assert!(matches!(err, Error::InvalidOpcode { opcode: 0x02, address: 0x8000 }));
        assert_eq!(cpu.registers().pc, 0x8000);
        assert_eq!(cpu.cycles(), 0);
    }

    #[test]
    fn test_jmp_indirect_page_wrap() {
        // JMP ($10FF) reads the high byte from $1000
        let (mut cpu, mut memory) = setup(&[0x6C, 0xFF, 0x10]);
        memory.write(0x10FF, &[0x34]).unwrap();
        memory.write(0x1000, &[0x12]).unwrap();
        memory.write(0x1100, &[0x56]).unwrap();
        cpu.step(&mut memory).unwrap();
        assert_eq!(cpu.registers().pc, 0x1234);
    }

    #[test]
    fn test_trace_format() {
        let mut cpu = Cpu::new();
        cpu.initialize().unwrap();
        assert_eq!(cpu.to_string(), "A:00 X:00 Y:00 P:06 SP:FF PC:0000 CYC:0");
    }
}
