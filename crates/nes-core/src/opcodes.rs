//! Opcode decode table for the documented 6502 instruction set
//!
//! Each opcode byte maps to a mnemonic, an addressing mode, a base cycle
//! cost and whether an indexed read pays one extra cycle when it crosses a
//! page. Branch penalties are applied by the CPU at execution time.

use std::fmt;

/// Instruction mnemonic
#[rustfmt::skip]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mnemonic {
    ADC, AND, ASL, BCC, BCS, BEQ, BIT, BMI,
    BNE, BPL, BRK, BVC, BVS, CLC, CLD, CLI,
    CLV, CMP, CPX, CPY, DEC, DEX, DEY, EOR,
    INC, INX, INY, JMP, JSR, LDA, LDX, LDY,
    LSR, NOP, ORA, PHA, PHP, PLA, PLP, ROL,
    ROR, RTI, RTS, SBC, SEC, SED, SEI, STA,
    STX, STY, TAX, TAY, TSX, TXA, TXS, TYA,
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Addressing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressingMode {
    Implied,
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    Indirect,
    IndirectX,
    IndirectY,
    Relative,
}

impl AddressingMode {
    /// Operand bytes following the opcode
    pub fn operand_len(self) -> u8 {
        match self {
            AddressingMode::Implied | AddressingMode::Accumulator => 0,
            AddressingMode::Absolute
            | AddressingMode::AbsoluteX
            | AddressingMode::AbsoluteY
            | AddressingMode::Indirect => 2,
            _ => 1,
        }
    }
}

/// Decoded opcode metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpcodeInfo {
    pub opcode: u8,
    pub mnemonic: Mnemonic,
    pub mode: AddressingMode,
    /// Base cycle cost
    pub cycles: u8,
    /// Extra cycle if the indexed address crosses a page
    pub page_cycle: bool,
}

impl OpcodeInfo {
    /// Total instruction length in bytes
    pub fn length(&self) -> u8 {
        1 + self.mode.operand_len()
    }

    /// Render the instruction with its operand, e.g. `LDA ($20),Y`.
    ///
    /// `pc` is the address of the opcode byte; it is only used to resolve
    /// relative branch targets.
    pub fn disassemble(&self, operand: u16, pc: u16) -> String {
        use AddressingMode::*;

        let m = self.mnemonic;
        match self.mode {
            Implied => format!("{}", m),
            Accumulator => format!("{} A", m),
            Immediate => format!("{} #${:02X}", m, operand),
            ZeroPage => format!("{} ${:02X}", m, operand),
            ZeroPageX => format!("{} ${:02X},X", m, operand),
            ZeroPageY => format!("{} ${:02X},Y", m, operand),
            Absolute => format!("{} ${:04X}", m, operand),
            AbsoluteX => format!("{} ${:04X},X", m, operand),
            AbsoluteY => format!("{} ${:04X},Y", m, operand),
            Indirect => format!("{} (${:04X})", m, operand),
            IndirectX => format!("{} (${:02X},X)", m, operand),
            IndirectY => format!("{} (${:02X}),Y", m, operand),
            Relative => {
                let target = pc
                    .wrapping_add(2)
                    .wrapping_add(operand as u8 as i8 as u16);
                format!("{} ${:04X}", m, target)
            }
        }
    }
}

const fn op(
    opcode: u8,
    mnemonic: Mnemonic,
    mode: AddressingMode,
    cycles: u8,
    page_cycle: bool,
) -> OpcodeInfo {
    OpcodeInfo {
        opcode,
        mnemonic,
        mode,
        cycles,
        page_cycle,
    }
}

/// Decode an opcode byte; `None` for undocumented opcodes
pub fn decode(opcode: u8) -> Option<OpcodeInfo> {
    use AddressingMode::*;
    use Mnemonic::*;

    let info = match opcode {
        0x69 => op(opcode, ADC, Immediate, 2, false),
        0x65 => op(opcode, ADC, ZeroPage, 3, false),
        0x75 => op(opcode, ADC, ZeroPageX, 4, false),
        0x6D => op(opcode, ADC, Absolute, 4, false),
        0x7D => op(opcode, ADC, AbsoluteX, 4, true),
        0x79 => op(opcode, ADC, AbsoluteY, 4, true),
        0x61 => op(opcode, ADC, IndirectX, 6, false),
        0x71 => op(opcode, ADC, IndirectY, 5, true),

        0x29 => op(opcode, AND, Immediate, 2, false),
        0x25 => op(opcode, AND, ZeroPage, 3, false),
        0x35 => op(opcode, AND, ZeroPageX, 4, false),
        0x2D => op(opcode, AND, Absolute, 4, false),
        0x3D => op(opcode, AND, AbsoluteX, 4, true),
        0x39 => op(opcode, AND, AbsoluteY, 4, true),
        0x21 => op(opcode, AND, IndirectX, 6, false),
        0x31 => op(opcode, AND, IndirectY, 5, true),

        0x0A => op(opcode, ASL, Accumulator, 2, false),
        0x06 => op(opcode, ASL, ZeroPage, 5, false),
        0x16 => op(opcode, ASL, ZeroPageX, 6, false),
        0x0E => op(opcode, ASL, Absolute, 6, false),
        0x1E => op(opcode, ASL, AbsoluteX, 7, false),

        0x90 => op(opcode, BCC, Relative, 2, false),
        0xB0 => op(opcode, BCS, Relative, 2, false),
        0xF0 => op(opcode, BEQ, Relative, 2, false),
        0x30 => op(opcode, BMI, Relative, 2, false),
        0xD0 => op(opcode, BNE, Relative, 2, false),
        0x10 => op(opcode, BPL, Relative, 2, false),
        0x50 => op(opcode, BVC, Relative, 2, false),
        0x70 => op(opcode, BVS, Relative, 2, false),

        0x24 => op(opcode, BIT, ZeroPage, 3, false),
        0x2C => op(opcode, BIT, Absolute, 4, false),

        0x00 => op(opcode, BRK, Implied, 7, false),

        0x18 => op(opcode, CLC, Implied, 2, false),
        0xD8 => op(opcode, CLD, Implied, 2, false),
        0x58 => op(opcode, CLI, Implied, 2, false),
        0xB8 => op(opcode, CLV, Implied, 2, false),

        0xC9 => op(opcode, CMP, Immediate, 2, false),
        0xC5 => op(opcode, CMP, ZeroPage, 3, false),
        0xD5 => op(opcode, CMP, ZeroPageX, 4, false),
        0xCD => op(opcode, CMP, Absolute, 4, false),
        0xDD => op(opcode, CMP, AbsoluteX, 4, true),
        0xD9 => op(opcode, CMP, AbsoluteY, 4, true),
        0xC1 => op(opcode, CMP, IndirectX, 6, false),
        0xD1 => op(opcode, CMP, IndirectY, 5, true),

        0xE0 => op(opcode, CPX, Immediate, 2, false),
        0xE4 => op(opcode, CPX, ZeroPage, 3, false),
        0xEC => op(opcode, CPX, Absolute, 4, false),

        0xC0 => op(opcode, CPY, Immediate, 2, false),
        0xC4 => op(opcode, CPY, ZeroPage, 3, false),
        0xCC => op(opcode, CPY, Absolute, 4, false),

        0xC6 => op(opcode, DEC, ZeroPage, 5, false),
        0xD6 => op(opcode, DEC, ZeroPageX, 6, false),
        0xCE => op(opcode, DEC, Absolute, 6, false),
        0xDE => op(opcode, DEC, AbsoluteX, 7, false),

        0xCA => op(opcode, DEX, Implied, 2, false),
        0x88 => op(opcode, DEY, Implied, 2, false),

        0x49 => op(opcode, EOR, Immediate, 2, false),
        0x45 => op(opcode, EOR, ZeroPage, 3, false),
        0x55 => op(opcode, EOR, ZeroPageX, 4, false),
        0x4D => op(opcode, EOR, Absolute, 4, false),
        0x5D => op(opcode, EOR, AbsoluteX, 4, true),
        0x59 => op(opcode, EOR, AbsoluteY, 4, true),
        0x41 => op(opcode, EOR, IndirectX, 6, false),
        0x51 => op(opcode, EOR, IndirectY, 5, true),

        0xE6 => op(opcode, INC, ZeroPage, 5, false),
        0xF6 => op(opcode, INC, ZeroPageX, 6, false),
        0xEE => op(opcode, INC, Absolute, 6, false),
        0xFE => op(opcode, INC, AbsoluteX, 7, false),

        0xE8 => op(opcode, INX, Implied, 2, false),
        0xC8 => op(opcode, INY, Implied, 2, false),

        0x4C => op(opcode, JMP, Absolute, 3, false),
        0x6C => op(opcode, JMP, Indirect, 5, false),
        0x20 => op(opcode, JSR, Absolute, 6, false),

        0xA9 => op(opcode, LDA, Immediate, 2, false),
        0xA5 => op(opcode, LDA, ZeroPage, 3, false),
        0xB5 => op(opcode, LDA, ZeroPageX, 4, false),
        0xAD => op(opcode, LDA, Absolute, 4, false),
        0xBD => op(opcode, LDA, AbsoluteX, 4, true),
        0xB9 => op(opcode, LDA, AbsoluteY, 4, true),
        0xA1 => op(opcode, LDA, IndirectX, 6, false),
        0xB1 => op(opcode, LDA, IndirectY, 5, true),

        0xA2 => op(opcode, LDX, Immediate, 2, false),
        0xA6 => op(opcode, LDX, ZeroPage, 3, false),
        0xB6 => op(opcode, LDX, ZeroPageY, 4, false),
        0xAE => op(opcode, LDX, Absolute, 4, false),
        0xBE => op(opcode, LDX, AbsoluteY, 4, true),

        0xA0 => op(opcode, LDY, Immediate, 2, false),
        0xA4 => op(opcode, LDY, ZeroPage, 3, false),
        0xB4 => op(opcode, LDY, ZeroPageX, 4, false),
        0xAC => op(opcode, LDY, Absolute, 4, false),
        0xBC => op(opcode, LDY, AbsoluteX, 4, true),

        0x4A => op(opcode, LSR, Accumulator, 2, false),
        0x46 => op(opcode, LSR, ZeroPage, 5, false),
        0x56 => op(opcode, LSR, ZeroPageX, 6, false),
        0x4E => op(opcode, LSR, Absolute, 6, false),
        0x5E => op(opcode, LSR, AbsoluteX, 7, false),

        0xEA => op(opcode, NOP, Implied, 2, false),

        0x09 => op(opcode, ORA, Immediate, 2, false),
        0x05 => op(opcode, ORA, ZeroPage, 3, false),
        0x15 => op(opcode, ORA, ZeroPageX, 4, false),
        0x0D => op(opcode, ORA, Absolute, 4, false),
        0x1D => op(opcode, ORA, AbsoluteX, 4, true),
        0x19 => op(opcode, ORA, AbsoluteY, 4, true),
        0x01 => op(opcode, ORA, IndirectX, 6, false),
        0x11 => op(opcode, ORA, IndirectY, 5, true),

        0x48 => op(opcode, PHA, Implied, 3, false),
        0x08 => op(opcode, PHP, Implied, 3, false),
        0x68 => op(opcode, PLA, Implied, 4, false),
        0x28 => op(opcode, PLP, Implied, 4, false),

        0x2A => op(opcode, ROL, Accumulator, 2, false),
        0x26 => op(opcode, ROL, ZeroPage, 5, false),
        0x36 => op(opcode, ROL, ZeroPageX, 6, false),
        0x2E => op(opcode, ROL, Absolute, 6, false),
        0x3E => op(opcode, ROL, AbsoluteX, 7, false),

        0x6A => op(opcode, ROR, Accumulator, 2, false),
        0x66 => op(opcode, ROR, ZeroPage, 5, false),
        0x76 => op(opcode, ROR, ZeroPageX, 6, false),
        0x6E => op(opcode, ROR, Absolute, 6, false),
        0x7E => op(opcode, ROR, AbsoluteX, 7, false),

        0x40 => op(opcode, RTI, Implied, 6, false),
        0x60 => op(opcode, RTS, Implied, 6, false),

        0xE9 => op(opcode, SBC, Immediate, 2, false),
        0xE5 => op(opcode, SBC, ZeroPage, 3, false),
        0xF5 => op(opcode, SBC, ZeroPageX, 4, false),
        0xED => op(opcode, SBC, Absolute, 4, false),
        0xFD => op(opcode, SBC, AbsoluteX, 4, true),
        0xF9 => op(opcode, SBC, AbsoluteY, 4, true),
        0xE1 => op(opcode, SBC, IndirectX, 6, false),
        0xF1 => op(opcode, SBC, IndirectY, 5, true),

        0x38 => op(opcode, SEC, Implied, 2, false),
        0xF8 => op(opcode, SED, Implied, 2, false),
        0x78 => op(opcode, SEI, Implied, 2, false),

        0x85 => op(opcode, STA, ZeroPage, 3, false),
        0x95 => op(opcode, STA, ZeroPageX, 4, false),
        0x8D => op(opcode, STA, Absolute, 4, false),
        0x9D => op(opcode, STA, AbsoluteX, 5, false),
        0x99 => op(opcode, STA, AbsoluteY, 5, false),
        0x81 => op(opcode, STA, IndirectX, 6, false),
        0x91 => op(opcode, STA, IndirectY, 6, false),

        0x86 => op(opcode, STX, ZeroPage, 3, false),
        0x96 => op(opcode, STX, ZeroPageY, 4, false),
        0x8E => op(opcode, STX, Absolute, 4, false),

        0x84 => op(opcode, STY, ZeroPage, 3, false),
        0x94 => op(opcode, STY, ZeroPageX, 4, false),
        0x8C => op(opcode, STY, Absolute, 4, false),

        0xAA => op(opcode, TAX, Implied, 2, false),
        0xA8 => op(opcode, TAY, Implied, 2, false),
        0xBA => op(opcode, TSX, Implied, 2, false),
        0x8A => op(opcode, TXA, Implied, 2, false),
        0x9A => op(opcode, TXS, Implied, 2, false),
        0x98 => op(opcode, TYA, Implied, 2, false),

        _ => return None,
    };
    Some(info)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_documented_opcode_count() {
        let documented = (0..=255u8).filter_map(decode).count();
        assert_eq!(documented, 151);
    }

    #[test]
    fn test_every_mnemonic_is_reachable() {
        let mut seen: Vec<Mnemonic> = (0..=255u8).filter_map(decode).map(|i| i.mnemonic).collect();
        seen.sort_by_key(|m| *m as u8);
        seen.dedup();
        assert_eq!(seen.len(), 56);
    }

    #[test]
    fn test_lengths() {
        assert_eq!(decode(0xEA).unwrap().length(), 1);
        assert_eq!(decode(0xA9).unwrap().length(), 2);
        assert_eq!(decode(0x6C).unwrap().length(), 3);
        assert_eq!(decode(0xD0).unwrap().length(), 2);
        assert!(decode(0x02).is_none());
    }

    #[test]
    fn test_disassemble() {
        let lda = decode(0xB1).unwrap();
        assert_eq!(lda.disassemble(0x20, 0x8000), "LDA ($20),Y");

        let bne = decode(0xD0).unwrap();
        assert_eq!(bne.disassemble(0xFE, 0xC000), "BNE $C000");

        let jmp = decode(0x6C).unwrap();
        assert_eq!(jmp.disassemble(0x1234, 0), "JMP ($1234)");
    }
}
