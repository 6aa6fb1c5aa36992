//! Flat CPU address space
//!
//! The whole 16-bit space is backed by one 64KB buffer. There is no
//! mirroring or register decoding at this level; every access from the CPU
//! goes through [`Memory::at`], which bounds-checks against the buffer.

use std::fmt;

use log::info;

use crate::cpu::Bus;
use crate::error::{Component, Error, Result};

/// Size of the addressable space in bytes
pub const MEMORY_SIZE: usize = 0x10000;

/// Bytes per row in hex dumps
const DUMP_ROW: usize = 16;

/// 64KB byte-addressable memory
#[derive(Debug, Clone, Default)]
pub struct Memory {
    data: Vec<u8>,
    initialized: bool,
}

impl Memory {
    /// Create an uninitialized memory; call [`Memory::initialize`] before use
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            initialized: false,
        }
    }

    /// Allocate and zero the 64KB buffer
    pub fn initialize(&mut self) -> Result<()> {
        if self.initialized {
            return Err(Error::AlreadyInitialized(Component::Memory));
        }

        let mut data = Vec::new();
        data.try_reserve_exact(MEMORY_SIZE)
            .map_err(|_| Error::AllocationFailed)?;
        data.resize(MEMORY_SIZE, 0);

        self.data = data;
        self.initialized = true;
        info!("memory initialized ({} bytes)", MEMORY_SIZE);
        Ok(())
    }

    /// Release the buffer
    pub fn uninitialize(&mut self) -> Result<()> {
        self.ensure_initialized()?;
        self.data = Vec::new();
        self.initialized = false;
        info!("memory uninitialized");
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Zero every cell, keeping the allocation
    pub fn clear(&mut self) -> Result<()> {
        self.ensure_initialized()?;
        self.data.fill(0);
        Ok(())
    }

    /// Number of addressable bytes (0 while uninitialized)
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Mutable handle to the byte at `address`
    pub fn at(&mut self, address: usize) -> Result<&mut u8> {
        self.ensure_initialized()?;
        self.data
            .get_mut(address)
            .ok_or(Error::InvalidAddress(address))
    }

    /// Read the byte at `address` without requiring mutable access
    pub fn peek(&self, address: usize) -> Result<u8> {
        self.ensure_initialized()?;
        self.data
            .get(address)
            .copied()
            .ok_or(Error::InvalidAddress(address))
    }

    /// True if every bit of `mask` is set at `address`
    pub fn flag_check(&mut self, address: usize, mask: u8) -> Result<bool> {
        let value = self.at(address)?;
        Ok((*value & mask) == mask)
    }

    pub fn flag_set(&mut self, address: usize, mask: u8) -> Result<()> {
        *self.at(address)? |= mask;
        Ok(())
    }

    pub fn flag_clear(&mut self, address: usize, mask: u8) -> Result<()> {
        *self.at(address)? &= !mask;
        Ok(())
    }

    /// Overwrite `block.len()` bytes starting at `address`.
    ///
    /// The buffer never grows. A block that would run past the end of the
    /// address space is rejected before anything is written.
    pub fn write(&mut self, address: usize, block: &[u8]) -> Result<()> {
        self.ensure_initialized()?;
        if address >= self.data.len() {
            return Err(Error::InvalidAddress(address));
        }
        let end = address.saturating_add(block.len());
        if end > self.data.len() {
            return Err(Error::InvalidAddress(end - 1));
        }
        self.data[address..end].copy_from_slice(block);
        Ok(())
    }

    /// Single cell rendered as `$ADDR: $VV %bbbbbbbb`
    pub fn address_as_string(&self, address: usize) -> Result<String> {
        let value = self.peek(address)?;
        Ok(format!("${:04X}: ${:02X} %{:08b}", address, value, value))
    }

    /// Hex dump of `length` bytes starting at `address`, 16 bytes per row
    pub fn block_as_string(&self, address: usize, length: usize) -> Result<String> {
        self.ensure_initialized()?;
        if address >= self.data.len() {
            return Err(Error::InvalidAddress(address));
        }
        let end = address.saturating_add(length);
        if end > self.data.len() {
            return Err(Error::InvalidAddress(end - 1));
        }

        let mut out = String::new();
        for (row, chunk) in self.data[address..end].chunks(DUMP_ROW).enumerate() {
            if row > 0 {
                out.push('\n');
            }
            out.push_str(&dump_row(address + row * DUMP_ROW, chunk));
        }
        Ok(out)
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(Error::Uninitialized(Component::Memory))
        }
    }
}

fn dump_row(address: usize, bytes: &[u8]) -> String {
    let hex: Vec<String> = bytes.iter().map(|b| format!("{:02X}", b)).collect();
    format!("${:04X}: {}", address, hex.join(" "))
}

impl Bus for Memory {
    fn read_byte(&mut self, address: u16) -> Result<u8> {
        Ok(*self.at(address as usize)?)
    }

    fn write_byte(&mut self, address: u16, value: u8) -> Result<()> {
        *self.at(address as usize)? = value;
        Ok(())
    }
}

/// Full dump; runs of all-zero rows collapse to a single `*` line
impl fmt::Display for Memory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.initialized {
            return write!(f, "Memory: uninitialized");
        }
        write!(f, "Memory: {} bytes", self.data.len())?;

        let mut collapsed = false;
        for (row, chunk) in self.data.chunks(DUMP_ROW).enumerate() {
            if chunk.iter().all(|&b| b == 0) {
                if !collapsed {
                    write!(f, "\n*")?;
                    collapsed = true;
                }
                continue;
            }
            collapsed = false;
            write!(f, "\n{}", dump_row(row * DUMP_ROW, chunk))?;
        }
        Ok(())
    }
}
