//! Error types shared by every component of the core

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Component that raised a lifecycle error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Memory,
    Cpu,
    Rom,
    System,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Component::Memory => "memory",
            Component::Cpu => "cpu",
            Component::Rom => "rom",
            Component::System => "system",
        };
        f.write_str(name)
    }
}

/// Errors raised by the emulation core
#[derive(Error, Debug)]
pub enum Error {
    #[error("Allocation failed")]
    AllocationFailed,

    #[error("{0} is already initialized")]
    AlreadyInitialized(Component),

    #[error("{0} is not initialized")]
    Uninitialized(Component),

    #[error("Invalid address: {0:#06X}")]
    InvalidAddress(usize),

    #[error("Invalid index: {0}")]
    InvalidIndex(usize),

    #[error("Invalid opcode: {opcode:#04X} at {address:#06X}")]
    InvalidOpcode { opcode: u8, address: u16 },

    #[error("Malformed cartridge: {0}")]
    Malformed(String),

    #[error("Unsupported cartridge: {0}")]
    Unsupported(String),

    #[error("No cartridge loaded")]
    Unloaded,

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for the lifecycle errors (already-initialized / not-initialized)
    pub fn is_lifecycle(&self) -> bool {
        matches!(self, Error::AlreadyInitialized(_) | Error::Uninitialized(_))
    }
}

/// Result alias used throughout the core
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_component() {
        let err = Error::Uninitialized(Component::Cpu);
        assert_eq!(err.to_string(), "cpu is not initialized");

        let err = Error::InvalidAddress(0x10000);
        assert_eq!(err.to_string(), "Invalid address: 0x10000");
    }

    #[test]
    fn test_lifecycle_classification() {
        assert!(Error::AlreadyInitialized(Component::Rom).is_lifecycle());
        assert!(!Error::Unloaded.is_lifecycle());
    }
}
