//! NES Core - Pure Rust NES emulation core
//!
//! This crate provides the CPU, the flat memory space and the iNES cartridge
//! loader of a Nintendo Entertainment System, tied together by [`NesSystem`].
//! It contains no rendering, audio or web dependencies.

#![forbid(unsafe_code)]

/// Error types and the crate-wide `Result`
pub mod error;
/// Flat 64KB memory space
pub mod memory;
/// Opcode decode table
pub mod opcodes;
/// CPU module containing the 2A03 (6502 variant) implementation
pub mod cpu;
/// iNES cartridge loading and bank extraction
pub mod cartridge;
/// Integration module for complete NES system
pub mod system;
/// Result-code boundary for embedding callers
pub mod context;
/// Self-test conformance checks
pub mod harness;

pub use error::{Component, Error, Result};
pub use system::NesSystem;
