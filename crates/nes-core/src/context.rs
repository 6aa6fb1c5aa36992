//! Embedding boundary
//!
//! Wraps a [`NesSystem`] behind calls that return a small fixed set of
//! result codes instead of [`Error`] values.

use log::error;

use crate::error::Error;
use crate::system::{NesSystem, RunMode, DEFAULT_STEP_LIMIT};

/// Result codes returned across the boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ResultCode {
    Success = 0,
    Failure = -1,
    InvalidArgument = -2,
    InvalidState = -3,
}

impl From<&Error> for ResultCode {
    fn from(error: &Error) -> Self {
        if error.is_lifecycle() {
            return ResultCode::InvalidState;
        }
        match error {
            Error::Unloaded => ResultCode::InvalidState,
            Error::InvalidAddress(_) | Error::InvalidIndex(_) | Error::InvalidOpcode { .. } => {
                ResultCode::InvalidArgument
            }
            _ => ResultCode::Failure,
        }
    }
}

fn code(result: crate::Result<()>) -> ResultCode {
    match result {
        Ok(()) => ResultCode::Success,
        Err(e) => {
            error!("{}", e);
            ResultCode::from(&e)
        }
    }
}

/// Library version string
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// One emulator instance as seen by an embedding caller
#[derive(Debug)]
pub struct Context {
    system: NesSystem,
    step_limit: u64,
}

impl Context {
    pub fn new() -> Self {
        Self {
            system: NesSystem::new(),
            step_limit: DEFAULT_STEP_LIMIT,
        }
    }

    pub fn initialize(&mut self) -> ResultCode {
        code(self.system.initialize())
    }

    pub fn uninitialize(&mut self) -> ResultCode {
        code(self.system.uninitialize())
    }

    /// True once initialized
    pub fn is_valid(&self) -> bool {
        self.system.is_initialized()
    }

    /// Load an iNES image from bytes
    pub fn load(&mut self, rom_data: &[u8]) -> ResultCode {
        if rom_data.is_empty() {
            return ResultCode::InvalidArgument;
        }
        code(self.system.load_rom(rom_data))
    }

    /// Instruction budget for [`Context::run`]; zero is rejected
    pub fn set_step_limit(&mut self, steps: u64) -> ResultCode {
        if steps == 0 {
            return ResultCode::InvalidArgument;
        }
        self.step_limit = steps;
        ResultCode::Success
    }

    /// Run the loaded program, tracing each instruction when `debug` is set
    pub fn run(&mut self, debug: bool) -> ResultCode {
        if !self.system.cartridge().is_loaded() {
            return ResultCode::InvalidState;
        }
        let mode = if debug { RunMode::Debug } else { RunMode::Normal };
        code(self.system.run(mode, self.step_limit).map(|_| ()))
    }

    pub fn system(&self) -> &NesSystem {
        &self.system
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
