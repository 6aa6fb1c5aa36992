//! NES WASM - WASM wrapper for the NES emulation core
//!
//! Every call returns a result code from [`ResultCode`] as an `i32`.

use nes_core::context::{self, Context, ResultCode};
use wasm_bindgen::prelude::wasm_bindgen;

/// NES Emulator wrapper for WASM
#[wasm_bindgen]
pub struct NesEmulator {
    context: Context,
}

#[wasm_bindgen]
impl NesEmulator {
    /// Create a new, uninitialized emulator
    #[wasm_bindgen(constructor)]
    pub fn new() -> NesEmulator {
        Self {
            context: Context::new(),
        }
    }

    pub fn initialize(&mut self) -> i32 {
        self.context.initialize() as i32
    }

    pub fn uninitialize(&mut self) -> i32 {
        self.context.uninitialize() as i32
    }

    #[wasm_bindgen(getter)]
    pub fn valid(&self) -> bool {
        self.context.is_valid()
    }

    /// Load a ROM from bytes
    pub fn load_rom(&mut self, rom_data: &[u8]) -> i32 {
        self.context.load(rom_data) as i32
    }

    /// Instruction budget for each run
    pub fn set_step_limit(&mut self, steps: u32) -> i32 {
        self.context.set_step_limit(steps as u64) as i32
    }

    pub fn run(&mut self, debug: bool) -> i32 {
        self.context.run(debug) as i32
    }

    /// Program counter after the last run
    pub fn pc(&self) -> u16 {
        self.context.system().cpu().registers().pc
    }

    /// Get CPU cycles
    pub fn cpu_cycles(&self) -> u32 {
        self.context.system().cpu().cycles()
    }

    /// Textual machine state dump
    pub fn dump(&self) -> String {
        self.context.system().to_string()
    }
}

impl Default for NesEmulator {
    fn default() -> Self {
        Self::new()
    }
}

/// Code returned on success
#[wasm_bindgen]
pub fn success_code() -> i32 {
    ResultCode::Success as i32
}

#[wasm_bindgen]
pub fn version() -> String {
    context::version().to_string()
}
