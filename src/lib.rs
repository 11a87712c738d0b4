// src/lib.rs

//! A small register-based bytecode VM.
//!
//! Programs are sequences of 32-bit words: a 4-bit opcode, four addressing
//! mode bits and three 4-bit register fields per instruction, optionally
//! followed by an immediate word. See [`instruction`] for the layout and
//! [`vm::VirtualMachine`] for execution.

pub mod builtins;
pub mod config;
pub mod error;
pub mod instruction;
pub mod loader;
pub mod memory;
pub mod operand;
pub mod registers;
pub mod vm;

pub use builtins::BuiltinTable;
pub use config::VmConfig;
pub use error::{ExitStatus, VmError, Word};
pub use instruction::{Instruction, Modes, Opcode};
pub use memory::Memory;
pub use registers::{Register, RegisterFile};
pub use vm::{MachineState, VirtualMachine};
