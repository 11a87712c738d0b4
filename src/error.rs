// src/error.rs

//! Word type, exit statuses and the VM error taxonomy.

use std::collections::TryReserveError;
use std::process::ExitCode;
use thiserror::Error;

/// The only value type: registers, memory cells, addresses and instructions.
pub type Word = u32;

/// Process-level outcome of a VM run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitStatus {
    Success = 0,  // Clean HALT.
    Fail = 1,     // Environment/configuration failure, allocation, bad builtin index.
    Overflow = 2, // Stack guard tripped.
    Illegal = 3,  // Unknown opcode, division by zero, malformed access.
}

impl ExitStatus {
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        ExitCode::from(status.code())
    }
}

/// Errors that stop a VM instance. Every variant is fatal.
#[derive(Debug, Error)]
pub enum VmError {
    #[error("invalid opcode: {0}")]
    InvalidOpcode(u8),
    #[error("reserved bits set in instruction word {0:#010x}")]
    ReservedBits(Word),
    #[error("division by zero")]
    DivisionByZero,
    #[error("register index {0} out of range")]
    InvalidRegister(u8),
    #[error("memory access out of bounds at address {address:#x} (memory holds {len} words)")]
    MemoryOutOfBounds { address: Word, len: usize },
    #[error("builtin index {index} out of range (table holds {len} entries)")]
    InvalidBuiltin { index: Word, len: usize },
    #[error("stack pointer {sp:#x} exceeds memory of {len} words")]
    StackOverflow { sp: Word, len: usize },
    #[error("program image length {0} is not a multiple of 4 bytes")]
    MisalignedImage(usize),
    #[error("memory of {program} program words plus {stack} stack words exceeds the 32-bit address space")]
    MemoryTooLarge { program: usize, stack: usize },
    #[error("failed to allocate memory: {0}")]
    Allocation(#[from] TryReserveError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl VmError {
    /// The exit status this error terminates the VM with.
    pub fn status(&self) -> ExitStatus {
        match self {
            VmError::InvalidOpcode(_)
            | VmError::ReservedBits(_)
            | VmError::DivisionByZero
            | VmError::InvalidRegister(_)
            | VmError::MemoryOutOfBounds { .. } => ExitStatus::Illegal,
            VmError::StackOverflow { .. } => ExitStatus::Overflow,
            VmError::InvalidBuiltin { .. }
            | VmError::MisalignedImage(_)
            | VmError::MemoryTooLarge { .. }
            | VmError::Allocation(_)
            | VmError::Io(_) => ExitStatus::Fail,
        }
    }
}
