// src/registers.rs

//! The fixed register file.

use crate::error::{VmError, Word};
use std::convert::TryFrom;
use std::fmt;

/// Number of addressable registers. A 4-bit register field can name 16,
/// so index 15 is always invalid.
pub const REGISTER_COUNT: usize = 15;

/// Zero flag bit in FLAGS, set by SUB when its result is zero.
pub const ZERO_FLAG: Word = 0x2;

/// Register names, by index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Register {
    Zero = 0,   // Ordinary writable register despite the name
    R1 = 1,     // R1-R9: general purpose
    R2 = 2,
    R3 = 3,
    R4 = 4,
    R5 = 5,
    R6 = 6,
    R7 = 7,
    R8 = 8,
    R9 = 9,
    Ip = 10,    // Instruction pointer
    Sp = 11,    // Stack pointer, set by the loader
    Ret = 12,   // Builtin results, when stored
    Tmp = 13,   // Scratch
    Flags = 14, // Bit 1 is the sticky zero flag
}

impl Register {
    pub const ALL: [Register; REGISTER_COUNT] = [
        Register::Zero,
        Register::R1,
        Register::R2,
        Register::R3,
        Register::R4,
        Register::R5,
        Register::R6,
        Register::R7,
        Register::R8,
        Register::R9,
        Register::Ip,
        Register::Sp,
        Register::Ret,
        Register::Tmp,
        Register::Flags,
    ];

    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Register::Zero => "ZERO",
            Register::R1 => "R1",
            Register::R2 => "R2",
            Register::R3 => "R3",
            Register::R4 => "R4",
            Register::R5 => "R5",
            Register::R6 => "R6",
            Register::R7 => "R7",
            Register::R8 => "R8",
            Register::R9 => "R9",
            Register::Ip => "IP",
            Register::Sp => "SP",
            Register::Ret => "RET",
            Register::Tmp => "TMP",
            Register::Flags => "FLAGS",
        }
    }
}

impl TryFrom<u8> for Register {
    type Error = VmError;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        Register::ALL
            .get(index as usize)
            .copied()
            .ok_or(VmError::InvalidRegister(index))
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Register storage. All registers start at zero.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct RegisterFile {
    regs: [Word; REGISTER_COUNT],
}

impl RegisterFile {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self, reg: Register) -> Word {
        self.regs[reg as usize]
    }

    #[inline]
    pub fn set(&mut self, reg: Register, value: Word) {
        self.regs[reg as usize] = value;
    }

    /// Reads a register named by a raw 4-bit instruction field.
    pub fn read(&self, index: u8) -> Result<Word, VmError> {
        Register::try_from(index).map(|reg| self.get(reg))
    }

    pub fn zero_flag(&self) -> bool {
        self.get(Register::Flags) & ZERO_FLAG != 0
    }

    /// Sets the zero flag. Nothing in the instruction set clears it.
    pub fn set_zero_flag(&mut self) {
        let flags = self.get(Register::Flags);
        self.set(Register::Flags, flags | ZERO_FLAG);
    }

    pub fn as_slice(&self) -> &[Word] {
        &self.regs
    }
}

impl fmt::Debug for RegisterFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for reg in Register::ALL {
            map.entry(&reg.name(), &format_args!("{:#x}", self.get(reg)));
        }
        map.finish()
    }
}
