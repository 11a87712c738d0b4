// src/instruction.rs

//! Instruction word layout, opcodes and the decoder.
//!
//! Bit layout, most significant first:
//!
//! ```text
//!  31    28 27 26 25 24 23          12 11   8 7    4 3    0
//! | opcode | I| C| B| A|   reserved   | regC | regB | regA |
//! ```
//!
//! `I` selects a trailing immediate word, `A`/`B`/`C` dereference the
//! corresponding register operand through memory.

use crate::error::{VmError, Word};
use std::convert::TryFrom;

const OPCODE_SHIFT: u32 = 28;
const REG_C_SHIFT: u32 = 8;
const REG_B_SHIFT: u32 = 4;
const NIBBLE: Word = 0xF;

pub const IMMEDIATE_BIT: Word = 1 << 27;
pub const DEREF_C_BIT: Word = 1 << 26;
pub const DEREF_B_BIT: Word = 1 << 25;
pub const DEREF_A_BIT: Word = 1 << 24;
pub const RESERVED_MASK: Word = 0x00FF_F000;

// --- Opcodes ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    // Control
    Halt = 0, // Stop with SUCCESS
    Move = 1, // regB (or Mem[regB]) = single operand

    // Arithmetic / logic: dst = b OP c
    Add = 2,  // Wrapping add
    Sub = 3,  // Wrapping subtract; sets the zero flag on a zero result
    Mul = 4,  // Wrapping multiply
    Div = 5,  // Unsigned divide; ILLEGAL on a zero divisor
    Shr = 6,  // Logical shift right
    Shl = 7,  // Shift left
    Nand = 8, // !(b & c)
    Xor = 9,  // b ^ c

    // Branches
    Br = 10,   // Unconditional jump
    Brz = 11,  // Taken when the zero flag is clear
    Brnz = 12, // Taken when the zero flag is set

    // I/O and natives
    In = 13,  // Read one byte into regC (or Mem[regC])
    Out = 14, // Write the low byte of the operand
    Bif = 15, // Call builtin by index
}

impl TryFrom<u8> for Opcode {
    type Error = VmError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Opcode::Halt), 1 => Ok(Opcode::Move), 2 => Ok(Opcode::Add),
            3 => Ok(Opcode::Sub), 4 => Ok(Opcode::Mul), 5 => Ok(Opcode::Div),
            6 => Ok(Opcode::Shr), 7 => Ok(Opcode::Shl), 8 => Ok(Opcode::Nand),
            9 => Ok(Opcode::Xor), 10 => Ok(Opcode::Br), 11 => Ok(Opcode::Brz),
            12 => Ok(Opcode::Brnz), 13 => Ok(Opcode::In), 14 => Ok(Opcode::Out),
            15 => Ok(Opcode::Bif),
            _ => Err(VmError::InvalidOpcode(value)),
        }
    }
}

// --- Addressing modes ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modes {
    pub immediate: bool, // Bit 27: operand C is the next word
    pub deref_a: bool,   // Bit 24
    pub deref_b: bool,   // Bit 25
    pub deref_c: bool,   // Bit 26
}

impl Modes {
    fn from_word(word: Word) -> Self {
        Self {
            immediate: word & IMMEDIATE_BIT != 0,
            deref_a: word & DEREF_A_BIT != 0,
            deref_b: word & DEREF_B_BIT != 0,
            deref_c: word & DEREF_C_BIT != 0,
        }
    }

    fn bits(self) -> Word {
        let mut bits = 0;
        if self.immediate {
            bits |= IMMEDIATE_BIT;
        }
        if self.deref_c {
            bits |= DEREF_C_BIT;
        }
        if self.deref_b {
            bits |= DEREF_B_BIT;
        }
        if self.deref_a {
            bits |= DEREF_A_BIT;
        }
        bits
    }
}

// --- Unpacked instruction ---

/// An unpacked instruction word. Register fields are raw 4-bit indices;
/// whether they name a real register is checked when they are used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: u8,
    pub reg_a: u8,
    pub reg_b: u8,
    pub reg_c: u8,
    pub modes: Modes,
}

impl Instruction {
    /// Builds an instruction with all modes off. Fields are truncated to
    /// four bits.
    pub fn new(opcode: Opcode, reg_a: u8, reg_b: u8, reg_c: u8) -> Self {
        Self {
            opcode: opcode as u8,
            reg_a: reg_a & 0xF,
            reg_b: reg_b & 0xF,
            reg_c: reg_c & 0xF,
            modes: Modes::default(),
        }
    }

    pub fn with_modes(mut self, modes: Modes) -> Self {
        self.modes = modes;
        self
    }

    pub fn immediate(mut self) -> Self {
        self.modes.immediate = true;
        self
    }

    pub fn deref_a(mut self) -> Self {
        self.modes.deref_a = true;
        self
    }

    pub fn deref_b(mut self) -> Self {
        self.modes.deref_b = true;
        self
    }

    pub fn deref_c(mut self) -> Self {
        self.modes.deref_c = true;
        self
    }

    /// Unpacks `word`. Total over all inputs: the reserved bits are ignored.
    pub fn decode(word: Word) -> Self {
        Self {
            opcode: (word >> OPCODE_SHIFT) as u8,
            reg_a: (word & NIBBLE) as u8,
            reg_b: ((word >> REG_B_SHIFT) & NIBBLE) as u8,
            reg_c: ((word >> REG_C_SHIFT) & NIBBLE) as u8,
            modes: Modes::from_word(word),
        }
    }

    /// Unpacks `word`, rejecting words whose reserved bits are not zero.
    pub fn decode_checked(word: Word) -> Result<Self, VmError> {
        if word & RESERVED_MASK != 0 {
            return Err(VmError::ReservedBits(word));
        }
        Ok(Self::decode(word))
    }

    /// Packs the instruction back into a word.
    pub fn encode(&self) -> Word {
        (Word::from(self.opcode & 0xF) << OPCODE_SHIFT)
            | self.modes.bits()
            | (Word::from(self.reg_c & 0xF) << REG_C_SHIFT)
            | (Word::from(self.reg_b & 0xF) << REG_B_SHIFT)
            | Word::from(self.reg_a & 0xF)
    }

    pub fn opcode(&self) -> Result<Opcode, VmError> {
        Opcode::try_from(self.opcode)
    }
}
