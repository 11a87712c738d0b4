// src/operand.rs

//! Operand resolution shared by every instruction.
//!
//! The resolver only reads the register file and memory. Consuming a
//! trailing immediate advances the instruction pointer, so every resolution
//! takes the current IP and hands back the advanced one; the engine writes
//! it back once the whole instruction has been resolved.

use crate::error::{VmError, Word};
use crate::instruction::Instruction;
use crate::memory::Memory;
use crate::registers::{Register, RegisterFile};
use std::convert::TryFrom;

/// Where an instruction writes its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Register(Register), // Direct register write
    Memory(Word),       // Write to Mem[address]
}

/// Operands of the arithmetic/logic opcodes: `dst = b OP c`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TripleOperands {
    pub dst: Destination, // From regA
    pub b: Word,          // From regB
    pub c: Word,          // From regC or the immediate
    pub ip: Word,         // IP after any immediate
}

/// A single resolved value and the IP after any immediate was consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SingleOperand {
    pub value: Word,
    pub ip: Word,
}

pub struct OperandResolver<'a> {
    registers: &'a RegisterFile,
    memory: &'a Memory,
}

impl<'a> OperandResolver<'a> {
    pub fn new(registers: &'a RegisterFile, memory: &'a Memory) -> Self {
        Self { registers, memory }
    }

    /// Reads the immediate word at `ip`. Returns it with the next IP.
    #[inline]
    pub fn fetch_immediate(&self, ip: Word) -> Result<(Word, Word), VmError> {
        let value = self.memory.load(ip)?;
        Ok((value, ip.wrapping_add(1)))
    }

    /// `Memory(reg)` when dereferencing, otherwise the register itself.
    pub fn destination(&self, reg: u8, deref: bool) -> Result<Destination, VmError> {
        let reg = Register::try_from(reg)?;
        if deref {
            Ok(Destination::Memory(self.registers.get(reg)))
        } else {
            Ok(Destination::Register(reg))
        }
    }

    /// A register value, optionally loaded through memory.
    pub fn value(&self, reg: u8, deref: bool) -> Result<Word, VmError> {
        let raw = self.registers.read(reg)?;
        self.deref(raw, deref)
    }

    /// The regC/immediate operand. The immediate is consumed before the
    /// regC-deref is applied to it.
    pub fn single(&self, ins: &Instruction, ip: Word) -> Result<SingleOperand, VmError> {
        let (raw, ip) = if ins.modes.immediate {
            self.fetch_immediate(ip)?
        } else {
            (self.registers.read(ins.reg_c)?, ip)
        };
        let value = self.deref(raw, ins.modes.deref_c)?;
        Ok(SingleOperand { value, ip })
    }

    /// Resolves destination, b, then c, in that order.
    pub fn triple(&self, ins: &Instruction, ip: Word) -> Result<TripleOperands, VmError> {
        let dst = self.destination(ins.reg_a, ins.modes.deref_a)?;
        let b = self.value(ins.reg_b, ins.modes.deref_b)?;
        let SingleOperand { value: c, ip } = self.single(ins, ip)?;
        Ok(TripleOperands { dst, b, c, ip })
    }

    #[inline]
    fn deref(&self, raw: Word, deref: bool) -> Result<Word, VmError> {
        if deref {
            self.memory.load(raw)
        } else {
            Ok(raw)
        }
    }
}
