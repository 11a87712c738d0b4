// src/builtins.rs

//! Native functions callable from bytecode through BIF.

use crate::error::{VmError, Word};
use crate::memory::Memory;
use crate::registers::{Register, RegisterFile};
use std::fmt;

/// A native callable. Receives the whole machine state and returns a word.
pub type BuiltinFn = Box<dyn FnMut(&mut RegisterFile, &mut Memory) -> Word>;

struct Builtin {
    name: &'static str,
    func: BuiltinFn,
}

/// Index-addressed registry of builtins, built before the machine runs.
#[derive(Default)]
pub struct BuiltinTable {
    entries: Vec<Builtin>,
}

impl BuiltinTable {
    /// An empty table; every BIF fails.
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard builtins:
    ///
    /// | index | name | returns |
    /// |---|---|---|
    /// | 0 | `trace_registers` | 0 |
    /// | 1 | `memory_size` | memory length in words |
    /// | 2 | `clear_flags` | 0 |
    pub fn standard() -> Self {
        let mut table = Self::new();
        table.register("trace_registers", |regs, _| {
            tracing::info!("registers: {:?}", regs);
            0
        });
        table.register("memory_size", |_, mem| mem.len() as Word);
        table.register("clear_flags", |regs, _| {
            regs.set(Register::Flags, 0);
            0
        });
        table
    }

    /// Appends a builtin and returns the index bytecode uses to call it.
    pub fn register<F>(&mut self, name: &'static str, func: F) -> Word
    where
        F: FnMut(&mut RegisterFile, &mut Memory) -> Word + 'static,
    {
        self.entries.push(Builtin {
            name,
            func: Box::new(func),
        });
        (self.entries.len() - 1) as Word
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn name(&self, index: Word) -> Option<&'static str> {
        self.entries.get(index as usize).map(|b| b.name)
    }

    /// Invokes builtin `index`. Valid indices are `0..len`.
    pub fn call(
        &mut self,
        index: Word,
        registers: &mut RegisterFile,
        memory: &mut Memory,
    ) -> Result<Word, VmError> {
        let len = self.entries.len();
        let builtin = self
            .entries
            .get_mut(index as usize)
            .ok_or(VmError::InvalidBuiltin { index, len })?;
        tracing::debug!("BIF {} ({})", index, builtin.name);
        Ok((builtin.func)(registers, memory))
    }
}

impl fmt::Debug for BuiltinTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|b| b.name))
            .finish()
    }
}
