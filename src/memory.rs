// src/memory.rs

//! Flat word-addressed memory shared by program, data and stack.

use crate::error::{VmError, Word};

/// Words reachable by a 32-bit address.
pub const MAX_WORDS: u64 = Word::MAX as u64 + 1;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Memory {
    cells: Vec<Word>,
    program_len: usize,
}

impl Memory {
    /// Zeroed memory of `len` words with no program.
    pub fn new(len: usize) -> Self {
        Self {
            cells: vec![0; len],
            program_len: 0,
        }
    }

    /// Places `program` at address 0 followed by `stack_words` zeroed words.
    ///
    /// Fails with `MemoryTooLarge` when the total cannot be addressed by a
    /// word, and with `Allocation` when the buffer cannot be reserved.
    pub fn with_program(program: &[Word], stack_words: usize) -> Result<Self, VmError> {
        let total = program
            .len()
            .checked_add(stack_words)
            .filter(|&total| total as u64 <= MAX_WORDS)
            .ok_or(VmError::MemoryTooLarge {
                program: program.len(),
                stack: stack_words,
            })?;
        let mut cells = Vec::new();
        cells.try_reserve_exact(total)?;
        cells.extend_from_slice(program);
        cells.resize(total, 0);
        Ok(Self {
            cells,
            program_len: program.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Number of words occupied by the loaded program; the first free word.
    pub fn program_len(&self) -> usize {
        self.program_len
    }

    #[inline]
    pub fn load(&self, address: Word) -> Result<Word, VmError> {
        self.cells
            .get(address as usize)
            .copied()
            .ok_or(VmError::MemoryOutOfBounds {
                address,
                len: self.cells.len(),
            })
    }

    #[inline]
    pub fn store(&mut self, address: Word, value: Word) -> Result<(), VmError> {
        let len = self.cells.len();
        let cell = self
            .cells
            .get_mut(address as usize)
            .ok_or(VmError::MemoryOutOfBounds { address, len })?;
        *cell = value;
        Ok(())
    }

    pub fn as_slice(&self) -> &[Word] {
        &self.cells
    }
}
