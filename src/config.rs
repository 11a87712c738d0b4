// src/config.rs

//! Per-instance VM settings.

/// Default trailing capacity reserved after the program for stack use.
pub const DEFAULT_STACK_WORDS: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmConfig {
    /// Zeroed words placed after the program image.
    pub stack_words: usize,
    /// Fail with OVERFLOW once SP points past the end of memory.
    pub stack_guard: bool,
    /// Write each builtin's return value into RET instead of discarding it.
    pub store_builtin_result: bool,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            stack_words: DEFAULT_STACK_WORDS,
            stack_guard: true,
            store_builtin_result: false,
        }
    }
}
