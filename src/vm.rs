// src/vm.rs

//! The execution engine: fetch, decode, resolve, execute.

use crate::builtins::BuiltinTable;
use crate::config::VmConfig;
use crate::error::{ExitStatus, VmError, Word};
use crate::instruction::{Instruction, Opcode};
use crate::memory::Memory;
use crate::operand::{Destination, OperandResolver};
use crate::registers::{Register, RegisterFile};
use std::io::{ErrorKind, Read, Write};
use tracing::{debug, trace, warn};

/// Word stored by IN when the input stream is exhausted.
pub const EOF_WORD: Word = Word::MAX;

// --- Machine State ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineState {
    Running,            // Will fetch on the next step
    Halted,             // Clean HALT; exits SUCCESS
    Failed(ExitStatus), // Fatal error; no further fetches
}

impl MachineState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, MachineState::Running)
    }

    /// The status a terminated machine exits with; `None` while running.
    pub fn exit_status(self) -> Option<ExitStatus> {
        match self {
            MachineState::Running => None,
            MachineState::Halted => Some(ExitStatus::Success),
            MachineState::Failed(status) => Some(status),
        }
    }
}

// --- Virtual Machine ---

/// The fetch-decode-execute engine. Owns its registers, memory, builtins
/// and I/O streams for its whole lifetime.
pub struct VirtualMachine<I, O> {
    registers: RegisterFile,
    memory: Memory,         // Program, data and stack
    builtins: BuiltinTable, // Targets of BIF
    input: I,               // Bytes consumed by IN
    output: O,              // Bytes produced by OUT
    config: VmConfig,
    state: MachineState,
}

impl<I: Read, O: Write> VirtualMachine<I, O> {
    /// Loads `program` at address 0 with `config.stack_words` of stack
    /// after it. IP starts at 0, SP at the first word past the program.
    /// Fails with FAIL when that memory cannot be built.
    pub fn new(program: &[Word], config: VmConfig, input: I, output: O) -> Result<Self, VmError> {
        let memory = Memory::with_program(program, config.stack_words)?;
        Ok(Self::from_memory(memory, 0, config, input, output))
    }

    /// Runs a memory image prepared elsewhere, starting at `entry`.
    ///
    /// SP starts at `memory.program_len()`, which is 0 for an image built
    /// with `Memory::new`. Use [`with_stack_pointer`](Self::with_stack_pointer)
    /// to place it elsewhere.
    pub fn from_memory(memory: Memory, entry: Word, config: VmConfig, input: I, output: O) -> Self {
        let mut registers = RegisterFile::new();
        registers.set(Register::Ip, entry);
        registers.set(Register::Sp, memory.program_len() as Word);
        debug!(
            "VM created: program={} words, memory={} words, entry={}",
            memory.program_len(),
            memory.len(),
            entry
        );
        VirtualMachine {
            registers,
            memory,
            builtins: BuiltinTable::standard(),
            input,
            output,
            config,
            state: MachineState::Running,
        }
    }

    /// Replaces the builtin table.
    pub fn with_builtins(mut self, builtins: BuiltinTable) -> Self {
        self.builtins = builtins;
        self
    }

    /// Overrides the initial SP chosen from the image.
    pub fn with_stack_pointer(mut self, sp: Word) -> Self {
        self.registers.set(Register::Sp, sp);
        self
    }

    pub fn state(&self) -> MachineState {
        self.state
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    pub fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    pub fn registers_mut(&mut self) -> &mut RegisterFile {
        &mut self.registers
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn into_output(self) -> O {
        self.output
    }

    // --- Execution Loop ---

    /// Runs until HALT or a fatal error.
    ///
    /// Returns `Ok(Success)` on HALT and `Err` with the first fatal error.
    /// On a machine that has already terminated nothing is executed and
    /// its recorded status comes back as `Ok`.
    pub fn run(&mut self) -> Result<ExitStatus, VmError> {
        loop {
            if let Some(status) = self.step()?.exit_status() {
                return Ok(status);
            }
        }
    }

    /// Executes exactly one instruction. A terminated machine stays put.
    pub fn step(&mut self) -> Result<MachineState, VmError> {
        if self.state.is_terminal() {
            return Ok(self.state);
        }
        match self.execute_next() {
            Ok(state) => {
                if state == MachineState::Halted {
                    debug!("HALT at ip={}", self.registers.get(Register::Ip).wrapping_sub(1));
                }
                self.state = state;
                Ok(state)
            }
            Err(err) => {
                let status = err.status();
                warn!(
                    "VM failed with {:?} at ip={}: {}",
                    status,
                    self.registers.get(Register::Ip),
                    err
                );
                // A flush failure here is dropped in favour of `err`.
                let _ = self.output.flush();
                self.state = MachineState::Failed(status);
                Err(err)
            }
        }
    }

    /// Fetch, advance IP, decode, dispatch.
    fn execute_next(&mut self) -> Result<MachineState, VmError> {
        let ip = self.registers.get(Register::Ip);
        let word = self.memory.load(ip)?;
        let ip = ip.wrapping_add(1);
        self.registers.set(Register::Ip, ip);

        let instruction = Instruction::decode_checked(word)?;
        let opcode = instruction.opcode()?;
        trace!("{:?}({:#010x}) ip={} regs={:?}", opcode, word, ip.wrapping_sub(1), self.registers);

        if opcode == Opcode::Halt {
            self.output.flush()?;
            return Ok(MachineState::Halted);
        }
        self.execute(opcode, &instruction, ip)?;
        self.check_stack()?;
        Ok(MachineState::Running)
    }

    /// Executes one decoded, non-HALT instruction. `ip` already points past
    /// the instruction word.
    fn execute(&mut self, opcode: Opcode, ins: &Instruction, ip: Word) -> Result<(), VmError> {
        match opcode {
            Opcode::Halt => {} // Handled by the caller.
            Opcode::Move => {
                let dst = self.resolver().destination(ins.reg_b, ins.modes.deref_b)?;
                let src = self.resolver().single(ins, ip)?;
                self.registers.set(Register::Ip, src.ip);
                self.store(dst, src.value)?;
            }

            // --- Arithmetic / Logic ---
            Opcode::Add => {
                self.arith(ins, ip, Word::wrapping_add)?;
            }
            Opcode::Sub => {
                if self.arith(ins, ip, Word::wrapping_sub)? == 0 {
                    self.registers.set_zero_flag();
                }
            }
            Opcode::Mul => {
                self.arith(ins, ip, Word::wrapping_mul)?;
            }
            Opcode::Div => {
                let ops = self.resolver().triple(ins, ip)?;
                if ops.c == 0 {
                    return Err(VmError::DivisionByZero); // Nothing written yet.
                }
                self.registers.set(Register::Ip, ops.ip);
                self.store(ops.dst, ops.b / ops.c)?;
            }
            Opcode::Shr => {
                self.arith(ins, ip, |b, c| b.checked_shr(c).unwrap_or(0))?;
            }
            Opcode::Shl => {
                self.arith(ins, ip, |b, c| b.checked_shl(c).unwrap_or(0))?;
            }
            Opcode::Nand => {
                self.arith(ins, ip, |b, c| !(b & c))?;
            }
            Opcode::Xor => {
                self.arith(ins, ip, |b, c| b ^ c)?;
            }

            // --- Control Flow ---
            Opcode::Br => self.branch(ins, ip, true)?,
            Opcode::Brz => {
                let taken = !self.registers.zero_flag();
                self.branch(ins, ip, taken)?;
            }
            Opcode::Brnz => {
                let taken = self.registers.zero_flag();
                self.branch(ins, ip, taken)?;
            }

            // --- I/O ---
            Opcode::In => {
                // Destination comes straight from regC; the immediate bit is unused.
                let dst = self.resolver().destination(ins.reg_c, ins.modes.deref_c)?;
                let value = self.read_byte()?;
                self.store(dst, value)?;
            }
            Opcode::Out => {
                let src = self.resolver().single(ins, ip)?;
                self.registers.set(Register::Ip, src.ip);
                self.output.write_all(&[src.value as u8])?;
            }

            // --- Builtins ---
            Opcode::Bif => {
                let src = self.resolver().single(ins, ip)?;
                self.registers.set(Register::Ip, src.ip);
                let result = self
                    .builtins
                    .call(src.value, &mut self.registers, &mut self.memory)?;
                if self.config.store_builtin_result {
                    self.registers.set(Register::Ret, result);
                }
            }
        }
        Ok(())
    }

    // --- Helpers ---

    #[inline]
    fn resolver(&self) -> OperandResolver<'_> {
        OperandResolver::new(&self.registers, &self.memory)
    }

    /// Writes `value` to a register or memory cell.
    #[inline]
    fn store(&mut self, dst: Destination, value: Word) -> Result<(), VmError> {
        match dst {
            Destination::Register(reg) => {
                self.registers.set(reg, value);
                Ok(())
            }
            Destination::Memory(address) => self.memory.store(address, value),
        }
    }

    /// `dst = op(b, c)` over the triple operands. Returns the stored result.
    fn arith(
        &mut self,
        ins: &Instruction,
        ip: Word,
        op: impl FnOnce(Word, Word) -> Word,
    ) -> Result<Word, VmError> {
        let ops = self.resolver().triple(ins, ip)?;
        let result = op(ops.b, ops.c);
        self.registers.set(Register::Ip, ops.ip);
        self.store(ops.dst, result)?;
        Ok(result)
    }

    /// Resolves the target; jumps if `taken`, otherwise falls through past
    /// any immediate.
    fn branch(&mut self, ins: &Instruction, ip: Word, taken: bool) -> Result<(), VmError> {
        let target = self.resolver().single(ins, ip)?;
        let next = if taken { target.value } else { target.ip };
        self.registers.set(Register::Ip, next);
        Ok(())
    }

    /// Reads one byte, zero-extended. Pending output is flushed first so
    /// prompts appear before the read blocks.
    fn read_byte(&mut self) -> Result<Word, VmError> {
        self.output.flush()?;
        let mut buf = [0u8; 1];
        loop {
            match self.input.read(&mut buf) {
                Ok(0) => return Ok(EOF_WORD),
                Ok(_) => return Ok(Word::from(buf[0])),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Stack guard: SP may point at the end of memory but not past it.
    fn check_stack(&self) -> Result<(), VmError> {
        if !self.config.stack_guard {
            return Ok(());
        }
        let sp = self.registers.get(Register::Sp);
        let len = self.memory.len();
        if sp as usize > len {
            return Err(VmError::StackOverflow { sp, len });
        }
        Ok(())
    }
}
