// src/main.rs

use anyhow::Context;
use clap::error::ErrorKind;
use clap::Parser;
use rabbit_vm::config::DEFAULT_STACK_WORDS;
use rabbit_vm::{loader, ExitStatus, Memory, VirtualMachine, VmConfig, Word};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "rabbit_vm", version)]
#[command(about = "Run a rabbit bytecode image")]
struct Cli {
    /// Program image: big-endian 32-bit words, loaded at address 0
    image: PathBuf,

    /// Words of zeroed stack space placed after the program
    #[arg(long, default_value_t = DEFAULT_STACK_WORDS)]
    stack_words: usize,

    /// Do not fail with OVERFLOW when SP runs past the end of memory
    #[arg(long)]
    no_stack_guard: bool,

    /// Store builtin return values in RET
    #[arg(long)]
    store_builtin_result: bool,

    /// Initial instruction pointer
    #[arg(long, default_value_t = 0)]
    entry: Word,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn config(&self) -> VmConfig {
        VmConfig {
            stack_words: self.stack_words,
            stack_guard: !self.no_stack_guard,
            store_builtin_result: self.store_builtin_result,
        }
    }
}

/// Logs go to stderr; stdout belongs to the program's OUT instructions.
fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "rabbit_vm=warn",
        1 => "rabbit_vm=debug",
        _ => "rabbit_vm=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Loads and runs the image. `Err` means the engine was never started.
fn run(cli: &Cli) -> anyhow::Result<ExitStatus> {
    let program = loader::load_file(&cli.image)
        .with_context(|| format!("failed to load image '{}'", cli.image.display()))?;
    let config = cli.config();
    let memory = Memory::with_program(&program, config.stack_words).with_context(|| {
        format!(
            "failed to build memory for {} program words and {} stack words",
            program.len(),
            config.stack_words
        )
    })?;

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut vm = VirtualMachine::from_memory(memory, cli.entry, config, stdin.lock(), stdout.lock());
    info!("running {} ({} words)", cli.image.display(), program.len());

    Ok(match vm.run() {
        Ok(status) => status,
        Err(e) => {
            error!("VM runtime error: {}", e);
            error!("registers: {:?}", vm.registers());
            e.status()
        }
    })
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitStatus::Fail.into(),
            };
        }
    };
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(status) => status.into(),
        Err(e) => {
            error!("{:#}", e);
            ExitStatus::Fail.into()
        }
    }
}
