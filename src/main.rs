//! CLI front end: assembles a `.pvasm` listing into
//! a [`CodeObject`](pyvym::CodeObject) and either hands it to the
//! [`Debugger`](pyvym::Debugger) or runs it straight through.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use pyvym::assembler::{self, AssembleError};
use pyvym::config::VmConfig;
#[cfg(feature = "debugger")]
use pyvym::debugger::Debugger;
use pyvym::disassembler;
use pyvym::interpreter::Vm;
use pyvym::value::Value;

/// Assembles and runs a `.pvasm` bytecode listing under the `pyvym` interpreter.
#[derive(Parser)]
#[command(name = "pyvym", about = "A stack-based bytecode interpreter with a source-level debugger")]
struct Args {
    /// Path to a `.pvasm` assembly listing.
    path: PathBuf,

    /// Skip the debugger and run the program to completion directly.
    /// No-op when built without the `debugger` feature, which never starts one.
    #[arg(long)]
    no_debug: bool,

    /// Print the disassembly of the top-level code object and exit without running it.
    #[arg(long)]
    disassemble: bool,

    /// Log every opcode dispatch at debug level.
    #[arg(long)]
    trace: bool,

    /// Raise the logging verbosity (warn -> info -> debug -> trace).
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Top-level failure composing every subsystem `main` can surface.
#[derive(Debug, thiserror::Error)]
enum AppError {
    /// The source path could not be read.
    #[error("reading {path}: {source}")]
    Read {
        /// The path that failed to read.
        path: PathBuf,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The `.pvasm` listing failed to assemble.
    #[error(transparent)]
    Assemble(#[from] AssembleError),
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose, args.trace);

    match run(&args) {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(%err, "pyvym failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8, trace: bool) {
    let default_level = match verbose {
        0 if trace => "debug",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn run(args: &Args) -> Result<ExitCode, AppError> {
    let source = fs::read_to_string(&args.path).map_err(|source| AppError::Read {
        path: args.path.clone(),
        source,
    })?;
    let code = assembler::assemble(&source)?;

    if args.disassemble {
        print!("{}", disassembler::disassemble(&code));
        return Ok(ExitCode::SUCCESS);
    }

    let config = VmConfig {
        trace_dispatch: args.trace,
        show_disassembly_on_build: args.verbose >= 2,
        debugger_enabled: !args.no_debug,
    };
    let vm = Vm::new(Rc::new(code), config);

    #[cfg(feature = "debugger")]
    if config.debugger_enabled {
        Debugger::new(vm).repl();
        return Ok(ExitCode::SUCCESS);
    }

    match vm_run(vm) {
        Ok(value) => Ok(exit_code_for(&value)),
        Err(err) => {
            eprintln!("error: {err}");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn vm_run(mut vm: Vm) -> Result<Value, pyvym::VmError> {
    let result = vm.run_to_completion()?;
    println!("Program Return Value: {result}");
    Ok(result)
}

/// Coerces the top-level `RETURN_VALUE` to a process exit code: integers map
/// directly (truncated to `u8`, per [`ExitCode`]'s own range), anything else
/// exits `0` with the value already printed by [`vm_run`].
fn exit_code_for(value: &Value) -> ExitCode {
    match value {
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        Value::Int(i) => ExitCode::from(*i as u8),
        _ => ExitCode::SUCCESS,
    }
}
