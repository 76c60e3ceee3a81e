#![warn(
    clippy::pedantic,
    future_incompatible,
    missing_debug_implementations,
    rust_2018_idioms,
    rust_2021_compatibility
)]
#![allow(clippy::module_name_repetitions)]
#![cfg_attr(docsrs, feature(doc_auto_cfg, doc_cfg))]
#![doc = document_features::document_features!()]

//! `pyvym` — a stack-based bytecode interpreter paired with an interactive
//! source-level debugger.
//!
//! The interpreter ([`interpreter::Vm`]) decodes and dispatches a compact
//! one-byte opcode stream, executing against a stack of execution
//! [`frame::Frame`]s. A [`debugger::Debugger`] sits above it, suspending
//! execution between opcode decodes to let an operator inspect locals,
//! globals, and the call stack, and to set breakpoints by source line.
//!
//! Because the front-end compiler that would normally produce a
//! [`code::CodeObject`] is outside this crate's scope, the
//! [`assembler`] module builds one from a small textual mnemonic listing
//! instead, and [`disassembler`] renders one back out for diagnostics.

pub mod assembler;
pub mod builtins;
pub mod class;
pub mod class_builder;
pub mod code;
pub mod config;
#[cfg(feature = "debugger")]
pub mod debugger;
pub mod disassembler;
pub mod error;
pub mod frame;
pub mod interpreter;
pub mod module;
pub mod value;

pub use code::CodeObject;
pub use config::VmConfig;
#[cfg(feature = "debugger")]
pub use debugger::Debugger;
pub use error::VmError;
pub use interpreter::Vm;
