//! Runtime configuration, built from CLI flags rather than a
//! config file.

/// Toggles that shape how the interpreter runs, independent of program content.
#[derive(Debug, Clone, Copy, Default)]
pub struct VmConfig {
    /// Log every opcode dispatch at `debug` level (`--trace`).
    pub trace_dispatch: bool,
    /// Log a disassembly of a function's code object the moment `MAKE_FUNCTION`
    /// builds it.
    pub show_disassembly_on_build: bool,
    /// Whether the CLI should run under the [`crate::debugger::Debugger`]
    /// rather than driving the interpreter straight through.
    pub debugger_enabled: bool,
}

impl VmConfig {
    /// A config with every toggle off and the debugger disabled, running straight through.
    #[must_use]
    pub fn bare() -> Self {
        Self::default()
    }
}
