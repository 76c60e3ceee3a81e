//! Interactive source-level debugger: breakpoint table, command
//! parser, and a run/step/inspect/quit loop layered over [`Vm`].

use std::collections::HashMap;
use std::io::{self, Write};

use tracing::error;

use crate::error::VmError;
use crate::interpreter::{StepOutcome, Vm};
use crate::value::Value;

/// A parsed debugger command.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Next,
    Run,
    SetBreakpoint(u32),
    DisableBreakpoint(u32),
    ClearBreakpoint(u32),
    ClearAllBreakpoints,
    InvalidBreakpoint(String),
    ViewSource(Option<u32>),
    ViewLocals(Option<String>),
    ViewGlobals(Option<String>),
    SetLocal(String, String),
    ViewBacktrace,
    ViewBreakpoints,
    Help,
    Quit,
}

/// Breakpoints, the running interpreter, and the line last reported to the
/// operator, sitting above a [`Vm`] and driving it instruction by instruction.
#[derive(Debug)]
pub struct Debugger {
    vm: Vm,
    breakpoints: HashMap<u32, bool>,
    running: bool,
    /// The line of the most recently decoded instruction, across `run`/`next`
    /// calls. Lets `run` tell "just arrived at this line" apart from
    /// "still on the line we already stopped at", so resuming past a hit
    /// breakpoint doesn't immediately re-trigger it.
    last_line: Option<u32>,
}

impl Debugger {
    /// Wraps a freshly built [`Vm`] in a debugger session with no breakpoints set.
    #[must_use]
    pub fn new(vm: Vm) -> Self {
        Self {
            vm,
            breakpoints: HashMap::new(),
            running: false,
            last_line: None,
        }
    }

    /// Reads commands from `stdin` until `quit`, printing results to `stdout`.
    pub fn repl(&mut self) {
        let stdin = io::stdin();
        loop {
            print!(">>> ");
            let _ = io::stdout().flush();
            let mut line = String::new();
            if stdin.read_line(&mut line).unwrap_or(0) == 0 {
                return;
            }
            let Some(command) = parse_command(line.trim()) else {
                continue;
            };
            if matches!(command, Command::Quit) {
                return;
            }
            self.dispatch(command);
        }
    }

    fn dispatch(&mut self, command: Command) {
        match command {
            Command::Next => self.next(),
            Command::Run => self.run(),
            Command::SetBreakpoint(line) => {
                self.breakpoints.insert(line, true);
            }
            Command::DisableBreakpoint(line) => {
                if let Some(enabled) = self.breakpoints.get_mut(&line) {
                    *enabled = false;
                }
            }
            Command::ClearBreakpoint(line) => {
                self.breakpoints.remove(&line);
            }
            Command::ClearAllBreakpoints => self.breakpoints.clear(),
            Command::InvalidBreakpoint(text) => println!("invalid breakpoint line: {text}"),
            Command::ViewSource(line) => self.view_source(line),
            Command::ViewLocals(name) => self.view_locals(name.as_deref()),
            Command::ViewGlobals(name) => self.view_globals(name.as_deref()),
            Command::SetLocal(name, text) => self.set_local(&name, &text),
            Command::ViewBacktrace => self.view_backtrace(),
            Command::ViewBreakpoints => self.view_breakpoints(),
            Command::Help => display_help(),
            Command::Quit => {}
        }
    }

    /// Drives the interpreter opcode-by-opcode, checking the breakpoint
    /// table before every decoded instruction; returns to the prompt the
    /// moment an enabled breakpoint's line is hit, without executing that
    /// instruction. On termination, resets the VM and prints an exit banner.
    ///
    /// A breakpoint only fires on arrival at a new line, tracked via `last_line` —
    /// otherwise a method whose whole body maps to one source line (or
    /// resuming `run` right after a hit) would re-trigger on every
    /// contiguous same-line instruction instead of ever making progress.
    pub fn run(&mut self) {
        self.running = true;
        loop {
            let inst = match self.vm.decode_next() {
                Ok(inst) => inst,
                Err(err) => return self.abort(err.into()),
            };
            let arrived_at_new_line = self.last_line != Some(inst.line);
            self.last_line = Some(inst.line);
            if arrived_at_new_line && self.breakpoints.get(&inst.line).copied().unwrap_or(false) {
                self.report_breakpoint(inst.line);
                return;
            }
            match self.vm.dispatch(inst) {
                Ok(StepOutcome::Continue) => {}
                Ok(StepOutcome::Terminated(value)) => return self.finish(value),
                Err(err) => return self.abort(err),
            }
        }
    }

    /// Executes until the source line changes, then prints the surrounding
    /// snippet; reports program exit instead if it terminates mid-step.
    pub fn next(&mut self) {
        if !self.running {
            println!("App is not running. Run it with 'run'");
            return;
        }
        let Ok(starting) = self.vm.current_line() else {
            return;
        };
        loop {
            let inst = match self.vm.decode_next() {
                Ok(inst) => inst,
                Err(err) => return self.abort(err.into()),
            };
            let line = inst.line;
            match self.vm.dispatch(inst) {
                Ok(StepOutcome::Continue) => {}
                Ok(StepOutcome::Terminated(value)) => return self.finish(value),
                Err(err) => return self.abort(err),
            }
            if line != starting {
                self.last_line = Some(line);
                self.print_snippet(line);
                return;
            }
        }
    }

    fn report_breakpoint(&self, line: u32) {
        let frame = self.vm.current_frame().borrow();
        let header = frame.code.lines.source_line(line).unwrap_or("").trim().to_string();
        println!("--- Breakpoint Hit: {header} ---");
        if let Ok(snippet) = frame.code.lines.surrounding_snippet(line) {
            print!("{snippet}");
        }
    }

    fn print_snippet(&self, line: u32) {
        let frame = self.vm.current_frame().borrow();
        if let Ok(snippet) = frame.code.lines.surrounding_snippet(line) {
            print!("{snippet}");
        }
    }

    fn finish(&mut self, value: Value) {
        println!("Program Return Value: {value}");
        self.vm.reset();
        self.last_line = None;
        println!("App exited...");
        self.running = false;
    }

    fn abort(&mut self, err: VmError) {
        error!(%err, "vm error");
        println!("error: {err}");
        self.vm.reset();
        self.last_line = None;
        self.running = false;
    }

    fn view_source(&self, line: Option<u32>) {
        let frame = self.vm.current_frame().borrow();
        match line {
            Some(n) if n > 0 => match frame.code.lines.surrounding_snippet(n) {
                Ok(snippet) => print!("{snippet}"),
                Err(err) => println!("error: {err}"),
            },
            _ => println!("{}", frame.code.lines.all_source_lines()),
        }
    }

    /// Walks the full frame chain (current frame to module), printing every
    /// frame's matching bindings, so a name bound at multiple levels prints
    /// more than once. Instance-valued locals additionally print their
    /// binding frame's own locals (its attribute mapping, see
    /// [`crate::class::Instance`]) as `name.attr: value`, skipping `self`.
    fn view_locals(&self, filter: Option<&str>) {
        println!("--- Locals ---");
        let mut frame = Some(self.vm.current_frame().clone());
        while let Some(current) = frame {
            let current = current.borrow();
            for (name, value) in current.own_locals() {
                if filter.is_none_or(|f| f == name) {
                    println!("{name}: {value}");
                    if let Value::Instance(inst) = value {
                        for (attr, attr_value) in inst.binding_frame.borrow().own_locals() {
                            if attr != "self" {
                                println!("{name}.{attr}: {attr_value}");
                            }
                        }
                    }
                }
            }
            frame = current.parent().cloned();
        }
    }

    fn view_globals(&self, filter: Option<&str>) {
        println!("--- Globals ---");
        let globals = self.vm.current_frame().borrow().globals();
        for (name, value) in globals.borrow().iter() {
            if filter.is_none_or(|f| f == name) {
                println!("{name}: {value}");
            }
        }
    }

    /// Coerces `text` to the current dynamic type of local `name`, falling
    /// back to storing it as a raw string when coercion fails, scoped to the
    /// current frame only.
    fn set_local(&mut self, name: &str, text: &str) {
        println!("--- Locals Changed ---");
        let current = self.vm.current_frame().clone();
        let Some(existing) = current.borrow().own_locals().get(name).cloned() else {
            return;
        };
        let coerced = coerce_like(&existing, text);
        current.borrow_mut().set_local(name, coerced.clone());
        println!("{name}: {coerced}");
    }

    /// Root-first (module frame first, innermost last).
    fn view_backtrace(&self) {
        println!("--- Stacktrace ---");
        let mut trace: Vec<String> = self
            .vm
            .frames()
            .frames()
            .iter()
            .map(|f| f.borrow().callable_name().to_string())
            .collect();
        trace.push(self.vm.current_frame().borrow().callable_name().to_string());
        for (i, name) in trace.iter().enumerate() {
            println!("\t<Frame {i} - {name}>");
        }
    }

    fn view_breakpoints(&self) {
        println!("--- Breakpoints Set ---");
        let frame = self.vm.current_frame().borrow();
        for (&line, &enabled) in &self.breakpoints {
            let text = frame.code.lines.source_line(line).unwrap_or("").trim().to_string();
            let status = if enabled { "Enabled" } else { "Disabled" };
            println!("Breakpoint Line {line}: {status} ---> {text}");
        }
    }
}

fn coerce_like(existing: &Value, text: &str) -> Value {
    match existing {
        Value::Int(_) => text.parse().map(Value::Int).unwrap_or_else(|_| Value::Str(text.into())),
        Value::Float(_) => text.parse().map(Value::Float).unwrap_or_else(|_| Value::Str(text.into())),
        Value::Bool(_) => text.parse().map(Value::Bool).unwrap_or_else(|_| Value::Str(text.into())),
        _ => Value::Str(text.into()),
    }
}

fn display_help() {
    println!("\tnext - Execute Next Instruction");
    println!("\trun - Run VM");
    println!("\tset bp <loc> - Set Breakpoint at loc");
    println!("\tdisable bp <loc> - Disable Breakpoint at loc");
    println!("\tclear bp <loc> - Disable Breakpoint at loc");
    println!("\tclear all bps - Clear all Breakpoints");
    println!("\tview source <loc> - View Source. If no loc is specified entire source is shown");
    println!("\tview locals - View the Local variables");
    println!("\tview globals - View the Global variables");
    println!("\tview local <var> - View local var");
    println!("\tview global <var> - View global var");
    println!("\tview backtrace - View the BackTrace");
    println!("\tview bp - View Breakpoints");
    println!("\thelp - Display this help");
    println!("\tquit - Quit");
}

/// Parses a single command line. Unmatched input is silently ignored.
fn parse_command(cmd: &str) -> Option<Command> {
    let parts: Vec<&str> = cmd.split_whitespace().collect();
    match parts.as_slice() {
        ["next"] => Some(Command::Next),
        ["run"] => Some(Command::Run),
        ["set", "bp", loc] => Some(
            loc.parse()
                .map_or_else(|_| Command::InvalidBreakpoint((*loc).to_string()), Command::SetBreakpoint),
        ),
        ["disable", "bp", loc] => Some(
            loc.parse()
                .map_or_else(|_| Command::InvalidBreakpoint((*loc).to_string()), Command::DisableBreakpoint),
        ),
        ["clear", "bp", loc] => Some(
            loc.parse()
                .map_or_else(|_| Command::InvalidBreakpoint((*loc).to_string()), Command::ClearBreakpoint),
        ),
        ["clear", "all", "bps"] => Some(Command::ClearAllBreakpoints),
        ["view", "source"] => Some(Command::ViewSource(None)),
        ["view", "source", loc] => loc.parse().ok().map(|n| Command::ViewSource(Some(n))),
        ["view", "locals"] => Some(Command::ViewLocals(None)),
        ["view", "globals"] => Some(Command::ViewGlobals(None)),
        ["view", "local", name] => Some(Command::ViewLocals(Some((*name).to_string()))),
        ["view", "global", name] => Some(Command::ViewGlobals(Some((*name).to_string()))),
        ["set", "local", name, value] => Some(Command::SetLocal((*name).to_string(), (*value).to_string())),
        ["view", "backtrace"] => Some(Command::ViewBacktrace),
        ["view", "bp"] => Some(Command::ViewBreakpoints),
        ["help"] => Some(Command::Help),
        ["quit"] => Some(Command::Quit),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_breakpoint_commands() {
        assert_eq!(parse_command("set bp 12"), Some(Command::SetBreakpoint(12)));
        assert_eq!(parse_command("disable bp 12"), Some(Command::DisableBreakpoint(12)));
        assert_eq!(parse_command("clear all bps"), Some(Command::ClearAllBreakpoints));
    }

    #[test]
    fn parses_view_and_set_local() {
        assert_eq!(parse_command("view locals"), Some(Command::ViewLocals(None)));
        assert_eq!(parse_command("view local a"), Some(Command::ViewLocals(Some("a".into()))));
        assert_eq!(
            parse_command("set local a 99"),
            Some(Command::SetLocal("a".into(), "99".into()))
        );
    }

    #[test]
    fn unmatched_input_is_ignored() {
        assert_eq!(parse_command("gibberish"), None);
        assert_eq!(parse_command(""), None);
    }

    #[test]
    fn coerces_to_existing_int_type() {
        let coerced = coerce_like(&Value::Int(3), "99");
        assert!(matches!(coerced, Value::Int(99)));
    }

    #[test]
    fn falls_back_to_string_on_bad_coercion() {
        let coerced = coerce_like(&Value::Int(3), "not-a-number");
        assert!(matches!(coerced, Value::Str(_)));
    }
}
