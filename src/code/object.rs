//! The compiled unit the interpreter executes: bytecode plus its constant and name pools.

use std::rc::Rc;

use super::LineMap;

/// A literal the constant pool can hold.
///
/// Narrower than [`Value`](crate::value::Value): a constant is either a
/// primitive literal or a nested code object (a function or class body
/// compiled alongside its enclosing scope). Instances, live functions,
/// classes, and modules only come into being at runtime and can never be
/// literal constants.
#[derive(Debug, Clone)]
pub enum ConstantValue {
    /// A signed integer literal.
    Int(i64),
    /// A floating-point literal.
    Float(f64),
    /// A boolean literal.
    Bool(bool),
    /// A string literal.
    Str(String),
    /// The `None` literal.
    None,
    /// A nested code object, for a function or class body defined in this scope.
    Code(Rc<CodeObject>),
}

/// A compiled function, class, or module body.
///
/// Carries everything the interpreter needs to run it standalone: its raw
/// bytecode, constant pool, the name tables `LOAD_NAME`/`STORE_NAME`/
/// `LOAD_GLOBAL` and `LOAD_FAST`/`STORE_FAST` index into, its parameter
/// count, and the [`LineMap`] used for line-number resolution and debugger
/// source display.
#[derive(Debug, Clone)]
pub struct CodeObject {
    /// The raw instruction stream: opcode bytes interleaved with optional
    /// two-byte little-endian operands.
    pub bytecode: Vec<u8>,
    /// The constant pool, indexed by `LOAD_CONST`'s operand.
    pub constants: Vec<ConstantValue>,
    /// Global/attribute names, indexed by `LOAD_NAME`/`STORE_NAME`/`LOAD_GLOBAL`/`LOAD_ATTR`/`STORE_ATTR`.
    pub names: Vec<String>,
    /// Local variable names, indexed by `LOAD_FAST`/`STORE_FAST`.
    pub local_names: Vec<String>,
    /// Number of positional parameters bound from the front of `local_names`.
    pub argcount: usize,
    /// The source line this code object's first instruction maps to.
    pub first_lineno: u32,
    /// Instruction-offset-to-source-line translation.
    pub lines: LineMap,
    /// The function or class name this code object was compiled for, if any.
    ///
    /// `None` for the top-level module code object. Used in backtraces,
    /// disassembly headers, and trace logging — a bare code object is handed
    /// around on its own often enough (class bodies, the assembler, the
    /// disassembler) that it earns a field here rather than being re-derived
    /// from an enclosing function/class value each time.
    pub name: Option<String>,
}

impl CodeObject {
    /// Builds a code object from its component tables.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        bytecode: Vec<u8>,
        constants: Vec<ConstantValue>,
        names: Vec<String>,
        local_names: Vec<String>,
        argcount: usize,
        first_lineno: u32,
        lines: LineMap,
        name: Option<String>,
    ) -> Self {
        Self {
            bytecode,
            constants,
            names,
            local_names,
            argcount,
            first_lineno,
            lines,
            name,
        }
    }

    /// The display name used in backtraces and trace logs: the compiled
    /// name, or `"<module>"` for the top-level code object.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<module>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::line_map::LineTableEntry;

    fn empty_code() -> CodeObject {
        CodeObject::new(
            vec![],
            vec![],
            vec![],
            vec![],
            0,
            1,
            LineMap::new(1, vec![LineTableEntry { byte_delta: 0, line_delta: 0 }], vec!["pass".into()]),
            None,
        )
    }

    #[test]
    fn display_name_falls_back_to_module() {
        assert_eq!(empty_code().display_name(), "<module>");
    }

    #[test]
    fn display_name_uses_compiled_name() {
        let mut code = empty_code();
        code.name = Some("f".into());
        assert_eq!(code.display_name(), "f");
    }
}
