//! Execution frames: the value stack, locals, and lexical-scope chain a
//! running function, module, or loop block executes against.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::code::{CodeObject, ProgramCounter};
use crate::value::Value;

/// What a frame stands for, used only to decide whether it owns its
/// instruction pointer or delegates to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// The top-level module frame.
    Module,
    /// A user function call, a bound method call, or a class's `__init__` call.
    Function,
    /// A loop body pushed by `SETUP_LOOP`.
    ///
    /// Shares its enclosing frame's locals (via the parent-link shadowing
    /// rule) *and* its instruction pointer: a loop-block frame never has an
    /// independent notion of "where execution is". Delegating `ip` reads and
    /// writes straight through to the parent avoids having to copy it in at
    /// `SETUP_LOOP` and back out at `POP_BLOCK`, which would only be safe if
    /// nothing else touched the parent's `ip` in between.
    LoopBlock,
}

/// A running activation: its value stack, its locals, and (for loop blocks)
/// a link to the frame whose locals and instruction pointer it shares.
#[derive(Debug)]
pub struct Frame {
    kind: FrameKind,
    /// The code object this frame is executing.
    pub code: Rc<CodeObject>,
    stack: Vec<Value>,
    locals: HashMap<String, Value>,
    ip: Cell<ProgramCounter>,
    parent: Option<Rc<RefCell<Frame>>>,
    globals: Rc<RefCell<HashMap<String, Value>>>,
}

impl Frame {
    /// Builds the single module-level frame a program starts in.
    #[must_use]
    pub fn new_module(code: Rc<CodeObject>, globals: Rc<RefCell<HashMap<String, Value>>>) -> Self {
        Self {
            kind: FrameKind::Module,
            code,
            stack: Vec::new(),
            locals: HashMap::new(),
            ip: Cell::new(ProgramCounter::ZERO),
            parent: None,
            globals,
        }
    }

    /// Builds a fresh call frame for a user function, binding defaults,
    /// then positional arguments, then keyword arguments into `local_names`
    /// slots in that order (later bindings win).
    #[must_use]
    pub fn new_call(
        code: Rc<CodeObject>,
        defaults: &[Value],
        args: &[Value],
        kwargs: &[(String, Value)],
        globals: Rc<RefCell<HashMap<String, Value>>>,
    ) -> Self {
        let mut frame = Self {
            kind: FrameKind::Function,
            code,
            stack: Vec::new(),
            locals: HashMap::new(),
            ip: Cell::new(ProgramCounter::ZERO),
            parent: None,
            globals,
        };
        frame.bind_call(defaults, args, kwargs);
        frame
    }

    /// Pushes a loop-block frame sharing `parent`'s locals chain and `ip`.
    #[must_use]
    pub fn new_loop_block(code: Rc<CodeObject>, parent: Rc<RefCell<Frame>>) -> Self {
        let globals = Rc::clone(&parent.borrow().globals);
        Self {
            kind: FrameKind::LoopBlock,
            code,
            stack: Vec::new(),
            locals: HashMap::new(),
            ip: Cell::new(ProgramCounter::ZERO),
            parent: Some(parent),
            globals,
        }
    }

    fn bind_call(&mut self, defaults: &[Value], args: &[Value], kwargs: &[(String, Value)]) {
        let non_default_count = self.code.argcount.saturating_sub(defaults.len());
        for (i, default) in defaults.iter().enumerate() {
            if let Some(name) = self.code.local_names.get(non_default_count + i) {
                self.locals.insert(name.clone(), default.clone());
            }
        }
        for (i, arg) in args.iter().enumerate() {
            if let Some(name) = self.code.local_names.get(i) {
                self.locals.insert(name.clone(), arg.clone());
            }
        }
        for (name, value) in kwargs {
            self.locals.insert(name.clone(), value.clone());
        }
    }

    /// Re-targets this frame at a different callable's code, resetting `ip`
    /// to zero and rebinding arguments, without clearing existing locals.
    ///
    /// Used for the persistent per-instance binding frame: calling a second
    /// method on the same instance reuses this frame rather than allocating
    /// a new one, so locals set by an earlier call remain visible.
    pub fn rebind(&mut self, code: Rc<CodeObject>, args: &[Value], kwargs: &[(String, Value)]) {
        self.code = code;
        self.ip.set(ProgramCounter::ZERO);
        self.bind_call(&[], args, kwargs);
    }

    /// The display name used in backtraces and trace logging.
    #[must_use]
    pub fn callable_name(&self) -> &str {
        match self.kind {
            FrameKind::LoopBlock => "<block>",
            FrameKind::Module | FrameKind::Function => self.code.display_name(),
        }
    }

    /// This frame's kind.
    #[must_use]
    pub fn kind(&self) -> FrameKind {
        self.kind
    }

    /// The lexical parent, for loop-block frames.
    #[must_use]
    pub fn parent(&self) -> Option<&Rc<RefCell<Frame>>> {
        self.parent.as_ref()
    }

    /// The instruction pointer: this frame's own, unless it's a loop block,
    /// in which case it delegates to the parent (recursively).
    #[must_use]
    pub fn ip(&self) -> ProgramCounter {
        match (&self.kind, &self.parent) {
            (FrameKind::LoopBlock, Some(parent)) => parent.borrow().ip(),
            _ => self.ip.get(),
        }
    }

    /// Sets the instruction pointer, delegating the same way [`Frame::ip`] does.
    pub fn set_ip(&self, pc: ProgramCounter) {
        match (&self.kind, &self.parent) {
            (FrameKind::LoopBlock, Some(parent)) => parent.borrow().set_ip(pc),
            _ => self.ip.set(pc),
        }
    }

    /// Advances the instruction pointer by `delta` bytes.
    /// # Errors
    /// Propagates [`crate::code::InvalidOffset`] if the result underflows or overflows.
    pub fn advance_ip(&self, delta: i32) -> Result<(), crate::code::InvalidOffset> {
        self.set_ip(self.ip().offset(delta)?);
        Ok(())
    }

    /// Pushes a value onto this frame's value stack.
    pub fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    /// Pops the top value off the stack.
    /// # Errors
    /// [`FrameError::StackUnderflow`] if the stack is empty.
    pub fn pop(&mut self) -> Result<Value, FrameError> {
        self.stack.pop().ok_or(FrameError::StackUnderflow)
    }

    /// Pops the top `n` values, oldest first (stack order preserved).
    /// # Errors
    /// [`FrameError::StackUnderflow`] if fewer than `n` values are present.
    pub fn popn(&mut self, n: usize) -> Result<Vec<Value>, FrameError> {
        if self.stack.len() < n {
            return Err(FrameError::StackUnderflow);
        }
        Ok(self.stack.split_off(self.stack.len() - n))
    }

    /// Reads the top of the stack without removing it.
    /// # Errors
    /// [`FrameError::StackUnderflow`] if the stack is empty.
    pub fn top(&self) -> Result<&Value, FrameError> {
        self.stack.last().ok_or(FrameError::StackUnderflow)
    }

    /// Number of values currently on the stack.
    #[must_use]
    pub fn stack_len(&self) -> usize {
        self.stack.len()
    }

    /// All local bindings in this frame only (not the parent chain), for `view locals`.
    #[must_use]
    pub fn own_locals(&self) -> &HashMap<String, Value> {
        &self.locals
    }

    /// Looks up a local by walking this frame, then its parent chain.
    ///
    /// Returns the first match found nearest the current frame (innermost
    /// binding wins).
    #[must_use]
    pub fn get_local(&self, name: &str) -> Option<Value> {
        if let Some(v) = self.locals.get(name) {
            return Some(v.clone());
        }
        self.parent.as_ref().and_then(|p| p.borrow().get_local(name))
    }

    /// Sets a local, walking the parent chain to find the frame that
    /// already binds `name`; if none does, creates it in this frame.
    pub fn set_local(&mut self, name: &str, value: Value) {
        if self.locals.contains_key(name) {
            self.locals.insert(name.to_string(), value);
            return;
        }
        if let Some(parent) = &self.parent {
            if parent.borrow().get_local(name).is_some() {
                parent.borrow_mut().set_local(name, value);
                return;
            }
        }
        self.locals.insert(name.to_string(), value);
    }

    /// Reads a global binding.
    #[must_use]
    pub fn get_global(&self, name: &str) -> Option<Value> {
        self.globals.borrow().get(name).cloned()
    }

    /// Installs or overwrites a global binding.
    pub fn add_global(&self, name: String, value: Value) {
        self.globals.borrow_mut().insert(name, value);
    }

    /// The shared globals table, for passing down to a new call frame.
    #[must_use]
    pub fn globals(&self) -> Rc<RefCell<HashMap<String, Value>>> {
        Rc::clone(&self.globals)
    }
}

/// Failures from frame-local stack operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FrameError {
    /// A `pop`/`popn`/`top` was attempted on a frame with too few values.
    #[error("stack underflow")]
    StackUnderflow,
}

/// The interpreter's call stack: suspended caller frames, most recent last.
#[derive(Debug, Default)]
pub struct FrameStack(Vec<Rc<RefCell<Frame>>>);

impl FrameStack {
    /// Creates an empty call stack.
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Suspends `frame` onto the call stack.
    pub fn push(&mut self, frame: Rc<RefCell<Frame>>) {
        self.0.push(frame);
    }

    /// Resumes (and removes) the most recently suspended frame.
    pub fn pop(&mut self) -> Option<Rc<RefCell<Frame>>> {
        self.0.pop()
    }

    /// Whether any caller frame is suspended (empty means the module frame is current).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The suspended frames, root-first, for `view backtrace`.
    #[must_use]
    pub fn frames(&self) -> &[Rc<RefCell<Frame>>] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::{LineMap, LineTableEntry};

    fn code_with_locals(names: &[&str], argcount: usize) -> Rc<CodeObject> {
        Rc::new(CodeObject::new(
            vec![],
            vec![],
            vec![],
            names.iter().map(|s| s.to_string()).collect(),
            argcount,
            1,
            LineMap::new(1, vec![LineTableEntry { byte_delta: 0, line_delta: 0 }], vec!["pass".into()]),
            Some("f".into()),
        ))
    }

    fn globals() -> Rc<RefCell<HashMap<String, Value>>> {
        Rc::new(RefCell::new(HashMap::new()))
    }

    #[test]
    fn positional_args_override_defaults() {
        let code = code_with_locals(&["a", "b"], 2);
        let frame = Frame::new_call(code, &[Value::Int(9)], &[Value::Int(1), Value::Int(2)], &[], globals());
        assert!(matches!(frame.get_local("a"), Some(Value::Int(1))));
        assert!(matches!(frame.get_local("b"), Some(Value::Int(2))));
    }

    #[test]
    fn defaults_fill_trailing_omitted_params() {
        let code = code_with_locals(&["a", "b"], 2);
        let frame = Frame::new_call(code, &[Value::Int(9)], &[Value::Int(1)], &[], globals());
        assert!(matches!(frame.get_local("a"), Some(Value::Int(1))));
        assert!(matches!(frame.get_local("b"), Some(Value::Int(9))));
    }

    #[test]
    fn loop_block_shares_parent_locals_and_ip() {
        let code = code_with_locals(&["x"], 0);
        let parent = Rc::new(RefCell::new(Frame::new_call(Rc::clone(&code), &[], &[], &[], globals())));
        parent.borrow_mut().set_local("x", Value::Int(1));
        parent.borrow().set_ip(ProgramCounter::from(4));

        let block = Frame::new_loop_block(Rc::clone(&code), Rc::clone(&parent));
        assert!(matches!(block.get_local("x"), Some(Value::Int(1))));
        assert_eq!(block.ip(), ProgramCounter::from(4));

        block.set_ip(ProgramCounter::from(8));
        assert_eq!(parent.borrow().ip(), ProgramCounter::from(8));

        block.set_local("x", Value::Int(2));
        assert!(matches!(parent.borrow().get_local("x"), Some(Value::Int(2))));
    }

    #[test]
    fn rebind_keeps_unrelated_locals() {
        let code = code_with_locals(&["self", "other"], 1);
        let mut frame = Frame::new_call(Rc::clone(&code), &[], &[Value::Int(1)], &[], globals());
        frame.set_local("leftover", Value::Int(42));
        frame.rebind(code, &[Value::Int(1)], &[]);
        assert!(matches!(frame.get_local("leftover"), Some(Value::Int(42))));
    }

    #[test]
    fn stack_push_pop_popn() {
        let code = code_with_locals(&[], 0);
        let mut frame = Frame::new_call(code, &[], &[], &[], globals());
        frame.push(Value::Int(1));
        frame.push(Value::Int(2));
        frame.push(Value::Int(3));
        let top2 = frame.popn(2).unwrap();
        assert!(matches!(top2[0], Value::Int(2)));
        assert!(matches!(top2[1], Value::Int(3)));
        assert_eq!(frame.stack_len(), 1);
    }
}
