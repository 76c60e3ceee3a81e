//! Opcode decode and dispatch: the main interpreter loop.

pub mod decode;
pub mod opcode;

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::builtins;
use crate::class::{self, Instance};
use crate::code::{CodeObject, ConstantValue, ProgramCounter};
use crate::config::VmConfig;
use crate::error::{NameError, VmError};
use crate::frame::{Frame, FrameKind, FrameStack};
use crate::module::VmModule;
use crate::value::{
    binary_op, compare_op, unary_op, BinaryOp, CompareOp, Function, Mapping, NativeFunction,
    UnaryOp, UserFunction, Value, ValueError,
};

pub use decode::{decode, DecodeError, Instruction};
pub use opcode::Opcode;

/// What happened when the interpreter executed one instruction.
#[derive(Debug)]
pub enum StepOutcome {
    /// Execution continues; the current frame may have changed (call/return/loop setup).
    Continue,
    /// The module frame returned: the program is finished with this value.
    Terminated(Value),
}

/// Bookkeeping paired with each pushed frame, so `RETURN_VALUE` knows whether
/// to substitute the instance for an `__init__` call's return value.
#[derive(Debug, Clone)]
enum CallMarker {
    Plain,
    InitCall(Rc<Instance>),
}

/// The running interpreter: a module, its frame stack, and the currently
/// executing frame.
#[derive(Debug)]
pub struct Vm {
    module: Rc<VmModule>,
    top_code: Rc<CodeObject>,
    frames: FrameStack,
    current: Rc<RefCell<Frame>>,
    call_markers: Vec<CallMarker>,
    pending_build_class: bool,
    config: VmConfig,
}

impl Vm {
    /// Builds a fresh interpreter over a top-level code object, with empty
    /// globals and an empty class table.
    #[must_use]
    pub fn new(top_code: Rc<CodeObject>, config: VmConfig) -> Self {
        let module = Rc::new(VmModule::new(
            top_code.display_name().to_string(),
            Rc::clone(&top_code),
        ));
        let current = Rc::new(RefCell::new(Frame::new_module(Rc::clone(&top_code), module.globals())));
        Self {
            module,
            top_code,
            frames: FrameStack::new(),
            current,
            call_markers: Vec::new(),
            pending_build_class: false,
            config,
        }
    }

    /// Reinitializes the VM over its original code object, discarding all
    /// program state (globals, classes, frames) — used by the debugger after
    /// a natural termination.
    pub fn reset(&mut self) {
        *self = Self::new(Rc::clone(&self.top_code), self.config);
    }

    /// The frame currently executing.
    #[must_use]
    pub fn current_frame(&self) -> &Rc<RefCell<Frame>> {
        &self.current
    }

    /// The suspended caller/block frames, root-first.
    #[must_use]
    pub fn frames(&self) -> &FrameStack {
        &self.frames
    }

    /// The source line the next instruction maps to, without executing it.
    /// # Errors
    /// [`DecodeError`] if the current `ip` does not decode.
    pub fn current_line(&self) -> Result<u32, DecodeError> {
        Ok(self.decode_next()?.line)
    }

    /// Decodes (without mutating) the instruction the current frame is about
    /// to execute.
    /// # Errors
    /// [`DecodeError`] on a malformed instruction stream.
    pub fn decode_next(&self) -> Result<Instruction, DecodeError> {
        let current = self.current.borrow();
        decode(&current.code, current.ip())
    }

    fn push_frame(&mut self, frame: Rc<RefCell<Frame>>, marker: CallMarker) {
        let previous = Rc::clone(&self.current);
        self.frames.push(previous);
        self.call_markers.push(marker);
        self.current = frame;
    }

    fn pop_frame(&mut self) -> Result<(Rc<RefCell<Frame>>, CallMarker), VmError> {
        let prev = self.frames.pop().ok_or(crate::frame::FrameError::StackUnderflow)?;
        let marker = self.call_markers.pop().unwrap_or(CallMarker::Plain);
        Ok((prev, marker))
    }

    /// Decodes and dispatches one instruction.
    /// # Errors
    /// [`VmError`] on any decode or dispatch failure.
    pub fn step(&mut self) -> Result<StepOutcome, VmError> {
        let inst = self.decode_next()?;
        self.dispatch(inst)
    }

    /// Runs until the program terminates.
    /// # Errors
    /// [`VmError`] on any decode or dispatch failure.
    pub fn run_to_completion(&mut self) -> Result<Value, VmError> {
        loop {
            match self.step()? {
                StepOutcome::Continue => {}
                StepOutcome::Terminated(value) => return Ok(value),
            }
        }
    }

    /// Commits `inst`'s `next_ip` and executes its handler.
    /// # Errors
    /// [`VmError`] if the opcode has no working handler, or its operands are
    /// type-mismatched, or the stack/name resolution fails.
    pub fn dispatch(&mut self, inst: Instruction) -> Result<StepOutcome, VmError> {
        if !inst.opcode.is_implemented() {
            return Err(DecodeError::NotImplemented(inst.opcode.mnemonic()).into());
        }
        self.current.borrow().set_ip(inst.next_ip);
        if self.config.trace_dispatch {
            trace!(opcode = inst.opcode.mnemonic(), arg = ?inst.arg, line = inst.line, "dispatch");
        }

        use Opcode::{
            BinaryAdd, BinaryAnd, BinaryFloorDivide, BinaryLshift, BinaryModulo, BinaryMultiply,
            BinaryOr, BinaryPower, BinaryRshift, BinarySubscr, BinarySubtract, BinaryTrueDivide,
            BinaryXor, BuildList, BuildMap, CallFunction, CompareOp as CompareOpcode, DupTop,
            DupTopTwo, ForIter, GetIter, InplaceAdd, InplaceAnd, InplaceFloorDivide,
            InplaceLshift, InplaceModulo, InplaceMultiply, InplaceOr, InplacePower, InplaceRshift,
            InplaceSubtract, InplaceTrueDivide, InplaceXor, JumpAbsolute, JumpForward,
            JumpIfFalseOrPop, JumpIfTrueOrPop, LoadAttr, LoadBuildClass, LoadConst, LoadFast,
            LoadGlobal, LoadName, MakeFunction, Nop, PopBlock, PopJumpIfFalse, PopJumpIfTrue,
            PopTop, ReturnValue, RotThree, RotTwo, SetupLoop, StoreAttr, StoreFast, StoreName,
            StoreSubscr, UnaryInvert, UnaryNegative, UnaryNot, UnaryPositive,
        };

        match inst.opcode {
            Nop => {}
            PopTop => {
                self.current.borrow_mut().pop()?;
            }
            RotTwo => {
                let a = self.current.borrow_mut().pop()?;
                let b = self.current.borrow_mut().pop()?;
                let mut cur = self.current.borrow_mut();
                cur.push(a);
                cur.push(b);
            }
            RotThree => {
                let a = self.current.borrow_mut().pop()?;
                let b = self.current.borrow_mut().pop()?;
                let c = self.current.borrow_mut().pop()?;
                let mut cur = self.current.borrow_mut();
                cur.push(a);
                cur.push(c);
                cur.push(b);
            }
            DupTop => {
                let v = self.current.borrow().top()?.clone();
                self.current.borrow_mut().push(v);
            }
            DupTopTwo => {
                let a = self.current.borrow_mut().pop()?;
                let b = self.current.borrow_mut().pop()?;
                let mut cur = self.current.borrow_mut();
                cur.push(b.clone());
                cur.push(a.clone());
                cur.push(b);
                cur.push(a);
            }
            UnaryPositive => self.unary(UnaryOp::Positive)?,
            UnaryNegative => self.unary(UnaryOp::Negative)?,
            UnaryNot => self.unary(UnaryOp::Not)?,
            UnaryInvert => self.unary(UnaryOp::Invert)?,
            BinaryAdd | InplaceAdd => self.binary(BinaryOp::Add)?,
            BinarySubtract | InplaceSubtract => self.binary(BinaryOp::Sub)?,
            BinaryMultiply | InplaceMultiply => self.binary(BinaryOp::Mul)?,
            BinaryTrueDivide | InplaceTrueDivide => self.binary(BinaryOp::Div)?,
            BinaryFloorDivide | InplaceFloorDivide => self.binary(BinaryOp::FloorDiv)?,
            BinaryModulo | InplaceModulo => self.binary(BinaryOp::Mod)?,
            BinaryPower | InplacePower => self.binary(BinaryOp::Pow)?,
            BinaryLshift | InplaceLshift => self.binary(BinaryOp::Shl)?,
            BinaryRshift | InplaceRshift => self.binary(BinaryOp::Shr)?,
            BinaryAnd | InplaceAnd => self.binary(BinaryOp::And)?,
            BinaryOr | InplaceOr => self.binary(BinaryOp::Or)?,
            BinaryXor | InplaceXor => self.binary(BinaryOp::Xor)?,
            BinarySubscr => {
                let key = self.current.borrow_mut().pop()?;
                let obj = self.current.borrow_mut().pop()?;
                let value = subscript_get(&obj, &key)?;
                self.current.borrow_mut().push(value);
            }
            StoreSubscr => {
                let key = self.current.borrow_mut().pop()?;
                let obj = self.current.borrow_mut().pop()?;
                let value = self.current.borrow_mut().pop()?;
                subscript_set(&obj, &key, value)?;
            }
            CompareOpcode => {
                let idx = inst.arg.unwrap_or_default();
                let op = CompareOp::from_index(idx).ok_or(DecodeError::TruncatedOperand(inst.next_ip))?;
                let w = self.current.borrow_mut().pop()?;
                let v = self.current.borrow_mut().pop()?;
                let result = compare_op(op, &v, &w)?;
                self.current.borrow_mut().push(result);
            }
            LoadConst => {
                let value = self.load_const(inst.arg, inst.next_ip)?;
                self.current.borrow_mut().push(value);
            }
            LoadName | LoadGlobal => {
                let name = self.name_at(inst.arg, inst.next_ip)?;
                self.load_global(&name)?;
            }
            StoreName => {
                let name = self.name_at(inst.arg, inst.next_ip)?;
                let value = self.current.borrow_mut().pop()?;
                let is_module = self.current.borrow().kind() == FrameKind::Module;
                if is_module {
                    self.current.borrow().add_global(name, value);
                } else {
                    self.current.borrow_mut().set_local(&name, value);
                }
            }
            LoadFast => {
                let name = self.local_name_at(inst.arg, inst.next_ip)?;
                let value = self
                    .current
                    .borrow()
                    .get_local(&name)
                    .ok_or_else(|| NameError::UnboundLocal(name.clone()))?;
                self.current.borrow_mut().push(value);
            }
            StoreFast => {
                let name = self.local_name_at(inst.arg, inst.next_ip)?;
                let value = self.current.borrow_mut().pop()?;
                self.current.borrow_mut().set_local(&name, value);
            }
            LoadAttr => {
                let name = self.name_at(inst.arg, inst.next_ip)?;
                let obj = self.current.borrow_mut().pop()?;
                let attr = class::get_attr(&obj, &name)?;
                let is_method = matches!(&attr, Value::Function(f) if matches!(&**f, Function::User(_)));
                let mut cur = self.current.borrow_mut();
                cur.push(attr);
                if is_method {
                    cur.push(obj);
                }
            }
            StoreAttr => {
                let name = self.name_at(inst.arg, inst.next_ip)?;
                let obj = self.current.borrow_mut().pop()?;
                let value = self.current.borrow_mut().pop()?;
                class::set_attr(&obj, &name, value)?;
            }
            BuildList => {
                self.current.borrow_mut().push(Value::List(Rc::new(RefCell::new(Vec::new()))));
            }
            BuildMap => {
                self.current.borrow_mut().push(Value::Mapping(Rc::new(RefCell::new(Mapping::new()))));
            }
            GetIter => {
                let obj = self.current.borrow_mut().pop()?;
                let iter = to_iterator(obj)?;
                self.current.borrow_mut().push(Value::Iterator(iter));
            }
            ForIter => {
                let delta = i32::from(inst.arg.unwrap_or_default());
                let top = self.current.borrow().top()?.clone();
                let Value::Iterator(iter) = top else {
                    return Err(ValueError::NotIterable(top.type_name()).into());
                };
                let next = iter.borrow_mut().pop_front();
                match next {
                    Some(value) => self.current.borrow_mut().push(value),
                    None => {
                        self.current.borrow_mut().pop()?;
                        self.current.borrow().advance_ip(delta)?;
                    }
                }
            }
            JumpForward => {
                let delta = i32::from(inst.arg.unwrap_or_default());
                self.current.borrow().advance_ip(delta)?;
            }
            JumpAbsolute => {
                let target = ProgramCounter::from(inst.arg.unwrap_or_default());
                self.current.borrow().set_ip(target);
            }
            PopJumpIfTrue => {
                let target = ProgramCounter::from(inst.arg.unwrap_or_default());
                let value = self.current.borrow_mut().pop()?;
                if value.is_truthy() {
                    self.current.borrow().set_ip(target);
                }
            }
            PopJumpIfFalse => {
                let target = ProgramCounter::from(inst.arg.unwrap_or_default());
                let value = self.current.borrow_mut().pop()?;
                if !value.is_truthy() {
                    self.current.borrow().set_ip(target);
                }
            }
            JumpIfTrueOrPop => {
                let target = ProgramCounter::from(inst.arg.unwrap_or_default());
                let value = self.current.borrow().top()?.clone();
                if value.is_truthy() {
                    self.current.borrow().set_ip(target);
                } else {
                    self.current.borrow_mut().pop()?;
                }
            }
            JumpIfFalseOrPop => {
                let target = ProgramCounter::from(inst.arg.unwrap_or_default());
                let value = self.current.borrow().top()?.clone();
                if value.is_truthy() {
                    self.current.borrow_mut().pop()?;
                } else {
                    self.current.borrow().set_ip(target);
                }
            }
            SetupLoop => {
                let code = Rc::clone(&self.current.borrow().code);
                let block = Rc::new(RefCell::new(Frame::new_loop_block(code, Rc::clone(&self.current))));
                self.push_frame(block, CallMarker::Plain);
            }
            PopBlock => {
                let (prev, _marker) = self.pop_frame()?;
                self.current = prev;
            }
            LoadBuildClass => {
                self.current.borrow_mut().push(Value::BuildClassHook);
                self.pending_build_class = true;
            }
            MakeFunction => {
                let argc = inst.arg.unwrap_or_default() as usize;
                let name_val = self.current.borrow_mut().pop()?;
                let code_val = self.current.borrow_mut().pop()?;
                let (Value::Str(name), Value::Block(fn_code)) = (name_val, code_val) else {
                    return Err(DecodeError::TruncatedOperand(inst.next_ip).into());
                };
                let defaults = self.current.borrow_mut().popn(argc)?;
                if self.pending_build_class {
                    self.pending_build_class = false;
                    let builder = crate::value::Builder { name: name.to_string(), code: fn_code };
                    self.current.borrow_mut().push(Value::Builder(Rc::new(builder)));
                } else {
                    if self.config.show_disassembly_on_build {
                        debug!(function = %name, disassembly = %crate::disassembler::disassemble(&fn_code), "built function");
                    }
                    let func = UserFunction { name: name.to_string(), defaults, code: fn_code };
                    self.current
                        .borrow()
                        .add_global(name.to_string(), Value::Function(Rc::new(Function::User(func))));
                }
            }
            CallFunction => self.call_function(inst.arg.unwrap_or_default())?,
            ReturnValue => {
                let value = self.current.borrow_mut().pop()?;
                if self.frames.is_empty() {
                    return Ok(StepOutcome::Terminated(value));
                }
                let (prev, marker) = self.pop_frame()?;
                let value = match marker {
                    CallMarker::InitCall(instance) => Value::Instance(instance),
                    CallMarker::Plain => value,
                };
                prev.borrow_mut().push(value);
                self.current = prev;
            }
            other => return Err(DecodeError::NotImplemented(other.mnemonic()).into()),
        }

        Ok(StepOutcome::Continue)
    }

    fn unary(&mut self, op: UnaryOp) -> Result<(), VmError> {
        let value = self.current.borrow_mut().pop()?;
        let result = unary_op(op, value)?;
        self.current.borrow_mut().push(result);
        Ok(())
    }

    fn binary(&mut self, op: BinaryOp) -> Result<(), VmError> {
        let rhs = self.current.borrow_mut().pop()?;
        let lhs = self.current.borrow_mut().pop()?;
        let result = binary_op(op, lhs, rhs)?;
        self.current.borrow_mut().push(result);
        Ok(())
    }

    fn load_const(&self, arg: Option<u16>, ip: ProgramCounter) -> Result<Value, VmError> {
        let idx = arg.unwrap_or_default() as usize;
        let current = self.current.borrow();
        let value = match current.code.constants.get(idx) {
            Some(ConstantValue::Int(i)) => Value::Int(*i),
            Some(ConstantValue::Float(f)) => Value::Float(*f),
            Some(ConstantValue::Bool(b)) => Value::Bool(*b),
            Some(ConstantValue::Str(s)) => Value::Str(Rc::from(s.as_str())),
            Some(ConstantValue::None) => Value::None,
            Some(ConstantValue::Code(c)) => Value::Block(Rc::clone(c)),
            None => return Err(DecodeError::TruncatedOperand(ip).into()),
        };
        Ok(value)
    }

    fn name_at(&self, arg: Option<u16>, ip: ProgramCounter) -> Result<String, VmError> {
        let idx = arg.unwrap_or_default() as usize;
        self.current
            .borrow()
            .code
            .names
            .get(idx)
            .cloned()
            .ok_or(DecodeError::TruncatedOperand(ip).into())
    }

    fn local_name_at(&self, arg: Option<u16>, ip: ProgramCounter) -> Result<String, VmError> {
        let idx = arg.unwrap_or_default() as usize;
        self.current
            .borrow()
            .code
            .local_names
            .get(idx)
            .cloned()
            .ok_or(DecodeError::TruncatedOperand(ip).into())
    }

    /// Three-tier name resolution for `LOAD_NAME`/`LOAD_GLOBAL`:
    /// globals, then built-ins, then the class table (constructing a fresh
    /// instance and pushing its `__init__` bound-method pair).
    fn load_global(&mut self, name: &str) -> Result<(), VmError> {
        if let Some(value) = self.current.borrow().get_global(name) {
            self.current.borrow_mut().push(value);
            return Ok(());
        }
        if let Some(value) = builtins::lookup(name) {
            self.current.borrow_mut().push(value);
            return Ok(());
        }
        if let Some(descriptor) = self.module.find_class(name) {
            let frame = Rc::new(RefCell::new(Frame::new_call(
                Rc::clone(&descriptor.body_code),
                &[],
                &[],
                &[],
                self.module.globals(),
            )));
            let instance = Rc::new(Instance::new(Rc::clone(&descriptor), Rc::clone(&frame)));
            // `self` is bound once `CALL_FUNCTION` rebinds this frame against
            // `__init__`'s positionals (the instance is always prepended there).
            let Some(init) = descriptor.find_method("__init__").cloned() else {
                return Err(ValueError::NoSuchAttribute {
                    receiver: "class",
                    attr: "__init__".to_string(),
                }
                .into());
            };
            self.current.borrow_mut().push(class::method_value(&init));
            self.current.borrow_mut().push(Value::Instance(instance));
            return Ok(());
        }
        Err(NameError::UnboundGlobal(name.to_string()).into())
    }

    /// `CALL_FUNCTION`'s four cases: native callable, user function,
    /// class instantiation, bound method. The latter two share one code
    /// path: both arrive with an [`Instance`] on top and a [`Function`]
    /// beneath it, differing only in whether the method is `__init__`.
    fn call_function(&mut self, argc: u16) -> Result<(), VmError> {
        let kwcount = usize::from((argc >> 8) & 0xFF);
        let poscount = usize::from(argc & 0xFF);

        let mut kwargs = Vec::with_capacity(kwcount);
        for _ in 0..kwcount {
            let value = self.current.borrow_mut().pop()?;
            let key = self.current.borrow_mut().pop()?;
            let Value::Str(name) = &key else {
                return Err(ValueError::NotSubscriptable(key.type_name()).into());
            };
            kwargs.push((name.to_string(), value));
        }
        kwargs.reverse();
        let args = self.current.borrow_mut().popn(poscount)?;
        let callee = self.current.borrow_mut().pop()?;

        match callee {
            Value::BuildClassHook => {
                let [Value::Builder(builder)] = args.as_slice() else {
                    return Err(ValueError::NotCallable("builtin_function").into());
                };
                crate::class_builder::build(builder, &self.module)?;
                self.current.borrow_mut().push(Value::None);
            }
            Value::Function(func) => match &*func {
                Function::Native(native) => {
                    let result = (native.func)(&args)?;
                    self.current.borrow_mut().push(result);
                }
                Function::User(user) => {
                    let globals = self.module.globals();
                    let frame = Rc::new(RefCell::new(Frame::new_call(
                        Rc::clone(&user.code),
                        &user.defaults,
                        &args,
                        &kwargs,
                        globals,
                    )));
                    debug!(callable = user.name, "calling user function");
                    self.push_frame(frame, CallMarker::Plain);
                }
            },
            Value::Instance(instance) => {
                let method_val = self.current.borrow_mut().pop()?;
                let Value::Function(func) = &method_val else {
                    return Err(ValueError::NotCallable(method_val.type_name()).into());
                };
                let Function::User(method) = &**func else {
                    return Err(ValueError::NotCallable("function").into());
                };
                let marker = if method.name == "__init__" {
                    CallMarker::InitCall(Rc::clone(&instance))
                } else {
                    CallMarker::Plain
                };
                // `self` is always the method's first parameter; prepend the
                // receiver to the caller's positional args rather than rely
                // on whatever `self` the binding frame happened to carry
                // from a previous call.
                let mut bound_args = Vec::with_capacity(args.len() + 1);
                bound_args.push(Value::Instance(Rc::clone(&instance)));
                bound_args.extend(args);
                instance.binding_frame.borrow_mut().rebind(Rc::clone(&method.code), &bound_args, &kwargs);
                let frame = Rc::clone(&instance.binding_frame);
                self.push_frame(frame, marker);
            }
            other => return Err(ValueError::NotCallable(other.type_name()).into()),
        }
        Ok(())
    }
}

fn subscript_get(obj: &Value, key: &Value) -> Result<Value, ValueError> {
    match obj {
        Value::List(items) => {
            let idx = index_of(key)?;
            items.borrow().get(idx).cloned().ok_or(ValueError::InvalidIndex)
        }
        Value::Mapping(map) => map.borrow().get(key).cloned().ok_or(ValueError::KeyNotFound),
        Value::Str(s) => {
            let idx = index_of(key)?;
            s.chars().nth(idx).map(|c| Value::Str(Rc::from(c.to_string().as_str()))).ok_or(ValueError::InvalidIndex)
        }
        other => Err(ValueError::NotSubscriptable(other.type_name())),
    }
}

fn subscript_set(obj: &Value, key: &Value, value: Value) -> Result<(), ValueError> {
    match obj {
        Value::List(items) => {
            let idx = index_of(key)?;
            let mut items = items.borrow_mut();
            if idx >= items.len() {
                return Err(ValueError::InvalidIndex);
            }
            items[idx] = value;
            Ok(())
        }
        Value::Mapping(map) => {
            map.borrow_mut().insert(key.clone(), value);
            Ok(())
        }
        other => Err(ValueError::NotSubscriptable(other.type_name())),
    }
}

fn index_of(key: &Value) -> Result<usize, ValueError> {
    match key {
        Value::Int(i) if *i >= 0 => Ok(*i as usize),
        _ => Err(ValueError::InvalidIndex),
    }
}

fn to_iterator(value: Value) -> Result<Rc<RefCell<VecDeque<Value>>>, ValueError> {
    match value {
        Value::List(items) => Ok(Rc::new(RefCell::new(items.borrow().iter().cloned().collect()))),
        Value::Str(s) => {
            let chars: VecDeque<Value> = s.chars().map(|c| Value::Str(Rc::from(c.to_string().as_str()))).collect();
            Ok(Rc::new(RefCell::new(chars)))
        }
        Value::Mapping(m) => Ok(Rc::new(RefCell::new(m.borrow().keys().cloned().collect()))),
        Value::Iterator(it) => Ok(it),
        other => Err(ValueError::NotIterable(other.type_name())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::{LineMap, LineTableEntry};

    fn line_map() -> LineMap {
        LineMap::new(1, vec![LineTableEntry { byte_delta: 0, line_delta: 0 }], vec!["pass".into()])
    }

    fn consts(values: Vec<ConstantValue>) -> Vec<ConstantValue> {
        values
    }

    #[test]
    fn arithmetic_expression_evaluates_to_seven() {
        // 1 + 2 * 3
        let bytecode = vec![
            Opcode::LoadConst as u8, 0, 0,
            Opcode::LoadConst as u8, 1, 0,
            Opcode::LoadConst as u8, 2, 0,
            Opcode::BinaryMultiply as u8,
            Opcode::BinaryAdd as u8,
            Opcode::ReturnValue as u8,
        ];
        let code = Rc::new(CodeObject::new(
            bytecode,
            consts(vec![ConstantValue::Int(1), ConstantValue::Int(2), ConstantValue::Int(3)]),
            vec![],
            vec![],
            0,
            1,
            line_map(),
            None,
        ));
        let mut vm = Vm::new(code, VmConfig::bare());
        let result = vm.run_to_completion().unwrap();
        assert!(matches!(result, Value::Int(7)));
    }

    #[test]
    fn for_loop_sums_range_to_forty_five() {
        // total = 0
        // for v in range(10): total = total + v
        // return total
        //
        // SETUP_LOOP precedes evaluating the iterable, so the iterator value
        // lands on the block frame's own stack rather than the frame that was
        // current before the loop opened.
        let bytecode = vec![
            Opcode::LoadConst as u8, 0, 0,       // 0: LOAD_CONST 0 (0)
            Opcode::StoreFast as u8, 0, 0,       // 3: STORE_FAST total
            Opcode::SetupLoop as u8, 0, 0,       // 6: SETUP_LOOP
            Opcode::LoadGlobal as u8, 0, 0,      // 9: LOAD_GLOBAL range
            Opcode::LoadConst as u8, 1, 0,       // 12: LOAD_CONST 1 (10)
            Opcode::CallFunction as u8, 1, 0,    // 15: CALL_FUNCTION 1
            Opcode::GetIter as u8,               // 18: GET_ITER
            Opcode::ForIter as u8, 16, 0,        // 19: FOR_ITER +16 -> exits to 38
            Opcode::StoreFast as u8, 1, 0,       // 22: STORE_FAST v
            Opcode::LoadFast as u8, 0, 0,        // 25: LOAD_FAST total
            Opcode::LoadFast as u8, 1, 0,        // 28: LOAD_FAST v
            Opcode::BinaryAdd as u8,             // 31: BINARY_ADD
            Opcode::StoreFast as u8, 0, 0,       // 32: STORE_FAST total
            Opcode::JumpAbsolute as u8, 19, 0,   // 35: JUMP_ABSOLUTE -> FOR_ITER at 19
            Opcode::PopBlock as u8,              // 38: POP_BLOCK
            Opcode::LoadFast as u8, 0, 0,        // 39: LOAD_FAST total
            Opcode::ReturnValue as u8,           // 42: RETURN_VALUE
        ];
        let code = Rc::new(CodeObject::new(
            bytecode,
            consts(vec![ConstantValue::Int(0), ConstantValue::Int(10)]),
            vec!["range".into()],
            vec!["total".into(), "v".into()],
            0,
            1,
            line_map(),
            None,
        ));
        let mut vm = Vm::new(code, VmConfig::bare());
        let result = vm.run_to_completion().unwrap();
        assert!(matches!(result, Value::Int(45)), "expected 45, got {result:?}");
    }
}
