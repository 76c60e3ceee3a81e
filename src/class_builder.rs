//! The Class Builder: a tiny dedicated sub-interpreter over a class body's
//! bytecode, distinct from the main dispatch loop rather than a mode
//! flag inside it.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::class::ClassDescriptor;
use crate::code::{CodeObject, ConstantValue, ProgramCounter};
use crate::interpreter::decode::{decode, DecodeError};
use crate::interpreter::opcode::Opcode;
use crate::module::VmModule;
use crate::value::{Builder, UserFunction, Value};

/// Builds a [`ClassDescriptor`] by interpreting a class body's bytecode and
/// installing it into `module`.
///
/// Only ever sees `LOAD_CONST`, `LOAD_NAME`, `STORE_NAME`, `MAKE_FUNCTION`,
/// and `RETURN_VALUE` in well-formed class bodies; anything else is a
/// [`DecodeError::NotImplemented`] here even if the main interpreter
/// implements it, since a class body has no business doing control flow,
/// arithmetic, or calls at its top level.
/// # Errors
/// [`DecodeError`] on a malformed or unsupported instruction.
pub fn build(builder: &Builder, module: &VmModule) -> Result<(), DecodeError> {
    let code = Rc::clone(&builder.code);
    let mut stack: Vec<Value> = Vec::new();
    let mut ip = ProgramCounter::ZERO;

    let mut special_methods: HashMap<String, Rc<UserFunction>> = HashMap::new();
    let mut methods: HashMap<String, Rc<UserFunction>> = HashMap::new();
    let mut attributes: HashMap<String, Value> = HashMap::new();

    loop {
        let inst = decode(&code, ip)?;
        ip = inst.next_ip;

        match inst.opcode {
            Opcode::Nop => {}
            Opcode::LoadConst => {
                let idx = inst.arg.unwrap_or_default() as usize;
                let value = match code.constants.get(idx) {
                    Some(ConstantValue::Int(i)) => Value::Int(*i),
                    Some(ConstantValue::Float(f)) => Value::Float(*f),
                    Some(ConstantValue::Bool(b)) => Value::Bool(*b),
                    Some(ConstantValue::Str(s)) => Value::Str(Rc::from(s.as_str())),
                    Some(ConstantValue::None) => Value::None,
                    Some(ConstantValue::Code(c)) => Value::Block(Rc::clone(c)),
                    None => return Err(DecodeError::TruncatedOperand(ip)),
                };
                stack.push(value);
            }
            Opcode::LoadName => {
                let idx = inst.arg.unwrap_or_default() as usize;
                let name = code.names.get(idx).cloned().unwrap_or_default();
                stack.push(Value::Str(Rc::from(name.as_str())));
            }
            Opcode::StoreName => {
                let idx = inst.arg.unwrap_or_default() as usize;
                let name = code.names.get(idx).cloned().unwrap_or_default();
                if let Some(value) = stack.pop() {
                    attributes.insert(name, value);
                }
            }
            Opcode::MakeFunction => {
                let name_val = stack.pop();
                let code_val = stack.pop();
                let (Some(Value::Str(name)), Some(Value::Block(fn_code))) = (name_val, code_val) else {
                    return Err(DecodeError::TruncatedOperand(ip));
                };
                let short_name = name.strip_prefix(&format!("{}.", builder.name)).unwrap_or(&name).to_string();
                let func = Rc::new(UserFunction {
                    name: short_name.clone(),
                    defaults: Vec::new(),
                    code: fn_code,
                });
                if is_special_name(&short_name) {
                    special_methods.insert(short_name, func);
                } else {
                    methods.insert(short_name, func);
                }
            }
            Opcode::ReturnValue => {
                let class = Rc::new(ClassDescriptor {
                    name: builder.name.clone(),
                    special_methods,
                    methods,
                    attributes: RefCell::new(attributes),
                    body_code: code,
                });
                module.add_class(class);
                return Ok(());
            }
            other => return Err(DecodeError::NotImplemented(other.mnemonic())),
        }
    }
}

/// Whether a method name is dunder-shaped (`__init__`, `__str__`, ...): starts
/// and ends with `__` and is longer than a bare `__`.
#[must_use]
fn is_special_name(name: &str) -> bool {
    name.len() > 2 && name.starts_with("__") && name.ends_with("__")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::{LineMap, LineTableEntry};

    fn line_map() -> LineMap {
        LineMap::new(1, vec![LineTableEntry { byte_delta: 0, line_delta: 0 }], vec!["pass".into()])
    }

    fn init_code() -> Rc<CodeObject> {
        Rc::new(CodeObject::new(vec![Opcode::ReturnValue as u8], vec![], vec![], vec![], 1, 1, line_map(), Some("__init__".into())))
    }

    #[test]
    fn builds_a_class_with_one_special_method() {
        let init = init_code();
        let bytecode = vec![
            Opcode::LoadConst as u8, 0, 0,
            Opcode::LoadConst as u8, 1, 0,
            Opcode::MakeFunction as u8, 0, 0,
            Opcode::ReturnValue as u8,
        ];
        let consts = vec![ConstantValue::Code(Rc::clone(&init)), ConstantValue::Str("Point.__init__".into())];
        let body = Rc::new(CodeObject::new(bytecode, consts, vec![], vec![], 0, 1, line_map(), Some("Point".into())));
        let builder = Builder { name: "Point".into(), code: body };
        let module = VmModule::new("main_module", init_code());

        build(&builder, &module).unwrap();

        let class = module.find_class("Point").unwrap();
        assert!(class.find_method("__init__").is_some());
    }

    #[test]
    fn is_special_name_requires_dunder_shape_and_length() {
        assert!(is_special_name("__init__"));
        assert!(!is_special_name("run"));
        assert!(!is_special_name("__"));
        assert!(is_special_name("___"));
    }
}
