//! Classes and instances.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::code::CodeObject;
use crate::frame::Frame;
use crate::value::{UserFunction, Value};

/// A class produced by the [`ClassBuilder`](crate::class_builder::ClassBuilder) and
/// installed into a module's class table.
///
/// Methods are split into the special table (dunder-shaped names, e.g.
/// `__init__`) and the ordinary table — `CALL_FUNCTION`'s class
/// instantiation path looks up `__init__` in the special table.
#[derive(Debug)]
pub struct ClassDescriptor {
    /// The class's name.
    pub name: String,
    /// Dunder-shaped methods (`__init__`, and any others a body happens to define).
    pub special_methods: HashMap<String, Rc<UserFunction>>,
    /// Ordinary methods.
    pub methods: HashMap<String, Rc<UserFunction>>,
    /// Class-body-level attributes (assigned by a top-level `STORE_NAME` in
    /// the class body, not inside a nested function) shared by every instance.
    pub attributes: RefCell<HashMap<String, Value>>,
    /// The class body's own code object, kept for disassembly and trace logging.
    pub body_code: Rc<CodeObject>,
}

impl ClassDescriptor {
    /// Looks up a method by name, special table first, then ordinary.
    #[must_use]
    pub fn find_method(&self, name: &str) -> Option<&Rc<UserFunction>> {
        self.special_methods.get(name).or_else(|| self.methods.get(name))
    }
}

/// A live instance of a [`ClassDescriptor`].
///
/// Carries a single persistent binding frame reused across every method
/// call on this instance, created once when the instance is constructed and
/// re-pointed at a different method's code object (with `ip` reset to zero)
/// on each subsequent call. Locals set by one method call are therefore
/// still visible to the next: an intentional quirk, not a bug to paper over.
///
/// `self.x = ...` (`STORE_ATTR`) and `self.x` (`LOAD_ATTR`) read and write
/// this same binding frame's locals rather than a second, separate map: the
/// binding frame *is* the instance's attribute mapping, keyed by attribute
/// name the same way a parameter is keyed by its own name. A `set local`
/// from the debugger on a name that happens to also be an attribute is
/// therefore visible the next time that attribute is read.
#[derive(Debug)]
pub struct Instance {
    /// The class this is an instance of.
    pub class: Rc<ClassDescriptor>,
    /// The persistent frame bound to this instance's `self`, reused across
    /// calls, and doubling as the instance's attribute mapping.
    ///
    /// Shared (`Rc`) rather than owned outright so the interpreter can push
    /// it directly onto the frame stack as the current frame for a method
    /// call, the same way it would a freshly allocated call frame.
    pub binding_frame: Rc<RefCell<Frame>>,
}

impl Instance {
    /// Wraps a class and its freshly-created binding frame into an instance.
    #[must_use]
    pub fn new(class: Rc<ClassDescriptor>, binding_frame: Rc<RefCell<Frame>>) -> Self {
        Self { class, binding_frame }
    }
}

/// Builds a callable [`Value`] for a method, wrapping the class table's
/// `Rc<UserFunction>` into a fresh [`Function::User`] each time it is read
/// off an instance (`LOAD_ATTR`'s attribute-is-a-function case).
#[must_use]
pub fn method_value(method: &Rc<UserFunction>) -> Value {
    Value::Function(Rc::new(crate::value::Function::User(UserFunction {
        name: method.name.clone(),
        defaults: method.defaults.clone(),
        code: Rc::clone(&method.code),
    })))
}

/// Implements `getattr`.
/// # Errors
/// [`ValueError::NoSuchAttribute`] if nothing in scope resolves `name`, or
/// the receiver is not an [`Instance`] (attribute access on any other
/// variant is unsupported by this crate's subset).
pub fn get_attr(receiver: &Value, name: &str) -> Result<Value, crate::value::ValueError> {
    use crate::value::ValueError;
    let Value::Instance(inst) = receiver else {
        return Err(ValueError::NoSuchAttribute {
            receiver: receiver.type_name(),
            attr: name.to_string(),
        });
    };
    if let Some(method) = inst.class.find_method(name) {
        return Ok(method_value(method));
    }
    if let Some(value) = inst.binding_frame.borrow().get_local(name) {
        return Ok(value);
    }
    if let Some(value) = inst.class.attributes.borrow().get(name) {
        return Ok(value.clone());
    }
    Err(ValueError::NoSuchAttribute {
        receiver: receiver.type_name(),
        attr: name.to_string(),
    })
}

/// Implements `setattr`: writes into the instance's
/// binding frame, keyed by attribute name.
/// # Errors
/// [`ValueError::NoSuchAttribute`] if the receiver is not an [`Instance`].
pub fn set_attr(receiver: &Value, name: &str, value: Value) -> Result<(), crate::value::ValueError> {
    use crate::value::ValueError;
    let Value::Instance(inst) = receiver else {
        return Err(ValueError::NoSuchAttribute {
            receiver: receiver.type_name(),
            attr: name.to_string(),
        });
    };
    inst.binding_frame.borrow_mut().set_local(name, value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::{LineMap, LineTableEntry};

    fn sample_code() -> Rc<CodeObject> {
        Rc::new(CodeObject::new(
            vec![],
            vec![],
            vec![],
            vec![],
            0,
            1,
            LineMap::new(1, vec![LineTableEntry { byte_delta: 0, line_delta: 0 }], vec!["pass".into()]),
            Some("Point".into()),
        ))
    }

    #[test]
    fn find_method_checks_special_before_ordinary() {
        let init = Rc::new(UserFunction {
            name: "__init__".into(),
            defaults: vec![],
            code: sample_code(),
        });
        let mut special = HashMap::new();
        special.insert("__init__".to_string(), init);
        let class = ClassDescriptor {
            name: "Point".into(),
            special_methods: special,
            methods: HashMap::new(),
            attributes: RefCell::new(HashMap::new()),
            body_code: sample_code(),
        };
        assert!(class.find_method("__init__").is_some());
        assert!(class.find_method("missing").is_none());
    }
}
