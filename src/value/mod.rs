//! Tagged runtime values.

mod ops;

pub use ops::{binary_op, compare_op, unary_op, BinaryOp, CompareOp, UnaryOp};

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt::{self, Display, Formatter};
use std::rc::Rc;

use itertools::Itertools;

use crate::class::{ClassDescriptor, Instance};
use crate::code::CodeObject;

/// A runtime value flowing through the interpreter's value stack, locals, and globals.
///
/// Tagged sum over numbers, strings, mappings, sequences, iterators,
/// functions, classes, instances, modules, and the internal block/builder
/// sentinels.
#[derive(Debug, Clone)]
pub enum Value {
    /// A signed integer.
    Int(i64),
    /// A floating-point number.
    Float(f64),
    /// A boolean.
    Bool(bool),
    /// An immutable string.
    Str(Rc<str>),
    /// The absence of a value.
    None,
    /// A mutable, ordered sequence.
    List(Rc<RefCell<Vec<Value>>>),
    /// A mutable key/value mapping.
    Mapping(Rc<RefCell<Mapping>>),
    /// A one-shot iterator produced by `GET_ITER` or a native callable like `range`.
    Iterator(Rc<RefCell<VecDeque<Value>>>),
    /// A callable: either a user function backed by a code object, or a native built-in.
    Function(Rc<Function>),
    /// A class descriptor, installed as a global once its body finishes executing.
    Class(Rc<ClassDescriptor>),
    /// An instance of a [`ClassDescriptor`].
    Instance(Rc<Instance>),
    /// An opaque module handle (modules carry no importable contents).
    Module(Rc<str>),
    /// A bare code object with no function identity yet attached.
    ///
    /// Two uses, both internal and never printed to the user: tagging a
    /// loop-block frame's owning code object, and the value `LOAD_CONST` pushes for a nested
    /// code constant while it sits on the stack awaiting `MAKE_FUNCTION` or
    /// `LOAD_BUILD_CLASS` to consume it into a [`Function`] or [`Builder`].
    Block(Rc<CodeObject>),
    /// Internal sentinel carrying a class body awaiting sub-interpretation.
    Builder(Rc<Builder>),
    /// The stateless callable `LOAD_BUILD_CLASS` pushes; `CALL_FUNCTION` recognizes
    /// it as the trigger to hand its single [`Builder`] argument to the class
    /// builder instead of making an ordinary call.
    BuildClassHook,
}

/// A mutable key/value mapping, keyed by value equality.
///
/// Implemented as an association list rather than a hash map: [`Value`] has
/// no total hash (containers and class instances are not hashable), and a
/// teaching VM has no performance requirement that would justify splitting
/// values into hashable/unhashable families.
#[derive(Debug, Clone, Default)]
pub struct Mapping(Vec<(Value, Value)>);

impl Mapping {
    /// Creates an empty mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a value by key using value equality.
    #[must_use]
    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.0
            .iter()
            .find(|(k, _)| values_equal(k, key))
            .map(|(_, v)| v)
    }

    /// Inserts or updates a key/value pair.
    pub fn insert(&mut self, key: Value, value: Value) {
        if let Some(slot) = self.0.iter_mut().find(|(k, _)| values_equal(k, &key)) {
            slot.1 = value;
        } else {
            self.0.push((key, value));
        }
    }

    /// Iterates over the keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &Value> {
        self.0.iter().map(|(k, _)| k)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the mapping has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A callable value: a user-defined function or a native built-in.
#[derive(Debug)]
pub enum Function {
    /// A function compiled from a code object.
    User(UserFunction),
    /// A host-provided built-in, invoked directly without a new frame.
    Native(NativeFunction),
}

impl Function {
    /// The function's name, as it would be bound under in globals or a class table.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Function::User(f) => &f.name,
            Function::Native(f) => f.name,
        }
    }
}

/// A function compiled from source: a name, default arguments, and a code object.
#[derive(Debug)]
pub struct UserFunction {
    /// The function's name.
    pub name: String,
    /// Default values for trailing omitted positional parameters.
    pub defaults: Vec<Value>,
    /// The function's compiled body.
    pub code: Rc<CodeObject>,
}

/// A host-provided built-in callable (`print`, `len`, `range`, ...).
pub struct NativeFunction {
    /// The built-in's name, as looked up via `LOAD_GLOBAL`.
    pub name: &'static str,
    /// The implementation, invoked with already-evaluated positional arguments.
    pub func: fn(&[Value]) -> Result<Value, ValueError>,
}

impl std::fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction").field("name", &self.name).finish()
    }
}

/// Sentinel carrying a class body awaiting sub-interpretation by the [`ClassBuilder`](crate::class_builder::ClassBuilder).
#[derive(Debug)]
pub struct Builder {
    /// The class's name.
    pub name: String,
    /// The class body's code object.
    pub code: Rc<CodeObject>,
}

impl Value {
    /// Whether this value is truthy, per the usual rules: `0`, `0.0`, `false`,
    /// `None`, and empty strings/lists/mappings are falsy; everything else is truthy.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Bool(b) => *b,
            Value::Str(s) => !s.is_empty(),
            Value::None => false,
            Value::List(l) => !l.borrow().is_empty(),
            Value::Mapping(m) => !m.borrow().is_empty(),
            Value::Iterator(_)
            | Value::Function(_)
            | Value::Class(_)
            | Value::Instance(_)
            | Value::Module(_)
            | Value::Block(_)
            | Value::Builder(_)
            | Value::BuildClassHook => true,
        }
    }

    /// The type name used in diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::Str(_) => "str",
            Value::None => "None",
            Value::List(_) => "list",
            Value::Mapping(_) => "map",
            Value::Iterator(_) => "iterator",
            Value::Function(_) => "function",
            Value::Class(_) => "class",
            Value::Instance(_) => "instance",
            Value::Module(_) => "module",
            Value::Block(_) => "block",
            Value::Builder(_) => "builder",
            Value::BuildClassHook => "builtin_function",
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::None => write!(f, "None"),
            Value::List(items) => write!(f, "[{}]", items.borrow().iter().format(", ")),
            Value::Mapping(m) => {
                write!(f, "{{{}}}", m.borrow().0.iter().map(|(k, v)| format!("{k}: {v}")).format(", "))
            }
            Value::Iterator(_) => write!(f, "<iterator>"),
            Value::Function(func) => write!(f, "<function {}>", func.name()),
            Value::Class(c) => write!(f, "<class {}>", c.name),
            Value::Instance(i) => write!(f, "<{}>", i.class.name),
            Value::Module(name) => write!(f, "<module {name}>"),
            Value::Block(_) => write!(f, "<block>"),
            Value::Builder(b) => write!(f, "<builder {}>", b.name),
            Value::BuildClassHook => write!(f, "<built-in function __build_class__>"),
        }
    }
}

/// Value equality, implemented per variant; mixed-type operations simply
/// compare unequal rather than coercing. Used internally (mapping lookups,
/// `in`) where a typed failure is not appropriate; prefer [`compare_op`] at
/// the opcode boundary.
#[must_use]
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Float(x), Value::Float(y)) => x == y,
        (Value::Int(x), Value::Float(y)) | (Value::Float(y), Value::Int(x)) => (*x as f64) == *y,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::None, Value::None) => true,
        (Value::List(x), Value::List(y)) => {
            Rc::ptr_eq(x, y) || {
                let x = x.borrow();
                let y = y.borrow();
                x.len() == y.len() && x.iter().zip(y.iter()).all(|(a, b)| values_equal(a, b))
            }
        }
        (Value::Class(x), Value::Class(y)) => Rc::ptr_eq(x, y),
        (Value::Instance(x), Value::Instance(y)) => Rc::ptr_eq(x, y),
        (Value::Function(x), Value::Function(y)) => Rc::ptr_eq(x, y),
        (Value::Module(x), Value::Module(y)) => x == y,
        _ => false,
    }
}

/// An arithmetic or comparison failure from mixing incompatible variants.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ValueError {
    /// A unary or binary operator was applied to an unsupported variant.
    #[error("unsupported operand type(s) for {op}: '{lhs}'{rhs}")]
    UnsupportedOperand {
        /// The operator's display text (e.g. `"+"`).
        op: &'static str,
        /// The left (or only, for unary) operand's type name.
        lhs: &'static str,
        /// The right operand's type name, formatted as `" and '<type>'"`, or empty for unary.
        rhs: String,
    },
    /// `TOS1[TOS]` or `TOS1[TOS] = ...` on a non-subscriptable value, or with a bad key.
    #[error("'{0}' is not subscriptable")]
    NotSubscriptable(&'static str),
    /// A mapping or list subscript key was not found.
    #[error("key not found")]
    KeyNotFound,
    /// `//` or `%` with a zero right-hand side.
    #[error("division by zero")]
    DivisionByZero,
    /// A list/mapping index was out of range or of the wrong type.
    #[error("invalid index")]
    InvalidIndex,
    /// `GET_ITER` on a value with no iteration protocol.
    #[error("'{0}' object is not iterable")]
    NotIterable(&'static str),
    /// Calling a value that is not callable.
    #[error("'{0}' object is not callable")]
    NotCallable(&'static str),
    /// Attribute access (`getattr`/`setattr`) on an unsupported receiver or missing attribute.
    #[error("'{receiver}' object has no attribute '{attr}'")]
    NoSuchAttribute {
        /// The receiver's type name.
        receiver: &'static str,
        /// The attribute name that was looked up.
        attr: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness() {
        assert!(!Value::Int(0).is_truthy());
        assert!(Value::Int(1).is_truthy());
        assert!(!Value::None.is_truthy());
        assert!(!Value::Str(Rc::from("")).is_truthy());
        assert!(Value::Str(Rc::from("x")).is_truthy());
    }

    #[test]
    fn mapping_insert_and_get() {
        let mut m = Mapping::new();
        m.insert(Value::Str(Rc::from("a")), Value::Int(1));
        m.insert(Value::Str(Rc::from("a")), Value::Int(2));
        assert_eq!(m.len(), 1);
        match m.get(&Value::Str(Rc::from("a"))) {
            Some(Value::Int(2)) => {}
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn equality_mixes_int_and_float() {
        assert!(values_equal(&Value::Int(2), &Value::Float(2.0)));
        assert!(!values_equal(&Value::Int(2), &Value::Str(Rc::from("2"))));
    }
}
