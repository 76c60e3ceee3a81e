//! Arithmetic, bitwise, and comparison dispatch over [`Value`].

use std::rc::Rc;

use super::{values_equal, Mapping, Value, ValueError};

/// A unary operator (`UNARY_POSITIVE`, `UNARY_NEGATIVE`, `UNARY_NOT`, `UNARY_INVERT`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `+x`.
    Positive,
    /// `-x`.
    Negative,
    /// `not x`.
    Not,
    /// `~x`.
    Invert,
}

impl UnaryOp {
    const fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Positive => "+",
            UnaryOp::Negative => "-",
            UnaryOp::Not => "!",
            UnaryOp::Invert => "~",
        }
    }
}

/// Applies a unary operator to `x`.
/// # Errors
/// [`ValueError::UnsupportedOperand`] if `x`'s variant does not support the operator.
pub fn unary_op(op: UnaryOp, x: Value) -> Result<Value, ValueError> {
    use UnaryOp::{Invert, Negative, Not, Positive};
    match (op, x) {
        (Not, x) => Ok(Value::Bool(!x.is_truthy())),
        (Positive, x @ (Value::Int(_) | Value::Float(_))) => Ok(x),
        (Negative, Value::Int(i)) => Ok(Value::Int(-i)),
        (Negative, Value::Float(f)) => Ok(Value::Float(-f)),
        (Invert, Value::Int(i)) => Ok(Value::Int(!i)),
        (op, x) => Err(ValueError::UnsupportedOperand {
            op: op.symbol(),
            lhs: x.type_name(),
            rhs: String::new(),
        }),
    }
}

/// A binary or in-place binary operator (`BINARY_*` and `INPLACE_*` share one handler).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `TOS1 + TOS`.
    Add,
    /// `TOS1 - TOS`.
    Sub,
    /// `TOS1 * TOS`.
    Mul,
    /// `TOS1 / TOS` (true division; always yields a float for numeric operands).
    Div,
    /// `TOS1 // TOS` (floor division).
    FloorDiv,
    /// `TOS1 % TOS`.
    Mod,
    /// `TOS1 ** TOS`.
    Pow,
    /// `TOS1 << TOS`.
    Shl,
    /// `TOS1 >> TOS`.
    Shr,
    /// `TOS1 & TOS`.
    And,
    /// `TOS1 | TOS`.
    Or,
    /// `TOS1 ^ TOS`.
    Xor,
}

impl BinaryOp {
    const fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::FloorDiv => "//",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "**",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::Xor => "^",
        }
    }

    fn type_error(self, lhs: &Value, rhs: &Value) -> ValueError {
        ValueError::UnsupportedOperand {
            op: self.symbol(),
            lhs: lhs.type_name(),
            rhs: format!(" and '{}'", rhs.type_name()),
        }
    }
}

/// Applies a binary operator to `lhs op rhs` (`lhs` is `TOS1`, `rhs` is `TOS`).
/// # Errors
/// [`ValueError::UnsupportedOperand`] if the variant pair does not support the operator.
pub fn binary_op(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, ValueError> {
    use BinaryOp::{Add, And, Div, FloorDiv, Mod, Mul, Or, Pow, Shl, Shr, Sub, Xor};

    match (op, &lhs, &rhs) {
        (Add, Value::Str(a), Value::Str(b)) => Ok(Value::Str(Rc::from(format!("{a}{b}")))),
        (Add, Value::List(a), Value::List(b)) => {
            let mut out = a.borrow().clone();
            out.extend(b.borrow().iter().cloned());
            Ok(Value::List(Rc::new(std::cell::RefCell::new(out))))
        }
        (Mul, Value::Str(s), Value::Int(n)) | (Mul, Value::Int(n), Value::Str(s)) => {
            Ok(Value::Str(Rc::from(s.repeat((*n).max(0) as usize))))
        }
        (Add | Sub | Mul | Div | FloorDiv | Mod | Pow, Value::Int(a), Value::Int(b)) => {
            numeric_int(op, *a, *b)
        }
        (Add | Sub | Mul | Div | FloorDiv | Mod | Pow, a, b)
            if matches!(a, Value::Int(_) | Value::Float(_))
                && matches!(b, Value::Int(_) | Value::Float(_)) =>
        {
            numeric_float(op, as_f64(a), as_f64(b))
        }
        (Shl | Shr | And | Or | Xor, Value::Int(a), Value::Int(b)) => bitwise_int(op, *a, *b),
        _ => Err(op.type_error(&lhs, &rhs)),
    }
}

fn as_f64(v: &Value) -> f64 {
    match v {
        Value::Int(i) => *i as f64,
        Value::Float(f) => *f,
        _ => unreachable!("caller already matched numeric variants"),
    }
}

fn numeric_int(op: BinaryOp, a: i64, b: i64) -> Result<Value, ValueError> {
    use BinaryOp::{Add, Div, FloorDiv, Mod, Mul, Pow, Sub};
    match op {
        Add => Ok(Value::Int(a.wrapping_add(b))),
        Sub => Ok(Value::Int(a.wrapping_sub(b))),
        Mul => Ok(Value::Int(a.wrapping_mul(b))),
        Div => Ok(Value::Float(a as f64 / b as f64)),
        FloorDiv if b == 0 => Err(ValueError::DivisionByZero),
        FloorDiv => Ok(Value::Int(a.div_euclid(b))),
        Mod if b == 0 => Err(ValueError::DivisionByZero),
        Mod => Ok(Value::Int(a.rem_euclid(b))),
        Pow => {
            if let Ok(exp) = u32::try_from(b) {
                Ok(Value::Int(a.wrapping_pow(exp)))
            } else {
                Ok(Value::Float((a as f64).powf(b as f64)))
            }
        }
        _ => unreachable!("caller already matched arithmetic ops"),
    }
}

fn numeric_float(op: BinaryOp, a: f64, b: f64) -> Result<Value, ValueError> {
    use BinaryOp::{Add, Div, FloorDiv, Mod, Mul, Pow, Sub};
    match op {
        Add => Ok(Value::Float(a + b)),
        Sub => Ok(Value::Float(a - b)),
        Mul => Ok(Value::Float(a * b)),
        Div => Ok(Value::Float(a / b)),
        FloorDiv => Ok(Value::Float((a / b).floor())),
        Mod => Ok(Value::Float(a.rem_euclid(b))),
        Pow => Ok(Value::Float(a.powf(b))),
        _ => unreachable!("caller already matched arithmetic ops"),
    }
}

fn bitwise_int(op: BinaryOp, a: i64, b: i64) -> Result<Value, ValueError> {
    use BinaryOp::{And, Or, Shl, Shr, Xor};
    match op {
        Shl => Ok(Value::Int(a.wrapping_shl(b as u32))),
        Shr => Ok(Value::Int(a.wrapping_shr(b as u32))),
        And => Ok(Value::Int(a & b)),
        Or => Ok(Value::Int(a | b)),
        Xor => Ok(Value::Int(a ^ b)),
        _ => unreachable!("caller already matched bitwise ops"),
    }
}

/// The eleven comparators of `COMPARE_OP`, in the order the opcode's argument indexes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `in`
    In,
    /// `not in`
    NotIn,
    /// `is`
    Is,
    /// `is not`
    IsNot,
    /// exception-subclass test; recognized but not implemented.
    ExceptionSubclass,
}

impl CompareOp {
    /// Decodes a `COMPARE_OP` argument into a comparator.
    #[must_use]
    pub fn from_index(index: u16) -> Option<Self> {
        use CompareOp::{Eq, ExceptionSubclass, Ge, Gt, In, Is, IsNot, Le, Lt, Ne, NotIn};
        match index {
            0 => Some(Lt),
            1 => Some(Le),
            2 => Some(Eq),
            3 => Some(Ne),
            4 => Some(Gt),
            5 => Some(Ge),
            6 => Some(In),
            7 => Some(NotIn),
            8 => Some(Is),
            9 => Some(IsNot),
            10 => Some(ExceptionSubclass),
            _ => None,
        }
    }
}

fn ordering(v: &Value, w: &Value) -> Result<std::cmp::Ordering, ValueError> {
    match (v, w) {
        (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
        (Value::Float(a), Value::Float(b)) => {
            a.partial_cmp(b).ok_or(ValueError::UnsupportedOperand {
                op: "compare",
                lhs: "float",
                rhs: " and 'float' (NaN)".into(),
            })
        }
        (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b).ok_or_else(nan_error),
        (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)).ok_or_else(nan_error),
        (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
        _ => Err(ValueError::UnsupportedOperand {
            op: "compare",
            lhs: v.type_name(),
            rhs: format!(" and '{}'", w.type_name()),
        }),
    }
}

fn nan_error() -> ValueError {
    ValueError::UnsupportedOperand {
        op: "compare",
        lhs: "float",
        rhs: " and 'float' (NaN)".into(),
    }
}

fn contains(container: &Value, item: &Value) -> Result<bool, ValueError> {
    match container {
        Value::List(items) => Ok(items.borrow().iter().any(|v| values_equal(v, item))),
        Value::Mapping(m) => Ok(m.borrow().get(item).is_some()),
        Value::Str(s) => match item {
            Value::Str(needle) => Ok(s.contains(needle.as_ref())),
            _ => Err(ValueError::UnsupportedOperand {
                op: "in",
                lhs: item.type_name(),
                rhs: " and 'str'".into(),
            }),
        },
        other => Err(ValueError::NotIterable(other.type_name())),
    }
}

fn identical(v: &Value, w: &Value) -> bool {
    match (v, w) {
        (Value::None, Value::None) => true,
        (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
        (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
        (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
        (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
        (Value::Mapping(a), Value::Mapping(b)) => Rc::ptr_eq(a, b),
        _ => values_equal(v, w),
    }
}

/// Applies `v COMPARE_OP w` (`v` is `TOS1`, `w` is `TOS`), in that argument order.
/// # Errors
/// [`ValueError`] if the comparator is not supported for the operand types, or is
/// [`CompareOp::ExceptionSubclass`] (unimplemented; no exception support).
pub fn compare_op(op: CompareOp, v: &Value, w: &Value) -> Result<Value, ValueError> {
    use CompareOp::{Eq, ExceptionSubclass, Ge, Gt, In, Is, IsNot, Le, Lt, Ne, NotIn};
    let result = match op {
        Lt => ordering(v, w)?.is_lt(),
        Le => ordering(v, w)?.is_le(),
        Eq => values_equal(v, w),
        Ne => !values_equal(v, w),
        Gt => ordering(v, w)?.is_gt(),
        Ge => ordering(v, w)?.is_ge(),
        In => contains(w, v)?,
        NotIn => !contains(w, v)?,
        Is => identical(v, w),
        IsNot => !identical(v, w),
        ExceptionSubclass => {
            return Err(ValueError::UnsupportedOperand {
                op: "exception-subclass test",
                lhs: v.type_name(),
                rhs: format!(" and '{}'", w.type_name()),
            })
        }
    };
    Ok(Value::Bool(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addition_promotes_to_float_when_mixed() {
        let r = binary_op(BinaryOp::Add, Value::Int(1), Value::Float(2.5)).unwrap();
        match r {
            Value::Float(f) => assert!((f - 3.5).abs() < f64::EPSILON),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn true_division_of_ints_yields_float() {
        let r = binary_op(BinaryOp::Div, Value::Int(7), Value::Int(2)).unwrap();
        matches!(r, Value::Float(f) if (f - 3.5).abs() < f64::EPSILON)
            .then_some(())
            .expect("expected float 3.5");
    }

    #[test]
    fn floor_div_by_zero_is_a_typed_error_not_a_panic() {
        let err = binary_op(BinaryOp::FloorDiv, Value::Int(7), Value::Int(0));
        assert_eq!(err.unwrap_err(), ValueError::DivisionByZero);
    }

    #[test]
    fn mod_by_zero_is_a_typed_error_not_a_panic() {
        let err = binary_op(BinaryOp::Mod, Value::Int(7), Value::Int(0));
        assert_eq!(err.unwrap_err(), ValueError::DivisionByZero);
    }

    #[test]
    fn mismatched_types_are_a_type_error() {
        let err = binary_op(BinaryOp::Add, Value::Int(1), Value::Str(Rc::from("x")));
        assert!(err.is_err());
    }

    #[test]
    fn compare_respects_stack_order() {
        // v=TOS1=2, w=TOS=3 => 2 < 3 => true
        let r = compare_op(CompareOp::Lt, &Value::Int(2), &Value::Int(3)).unwrap();
        assert!(matches!(r, Value::Bool(true)));
    }

    #[test]
    fn exception_subclass_comparator_is_unimplemented() {
        assert!(compare_op(CompareOp::ExceptionSubclass, &Value::Int(1), &Value::Int(1)).is_err());
    }
}
