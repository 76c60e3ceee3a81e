//! The built-in table, the third tier
//! `LOAD_NAME`/`LOAD_GLOBAL` falls back to after globals and before the class table.

use std::cell::RefCell;
use std::rc::Rc;

use itertools::Itertools;

use crate::value::{NativeFunction, Value, ValueError};

/// All built-ins, in no particular order; looked up by name.
pub const BUILTINS: &[NativeFunction] = &[
    NativeFunction { name: "print", func: builtin_print },
    NativeFunction { name: "len", func: builtin_len },
    NativeFunction { name: "range", func: builtin_range },
    NativeFunction { name: "str", func: builtin_str },
    NativeFunction { name: "int", func: builtin_int },
    NativeFunction { name: "float", func: builtin_float },
    NativeFunction { name: "bool", func: builtin_bool },
];

/// Looks up a built-in by name, wrapping it as a callable [`Value`].
#[must_use]
pub fn lookup(name: &str) -> Option<Value> {
    BUILTINS
        .iter()
        .find(|b| b.name == name)
        .map(|b| Value::Function(Rc::new(crate::value::Function::Native(NativeFunction { name: b.name, func: b.func }))))
}

fn builtin_print(args: &[Value]) -> Result<Value, ValueError> {
    println!("{}", args.iter().format(" "));
    Ok(Value::None)
}

fn builtin_len(args: &[Value]) -> Result<Value, ValueError> {
    let len = match args.first() {
        Some(Value::Str(s)) => s.chars().count(),
        Some(Value::List(l)) => l.borrow().len(),
        Some(Value::Mapping(m)) => m.borrow().len(),
        Some(other) => return Err(ValueError::NotSubscriptable(other.type_name())),
        None => return Err(ValueError::NotSubscriptable("None")),
    };
    #[allow(clippy::cast_possible_wrap)]
    Ok(Value::Int(len as i64))
}

fn builtin_range(args: &[Value]) -> Result<Value, ValueError> {
    let (start, stop) = match args {
        [Value::Int(stop)] => (0, *stop),
        [Value::Int(start), Value::Int(stop)] => (*start, *stop),
        [other] | [other, _] => return Err(ValueError::NotSubscriptable(other.type_name())),
        _ => return Err(ValueError::NotSubscriptable("None")),
    };
    let items: Vec<Value> = (start..stop).map(Value::Int).collect();
    Ok(Value::List(Rc::new(RefCell::new(items))))
}

fn builtin_str(args: &[Value]) -> Result<Value, ValueError> {
    let text = args.first().map_or_else(String::new, ToString::to_string);
    Ok(Value::Str(Rc::from(text.as_str())))
}

fn builtin_int(args: &[Value]) -> Result<Value, ValueError> {
    match args.first() {
        Some(Value::Int(i)) => Ok(Value::Int(*i)),
        #[allow(clippy::cast_possible_truncation)]
        Some(Value::Float(f)) => Ok(Value::Int(*f as i64)),
        Some(Value::Bool(b)) => Ok(Value::Int(i64::from(*b))),
        Some(Value::Str(s)) => s
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| ValueError::InvalidIndex),
        Some(other) => Err(ValueError::NotSubscriptable(other.type_name())),
        None => Ok(Value::Int(0)),
    }
}

fn builtin_float(args: &[Value]) -> Result<Value, ValueError> {
    match args.first() {
        #[allow(clippy::cast_precision_loss)]
        Some(Value::Int(i)) => Ok(Value::Float(*i as f64)),
        Some(Value::Float(f)) => Ok(Value::Float(*f)),
        Some(Value::Bool(b)) => Ok(Value::Float(if *b { 1.0 } else { 0.0 })),
        Some(Value::Str(s)) => s
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| ValueError::InvalidIndex),
        Some(other) => Err(ValueError::NotSubscriptable(other.type_name())),
        None => Ok(Value::Float(0.0)),
    }
}

fn builtin_bool(args: &[Value]) -> Result<Value, ValueError> {
    Ok(Value::Bool(args.first().is_some_and(Value::is_truthy)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_with_one_arg_starts_at_zero() {
        let Value::List(items) = builtin_range(&[Value::Int(3)]).unwrap() else {
            panic!("expected list");
        };
        let items = items.borrow();
        assert!(matches!(items[0], Value::Int(0)));
        assert!(matches!(items[2], Value::Int(2)));
        assert_eq!(items.len(), 3);
    }

    #[test]
    fn len_of_string_counts_chars() {
        assert!(matches!(builtin_len(&[Value::Str(Rc::from("abc"))]), Ok(Value::Int(3))));
    }

    #[test]
    fn lookup_finds_print_but_not_garbage() {
        assert!(lookup("print").is_some());
        assert!(lookup("nope").is_none());
    }
}
