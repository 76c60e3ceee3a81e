//! End-to-end scenarios assembled from `.pvasm` listings and run straight
//! through the interpreter (no debugger): arithmetic, a `for` loop over
//! `range`, class instantiation with a method call, and arithmetic/loop
//! round-trips.

mod common;

use common::CLASS_WITH_METHOD_SRC;
use pyvym::assembler;
use pyvym::value::Value;
use pyvym::{Vm, VmConfig};

fn run(src: &str) -> Value {
    let code = assembler::assemble(src).expect("assembles");
    let mut vm = Vm::new(std::rc::Rc::new(code), VmConfig::bare());
    vm.run_to_completion().expect("runs to completion")
}

/// `return 1 + 2 * 3` -> exit code 7.
#[test]
fn arithmetic_expression_returns_seven() {
    let src = "
.header
name module
argcount 0
firstline 1
.consts
int 1
int 2
int 3
.lines
0 1
.source
return 1 + 2 * 3
.code
LOAD_CONST 0
LOAD_CONST 1
LOAD_CONST 2
BINARY_MULTIPLY
BINARY_ADD
RETURN_VALUE
";
    assert!(matches!(run(src), Value::Int(7)));
}

/// `x = 10; y = 0; for i in range(x): y = y + i; return y` -> exit code 45.
#[test]
fn for_loop_over_range_accumulates_sum() {
    let src = "
.header
name module
argcount 0
firstline 1
.consts
int 10
int 0
.names
range
.locals
x
y
i
.lines
0 1
.source
x = 10; y = 0; for i in range(x): y = y + i
return y
.code
LOAD_CONST 0
STORE_FAST 0
LOAD_CONST 1
STORE_FAST 1
SETUP_LOOP
LOAD_GLOBAL 0
LOAD_FAST 0
CALL_FUNCTION 1
GET_ITER
FOR_ITER 16
STORE_FAST 2
LOAD_FAST 1
LOAD_FAST 2
BINARY_ADD
STORE_FAST 1
JUMP_ABSOLUTE 25
POP_BLOCK
LOAD_FAST 1
RETURN_VALUE
";
    assert!(matches!(run(src), Value::Int(45)));
}

/// Constructing an instance and calling a method on it returns `self.a + self.b`.
#[test]
fn class_instantiation_and_method_call_returns_field_sum() {
    assert!(matches!(run(CLASS_WITH_METHOD_SRC), Value::Int(7)));
}

/// Round-trip: an arithmetic expression assembled and run matches the same
/// expression evaluated directly in Rust.
#[test]
fn arithmetic_round_trip_matches_direct_computation() {
    let src = "
.header
name module
argcount 0
firstline 1
.consts
int 4
int 5
int 2
.lines
0 1
.source
return (4 + 5) * 2
.code
LOAD_CONST 0
LOAD_CONST 1
BINARY_ADD
LOAD_CONST 2
BINARY_MULTIPLY
RETURN_VALUE
";
    let expected = (4 + 5) * 2;
    assert!(matches!(run(src), Value::Int(n) if n == expected));
}

/// Round-trip: a `for` loop over a list visits elements in order and leaves
/// the value stack empty once it exits (the running total is the only thing
/// left on the stack, by the final `RETURN_VALUE`).
#[test]
fn for_loop_visits_elements_in_order() {
    let src = "
.header
name module
argcount 0
firstline 1
.consts
int 0
int 7
.names
range
.locals
total
v
.lines
0 1
.source
total = 0
for v in range(7): total = total + v
return total
.code
LOAD_CONST 0
STORE_FAST 0
SETUP_LOOP
LOAD_GLOBAL 0
LOAD_CONST 1
CALL_FUNCTION 1
GET_ITER
FOR_ITER 16
STORE_FAST 1
LOAD_FAST 0
LOAD_FAST 1
BINARY_ADD
STORE_FAST 0
JUMP_ABSOLUTE 19
POP_BLOCK
LOAD_FAST 0
RETURN_VALUE
";
    // sum(0..7) == 21
    assert!(matches!(run(src), Value::Int(21)));
}
