//! Shared `.pvasm` fixtures for the integration tests.

/// A class with a constructor and one method -> exit code 7.
///
/// `class P: def __init__(self,a,b): self.a=a; self.b=b` /
/// `def s(self): return self.a + self.b` / `p = P(3,4); return p.s()`.
pub const CLASS_WITH_METHOD_SRC: &str = "
.block P.__init__
.header
name P.__init__
argcount 3
firstline 2
.consts
none
.names
a
b
.locals
self
a
b
.lines
0 2
.source
def __init__(self,a,b): self.a=a; self.b=b
.code
LOAD_FAST 1
LOAD_FAST 0
STORE_ATTR 0
LOAD_FAST 2
LOAD_FAST 0
STORE_ATTR 1
LOAD_CONST 0
RETURN_VALUE
.endblock

.block P.s
.header
name P.s
argcount 1
firstline 3
.names
a
b
.locals
self
.lines
0 3
.source
def s(self): return self.a + self.b
.code
LOAD_FAST 0
LOAD_ATTR 0
LOAD_FAST 0
LOAD_ATTR 1
BINARY_ADD
RETURN_VALUE
.endblock

.block P
.header
name P
argcount 0
firstline 1
.consts
code P.__init__
str P.__init__
code P.s
str P.s
.lines
0 1
.source
class P:
.code
LOAD_CONST 0
LOAD_CONST 1
MAKE_FUNCTION 0
LOAD_CONST 2
LOAD_CONST 3
MAKE_FUNCTION 0
RETURN_VALUE
.endblock

.header
name module
argcount 0
firstline 1
.consts
code P
str P
int 3
int 4
.names
P
p
s
.lines
0 4
.source
class P:
def __init__(self,a,b): self.a=a; self.b=b
def s(self): return self.a + self.b
p = P(3,4); return p.s()
.code
LOAD_BUILD_CLASS
LOAD_CONST 0
LOAD_CONST 1
MAKE_FUNCTION 0
CALL_FUNCTION 1
POP_TOP
LOAD_GLOBAL 0
LOAD_CONST 2
LOAD_CONST 3
CALL_FUNCTION 2
STORE_NAME 1
LOAD_NAME 1
LOAD_ATTR 2
CALL_FUNCTION 0
RETURN_VALUE
";
