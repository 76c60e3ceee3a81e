//! Compiled code representation: program counters, line maps, and code objects.

pub mod line_map;
pub mod object;
pub mod pc;

pub use line_map::{InvalidLine, LineMap, LineTableEntry};
pub use object::{CodeObject, ConstantValue};
pub use pc::{InvalidOffset, ProgramCounter};
