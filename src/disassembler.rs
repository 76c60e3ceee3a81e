//! Read-only formatter over a [`CodeObject`]'s instruction stream.

use std::fmt::Write as _;

use crate::code::{CodeObject, ConstantValue, ProgramCounter};
use crate::interpreter::decode::decode;

/// Renders a full disassembly: a constants/names preamble followed by one
/// line per instruction, `{pc:05}  {opcode name:<20} {oparg?:>6}  ; line {n}`.
#[must_use]
pub fn disassemble(code: &CodeObject) -> String {
    let mut out = String::new();
    writeln!(out, "{} ({})", code.display_name(), code.bytecode.len()).unwrap();

    if !code.constants.is_empty() {
        writeln!(out, "constants:").unwrap();
        for (i, c) in code.constants.iter().enumerate() {
            writeln!(out, "  {i}: {}", render_constant(c)).unwrap();
        }
    }
    if !code.names.is_empty() {
        writeln!(out, "names:").unwrap();
        for (i, n) in code.names.iter().enumerate() {
            writeln!(out, "  {i}: {n}").unwrap();
        }
    }
    if !code.local_names.is_empty() {
        writeln!(out, "locals:").unwrap();
        for (i, n) in code.local_names.iter().enumerate() {
            writeln!(out, "  {i}: {n}").unwrap();
        }
    }

    let mut ip = ProgramCounter::ZERO;
    while usize::from(ip) < code.bytecode.len() {
        let Ok(inst) = decode(code, ip) else { break };
        let oparg = inst.arg.map_or_else(String::new, |a| a.to_string());
        writeln!(out, "{ip}  {:<20} {oparg:>6}  ; line {}", inst.opcode.mnemonic(), inst.line).unwrap();
        ip = inst.next_ip;
    }
    out
}

fn render_constant(c: &ConstantValue) -> String {
    match c {
        ConstantValue::Int(i) => i.to_string(),
        ConstantValue::Float(f) => f.to_string(),
        ConstantValue::Bool(b) => b.to_string(),
        ConstantValue::Str(s) => format!("{s:?}"),
        ConstantValue::None => "None".to_string(),
        ConstantValue::Code(c) => format!("<code {}>", c.display_name()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::{LineMap, LineTableEntry};
    use crate::interpreter::opcode::Opcode;

    #[test]
    fn disassembles_a_simple_program() {
        let code = CodeObject::new(
            vec![Opcode::LoadConst as u8, 0, 0, Opcode::ReturnValue as u8],
            vec![ConstantValue::Int(7)],
            vec![],
            vec![],
            0,
            1,
            LineMap::new(1, vec![LineTableEntry { byte_delta: 0, line_delta: 0 }], vec!["return 7".into()]),
            None,
        );
        let text = disassemble(&code);
        assert!(text.contains("LOAD_CONST"));
        assert!(text.contains("RETURN_VALUE"));
        assert!(text.contains("7"));
    }
}
