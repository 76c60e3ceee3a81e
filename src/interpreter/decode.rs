//! Single-instruction decode: opcode, optional operand, source line.

use crate::code::{CodeObject, ProgramCounter};

use super::opcode::{Opcode, HAS_ARG_THRESHOLD};

/// One decoded instruction: its opcode, optional operand, the offset of the
/// byte immediately after it, and the source line it maps to.
#[derive(Debug, Clone, Copy)]
pub struct Instruction {
    /// The decoded opcode.
    pub opcode: Opcode,
    /// The two-byte little-endian operand, if this opcode's id requires one.
    pub arg: Option<u16>,
    /// The offset of the first byte of the *next* instruction.
    pub next_ip: ProgramCounter,
    /// The source line the instruction at `ip` maps to.
    pub line: u32,
}

/// A decode-time failure: a malformed instruction stream.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    /// `ip` is past the end of the bytecode.
    #[error("program counter {0} past end of bytecode")]
    OutOfBounds(ProgramCounter),
    /// The byte at `ip` is not a recognized opcode id.
    #[error("unknown opcode byte {0:#04x} at {1}")]
    UnknownOpcode(u8, ProgramCounter),
    /// The opcode requires a two-byte operand that isn't fully present.
    #[error("truncated operand for opcode at {0}")]
    TruncatedOperand(ProgramCounter),
    /// The opcode is a recognized id the interpreter has no working handler for.
    #[error("opcode {0} is recognized but not implemented")]
    NotImplemented(&'static str),
}

/// Decodes the instruction starting at `ip` in `code`.
/// # Errors
/// See [`DecodeError`].
pub fn decode(code: &CodeObject, ip: ProgramCounter) -> Result<Instruction, DecodeError> {
    let bytes = &code.bytecode;
    let offset = usize::from(ip);
    let byte = *bytes.get(offset).ok_or(DecodeError::OutOfBounds(ip))?;
    let opcode = Opcode::from_u8(byte).ok_or(DecodeError::UnknownOpcode(byte, ip))?;

    let (arg, next_ip) = if byte >= HAS_ARG_THRESHOLD {
        let low = *bytes.get(offset + 1).ok_or(DecodeError::TruncatedOperand(ip))?;
        let high = *bytes.get(offset + 2).ok_or(DecodeError::TruncatedOperand(ip))?;
        let value = u16::from(low) | (u16::from(high) << 8);
        (Some(value), ip.offset(3).map_err(|_| DecodeError::TruncatedOperand(ip))?)
    } else {
        (None, ip.offset(1).map_err(|_| DecodeError::OutOfBounds(ip))?)
    };

    let line = code.lines.line_number(ip);
    Ok(Instruction { opcode, arg, next_ip, line })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::{LineMap, LineTableEntry};

    fn code(bytecode: Vec<u8>) -> CodeObject {
        CodeObject::new(
            bytecode,
            vec![],
            vec![],
            vec![],
            0,
            1,
            LineMap::new(1, vec![LineTableEntry { byte_delta: 0, line_delta: 0 }], vec!["pass".into()]),
            None,
        )
    }

    #[test]
    fn decodes_no_arg_opcode() {
        let c = code(vec![Opcode::Nop as u8]);
        let inst = decode(&c, ProgramCounter::ZERO).unwrap();
        assert_eq!(inst.opcode, Opcode::Nop);
        assert_eq!(inst.arg, None);
        assert_eq!(inst.next_ip, ProgramCounter::from(1));
    }

    #[test]
    fn decodes_has_arg_opcode() {
        let c = code(vec![Opcode::LoadConst as u8, 0x05, 0x00]);
        let inst = decode(&c, ProgramCounter::ZERO).unwrap();
        assert_eq!(inst.opcode, Opcode::LoadConst);
        assert_eq!(inst.arg, Some(5));
        assert_eq!(inst.next_ip, ProgramCounter::from(3));
    }

    #[test]
    fn rejects_unknown_byte() {
        let c = code(vec![0xFF]);
        assert!(matches!(decode(&c, ProgramCounter::ZERO), Err(DecodeError::UnknownOpcode(0xFF, _))));
    }

    #[test]
    fn rejects_truncated_operand() {
        let c = code(vec![Opcode::LoadConst as u8, 0x05]);
        assert!(matches!(decode(&c, ProgramCounter::ZERO), Err(DecodeError::TruncatedOperand(_))));
    }
}
