//! Builds a [`CodeObject`] from a small textual mnemonic listing.
//!
//! Stands in for the compiler front end this crate treats as an external
//! collaborator: a `.header`/`.consts`/`.names`/`.locals`/`.lines`/`.source`
//! directive preamble, a `.code` block of one instruction per line, and
//! zero or more nested `.block NAME` / `.endblock` sections supplying the
//! code objects a `code NAME` constant refers to (a class body and its
//! methods, or a function's body).

use std::collections::HashMap;
use std::rc::Rc;

use crate::code::{CodeObject, ConstantValue, LineMap, LineTableEntry};
use crate::interpreter::opcode::Opcode;

/// A failure parsing an assembly listing.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AssembleError {
    /// A line outside any recognized directive or code body.
    #[error("line {0}: unrecognized line {1:?}")]
    UnrecognizedLine(usize, String),
    /// An instruction line named a mnemonic with no matching opcode.
    #[error("line {0}: unknown opcode {1:?}")]
    UnknownOpcode(usize, String),
    /// A numeric field failed to parse.
    #[error("line {0}: invalid number {1:?}")]
    InvalidNumber(usize, String),
    /// A `code NAME` constant referenced a block never defined with `.block NAME`.
    #[error("undefined block {0:?}")]
    UndefinedBlock(String),
    /// A `.block` was never closed with `.endblock`.
    #[error("line {0}: unterminated block {1:?}")]
    UnterminatedBlock(usize, String),
}

/// Parses a complete assembly listing into its top-level [`CodeObject`].
/// # Errors
/// [`AssembleError`] on any malformed directive, instruction, or block reference.
pub fn assemble(source: &str) -> Result<CodeObject, AssembleError> {
    let lines: Vec<(usize, &str)> = source
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, strip_comment(l).trim()))
        .filter(|(_, l)| !l.is_empty())
        .collect();

    let mut blocks: HashMap<String, Rc<CodeObject>> = HashMap::new();
    let top_level = collect_blocks(&lines, &mut blocks)?;

    let top = parse_unit(&top_level, &blocks)?;
    Ok(top)
}

fn strip_comment(line: &str) -> &str {
    line.split_once(';').map_or(line, |(code, _)| code)
}

/// First pass: splits the token stream into the top-level unit's lines and
/// a table of named nested blocks, each parsed into its own [`CodeObject`].
/// Returns the top-level lines in their original relative order, wherever
/// in the file they appear around the `.block`/`.endblock` sections.
fn collect_blocks<'a>(
    lines: &[(usize, &'a str)],
    blocks: &mut HashMap<String, Rc<CodeObject>>,
) -> Result<Vec<(usize, &'a str)>, AssembleError> {
    let mut top_level = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let (lineno, text) = lines[i];
        if let Some(name) = text.strip_prefix(".block ") {
            let name = name.trim().to_string();
            let start = i + 1;
            let mut end = start;
            while end < lines.len() && lines[end].1 != ".endblock" {
                end += 1;
            }
            if end >= lines.len() {
                return Err(AssembleError::UnterminatedBlock(lineno, name));
            }
            let body = parse_unit(&lines[start..end], blocks)?;
            blocks.insert(name, Rc::new(body));
            i = end + 1;
        } else {
            top_level.push(lines[i]);
            i += 1;
        }
    }
    Ok(top_level)
}

#[derive(Default)]
struct Directives {
    name: Option<String>,
    argcount: usize,
    first_lineno: u32,
    consts: Vec<ConstantValue>,
    names: Vec<String>,
    local_names: Vec<String>,
    line_points: Vec<(u16, u32)>,
    source_lines: Vec<String>,
    code: Vec<(usize, String)>,
}

fn parse_unit(lines: &[(usize, &str)], blocks: &HashMap<String, Rc<CodeObject>>) -> Result<CodeObject, AssembleError> {
    let mut d = Directives::default();
    let mut section = "";
    for &(lineno, text) in lines {
        if let Some(rest) = text.strip_prefix('.') {
            section = match rest {
                "header" => "header",
                "consts" => "consts",
                "names" => "names",
                "locals" => "locals",
                "lines" => "lines",
                "source" => "source",
                "code" => "code",
                other => return Err(AssembleError::UnrecognizedLine(lineno, format!(".{other}"))),
            };
            continue;
        }
        match section {
            "header" => parse_header_line(&mut d, lineno, text)?,
            "consts" => d.consts.push(parse_const_line(lineno, text, blocks)?),
            "names" => d.names.push(text.to_string()),
            "locals" => d.local_names.push(text.to_string()),
            "lines" => d.line_points.push(parse_line_point(lineno, text)?),
            "source" => d.source_lines.push(text.to_string()),
            "code" => d.code.push((lineno, text.to_string())),
            _ => return Err(AssembleError::UnrecognizedLine(lineno, text.to_string())),
        }
    }

    let bytecode = assemble_code(&d.code)?;
    let lines_map = build_line_map(d.first_lineno, d.line_points, d.source_lines, bytecode.len());

    Ok(CodeObject::new(
        bytecode,
        d.consts,
        d.names,
        d.local_names,
        d.argcount,
        d.first_lineno,
        lines_map,
        d.name,
    ))
}

fn parse_header_line(d: &mut Directives, lineno: usize, text: &str) -> Result<(), AssembleError> {
    let mut parts = text.splitn(2, char::is_whitespace);
    let key = parts.next().unwrap_or_default();
    let value = parts.next().unwrap_or_default().trim();
    match key {
        "name" => d.name = Some(value.to_string()),
        "argcount" => d.argcount = parse_num(lineno, value)? as usize,
        "firstline" => d.first_lineno = parse_num(lineno, value)? as u32,
        _ => return Err(AssembleError::UnrecognizedLine(lineno, text.to_string())),
    }
    Ok(())
}

fn parse_const_line(
    lineno: usize,
    text: &str,
    blocks: &HashMap<String, Rc<CodeObject>>,
) -> Result<ConstantValue, AssembleError> {
    let mut parts = text.splitn(2, char::is_whitespace);
    let kind = parts.next().unwrap_or_default();
    let value = parts.next().unwrap_or_default().trim();
    match kind {
        "int" => Ok(ConstantValue::Int(parse_num(lineno, value)?)),
        "float" => value
            .parse()
            .map(ConstantValue::Float)
            .map_err(|_| AssembleError::InvalidNumber(lineno, value.to_string())),
        "bool" => Ok(ConstantValue::Bool(value == "true")),
        "str" => Ok(ConstantValue::Str(value.to_string())),
        "none" => Ok(ConstantValue::None),
        "code" => blocks
            .get(value)
            .cloned()
            .map(ConstantValue::Code)
            .ok_or_else(|| AssembleError::UndefinedBlock(value.to_string())),
        _ => Err(AssembleError::UnrecognizedLine(lineno, text.to_string())),
    }
}

fn parse_line_point(lineno: usize, text: &str) -> Result<(u16, u32), AssembleError> {
    let mut parts = text.split_whitespace();
    let pc = parts.next().unwrap_or_default();
    let line = parts.next().unwrap_or_default();
    let pc = parse_num(lineno, pc)? as u16;
    let line = parse_num(lineno, line)? as u32;
    Ok((pc, line))
}

fn parse_num(lineno: usize, text: &str) -> Result<i64, AssembleError> {
    text.parse().map_err(|_| AssembleError::InvalidNumber(lineno, text.to_string()))
}

fn assemble_code(instructions: &[(usize, String)]) -> Result<Vec<u8>, AssembleError> {
    let mut bytes = Vec::new();
    for (lineno, text) in instructions {
        let mut parts = text.split_whitespace();
        let mnemonic = parts.next().unwrap_or_default();
        let opcode = Opcode::from_mnemonic(mnemonic).ok_or_else(|| AssembleError::UnknownOpcode(*lineno, mnemonic.to_string()))?;
        bytes.push(opcode as u8);
        if opcode.has_arg() {
            let arg_text = parts.next().unwrap_or("0");
            let arg: u16 = arg_text
                .parse()
                .map_err(|_| AssembleError::InvalidNumber(*lineno, arg_text.to_string()))?;
            bytes.push((arg & 0xFF) as u8);
            bytes.push((arg >> 8) as u8);
        }
    }
    Ok(bytes)
}

/// Compresses an explicit `(pc, line)` breakpoint list into an `lnotab`-style
/// delta table, appending a final span with an oversized `byte_delta`
/// so the last line stays active through the rest of the bytecode.
fn build_line_map(first_lineno: u32, mut points: Vec<(u16, u32)>, source: Vec<String>, code_len: usize) -> LineMap {
    if points.is_empty() {
        points.push((0, first_lineno));
    }
    points.sort_by_key(|&(pc, _)| pc);
    let mut entries = Vec::with_capacity(points.len());
    for i in 0..points.len() {
        let (pc, line) = points[i];
        if let Some(&(next_pc, next_line)) = points.get(i + 1) {
            entries.push(LineTableEntry {
                byte_delta: next_pc.saturating_sub(pc),
                line_delta: u16::try_from(next_line.saturating_sub(line)).unwrap_or(u16::MAX),
            });
        } else {
            let remaining = u16::try_from(code_len).unwrap_or(u16::MAX).saturating_sub(pc);
            entries.push(LineTableEntry {
                byte_delta: remaining.max(1),
                line_delta: 0,
            });
        }
    }
    let base = first_lineno + (points[0].1.saturating_sub(first_lineno));
    LineMap::new(base.min(points[0].1).max(first_lineno.min(points[0].1)), entries, source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assembles_arithmetic_expression() {
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
        let code = assemble(src).unwrap();
        assert_eq!(code.constants.len(), 3);
        assert_eq!(code.bytecode.last(), Some(&(Opcode::ReturnValue as u8)));
    }

    #[test]
    fn rejects_unknown_opcode() {
        let src = "
.header
name module
.code
NOT_A_REAL_OP
";
        assert!(matches!(assemble(src), Err(AssembleError::UnknownOpcode(_, _))));
    }

    #[test]
    fn resolves_nested_code_block_constants() {
        let src = "
.block Point.__init__
.header
name Point.__init__
argcount 3
firstline 2
.locals
self
a
b
.code
RETURN_VALUE
.endblock
.header
name Point
argcount 0
firstline 1
.consts
code Point.__init__
str Point.__init__
.code
LOAD_CONST 0
LOAD_CONST 1
MAKE_FUNCTION 0
RETURN_VALUE
";
        let code = assemble(src).unwrap();
        assert!(matches!(code.constants[0], ConstantValue::Code(_)));
    }
}
