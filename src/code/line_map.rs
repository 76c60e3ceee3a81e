//! Translation from instruction offsets to source lines.

use super::ProgramCounter;

/// A single `(byte_delta, line_delta)` step in the compressed line table.
///
/// Walking the deltas while accumulating an address reconstructs the line
/// number active at any instruction offset without storing one entry per
/// instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineTableEntry {
    /// Bytes of bytecode covered before the line advances.
    pub byte_delta: u16,
    /// How much the source line advances after those bytes.
    pub line_delta: u16,
}

/// Maps bytecode offsets to source lines and serves source text to the debugger.
#[derive(Debug, Clone)]
pub struct LineMap {
    first_lineno: u32,
    lnotab: Vec<LineTableEntry>,
    source_lines: Vec<String>,
}

impl LineMap {
    /// Builds a line map from a code object's first line, its delta table, and the
    /// full source text split into lines.
    #[must_use]
    pub fn new(first_lineno: u32, lnotab: Vec<LineTableEntry>, source_lines: Vec<String>) -> Self {
        Self {
            first_lineno,
            lnotab,
            source_lines,
        }
    }

    /// Resolves the source line active at the given instruction offset.
    ///
    /// Walks the delta table accumulating a byte address; returns
    /// `first_lineno + Σ line_delta` for the largest prefix whose accumulated
    /// address does not exceed `ip`.
    #[must_use]
    pub fn line_number(&self, ip: ProgramCounter) -> u32 {
        let ip = u16::from(ip);
        let mut address: u32 = 0;
        let mut line: u32 = 0;
        for entry in &self.lnotab {
            address += u32::from(entry.byte_delta);
            if address > u32::from(ip) {
                return line + self.first_lineno;
            }
            line += u32::from(entry.line_delta);
        }
        line + self.first_lineno
    }

    /// Returns a single 1-based source line.
    /// # Errors
    /// [`InvalidLine`] if `lineno` is past the end of the source buffer.
    pub fn source_line(&self, lineno: u32) -> Result<&str, InvalidLine> {
        self.source_lines
            .get(lineno.checked_sub(1).ok_or(InvalidLine(lineno))? as usize)
            .map(String::as_str)
            .ok_or(InvalidLine(lineno))
    }

    /// Renders the whole source, one line-numbered line per row.
    #[must_use]
    pub fn all_source_lines(&self) -> String {
        self.source_lines
            .iter()
            .enumerate()
            .map(|(i, line)| format!("{}\t{line}", i + 1))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Renders a windowed snippet around `lineno`: up to two lines before, the
    /// target line marked with an arrow, and the remainder of a five-line window
    /// after it (clamped to the source bounds).
    /// # Errors
    /// [`InvalidLine`] if `lineno` is past the end of the source buffer.
    pub fn surrounding_snippet(&self, lineno: u32) -> Result<String, InvalidLine> {
        if lineno == 0 || lineno as usize > self.source_lines.len() {
            return Err(InvalidLine(lineno));
        }
        let target = (lineno - 1) as usize;
        let start = target.saturating_sub(2);
        let window_needed = 5usize.saturating_sub(target - start);
        let end = (target + window_needed).min(self.source_lines.len().saturating_sub(1));

        let mut out = String::new();
        for (i, line) in self.source_lines[start..=end].iter().enumerate() {
            let i = start + i;
            if i == target {
                out.push_str(" ---> ");
            } else {
                out.push_str("      ");
            }
            out.push_str(&format!("{}\t{line}\n", i + 1));
        }
        Ok(out)
    }
}

/// The requested line is past the end of the source buffer.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid line number {0}")]
pub struct InvalidLine(u32);

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> LineMap {
        // first_lineno = 1; two instructions on line 1 (bytes 0-2), then line 2 (bytes 2-4).
        LineMap::new(
            1,
            vec![
                LineTableEntry {
                    byte_delta: 2,
                    line_delta: 1,
                },
                LineTableEntry {
                    byte_delta: 2,
                    line_delta: 1,
                },
            ],
            vec!["a = 1".into(), "b = 2".into(), "return a + b".into()],
        )
    }

    #[test]
    fn line_number_walks_deltas() {
        let map = sample();
        assert_eq!(map.line_number(ProgramCounter::from(0)), 1);
        assert_eq!(map.line_number(ProgramCounter::from(1)), 1);
        assert_eq!(map.line_number(ProgramCounter::from(2)), 2);
        assert_eq!(map.line_number(ProgramCounter::from(4)), 3);
    }

    #[test]
    fn line_number_is_monotonic() {
        let map = sample();
        let mut last = 0;
        for ip in 0..10u16 {
            let line = map.line_number(ProgramCounter::from(ip));
            assert!(line >= last);
            last = line;
        }
    }

    #[test]
    fn source_line_out_of_range() {
        let map = sample();
        assert!(map.source_line(4).is_err());
        assert!(map.source_line(0).is_err());
        assert_eq!(map.source_line(1).unwrap(), "a = 1");
    }

    #[test]
    fn snippet_marks_target_line() {
        let map = sample();
        let snippet = map.surrounding_snippet(2).unwrap();
        assert!(snippet.contains(" ---> 2\tb = 2"));
        assert!(snippet.contains("      1\ta = 1"));
        assert!(snippet.contains("      3\treturn a + b"));
    }

    #[test]
    fn snippet_clamps_at_start_of_source() {
        let map = sample();
        let snippet = map.surrounding_snippet(1).unwrap();
        assert!(snippet.starts_with(" ---> 1\ta = 1"));
    }
}
