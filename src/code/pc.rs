/// A byte offset into a [`CodeObject`](super::CodeObject)'s bytecode stream.
#[derive(Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, derive_more::Display, derive_more::From)]
#[display(fmt = "#{_0:05}")]
#[repr(transparent)]
pub struct ProgramCounter(u16);

impl ProgramCounter {
    /// The entry point of a program.
    pub const ZERO: Self = Self(0);

    /// Checks whether this is the entry point of a program.
    #[must_use]
    pub const fn is_entry_point(&self) -> bool {
        self.0 == 0
    }

    /// Offsets this program counter by a signed delta.
    /// # Errors
    /// [`InvalidOffset`] if the result does not fit in a `u16`.
    pub fn offset(&self, delta: i32) -> Result<Self, InvalidOffset> {
        let result = i32::from(self.0) + delta;
        u16::try_from(result)
            .map(Self)
            .map_err(|_| InvalidOffset(delta))
    }
}

impl From<ProgramCounter> for u16 {
    fn from(value: ProgramCounter) -> Self {
        value.0
    }
}

impl From<ProgramCounter> for usize {
    fn from(value: ProgramCounter) -> Self {
        usize::from(value.0)
    }
}

/// An error raised when offsetting a [`ProgramCounter`] out of `u16` range.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid jump offset {0}")]
pub struct InvalidOffset(i32);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_point() {
        assert!(ProgramCounter::ZERO.is_entry_point());
        assert!(!ProgramCounter::from(1).is_entry_point());
    }

    #[test]
    fn offset_forward_and_backward() {
        let pc = ProgramCounter::from(10);
        assert_eq!(pc.offset(5).unwrap(), ProgramCounter::from(15));
        assert_eq!(pc.offset(-5).unwrap(), ProgramCounter::from(5));
    }

    #[test]
    fn offset_out_of_range() {
        let pc = ProgramCounter::from(10);
        assert!(pc.offset(i32::from(u16::MAX)).is_err());
        assert!(pc.offset(-11).is_err());
    }

    #[test]
    fn display_is_zero_padded() {
        assert_eq!(format!("{}", ProgramCounter::from(7)), "#00007");
    }
}
