//! Edit descriptors.

use rowan::{TextRange, TextSize};

use crate::error::ParseError;

/// One contiguous replacement: bytes `[start_byte, old_end_byte)` of the old
/// source became bytes `[start_byte, new_end_byte)` of the new source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edit {
    pub start_byte: TextSize,
    pub old_end_byte: TextSize,
    pub new_end_byte: TextSize,
}

impl Edit {
    pub fn new(start_byte: u32, old_end_byte: u32, new_end_byte: u32) -> Self {
        Self {
            start_byte: start_byte.into(),
            old_end_byte: old_end_byte.into(),
            new_end_byte: new_end_byte.into(),
        }
    }

    /// Replace `range` of the old source with `replacement`.
    pub fn replace(range: TextRange, replacement: &str) -> Self {
        Self {
            start_byte: range.start(),
            old_end_byte: range.end(),
            new_end_byte: range.start() + TextSize::of(replacement),
        }
    }

    pub fn insert(offset: TextSize, text: &str) -> Self {
        Self::replace(TextRange::empty(offset), text)
    }

    pub fn delete(range: TextRange) -> Self {
        Self::replace(range, "")
    }

    /// An edit that changes nothing at `offset`.
    pub fn null(offset: TextSize) -> Self {
        Self::insert(offset, "")
    }

    pub fn old_range(&self) -> TextRange {
        TextRange::new(self.start_byte, self.old_end_byte)
    }

    pub fn new_range(&self) -> TextRange {
        TextRange::new(self.start_byte, self.new_end_byte)
    }

    /// Signed change in source length.
    pub fn delta(&self) -> i64 {
        i64::from(u32::from(self.new_end_byte)) - i64::from(u32::from(self.old_end_byte))
    }

    /// Maps an old offset at or after `old_end_byte` into the new source.
    pub fn shift(&self, old_offset: TextSize) -> TextSize {
        old_offset - self.old_end_byte + self.new_end_byte
    }

    /// Maps a new offset at or after `new_end_byte` back into the old source.
    pub fn unshift(&self, new_offset: TextSize) -> TextSize {
        new_offset - self.new_end_byte + self.old_end_byte
    }

    /// Check that this edit turns a source of `old_len` bytes into one of
    /// `new_len` bytes.
    pub fn validate(&self, old_len: TextSize, new_len: TextSize) -> Result<(), ParseError> {
        if self.start_byte > self.old_end_byte || self.start_byte > self.new_end_byte {
            return Err(ParseError::InvalidEdit(format!(
                "edit starts at {:?}, after its end",
                self.start_byte
            )));
        }
        if self.old_end_byte > old_len {
            return Err(ParseError::InvalidEdit(format!(
                "old end {:?} is past the previous source length {:?}",
                self.old_end_byte, old_len
            )));
        }
        if self.new_end_byte > new_len
            || old_len - self.old_end_byte != new_len - self.new_end_byte
        {
            return Err(ParseError::InvalidEdit(format!(
                "edit {:?} -> {:?} does not turn {:?} bytes into {:?}",
                self.old_range(),
                self.new_range(),
                old_len,
                new_len
            )));
        }
        Ok(())
    }

    /// Apply the edit to `old`, with `replacement` as the new bytes.
    pub fn apply(&self, old: &str, replacement: &str) -> Result<String, ParseError> {
        let (start, end) = (usize::from(self.start_byte), usize::from(self.old_end_byte));
        if self.start_byte > self.new_end_byte
            || TextSize::of(replacement) != self.new_end_byte - self.start_byte
        {
            return Err(ParseError::InvalidEdit(
                "replacement length does not match the edit".into(),
            ));
        }
        if start > end
            || end > old.len()
            || !old.is_char_boundary(start)
            || !old.is_char_boundary(end)
        {
            return Err(ParseError::InvalidEdit(format!(
                "range {:?} is not valid in the source",
                self.old_range()
            )));
        }
        let mut text = String::with_capacity(old.len() - (end - start) + replacement.len());
        text.push_str(&old[..start]);
        text.push_str(replacement);
        text.push_str(&old[end..]);
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_number() {
        let edit = Edit::replace(TextRange::new(4.into(), 5.into()), "42");
        assert_eq!(edit, Edit::new(4, 5, 6));
        assert_eq!(edit.delta(), 1);
        assert_eq!(edit.apply("x = 5;", "42").unwrap(), "x = 42;");
        assert!(edit.validate(6.into(), 7.into()).is_ok());
    }

    #[test]
    fn test_shift_maps_trailing_offsets() {
        let edit = Edit::new(4, 5, 6);
        assert_eq!(edit.shift(5.into()), TextSize::new(6));
    }

    #[test]
    fn test_unshift_maps_back_across_shrinking_edit() {
        // "a = 1;\nb" with "\nb" removed: new offset 6 was old offset 8
        let edit = Edit::delete(TextRange::new(6.into(), 8.into()));
        assert_eq!(edit.unshift(6.into()), TextSize::new(8));
        assert_eq!(edit.shift(edit.unshift(9.into())), TextSize::new(9));

        let grow = Edit::new(4, 5, 6);
        assert_eq!(grow.unshift(6.into()), TextSize::new(5));
    }

    #[test]
    fn test_validate_rejects_length_mismatch() {
        let edit = Edit::new(4, 5, 6);
        assert!(matches!(
            edit.validate(6.into(), 9.into()),
            Err(ParseError::InvalidEdit(_))
        ));
        assert!(Edit::new(3, 2, 2).validate(6.into(), 6.into()).is_err());
    }

    #[test]
    fn test_apply_rejects_split_character() {
        let edit = Edit::new(1, 2, 1);
        assert!(edit.apply("é", "").is_err());
    }

    #[test]
    fn test_null_edit() {
        let edit = Edit::null(3.into());
        assert_eq!(edit.delta(), 0);
        assert_eq!(edit.apply("abcdef", "").unwrap(), "abcdef");
    }
}
