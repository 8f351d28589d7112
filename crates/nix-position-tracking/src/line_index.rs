//! Line index for efficient UTF-16 position calculations.
//!
//! LSP positions are `(line, UTF-16 code-unit column)` pairs while the lexer
//! and all analyses work with byte offsets into the UTF-8 source. This cache
//! stores line-start offsets so conversions are O(log n) in the number of
//! lines plus O(line length).

use thiserror::Error;

/// Error produced when an LSP position cannot be mapped into the document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PositionError {
    /// The requested line exceeds the number of lines in the document.
    #[error("line {line} is out of range (document has {max} lines)")]
    LineOutOfRange { line: u32, max: u32 },
}

/// Byte offsets of every line start in a document.
#[derive(Debug, Clone)]
pub struct LineStartsCache {
    line_starts: Vec<usize>,
}

impl LineStartsCache {
    pub fn new(text: &str) -> Self {
        let mut ls = vec![0];
        let mut i = 0;
        let b = text.as_bytes();
        while i < b.len() {
            if b[i] == b'\n' {
                ls.push(i + 1);
            } else if b[i] == b'\r' {
                if i + 1 < b.len() && b[i + 1] == b'\n' {
                    ls.push(i + 2);
                    i += 1;
                } else {
                    ls.push(i + 1);
                }
            }
            i += 1;
        }
        Self { line_starts: ls }
    }

    /// Number of lines in the indexed document.
    pub fn line_count(&self) -> u32 {
        self.line_starts.len() as u32
    }

    /// Convert a byte offset to a `(line, UTF-16 column)` position.
    pub fn offset_to_position(&self, text: &str, offset: usize) -> (u32, u32) {
        let offset = offset.min(text.len());
        let line = self.line_starts.binary_search(&offset).unwrap_or_else(|i| i.saturating_sub(1));
        let ls = self.line_starts[line];
        (line as u32, text[ls..offset].chars().map(|c| c.len_utf16()).sum::<usize>() as u32)
    }

    /// Convert a `(line, UTF-16 column)` position to a byte offset.
    ///
    /// Columns beyond the end of the line snap to the end of the line; a line
    /// beyond the end of the document is an error so edit application can
    /// fail the whole change.
    pub fn position_to_offset(
        &self,
        text: &str,
        line: u32,
        character: u32,
    ) -> Result<usize, PositionError> {
        let li = line as usize;
        if li >= self.line_starts.len() {
            return Err(PositionError::LineOutOfRange { line, max: self.line_count() });
        }
        let ls = self.line_starts[li];
        let le = if li + 1 < self.line_starts.len() {
            // Exclude the line terminator so out-of-range columns snap before it.
            let ns = self.line_starts[li + 1];
            let b = text.as_bytes();
            let mut end = ns;
            while end > ls && (b[end - 1] == b'\n' || b[end - 1] == b'\r') {
                end -= 1;
            }
            end
        } else {
            text.len()
        };
        let lt = &text[ls..le];
        let mut uc = 0usize;
        let mut bo = 0usize;
        for ch in lt.chars() {
            if uc >= character as usize {
                break;
            }
            uc += ch.len_utf16();
            bo += ch.len_utf8();
        }
        Ok(ls + bo.min(lt.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn ascii_round_trip() {
        let text = "let\n  x = 1;\nin x\n";
        let cache = LineStartsCache::new(text);
        let (line, col) = cache.offset_to_position(text, 6);
        assert_eq!((line, col), (1, 2));
        assert_eq!(cache.position_to_offset(text, 1, 2), Ok(6));
    }

    #[test]
    fn utf16_columns_for_astral_chars() {
        // '😀' is 4 bytes in UTF-8 and 2 code units in UTF-16.
        let text = "a😀b";
        let cache = LineStartsCache::new(text);
        assert_eq!(cache.offset_to_position(text, 5), (0, 3));
        assert_eq!(cache.position_to_offset(text, 0, 3), Ok(5));
    }

    #[test]
    fn column_snaps_to_end_of_line() {
        let text = "ab\ncd\n";
        let cache = LineStartsCache::new(text);
        assert_eq!(cache.position_to_offset(text, 0, 99), Ok(2));
    }

    #[test]
    fn line_out_of_range_is_an_error() {
        let text = "ab\n";
        let cache = LineStartsCache::new(text);
        assert!(cache.position_to_offset(text, 5, 0).is_err());
    }

    proptest! {
        /// positionToOffset(s, offsetToPosition(s, o)) == o for every char
        /// boundary o in s.
        #[test]
        fn position_round_trip(text in "[ -~\\n\\téé😀]{0,64}") {
            let cache = LineStartsCache::new(&text);
            for (o, _) in text.char_indices() {
                let (line, col) = cache.offset_to_position(&text, o);
                prop_assert_eq!(cache.position_to_offset(&text, line, col), Ok(o));
            }
            let (line, col) = cache.offset_to_position(&text, text.len());
            prop_assert_eq!(cache.position_to_offset(&text, line, col), Ok(text.len()));
        }
    }
}
