//! SIMD-accelerated XML scanning using memchr
//!
//! Uses memchr crate for fast byte searching with SIMD acceleration:
//! - SSE2 (default x86_64)
//! - AVX2 (runtime detection)
//! - NEON (aarch64)
//!
//! The scanner also keeps a running line count so every token can report
//! the 1-based line its markup starts on.

use memchr::{memchr, memchr_iter, memmem};

/// Scanner for XML delimiter detection
pub struct Scanner<'a> {
    input: &'a [u8],
    pos: usize,
    /// Position up to which newlines have been counted
    line_pos: usize,
    /// 1-based line number at `line_pos`
    line: u32,
}

impl<'a> Scanner<'a> {
    /// Create a new scanner for the given input
    #[inline]
    pub fn new(input: &'a [u8]) -> Self {
        Scanner {
            input,
            pos: 0,
            line_pos: 0,
            line: 1,
        }
    }

    /// Get the current position
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Set the current position
    #[inline]
    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos.min(self.input.len());
    }

    /// Check if we've reached the end
    #[inline]
    pub fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Get remaining bytes
    #[inline]
    pub fn remaining(&self) -> &'a [u8] {
        &self.input[self.pos..]
    }

    /// Get a slice from start to end positions
    #[inline]
    pub fn slice(&self, start: usize, end: usize) -> &'a [u8] {
        &self.input[start..end]
    }

    /// Peek at current byte without advancing
    #[inline]
    pub fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    /// Peek at byte at offset from current position
    #[inline]
    pub fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    /// Advance by n bytes
    #[inline]
    pub fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.input.len());
    }

    /// Skip whitespace characters (space, tab, newline, carriage return)
    #[inline]
    pub fn skip_whitespace(&mut self) {
        while self.pos < self.input.len() {
            match self.input[self.pos] {
                b' ' | b'\t' | b'\n' | b'\r' => self.pos += 1,
                _ => break,
            }
        }
    }

    /// 1-based line number of `pos`.
    ///
    /// Positions are expected to be queried in non-decreasing order, which is
    /// how the tokenizer walks the input; an earlier position recounts from
    /// the start.
    pub fn line_at(&mut self, pos: usize) -> u32 {
        let pos = pos.min(self.input.len());
        if pos < self.line_pos {
            self.line_pos = 0;
            self.line = 1;
        }
        let newlines = memchr_iter(b'\n', &self.input[self.line_pos..pos]).count();
        self.line += newlines as u32;
        self.line_pos = pos;
        self.line
    }

    /// Find next '<' (tag start) using SIMD
    #[inline]
    pub fn find_tag_start(&self) -> Option<usize> {
        memchr(b'<', &self.input[self.pos..]).map(|i| self.pos + i)
    }

    /// Find tag end while handling quotes properly
    /// Returns the position of '>' that is not inside quotes
    pub fn find_tag_end_quoted(&self) -> Option<usize> {
        let mut pos = self.pos;
        let mut in_single_quote = false;
        let mut in_double_quote = false;

        while pos < self.input.len() {
            match self.input[pos] {
                b'"' if !in_single_quote => in_double_quote = !in_double_quote,
                b'\'' if !in_double_quote => in_single_quote = !in_single_quote,
                b'>' if !in_single_quote && !in_double_quote => return Some(pos),
                _ => {}
            }
            pos += 1;
        }
        None
    }

    /// Find next occurrence of a specific byte
    #[inline]
    pub fn find_byte(&self, byte: u8) -> Option<usize> {
        memchr(byte, &self.input[self.pos..]).map(|i| self.pos + i)
    }

    /// Find the next occurrence of a byte sequence
    #[inline]
    pub fn find_seq(&self, needle: &[u8]) -> Option<usize> {
        memmem::find(&self.input[self.pos..], needle).map(|i| self.pos + i)
    }

    /// Find `</name` (ASCII case-insensitive) from the current position.
    /// Used to end raw-text elements such as `<script>` in HTML mode.
    pub fn find_close_tag_ci(&self, name: &[u8]) -> Option<usize> {
        let hay = &self.input[self.pos..];
        let needed = name.len() + 2;
        for i in memchr_iter(b'<', hay) {
            if i + needed > hay.len() {
                return None;
            }
            if hay[i + 1] == b'/' && hay[i + 2..i + needed].eq_ignore_ascii_case(name) {
                let after = hay.get(i + needed).copied();
                if matches!(after, None | Some(b'>' | b' ' | b'\t' | b'\n' | b'\r' | b'/')) {
                    return Some(self.pos + i);
                }
            }
        }
        None
    }

    /// Check if input starts with a byte sequence at current position
    #[inline]
    pub fn starts_with(&self, needle: &[u8]) -> bool {
        self.input[self.pos..].starts_with(needle)
    }

    /// Case-insensitive variant of `starts_with` for ASCII needles
    #[inline]
    pub fn starts_with_ci(&self, needle: &[u8]) -> bool {
        let rest = &self.input[self.pos..];
        rest.len() >= needle.len() && rest[..needle.len()].eq_ignore_ascii_case(needle)
    }

    /// Read an XML name (starts with letter/underscore, continues with letters/digits/hyphens/underscores/periods)
    pub fn read_name(&mut self) -> Option<&'a [u8]> {
        let start = self.pos;

        if start >= self.input.len() {
            return None;
        }

        if !is_name_start_char(self.input[start]) {
            return None;
        }

        self.pos += 1;

        while self.pos < self.input.len() && is_name_char(self.input[self.pos]) {
            self.pos += 1;
        }

        Some(&self.input[start..self.pos])
    }
}

/// Check if byte is valid XML name start character
/// Allows ASCII letters, underscore, colon, and non-ASCII (UTF-8 Unicode)
#[inline]
pub fn is_name_start_char(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'_' | b':') || b >= 0x80
}

/// Check if byte is valid XML name character
/// Allows ASCII alphanumeric, punctuation, and non-ASCII (UTF-8 Unicode)
#[inline]
pub fn is_name_char(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_' | b'-' | b'.' | b':') || b >= 0x80
}

/// Check if byte is XML whitespace
#[inline]
pub fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_tag_start() {
        let scanner = Scanner::new(b"hello <world>");
        assert_eq!(scanner.find_tag_start(), Some(6));
    }

    #[test]
    fn test_find_tag_end_quoted() {
        let scanner = Scanner::new(b"<a attr=\">test\">content");
        assert_eq!(scanner.find_tag_end_quoted(), Some(15));
    }

    #[test]
    fn test_read_name() {
        let mut scanner = Scanner::new(b"element-name>");
        assert_eq!(scanner.read_name(), Some(b"element-name" as &[u8]));
        assert_eq!(scanner.position(), 12);
    }

    #[test]
    fn test_skip_whitespace() {
        let mut scanner = Scanner::new(b"  \t\n hello");
        scanner.skip_whitespace();
        assert_eq!(scanner.position(), 5);
    }

    #[test]
    fn test_line_numbers_advance_with_newlines() {
        let mut scanner = Scanner::new(b"<a>\n<b/>\n\n<c/></a>");
        assert_eq!(scanner.line_at(0), 1);
        assert_eq!(scanner.line_at(4), 2);
        assert_eq!(scanner.line_at(11), 4);
        // Going backwards recounts from the start
        assert_eq!(scanner.line_at(4), 2);
    }

    #[test]
    fn test_close_tag_search_ignores_case_and_prefixes() {
        let scanner = Scanner::new(b"if (a</b) {} </scripts></SCRIPT>");
        assert_eq!(scanner.find_close_tag_ci(b"script"), Some(23));
    }
}
