//! The input cursor shared by the VM and the tokenizer.

use memchr::{memchr_iter, memrchr};

/// A random access cursor over the Unicode scalar values of some text.
///
/// Positions are char offsets in `0..=len()`. The cursor sits *between*
/// characters: reading forward at position `p` sees `char_at(p)`, reading
/// backward sees `char_at(p - 1)`.
#[derive(Debug, Clone, Default)]
pub struct Tape {
    text: String,
    chars: Vec<char>,
    // byte_offsets[i] is the byte offset of char i; one extra entry for the end.
    byte_offsets: Vec<usize>,
    index: usize,
}

impl Tape {
    pub fn new(text: &str) -> Tape {
        let mut tape = Tape {
            text: String::new(),
            chars: Vec::new(),
            byte_offsets: vec![0],
            index: 0,
        };
        tape.push(text);
        tape
    }

    /// Append \p content to the end of the input. The cursor is unaffected.
    fn push(&mut self, content: &str) {
        let base = self.text.len();
        self.byte_offsets.pop();
        for (offset, c) in content.char_indices() {
            self.chars.push(c);
            self.byte_offsets.push(base + offset);
        }
        self.text.push_str(content);
        self.byte_offsets.push(self.text.len());
    }

    /// The number of chars in the input.
    #[inline]
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// The cursor position.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Move the cursor, clamped to the input.
    #[inline]
    pub fn set_index(&mut self, index: usize) {
        self.index = index.min(self.len());
    }

    /// Whether there is input to the right of the cursor.
    #[inline]
    pub fn has_more(&self) -> bool {
        self.index < self.len()
    }

    /// The char at the cursor, if any.
    #[inline]
    pub fn current(&self) -> Option<char> {
        self.char_at(self.index)
    }

    #[inline]
    pub fn char_at(&self, pos: usize) -> Option<char> {
        self.chars.get(pos).copied()
    }

    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// \return the byte offset of char position \p pos.
    #[inline]
    pub fn byte_offset(&self, pos: usize) -> usize {
        self.byte_offsets[pos.min(self.len())]
    }

    /// \return the text between char positions \p start and \p end.
    pub fn substring(&self, start: usize, end: usize) -> &str {
        let end = end.min(self.len());
        let start = start.min(end);
        &self.text[self.byte_offset(start)..self.byte_offset(end)]
    }

    /// \return the 1-based (line, column) of char position \p pos.
    /// Lines are separated by '\n'; columns count chars.
    pub fn line_col(&self, pos: usize) -> (usize, usize) {
        let pos = pos.min(self.len());
        let prefix = &self.text.as_bytes()[..self.byte_offset(pos)];
        let line = memchr_iter(b'\n', prefix).count() + 1;
        let line_start = memrchr(b'\n', prefix).map_or(0, |nl| nl + 1);
        let column = self.text[line_start..self.byte_offset(pos)].chars().count() + 1;
        (line, column)
    }
}

impl From<&str> for Tape {
    fn from(text: &str) -> Tape {
        Tape::new(text)
    }
}
