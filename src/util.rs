use core::cmp::Ordering;

pub trait SliceHelp {
    type Item;

    /// Given that self is sorted according to f, returns the range of indexes
    /// where f indicates equal elements.
    fn equal_range_by<'a, F>(&'a self, f: F) -> core::ops::Range<usize>
    where
        F: FnMut(&'a Self::Item) -> Ordering;
}

impl<T> SliceHelp for [T] {
    type Item = T;
    fn equal_range_by<'a, F>(&'a self, mut f: F) -> core::ops::Range<usize>
    where
        F: FnMut(&'a Self::Item) -> Ordering,
    {
        let left = self
            .binary_search_by(|v| f(v).then(Ordering::Greater))
            .unwrap_err();
        let right = self[left..]
            .binary_search_by(|v| f(v).then(Ordering::Less))
            .unwrap_err()
            + left;
        left..right
    }
}

/// Convert a u32 to a char, substituting U+FFFD for surrogates and values
/// out of range.
#[inline]
pub fn to_char_sat(c: u32) -> char {
    char::from_u32(c).unwrap_or('\u{FFFD}')
}

/// \return the simple (single char) lowercase and uppercase mappings of \p c.
/// Multi-char mappings like 'ß' -> "SS" are ignored.
pub fn simple_case_variants(c: char) -> [char; 2] {
    fn single(mut it: impl Iterator<Item = char>, orig: char) -> char {
        match (it.next(), it.next()) {
            (Some(m), None) => m,
            _ => orig,
        }
    }
    [
        single(c.to_lowercase(), c),
        single(c.to_uppercase(), c),
    ]
}

/// Convert char offsets \p start..\p end of \p text to byte offsets.
pub fn char_range_to_bytes(text: &str, start: usize, end: usize) -> (usize, usize) {
    let mut indices = text.char_indices().map(|(b, _)| b).chain(Some(text.len()));
    let begin = indices.nth(start).unwrap_or(text.len());
    let finish = if end > start {
        indices.nth(end - start - 1).unwrap_or(text.len())
    } else {
        begin
    };
    (begin, finish)
}

/// Replace the chars in \p start..\p end of \p text with \p replacement.
/// Offsets beyond the end of the text are clamped.
pub fn splice_chars(text: &str, start: usize, end: usize, replacement: &str) -> String {
    let (begin, finish) = char_range_to_bytes(text, start, end.max(start));
    let mut result = String::with_capacity(text.len() + replacement.len());
    result.push_str(&text[..begin]);
    result.push_str(replacement);
    result.push_str(&text[finish..]);
    result
}
