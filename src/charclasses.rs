use crate::codepointset::{CodePointSet, Interval};

// Character classes like \d or \S, and the POSIX classes of bracket expressions.

/// Construct an interval from an inclusive range of char.
const fn r(first: char, last: char) -> Interval {
    Interval {
        first: first as u32,
        last: last as u32,
    }
}

/// Construct an interval from a single char.
const fn r1(c: char) -> Interval {
    Interval {
        first: c as u32,
        last: c as u32,
    }
}

// Note all of these are sorted.

pub const WORD_CHARS: [Interval; 4] = [r('0', '9'), r('A', 'Z'), r1('_'), r('a', 'z')];

pub const DIGITS: [Interval; 1] = [r('0', '9')];

/// White space and line terminators, as matched by \s.
pub const SPACES: [Interval; 10] = [
    // TAB LF VT FF CR
    r('\u{0009}', '\u{000D}'),
    r1('\u{0020}'),
    r1('\u{00A0}'),
    r1('\u{1680}'),
    // En Quad through Hair Space
    r('\u{2000}', '\u{200A}'),
    // LINE SEPARATOR, PARAGRAPH SEPARATOR
    r('\u{2028}', '\u{2029}'),
    r1('\u{202F}'),
    r1('\u{205F}'),
    r1('\u{3000}'),
    r1('\u{FEFF}'),
];

pub const LINE_TERMINATOR: [Interval; 3] =
    [r1('\u{000A}'), r1('\u{000D}'), r('\u{2028}', '\u{2029}')];

/// The built-in shorthand classes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CharClass {
    Digits,
    Spaces,
    Words,
}

impl CharClass {
    pub fn intervals(self) -> &'static [Interval] {
        match self {
            CharClass::Digits => &DIGITS,
            CharClass::Spaces => &SPACES,
            CharClass::Words => &WORD_CHARS,
        }
    }

    /// \return the escape letter for this class, uppercased if negated.
    pub fn escape_letter(self, negate: bool) -> char {
        let c = match self {
            CharClass::Digits => 'd',
            CharClass::Spaces => 's',
            CharClass::Words => 'w',
        };
        if negate {
            c.to_ascii_uppercase()
        } else {
            c
        }
    }

    /// \return the class for an escape letter like 'd' or 'S', with its negation.
    pub fn from_escape(c: char) -> Option<(CharClass, bool)> {
        match c {
            'd' => Some((CharClass::Digits, false)),
            'D' => Some((CharClass::Digits, true)),
            's' => Some((CharClass::Spaces, false)),
            'S' => Some((CharClass::Spaces, true)),
            'w' => Some((CharClass::Words, false)),
            'W' => Some((CharClass::Words, true)),
            _ => None,
        }
    }

    pub fn contains(self, c: char) -> bool {
        let cp = c as u32;
        self.intervals()
            .binary_search_by(|iv| iv.compare(cp))
            .is_ok()
    }

    pub fn to_set(self) -> CodePointSet {
        CodePointSet::from_sorted_disjoint_intervals(self.intervals().to_vec())
    }
}

/// \return whether \p c terminates a line for the purposes of ^, $ and `.`.
#[inline]
pub fn is_line_terminator(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

#[inline]
pub fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// \return the intervals of a POSIX bracket class like `alpha`, sorted.
pub fn posix_class(name: &str) -> Option<&'static [Interval]> {
    const ALPHA: [Interval; 2] = [r('A', 'Z'), r('a', 'z')];
    const ALNUM: [Interval; 3] = [r('0', '9'), r('A', 'Z'), r('a', 'z')];
    const UPPER: [Interval; 1] = [r('A', 'Z')];
    const LOWER: [Interval; 1] = [r('a', 'z')];
    const XDIGIT: [Interval; 3] = [r('0', '9'), r('A', 'F'), r('a', 'f')];
    const SPACE: [Interval; 2] = [r('\t', '\r'), r1(' ')];
    const BLANK: [Interval; 2] = [r1('\t'), r1(' ')];
    const PUNCT: [Interval; 4] = [r('!', '/'), r(':', '@'), r('[', '`'), r('{', '~')];
    const CNTRL: [Interval; 2] = [r('\u{0}', '\u{1F}'), r1('\u{7F}')];
    const PRINT: [Interval; 1] = [r(' ', '~')];
    const GRAPH: [Interval; 1] = [r('!', '~')];
    Some(match name {
        "alpha" => &ALPHA,
        "alnum" => &ALNUM,
        "digit" => &DIGITS,
        "upper" => &UPPER,
        "lower" => &LOWER,
        "xdigit" => &XDIGIT,
        "space" => &SPACE,
        "blank" => &BLANK,
        "punct" => &PUNCT,
        "cntrl" => &CNTRL,
        "print" => &PRINT,
        "graph" => &GRAPH,
        _ => return None,
    })
}
