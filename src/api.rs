use crate::emit;
use crate::error::{Error, Result};
use crate::insn::Program;
use crate::ir;
use crate::parse;
use crate::pikevm::{PikeVm, VmMatch};
use crate::tape::Tape;

use core::{fmt, str::FromStr};

/// Flags used to control regex matching.
/// The default flags are case-sensitive, not-multiline, and `.` excludes line
/// terminators, as in JavaScript.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Flags {
    /// If set, make the regex case-insensitive.
    /// Equivalent to the 'i' flag in JavaScript.
    pub icase: bool,

    /// If set, ^ and $ match at line separators, not just the input boundaries.
    /// Equivalent to the 'm' flag in JavaScript.
    pub multiline: bool,

    /// If set, . matches at line separators as well as any other character.
    /// Equivalent to the 's' flag in JavaScript.
    pub dot_all: bool,
}

impl Flags {
    /// Construct a Flags from a chars iterator, using JavaScript field names.
    /// 'i' means to ignore case, 'm' means multiline, 's' means dot-all.
    /// Other flags are not implemented and are ignored.
    #[inline]
    pub fn new<T: Iterator<Item = char>>(chars: T) -> Self {
        let mut result = Self::default();
        for c in chars {
            match c {
                'm' => {
                    result.multiline = true;
                }
                'i' => {
                    result.icase = true;
                }
                's' => {
                    result.dot_all = true;
                }
                _ => {
                    // Silently skip unsupported flags.
                }
            }
        }
        result
    }

    /// \return \p expr with these flags set on its root, overriding the
    /// compiler defaults for the whole pattern.
    pub(crate) fn apply(self, expr: ir::Regex) -> ir::Regex {
        let mut res = if expr.has_flags() {
            ir::Regex::new(ir::Node::Cat(vec![expr]))
        } else {
            expr
        };
        res.ignore_case = Some(self.icase);
        res.multiline = Some(self.multiline);
        res.dot_all = Some(self.dot_all);
        res
    }
}

impl From<&str> for Flags {
    /// Construct a Flags from a string, using JavaScript field names.
    ///
    /// See also: [`Flags::new`].
    #[inline]
    fn from(s: &str) -> Self {
        Self::new(s.chars())
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.multiline {
            f.write_str("m")?;
        }
        if self.icase {
            f.write_str("i")?;
        }
        if self.dot_all {
            f.write_str("s")?;
        }
        Ok(())
    }
}

/// Range is used to express the extent of a match, as byte indexes into the
/// input string.
pub type Range = core::ops::Range<usize>;

/// A Match represents a portion of a string which was found to match a Regex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// The total range of the match. Matches are never empty.
    pub range: Range,

    /// The list of captures. This has length equal to the number of capturing
    /// groups in the regex. For each capture, if the value is None, that group
    /// did not match (for example, it was in a not-taken branch of an
    /// alternation). If the value is Some, the group did match with the
    /// enclosed range.
    pub captures: Vec<Option<Range>>,

    // A list of capture group names. This is either:
    //   - Empty, if there were no named capture groups.
    //   - A list of names with length `captures.len()`, corresponding to the
    //     capture group names in order. Groups without names have an empty string.
    pub(crate) group_names: Box<[Box<str>]>,
}

impl Match {
    /// Access a group by index, using the convention of Python's group()
    /// function. Index 0 is the total match, index 1 is the first capture
    /// group.
    #[inline]
    pub fn group(&self, idx: usize) -> Option<Range> {
        if idx == 0 {
            Some(self.range.clone())
        } else {
            self.captures.get(idx - 1).cloned().flatten()
        }
    }

    /// Access a named group by name.
    #[inline]
    pub fn named_group(&self, name: &str) -> Option<Range> {
        // Empty strings are used as sentinels to indicate unnamed group.
        if name.is_empty() {
            return None;
        }
        let pos = self.group_names.iter().position(|s| s.as_ref() == name)?;
        self.captures[pos].clone()
    }

    /// The names of the capture groups, empty for unnamed ones; or an empty
    /// slice if no group is named.
    #[inline]
    pub fn group_names(&self) -> &[Box<str>] {
        &self.group_names
    }

    /// Return an iterator over the named groups of a Match.
    #[inline]
    pub fn named_groups(&self) -> NamedGroups {
        NamedGroups::new(self)
    }

    /// Returns the range over the starting and ending byte offsets of the match in the haystack.
    #[inline]
    pub fn range(&self) -> Range {
        self.range.clone()
    }

    /// Returns the starting byte offset of the match in the haystack.
    #[inline]
    pub fn start(&self) -> usize {
        self.range.start
    }

    /// Returns the ending byte offset of the match in the haystack.
    #[inline]
    pub fn end(&self) -> usize {
        self.range.end
    }

    /// Return an iterator over a Match. The first returned value is the total
    /// match, and subsequent values represent the capture groups.
    #[inline]
    pub fn groups(&self) -> Groups {
        Groups::new(self)
    }
}

/// An iterator over the capture groups of a [`Match`]
///
/// This struct is created by the [`groups`] method on [`Match`].
///
/// [`Match`]: ../struct.Match.html
/// [`groups`]: ../struct.Match.html#method.groups
#[derive(Clone)]
pub struct Groups<'m> {
    mat: &'m Match,
    i: usize,
    max: usize,
}

impl<'m> Groups<'m> {
    #[inline]
    fn new(mat: &'m Match) -> Self {
        Self {
            mat,
            i: 0,
            max: mat.captures.len() + 1,
        }
    }
}

impl Iterator for Groups<'_> {
    type Item = Option<Range>;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let i = self.i;
        if i < self.max {
            self.i += 1;
            Some(self.mat.group(i))
        } else {
            None
        }
    }
}

/// An iterator over the named capture groups of a [`Match`]
///
/// This struct is created by the [`named_groups`] method on [`Match`].
///
/// [`Match`]: ../struct.Match.html
/// [`named_groups`]: ../struct.Match.html#method.named_groups
#[derive(Clone)]
pub struct NamedGroups<'m> {
    mat: &'m Match,
    next_group_name_idx: usize,
}

impl<'m> NamedGroups<'m> {
    #[inline]
    fn new(mat: &'m Match) -> Self {
        Self {
            mat,
            next_group_name_idx: 0,
        }
    }
}

impl<'m> Iterator for NamedGroups<'m> {
    type Item = (&'m str, Option<Range>);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        // Increment next_group_name_idx until we find a non-empty name.
        let end = self.mat.group_names.len();
        let mut idx = self.next_group_name_idx;
        while idx < end && self.mat.group_names[idx].is_empty() {
            idx += 1;
        }
        if idx == end {
            return None;
        }
        let name = self.mat.group_names[idx].as_ref();
        let range = self.mat.captures[idx].clone();
        self.next_group_name_idx = idx + 1;
        Some((name, range))
    }
}

/// A Regex is the compiled version of a single JS-style pattern.
#[derive(Debug, Clone)]
pub struct Regex {
    expr: ir::Regex,
    prog: Program,
    flags: Flags,
    group_count: usize,
    group_names: Box<[Box<str>]>,
}

impl Regex {
    /// Construct a regex by parsing `pattern` using the default flags.
    /// An Error may be returned if the syntax is invalid.
    #[inline]
    pub fn new(pattern: &str) -> Result<Regex> {
        Self::with_flags(pattern, Flags::default())
    }

    /// Construct a regex by parsing `pattern` with `flags`.
    /// An Error may be returned if the syntax is invalid, or if the pattern
    /// uses constructs that cannot be compiled, such as back-references or
    /// `{name}` references.
    pub fn with_flags<F>(pattern: &str, flags: F) -> Result<Regex>
    where
        F: Into<Flags>,
    {
        let flags = flags.into();
        let expr = parse::parse(pattern)?;
        let prog = emit::compile_regex(&flags.apply(expr.clone()), &|_| None)?;
        let group_count = expr.group_count() as usize;
        let named = expr.group_names();
        let group_names: Box<[Box<str>]> = if named.is_empty() {
            Box::new([])
        } else {
            let mut names = vec![Box::<str>::from(""); group_count];
            for (gi, name) in named {
                names[gi as usize] = name.into_boxed_str();
            }
            names.into_boxed_slice()
        };
        Ok(Regex {
            expr,
            prog,
            flags,
            group_count,
            group_names,
        })
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    /// The compiled program.
    pub fn program(&self) -> &Program {
        &self.prog
    }

    /// Searches `text` to find the first match.
    #[inline]
    pub fn find(&self, text: &str) -> Option<Match> {
        self.find_iter(text).next()
    }

    /// Searches `text`, returning an iterator over non-overlapping matches.
    /// Note that the resulting Iterator borrows the regex `'r`.
    #[inline]
    pub fn find_iter<'r>(&'r self, text: &str) -> Matches<'r> {
        self.find_from(text, 0)
    }

    /// Returns an iterator for matches found in 'text' starting at byte index
    /// `start`. Note this may be different from passing a sliced `text` in
    /// the case of lookbehind assertions.
    /// Example:
    ///
    ///  ```rust
    ///   use tlex::Regex;
    ///   let text = "xyxy";
    ///   let re = Regex::new(r"(?<=x)y").unwrap();
    ///   let t1 = re.find(&text[1..]).unwrap().range();
    ///   assert!(t1 == (2..3));
    ///   let t2 = re.find_from(text, 1).next().unwrap().range();
    ///   assert!(t2 == (1..2));
    ///   ```
    pub fn find_from<'r>(&'r self, text: &str, start: usize) -> Matches<'r> {
        let pos = text.char_indices().take_while(|&(b, _)| b < start).count();
        Matches {
            re: self,
            tape: Tape::new(text),
            pos,
        }
    }

    fn to_match(&self, tape: &Tape, m: &VmMatch) -> Match {
        let bytes = |(s, e): (usize, usize)| tape.byte_offset(s)..tape.byte_offset(e);
        Match {
            range: bytes((m.start, m.end)),
            captures: (0..self.group_count)
                .map(|gi| m.group(gi as u32).map(bytes))
                .collect(),
            group_names: self.group_names.clone(),
        }
    }
}

impl fmt::Display for Regex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.expr)
    }
}

impl FromStr for Regex {
    type Err = Error;

    /// Attempts to parse a string into a regular expression
    #[inline]
    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

/// An iterator type which yields `Match`es found in a string.
/// Each match is the leftmost one starting at or after the end of the
/// previous one.
pub struct Matches<'r> {
    re: &'r Regex,
    tape: Tape,
    pos: usize,
}

impl Iterator for Matches<'_> {
    type Item = Match;

    fn next(&mut self) -> Option<Match> {
        let mut vm = PikeVm::new(&self.re.prog);
        while self.pos <= self.tape.len() {
            let start = self.pos;
            self.pos += 1;
            if let Some(m) = vm.match_at(&self.tape, start) {
                self.pos = m.end;
                return Some(self.re.to_match(&self.tape, &m));
            }
        }
        None
    }
}
