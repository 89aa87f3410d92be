//! Parsers from pattern text to the regex IR.
//! The recursive-descent machinery here is shared by both dialects; the
//! Flex-only constructs live in flexparse.rs.

use crate::charclasses::CharClass;
use crate::error::{Error, Result, SyntaxErrorKind};
use crate::ir::{Char, Node, Regex};
use crate::types::{GroupIndex, GroupName, MAX_REPEAT};

/// The pattern dialects we accept.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Syntax {
    /// ECMAScript-style patterns.
    Js,
    /// Flex-style rule bodies.
    Flex,
}

/// What a `{...}` turned out to hold.
enum Braces {
    Quantifier(u32, Option<u32>),
    Var(String),
}

/// The result of parsing a backslash escape.
pub(crate) enum Escape {
    CodePoint(u32),
    Char(Char),
    BackRef(u32),
    NamedRef(String),
    StartOfWord,
    EndOfWord,
}

/// An element of a bracket expression.
pub(crate) enum ClassAtom {
    CodePoint(u32),
    Char(Char),
}

impl ClassAtom {
    fn into_char(self) -> Char {
        match self {
            ClassAtom::CodePoint(cp) => Char::Single(cp),
            ClassAtom::Char(c) => c,
        }
    }
}

pub(crate) fn syntax_error<T>(offset: usize, kind: SyntaxErrorKind, message: &str) -> Result<T> {
    Err(Error::Syntax {
        kind,
        offset,
        message: message.to_string(),
    })
}

/// Parse a repeat count, where the empty string means "not given".
fn parse_count(text: &str, offset: usize) -> Result<Option<u32>> {
    if text.is_empty() {
        return Ok(None);
    }
    match text.parse::<u64>() {
        Ok(n) if n <= MAX_REPEAT as u64 => Ok(Some(n as u32)),
        Ok(_) => syntax_error(
            offset,
            SyntaxErrorKind::InvalidQuantifier,
            "Repeat count limit exceeded",
        ),
        Err(_) => syntax_error(offset, SyntaxErrorKind::InvalidQuantifier, "Invalid quantifier"),
    }
}

/// \return whether a node may not be quantified.
fn is_assertion(r: &Regex) -> bool {
    r.is_plain()
        && matches!(
            r.node,
            Node::StartOfInput
                | Node::EndOfInput
                | Node::StartOfWord
                | Node::EndOfWord
                | Node::LookAhead { .. }
                | Node::LookBack { .. }
        )
}

pub(crate) struct Parser {
    pub(crate) input: Vec<char>,
    pub(crate) pos: usize,
    pub(crate) syntax: Syntax,

    /// Groups opened so far; the next capture group gets this index.
    group_count: GroupIndex,
    group_names: Vec<GroupName>,

    // Back-references, with their offsets, checked once all groups are known.
    backrefs: Vec<(u32, usize)>,
    named_refs: Vec<(String, usize)>,

    /// Group nesting depth.
    pub(crate) depth: usize,

    /// Whether unescaped whitespace is ignored, as in Flex `(?x:...)`.
    pub(crate) free_spacing: bool,

    /// Whether top-level whitespace ends the pattern, as in Flex rule bodies.
    pub(crate) stop_at_whitespace: bool,
}

impl Parser {
    pub(crate) fn new(pattern: &str, syntax: Syntax) -> Parser {
        Parser {
            input: pattern.chars().collect(),
            pos: 0,
            syntax,
            group_count: 0,
            group_names: Vec::new(),
            backrefs: Vec::new(),
            named_refs: Vec::new(),
            depth: 0,
            free_spacing: false,
            stop_at_whitespace: false,
        }
    }

    #[inline]
    pub(crate) fn peek(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    #[inline]
    pub(crate) fn peek_at(&self, ahead: usize) -> Option<char> {
        self.input.get(self.pos + ahead).copied()
    }

    pub(crate) fn consume(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    pub(crate) fn try_consume(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub(crate) fn try_consume_str(&mut self, s: &str) -> bool {
        let len = s.chars().count();
        let matches = self.pos + len <= self.input.len()
            && s.chars().zip(&self.input[self.pos..]).all(|(a, &b)| a == b);
        if matches {
            self.pos += len;
        }
        matches
    }

    pub(crate) fn error<T>(&self, kind: SyntaxErrorKind, message: &str) -> Result<T> {
        syntax_error(self.pos, kind, message)
    }

    fn next_group_index(&mut self) -> GroupIndex {
        let gi = self.group_count;
        self.group_count += 1;
        gi
    }

    /// Parse the whole input, or in body mode everything up to top-level
    /// whitespace, then validate back-references.
    pub(crate) fn parse_pattern(&mut self) -> Result<Regex> {
        let re = self.parse_disjunction()?;
        for &(num, offset) in &self.backrefs {
            if num > self.group_count {
                return syntax_error(offset, SyntaxErrorKind::InvalidEscape, "Invalid back reference");
            }
        }
        for (name, offset) in &self.named_refs {
            if !self.group_names.contains(name) {
                return syntax_error(
                    *offset,
                    SyntaxErrorKind::InvalidEscape,
                    "Invalid named reference",
                );
            }
        }
        Ok(re)
    }

    /// Parse alternatives separated by `|`, until `)` or the end of input.
    pub(crate) fn parse_disjunction(&mut self) -> Result<Regex> {
        let mut options = vec![self.parse_alternative()?];
        while self.try_consume('|') {
            options.push(self.parse_alternative()?);
        }
        Ok(Regex::union(options))
    }

    fn ends_body(&self, c: char) -> bool {
        self.stop_at_whitespace && self.depth == 0 && !self.free_spacing && c.is_whitespace()
    }

    /// Parse one alternative: a run of terms reduced into a Cat at `|`, `)` or
    /// the end of input.
    fn parse_alternative(&mut self) -> Result<Regex> {
        let mut stack: Vec<Regex> = Vec::new();
        // Whether the stack top was produced by a quantifier.
        let mut quantified = false;
        while let Some(c) = self.peek() {
            if self.ends_body(c) {
                break;
            }
            if self.free_spacing && c.is_whitespace() {
                self.pos += 1;
                continue;
            }
            let start = self.pos;
            let mut just_quantified = false;
            match c {
                '|' => break,
                ')' => {
                    if self.depth == 0 {
                        return self.error(SyntaxErrorKind::UnmatchedBracket, "Unbalanced parenthesis");
                    }
                    break;
                }
                '(' => self.parse_group(&mut stack)?,
                '[' => {
                    let c = self.parse_bracket()?;
                    stack.push(Regex::char_matcher(c));
                }
                ']' => return self.error(SyntaxErrorKind::UnmatchedBracket, "Unbalanced bracket"),
                '}' => return self.error(SyntaxErrorKind::UnmatchedBracket, "Unbalanced brace"),
                '.' => {
                    self.pos += 1;
                    stack.push(Regex::char_matcher(Char::Any));
                }
                '^' => {
                    self.pos += 1;
                    stack.push(Regex::new(Node::StartOfInput));
                }
                '$' => {
                    self.pos += 1;
                    stack.push(Regex::new(Node::EndOfInput));
                }
                '\\' => {
                    let re = self.parse_atom_escape()?;
                    stack.push(re);
                }
                '*' | '+' | '?' => {
                    self.pos += 1;
                    let (min, max) = match c {
                        '*' => (0, None),
                        '+' => (1, None),
                        _ => (0, Some(1)),
                    };
                    let greedy = !self.try_consume('?');
                    self.apply_quantifier(&mut stack, min, max, greedy, start, quantified)?;
                    just_quantified = true;
                }
                '{' => match self.parse_braces()? {
                    Braces::Var(name) => stack.push(Regex::var(&name)),
                    Braces::Quantifier(min, max) => {
                        let greedy = !self.try_consume('?');
                        self.apply_quantifier(&mut stack, min, max, greedy, start, quantified)?;
                        just_quantified = true;
                    }
                },
                '"' if self.syntax == Syntax::Flex => {
                    let re = self.parse_quoted()?;
                    stack.push(re);
                }
                '/' if self.syntax == Syntax::Flex && self.depth == 0 => {
                    // Trailing context: everything after the slash must follow.
                    self.pos += 1;
                    let cond = self.parse_disjunction()?;
                    let expr = Regex::cat(core::mem::take(&mut stack));
                    stack.push(Regex::look_ahead(expr, cond, false));
                }
                _ => {
                    self.pos += 1;
                    stack.push(Regex::char(c));
                }
            }
            quantified = just_quantified;
        }
        Ok(Regex::cat(stack))
    }

    /// Fold a quantifier onto the top of \p stack.
    /// \p stacked is set if the top was itself just quantified.
    fn apply_quantifier(
        &self,
        stack: &mut Vec<Regex>,
        min: u32,
        max: Option<u32>,
        greedy: bool,
        offset: usize,
        stacked: bool,
    ) -> Result<()> {
        let top = match stack.pop() {
            Some(top) => top,
            None => {
                return syntax_error(offset, SyntaxErrorKind::DanglingQuantifier, "Nothing to repeat")
            }
        };
        if is_assertion(&top) {
            return syntax_error(
                offset,
                SyntaxErrorKind::InvalidQuantifier,
                "Quantifier not allowed here",
            );
        }
        if stacked {
            if self.syntax == Syntax::Js {
                return syntax_error(offset, SyntaxErrorKind::DanglingQuantifier, "Nothing to repeat");
            }
            // Flex widens the existing bounds instead of nesting.
            if let Regex {
                node:
                    Node::Quant {
                        expr,
                        min: prev_min,
                        max: prev_max,
                        greedy: prev_greedy,
                    },
                group_index: None,
                group_name: None,
                dot_all: None,
                ignore_case: None,
                multiline: None,
            } = top
            {
                let max = match (prev_max, max) {
                    (Some(a), Some(b)) => Some(a.max(b)),
                    _ => None,
                };
                stack.push(Regex::quant(*expr, prev_min.min(min), max, prev_greedy && greedy));
                return Ok(());
            }
        }
        stack.push(Regex::quant(top, min, max, greedy));
        Ok(())
    }

    /// Parse the contents of `{...}`, which is a repeat count or a name.
    fn parse_braces(&mut self) -> Result<Braces> {
        let open = self.pos;
        self.pos += 1;
        let close = match self.input[self.pos..].iter().position(|&c| c == '}') {
            Some(idx) => self.pos + idx,
            None => return syntax_error(open, SyntaxErrorKind::UnmatchedBracket, "Unbalanced brace"),
        };
        let content: String = self.input[self.pos..close].iter().collect();
        self.pos = close + 1;

        let trimmed = content.trim();
        if trimmed.is_empty() {
            return syntax_error(open, SyntaxErrorKind::InvalidQuantifier, "Invalid quantifier");
        }
        if !trimmed
            .chars()
            .all(|c| c.is_ascii_digit() || c == ',' || c == ' ')
        {
            if trimmed
                .chars()
                .all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '.')
            {
                return Ok(Braces::Var(trimmed.to_string()));
            }
            return syntax_error(open, SyntaxErrorKind::InvalidQuantifier, "Invalid quantifier");
        }

        let parts: Vec<&str> = trimmed.split(',').map(str::trim).collect();
        match parts.as_slice() {
            [count] => match parse_count(count, open)? {
                Some(n) => Ok(Braces::Quantifier(n, Some(n))),
                None => syntax_error(open, SyntaxErrorKind::InvalidQuantifier, "Invalid quantifier"),
            },
            [lo, hi] => {
                let min = parse_count(lo, open)?.unwrap_or(0);
                let max = parse_count(hi, open)?;
                if max.map_or(false, |max| min > max) {
                    return syntax_error(open, SyntaxErrorKind::InvalidQuantifier, "Invalid quantifier");
                }
                Ok(Braces::Quantifier(min, max))
            }
            _ => syntax_error(open, SyntaxErrorKind::InvalidQuantifier, "Invalid quantifier"),
        }
    }

    /// Parse a parenthesized construct, pushing its result onto \p stack.
    /// Look-around consumes what is already on the stack.
    fn parse_group(&mut self, stack: &mut Vec<Regex>) -> Result<()> {
        let open = self.pos;
        self.pos += 1;
        if self.peek() != Some('?') {
            let gi = self.next_group_index();
            let body = self.parse_group_body(open)?;
            stack.push(body.into_group(gi, None));
            return Ok(());
        }

        if self.try_consume_str("?:") {
            let body = self.parse_group_body(open)?;
            stack.push(body);
        } else if self.try_consume_str("?=") || self.try_consume_str("?!") {
            let negate = self.input[self.pos - 1] == '!';
            let cond = self.parse_group_body(open)?;
            let expr = Regex::cat(core::mem::take(stack));
            stack.push(Regex::look_ahead(expr, cond, negate));
        } else if self.try_consume_str("?<=") || self.try_consume_str("?<!") {
            let negate = self.input[self.pos - 1] == '!';
            let cond = self.parse_group_body(open)?;
            // The rest of this alternative is what the condition precedes.
            let expr = self.parse_alternative()?;
            stack.push(Regex::look_back(expr, cond, negate));
        } else if self.syntax == Syntax::Js && self.try_consume_str("?<") {
            let name = self.parse_group_name()?;
            let gi = self.next_group_index();
            let body = self.parse_group_body(open)?;
            stack.push(body.into_group(gi, Some(name)));
        } else if self.syntax == Syntax::Flex && self.try_consume_str("?#") {
            self.skip_comment(open)?;
        } else if self.syntax == Syntax::Flex {
            self.pos += 1;
            let re = self.parse_modifier_group(open)?;
            stack.push(re);
        } else {
            return self.error(SyntaxErrorKind::InvalidGroup, "Invalid group modifier");
        }
        Ok(())
    }

    /// Parse a disjunction followed by the `)` closing the group opened at
    /// \p open.
    pub(crate) fn parse_group_body(&mut self, open: usize) -> Result<Regex> {
        self.depth += 1;
        let body = self.parse_disjunction()?;
        self.depth -= 1;
        if !self.try_consume(')') {
            return syntax_error(open, SyntaxErrorKind::UnmatchedBracket, "Unbalanced parenthesis");
        }
        Ok(body)
    }

    /// Parse `name>` of a named group.
    fn parse_group_name(&mut self) -> Result<GroupName> {
        let start = self.pos;
        let mut name = String::new();
        loop {
            match self.consume() {
                Some('>') => break,
                Some(c) if c.is_alphanumeric() || c == '_' || c == '$' => name.push(c),
                _ => {
                    return syntax_error(start, SyntaxErrorKind::InvalidGroup, "Invalid capture group name")
                }
            }
        }
        if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
            return syntax_error(start, SyntaxErrorKind::InvalidGroup, "Invalid capture group name");
        }
        if self.group_names.contains(&name) {
            return syntax_error(start, SyntaxErrorKind::InvalidGroup, "Duplicate capture group name");
        }
        self.group_names.push(name.clone());
        Ok(name)
    }

    /// Parse a bracket expression like `[^a-z\d]`.
    fn parse_bracket(&mut self) -> Result<Char> {
        let open = self.pos;
        self.pos += 1;
        let negate = self.try_consume('^');
        let mut chars = Vec::new();
        loop {
            match self.peek() {
                None => {
                    return syntax_error(open, SyntaxErrorKind::UnmatchedBracket, "Unbalanced bracket")
                }
                Some(']') => {
                    self.pos += 1;
                    break;
                }
                Some(_) => {}
            }
            let first = self.parse_class_atom(open)?;
            let is_range = self.peek() == Some('-') && !matches!(self.peek_at(1), None | Some(']'));
            if !is_range {
                chars.push(first.into_char());
                continue;
            }
            let dash = self.pos;
            self.pos += 1;
            let second = self.parse_class_atom(open)?;
            match (first, second) {
                (ClassAtom::CodePoint(lo), ClassAtom::CodePoint(hi)) => {
                    if lo > hi {
                        return syntax_error(
                            dash,
                            SyntaxErrorKind::InvalidCharRange,
                            "Range values reversed, start char code is greater than end char code.",
                        );
                    }
                    chars.push(Char::Range(lo, hi));
                }
                _ => {
                    return syntax_error(dash, SyntaxErrorKind::InvalidCharRange, "Invalid character range")
                }
            }
        }
        Ok(Char::Union { negate, chars })
    }

    fn parse_class_atom(&mut self, open: usize) -> Result<ClassAtom> {
        match self.peek() {
            None => syntax_error(open, SyntaxErrorKind::UnmatchedBracket, "Unbalanced bracket"),
            Some('\\') => match self.parse_escape(true)? {
                Escape::CodePoint(cp) => Ok(ClassAtom::CodePoint(cp)),
                Escape::Char(c) => Ok(ClassAtom::Char(c)),
                _ => self.error(SyntaxErrorKind::InvalidEscape, "Invalid class escape"),
            },
            Some('[') if self.syntax == Syntax::Flex && self.peek_at(1) == Some(':') => {
                let c = self.parse_posix_class()?;
                Ok(ClassAtom::Char(c))
            }
            Some(c) => {
                self.pos += 1;
                Ok(ClassAtom::CodePoint(c as u32))
            }
        }
    }

    /// Parse an escape outside of a bracket.
    fn parse_atom_escape(&mut self) -> Result<Regex> {
        let start = self.pos;
        Ok(match self.parse_escape(false)? {
            Escape::CodePoint(cp) => Regex::char_matcher(Char::Single(cp)),
            Escape::Char(c) => Regex::char_matcher(c),
            Escape::BackRef(num) => {
                self.backrefs.push((num, start));
                Regex::new(Node::BackNumRef(num))
            }
            Escape::NamedRef(name) => {
                self.named_refs.push((name.clone(), start));
                Regex::new(Node::BackNamedRef(name))
            }
            Escape::StartOfWord => Regex::new(Node::StartOfWord),
            Escape::EndOfWord => Regex::new(Node::EndOfWord),
        })
    }

    /// Parse a backslash escape. The cursor is at the backslash.
    pub(crate) fn parse_escape(&mut self, in_class: bool) -> Result<Escape> {
        let start = self.pos;
        self.pos += 1;
        let c = match self.consume() {
            Some(c) => c,
            None => return syntax_error(start, SyntaxErrorKind::InvalidEscape, "Incomplete escape"),
        };
        if let Some((class, negate)) = CharClass::from_escape(c) {
            return Ok(Escape::Char(Char::Class { class, negate }));
        }
        let cp = match c {
            'p' | 'P' => return self.parse_property_escape(c == 'P', start),
            'n' => 0x0A,
            'r' => 0x0D,
            't' => 0x09,
            'f' => 0x0C,
            'v' => 0x0B,
            'b' => 0x08,
            'c' => match self.consume() {
                Some(letter) if letter.is_ascii_alphabetic() => letter as u32 % 32,
                _ => return syntax_error(start, SyntaxErrorKind::InvalidEscape, "Invalid control escape"),
            },
            'x' => self.parse_hex_digits(2, start)?,
            'u' => {
                if self.try_consume('{') {
                    let cp = self.parse_braced_code_point(start)?;
                    return Ok(Escape::CodePoint(cp));
                }
                self.parse_hex_digits(4, start)?
            }
            '0'..='7' if self.syntax == Syntax::Flex => self.parse_octal(c),
            '0' => 0,
            '1'..='9' if self.syntax == Syntax::Js => {
                if in_class {
                    return syntax_error(start, SyntaxErrorKind::InvalidEscape, "Invalid class escape");
                }
                let mut num = c.to_digit(10).unwrap_or(0);
                while let Some(d) = self.peek().and_then(|d| d.to_digit(10)) {
                    num = num.saturating_mul(10).saturating_add(d);
                    self.pos += 1;
                }
                return Ok(Escape::BackRef(num));
            }
            'k' if self.syntax == Syntax::Js && !in_class => {
                if !self.try_consume('<') {
                    return syntax_error(start, SyntaxErrorKind::InvalidEscape, "Invalid named reference");
                }
                let mut name = String::new();
                loop {
                    match self.consume() {
                        Some('>') if !name.is_empty() => break,
                        Some(c) if c.is_alphanumeric() || c == '_' || c == '$' => name.push(c),
                        _ => {
                            return syntax_error(
                                start,
                                SyntaxErrorKind::InvalidEscape,
                                "Invalid named reference",
                            )
                        }
                    }
                }
                return Ok(Escape::NamedRef(name));
            }
            '<' if self.syntax == Syntax::Flex && !in_class => return Ok(Escape::StartOfWord),
            '>' if self.syntax == Syntax::Flex && !in_class => return Ok(Escape::EndOfWord),
            // Identity escape.
            c => c as u32,
        };
        Ok(Escape::CodePoint(cp))
    }

    fn parse_hex_digits(&mut self, count: usize, start: usize) -> Result<u32> {
        let mut value = 0;
        for _ in 0..count {
            match self.consume().and_then(|c| c.to_digit(16)) {
                Some(d) => value = value * 16 + d,
                None => return syntax_error(start, SyntaxErrorKind::InvalidEscape, "Invalid hex escape"),
            }
        }
        Ok(value)
    }

    /// Parse the `H...}` of `\u{H...}`.
    fn parse_braced_code_point(&mut self, start: usize) -> Result<u32> {
        let mut value: u32 = 0;
        let mut digits = 0;
        loop {
            match self.consume() {
                Some('}') if digits > 0 => break,
                Some(c) if c.is_ascii_hexdigit() => {
                    value = value.saturating_mul(16).saturating_add(c.to_digit(16).unwrap_or(0));
                    digits += 1;
                }
                _ => return syntax_error(start, SyntaxErrorKind::InvalidEscape, "Invalid unicode escape"),
            }
        }
        if value > crate::codepointset::CODE_POINT_MAX {
            return syntax_error(start, SyntaxErrorKind::InvalidEscape, "Invalid unicode escape");
        }
        Ok(value)
    }

    /// Parse `{name=value}` or `{value}` after `\p`.
    fn parse_property_escape(&mut self, negate: bool, start: usize) -> Result<Escape> {
        let invalid = || syntax_error(start, SyntaxErrorKind::InvalidPropertyEscape, "Invalid property name");
        if !self.try_consume('{') {
            return invalid();
        }
        let mut content = String::new();
        loop {
            match self.consume() {
                Some('}') => break,
                Some(c) if c.is_ascii_alphanumeric() || c == '_' || c == '=' => content.push(c),
                _ => return invalid(),
            }
        }
        let (name, value) = match content.split_once('=') {
            Some((name, value)) => (name.to_string(), value.to_string()),
            None => ("General_Category".to_string(), content),
        };
        if name.is_empty() || value.is_empty() || value.contains('=') {
            return invalid();
        }
        Ok(Escape::Char(Char::Property {
            name,
            value,
            negate,
        }))
    }
}

/// Parse an ECMAScript-style \p pattern.
pub fn parse(pattern: &str) -> Result<Regex> {
    Parser::new(pattern, Syntax::Js).parse_pattern()
}
