//! The Flex dialect: quoted strings, POSIX bracket classes, mode modifiers,
//! comments, trailing context, and `%define`-style definition sections.

use crate::charclasses::posix_class;
use crate::error::{Result, SyntaxErrorKind};
use crate::ir::{Char, Node, Regex};
use crate::parse::{syntax_error, Escape, Parser, Syntax};

impl Parser {
    /// Parse `"..."`; everything inside is literal apart from escapes.
    pub(crate) fn parse_quoted(&mut self) -> Result<Regex> {
        let open = self.pos;
        self.pos += 1;
        let mut chars = Vec::new();
        loop {
            match self.peek() {
                None => return syntax_error(open, SyntaxErrorKind::UnmatchedBracket, "Unbalanced quote"),
                Some('"') => {
                    self.pos += 1;
                    break;
                }
                Some('\\') => match self.parse_escape(true)? {
                    Escape::CodePoint(cp) => chars.push(Regex::char_matcher(Char::Single(cp))),
                    _ => return self.error(SyntaxErrorKind::InvalidEscape, "Invalid escape in string"),
                },
                Some(c) => {
                    self.pos += 1;
                    chars.push(Regex::char(c));
                }
            }
        }
        Ok(Regex::cat(chars))
    }

    /// Skip the rest of a `(?#...)` comment.
    pub(crate) fn skip_comment(&mut self, open: usize) -> Result<()> {
        loop {
            match self.consume() {
                Some(')') => return Ok(()),
                Some(_) => {}
                None => {
                    return syntax_error(open, SyntaxErrorKind::UnmatchedBracket, "Unbalanced parenthesis")
                }
            }
        }
    }

    /// Parse `ix-s:body)`, the part of a modifier group after `(?`.
    pub(crate) fn parse_modifier_group(&mut self, open: usize) -> Result<Regex> {
        let mut ignore_case = None;
        let mut dot_all = None;
        let mut multiline = None;
        let mut free_spacing = None;
        let mut enable = true;
        loop {
            match self.consume() {
                Some(':') => break,
                Some('-') if enable => enable = false,
                Some('i') => ignore_case = Some(enable),
                Some('s') => dot_all = Some(enable),
                Some('m') => multiline = Some(enable),
                Some('x') => free_spacing = Some(enable),
                _ => return syntax_error(open, SyntaxErrorKind::InvalidGroup, "Invalid group modifier"),
            }
        }

        let saved_spacing = self.free_spacing;
        if let Some(x) = free_spacing {
            self.free_spacing = x;
        }
        let body = self.parse_group_body(open);
        self.free_spacing = saved_spacing;
        let body = body?;

        let mut res = if body.is_plain() {
            body
        } else {
            Regex::new(Node::Cat(vec![body]))
        };
        res.ignore_case = ignore_case;
        res.dot_all = dot_all;
        res.multiline = multiline;
        Ok(res)
    }

    /// Parse `[:name:]` inside a bracket expression.
    pub(crate) fn parse_posix_class(&mut self) -> Result<Char> {
        let start = self.pos;
        self.pos += 2;
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if !c.is_ascii_alphabetic() {
                break;
            }
            name.push(c);
            self.pos += 1;
        }
        let ivs = match posix_class(&name) {
            Some(ivs) if self.try_consume_str(":]") => ivs,
            _ => return syntax_error(start, SyntaxErrorKind::InvalidCharRange, "Invalid POSIX class"),
        };
        let chars = ivs
            .iter()
            .map(|iv| {
                if iv.first == iv.last {
                    Char::Single(iv.first)
                } else {
                    Char::Range(iv.first, iv.last)
                }
            })
            .collect();
        Ok(Char::Union {
            negate: false,
            chars,
        })
    }

    /// Parse an octal escape whose first digit \p first was consumed.
    pub(crate) fn parse_octal(&mut self, first: char) -> u32 {
        let mut value = first.to_digit(8).unwrap_or(0);
        for _ in 0..2 {
            match self.peek().and_then(|c| c.to_digit(8)) {
                Some(d) if value * 8 + d <= 0o377 => {
                    value = value * 8 + d;
                    self.pos += 1;
                }
                _ => break,
            }
        }
        value
    }
}

/// Parse a Flex-style \p pattern. Whitespace is literal.
pub fn parse(pattern: &str) -> Result<Regex> {
    Parser::new(pattern, Syntax::Flex).parse_pattern()
}

/// Parse a free-form rule body from the start of \p text, stopping at
/// top-level whitespace outside of brackets, quotes and groups.
/// \return the regex and the number of chars consumed.
pub fn parse_body(text: &str) -> Result<(Regex, usize)> {
    let mut parser = Parser::new(text, Syntax::Flex);
    parser.stop_at_whitespace = true;
    let re = parser.parse_pattern()?;
    Ok((re, parser.pos))
}

/// Parse the definitions section of a Flex file: lines of `name  body`.
/// Blank lines, and lines starting with whitespace or `%`, are skipped.
pub fn parse_definitions(text: &str) -> Result<Vec<(String, Regex)>> {
    let mut defs = Vec::new();
    // Char offset of the current line.
    let mut offset = 0;
    for raw_line in text.split_inclusive('\n') {
        let line = raw_line.trim_end_matches(['\r', '\n']);
        let line_offset = offset;
        offset += raw_line.chars().count();
        if line.trim().is_empty() || line.starts_with(|c: char| c.is_whitespace() || c == '%') {
            continue;
        }
        let name_len = line
            .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '-'))
            .unwrap_or(line.len());
        let (name, rest) = line.split_at(name_len);
        let body = rest.trim_start();
        if name.is_empty() || body.is_empty() {
            return syntax_error(line_offset, SyntaxErrorKind::InvalidGroup, "Invalid definition");
        }
        let (re, _) = parse_body(body)?;
        defs.push((name.to_string(), re));
    }
    Ok(defs)
}
