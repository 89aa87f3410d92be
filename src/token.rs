//! Tokens, and a lookahead buffer over a token source

use crate::error::{Error, Result};
use crate::pikevm::VmMatch;
use crate::tape::Tape;
use crate::types::{GroupIndex, LexerState, RuleIndex};
use std::collections::{BTreeMap, VecDeque};

/// A lexeme produced by a tokenizer rule.
/// Offsets are char offsets into the input.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Token {
    /// Unique within the producing tokenizer.
    pub id: usize,
    pub tag: String,

    /// The registration index of the rule that matched.
    pub match_index: RuleIndex,

    pub start: usize,
    pub end: usize,
    pub value: String,

    /// Offsets recorded by explicit group markers, in order.
    pub groups: BTreeMap<GroupIndex, Vec<usize>>,

    /// The span of each participating capture group.
    pub positions: BTreeMap<GroupIndex, (usize, usize)>,

    /// The lexer state after this token was produced.
    pub state: LexerState,

    /// How many chars past `end` were examined to produce this token.
    pub lookahead: usize,

    /// How many preceding tokens examined chars inside this one.
    pub lookback: usize,

    /// How many chars from `start` on were examined by the skipped or
    /// dropped tokens just before this one.
    pub skipped_lookahead: usize,
}

impl Token {
    pub fn new(tag: &str, start: usize, end: usize, value: &str) -> Token {
        Token {
            tag: tag.to_string(),
            start,
            end,
            value: value.to_string(),
            lookahead: 1,
            lookback: 1,
            ..Default::default()
        }
    }

    /// Build a token for \p m, reading its text and group spans from \p tape.
    /// Only the first \p group_count groups are reported.
    pub(crate) fn from_match(
        id: usize,
        tag: &str,
        m: &VmMatch,
        tape: &Tape,
        group_count: usize,
    ) -> Token {
        let mut token = Token::new(tag, m.start, m.end, tape.substring(m.start, m.end));
        token.id = id;
        token.match_index = m.rule;
        for &(gi, pos) in &m.groups {
            token.groups.entry(gi).or_default().push(pos);
        }
        for gi in 0..group_count as GroupIndex {
            if let Some(span) = m.group(gi) {
                token.positions.insert(gi, span);
            }
        }
        token
    }

    /// \return whether the tag is one of \p tags.
    pub fn is_one_of<S: AsRef<str>>(&self, tags: &[S]) -> bool {
        tags.iter().any(|t| t.as_ref() == self.tag)
    }

    /// \return whether \p other is the same lexeme at the same place,
    /// ignoring ids and incremental bookkeeping.
    pub fn same_lexeme(&self, other: &Token) -> bool {
        self.tag == other.tag
            && self.start == other.start
            && self.end == other.end
            && self.value == other.value
    }

    /// \return a copy moved by \p delta chars.
    pub fn shifted(&self, delta: isize) -> Token {
        let shift = |p: usize| p.saturating_add_signed(delta);
        let mut token = self.clone();
        token.start = shift(self.start);
        token.end = shift(self.end);
        for offsets in token.groups.values_mut() {
            for p in offsets.iter_mut() {
                *p = shift(*p);
            }
        }
        for span in token.positions.values_mut() {
            *span = (shift(span.0), shift(span.1));
        }
        token
    }
}

/// Buffers tokens from a source to provide k-token lookahead and
/// expectation checks, as a parser wants.
pub struct TokenBuffer<F>
where
    F: FnMut(&mut Tape) -> Result<Option<Token>>,
{
    tape: Tape,
    next_token: F,
    buffer: VecDeque<Token>,
}

impl<F> TokenBuffer<F>
where
    F: FnMut(&mut Tape) -> Result<Option<Token>>,
{
    pub fn new(tape: Tape, next_token: F) -> Self {
        TokenBuffer {
            tape,
            next_token,
            buffer: VecDeque::new(),
        }
    }

    pub fn tape(&self) -> &Tape {
        &self.tape
    }

    /// Peek at the \p nth token ahead, reading from the source as needed.
    pub fn peek(&mut self, nth: usize) -> Result<Option<&Token>> {
        while self.buffer.len() <= nth {
            match (self.next_token)(&mut self.tape)? {
                Some(token) => self.buffer.push_back(token),
                None => return Ok(None),
            }
        }
        Ok(self.buffer.get(nth))
    }

    pub fn next(&mut self) -> Result<Option<Token>> {
        self.peek(0)?;
        Ok(self.buffer.pop_front())
    }

    /// Drop the next buffered token, if any.
    pub fn consume(&mut self) {
        self.buffer.pop_front();
    }

    /// \return whether the next token is one of \p tags.
    pub fn match_tag<S: AsRef<str>>(&mut self, tags: &[S]) -> Result<bool> {
        Ok(self.peek(0)?.map_or(false, |t| t.is_one_of(tags)))
    }

    /// \return the next token without consuming it, if it is one of \p tags.
    pub fn next_matches<S: AsRef<str>>(&mut self, tags: &[S]) -> Result<Option<&Token>> {
        Ok(self.peek(0)?.filter(|t| t.is_one_of(tags)))
    }

    /// Consume and return the next token if it is one of \p tags.
    pub fn consume_if<S: AsRef<str>>(&mut self, tags: &[S]) -> Result<Option<Token>> {
        if self.match_tag(tags)? {
            return self.next();
        }
        Ok(None)
    }

    /// Consume the next token, which must be one of \p tags.
    pub fn expect_token<S: AsRef<str>>(&mut self, tags: &[S]) -> Result<Token> {
        self.ensure_token(tags)?;
        self.next()?.ok_or(Error::UnexpectedEndOfInput)
    }

    /// Check that the next token is one of \p tags, without consuming it.
    pub fn ensure_token<S: AsRef<str>>(&mut self, tags: &[S]) -> Result<&Token> {
        match self.peek(0)? {
            None => Err(Error::UnexpectedEndOfInput),
            Some(t) if t.is_one_of(tags) => Ok(t),
            Some(t) => Err(Error::UnexpectedToken {
                found: Box::new(t.clone()),
                expected: tags.iter().map(|s| s.as_ref().to_string()).collect(),
            }),
        }
    }
}
