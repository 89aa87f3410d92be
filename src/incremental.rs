//! Incremental re-lexing: after an edit, only the tokens the edit can affect
//! are lexed again, and the unaffected suffix of the previous token list is
//! reused once the new tokens converge with it.

use crate::error::Result;
use crate::tape::Tape;
use crate::token::Token;
use crate::tokenizer::Tokenizer;
use crate::util::splice_chars;
use std::time::{Duration, Instant};

/// One edit of a document, in char offsets of the text before the edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditRange {
    pub start: usize,
    pub end: usize,
    pub new_text: String,
}

impl EditRange {
    pub fn new(start: usize, end: usize, new_text: &str) -> EditRange {
        EditRange {
            start,
            end,
            new_text: new_text.to_string(),
        }
    }

    pub fn insert(pos: usize, text: &str) -> EditRange {
        EditRange::new(pos, pos, text)
    }

    pub fn delete(start: usize, end: usize) -> EditRange {
        EditRange::new(start, end, "")
    }

    /// The number of chars of new text.
    pub fn new_len(&self) -> usize {
        self.new_text.chars().count()
    }

    /// The change in document length.
    pub fn delta(&self) -> isize {
        self.new_len() as isize - (self.end - self.start) as isize
    }

    /// \return \p text with this edit applied.
    pub fn apply(&self, text: &str) -> String {
        splice_chars(text, self.start, self.end, &self.new_text)
    }
}

/// When buffered single-char edits are flushed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AccumulatorConfig {
    /// Flush once this many edits are pending.
    pub max_edits: usize,

    /// Flush once the oldest pending edit is this old.
    pub max_delay: Duration,
}

impl Default for AccumulatorConfig {
    fn default() -> Self {
        AccumulatorConfig {
            max_edits: 10,
            max_delay: Duration::from_millis(16),
        }
    }
}

/// What the last update did.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct RelexStats {
    /// Index of the first token that was lexed again.
    pub restart_index: usize,

    /// The number of tokens produced by re-lexing.
    pub relexed: usize,

    /// The index, in the previous token list, of the token at which the new
    /// tokens converged; None if lexing ran to the end of input.
    pub converged_at: Option<usize>,
}

/// Called with the token list after each accumulator flush.
pub type UpdateCallback = Box<dyn FnMut(&[Token])>;

fn shift(pos: usize, delta: isize) -> usize {
    pos.saturating_add_signed(delta)
}

/// The tokens of the last lexed input.
/// Tokens from `suffix_start` on still hold offsets from before the last
/// update and must be shifted by `suffix_delta` when read.
#[derive(Debug, Clone)]
struct TokenCache {
    tokens: Vec<Token>,
    input: String,
    input_len: usize,
    suffix_delta: isize,
    suffix_start: usize,

    // The largest lookahead of any token seen, skipped ones included;
    // bounds lookback scans.
    max_lookahead: usize,
}

/// The furthest lookahead recorded on \p token.
fn widest_lookahead(token: &Token) -> usize {
    token.lookahead.max(token.skipped_lookahead)
}

impl TokenCache {
    fn new(tokens: Vec<Token>, input: &str) -> TokenCache {
        let max_lookahead = tokens.iter().map(widest_lookahead).max().unwrap_or(1);
        let suffix_start = tokens.len();
        let mut cache = TokenCache {
            tokens,
            input: input.to_string(),
            input_len: input.chars().count(),
            suffix_delta: 0,
            suffix_start,
            max_lookahead,
        };
        cache.update_lookbacks(0, cache.tokens.len());
        cache
    }

    /// \return the current (start, end) of token \p idx.
    fn span(&self, idx: usize) -> (usize, usize) {
        let t = &self.tokens[idx];
        if idx >= self.suffix_start {
            (shift(t.start, self.suffix_delta), shift(t.end, self.suffix_delta))
        } else {
            (t.start, t.end)
        }
    }

    /// \return a copy of token \p idx with its offsets current.
    fn adjusted(&self, idx: usize) -> Token {
        let t = &self.tokens[idx];
        if idx >= self.suffix_start && self.suffix_delta != 0 {
            t.shifted(self.suffix_delta)
        } else {
            t.clone()
        }
    }

    /// Apply any deferred shift.
    fn materialize(&mut self) {
        if self.suffix_delta != 0 {
            let delta = self.suffix_delta;
            for t in &mut self.tokens[self.suffix_start..] {
                *t = t.shifted(delta);
            }
        }
        self.suffix_delta = 0;
        self.suffix_start = self.tokens.len();
    }

    /// \return the index of the first token ending after \p pos.
    fn first_ending_after(&self, pos: usize) -> usize {
        let (mut lo, mut hi) = (0, self.tokens.len());
        while lo < hi {
            let mid = (lo + hi) / 2;
            if self.span(mid).1 > pos {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
        lo
    }

    /// Recompute the lookback of tokens \p from..\p to: the distance back to
    /// the earliest token whose lookahead reaches into it, at least 1.
    fn update_lookbacks(&mut self, from: usize, to: usize) {
        for i in from..to.min(self.tokens.len()) {
            let start = self.span(i).0;
            let mut lookback = 1;
            for j in (0..i).rev() {
                let end = self.span(j).1;
                if end + self.max_lookahead <= start {
                    break;
                }
                if end + self.tokens[j].lookahead > start {
                    lookback = i - j;
                }
            }
            self.tokens[i].lookback = lookback;
        }
    }

    /// Find the first token an edit at \p edit_start may change.
    /// Expects materialized offsets.
    fn affected_start(&self, edit_start: usize) -> usize {
        let len = self.tokens.len();
        if len == 0 {
            return 0;
        }
        let first = self.first_ending_after(edit_start);
        let mut idx = if first >= len {
            len - 1
        } else {
            first.saturating_sub(self.tokens[first].lookback)
        };
        // Earlier tokens whose lookahead reaches the edit must be redone
        // too, as must the skipped text before them if it looked that far.
        for k in (0..idx).rev() {
            let prev = &self.tokens[k];
            if prev.end + self.max_lookahead <= edit_start {
                break;
            }
            if prev.end + prev.lookahead > edit_start
                || prev.start + prev.skipped_lookahead > edit_start
            {
                idx = k;
            }
        }
        idx
    }

    /// \return the index of an old token, at or after \p from, that
    /// \p token reproduces after a shift of \p delta.
    /// Expects materialized offsets.
    fn convergence_point(&self, token: &Token, from: usize, delta: isize) -> Option<usize> {
        let old_end = token.end as isize - delta;
        if old_end < 0 {
            return None;
        }
        let old_end = old_end as usize;
        let tail = &self.tokens[from.min(self.tokens.len())..];
        let idx = from + tail.partition_point(|t| t.end < old_end);
        let old = self.tokens.get(idx)?;
        let converged = old.end == old_end
            && old.tag == token.tag
            && old.state == token.state
            && shift(old.start, delta) == token.start;
        converged.then_some(idx)
    }
}

/// Wraps a Tokenizer, keeping the tokens of the last input so that edits
/// only re-lex the region they affect.
pub struct IncrementalTokenizer {
    tokenizer: Tokenizer,
    cache: Option<TokenCache>,
    last_relex: RelexStats,

    // Buffered edits, in the coordinates of the document as edited so far,
    // and the text they produce.
    pending: Vec<EditRange>,
    pending_text: Option<String>,
    first_pending: Option<Instant>,
    config: AccumulatorConfig,
    on_update: Option<UpdateCallback>,
}

impl IncrementalTokenizer {
    pub fn new(tokenizer: Tokenizer) -> IncrementalTokenizer {
        IncrementalTokenizer {
            tokenizer,
            cache: None,
            last_relex: RelexStats::default(),
            pending: Vec::new(),
            pending_text: None,
            first_pending: None,
            config: AccumulatorConfig::default(),
            on_update: None,
        }
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    /// Tokenize \p input from scratch, replacing the cache.
    pub fn tokenize(&mut self, input: &str) -> Result<&[Token]> {
        self.tokenizer.reset();
        let tokens = self.tokenizer.tokenize(input)?;
        self.last_relex = RelexStats {
            restart_index: 0,
            relexed: tokens.len(),
            converged_at: None,
        };
        let cache = self.cache.insert(TokenCache::new(tokens, input));
        Ok(&cache.tokens)
    }

    /// Update the tokens for \p new_input, which is the cached input with
    /// \p edit applied. On error the cache is left as it was.
    pub fn update(&mut self, new_input: &str, edit: EditRange) -> Result<&[Token]> {
        let usable = self.cache.as_ref().map_or(false, |cache| {
            edit.start <= edit.end
                && edit.end <= cache.input_len
                && shift(cache.input_len, edit.delta()) == new_input.chars().count()
        });
        if !usable {
            log::debug!("no usable token cache, tokenizing from scratch");
            return self.tokenize(new_input);
        }
        let cache = match self.cache.as_mut() {
            Some(cache) => cache,
            None => return Ok(&[]),
        };
        cache.materialize();
        let delta = edit.delta();
        let restart = cache.affected_start(edit.start);
        let (start_state, start_offset) = match restart.checked_sub(1) {
            Some(prev) => (cache.tokens[prev].state, cache.tokens[prev].end),
            None => (0, 0),
        };

        let mut tape = Tape::new(new_input);
        tape.set_index(start_offset);
        self.tokenizer.set_state(start_state);
        let edit_end = edit.start + edit.new_len();
        let mut fresh = Vec::new();
        let mut converged_at = None;
        while let Some(token) = self.tokenizer.next(&mut tape)? {
            let past_edit = token.end > edit_end;
            let found = if past_edit {
                cache.convergence_point(&token, restart, delta)
            } else {
                None
            };
            fresh.push(token);
            if found.is_some() {
                converged_at = found;
                break;
            }
        }

        let relexed = fresh.len();
        let mut tokens = core::mem::take(&mut cache.tokens);
        let suffix = match converged_at {
            Some(idx) => tokens.split_off(idx + 1),
            None => Vec::new(),
        };
        tokens.truncate(restart);
        let seam_reach = fresh
            .iter()
            .map(|t| t.end + t.lookahead)
            .max()
            .unwrap_or(start_offset);
        cache.max_lookahead = fresh
            .iter()
            .map(widest_lookahead)
            .fold(cache.max_lookahead, usize::max);
        tokens.extend(fresh);
        cache.suffix_start = tokens.len();
        cache.suffix_delta = if suffix.is_empty() { 0 } else { delta };
        tokens.extend(suffix);
        cache.tokens = tokens;
        cache.input = new_input.to_string();
        cache.input_len = shift(cache.input_len, delta);

        // Tokens just past the seam may now be reached by new lookaheads.
        let mut to = cache.suffix_start;
        while to < cache.tokens.len() && cache.span(to).0 < seam_reach {
            to += 1;
        }
        cache.update_lookbacks(restart, to + 1);

        self.last_relex = RelexStats {
            restart_index: restart,
            relexed,
            converged_at,
        };
        log::debug!(
            "relexed {} tokens from index {}, converged at {:?}",
            relexed,
            restart,
            converged_at
        );
        Ok(&cache.tokens)
    }

    /// Apply several edits to the cached input. Each edit is in the
    /// coordinates of the cached input; they are applied in document order.
    /// \p new_input is the expected result. On error the cache is left as it
    /// was.
    pub fn update_batch(&mut self, new_input: &str, mut edits: Vec<EditRange>) -> Result<&[Token]> {
        let saved = match &self.cache {
            Some(cache) if !edits.is_empty() => cache.clone(),
            _ => return self.tokenize(new_input),
        };
        edits.sort_by_key(|e| e.start);
        let mut current = saved.input.clone();
        let mut cumulative: isize = 0;
        for edit in edits {
            let moved = EditRange {
                start: shift(edit.start, cumulative),
                end: shift(edit.end, cumulative),
                new_text: edit.new_text,
            };
            cumulative += moved.delta();
            current = moved.apply(&current);
            if let Err(err) = self.update(&current, moved).map(|_| ()) {
                self.cache = Some(saved);
                return Err(err);
            }
        }
        if current != new_input {
            log::debug!("batch result differs from the given input, tokenizing from scratch");
            return self.tokenize(new_input);
        }
        Ok(self.tokens_ref())
    }

    fn tokens_ref(&mut self) -> &[Token] {
        match self.cache.as_mut() {
            Some(cache) => {
                cache.materialize();
                &cache.tokens
            }
            None => &[],
        }
    }

    /// All tokens, with offsets current.
    pub fn get_tokens(&mut self) -> &[Token] {
        self.tokens_ref()
    }

    /// \return the token covering char offset \p offset.
    pub fn get_token_at(&self, offset: usize) -> Option<Token> {
        let cache = self.cache.as_ref()?;
        let idx = cache.first_ending_after(offset);
        if idx < cache.tokens.len() && cache.span(idx).0 <= offset {
            Some(cache.adjusted(idx))
        } else {
            None
        }
    }

    /// \return the tokens overlapping \p start..\p end.
    pub fn get_tokens_in_range(&self, start: usize, end: usize) -> Vec<Token> {
        let cache = match &self.cache {
            Some(cache) => cache,
            None => return Vec::new(),
        };
        (cache.first_ending_after(start)..cache.tokens.len())
            .take_while(|&idx| cache.span(idx).0 < end)
            .map(|idx| cache.adjusted(idx))
            .collect()
    }

    /// The input the tokens were computed for.
    pub fn input(&self) -> &str {
        self.cache.as_ref().map_or("", |c| c.input.as_str())
    }

    pub fn last_relex(&self) -> RelexStats {
        self.last_relex
    }

    /// Buffer single-char edits, flushing per \p config. Each flush passes
    /// the new tokens to \p on_update.
    pub fn configure_accumulator<F>(&mut self, config: AccumulatorConfig, on_update: F)
    where
        F: FnMut(&[Token]) + 'static,
    {
        self.config = config;
        self.on_update = Some(Box::new(on_update));
    }

    /// Edits buffered and not yet applied.
    pub fn pending_edits(&self) -> &[EditRange] {
        &self.pending
    }

    /// Buffer \p edit, given in the coordinates of the document with every
    /// pending edit applied.
    /// \return whether the buffer was flushed.
    pub fn accumulate_edit(&mut self, edit: EditRange) -> Result<bool> {
        let text = self
            .pending_text
            .take()
            .unwrap_or_else(|| self.input().to_string());
        self.pending_text = Some(edit.apply(&text));
        self.pending.push(edit);
        let first = *self.first_pending.get_or_insert_with(Instant::now);
        if self.pending.len() >= self.config.max_edits || first.elapsed() >= self.config.max_delay {
            self.flush()?;
            return Ok(true);
        }
        Ok(false)
    }

    pub fn insert_char(&mut self, pos: usize, c: char) -> Result<bool> {
        self.accumulate_edit(EditRange::insert(pos, c.encode_utf8(&mut [0; 4])))
    }

    pub fn delete_char(&mut self, pos: usize) -> Result<bool> {
        self.accumulate_edit(EditRange::delete(pos, pos + 1))
    }

    pub fn replace_char(&mut self, pos: usize, c: char) -> Result<bool> {
        self.accumulate_edit(EditRange::new(pos, pos + 1, c.encode_utf8(&mut [0; 4])))
    }

    /// Flush if the oldest pending edit has waited out the delay.
    /// \return whether the buffer was flushed.
    pub fn flush_if_due(&mut self) -> Result<bool> {
        match self.first_pending {
            Some(first) if first.elapsed() >= self.config.max_delay => {
                self.flush()?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Apply every pending edit now.
    /// The pending edits are folded into a single edit of the original
    /// document spanning everything they changed.
    pub fn flush(&mut self) -> Result<&[Token]> {
        self.first_pending = None;
        let count = self.pending.len();
        self.pending.clear();
        let text = match self.pending_text.take() {
            Some(text) => text,
            None => return Ok(self.tokens_ref()),
        };
        let edit = diff_edit(self.input(), &text);
        log::trace!("flushing {} edits as {:?}", count, edit);
        if let Some(edit) = edit {
            self.update_batch(&text, vec![edit])?;
        }
        if let Some(mut on_update) = self.on_update.take() {
            on_update(self.tokens_ref());
            self.on_update = Some(on_update);
        }
        Ok(self.tokens_ref())
    }
}

/// \return the smallest single edit turning \p old into \p new, or None if
/// they are equal.
fn diff_edit(old: &str, new: &str) -> Option<EditRange> {
    let old_chars: Vec<char> = old.chars().collect();
    let new_chars: Vec<char> = new.chars().collect();
    let prefix = old_chars
        .iter()
        .zip(&new_chars)
        .take_while(|(a, b)| a == b)
        .count();
    if prefix == old_chars.len() && prefix == new_chars.len() {
        return None;
    }
    let suffix = old_chars[prefix..]
        .iter()
        .rev()
        .zip(new_chars[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();
    Some(EditRange {
        start: prefix,
        end: old_chars.len() - suffix,
        new_text: new_chars[prefix..new_chars.len() - suffix].iter().collect(),
    })
}
