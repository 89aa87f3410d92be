//! Turns a prioritized rule set into a token stream

use crate::emit::{self, CompileOptions};
use crate::error::{Error, Result};
use crate::flexparse;
use crate::insn::Program;
use crate::ir::Regex;
use crate::pikevm::PikeVm;
use crate::rule::{Pattern, Rule, RuleConfig};
use crate::tape::Tape;
use crate::token::Token;
use crate::types::{LexerState, RuleIndex};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// What a match handler sees besides the token.
pub struct MatchContext<'a> {
    tape: &'a Tape,
    state: LexerState,
}

impl<'a> MatchContext<'a> {
    /// The input being tokenized; its cursor is at the end of the token.
    pub fn tape(&self) -> &Tape {
        self.tape
    }

    pub fn state(&self) -> LexerState {
        self.state
    }

    /// Switch the lexer state for the following tokens.
    pub fn set_state(&mut self, state: LexerState) {
        self.state = state;
    }
}

/// Called with each token of its rule. Returning None skips the token.
pub type MatchHandler = Box<dyn FnMut(&mut MatchContext, Token) -> Option<Token>>;

#[derive(Default)]
pub struct Tokenizer {
    /// Rules in registration order; a rule's match_index is its position.
    rules: Vec<Rule>,
    handlers: Vec<Option<MatchHandler>>,
    variables: HashMap<String, Regex>,
    options: CompileOptions,

    /// Compiled lazily; cleared whenever rules or variables change.
    program: Option<Rc<Program>>,

    state: LexerState,
    next_token_id: usize,
}

impl fmt::Debug for Tokenizer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Tokenizer")
            .field("rules", &self.rules)
            .field("variables", &self.variables)
            .field("state", &self.state)
            .finish()
    }
}

impl Tokenizer {
    pub fn new() -> Tokenizer {
        Default::default()
    }

    pub fn with_options(options: CompileOptions) -> Tokenizer {
        Tokenizer {
            options,
            ..Default::default()
        }
    }

    /// Add a rule. Adding a rule whose tag is already registered extends
    /// that rule with the new pattern as an alternative.
    pub fn add<P: Into<Pattern>>(&mut self, pattern: P, config: RuleConfig) -> Result<&mut Self> {
        self.add_rule(pattern.into(), config, None)
    }

    /// Add a rule whose tokens pass through \p handler.
    pub fn add_with_handler<P, H>(&mut self, pattern: P, config: RuleConfig, handler: H) -> Result<&mut Self>
    where
        P: Into<Pattern>,
        H: FnMut(&mut MatchContext, Token) -> Option<Token> + 'static,
    {
        self.add_rule(pattern.into(), config, Some(Box::new(handler)))
    }

    fn add_rule(
        &mut self,
        pattern: Pattern,
        config: RuleConfig,
        handler: Option<MatchHandler>,
    ) -> Result<&mut Self> {
        let expr = pattern.to_regex()?;
        let existing = if config.tag.is_empty() {
            None
        } else {
            self.rules.iter().position(|r| r.tag == config.tag)
        };
        match existing {
            Some(idx) => {
                let extra = Rule::new(expr, config, idx as RuleIndex);
                let rule = &mut self.rules[idx];
                rule.expr = Regex::union(vec![rule.expr.clone(), extra.expr]);
                if handler.is_some() {
                    self.handlers[idx] = handler;
                }
            }
            None => {
                let match_index = self.rules.len() as RuleIndex;
                self.rules.push(Rule::new(expr, config, match_index));
                self.handlers.push(handler);
            }
        }
        self.program = None;
        Ok(self)
    }

    /// Register a variable for `{name}` references. Adding an existing name
    /// extends it with the new pattern as an alternative.
    pub fn add_var<P: Into<Pattern>>(&mut self, name: &str, pattern: P) -> Result<&mut Self> {
        let re = pattern.into().to_regex()?;
        Ok(self.add_var_regex(name, re))
    }

    pub fn add_var_regex(&mut self, name: &str, re: Regex) -> &mut Self {
        let merged = match self.variables.remove(name) {
            Some(old) => Regex::union(vec![old, re]),
            None => re,
        };
        self.variables.insert(name.to_string(), merged);
        self.program = None;
        self
    }

    /// Register every definition of a Flex definitions section as a variable.
    pub fn add_flex_definitions(&mut self, text: &str) -> Result<&mut Self> {
        for (name, re) in flexparse::parse_definitions(text)? {
            self.add_var_regex(&name, re);
        }
        Ok(self)
    }

    pub fn get_var(&self, name: &str) -> Option<&Regex> {
        self.variables.get(name)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn rule_by_tag(&self, tag: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.tag == tag)
    }

    pub fn state(&self) -> LexerState {
        self.state
    }

    pub fn set_state(&mut self, state: LexerState) {
        self.state = state;
    }

    /// Return to the initial lexer state.
    pub fn reset(&mut self) {
        self.state = 0;
    }

    /// Compile the rules, if they changed since the last compile.
    pub fn compile(&mut self) -> Result<Rc<Program>> {
        if let Some(prog) = &self.program {
            return Ok(Rc::clone(prog));
        }
        let prog = {
            let mut sorted: Vec<&Rule> = self.rules.iter().collect();
            sorted.sort_by(|a, b| {
                b.priority
                    .cmp(&a.priority)
                    .then(a.match_index.cmp(&b.match_index))
            });
            let variables = &self.variables;
            let rules = &self.rules;
            let resolver = |name: &str| {
                variables
                    .get(name)
                    .or_else(|| rules.iter().find(|r| r.tag == name).map(|r| &r.expr))
                    .cloned()
            };
            Rc::new(emit::compile(&sorted, &resolver, self.options)?)
        };
        log::debug!(
            "compiled {} rules into {} instructions",
            self.rules.len(),
            prog.len()
        );
        self.program = Some(Rc::clone(&prog));
        Ok(prog)
    }

    /// Read the next token from the tape's cursor, skipping tokens that are
    /// dropped by skip rules or handlers.
    /// \return None at the end of input.
    pub fn next(&mut self, tape: &mut Tape) -> Result<Option<Token>> {
        let prog = self.compile()?;
        // The furthest position examined by tokens dropped so far.
        let mut dropped_reach: usize = 0;
        while tape.has_more() {
            let start = tape.index();
            let mut vm = PikeVm::new(&prog).with_state(self.state);
            let m = match (vm.match_tape(tape), tape.current()) {
                (Some(m), _) => m,
                (None, ch) => {
                    let (line, column) = tape.line_col(start);
                    return Err(Error::UnexpectedCharacter {
                        offset: start,
                        line,
                        column,
                        ch: ch.unwrap_or(char::REPLACEMENT_CHARACTER),
                    });
                }
            };
            let furthest = vm.stats().furthest;
            let idx = m.rule as usize;
            let rule = &self.rules[idx];
            let skip = rule.skip;
            let mut token =
                Token::from_match(self.next_token_id, &rule.tag, &m, tape, prog.group_count);
            self.next_token_id += 1;
            token.lookahead = furthest.saturating_sub(m.end).max(1);
            let reach = m.end + token.lookahead;

            let token = match &mut self.handlers[idx] {
                Some(handler) => {
                    let mut ctx = MatchContext {
                        tape,
                        state: self.state,
                    };
                    let out = handler(&mut ctx, token);
                    self.state = ctx.state;
                    out
                }
                None => Some(token),
            };
            match token {
                Some(mut token) if !skip => {
                    token.state = self.state;
                    token.skipped_lookahead = dropped_reach.saturating_sub(token.start);
                    return Ok(Some(token));
                }
                _ => dropped_reach = dropped_reach.max(reach),
            }
        }
        Ok(None)
    }

    /// Tokenize all of \p input from the current lexer state.
    pub fn tokenize(&mut self, input: &str) -> Result<Vec<Token>> {
        let mut tape = Tape::new(input);
        let mut tokens = Vec::new();
        while let Some(token) = self.next(&mut tape)? {
            tokens.push(token);
        }
        Ok(tokens)
    }
}
