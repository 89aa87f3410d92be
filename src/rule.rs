//! Tokenizer rules and their configuration

use crate::api::Flags;
use crate::error::Result;
use crate::ir::Regex;
use crate::types::{LexerState, Priority, RuleIndex, DEFAULT_PRIORITY};
use crate::{flexparse, parse};

/// The source of a rule's expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    /// A JS-style pattern; the default for strings.
    Js(String),

    /// A Flex-style pattern.
    Flex(String),

    /// An already-built expression.
    Regex(Regex),
}

impl Pattern {
    /// Parse into an expression.
    pub fn to_regex(&self) -> Result<Regex> {
        match self {
            Pattern::Js(text) => parse::parse(text),
            Pattern::Flex(text) => flexparse::parse(text),
            Pattern::Regex(re) => Ok(re.clone()),
        }
    }
}

impl From<&str> for Pattern {
    fn from(text: &str) -> Pattern {
        Pattern::Js(text.to_string())
    }
}

impl From<String> for Pattern {
    fn from(text: String) -> Pattern {
        Pattern::Js(text)
    }
}

impl From<Regex> for Pattern {
    fn from(re: Regex) -> Pattern {
        Pattern::Regex(re)
    }
}

/// How a rule is registered with a tokenizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleConfig {
    /// The tag given to tokens of this rule. Rules are also referenced by
    /// tag from `{name}` patterns.
    pub tag: String,

    /// Higher priorities win over longer matches of lower priorities.
    pub priority: Priority,

    /// If false, the first match of this rule is final.
    pub is_greedy: bool,

    /// Skip rules consume their match without producing a token.
    pub skip: bool,

    /// Mode flags for the whole pattern; None uses the tokenizer defaults
    /// (dot matches newlines, anchors match at lines).
    pub flags: Option<Flags>,

    /// The lexer states the rule is active in; empty means all.
    pub states: Vec<LexerState>,
}

impl Default for RuleConfig {
    fn default() -> Self {
        RuleConfig {
            tag: String::new(),
            priority: DEFAULT_PRIORITY,
            is_greedy: true,
            skip: false,
            flags: None,
            states: Vec::new(),
        }
    }
}

impl RuleConfig {
    pub fn new(tag: &str) -> RuleConfig {
        RuleConfig {
            tag: tag.to_string(),
            ..Default::default()
        }
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn greedy(mut self, is_greedy: bool) -> Self {
        self.is_greedy = is_greedy;
        self
    }

    pub fn skip(mut self, skip: bool) -> Self {
        self.skip = skip;
        self
    }

    pub fn flags(mut self, flags: Flags) -> Self {
        self.flags = Some(flags);
        self
    }

    pub fn states(mut self, states: Vec<LexerState>) -> Self {
        self.states = states;
        self
    }
}

/// A rule as held by a tokenizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub expr: Regex,
    pub tag: String,
    pub priority: Priority,
    pub is_greedy: bool,
    pub skip: bool,
    pub states: Vec<LexerState>,

    /// Registration order; breaks priority ties and identifies the rule in
    /// matches.
    pub match_index: RuleIndex,
}

impl Rule {
    pub fn new(expr: Regex, config: RuleConfig, match_index: RuleIndex) -> Rule {
        let expr = match config.flags {
            Some(flags) => flags.apply(expr),
            None => expr,
        };
        Rule {
            expr,
            tag: config.tag,
            priority: config.priority,
            is_greedy: config.is_greedy,
            skip: config.skip,
            states: config.states,
            match_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patterns() {
        let js: Pattern = "a b".into();
        assert_eq!(js.to_regex().unwrap().to_string(), "a b");
        let flex = Pattern::Flex("\"a.\"+".to_string());
        assert_eq!(flex.to_regex().unwrap().to_string(), "(?:a\\.)+");
        assert!(Pattern::from("(").to_regex().is_err());
    }

    #[test]
    fn test_config() {
        let config = RuleConfig::new("NUM").priority(20).greedy(false).states(vec![3]);
        let rule = Rule::new(Regex::literal("1"), config, 4);
        assert_eq!(rule.tag, "NUM");
        assert_eq!(rule.priority, 20);
        assert!(!rule.is_greedy && !rule.skip);
        assert_eq!(rule.states, vec![3]);
        assert_eq!(rule.match_index, 4);

        let rule = Rule::new(Regex::literal("a"), RuleConfig::new("A").flags("i".into()), 0);
        assert_eq!(rule.expr.ignore_case, Some(true));
        assert_eq!(rule.expr.dot_all, Some(false));
    }
}
