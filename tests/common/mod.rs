#![allow(clippy::uninlined_format_args)]
#![allow(dead_code)]

use std::sync::Once;
use tlex::{RuleConfig, Token, Tokenizer};

static INIT: Once = Once::new();

/// Route `log` output to the test harness, filtered by RUST_LOG.
pub fn init_logging() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// Test that \p pattern fails to parse with default flags.
#[track_caller]
pub fn test_parse_fails(pattern: &str) {
    let res = tlex::Regex::new(pattern);
    assert!(res.is_err(), "Pattern should not have parsed: {}", pattern);
}

/// Test that \p pattern fails to parse with flags.
#[track_caller]
pub fn test_parse_fails_flags(pattern: &str, flags: &str) {
    let res = tlex::Regex::with_flags(pattern, flags);
    assert!(res.is_err(), "Pattern should not have parsed: {}", pattern);
}

/// Format a Match by inserting commas between all capture groups.
fn format_match(r: &tlex::Match, input: &str) -> String {
    let mut result = input[r.range()].to_string();
    for cg in r.captures.iter() {
        result.push(',');
        if let Some(cg) = cg {
            result.push_str(&input[cg.clone()])
        }
    }
    result
}

pub trait StringTestHelpers {
    /// "Fluent" style helper for testing that a String is equal to a str.
    fn test_eq(&self, s: &str);
}

impl StringTestHelpers for String {
    #[track_caller]
    fn test_eq(&self, rhs: &str) {
        pretty_assertions::assert_eq!(self.as_str(), rhs)
    }
}

pub trait VecTestHelpers {
    /// "Fluent" style helper for testing that a Vec<&str> is equal to a
    /// Vec<&str>.
    fn test_eq(&self, rhs: Vec<&str>);
}

impl VecTestHelpers for Vec<&str> {
    #[track_caller]
    fn test_eq(&self, rhs: Vec<&str>) {
        pretty_assertions::assert_eq!(*self, rhs)
    }
}

impl VecTestHelpers for Vec<String> {
    #[track_caller]
    fn test_eq(&self, rhs: Vec<&str>) {
        let lhs: Vec<&str> = self.iter().map(String::as_str).collect();
        pretty_assertions::assert_eq!(lhs, rhs)
    }
}

pub trait TokenTestHelpers {
    /// The values of the tokens, in order.
    fn values(&self) -> Vec<&str>;

    /// The tokens formatted as `TAG:value`.
    fn tagged(&self) -> Vec<String>;

    /// Test that the tokens have the same tags, spans and values as \p rhs.
    fn test_same_lexemes(&self, rhs: &[Token]);
}

impl TokenTestHelpers for [Token] {
    fn values(&self) -> Vec<&str> {
        self.iter().map(|t| t.value.as_str()).collect()
    }

    fn tagged(&self) -> Vec<String> {
        self.iter().map(|t| format!("{}:{}", t.tag, t.value)).collect()
    }

    #[track_caller]
    fn test_same_lexemes(&self, rhs: &[Token]) {
        let fmt = |tokens: &[Token]| -> Vec<String> {
            tokens
                .iter()
                .map(|t| format!("{}:{}@{}..{}", t.tag, t.value, t.start, t.end))
                .collect()
        };
        pretty_assertions::assert_eq!(fmt(self), fmt(rhs));
    }
}

impl TokenTestHelpers for Vec<Token> {
    fn values(&self) -> Vec<&str> {
        self.as_slice().values()
    }

    fn tagged(&self) -> Vec<String> {
        self.as_slice().tagged()
    }

    #[track_caller]
    fn test_same_lexemes(&self, rhs: &[Token]) {
        self.as_slice().test_same_lexemes(rhs)
    }
}

/// A tokenizer for identifiers, numbers and punctuation, skipping spaces.
pub fn word_tokenizer() -> Tokenizer {
    let mut tokenizer = Tokenizer::new();
    tokenizer
        .add("[a-zA-Z_][a-zA-Z_0-9]*", RuleConfig::new("ID"))
        .and_then(|t| t.add("[0-9]+", RuleConfig::new("NUM")))
        .and_then(|t| t.add("[-+*/=;(){}]", RuleConfig::new("PUNCT")))
        .and_then(|t| t.add("\\s+", RuleConfig::new("WS").skip(true)))
        .expect("Rules should be valid");
    tokenizer
}

/// A compiled regex, with helpers for testing it.
#[derive(Debug, Clone)]
pub struct TestCompiledRegex {
    re: tlex::Regex,
}

impl TestCompiledRegex {
    /// Search for self in \p input, returning a list of all matches.
    pub fn matches(&self, input: &str, start: usize) -> Vec<tlex::Match> {
        self.re.find_from(input, start).collect()
    }

    /// Search for self in \p input, returning the first Match, or None if
    /// none.
    pub fn find(&self, input: &str) -> Option<tlex::Match> {
        self.matches(input, 0).into_iter().next()
    }

    /// Match against a string, returning the first formatted match.
    #[track_caller]
    pub fn match1f(&self, input: &str) -> String {
        match self.find(input) {
            Some(m) => format_match(&m, input),
            None => panic!("Failed to match {}", input),
        }
    }

    /// Match against a string, returning the string of the named capture group given.
    #[track_caller]
    pub fn match1_named_group(&self, input: &str, group: &str) -> String {
        match self.find(input) {
            Some(m) => match m.named_group(group) {
                Some(r) => match input.get(r.clone()) {
                    Some(str) => str.to_string(),
                    None => panic!("Cannot get range from string input {:?}", r),
                },
                None => panic!("Named capture group does not exist {}", group),
            },
            None => panic!("Failed to match {}", input),
        }
    }

    /// Match against a string, returning the match as a Vec containing None
    /// for unmatched groups, or the matched strings.
    #[track_caller]
    pub fn match1_vec<'b>(&self, input: &'b str) -> Vec<Option<&'b str>> {
        let mut result = Vec::new();
        let m: tlex::Match = self.find(input).expect("Failed to match");
        result.push(Some(&input[m.range()]));
        for cr in m.captures {
            result.push(cr.map(|r| &input[r]));
        }
        result
    }

    /// Test that matching against \p input fails.
    #[track_caller]
    pub fn test_fails(&self, input: &str) {
        assert!(self.find(input).is_none(), "Should not have matched")
    }

    /// Test that matching against \p input succeeds.
    #[track_caller]
    pub fn test_succeeds(&self, input: &str) {
        assert!(self.find(input).is_some(), "Should have matched")
    }

    /// Return a list of all non-overlapping total match ranges from a given
    /// start.
    pub fn match_all_from(&self, input: &str, start: usize) -> Vec<tlex::Range> {
        self.matches(input, start)
            .into_iter()
            .map(move |m| m.range())
            .collect()
    }

    /// Return a list of all non-overlapping matches.
    pub fn match_all<'b>(&self, input: &'b str) -> Vec<&'b str> {
        self.matches(input, 0)
            .into_iter()
            .map(move |m| &input[m.range()])
            .collect()
    }

    /// Collect all matches into a String, separated by commas.
    pub fn run_global_match(&self, input: &str) -> String {
        self.matches(input, 0)
            .into_iter()
            .map(move |m| format_match(&m, input))
            .collect::<Vec<String>>()
            .join(",")
    }
}

/// Compile a pattern to a regex, with default flags.
#[track_caller]
pub fn compile(pattern: &str) -> TestCompiledRegex {
    compilef(pattern, "")
}

/// Compile a pattern to a regex, with given flags.
#[track_caller]
pub fn compilef(pattern: &str, flags_str: &str) -> TestCompiledRegex {
    match tlex::Regex::with_flags(pattern, flags_str) {
        Ok(re) => TestCompiledRegex { re },
        Err(err) => panic!(
            "Failed to parse! flags: {} pattern: {}, error: {}",
            flags_str, pattern, err
        ),
    }
}

/// Test that \p pattern and \p flags successfully parses, and matches
/// \p input.
#[track_caller]
pub fn test_match_succeeds(pattern: &str, flags_str: &str, input: &str) {
    compilef(pattern, flags_str).test_succeeds(input)
}

/// Test that \p pattern and \p flags successfully parses, and does not
/// match \p input.
#[track_caller]
pub fn test_match_fails(pattern: &str, flags_str: &str, input: &str) {
    compilef(pattern, flags_str).test_fails(input)
}
