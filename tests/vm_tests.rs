#![allow(clippy::uninlined_format_args)]

pub mod common;
use common::*;
use tlex::emit::compile_regex;
use tlex::ir::Regex;
use tlex::parse::parse;
use tlex::pikevm::PikeVm;
use tlex::{Flags, RuleConfig, Tape, Tokenizer};

fn no_vars(_: &str) -> Option<Regex> {
    None
}

fn rule(priority: i32) -> RuleConfig {
    RuleConfig::default().priority(priority)
}

/// Tokenize \p input with untagged rules, returning (value, rule index) pairs.
#[track_caller]
fn execute(input: &str, rules: &[(&str, RuleConfig)]) -> Vec<(String, u32)> {
    let mut tokenizer = Tokenizer::new();
    for (pattern, config) in rules {
        tokenizer.add(*pattern, config.clone()).unwrap();
    }
    match tokenizer.tokenize(input) {
        Ok(tokens) => tokens.into_iter().map(|t| (t.value, t.match_index)).collect(),
        Err(err) => panic!("Failed to tokenize {:?}: {}", input, err),
    }
}

#[track_caller]
fn expect_matches(found: Vec<(String, u32)>, expected: &[(&str, u32)]) {
    let found: Vec<(&str, u32)> = found.iter().map(|(v, i)| (v.as_str(), *i)).collect();
    pretty_assertions::assert_eq!(found, expected);
}

/// \return the value of the first token \p pattern produces at the start of
/// \p input.
fn first_match(pattern: &str, config: RuleConfig, input: &str) -> Option<String> {
    let mut tokenizer = Tokenizer::new();
    tokenizer.add(pattern, config).unwrap();
    let mut tape = Tape::new(input);
    tokenizer.next(&mut tape).ok().flatten().map(|t| t.value)
}

#[test]
fn test_chars() {
    expect_matches(
        execute("abcdeabcde", &[("abcde", rule(10))]),
        &[("abcde", 0), ("abcde", 0)],
    );
    let found = execute("abcdeabcde", &[("[a-e]", rule(10))]);
    assert_eq!(found.len(), 10);
    assert!(found.iter().all(|(v, i)| v.len() == 1 && *i == 0));
}

#[test]
fn test_first_rule_wins_at_equal_priority() {
    let rules = [("a", rule(10)), ("aa", rule(10)), ("aaa", rule(10))];
    expect_matches(execute("aaaa", &rules), &[("a", 0), ("a", 0), ("a", 0), ("a", 0)]);

    let rules = [("a", rule(100)), ("aa", rule(10)), ("aaa", rule(10))];
    expect_matches(execute("aaaa", &rules), &[("a", 0), ("a", 0), ("a", 0), ("a", 0)]);

    // Alternatives of one rule behave the same way.
    expect_matches(
        execute("aaaaa", &[("a|aa|aaa", rule(10))]),
        &[("a", 0), ("a", 0), ("a", 0), ("a", 0), ("a", 0)],
    );
}

#[test]
fn test_priority_dominates_length() {
    let rules = [("a", rule(10)), ("aa", rule(20))];
    expect_matches(execute("aaaa", &rules), &[("aa", 1), ("aa", 1)]);
    expect_matches(execute("aaaaa", &rules), &[("aa", 1), ("aa", 1), ("a", 0)]);
}

#[test]
fn test_quantifiers() {
    expect_matches(execute("aaaaa", &[("a*", rule(10))]), &[("aaaaa", 0)]);
    expect_matches(execute("abbbaaaba", &[("(a|b)*", rule(10))]), &[("abbbaaaba", 0)]);
    expect_matches(
        execute("abbbaaaba", &[("(a|b){0,2}", rule(10))]),
        &[("ab", 0), ("bb", 0), ("aa", 0), ("ab", 0), ("a", 0)],
    );
    let lazy = execute("abbbaaaba", &[("(a|b){0,2}?", rule(10))]);
    let values: Vec<&str> = lazy.iter().map(|(v, _)| v.as_str()).collect();
    values.test_eq(vec!["a", "b", "b", "b", "a", "a", "a", "b", "a"]);
    expect_matches(
        execute("abbbaaaba", &[("(a){0, 10}(a|b){5,10}", rule(10))]),
        &[("abbbaaaba", 0)],
    );
}

#[test]
fn test_rule_indexes() {
    let rules = [
        ("a", rule(10)),
        ("b", rule(10)),
        ("c", rule(10)),
        ("d", rule(10)),
        ("e", rule(10)),
    ];
    let found = execute("edcbaabcde", &rules);
    let indexes: Vec<u32> = found.iter().map(|(_, i)| *i).collect();
    assert_eq!(indexes, vec![4, 3, 2, 1, 0, 0, 1, 2, 3, 4]);
}

#[test]
fn test_lazy_rules() {
    expect_matches(
        execute("aaaaa", &[("a*?", rule(10)), ("aa", rule(10))]),
        &[("a", 0), ("a", 0), ("a", 0), ("a", 0), ("a", 0)],
    );
    expect_matches(
        execute("aaaaa", &[("aa", rule(20)), ("a*?", rule(10))]),
        &[("aa", 0), ("aa", 0), ("a", 1)],
    );

    // A non-greedy rule stops at its first match.
    let mut tokenizer = Tokenizer::new();
    tokenizer
        .add("a+", RuleConfig::new("A").greedy(false))
        .unwrap();
    tokenizer
        .tokenize("aaa")
        .unwrap()
        .values()
        .test_eq(vec!["a", "a", "a"]);
}

#[test]
fn test_comments() {
    let rules = [("/\\*.*?\\*/", rule(10)), ("[ \t\n\r]+", rule(10))];
    expect_matches(
        execute("/**2\n*/ ", &rules),
        &[("/**2\n*/", 0), (" ", 1)],
    );
    expect_matches(
        execute("/* c1 */ /** C2\n */  ", &rules),
        &[("/* c1 */", 0), (" ", 1), ("/** C2\n */", 0), ("  ", 1)],
    );
}

#[test]
fn test_look_ahead() {
    let cfg = RuleConfig::new("T");
    assert_eq!(first_match("abc(?=de)", cfg.clone(), "abcdef").as_deref(), Some("abc"));
    assert_eq!(first_match("abc(?=de)", cfg.clone(), "abcdx"), None);
    assert_eq!(first_match("abc(?!de)", cfg.clone(), "abcef").as_deref(), Some("abc"));
    assert_eq!(first_match("abc(?!de)", cfg.clone(), "abcdef"), None);
    assert_eq!(first_match("[^e]*(?=e)", cfg.clone(), "abcde").as_deref(), Some("abcd"));
    assert_eq!(first_match(".*(?=e)", cfg.clone(), "abcde").as_deref(), Some("abcd"));
    assert_eq!(first_match("abc(?=hello)", cfg.clone(), "abchello").as_deref(), Some("abc"));
    assert_eq!(first_match("abc(?=hello)", cfg, "abchell"), None);
}

#[test]
fn test_end_of_line() {
    let cfg = RuleConfig::new("T");
    assert_eq!(first_match(".*$", cfg.clone(), "x").as_deref(), Some("x"));
    assert_eq!(first_match(".*(?=\\n)", cfg.clone(), "x\n").as_deref(), Some("x"));
    assert_eq!(
        first_match(".*$", cfg.clone().flags(Flags::from("m")), "x\n").as_deref(),
        Some("x")
    );
    assert_eq!(first_match("//.*(?=\\n)", cfg.clone(), "//x\n").as_deref(), Some("//x"));
    assert_eq!(first_match("//.*$", cfg, "//abc").as_deref(), Some("//abc"));
}

#[test]
fn test_look_behind() {
    let re = compile("(?<!abc)def");
    re.match_all_from("abcdef xdef def", 0)
        .test_ranges(&[8..11, 12..15]);

    compile("(?<=\\$)\\d+").match_all("cost $42 or 17").test_eq(vec!["42"]);
    compile("(?<=a)(b+)").match1f("cbb abbb").test_eq("bbb,bbb");
    compile("(?<=^|,)\\w").match_all("ab,cd,,e").test_eq(vec!["a", "c", "e"]);
    compile("(?<=(?<=x)y)z").match_all("yz xyz").test_eq(vec!["z"]);
}

trait RangeTestHelpers {
    fn test_ranges(&self, rhs: &[tlex::Range]);
}

impl RangeTestHelpers for Vec<tlex::Range> {
    #[track_caller]
    fn test_ranges(&self, rhs: &[tlex::Range]) {
        assert_eq!(self.as_slice(), rhs)
    }
}

#[test]
fn test_linear_steps() {
    init_logging();
    // Every generation holds at most one thread per instruction.
    let prog = compile_regex(&parse("(a|a)*b").unwrap(), &no_vars).unwrap();
    for n in [10, 100, 1000] {
        let tape = Tape::new(&"a".repeat(n));
        let mut vm = PikeVm::new(&prog);
        assert!(vm.match_at(&tape, 0).is_none());
        let steps = vm.stats().steps;
        assert!(
            steps <= (n + 1) * prog.len(),
            "{} steps for input length {}",
            steps,
            n
        );
    }
}

#[test]
fn test_match_at_positions() {
    let prog = compile_regex(&parse("b+").unwrap(), &no_vars).unwrap();
    let tape = Tape::new("abba");
    let mut vm = PikeVm::new(&prog);
    assert!(vm.match_at(&tape, 0).is_none());
    let m = vm.match_at(&tape, 1).unwrap();
    assert_eq!((m.start, m.end, m.rule), (1, 3, 0));
    assert!(vm.match_at(&tape, 4).is_none());
    assert!(vm.match_at(&tape, 5).is_none());

    let mut tape = Tape::new("bbx");
    assert!(vm.match_tape(&mut tape).is_some());
    assert_eq!(tape.index(), 2);
    assert!(vm.match_tape(&mut tape).is_none());
    assert_eq!(tape.index(), 2);
}

#[test]
fn test_states() {
    let mut tokenizer = Tokenizer::new();
    tokenizer
        .add("x", RuleConfig::new("X").states(vec![1]))
        .unwrap();
    let prog = tokenizer.compile().unwrap();
    let tape = Tape::new("x");
    assert!(PikeVm::new(&prog).match_at(&tape, 0).is_none());
    assert!(PikeVm::new(&prog).with_state(1).match_at(&tape, 0).is_some());
}

#[test]
fn test_case_insensitive() {
    let cfg = RuleConfig::new("T").flags(Flags::from("i"));
    assert_eq!(first_match("[a-c]+", cfg.clone(), "AbCd").as_deref(), Some("AbC"));
    assert_eq!(first_match("k", cfg.clone(), "K").as_deref(), Some("K"));
    assert_eq!(first_match("\u{e9}", cfg, "\u{c9}").as_deref(), Some("\u{c9}"));
}

#[test]
fn test_captures() {
    let mut tokenizer = Tokenizer::new();
    tokenizer
        .add("(\\d+)-(?<b>\\d+)?", RuleConfig::new("R"))
        .unwrap()
        .add(";", RuleConfig::new("SEMI").skip(true))
        .unwrap();
    let tokens = tokenizer.tokenize("12-345;7-").unwrap();
    assert_eq!(tokens[0].positions[&0], (0, 2));
    assert_eq!(tokens[0].positions[&1], (3, 6));
    assert_eq!(tokens[1].value, "7-");
    assert_eq!(tokens[1].positions[&0], (7, 8));
    assert!(!tokens[1].positions.contains_key(&1));
}
