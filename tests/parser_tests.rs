#![allow(clippy::uninlined_format_args)]

pub mod common;
use common::*;
use tlex::ir::{Char, Node, Regex};
use tlex::parse::parse;

#[track_caller]
fn parse_str(pattern: &str) -> String {
    match parse(pattern) {
        Ok(re) => re.to_string(),
        Err(err) => panic!("Failed to parse {}: {}", pattern, err),
    }
}

/// Test that re-serializing \p pattern gives a pattern which parses to the
/// same tree, and which finds the same matches in \p inputs.
#[track_caller]
fn test_round_trip(pattern: &str, inputs: &[&str]) {
    let first = parse(pattern).unwrap();
    let printed = first.to_string();
    let second = parse(&printed).unwrap();
    assert_eq!(
        second.to_string(),
        printed,
        "Unstable serialization of {}",
        pattern
    );
    assert_eq!(first.group_count(), second.group_count());

    let lhs = compile(pattern);
    let rhs = compile(&printed);
    for input in inputs {
        assert_eq!(
            lhs.run_global_match(input),
            rhs.run_global_match(input),
            "{} and {} differ on {:?}",
            pattern,
            printed,
            input
        );
    }
}

#[test]
fn test_round_trips() {
    let inputs = [
        "",
        "abc",
        "aabbcc abc",
        "2020-12-05",
        "abchello abcdef xdef",
        "foo.bar*/baz",
        "A\tB\nC",
        "]-^x",
    ];
    for pattern in [
        "abc",
        "a|b|c",
        "(a)(b(c))",
        "(?:ab)*c",
        "a{2,}?b{1,3}c{1,4}",
        "[^a-c\\d-]+",
        "\\x41\\u0042|\\t",
        "(?<year>\\d{4})-(?<m>\\d\\d)",
        "abc(?=hello)",
        "(?<!abc)def",
        "^\\w+\\s*$",
        "[\\]\\-^]x",
        ".+?",
        "\\.\\*\\/",
        "(a|bc)+(?:d|)",
    ] {
        test_round_trip(pattern, &inputs);
    }
}

#[test]
fn test_serialization() {
    parse_str("a{2}").test_eq("a{2}");
    parse_str("a{0,}").test_eq("a*");
    parse_str("a{1,}?").test_eq("a+?");
    parse_str("(?:a)").test_eq("a");
    parse_str("(?:a|b)c").test_eq("(?:a|b)c");
    parse_str("\\u{1F600}").test_eq("\u{1F600}");
    parse_str("\\0").test_eq("\\x00");
    parse_str("[\\s\\S]").test_eq("[\\s\\S]");
    parse_str("\\p{Letter}").test_eq("\\p{General_Category=Letter}");
}

#[test]
fn test_group_numbering() {
    // Indices follow the opening parentheses, left to right.
    let re = parse("((a)(?:b)(?<n>c))(d)").unwrap();
    let mut seen = Vec::new();
    re.walk(&mut |r| {
        if let Some(gi) = r.group_index {
            seen.push((gi, r.to_string()));
        }
    });
    assert_eq!(
        seen,
        vec![
            (0, "((a)b(?<n>c))".to_string()),
            (1, "(a)".to_string()),
            (2, "(?<n>c)".to_string()),
            (3, "(d)".to_string()),
        ]
    );
    assert_eq!(re.group_count(), 4);
    assert_eq!(re.group_names(), vec![(2, "n".to_string())]);
}

#[test]
fn test_look_around_structure() {
    let re = parse("x(?<=a|b)yz").unwrap();
    match &re.node {
        Node::Cat(children) => {
            assert_eq!(children.len(), 2);
            match &children[1].node {
                Node::LookBack { expr, cond, negate } => {
                    assert_eq!(expr.to_string(), "yz");
                    assert_eq!(cond.to_string(), "a|b");
                    assert!(!negate);
                }
                other => panic!("Expected a LookBack, got {:?}", other),
            }
        }
        other => panic!("Expected a Cat, got {:?}", other),
    }

    // The reversed form of a look-behind reads the other way.
    let rev = re.reverse();
    rev.to_string().test_eq("zy(?=b|a)x");
    assert_eq!(rev.reverse(), re);
}

#[test]
fn test_vars_and_properties() {
    let re = parse("{ident}+|x{ 3 }").unwrap();
    re.to_string().test_eq("{ident}+|x{3}");
    match &parse("\\P{Script=Greek}").unwrap().node {
        Node::Char(Char::Property {
            name,
            value,
            negate,
        }) => {
            assert_eq!((name.as_str(), value.as_str(), *negate), ("Script", "Greek", true));
        }
        other => panic!("Expected a property escape, got {:?}", other),
    }
    // Property escapes parse, but never match.
    compile("\\p{Letter}").test_fails("abc");
}

#[test]
fn test_literal_constructors() {
    let re = Regex::cat(vec![
        Regex::literal("ab"),
        Regex::quant(Regex::union(vec![Regex::char('c'), Regex::char('d')]), 0, Some(2), true),
    ]);
    re.to_string().test_eq("ab(?:c|d){0,2}");
    assert_eq!(parse(&re.to_string()).unwrap(), re);
}
