#![allow(clippy::uninlined_format_args)]

pub mod common;
use common::*;
use std::cell::Cell;
use std::rc::Rc;
use tlex::{Error, RuleConfig, Tape, Token, TokenBuffer, Tokenizer};

#[test]
fn test_word_tokens() {
    init_logging();
    let mut tokenizer = word_tokenizer();
    let tokens = tokenizer.tokenize("let x1 = (40 + 2);").unwrap();
    tokens.tagged().test_eq(vec![
        "ID:let",
        "ID:x1",
        "PUNCT:=",
        "PUNCT:(",
        "NUM:40",
        "PUNCT:+",
        "NUM:2",
        "PUNCT:)",
        "PUNCT:;",
    ]);
    assert_eq!((tokens[4].start, tokens[4].end), (10, 12));
    assert_eq!(tokens[1].match_index, 0);
    assert_eq!(tokens[4].match_index, 1);
    assert!(tokenizer.tokenize("").unwrap().is_empty());
    assert!(tokenizer.tokenize("  \n\t").unwrap().is_empty());
}

#[test]
fn test_offsets_are_chars() {
    let mut tokenizer = Tokenizer::new();
    tokenizer
        .add("[^ ]+", RuleConfig::new("W"))
        .unwrap()
        .add(" ", RuleConfig::new("SP").skip(true))
        .unwrap();
    let tokens = tokenizer.tokenize("héllo wörld").unwrap();
    assert_eq!((tokens[1].start, tokens[1].end), (6, 11));
    assert_eq!(tokens[1].value, "wörld");
}

#[test]
fn test_token_ids_increase() {
    let mut tokenizer = word_tokenizer();
    let first = tokenizer.tokenize("a b").unwrap();
    let second = tokenizer.tokenize("c d").unwrap();
    let ids: Vec<usize> = first.iter().chain(second.iter()).map(|t| t.id).collect();
    assert!(ids.windows(2).all(|w| w[0] < w[1]), "ids {:?}", ids);
}

#[test]
fn test_unexpected_character() {
    let mut tokenizer = word_tokenizer();
    let err = tokenizer.tokenize("ab\ncd ?").unwrap_err();
    assert_eq!(
        err,
        Error::UnexpectedCharacter {
            offset: 6,
            line: 2,
            column: 4,
            ch: '?',
        }
    );
    err.to_string()
        .test_eq("Unexpected character '?' at line 2, column 4");
}

#[test]
fn test_handlers() {
    let newlines = Rc::new(Cell::new(0));
    let seen = Rc::clone(&newlines);
    let mut tokenizer = Tokenizer::new();
    tokenizer
        .add_with_handler("[a-z]+", RuleConfig::new("ID"), |_, mut tok| {
            if tok.value == "if" {
                tok.tag = "KW".to_string();
            }
            Some(tok)
        })
        .unwrap()
        // Skip rules still run their handler.
        .add_with_handler("\\n", RuleConfig::new("NL").skip(true), move |_, tok| {
            seen.set(seen.get() + 1);
            Some(tok)
        })
        .unwrap()
        // A handler returning None drops the token.
        .add_with_handler("#[^\\n]*", RuleConfig::new("COMMENT"), |_, _| None)
        .unwrap()
        .add(" +", RuleConfig::new("WS").skip(true))
        .unwrap();
    let tokens = tokenizer.tokenize("if x # note\nelse\n").unwrap();
    tokens.tagged().test_eq(vec!["KW:if", "ID:x", "ID:else"]);
    assert_eq!(newlines.get(), 2);
}

#[test]
fn test_states() {
    let mut tokenizer = Tokenizer::new();
    tokenizer
        .add_with_handler("/\\*", RuleConfig::new("OPEN"), |ctx, _| {
            ctx.set_state(1);
            None
        })
        .unwrap()
        .add_with_handler("\\*/", RuleConfig::new("CLOSE").states(vec![1]), |ctx, _| {
            ctx.set_state(0);
            None
        })
        .unwrap()
        .add("[^*]+|\\*", RuleConfig::new("TEXT").states(vec![1]))
        .unwrap()
        .add("[a-z]+", RuleConfig::new("ID"))
        .unwrap()
        .add(" +", RuleConfig::new("WS").skip(true))
        .unwrap();
    let tokens = tokenizer.tokenize("a /* b * c */ d").unwrap();
    tokens
        .tagged()
        .test_eq(vec!["ID:a", "TEXT: b ", "TEXT:*", "TEXT: c ", "ID:d"]);
    let states: Vec<u32> = tokens.iter().map(|t| t.state).collect();
    assert_eq!(states, vec![0, 1, 1, 1, 0]);
    assert_eq!(tokenizer.state(), 0);

    // The state persists between calls until reset.
    tokenizer.set_state(1);
    tokenizer.tokenize("x y").unwrap().tagged().test_eq(vec!["TEXT:x y"]);
    tokenizer.reset();
    tokenizer
        .tokenize("x y")
        .unwrap()
        .tagged()
        .test_eq(vec!["ID:x", "ID:y"]);
}

#[test]
fn test_rule_registry() {
    let mut tokenizer = word_tokenizer();
    assert_eq!(tokenizer.rules().len(), 4);
    let ws = tokenizer.rule_by_tag("WS").unwrap();
    assert!(ws.skip);
    assert_eq!(ws.match_index, 3);
    assert!(tokenizer.rule_by_tag("STRING").is_none());

    // Re-adding a tag extends the rule rather than adding one.
    tokenizer.add("\"[^\"]*\"", RuleConfig::new("ID")).unwrap();
    assert_eq!(tokenizer.rules().len(), 4);
    tokenizer
        .tokenize("a \"b c\"")
        .unwrap()
        .tagged()
        .test_eq(vec!["ID:a", "ID:\"b c\""]);
}

#[test]
fn test_lookahead_recorded() {
    let mut tokenizer = Tokenizer::new();
    tokenizer
        .add("[a-z]+(?=\\()", RuleConfig::new("CALL").priority(20))
        .unwrap()
        .add("[a-z]+", RuleConfig::new("ID"))
        .unwrap()
        .add("[()]", RuleConfig::new("P"))
        .unwrap();
    let tokens = tokenizer.tokenize("f(x)").unwrap();
    tokens
        .tagged()
        .test_eq(vec!["CALL:f", "P:(", "ID:x", "P:)"]);
    assert!(tokens.iter().all(|t| t.lookahead >= 1));
}

#[test]
fn test_lookbehind_reports_no_groups() {
    let mut tokenizer = Tokenizer::new();
    tokenizer
        .add("(?<=a)b", RuleConfig::new("B").priority(20))
        .unwrap()
        .add("a", RuleConfig::new("A"))
        .unwrap()
        .add("(c)(?<=c)d", RuleConfig::new("CD"))
        .unwrap();
    let tokens = tokenizer.tokenize("abcd").unwrap();
    tokens.tagged().test_eq(vec!["A:a", "B:b", "CD:cd"]);
    assert!(tokens[1].positions.is_empty());
    // Only the written group is reported.
    assert_eq!(tokens[2].positions.len(), 1);
    assert_eq!(tokens[2].positions[&0], (2, 3));
}

#[test]
fn test_token_buffer() {
    let mut tokenizer = word_tokenizer();
    let mut buf = TokenBuffer::new(Tape::new("x = f(1);"), |tape: &mut Tape| {
        tokenizer.next(tape)
    });
    assert_eq!(buf.peek(2).unwrap().map(|t| t.value.as_str()), Some("f"));
    let name = buf.expect_token(&["ID"]).unwrap();
    assert_eq!(name.value, "x");
    assert!(buf.consume_if(&["PUNCT"]).unwrap().is_some());
    assert!(buf.match_tag(&["ID"]).unwrap());
    match buf.expect_token(&["NUM"]) {
        Err(Error::UnexpectedToken { found, expected }) => {
            assert_eq!(found.value, "f");
            assert_eq!(expected, vec!["NUM"]);
        }
        other => panic!("Unexpected result {:?}", other),
    }
    let rest: Vec<String> = std::iter::from_fn(|| buf.next().unwrap())
        .map(|t: Token| t.value)
        .collect();
    rest.test_eq(vec!["f", "(", "1", ")", ";"]);
    assert_eq!(buf.tape().index(), 9);
    assert_eq!(buf.ensure_token(&["ID"]).unwrap_err(), Error::UnexpectedEndOfInput);
}

#[test]
fn test_token_buffer_propagates_errors() {
    let mut tokenizer = word_tokenizer();
    let mut buf = TokenBuffer::new(Tape::new("a ?"), |tape: &mut Tape| tokenizer.next(tape));
    assert!(buf.next().unwrap().is_some());
    assert!(matches!(
        buf.peek(0),
        Err(Error::UnexpectedCharacter { offset: 2, .. })
    ));
}
