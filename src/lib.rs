/*!

# tlex - a regex engine and incremental tokenizer generator

This crate parses JavaScript-style and Flex-style regular expressions into a shared AST, compiles them to byte-code, and runs the byte-code on a Pike VM. Matching is linear in the input, prioritized, and supports capture groups, look-ahead and look-behind.

On top of the VM sits a [`Tokenizer`] that turns a set of prioritized rules into a token stream, and an [`IncrementalTokenizer`] that re-lexes only the part of a document an edit affects.

# Example: test if a string contains a match

```rust
use tlex::Regex;
let re = Regex::new(r"\d{4}").unwrap();
let matched = re.find("2020-20-05").is_some();
assert!(matched);
```

# Example: using capture groups

Capture groups are available in the `Match` object produced by a successful match.
A capture group is a range of byte indexes into the original string.

```rust
use tlex::Regex;
let re = Regex::new(r"(\d{4})").unwrap();
let text = "Today is 2020-20-05";
let m = re.find(text).unwrap();
let group = m.group(1).unwrap();
assert_eq!(&text[group], "2020");
```

# Example: tokenizing

Rules are tried by priority, then by registration order. Skip rules consume
their text without producing tokens.

```rust
use tlex::{RuleConfig, Tokenizer};
let mut tokenizer = Tokenizer::new();
tokenizer
    .add("[a-z]+", RuleConfig::new("ID"))?
    .add("[0-9]+", RuleConfig::new("NUM"))?
    .add(r"\s+", RuleConfig::new("WS").skip(true))?;
let tokens = tokenizer.tokenize("x 42")?;
let tags: Vec<&str> = tokens.iter().map(|t| t.tag.as_str()).collect();
assert_eq!(tags, vec!["ID", "NUM"]);
# Ok::<(), tlex::Error>(())
```

# Example: incremental re-lexing

```rust
use tlex::{EditRange, IncrementalTokenizer, RuleConfig, Tokenizer};
let mut tokenizer = Tokenizer::new();
tokenizer
    .add("[a-z]+", RuleConfig::new("ID"))?
    .add(" +", RuleConfig::new("WS").skip(true))?;
let mut inc = IncrementalTokenizer::new(tokenizer);
inc.tokenize("foo bar baz")?;
let tokens = inc.update("foo qux baz", EditRange::new(4, 7, "qux"))?;
assert_eq!(tokens[1].value, "qux");
# Ok::<(), tlex::Error>(())
```

# Supported Syntax

The JavaScript front-end accepts literals, `.`, anchors, classes with ranges and negation, `\d \s \w` and their negations, the usual escapes, greedy and lazy quantifiers, capturing, non-capturing and named groups, look-ahead and look-behind, and alternation. Back-references parse but are rejected by the compiler. Unicode property escapes parse but never match.

The Flex front-end adds quoted strings, POSIX bracket classes, `{name}` references, inline modifiers like `(?i-s:...)`, `(?#...)` comments, word anchors `\<` `\>` and trailing context `r/s`.

# Offsets

Tokens, edits and the tokenizer report char offsets. The convenience [`Regex`] reports byte ranges, so they can index the haystack directly.

*/

#![warn(clippy::all)]
#![allow(clippy::upper_case_acronyms, clippy::match_like_matches_macro)]

pub use crate::api::*;
pub use crate::emit::CompileOptions;
pub use crate::error::{Error, Result, SyntaxErrorKind};
pub use crate::incremental::{AccumulatorConfig, EditRange, IncrementalTokenizer, RelexStats};
pub use crate::insn::Program;
pub use crate::parse::Syntax;
pub use crate::rule::{Pattern, Rule, RuleConfig};
pub use crate::tape::Tape;
pub use crate::token::{Token, TokenBuffer};
pub use crate::tokenizer::{MatchContext, MatchHandler, Tokenizer};

mod api;
pub mod charclasses;
pub mod codepointset;
mod cursor;
pub mod emit;
mod error;
pub mod flexparse;
mod incremental;
pub mod insn;
pub mod ir;
pub mod parse;
pub mod pikevm;
mod rule;
mod tape;
mod token;
mod tokenizer;
pub mod types;
mod util;
