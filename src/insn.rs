//! Bytecode instructions for a compiled rule set

use crate::codepointset::{CodePointSet, Interval, CODE_POINT_MAX};
use crate::ir::Char;
use crate::types::{GroupIndex, InsnOffset, LexerState, Priority, RuleIndex};
use crate::util::simple_case_variants;
use core::fmt;

/// The compiled form of an IR Char.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CharMatcher {
    Single(u32),

    /// Any char of the set.
    Set(CodePointSet),

    /// Property escapes are not evaluated and match nothing.
    Property {
        name: String,
        value: String,
        negate: bool,
    },

    Union(Vec<CharMatcher>),
    Intersection(Vec<CharMatcher>),
    Not(Box<CharMatcher>),
}

fn full_set() -> CodePointSet {
    CodePointSet::from_sorted_disjoint_intervals(vec![Interval::new(0, CODE_POINT_MAX)])
}

impl CharMatcher {
    /// \return the matcher as a plain set, if it is one.
    fn as_set(&self) -> Option<CodePointSet> {
        match self {
            CharMatcher::Single(cp) => {
                let mut set = CodePointSet::new();
                set.add_one(*cp);
                Some(set)
            }
            CharMatcher::Set(set) => Some(set.clone()),
            _ => None,
        }
    }

    /// Negation stays a separate node so that case folding applies beneath it.
    fn negated(self, negate: bool) -> CharMatcher {
        if negate {
            CharMatcher::Not(Box::new(self))
        } else {
            self
        }
    }

    pub fn new(c: &Char) -> CharMatcher {
        match c {
            Char::Any => CharMatcher::Set(full_set()),
            Char::Single(cp) => CharMatcher::Single(*cp),
            Char::Class { class, negate } => CharMatcher::Set(class.to_set()).negated(*negate),
            Char::Property {
                name,
                value,
                negate,
            } => CharMatcher::Property {
                name: name.clone(),
                value: value.clone(),
                negate: *negate,
            },
            Char::Range(lo, hi) => {
                let mut set = CodePointSet::new();
                if lo <= hi {
                    set.add(Interval::new(*lo, (*hi).min(CODE_POINT_MAX)));
                }
                CharMatcher::Set(set)
            }
            Char::Union { negate, chars } => {
                let parts: Vec<CharMatcher> = chars.iter().map(CharMatcher::new).collect();
                let sets: Option<Vec<CodePointSet>> = parts.iter().map(CharMatcher::as_set).collect();
                let matcher = match sets {
                    Some(sets) => {
                        let mut merged = CodePointSet::new();
                        for set in sets {
                            merged.add_set(set);
                        }
                        CharMatcher::Set(merged)
                    }
                    None => CharMatcher::Union(parts),
                };
                matcher.negated(*negate)
            }
            Char::Intersection { negate, chars } => {
                let parts: Vec<CharMatcher> = chars.iter().map(CharMatcher::new).collect();
                let sets: Option<Vec<CodePointSet>> = parts.iter().map(CharMatcher::as_set).collect();
                let matcher = match sets {
                    Some(sets) => {
                        let merged = sets
                            .iter()
                            .fold(full_set(), |acc, set| acc.intersection(set));
                        CharMatcher::Set(merged)
                    }
                    None => CharMatcher::Intersection(parts),
                };
                matcher.negated(*negate)
            }
        }
    }

    pub fn matches(&self, c: char) -> bool {
        match self {
            CharMatcher::Single(cp) => c as u32 == *cp,
            CharMatcher::Set(set) => set.contains_char(c),
            CharMatcher::Property { .. } => false,
            CharMatcher::Union(parts) => parts.iter().any(|m| m.matches(c)),
            CharMatcher::Intersection(parts) => parts.iter().all(|m| m.matches(c)),
            CharMatcher::Not(inner) => !inner.matches(c),
        }
    }

    /// Match \p c, or its lowercase or uppercase form.
    /// A negated matcher fails if any form of \p c is in the negated part.
    pub fn matches_icase(&self, c: char) -> bool {
        match self {
            CharMatcher::Union(parts) => parts.iter().any(|m| m.matches_icase(c)),
            CharMatcher::Intersection(parts) => parts.iter().all(|m| m.matches_icase(c)),
            CharMatcher::Not(inner) => !inner.matches_icase(c),
            _ => {
                self.matches(c)
                    || simple_case_variants(c)
                        .iter()
                        .any(|&v| v != c && self.matches(v))
            }
        }
    }
}

impl fmt::Display for CharMatcher {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CharMatcher::Single(cp) => write!(f, "{:?}", crate::util::to_char_sat(*cp)),
            CharMatcher::Set(set) => {
                f.write_str("[")?;
                for iv in set.intervals() {
                    if iv.first == iv.last {
                        write!(f, "{:X}", iv.first)?;
                    } else {
                        write!(f, "{:X}-{:X}", iv.first, iv.last)?;
                    }
                    f.write_str(" ")?;
                }
                f.write_str("]")
            }
            CharMatcher::Property {
                name,
                value,
                negate,
            } => write!(f, "\\{}{{{}={}}}", if *negate { 'P' } else { 'p' }, name, value),
            CharMatcher::Union(parts) | CharMatcher::Intersection(parts) => {
                let sep = if matches!(self, CharMatcher::Union(_)) {
                    " | "
                } else {
                    " & "
                };
                f.write_str("(")?;
                for (idx, part) in parts.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(sep)?;
                    }
                    write!(f, "{}", part)?;
                }
                f.write_str(")")
            }
            CharMatcher::Not(inner) => write!(f, "!{}", inner),
        }
    }
}

/// The list of bytecode instructions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Insn {
    /// A rule matched. Yields a candidate if the match is non-empty.
    Match {
        priority: Priority,
        rule: RuleIndex,
        greedy: bool,
    },

    /// Match any character.
    Any,

    /// Match any character except a line terminator.
    AnyNonNl,

    /// Match the start of the input, or of a line if multiline.
    StartOfInput { multiline: bool },

    /// Match the end of the input, or of a line if multiline.
    EndOfInput { multiline: bool },

    StartOfWord,
    EndOfWord,

    /// Match a character.
    Char(CharMatcher),

    /// Match a character, case-insensitive.
    CIChar(CharMatcher),

    /// Record the current position in a capture slot.
    Save(usize),

    /// Push explicit group markers onto the thread.
    GroupStart(GroupIndex),
    GroupEnd(GroupIndex),

    /// Fork into the targets; earlier targets have priority.
    Split(Vec<InsnOffset>),

    Jump(InsnOffset),

    /// Look-ahead. The condition occupies the instructions up to \p end,
    /// which holds the matching End. If \p consume is set, a successful
    /// condition also consumes one character.
    Begin {
        consume: bool,
        negate: bool,
        end: InsnOffset,
    },

    /// Look-behind. The condition, reversed, occupies the instructions up to
    /// \p end and is run in the opposite direction, starting from the start
    /// position of \p group.
    RBegin {
        group: GroupIndex,
        negate: bool,
        end: InsnOffset,
    },

    /// Closes a Begin or RBegin. Reaching it inside an assertion means the
    /// condition matched.
    End { begin: InsnOffset },

    /// Continue only if the lexer is in one of the given states.
    EnsureState(Vec<LexerState>),
}

impl fmt::Display for Insn {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let join = |offsets: &[u32]| {
            offsets
                .iter()
                .map(|o| o.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };
        match self {
            Insn::Match {
                priority,
                rule,
                greedy,
            } => {
                write!(f, "Match priority={} rule={}", priority, rule)?;
                if !greedy {
                    f.write_str(" lazy")?;
                }
                Ok(())
            }
            Insn::Any => f.write_str("Any"),
            Insn::AnyNonNl => f.write_str("AnyNonNl"),
            Insn::StartOfInput { multiline } => write!(f, "StartOfInput multiline={}", multiline),
            Insn::EndOfInput { multiline } => write!(f, "EndOfInput multiline={}", multiline),
            Insn::StartOfWord => f.write_str("StartOfWord"),
            Insn::EndOfWord => f.write_str("EndOfWord"),
            Insn::Char(m) => write!(f, "Char {}", m),
            Insn::CIChar(m) => write!(f, "CIChar {}", m),
            Insn::Save(slot) => write!(f, "Save {}", slot),
            Insn::GroupStart(gi) => write!(f, "GroupStart {}", gi),
            Insn::GroupEnd(gi) => write!(f, "GroupEnd {}", gi),
            Insn::Split(targets) => write!(f, "Split {}", join(targets)),
            Insn::Jump(target) => write!(f, "Jump {}", target),
            Insn::Begin {
                consume,
                negate,
                end,
            } => write!(f, "Begin consume={} negate={} end={}", consume, negate, end),
            Insn::RBegin { group, negate, end } => {
                write!(f, "RBegin group={} negate={} end={}", group, negate, end)
            }
            Insn::End { begin } => write!(f, "End begin={}", begin),
            Insn::EnsureState(states) => write!(f, "EnsureState {}", join(states)),
        }
    }
}

/// A compiled rule set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    pub insns: Vec<Insn>,

    /// The number of capture slots a thread carries.
    pub slot_count: usize,

    /// The number of capture groups written in the patterns. Groups past
    /// these are internal to look-behinds.
    pub group_count: usize,
}

impl Program {
    pub fn len(&self) -> usize {
        self.insns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.insns.is_empty()
    }
}

/// A numbered listing, one instruction per line.
impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (idx, insn) in self.insns.iter().enumerate() {
            writeln!(f, "{:4}: {}", idx, insn)?;
        }
        Ok(())
    }
}
