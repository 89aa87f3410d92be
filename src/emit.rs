//! Compiler back-end: lowers prioritized rules into a single Program

use crate::error::{Error, Result, SyntaxErrorKind};
use crate::insn::{CharMatcher, Insn, Program};
use crate::ir::{Char, Node, Regex};
use crate::rule::Rule;
use crate::types::{
    end_slot, start_slot, GroupIndex, InsnOffset, MAX_PROGRAM_LEN, SLOTS_PER_GROUP,
};

/// Looks up the regex for a `{name}` reference.
pub type Resolver<'a> = dyn Fn(&str) -> Option<Regex> + 'a;

/// Options controlling code generation.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct CompileOptions {
    /// Emit GroupStart/GroupEnd markers in addition to Save.
    pub emit_groups: bool,
}

/// The mode flags in effect while compiling a subtree.
#[derive(Debug, Copy, Clone)]
struct Modes {
    dot_all: bool,
    ignore_case: bool,
    multiline: bool,
}

impl Default for Modes {
    fn default() -> Self {
        Modes {
            dot_all: true,
            ignore_case: false,
            multiline: true,
        }
    }
}

impl Modes {
    /// Apply the flags set on \p r; a node's own flag wins over the inherited
    /// one.
    fn inherit(self, r: &Regex) -> Modes {
        Modes {
            dot_all: r.dot_all.unwrap_or(self.dot_all),
            ignore_case: r.ignore_case.unwrap_or(self.ignore_case),
            multiline: r.multiline.unwrap_or(self.multiline),
        }
    }
}

/// Type which wraps up the context needed to emit a Program.
struct Emitter<'r> {
    insns: Vec<Insn>,
    resolver: &'r Resolver<'r>,
    options: CompileOptions,

    // Names of the Vars being expanded, innermost last.
    resolving: Vec<String>,

    // The largest capture group index seen.
    max_group: Option<GroupIndex>,

    // Look-behinds whose expr has no group get hidden groups numbered past
    // every real group. Until that base is known they are numbered from zero
    // and listed here for fixing up.
    hidden_groups: GroupIndex,
    hidden_fixups: Vec<InsnOffset>,
}

impl<'r> Emitter<'r> {
    fn emit_insn(&mut self, insn: Insn) {
        self.insns.push(insn)
    }

    fn emit_insn_offset(&mut self, insn: Insn) -> InsnOffset {
        let offset = self.next_offset();
        self.emit_insn(insn);
        offset
    }

    fn next_offset(&self) -> InsnOffset {
        self.insns.len() as InsnOffset
    }

    fn get_insn(&mut self, idx: InsnOffset) -> &mut Insn {
        &mut self.insns[idx as usize]
    }

    fn set_jump_target(&mut self, jump: InsnOffset, target: InsnOffset) {
        match self.get_insn(jump) {
            Insn::Jump(t) => *t = target,
            _ => panic!("Should be a Jump instruction"),
        }
    }

    fn set_split_targets(&mut self, split: InsnOffset, targets: Vec<InsnOffset>) {
        match self.get_insn(split) {
            Insn::Split(t) => *t = targets,
            _ => panic!("Should be a Split instruction"),
        }
    }

    /// Point the Begin or RBegin at \p begin to its End.
    fn set_assertion_end(&mut self, begin: InsnOffset, end_offset: InsnOffset) {
        match self.get_insn(begin) {
            Insn::Begin { end, .. } | Insn::RBegin { end, .. } => *end = end_offset,
            _ => panic!("Should be a Begin instruction"),
        }
    }

    fn emit_regex(&mut self, r: &Regex, modes: Modes) -> Result<()> {
        if self.insns.len() > MAX_PROGRAM_LEN {
            return Err(Error::Syntax {
                kind: SyntaxErrorKind::InvalidQuantifier,
                offset: 0,
                message: "Repeat count limit exceeded".to_string(),
            });
        }
        let modes = modes.inherit(r);
        if let Some(gi) = r.group_index {
            self.max_group = Some(self.max_group.map_or(gi, |m| m.max(gi)));
            self.emit_insn(Insn::Save(start_slot(gi)));
            if self.options.emit_groups {
                self.emit_insn(Insn::GroupStart(gi));
            }
        }
        self.emit_node(&r.node, modes)?;
        if let Some(gi) = r.group_index {
            if self.options.emit_groups {
                self.emit_insn(Insn::GroupEnd(gi));
            }
            self.emit_insn(Insn::Save(end_slot(gi)));
        }
        Ok(())
    }

    fn emit_node(&mut self, node: &Node, modes: Modes) -> Result<()> {
        match node {
            Node::StartOfInput => self.emit_insn(Insn::StartOfInput {
                multiline: modes.multiline,
            }),
            Node::EndOfInput => self.emit_insn(Insn::EndOfInput {
                multiline: modes.multiline,
            }),
            Node::StartOfWord => self.emit_insn(Insn::StartOfWord),
            Node::EndOfWord => self.emit_insn(Insn::EndOfWord),
            Node::Char(Char::Any) => self.emit_insn(if modes.dot_all {
                Insn::Any
            } else {
                Insn::AnyNonNl
            }),
            Node::Char(c) => {
                let matcher = CharMatcher::new(c);
                self.emit_insn(if modes.ignore_case {
                    Insn::CIChar(matcher)
                } else {
                    Insn::Char(matcher)
                })
            }
            Node::Cat(children) => {
                for child in children {
                    self.emit_regex(child, modes)?;
                }
            }
            Node::Union(options) => self.emit_union(options, modes)?,
            Node::Quant {
                expr,
                min,
                max,
                greedy,
            } => self.emit_quant(expr, *min, *max, *greedy, modes)?,
            Node::LookAhead { expr, cond, negate } => {
                self.emit_regex(expr, modes)?;
                let begin = self.emit_insn_offset(Insn::Begin {
                    consume: false,
                    negate: *negate,
                    end: 0,
                });
                self.emit_regex(cond, modes)?;
                let end = self.emit_insn_offset(Insn::End { begin });
                self.set_assertion_end(begin, end);
            }
            Node::LookBack { expr, cond, negate } => {
                let group = match expr.group_index {
                    Some(gi) => {
                        self.emit_regex(expr, modes)?;
                        gi
                    }
                    None => {
                        let hidden = self.hidden_groups;
                        self.hidden_groups += 1;
                        self.emit_hidden(Insn::Save(start_slot(hidden)));
                        self.emit_regex(expr, modes)?;
                        self.emit_hidden(Insn::Save(end_slot(hidden)));
                        self.hidden_fixups.push(self.next_offset());
                        hidden
                    }
                };
                let begin = self.emit_insn_offset(Insn::RBegin {
                    group,
                    negate: *negate,
                    end: 0,
                });
                self.emit_regex(&cond.reverse(), modes)?;
                let end = self.emit_insn_offset(Insn::End { begin });
                self.set_assertion_end(begin, end);
            }
            Node::Var(name) => {
                let name = name.trim();
                if self.resolving.iter().any(|n| n == name) {
                    return Err(Error::RecursiveReference(name.to_string()));
                }
                let resolved = match (self.resolver)(name) {
                    Some(r) => r,
                    None => return Err(Error::UnresolvedReference(name.to_string())),
                };
                self.resolving.push(name.to_string());
                let res = self.emit_regex(&resolved, modes);
                self.resolving.pop();
                res?;
            }
            Node::BackNumRef(_) | Node::BackNamedRef(_) => {
                return Err(Error::Unsupported("Back-references"));
            }
        }
        Ok(())
    }

    fn emit_hidden(&mut self, insn: Insn) {
        let offset = self.emit_insn_offset(insn);
        self.hidden_fixups.push(offset);
    }

    /// Split to each option; all but the last jump to a common exit.
    fn emit_union(&mut self, options: &[Regex], modes: Modes) -> Result<()> {
        let split = self.emit_insn_offset(Insn::Split(Vec::new()));
        let mut targets = Vec::with_capacity(options.len());
        let mut jumps = Vec::new();
        for (idx, option) in options.iter().enumerate() {
            targets.push(self.next_offset());
            self.emit_regex(option, modes)?;
            if idx + 1 < options.len() {
                jumps.push(self.emit_insn_offset(Insn::Jump(0)));
            }
        }
        let exit = self.next_offset();
        for jump in jumps {
            self.set_jump_target(jump, exit);
        }
        self.set_split_targets(split, targets);
        Ok(())
    }

    /// \return split targets in priority order.
    fn order(greedy: bool, body: InsnOffset, skip: InsnOffset) -> Vec<InsnOffset> {
        if greedy {
            vec![body, skip]
        } else {
            vec![skip, body]
        }
    }

    /// `e*`: a split around a body that jumps back to the split.
    fn emit_star(&mut self, expr: &Regex, greedy: bool, modes: Modes) -> Result<()> {
        let split = self.emit_insn_offset(Insn::Split(Vec::new()));
        let body = self.next_offset();
        self.emit_regex(expr, modes)?;
        self.emit_insn(Insn::Jump(split));
        let exit = self.next_offset();
        self.set_split_targets(split, Self::order(greedy, body, exit));
        Ok(())
    }

    /// `e+`: the body, then a split back to it.
    fn emit_plus(&mut self, expr: &Regex, greedy: bool, modes: Modes) -> Result<()> {
        let body = self.next_offset();
        self.emit_regex(expr, modes)?;
        let split = self.emit_insn_offset(Insn::Split(Vec::new()));
        let exit = self.next_offset();
        self.set_split_targets(split, Self::order(greedy, body, exit));
        Ok(())
    }

    /// `e?`: a split over the body.
    fn emit_optional(&mut self, expr: &Regex, greedy: bool, modes: Modes) -> Result<()> {
        let split = self.emit_insn_offset(Insn::Split(Vec::new()));
        let body = self.next_offset();
        self.emit_regex(expr, modes)?;
        let exit = self.next_offset();
        self.set_split_targets(split, Self::order(greedy, body, exit));
        Ok(())
    }

    /// Counted repetition is unrolled: \p min mandatory copies, then either a
    /// loop or `max - min` optional copies.
    fn emit_quant(
        &mut self,
        expr: &Regex,
        min: u32,
        max: Option<u32>,
        greedy: bool,
        modes: Modes,
    ) -> Result<()> {
        match (min, max) {
            (0, None) => self.emit_star(expr, greedy, modes),
            (1, None) => self.emit_plus(expr, greedy, modes),
            (0, Some(1)) => self.emit_optional(expr, greedy, modes),
            (min, max) => {
                for _ in 0..min {
                    self.emit_regex(expr, modes)?;
                }
                match max {
                    None => self.emit_star(expr, greedy, modes),
                    Some(max) => {
                        for _ in min..max {
                            self.emit_optional(expr, greedy, modes)?;
                        }
                        Ok(())
                    }
                }
            }
        }
    }

    /// Renumber hidden groups past the real ones.
    /// \return the number of capture slots used.
    fn finish_groups(&mut self) -> usize {
        let base = self.max_group.map_or(0, |m| m + 1);
        for offset in core::mem::take(&mut self.hidden_fixups) {
            match self.get_insn(offset) {
                Insn::Save(slot) => *slot += start_slot(base),
                Insn::RBegin { group, .. } => *group += base,
                _ => panic!("Should be a hidden group instruction"),
            }
        }
        (base + self.hidden_groups) as usize * SLOTS_PER_GROUP
    }
}

/// Compile \p rules, which the caller has sorted by priority descending and
/// then registration order, into one Program.
/// `{name}` references are looked up through \p resolver.
pub fn compile(rules: &[&Rule], resolver: &Resolver, options: CompileOptions) -> Result<Program> {
    let mut emitter = Emitter {
        insns: Vec::new(),
        resolver,
        options,
        resolving: Vec::new(),
        max_group: None,
        hidden_groups: 0,
        hidden_fixups: Vec::new(),
    };

    let split = if rules.len() > 1 {
        Some(emitter.emit_insn_offset(Insn::Split(Vec::new())))
    } else {
        None
    };
    let mut entries = Vec::with_capacity(rules.len());
    for rule in rules {
        entries.push(emitter.next_offset());
        if !rule.states.is_empty() {
            emitter.emit_insn(Insn::EnsureState(rule.states.clone()));
        }
        emitter.emit_regex(&rule.expr, Modes::default())?;
        emitter.emit_insn(Insn::Match {
            priority: rule.priority,
            rule: rule.match_index,
            greedy: rule.is_greedy,
        });
    }
    if let Some(split) = split {
        emitter.set_split_targets(split, entries);
    }
    let group_count = emitter.max_group.map_or(0, |m| m as usize + 1);
    let slot_count = emitter.finish_groups();
    Ok(Program {
        insns: emitter.insns,
        slot_count,
        group_count,
    })
}

/// Compile a single regex as rule 0 with default priority.
pub fn compile_regex(expr: &Regex, resolver: &Resolver) -> Result<Program> {
    let rule = Rule::new(expr.clone(), Default::default(), 0);
    compile(&[&rule], resolver, CompileOptions::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse;

    fn no_vars(_: &str) -> Option<Regex> {
        None
    }

    fn listing(pattern: &str) -> String {
        let re = parse(pattern).unwrap();
        compile_regex(&re, &no_vars).unwrap().to_string()
    }

    #[test]
    fn test_star() {
        assert_eq!(
            listing("a*"),
            "   0: Split 1, 3\n   1: Char 'a'\n   2: Jump 0\n   3: Match priority=10 rule=0\n"
        );
        assert_eq!(
            listing("a*?"),
            "   0: Split 3, 1\n   1: Char 'a'\n   2: Jump 0\n   3: Match priority=10 rule=0\n"
        );
    }

    #[test]
    fn test_plus_and_counted() {
        assert_eq!(
            listing("a+"),
            "   0: Char 'a'\n   1: Split 0, 2\n   2: Match priority=10 rule=0\n"
        );
        assert_eq!(
            listing("a{2,3}"),
            "   0: Char 'a'\n   1: Char 'a'\n   2: Split 3, 4\n   3: Char 'a'\n   4: Match priority=10 rule=0\n"
        );
    }

    #[test]
    fn test_union_and_groups() {
        assert_eq!(
            listing("(a|b)c"),
            "   0: Save 0\n   1: Split 2, 4\n   2: Char 'a'\n   3: Jump 5\n   4: Char 'b'\n   5: Save 1\n   6: Char 'c'\n   7: Match priority=10 rule=0\n"
        );
    }

    #[test]
    fn test_lookbehind_hidden_group() {
        let re = parse("(a)(?<=x)b").unwrap();
        let prog = compile_regex(&re, &no_vars).unwrap();
        // One real group plus one hidden.
        assert_eq!(prog.slot_count, 4);
        assert_eq!(prog.group_count, 1);
        assert!(prog.insns.contains(&Insn::Save(2)));
        assert!(prog
            .insns
            .iter()
            .any(|insn| matches!(insn, Insn::RBegin { group: 1, .. })));
    }

    #[test]
    fn test_vars() {
        let re = parse("{digit}+").unwrap();
        let resolver = |name: &str| (name == "digit").then(|| parse("[0-9]").unwrap());
        assert!(compile_regex(&re, &resolver).is_ok());
        assert_eq!(
            compile_regex(&re, &no_vars),
            Err(Error::UnresolvedReference("digit".to_string()))
        );
        let looping = |_: &str| Some(parse("a{x}").unwrap());
        assert_eq!(
            compile_regex(&parse("{x}").unwrap(), &looping),
            Err(Error::RecursiveReference("x".to_string()))
        );
    }

    #[test]
    fn test_program_size_limit() {
        let re = parse("(?:(?:a{65535}){65535})").unwrap();
        match compile_regex(&re, &no_vars) {
            Err(Error::Syntax { kind, .. }) => assert_eq!(kind, SyntaxErrorKind::InvalidQuantifier),
            other => panic!("Unexpected result {:?}", other.map(|p| p.len())),
        }
        // Vars that double at each level are caught the same way.
        let doubling = |name: &str| {
            let depth: u32 = name[1..].parse().ok()?;
            let body = if depth == 0 {
                "ab".to_string()
            } else {
                format!("{{v{0}}}{{v{0}}}", depth - 1)
            };
            parse(&body).ok()
        };
        assert!(compile_regex(&parse("{v30}").unwrap(), &doubling).is_err());
    }

    #[test]
    fn test_backrefs_unsupported() {
        let re = parse("(a)\\1").unwrap();
        assert_eq!(
            compile_regex(&re, &no_vars),
            Err(Error::Unsupported("Back-references"))
        );
    }

    #[test]
    fn test_flags() {
        let mut re = parse("a.$").unwrap();
        re.ignore_case = Some(true);
        re.dot_all = Some(false);
        re.multiline = Some(false);
        let prog = compile_regex(&re, &no_vars).unwrap();
        assert!(matches!(prog.insns[0], Insn::CIChar(_)));
        assert_eq!(prog.insns[1], Insn::AnyNonNl);
        assert_eq!(prog.insns[2], Insn::EndOfInput { multiline: false });
    }
}
