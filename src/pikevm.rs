//! PikeVM execution engine

use crate::charclasses::{is_line_terminator, is_word_char};
use crate::cursor;
use crate::cursor::{Direction, Forward};
use crate::insn::{Insn, Program};
use crate::tape::Tape;
use crate::types::{end_slot, start_slot, GroupIndex, InsnOffset, LexerState, Priority, RuleIndex};
use std::rc::Rc;

/// Counters describing one run of the VM, including any assertion sub-runs.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct VmStats {
    /// Threads stepped.
    pub steps: usize,

    /// One past the furthest char position examined. Reaching the end of
    /// input counts as examining the position there.
    pub furthest: usize,
}

impl VmStats {
    fn merge(&mut self, rhs: VmStats) {
        self.steps += rhs.steps;
        self.furthest = self.furthest.max(rhs.furthest);
    }
}

/// The winning match of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmMatch {
    /// The registration index of the rule that matched.
    pub rule: RuleIndex,
    pub priority: Priority,

    /// Whether the rule asked for the longest match.
    /// A non-greedy match can only be displaced by a higher priority.
    pub greedy: bool,

    /// Char offsets of the match.
    pub start: usize,
    pub end: usize,

    /// Capture slots, two per group.
    pub positions: Vec<Option<usize>>,

    /// Explicit group markers, in the order they were passed.
    pub groups: Vec<(GroupIndex, usize)>,
}

impl VmMatch {
    /// \return the span of group \p gi, if it participated.
    pub fn group(&self, gi: GroupIndex) -> Option<(usize, usize)> {
        let start = self.positions.get(start_slot(gi)).copied().flatten()?;
        let end = self.positions.get(end_slot(gi)).copied().flatten()?;
        Some((start.min(end), start.max(end)))
    }
}

#[derive(Debug, Clone)]
struct Thread {
    /// Offset in the bytecode.
    pc: InsnOffset,

    /// Capture slots; shared until a Save writes to them.
    positions: Rc<Vec<Option<usize>>>,

    /// Group markers; shared until written.
    groups: Rc<Vec<(GroupIndex, usize)>>,
}

/// A Pike VM over a compiled Program.
/// Each program offset holds at most one thread per generation, so a run
/// takes time proportional to the input length times the program size.
pub struct PikeVm<'p> {
    prog: &'p Program,

    /// The lexer state EnsureState instructions test against.
    state: LexerState,

    /// The generation in which each offset last received a thread.
    gen_for_pc: Vec<usize>,
    generation: usize,

    /// For assertion sub-runs, the offset of the End that means success.
    sub_end: Option<InsnOffset>,
    sub_matched: bool,

    stats: VmStats,
}

impl<'p> PikeVm<'p> {
    pub fn new(prog: &'p Program) -> PikeVm<'p> {
        PikeVm {
            prog,
            state: 0,
            gen_for_pc: vec![0; prog.len()],
            generation: 0,
            sub_end: None,
            sub_matched: false,
            stats: VmStats::default(),
        }
    }

    /// Run in lexer state \p state.
    pub fn with_state(mut self, state: LexerState) -> PikeVm<'p> {
        self.state = state;
        self
    }

    /// Stats for the most recent run.
    pub fn stats(&self) -> VmStats {
        self.stats
    }

    /// Match anchored at \p pos, without moving the tape.
    pub fn match_at(&mut self, tape: &Tape, pos: usize) -> Option<VmMatch> {
        self.stats = VmStats::default();
        self.sub_matched = false;
        if self.prog.is_empty() || pos > tape.len() {
            return None;
        }
        self.run::<Forward>(tape, 0, pos)
    }

    /// Match at the tape's cursor. On success the cursor moves to the end of
    /// the match.
    pub fn match_tape(&mut self, tape: &mut Tape) -> Option<VmMatch> {
        let m = self.match_at(tape, tape.index())?;
        tape.set_index(m.end);
        Some(m)
    }

    /// A fresh VM for the assertion whose condition ends at \p end.
    fn sub_vm(&self, end: InsnOffset) -> PikeVm<'p> {
        PikeVm {
            prog: self.prog,
            state: self.state,
            gen_for_pc: vec![0; self.prog.len()],
            generation: 0,
            sub_end: Some(end),
            sub_matched: false,
            stats: VmStats::default(),
        }
    }

    /// \return whether the condition between \p begin and \p end matches
    /// at \p pos, reading in direction \p Dir.
    fn assert_at<Dir: Direction>(
        &mut self,
        tape: &Tape,
        begin: InsnOffset,
        end: InsnOffset,
        pos: usize,
    ) -> bool {
        let mut sub = self.sub_vm(end);
        sub.run::<Dir>(tape, begin + 1, pos);
        self.stats.merge(sub.stats);
        sub.sub_matched
    }

    /// Record that the char at \p pos was examined.
    #[inline(always)]
    fn touch(&mut self, tape: &Tape, pos: usize) {
        self.stats.furthest = self.stats.furthest.max(pos.min(tape.len()) + 1);
    }

    fn run<Dir: Direction>(
        &mut self,
        tape: &Tape,
        start_pc: InsnOffset,
        start_pos: usize,
    ) -> Option<VmMatch> {
        let prog = self.prog;
        let dir = Dir::new();
        let mut best: Option<VmMatch> = None;
        let mut clist = Vec::new();
        let mut nlist = Vec::new();

        self.generation += 1;
        let root = Thread {
            pc: start_pc,
            positions: Rc::new(vec![None; prog.slot_count]),
            groups: Rc::new(Vec::new()),
        };
        self.add_thread::<Dir>(tape, &mut clist, root, start_pos);

        let mut pos = start_pos;
        while !clist.is_empty() && !self.sub_matched {
            self.generation += 1;
            let c = cursor::peek(tape, dir, pos);
            if Dir::FORWARD {
                self.touch(tape, pos);
            }
            for thread in clist.drain(..) {
                self.stats.steps += 1;
                let next = Thread {
                    pc: thread.pc + 1,
                    ..thread.clone()
                };
                match &prog.insns[thread.pc as usize] {
                    &Insn::Match {
                        priority,
                        rule,
                        greedy,
                    } => {
                        if pos == start_pos || !accepts(&best, priority, pos) {
                            continue;
                        }
                        log::trace!("rule {} matched {}..{}", rule, start_pos, pos);
                        best = Some(VmMatch {
                            rule,
                            priority,
                            greedy,
                            start: start_pos.min(pos),
                            end: start_pos.max(pos),
                            positions: thread.positions.as_ref().clone(),
                            groups: thread.groups.as_ref().clone(),
                        });
                        // Lower threads of this generation lose.
                        break;
                    }
                    Insn::Any => {
                        if c.is_some() {
                            self.add_thread::<Dir>(tape, &mut nlist, next, cursor::advance(dir, pos));
                        }
                    }
                    Insn::AnyNonNl => {
                        if matches!(c, Some(c) if !is_line_terminator(c)) {
                            self.add_thread::<Dir>(tape, &mut nlist, next, cursor::advance(dir, pos));
                        }
                    }
                    Insn::Char(m) => {
                        if matches!(c, Some(c) if m.matches(c)) {
                            self.add_thread::<Dir>(tape, &mut nlist, next, cursor::advance(dir, pos));
                        }
                    }
                    Insn::CIChar(m) => {
                        if matches!(c, Some(c) if m.matches_icase(c)) {
                            self.add_thread::<Dir>(tape, &mut nlist, next, cursor::advance(dir, pos));
                        }
                    }
                    &Insn::Begin {
                        consume: true,
                        negate,
                        end,
                    } => {
                        let matched = self.assert_at::<Dir>(tape, thread.pc, end, pos);
                        if c.is_some() && matched != negate {
                            let next = Thread { pc: end + 1, ..next };
                            self.add_thread::<Dir>(tape, &mut nlist, next, cursor::advance(dir, pos));
                        }
                    }
                    _ => {}
                }
            }
            if c.is_none() {
                break;
            }
            pos = cursor::advance(dir, pos);
            core::mem::swap(&mut clist, &mut nlist);
        }
        best
    }

    /// Follow the zero-width instructions from \p thread, adding every thread
    /// that stops at a consuming instruction to \p list, in priority order.
    fn add_thread<Dir: Direction>(
        &mut self,
        tape: &Tape,
        list: &mut Vec<Thread>,
        thread: Thread,
        pos: usize,
    ) {
        let prog = self.prog;
        let mut stack = vec![thread];
        while let Some(mut t) = stack.pop() {
            loop {
                let pc = t.pc as usize;
                if pc >= prog.len() || self.gen_for_pc[pc] == self.generation {
                    break;
                }
                self.gen_for_pc[pc] = self.generation;
                match &prog.insns[pc] {
                    &Insn::Jump(target) => t.pc = target,
                    Insn::Split(targets) => {
                        // Pushed in reverse, so the first target is followed first.
                        for &target in targets.iter().rev() {
                            stack.push(Thread {
                                pc: target,
                                ..t.clone()
                            });
                        }
                        break;
                    }
                    &Insn::Save(slot) => {
                        if let Some(p) = Rc::make_mut(&mut t.positions).get_mut(slot) {
                            *p = Some(pos);
                        }
                        t.pc += 1;
                    }
                    &Insn::GroupStart(gi) | &Insn::GroupEnd(gi) => {
                        Rc::make_mut(&mut t.groups).push((gi, pos));
                        t.pc += 1;
                    }
                    &Insn::StartOfInput { multiline } => {
                        let matches = match cursor::peek_left(tape, pos) {
                            None => true,
                            Some(c) => multiline && is_line_terminator(c),
                        };
                        if !matches {
                            break;
                        }
                        t.pc += 1;
                    }
                    &Insn::EndOfInput { multiline } => {
                        self.touch(tape, pos);
                        let matches = match cursor::peek_right(tape, pos) {
                            None => true,
                            Some(c) => multiline && is_line_terminator(c),
                        };
                        if !matches {
                            break;
                        }
                        t.pc += 1;
                    }
                    Insn::StartOfWord | Insn::EndOfWord => {
                        self.touch(tape, pos);
                        let left = cursor::peek_left(tape, pos).map_or(false, is_word_char);
                        let right = cursor::peek_right(tape, pos).map_or(false, is_word_char);
                        let matches = if prog.insns[pc] == Insn::StartOfWord {
                            !left && right
                        } else {
                            left && !right
                        };
                        if !matches {
                            break;
                        }
                        t.pc += 1;
                    }
                    Insn::EnsureState(states) => {
                        if !states.contains(&self.state) {
                            break;
                        }
                        t.pc += 1;
                    }
                    &Insn::Begin {
                        consume: false,
                        negate,
                        end,
                    } => {
                        if self.assert_at::<Dir>(tape, t.pc, end, pos) == negate {
                            break;
                        }
                        t.pc = end + 1;
                    }
                    &Insn::RBegin { group, negate, end } => {
                        let from = t.positions.get(start_slot(group)).copied().flatten();
                        let from = from.unwrap_or(pos);
                        if self.assert_at::<Dir::Reverse>(tape, t.pc, end, from) == negate {
                            break;
                        }
                        t.pc = end + 1;
                    }
                    Insn::End { .. } => {
                        if self.sub_end == Some(t.pc) {
                            self.sub_matched = true;
                            return;
                        }
                        t.pc += 1;
                    }
                    Insn::Match { .. }
                    | Insn::Any
                    | Insn::AnyNonNl
                    | Insn::Char(_)
                    | Insn::CIChar(_)
                    | Insn::Begin { consume: true, .. } => {
                        list.push(t);
                        break;
                    }
                }
            }
        }
    }
}

/// \return whether a candidate ending at \p end displaces \p best.
fn accepts(best: &Option<VmMatch>, priority: Priority, end: usize) -> bool {
    match best {
        None => true,
        Some(b) => priority > b.priority || (priority == b.priority && b.greedy && end > b.end),
    }
}
