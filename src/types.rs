/// A capture group index.
/// GroupIndex 0 corresponds to the first capture group of a pattern; its
/// start and end positions live in slots 0 and 1.
pub type GroupIndex = u32;

/// The name of a named capture group.
pub type GroupName = String;

/// An index into a Program's instruction list.
pub type InsnOffset = u32;

/// The registration index of a rule within its tokenizer.
pub type RuleIndex = u32;

/// Rule priority. Higher wins.
pub type Priority = i32;

/// An opaque tokenizer state, as switched by match handlers.
pub type LexerState = u32;

/// The priority rules get unless configured otherwise.
pub const DEFAULT_PRIORITY: Priority = 10;

/// The largest count accepted in a `{m,n}` quantifier.
/// Counted repetition is unrolled, so this bounds program size.
pub const MAX_REPEAT: u32 = 65535;

/// The largest program the compiler emits. Nested counted repetition
/// multiplies, so this is checked separately from MAX_REPEAT.
pub const MAX_PROGRAM_LEN: usize = 1 << 20;

/// The number of capture slots used by a group.
pub const SLOTS_PER_GROUP: usize = 2;

/// \return the slot holding the start position of group \p gi.
#[inline(always)]
pub const fn start_slot(gi: GroupIndex) -> usize {
    gi as usize * SLOTS_PER_GROUP
}

/// \return the slot holding the end position of group \p gi.
#[inline(always)]
pub const fn end_slot(gi: GroupIndex) -> usize {
    gi as usize * SLOTS_PER_GROUP + 1
}
