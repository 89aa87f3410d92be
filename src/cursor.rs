//! Direction-generic reads of a Tape.

use crate::tape::Tape;

#[derive(Debug, Copy, Clone)]
pub struct Forward;

#[derive(Debug, Copy, Clone)]
pub struct Backward;

/// The direction in which a VM consumes its tape.
/// Look-behind conditions run Backward over their reversed AST.
pub trait Direction: core::fmt::Debug + Copy + Clone {
    const FORWARD: bool;

    /// The opposite direction.
    type Reverse: Direction;

    fn new() -> Self;
}

impl Direction for Forward {
    const FORWARD: bool = true;
    type Reverse = Backward;
    #[inline(always)]
    fn new() -> Self {
        Forward {}
    }
}

impl Direction for Backward {
    const FORWARD: bool = false;
    type Reverse = Forward;
    #[inline(always)]
    fn new() -> Self {
        Backward {}
    }
}

/// \return the character that would be consumed at \p pos, without moving.
#[inline(always)]
pub fn peek<Dir: Direction>(tape: &Tape, _dir: Dir, pos: usize) -> Option<char> {
    if Dir::FORWARD {
        tape.char_at(pos)
    } else if pos > 0 {
        tape.char_at(pos - 1)
    } else {
        None
    }
}

/// \return the position after consuming one character from \p pos.
/// The caller must have checked that a character is available.
#[inline(always)]
pub fn advance<Dir: Direction>(_dir: Dir, pos: usize) -> usize {
    if Dir::FORWARD {
        pos + 1
    } else {
        pos - 1
    }
}

/// \return the character to the left of \p pos, regardless of direction.
#[inline(always)]
pub fn peek_left(tape: &Tape, pos: usize) -> Option<char> {
    pos.checked_sub(1).and_then(|p| tape.char_at(p))
}

/// \return the character to the right of \p pos, regardless of direction.
#[inline(always)]
pub fn peek_right(tape: &Tape, pos: usize) -> Option<char> {
    tape.char_at(pos)
}
