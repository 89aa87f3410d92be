use crate::util::SliceHelp;
use core::cmp::{self, Ordering};

pub type CodePoint = u32;

/// The maximum (inclusive) code point.
pub const CODE_POINT_MAX: CodePoint = 0x10FFFF;

/// An inclusive range of code points.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Interval {
    pub first: CodePoint,
    pub last: CodePoint,
}

impl Interval {
    pub const fn new(first: CodePoint, last: CodePoint) -> Interval {
        debug_assert!(first <= last);
        Interval { first, last }
    }

    #[inline(always)]
    pub fn compare(self, cp: CodePoint) -> Ordering {
        if self.first > cp {
            Ordering::Greater
        } else if self.last < cp {
            Ordering::Less
        } else {
            Ordering::Equal
        }
    }

    /// Whether at least one value lies after the end of self and before the
    /// start of rhs. Abutting intervals are not strictly before each other.
    fn is_strictly_before(self, rhs: Interval) -> bool {
        self.last + 1 < rhs.first
    }

    /// Overlapping or abutting intervals compare equal.
    fn mergecmp(self, rhs: Interval) -> Ordering {
        if self.is_strictly_before(rhs) {
            Ordering::Less
        } else if rhs.is_strictly_before(self) {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    }

    pub fn contains(self, cp: CodePoint) -> bool {
        self.first <= cp && cp <= self.last
    }
}

/// A set of code points stored as disjoint, non-abutting, sorted intervals.
/// This is the compiled form of character classes and bracket expressions.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct CodePointSet {
    ivs: Vec<Interval>,
}

impl CodePointSet {
    pub fn new() -> CodePointSet {
        CodePointSet { ivs: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.ivs.is_empty()
    }

    #[inline]
    pub fn contains(&self, cp: CodePoint) -> bool {
        self.ivs.binary_search_by(|iv| iv.compare(cp)).is_ok()
    }

    #[inline]
    pub fn contains_char(&self, c: char) -> bool {
        self.contains(c as u32)
    }

    #[inline]
    fn assert_is_well_formed(&self) {
        if cfg!(debug_assertions) {
            for iv in &self.ivs {
                debug_assert!(iv.last <= CODE_POINT_MAX);
                debug_assert!(iv.first <= iv.last);
            }
            for w in self.ivs.windows(2) {
                debug_assert!(w[0].is_strictly_before(w[1]));
            }
        }
    }

    /// Construct from sorted, disjoint intervals. Note these are not allowed to
    /// even abut.
    pub fn from_sorted_disjoint_intervals(ivs: Vec<Interval>) -> CodePointSet {
        let res = CodePointSet { ivs };
        res.assert_is_well_formed();
        res
    }

    /// Add an interval of code points to the set.
    pub fn add(&mut self, new_iv: Interval) {
        // The run of intervals that overlap or abut new_iv.
        let mergeable = self.ivs.equal_range_by(|iv| iv.mergecmp(new_iv));
        match mergeable.len() {
            0 => self.ivs.insert(mergeable.start, new_iv),
            _ => {
                let merged = self.ivs[mergeable.clone()]
                    .iter()
                    .fold(new_iv, |acc, iv| Interval {
                        first: cmp::min(acc.first, iv.first),
                        last: cmp::max(acc.last, iv.last),
                    });
                self.ivs[mergeable.start] = merged;
                self.ivs.drain(mergeable.start + 1..mergeable.end);
            }
        }
        self.assert_is_well_formed();
    }

    #[inline]
    pub fn add_one(&mut self, cp: CodePoint) {
        self.add(Interval::new(cp, cp))
    }

    pub fn add_set(&mut self, mut rhs: CodePointSet) {
        // Prefer to add to the set with more intervals.
        if self.ivs.len() < rhs.ivs.len() {
            core::mem::swap(self, &mut rhs);
        }
        for iv in rhs.intervals() {
            self.add(*iv)
        }
    }

    pub fn intervals(&self) -> &[Interval] {
        self.ivs.as_slice()
    }

    /// \return the code points in both self and \p rhs.
    pub fn intersection(&self, rhs: &CodePointSet) -> CodePointSet {
        let mut ivs = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < self.ivs.len() && j < rhs.ivs.len() {
            let (a, b) = (self.ivs[i], rhs.ivs[j]);
            let first = cmp::max(a.first, b.first);
            let last = cmp::min(a.last, b.last);
            if first <= last {
                ivs.push(Interval::new(first, last));
            }
            if a.last < b.last {
                i += 1;
            } else {
                j += 1;
            }
        }
        CodePointSet::from_sorted_disjoint_intervals(ivs)
    }
}
