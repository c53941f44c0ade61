//! The stack of active ranges that records the progress of a bisection.

use std::fmt;

use nonempty::NonEmpty;
use serde::{Deserialize, Serialize};

/// A half-open window `[start, end)` over registry indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "(usize, usize)", into = "(usize, usize)")]
pub struct ActiveRange {
    start: usize,
    end: usize,
}

impl ActiveRange {
    /// Creates a range.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidRangeError`] if `start > end`.
    pub const fn new(start: usize, end: usize) -> Result<Self, InvalidRangeError> {
        if start > end {
            return Err(InvalidRangeError { start, end });
        }
        Ok(Self { start, end })
    }

    /// The range covering a registry of `len` entries.
    #[must_use]
    pub const fn full(len: usize) -> Self {
        Self { start: 0, end: len }
    }

    /// First index inside the range.
    #[must_use]
    pub const fn start(&self) -> usize {
        self.start
    }

    /// First index past the range.
    #[must_use]
    pub const fn end(&self) -> usize {
        self.end
    }

    /// Number of indices inside the range.
    #[must_use]
    pub const fn width(&self) -> usize {
        self.end - self.start
    }

    /// Whether `index` lies inside the range.
    #[must_use]
    pub const fn contains(&self, index: usize) -> bool {
        self.start <= index && index < self.end
    }

    /// Whether the range fits in a registry of `len` entries.
    #[must_use]
    pub const fn fits(&self, len: usize) -> bool {
        self.end <= len
    }

    /// The range with its upper `width / 2` indices dropped.
    ///
    /// For odd widths the lower half keeps the extra index.
    #[must_use]
    pub const fn lower_half(&self) -> Self {
        Self {
            start: self.start,
            end: self.end - self.width() / 2,
        }
    }

    /// The range with its lower `width / 2` indices dropped.
    #[must_use]
    pub const fn upper_half(&self) -> Self {
        Self {
            start: self.start + self.width() / 2,
            end: self.end,
        }
    }

    /// Indices outside the range in a registry of `len` entries: first
    /// `[end, len)`, then `[0, start)`.
    pub fn outside(self, len: usize) -> impl Iterator<Item = usize> {
        (self.end..len).chain(0..self.start.min(len))
    }

    /// Indices inside the range.
    #[must_use]
    pub const fn indices(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }
}

impl fmt::Display for ActiveRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

impl TryFrom<(usize, usize)> for ActiveRange {
    type Error = InvalidRangeError;

    fn try_from((start, end): (usize, usize)) -> Result<Self, Self::Error> {
        Self::new(start, end)
    }
}

impl From<ActiveRange> for (usize, usize) {
    fn from(range: ActiveRange) -> Self {
        (range.start, range.end)
    }
}

/// A range whose start lies after its end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid range ({start}, {end}): start lies after end")]
pub struct InvalidRangeError {
    /// The offending start.
    pub start: usize,
    /// The offending end.
    pub end: usize,
}

/// The bisection history: a stack of ranges from widest (bottom) to
/// narrowest (top).
///
/// The bottom is always the full registry and can never be popped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct History {
    stack: NonEmpty<ActiveRange>,
}

impl History {
    /// A fresh history over a registry of `len` entries.
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            stack: NonEmpty::new(ActiveRange::full(len)),
        }
    }

    /// A history with the full range of `len` entries at the bottom and
    /// `above` stacked on top of it, in order.
    #[must_use]
    pub fn with_ranges(len: usize, above: Vec<ActiveRange>) -> Self {
        Self {
            stack: NonEmpty {
                head: ActiveRange::full(len),
                tail: above,
            },
        }
    }

    /// The current candidate window.
    #[must_use]
    pub fn top(&self) -> ActiveRange {
        *self.stack.last()
    }

    /// The full range at the bottom.
    #[must_use]
    pub const fn bottom(&self) -> ActiveRange {
        self.stack.head
    }

    /// Number of ranges, including the bottom.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    /// Whether nothing has been narrowed yet.
    #[must_use]
    pub fn is_at_bottom(&self) -> bool {
        self.stack.tail.is_empty()
    }

    /// Push a new top.
    pub fn push(&mut self, range: ActiveRange) {
        self.stack.push(range);
    }

    /// Pop the top, unless it is the bottom.
    pub fn pop(&mut self) -> Option<ActiveRange> {
        self.stack.pop()
    }

    /// Collapse to a single full range over `len` entries.
    pub fn reset(&mut self, len: usize) {
        *self = Self::new(len);
    }

    /// Every range from bottom to top.
    pub fn iter(&self) -> impl Iterator<Item = &ActiveRange> {
        self.stack.iter()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case(0, 8, (0, 4), (4, 8); "even width")]
    #[test_case(0, 7, (0, 4), (3, 7); "odd width keeps extra in lower half")]
    #[test_case(4, 8, (4, 6), (6, 8); "offset range")]
    #[test_case(3, 4, (3, 4), (3, 4); "single index")]
    #[test_case(5, 5, (5, 5), (5, 5); "empty range")]
    fn halves(start: usize, end: usize, lower: (usize, usize), upper: (usize, usize)) {
        let range = ActiveRange::new(start, end).unwrap();
        assert_eq!(<(usize, usize)>::from(range.lower_half()), lower);
        assert_eq!(<(usize, usize)>::from(range.upper_half()), upper);
    }

    #[test]
    fn half_widths_cover_the_range() {
        for start in 0..6 {
            for end in start..20 {
                let range = ActiveRange::new(start, end).unwrap();
                let count = range.width();
                assert_eq!(range.lower_half().width(), count - count / 2);
                assert_eq!(range.upper_half().width(), count / 2);
            }
        }
    }

    #[test]
    fn reversed_range_is_rejected() {
        assert_eq!(
            ActiveRange::new(5, 2),
            Err(InvalidRangeError { start: 5, end: 2 })
        );
    }

    #[test]
    fn outside_wraps_around() {
        let range = ActiveRange::new(2, 5).unwrap();
        assert_eq!(range.outside(8).collect::<Vec<_>>(), vec![5, 6, 7, 0, 1]);
        assert_eq!(ActiveRange::full(8).outside(8).count(), 0);
    }

    #[test]
    fn bottom_is_never_popped() {
        let mut history = History::new(8);
        history.push(ActiveRange::new(0, 4).unwrap());

        assert_eq!(history.pop(), Some(ActiveRange::new(0, 4).unwrap()));
        assert_eq!(history.pop(), None);
        assert_eq!(history.len(), 1);
        assert_eq!(history.top(), ActiveRange::full(8));
    }

    #[test]
    fn reset_collapses_to_full_range() {
        let mut history = History::new(8);
        history.push(ActiveRange::new(0, 4).unwrap());
        history.push(ActiveRange::new(0, 2).unwrap());

        history.reset(10);

        assert!(history.is_at_bottom());
        assert_eq!(
            history.iter().copied().collect::<Vec<_>>(),
            vec![ActiveRange::full(10)]
        );
    }

    #[test]
    fn serializes_as_pair() {
        let range = ActiveRange::new(2, 6).unwrap();
        assert_eq!(serde_json::to_string(&range).unwrap(), "[2,6]");
        let parsed: ActiveRange = serde_json::from_str("[2,6]").unwrap();
        assert_eq!(parsed, range);
    }

    #[test]
    fn reversed_pair_does_not_deserialize() {
        assert!(serde_json::from_str::<ActiveRange>("[6,2]").is_err());
    }
}
