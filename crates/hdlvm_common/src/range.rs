//! Non-owning slice views over a [`LogicVec`].
//!
//! A [`RangeView`] records only the window (`offset`, `len`) into its parent's
//! storage plus the declared bounds of the slice. It never holds the parent:
//! reads and writes borrow the parent for the duration of the call, so any
//! number of views may alias the same vector and each observes the others'
//! writes immediately.

use crate::error::LogicError;
use crate::logic::Logic;
use crate::logic_vec::{Direction, LogicVec};
use serde::{Deserialize, Serialize};

/// A fixed window `left direction right` into a parent vector.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct RangeView {
    left: i64,
    right: i64,
    direction: Direction,
    offset: usize,
    len: usize,
}

impl RangeView {
    /// Creates a view over `parent(left direction right)`.
    ///
    /// Both bounds must lie within the parent's declared range. A
    /// multi-element slice must run in the parent's direction.
    pub fn new(
        parent: &LogicVec,
        left: i64,
        ascending: bool,
        right: i64,
    ) -> Result<Self, LogicError> {
        let direction = Direction::from_ascending(ascending);
        let out_of_bounds = LogicError::OutOfBounds {
            left,
            right,
            low: parent.low(),
            high: parent.high(),
        };
        let (Some(l), Some(r)) = (parent.position(left), parent.position(right)) else {
            return Err(out_of_bounds);
        };
        if left != right && direction != parent.direction() {
            return Err(LogicError::DirectionMismatch);
        }
        Ok(Self {
            left,
            right,
            direction,
            offset: l.min(r),
            len: l.abs_diff(r) + 1,
        })
    }

    /// Creates a view over a single element of `parent`.
    pub fn element(parent: &LogicVec, index: i64) -> Result<Self, LogicError> {
        Self::new(parent, index, parent.direction().is_ascending(), index)
    }

    /// Creates a view covering the whole of `parent`.
    pub fn whole(parent: &LogicVec) -> Self {
        Self {
            left: parent.left(),
            right: parent.right(),
            direction: parent.direction(),
            offset: 0,
            len: parent.width(),
        }
    }

    /// Returns the declared left bound of the slice.
    pub fn left(&self) -> i64 {
        self.left
    }

    /// Returns the declared right bound of the slice.
    pub fn right(&self) -> i64 {
        self.right
    }

    /// Returns the slice direction.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Returns the storage offset of the slice's least-significant element.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Returns the number of elements in the window.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always `false`: a view covers at least one element.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the windowed elements of `parent`, least-significant first.
    ///
    /// # Panics
    ///
    /// Panics if `parent` is narrower than the vector the view was built on.
    pub fn bits<'a>(&self, parent: &'a LogicVec) -> &'a [Logic] {
        &parent.bits()[self.offset..self.offset + self.len]
    }

    /// Reads the window as a vector carrying the slice's own bounds.
    pub fn read(&self, parent: &LogicVec) -> LogicVec {
        let mut out = match LogicVec::new(self.left, self.direction, self.right) {
            Ok(v) => v,
            Err(_) => LogicVec::from_bits(vec![Logic::U; self.len]),
        };
        out.bits_mut().copy_from_slice(self.bits(parent));
        out
    }

    /// Writes least-significant-first `value` through to `parent`'s storage.
    pub fn write(&self, parent: &mut LogicVec, value: &[Logic]) -> Result<(), LogicError> {
        if value.len() != self.len {
            return Err(LogicError::LengthMismatch {
                expected: self.len,
                actual: value.len(),
            });
        }
        parent.bits_mut()[self.offset..self.offset + self.len].copy_from_slice(value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn byte() -> LogicVec {
        LogicVec::with_literal(7, Direction::Downto, 0, "00000000").unwrap()
    }

    #[test]
    fn write_through_is_visible_to_other_views() {
        let mut parent = byte();
        let wide = RangeView::new(&parent, 4, false, 2).unwrap();
        let narrow = RangeView::new(&parent, 3, false, 3).unwrap();

        wide.write(&mut parent, &[Logic::One, Logic::One, Logic::One])
            .unwrap();

        assert_eq!(parent.to_string(), "00011100");
        assert_eq!(narrow.read(&parent).to_string(), "1");
        assert_eq!(parent.get(1), Some(Logic::Zero));
        assert_eq!(parent.get(5), Some(Logic::Zero));
    }

    #[test]
    fn write_changes_only_the_window() {
        let mut parent = LogicVec::with_literal(7, Direction::Downto, 0, "10101010").unwrap();
        let view = RangeView::new(&parent, 4, false, 2).unwrap();
        view.write(&mut parent, &[Logic::Z, Logic::Z, Logic::Z])
            .unwrap();
        assert_eq!(parent.to_string(), "101ZZZ10");
    }

    #[test]
    fn read_keeps_slice_bounds() {
        let parent = LogicVec::with_literal(7, Direction::Downto, 0, "11001010").unwrap();
        let view = RangeView::new(&parent, 7, false, 4).unwrap();
        let slice = view.read(&parent);
        assert_eq!(slice.to_string(), "1100");
        assert_eq!(slice.left(), 7);
        assert_eq!(slice.right(), 4);
    }

    #[test]
    fn ascending_slice_of_ascending_parent() {
        let parent = LogicVec::with_literal(0, Direction::To, 7, "11001010").unwrap();
        let view = RangeView::new(&parent, 2, true, 5).unwrap();
        assert_eq!(view.read(&parent).to_string(), "0010");
    }

    #[test]
    fn out_of_bounds_rejected() {
        let parent = byte();
        assert!(matches!(
            RangeView::new(&parent, 8, false, 4),
            Err(LogicError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn direction_mismatch_rejected() {
        let parent = byte();
        assert_eq!(
            RangeView::new(&parent, 2, true, 4),
            Err(LogicError::DirectionMismatch)
        );
    }

    #[test]
    fn write_length_checked() {
        let mut parent = byte();
        let view = RangeView::new(&parent, 1, false, 0).unwrap();
        assert!(view.write(&mut parent, &[Logic::One]).is_err());
    }

    #[test]
    fn whole_view_covers_parent() {
        let parent = byte();
        let view = RangeView::whole(&parent);
        assert_eq!(view.len(), 8);
        assert_eq!(view.offset(), 0);
        assert_eq!(view.read(&parent), parent);
    }

    #[test]
    fn element_view() {
        let parent = LogicVec::with_literal(3, Direction::Downto, 0, "0100").unwrap();
        let view = RangeView::element(&parent, 2).unwrap();
        assert_eq!(view.read(&parent).to_string(), "1");
    }
}
