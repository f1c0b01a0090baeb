//! Error type for value-model construction and assignment.

/// Errors raised when building or assigning logic values from user input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LogicError {
    /// A character outside the nine-state alphabet.
    #[error("invalid logic character '{0}'")]
    InvalidChar(char),

    /// A literal that is neither a bit string nor a `0x` hex string.
    #[error("invalid literal \"{0}\"")]
    InvalidLiteral(String),

    /// An assignment whose source length differs from the target length.
    #[error("length mismatch: expected {expected} elements, got {actual}")]
    LengthMismatch {
        /// Length of the assignment target.
        expected: usize,
        /// Length of the assigned value.
        actual: usize,
    },

    /// A slice or index outside the declared bounds of its parent vector.
    #[error("index range {left}..{right} outside bounds {low}..{high}")]
    OutOfBounds {
        /// Requested left bound.
        left: i64,
        /// Requested right bound.
        right: i64,
        /// Lowest declared index of the parent.
        low: i64,
        /// Highest declared index of the parent.
        high: i64,
    },

    /// A range whose bounds run against its declared direction.
    #[error("null range {left} {direction} {right}")]
    NullRange {
        /// Declared left bound.
        left: i64,
        /// Declared direction keyword.
        direction: &'static str,
        /// Declared right bound.
        right: i64,
    },

    /// A multi-element slice whose direction disagrees with its parent.
    #[error("slice direction disagrees with the parent vector")]
    DirectionMismatch,

    /// A type specification that could not be parsed.
    #[error("invalid type specification '{0}'")]
    InvalidTypeSpec(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_invalid_char() {
        assert_eq!(
            LogicError::InvalidChar('q').to_string(),
            "invalid logic character 'q'"
        );
    }

    #[test]
    fn display_length_mismatch() {
        let e = LogicError::LengthMismatch {
            expected: 8,
            actual: 4,
        };
        assert_eq!(e.to_string(), "length mismatch: expected 8 elements, got 4");
    }

    #[test]
    fn display_out_of_bounds() {
        let e = LogicError::OutOfBounds {
            left: 9,
            right: 4,
            low: 0,
            high: 7,
        };
        assert_eq!(e.to_string(), "index range 9..4 outside bounds 0..7");
    }
}
