//! IEEE 1164 nine-state logic values with truth-table-based operators.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr, BitXor, Not};

/// A single `std_ulogic` value following the IEEE 1164 standard.
///
/// The discriminant is the encoding index used by every truth table in this
/// module, in the standard order `U X 0 1 Z W L H -`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[repr(u8)]
pub enum Logic {
    /// Uninitialized.
    U = 0,
    /// Forcing unknown.
    X = 1,
    /// Forcing 0.
    Zero = 2,
    /// Forcing 1.
    One = 3,
    /// High impedance.
    Z = 4,
    /// Weak unknown.
    W = 5,
    /// Weak 0.
    L = 6,
    /// Weak 1.
    H = 7,
    /// Don't care.
    DontCare = 8,
}

type Table = [[Logic; 9]; 9];

const AND_TABLE: Table = {
    use Logic::{One as I, Zero as O, U, X};
    //    U  X  0  1  Z  W  L  H  -
    [
        [U, U, O, U, U, U, O, U, U], // U
        [U, X, O, X, X, X, O, X, X], // X
        [O, O, O, O, O, O, O, O, O], // 0
        [U, X, O, I, X, X, O, I, X], // 1
        [U, X, O, X, X, X, O, X, X], // Z
        [U, X, O, X, X, X, O, X, X], // W
        [O, O, O, O, O, O, O, O, O], // L
        [U, X, O, I, X, X, O, I, X], // H
        [U, X, O, X, X, X, O, X, X], // -
    ]
};

const OR_TABLE: Table = {
    use Logic::{One as I, Zero as O, U, X};
    //    U  X  0  1  Z  W  L  H  -
    [
        [U, U, U, I, U, U, U, I, U], // U
        [U, X, X, I, X, X, X, I, X], // X
        [U, X, O, I, X, X, O, I, X], // 0
        [I, I, I, I, I, I, I, I, I], // 1
        [U, X, X, I, X, X, X, I, X], // Z
        [U, X, X, I, X, X, X, I, X], // W
        [U, X, O, I, X, X, O, I, X], // L
        [I, I, I, I, I, I, I, I, I], // H
        [U, X, X, I, X, X, X, I, X], // -
    ]
};

const XOR_TABLE: Table = {
    use Logic::{One as I, Zero as O, U, X};
    //    U  X  0  1  Z  W  L  H  -
    [
        [U, U, U, U, U, U, U, U, U], // U
        [U, X, X, X, X, X, X, X, X], // X
        [U, X, O, I, X, X, O, I, X], // 0
        [U, X, I, O, X, X, I, O, X], // 1
        [U, X, X, X, X, X, X, X, X], // Z
        [U, X, X, X, X, X, X, X, X], // W
        [U, X, O, I, X, X, O, I, X], // L
        [U, X, I, O, X, X, I, O, X], // H
        [U, X, X, X, X, X, X, X, X], // -
    ]
};

const NOT_TABLE: [Logic; 9] = {
    use Logic::{One as I, Zero as O, U, X};
    [U, X, I, O, X, X, I, O, X]
};

impl Logic {
    /// All nine values in encoding order.
    pub const ALL: [Logic; 9] = [
        Logic::U,
        Logic::X,
        Logic::Zero,
        Logic::One,
        Logic::Z,
        Logic::W,
        Logic::L,
        Logic::H,
        Logic::DontCare,
    ];

    /// Converts a character to a [`Logic`] value.
    ///
    /// Accepts `U X 0 1 Z W L H -`, letters in either case.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'u' | 'U' => Some(Logic::U),
            'x' | 'X' => Some(Logic::X),
            '0' => Some(Logic::Zero),
            '1' => Some(Logic::One),
            'z' | 'Z' => Some(Logic::Z),
            'w' | 'W' => Some(Logic::W),
            'l' | 'L' => Some(Logic::L),
            'h' | 'H' => Some(Logic::H),
            '-' => Some(Logic::DontCare),
            _ => None,
        }
    }

    /// Returns the canonical (upper-case) character for this value.
    pub fn to_char(self) -> char {
        match self {
            Logic::U => 'U',
            Logic::X => 'X',
            Logic::Zero => '0',
            Logic::One => '1',
            Logic::Z => 'Z',
            Logic::W => 'W',
            Logic::L => 'L',
            Logic::H => 'H',
            Logic::DontCare => '-',
        }
    }

    /// Returns the encoding index (0..9).
    pub fn index(self) -> usize {
        self as usize
    }

    /// Maps a boolean onto forcing `0`/`1`.
    pub fn from_bool(value: bool) -> Self {
        if value {
            Logic::One
        } else {
            Logic::Zero
        }
    }

    /// Strength-strips to the `X01` subtype: `0`/`L` become `0`, `1`/`H`
    /// become `1`, everything else becomes `X`.
    pub fn to_x01(self) -> Self {
        match self {
            Logic::Zero | Logic::L => Logic::Zero,
            Logic::One | Logic::H => Logic::One,
            _ => Logic::X,
        }
    }

    /// NAND, as `NOT (a AND b)`.
    pub fn nand(self, rhs: Self) -> Self {
        !(self & rhs)
    }

    /// NOR, as `NOT (a OR b)`.
    pub fn nor(self, rhs: Self) -> Self {
        !(self | rhs)
    }

    /// XNOR, as `NOT (a XOR b)`.
    pub fn xnor(self, rhs: Self) -> Self {
        !(self ^ rhs)
    }

    /// One-bit full adder over the `X01` view of the operands.
    ///
    /// Returns `(sum, carry)`. Any operand outside `0/1/L/H` poisons both
    /// outputs to `X`.
    pub fn full_add(a: Self, b: Self, carry: Self) -> (Self, Self) {
        let bits = [a.to_x01(), b.to_x01(), carry.to_x01()];
        if bits.contains(&Logic::X) {
            return (Logic::X, Logic::X);
        }
        let ones = bits.iter().filter(|&&v| v == Logic::One).count();
        (Logic::from_bool(ones % 2 == 1), Logic::from_bool(ones >= 2))
    }
}

impl fmt::Display for Logic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_char())
    }
}

/// IEEE 1164 AND: `0`/`L` dominate, then `U`, then `X`.
impl BitAnd for Logic {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        AND_TABLE[self.index()][rhs.index()]
    }
}

/// IEEE 1164 OR: `1`/`H` dominate, then `U`, then `X`.
impl BitOr for Logic {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        OR_TABLE[self.index()][rhs.index()]
    }
}

/// IEEE 1164 XOR: `U` dominates, any other non-binary operand gives `X`.
impl BitXor for Logic {
    type Output = Self;

    fn bitxor(self, rhs: Self) -> Self {
        XOR_TABLE[self.index()][rhs.index()]
    }
}

/// IEEE 1164 NOT:
/// ```text
///  U  X  0  1  Z  W  L  H  -
///  U  X  1  0  X  X  1  0  X
/// ```
impl Not for Logic {
    type Output = Self;

    fn not(self) -> Self {
        NOT_TABLE[self.index()]
    }
}
