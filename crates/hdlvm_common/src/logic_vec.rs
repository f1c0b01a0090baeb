//! Bounded vectors of nine-state logic values (`std_logic_vector`).

use crate::error::LogicError;
use crate::logic::Logic;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr, BitXor, Not};

/// Index direction of a declared range.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Direction {
    /// `left TO right`, ascending indices.
    To,
    /// `left DOWNTO right`, descending indices.
    Downto,
}

impl Direction {
    /// Maps an "ascending" flag onto a direction.
    pub fn from_ascending(ascending: bool) -> Self {
        if ascending {
            Direction::To
        } else {
            Direction::Downto
        }
    }

    /// Returns `true` for [`Direction::To`].
    pub fn is_ascending(self) -> bool {
        self == Direction::To
    }

    /// Parses the `TO`/`DOWNTO` keyword, case-insensitively.
    pub fn parse(keyword: &str) -> Option<Self> {
        if keyword.eq_ignore_ascii_case("TO") {
            Some(Direction::To)
        } else if keyword.eq_ignore_ascii_case("DOWNTO") {
            Some(Direction::Downto)
        } else {
            None
        }
    }

    /// Returns the VHDL keyword.
    pub fn keyword(self) -> &'static str {
        match self {
            Direction::To => "TO",
            Direction::Downto => "DOWNTO",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// A fixed-length vector of [`Logic`] values with declared bounds.
///
/// Storage is always least-significant element first: `bits()[0]` is the
/// rightmost element of the declared range, whatever the direction. Strings
/// are read and written most-significant (leftmost) element first, so the
/// conversion only happens at construction, display and literal assignment.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogicVec {
    left: i64,
    right: i64,
    direction: Direction,
    bits: Vec<Logic>,
}

impl LogicVec {
    /// Creates a vector over `left direction right`, every element `U`.
    pub fn new(left: i64, direction: Direction, right: i64) -> Result<Self, LogicError> {
        Self::filled(left, direction, right, Logic::U)
    }

    /// Creates a vector over `left direction right` with every element set to `value`.
    pub fn filled(
        left: i64,
        direction: Direction,
        right: i64,
        value: Logic,
    ) -> Result<Self, LogicError> {
        let null = match direction {
            Direction::To => left > right,
            Direction::Downto => left < right,
        };
        if null {
            return Err(LogicError::NullRange {
                left,
                direction: direction.keyword(),
                right,
            });
        }
        let width = (left - right).unsigned_abs() as usize + 1;
        Ok(Self {
            left,
            right,
            direction,
            bits: vec![value; width],
        })
    }

    /// Creates a `width-1 DOWNTO 0` vector from least-significant-first elements.
    ///
    /// # Panics
    ///
    /// Panics if `bits` is empty.
    pub fn from_bits(bits: Vec<Logic>) -> Self {
        assert!(!bits.is_empty(), "LogicVec cannot be empty");
        Self {
            left: bits.len() as i64 - 1,
            right: 0,
            direction: Direction::Downto,
            bits,
        }
    }

    /// Parses a literal into a `len-1 DOWNTO 0` vector.
    ///
    /// Accepts a bit string such as `"10XZ"` or a `0x` hex string.
    pub fn from_literal(s: &str) -> Result<Self, LogicError> {
        let mut bits = parse_literal(s)?;
        bits.reverse();
        Ok(Self::from_bits(bits))
    }

    /// Creates a vector over the given bounds holding the literal `s`.
    pub fn with_literal(
        left: i64,
        direction: Direction,
        right: i64,
        s: &str,
    ) -> Result<Self, LogicError> {
        let mut v = Self::new(left, direction, right)?;
        v.assign_literal(s)?;
        Ok(v)
    }

    /// Creates a vector over the given bounds holding `value` in two's complement.
    ///
    /// Bits beyond the vector width are dropped.
    pub fn from_i64(
        value: i64,
        left: i64,
        direction: Direction,
        right: i64,
    ) -> Result<Self, LogicError> {
        let mut v = Self::new(left, direction, right)?;
        for (i, bit) in v.bits.iter_mut().enumerate() {
            let set = if i < 64 { (value >> i) & 1 != 0 } else { value < 0 };
            *bit = Logic::from_bool(set);
        }
        Ok(v)
    }

    /// Returns the number of elements.
    pub fn width(&self) -> usize {
        self.bits.len()
    }

    /// Returns the declared left bound.
    pub fn left(&self) -> i64 {
        self.left
    }

    /// Returns the declared right bound.
    pub fn right(&self) -> i64 {
        self.right
    }

    /// Returns the declared direction.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Returns the lowest declared index.
    pub fn low(&self) -> i64 {
        self.left.min(self.right)
    }

    /// Returns the highest declared index.
    pub fn high(&self) -> i64 {
        self.left.max(self.right)
    }

    /// Returns the elements, least-significant first.
    pub fn bits(&self) -> &[Logic] {
        &self.bits
    }

    pub(crate) fn bits_mut(&mut self) -> &mut [Logic] {
        &mut self.bits
    }

    /// Maps a declared index to its storage position.
    pub fn position(&self, index: i64) -> Option<usize> {
        if index < self.low() || index > self.high() {
            return None;
        }
        Some((index - self.right).unsigned_abs() as usize)
    }

    /// Returns the element at a declared index.
    pub fn get(&self, index: i64) -> Option<Logic> {
        self.position(index).map(|pos| self.bits[pos])
    }

    /// Sets the element at a declared index.
    pub fn set(&mut self, index: i64, value: Logic) -> Result<(), LogicError> {
        let pos = self.position(index).ok_or(LogicError::OutOfBounds {
            left: index,
            right: index,
            low: self.low(),
            high: self.high(),
        })?;
        self.bits[pos] = value;
        Ok(())
    }

    /// Copies the elements of `other` into this vector, keeping this vector's bounds.
    pub fn assign(&mut self, other: &LogicVec) -> Result<(), LogicError> {
        self.assign_bits(&other.bits)
    }

    /// Copies least-significant-first elements into this vector.
    pub fn assign_bits(&mut self, bits: &[Logic]) -> Result<(), LogicError> {
        if bits.len() != self.bits.len() {
            return Err(LogicError::LengthMismatch {
                expected: self.bits.len(),
                actual: bits.len(),
            });
        }
        self.bits.copy_from_slice(bits);
        Ok(())
    }

    /// Assigns a bit-string or `0x` hex literal, most-significant element first.
    pub fn assign_literal(&mut self, s: &str) -> Result<(), LogicError> {
        let mut bits = parse_literal(s)?;
        bits.reverse();
        self.assign_bits(&bits)
    }

    /// Adds `rhs` element-wise with a carry seeded at `0`; the final carry is dropped.
    ///
    /// # Panics
    ///
    /// Panics if the widths differ.
    pub fn add(&self, rhs: &LogicVec) -> LogicVec {
        assert_eq!(self.width(), rhs.width(), "LogicVec width mismatch in ADD");
        self.ripple(rhs.bits.iter().copied(), Logic::Zero)
    }

    /// Subtracts `rhs` as `self + NOT rhs + 1`; the final carry is dropped.
    ///
    /// # Panics
    ///
    /// Panics if the widths differ.
    pub fn sub(&self, rhs: &LogicVec) -> LogicVec {
        assert_eq!(self.width(), rhs.width(), "LogicVec width mismatch in SUB");
        self.ripple(rhs.bits.iter().map(|&b| !b.to_x01()), Logic::One)
    }

    /// Adds an integer, wrapped to this vector's width.
    pub fn add_int(&self, rhs: i64) -> LogicVec {
        let mut operand = self.clone();
        for (i, bit) in operand.bits.iter_mut().enumerate() {
            let set = if i < 64 { (rhs >> i) & 1 != 0 } else { rhs < 0 };
            *bit = Logic::from_bool(set);
        }
        self.add(&operand)
    }

    fn ripple(&self, rhs: impl Iterator<Item = Logic>, seed: Logic) -> LogicVec {
        let mut result = self.clone();
        let mut carry = seed;
        for (out, (&a, b)) in result.bits.iter_mut().zip(self.bits.iter().zip(rhs)) {
            let (sum, next) = Logic::full_add(a, b, carry);
            *out = sum;
            carry = next;
        }
        result
    }

    /// Concatenates `self & rhs` into a `width-1 DOWNTO 0` vector, `self` on the left.
    pub fn concat(&self, rhs: &LogicVec) -> LogicVec {
        let mut bits = rhs.bits.clone();
        bits.extend_from_slice(&self.bits);
        LogicVec::from_bits(bits)
    }

    /// Element-wise NAND.
    pub fn nand(&self, rhs: &LogicVec) -> LogicVec {
        self.zip_with(rhs, "NAND", Logic::nand)
    }

    /// Element-wise NOR.
    pub fn nor(&self, rhs: &LogicVec) -> LogicVec {
        self.zip_with(rhs, "NOR", Logic::nor)
    }

    /// Element-wise XNOR.
    pub fn xnor(&self, rhs: &LogicVec) -> LogicVec {
        self.zip_with(rhs, "XNOR", Logic::xnor)
    }

    fn zip_with(&self, rhs: &LogicVec, op: &str, f: impl Fn(Logic, Logic) -> Logic) -> LogicVec {
        assert_eq!(
            self.width(),
            rhs.width(),
            "LogicVec width mismatch in {op}"
        );
        let mut result = self.clone();
        for (out, &b) in result.bits.iter_mut().zip(&rhs.bits) {
            *out = f(*out, b);
        }
        result
    }
}

/// Parses a literal into elements, most-significant first.
fn parse_literal(s: &str) -> Result<Vec<Logic>, LogicError> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        if hex.is_empty() {
            return Err(LogicError::InvalidLiteral(s.to_string()));
        }
        let mut bits = Vec::with_capacity(hex.len() * 4);
        for c in hex.chars() {
            let nibble = c
                .to_digit(16)
                .ok_or_else(|| LogicError::InvalidLiteral(s.to_string()))?;
            for shift in (0..4).rev() {
                bits.push(Logic::from_bool(nibble & (1 << shift) != 0));
            }
        }
        return Ok(bits);
    }
    if s.is_empty() {
        return Err(LogicError::InvalidLiteral(s.to_string()));
    }
    s.chars()
        .map(|c| Logic::from_char(c).ok_or(LogicError::InvalidChar(c)))
        .collect()
}

impl fmt::Display for LogicVec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bit in self.bits.iter().rev() {
            write!(f, "{bit}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for LogicVec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LogicVec({} {} {} \"{self}\")",
            self.left, self.direction, self.right
        )
    }
}

impl BitAnd for &LogicVec {
    type Output = LogicVec;

    fn bitand(self, rhs: Self) -> LogicVec {
        self.zip_with(rhs, "AND", |a, b| a & b)
    }
}

impl BitOr for &LogicVec {
    type Output = LogicVec;

    fn bitor(self, rhs: Self) -> LogicVec {
        self.zip_with(rhs, "OR", |a, b| a | b)
    }
}

impl BitXor for &LogicVec {
    type Output = LogicVec;

    fn bitxor(self, rhs: Self) -> LogicVec {
        self.zip_with(rhs, "XOR", |a, b| a ^ b)
    }
}

impl Not for &LogicVec {
    type Output = LogicVec;

    fn not(self) -> LogicVec {
        let mut result = self.clone();
        for bit in result.bits.iter_mut() {
            *bit = !*bit;
        }
        result
    }
}
