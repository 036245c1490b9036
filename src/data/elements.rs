//! # Building blocks to describe problems
use std::fmt;
use std::ops::Not;

/// Direction of optimization.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Sense {
    #[default]
    Minimize,
    Maximize,
}

impl Sense {
    /// Factor that turns an objective of this sense into a minimization objective.
    #[must_use]
    pub fn sign(self) -> f64 {
        match self {
            Sense::Minimize => 1_f64,
            Sense::Maximize => -1_f64,
        }
    }
}

impl Not for Sense {
    type Output = Self;

    fn not(self) -> Self::Output {
        match self {
            Sense::Minimize => Sense::Maximize,
            Sense::Maximize => Sense::Minimize,
        }
    }
}

impl fmt::Display for Sense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Sense::Minimize => "min",
            Sense::Maximize => "max",
        })
    }
}

/// Direction of a bound.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum BoundDirection {
    /// `x >= b`.
    Lower,
    /// `x <= b`.
    Upper,
}

impl BoundDirection {
    /// Sign with which the bounded quantity enters the "distance to the bound".
    ///
    /// For a lower bound the distance is `x - b`, for an upper bound it is `b - x`.
    #[must_use]
    pub fn sign(self) -> f64 {
        match self {
            BoundDirection::Lower => 1_f64,
            BoundDirection::Upper => -1_f64,
        }
    }
}

impl Not for BoundDirection {
    type Output = Self;

    fn not(self) -> Self::Output {
        match self {
            Self::Lower => Self::Upper,
            Self::Upper => Self::Lower,
        }
    }
}

/// How the rows of a level relate to the right-hand side.
///
/// A level stores either only inequalities or only equalities; mixing is done by splitting rows or
/// adding slacks while extracting.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum RowSense {
    /// Every row reads `<a, x> <= b`.
    Less,
    /// Every row reads `<a, x> == b`.
    Equal,
}

impl fmt::Display for RowSense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RowSense::Less => "<=",
            RowSense::Equal => "==",
        })
    }
}

/// Where a row of a level came from, relative to the constraint it was derived from.
///
/// Sides of a double-sided constraint become separate rows sharing the constraint, distinguished
/// by this tag.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum RowTag {
    /// `body == b`.
    Equal,
    /// `body <= b`.
    Less,
    /// `body >= b`, stored as is (with a slack in equality form).
    Greater,
    /// `body >= b`, negated into `-body <= -b`.
    GreaterToLess,
}

impl fmt::Display for RowTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RowTag::Equal => "=",
            RowTag::Less => "l",
            RowTag::Greater => "g",
            RowTag::GreaterToLess => "g->l",
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn sense() {
        assert_eq!(!Sense::Minimize, Sense::Maximize);
        assert_eq!(Sense::Maximize.sign(), -1_f64);
        assert_eq!(Sense::default(), Sense::Minimize);
    }

    #[test]
    fn bound_direction() {
        assert_eq!(!BoundDirection::Lower, BoundDirection::Upper);
        assert_eq!(BoundDirection::Upper.sign(), -1_f64);
    }
}
