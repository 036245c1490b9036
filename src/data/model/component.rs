//! # Model components
//!
//! Variables, constraints, objectives and complementarity conditions as stored in a `Model`.
use std::fmt;

use crate::data::elements::Sense;
use crate::data::model::{BlockId, VarId};
use crate::data::model::expression::Expression;

/// Set of values a variable may take, before bounds are applied.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Domain {
    /// Any real number.
    Reals,
    /// Any integer.
    Integers,
    /// Zero or one.
    Binary,
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Domain::Reals => "Reals",
            Domain::Integers => "Integers",
            Domain::Binary => "Binary",
        })
    }
}

/// A decision variable.
#[derive(Clone, Debug, PartialEq)]
pub struct Variable {
    /// Name of the variable, or of the family it belongs to.
    pub name: String,
    /// Position within an indexed family.
    pub index: Option<usize>,
    /// Value domain.
    pub domain: Domain,
    /// Lower bound, may be `-inf`.
    pub lower: f64,
    /// Upper bound, may be `inf`.
    pub upper: f64,
    /// When set, the variable is a constant with this value.
    pub fixed: Option<f64>,
    /// Solution value, written by the solvers.
    pub value: Option<f64>,
    /// Block the variable was declared in.
    pub block: BlockId,
}

impl Variable {
    /// Name including the index, like `x[3]`.
    #[must_use]
    pub fn full_name(&self) -> String {
        match self.index {
            Some(index) => format!("{}[{}]", self.name, index),
            None => self.name.clone(),
        }
    }

    /// Whether both bounds are finite.
    #[must_use]
    pub fn is_bounded(&self) -> bool {
        self.lower.is_finite() && self.upper.is_finite()
    }

    /// Value of a fixed variable, otherwise the solution value.
    #[must_use]
    pub fn current_value(&self) -> Option<f64> {
        self.fixed.or(self.value)
    }
}

/// `lower <= body <= upper`, a side being absent when it is `None`.
///
/// The constant of the body is always moved into the sides.
#[derive(Clone, Debug, PartialEq)]
pub struct Relation {
    /// Lower side.
    pub lower: Option<f64>,
    /// Expression between the sides, with a zero constant.
    pub body: Expression,
    /// Upper side.
    pub upper: Option<f64>,
}

impl Relation {
    /// Create a relation, moving the constant of the body to the sides.
    #[must_use]
    pub fn new(lower: Option<f64>, mut body: Expression, upper: Option<f64>) -> Self {
        let constant = body.constant;
        body.constant = 0_f64;

        Self {
            lower: lower.map(|value| value - constant),
            body,
            upper: upper.map(|value| value - constant),
        }
    }

    /// `lower <= body <= upper`.
    #[must_use]
    pub fn range(lower: f64, body: impl Into<Expression>, upper: f64) -> Self {
        Self::new(Some(lower), body.into(), Some(upper))
    }

    /// Whether this relation reads `body == value`.
    #[must_use]
    pub fn is_equality(&self) -> bool {
        matches!((self.lower, self.upper), (Some(lower), Some(upper)) if lower == upper)
    }
}

impl Expression {
    /// `self <= rhs`.
    #[must_use]
    pub fn leq(self, rhs: impl Into<Expression>) -> Relation {
        Relation::new(None, self - rhs, Some(0_f64))
    }

    /// `self >= rhs`.
    #[must_use]
    pub fn geq(self, rhs: impl Into<Expression>) -> Relation {
        Relation::new(Some(0_f64), self - rhs, None)
    }

    /// `self == rhs`.
    #[must_use]
    pub fn equals(self, rhs: impl Into<Expression>) -> Relation {
        Relation::new(Some(0_f64), self - rhs, Some(0_f64))
    }
}

impl VarId {
    /// `self <= rhs`.
    #[must_use]
    pub fn leq(self, rhs: impl Into<Expression>) -> Relation {
        Expression::from(self).leq(rhs)
    }

    /// `self >= rhs`.
    #[must_use]
    pub fn geq(self, rhs: impl Into<Expression>) -> Relation {
        Expression::from(self).geq(rhs)
    }

    /// `self == rhs`.
    #[must_use]
    pub fn equals(self, rhs: impl Into<Expression>) -> Relation {
        Expression::from(self).equals(rhs)
    }
}

/// A named relation attached to a block.
#[derive(Clone, Debug, PartialEq)]
pub struct Constraint {
    /// Name, unique within the block.
    pub name: String,
    /// The relation itself.
    pub relation: Relation,
    /// Block the constraint was declared in.
    pub block: BlockId,
    /// Inactive constraints are ignored by all transformations.
    pub active: bool,
}

/// A named objective attached to a block.
#[derive(Clone, Debug, PartialEq)]
pub struct Objective {
    /// Name, unique within the block.
    pub name: String,
    /// Direction of optimization.
    pub sense: Sense,
    /// Function to optimize.
    pub expression: Expression,
    /// Block the objective was declared in.
    pub block: BlockId,
    /// Inactive objectives are ignored by all transformations.
    pub active: bool,
}

/// `0 <= left ⊥ right >= 0`: both sides nonnegative, at least one of them zero.
#[derive(Clone, Debug, PartialEq)]
pub struct Complementarity {
    /// Name, unique within the block.
    pub name: String,
    /// Left side.
    pub left: Expression,
    /// Right side.
    pub right: Expression,
    /// Block the condition was declared in.
    pub block: BlockId,
    /// Inactive conditions are ignored; expanding a condition deactivates it.
    pub active: bool,
}
