//! # Algebraic expressions
//!
//! Expressions of degree at most two, built with operator overloading on variable handles:
//!
//! ```
//! use bilevel::data::model::Model;
//! use bilevel::data::model::component::Domain;
//!
//! let mut model = Model::new("example");
//! let root = model.root();
//! let x = model.add_variable(root, "x", Domain::Reals, (0_f64, f64::INFINITY));
//! let y = model.add_variable(root, "y", Domain::Reals, (0_f64, f64::INFINITY));
//!
//! let expression = 3_f64 * x - y * x + 1_f64;
//! let repn = model.standard_repn(&expression);
//! assert_eq!(repn.constant, 1_f64);
//! assert_eq!(repn.linear_coefs, vec![3_f64]);
//! assert_eq!(repn.quadratic_coefs, vec![-1_f64]);
//! ```
use std::collections::BTreeMap;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use crate::data::model::VarId;

/// A constant plus linear terms plus products of two variables.
///
/// Terms are stored as they are added; duplicates are merged by `standard_repn`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Expression {
    pub(crate) constant: f64,
    pub(crate) linear: Vec<(VarId, f64)>,
    pub(crate) quadratic: Vec<(VarId, VarId, f64)>,
}

/// Merged, canonical view of an expression.
///
/// Each variable appears at most once in `linear_vars` and each (unordered) pair at most once in
/// `quadratic_vars`; pairs are ordered such that the first variable has the smaller id. Variables
/// are sorted by id. Terms with a zero coefficient are left out.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StandardRepn {
    /// Constant term, including contributions of fixed variables.
    pub constant: f64,
    /// Variables appearing linearly.
    pub linear_vars: Vec<VarId>,
    /// Coefficients of `linear_vars`.
    pub linear_coefs: Vec<f64>,
    /// Variable pairs appearing as a product.
    pub quadratic_vars: Vec<(VarId, VarId)>,
    /// Coefficients of `quadratic_vars`.
    pub quadratic_coefs: Vec<f64>,
}

impl StandardRepn {
    /// Whether there are no variable terms left.
    #[must_use]
    pub fn is_constant(&self) -> bool {
        self.linear_vars.is_empty() && self.quadratic_vars.is_empty()
    }

    /// Whether there are no product terms.
    #[must_use]
    pub fn is_linear(&self) -> bool {
        self.quadratic_vars.is_empty()
    }

    /// Iterate over (variable, coefficient) pairs of the linear part.
    pub fn linear(&self) -> impl Iterator<Item = (VarId, f64)> + '_ {
        self.linear_vars.iter().copied().zip(self.linear_coefs.iter().copied())
    }

    /// Iterate over (left, right, coefficient) triplets of the quadratic part.
    pub fn quadratic(&self) -> impl Iterator<Item = (VarId, VarId, f64)> + '_ {
        self.quadratic_vars.iter().zip(&self.quadratic_coefs)
            .map(|(&(left, right), &coefficient)| (left, right, coefficient))
    }
}

impl Expression {
    /// The zero expression.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A constant expression.
    #[must_use]
    pub fn constant(value: f64) -> Self {
        Self { constant: value, ..Self::default() }
    }

    /// Build a linear expression from (variable, coefficient) terms.
    #[must_use]
    pub fn linear(terms: impl IntoIterator<Item = (VarId, f64)>, constant: f64) -> Self {
        Self {
            constant,
            linear: terms.into_iter().collect(),
            quadratic: Vec::new(),
        }
    }

    /// Add `coefficient * variable`.
    pub fn add_term(&mut self, variable: VarId, coefficient: f64) {
        self.linear.push((variable, coefficient));
    }

    /// Add `coefficient * left * right`.
    pub fn add_product(&mut self, left: VarId, right: VarId, coefficient: f64) {
        self.quadratic.push((left, right, coefficient));
    }

    /// Add a constant.
    pub fn add_constant(&mut self, value: f64) {
        self.constant += value;
    }

    /// Value of the constant term, as stored (not including fixed variables).
    #[must_use]
    pub fn constant_term(&self) -> f64 {
        self.constant
    }

    /// Whether the expression contains products of variables.
    #[must_use]
    pub fn is_quadratic(&self) -> bool {
        !self.quadratic.is_empty()
    }

    /// Iterate over every variable appearing in this expression (with repetition).
    pub fn variables(&self) -> impl Iterator<Item = VarId> + '_ {
        self.linear.iter().map(|&(variable, _)| variable)
            .chain(self.quadratic.iter().flat_map(|&(left, right, _)| [left, right]))
    }

    /// Multiply two expressions.
    ///
    /// # Return value
    ///
    /// `None` if the product would have degree larger than two.
    #[must_use]
    pub fn product(&self, other: &Self) -> Option<Self> {
        if (self.is_quadratic() && !other.linear.is_empty())
            || (other.is_quadratic() && !self.linear.is_empty())
            || (self.is_quadratic() && other.is_quadratic()) {
            return None;
        }

        let mut result = Self::constant(self.constant * other.constant);
        for &(variable, coefficient) in &self.linear {
            result.add_term(variable, coefficient * other.constant);
            for &(other_variable, other_coefficient) in &other.linear {
                result.add_product(variable, other_variable, coefficient * other_coefficient);
            }
        }
        for &(variable, coefficient) in &other.linear {
            result.add_term(variable, coefficient * self.constant);
        }
        for &(left, right, coefficient) in &self.quadratic {
            result.add_product(left, right, coefficient * other.constant);
        }
        for &(left, right, coefficient) in &other.quadratic {
            result.add_product(left, right, coefficient * self.constant);
        }

        Some(result)
    }

    /// Merge terms into the canonical representation.
    ///
    /// # Arguments
    ///
    /// * `fixed_value`: Value of a variable if it is fixed, such variables are folded into the
    /// constant (or, inside a product, into a linear coefficient).
    pub fn standard_repn(&self, fixed_value: impl Fn(VarId) -> Option<f64>) -> StandardRepn {
        let mut constant = self.constant;
        let mut linear = BTreeMap::new();
        let mut quadratic = BTreeMap::new();

        let mut add_linear = |variable: VarId, coefficient: f64, constant: &mut f64| {
            match fixed_value(variable) {
                Some(value) => *constant += coefficient * value,
                None => *linear.entry(variable).or_insert(0_f64) += coefficient,
            }
        };

        for &(variable, coefficient) in &self.linear {
            add_linear(variable, coefficient, &mut constant);
        }
        for &(left, right, coefficient) in &self.quadratic {
            match (fixed_value(left), fixed_value(right)) {
                (Some(a), Some(b)) => constant += coefficient * a * b,
                (Some(a), None) => add_linear(right, coefficient * a, &mut constant),
                (None, Some(b)) => add_linear(left, coefficient * b, &mut constant),
                (None, None) => {
                    let key = if left <= right { (left, right) } else { (right, left) };
                    *quadratic.entry(key).or_insert(0_f64) += coefficient;
                },
            }
        }

        let (linear_vars, linear_coefs) = linear.into_iter()
            .filter(|&(_, coefficient)| coefficient != 0_f64)
            .unzip();
        let (quadratic_vars, quadratic_coefs) = quadratic.into_iter()
            .filter(|&(_, coefficient)| coefficient != 0_f64)
            .unzip();

        StandardRepn { constant, linear_vars, linear_coefs, quadratic_vars, quadratic_coefs }
    }

    /// Evaluate the expression.
    ///
    /// # Return value
    ///
    /// `None` if one of the variables has no value.
    pub fn evaluate(&self, value: impl Fn(VarId) -> Option<f64>) -> Option<f64> {
        let linear = self.linear.iter()
            .map(|&(variable, coefficient)| value(variable).map(|v| coefficient * v))
            .sum::<Option<f64>>()?;
        let quadratic = self.quadratic.iter()
            .map(|&(left, right, coefficient)| Some(coefficient * value(left)? * value(right)?))
            .sum::<Option<f64>>()?;

        Some(self.constant + linear + quadratic)
    }

    fn scale(mut self, factor: f64) -> Self {
        self.constant *= factor;
        for (_, coefficient) in &mut self.linear {
            *coefficient *= factor;
        }
        for (_, _, coefficient) in &mut self.quadratic {
            *coefficient *= factor;
        }
        self
    }
}

impl From<f64> for Expression {
    fn from(value: f64) -> Self {
        Self::constant(value)
    }
}

impl From<VarId> for Expression {
    fn from(variable: VarId) -> Self {
        Self { constant: 0_f64, linear: vec![(variable, 1_f64)], quadratic: Vec::new() }
    }
}

impl From<&Expression> for Expression {
    fn from(expression: &Expression) -> Self {
        expression.clone()
    }
}

impl<T: Into<Expression>> AddAssign<T> for Expression {
    fn add_assign(&mut self, rhs: T) {
        let rhs = rhs.into();
        self.constant += rhs.constant;
        self.linear.extend(rhs.linear);
        self.quadratic.extend(rhs.quadratic);
    }
}

impl<T: Into<Expression>> SubAssign<T> for Expression {
    fn sub_assign(&mut self, rhs: T) {
        *self += -rhs.into();
    }
}

impl<T: Into<Expression>> Add<T> for Expression {
    type Output = Expression;

    fn add(mut self, rhs: T) -> Self::Output {
        self += rhs;
        self
    }
}

impl<T: Into<Expression>> Sub<T> for Expression {
    type Output = Expression;

    fn sub(mut self, rhs: T) -> Self::Output {
        self -= rhs;
        self
    }
}

impl Neg for Expression {
    type Output = Expression;

    fn neg(self) -> Self::Output {
        self.scale(-1_f64)
    }
}

impl Mul<f64> for Expression {
    type Output = Expression;

    fn mul(self, rhs: f64) -> Self::Output {
        self.scale(rhs)
    }
}

impl Mul<Expression> for f64 {
    type Output = Expression;

    fn mul(self, rhs: Expression) -> Self::Output {
        rhs.scale(self)
    }
}

impl<T: Into<Expression>> Add<T> for VarId {
    type Output = Expression;

    fn add(self, rhs: T) -> Self::Output {
        Expression::from(self) + rhs
    }
}

impl<T: Into<Expression>> Sub<T> for VarId {
    type Output = Expression;

    fn sub(self, rhs: T) -> Self::Output {
        Expression::from(self) - rhs
    }
}

impl Neg for VarId {
    type Output = Expression;

    fn neg(self) -> Self::Output {
        -Expression::from(self)
    }
}

impl Mul<f64> for VarId {
    type Output = Expression;

    fn mul(self, rhs: f64) -> Self::Output {
        Expression::linear([(self, rhs)], 0_f64)
    }
}

impl Mul<VarId> for f64 {
    type Output = Expression;

    fn mul(self, rhs: VarId) -> Self::Output {
        Expression::linear([(rhs, self)], 0_f64)
    }
}

impl Mul<VarId> for VarId {
    type Output = Expression;

    fn mul(self, rhs: VarId) -> Self::Output {
        let mut expression = Expression::new();
        expression.add_product(self, rhs, 1_f64);
        expression
    }
}

impl Add<VarId> for f64 {
    type Output = Expression;

    fn add(self, rhs: VarId) -> Self::Output {
        Expression::constant(self) + rhs
    }
}

impl Add<Expression> for f64 {
    type Output = Expression;

    fn add(self, rhs: Expression) -> Self::Output {
        rhs + self
    }
}

impl Sub<VarId> for f64 {
    type Output = Expression;

    fn sub(self, rhs: VarId) -> Self::Output {
        Expression::constant(self) - rhs
    }
}

impl Sub<Expression> for f64 {
    type Output = Expression;

    fn sub(self, rhs: Expression) -> Self::Output {
        Expression::constant(self) - rhs
    }
}

impl Sum for Expression {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Expression::new(), |total, term| total + term)
    }
}
