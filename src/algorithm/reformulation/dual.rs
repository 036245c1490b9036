//! # Dualization of a lower level
//!
//! With the variables of the outer levels as parameters, a linear lower level in its own real
//! variables `y` reads (after multiplying the objective by `-1` if the level minimizes)
//!
//! ```text
//! max c(x) y
//! s.t. A(x) y <= beta(x)    (or == for a level in equality form)
//!      lb <= y <= ub
//! ```
//!
//! Its linear programming dual is
//!
//! ```text
//! min beta(x) lambda - lb mu_lower + ub mu_upper
//! s.t. A(x)^T lambda - mu_lower + mu_upper >= c(x)    (== for y without a zero lower bound)
//! ```
//!
//! where a zero lower bound is expressed as the sign of `y` and every other finite bound gets a
//! nonnegative multiplier. Parameters multiplying dual variables make the dual bilinear.
use tracing::debug;

use crate::algorithm::reformulation::Reformulation;
use crate::algorithm::reformulation::kkt::{check_follower, objective_gradient, row_gradient};
use crate::data::elements::RowSense;
use crate::data::level::{Kind, LevelId, MultilevelProblem, VariableRef};
use crate::data::model::component::Domain;
use crate::data::model::expression::Expression;
use crate::data::model::{BlockId, VarId};
use crate::error::Error;

/// How the dual is connected to the rest of the model.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DualOptions {
    /// Add the equality "primal objective equals dual objective".
    pub strong_duality: bool,
    /// Replace the model objective by one expressed in the dual objective.
    ///
    /// Requires that the parent level has no rows of its own, that the two levels optimize in
    /// opposite directions and that they agree on the coefficients of the lower level variables.
    pub use_dual_objective: bool,
}

impl Default for DualOptions {
    fn default() -> Self {
        Self { strong_duality: true, use_dual_objective: false }
    }
}

impl DualOptions {
    /// Set whether to add the strong duality equality.
    #[must_use]
    pub fn with_strong_duality(mut self, strong_duality: bool) -> Self {
        self.strong_duality = strong_duality;
        self
    }

    /// Set whether to replace the model objective.
    #[must_use]
    pub fn with_dual_objective(mut self, use_dual_objective: bool) -> Self {
        self.use_dual_objective = use_dual_objective;
        self
    }
}

/// Components added for the dual of one lower level.
#[derive(Clone, Debug, PartialEq)]
pub struct Dual {
    /// Block holding all added components.
    pub block: BlockId,
    /// Dual variable of every row of the level.
    pub duals: Vec<VarId>,
    /// Dual variables of the explicit bound rows, with the variable and the bound they belong to.
    pub bound_duals: Vec<(VariableRef, f64, VarId)>,
    /// The dual objective, to be minimized.
    pub objective: Expression,
    /// The part of the lower level objective that doesn't depend on the lower level variables.
    pub parametric_objective: Expression,
}

/// Part of a row that doesn't depend on variables of `level`, moved to the right hand side.
fn right_hand_side(
    reformulation: &Reformulation,
    problem: &MultilevelProblem,
    level: LevelId,
    row: usize,
) -> Expression {
    let data = problem.level(level);
    let mut rhs = Expression::constant(data.b[row]);
    for (variable, coefficient) in data.row(row) {
        if variable.level != level {
            rhs.add_term(reformulation.variable(variable), -coefficient);
        }
    }
    for term in data.row_bilinear(row) {
        if term.left.level != level && term.right.level != level {
            rhs.add_product(reformulation.variable(term.left), reformulation.variable(term.right), -term.coefficient);
        }
    }

    rhs
}

/// Terms of the objective of `level` without variables of `level`.
fn parametric_part(reformulation: &Reformulation, problem: &MultilevelProblem, level: LevelId, of: LevelId) -> Expression {
    let data = problem.level(of);
    let mut expression = Expression::constant(data.d);
    for (variable, coefficient) in data.objective_terms() {
        if variable.level != level {
            expression.add_term(reformulation.variable(variable), coefficient);
        }
    }
    for term in &data.objective_bilinear {
        if term.left.level != level && term.right.level != level {
            expression.add_product(reformulation.variable(term.left), reformulation.variable(term.right), term.coefficient);
        }
    }

    expression
}

fn product(left: &Expression, right: &Expression, name: &str) -> Result<Expression, Error> {
    left.product(right).ok_or_else(|| Error::UnsupportedStructure(format!(
        "the dual of {name} has terms of degree three",
    )))
}

/// Check that the model objective may be replaced by the dual objective of `level`.
fn check_dual_objective(problem: &MultilevelProblem, level: LevelId) -> Result<LevelId, Error> {
    let data = problem.level(level);
    let parent_id = data.parent.ok_or_else(|| {
        Error::UnsupportedStructure("the upper level has no dual objective".into())
    })?;
    let parent = problem.level(parent_id);

    if parent.nr_rows() > 0 {
        return Err(Error::UnsupportedStructure(format!(
            "level {parent_id} has rows of its own, the dual objective can't replace its objective",
        )));
    }
    if parent.sense == data.sense {
        return Err(Error::UnsupportedStructure(format!(
            "levels {parent_id} and {level} optimize in the same direction",
        )));
    }
    let touches = |left: VariableRef, right: VariableRef| left.level == level || right.level == level;
    if parent.objective_bilinear.iter().any(|term| touches(term.left, term.right))
        || data.objective_bilinear.iter().any(|term| touches(term.left, term.right)) {
        return Err(Error::UnsupportedStructure(format!(
            "the objectives of levels {parent_id} and {level} have products with variables of {level}",
        )));
    }
    let bundle = &data.variables[Kind::Real];
    for index in 0..bundle.len() {
        let variable = VariableRef::new(level, Kind::Real, index);
        if parent.objective_coefficient(variable) != data.objective_coefficient(variable) {
            return Err(Error::UnsupportedStructure(format!(
                "levels {parent_id} and {level} have different coefficients for {}", bundle.names[index],
            )));
        }
    }

    Ok(parent_id)
}

/// Add the dual of a lower level.
///
/// The rows of the level itself are not added; with `strong_duality`, they should be (see
/// `Reformulation::add_rows`).
///
/// # Errors
///
/// When the level is not a linear level with real variables only, when the dual would have terms
/// of degree three, or when `use_dual_objective` is requested but not valid.
pub fn add_dual(
    reformulation: &mut Reformulation,
    problem: &MultilevelProblem,
    level: LevelId,
    options: DualOptions,
) -> Result<Dual, Error> {
    check_follower(problem, level)?;
    let parent = if options.use_dual_objective {
        Some(check_dual_objective(problem, level)?)
    } else {
        None
    };

    let data = problem.level(level);
    let sign = data.sense.sign();
    let root = reformulation.model.root();
    let block = reformulation.model.add_block(root, &format!("dual[{level}]"));

    let bounds = match data.row_sense {
        RowSense::Less => (0_f64, f64::INFINITY),
        RowSense::Equal => (f64::NEG_INFINITY, f64::INFINITY),
    };
    let duals = (0..data.nr_rows())
        .map(|row| reformulation.model.add_variable(block, &format!("dual[{level},{row}]"), Domain::Reals, bounds))
        .collect::<Vec<_>>();

    let mut objective = Expression::new();
    for (row, &dual) in duals.iter().enumerate() {
        let rhs = right_hand_side(reformulation, problem, level, row);
        objective += product(&rhs, &Expression::from(dual), &data.row_names[row])?;
    }

    let bundle = &data.variables[Kind::Real];
    let mut bound_duals = Vec::new();
    for index in 0..bundle.len() {
        let variable = VariableRef::new(level, Kind::Real, index);
        let name = &bundle.names[index];
        let (lower, upper) = bundle.bounds(index);

        let mut body = Expression::new();
        for (row, &dual) in duals.iter().enumerate() {
            let gradient = row_gradient(reformulation, problem, level, row, variable);
            body += product(&gradient, &Expression::from(dual), name)?;
        }
        if lower.is_finite() && lower != 0_f64 {
            let dual = reformulation.model.add_variable(block, &format!("dual_lower[{level},{name}]"), Domain::Reals, (0_f64, f64::INFINITY));
            body -= dual;
            objective.add_term(dual, -lower);
            bound_duals.push((variable, lower, dual));
        }
        if upper.is_finite() {
            let dual = reformulation.model.add_variable(block, &format!("dual_upper[{level},{name}]"), Domain::Reals, (0_f64, f64::INFINITY));
            body += dual;
            objective.add_term(dual, upper);
            bound_duals.push((variable, upper, dual));
        }

        let cost = objective_gradient(reformulation, problem, level, variable) * -sign;
        let relation = if lower == 0_f64 {
            body.geq(cost)
        } else {
            body.equals(cost)
        };
        reformulation.model.add_constraint(block, &format!("dual_row[{level},{name}]"), relation);
    }

    // The optimal value of the lower level is -sign * objective + parametric_objective.
    let parametric_objective = parametric_part(reformulation, problem, level, level);
    if options.strong_duality {
        let primal = reformulation.objective_expression(problem, level);
        let tie = primal.equals(objective.clone() * -sign + &parametric_objective);
        reformulation.model.add_constraint(block, &format!("strong_duality[{level}]"), tie);
    }

    if let Some(parent) = parent {
        let replaced = objective.clone() * -sign + parametric_part(reformulation, problem, level, parent);
        reformulation.model.set_objective_expression(reformulation.objective, replaced);
    }

    debug!(
        level = %level,
        duals = duals.len(),
        bound_duals = bound_duals.len(),
        strong_duality = options.strong_duality,
        dual_objective = options.use_dual_objective,
        "added dual",
    );
    Ok(Dual { block, duals, bound_duals, objective, parametric_objective })
}
