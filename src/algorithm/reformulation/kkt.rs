//! # Optimality conditions of a lower level
//!
//! Replaces the optimization of a linear lower level with continuous variables by its KKT
//! conditions. Rows `g(x, y) <= b` of the level get a multiplier `lambda >= 0`, equality rows a
//! free multiplier, and every finite bound of a lower level variable a nonnegative multiplier.
//! Stationarity reads, with `s` equal to `1` for a minimizing and `-1` for a maximizing level,
//!
//! `s grad f + sum_i lambda_i grad g_i - nu_lower + nu_upper = 0`,
//!
//! and complementarity pairs every inequality slack with its multiplier. Products of lower level
//! variables with parameters make the gradients depend on the parameters; those terms become
//! products of a multiplier and a parameter in the model.
use tracing::debug;

use crate::algorithm::reformulation::Reformulation;
use crate::data::elements::RowSense;
use crate::data::level::{Kind, LevelId, MultilevelProblem, VariableRef};
use crate::data::model::{BlockId, VarId};
use crate::data::model::component::Domain;
use crate::data::model::expression::Expression;
use crate::error::Error;

/// Components added for one lower level.
#[derive(Clone, Debug, PartialEq)]
pub struct Kkt {
    /// Block holding all added components.
    pub block: BlockId,
    /// Multiplier of every row of the level.
    pub duals: Vec<VarId>,
    /// Multipliers of finite lower bounds, by variable index.
    pub lower_multipliers: Vec<Option<VarId>>,
    /// Multipliers of finite upper bounds, by variable index.
    pub upper_multipliers: Vec<Option<VarId>>,
}

/// Gradient of the objective with respect to `variable`.
pub(crate) fn objective_gradient(
    reformulation: &Reformulation,
    problem: &MultilevelProblem,
    level: LevelId,
    variable: VariableRef,
) -> Expression {
    let data = problem.level(level);
    let mut gradient = Expression::constant(data.objective_coefficient(variable));
    for term in &data.objective_bilinear {
        if term.left == variable {
            gradient.add_term(reformulation.variable(term.right), term.coefficient);
        } else if term.right == variable {
            gradient.add_term(reformulation.variable(term.left), term.coefficient);
        }
    }

    gradient
}

/// Gradient of row `row` with respect to `variable`.
pub(crate) fn row_gradient(
    reformulation: &Reformulation,
    problem: &MultilevelProblem,
    level: LevelId,
    row: usize,
    variable: VariableRef,
) -> Expression {
    let data = problem.level(level);
    let coefficient = data.a.get(&variable.block()).map_or(0_f64, |matrix| matrix.get(row, variable.index));
    let mut gradient = Expression::constant(coefficient);
    for term in data.row_bilinear(row) {
        if term.left == variable {
            gradient.add_term(reformulation.variable(term.right), term.coefficient);
        } else if term.right == variable {
            gradient.add_term(reformulation.variable(term.left), term.coefficient);
        }
    }

    gradient
}

/// Require a lower level with only real variables that is linear in its own variables.
pub(crate) fn check_follower(problem: &MultilevelProblem, level: LevelId) -> Result<(), Error> {
    if level == LevelId::UPPER {
        return Err(Error::UnsupportedStructure("the upper level has no optimality conditions to add".into()));
    }
    let data = problem.level(level);
    if !data.variables[Kind::Integer].is_empty() || !data.variables[Kind::Binary].is_empty() {
        return Err(Error::UnsupportedStructure(format!(
            "lower level {level} ({}) has integer or binary variables", data.name,
        )));
    }
    let owned_pair = |left: VariableRef, right: VariableRef| left.level == level && right.level == level;
    if data.bilinear.iter().any(|term| owned_pair(term.left, term.right))
        || data.objective_bilinear.iter().any(|term| owned_pair(term.left, term.right)) {
        return Err(Error::UnsupportedStructure(format!(
            "lower level {level} ({}) has a product of two of its own variables", data.name,
        )));
    }

    Ok(())
}

/// Add the optimality conditions of a lower level.
///
/// The rows of the level should be added separately (see `Reformulation::add_rows`).
///
/// # Errors
///
/// When the level is the upper level, has integer variables or products of its own variables.
pub fn add_kkt(
    reformulation: &mut Reformulation,
    problem: &MultilevelProblem,
    level: LevelId,
) -> Result<Kkt, Error> {
    check_follower(problem, level)?;

    let data = problem.level(level);
    let root = reformulation.model.root();
    let block = reformulation.model.add_block(root, &format!("kkt[{level}]"));
    let sign = data.sense.sign();

    let duals = (0..data.nr_rows())
        .map(|row| {
            let bounds = match data.row_sense {
                RowSense::Less => (0_f64, f64::INFINITY),
                RowSense::Equal => (f64::NEG_INFINITY, f64::INFINITY),
            };
            reformulation.model.add_variable(block, &format!("dual[{level},{row}]"), Domain::Reals, bounds)
        })
        .collect::<Vec<_>>();

    let bundle = &data.variables[Kind::Real];
    let mut lower_multipliers = Vec::with_capacity(bundle.len());
    let mut upper_multipliers = Vec::with_capacity(bundle.len());
    for index in 0..bundle.len() {
        let (lower, upper) = bundle.bounds(index);
        let name = &bundle.names[index];
        lower_multipliers.push(lower.is_finite().then(|| {
            reformulation.model.add_variable(block, &format!("nu_lower[{level},{name}]"), Domain::Reals, (0_f64, f64::INFINITY))
        }));
        upper_multipliers.push(upper.is_finite().then(|| {
            reformulation.model.add_variable(block, &format!("nu_upper[{level},{name}]"), Domain::Reals, (0_f64, f64::INFINITY))
        }));
    }

    for index in 0..bundle.len() {
        let variable = VariableRef::new(level, Kind::Real, index);
        let mut stationarity = objective_gradient(reformulation, problem, level, variable) * sign;
        for (row, &dual) in duals.iter().enumerate() {
            let gradient = row_gradient(reformulation, problem, level, row, variable);
            if let Some(product) = gradient.product(&Expression::from(dual)) {
                stationarity += product;
            }
        }
        if let Some(multiplier) = lower_multipliers[index] {
            stationarity -= multiplier;
        }
        if let Some(multiplier) = upper_multipliers[index] {
            stationarity += multiplier;
        }

        let name = format!("stationarity[{level},{}]", bundle.names[index]);
        reformulation.model.add_constraint(block, &name, stationarity.equals(0_f64));
    }

    if data.row_sense == RowSense::Less {
        for (row, &dual) in duals.iter().enumerate() {
            let slack = Expression::constant(data.b[row]) - reformulation.row_expression(problem, level, row);
            reformulation.model.add_complementarity(block, &format!("comp[{level},{row}]"), slack, dual);
        }
    }
    for index in 0..bundle.len() {
        let x = reformulation.variable(VariableRef::new(level, Kind::Real, index));
        let (lower, upper) = bundle.bounds(index);
        let name = &bundle.names[index];
        if let Some(multiplier) = lower_multipliers[index] {
            reformulation.model.add_complementarity(block, &format!("comp_lower[{level},{name}]"), x - lower, multiplier);
        }
        if let Some(multiplier) = upper_multipliers[index] {
            reformulation.model.add_complementarity(block, &format!("comp_upper[{level},{name}]"), upper - x, multiplier);
        }
    }

    debug!(
        level = %level,
        duals = duals.len(),
        bound_multipliers = lower_multipliers.iter().chain(&upper_multipliers).flatten().count(),
        "added optimality conditions",
    );
    Ok(Kkt { block, duals, lower_multipliers, upper_multipliers })
}
