//! # The `microlp` back-end
//!
//! A pure Rust branch and bound MILP solver. Only linear models are accepted.
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use ::microlp::{ComparisonOp, LinearExpr, OptimizationDirection, Problem};
use tracing::{debug, warn};

use crate::data::elements::Sense;
use crate::data::linear_algebra::EPSILON;
use crate::data::model::{Model, VarId};
use crate::data::model::component::Domain;
use crate::error::{Error, SolverError};
use crate::solver::{NumericResults, NumericSolver, SolveOptions, TerminationCondition};

/// Tolerance for constraints without variables.
const FEASIBILITY_TOLERANCE: f64 = 1e-9;

/// Numeric solver backed by the `microlp` crate.
#[derive(Debug, Default)]
pub struct MicroLp;

impl MicroLp {
    /// Create the solver.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn integer_bound(value: f64) -> i32 {
    if value.is_finite() {
        value.round().clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32
    } else if value > 0_f64 {
        i32::MAX
    } else {
        i32::MIN
    }
}

impl NumericSolver for MicroLp {
    fn name(&self) -> &str {
        "microlp"
    }

    fn solve(&mut self, model: &mut Model, options: &SolveOptions) -> Result<NumericResults, Error> {
        let start = Instant::now();
        if options.time_limit.is_some() || options.mip_gap.is_some() || !options.extra.is_empty() {
            warn!("microlp ignores time limits, gaps and extra options");
        }
        if let Some((_, condition)) = model.active_complementarities().next() {
            return Err(SolverError::UnsupportedProblem(format!(
                "complementarity condition {}", condition.name,
            )).into());
        }

        let (sense, objective) = {
            let mut objectives = model.active_objectives();
            match (objectives.next(), objectives.next()) {
                (Some((_, objective)), None) => (objective.sense, model.standard_repn(&objective.expression)),
                (None, _) => (Sense::Minimize, Default::default()),
                (Some(_), Some(_)) => return Err(SolverError::UnsupportedProblem(
                    "more than one active objective".into(),
                ).into()),
            }
        };
        if !objective.is_linear() {
            return Err(SolverError::UnsupportedProblem("quadratic objective".into()).into());
        }

        let mut rows = Vec::new();
        for (_, constraint) in model.active_constraints() {
            let repn = model.standard_repn(&constraint.relation.body);
            if !repn.is_linear() {
                return Err(SolverError::UnsupportedProblem(format!(
                    "quadratic constraint {}", constraint.name,
                )).into());
            }
            let lower = constraint.relation.lower.map(|value| value - repn.constant);
            let upper = constraint.relation.upper.map(|value| value - repn.constant);

            if repn.is_constant() {
                let violated = lower.is_some_and(|lower| lower > FEASIBILITY_TOLERANCE)
                    || upper.is_some_and(|upper| upper < -FEASIBILITY_TOLERANCE);
                if violated {
                    debug!(constraint = %constraint.name, "constant constraint is violated");
                    return Ok(NumericResults {
                        termination: TerminationCondition::Infeasible,
                        objective: None,
                        time: start.elapsed(),
                    });
                }
                continue;
            }
            rows.push((repn, lower, upper));
        }

        let used = objective.linear_vars.iter()
            .chain(rows.iter().flat_map(|(repn, _, _)| &repn.linear_vars))
            .copied()
            .collect::<BTreeSet<_>>();

        let direction = match sense {
            Sense::Minimize => OptimizationDirection::Minimize,
            Sense::Maximize => OptimizationDirection::Maximize,
        };
        let mut problem = Problem::new(direction);
        let coefficients = objective.linear().collect::<BTreeMap<_, _>>();
        let columns = used.iter()
            .map(|&id| {
                let variable = model.variable(id);
                let cost = coefficients.get(&id).copied().unwrap_or(0_f64);
                let column = match variable.domain {
                    Domain::Reals => problem.add_var(cost, (variable.lower, variable.upper)),
                    Domain::Integers => problem.add_integer_var(cost, (integer_bound(variable.lower), integer_bound(variable.upper))),
                    Domain::Binary => problem.add_binary_var(cost),
                };
                (id, column)
            })
            .collect::<BTreeMap<VarId, _>>();

        for (repn, lower, upper) in &rows {
            let expression = || {
                let mut expression = LinearExpr::empty();
                for (variable, coefficient) in repn.linear() {
                    if coefficient.abs() > EPSILON {
                        expression.add(columns[&variable], coefficient);
                    }
                }
                expression
            };
            match (lower, upper) {
                (Some(lower), Some(upper)) if lower == upper => problem.add_constraint(expression(), ComparisonOp::Eq, *lower),
                (lower, upper) => {
                    if let Some(lower) = lower {
                        problem.add_constraint(expression(), ComparisonOp::Ge, *lower);
                    }
                    if let Some(upper) = upper {
                        problem.add_constraint(expression(), ComparisonOp::Le, *upper);
                    }
                },
            }
        }
        debug!(variables = columns.len(), rows = rows.len(), "built microlp problem");

        let solution = match problem.solve() {
            Ok(solution) => solution,
            Err(::microlp::Error::Infeasible) => return Ok(NumericResults {
                termination: TerminationCondition::Infeasible,
                objective: None,
                time: start.elapsed(),
            }),
            Err(::microlp::Error::Unbounded) => return Ok(NumericResults {
                termination: TerminationCondition::Unbounded,
                objective: None,
                time: start.elapsed(),
            }),
            Err(error) => return Err(SolverError::Failure(error.to_string()).into()),
        };

        if options.load_solutions {
            for (&id, &column) in &columns {
                let value = solution[column];
                let value = match model.variable(id).domain {
                    Domain::Reals => value,
                    Domain::Integers | Domain::Binary => value.round(),
                };
                model.set_value(id, value);
            }
            // Variables that appear nowhere take the value closest to zero.
            let unused = model.variables()
                .filter(|&(id, variable)| {
                    !columns.contains_key(&id) && variable.fixed.is_none() && model.is_active(variable.block)
                })
                .map(|(id, variable)| (id, 0_f64.max(variable.lower).min(variable.upper)))
                .collect::<Vec<_>>();
            for (id, value) in unused {
                model.set_value(id, value);
            }
        }

        Ok(NumericResults {
            termination: TerminationCondition::Optimal,
            objective: Some(solution.objective() + objective.constant),
            time: start.elapsed(),
        })
    }
}

#[cfg(test)]
mod test {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn mixed_integer() {
        let mut model = Model::new("m");
        let root = model.root();
        let x = model.add_variable(root, "x", Domain::Reals, (0_f64, f64::INFINITY));
        let z = model.add_variable(root, "z", Domain::Integers, (0_f64, 10_f64));
        let fixed = model.add_variable(root, "f", Domain::Reals, (0_f64, 10_f64));
        model.fix(fixed, 2_f64);
        model.add_constraint(root, "c", (2_f64 * x + 2_f64 * z).leq(7_f64 + fixed));
        model.add_constraint(root, "d", (x - z).leq(0.5));
        model.add_objective(root, "o", Sense::Maximize, 2_f64 * x + z + 1_f64);

        let results = MicroLp::new().solve(&mut model, &SolveOptions::default()).unwrap();
        assert_eq!(results.termination, TerminationCondition::Optimal);
        assert_abs_diff_eq!(results.objective.unwrap(), 8_f64, epsilon = 1e-6);
        assert_abs_diff_eq!(model.value(z).unwrap(), 2_f64);
        assert_abs_diff_eq!(model.value(x).unwrap(), 2.5, epsilon = 1e-6);
    }

    #[test]
    fn infeasible() {
        let mut model = Model::new("m");
        let root = model.root();
        let x = model.add_variable(root, "x", Domain::Reals, (0_f64, 1_f64));
        model.add_constraint(root, "c", x.geq(2_f64));
        model.add_objective(root, "o", Sense::Minimize, x);

        let results = MicroLp::new().solve(&mut model, &SolveOptions::default()).unwrap();
        assert_eq!(results.termination, TerminationCondition::Infeasible);
        assert_eq!(model.value(x), None);

        let mut model = Model::new("constant");
        let root = model.root();
        let x = model.add_variable(root, "x", Domain::Reals, (0_f64, 1_f64));
        model.fix(x, 1_f64);
        model.add_constraint(root, "c", x.geq(2_f64));
        let results = MicroLp::new().solve(&mut model, &SolveOptions::default()).unwrap();
        assert_eq!(results.termination, TerminationCondition::Infeasible);
    }

    #[test]
    fn rejects_products() {
        let mut model = Model::new("m");
        let root = model.root();
        let x = model.add_variable(root, "x", Domain::Reals, (0_f64, 1_f64));
        let y = model.add_variable(root, "y", Domain::Reals, (0_f64, 1_f64));
        model.add_constraint(root, "c", (x * y).leq(0.5));

        assert!(matches!(
            MicroLp::new().solve(&mut model, &SolveOptions::default()),
            Err(Error::Solver(SolverError::UnsupportedProblem(_))),
        ));
    }
}
