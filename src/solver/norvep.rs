//! # Near-optimal robust driver
//!
//! The follower may answer with any point whose objective is within `delta` of its optimum, and
//! the leader's constraints have to hold for every such answer. For a leader row
//! `G_k x + H_k y <= b_k`, the worst answer solves
//!
//! `max H_k y s.t. B y <= b - A x, d y <= d v + delta, y >= 0`
//!
//! in which `v` is an optimal follower answer and `d` the follower objective to minimize. The row
//! is robust when some feasible point `(alpha, beta)` of the dual `B^T alpha + beta d >= H_k`
//! satisfies `alpha (b - A x) + beta (d v + delta) <= b_k - G_k x`. The dual polyhedron doesn't
//! depend on the leader's decision, so its vertices are enumerated once and the row is replaced by
//! a disjunction over them.
//!
//! Before building the extended problem, the highpoint relaxation and the optimistic problem are
//! solved; when one of them is infeasible, so is the robust problem.
use std::collections::BTreeMap;
use std::time::Instant;

use cumsum::cumsum_array_owned;
use itertools::Itertools;
use tracing::{debug, info, warn};

use crate::algorithm::introspect::SortOrder;
use crate::algorithm::reformulation::complementarity;
use crate::algorithm::reformulation::highpoint::highpoint;
use crate::algorithm::reformulation::kkt::{add_kkt, check_follower};
use crate::algorithm::reformulation::Reformulation;
use crate::algorithm::vertex::vertices;
use crate::data::elements::RowSense;
use crate::data::level::{Kind, LevelId, MultilevelProblem, VariableRef};
use crate::data::linear_algebra::EPSILON;
use crate::data::model::Model;
use crate::data::model::component::Domain;
use crate::data::model::expression::Expression;
use crate::error::Error;
use crate::solver::fa::big_m_or_default;
use crate::solver::{
    numeric_solver, pipeline, BilevelSolver, InfeasibleProbe, NumericSolver, SolveOptions, SolverResults,
    TerminationCondition,
};

/// Used when no `big_m` is given.
pub const DEFAULT_BIG_M: f64 = 1e6;
/// Used when no `delta` is given.
pub const DEFAULT_DELTA: f64 = 0.05;

/// Options of the `Norvep` driver.
#[derive(Clone, Debug, PartialEq)]
pub struct NorvepOptions {
    /// Name of the numeric solver, which should handle binaries.
    pub solver: String,
    /// Options passed to the numeric solver.
    pub solve: SolveOptions,
    /// Order in which model components are read.
    pub sort: SortOrder,
    /// Bound used in the disjunctions.
    pub big_m: Option<f64>,
    /// How far from optimal the follower may answer.
    pub delta: Option<f64>,
    /// Bound on the dual variables of the adversarial problems.
    pub dual_bound: Option<f64>,
}

impl Default for NorvepOptions {
    fn default() -> Self {
        Self {
            solver: "microlp".to_string(),
            solve: SolveOptions::default(),
            sort: SortOrder::default(),
            big_m: None,
            delta: None,
            dual_bound: None,
        }
    }
}

impl NorvepOptions {
    /// Set the numeric solver.
    #[must_use]
    pub fn with_solver(mut self, solver: impl Into<String>) -> Self {
        self.solver = solver.into();
        self
    }

    /// Set the options passed to the numeric solver.
    #[must_use]
    pub fn with_solve_options(mut self, solve: SolveOptions) -> Self {
        self.solve = solve;
        self
    }

    /// Set the order in which model components are read.
    #[must_use]
    pub fn with_sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    /// Set `big_m`.
    #[must_use]
    pub fn with_big_m(mut self, big_m: f64) -> Self {
        self.big_m = Some(big_m);
        self
    }

    /// Set `delta`.
    #[must_use]
    pub fn with_delta(mut self, delta: f64) -> Self {
        self.delta = Some(delta);
        self
    }

    /// Set `dual_bound`.
    #[must_use]
    pub fn with_dual_bound(mut self, dual_bound: f64) -> Self {
        self.dual_bound = Some(dual_bound);
        self
    }
}

/// A leader row that depends on the follower, with the vertices of its dual polyhedron.
#[derive(Clone, Debug, PartialEq)]
struct Adversarial {
    row: usize,
    /// Each vertex holds one `alpha` per follower row, followed by `beta`.
    vertices: Vec<Vec<f64>>,
}

/// Driver for near-optimal robust bilevel problems.
#[derive(Clone, Debug, Default)]
pub struct Norvep {
    /// Options.
    pub options: NorvepOptions,
}

impl Norvep {
    /// Create a driver.
    #[must_use]
    pub fn new(options: NorvepOptions) -> Self {
        Self { options }
    }
}

/// The only lower level.
fn single_follower(problem: &MultilevelProblem) -> Result<LevelId, Error> {
    let followers = problem.lower_levels().collect::<Vec<_>>();
    match followers[..] {
        [follower] => Ok(follower),
        _ => Err(Error::UnsupportedStructure(format!(
            "driver norvep needs exactly one lower level, found {}", followers.len(),
        ))),
    }
}

/// Check the follower and move its finite upper bounds into rows.
///
/// The problem should have minimization in the upper level, maximization in the follower and
/// inequality rows.
fn prepare_follower(problem: &mut MultilevelProblem, follower: LevelId) -> Result<(), Error> {
    check_follower(problem, follower)?;
    if problem.levels().any(|(_, level)| !level.bilinear.is_empty() || !level.objective_bilinear.is_empty()) {
        return Err(Error::UnsupportedStructure("driver norvep doesn't handle products of variables".into()));
    }
    if problem.levels().any(|(_, level)| level.row_sense != RowSense::Less) {
        return Err(Error::UnsupportedStructure("driver norvep needs inequality rows".into()));
    }

    let bundle = &problem.level(follower).variables[Kind::Real];
    if let Some(index) = (0..bundle.len()).find(|&index| bundle.lower[index] != 0_f64) {
        return Err(Error::UnsupportedStructure(format!(
            "follower variable {} should have lower bound zero, not {}", bundle.names[index], bundle.lower[index],
        )));
    }

    let bounded = (0..bundle.len())
        .filter(|&index| bundle.upper[index].is_finite())
        .map(|index| (index, bundle.upper[index], bundle.names[index].clone()))
        .collect::<Vec<_>>();
    for (index, upper, name) in bounded {
        let variable = VariableRef::new(follower, Kind::Real, index);
        problem.add_row(follower, &[(variable, 1_f64)], upper, format!("upper[{name}]"));
        problem.level_mut(follower).variables[Kind::Real].upper[index] = f64::INFINITY;
    }

    Ok(())
}

/// Coefficients of the follower's own variables in a row.
fn follower_part(terms: &[(VariableRef, f64)], follower: LevelId, nr_columns: usize) -> Vec<f64> {
    let mut part = vec![0_f64; nr_columns];
    for &(variable, value) in terms {
        if variable.level == follower {
            part[variable.index] += value;
        }
    }

    part
}

/// Vertices of `{(alpha, beta) >= 0 : B^T alpha + beta d >= H_k}`, with `d` the follower objective
/// to minimize.
fn dual_vertices(
    problem: &MultilevelProblem,
    follower: LevelId,
    leader_row: &[f64],
    dual_bound: Option<f64>,
) -> Vec<Vec<f64>> {
    let level = problem.level(follower);
    let nr_columns = level.variables[Kind::Real].len();
    let [beta, dimension] = cumsum_array_owned([level.nr_rows(), 1]);

    let follower_rows = (0..level.nr_rows())
        .map(|row| follower_part(&level.row(row), follower, nr_columns))
        .collect::<Vec<_>>();
    let mut rows = (0..nr_columns)
        .map(|j| {
            let mut row = follower_rows.iter().map(|coefficients| coefficients[j]).collect::<Vec<_>>();
            row.push(-level.objective_coefficient(VariableRef::new(follower, Kind::Real, j)));
            row
        })
        .collect::<Vec<_>>();
    let mut rhs = leader_row.to_vec();
    if let Some(bound) = dual_bound {
        for index in 0..dimension {
            let mut row = vec![0_f64; dimension];
            row[index] = -1_f64;
            rows.push(row);
            rhs.push(-bound);
        }
    }
    debug_assert!(rows.iter().all(|row| row.len() == beta + 1));

    vertices(dimension, &rows, &rhs)
}

/// Leader rows that depend on the follower, with their dual vertices.
///
/// # Errors
///
/// The name of the first row whose dual polyhedron has no vertex.
fn adversarial_rows(
    problem: &MultilevelProblem,
    follower: LevelId,
    dual_bound: Option<f64>,
) -> Result<Vec<Adversarial>, String> {
    let upper = problem.upper();
    let nr_columns = problem.level(follower).variables[Kind::Real].len();

    let mut adversarial = Vec::new();
    for row in 0..upper.nr_rows() {
        let leader_row = follower_part(&upper.row(row), follower, nr_columns);
        if leader_row.iter().all(|value| value.abs() < EPSILON) {
            continue;
        }

        let vertices = dual_vertices(problem, follower, &leader_row, dual_bound);
        debug!(row = %upper.row_names[row], vertices = vertices.len(), "enumerated dual vertices");
        if vertices.is_empty() {
            return Err(upper.row_names[row].clone());
        }
        adversarial.push(Adversarial { row, vertices });
    }

    Ok(adversarial)
}

/// The terms of a row that don't belong to the follower, plus `constant`.
fn leader_part(
    reformulation: &Reformulation,
    terms: &[(VariableRef, f64)],
    follower: LevelId,
    constant: f64,
) -> Expression {
    let leader = terms.iter()
        .copied()
        .filter(|&(variable, _)| variable.level != follower)
        .collect::<Vec<_>>();

    reformulation.linear_expression(&leader, constant)
}

/// Single-level problem with the follower's optimality conditions and a disjunction for each
/// adversarial row.
fn extended(
    problem: &MultilevelProblem,
    follower: LevelId,
    adversarial: &[Adversarial],
    delta: f64,
    big_m: f64,
) -> Result<Reformulation, Error> {
    let mut reformulation = Reformulation::new(problem, "norvep");
    reformulation.add_rows(problem, follower);
    add_kkt(&mut reformulation, problem, follower)?;

    let upper = problem.upper();
    let leader_block = reformulation.level_blocks[LevelId::UPPER.0];
    let robust = adversarial.iter().map(|adversarial| adversarial.row).collect::<Vec<_>>();
    for row in (0..upper.nr_rows()).filter(|row| !robust.contains(row)) {
        let body = reformulation.row_expression(problem, LevelId::UPPER, row);
        reformulation.model.add_constraint(leader_block, &upper.row_names[row], body.leq(upper.b[row]));
    }

    let level = problem.level(follower);
    // d v + delta, with d the objective to minimize
    let objective = level.objective_terms().into_iter()
        .filter(|(variable, _)| variable.level == follower)
        .map(|(variable, value)| (variable, -value))
        .collect::<Vec<_>>();
    let margin = reformulation.linear_expression(&objective, delta);
    // A_r x - b_r
    let follower_rows = (0..level.nr_rows())
        .map(|row| leader_part(&reformulation, &level.row(row), follower, -level.b[row]))
        .collect::<Vec<_>>();

    let root = reformulation.model.root();
    let block = reformulation.model.add_block(root, "robust");
    for Adversarial { row, vertices } in adversarial {
        let name = &upper.row_names[*row];
        let choices = reformulation.model.add_indexed_variable(
            block, &format!("choice[{name}]"), vertices.len(), Domain::Binary, (0_f64, 1_f64),
        );
        let sum = Expression::linear(choices.iter().map(|&choice| (choice, 1_f64)), 0_f64);
        reformulation.model.add_constraint(block, &format!("disjunction[{name}]"), sum.equals(1_f64));

        // G_k x - b_k
        let leader = leader_part(&reformulation, &upper.row(*row), follower, -upper.b[*row]);
        for (index, (vertex, &choice)) in vertices.iter().zip_eq(&choices).enumerate() {
            let (alpha, beta) = vertex.split_at(level.nr_rows());
            let mut body = leader.clone() + margin.clone() * beta[0] + choice * big_m;
            for (row_expression, &value) in follower_rows.iter().zip_eq(alpha) {
                if value.abs() > EPSILON {
                    body -= row_expression.clone() * value;
                }
            }
            reformulation.model.add_constraint(block, &format!("robust[{name},{index}]"), body.leq(big_m));
        }
    }

    let pairs = complementarity::big_m(&mut reformulation.model, big_m);
    debug!(rows = adversarial.len(), pairs, "built extended problem");
    Ok(reformulation)
}

impl Norvep {
    /// Solve one probe.
    ///
    /// # Return value
    ///
    /// Whether the probe has a solution. If not, the results carry the probe and its termination.
    fn probe(
        &self,
        solver: &mut dyn NumericSolver,
        reformulation: &mut Reformulation,
        probe: InfeasibleProbe,
        results: &mut SolverResults,
    ) -> Result<Option<(Option<f64>, BTreeMap<VariableRef, f64>)>, Error> {
        info!(probe = ?probe, "solving probe");
        let (numeric, values) = pipeline::solve(solver, reformulation, &self.options.solve, results)?;
        match values {
            Some(values) => Ok(Some((numeric.objective, values))),
            None => {
                warn!(probe = ?probe, termination = %numeric.termination, "probe has no solution");
                results.infeasible_probe = Some(probe);
                Ok(None)
            },
        }
    }

    /// Run the probes and the extended problem on a problem with a minimizing upper level and a
    /// maximizing follower.
    fn solve_levels(
        &self,
        problem: &mut MultilevelProblem,
    ) -> Result<(SolverResults, Option<BTreeMap<VariableRef, f64>>), Error> {
        let mut solver = numeric_solver(&self.options.solver)?;
        let mut results = SolverResults::new(self.name(), solver.name());
        let follower = single_follower(problem)?;
        prepare_follower(problem, follower)?;
        let big_m = big_m_or_default(self.options.big_m, DEFAULT_BIG_M);
        let delta = self.options.delta.unwrap_or_else(|| {
            warn!(delta = DEFAULT_DELTA, "no delta given, using the default");
            DEFAULT_DELTA
        });

        let mut relaxation = highpoint(problem);
        if self.probe(&mut *solver, &mut relaxation, InfeasibleProbe::Highpoint, &mut results)?.is_none() {
            return Ok((results, None));
        }

        let mut optimistic = pipeline::mpec(problem, "optimistic")?;
        complementarity::big_m(&mut optimistic.model, big_m);
        if self.probe(&mut *solver, &mut optimistic, InfeasibleProbe::Optimistic, &mut results)?.is_none() {
            return Ok((results, None));
        }

        let adversarial = match adversarial_rows(problem, follower, self.options.dual_bound) {
            Ok(adversarial) => adversarial,
            Err(constraint) => {
                warn!(constraint = %constraint, "adversarial problem has no dual vertex");
                results.infeasible_probe = Some(InfeasibleProbe::Adversarial { constraint });
                results.termination = TerminationCondition::Infeasible;
                return Ok((results, None));
            },
        };

        info!(rows = adversarial.len(), delta, "building extended problem");
        let mut extended = extended(problem, follower, &adversarial, delta, big_m)?;
        match self.probe(&mut *solver, &mut extended, InfeasibleProbe::Extended, &mut results)? {
            Some((objective, values)) => {
                results.best_feasible_objective = objective;
                Ok((results, Some(values)))
            },
            None => Ok((results, None)),
        }
    }
}

impl BilevelSolver for Norvep {
    fn name(&self) -> &str {
        "norvep"
    }

    fn solve(&mut self, model: &mut Model) -> Result<SolverResults, Error> {
        let start = Instant::now();
        let (mut extraction, negated) = pipeline::prepare(model, self.options.sort, true, self.name())?;
        let follower = single_follower(&extraction.problem)?;
        let equality = extraction.rows[follower.0].iter()
            .map(|origin| model.constraint(origin.constraint))
            .find(|constraint| constraint.relation.is_equality());
        if let Some(constraint) = equality {
            return Err(Error::UnsupportedStructure(format!(
                "driver norvep doesn't handle follower equality {}", constraint.name,
            )));
        }

        let (mut results, values) = self.solve_levels(&mut extraction.problem)?;
        if negated {
            results.best_feasible_objective = results.best_feasible_objective.map(|objective| -objective);
        }
        if let Some(values) = values {
            pipeline::finish(model, &extraction, &values, self.options.solve.load_solutions, &mut results);
        }

        results.time = start.elapsed();
        Ok(results)
    }
}
