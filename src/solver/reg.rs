//! # Regularization driver
//!
//! Like the `fa` driver, but the complementarity conditions are relaxed to `a b <= rho` instead of
//! being split by binaries. The resulting problem has quadratic constraints and needs a nonlinear
//! back-end; as `rho` goes to zero, its solutions approach those of the complementarity problem.
use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

use tracing::info;

use crate::algorithm::introspect::SortOrder;
use crate::algorithm::recovery::store;
use crate::algorithm::reformulation::bilinear::linearize_bilinear_terms;
use crate::algorithm::reformulation::complementarity;
use crate::algorithm::reformulation::integer::{binary_as_constraint, integer_to_binary};
use crate::algorithm::standard_form::standard_form;
use crate::data::level::{MultilevelProblem, VariableRef};
use crate::data::model::Model;
use crate::data::model::component::Domain;
use crate::error::Error;
use crate::solver::fa::{big_m_or_default, DEFAULT_BIG_M};
use crate::solver::{numeric_solver, pipeline, BilevelSolver, NumericSolver, SolveOptions, SolverResults};

/// Default relaxation of the complementarity conditions.
pub const DEFAULT_RHO: f64 = 1e-7;

/// Options of the `Reg` driver.
#[derive(Clone, Debug, PartialEq)]
pub struct RegOptions {
    /// Name of the numeric solver, which should handle quadratic constraints.
    pub solver: String,
    /// Options passed to the numeric solver.
    pub solve: SolveOptions,
    /// Order in which model components are read.
    pub sort: SortOrder,
    /// Upper bound on the products of complementary sides.
    pub rho: f64,
    /// Bound on unbounded factors of linearized products.
    pub big_m: Option<f64>,
    /// Replace products of binaries and other variables by auxiliary variables.
    pub linearize_bilinear_terms: bool,
    /// Expand integers into binaries and write binaries as `x - x^2 <= 0`.
    pub binary_as_constraint: bool,
}

impl Default for RegOptions {
    fn default() -> Self {
        Self {
            solver: "ipopt".to_string(),
            solve: SolveOptions::default(),
            sort: SortOrder::default(),
            rho: DEFAULT_RHO,
            big_m: None,
            linearize_bilinear_terms: false,
            binary_as_constraint: false,
        }
    }
}

impl RegOptions {
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

    /// Set `rho`.
    #[must_use]
    pub fn with_rho(mut self, rho: f64) -> Self {
        self.rho = rho;
        self
    }

    /// Set `big_m`.
    #[must_use]
    pub fn with_big_m(mut self, big_m: f64) -> Self {
        self.big_m = Some(big_m);
        self
    }

    /// Set `linearize_bilinear_terms`.
    #[must_use]
    pub fn with_linearize_bilinear_terms(mut self, linearize: bool) -> Self {
        self.linearize_bilinear_terms = linearize;
        self
    }

    /// Set `binary_as_constraint`.
    #[must_use]
    pub fn with_binary_as_constraint(mut self, binary_as_constraint: bool) -> Self {
        self.binary_as_constraint = binary_as_constraint;
        self
    }
}

/// Driver based on optimality conditions with smoothed complementarity.
#[derive(Default)]
pub struct Reg {
    /// Options.
    pub options: RegOptions,
    numeric: Option<Box<dyn NumericSolver>>,
}

impl fmt::Debug for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reg")
            .field("options", &self.options)
            .field("numeric", &self.numeric.as_ref().map(|solver| solver.name()))
            .finish()
    }
}

impl Reg {
    /// Create a driver.
    #[must_use]
    pub fn new(options: RegOptions) -> Self {
        Self { options, numeric: None }
    }

    /// Use this numeric solver instead of looking one up by name.
    #[must_use]
    pub fn with_numeric_solver(mut self, solver: Box<dyn NumericSolver>) -> Self {
        self.numeric = Some(solver);
        self
    }

    fn solve_levels(
        &mut self,
        problem: &MultilevelProblem,
    ) -> Result<(SolverResults, Option<BTreeMap<VariableRef, f64>>), Error> {
        let start = Instant::now();
        let outcome = match self.numeric.take() {
            Some(mut solver) => {
                let outcome = self.solve_with(&mut *solver, problem);
                self.numeric = Some(solver);
                outcome
            },
            None => {
                let mut solver = numeric_solver(&self.options.solver)?;
                self.solve_with(&mut *solver, problem)
            },
        };

        let (mut results, values) = outcome?;
        results.time = start.elapsed();
        Ok((results, values))
    }

    fn solve_with(
        &self,
        solver: &mut dyn NumericSolver,
        problem: &MultilevelProblem,
    ) -> Result<(SolverResults, Option<BTreeMap<VariableRef, f64>>), Error> {
        let mut results = SolverResults::new(self.name(), solver.name());
        pipeline::check_bilevel(problem, self.name())?;

        info!("converting to standard form");
        let standard = standard_form(problem)?;
        info!(rho = self.options.rho, "adding smoothed optimality conditions");
        let mut reformulation = pipeline::mpec(&standard.problem, "reg")?;
        complementarity::smoothed(&mut reformulation.model, self.options.rho)?;

        if self.options.linearize_bilinear_terms {
            let big_m = big_m_or_default(self.options.big_m, DEFAULT_BIG_M);
            linearize_bilinear_terms(&mut reformulation.model, big_m)?;
        }
        if self.options.binary_as_constraint {
            let discrete = reformulation.model.variables()
                .filter(|(_, variable)| variable.domain != Domain::Reals)
                .map(|(id, _)| id)
                .collect::<Vec<_>>();
            let expanded = integer_to_binary(&mut reformulation.model, &discrete)?;
            let bits = expanded.into_iter().flat_map(|(_, bits)| bits);
            let binaries = discrete.iter().copied().chain(bits).collect::<Vec<_>>();
            binary_as_constraint(&mut reformulation.model, &binaries);
        }

        let (numeric, values) = pipeline::solve(solver, &mut reformulation, &self.options.solve, &mut results)?;
        results.best_feasible_objective = numeric.objective;
        let recovered = values.map(|values| standard.recover(|variable| values.get(&variable).copied()));

        Ok((results, recovered))
    }

    /// Solve a problem given in level representation directly.
    ///
    /// Recovered values are stored in the bundles of the problem.
    ///
    /// # Errors
    ///
    /// See `BilevelSolver::solve`.
    pub fn solve_problem(&mut self, problem: &mut MultilevelProblem) -> Result<SolverResults, Error> {
        let (results, values) = self.solve_levels(problem)?;
        if let Some(values) = values {
            store(problem, &values);
        }

        Ok(results)
    }
}

impl BilevelSolver for Reg {
    fn name(&self) -> &str {
        "reg"
    }

    fn solve(&mut self, model: &mut Model) -> Result<SolverResults, Error> {
        let (extraction, _) = pipeline::prepare(model, self.options.sort, false, self.name())?;
        let (mut results, values) = self.solve_levels(&extraction.problem)?;
        if let Some(values) = values {
            pipeline::finish(model, &extraction, &values, self.options.solve.load_solutions, &mut results);
        }

        Ok(results)
    }
}
