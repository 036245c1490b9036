//! # Big-M reformulation driver
//!
//! Solves linear bilevel problems with continuous lower levels by replacing every lower level by
//! its optimality conditions and modeling the complementarity conditions with binaries. The
//! result is a mixed integer linear program when the upper level is linear in the duals, which
//! is the case when products only involve binary upper level variables and
//! `linearize_bilinear_terms` is set.
use std::collections::BTreeMap;
use std::time::Instant;

use tracing::{info, warn};

use crate::algorithm::introspect::SortOrder;
use crate::algorithm::recovery::store;
use crate::algorithm::reformulation::bilinear::linearize_bilinear_terms;
use crate::algorithm::reformulation::complementarity;
use crate::algorithm::standard_form::standard_form;
use crate::data::level::{MultilevelProblem, VariableRef};
use crate::data::model::Model;
use crate::error::Error;
use crate::solver::{numeric_solver, pipeline, BilevelSolver, SolveOptions, SolverResults};

/// Used when no `big_m` is given.
pub const DEFAULT_BIG_M: f64 = 1e5;

/// Options of the `Fa` driver.
#[derive(Clone, Debug, PartialEq)]
pub struct FaOptions {
    /// Name of the numeric solver.
    pub solver: String,
    /// Options passed to the numeric solver.
    pub solve: SolveOptions,
    /// Order in which model components are read.
    pub sort: SortOrder,
    /// Bound on the complementarity sides and on unbounded factors of products.
    pub big_m: Option<f64>,
    /// Replace products of binaries and other variables by auxiliary variables.
    pub linearize_bilinear_terms: bool,
}

impl Default for FaOptions {
    fn default() -> Self {
        Self {
            solver: "microlp".to_string(),
            solve: SolveOptions::default(),
            sort: SortOrder::default(),
            big_m: None,
            linearize_bilinear_terms: false,
        }
    }
}

impl FaOptions {
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

    /// Set `linearize_bilinear_terms`.
    #[must_use]
    pub fn with_linearize_bilinear_terms(mut self, linearize: bool) -> Self {
        self.linearize_bilinear_terms = linearize;
        self
    }
}

pub(crate) fn big_m_or_default(big_m: Option<f64>, default: f64) -> f64 {
    big_m.unwrap_or_else(|| {
        warn!(big_m = default, "no big_m given, using the default");
        default
    })
}

/// Driver based on optimality conditions and a big-M disjunction.
#[derive(Clone, Debug, Default)]
pub struct Fa {
    /// Options.
    pub options: FaOptions,
}

impl Fa {
    /// Create a driver.
    #[must_use]
    pub fn new(options: FaOptions) -> Self {
        Self { options }
    }

    fn solve_levels(
        &self,
        problem: &MultilevelProblem,
    ) -> Result<(SolverResults, Option<BTreeMap<VariableRef, f64>>), Error> {
        let start = Instant::now();
        let mut solver = numeric_solver(&self.options.solver)?;
        let mut results = SolverResults::new(self.name(), solver.name());
        pipeline::check_bilevel(problem, self.name())?;

        info!("converting to standard form");
        let standard = standard_form(problem)?;
        info!("adding optimality conditions");
        let mut reformulation = pipeline::mpec(&standard.problem, "fa")?;

        let big_m = big_m_or_default(self.options.big_m, DEFAULT_BIG_M);
        complementarity::big_m(&mut reformulation.model, big_m);
        if self.options.linearize_bilinear_terms {
            linearize_bilinear_terms(&mut reformulation.model, big_m)?;
        }

        let (numeric, values) = pipeline::solve(&mut *solver, &mut reformulation, &self.options.solve, &mut results)?;
        results.best_feasible_objective = numeric.objective;
        let recovered = values.map(|values| standard.recover(|variable| values.get(&variable).copied()));

        results.time = start.elapsed();
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

impl BilevelSolver for Fa {
    fn name(&self) -> &str {
        "fa"
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
