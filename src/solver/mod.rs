//! # Solvers
//!
//! Numeric solvers take a single-level `Model` and write solution values into it. Bilevel solvers
//! (the drivers) transform an authored multilevel model into such a single-level model, call a
//! numeric solver on it and map the solution back.
//!
//! Infeasibility and other non-optimal outcomes are not errors; they are reported through the
//! termination condition of the results.
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use enum_map::EnumMap;

use crate::data::level::Kind;
use crate::data::model::{Model, VarId};
use crate::data::model::component::Domain;
use crate::error::{Error, SolverError};

pub mod fa;
#[cfg(feature = "microlp")]
pub mod microlp;
pub mod norvep;
pub mod reg;

mod pipeline;

/// How a numeric solve ended.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum TerminationCondition {
    /// Proven optimal.
    Optimal,
    /// Optimal with respect to a neighborhood, typical for nonlinear solvers.
    LocallyOptimal,
    /// Proven globally optimal by a nonconvex solver.
    GloballyOptimal,
    /// A feasible point was found, optimality is not proven.
    Feasible,
    /// No feasible point exists.
    Infeasible,
    /// The objective is unbounded.
    Unbounded,
    /// Stopped by the time limit.
    MaxTimeLimit,
    /// Stopped by an iteration limit.
    MaxIterations,
    /// Anything else.
    Other,
}

impl TerminationCondition {
    /// Whether the solve ended in an optimum of some kind.
    #[must_use]
    pub fn is_optimal(self) -> bool {
        matches!(self, Self::Optimal | Self::LocallyOptimal | Self::GloballyOptimal)
    }

    /// Whether the solver produced a point to load.
    #[must_use]
    pub fn has_solution(self) -> bool {
        self.is_optimal() || self == Self::Feasible
    }
}

impl fmt::Display for TerminationCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Optimal => "optimal",
            Self::LocallyOptimal => "locallyOptimal",
            Self::GloballyOptimal => "globallyOptimal",
            Self::Feasible => "feasible",
            Self::Infeasible => "infeasible",
            Self::Unbounded => "unbounded",
            Self::MaxTimeLimit => "maxTimeLimit",
            Self::MaxIterations => "maxIterations",
            Self::Other => "other",
        })
    }
}

/// Options passed to a numeric solver.
#[derive(Clone, Debug, PartialEq)]
pub struct SolveOptions {
    /// Pass the solver log through.
    pub tee: bool,
    /// Wall clock limit in seconds.
    pub time_limit: Option<f64>,
    /// Relative optimality gap at which a MIP solver may stop.
    pub mip_gap: Option<f64>,
    /// Write the solution values into the model.
    pub load_solutions: bool,
    /// Back-end specific options.
    pub extra: BTreeMap<String, String>,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            tee: false,
            time_limit: None,
            mip_gap: None,
            load_solutions: true,
            extra: BTreeMap::new(),
        }
    }
}

/// Outcome of a numeric solve.
#[derive(Clone, Debug, PartialEq)]
pub struct NumericResults {
    /// How the solve ended.
    pub termination: TerminationCondition,
    /// Objective value of the returned point, including the constant.
    pub objective: Option<f64>,
    /// Wall clock time.
    pub time: Duration,
}

/// A solver for single-level models.
pub trait NumericSolver {
    /// Name under which the solver is registered.
    fn name(&self) -> &str;

    /// Solve the active part of a model.
    ///
    /// With `load_solutions`, the values of a solution are stored in the model's variables.
    ///
    /// # Errors
    ///
    /// If the model has components the solver can't represent or the solver fails internally.
    fn solve(&mut self, model: &mut Model, options: &SolveOptions) -> Result<NumericResults, Error>;
}

/// Look up a numeric solver by name.
///
/// # Errors
///
/// If no solver is registered under this name, or the feature providing it is disabled.
pub fn numeric_solver(name: &str) -> Result<Box<dyn NumericSolver>, SolverError> {
    match name {
        #[cfg(feature = "microlp")]
        "microlp" => Ok(Box::new(microlp::MicroLp::new())),
        _ => Err(SolverError::Unavailable(name.to_string())),
    }
}

/// Probe of the near-optimal robust driver that turned out infeasible.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum InfeasibleProbe {
    /// The highpoint relaxation.
    Highpoint,
    /// The optimistic bilevel problem.
    Optimistic,
    /// The dual problem of an upper level constraint has no vertex.
    Adversarial {
        /// Name of the constraint.
        constraint: String,
    },
    /// The extended single-level problem.
    Extended,
}

/// Size of a model, as handed to a numeric solver.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProblemStatistics {
    /// Number of variables in active blocks, by kind.
    pub variables: EnumMap<Kind, usize>,
    /// Number of active constraints.
    pub constraints: usize,
    /// Number of active objectives.
    pub objectives: usize,
    /// Number of finite lower bounds.
    pub lower_bounds: usize,
    /// Number of finite upper bounds.
    pub upper_bounds: usize,
}

impl ProblemStatistics {
    /// Count the active components of a model.
    #[must_use]
    pub fn of(model: &Model) -> Self {
        let mut statistics = Self {
            constraints: model.active_constraints().count(),
            objectives: model.active_objectives().count(),
            ..Self::default()
        };
        for (_, variable) in model.variables().filter(|(_, variable)| model.is_active(variable.block)) {
            let kind = match variable.domain {
                Domain::Reals => Kind::Real,
                Domain::Integers => Kind::Integer,
                Domain::Binary => Kind::Binary,
            };
            statistics.variables[kind] += 1;
            statistics.lower_bounds += usize::from(variable.lower.is_finite());
            statistics.upper_bounds += usize::from(variable.upper.is_finite());
        }

        statistics
    }

    /// Total number of variables.
    #[must_use]
    pub fn nr_variables(&self) -> usize {
        self.variables.values().sum()
    }
}

/// Outcome of a bilevel solve.
#[derive(Clone, Debug, PartialEq)]
pub struct SolverResults {
    /// Name of the driver.
    pub solver: String,
    /// Name of the numeric solver used.
    pub backend: String,
    /// How the final numeric solve ended.
    pub termination: TerminationCondition,
    /// Total wall clock time.
    pub time: Duration,
    /// Upper objective value of the returned point, in the direction of the authored objective.
    pub best_feasible_objective: Option<f64>,
    /// Size of the single-level problem that was solved last.
    pub statistics: ProblemStatistics,
    /// Which probe failed, if the driver stopped early.
    pub infeasible_probe: Option<InfeasibleProbe>,
    /// Recovered values of the authored variables.
    pub values: BTreeMap<VarId, f64>,
}

impl SolverResults {
    pub(crate) fn new(solver: &str, backend: &str) -> Self {
        Self {
            solver: solver.to_string(),
            backend: backend.to_string(),
            termination: TerminationCondition::Other,
            time: Duration::ZERO,
            best_feasible_objective: None,
            statistics: ProblemStatistics::default(),
            infeasible_probe: None,
            values: BTreeMap::new(),
        }
    }

    /// Write the recovered values into a model.
    ///
    /// Drivers already do this when `load_solutions` is set; this is for copies of the model.
    pub fn copy_into(&self, model: &mut Model) {
        for (&variable, &value) in &self.values {
            model.set_value(variable, value);
        }
    }
}

/// A solver for authored multilevel models.
pub trait BilevelSolver {
    /// Name of the driver.
    fn name(&self) -> &str;

    /// Solve a model.
    ///
    /// # Errors
    ///
    /// If the model has a structure the driver doesn't support or the numeric solver can't be
    /// used. Infeasibility is reported through the results.
    fn solve(&mut self, model: &mut Model) -> Result<SolverResults, Error>;
}

/// Create a driver with default options.
///
/// # Arguments
///
/// * `name`: One of `"fa"`, `"reg"` and `"norvep"`.
///
/// # Errors
///
/// If no driver has this name.
pub fn bilevel_solver(name: &str) -> Result<Box<dyn BilevelSolver>, Error> {
    match name {
        "fa" => Ok(Box::new(fa::Fa::default())),
        "reg" => Ok(Box::new(reg::Reg::default())),
        "norvep" => Ok(Box::new(norvep::Norvep::default())),
        _ => Err(Error::Solver(SolverError::Unavailable(name.to_string()))),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn registries() {
        assert!(bilevel_solver("fa").is_ok());
        assert_eq!(bilevel_solver("norvep").unwrap().name(), "norvep");
        assert!(matches!(bilevel_solver("ccg"), Err(Error::Solver(SolverError::Unavailable(_)))));
        assert!(numeric_solver("gurobi").is_err());
        #[cfg(feature = "microlp")]
        assert_eq!(numeric_solver("microlp").unwrap().name(), "microlp");
    }

    #[test]
    fn statistics() {
        let mut model = Model::new("m");
        let root = model.root();
        let x = model.add_variable(root, "x", Domain::Reals, (0_f64, f64::INFINITY));
        model.add_variable(root, "z", Domain::Binary, (0_f64, 1_f64));
        let inactive = model.add_block(root, "inactive");
        model.add_variable(inactive, "y", Domain::Integers, (0_f64, 3_f64));
        model.deactivate_block(inactive);
        model.add_constraint(root, "c", x.leq(2_f64));

        let statistics = ProblemStatistics::of(&model);
        assert_eq!(statistics.nr_variables(), 2);
        assert_eq!(statistics.variables[Kind::Binary], 1);
        assert_eq!((statistics.lower_bounds, statistics.upper_bounds), (2, 1));
        assert_eq!(statistics.constraints, 1);

        let mut results = SolverResults::new("fa", "microlp");
        results.values.insert(x, 1.5);
        results.copy_into(&mut model);
        assert_eq!(model.value(x), Some(1.5));
    }

    #[test]
    fn termination() {
        assert!(TerminationCondition::LocallyOptimal.is_optimal());
        assert!(TerminationCondition::Feasible.has_solution());
        assert!(!TerminationCondition::MaxTimeLimit.has_solution());
        assert_eq!(TerminationCondition::MaxTimeLimit.to_string(), "maxTimeLimit");
    }
}
