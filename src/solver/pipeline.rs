//! Steps shared by the drivers.
use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::algorithm::extract::{extract, standardize_objectives, ExtractOptions, Extraction};
use crate::algorithm::introspect::SortOrder;
use crate::algorithm::recovery::write_back;
use crate::algorithm::reformulation::Reformulation;
use crate::algorithm::reformulation::kkt::add_kkt;
use crate::data::elements::Sense;
use crate::data::level::{MultilevelProblem, VariableRef};
use crate::data::model::Model;
use crate::error::Error;
use crate::solver::{NumericResults, NumericSolver, ProblemStatistics, SolveOptions, SolverResults};

/// Extract a bilevel model with every row as an inequality.
///
/// # Return value
///
/// The extraction, and whether the upper objective was negated to make it a minimization.
pub(crate) fn prepare(
    model: &Model,
    sort: SortOrder,
    standardize: bool,
    driver: &str,
) -> Result<(Extraction, bool), Error> {
    info!(driver, model = model.name(), "extracting levels");
    let options = ExtractOptions::default().with_inequalities(true).with_sort(sort);
    let mut extraction = extract(model, &options)?;
    check_bilevel(&extraction.problem, driver)?;

    let negated = standardize && extraction.problem.upper().sense == Sense::Maximize;
    if standardize {
        standardize_objectives(&mut extraction.problem);
    }

    Ok((extraction, negated))
}

/// Reject problems with more than two levels.
pub(crate) fn check_bilevel(problem: &MultilevelProblem, driver: &str) -> Result<(), Error> {
    if let Some(level) = problem.lower_levels().find(|&level| problem.depth(level) > 1) {
        return Err(Error::UnsupportedStructure(format!(
            "driver {driver} handles bilevel problems only, level {level} ({}) is nested deeper",
            problem.level(level).name,
        )));
    }

    Ok(())
}

/// The rows of all levels and the optimality conditions of the lower levels.
pub(crate) fn mpec(problem: &MultilevelProblem, name: &str) -> Result<Reformulation, Error> {
    let mut reformulation = Reformulation::new(problem, name);
    for (level, _) in problem.levels() {
        reformulation.add_rows(problem, level);
    }
    for level in problem.lower_levels() {
        add_kkt(&mut reformulation, problem, level)?;
    }

    Ok(reformulation)
}

/// Solve a reformulation and read the values of the level representation from it.
///
/// The values are always loaded into the reformulated model, which is internal to the driver.
pub(crate) fn solve(
    solver: &mut dyn NumericSolver,
    reformulation: &mut Reformulation,
    options: &SolveOptions,
    results: &mut SolverResults,
) -> Result<(NumericResults, Option<BTreeMap<VariableRef, f64>>), Error> {
    results.statistics = ProblemStatistics::of(&reformulation.model);
    info!(
        backend = solver.name(),
        variables = results.statistics.nr_variables(),
        constraints = results.statistics.constraints,
        "solving single-level problem",
    );

    let options = SolveOptions { load_solutions: true, ..options.clone() };
    let numeric = solver.solve(&mut reformulation.model, &options)?;
    results.termination = numeric.termination;
    debug!(termination = %numeric.termination, objective = ?numeric.objective, "numeric solve finished");

    let values = numeric.termination.has_solution().then(|| reformulation.values());
    Ok((numeric, values))
}

/// Write recovered values into the results and, if requested, into the authored model.
pub(crate) fn finish(
    model: &mut Model,
    extraction: &Extraction,
    values: &BTreeMap<VariableRef, f64>,
    load_solutions: bool,
    results: &mut SolverResults,
) {
    info!(variables = values.len(), "recovering solution");
    if load_solutions {
        results.values = write_back(model, &extraction.variables, values);
    } else {
        results.values = extraction.variables.iter()
            .filter_map(|(&id, variable)| values.get(variable).map(|&value| (id, value)))
            .collect();
    }
}
