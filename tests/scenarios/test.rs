use approx::assert_abs_diff_eq;

use bilevel::Error;
use bilevel::SolverError;
use bilevel::solver::{bilevel_solver, BilevelSolver, InfeasibleProbe, SolveOptions, TerminationCondition};
use bilevel::solver::fa::{Fa, FaOptions};
use bilevel::solver::norvep::{Norvep, NorvepOptions};

use super::{bard, maximizing, robust, trivial};

#[test]
fn trivial_with_default_driver() {
    let (mut model, x) = trivial();
    let mut solver = bilevel_solver("fa").unwrap();

    let results = solver.solve(&mut model).unwrap();
    assert_eq!(results.solver, "fa");
    assert_eq!(results.termination, TerminationCondition::Optimal);
    assert_abs_diff_eq!(results.best_feasible_objective.unwrap(), 0_f64);
    assert_abs_diff_eq!(model.value(x).unwrap(), 0_f64);
}

#[test]
fn bard_fa() {
    let (mut model, x, y) = bard();
    let mut fa = Fa::new(FaOptions::default().with_big_m(1e3));

    let results = fa.solve(&mut model).unwrap();
    assert!(results.termination.is_optimal());
    assert_abs_diff_eq!(results.best_feasible_objective.unwrap(), -12_f64, epsilon = 1e-6);
    assert_abs_diff_eq!(model.value(x).unwrap(), 4_f64, epsilon = 1e-6);
    assert_abs_diff_eq!(model.value(y).unwrap(), 4_f64, epsilon = 1e-6);
}

#[test]
fn bard_without_loading() {
    let (mut model, x, y) = bard();
    let solve = SolveOptions { load_solutions: false, ..SolveOptions::default() };
    let mut fa = Fa::new(FaOptions::default().with_big_m(1e3).with_solve_options(solve));

    let results = fa.solve(&mut model).unwrap();
    assert_eq!(model.value(x), None);
    assert_abs_diff_eq!(results.values[&y], 4_f64, epsilon = 1e-6);

    results.copy_into(&mut model);
    assert_abs_diff_eq!(model.value(x).unwrap(), 4_f64, epsilon = 1e-6);
}

#[test]
fn maximizing_leader() {
    let (mut model, x, y) = maximizing();
    let mut fa = Fa::new(FaOptions::default().with_big_m(100_f64));

    let results = fa.solve(&mut model).unwrap();
    assert_eq!(results.termination, TerminationCondition::Optimal);
    assert_abs_diff_eq!(results.best_feasible_objective.unwrap(), 3_f64, epsilon = 1e-6);
    assert_abs_diff_eq!(model.value(x).unwrap(), 2_f64, epsilon = 1e-6);
    assert_abs_diff_eq!(model.value(y).unwrap(), 1_f64, epsilon = 1e-6);
}

#[test]
fn robust_norvep() {
    let (mut model, x, v) = robust();
    let mut norvep = Norvep::new(NorvepOptions::default().with_big_m(100_f64).with_delta(1_f64));

    let results = norvep.solve(&mut model).unwrap();
    assert_eq!(results.solver, "norvep");
    assert_eq!(results.termination, TerminationCondition::Optimal);
    assert_eq!(results.infeasible_probe, None);
    assert_abs_diff_eq!(model.value(x).unwrap(), 13_f64 / 9_f64, epsilon = 1e-3);
    assert_abs_diff_eq!(model.value(v).unwrap(), 19_f64 / 9_f64, epsilon = 1e-3);
    assert_abs_diff_eq!(results.best_feasible_objective.unwrap(), -177_f64 / 9_f64, epsilon = 1e-3);
}

#[test]
fn robust_is_more_cautious_than_optimistic() {
    let (mut optimistic, ..) = robust();
    let optimistic = Fa::new(FaOptions::default().with_big_m(100_f64)).solve(&mut optimistic).unwrap();
    let (mut model, ..) = robust();
    let cautious = Norvep::new(NorvepOptions::default().with_big_m(100_f64).with_delta(1_f64))
        .solve(&mut model)
        .unwrap();

    assert_abs_diff_eq!(optimistic.best_feasible_objective.unwrap(), -29_f64, epsilon = 1e-6);
    assert!(cautious.best_feasible_objective.unwrap() > optimistic.best_feasible_objective.unwrap());
}

#[test]
fn infeasible_leader() {
    let (mut model, x, _) = robust();
    let root = model.root();
    model.add_constraint(root, "far", x.geq(20_f64));
    let mut norvep = Norvep::new(NorvepOptions::default().with_big_m(100_f64).with_delta(1_f64));

    let results = norvep.solve(&mut model).unwrap();
    assert_eq!(results.termination, TerminationCondition::Infeasible);
    assert_eq!(results.infeasible_probe, Some(InfeasibleProbe::Highpoint));
    assert!(results.values.is_empty());
    assert_eq!(model.value(x), None);
}

#[test]
fn unknown_back_end() {
    let (mut model, ..) = bard();
    let mut fa = Fa::new(FaOptions::default().with_solver("gurobi"));

    assert!(matches!(
        fa.solve(&mut model),
        Err(Error::Solver(SolverError::Unavailable(name))) if name == "gurobi",
    ));
}
