//! Linear bilevel problem with a single leader variable.
//!
//! From Bard, Practical Bilevel Optimization, example 5.1.1. The optimum is `x = 4, y = 4` with
//! upper objective `-12`.
use crate::algorithm::extract::{extract, ExtractOptions};
use crate::algorithm::standard_form::standard_form;
use crate::data::elements::{RowSense, Sense};
use crate::data::level::{Kind, LevelId, VariableRef};
use crate::data::model::{Model, VarId};
use crate::data::model::component::Domain;

fn model() -> (Model, VarId, VarId) {
    let mut model = Model::new("bard");
    let root = model.root();
    let x = model.add_variable(root, "x", Domain::Reals, (0_f64, f64::INFINITY));
    let lower = model.add_submodel(root, "lower", [x]);
    let y = model.add_variable(lower, "y", Domain::Reals, (0_f64, f64::INFINITY));

    model.add_objective(root, "objective", Sense::Minimize, x - 4_f64 * y);
    model.add_objective(lower, "objective", Sense::Minimize, y);
    model.add_constraint(lower, "c1", (-x - y).leq(-3_f64));
    model.add_constraint(lower, "c2", (-2_f64 * x + y).leq(0_f64));
    model.add_constraint(lower, "c3", (2_f64 * x + y).leq(12_f64));
    model.add_constraint(lower, "c4", (3_f64 * x - 2_f64 * y).leq(4_f64));

    (model, x, y)
}

#[test]
fn conversion_pipeline() {
    let (model, x, y) = model();

    // Levels
    let extraction = extract(&model, &ExtractOptions::default().with_inequalities(true)).unwrap();
    let problem = &extraction.problem;
    let x_ref = VariableRef::new(LevelId::UPPER, Kind::Real, 0);
    let y_ref = VariableRef::new(LevelId(1), Kind::Real, 0);
    assert_eq!(extraction.variables[&x], x_ref);
    assert_eq!(extraction.variables[&y], y_ref);
    assert_eq!(problem.nr_levels(), 2);
    assert_eq!(problem.upper().nr_rows(), 0);
    assert_eq!(problem.upper().objective_terms(), vec![(x_ref, 1_f64), (y_ref, -4_f64)]);

    let lower = problem.level(LevelId(1));
    assert_eq!(lower.fixed, vec![x_ref]);
    assert_eq!(lower.row_sense, RowSense::Less);
    assert_eq!(lower.b, vec![-3_f64, 0_f64, 12_f64, 4_f64]);
    assert_eq!(lower.row(3), vec![(x_ref, 3_f64), (y_ref, -2_f64)]);
    assert!(problem.check().is_ok());

    // Standard form
    let converted = standard_form(problem).unwrap();
    let lower = converted.problem.level(LevelId(1));
    assert_eq!(lower.row_sense, RowSense::Equal);
    assert_eq!(lower.variables[Kind::Real].len(), 1 + 4);
    assert_eq!(converted.problem.upper().variables[Kind::Real].len(), 1);
    assert_eq!(converted.problem.upper().nr_rows(), 0);

    // The bilevel optimum is feasible in both
    let point = |_: VariableRef| 4_f64;
    assert_eq!(problem.max_violation(point), 0_f64);
    let image = converted.forward(point);
    assert!(converted.problem.max_violation(|variable| image[&variable]) < 1e-12);
}

#[cfg(feature = "microlp")]
#[test]
fn solve() {
    use approx::assert_abs_diff_eq;

    use crate::solver::{BilevelSolver, TerminationCondition};
    use crate::solver::fa::{Fa, FaOptions};

    let (mut model, x, y) = model();
    let mut fa = Fa::new(FaOptions::default().with_big_m(1e3));

    let results = fa.solve(&mut model).unwrap();
    assert_eq!(results.termination, TerminationCondition::Optimal);
    assert_eq!(results.backend, "microlp");
    assert!(results.statistics.variables[Kind::Binary] > 0);
    assert_abs_diff_eq!(results.best_feasible_objective.unwrap(), -12_f64, epsilon = 1e-6);
    assert_abs_diff_eq!(model.value(x).unwrap(), 4_f64, epsilon = 1e-6);
    assert_abs_diff_eq!(model.value(y).unwrap(), 4_f64, epsilon = 1e-6);
    assert_abs_diff_eq!(results.values[&x], 4_f64, epsilon = 1e-6);
}
