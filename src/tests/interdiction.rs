//! Interdiction with a product of a leader binary and a follower variable.
//!
//! The leader decides `u`, the follower maximizes `x + u` subject to `x = y u`. Blocking the
//! follower with `u = 0` forces `x = 0`, which gives the leader objective `x + u = 0`.
use crate::algorithm::extract::{extract, ExtractOptions};
use crate::algorithm::standard_form::standard_form;
use crate::data::elements::Sense;
use crate::data::level::{Kind, LevelId, VariableRef};
use crate::data::model::{Model, VarId};
use crate::data::model::component::Domain;

fn model() -> (Model, VarId, VarId, VarId) {
    let mut model = Model::new("barguel");
    let root = model.root();
    let u = model.add_variable(root, "u", Domain::Binary, (0_f64, 1_f64));
    let lower = model.add_submodel(root, "follower", [u]);
    let x = model.add_variable(lower, "x", Domain::Reals, (0_f64, 1_f64));
    let y = model.add_variable(lower, "y", Domain::Reals, (0_f64, 1_f64));

    model.add_objective(root, "objective", Sense::Minimize, x + u);
    model.add_objective(lower, "objective", Sense::Maximize, x + u);
    model.add_constraint(lower, "link", (x - y * u).equals(0_f64));

    (model, u, x, y)
}

#[test]
fn conversion_pipeline() {
    let (model, u, x, y) = model();

    let extraction = extract(&model, &ExtractOptions::default().with_inequalities(true)).unwrap();
    let problem = &extraction.problem;
    assert_eq!(extraction.variables[&u], VariableRef::new(LevelId::UPPER, Kind::Binary, 0));
    assert_eq!(extraction.variables[&x], VariableRef::new(LevelId(1), Kind::Real, 0));
    assert_eq!(extraction.variables[&y], VariableRef::new(LevelId(1), Kind::Real, 1));

    // The equality is read as two inequalities, both with the product
    let follower = problem.level(LevelId(1));
    assert_eq!(follower.nr_rows(), 2);
    assert_eq!(follower.bilinear.len(), 2);
    assert_eq!(follower.b, vec![0_f64, 0_f64]);

    // Ranges of x and y become rows of the follower, the binary is left alone
    let converted = standard_form(problem).unwrap();
    let follower = converted.problem.level(LevelId(1));
    assert_eq!(follower.nr_rows(), 2 + 2);
    assert_eq!(follower.bilinear.len(), 2);
    assert_eq!(converted.problem.upper().variables[Kind::Binary].bounds(0), (0_f64, 1_f64));
}

#[test]
fn products_need_linearization() {
    use crate::algorithm::reformulation::Reformulation;
    use crate::algorithm::reformulation::bilinear::linearize_bilinear_terms;
    use crate::algorithm::reformulation::complementarity;
    use crate::algorithm::reformulation::kkt::add_kkt;

    let (model, ..) = model();
    let extraction = extract(&model, &ExtractOptions::default().with_inequalities(true)).unwrap();
    let converted = standard_form(&extraction.problem).unwrap();
    let problem = &converted.problem;

    let mut reformulation = Reformulation::new(problem, "interdiction");
    reformulation.add_rows(problem, LevelId::UPPER);
    reformulation.add_rows(problem, LevelId(1));
    add_kkt(&mut reformulation, problem, LevelId(1)).unwrap();
    complementarity::big_m(&mut reformulation.model, 10_f64);
    let quadratic = |reformulation: &Reformulation| reformulation.model.active_constraints()
        .filter(|(_, constraint)| constraint.relation.body.is_quadratic())
        .count();
    assert!(quadratic(&reformulation) > 0);

    let replaced = linearize_bilinear_terms(&mut reformulation.model, 10_f64).unwrap();
    assert!(replaced > 0);
    assert_eq!(quadratic(&reformulation), 0);
}

#[cfg(feature = "microlp")]
#[test]
fn solve() {
    use approx::assert_abs_diff_eq;

    use crate::solver::{BilevelSolver, TerminationCondition};
    use crate::solver::fa::{Fa, FaOptions};

    let (mut model, u, x, _) = model();
    let options = FaOptions::default().with_big_m(10_f64).with_linearize_bilinear_terms(true);

    let results = Fa::new(options).solve(&mut model).unwrap();
    assert_eq!(results.termination, TerminationCondition::Optimal);
    assert_abs_diff_eq!(results.best_feasible_objective.unwrap(), 0_f64, epsilon = 1e-6);
    assert_eq!(model.value(u), Some(0_f64));
    assert_abs_diff_eq!(model.value(x).unwrap(), 0_f64, epsilon = 1e-6);
}
