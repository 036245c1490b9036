//! # Small bilevel problems with known optima
//!
//! Each function authors one problem and returns the model with the variables the tests look at.
use bilevel::data::elements::Sense;
use bilevel::data::model::{Model, VarId};
use bilevel::data::model::component::Domain;

/// # Solving with the drivers
#[allow(missing_docs)]
mod test;

/// Minimize `x` over `x >= 0`, without lower levels.
fn trivial() -> (Model, VarId) {
    let mut model = Model::new("trivial");
    let root = model.root();
    let x = model.add_variable(root, "x", Domain::Reals, (0_f64, f64::INFINITY));
    model.add_objective(root, "objective", Sense::Minimize, x);

    (model, x)
}

/// Bard's example 5.1.1, optimum `x = 4, y = 4` with objective `-12`.
fn bard() -> (Model, VarId, VarId) {
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

/// A leader maximizing against a follower that shares its rows with the leader.
///
/// The leader maximizes `x + y` with `x <= 2`, the follower maximizes `-y` subject to
/// `y >= 1 - x` and `y >= x - 1`. The follower answers `y = |x - 1|`, which is largest at `x = 2`.
fn maximizing() -> (Model, VarId, VarId) {
    let mut model = Model::new("maximizing");
    let root = model.root();
    let x = model.add_variable(root, "x", Domain::Reals, (0_f64, 2_f64));
    let lower = model.add_submodel(root, "lower", [x]);
    let y = model.add_variable(lower, "y", Domain::Reals, (0_f64, 10_f64));

    model.add_objective(root, "objective", Sense::Maximize, x + y);
    model.add_objective(lower, "objective", Sense::Maximize, -y);
    model.add_constraint(lower, "left", (y + x).geq(1_f64));
    model.add_constraint(lower, "right", (y - x).geq(-1_f64));

    (model, x, y)
}

/// Near-optimal robust example: under `delta = 1`, the robust optimum is `x = 13 / 9`,
/// `v = 19 / 9`.
fn robust() -> (Model, VarId, VarId) {
    let mut model = Model::new("robust");
    let root = model.root();
    let x = model.add_variable(root, "x", Domain::Reals, (0_f64, f64::INFINITY));
    let follower = model.add_submodel(root, "follower", [x]);
    let v = model.add_variable(follower, "v", Domain::Reals, (0_f64, f64::INFINITY));

    model.add_objective(root, "objective", Sense::Minimize, x - 10_f64 * v);
    model.add_constraint(root, "first", (-x + 4_f64 * v).leq(11_f64));
    model.add_constraint(root, "second", (x + 2_f64 * v).leq(13_f64));
    model.add_objective(follower, "objective", Sense::Minimize, v);
    model.add_constraint(follower, "third", (-2_f64 * x - v).leq(-5_f64));
    model.add_constraint(follower, "fourth", (5_f64 * x - 4_f64 * v).leq(30_f64));

    (model, x, v)
}
