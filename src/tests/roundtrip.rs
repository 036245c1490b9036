//! Standard form of a model with every kind of bound.
//!
//! Feasible points of the authored model map to feasible points of the standard form with the
//! same objective values, and recovering them gives the original values back.
use approx::assert_abs_diff_eq;

use crate::algorithm::extract::{extract, ExtractOptions};
use crate::algorithm::standard_form::standard_form;
use crate::data::elements::{RowSense, Sense};
use crate::data::level::{Kind, VariableRef};
use crate::data::model::{Model, VarId};
use crate::data::model::component::{Domain, Relation};

fn model() -> (Model, [VarId; 5]) {
    let mut model = Model::new("bounds");
    let root = model.root();
    let a = model.add_variable(root, "a", Domain::Reals, (2_f64, f64::INFINITY));
    let b = model.add_variable(root, "b", Domain::Reals, (f64::NEG_INFINITY, 3_f64));
    let c = model.add_variable(root, "c", Domain::Reals, (-1_f64, 1_f64));
    let d = model.add_variable(root, "d", Domain::Reals, (f64::NEG_INFINITY, f64::INFINITY));
    let lower = model.add_submodel(root, "lower", [a, c]);
    let y = model.add_variable(lower, "y", Domain::Reals, (0_f64, f64::INFINITY));

    model.add_objective(root, "objective", Sense::Minimize, a - b + 2_f64 * c + d + y);
    model.add_constraint(root, "sum", (a + b + c + d).leq(10_f64));
    model.add_constraint(root, "spread", Relation::range(-5_f64, d - a, 5_f64));
    model.add_objective(lower, "objective", Sense::Maximize, y);
    model.add_constraint(lower, "cap", (y - c).leq(4_f64));
    model.add_constraint(lower, "floor", (y + a).geq(2_f64));

    (model, [a, b, c, d, y])
}

#[test]
fn conversion_pipeline() {
    let (model, variables) = model();
    let extraction = extract(&model, &ExtractOptions::default().with_inequalities(true)).unwrap();
    let original = &extraction.problem;
    // the range is read as two rows
    assert_eq!(original.upper().nr_rows(), 3);

    let converted = standard_form(original).unwrap();
    assert!(converted.problem.levels().all(|(_, level)| level.row_sense == RowSense::Equal));
    assert!(converted.problem.variable_refs()
        .filter(|variable| variable.kind == Kind::Real)
        .all(|variable| converted.problem.bounds(variable) == (0_f64, f64::INFINITY)));

    let points = [
        [2_f64, 3_f64, -1_f64, 0_f64, 0_f64],
        [3_f64, -1_f64, 0.5, -2_f64, 4.5],
        [6_f64, 0_f64, 1_f64, 3_f64, 1_f64],
    ];
    for point in points {
        let values = variables.iter().zip(point)
            .map(|(id, value)| (extraction.variables[id], value))
            .collect::<std::collections::BTreeMap<_, _>>();
        let value = |variable: VariableRef| values[&variable];
        assert!(original.max_violation(value) < 1e-12);

        let image = converted.forward(value);
        let image_value = |variable: VariableRef| image[&variable];
        assert!(converted.problem.max_violation(image_value) < 1e-12);
        for (level, _) in original.levels() {
            assert_abs_diff_eq!(
                converted.problem.objective_value(level, image_value),
                original.objective_value(level, value),
                epsilon = 1e-12,
            );
        }

        let recovered = converted.recover(|variable| image.get(&variable).copied());
        for (variable, expected) in &values {
            assert_abs_diff_eq!(recovered[variable], *expected, epsilon = 1e-12);
        }
    }

    // applying the conversion again changes nothing
    assert_eq!(standard_form(&converted.problem).unwrap().problem, converted.problem);
}
