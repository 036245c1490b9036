//! # Complementarity expansions
//!
//! Numeric solvers don't accept `0 <= a ⊥ b >= 0` directly. These transformations replace every
//! active condition of a model by constraints and deactivate the condition.
use tracing::debug;

use crate::data::model::{BlockId, ComplementarityId, Model};
use crate::data::model::component::{Domain, Relation};
use crate::data::model::expression::Expression;
use crate::error::Error;

/// Whether `expression >= 0` already follows from a variable bound.
fn is_nonnegative(model: &Model, expression: &Expression) -> bool {
    let repn = model.standard_repn(expression);
    match (repn.linear_vars.as_slice(), repn.linear_coefs.as_slice()) {
        (&[variable], &[coefficient]) if repn.is_linear() && repn.constant >= 0_f64 => {
            let variable = model.variable(variable);
            (coefficient > 0_f64 && variable.lower >= 0_f64) || (coefficient < 0_f64 && variable.upper <= 0_f64)
        },
        _ => false,
    }
}

fn add_sign_constraints(model: &mut Model, block: BlockId, name: &str, left: &Expression, right: &Expression) {
    if !is_nonnegative(model, left) {
        model.add_constraint(block, &format!("left[{name}]"), left.clone().geq(0_f64));
    }
    if !is_nonnegative(model, right) {
        model.add_constraint(block, &format!("right[{name}]"), right.clone().geq(0_f64));
    }
}

fn active(model: &Model) -> Vec<ComplementarityId> {
    model.active_complementarities().map(|(id, _)| id).collect()
}

/// Replace every active complementarity condition by a disjunction modeled with a binary.
///
/// A condition `a ⊥ b` becomes `a >= 0`, `b >= 0`, `a <= M z` and `b <= M (1 - z)` for a new
/// binary `z`; this is exact when `M` bounds both sides at every solution of interest.
///
/// # Return value
///
/// The number of expanded conditions.
pub fn big_m(model: &mut Model, big_m: f64) -> usize {
    debug_assert!(big_m > 0_f64);

    let conditions = active(model);
    if conditions.is_empty() {
        return 0;
    }
    let root = model.root();
    let block = model.add_block(root, "big_m");

    for &id in &conditions {
        let condition = model.complementarity(id);
        let (name, left, right) = (condition.name.clone(), condition.left.clone(), condition.right.clone());

        add_sign_constraints(model, block, &name, &left, &right);
        let z = model.add_variable(block, &format!("z[{name}]"), Domain::Binary, (0_f64, 1_f64));
        model.add_constraint(block, &format!("left_bound[{name}]"), left.leq(big_m * z));
        model.add_constraint(block, &format!("right_bound[{name}]"), right.leq(big_m - big_m * z));
        model.deactivate_complementarity(id);
    }

    debug!(conditions = conditions.len(), big_m, "expanded complementarity with binaries");
    conditions.len()
}

/// Replace every active complementarity condition by `a >= 0`, `b >= 0` and `a b <= rho`.
///
/// # Return value
///
/// The number of expanded conditions.
///
/// # Errors
///
/// If a product `a b` has degree larger than two. The model is left unchanged in that case.
pub fn smoothed(model: &mut Model, rho: f64) -> Result<usize, Error> {
    debug_assert!(rho >= 0_f64);

    let conditions = active(model);
    let products = conditions.iter()
        .map(|&id| {
            let condition = model.complementarity(id);
            condition.left.product(&condition.right).ok_or_else(|| Error::UnsupportedStructure(format!(
                "complementarity condition {} is not bilinear", condition.name,
            )))
        })
        .collect::<Result<Vec<_>, _>>()?;
    if conditions.is_empty() {
        return Ok(0);
    }

    let root = model.root();
    let block = model.add_block(root, "smoothed");
    for (&id, product) in conditions.iter().zip(products) {
        let condition = model.complementarity(id);
        let (name, left, right) = (condition.name.clone(), condition.left.clone(), condition.right.clone());

        add_sign_constraints(model, block, &name, &left, &right);
        model.add_constraint(block, &format!("product[{name}]"), Relation::new(None, product, Some(rho)));
        model.deactivate_complementarity(id);
    }

    debug!(conditions = conditions.len(), rho, "expanded complementarity with a smoothed product");
    Ok(conditions.len())
}
