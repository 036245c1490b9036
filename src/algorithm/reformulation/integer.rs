//! # Integer and binary domains as constraints
//!
//! Some back-ends only handle binary variables, others no discrete variables at all. An integer
//! variable with finite bounds can be written as a weighted sum of binaries, and a binary
//! variable as a continuous variable in `[0, 1]` satisfying `x - x^2 <= 0`.
use tracing::debug;

use crate::data::model::{BlockId, Model, VarId};
use crate::data::model::component::{Domain, Relation};
use crate::data::model::expression::Expression;
use crate::error::Error;

/// Number of binaries used to write an integer in `[lower, upper]`.
///
/// The expansion has weights `1, 2, 4, ...`; when `lower` is negative the last weight is negated.
#[must_use]
pub fn nr_bits(lower: f64, upper: f64) -> usize {
    let largest = lower.abs().max(upper.abs());
    ((largest + 1_f64).log2() + 1_f64).ceil() as usize
}

/// Weights of the binaries in the expansion of an integer in `[lower, upper]`.
#[must_use]
pub fn weights(lower: f64, upper: f64) -> Vec<f64> {
    let n = nr_bits(lower, upper);
    let mut weights = (0..n).map(|k| 2_f64.powi(k as i32)).collect::<Vec<_>>();
    if lower < 0_f64 {
        if let Some(last) = weights.last_mut() {
            *last = -*last;
        }
    }

    weights
}

/// Replace integer variables by binary expansions.
///
/// Each variable keeps its bounds but becomes continuous; it is tied to its expansion with an
/// equality. Variables that are not integer are skipped.
///
/// # Return value
///
/// The binaries of each expanded variable.
///
/// # Errors
///
/// If one of the variables has an infinite bound.
pub fn integer_to_binary(model: &mut Model, variables: &[VarId]) -> Result<Vec<(VarId, Vec<VarId>)>, Error> {
    let integers = variables.iter()
        .copied()
        .filter(|&id| model.variable(id).domain == Domain::Integers)
        .collect::<Vec<_>>();
    if let Some(&id) = integers.iter().find(|&&id| !model.variable(id).is_bounded()) {
        return Err(Error::UnsupportedStructure(format!(
            "integer variable {} has an infinite bound and can't be expanded into binaries",
            model.variable(id).full_name(),
        )));
    }

    let mut block = None::<BlockId>;
    let mut expansions = Vec::with_capacity(integers.len());
    for id in integers {
        let block = *block.get_or_insert_with(|| {
            let root = model.root();
            model.add_block(root, "binary_expansion")
        });
        let variable = model.variable(id);
        let name = variable.full_name();
        let weights = weights(variable.lower, variable.upper);

        let bits = model.add_indexed_variable(block, &format!("bits[{name}]"), weights.len(), Domain::Binary, (0_f64, 1_f64));
        let expansion = Expression::linear(bits.iter().copied().zip(weights), 0_f64);
        model.add_constraint(block, &format!("expansion[{name}]"), id.equals(expansion));
        model.set_domain(id, Domain::Reals);

        expansions.push((id, bits));
    }

    debug!(variables = expansions.len(), "expanded integer variables into binaries");
    Ok(expansions)
}

/// Make binary variables continuous in `[0, 1]` and add `x - x^2 <= 0` for each.
///
/// Variables that are not binary are skipped.
///
/// # Return value
///
/// The number of variables changed.
pub fn binary_as_constraint(model: &mut Model, variables: &[VarId]) -> usize {
    let binaries = variables.iter()
        .copied()
        .filter(|&id| model.variable(id).domain == Domain::Binary)
        .collect::<Vec<_>>();
    if binaries.is_empty() {
        return 0;
    }

    let root = model.root();
    let block = model.add_block(root, "binary_constraints");
    for &id in &binaries {
        let name = model.variable(id).full_name();
        let lower = model.variable(id).lower.max(0_f64);
        let upper = model.variable(id).upper.min(1_f64);
        model.set_domain(id, Domain::Reals);
        model.set_bounds(id, lower, upper);
        model.add_constraint(block, &format!("binary[{name}]"), Relation::new(None, id - id * id, Some(0_f64)));
    }

    debug!(variables = binaries.len(), "replaced binary domains by constraints");
    binaries.len()
}
