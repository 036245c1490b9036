//! # Linearization of bilinear terms
//!
//! A product `u w` of a binary `u` and a bounded variable `w` equals an auxiliary `p` satisfying
//!
//! ```text
//! -M u <= p <= M u
//! w - M (1 - u) <= p <= w + M (1 - u)
//! ```
//!
//! when `|w| <= M`. Products that arise from optimality conditions of lower levels with binary
//! parameters are of this form, and after the replacement the model is a mixed integer linear
//! program.
use std::collections::BTreeMap;

use tracing::debug;

use crate::data::model::{BlockId, Model, VarId};
use crate::data::model::component::{Domain, Relation};
use crate::data::model::expression::{Expression, StandardRepn};
use crate::error::Error;

struct Linearizer {
    block: Option<BlockId>,
    big_m: f64,
    auxiliaries: BTreeMap<(VarId, VarId), VarId>,
}

impl Linearizer {
    /// The auxiliary variable standing for `binary * other`.
    fn auxiliary(&mut self, model: &mut Model, binary: VarId, other: VarId) -> VarId {
        if let Some(&auxiliary) = self.auxiliaries.get(&(binary, other)) {
            return auxiliary;
        }

        let block = *self.block.get_or_insert_with(|| {
            let root = model.root();
            model.add_block(root, "bilinear")
        });
        let variable = model.variable(other);
        let big_m = if variable.is_bounded() {
            variable.lower.abs().max(variable.upper.abs())
        } else {
            self.big_m
        };
        let (lower, upper) = if variable.is_bounded() {
            (variable.lower.min(0_f64), variable.upper.max(0_f64))
        } else {
            (-big_m, big_m)
        };
        let name = format!("{}*{}", model.variable(binary).full_name(), variable.full_name());

        let p = model.add_variable(block, &format!("product[{name}]"), Domain::Reals, (lower, upper));
        model.add_constraint(block, &format!("binary_upper[{name}]"), p.leq(big_m * binary));
        model.add_constraint(block, &format!("binary_lower[{name}]"), p.geq(-big_m * binary));
        model.add_constraint(block, &format!("other_upper[{name}]"), p.leq(other + big_m - big_m * binary));
        model.add_constraint(block, &format!("other_lower[{name}]"), p.geq(other - big_m + big_m * binary));

        self.auxiliaries.insert((binary, other), p);
        p
    }

    /// Rewrite a merged expression without products.
    fn linearize(&mut self, model: &mut Model, repn: &StandardRepn, context: &str) -> Result<Expression, Error> {
        let mut expression = Expression::linear(repn.linear(), repn.constant);
        for (left, right, coefficient) in repn.quadratic() {
            let is_binary = |variable: VarId| model.variable(variable).domain == Domain::Binary;
            let (left_binary, right_binary) = (is_binary(left), is_binary(right));
            match (left_binary, right_binary) {
                // u * u == u
                (true, true) if left == right => expression.add_term(left, coefficient),
                (true, _) => {
                    let p = self.auxiliary(model, left, right);
                    expression.add_term(p, coefficient);
                },
                (false, true) => {
                    let p = self.auxiliary(model, right, left);
                    expression.add_term(p, coefficient);
                },
                (false, false) => return Err(Error::UnsupportedStructure(format!(
                    "{context} has a product of {} and {} without a binary factor",
                    model.variable(left).full_name(), model.variable(right).full_name(),
                ))),
            }
        }

        Ok(expression)
    }
}

/// Replace all products in active constraints and objectives by auxiliary variables.
///
/// Products involving fixed variables are folded into linear terms first.
///
/// # Arguments
///
/// * `big_m`: Bound on the absolute value of the non binary factors without finite bounds.
///
/// # Return value
///
/// The number of auxiliary variables created.
///
/// # Errors
///
/// If a product has no binary factor. Components rewritten before the offending one stay
/// rewritten.
pub fn linearize_bilinear_terms(model: &mut Model, big_m: f64) -> Result<usize, Error> {
    let mut linearizer = Linearizer { block: None, big_m, auxiliaries: BTreeMap::new() };

    let constraints = model.active_constraints()
        .filter(|(_, constraint)| constraint.relation.body.is_quadratic())
        .map(|(id, _)| id)
        .collect::<Vec<_>>();
    for id in constraints {
        let constraint = model.constraint(id);
        let (lower, upper) = (constraint.relation.lower, constraint.relation.upper);
        let context = format!("constraint {}", constraint.name);
        let repn = model.standard_repn(&constraint.relation.body);

        let body = linearizer.linearize(model, &repn, &context)?;
        model.set_relation(id, Relation::new(lower, body, upper));
    }

    let objectives = model.active_objectives()
        .filter(|(_, objective)| objective.expression.is_quadratic())
        .map(|(id, _)| id)
        .collect::<Vec<_>>();
    for id in objectives {
        let objective = model.objective(id);
        let context = format!("objective {}", objective.name);
        let repn = model.standard_repn(&objective.expression);

        let expression = linearizer.linearize(model, &repn, &context)?;
        model.set_objective_expression(id, expression);
    }

    debug!(auxiliaries = linearizer.auxiliaries.len(), "linearized bilinear terms");
    Ok(linearizer.auxiliaries.len())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::data::elements::Sense;

    #[test]
    fn binary_times_bounded() {
        let mut model = Model::new("m");
        let root = model.root();
        let u = model.add_variable(root, "u", Domain::Binary, (0_f64, 1_f64));
        let w = model.add_variable(root, "w", Domain::Reals, (-2_f64, 3_f64));
        let v = model.add_variable(root, "v", Domain::Reals, (0_f64, f64::INFINITY));
        let c = model.add_constraint(root, "c", (w - u * w).leq(1_f64));
        model.add_objective(root, "o", Sense::Minimize, 2_f64 * (w * u) + v * u + u * u);

        assert_eq!(linearize_bilinear_terms(&mut model, 100_f64).unwrap(), 2);
        assert!(model.active_constraints().all(|(_, c)| !c.relation.body.is_quadratic()));

        let product = model.variables()
            .find(|(_, variable)| variable.name == "product[u*w]")
            .map(|(id, variable)| (id, variable.lower, variable.upper))
            .unwrap();
        assert_eq!((product.1, product.2), (-2_f64, 3_f64));
        let repn = model.standard_repn(&model.constraint(c).relation.body);
        assert_eq!(repn.linear().collect::<Vec<_>>(), vec![(w, 1_f64), (product.0, -1_f64)]);

        let (_, objective) = model.active_objectives().next().unwrap();
        let repn = model.standard_repn(&objective.expression);
        assert!(repn.is_linear());
        assert_eq!(repn.linear_coefs.len(), 3);
        assert!(repn.linear().any(|(variable, coefficient)| variable == u && coefficient == 1_f64));
        assert_eq!(model.variables().filter(|(_, variable)| variable.name.starts_with("product")).count(), 2);
    }

    #[test]
    fn without_binary() {
        let mut model = Model::new("m");
        let root = model.root();
        let x = model.add_variable(root, "x", Domain::Reals, (0_f64, 1_f64));
        let y = model.add_variable(root, "y", Domain::Integers, (0_f64, 1_f64));
        model.add_constraint(root, "c", (x * y).leq(1_f64));

        assert!(matches!(linearize_bilinear_terms(&mut model, 10_f64), Err(Error::UnsupportedStructure(_))));

        model.fix(y, 1_f64);
        assert_eq!(linearize_bilinear_terms(&mut model, 10_f64).unwrap(), 0);
    }
}
