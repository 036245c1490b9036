//! # Single-level reformulations
//!
//! A `Reformulation` is a single-level `Model` built from a `MultilevelProblem`: every variable of
//! every level becomes a model variable and the upper objective becomes the model objective. The
//! transformations in the submodules add the rows of the levels, the optimality conditions or
//! duals of lower levels, and rewrite the resulting complementarity conditions and products into
//! forms that numeric solvers accept.
use std::collections::BTreeMap;

use tracing::debug;

use crate::data::elements::RowSense;
use crate::data::level::{Kind, LevelId, MultilevelProblem, VariableRef};
use crate::data::model::{BlockId, Model, ObjectiveId, VarId};
use crate::data::model::component::{Domain, Relation};
use crate::data::model::expression::Expression;

pub mod bilinear;
pub mod complementarity;
pub mod dual;
pub mod highpoint;
pub mod integer;
pub mod kkt;

/// A single-level model together with the columns of the level representation it was built from.
#[derive(Clone, Debug)]
pub struct Reformulation {
    /// The generated model.
    pub model: Model,
    /// Model variable of every variable of the level representation.
    pub columns: BTreeMap<VariableRef, VarId>,
    /// Block holding the variables and rows of each level.
    pub level_blocks: Vec<BlockId>,
    /// The objective of the model.
    pub objective: ObjectiveId,
}

impl Reformulation {
    /// Create a model with all variables of the problem and the upper objective.
    ///
    /// No rows are added.
    #[must_use]
    pub fn new(problem: &MultilevelProblem, name: &str) -> Self {
        let mut model = Model::new(name);
        let root = model.root();

        let mut columns = BTreeMap::new();
        let mut level_blocks = Vec::with_capacity(problem.nr_levels());
        for (id, level) in problem.levels() {
            let block = model.add_block(root, &id.to_string());
            level_blocks.push(block);

            for kind in Kind::ALL {
                let bundle = &level.variables[kind];
                let domain = match kind {
                    Kind::Real => Domain::Reals,
                    Kind::Integer => Domain::Integers,
                    Kind::Binary => Domain::Binary,
                };
                for index in 0..bundle.len() {
                    let variable = model.add_variable(block, &bundle.names[index], domain, bundle.bounds(index));
                    columns.insert(VariableRef::new(id, kind, index), variable);
                }
            }
        }

        let mut reformulation = Self {
            model,
            columns,
            level_blocks,
            objective: ObjectiveId(0),
        };
        let expression = reformulation.objective_expression(problem, LevelId::UPPER);
        reformulation.objective = reformulation.model.add_objective(
            root, "objective", problem.upper().sense, expression,
        );

        reformulation
    }

    /// Model variable of a variable of the level representation.
    #[must_use]
    pub fn variable(&self, variable: VariableRef) -> VarId {
        self.columns[&variable]
    }

    /// `constant + sum coefficient * variable` in model variables.
    #[must_use]
    pub fn linear_expression(&self, terms: &[(VariableRef, f64)], constant: f64) -> Expression {
        Expression::linear(terms.iter().map(|&(variable, coefficient)| (self.variable(variable), coefficient)), constant)
    }

    /// Objective of a level in model variables.
    #[must_use]
    pub fn objective_expression(&self, problem: &MultilevelProblem, level: LevelId) -> Expression {
        let level = problem.level(level);
        let mut expression = self.linear_expression(&level.objective_terms(), level.d);
        for term in &level.objective_bilinear {
            expression.add_product(self.variable(term.left), self.variable(term.right), term.coefficient);
        }

        expression
    }

    /// Left hand side of a row in model variables.
    #[must_use]
    pub fn row_expression(&self, problem: &MultilevelProblem, level: LevelId, row: usize) -> Expression {
        let data = problem.level(level);
        let mut expression = self.linear_expression(&data.row(row), 0_f64);
        for term in data.row_bilinear(row) {
            expression.add_product(self.variable(term.left), self.variable(term.right), term.coefficient);
        }

        expression
    }

    /// Add the rows of a level as constraints in the level's block.
    pub fn add_rows(&mut self, problem: &MultilevelProblem, level: LevelId) {
        let block = self.level_blocks[level.0];
        let data = problem.level(level);
        for row in 0..data.nr_rows() {
            let body = self.row_expression(problem, level, row);
            let relation = match data.row_sense {
                RowSense::Less => Relation::new(None, body, Some(data.b[row])),
                RowSense::Equal => Relation::new(Some(data.b[row]), body, Some(data.b[row])),
            };
            self.model.add_constraint(block, &data.row_names[row], relation);
        }

        debug!(level = %level, rows = data.nr_rows(), "added rows");
    }

    /// Values of the level representation variables, as stored in the model.
    #[must_use]
    pub fn values(&self) -> BTreeMap<VariableRef, f64> {
        self.columns.iter()
            .filter_map(|(&variable, &id)| self.model.value(id).map(|value| (variable, value)))
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::data::elements::Sense;

    #[test]
    fn columns_and_rows() {
        let mut problem = MultilevelProblem::new();
        let lower = problem.add_lower_level(LevelId::UPPER, "lower", Sense::Maximize);
        let x = problem.add_variable(LevelId::UPPER, Kind::Binary, "x", 0_f64, 1_f64);
        let y = problem.add_variable(lower, Kind::Real, "y", 0_f64, f64::INFINITY);
        problem.add_fixed(lower, x);
        problem.add_objective_coefficient(LevelId::UPPER, y, 2_f64);
        problem.level_mut(LevelId::UPPER).d = 1_f64;
        let row = problem.add_row(lower, &[(y, 1_f64)], 3_f64, "cap");
        problem.add_bilinear(lower, row, x, y, 1_f64);

        let mut reformulation = Reformulation::new(&problem, "single");
        reformulation.add_rows(&problem, lower);
        let model = &reformulation.model;

        assert_eq!(model.nr_variables(), 2);
        assert_eq!(model.variable(reformulation.variable(x)).domain, Domain::Binary);
        assert_eq!(model.block(reformulation.level_blocks[1]).name, "L1");
        let objective = model.objective(reformulation.objective);
        assert_eq!(objective.sense, Sense::Minimize);
        assert_eq!(model.standard_repn(&objective.expression).constant, 1_f64);

        let (_, constraint) = model.active_constraints().next().unwrap();
        assert_eq!(constraint.name, "cap");
        assert_eq!(constraint.relation.upper, Some(3_f64));
        assert!(constraint.relation.body.is_quadratic());
    }
}
