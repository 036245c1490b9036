//! # Algebraic models
//!
//! Problems are authored as a tree of blocks holding variables, constraints, objectives and
//! complementarity conditions. A block is either a plain grouping of components or a *submodel*:
//! a lower level optimization problem that treats a list of outer variables as parameters (its
//! `fixed` variables).
//!
//! All components live in arenas owned by the `Model` and are referred to by small copyable ids.
//! Transformations add components under uniquely mangled block names, such that the authored
//! components keep their ids and solution values can be read from them after a solve.
use std::collections::HashSet;
use std::fmt;

use crate::data::elements::Sense;
use crate::data::model::component::{Complementarity, Constraint, Domain, Objective, Relation, Variable};
use crate::data::model::expression::{Expression, StandardRepn};

pub mod component;
pub mod expression;

/// Handle of a variable in a `Model`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VarId(pub(crate) usize);

impl VarId {
    /// Position of the variable in declaration order.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Handle of a block in a `Model`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct BlockId(pub(crate) usize);

/// Handle of a constraint in a `Model`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ConstraintId(pub(crate) usize);

/// Handle of an objective in a `Model`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ObjectiveId(pub(crate) usize);

/// Handle of a complementarity condition in a `Model`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ComplementarityId(pub(crate) usize);

/// What a block represents.
#[derive(Clone, Debug, PartialEq)]
pub enum BlockKind {
    /// Grouping of components, part of the enclosing level.
    Plain,
    /// A lower level problem.
    SubModel {
        /// Outer variables that this level treats as parameters.
        fixed: Vec<VarId>,
    },
}

/// A node in the block tree.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockData {
    /// Name, unique among the siblings.
    pub name: String,
    /// Enclosing block, `None` only for the root.
    pub parent: Option<BlockId>,
    /// Whether this is a lower level.
    pub kind: BlockKind,
    /// Nested blocks in creation order.
    pub children: Vec<BlockId>,
    /// Variables declared directly in this block.
    pub variables: Vec<VarId>,
    /// Constraints declared directly in this block.
    pub constraints: Vec<ConstraintId>,
    /// Objectives declared directly in this block.
    pub objectives: Vec<ObjectiveId>,
    /// Complementarity conditions declared directly in this block.
    pub complementarities: Vec<ComplementarityId>,
    /// Components of inactive blocks (and their descendants) are ignored.
    pub active: bool,
}

impl BlockData {
    fn new(name: String, parent: Option<BlockId>, kind: BlockKind) -> Self {
        Self {
            name,
            parent,
            kind,
            children: Vec::new(),
            variables: Vec::new(),
            constraints: Vec::new(),
            objectives: Vec::new(),
            complementarities: Vec::new(),
            active: true,
        }
    }

    /// The fixed variables, if this block is a submodel.
    #[must_use]
    pub fn fixed(&self) -> Option<&[VarId]> {
        match &self.kind {
            BlockKind::Plain => None,
            BlockKind::SubModel { fixed } => Some(fixed),
        }
    }
}

/// An authored optimization model.
#[derive(Clone, Debug, PartialEq)]
pub struct Model {
    name: String,
    blocks: Vec<BlockData>,
    variables: Vec<Variable>,
    constraints: Vec<Constraint>,
    objectives: Vec<Objective>,
    complementarities: Vec<Complementarity>,
}

impl Model {
    /// Create a model consisting of an empty root block.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            blocks: vec![BlockData::new(name.clone(), None, BlockKind::Plain)],
            name,
            variables: Vec::new(),
            constraints: Vec::new(),
            objectives: Vec::new(),
            complementarities: Vec::new(),
        }
    }

    /// Name of the model.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The root block, which holds the upper level.
    #[must_use]
    pub fn root(&self) -> BlockId {
        BlockId(0)
    }

    /// Add a plain block below `parent`.
    ///
    /// # Return value
    ///
    /// The new block, its name is `name` made unique among the children of `parent`.
    pub fn add_block(&mut self, parent: BlockId, name: &str) -> BlockId {
        self.push_block(parent, name, BlockKind::Plain)
    }

    /// Add a lower level below `parent`.
    ///
    /// # Arguments
    ///
    /// * `fixed`: Variables declared outside of the new block that the lower level treats as
    /// parameters.
    pub fn add_submodel(
        &mut self,
        parent: BlockId,
        name: &str,
        fixed: impl IntoIterator<Item = VarId>,
    ) -> BlockId {
        let fixed = fixed.into_iter().collect();
        self.push_block(parent, name, BlockKind::SubModel { fixed })
    }

    fn push_block(&mut self, parent: BlockId, name: &str, kind: BlockKind) -> BlockId {
        let name = self.unique_name(parent, name);
        let id = BlockId(self.blocks.len());
        self.blocks.push(BlockData::new(name, Some(parent), kind));
        self.blocks[parent.0].children.push(id);

        id
    }

    /// A name not used by any child block of `parent`: `base`, `base_1`, `base_2`, ...
    #[must_use]
    pub fn unique_name(&self, parent: BlockId, base: &str) -> String {
        let taken = self.blocks[parent.0].children.iter()
            .map(|&child| self.blocks[child.0].name.as_str())
            .collect::<HashSet<_>>();

        if !taken.contains(base) {
            return base.to_string();
        }
        (1..)
            .map(|i| format!("{base}_{i}"))
            .find(|candidate| !taken.contains(candidate.as_str()))
            .unwrap_or_else(|| base.to_string())
    }

    /// Get a block.
    #[must_use]
    pub fn block(&self, id: BlockId) -> &BlockData {
        &self.blocks[id.0]
    }

    /// All blocks in creation order.
    pub fn blocks(&self) -> impl Iterator<Item = (BlockId, &BlockData)> {
        self.blocks.iter().enumerate().map(|(i, block)| (BlockId(i), block))
    }

    /// Find a direct child of `parent` by name.
    #[must_use]
    pub fn find_block(&self, parent: BlockId, name: &str) -> Option<BlockId> {
        self.blocks[parent.0].children.iter().copied()
            .find(|&child| self.blocks[child.0].name == name)
    }

    /// Dotted path from the root to the block, the root itself has an empty path.
    #[must_use]
    pub fn block_path(&self, id: BlockId) -> String {
        let mut names = Vec::new();
        let mut current = id;
        while let Some(parent) = self.blocks[current.0].parent {
            names.push(self.blocks[current.0].name.as_str());
            current = parent;
        }
        names.reverse();

        names.join(".")
    }

    /// Replace the fixed variables of a submodel.
    ///
    /// Has no effect on a plain block.
    pub fn set_fixed(&mut self, block: BlockId, variables: impl IntoIterator<Item = VarId>) {
        if let BlockKind::SubModel { fixed } = &mut self.blocks[block.0].kind {
            *fixed = variables.into_iter().collect();
        }
    }

    /// Deactivate a block, its components and descendants are ignored afterwards.
    pub fn deactivate_block(&mut self, block: BlockId) {
        self.blocks[block.0].active = false;
    }

    /// Whether the block and all its ancestors are active.
    #[must_use]
    pub fn is_active(&self, block: BlockId) -> bool {
        let mut current = Some(block);
        while let Some(id) = current {
            if !self.blocks[id.0].active {
                return false;
            }
            current = self.blocks[id.0].parent;
        }

        true
    }

    /// The block and all blocks below it, depth first in creation order.
    #[must_use]
    pub fn descendants(&self, block: BlockId) -> Vec<BlockId> {
        let mut result = Vec::new();
        let mut stack = vec![block];
        while let Some(id) = stack.pop() {
            result.push(id);
            stack.extend(self.blocks[id.0].children.iter().rev());
        }

        result
    }

    /// Add a variable.
    ///
    /// # Arguments
    ///
    /// * `bounds`: (lower, upper), infinite values are allowed. Binary variables have their
    /// bounds intersected with `[0, 1]`.
    pub fn add_variable(
        &mut self,
        block: BlockId,
        name: &str,
        domain: Domain,
        bounds: (f64, f64),
    ) -> VarId {
        self.push_variable(block, name, None, domain, bounds)
    }

    /// Add an indexed family of variables `name[0]`, ..., `name[size - 1]`.
    pub fn add_indexed_variable(
        &mut self,
        block: BlockId,
        name: &str,
        size: usize,
        domain: Domain,
        bounds: (f64, f64),
    ) -> Vec<VarId> {
        (0..size)
            .map(|index| self.push_variable(block, name, Some(index), domain, bounds))
            .collect()
    }

    fn push_variable(
        &mut self,
        block: BlockId,
        name: &str,
        index: Option<usize>,
        domain: Domain,
        (lower, upper): (f64, f64),
    ) -> VarId {
        let (lower, upper) = match domain {
            Domain::Binary => (lower.max(0_f64), upper.min(1_f64)),
            Domain::Reals | Domain::Integers => (lower, upper),
        };

        let id = VarId(self.variables.len());
        self.variables.push(Variable {
            name: name.to_string(),
            index,
            domain,
            lower,
            upper,
            fixed: None,
            value: None,
            block,
        });
        self.blocks[block.0].variables.push(id);

        id
    }

    /// Get a variable.
    #[must_use]
    pub fn variable(&self, id: VarId) -> &Variable {
        &self.variables[id.0]
    }

    /// All variables in declaration order.
    pub fn variables(&self) -> impl Iterator<Item = (VarId, &Variable)> {
        self.variables.iter().enumerate().map(|(i, variable)| (VarId(i), variable))
    }

    /// Number of variables, including those in inactive blocks.
    #[must_use]
    pub fn nr_variables(&self) -> usize {
        self.variables.len()
    }

    /// Change the bounds of a variable.
    pub fn set_bounds(&mut self, id: VarId, lower: f64, upper: f64) {
        let variable = &mut self.variables[id.0];
        variable.lower = lower;
        variable.upper = upper;
    }

    /// Change the domain of a variable, leaving the bounds untouched.
    pub fn set_domain(&mut self, id: VarId, domain: Domain) {
        self.variables[id.0].domain = domain;
    }

    /// Turn a variable into the constant `value`.
    pub fn fix(&mut self, id: VarId, value: f64) {
        let variable = &mut self.variables[id.0];
        variable.fixed = Some(value);
        variable.value = Some(value);
    }

    /// Undo `fix`, keeping the value.
    pub fn unfix(&mut self, id: VarId) {
        self.variables[id.0].fixed = None;
    }

    /// Current value of a variable: the fixed value if it is fixed, else the solution value.
    #[must_use]
    pub fn value(&self, id: VarId) -> Option<f64> {
        self.variables[id.0].current_value()
    }

    /// Store a solution value.
    pub fn set_value(&mut self, id: VarId, value: f64) {
        self.variables[id.0].value = Some(value);
    }

    /// Add a constraint to a block.
    pub fn add_constraint(&mut self, block: BlockId, name: &str, relation: Relation) -> ConstraintId {
        let id = ConstraintId(self.constraints.len());
        self.constraints.push(Constraint {
            name: name.to_string(),
            relation,
            block,
            active: true,
        });
        self.blocks[block.0].constraints.push(id);

        id
    }

    /// Get a constraint.
    #[must_use]
    pub fn constraint(&self, id: ConstraintId) -> &Constraint {
        &self.constraints[id.0]
    }

    /// All constraints in declaration order.
    pub fn constraints(&self) -> impl Iterator<Item = (ConstraintId, &Constraint)> {
        self.constraints.iter().enumerate().map(|(i, constraint)| (ConstraintId(i), constraint))
    }

    /// Replace the relation of a constraint.
    pub fn set_relation(&mut self, id: ConstraintId, relation: Relation) {
        self.constraints[id.0].relation = relation;
    }

    /// Deactivate a constraint.
    pub fn deactivate_constraint(&mut self, id: ConstraintId) {
        self.constraints[id.0].active = false;
    }

    /// Add an objective to a block.
    pub fn add_objective(
        &mut self,
        block: BlockId,
        name: &str,
        sense: Sense,
        expression: impl Into<Expression>,
    ) -> ObjectiveId {
        let id = ObjectiveId(self.objectives.len());
        self.objectives.push(Objective {
            name: name.to_string(),
            sense,
            expression: expression.into(),
            block,
            active: true,
        });
        self.blocks[block.0].objectives.push(id);

        id
    }

    /// Get an objective.
    #[must_use]
    pub fn objective(&self, id: ObjectiveId) -> &Objective {
        &self.objectives[id.0]
    }

    /// All objectives in declaration order.
    pub fn objectives(&self) -> impl Iterator<Item = (ObjectiveId, &Objective)> {
        self.objectives.iter().enumerate().map(|(i, objective)| (ObjectiveId(i), objective))
    }

    /// Replace the function of an objective.
    pub fn set_objective_expression(&mut self, id: ObjectiveId, expression: Expression) {
        self.objectives[id.0].expression = expression;
    }

    /// Deactivate an objective.
    pub fn deactivate_objective(&mut self, id: ObjectiveId) {
        self.objectives[id.0].active = false;
    }

    /// Add `0 <= left ⊥ right >= 0` to a block.
    pub fn add_complementarity(
        &mut self,
        block: BlockId,
        name: &str,
        left: impl Into<Expression>,
        right: impl Into<Expression>,
    ) -> ComplementarityId {
        let id = ComplementarityId(self.complementarities.len());
        self.complementarities.push(Complementarity {
            name: name.to_string(),
            left: left.into(),
            right: right.into(),
            block,
            active: true,
        });
        self.blocks[block.0].complementarities.push(id);

        id
    }

    /// Get a complementarity condition.
    #[must_use]
    pub fn complementarity(&self, id: ComplementarityId) -> &Complementarity {
        &self.complementarities[id.0]
    }

    /// All complementarity conditions in declaration order.
    pub fn complementarities(&self) -> impl Iterator<Item = (ComplementarityId, &Complementarity)> {
        self.complementarities.iter().enumerate().map(|(i, condition)| (ComplementarityId(i), condition))
    }

    /// Deactivate a complementarity condition.
    pub fn deactivate_complementarity(&mut self, id: ComplementarityId) {
        self.complementarities[id.0].active = false;
    }

    /// Active constraints of the whole model, in declaration order.
    pub fn active_constraints(&self) -> impl Iterator<Item = (ConstraintId, &Constraint)> {
        self.constraints().filter(|(_, constraint)| constraint.active && self.is_active(constraint.block))
    }

    /// Active objectives of the whole model, in declaration order.
    pub fn active_objectives(&self) -> impl Iterator<Item = (ObjectiveId, &Objective)> {
        self.objectives().filter(|(_, objective)| objective.active && self.is_active(objective.block))
    }

    /// Active complementarity conditions of the whole model, in declaration order.
    pub fn active_complementarities(&self) -> impl Iterator<Item = (ComplementarityId, &Complementarity)> {
        self.complementarities()
            .filter(|(_, condition)| condition.active && self.is_active(condition.block))
    }

    /// Merged view of an expression, with fixed variables folded into the constant.
    #[must_use]
    pub fn standard_repn(&self, expression: &Expression) -> StandardRepn {
        expression.standard_repn(|id| self.variables[id.0].fixed)
    }

    /// Evaluate an expression at the current values.
    #[must_use]
    pub fn evaluate(&self, expression: &Expression) -> Option<f64> {
        expression.evaluate(|id| self.value(id))
    }

    /// Largest violation of a bound, domain, active constraint or active complementarity condition
    /// at the current values.
    ///
    /// # Return value
    ///
    /// `None` if a variable used by an active component has no value.
    #[must_use]
    pub fn max_violation(&self) -> Option<f64> {
        let mut violation = 0_f64;

        let used = self.active_constraints()
            .flat_map(|(_, constraint)| constraint.relation.body.variables())
            .chain(self.active_objectives().flat_map(|(_, objective)| objective.expression.variables()))
            .collect::<HashSet<_>>();
        for id in used {
            let variable = &self.variables[id.0];
            let value = variable.current_value()?;
            violation = violation.max(variable.lower - value).max(value - variable.upper);
            if variable.domain != Domain::Reals {
                violation = violation.max((value - value.round()).abs());
            }
        }

        for (_, constraint) in self.active_constraints() {
            let value = self.evaluate(&constraint.relation.body)?;
            if let Some(lower) = constraint.relation.lower {
                violation = violation.max(lower - value);
            }
            if let Some(upper) = constraint.relation.upper {
                violation = violation.max(value - upper);
            }
        }

        for (_, condition) in self.active_complementarities() {
            let left = self.evaluate(&condition.left)?;
            let right = self.evaluate(&condition.right)?;
            violation = violation.max(-left).max(-right).max(left.min(right));
        }

        Some(violation)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn blocks() {
        let mut model = Model::new("m");
        let root = model.root();
        let x = model.add_variable(root, "x", Domain::Reals, (0_f64, f64::INFINITY));
        let lower = model.add_submodel(root, "lower", [x]);
        let other = model.add_block(root, "lower");
        let nested = model.add_block(lower, "inner");

        assert_eq!(model.block(other).name, "lower_1");
        assert_eq!(model.unique_name(root, "lower"), "lower_2");
        assert_eq!(model.block(lower).fixed(), Some(&[x][..]));
        assert_eq!(model.block(other).fixed(), None);
        assert_eq!(model.descendants(root), vec![root, lower, nested, other]);
        assert_eq!(model.block_path(nested), "lower.inner");
        assert_eq!(model.find_block(root, "lower_1"), Some(other));

        model.deactivate_block(lower);
        assert!(!model.is_active(nested));
        assert!(model.is_active(other));
    }

    #[test]
    fn variables() {
        let mut model = Model::new("m");
        let root = model.root();
        let xs = model.add_indexed_variable(root, "x", 3, Domain::Integers, (-2_f64, 5_f64));
        let b = model.add_variable(root, "b", Domain::Binary, (-1_f64, 3_f64));

        assert_eq!(model.variable(xs[2]).full_name(), "x[2]");
        assert_eq!((model.variable(b).lower, model.variable(b).upper), (0_f64, 1_f64));

        model.fix(xs[0], 4_f64);
        let repn = model.standard_repn(&(2_f64 * xs[0] + xs[1]));
        assert_eq!(repn.constant, 8_f64);
        assert_eq!(repn.linear_vars, vec![xs[1]]);

        model.unfix(xs[0]);
        assert_eq!(model.value(xs[0]), Some(4_f64));
        assert!(model.standard_repn(&Expression::from(xs[0])).constant == 0_f64);
    }

    #[test]
    fn violation() {
        let mut model = Model::new("m");
        let root = model.root();
        let x = model.add_variable(root, "x", Domain::Reals, (0_f64, 10_f64));
        let y = model.add_variable(root, "y", Domain::Integers, (0_f64, 10_f64));
        model.add_constraint(root, "c", (x + y).leq(4_f64));
        model.add_complementarity(root, "comp", x, y);

        assert_eq!(model.max_violation(), None);
        model.set_value(x, 3_f64);
        model.set_value(y, 2_f64);
        assert_eq!(model.max_violation(), Some(2_f64));
        model.set_value(y, 0_f64);
        assert_eq!(model.max_violation(), Some(0_f64));
    }
}
