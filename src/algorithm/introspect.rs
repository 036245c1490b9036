//! # Model introspection
//!
//! Walks the block tree of a `Model` and finds the levels: the root is the leader, every active
//! submodel is a follower of the closest enclosing submodel (or of the leader). Plain blocks are
//! merged into the level they are nested in.
use std::collections::{BTreeMap, HashMap};

use itertools::Itertools;
use tracing::debug;

use crate::data::model::{BlockId, BlockKind, ConstraintId, Model, ObjectiveId, VarId};
use crate::error::Error;

/// Order in which components are visited.
///
/// Every row, variable and generated name produced downstream follows this order, which makes
/// the transformations deterministic.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default)]
pub enum SortOrder {
    /// Declaration order.
    #[default]
    Unsorted,
    /// Declaration order of families, members of an indexed family by index.
    Indices,
    /// By name, members of an indexed family by index.
    Alphabetical,
}

/// A level found in the model.
#[derive(Clone, Debug, PartialEq)]
pub struct SubModelNode {
    /// The block representing the level, the root block for the leader.
    pub block: BlockId,
    /// The block and the plain blocks nested in it (not those inside nested submodels).
    pub blocks: Vec<BlockId>,
    /// Outer variables that the level treats as parameters, empty for the leader.
    pub fixed: Vec<VarId>,
    /// Variables declared in `blocks`.
    pub variables: Vec<VarId>,
    /// Active constraints declared in `blocks`.
    pub constraints: Vec<ConstraintId>,
    /// Active objectives declared in `blocks`.
    pub objectives: Vec<ObjectiveId>,
    /// Levels directly below this one.
    pub children: Vec<SubModelNode>,
}

impl SubModelNode {
    /// Number of levels below this one on the longest path down.
    #[must_use]
    pub fn height(&self) -> usize {
        self.children.iter().map(|child| child.height() + 1).max().unwrap_or(0)
    }

    /// This node and all nodes below it, parents before children.
    #[must_use]
    pub fn preorder(&self) -> Vec<&SubModelNode> {
        let mut result = vec![self];
        for child in &self.children {
            result.extend(child.preorder());
        }

        result
    }
}

/// Name and index of a variable, as seen during introspection.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VariableInfo {
    /// Name including the block path, like `lower.y[2]`.
    pub name: String,
    /// Index within the family, if any.
    pub index: Option<usize>,
    /// Block that declared the variable.
    pub block: BlockId,
}

/// Result of walking a model.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelTree {
    /// The leader.
    pub root: SubModelNode,
    /// All variables of active blocks.
    pub variables: BTreeMap<VarId, VariableInfo>,
}

/// Walk the model and collect its levels.
///
/// # Errors
///
/// When a submodel declares no fixed variables, or when a fixed variable doesn't exist or is
/// declared inside the submodel itself.
pub fn introspect(model: &Model, sort: SortOrder) -> Result<ModelTree, Error> {
    let mut variables = BTreeMap::new();
    let root = visit(model, model.root(), sort, &mut variables)?;

    debug!(levels = root.preorder().len(), variables = variables.len(), "introspected model");
    Ok(ModelTree { root, variables })
}

fn visit(
    model: &Model,
    block: BlockId,
    sort: SortOrder,
    variables: &mut BTreeMap<VarId, VariableInfo>,
) -> Result<SubModelNode, Error> {
    let mut node = SubModelNode {
        block,
        blocks: Vec::new(),
        fixed: Vec::new(),
        variables: Vec::new(),
        constraints: Vec::new(),
        objectives: Vec::new(),
        children: Vec::new(),
    };

    let mut submodels = Vec::new();
    let mut stack = vec![block];
    while let Some(current) = stack.pop() {
        node.blocks.push(current);
        let data = model.block(current);
        node.variables.extend(&data.variables);
        node.constraints.extend(data.constraints.iter().filter(|&&id| model.constraint(id).active));
        node.objectives.extend(data.objectives.iter().filter(|&&id| model.objective(id).active));

        let mut children = data.children.iter().copied()
            .filter(|&child| model.block(child).active)
            .collect::<Vec<_>>();
        sort_blocks(model, &mut children, sort);
        for &child in children.iter().rev() {
            match model.block(child).kind {
                BlockKind::Plain => stack.push(child),
                BlockKind::SubModel { .. } => submodels.push(child),
            }
        }
    }
    sort_blocks(model, &mut submodels, sort);

    for &id in &node.variables {
        let variable = model.variable(id);
        let path = model.block_path(variable.block);
        let name = if path.is_empty() {
            variable.full_name()
        } else {
            format!("{path}.{}", variable.full_name())
        };
        variables.insert(id, VariableInfo { name, index: variable.index, block: variable.block });
    }

    if let Some(fixed) = model.block(block).fixed() {
        if fixed.is_empty() {
            return Err(Error::UnsupportedStructure(format!(
                "submodel `{}` does not declare any fixed variables", model.block_path(block),
            )));
        }
        for &id in fixed {
            if id.index() >= model.nr_variables() {
                return Err(Error::InvalidModel(format!(
                    "submodel `{}` refers to nonexistent variable {id}", model.block_path(block),
                )));
            }
            if node.blocks.contains(&model.variable(id).block) {
                return Err(Error::InvalidModel(format!(
                    "submodel `{}` lists its own variable `{}` as fixed",
                    model.block_path(block), model.variable(id).full_name(),
                )));
            }
        }
        node.fixed = fixed.iter().copied().unique().collect();
        sort_variables(model, &mut node.fixed, sort);
    }

    sort_variables(model, &mut node.variables, sort);
    sort_by_name(&mut node.constraints, sort, |id| model.constraint(id).name.as_str());
    sort_by_name(&mut node.objectives, sort, |id| model.objective(id).name.as_str());

    for submodel in submodels {
        node.children.push(visit(model, submodel, sort, variables)?);
    }

    Ok(node)
}

fn sort_blocks(model: &Model, blocks: &mut [BlockId], sort: SortOrder) {
    match sort {
        SortOrder::Unsorted | SortOrder::Indices => blocks.sort(),
        SortOrder::Alphabetical => blocks.sort_by(|&a, &b| model.block(a).name.cmp(&model.block(b).name)),
    }
}

fn sort_by_name<'a, T: Copy + Ord>(ids: &mut [T], sort: SortOrder, name: impl Fn(T) -> &'a str) {
    if sort == SortOrder::Alphabetical {
        ids.sort_by(|&a, &b| name(a).cmp(name(b)).then(a.cmp(&b)));
    }
}

/// Sort variables according to the sort order.
pub fn sort_variables(model: &Model, variables: &mut [VarId], sort: SortOrder) {
    match sort {
        SortOrder::Unsorted => {},
        SortOrder::Indices => {
            let mut first_seen = HashMap::new();
            for &id in variables.iter() {
                first_seen.entry(model.variable(id).name.as_str())
                    .and_modify(|first: &mut VarId| *first = (*first).min(id))
                    .or_insert(id);
            }
            variables.sort_by_key(|&id| {
                let variable = model.variable(id);
                (first_seen[variable.name.as_str()], variable.index, id)
            });
        },
        SortOrder::Alphabetical => variables.sort_by(|&a, &b| {
            let (a_variable, b_variable) = (model.variable(a), model.variable(b));
            a_variable.name.cmp(&b_variable.name)
                .then(a_variable.index.cmp(&b_variable.index))
                .then(a.cmp(&b))
        }),
    }
}
