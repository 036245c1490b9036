//! # Matrix extraction
//!
//! Reads the levels found by the introspector into a `MultilevelProblem`.
//!
//! Variables are assigned to levels as follows. A variable declared in a submodel belongs to that
//! submodel. A variable declared in an outer block that is used by a submodel, without being one
//! of its fixed variables, belongs to that submodel. All other variables belong to the level they
//! were declared in. Variables fixed with `Model::fix` are constants and are not extracted.
use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::algorithm::introspect::{introspect, sort_variables, ModelTree, SortOrder, SubModelNode};
use crate::data::elements::{RowSense, RowTag, Sense};
use crate::data::level::{Kind, LevelId, MultilevelProblem, VariableRef};
use crate::data::model::{BlockId, ConstraintId, Model, VarId};
use crate::data::model::component::Domain;
use crate::data::model::expression::StandardRepn;
use crate::error::Error;

/// How rows and objectives are written into the level representation.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ExtractOptions {
    /// Write every row as `<=`, splitting equalities and ranges into two rows. Otherwise every row
    /// is an equality, with a slack for each side of an inequality.
    pub inequalities: bool,
    /// Make the upper objective a minimization and all lower objectives maximizations.
    pub standard_objectives: bool,
    /// Order in which components are read.
    pub sort: SortOrder,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            inequalities: true,
            standard_objectives: false,
            sort: SortOrder::Unsorted,
        }
    }
}

impl ExtractOptions {
    /// Set `inequalities`.
    #[must_use]
    pub fn with_inequalities(mut self, inequalities: bool) -> Self {
        self.inequalities = inequalities;
        self
    }

    /// Set `standard_objectives`.
    #[must_use]
    pub fn with_standard_objectives(mut self, standard_objectives: bool) -> Self {
        self.standard_objectives = standard_objectives;
        self
    }

    /// Set `sort`.
    #[must_use]
    pub fn with_sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }
}

/// Constraint that a row was derived from.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct RowOrigin {
    /// The authored constraint.
    pub constraint: ConstraintId,
    /// Which side of the constraint.
    pub tag: RowTag,
}

/// A model in matrix form, with the information to map back.
#[derive(Clone, Debug)]
pub struct Extraction {
    /// The levels.
    pub problem: MultilevelProblem,
    /// Level representation of each extracted model variable.
    pub variables: BTreeMap<VarId, VariableRef>,
    /// Origin of every row, by level.
    pub rows: Vec<Vec<RowOrigin>>,
    /// Block of every level.
    pub blocks: Vec<BlockId>,
    /// The introspected block tree.
    pub tree: ModelTree,
}

impl Extraction {
    /// The model variable represented by a variable of the level representation.
    #[must_use]
    pub fn model_variable(&self, variable: VariableRef) -> Option<VarId> {
        self.variables.iter()
            .find(|&(_, &reference)| reference == variable)
            .map(|(&id, _)| id)
    }
}

/// Read a model into matrix form.
///
/// # Errors
///
/// When a level doesn't have exactly one objective, when a variable is claimed by two levels,
/// when a product of variables doesn't involve a variable of another level, or when the model
/// contains structures (complementarity conditions) that are not part of the level format.
pub fn extract(model: &Model, options: &ExtractOptions) -> Result<Extraction, Error> {
    if let Some((_, condition)) = model.active_complementarities().next() {
        return Err(Error::UnsupportedStructure(format!(
            "complementarity condition `{}` can't be extracted into a level", condition.name,
        )));
    }

    let tree = introspect(model, options.sort)?;
    let mut problem = MultilevelProblem::new();
    problem.level_mut(LevelId::UPPER).name = model.name().to_string();
    let mut nodes = Vec::new();
    register(model, &tree.root, None, &mut problem, &mut nodes);

    let repns = nodes.iter()
        .map(|&(_, node)| LevelRepns::new(model, node))
        .collect::<Vec<_>>();
    let owners = assign_owners(model, &tree, &problem, &nodes, &repns)?;

    let mut variables = BTreeMap::new();
    for &(level, _) in &nodes {
        let mut owned = owners.iter()
            .filter(|&(_, &owner)| owner == level)
            .map(|(&id, _)| id)
            .collect::<Vec<_>>();
        sort_variables(model, &mut owned, options.sort);
        for id in owned {
            let variable = model.variable(id);
            let kind = match variable.domain {
                Domain::Reals => Kind::Real,
                Domain::Integers => Kind::Integer,
                Domain::Binary => Kind::Binary,
            };
            let name = tree.variables[&id].name.clone();
            variables.insert(id, problem.add_variable(level, kind, name, variable.lower, variable.upper));
        }
    }

    for &(level, node) in &nodes {
        for &id in &node.fixed {
            if model.variable(id).fixed.is_some() {
                continue;
            }
            let owner = owners.get(&id).copied().ok_or_else(|| Error::InvalidModel(format!(
                "fixed variable `{}` of `{}` is not part of an active block",
                model.variable(id).full_name(), model.block_path(node.block),
            )))?;
            if !problem.is_ancestor(owner, level) {
                return Err(Error::InvalidModel(format!(
                    "fixed variable `{}` of `{}` is owned by {owner}, which is not an enclosing level",
                    model.variable(id).full_name(), model.block_path(node.block),
                )));
            }
            problem.add_fixed(level, variables[&id]);
        }
    }

    let mut rows = Vec::with_capacity(nodes.len());
    for ((level, node), repn) in nodes.iter().zip(&repns) {
        check_usage(model, &problem, *level, repn, &variables)?;
        write_objective(model, &mut problem, *level, node, repn, &variables)?;
        rows.push(write_rows(model, &mut problem, *level, repn, &variables, options.inequalities)?);
        problem.level_mut(*level).row_sense = if options.inequalities { RowSense::Less } else { RowSense::Equal };
    }

    if options.standard_objectives {
        standardize_objectives(&mut problem);
    }

    problem.check()?;
    debug!(
        levels = problem.nr_levels(),
        variables = variables.len(),
        rows = rows.iter().map(Vec::len).sum::<usize>(),
        "extracted levels",
    );

    let blocks = nodes.iter().map(|&(_, node)| node.block).collect();
    Ok(Extraction { problem, variables, rows, blocks, tree })
}

/// Make the upper objective a minimization and all lower objectives maximizations.
pub fn standardize_objectives(problem: &mut MultilevelProblem) {
    let ids = problem.levels().map(|(id, _)| id).collect::<Vec<_>>();
    for id in ids {
        let target = if id == LevelId::UPPER { Sense::Minimize } else { Sense::Maximize };
        let level = problem.level_mut(id);
        if level.sense != target {
            level.negate_objective();
        }
    }
}

fn register<'a>(
    model: &Model,
    node: &'a SubModelNode,
    parent: Option<LevelId>,
    problem: &mut MultilevelProblem,
    nodes: &mut Vec<(LevelId, &'a SubModelNode)>,
) {
    let level = match parent {
        None => LevelId::UPPER,
        Some(parent) => problem.add_lower_level(parent, model.block_path(node.block), Sense::Minimize),
    };
    nodes.push((level, node));
    for child in &node.children {
        register(model, child, Some(level), problem, nodes);
    }
}

/// Merged expressions of the components of one level.
struct LevelRepns {
    constraints: Vec<(ConstraintId, StandardRepn)>,
    objectives: Vec<StandardRepn>,
}

impl LevelRepns {
    fn new(model: &Model, node: &SubModelNode) -> Self {
        Self {
            constraints: node.constraints.iter()
                .map(|&id| (id, model.standard_repn(&model.constraint(id).relation.body)))
                .collect(),
            objectives: node.objectives.iter()
                .map(|&id| model.standard_repn(&model.objective(id).expression))
                .collect(),
        }
    }

    fn used(&self) -> BTreeSet<VarId> {
        self.constraints.iter().map(|(_, repn)| repn)
            .chain(&self.objectives)
            .flat_map(|repn| {
                repn.linear_vars.iter().copied()
                    .chain(repn.quadratic_vars.iter().flat_map(|&(left, right)| [left, right]))
            })
            .collect()
    }
}

fn assign_owners(
    model: &Model,
    tree: &ModelTree,
    problem: &MultilevelProblem,
    nodes: &[(LevelId, &SubModelNode)],
    repns: &[LevelRepns],
) -> Result<BTreeMap<VarId, LevelId>, Error> {
    let mut owners = BTreeMap::new();
    for &(level, node) in nodes {
        for &id in &node.variables {
            if model.variable(id).fixed.is_none() {
                owners.insert(id, level);
            }
        }
    }

    let mut claims = BTreeMap::<VarId, LevelId>::new();
    for (&(level, node), repn) in nodes.iter().zip(repns) {
        for id in repn.used() {
            let Some(&owner) = owners.get(&id) else {
                return Err(Error::InvalidModel(format!(
                    "`{}` uses variable `{}` that is not part of an active block",
                    model.block_path(node.block), model.variable(id).full_name(),
                )));
            };
            if owner == level || node.fixed.contains(&id) || !problem.is_ancestor(owner, level) {
                continue;
            }
            match claims.get(&id) {
                Some(&other) if other != level => return Err(Error::InvalidModel(format!(
                    "variable `{}` is used without being fixed by both {other} and {level}",
                    tree.variables[&id].name,
                ))),
                _ => { claims.insert(id, level); },
            }
        }
    }
    owners.extend(claims);

    Ok(owners)
}

/// A level may use its own variables, those of levels below it and its fixed variables.
fn check_usage(
    model: &Model,
    problem: &MultilevelProblem,
    level: LevelId,
    repn: &LevelRepns,
    variables: &BTreeMap<VarId, VariableRef>,
) -> Result<(), Error> {
    for id in repn.used() {
        let variable = variables[&id];
        let allowed = variable.level == level
            || problem.is_ancestor(level, variable.level)
            || problem.level(level).is_fixed(variable);
        if !allowed {
            return Err(Error::InvalidModel(format!(
                "{level} uses `{}`, which belongs to the unrelated level {}",
                model.variable(id).full_name(), variable.level,
            )));
        }
    }

    Ok(())
}

/// At most one factor of a product may be owned by the level, the other has to be controlled by
/// another level.
fn check_product(
    problem: &MultilevelProblem,
    level: LevelId,
    left: VariableRef,
    right: VariableRef,
) -> Result<(), Error> {
    if left.level == level && right.level == level {
        return Err(Error::UnsupportedStructure(format!(
            "product of `{}` and `{}`, both owned by {level}",
            problem.name(left), problem.name(right),
        )));
    }

    Ok(())
}

fn write_objective(
    model: &Model,
    problem: &mut MultilevelProblem,
    level: LevelId,
    node: &SubModelNode,
    repn: &LevelRepns,
    variables: &BTreeMap<VarId, VariableRef>,
) -> Result<(), Error> {
    let [objective] = repn.objectives.as_slice() else {
        return Err(Error::InvalidModel(format!(
            "level `{}` has {} active objectives, exactly one is required",
            if level == LevelId::UPPER { model.name().to_string() } else { model.block_path(node.block) },
            repn.objectives.len(),
        )));
    };

    problem.level_mut(level).sense = model.objective(node.objectives[0]).sense;
    problem.level_mut(level).d = objective.constant;
    for (id, coefficient) in objective.linear() {
        problem.add_objective_coefficient(level, variables[&id], coefficient);
    }
    for (left, right, coefficient) in objective.quadratic() {
        let (left, right) = (variables[&left], variables[&right]);
        check_product(problem, level, left, right)?;
        problem.add_objective_bilinear(level, left, right, coefficient);
    }

    Ok(())
}

fn write_rows(
    model: &Model,
    problem: &mut MultilevelProblem,
    level: LevelId,
    repn: &LevelRepns,
    variables: &BTreeMap<VarId, VariableRef>,
    inequalities: bool,
) -> Result<Vec<RowOrigin>, Error> {
    let mut origins = Vec::new();

    for (id, body) in &repn.constraints {
        let constraint = model.constraint(*id);
        if body.is_constant() {
            debug!(constraint = %constraint.name, "dropping constraint with a constant body");
            continue;
        }

        let terms = body.linear()
            .map(|(id, coefficient)| (variables[&id], coefficient))
            .collect::<Vec<_>>();
        let products = body.quadratic()
            .map(|(left, right, coefficient)| (variables[&left], variables[&right], coefficient))
            .collect::<Vec<_>>();
        for &(left, right, _) in &products {
            check_product(problem, level, left, right)?;
        }

        let relation = &constraint.relation;
        let lower = relation.lower.map(|value| value - body.constant);
        let upper = relation.upper.map(|value| value - body.constant);
        // (tag, sign of the body, right hand side, sign of the slack)
        let sides = match (inequalities, relation.is_equality(), lower, upper) {
            (_, _, None, None) => Vec::new(),
            (false, true, _, Some(rhs)) => vec![(RowTag::Equal, 1_f64, rhs, None)],
            (true, _, lower, upper) => upper.map(|rhs| (RowTag::Less, 1_f64, rhs, None)).into_iter()
                .chain(lower.map(|rhs| (RowTag::GreaterToLess, -1_f64, -rhs, None)))
                .collect(),
            (false, _, lower, upper) => upper.map(|rhs| (RowTag::Less, 1_f64, rhs, Some(1_f64))).into_iter()
                .chain(lower.map(|rhs| (RowTag::Greater, 1_f64, rhs, Some(-1_f64))))
                .collect(),
        };

        let path = model.block_path(constraint.block);
        let base = if path.is_empty() { constraint.name.clone() } else { format!("{path}.{}", constraint.name) };
        let split = sides.len() > 1;
        for (tag, sign, rhs, slack) in sides {
            let name = if split { format!("{base}[{tag}]") } else { base.clone() };
            let mut row_terms = terms.iter()
                .map(|&(variable, coefficient)| (variable, sign * coefficient))
                .collect::<Vec<_>>();
            if let Some(slack_sign) = slack {
                let slack = problem.add_variable(level, Kind::Real, format!("slack[{name}]"), 0_f64, f64::INFINITY);
                row_terms.push((slack, slack_sign));
            }
            let row = problem.add_row(level, &row_terms, rhs, name);
            for &(left, right, coefficient) in &products {
                problem.add_bilinear(level, row, left, right, sign * coefficient);
            }
            origins.push(RowOrigin { constraint: *id, tag });
        }
    }

    Ok(origins)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::data::model::component::Relation;
    use crate::data::model::expression::Expression;

    /// min x - 4y, follower min y with four rows.
    fn bard() -> (Model, VarId, VarId) {
        let mut model = Model::new("bard");
        let root = model.root();
        let x = model.add_variable(root, "x", Domain::Reals, (0_f64, f64::INFINITY));
        let y = model.add_variable(root, "y", Domain::Reals, (0_f64, f64::INFINITY));
        model.add_objective(root, "o", Sense::Minimize, x - 4_f64 * y);
        let lower = model.add_submodel(root, "lower", [x]);
        model.add_objective(lower, "o", Sense::Minimize, Expression::from(y));
        model.add_constraint(lower, "c1", (-1_f64 * x - y).leq(-3_f64));
        model.add_constraint(lower, "c2", (-2_f64 * x + y).leq(0_f64));
        model.add_constraint(lower, "c3", (2_f64 * x + y).leq(12_f64));
        model.add_constraint(lower, "c4", (3_f64 * x - 2_f64 * y).leq(4_f64));

        (model, x, y)
    }

    #[test]
    fn ownership_by_use() {
        let (model, x, y) = bard();
        let extraction = extract(&model, &ExtractOptions::default()).unwrap();
        let problem = &extraction.problem;

        assert_eq!(problem.nr_levels(), 2);
        assert_eq!(extraction.variables[&x], VariableRef::new(LevelId::UPPER, Kind::Real, 0));
        assert_eq!(extraction.variables[&y], VariableRef::new(LevelId(1), Kind::Real, 0));
        assert_eq!(problem.level(LevelId(1)).fixed, vec![extraction.variables[&x]]);
        assert_eq!(problem.level(LevelId(1)).nr_rows(), 4);
        assert_eq!(problem.upper().nr_rows(), 0);
        assert_eq!(problem.level(LevelId(1)).b, vec![-3_f64, 0_f64, 12_f64, 4_f64]);
        assert_eq!(extraction.model_variable(extraction.variables[&y]), Some(y));
    }

    #[test]
    fn equalities_get_slacks() {
        let (mut model, x, _) = bard();
        let root = model.root();
        model.add_constraint(root, "range", Relation::range(1_f64, x, 3_f64));
        model.add_constraint(root, "eq", (x * 2_f64).equals(2_f64));

        let options = ExtractOptions::default().with_inequalities(false).with_standard_objectives(true);
        let extraction = extract(&model, &options).unwrap();
        let upper = extraction.problem.upper();
        assert_eq!(upper.row_sense, RowSense::Equal);
        assert_eq!(upper.nr_rows(), 3);
        assert_eq!(upper.variables[Kind::Real].len(), 3);
        assert_eq!(upper.row_names[0], "range[l]");
        assert_eq!(extraction.rows[0][1].tag, RowTag::Greater);
        assert_eq!(extraction.rows[0][2].tag, RowTag::Equal);
        assert_eq!(extraction.problem.level(LevelId(1)).sense, Sense::Maximize);
        assert_eq!(extraction.problem.level(LevelId(1)).objective_terms()[0].1, -1_f64);
    }

    #[test]
    fn inequalities_split() {
        let (mut model, x, _) = bard();
        let root = model.root();
        model.add_constraint(root, "eq", (x + 1_f64).equals(3_f64));
        model.add_constraint(root, "ge", x.geq(1_f64));

        let extraction = extract(&model, &ExtractOptions::default()).unwrap();
        let upper = extraction.problem.upper();
        assert_eq!(upper.b, vec![2_f64, -2_f64, -1_f64]);
        assert_eq!(upper.row(1)[0].1, -1_f64);
        assert_eq!(extraction.rows[0][2].tag, RowTag::GreaterToLess);
    }

    #[test]
    fn constant_rows_are_dropped() {
        let (mut model, x, _) = bard();
        let root = model.root();
        let z = model.add_variable(root, "z", Domain::Reals, (0_f64, 1_f64));
        model.add_constraint(root, "constant", (z + 1_f64).leq(3_f64));
        model.fix(z, 1_f64);
        model.add_constraint(root, "kept", (x + z).leq(3_f64));

        let extraction = extract(&model, &ExtractOptions::default()).unwrap();
        assert_eq!(extraction.problem.upper().b, vec![2_f64]);
        assert!(!extraction.variables.contains_key(&z));
    }

    #[test]
    fn products() {
        let (mut model, x, y) = bard();
        let root = model.root();
        let lower = model.find_block(root, "lower").unwrap();
        model.add_constraint(lower, "bilinear", (x * y).leq(1_f64));
        let extraction = extract(&model, &ExtractOptions::default()).unwrap();
        assert_eq!(extraction.problem.level(LevelId(1)).bilinear.len(), 1);

        let (mut model, x, _) = bard();
        let w = model.add_variable(model.root(), "w", Domain::Reals, (0_f64, 1_f64));
        model.add_constraint(model.root(), "own", (x * w).leq(1_f64));
        assert!(matches!(
            extract(&model, &ExtractOptions::default()),
            Err(Error::UnsupportedStructure(_)),
        ));
    }

    #[test]
    fn objectives_are_required() {
        let (mut model, _, _) = bard();
        let root = model.root();
        let lower = model.find_block(root, "lower").unwrap();
        let (objective, _) = model.objectives().find(|(_, o)| o.block == lower).unwrap();
        model.deactivate_objective(objective);
        assert!(matches!(extract(&model, &ExtractOptions::default()), Err(Error::InvalidModel(_))));
    }

    #[test]
    fn sibling_claims() {
        let (mut model, x, y) = bard();
        let root = model.root();
        let other = model.add_submodel(root, "other", [x]);
        model.add_objective(other, "o", Sense::Minimize, Expression::from(y));
        assert!(matches!(extract(&model, &ExtractOptions::default()), Err(Error::InvalidModel(_))));
    }
}
