//! # Matrix representation of multilevel problems
//!
//! A `MultilevelProblem` is a tree of `Level`s, the first one being the upper level. Each level
//! owns variables of three kinds and stores its objective and constraint coefficients in blocks
//! keyed by the (level, kind) of the variables they multiply. A lower level may read variables of
//! its ancestors; those it treats as parameters are listed as its `fixed` variables.
//!
//! Bilinear terms are only allowed between variables of different levels and are kept in
//! coordinate form next to the blocks.
use std::collections::BTreeMap;
use std::fmt;

use enum_map::EnumMap;
use itertools::Itertools;

use crate::data::elements::{RowSense, Sense};
use crate::data::linear_algebra::matrix::SparseMatrix;
use crate::error::Error;

pub use bundle::{Kind, VariableBundle};

pub mod bundle;

/// Position of a level in a `MultilevelProblem`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct LevelId(pub usize);

impl LevelId {
    /// The leader.
    pub const UPPER: LevelId = LevelId(0);
}

impl fmt::Display for LevelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::UPPER {
            f.write_str("U")
        } else {
            write!(f, "L{}", self.0)
        }
    }
}

/// Identifies a variable: the level owning it, its kind and the position in the bundle.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VariableRef {
    /// Owning level.
    pub level: LevelId,
    /// Bundle within the level.
    pub kind: Kind,
    /// Position within the bundle.
    pub index: usize,
}

impl VariableRef {
    /// Create a reference.
    #[must_use]
    pub fn new(level: LevelId, kind: Kind, index: usize) -> Self {
        Self { level, kind, index }
    }

    /// The block this variable's coefficients are stored in.
    #[must_use]
    pub fn block(self) -> Block {
        Block { level: self.level, kind: self.kind }
    }
}

impl fmt::Display for VariableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}{}", self.level, self.kind, self.index)
    }
}

/// Key of a coefficient block: the variables of kind `kind` owned by `level`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Block {
    /// Owner of the variables.
    pub level: LevelId,
    /// Kind of the variables.
    pub kind: Kind,
}

/// `coefficient * left * right` in row `row`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BilinearTerm {
    /// Row of the level.
    pub row: usize,
    /// First factor.
    pub left: VariableRef,
    /// Second factor.
    pub right: VariableRef,
    /// Coefficient.
    pub coefficient: f64,
}

/// `coefficient * left * right` in the objective.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ObjectiveBilinearTerm {
    /// First factor.
    pub left: VariableRef,
    /// Second factor.
    pub right: VariableRef,
    /// Coefficient.
    pub coefficient: f64,
}

/// One decision maker.
///
/// The objective is `sense <c, x> + d + bilinear terms`, the rows are `A x + bilinear terms ~ b`
/// where `~` is the row sense shared by all rows.
#[derive(Clone, Debug, PartialEq)]
pub struct Level {
    /// Name, used in diagnostics and generated names.
    pub name: String,
    /// Enclosing level, `None` for the upper level.
    pub parent: Option<LevelId>,
    /// Owned variables, by kind.
    pub variables: EnumMap<Kind, VariableBundle>,
    /// Ancestor variables this level treats as parameters.
    pub fixed: Vec<VariableRef>,
    /// Direction of the objective.
    pub sense: Sense,
    /// Dense linear objective coefficients by block.
    pub c: BTreeMap<Block, Vec<f64>>,
    /// Objective constant.
    pub d: f64,
    /// Bilinear objective terms.
    pub objective_bilinear: Vec<ObjectiveBilinearTerm>,
    /// Constraint coefficients by block.
    pub a: BTreeMap<Block, SparseMatrix>,
    /// Bilinear constraint terms.
    pub bilinear: Vec<BilinearTerm>,
    /// Right hand side.
    pub b: Vec<f64>,
    /// Names of the rows.
    pub row_names: Vec<String>,
    /// Relation between the rows and `b`.
    pub row_sense: RowSense,
}

impl Level {
    /// Create a level without variables, rows or objective terms.
    #[must_use]
    pub fn new(name: impl Into<String>, parent: Option<LevelId>, sense: Sense) -> Self {
        Self {
            name: name.into(),
            parent,
            variables: EnumMap::default(),
            fixed: Vec::new(),
            sense,
            c: BTreeMap::new(),
            d: 0_f64,
            objective_bilinear: Vec::new(),
            a: BTreeMap::new(),
            bilinear: Vec::new(),
            b: Vec::new(),
            row_names: Vec::new(),
            row_sense: RowSense::Less,
        }
    }

    /// Number of rows.
    #[must_use]
    pub fn nr_rows(&self) -> usize {
        self.b.len()
    }

    /// Number of owned variables over all kinds.
    #[must_use]
    pub fn nr_variables(&self) -> usize {
        self.variables.values().map(VariableBundle::len).sum()
    }

    /// Linear terms of row `row`, ordered by block and column.
    #[must_use]
    pub fn row(&self, row: usize) -> Vec<(VariableRef, f64)> {
        debug_assert!(row < self.nr_rows());

        self.a.iter()
            .flat_map(|(block, matrix)| {
                matrix.row(row).into_iter()
                    .map(move |(j, value)| (VariableRef::new(block.level, block.kind, j), value))
            })
            .collect()
    }

    /// Bilinear terms of row `row`.
    pub fn row_bilinear(&self, row: usize) -> impl Iterator<Item = &BilinearTerm> {
        self.bilinear.iter().filter(move |term| term.row == row)
    }

    /// Nonzero linear objective terms, ordered by block and column.
    #[must_use]
    pub fn objective_terms(&self) -> Vec<(VariableRef, f64)> {
        self.c.iter()
            .flat_map(|(block, values)| {
                values.iter().enumerate()
                    .filter(|&(_, &value)| value != 0_f64)
                    .map(move |(j, &value)| (VariableRef::new(block.level, block.kind, j), value))
            })
            .collect()
    }

    /// Objective coefficient of a variable, zero if there is no block for it.
    #[must_use]
    pub fn objective_coefficient(&self, variable: VariableRef) -> f64 {
        self.c.get(&variable.block()).map_or(0_f64, |values| values[variable.index])
    }

    /// Whether the linear part of the objective is zero.
    #[must_use]
    pub fn has_linear_objective(&self) -> bool {
        self.c.values().flatten().any(|&value| value != 0_f64)
    }

    /// Flip the direction of the objective without changing its meaning.
    pub fn negate_objective(&mut self) {
        self.sense = !self.sense;
        for values in self.c.values_mut() {
            for value in values {
                *value = -*value;
            }
        }
        self.d = -self.d;
        for term in &mut self.objective_bilinear {
            term.coefficient = -term.coefficient;
        }
    }

    /// Whether `variable` is one of this level's parameters.
    #[must_use]
    pub fn is_fixed(&self, variable: VariableRef) -> bool {
        self.fixed.contains(&variable)
    }
}

/// An upper level and a tree of lower levels.
#[derive(Clone, Debug, PartialEq)]
pub struct MultilevelProblem {
    levels: Vec<Level>,
}

impl MultilevelProblem {
    /// Create a problem with an empty minimizing upper level.
    #[must_use]
    pub fn new() -> Self {
        Self { levels: vec![Level::new("U", None, Sense::Minimize)] }
    }

    /// Add a lower level.
    ///
    /// # Arguments
    ///
    /// * `parent`: Level that reacts to the new level's decisions, usually `LevelId::UPPER`.
    pub fn add_lower_level(&mut self, parent: LevelId, name: impl Into<String>, sense: Sense) -> LevelId {
        debug_assert!(parent.0 < self.levels.len());

        self.levels.push(Level::new(name, Some(parent), sense));
        LevelId(self.levels.len() - 1)
    }

    /// Number of levels, including the upper level.
    #[must_use]
    pub fn nr_levels(&self) -> usize {
        self.levels.len()
    }

    /// Get a level.
    #[must_use]
    pub fn level(&self, id: LevelId) -> &Level {
        &self.levels[id.0]
    }

    /// Get a level for modification.
    ///
    /// Shapes should only be changed through the methods on this struct.
    pub fn level_mut(&mut self, id: LevelId) -> &mut Level {
        &mut self.levels[id.0]
    }

    /// The upper level.
    #[must_use]
    pub fn upper(&self) -> &Level {
        &self.levels[0]
    }

    /// All levels with their ids.
    pub fn levels(&self) -> impl Iterator<Item = (LevelId, &Level)> {
        self.levels.iter().enumerate().map(|(i, level)| (LevelId(i), level))
    }

    /// Ids of all levels except the upper one.
    pub fn lower_levels(&self) -> impl Iterator<Item = LevelId> {
        (1..self.levels.len()).map(LevelId)
    }

    /// Levels directly below `parent`.
    pub fn children(&self, parent: LevelId) -> impl Iterator<Item = LevelId> + '_ {
        self.levels()
            .filter(move |(_, level)| level.parent == Some(parent))
            .map(|(id, _)| id)
    }

    /// Number of edges between the level and the upper level.
    #[must_use]
    pub fn depth(&self, level: LevelId) -> usize {
        let mut depth = 0;
        let mut current = self.levels[level.0].parent;
        while let Some(parent) = current {
            depth += 1;
            current = self.levels[parent.0].parent;
        }

        depth
    }

    /// Whether `ancestor` is a strict ancestor of `level`.
    #[must_use]
    pub fn is_ancestor(&self, ancestor: LevelId, level: LevelId) -> bool {
        let mut current = self.levels.get(level.0).and_then(|level| level.parent);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.levels.get(parent.0).and_then(|level| level.parent);
        }

        false
    }

    /// Number of variables of a kind owned by a level.
    #[must_use]
    pub fn nr_variables(&self, block: Block) -> usize {
        self.levels[block.level.0].variables[block.kind].len()
    }

    /// All variables of all levels, by level, kind and index.
    pub fn variable_refs(&self) -> impl Iterator<Item = VariableRef> + '_ {
        self.levels().flat_map(|(id, level)| {
            Kind::ALL.into_iter().flat_map(move |kind| {
                (0..level.variables[kind].len()).map(move |index| VariableRef::new(id, kind, index))
            })
        })
    }

    /// Bundle owning a variable.
    #[must_use]
    pub fn bundle(&self, variable: VariableRef) -> &VariableBundle {
        &self.levels[variable.level.0].variables[variable.kind]
    }

    /// (lower, upper) of a variable.
    #[must_use]
    pub fn bounds(&self, variable: VariableRef) -> (f64, f64) {
        self.bundle(variable).bounds(variable.index)
    }

    /// Name of a variable.
    #[must_use]
    pub fn name(&self, variable: VariableRef) -> &str {
        &self.bundle(variable).names[variable.index]
    }

    /// Solution value of a variable.
    #[must_use]
    pub fn value(&self, variable: VariableRef) -> Option<f64> {
        self.bundle(variable).values[variable.index]
    }

    /// Store a solution value.
    pub fn set_value(&mut self, variable: VariableRef, value: f64) {
        self.levels[variable.level.0].variables[variable.kind].values[variable.index] = Some(value);
    }

    /// Append a variable to a bundle, extending every block that references the bundle.
    pub fn add_variable(
        &mut self,
        level: LevelId,
        kind: Kind,
        name: impl Into<String>,
        lower: f64,
        upper: f64,
    ) -> VariableRef {
        let index = self.levels[level.0].variables[kind].push(name, lower, upper);
        let block = Block { level, kind };
        for other in &mut self.levels {
            if let Some(values) = other.c.get_mut(&block) {
                values.push(0_f64);
            }
            if let Some(matrix) = other.a.get_mut(&block) {
                let nr_rows = matrix.nr_rows();
                matrix.resize(nr_rows, index + 1);
            }
        }

        VariableRef::new(level, kind, index)
    }

    /// Declare a variable of an ancestor as a parameter of `level`.
    pub fn add_fixed(&mut self, level: LevelId, variable: VariableRef) {
        debug_assert!(self.is_ancestor(variable.level, level));

        let fixed = &mut self.levels[level.0].fixed;
        if !fixed.contains(&variable) {
            fixed.push(variable);
        }
    }

    /// Add `value` to the objective coefficient of `variable` in `level`.
    pub fn add_objective_coefficient(&mut self, level: LevelId, variable: VariableRef, value: f64) {
        let size = self.nr_variables(variable.block());
        self.levels[level.0].c.entry(variable.block()).or_insert_with(|| vec![0_f64; size])[variable.index] += value;
    }

    /// Add a bilinear term to the objective of `level`.
    pub fn add_objective_bilinear(
        &mut self,
        level: LevelId,
        left: VariableRef,
        right: VariableRef,
        coefficient: f64,
    ) {
        self.levels[level.0].objective_bilinear.push(ObjectiveBilinearTerm { left, right, coefficient });
    }

    /// Append a row to `level`.
    ///
    /// # Arguments
    ///
    /// * `terms`: Linear terms, duplicates are summed.
    /// * `rhs`: Right hand side.
    ///
    /// # Return value
    ///
    /// Index of the new row.
    pub fn add_row(
        &mut self,
        level: LevelId,
        terms: &[(VariableRef, f64)],
        rhs: f64,
        name: impl Into<String>,
    ) -> usize {
        let row = self.levels[level.0].nr_rows();
        for &(variable, _) in terms {
            let nr_columns = self.nr_variables(variable.block());
            self.levels[level.0].a.entry(variable.block())
                .or_insert_with(|| SparseMatrix::new(row, nr_columns));
        }

        let target = &mut self.levels[level.0];
        for matrix in target.a.values_mut() {
            let nr_columns = matrix.nr_columns();
            matrix.resize(row + 1, nr_columns);
        }
        for &(variable, value) in terms {
            if let Some(matrix) = target.a.get_mut(&variable.block()) {
                matrix.add(row, variable.index, value);
            }
        }
        target.b.push(rhs);
        target.row_names.push(name.into());

        row
    }

    /// Add a bilinear term to an existing row of `level`.
    pub fn add_bilinear(
        &mut self,
        level: LevelId,
        row: usize,
        left: VariableRef,
        right: VariableRef,
        coefficient: f64,
    ) {
        debug_assert!(row < self.levels[level.0].nr_rows());

        self.levels[level.0].bilinear.push(BilinearTerm { row, left, right, coefficient });
    }

    /// Value of the objective of `level` at the given point.
    pub fn objective_value(&self, level: LevelId, value: impl Fn(VariableRef) -> f64) -> f64 {
        let level = &self.levels[level.0];

        level.d
            + level.objective_terms().into_iter().map(|(variable, c)| c * value(variable)).sum::<f64>()
            + level.objective_bilinear.iter()
                .map(|term| term.coefficient * value(term.left) * value(term.right))
                .sum::<f64>()
    }

    /// Left hand sides of the rows of `level` at the given point.
    pub fn row_activities(&self, level: LevelId, value: impl Fn(VariableRef) -> f64) -> Vec<f64> {
        let level = &self.levels[level.0];

        let mut activities = vec![0_f64; level.nr_rows()];
        for (block, matrix) in &level.a {
            for (i, j, a) in matrix.iter() {
                activities[i] += a * value(VariableRef::new(block.level, block.kind, j));
            }
        }
        for term in &level.bilinear {
            activities[term.row] += term.coefficient * value(term.left) * value(term.right);
        }

        activities
    }

    /// Largest violation of a bound or row of any level at the given point.
    pub fn max_violation(&self, value: impl Fn(VariableRef) -> f64) -> f64 {
        let bounds = self.variable_refs()
            .map(|variable| {
                let (lower, upper) = self.bounds(variable);
                let x = value(variable);
                (lower - x).max(x - upper)
            });
        let rows = self.levels().flat_map(|(id, level)| {
            self.row_activities(id, &value).into_iter().zip(&level.b)
                .map(move |(activity, &rhs)| match level.row_sense {
                    RowSense::Less => activity - rhs,
                    RowSense::Equal => (activity - rhs).abs(),
                })
                .collect::<Vec<_>>()
        });

        bounds.chain(rows).fold(0_f64, f64::max)
    }

    /// Verify the shape invariants.
    ///
    /// # Errors
    ///
    /// `Error::ShapeMismatch` describing the first violated invariant.
    pub fn check(&self) -> Result<(), Error> {
        for (id, level) in self.levels() {
            for (kind, bundle) in &level.variables {
                if !bundle.is_consistent() {
                    return Err(Error::ShapeMismatch(format!(
                        "bound, value and name arrays of {id}.{kind} differ in length",
                    )));
                }
            }
            if level.row_names.len() != level.nr_rows() {
                return Err(Error::ShapeMismatch(format!(
                    "{id} has {} row names but {} rows", level.row_names.len(), level.nr_rows(),
                )));
            }
            if let Some(parent) = level.parent {
                if parent.0 >= id.0 {
                    return Err(Error::ShapeMismatch(format!("{id} has parent {parent} declared after it")));
                }
            } else if id != LevelId::UPPER {
                return Err(Error::ShapeMismatch(format!("{id} has no parent")));
            }

            for (block, values) in &level.c {
                let expected = self.checked_size(*block)?;
                if values.len() != expected {
                    return Err(Error::ShapeMismatch(format!(
                        "c[{id}, {}, {}] has length {} but there are {expected} variables",
                        block.level, block.kind, values.len(),
                    )));
                }
            }
            for (block, matrix) in &level.a {
                let expected = self.checked_size(*block)?;
                if matrix.nr_columns() != expected || matrix.nr_rows() != level.nr_rows() {
                    return Err(Error::ShapeMismatch(format!(
                        "A[{id}, {}, {}] is {}x{} but should be {}x{expected}",
                        block.level, block.kind, matrix.nr_rows(), matrix.nr_columns(), level.nr_rows(),
                    )));
                }
            }

            let references = level.fixed.iter().copied()
                .chain(level.bilinear.iter().flat_map(|term| [term.left, term.right]))
                .chain(level.objective_bilinear.iter().flat_map(|term| [term.left, term.right]));
            for variable in references {
                if variable.index >= self.checked_size(variable.block())? {
                    return Err(Error::ShapeMismatch(format!("{id} refers to nonexistent variable {variable}")));
                }
            }
            for &variable in &level.fixed {
                if !self.is_ancestor(variable.level, id) {
                    return Err(Error::ShapeMismatch(format!(
                        "fixed variable {variable} of {id} is not owned by an ancestor",
                    )));
                }
            }
            if let Some(term) = level.bilinear.iter().find(|term| term.row >= level.nr_rows()) {
                return Err(Error::ShapeMismatch(format!("{id} has a bilinear term in nonexistent row {}", term.row)));
            }
        }

        Ok(())
    }

    fn checked_size(&self, block: Block) -> Result<usize, Error> {
        self.levels.get(block.level.0)
            .map(|level| level.variables[block.kind].len())
            .ok_or_else(|| Error::ShapeMismatch(format!("reference to nonexistent level {}", block.level)))
    }

    /// Whether the shape invariants hold.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.check().is_ok()
    }
}

impl Default for MultilevelProblem {
    fn default() -> Self {
        Self::new()
    }
}

fn format_term(f: &mut fmt::Formatter<'_>, first: bool, coefficient: f64, factors: &str) -> fmt::Result {
    match (first, coefficient < 0_f64) {
        (true, false) => write!(f, "{coefficient} {factors}"),
        (true, true) => write!(f, "-{} {factors}", -coefficient),
        (false, false) => write!(f, " + {coefficient} {factors}"),
        (false, true) => write!(f, " - {} {factors}", -coefficient),
    }
}

impl fmt::Display for MultilevelProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (id, level) in self.levels() {
            match level.parent {
                None => writeln!(f, "{id} ({})", level.name)?,
                Some(parent) => writeln!(f, "{id} ({}) below {parent}", level.name)?,
            }
            if !level.fixed.is_empty() {
                writeln!(f, "  fixed: {}", level.fixed.iter().map(|&v| self.name(v)).join(", "))?;
            }
            for (kind, bundle) in &level.variables {
                for i in 0..bundle.len() {
                    writeln!(f, "  {kind} {} in [{}, {}]", bundle.names[i], bundle.lower[i], bundle.upper[i])?;
                }
            }

            write!(f, "  {} ", level.sense)?;
            let mut first = true;
            for (variable, c) in level.objective_terms() {
                format_term(f, first, c, self.name(variable))?;
                first = false;
            }
            for term in &level.objective_bilinear {
                format_term(f, first, term.coefficient, &format!("{}*{}", self.name(term.left), self.name(term.right)))?;
                first = false;
            }
            if level.d != 0_f64 || first {
                format_term(f, first, level.d, "")?;
            }
            writeln!(f)?;

            for row in 0..level.nr_rows() {
                write!(f, "  {}: ", level.row_names[row])?;
                let mut first = true;
                for (variable, a) in level.row(row) {
                    format_term(f, first, a, self.name(variable))?;
                    first = false;
                }
                for term in level.row_bilinear(row) {
                    format_term(f, first, term.coefficient, &format!("{}*{}", self.name(term.left), self.name(term.right)))?;
                    first = false;
                }
                if first {
                    f.write_str("0")?;
                }
                writeln!(f, " {} {}", level.row_sense, level.b[row])?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn small() -> (MultilevelProblem, VariableRef, VariableRef) {
        let mut problem = MultilevelProblem::new();
        let lower = problem.add_lower_level(LevelId::UPPER, "follower", Sense::Maximize);
        let x = problem.add_variable(LevelId::UPPER, Kind::Real, "x", 0_f64, f64::INFINITY);
        let y = problem.add_variable(lower, Kind::Real, "y", 0_f64, 4_f64);
        problem.add_fixed(lower, x);
        problem.add_objective_coefficient(LevelId::UPPER, x, 1_f64);
        problem.add_objective_coefficient(LevelId::UPPER, y, -2_f64);
        problem.add_objective_coefficient(lower, y, 1_f64);
        problem.add_row(lower, &[(x, 1_f64), (y, 1_f64)], 5_f64, "c");

        (problem, x, y)
    }

    #[test]
    fn shapes_follow_additions() {
        let (mut problem, x, _) = small();
        assert!(problem.is_consistent());

        let lower = LevelId(1);
        let z = problem.add_variable(lower, Kind::Real, "z", 0_f64, f64::INFINITY);
        assert!(problem.is_consistent());
        assert_eq!(problem.level(LevelId::UPPER).c[&z.block()].len(), 2);
        assert_eq!(problem.level(lower).a[&z.block()].nr_columns(), 2);

        problem.add_row(lower, &[(z, 1_f64), (x, 2_f64), (x, 1_f64)], 1_f64, "d");
        assert!(problem.is_consistent());
        assert_eq!(problem.level(lower).row(1), vec![(x, 3_f64), (z, 1_f64)]);
        assert_eq!(problem.depth(lower), 1);
        assert!(problem.is_ancestor(LevelId::UPPER, lower));
        assert!(!problem.is_ancestor(lower, LevelId::UPPER));
    }

    #[test]
    fn check_detects_mismatch() {
        let (mut problem, x, _) = small();
        problem.level_mut(LevelId::UPPER).c.get_mut(&x.block()).unwrap().push(1_f64);
        assert!(matches!(problem.check(), Err(Error::ShapeMismatch(_))));

        let (mut problem, _, y) = small();
        problem.level_mut(LevelId(1)).fixed.push(y);
        assert!(matches!(problem.check(), Err(Error::ShapeMismatch(_))));

        let (mut problem, _, _) = small();
        problem.level_mut(LevelId(1)).b.push(0_f64);
        assert!(problem.check().is_err());
    }

    #[test]
    fn evaluation() {
        let (mut problem, x, y) = small();
        problem.add_bilinear(LevelId(1), 0, x, y, 1_f64);
        let point = |v: VariableRef| if v == x { 1_f64 } else { 2_f64 };

        assert_eq!(problem.objective_value(LevelId::UPPER, point), -3_f64);
        assert_eq!(problem.row_activities(LevelId(1), point), vec![5_f64]);
        assert_eq!(problem.max_violation(point), 0_f64);
        assert_eq!(problem.max_violation(|_| 5_f64), 30_f64);
    }

    #[test]
    fn negate_objective() {
        let (mut problem, _, y) = small();
        let level = problem.level_mut(LevelId(1));
        level.d = 2_f64;
        level.negate_objective();
        assert_eq!(level.sense, Sense::Minimize);
        assert_eq!(level.objective_coefficient(y), -1_f64);
        assert_eq!(level.d, -2_f64);
    }

    #[test]
    fn display() {
        let (problem, _, _) = small();
        let text = problem.to_string();
        assert!(text.contains("L1 (follower) below U"));
        assert!(text.contains("c: 1 x + 1 y <= 5"));
        assert!(text.contains("min 1 x - 2 y"));
    }
}
