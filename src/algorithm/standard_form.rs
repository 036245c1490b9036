//! # Standard form
//!
//! Rewrites a `MultilevelProblem` such that all real variables are nonnegative without upper
//! bound and all rows are equalities. Integer and binary variables are left untouched.
//!
//! Real variable `j` of a level keeps column `j`, the variables that are introduced (negative parts
//! of free variables, slacks of range rows and slacks of inequality rows) are appended to the real
//! bundle of the level that owns the substituted variable or the row. As a result, converting a
//! problem that is already in standard form reproduces it.
use std::collections::BTreeMap;

use tracing::debug;

use crate::algorithm::recovery::{AffineMap, RecoveryMap};
use crate::data::elements::RowSense;
use crate::data::level::{Kind, LevelId, MultilevelProblem, VariableRef};
use crate::data::linear_algebra::matrix::SparseMatrix;
use crate::error::Error;

/// How an original real variable is expressed in the new variables: `offset + sign x' - x_minus`.
#[derive(Copy, Clone, Debug, PartialEq)]
struct Substitution {
    offset: f64,
    sign: f64,
    negative_part: Option<VariableRef>,
    /// Length of the interval, when both bounds are finite.
    width: Option<f64>,
}

impl Substitution {
    fn shift(offset: f64, sign: f64) -> Self {
        Self { offset, sign, negative_part: None, width: None }
    }

    fn map(&self, variable: VariableRef) -> AffineMap {
        let mut terms = vec![(variable, self.sign)];
        if let Some(negative_part) = self.negative_part {
            terms.push((negative_part, -1_f64));
        }

        AffineMap { offset: self.offset, terms }
    }
}

/// A problem in standard form, with the maps back to the original problem.
#[derive(Clone, Debug)]
pub struct StandardForm {
    /// The converted problem.
    pub problem: MultilevelProblem,
    /// Original variables in terms of the converted ones.
    pub recovery: RecoveryMap,
    substitutions: BTreeMap<VariableRef, Substitution>,
    /// Variables that close a single row (with coefficient one): (level, row, slack).
    slacks: Vec<(LevelId, usize, VariableRef)>,
}

/// Convert a problem to standard form.
///
/// The input is not modified.
///
/// # Errors
///
/// When the shapes are inconsistent or a variable has an empty domain.
pub fn standard_form(problem: &MultilevelProblem) -> Result<StandardForm, Error> {
    problem.check()?;

    let mut result = problem.clone();
    for id in problem.levels().map(|(id, _)| id).collect::<Vec<_>>() {
        let level = result.level_mut(id);
        level.c.clear();
        level.a.clear();
        level.bilinear.clear();
        level.objective_bilinear.clear();
    }

    let substitutions = substitute_reals(problem, &mut result)?;
    let expand = |variable: VariableRef| match substitutions.get(&variable) {
        Some(substitution) => substitution.map(variable),
        None => AffineMap::identity(variable),
    };

    for (id, level) in problem.levels() {
        for (variable, coefficient) in level.objective_terms() {
            let map = expand(variable);
            result.level_mut(id).d += coefficient * map.offset;
            for (new, factor) in map.terms {
                add_objective_coefficient(&mut result, id, new, coefficient * factor);
            }
        }
        for term in &level.objective_bilinear {
            let (constant, linear, bilinear) = multiply(&expand(term.left), &expand(term.right));
            result.level_mut(id).d += term.coefficient * constant;
            for (new, factor) in linear {
                add_objective_coefficient(&mut result, id, new, term.coefficient * factor);
            }
            for (left, right, factor) in bilinear {
                if term.coefficient * factor != 0_f64 {
                    result.add_objective_bilinear(id, left, right, term.coefficient * factor);
                }
            }
        }

        for (block, matrix) in &level.a {
            for (i, j, value) in matrix.iter() {
                let map = expand(VariableRef::new(block.level, block.kind, j));
                result.level_mut(id).b[i] -= value * map.offset;
                for (new, factor) in map.terms {
                    add_coefficient(&mut result, id, i, new, value * factor);
                }
            }
        }
        for term in &level.bilinear {
            let (constant, linear, bilinear) = multiply(&expand(term.left), &expand(term.right));
            result.level_mut(id).b[term.row] -= term.coefficient * constant;
            for (new, factor) in linear {
                add_coefficient(&mut result, id, term.row, new, term.coefficient * factor);
            }
            for (left, right, factor) in bilinear {
                if term.coefficient * factor != 0_f64 {
                    result.add_bilinear(id, term.row, left, right, term.coefficient * factor);
                }
            }
        }
    }

    let mut slacks = Vec::new();
    for (&variable, substitution) in &substitutions {
        let Some(width) = substitution.width else { continue };

        let name = format!("range[{}]", problem.name(variable));
        match result.level(variable.level).row_sense {
            RowSense::Less => {
                result.add_row(variable.level, &[(variable, 1_f64)], width, name);
            },
            RowSense::Equal => {
                let slack = result.add_variable(
                    variable.level, Kind::Real, format!("slack[{name}]"), 0_f64, f64::INFINITY,
                );
                let row = result.add_row(variable.level, &[(variable, 1_f64), (slack, 1_f64)], width, name);
                slacks.push((variable.level, row, slack));
            },
        }
    }

    for id in result.levels().map(|(id, _)| id).collect::<Vec<_>>() {
        if result.level(id).row_sense == RowSense::Less {
            for row in 0..result.level(id).nr_rows() {
                let name = format!("slack[{}]", result.level(id).row_names[row]);
                let slack = result.add_variable(id, Kind::Real, name, 0_f64, f64::INFINITY);
                add_coefficient(&mut result, id, row, slack, 1_f64);
                slacks.push((id, row, slack));
            }
            result.level_mut(id).row_sense = RowSense::Equal;
        }

        let level = result.level_mut(id);
        level.c.retain(|_, values| values.iter().any(|&value| value != 0_f64));
        level.a.retain(|_, matrix| matrix.nr_nonzeros() > 0);
    }

    let mut recovery = RecoveryMap::new();
    for variable in problem.variable_refs() {
        recovery.insert(variable, expand(variable));
    }

    debug_assert!(result.is_consistent());
    debug!(
        substituted = substitutions.values().filter(|s| s.offset != 0_f64 || s.sign != 1_f64).count(),
        split = substitutions.values().filter(|s| s.negative_part.is_some()).count(),
        slacks = slacks.len(),
        "converted to standard form",
    );

    Ok(StandardForm { problem: result, recovery, substitutions, slacks })
}

/// Decide on the substitution of every real variable, appending negative parts of free variables
/// and resetting all real bounds to `[0, inf)`.
fn substitute_reals(
    problem: &MultilevelProblem,
    result: &mut MultilevelProblem,
) -> Result<BTreeMap<VariableRef, Substitution>, Error> {
    let mut substitutions = BTreeMap::new();

    for variable in problem.variable_refs().filter(|v| v.kind == Kind::Real) {
        let (lower, upper) = problem.bounds(variable);
        if lower > upper || lower == f64::INFINITY || upper == f64::NEG_INFINITY {
            return Err(Error::InvalidModel(format!(
                "variable `{}` has empty domain [{lower}, {upper}]", problem.name(variable),
            )));
        }

        let substitution = match (lower.is_finite(), upper.is_finite()) {
            (true, false) => Substitution::shift(lower, 1_f64),
            (false, true) => Substitution::shift(upper, -1_f64),
            (true, true) => Substitution { width: Some(upper - lower), ..Substitution::shift(lower, 1_f64) },
            (false, false) => {
                let name = format!("{}_minus", problem.name(variable));
                let negative_part = result.add_variable(variable.level, Kind::Real, name, 0_f64, f64::INFINITY);
                Substitution { negative_part: Some(negative_part), ..Substitution::shift(0_f64, 1_f64) }
            },
        };

        let bundle = &mut result.level_mut(variable.level).variables[Kind::Real];
        bundle.lower[variable.index] = 0_f64;
        bundle.upper[variable.index] = f64::INFINITY;
        substitutions.insert(variable, substitution);
    }

    Ok(substitutions)
}

/// Expand the product of two affine maps.
///
/// # Return value
///
/// The constant, the linear terms and the products.
#[allow(clippy::type_complexity)]
fn multiply(
    left: &AffineMap,
    right: &AffineMap,
) -> (f64, Vec<(VariableRef, f64)>, Vec<(VariableRef, VariableRef, f64)>) {
    let constant = left.offset * right.offset;
    let linear = left.terms.iter().map(|&(variable, a)| (variable, a * right.offset))
        .chain(right.terms.iter().map(|&(variable, b)| (variable, b * left.offset)))
        .filter(|&(_, value)| value != 0_f64)
        .collect();
    let bilinear = left.terms.iter()
        .flat_map(|&(l, a)| right.terms.iter().map(move |&(r, b)| (l, r, a * b)))
        .collect();

    (constant, linear, bilinear)
}

fn add_objective_coefficient(problem: &mut MultilevelProblem, level: LevelId, variable: VariableRef, value: f64) {
    if value != 0_f64 {
        problem.add_objective_coefficient(level, variable, value);
    }
}

fn add_coefficient(problem: &mut MultilevelProblem, level: LevelId, row: usize, variable: VariableRef, value: f64) {
    if value == 0_f64 {
        return;
    }

    let nr_rows = problem.level(level).nr_rows();
    let nr_columns = problem.nr_variables(variable.block());
    problem.level_mut(level).a.entry(variable.block())
        .or_insert_with(|| SparseMatrix::new(nr_rows, nr_columns))
        .add(row, variable.index, value);
}

impl StandardForm {
    /// Map a point of the original problem to the converted problem.
    ///
    /// Negative parts take the negative part of free variables and slacks close their rows, such
    /// that a feasible point maps to a feasible point with the same objective values.
    ///
    /// # Arguments
    ///
    /// * `value`: Values of the original variables.
    pub fn forward(&self, value: impl Fn(VariableRef) -> f64) -> BTreeMap<VariableRef, f64> {
        let mut point = self.problem.variable_refs()
            .map(|variable| (variable, 0_f64))
            .collect::<BTreeMap<_, _>>();

        for variable in self.recovery.originals() {
            let x = value(variable);
            match self.substitutions.get(&variable) {
                Some(Substitution { negative_part: Some(negative_part), .. }) => {
                    point.insert(variable, x.max(0_f64));
                    point.insert(*negative_part, (-x).max(0_f64));
                },
                Some(substitution) => { point.insert(variable, substitution.sign * (x - substitution.offset)); },
                None => { point.insert(variable, x); },
            }
        }

        let activities = self.problem.levels()
            .map(|(id, _)| self.problem.row_activities(id, |v| point[&v]))
            .collect::<Vec<_>>();
        for &(level, row, slack) in &self.slacks {
            point.insert(slack, self.problem.level(level).b[row] - activities[level.0][row]);
        }

        point
    }

    /// Values of the original variables, given values of the converted ones.
    pub fn recover(&self, value: impl Fn(VariableRef) -> Option<f64>) -> BTreeMap<VariableRef, f64> {
        self.recovery.recover(value)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::data::elements::Sense;

    /// Upper level with a lower bounded, an upper bounded, a range and a free variable.
    fn mixed_bounds(row_sense: RowSense) -> MultilevelProblem {
        let mut problem = MultilevelProblem::new();
        let u = LevelId::UPPER;
        let a = problem.add_variable(u, Kind::Real, "a", 2_f64, f64::INFINITY);
        let b = problem.add_variable(u, Kind::Real, "b", f64::NEG_INFINITY, 3_f64);
        let c = problem.add_variable(u, Kind::Real, "c", -1_f64, 1_f64);
        let d = problem.add_variable(u, Kind::Real, "d", f64::NEG_INFINITY, f64::INFINITY);
        let z = problem.add_variable(u, Kind::Integer, "z", 0_f64, 4_f64);
        for (variable, coefficient) in [(a, 1_f64), (b, -1_f64), (c, 2_f64), (d, 1_f64), (z, 1_f64)] {
            problem.add_objective_coefficient(u, variable, coefficient);
        }
        problem.add_row(u, &[(a, 1_f64), (b, 1_f64), (c, 1_f64), (d, 1_f64)], 10_f64, "sum");
        problem.add_row(u, &[(d, 1_f64), (z, -1_f64)], 1_f64, "link");
        problem.level_mut(u).row_sense = row_sense;

        let lower = problem.add_lower_level(u, "lower", Sense::Maximize);
        let y = problem.add_variable(lower, Kind::Real, "y", 1_f64, f64::INFINITY);
        problem.add_fixed(lower, c);
        problem.add_objective_coefficient(lower, y, 1_f64);
        problem.add_row(lower, &[(y, 1_f64)], 5_f64, "cap");
        problem.add_bilinear(lower, 0, c, y, 1_f64);

        problem
    }

    #[test]
    fn bounds_and_rows() {
        let converted = standard_form(&mixed_bounds(RowSense::Less)).unwrap();
        let problem = &converted.problem;
        let upper = problem.upper();

        assert_eq!(upper.row_sense, RowSense::Equal);
        // a, b, c, d, d_minus, 3 row slacks
        assert_eq!(upper.variables[Kind::Real].len(), 8);
        assert!(upper.variables[Kind::Real].lower.iter().all(|&l| l == 0_f64));
        assert!(upper.variables[Kind::Real].upper.iter().all(|&u| u == f64::INFINITY));
        assert_eq!(upper.variables[Kind::Integer].bounds(0), (0_f64, 4_f64));
        // sum: (a' + 2) + (3 - b') + (c' - 1) + (d' - d-) <= 10
        assert_eq!(upper.b, vec![6_f64, 1_f64, 2_f64]);
        assert_eq!(upper.row_names[2], "range[c]");
        assert_eq!(upper.d, 2_f64 - 3_f64 - 2_f64);

        let lower = problem.level(LevelId(1));
        // (c' - 1) (y' + 1) + y' + 1 <= 5
        assert_eq!(lower.b, vec![5_f64]);
        assert_eq!(lower.bilinear.len(), 1);
        assert!(problem.is_consistent());
    }

    #[test]
    fn range_with_equalities() {
        let converted = standard_form(&mixed_bounds(RowSense::Equal)).unwrap();
        let upper = converted.problem.upper();

        // a, b, c, d, d_minus, range slack
        assert_eq!(upper.variables[Kind::Real].len(), 6);
        assert_eq!(upper.nr_rows(), 3);
        assert_eq!(upper.row(2).len(), 2);
    }

    #[test]
    fn idempotent() {
        for row_sense in [RowSense::Less, RowSense::Equal] {
            let once = standard_form(&mixed_bounds(row_sense)).unwrap();
            let twice = standard_form(&once.problem).unwrap();
            assert_eq!(once.problem, twice.problem);
        }
    }

    #[test]
    fn forward_and_recover() {
        let original = mixed_bounds(RowSense::Less);
        let converted = standard_form(&original).unwrap();

        let values = [3_f64, 1_f64, 0.5, -2_f64, 1_f64, 2_f64];
        let point = |v: VariableRef| match (v.level.0, v.kind) {
            (0, Kind::Real) => values[v.index],
            (0, Kind::Integer) => values[4],
            _ => values[5],
        };
        assert_eq!(original.max_violation(point), 0_f64);

        let image = converted.forward(point);
        let image_value = |v: VariableRef| image[&v];
        assert!(converted.problem.max_violation(image_value) < 1e-12);
        for (id, _) in original.levels() {
            let expected = original.objective_value(id, point);
            assert!((converted.problem.objective_value(id, image_value) - expected).abs() < 1e-12);
        }

        let recovered = converted.recover(|v| image.get(&v).copied());
        for variable in original.variable_refs() {
            assert!((recovered[&variable] - point(variable)).abs() < 1e-12);
        }
    }
}
