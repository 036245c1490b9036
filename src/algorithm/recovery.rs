//! # Solution recovery
//!
//! Transformations that substitute variables record, for every variable they remove, an affine
//! function of the variables that replace it. Once the transformed problem is solved, these maps
//! give back the values of the original variables, which are then written into the level
//! representation or the authored model.
use std::collections::BTreeMap;

use crate::data::level::{MultilevelProblem, VariableRef};
use crate::data::model::{Model, VarId};

/// `offset + sum coefficient * variable`.
#[derive(Clone, Debug, PartialEq)]
pub struct AffineMap {
    /// Constant part.
    pub offset: f64,
    /// Linear part, in terms of the variables of the transformed problem.
    pub terms: Vec<(VariableRef, f64)>,
}

impl AffineMap {
    /// The map `x -> x`.
    #[must_use]
    pub fn identity(variable: VariableRef) -> Self {
        Self { offset: 0_f64, terms: vec![(variable, 1_f64)] }
    }

    /// Evaluate the map.
    ///
    /// # Return value
    ///
    /// `None` if one of the variables in the linear part has no value.
    pub fn evaluate(&self, value: impl Fn(VariableRef) -> Option<f64>) -> Option<f64> {
        self.terms.iter()
            .map(|&(variable, coefficient)| value(variable).map(|x| coefficient * x))
            .sum::<Option<f64>>()
            .map(|total| self.offset + total)
    }
}

/// Affine maps for all variables of an original problem.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecoveryMap {
    maps: BTreeMap<VariableRef, AffineMap>,
}

impl RecoveryMap {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the map of an original variable.
    pub fn insert(&mut self, original: VariableRef, map: AffineMap) {
        self.maps.insert(original, map);
    }

    /// The map of an original variable.
    #[must_use]
    pub fn get(&self, original: VariableRef) -> Option<&AffineMap> {
        self.maps.get(&original)
    }

    /// The original variables, in order.
    pub fn originals(&self) -> impl Iterator<Item = VariableRef> + '_ {
        self.maps.keys().copied()
    }

    /// Number of original variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.maps.len()
    }

    /// Whether no variable is mapped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    /// Compute the values of the original variables.
    ///
    /// # Arguments
    ///
    /// * `value`: Values of the variables of the transformed problem.
    ///
    /// # Return value
    ///
    /// Values of all original variables whose map could be evaluated.
    pub fn recover(&self, value: impl Fn(VariableRef) -> Option<f64>) -> BTreeMap<VariableRef, f64> {
        self.maps.iter()
            .filter_map(|(&original, map)| map.evaluate(&value).map(|x| (original, x)))
            .collect()
    }
}

/// Store values in the bundles of a problem.
pub fn store(problem: &mut MultilevelProblem, values: &BTreeMap<VariableRef, f64>) {
    for (&variable, &value) in values {
        problem.set_value(variable, value);
    }
}

/// Write values of the level representation into the model variables they were extracted from.
///
/// # Arguments
///
/// * `variables`: Level representation of each model variable, as found during extraction.
/// * `values`: Values by level representation variable.
///
/// # Return value
///
/// The values written, by model variable.
pub fn write_back(
    model: &mut Model,
    variables: &BTreeMap<VarId, VariableRef>,
    values: &BTreeMap<VariableRef, f64>,
) -> BTreeMap<VarId, f64> {
    let mut written = BTreeMap::new();
    for (&id, variable) in variables {
        if let Some(&value) = values.get(variable) {
            model.set_value(id, value);
            written.insert(id, value);
        }
    }

    written
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::data::level::{Kind, LevelId};

    #[test]
    fn recover() {
        let x = VariableRef::new(LevelId::UPPER, Kind::Real, 0);
        let x_plus = VariableRef::new(LevelId::UPPER, Kind::Real, 0);
        let x_minus = VariableRef::new(LevelId::UPPER, Kind::Real, 1);
        let z = VariableRef::new(LevelId::UPPER, Kind::Integer, 0);

        let mut map = RecoveryMap::new();
        map.insert(x, AffineMap { offset: 1_f64, terms: vec![(x_plus, 1_f64), (x_minus, -1_f64)] });
        map.insert(z, AffineMap::identity(z));

        let values = [(x_plus, 2_f64), (x_minus, 5_f64), (z, 3_f64)].into_iter().collect::<BTreeMap<_, _>>();
        let recovered = map.recover(|v| values.get(&v).copied());
        assert_eq!(recovered[&x], -2_f64);
        assert_eq!(recovered[&z], 3_f64);

        let recovered = map.recover(|v| (v == z).then_some(1_f64));
        assert_eq!(recovered.len(), 1);
    }
}
