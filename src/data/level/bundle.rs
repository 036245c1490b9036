//! # Variable bundles
//!
//! Variables of one kind owned by one level.
use enum_map::Enum;
use std::fmt;

/// Kind of a variable, integers and binaries are never mixed with reals in one matrix.
#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Kind {
    /// Continuous.
    Real,
    /// General integer.
    Integer,
    /// Zero or one.
    Binary,
}

impl Kind {
    /// All kinds, in storage order.
    pub const ALL: [Kind; 3] = [Kind::Real, Kind::Integer, Kind::Binary];

    /// Default bounds of a variable of this kind.
    #[must_use]
    pub fn default_bounds(self) -> (f64, f64) {
        match self {
            Kind::Real | Kind::Integer => (f64::NEG_INFINITY, f64::INFINITY),
            Kind::Binary => (0_f64, 1_f64),
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Kind::Real => "R",
            Kind::Integer => "Z",
            Kind::Binary => "B",
        })
    }
}

/// Bounds, values and names of the variables of one (level, kind) pair.
///
/// All vectors have the same length; an absent bound is stored as an infinite value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VariableBundle {
    /// Lower bounds, may be `-inf`.
    pub lower: Vec<f64>,
    /// Upper bounds, may be `inf`.
    pub upper: Vec<f64>,
    /// Solution values.
    pub values: Vec<Option<f64>>,
    /// Names, used for diagnostics and for naming generated model variables.
    pub names: Vec<String>,
}

impl VariableBundle {
    /// Create an empty bundle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether there are no variables.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Append a variable.
    ///
    /// # Return value
    ///
    /// Index of the new variable within the bundle.
    pub fn push(&mut self, name: impl Into<String>, lower: f64, upper: f64) -> usize {
        debug_assert!(lower <= upper);

        self.names.push(name.into());
        self.lower.push(lower);
        self.upper.push(upper);
        self.values.push(None);

        self.names.len() - 1
    }

    /// (lower, upper) of variable `index`.
    #[must_use]
    pub fn bounds(&self, index: usize) -> (f64, f64) {
        (self.lower[index], self.upper[index])
    }

    /// Whether all vectors have the same length.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let n = self.names.len();
        self.lower.len() == n && self.upper.len() == n && self.values.len() == n
    }
}
