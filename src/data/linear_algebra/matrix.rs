//! # Sparse matrices
//!
//! Coefficient blocks are built in coordinate form (`Triplets`) and then stored column major, which
//! is the order in which variable substitutions traverse them. Resizing pads with zero rows and
//! columns.
use std::fmt;
use std::ops::{AddAssign, Neg};

use itertools::Itertools;
use num_traits::Num;

use crate::data::linear_algebra::SparseTuple;

/// Coordinate form of a sparse matrix, used during construction.
///
/// Duplicate coordinates are summed when the triplets are converted into a `SparseMatrix`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Triplets<F> {
    entries: Vec<(usize, usize, F)>,
}

impl<F> Triplets<F> {
    /// Create an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Record value `value` at coordinate (`row`, `column`).
    pub fn push(&mut self, row: usize, column: usize, value: F) {
        self.entries.push((row, column, value));
    }

    /// Number of recorded (not necessarily distinct) coordinates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no coordinate was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Column major sparse matrix.
///
/// Each column holds (row index, value) tuples sorted by row index, without explicit zeros.
#[derive(Clone, PartialEq)]
pub struct SparseMatrix<F = f64> {
    columns: Vec<Vec<SparseTuple<F>>>,
    nr_rows: usize,
}

impl<F> SparseMatrix<F>
where
    F: Num + Copy + AddAssign + Neg<Output = F>,
{
    /// Create a matrix of zeros of dimension `nr_rows` x `nr_columns`.
    #[must_use]
    pub fn new(nr_rows: usize, nr_columns: usize) -> Self {
        Self {
            columns: vec![Vec::new(); nr_columns],
            nr_rows,
        }
    }

    /// Create a matrix from coordinate form.
    ///
    /// # Arguments
    ///
    /// * `nr_rows`: Number of rows, all row indices in the triplets should be smaller.
    /// * `nr_columns`: Number of columns, all column indices in the triplets should be smaller.
    /// * `triplets`: Values to be summed into the matrix.
    #[must_use]
    pub fn from_triplets(nr_rows: usize, nr_columns: usize, triplets: Triplets<F>) -> Self {
        let mut columns = vec![Vec::new(); nr_columns];
        for (row, column, value) in triplets.entries {
            debug_assert!(row < nr_rows);
            debug_assert!(column < nr_columns);

            columns[column].push((row, value));
        }

        for column in &mut columns {
            column.sort_by_key(|&(row, _)| row);
            let merged = column.drain(..)
                .coalesce(|(i, x), (j, y)| if i == j { Ok((i, x + y)) } else { Err(((i, x), (j, y))) })
                .filter(|(_, value)| !value.is_zero())
                .collect();
            *column = merged;
        }

        Self { columns, nr_rows }
    }

    /// Create a matrix from dense, row major data.
    ///
    /// Mostly useful for tests and small hand written problems.
    #[must_use]
    pub fn from_dense(rows: &[Vec<F>], nr_columns: usize) -> Self {
        let mut triplets = Triplets::new();
        for (i, row) in rows.iter().enumerate() {
            debug_assert_eq!(row.len(), nr_columns);
            for (j, &value) in row.iter().enumerate() {
                triplets.push(i, j, value);
            }
        }

        Self::from_triplets(rows.len(), nr_columns, triplets)
    }

    /// Number of rows.
    #[must_use]
    pub fn nr_rows(&self) -> usize {
        self.nr_rows
    }

    /// Number of columns.
    #[must_use]
    pub fn nr_columns(&self) -> usize {
        self.columns.len()
    }

    /// Number of explicitly stored (nonzero) values.
    #[must_use]
    pub fn nr_nonzeros(&self) -> usize {
        self.columns.iter().map(Vec::len).sum()
    }

    /// Get the value at coordinate (`i`, `j`).
    #[must_use]
    pub fn get(&self, i: usize, j: usize) -> F {
        debug_assert!(i < self.nr_rows);

        match self.columns[j].binary_search_by_key(&i, |&(row, _)| row) {
            Ok(index) => self.columns[j][index].1,
            Err(_) => F::zero(),
        }
    }

    /// Add `value` to the value at coordinate (`i`, `j`).
    ///
    /// Values that become zero are removed.
    pub fn add(&mut self, i: usize, j: usize, value: F) {
        debug_assert!(i < self.nr_rows);

        if value.is_zero() {
            return;
        }

        let column = &mut self.columns[j];
        match column.binary_search_by_key(&i, |&(row, _)| row) {
            Ok(index) => {
                column[index].1 += value;
                if column[index].1.is_zero() {
                    column.remove(index);
                }
            },
            Err(index) => column.insert(index, (i, value)),
        }
    }

    /// Set the value at coordinate (`i`, `j`) to `value`.
    pub fn set(&mut self, i: usize, j: usize, value: F) {
        debug_assert!(i < self.nr_rows);

        let column = &mut self.columns[j];
        match column.binary_search_by_key(&i, |&(row, _)| row) {
            Ok(index) if value.is_zero() => { column.remove(index); },
            Ok(index) => column[index].1 = value,
            Err(_) if value.is_zero() => {},
            Err(index) => column.insert(index, (i, value)),
        }
    }

    /// Iterate over the (row, value) tuples of column `j`.
    pub fn iter_column(&self, j: usize) -> impl Iterator<Item = &SparseTuple<F>> {
        self.columns[j].iter()
    }

    /// Iterate over all (row, column, value) triplets, column by column.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, F)> + '_ {
        self.columns.iter().enumerate()
            .flat_map(|(j, column)| column.iter().map(move |&(i, value)| (i, j, value)))
    }

    /// Collect row `i` as (column, value) tuples sorted by column.
    ///
    /// This requires a scan over all columns.
    #[must_use]
    pub fn row(&self, i: usize) -> Vec<SparseTuple<F>> {
        debug_assert!(i < self.nr_rows);

        (0..self.nr_columns())
            .filter_map(|j| {
                let value = self.get(i, j);
                (!value.is_zero()).then_some((j, value))
            })
            .collect()
    }

    /// Row major copy of the data.
    #[must_use]
    pub fn rows(&self) -> Vec<Vec<SparseTuple<F>>> {
        let mut rows = vec![Vec::new(); self.nr_rows];
        for (j, column) in self.columns.iter().enumerate() {
            for &(i, value) in column {
                rows[i].push((j, value));
            }
        }

        rows
    }

    /// Transposed copy of this matrix.
    #[must_use]
    pub fn transpose(&self) -> Self {
        Self {
            columns: self.rows(),
            nr_rows: self.nr_columns(),
        }
    }

    /// Grow this matrix to the given dimensions; the new rows and columns are zero.
    pub fn resize(&mut self, nr_rows: usize, nr_columns: usize) {
        debug_assert!(nr_rows >= self.nr_rows);
        debug_assert!(nr_columns >= self.nr_columns());

        self.nr_rows = nr_rows;
        self.columns.resize_with(nr_columns, Vec::new);
    }

    /// Append a column to the "right" of this matrix.
    ///
    /// # Arguments
    ///
    /// * `column`: (row, value) tuples, rows need not be sorted.
    pub fn push_column(&mut self, mut column: Vec<SparseTuple<F>>) {
        debug_assert!(column.iter().all(|&(i, _)| i < self.nr_rows));

        column.retain(|(_, value)| !value.is_zero());
        column.sort_by_key(|&(i, _)| i);
        self.columns.push(column);
    }

    /// Concatenate another matrix to the "right" (high column indices) of this matrix.
    #[must_use]
    pub fn concatenate_horizontally(mut self, other: Self) -> Self {
        debug_assert_eq!(self.nr_rows, other.nr_rows);

        self.columns.extend(other.columns);
        self
    }

    /// Multiply every value in column `j` by `-1`.
    pub fn negate_column(&mut self, j: usize) {
        for (_, value) in &mut self.columns[j] {
            *value = -*value;
        }
    }

    /// Multiply every value in row `i` by `factor`.
    pub fn scale_row(&mut self, i: usize, factor: F) {
        for column in &mut self.columns {
            if let Ok(index) = column.binary_search_by_key(&i, |&(row, _)| row) {
                column[index].1 = column[index].1 * factor;
                if column[index].1.is_zero() {
                    column.remove(index);
                }
            }
        }
    }

    /// Compute `<row i, x>`.
    #[must_use]
    pub fn row_dot(&self, i: usize, x: &[F]) -> F {
        debug_assert_eq!(x.len(), self.nr_columns());

        self.columns.iter().zip(x)
            .filter_map(|(column, &x_j)| {
                column.binary_search_by_key(&i, |&(row, _)| row).ok().map(|index| column[index].1 * x_j)
            })
            .fold(F::zero(), |total, term| total + term)
    }

    /// Compute `A x`.
    #[must_use]
    pub fn multiply(&self, x: &[F]) -> Vec<F> {
        debug_assert_eq!(x.len(), self.nr_columns());

        let mut result = vec![F::zero(); self.nr_rows];
        for (column, &x_j) in self.columns.iter().zip(x) {
            for &(i, value) in column {
                result[i] += value * x_j;
            }
        }

        result
    }
}

impl<F: fmt::Debug> fmt::Debug for SparseMatrix<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SparseMatrix")
            .field("nr_rows", &self.nr_rows)
            .field("nr_columns", &self.columns.len())
            .field("columns", &self.columns)
            .finish()
    }
}

impl fmt::Display for SparseMatrix<f64> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.nr_rows {
            let row = (0..self.nr_columns())
                .map(|j| format!("{:>8.3}", self.get(i, j)))
                .join(" ");
            writeln!(f, "[{row}]")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn test_matrix() -> SparseMatrix {
        SparseMatrix::from_dense(&[
            vec![1_f64, 2_f64, 0_f64],
            vec![0_f64, 5_f64, 6_f64],
        ], 3)
    }

    #[test]
    fn from_triplets_sums_duplicates() {
        let mut triplets = Triplets::new();
        triplets.push(0, 1, 2_f64);
        triplets.push(0, 1, 3_f64);
        triplets.push(1, 0, 1_f64);
        triplets.push(1, 0, -1_f64);
        let m = SparseMatrix::from_triplets(2, 2, triplets);

        assert_eq!(m.get(0, 1), 5_f64);
        assert_eq!(m.get(1, 0), 0_f64);
        assert_eq!(m.nr_nonzeros(), 1);
    }

    #[test]
    fn get_set() {
        let mut m = test_matrix();

        assert_eq!(m.get(0, 2), 0_f64);
        assert_eq!(m.get(0, 1), 2_f64);

        m.set(1, 1, 3_f64);
        assert_eq!(m.get(1, 1), 3_f64);
        m.set(1, 1, 0_f64);
        assert_eq!(m.get(1, 1), 0_f64);
        assert_eq!(m.nr_nonzeros(), 3);

        m.add(0, 0, -1_f64);
        assert_eq!(m.get(0, 0), 0_f64);
        assert_eq!(m.nr_nonzeros(), 2);
    }

    #[test]
    #[should_panic]
    fn out_of_bounds_get() {
        let m = test_matrix();
        let _ = m.get(0, 3);
    }

    #[test]
    fn row_column() {
        let m = test_matrix();

        assert_eq!(m.iter_column(2).next(), Some(&(1, 6_f64)));
        assert_eq!(m.row(1), vec![(1, 5_f64), (2, 6_f64)]);
        assert_eq!(m.rows()[0], vec![(0, 1_f64), (1, 2_f64)]);
        assert_eq!(m.transpose().get(2, 1), 6_f64);
    }

    #[test]
    fn resize_and_push() {
        let mut m = test_matrix();
        m.resize(3, 4);
        assert_eq!((m.nr_rows(), m.nr_columns()), (3, 4));
        assert_eq!(m.get(2, 3), 0_f64);

        m.push_column(vec![(2, 1_f64), (0, -1_f64), (1, 0_f64)]);
        assert_eq!(m.iter_column(4).copied().collect::<Vec<_>>(), vec![(0, -1_f64), (2, 1_f64)]);
    }

    #[test]
    fn arithmetic() {
        let mut m = test_matrix();
        assert_eq!(m.multiply(&[1_f64, 1_f64, 1_f64]), vec![3_f64, 11_f64]);
        assert_eq!(m.row_dot(1, &[0_f64, 2_f64, 1_f64]), 16_f64);

        m.negate_column(1);
        m.scale_row(1, 2_f64);
        assert_eq!(m.get(0, 1), -2_f64);
        assert_eq!(m.get(1, 1), -10_f64);
        assert_eq!(m.get(1, 2), 12_f64);
    }
}
