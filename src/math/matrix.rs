/*
    Asteria, numerical astronomy toolkit
    Copyright (C) 2025 Asteria contributors

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use crate::errors::MathError;
use crate::linalg::{DMatrix, DVector};
use std::ops;

/// A column-major dynamic matrix of `f64`.
///
/// Sizes are `(cols, rows)` pairs and element access is `(col, row)`,
/// matching the column-major storage. Rows are added/erased at the bottom,
/// columns at the right; `add_*`/`set_*` pad short vectors with zeros and
/// truncate long ones. Arithmetic against a mismatched shape reports
/// [`MathError::IncompatibleShape`] instead of panicking.
#[derive(Clone, Debug, PartialEq)]
pub struct DenseMatrix {
    store: DMatrix<f64>,
}

impl Default for DenseMatrix {
    fn default() -> Self {
        Self::new()
    }
}

impl DenseMatrix {
    /// An empty 0x0 matrix.
    pub fn new() -> Self {
        Self {
            store: DMatrix::zeros(0, 0),
        }
    }

    /// A `cols x rows` matrix of zeros.
    pub fn zeros(cols: usize, rows: usize) -> Self {
        Self {
            store: DMatrix::zeros(rows, cols),
        }
    }

    /// A `cols x rows` matrix filled with `value`.
    pub fn filled(cols: usize, rows: usize, value: f64) -> Self {
        Self {
            store: DMatrix::from_element(rows, cols, value),
        }
    }

    /// An `n x n` matrix with `value` on the diagonal and zeros elsewhere.
    pub fn scalar(n: usize, value: f64) -> Self {
        Self {
            store: DMatrix::from_diagonal_element(n, n, value),
        }
    }

    /// Builds a `cols x rows` matrix from a row-major buffer.
    pub fn from_row_major(cols: usize, rows: usize, data: &[f64]) -> Result<Self, MathError> {
        if data.len() != cols * rows {
            return Err(MathError::InvalidArgument {
                what: format!(
                    "row-major buffer of {} elements cannot fill a {}x{} matrix",
                    data.len(),
                    cols,
                    rows
                ),
            });
        }
        Ok(Self {
            store: DMatrix::from_row_slice(rows, cols, data),
        })
    }

    /// Builds a matrix from a list of columns. The row count is the longest
    /// column's length; shorter columns are padded with zeros.
    pub fn from_columns(columns: &[Vec<f64>]) -> Self {
        let rows = columns.iter().map(Vec::len).max().unwrap_or(0);
        let mut store = DMatrix::zeros(rows, columns.len());
        for (c, col) in columns.iter().enumerate() {
            for (r, val) in col.iter().enumerate() {
                store[(r, c)] = *val;
            }
        }
        Self { store }
    }

    /// Builds an `N x 1` column matrix from a flat value vector.
    pub fn from_vec(values: Vec<f64>) -> Self {
        let rows = values.len();
        Self {
            store: DMatrix::from_vec(rows, 1, values),
        }
    }

    /// The size of this matrix as a `(cols, rows)` pair.
    pub fn size(&self) -> (usize, usize) {
        (self.store.ncols(), self.store.nrows())
    }

    pub fn cols(&self) -> usize {
        self.store.ncols()
    }

    pub fn rows(&self) -> usize {
        self.store.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// The elementary accessor: element at `(col, row)`.
    pub fn at(&self, col: usize, row: usize) -> f64 {
        self.store[(row, col)]
    }

    pub fn at_mut(&mut self, col: usize, row: usize) -> &mut f64 {
        &mut self.store[(row, col)]
    }

    fn check_col(&self, pos: usize) -> Result<(), MathError> {
        if pos >= self.cols() {
            return Err(MathError::InvalidArgument {
                what: format!("column {} out of range ({} columns)", pos, self.cols()),
            });
        }
        Ok(())
    }

    fn check_row(&self, pos: usize) -> Result<(), MathError> {
        if pos >= self.rows() {
            return Err(MathError::InvalidArgument {
                what: format!("row {} out of range ({} rows)", pos, self.rows()),
            });
        }
        Ok(())
    }

    /// A freshly copied column.
    pub fn column(&self, pos: usize) -> Result<Vec<f64>, MathError> {
        self.check_col(pos)?;
        Ok(self.store.column(pos).iter().copied().collect())
    }

    /// A freshly copied row.
    pub fn row(&self, pos: usize) -> Result<Vec<f64>, MathError> {
        self.check_row(pos)?;
        Ok(self.store.row(pos).iter().copied().collect())
    }

    fn fit(values: &[f64], len: usize) -> Vec<f64> {
        let mut fitted = vec![0.0; len];
        for (dst, src) in fitted.iter_mut().zip(values.iter()) {
            *dst = *src;
        }
        fitted
    }

    /// Overwrites the column at `pos`, truncating or zero-padding `values`.
    pub fn set_column(&mut self, pos: usize, values: &[f64]) -> Result<(), MathError> {
        self.check_col(pos)?;
        let fitted = Self::fit(values, self.rows());
        for (r, val) in fitted.iter().enumerate() {
            self.store[(r, pos)] = *val;
        }
        Ok(())
    }

    /// Overwrites the row at `pos`, truncating or zero-padding `values`.
    pub fn set_row(&mut self, pos: usize, values: &[f64]) -> Result<(), MathError> {
        self.check_row(pos)?;
        let fitted = Self::fit(values, self.cols());
        for (c, val) in fitted.iter().enumerate() {
            self.store[(pos, c)] = *val;
        }
        Ok(())
    }

    /// Inserts a column before index `pos` (`pos == cols` appends).
    pub fn add_column(&mut self, pos: usize, values: &[f64]) -> Result<(), MathError> {
        if pos > self.cols() {
            return Err(MathError::InvalidArgument {
                what: format!("column {} out of range ({} columns)", pos, self.cols()),
            });
        }
        // Inserting into an empty matrix sets the row count.
        if self.is_empty() && self.rows() == 0 {
            self.store = self.store.clone().resize(values.len(), 0, 0.0);
        }
        let fitted = Self::fit(values, self.rows());
        self.store = self.store.clone().insert_column(pos, 0.0);
        for (r, val) in fitted.iter().enumerate() {
            self.store[(r, pos)] = *val;
        }
        Ok(())
    }

    /// Inserts a row before index `pos` (`pos == rows` appends).
    pub fn add_row(&mut self, pos: usize, values: &[f64]) -> Result<(), MathError> {
        if pos > self.rows() {
            return Err(MathError::InvalidArgument {
                what: format!("row {} out of range ({} rows)", pos, self.rows()),
            });
        }
        if self.is_empty() && self.cols() == 0 {
            self.store = self.store.clone().resize(0, values.len(), 0.0);
        }
        let fitted = Self::fit(values, self.cols());
        self.store = self.store.clone().insert_row(pos, 0.0);
        for (c, val) in fitted.iter().enumerate() {
            self.store[(pos, c)] = *val;
        }
        Ok(())
    }

    pub fn delete_column(&mut self, pos: usize) -> Result<(), MathError> {
        self.check_col(pos)?;
        self.store = self.store.clone().remove_column(pos);
        Ok(())
    }

    pub fn delete_row(&mut self, pos: usize) -> Result<(), MathError> {
        self.check_row(pos)?;
        self.store = self.store.clone().remove_row(pos);
        Ok(())
    }

    /// Resizes to `new_cols x new_rows`. Columns grow/shrink at the right,
    /// rows at the bottom; added cells are zero.
    pub fn resize(&mut self, new_cols: usize, new_rows: usize) {
        self.store = self.store.clone().resize(new_rows, new_cols, 0.0);
    }

    pub fn transpose(&self) -> Self {
        Self {
            store: self.store.transpose(),
        }
    }

    fn shape_check(&self, other: &Self) -> Result<(), MathError> {
        if self.size() != other.size() {
            return Err(MathError::IncompatibleShape {
                cols: other.cols(),
                rows: other.rows(),
                expected_cols: self.cols(),
                expected_rows: self.rows(),
            });
        }
        Ok(())
    }

    pub fn try_add_assign(&mut self, other: &Self) -> Result<(), MathError> {
        self.shape_check(other)?;
        self.store += &other.store;
        Ok(())
    }

    pub fn try_sub_assign(&mut self, other: &Self) -> Result<(), MathError> {
        self.shape_check(other)?;
        self.store -= &other.store;
        Ok(())
    }

    /// Matrix multiply. With sizes as `(cols, rows)` pairs, requires
    /// `self.cols == other.rows`; the result is `(other.cols, self.rows)`.
    pub fn try_mul(&self, other: &Self) -> Result<Self, MathError> {
        if self.cols() != other.rows() {
            return Err(MathError::IncompatibleShape {
                cols: other.cols(),
                rows: other.rows(),
                expected_cols: other.cols(),
                expected_rows: self.cols(),
            });
        }
        Ok(Self {
            store: &self.store * &other.store,
        })
    }

    /// Multiplies this matrix by a column vector.
    pub fn try_mul_vec(&self, vec: &[f64]) -> Result<Vec<f64>, MathError> {
        if self.cols() != vec.len() {
            return Err(MathError::IncompatibleShape {
                cols: 1,
                rows: vec.len(),
                expected_cols: 1,
                expected_rows: self.cols(),
            });
        }
        let v = DVector::from_column_slice(vec);
        Ok((&self.store * v).iter().copied().collect())
    }

    /// Solves `self * x = rhs` by LU decomposition.
    pub fn solve(&self, rhs: &[f64]) -> Result<Vec<f64>, MathError> {
        if self.cols() != self.rows() || self.rows() != rhs.len() {
            return Err(MathError::IncompatibleShape {
                cols: 1,
                rows: rhs.len(),
                expected_cols: 1,
                expected_rows: self.rows(),
            });
        }
        let lu = self.store.clone().lu();
        match lu.solve(&DVector::from_column_slice(rhs)) {
            Some(x) => Ok(x.iter().copied().collect()),
            None => Err(MathError::SingularSolve {
                what: "LU solve of a singular system".to_string(),
            }),
        }
    }

    /// Iterator over all elements in column-major order.
    pub fn iter(&self) -> impl Iterator<Item = &f64> {
        self.store.iter()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Applies `f` to every element, returning the mapped matrix.
    pub fn map<F: Fn(f64) -> f64>(&self, f: F) -> Self {
        Self {
            store: self.store.map(f),
        }
    }
}

impl ops::MulAssign<f64> for DenseMatrix {
    fn mul_assign(&mut self, rhs: f64) {
        self.store *= rhs;
    }
}

impl ops::DivAssign<f64> for DenseMatrix {
    fn div_assign(&mut self, rhs: f64) {
        self.store /= rhs;
    }
}

/// Returns the `pos`-th column as a freshly copied vector.
impl ops::Index<usize> for DenseMatrix {
    type Output = [f64];

    fn index(&self, pos: usize) -> &Self::Output {
        let rows = self.rows();
        &self.store.as_slice()[pos * rows..(pos + 1) * rows]
    }
}
