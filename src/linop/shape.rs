//! Shape representation for linear operators.
//!
//! Every node has a 2-D shape:
//! - a scalar is `(1, 1)`
//! - a vector of length n is the column `(n, 1)`
//! - an m x n matrix is `(m, n)`
//!
//! Values are flattened in column-major order, so entry `(i, j)` of an
//! `m x n` value sits at flat index `i + j * m`.

use std::fmt;

/// Shape of a linear operator's output.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shape {
    rows: usize,
    cols: usize,
}

impl Shape {
    /// Create a scalar shape.
    pub fn scalar() -> Self {
        Shape { rows: 1, cols: 1 }
    }

    /// Create a column vector shape.
    pub fn vector(n: usize) -> Self {
        Shape { rows: n, cols: 1 }
    }

    /// Create a matrix shape.
    pub fn matrix(m: usize, n: usize) -> Self {
        Shape { rows: m, cols: n }
    }

    /// Total number of elements.
    pub fn size(&self) -> usize {
        self.rows * self.cols
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Check if this is a scalar.
    pub fn is_scalar(&self) -> bool {
        self.rows == 1 && self.cols == 1
    }

    /// Check if this is a row or column vector.
    pub fn is_vector(&self) -> bool {
        self.rows == 1 || self.cols == 1
    }

    /// Check if this is a square matrix.
    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    /// Get the transposed shape.
    pub fn transpose(&self) -> Self {
        Shape {
            rows: self.cols,
            cols: self.rows,
        }
    }

    /// Flat column-major index of entry `(i, j)`.
    pub fn flat_index(&self, i: usize, j: usize) -> usize {
        i + j * self.rows
    }
}

impl Default for Shape {
    fn default() -> Self {
        Shape::scalar()
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Shape({}, {})", self.rows, self.cols)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.rows, self.cols)
    }
}

// Conversion traits
impl From<()> for Shape {
    fn from(_: ()) -> Self {
        Shape::scalar()
    }
}

impl From<usize> for Shape {
    fn from(n: usize) -> Self {
        Shape::vector(n)
    }
}

impl From<(usize, usize)> for Shape {
    fn from((m, n): (usize, usize)) -> Self {
        Shape::matrix(m, n)
    }
}
