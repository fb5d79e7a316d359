/// Dense row-major matrix. `data[i]` is row `i`; every row has `cols` entries.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<Vec<f64>>,
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Matrix {
        Matrix {
            rows,
            cols,
            data: vec![vec![0.0; cols]; rows],
        }
    }

    /// Builds a matrix from nested rows. Returns `None` when the rows are
    /// ragged. An empty row list gives a 0x0 matrix.
    pub fn from_rows(data: Vec<Vec<f64>>) -> Option<Matrix> {
        let cols = data.first().map_or(0, Vec::len);
        if data.iter().any(|row| row.len() != cols) {
            return None;
        }
        Some(Matrix {
            rows: data.len(),
            cols,
            data,
        })
    }

    /// Single-row matrix, handy for feeding one sample.
    pub fn from_row(row: Vec<f64>) -> Matrix {
        Matrix {
            rows: 1,
            cols: row.len(),
            data: vec![row],
        }
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i]
    }

    pub fn into_rows(self) -> Vec<Vec<f64>> {
        self.data
    }

    pub fn map<F>(&self, functor: F) -> Matrix
    where
        F: Fn(f64) -> f64,
    {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self
                .data
                .iter()
                .map(|row| row.iter().map(|&x| functor(x)).collect())
                .collect(),
        }
    }

    /// Computes `self * rhsᵀ`.
    ///
    /// `rhs` is stored with one row per output column, so entry `(i, j)` of
    /// the result is the dot product of `self` row `i` and `rhs` row `j`.
    /// Returns `None` unless both operands have the same column count.
    pub fn mul_transposed(&self, rhs: &Matrix) -> Option<Matrix> {
        if self.cols != rhs.cols {
            return None;
        }
        let data = self
            .data
            .iter()
            .map(|row| {
                rhs.data
                    .iter()
                    .map(|other| row.iter().zip(other).map(|(a, b)| a * b).sum())
                    .collect()
            })
            .collect();
        Some(Matrix {
            rows: self.rows,
            cols: rhs.rows,
            data,
        })
    }

    /// Adds `row` to every row of the matrix (bias broadcast).
    /// Returns `None` when `row.len() != self.cols`.
    pub fn add_row(mut self, row: &[f64]) -> Option<Matrix> {
        if row.len() != self.cols {
            return None;
        }
        for r in &mut self.data {
            for (x, b) in r.iter_mut().zip(row) {
                *x += b;
            }
        }
        Some(self)
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Matrix { rows: 0, cols: 0, data: vec![] }
    }
}
