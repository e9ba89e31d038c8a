use crate::ExplainError;

/// Dense row-major matrix of `f64`.
///
/// `data` always holds exactly `rows * cols` entries; every constructor
/// checks it.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    #[must_use]
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Builds a matrix from equally long rows.
    ///
    /// `cols` is taken from the first row; an empty input gives a `0 x 0`
    /// matrix. A row of any other length is a [`ExplainError::SchemaMismatch`].
    pub fn from_rows<R>(rows: &[R]) -> Result<Self, ExplainError>
    where
        R: AsRef<[f64]>,
    {
        let cols = rows.first().map_or(0, |r| r.as_ref().len());
        Self::from_rows_with_cols(rows, cols)
    }

    /// Like [`from_rows`](Self::from_rows) with a fixed column count, so an
    /// empty input keeps its width.
    pub fn from_rows_with_cols<R>(rows: &[R], cols: usize) -> Result<Self, ExplainError>
    where
        R: AsRef<[f64]>,
    {
        let mut data = Vec::with_capacity(rows.len() * cols);
        for row in rows {
            let row = row.as_ref();
            if row.len() != cols {
                return Err(ExplainError::SchemaMismatch {
                    expected: cols,
                    actual: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            data,
        })
    }

    /// A single-row matrix.
    #[must_use]
    pub fn from_row(row: Vec<f64>) -> Self {
        Self {
            rows: 1,
            cols: row.len(),
            data: row,
        }
    }

    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[must_use]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// # Panics
    ///
    /// Panics if `index` is out of range.
    #[must_use]
    pub fn row(&self, index: usize) -> &[f64] {
        assert!(index < self.rows, "row {index} out of range");
        &self.data[index * self.cols..(index + 1) * self.cols]
    }

    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn row_mut(&mut self, index: usize) -> &mut [f64] {
        assert!(index < self.rows, "row {index} out of range");
        &mut self.data[index * self.cols..(index + 1) * self.cols]
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> + '_ {
        (0..self.rows).map(|i| self.row(i))
    }

    /// Whether no entry is NaN or infinite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }
}
