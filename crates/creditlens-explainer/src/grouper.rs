//! Grouping of per-encoded-column attributions into per-base-feature sums.
//!
//! Attribution algorithms decompose a prediction over the *encoded* columns
//! of the preprocessing transform. A single categorical feature such as
//! `purpose` becomes several one-hot columns, each with its own
//! attribution. Users reason about base features, so the grouper sums the
//! column attributions of every base feature.
//!
//! The same contract covers a single row and a batch: each row of the
//! input is grouped independently, and the per-row sum is preserved.
//!
//! ```
//! use creditlens_engine::{EncodingMap, FeatureCatalog};
//! use creditlens_explainer::grouper::AttributionGrouper;
//!
//! let catalog = FeatureCatalog::german_credit();
//! let map = EncodingMap::new(&["duration", "purpose_car_new", "purpose_education"], &catalog);
//! let grouped = AttributionGrouper::new(&map).group(&[0.10, -0.05, 0.02]).unwrap();
//!
//! assert_eq!(grouped.get(0, "duration"), Some(0.10));
//! assert!((grouped.get(0, "purpose").unwrap() + 0.03).abs() < 1e-12);
//! assert_eq!(grouped.get(0, "age"), Some(0.0));
//! ```

use creditlens_engine::{EncodingMap, ExplainError, model::Matrix};

/// Sums column attributions per base feature.
#[derive(Debug, Clone, Copy)]
pub struct AttributionGrouper<'a> {
    map: &'a EncodingMap,
}

impl<'a> AttributionGrouper<'a> {
    #[must_use]
    pub fn new(map: &'a EncodingMap) -> Self {
        Self { map }
    }

    /// Groups a single attribution vector.
    ///
    /// Fails with [`ExplainError::SchemaMismatch`] unless `raw` has one entry
    /// per encoded column.
    pub fn group(&self, raw: &[f64]) -> Result<GroupedAttributions, ExplainError> {
        let mut values = Matrix::zeros(1, self.map.features().len());
        self.accumulate(raw, values.row_mut(0))?;
        Ok(self.finish(values))
    }

    /// Groups every row of an attribution matrix.
    ///
    /// Fails with [`ExplainError::SchemaMismatch`] unless the matrix has one
    /// column per encoded column.
    pub fn group_batch(&self, raw: &Matrix) -> Result<GroupedAttributions, ExplainError> {
        if raw.cols() != self.map.len() {
            return Err(ExplainError::SchemaMismatch {
                expected: self.map.len(),
                actual: raw.cols(),
            });
        }
        let mut values = Matrix::zeros(raw.rows(), self.map.features().len());
        for (index, row) in raw.iter_rows().enumerate() {
            self.accumulate(row, values.row_mut(index))?;
        }
        Ok(self.finish(values))
    }

    fn accumulate(&self, raw: &[f64], out: &mut [f64]) -> Result<(), ExplainError> {
        if raw.len() != self.map.len() {
            return Err(ExplainError::SchemaMismatch {
                expected: self.map.len(),
                actual: raw.len(),
            });
        }
        for (column, value) in raw.iter().enumerate() {
            out[self.map.feature_index_of_column(column)] += value;
        }
        Ok(())
    }

    fn finish(&self, values: Matrix) -> GroupedAttributions {
        GroupedAttributions {
            features: self.map.features().to_vec(),
            values,
        }
    }
}

/// Per-base-feature attribution sums, one row per input row.
///
/// Columns follow [`EncodingMap::features`]: declaration order, then the
/// unknown pseudo-feature when present.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedAttributions {
    features: Vec<String>,
    values: Matrix,
}

impl GroupedAttributions {
    #[must_use]
    pub fn features(&self) -> &[String] {
        &self.features
    }

    #[must_use]
    pub fn rows(&self) -> usize {
        self.values.rows()
    }

    /// Grouped attributions of one row, aligned with [`features`](Self::features).
    #[must_use]
    pub fn row(&self, index: usize) -> &[f64] {
        self.values.row(index)
    }

    /// Attribution of `feature` in row `row`, if the feature is grouped.
    #[must_use]
    pub fn get(&self, row: usize, feature: &str) -> Option<f64> {
        let column = self.features.iter().position(|f| f == feature)?;
        Some(self.values.row(row)[column])
    }

    /// All rows' attributions of the feature at `feature_index`.
    #[must_use]
    pub fn feature_column(&self, feature_index: usize) -> Vec<f64> {
        self.values.iter_rows().map(|row| row[feature_index]).collect()
    }

    /// Sum of the grouped attributions of one row.
    #[must_use]
    pub fn row_total(&self, index: usize) -> f64 {
        self.values.row(index).iter().sum()
    }
}
