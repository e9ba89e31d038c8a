use std::iter;

use serde::{Deserialize, Serialize};

use crate::{
    ExplainError,
    model::{AttributionExplainer, ColumnAttributions, Matrix, ScoringModel},
};

/// Additive logistic model over encoded columns.
///
/// The margin is `intercept + Σ wᵢ·xᵢ` and the probability of the target
/// class is its logistic. Its exact additive attribution against the
/// per-column reference means is `wᵢ·(xᵢ − meanᵢ)` with base value
/// `intercept + Σ wᵢ·meanᵢ`, so base value plus attributions reproduces the
/// margin for every row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LinearModelData")]
pub struct LinearModel {
    column_names: Vec<String>,
    intercept: f64,
    weights: Vec<f64>,
    reference_means: Vec<f64>,
}

#[derive(Deserialize)]
struct LinearModelData {
    column_names: Vec<String>,
    intercept: f64,
    weights: Vec<f64>,
    reference_means: Vec<f64>,
}

impl TryFrom<LinearModelData> for LinearModel {
    type Error = ExplainError;

    fn try_from(data: LinearModelData) -> Result<Self, Self::Error> {
        Self::new(
            data.column_names,
            data.intercept,
            data.weights,
            data.reference_means,
        )
    }
}

impl LinearModel {
    /// Builds a model, checking that every per-column vector has one entry
    /// per column and that all parameters are finite.
    pub fn new(
        column_names: Vec<String>,
        intercept: f64,
        weights: Vec<f64>,
        reference_means: Vec<f64>,
    ) -> Result<Self, ExplainError> {
        for len in [weights.len(), reference_means.len()] {
            if len != column_names.len() {
                return Err(ExplainError::SchemaMismatch {
                    expected: column_names.len(),
                    actual: len,
                });
            }
        }
        let mut parameters = iter::once(&intercept).chain(&weights).chain(&reference_means);
        if parameters.any(|p| !p.is_finite()) {
            return Err(ExplainError::collaborator(
                "linear model parameters must be finite",
            ));
        }
        Ok(Self {
            column_names,
            intercept,
            weights,
            reference_means,
        })
    }

    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    #[must_use]
    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    fn check_width(&self, rows: &Matrix) -> Result<(), ExplainError> {
        if rows.cols() != self.weights.len() {
            return Err(ExplainError::SchemaMismatch {
                expected: self.weights.len(),
                actual: rows.cols(),
            });
        }
        Ok(())
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    iter::zip(a, b).map(|(a, b)| a * b).sum()
}

fn logistic(margin: f64) -> f64 {
    1.0 / (1.0 + (-margin).exp())
}

impl ScoringModel for LinearModel {
    fn predict(&self, rows: &Matrix) -> Result<Vec<u8>, ExplainError> {
        let probabilities = self.predict_probability(rows)?;
        Ok(probabilities
            .into_iter()
            .map(|p| u8::from(p >= 0.5))
            .collect())
    }

    fn predict_probability(&self, rows: &Matrix) -> Result<Vec<f64>, ExplainError> {
        let scores = self.predict_score(rows)?;
        Ok(scores.into_iter().map(logistic).collect())
    }

    fn predict_score(&self, rows: &Matrix) -> Result<Vec<f64>, ExplainError> {
        self.check_width(rows)?;
        Ok(rows
            .iter_rows()
            .map(|row| self.intercept + dot(&self.weights, row))
            .collect())
    }

    fn build_explainer(&self) -> Result<Box<dyn AttributionExplainer>, ExplainError> {
        let base_value = self.intercept + dot(&self.weights, &self.reference_means);
        Ok(Box::new(LinearExplainer {
            weights: self.weights.clone(),
            reference_means: self.reference_means.clone(),
            base_value,
        }))
    }
}

/// Exact attribution explainer of a [`LinearModel`].
#[derive(Debug, Clone)]
pub struct LinearExplainer {
    weights: Vec<f64>,
    reference_means: Vec<f64>,
    base_value: f64,
}

impl AttributionExplainer for LinearExplainer {
    fn compute_attribution(&self, rows: &Matrix) -> Result<ColumnAttributions, ExplainError> {
        if rows.cols() != self.weights.len() {
            return Err(ExplainError::SchemaMismatch {
                expected: self.weights.len(),
                actual: rows.cols(),
            });
        }
        let mut values = Matrix::zeros(rows.rows(), rows.cols());
        for (index, row) in rows.iter_rows().enumerate() {
            let out = values.row_mut(index);
            for (((slot, x), w), mean) in out
                .iter_mut()
                .zip(row)
                .zip(&self.weights)
                .zip(&self.reference_means)
            {
                *slot = w * (x - mean);
            }
        }
        Ok(ColumnAttributions {
            base_value: self.base_value,
            values,
        })
    }
}
