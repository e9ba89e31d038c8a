//! Consumed collaborators and their reference implementations.
//!
//! The attribution engine never fits models or computes tree attributions
//! itself. It talks to three collaborators through traits:
//!
//! - [`PreprocessingTransform`] - Turns engineered applicant records into an
//!   encoded [`Matrix`] and names its encoded columns
//! - [`ScoringModel`] - Scores encoded rows and builds the matching
//!   [`AttributionExplainer`]
//! - [`AttributionExplainer`] - Produces an additive per-column decomposition
//!   of the model's margin ([`ColumnAttributions`])
//!
//! [`OneHotTransform`] and [`LinearModel`] are small exact implementations of
//! these traits. They back the CLI's JSON model bundles and the tests.
//!
//! # Example
//!
//! ```
//! use creditlens_engine::{
//!     ApplicantRecord, FeatureCatalog, FeatureDecl,
//!     model::{LinearModel, OneHotTransform, PreprocessingTransform as _, ScoringModel as _},
//! };
//!
//! let catalog = FeatureCatalog::new(vec![FeatureDecl::numeric("age", "Age")]).unwrap();
//! let transform = OneHotTransform::new(&catalog);
//! let model = LinearModel::new(
//!     transform.encoded_column_names().to_vec(),
//!     -1.0,
//!     vec![0.5],
//!     vec![2.0],
//! )
//! .unwrap();
//!
//! let rows = transform.transform(&[ApplicantRecord::new().with("age", 4.0)]).unwrap();
//! let explainer = model.build_explainer().unwrap();
//! let attribution = explainer.compute_attribution(&rows).unwrap();
//!
//! // base value 0.0 plus the age contribution 1.0 reproduces the margin
//! assert_eq!(attribution.base_value, 0.0);
//! assert_eq!(attribution.values.row(0), &[1.0]);
//! assert_eq!(model.predict_score(&rows).unwrap(), vec![1.0]);
//! ```

use std::fmt;

pub use self::{linear::*, matrix::*, metadata::*, one_hot::*};

use crate::{ApplicantRecord, ExplainError};

mod linear;
mod matrix;
mod metadata;
mod one_hot;

/// Maps engineered applicant records to encoded model input.
pub trait PreprocessingTransform: fmt::Debug + Send + Sync {
    /// Encoded column names, in matrix column order.
    fn encoded_column_names(&self) -> &[String];

    /// Encodes `records`, one matrix row per record.
    fn transform(&self, records: &[ApplicantRecord]) -> Result<Matrix, ExplainError>;
}

/// A fitted binary classifier over encoded rows.
pub trait ScoringModel: fmt::Debug + Send + Sync {
    /// Predicted class per row.
    fn predict(&self, rows: &Matrix) -> Result<Vec<u8>, ExplainError>;

    /// Probability of the target class per row.
    fn predict_probability(&self, rows: &Matrix) -> Result<Vec<f64>, ExplainError>;

    /// Raw margin of the target class per row.
    ///
    /// This is the space attributions live in: for every row,
    /// `base_value + Σ attribution == predict_score`.
    fn predict_score(&self, rows: &Matrix) -> Result<Vec<f64>, ExplainError>;

    /// Builds the attribution explainer for this model.
    fn build_explainer(&self) -> Result<Box<dyn AttributionExplainer>, ExplainError>;
}

/// Computes additive per-column attributions for encoded rows.
pub trait AttributionExplainer: fmt::Debug + Send + Sync {
    fn compute_attribution(&self, rows: &Matrix) -> Result<ColumnAttributions, ExplainError>;
}

/// Additive decomposition of the model margin over encoded columns.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnAttributions {
    /// Expected margin over the reference data.
    pub base_value: f64,
    /// One row per input row, one column per encoded column.
    pub values: Matrix,
}
