//! Local explanations of individual credit-risk predictions.
//!
//! This crate turns the per-encoded-column attributions of a scoring model
//! into explanations a loan applicant or reviewer can read.
//!
//! # Architecture
//!
//! ```text
//! ModelService (served LoadedModel snapshot)
//!     ↓ snapshot
//! PerPredictionExplainer (validate, attribute, rank, check additivity)
//!     ↓ uses
//! AttributionGrouper (encoded columns -> base features)
//!     ↓ uses
//! EncodingMap (creditlens-engine)
//! ```
//!
//! # Modules
//!
//! - [`grouper`] - Sums encoded-column attributions per base feature, for one
//!   row or a batch
//! - [`display`] - Human-readable raw values: category labels and derived
//!   feature equations
//! - [`layer`] - The presentation layer drawn once per session
//! - [`explainer`] - The per-prediction pipeline and its output types
//! - [`service`] - Model lifecycle: load, snapshot, reload
//!
//! # Additivity
//!
//! Grouping only re-buckets attribution mass, so for every explanation
//! `base_value + Σ contributions` equals the scoring model's own margin.
//! The explainer checks this on every request (relative tolerance `1e-6`,
//! absolute floor `1e-9`) and reports a mismatch as
//! [`ExplainError::AdditivityViolation`](creditlens_engine::ExplainError::AdditivityViolation).
//!
//! # Example
//!
//! ```
//! use creditlens_engine::{
//!     ApplicantRecord, FeatureCatalog, FeatureDecl,
//!     model::{LinearModel, ModelMetadata, OneHotTransform, PreprocessingTransform as _},
//! };
//! use creditlens_explainer::{
//!     explainer::{Direction, PerPredictionExplainer},
//!     layer::ExplanationLayer,
//!     service::{LoadedModel, ModelService},
//! };
//!
//! let catalog = FeatureCatalog::new(vec![
//!     FeatureDecl::numeric("age", "Age"),
//!     FeatureDecl::categorical("housing", "Housing", &[("own", "Owns home"), ("rent", "Rents")]),
//! ])
//! .unwrap();
//! let transform = OneHotTransform::new(&catalog);
//! let scoring = LinearModel::new(
//!     transform.encoded_column_names().to_vec(),
//!     0.0,
//!     vec![-0.05, -0.4, 0.4],
//!     vec![40.0, 0.5, 0.5],
//! )
//! .unwrap();
//! let metadata: ModelMetadata =
//!     serde_json::from_str(r#"{"name": "demo", "model_type": "logistic_regression"}"#).unwrap();
//!
//! let service = ModelService::new();
//! service
//!     .load(|| LoadedModel::new(catalog, Box::new(transform), Box::new(scoring), metadata))
//!     .unwrap();
//!
//! let model = service.snapshot().unwrap();
//! let applicant = ApplicantRecord::new().with("age", 20.0).with("housing", "rent");
//! let explanation = PerPredictionExplainer::default()
//!     .explain_with_layer(&model, &applicant, ExplanationLayer::Narrative)
//!     .unwrap();
//!
//! let top = &explanation.top_features[0];
//! assert_eq!(top.feature, "age");
//! assert_eq!(top.direction, Direction::IncreasesRisk);
//! assert_eq!(explanation.top_features[1].raw_value.to_string(), "Rents");
//! ```

pub mod display;
pub mod explainer;
pub mod grouper;
pub mod layer;
pub mod service;
