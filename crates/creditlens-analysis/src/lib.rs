//! Global explanations of a credit-risk model over an applicant population.
//!
//! Where `creditlens-explainer` explains one prediction, this crate explains
//! the model as a whole: which features matter most across applicants, in
//! which direction they push the risk score, and how their effect changes
//! with their value.
//!
//! # Workflow
//!
//! 1. **Sample** ([`sample::ReferenceSample`]): Draw a seeded reference sample
//!    from the population
//! 2. **Profile** ([`profile::PopulationProfiler`]): Attribute every sampled
//!    applicant, group per base feature, rank by mean absolute attribution
//! 3. **Dependence** ([`dependence::DependenceInsight`]): Relate raw values of
//!    the top numeric features to their attributions
//! 4. **Report** ([`report::ReportComposer`]): Format the profile and model
//!    metadata as a structured document
//!
//! [`cache::ProfileCache`] keeps the last computed profile per model
//! generation so that reports do not recompute it for every request.
//!
//! # Example
//!
//! ```
//! use creditlens_analysis::{
//!     profile::{PopulationProfiler, ProfilerConfig},
//!     report::ReportComposer,
//! };
//! use creditlens_engine::{
//!     ApplicantRecord, FeatureCatalog, FeatureDecl,
//!     model::{LinearModel, ModelMetadata, OneHotTransform, PreprocessingTransform as _},
//! };
//! use creditlens_explainer::service::LoadedModel;
//!
//! let catalog = FeatureCatalog::new(vec![
//!     FeatureDecl::numeric("age", "Age"),
//!     FeatureDecl::numeric("duration", "Loan duration"),
//! ])
//! .unwrap();
//! let transform = OneHotTransform::new(&catalog);
//! let scoring = LinearModel::new(
//!     transform.encoded_column_names().to_vec(),
//!     -1.0,
//!     vec![-0.03, 0.05],
//!     vec![30.0, 24.0],
//! )
//! .unwrap();
//! let metadata: ModelMetadata =
//!     serde_json::from_str(r#"{"name": "demo", "model_type": "logistic_regression"}"#).unwrap();
//! let model =
//!     LoadedModel::new(catalog, Box::new(transform), Box::new(scoring), metadata).unwrap();
//!
//! let population = (0..200)
//!     .map(|i| {
//!         ApplicantRecord::new()
//!             .with("age", f64::from(20 + i % 40))
//!             .with("duration", f64::from(6 + i % 48))
//!     })
//!     .collect::<Vec<_>>();
//!
//! let profiler = PopulationProfiler::new(ProfilerConfig { sample_size: 100, ..Default::default() });
//! let profile = profiler.profile(&model, &population).unwrap();
//! assert_eq!(profile.ranked_importance[0].feature, "duration");
//! assert_eq!(profile.sample_size, 100);
//!
//! let report = ReportComposer::default().compose(model.metadata(), &profile);
//! assert_eq!(report.risk_decreasing, ["Age"]);
//! ```

pub mod cache;
pub mod dependence;
pub mod profile;
pub mod report;
pub mod sample;
