//! Domain model for the creditlens attribution engine.
//!
//! This crate holds the static, load-time pieces every other creditlens crate
//! builds on:
//!
//! - [`FeatureCatalog`] - Declared base features in a fixed declaration order,
//!   with display names, category label tables and derived-feature formulas
//! - [`ApplicantRecord`] - One applicant's feature values, plus feature
//!   engineering of the formula-derived features
//! - [`EncodingMap`] - Mapping from encoded column names to base features
//! - [`model`] - Traits for the consumed collaborators (preprocessing
//!   transform, scoring model, attribution explainer) and reference
//!   implementations of them
//!
//! # Example
//!
//! ```
//! use creditlens_engine::{EncodingMap, FeatureCatalog, UNKNOWN_FEATURE};
//!
//! let catalog = FeatureCatalog::german_credit();
//! let map = EncodingMap::new(
//!     &["num__duration", "cat__purpose_car_new", "cat__purpose_education", "zzz__mystery"],
//!     &catalog,
//! );
//!
//! assert_eq!(map.resolve("num__duration"), "duration");
//! assert_eq!(map.resolve("cat__purpose_education"), "purpose");
//! assert_eq!(map.resolve("zzz__mystery"), UNKNOWN_FEATURE);
//! ```

pub use self::core::*;

pub mod core;
pub mod model;

/// Failures of the attribution engine.
///
/// Variants are grouped by [`ErrorClass`] so callers can choose a retry policy.
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum ExplainError {
    #[display(
        "attribution vector has {actual} entries but the transform produced {expected} encoded columns"
    )]
    SchemaMismatch { expected: usize, actual: usize },
    #[display("scoring model is not loaded")]
    ModelNotLoaded,
    #[display("invalid input for feature '{feature}': {reason}")]
    InvalidInput { feature: String, reason: String },
    #[display("no population profile is available for the current model")]
    StaleProfile,
    #[display("grouped attributions reconstruct score {actual} but the model scored {expected}")]
    AdditivityViolation { expected: f64, actual: f64 },
    #[display("collaborator failed: {message}")]
    Collaborator { message: String },
}

/// Coarse classification of an [`ExplainError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum ErrorClass {
    /// The request itself is wrong; retrying it unchanged will fail again.
    InvalidInput,
    /// The service is not ready yet; retry later.
    NotReady,
    /// Internal inconsistency between collaborators; needs investigation.
    Internal,
}

impl ExplainError {
    pub fn invalid_input(feature: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            feature: feature.into(),
            reason: reason.into(),
        }
    }

    pub fn collaborator(message: impl Into<String>) -> Self {
        Self::Collaborator {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidInput { .. } => ErrorClass::InvalidInput,
            Self::ModelNotLoaded | Self::StaleProfile => ErrorClass::NotReady,
            Self::SchemaMismatch { .. }
            | Self::AdditivityViolation { .. }
            | Self::Collaborator { .. } => ErrorClass::Internal,
        }
    }
}
