//! Local explanation of a single prediction.
//!
//! [`PerPredictionExplainer`] runs the full local pipeline for one applicant:
//!
//! 1. **Validate** - every declared feature must be present and usable
//! 2. **Attribute** - transform the record and ask the model's attribution
//!    explainer for per-column attributions and the base value
//! 3. **Group** - sum column attributions per base feature
//!    ([`AttributionGrouper`])
//! 4. **Resolve display values** - labels for categories, equations for
//!    derived features ([`DisplayValue`])
//! 5. **Rank** - descending absolute contribution, ties in declaration order
//! 6. **Check additivity** - `base_value + Σ contributions` must reproduce the
//!    model's own score
//!
//! The explainer holds no mutable state, so one instance can serve any
//! number of concurrent requests.

use std::{fmt, sync::Arc};

use creditlens_engine::{ApplicantRecord, ExplainError, UNKNOWN_FEATURE};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    display::DisplayValue,
    grouper::AttributionGrouper,
    layer::ExplanationLayer,
    service::{LoadedModel, ModelService},
};

/// Relative tolerance of the additivity check.
pub const ADDITIVITY_RELATIVE_TOLERANCE: f64 = 1e-6;

/// Absolute floor of the additivity check, for scores near zero.
pub const ADDITIVITY_ABSOLUTE_TOLERANCE: f64 = 1e-9;

/// Sign of a feature's effect on the risk score.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::IsVariant,
)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[display("increases risk")]
    IncreasesRisk,
    #[display("decreases risk")]
    DecreasesRisk,
}

impl Direction {
    /// `IncreasesRisk` for positive values, `DecreasesRisk` otherwise.
    #[must_use]
    pub fn of(value: f64) -> Self {
        if value > 0.0 {
            Self::IncreasesRisk
        } else {
            Self::DecreasesRisk
        }
    }
}

/// Grouped contribution of one base feature to one prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureAttribution {
    pub feature: String,
    pub display_name: String,
    pub raw_value: DisplayValue,
    pub contribution: f64,
    pub direction: Direction,
}

impl fmt::Display for FeatureAttribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} = {}: {:+.4} ({})",
            self.display_name, self.raw_value, self.contribution, self.direction
        )
    }
}

/// Local explanation of one prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionExplanation {
    pub base_value: f64,
    /// `base_value` plus the sum of all grouped contributions.
    pub predicted_value: f64,
    /// The first `top_n` entries of `all_features`.
    pub top_features: Vec<FeatureAttribution>,
    /// Every grouped feature, ranked.
    pub all_features: Vec<FeatureAttribution>,
    pub assigned_layer: ExplanationLayer,
}

/// An explanation persisted with the session that requested it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionExplanation {
    pub session_id: String,
    pub explanation: PredictionExplanation,
}

impl SessionExplanation {
    /// The layer the session was assigned; later explanations reuse it.
    #[must_use]
    pub fn layer(&self) -> ExplanationLayer {
        self.explanation.assigned_layer
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplainerConfig {
    /// Number of features shown in `top_features`.
    pub top_n: usize,
}

impl Default for ExplainerConfig {
    fn default() -> Self {
        Self { top_n: 5 }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PerPredictionExplainer {
    config: ExplainerConfig,
}

impl PerPredictionExplainer {
    #[must_use]
    pub fn new(config: ExplainerConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &ExplainerConfig {
        &self.config
    }

    /// Explains an engineered record, drawing a fresh presentation layer.
    pub fn explain<R>(
        &self,
        model: &LoadedModel,
        record: &ApplicantRecord,
        rng: &mut R,
    ) -> Result<PredictionExplanation, ExplainError>
    where
        R: Rng + ?Sized,
    {
        let layer = ExplanationLayer::draw(rng);
        self.explain_with_layer(model, record, layer)
    }

    /// Explains a raw record: derived features are engineered first, and
    /// invalid inputs are rejected before the model is consulted.
    pub fn explain_raw<R>(
        &self,
        model: &LoadedModel,
        raw: &ApplicantRecord,
        rng: &mut R,
    ) -> Result<PredictionExplanation, ExplainError>
    where
        R: Rng + ?Sized,
    {
        let record = model.catalog().engineer(raw)?;
        self.explain(model, &record, rng)
    }

    /// Explains an engineered record for a session.
    ///
    /// A session that already has an explanation keeps its layer; a new
    /// session draws one.
    pub fn explain_session<R>(
        &self,
        service: &ModelService,
        session_id: &str,
        previous: Option<&SessionExplanation>,
        record: &ApplicantRecord,
        rng: &mut R,
    ) -> Result<SessionExplanation, ExplainError>
    where
        R: Rng + ?Sized,
    {
        let model: Arc<LoadedModel> = service.snapshot()?;
        let layer = previous.map_or_else(|| ExplanationLayer::draw(rng), SessionExplanation::layer);
        let explanation = self.explain_with_layer(&model, record, layer)?;
        Ok(SessionExplanation {
            session_id: session_id.to_owned(),
            explanation,
        })
    }

    /// Explains an engineered record with a fixed presentation layer.
    pub fn explain_with_layer(
        &self,
        model: &LoadedModel,
        record: &ApplicantRecord,
        layer: ExplanationLayer,
    ) -> Result<PredictionExplanation, ExplainError> {
        let catalog = model.catalog();
        catalog.validate_record(record)?;

        let rows = model.transform().transform(std::slice::from_ref(record))?;
        let attribution = model.explainer().compute_attribution(&rows)?;
        if attribution.values.rows() != 1 {
            return Err(ExplainError::collaborator(format!(
                "attribution explainer returned {} rows for one applicant",
                attribution.values.rows()
            )));
        }
        let grouped = AttributionGrouper::new(model.encoding()).group(attribution.values.row(0))?;

        let mut all_features = Vec::with_capacity(grouped.features().len());
        for (feature, &contribution) in grouped.features().iter().zip(grouped.row(0)) {
            let raw_value = match catalog.get(feature) {
                Some(decl) => DisplayValue::resolve(decl, record)?,
                None if feature == UNKNOWN_FEATURE => DisplayValue::Unavailable,
                None => {
                    return Err(ExplainError::invalid_input(
                        feature.as_str(),
                        "grouped feature is not declared",
                    ));
                }
            };
            all_features.push(FeatureAttribution {
                feature: feature.clone(),
                display_name: catalog.display_name(feature).to_owned(),
                raw_value,
                contribution,
                direction: Direction::of(contribution),
            });
        }
        // stable: equal magnitudes keep declaration order
        all_features.sort_by(|a, b| b.contribution.abs().total_cmp(&a.contribution.abs()));

        let base_value = attribution.base_value;
        let predicted_value = base_value + grouped.row_total(0);
        let score = model
            .scoring()
            .predict_score(&rows)?
            .first()
            .copied()
            .ok_or_else(|| ExplainError::collaborator("scoring model returned no score"))?;
        check_additivity(score, predicted_value)?;

        let top_features = all_features
            .iter()
            .take(self.config.top_n)
            .cloned()
            .collect();

        tracing::debug!(
            base_value,
            predicted_value,
            features = all_features.len(),
            layer = %layer,
            "explained prediction"
        );

        Ok(PredictionExplanation {
            base_value,
            predicted_value,
            top_features,
            all_features,
            assigned_layer: layer,
        })
    }
}

fn check_additivity(expected: f64, actual: f64) -> Result<(), ExplainError> {
    // NaN never compares greater than the tolerance
    if !expected.is_finite() || !actual.is_finite() {
        tracing::warn!(expected, actual, "model score or attributions are not finite");
        return Err(ExplainError::collaborator(format!(
            "model score {expected} or base value plus attributions {actual} is not finite"
        )));
    }
    let tolerance =
        (ADDITIVITY_RELATIVE_TOLERANCE * expected.abs()).max(ADDITIVITY_ABSOLUTE_TOLERANCE);
    if (expected - actual).abs() > tolerance {
        tracing::warn!(expected, actual, "grouped attributions do not add up to the model score");
        return Err(ExplainError::AdditivityViolation { expected, actual });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::thread;

    use creditlens_engine::{
        FeatureCatalog,
        model::{
            AttributionExplainer, ColumnAttributions, LinearModel, Matrix, OneHotTransform,
            PreprocessingTransform, ScoringModel,
        },
    };
    use rand::SeedableRng as _;
    use rand_pcg::Pcg64;

    use super::*;
    use crate::service::tests::{metadata, small_model};

    fn raw_applicant(age: f64, amount: f64) -> ApplicantRecord {
        ApplicantRecord::new()
            .with("duration", 24.0)
            .with("amount", amount)
            .with("age", age)
            .with("employment_years", 4.0)
            .with("installment_rate", 3.0)
            .with("checking_status", "lt_0")
            .with("credit_history", "critical")
            .with("purpose", "education")
            .with("housing", "rent")
            .with("job", "skilled")
            .with("savings_status", "none")
    }

    fn german_model() -> LoadedModel {
        let catalog = FeatureCatalog::german_credit();
        let transform = OneHotTransform::new(&catalog);
        let columns = transform.encoded_column_names().to_vec();
        let weights = (0..columns.len())
            .map(|i| if i % 2 == 0 { 0.01 } else { -0.02 })
            .collect::<Vec<_>>();
        let means = vec![0.5; columns.len()];
        let scoring = LinearModel::new(columns, -0.7, weights, means).unwrap();
        LoadedModel::new(catalog, Box::new(transform), Box::new(scoring), metadata()).unwrap()
    }

    /// A model whose attributions are fixed, to test assembly arithmetic.
    #[derive(Debug)]
    struct FixedModel {
        score: f64,
        base_value: f64,
        attributions: Vec<f64>,
    }

    #[derive(Debug)]
    struct FixedExplainer {
        base_value: f64,
        attributions: Vec<f64>,
    }

    impl ScoringModel for FixedModel {
        fn predict(&self, rows: &Matrix) -> Result<Vec<u8>, ExplainError> {
            Ok(vec![u8::from(self.score > 0.0); rows.rows()])
        }

        fn predict_probability(&self, rows: &Matrix) -> Result<Vec<f64>, ExplainError> {
            Ok(vec![0.5; rows.rows()])
        }

        fn predict_score(&self, rows: &Matrix) -> Result<Vec<f64>, ExplainError> {
            Ok(vec![self.score; rows.rows()])
        }

        fn build_explainer(&self) -> Result<Box<dyn AttributionExplainer>, ExplainError> {
            Ok(Box::new(FixedExplainer {
                base_value: self.base_value,
                attributions: self.attributions.clone(),
            }))
        }
    }

    impl AttributionExplainer for FixedExplainer {
        fn compute_attribution(&self, rows: &Matrix) -> Result<ColumnAttributions, ExplainError> {
            let values = vec![self.attributions.clone(); rows.rows()];
            Ok(ColumnAttributions {
                base_value: self.base_value,
                values: Matrix::from_rows(&values)?,
            })
        }
    }

    fn fixed_model(score: f64, base_value: f64, attributions: Vec<f64>) -> LoadedModel {
        let catalog = small_model(0.0).catalog().clone();
        let transform = OneHotTransform::new(&catalog);
        let scoring = FixedModel {
            score,
            base_value,
            attributions,
        };
        LoadedModel::new(catalog, Box::new(transform), Box::new(scoring), metadata()).unwrap()
    }

    /// One-hot columns plus a constant `remainder__bias` column that no
    /// declared feature claims.
    #[derive(Debug)]
    struct BiasColumnTransform {
        one_hot: OneHotTransform,
        columns: Vec<String>,
    }

    impl BiasColumnTransform {
        fn new(catalog: &FeatureCatalog) -> Self {
            let one_hot = OneHotTransform::new(catalog);
            let mut columns = one_hot.encoded_column_names().to_vec();
            columns.push("remainder__bias".to_owned());
            Self { one_hot, columns }
        }
    }

    impl PreprocessingTransform for BiasColumnTransform {
        fn encoded_column_names(&self) -> &[String] {
            &self.columns
        }

        fn transform(&self, records: &[ApplicantRecord]) -> Result<Matrix, ExplainError> {
            let encoded = self.one_hot.transform(records)?;
            let rows = encoded
                .iter_rows()
                .map(|row| row.iter().copied().chain([1.0]).collect::<Vec<_>>())
                .collect::<Vec<_>>();
            Matrix::from_rows_with_cols(&rows, self.columns.len())
        }
    }

    fn small_record() -> ApplicantRecord {
        ApplicantRecord::new()
            .with("age", 30.0)
            .with("housing", "own")
    }

    #[test]
    fn test_predicted_value_is_base_plus_contributions() {
        // columns: num__age, cat__housing_own, cat__housing_rent
        let model = fixed_model(0.45, 0.30, vec![0.10, 0.03, 0.02]);
        let explanation = PerPredictionExplainer::default()
            .explain_with_layer(&model, &small_record(), ExplanationLayer::Waterfall)
            .unwrap();
        assert!((explanation.base_value - 0.30).abs() < 1e-12);
        assert!((explanation.predicted_value - 0.45).abs() < 1e-12);
        assert_eq!(explanation.assigned_layer, ExplanationLayer::Waterfall);
        assert_eq!(explanation.all_features[0].feature, "age");
        assert!((explanation.all_features[1].contribution - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_additivity_violation_is_reported() {
        let model = fixed_model(0.90, 0.30, vec![0.10, 0.03, 0.02]);
        let err = PerPredictionExplainer::default()
            .explain_with_layer(&model, &small_record(), ExplanationLayer::Minimal)
            .unwrap_err();
        assert!(matches!(err, ExplainError::AdditivityViolation { .. }));
        assert!(err.class().is_internal());
    }

    #[test]
    fn test_additivity_tolerance() {
        assert!(check_additivity(1000.0, 1000.0 + 1e-4).is_ok());
        assert!(check_additivity(1000.0, 1000.0 + 1e-2).is_err());
        assert!(check_additivity(0.0, 1e-10).is_ok());
        assert!(check_additivity(0.0, 1e-8).is_err());
    }

    #[test]
    fn test_non_finite_attribution_is_rejected() {
        let model = fixed_model(0.45, 0.30, vec![f64::NAN, 0.0, 0.0]);
        let err = PerPredictionExplainer::default()
            .explain_with_layer(&model, &small_record(), ExplanationLayer::Minimal)
            .unwrap_err();
        assert!(matches!(err, ExplainError::Collaborator { .. }));
        assert!(err.class().is_internal());

        assert!(check_additivity(f64::INFINITY, f64::INFINITY).is_err());
        assert!(check_additivity(0.45, f64::NAN).is_err());
    }

    #[test]
    fn test_overflowing_score_is_rejected() {
        let catalog = small_model(0.0).catalog().clone();
        let transform = OneHotTransform::new(&catalog);
        let scoring = LinearModel::new(
            transform.encoded_column_names().to_vec(),
            0.0,
            vec![1e308, 0.0, 0.0],
            vec![0.0, 0.0, 0.0],
        )
        .unwrap();
        let model =
            LoadedModel::new(catalog, Box::new(transform), Box::new(scoring), metadata()).unwrap();
        let err = PerPredictionExplainer::default()
            .explain_with_layer(&model, &small_record(), ExplanationLayer::Minimal)
            .unwrap_err();
        assert!(matches!(err, ExplainError::Collaborator { .. }));
    }

    #[test]
    fn test_unmapped_column_is_explained_as_unknown() {
        let catalog = small_model(0.0).catalog().clone();
        let transform = BiasColumnTransform::new(&catalog);
        // columns: num__age, cat__housing_own, cat__housing_rent, remainder__bias
        let scoring = LinearModel::new(
            transform.encoded_column_names().to_vec(),
            -0.5,
            vec![0.01, 0.2, -0.1, 0.3],
            vec![40.0, 0.5, 0.5, 0.0],
        )
        .unwrap();
        let model =
            LoadedModel::new(catalog, Box::new(transform), Box::new(scoring), metadata()).unwrap();
        assert_eq!(model.encoding().unresolved_columns(), ["remainder__bias"]);

        let explanation = PerPredictionExplainer::default()
            .explain_with_layer(&model, &small_record(), ExplanationLayer::Detailed)
            .unwrap();
        let features = explanation
            .all_features
            .iter()
            .map(|a| a.feature.as_str())
            .collect::<Vec<_>>();
        // unknown 0.3, housing 0.1 + 0.05, age -0.1
        assert_eq!(features, [UNKNOWN_FEATURE, "housing", "age"]);
        let unknown = &explanation.all_features[0];
        assert_eq!(unknown.display_name, "Unmapped encoded columns");
        assert_eq!(unknown.raw_value, DisplayValue::Unavailable);
        assert_eq!(unknown.raw_value.to_string(), "n/a");
        assert!((unknown.contribution - 0.3).abs() < 1e-12);
        assert_eq!(unknown.direction, Direction::IncreasesRisk);

        let score = model
            .scoring()
            .predict_score(&model.transform().transform(&[small_record()]).unwrap())
            .unwrap()[0];
        assert!((explanation.predicted_value - score).abs() < 1e-12);
    }

    #[test]
    fn test_schema_mismatch_from_explainer() {
        let model = fixed_model(0.1, 0.1, vec![0.0, 0.0]);
        let err = PerPredictionExplainer::default()
            .explain_with_layer(&model, &small_record(), ExplanationLayer::Minimal)
            .unwrap_err();
        assert_eq!(
            err,
            ExplainError::SchemaMismatch {
                expected: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn test_ranking_breaks_ties_in_declaration_order() {
        let model = fixed_model(0.0, 0.0, vec![-0.2, 0.1, 0.1]);
        let explainer = PerPredictionExplainer::new(ExplainerConfig { top_n: 1 });
        let explanation = explainer
            .explain_with_layer(&model, &small_record(), ExplanationLayer::Detailed)
            .unwrap();
        // |age| and |housing| tie at 0.2: declaration order puts age first
        let order = explanation
            .all_features
            .iter()
            .map(|f| f.feature.as_str())
            .collect::<Vec<_>>();
        assert_eq!(order, ["age", "housing"]);
        assert_eq!(explanation.top_features.len(), 1);
        assert_eq!(explanation.top_features[0].direction, Direction::DecreasesRisk);

        let model = fixed_model(0.4, 0.0, vec![0.2, 0.2, 0.0]);
        let explanation = explainer
            .explain_with_layer(&model, &small_record(), ExplanationLayer::Detailed)
            .unwrap();
        assert_eq!(explanation.top_features[0].feature, "age");
        assert_eq!(explanation.all_features[1].feature, "housing");
    }

    #[test]
    fn test_top_n_keeps_full_list() {
        let model = german_model();
        let mut rng = Pcg64::seed_from_u64(3);
        let explanation = PerPredictionExplainer::default()
            .explain_raw(&model, &raw_applicant(35.0, 5000.0), &mut rng)
            .unwrap();
        assert_eq!(explanation.top_features.len(), 5);
        assert_eq!(explanation.all_features.len(), model.catalog().len());
        assert_eq!(explanation.top_features[..], explanation.all_features[..5]);
        for pair in explanation.all_features.windows(2) {
            assert!(pair[0].contribution.abs() >= pair[1].contribution.abs());
        }
        let mut seen = explanation
            .all_features
            .iter()
            .map(|f| f.feature.clone())
            .collect::<Vec<_>>();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), model.catalog().len());
    }

    #[test]
    fn test_derived_feature_shows_equation() {
        let model = german_model();
        let mut rng = Pcg64::seed_from_u64(3);
        let explanation = PerPredictionExplainer::default()
            .explain_raw(&model, &raw_applicant(35.0, 2400.0), &mut rng)
            .unwrap();
        let burden = explanation
            .all_features
            .iter()
            .find(|f| f.feature == "monthly_burden")
            .unwrap();
        assert_eq!(burden.raw_value.to_string(), "100 (amount ÷ duration)");
        let purpose = explanation
            .all_features
            .iter()
            .find(|f| f.feature == "purpose")
            .unwrap();
        assert_eq!(purpose.raw_value.to_string(), "Education");
    }

    #[test]
    fn test_zero_age_fails_before_the_model() {
        // reaching this model would fail with a schema mismatch instead
        let catalog = FeatureCatalog::german_credit();
        let transform = OneHotTransform::new(&catalog);
        let scoring = FixedModel {
            score: 0.0,
            base_value: 0.0,
            attributions: vec![],
        };
        let model =
            LoadedModel::new(catalog, Box::new(transform), Box::new(scoring), metadata()).unwrap();
        let mut rng = Pcg64::seed_from_u64(0);
        let err = PerPredictionExplainer::default()
            .explain_raw(&model, &raw_applicant(0.0, 2400.0), &mut rng)
            .unwrap_err();
        assert!(matches!(&err, ExplainError::InvalidInput { feature, .. } if feature == "age"));
        assert!(err.class().is_invalid_input());
    }

    #[test]
    fn test_missing_feature_is_never_defaulted() {
        let model = small_model(0.0);
        let record = ApplicantRecord::new().with("age", 30.0);
        let err = PerPredictionExplainer::default()
            .explain_with_layer(&model, &record, ExplanationLayer::Minimal)
            .unwrap_err();
        assert!(matches!(err, ExplainError::InvalidInput { feature, .. } if feature == "housing"));
    }

    #[test]
    fn test_session_keeps_its_layer() {
        let service = ModelService::new();
        let explainer = PerPredictionExplainer::default();
        let mut rng = Pcg64::seed_from_u64(11);
        assert_eq!(
            explainer
                .explain_session(&service, "s-1", None, &small_record(), &mut rng)
                .unwrap_err(),
            ExplainError::ModelNotLoaded
        );

        service.load(|| Ok(small_model(0.0))).unwrap();
        let first = explainer
            .explain_session(&service, "s-1", None, &small_record(), &mut rng)
            .unwrap();
        for _ in 0..10 {
            let next = explainer
                .explain_session(&service, "s-1", Some(&first), &small_record(), &mut rng)
                .unwrap();
            assert_eq!(next.layer(), first.layer());
        }
        let json = serde_json::to_string(&first).unwrap();
        let restored: SessionExplanation = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, first);
    }

    #[test]
    fn test_concurrent_explanations_are_independent() {
        let service = ModelService::new();
        service.load(|| Ok(german_model())).unwrap();
        let model = service.snapshot().unwrap();
        let explainer = PerPredictionExplainer::default();

        let applicants = (0..8)
            .map(|i| raw_applicant(25.0 + f64::from(i) * 5.0, 1000.0 + f64::from(i) * 750.0))
            .collect::<Vec<_>>();
        let sequential = applicants
            .iter()
            .map(|a| {
                explainer
                    .explain_raw(&model, a, &mut Pcg64::seed_from_u64(5))
                    .unwrap()
            })
            .collect::<Vec<_>>();

        let concurrent = thread::scope(|s| {
            let handles = applicants
                .iter()
                .map(|a| {
                    let model = Arc::clone(&model);
                    let explainer = &explainer;
                    s.spawn(move || {
                        explainer
                            .explain_raw(&model, a, &mut Pcg64::seed_from_u64(5))
                            .unwrap()
                    })
                })
                .collect::<Vec<_>>();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .collect::<Vec<_>>()
        });

        assert_eq!(sequential, concurrent);
        assert_ne!(concurrent[0].predicted_value, concurrent[7].predicted_value);
    }
}
