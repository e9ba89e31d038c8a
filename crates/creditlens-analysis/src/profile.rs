//! Global model profile over a reference sample.
//!
//! [`PopulationProfiler`] explains every applicant of a reference sample,
//! groups the attributions per base feature, and summarizes them:
//!
//! 1. **Importance** - features ranked by mean absolute attribution, ties in
//!    declaration order
//! 2. **Direction** - whether a feature raises (`mean > 0`) or lowers risk on
//!    average
//! 3. **Dependence** - for the most important numeric features, how the
//!    attribution moves with the raw value ([`DependenceInsight`])
//!
//! The profile contains only ordered collections, so the same model,
//! population and configuration always serialize to identical bytes.

use std::collections::BTreeMap;

use creditlens_engine::{ApplicantRecord, ExplainError, FeatureCatalog};
use creditlens_explainer::{explainer::Direction, grouper::AttributionGrouper, service::LoadedModel};
use creditlens_stats::descriptive::{DescriptiveStats, SignShares};
use serde::{Deserialize, Serialize};

use crate::{
    dependence::{DependenceInsight, DependenceThresholds},
    sample::ReferenceSample,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfilerConfig {
    /// Maximum number of applicants drawn from the population.
    pub sample_size: usize,
    pub seed: u64,
    /// Number of top-ranked numeric features analyzed for dependence.
    pub dependence_top_k: usize,
    /// Minimum mid-band deviation flagged as nonlinear.
    pub nonlinearity_threshold: f64,
    /// Minimum `|r|` reported as an increasing or decreasing trend.
    pub trend_threshold: f64,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            sample_size: 500,
            seed: 42,
            dependence_top_k: 8,
            nonlinearity_threshold: 0.01,
            trend_threshold: 0.1,
        }
    }
}

/// Attribution summary of one base feature over the sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureProfile {
    pub feature: String,
    pub display_name: String,
    pub mean_abs_attribution: f64,
    pub mean_attribution: f64,
    /// Population standard deviation.
    pub std_attribution: f64,
    pub min: f64,
    pub max: f64,
    /// Percentage of rows with a strictly positive attribution.
    pub pct_positive: f64,
    /// Percentage of rows with a strictly negative attribution.
    pub pct_negative: f64,
    pub direction: Direction,
    pub is_categorical: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationProfile {
    /// Features by descending mean absolute attribution.
    pub ranked_importance: Vec<FeatureProfile>,
    pub direction_by_feature: BTreeMap<String, Direction>,
    /// Ranked like `ranked_importance`.
    pub dependence_insights: Vec<DependenceInsight>,
    pub sample_size: usize,
    pub population_size: usize,
    pub seed: u64,
}

impl PopulationProfile {
    /// Features whose average effect raises risk, in importance order.
    pub fn risk_increasing(&self) -> impl Iterator<Item = &FeatureProfile> + '_ {
        self.ranked_importance
            .iter()
            .filter(|p| p.direction.is_increases_risk())
    }

    /// Features whose average effect lowers risk, in importance order.
    pub fn risk_decreasing(&self) -> impl Iterator<Item = &FeatureProfile> + '_ {
        self.ranked_importance
            .iter()
            .filter(|p| p.direction.is_decreases_risk())
    }

    /// Dependence insights flagged as nonlinear.
    pub fn nonlinear(&self) -> impl Iterator<Item = &DependenceInsight> + '_ {
        self.dependence_insights.iter().filter(|d| d.is_nonlinear)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PopulationProfiler {
    config: ProfilerConfig,
}

impl PopulationProfiler {
    #[must_use]
    pub fn new(config: ProfilerConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &ProfilerConfig {
        &self.config
    }

    /// Draws a reference sample from `population` and profiles it.
    pub fn profile(
        &self,
        model: &LoadedModel,
        population: &[ApplicantRecord],
    ) -> Result<PopulationProfile, ExplainError> {
        let sample = ReferenceSample::draw(population, self.config.sample_size, self.config.seed);
        self.profile_sample(model, &sample)
    }

    /// Profiles an already drawn reference sample of raw applicant records.
    pub fn profile_sample(
        &self,
        model: &LoadedModel,
        sample: &ReferenceSample,
    ) -> Result<PopulationProfile, ExplainError> {
        if sample.is_empty() {
            return Err(ExplainError::invalid_input(
                "reference_sample",
                "the reference sample is empty",
            ));
        }
        let catalog = model.catalog();
        let records = sample
            .records()
            .iter()
            .map(|raw| catalog.engineer(raw))
            .collect::<Result<Vec<_>, _>>()?;

        let rows = model.transform().transform(&records)?;
        let attribution = model.explainer().compute_attribution(&rows)?;
        if attribution.values.rows() != records.len() {
            return Err(ExplainError::collaborator(format!(
                "attribution explainer returned {} rows for {} applicants",
                attribution.values.rows(),
                records.len()
            )));
        }
        if !attribution.values.is_finite() {
            return Err(ExplainError::collaborator(
                "attribution explainer returned non-finite attributions",
            ));
        }
        let grouped = AttributionGrouper::new(model.encoding()).group_batch(&attribution.values)?;

        let mut ranked = Vec::with_capacity(grouped.features().len());
        for (index, feature) in grouped.features().iter().enumerate() {
            let values = grouped.feature_column(index);
            ranked.push((index, feature_profile(catalog, feature, &values)?));
        }
        // stable: equal importance keeps declaration order
        ranked.sort_by(|(_, a), (_, b)| b.mean_abs_attribution.total_cmp(&a.mean_abs_attribution));

        let thresholds = DependenceThresholds {
            nonlinearity: self.config.nonlinearity_threshold,
            trend: self.config.trend_threshold,
        };
        let mut dependence_insights = vec![];
        for (index, profile) in &ranked {
            if dependence_insights.len() >= self.config.dependence_top_k {
                break;
            }
            let is_numeric = catalog
                .get(&profile.feature)
                .is_some_and(|d| d.kind.is_numeric_valued());
            if !is_numeric {
                continue;
            }
            let values = records
                .iter()
                .map(|r| r.number(&profile.feature))
                .collect::<Result<Vec<_>, _>>()?;
            let attributions = grouped.feature_column(*index);
            if let Some(insight) = DependenceInsight::analyze(
                &profile.feature,
                &profile.display_name,
                &values,
                &attributions,
                thresholds,
            ) {
                dependence_insights.push(insight);
            }
        }

        let ranked_importance = ranked.into_iter().map(|(_, p)| p).collect::<Vec<_>>();
        let direction_by_feature = ranked_importance
            .iter()
            .map(|p| (p.feature.clone(), p.direction))
            .collect();

        tracing::info!(
            sample = records.len(),
            population = sample.population_size(),
            seed = sample.seed(),
            features = ranked_importance.len(),
            nonlinear = dependence_insights.iter().filter(|d| d.is_nonlinear).count(),
            "computed population profile"
        );

        Ok(PopulationProfile {
            ranked_importance,
            direction_by_feature,
            dependence_insights,
            sample_size: records.len(),
            population_size: sample.population_size(),
            seed: sample.seed(),
        })
    }
}

fn feature_profile(
    catalog: &FeatureCatalog,
    feature: &str,
    values: &[f64],
) -> Result<FeatureProfile, ExplainError> {
    let empty = || ExplainError::invalid_input(feature, "no attributions to summarize");
    let stats = DescriptiveStats::new(values.iter().copied()).ok_or_else(empty)?;
    let shares = SignShares::new(values.iter().copied()).ok_or_else(empty)?;
    let is_categorical = catalog
        .get(feature)
        .is_some_and(|d| d.kind.is_categorical_valued());
    Ok(FeatureProfile {
        feature: feature.to_owned(),
        display_name: catalog.display_name(feature).to_owned(),
        mean_abs_attribution: stats.mean_abs,
        mean_attribution: stats.mean,
        std_attribution: stats.std_dev,
        min: stats.min,
        max: stats.max,
        pct_positive: shares.pct_positive,
        pct_negative: shares.pct_negative,
        direction: Direction::of(stats.mean),
        is_categorical,
    })
}
