//! Global explanation report.
//!
//! [`ReportComposer`] turns a [`PopulationProfile`] and the model's
//! [`ModelMetadata`] into a [`ReportDocument`]. The document serializes
//! with serde for programmatic consumers and renders as plain text through
//! its `Display` implementation. Its sections always appear in this order:
//!
//! 1. Model overview
//! 2. Ranked feature importance
//! 3. Direction of effects
//! 4. Dependence insights
//! 5. Risk-increasing and risk-decreasing features
//! 6. Nonlinear patterns
//! 7. Narrative summary
//! 8. Disclaimers
//!
//! The narrative is generated from a [`NarrativeContext`], which carries
//! display names and plain-language direction labels only.

use std::fmt;

use creditlens_engine::model::ModelMetadata;
use creditlens_explainer::explainer::Direction;
use serde::{Deserialize, Serialize};

use crate::{dependence::DependenceInsight, profile::PopulationProfile};

/// Disclaimers appended to every report after the data-source note.
pub const DEFAULT_DISCLAIMERS: &[&str] = &[
    "Attributions describe how the model uses each feature. They are not causal effects on \
     credit risk.",
    "Category effects are summed per original feature; individual categories are not reported \
     separately.",
    "Nonlinear patterns are flagged by comparing band averages. The flag does not identify the \
     shape of the relationship.",
];

/// Number of leading features named in the narrative summary.
const NARRATIVE_TOP_FACTORS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelOverview {
    pub model: ModelMetadata,
    pub sample_size: usize,
    pub population_size: usize,
    pub seed: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportanceEntry {
    /// 1-based.
    pub rank: usize,
    pub feature: String,
    pub display_name: String,
    pub mean_abs_attribution: f64,
    /// Percentage of the summed mean absolute attribution of all features.
    pub share_pct: f64,
    pub pct_positive: f64,
    pub pct_negative: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionEntry {
    pub feature: String,
    pub display_name: String,
    pub mean_attribution: f64,
    pub direction: Direction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NonlinearPattern {
    pub feature: String,
    pub display_name: String,
    pub attribution_at_low: Option<f64>,
    pub attribution_at_mid: Option<f64>,
    pub attribution_at_high: Option<f64>,
}

/// Ordered report sections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDocument {
    pub overview: ModelOverview,
    pub ranked_importance: Vec<ImportanceEntry>,
    pub directions: Vec<DirectionEntry>,
    pub dependence_insights: Vec<DependenceInsight>,
    /// Display names in importance order.
    pub risk_increasing: Vec<String>,
    /// Display names in importance order.
    pub risk_decreasing: Vec<String>,
    pub nonlinear_patterns: Vec<NonlinearPattern>,
    pub narrative: Vec<String>,
    pub disclaimers: Vec<String>,
}

/// One factor of the narrative summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrativeFactor {
    pub name: String,
    /// Plain-language label such as `"increases risk"`.
    pub effect: String,
}

/// Input of narrative generation.
///
/// Holds only what a reader of the report is meant to see: display names
/// and plain-language labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrativeContext {
    pub model_name: String,
    pub sample_size: usize,
    pub population_size: usize,
    /// In importance order.
    pub factors: Vec<NarrativeFactor>,
    pub nonlinear: Vec<String>,
}

impl NarrativeContext {
    #[must_use]
    pub fn new(metadata: &ModelMetadata, profile: &PopulationProfile) -> Self {
        Self {
            model_name: metadata.name.clone(),
            sample_size: profile.sample_size,
            population_size: profile.population_size,
            factors: profile
                .ranked_importance
                .iter()
                .map(|p| NarrativeFactor {
                    name: p.display_name.clone(),
                    effect: p.direction.to_string(),
                })
                .collect(),
            nonlinear: profile
                .nonlinear()
                .map(|d| d.display_name.clone())
                .collect(),
        }
    }

    /// Templated summary paragraphs.
    ///
    /// ```
    /// use creditlens_analysis::report::{NarrativeContext, NarrativeFactor};
    ///
    /// let context = NarrativeContext {
    ///     model_name: "credit-gbm".to_owned(),
    ///     sample_size: 500,
    ///     population_size: 1000,
    ///     factors: vec![
    ///         NarrativeFactor { name: "Age".to_owned(), effect: "decreases risk".to_owned() },
    ///         NarrativeFactor { name: "Duration".to_owned(), effect: "increases risk".to_owned() },
    ///     ],
    ///     nonlinear: vec![],
    /// };
    /// let summary = context.summary();
    /// assert_eq!(summary[1], "The most influential factors are Age and Duration.");
    /// assert_eq!(
    ///     summary[2],
    ///     "On average, Duration increases the predicted risk, while Age decreases it."
    /// );
    /// ```
    #[must_use]
    pub fn summary(&self) -> Vec<String> {
        let mut paragraphs = vec![format!(
            "The {} model was profiled on {} of {} applicants.",
            self.model_name, self.sample_size, self.population_size
        )];

        let top = self
            .factors
            .iter()
            .take(NARRATIVE_TOP_FACTORS)
            .map(|f| f.name.as_str())
            .collect::<Vec<_>>();
        if !top.is_empty() {
            let verb = if top.len() == 1 {
                "factor is"
            } else {
                "factors are"
            };
            paragraphs.push(format!(
                "The most influential {verb} {}.",
                join_names(&top)
            ));
        }

        let with_effect = |label: String| {
            self.factors
                .iter()
                .filter(|f| f.effect == label)
                .map(|f| f.name.as_str())
                .collect::<Vec<_>>()
        };
        let increasing = with_effect(Direction::IncreasesRisk.to_string());
        let decreasing = with_effect(Direction::DecreasesRisk.to_string());
        match (increasing.is_empty(), decreasing.is_empty()) {
            (false, false) => paragraphs.push(format!(
                "On average, {} {} the predicted risk, while {} {} it.",
                join_names(&increasing),
                verb_form(increasing.len(), "increases", "increase"),
                join_names(&decreasing),
                verb_form(decreasing.len(), "decreases", "decrease"),
            )),
            (false, true) => paragraphs.push(format!(
                "On average, every factor increases the predicted risk: {}.",
                join_names(&increasing)
            )),
            (true, false) => paragraphs.push(format!(
                "On average, every factor decreases the predicted risk: {}.",
                join_names(&decreasing)
            )),
            (true, true) => {}
        }

        if self.nonlinear.is_empty() {
            paragraphs.push("No nonlinear patterns were flagged.".to_owned());
        } else {
            let names = self.nonlinear.iter().map(String::as_str).collect::<Vec<_>>();
            paragraphs.push(format!(
                "The effect of {} changes shape across its range: mid-range values behave \
                 differently from low and high values.",
                join_names(&names)
            ));
        }
        paragraphs
    }
}

fn join_names(names: &[&str]) -> String {
    match names {
        [] => String::new(),
        [one] => (*one).to_owned(),
        [init @ .., last] => format!("{} and {last}", init.join(", ")),
    }
}

fn verb_form(count: usize, singular: &'static str, plural: &'static str) -> &'static str {
    if count == 1 { singular } else { plural }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportComposer {
    disclaimers: Vec<String>,
}

impl Default for ReportComposer {
    fn default() -> Self {
        Self::new(DEFAULT_DISCLAIMERS.iter().map(|&s| s.to_owned()).collect())
    }
}

impl ReportComposer {
    /// Creates a composer appending `disclaimers` after the data-source note.
    #[must_use]
    pub fn new(disclaimers: Vec<String>) -> Self {
        Self { disclaimers }
    }

    #[must_use]
    pub fn compose(&self, metadata: &ModelMetadata, profile: &PopulationProfile) -> ReportDocument {
        let total = profile
            .ranked_importance
            .iter()
            .map(|p| p.mean_abs_attribution)
            .sum::<f64>();
        let ranked_importance = profile
            .ranked_importance
            .iter()
            .enumerate()
            .map(|(i, p)| ImportanceEntry {
                rank: i + 1,
                feature: p.feature.clone(),
                display_name: p.display_name.clone(),
                mean_abs_attribution: p.mean_abs_attribution,
                share_pct: if total > 0.0 {
                    100.0 * p.mean_abs_attribution / total
                } else {
                    0.0
                },
                pct_positive: p.pct_positive,
                pct_negative: p.pct_negative,
            })
            .collect();
        let directions = profile
            .ranked_importance
            .iter()
            .map(|p| DirectionEntry {
                feature: p.feature.clone(),
                display_name: p.display_name.clone(),
                mean_attribution: p.mean_attribution,
                direction: p.direction,
            })
            .collect();
        let nonlinear_patterns = profile
            .nonlinear()
            .map(|d| NonlinearPattern {
                feature: d.feature.clone(),
                display_name: d.display_name.clone(),
                attribution_at_low: d.attribution_at_low,
                attribution_at_mid: d.attribution_at_mid,
                attribution_at_high: d.attribution_at_high,
            })
            .collect();

        let mut disclaimers = vec![format!(
            "Statistics are computed on a reference sample of {} out of {} applicants drawn \
             with seed {}; other populations may show different patterns.",
            profile.sample_size, profile.population_size, profile.seed
        )];
        disclaimers.extend(self.disclaimers.iter().cloned());

        let document = ReportDocument {
            overview: ModelOverview {
                model: metadata.clone(),
                sample_size: profile.sample_size,
                population_size: profile.population_size,
                seed: profile.seed,
            },
            ranked_importance,
            directions,
            dependence_insights: profile.dependence_insights.clone(),
            risk_increasing: profile
                .risk_increasing()
                .map(|p| p.display_name.clone())
                .collect(),
            risk_decreasing: profile
                .risk_decreasing()
                .map(|p| p.display_name.clone())
                .collect(),
            nonlinear_patterns,
            narrative: NarrativeContext::new(metadata, profile).summary(),
            disclaimers,
        };
        tracing::debug!(
            model = %metadata.name,
            features = document.ranked_importance.len(),
            "composed report"
        );
        document
    }
}

fn heading(f: &mut fmt::Formatter<'_>, title: &str) -> fmt::Result {
    writeln!(f)?;
    writeln!(f, "{title}")?;
    writeln!(f, "{}", "-".repeat(title.chars().count()))
}

fn optional(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_owned(), |v| format!("{v:+.4}"))
}

fn names_or_none(names: &[String]) -> String {
    if names.is_empty() {
        "(none)".to_owned()
    } else {
        names.join(", ")
    }
}

impl fmt::Display for ReportDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let model = &self.overview.model;
        let title = format!("Model Explanation Report: {}", model.name);
        writeln!(f, "{title}")?;
        writeln!(f, "{}", "=".repeat(title.chars().count()))?;

        heading(f, "1. Model Overview")?;
        writeln!(f, "  Model type      : {}", model.model_type)?;
        if let Some(trained_at) = &model.trained_at {
            writeln!(f, "  Trained at      : {trained_at}")?;
        }
        for (name, value) in &model.hyperparameters {
            writeln!(f, "  Hyperparameter  : {name} = {value}")?;
        }
        for (name, value) in &model.metrics {
            writeln!(f, "  Metric          : {name} = {value:.4}")?;
        }
        writeln!(
            f,
            "  Reference sample: {} of {} applicants (seed {})",
            self.overview.sample_size, self.overview.population_size, self.overview.seed
        )?;

        heading(f, "2. Feature Importance")?;
        writeln!(
            f,
            "  {:>4} {:<32} {:>12} {:>8} {:>10} {:>10}",
            "Rank", "Feature", "Mean|attr|", "Share", "Positive", "Negative"
        )?;
        writeln!(f, "  {}", "-".repeat(81))?;
        for entry in &self.ranked_importance {
            writeln!(
                f,
                "  {:>4} {:<32} {:>12.4} {:>7.1}% {:>9.1}% {:>9.1}%",
                entry.rank,
                entry.display_name,
                entry.mean_abs_attribution,
                entry.share_pct,
                entry.pct_positive,
                entry.pct_negative,
            )?;
        }

        heading(f, "3. Direction of Effects")?;
        for entry in &self.directions {
            writeln!(
                f,
                "  {:<32} {:<15} (mean {:+.4})",
                entry.display_name,
                entry.direction.to_string(),
                entry.mean_attribution
            )?;
        }

        heading(f, "4. Dependence Insights")?;
        if self.dependence_insights.is_empty() {
            writeln!(f, "  (no numeric features analyzed)")?;
        }
        for insight in &self.dependence_insights {
            writeln!(
                f,
                "  {}: {} (r = {})",
                insight.display_name,
                insight.relationship,
                insight
                    .correlation
                    .map_or_else(|| "n/a".to_owned(), |r| format!("{r:.3}"))
            )?;
            writeln!(
                f,
                "    Q25/Q50/Q75 = {:.2} / {:.2} / {:.2}; mean attribution low/mid/high = {} / {} / {}",
                insight.q25,
                insight.q50,
                insight.q75,
                optional(insight.attribution_at_low),
                optional(insight.attribution_at_mid),
                optional(insight.attribution_at_high),
            )?;
        }

        heading(f, "5. Risk Factors")?;
        writeln!(
            f,
            "  Increase risk: {}",
            names_or_none(&self.risk_increasing)
        )?;
        writeln!(
            f,
            "  Decrease risk: {}",
            names_or_none(&self.risk_decreasing)
        )?;

        heading(f, "6. Nonlinear Patterns")?;
        if self.nonlinear_patterns.is_empty() {
            writeln!(f, "  (none flagged)")?;
        }
        for pattern in &self.nonlinear_patterns {
            writeln!(
                f,
                "  {}: low {} / mid {} / high {}",
                pattern.display_name,
                optional(pattern.attribution_at_low),
                optional(pattern.attribution_at_mid),
                optional(pattern.attribution_at_high),
            )?;
        }

        heading(f, "7. Summary")?;
        for paragraph in &self.narrative {
            writeln!(f, "  {paragraph}")?;
        }

        heading(f, "8. Disclaimers")?;
        for disclaimer in &self.disclaimers {
            writeln!(f, "  * {disclaimer}")?;
        }
        Ok(())
    }
}
