use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::{
    ExplainError,
    core::{derived::DerivedFormula, record::ApplicantRecord},
};

/// Id of the pseudo-feature that collects encoded columns no declared feature claims.
pub const UNKNOWN_FEATURE: &str = "unknown";

/// Display name of the [`UNKNOWN_FEATURE`] pseudo-feature.
pub const UNKNOWN_DISPLAY_NAME: &str = "Unmapped encoded columns";

/// How a base feature is represented before and after encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::IsVariant)]
#[serde(rename_all = "snake_case", tag = "type", content = "formula")]
pub enum FeatureKind {
    /// Numeric input passed through the transform as a single column.
    Numeric,
    /// Numeric feature computed from other inputs by a fixed formula.
    Derived(DerivedFormula),
    /// Categorical input expanded into one one-hot column per category.
    Categorical,
    /// Categorical input encoded as a single ordinal column.
    Ordinal,
}

impl FeatureKind {
    /// Whether values of this feature are numbers (input or derived).
    #[must_use]
    pub fn is_numeric_valued(self) -> bool {
        matches!(self, Self::Numeric | Self::Derived(_))
    }

    /// Whether values of this feature are category literals.
    #[must_use]
    pub fn is_categorical_valued(self) -> bool {
        matches!(self, Self::Categorical | Self::Ordinal)
    }
}

/// Declaration of one base feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureDecl {
    pub id: String,
    pub display_name: String,
    pub kind: FeatureKind,
    /// Declared categories in encoding order (categorical and ordinal features only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    /// Human-readable labels for category literals.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

impl FeatureDecl {
    #[must_use]
    pub fn numeric(id: &str, display_name: &str) -> Self {
        Self {
            id: id.to_owned(),
            display_name: display_name.to_owned(),
            kind: FeatureKind::Numeric,
            categories: vec![],
            labels: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn derived(formula: DerivedFormula) -> Self {
        Self {
            id: formula.id().to_owned(),
            display_name: formula.display_name().to_owned(),
            kind: FeatureKind::Derived(formula),
            categories: vec![],
            labels: BTreeMap::new(),
        }
    }

    /// Declares a one-hot categorical feature from `(category, label)` pairs.
    #[must_use]
    pub fn categorical(id: &str, display_name: &str, categories: &[(&str, &str)]) -> Self {
        Self::with_categories(id, display_name, FeatureKind::Categorical, categories)
    }

    /// Declares an ordinal feature from `(category, label)` pairs in rank order.
    #[must_use]
    pub fn ordinal(id: &str, display_name: &str, categories: &[(&str, &str)]) -> Self {
        Self::with_categories(id, display_name, FeatureKind::Ordinal, categories)
    }

    fn with_categories(
        id: &str,
        display_name: &str,
        kind: FeatureKind,
        categories: &[(&str, &str)],
    ) -> Self {
        Self {
            id: id.to_owned(),
            display_name: display_name.to_owned(),
            kind,
            categories: categories.iter().map(|(c, _)| (*c).to_owned()).collect(),
            labels: categories
                .iter()
                .map(|(c, l)| ((*c).to_owned(), (*l).to_owned()))
                .collect(),
        }
    }

    /// Human-readable label of a category literal, falling back to the literal itself.
    #[must_use]
    pub fn label_for<'a>(&'a self, category: &'a str) -> &'a str {
        self.labels.get(category).map_or(category, String::as_str)
    }

    /// Position of a category in the declared encoding order.
    #[must_use]
    pub fn category_index(&self, category: &str) -> Option<usize> {
        self.categories.iter().position(|c| c == category)
    }
}

/// Declared base features in a fixed declaration order.
///
/// Declaration order is the stable tie-break order used wherever features
/// are ranked, so that equal attributions always list the same way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<FeatureDecl>", into = "Vec<FeatureDecl>")]
pub struct FeatureCatalog {
    features: Vec<FeatureDecl>,
}

impl TryFrom<Vec<FeatureDecl>> for FeatureCatalog {
    type Error = ExplainError;

    fn try_from(features: Vec<FeatureDecl>) -> Result<Self, Self::Error> {
        Self::new(features)
    }
}

impl From<FeatureCatalog> for Vec<FeatureDecl> {
    fn from(catalog: FeatureCatalog) -> Self {
        catalog.features
    }
}

impl FeatureCatalog {
    /// Builds a catalog, checking that the declarations are consistent.
    ///
    /// Ids must be unique and non-empty and must not collide with
    /// [`UNKNOWN_FEATURE`]; categorical and ordinal features need at least one
    /// category; every input a derived formula reads must be declared numeric.
    pub fn new(features: Vec<FeatureDecl>) -> Result<Self, ExplainError> {
        let mut seen = HashSet::new();
        for decl in &features {
            if decl.id.is_empty() || decl.id == UNKNOWN_FEATURE {
                return Err(ExplainError::invalid_input(
                    &decl.id,
                    "feature id must be non-empty and must not be reserved",
                ));
            }
            if !seen.insert(decl.id.as_str()) {
                return Err(ExplainError::invalid_input(
                    &decl.id,
                    "feature is declared more than once",
                ));
            }
            if decl.kind.is_categorical_valued() && decl.categories.is_empty() {
                return Err(ExplainError::invalid_input(
                    &decl.id,
                    "categorical feature declares no categories",
                ));
            }
        }

        let catalog = Self { features };
        for decl in &catalog.features {
            if let FeatureKind::Derived(formula) = decl.kind {
                if decl.id != formula.id() {
                    return Err(ExplainError::invalid_input(
                        &decl.id,
                        format!("derived feature must be named '{}'", formula.id()),
                    ));
                }
                for input in formula.inputs() {
                    let declared_numeric = catalog
                        .get(input)
                        .is_some_and(|d| d.kind == FeatureKind::Numeric);
                    if !declared_numeric {
                        return Err(ExplainError::invalid_input(
                            *input,
                            format!("input of '{}' must be declared numeric", formula.id()),
                        ));
                    }
                }
            }
        }
        Ok(catalog)
    }

    /// The built-in German-credit feature declaration.
    #[must_use]
    pub fn german_credit() -> Self {
        let features = vec![
            FeatureDecl::numeric("duration", "Loan duration (months)"),
            FeatureDecl::numeric("amount", "Credit amount"),
            FeatureDecl::numeric("age", "Age (years)"),
            FeatureDecl::numeric("employment_years", "Years in current employment"),
            FeatureDecl::numeric("installment_rate", "Installment rate (% of income)"),
            FeatureDecl::derived(DerivedFormula::MonthlyBurden),
            FeatureDecl::derived(DerivedFormula::StabilityScore),
            FeatureDecl::derived(DerivedFormula::RiskRatio),
            FeatureDecl::derived(DerivedFormula::CreditToIncomeProxy),
            FeatureDecl::derived(DerivedFormula::DurationRisk),
            FeatureDecl::categorical(
                "checking_status",
                "Checking account status",
                &[
                    ("lt_0", "Overdrawn (below 0 DM)"),
                    ("0_to_200", "0 to 200 DM"),
                    ("ge_200", "200 DM or more"),
                    ("none", "No checking account"),
                ],
            ),
            FeatureDecl::categorical(
                "credit_history",
                "Credit history",
                &[
                    ("no_credits", "No credits taken"),
                    ("all_paid", "All credits paid back duly"),
                    ("existing_paid", "Existing credits paid back duly"),
                    ("delayed", "Delay in paying off in the past"),
                    ("critical", "Critical account"),
                ],
            ),
            FeatureDecl::categorical(
                "purpose",
                "Loan purpose",
                &[
                    ("car_new", "New car"),
                    ("car_used", "Used car"),
                    ("furniture", "Furniture or equipment"),
                    ("radio_tv", "Radio or television"),
                    ("education", "Education"),
                    ("business", "Business"),
                    ("other", "Other purpose"),
                ],
            ),
            FeatureDecl::categorical(
                "housing",
                "Housing",
                &[("own", "Owns home"), ("rent", "Rents"), ("free", "Lives for free")],
            ),
            FeatureDecl::categorical(
                "job",
                "Job category",
                &[
                    ("unskilled", "Unskilled"),
                    ("skilled", "Skilled employee"),
                    ("management", "Management or highly qualified"),
                ],
            ),
            FeatureDecl::ordinal(
                "savings_status",
                "Savings",
                &[
                    ("none", "No savings account"),
                    ("lt_100", "Below 100 DM"),
                    ("100_to_500", "100 to 500 DM"),
                    ("500_to_1000", "500 to 1000 DM"),
                    ("ge_1000", "1000 DM or more"),
                ],
            ),
        ];
        Self { features }
    }

    #[must_use]
    pub fn features(&self) -> &[FeatureDecl] {
        &self.features
    }

    pub fn iter(&self) -> impl Iterator<Item = &FeatureDecl> + '_ {
        self.features.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&FeatureDecl> {
        self.features.iter().find(|d| d.id == id)
    }

    /// Declaration position of a feature; the unknown pseudo-feature sorts last.
    #[must_use]
    pub fn position(&self, id: &str) -> Option<usize> {
        if id == UNKNOWN_FEATURE {
            return Some(self.features.len());
        }
        self.features.iter().position(|d| d.id == id)
    }

    /// Display name of a feature id, including the unknown pseudo-feature.
    #[must_use]
    pub fn display_name<'a>(&'a self, id: &'a str) -> &'a str {
        if id == UNKNOWN_FEATURE {
            return UNKNOWN_DISPLAY_NAME;
        }
        self.get(id).map_or(id, |d| d.display_name.as_str())
    }

    /// Checks that a record carries a usable value for every declared feature.
    ///
    /// Missing features are never defaulted: a default would silently shift
    /// the attribution mass and mislead the explanation.
    pub fn validate_record(&self, record: &ApplicantRecord) -> Result<(), ExplainError> {
        for decl in &self.features {
            if decl.kind.is_numeric_valued() {
                record.number(&decl.id)?;
            } else {
                record.category(&decl.id)?;
            }
        }
        Ok(())
    }

    /// Computes every derived feature from the raw inputs of `raw`.
    ///
    /// The returned record holds the raw inputs plus all derived values and
    /// has passed [`validate_record`](Self::validate_record).
    pub fn engineer(&self, raw: &ApplicantRecord) -> Result<ApplicantRecord, ExplainError> {
        let mut record = raw.clone();
        for decl in &self.features {
            if let FeatureKind::Derived(formula) = decl.kind {
                let value = formula.compute(raw)?;
                record.insert(decl.id.clone(), value.into());
            }
        }
        self.validate_record(&record)?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_german_credit_catalog_is_valid() {
        let catalog = FeatureCatalog::german_credit();
        let rebuilt = FeatureCatalog::new(catalog.features().to_vec()).unwrap();
        assert_eq!(rebuilt, catalog);
        assert_eq!(
            catalog
                .iter()
                .filter(|d| matches!(d.kind, FeatureKind::Derived(_)))
                .count(),
            DerivedFormula::ALL.len()
        );
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let err = FeatureCatalog::new(vec![
            FeatureDecl::numeric("age", "Age"),
            FeatureDecl::numeric("age", "Age again"),
        ])
        .unwrap_err();
        assert!(matches!(err, ExplainError::InvalidInput { feature, .. } if feature == "age"));
    }

    #[test]
    fn test_reserved_id_is_rejected() {
        assert!(FeatureCatalog::new(vec![FeatureDecl::numeric(UNKNOWN_FEATURE, "?")]).is_err());
    }

    #[test]
    fn test_derived_inputs_must_be_declared() {
        let err = FeatureCatalog::new(vec![
            FeatureDecl::numeric("amount", "Amount"),
            FeatureDecl::derived(DerivedFormula::MonthlyBurden),
        ])
        .unwrap_err();
        assert!(matches!(err, ExplainError::InvalidInput { feature, .. } if feature == "duration"));
    }

    #[test]
    fn test_labels_fall_back_to_literal() {
        let catalog = FeatureCatalog::german_credit();
        let purpose = catalog.get("purpose").unwrap();
        assert_eq!(purpose.label_for("car_new"), "New car");
        assert_eq!(purpose.label_for("spaceship"), "spaceship");
    }

    #[test]
    fn test_unknown_sorts_last() {
        let catalog = FeatureCatalog::german_credit();
        assert_eq!(catalog.position("duration"), Some(0));
        assert_eq!(catalog.position(UNKNOWN_FEATURE), Some(catalog.len()));
        assert_eq!(catalog.display_name(UNKNOWN_FEATURE), UNKNOWN_DISPLAY_NAME);
    }

    #[test]
    fn test_catalog_json_roundtrip_validates() {
        let json = r#"[
            {"id": "age", "display_name": "Age", "kind": {"type": "numeric"}},
            {"id": "job", "display_name": "Job", "kind": {"type": "categorical"},
             "categories": ["a", "b"], "labels": {"a": "Alpha"}}
        ]"#;
        let catalog: FeatureCatalog = serde_json::from_str(json).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get("job").unwrap().label_for("a"), "Alpha");

        let bad = r#"[{"id": "job", "display_name": "Job", "kind": {"type": "categorical"}}]"#;
        assert!(serde_json::from_str::<FeatureCatalog>(bad).is_err());
    }
}
