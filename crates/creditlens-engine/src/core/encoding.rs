use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::catalog::{FeatureCatalog, FeatureKind, UNKNOWN_FEATURE};

/// Separator between the transformer-stage prefix and the column name proper.
pub const NAMESPACE_SEPARATOR: &str = "__";

/// How an encoded column relates to its base feature.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::IsVariant,
)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Numeric,
    CategoricalOneHot,
    CategoricalOrdinal,
    /// Claimed by no declared feature; grouped under [`UNKNOWN_FEATURE`].
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedColumn {
    pub name: String,
    pub base_feature: String,
    pub kind: ColumnKind,
}

/// Static mapping from encoded column names to base features.
///
/// Built once when a model is loaded. Every encoded column maps to exactly
/// one base feature; columns no declared feature claims go to the
/// [`UNKNOWN_FEATURE`] pseudo-feature so their attribution mass is kept.
///
/// Resolution strips the stage prefix up to [`NAMESPACE_SEPARATOR`], then
/// tries an exact match on a declared feature id, then the longest
/// `<categorical_id>_` prefix:
///
/// ```
/// use creditlens_engine::{ColumnKind, EncodingMap, FeatureCatalog, FeatureDecl};
///
/// let catalog = FeatureCatalog::new(vec![
///     FeatureDecl::categorical("job", "Job", &[("level", "Level")]),
///     FeatureDecl::categorical("job_level", "Job level", &[("high", "High")]),
/// ])
/// .unwrap();
/// let map = EncodingMap::new(&["cat__job_level_high", "cat__job_level"], &catalog);
///
/// assert_eq!(map.resolve("cat__job_level_high"), "job_level");
/// // exact categorical match wins over the shorter prefix
/// assert_eq!(map.resolve("cat__job_level"), "job_level");
/// assert!(map.columns().iter().all(|c| c.kind == ColumnKind::CategoricalOneHot));
/// ```
#[derive(Debug, Clone)]
pub struct EncodingMap {
    columns: Vec<EncodedColumn>,
    column_features: Vec<usize>,
    features: Vec<String>,
    declared: Vec<(String, FeatureKind)>,
    by_name: HashMap<String, usize>,
}

impl EncodingMap {
    /// Builds the mapping for the transform's ordered encoded column names.
    ///
    /// Unresolved columns are logged with `tracing::warn!` and listed by
    /// [`unresolved_columns`](Self::unresolved_columns).
    pub fn new<S>(column_names: &[S], catalog: &FeatureCatalog) -> Self
    where
        S: AsRef<str>,
    {
        let declared = catalog
            .iter()
            .map(|d| (d.id.clone(), d.kind))
            .collect::<Vec<_>>();

        let mut columns = Vec::with_capacity(column_names.len());
        let mut by_name = HashMap::with_capacity(column_names.len());
        for (index, name) in column_names.iter().enumerate() {
            let name = name.as_ref();
            let (base_feature, kind) = match classify(strip_stage_prefix(name), &declared) {
                Some((id, kind)) => (id.to_owned(), kind),
                None => {
                    tracing::warn!(
                        column = name,
                        "encoded column matches no declared feature; grouping it as '{UNKNOWN_FEATURE}'"
                    );
                    (UNKNOWN_FEATURE.to_owned(), ColumnKind::Unknown)
                }
            };
            by_name.entry(name.to_owned()).or_insert(index);
            columns.push(EncodedColumn {
                name: name.to_owned(),
                base_feature,
                kind,
            });
        }

        let mut features = declared.iter().map(|(id, _)| id.clone()).collect::<Vec<_>>();
        if columns.iter().any(|c| c.kind.is_unknown()) {
            features.push(UNKNOWN_FEATURE.to_owned());
        }
        let positions = features
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect::<HashMap<_, _>>();
        let column_features = columns
            .iter()
            .map(|c| positions[c.base_feature.as_str()])
            .collect();

        tracing::debug!(
            columns = columns.len(),
            features = features.len(),
            "built encoding map"
        );

        Self {
            columns,
            column_features,
            features,
            declared,
            by_name,
        }
    }

    /// Base feature of an encoded column name.
    ///
    /// Total: names outside the transform's column list are resolved with
    /// the same rules, and anything unmatched yields [`UNKNOWN_FEATURE`].
    #[must_use]
    pub fn resolve(&self, encoded_name: &str) -> &str {
        if let Some(&index) = self.by_name.get(encoded_name) {
            return &self.columns[index].base_feature;
        }
        classify(strip_stage_prefix(encoded_name), &self.declared)
            .map_or(UNKNOWN_FEATURE, |(id, _)| id)
    }

    /// Encoded columns in transform order.
    #[must_use]
    pub fn columns(&self) -> &[EncodedColumn] {
        &self.columns
    }

    /// Grouped feature ids: declaration order, then [`UNKNOWN_FEATURE`] if any
    /// column is unresolved.
    #[must_use]
    pub fn features(&self) -> &[String] {
        &self.features
    }

    /// Index into [`features`](Self::features) of the feature owning column `column`.
    ///
    /// # Panics
    ///
    /// Panics if `column` is out of range.
    #[must_use]
    pub fn feature_index_of_column(&self, column: usize) -> usize {
        self.column_features[column]
    }

    /// Number of encoded columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Names of the columns grouped under [`UNKNOWN_FEATURE`].
    #[must_use]
    pub fn unresolved_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.kind.is_unknown())
            .map(|c| c.name.as_str())
            .collect()
    }
}

fn strip_stage_prefix(name: &str) -> &str {
    name.split_once(NAMESPACE_SEPARATOR)
        .map_or(name, |(_, rest)| rest)
}

fn classify<'a>(
    remainder: &str,
    declared: &'a [(String, FeatureKind)],
) -> Option<(&'a str, ColumnKind)> {
    if let Some((id, kind)) = declared.iter().find(|(id, _)| id == remainder) {
        let kind = match kind {
            FeatureKind::Numeric | FeatureKind::Derived(_) => ColumnKind::Numeric,
            FeatureKind::Ordinal => ColumnKind::CategoricalOrdinal,
            FeatureKind::Categorical => ColumnKind::CategoricalOneHot,
        };
        return Some((id.as_str(), kind));
    }

    declared
        .iter()
        .filter(|(id, kind)| {
            *kind == FeatureKind::Categorical
                && remainder
                    .strip_prefix(id.as_str())
                    .is_some_and(|rest| rest.starts_with('_'))
        })
        .max_by_key(|(id, _)| id.len())
        .map(|(id, _)| (id.as_str(), ColumnKind::CategoricalOneHot))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::FeatureDecl;

    #[test]
    fn test_unprefixed_names_are_used_whole() {
        let catalog = FeatureCatalog::german_credit();
        let map = EncodingMap::new(
            &["duration", "purpose_car_new", "purpose_education"],
            &catalog,
        );
        assert_eq!(map.resolve("duration"), "duration");
        assert_eq!(map.resolve("purpose_car_new"), "purpose");
        assert_eq!(map.resolve("purpose_education"), "purpose");
        assert_eq!(map.columns()[0].kind, ColumnKind::Numeric);
        assert_eq!(map.columns()[1].kind, ColumnKind::CategoricalOneHot);
        assert!(map.unresolved_columns().is_empty());
        assert_eq!(map.features().len(), catalog.len());
    }

    #[test]
    fn test_stage_prefix_is_stripped() {
        let catalog = FeatureCatalog::german_credit();
        let map = EncodingMap::new(
            &["num__monthly_burden", "ord__savings_status", "cat__housing_own"],
            &catalog,
        );
        assert_eq!(map.resolve("num__monthly_burden"), "monthly_burden");
        assert_eq!(map.columns()[1].kind, ColumnKind::CategoricalOrdinal);
        assert_eq!(map.resolve("cat__housing_own"), "housing");
        // names outside the column list resolve too
        assert_eq!(map.resolve("remainder__housing_free"), "housing");
    }

    #[test]
    fn test_longest_prefix_wins() {
        let catalog = FeatureCatalog::new(vec![
            FeatureDecl::categorical("job", "Job", &[("skilled", "Skilled")]),
            FeatureDecl::categorical("job_level", "Job level", &[("high", "High")]),
        ])
        .unwrap();
        let map = EncodingMap::new(&["job_skilled", "job_level_high"], &catalog);
        assert_eq!(map.resolve("job_skilled"), "job");
        assert_eq!(map.resolve("job_level_high"), "job_level");
    }

    #[test]
    fn test_prefix_requires_separator() {
        let catalog = FeatureCatalog::german_credit();
        let map = EncodingMap::new(&["jobless"], &catalog);
        assert_eq!(map.resolve("jobless"), UNKNOWN_FEATURE);
    }

    #[test]
    fn test_unmatched_columns_go_to_unknown() {
        let catalog = FeatureCatalog::german_credit();
        let map = EncodingMap::new(&["num__age", "zzz__mystery", "other_thing"], &catalog);
        assert_eq!(map.unresolved_columns(), vec!["zzz__mystery", "other_thing"]);
        assert_eq!(map.features().last().map(String::as_str), Some(UNKNOWN_FEATURE));
        assert_eq!(map.feature_index_of_column(1), catalog.len());
        assert_eq!(map.feature_index_of_column(2), catalog.len());
    }

    #[test]
    fn test_every_column_maps_to_exactly_one_feature() {
        let catalog = FeatureCatalog::german_credit();
        let names = [
            "num__duration",
            "num__amount",
            "cat__checking_status_lt_0",
            "cat__credit_history_critical",
            "cat__job_management",
            "ord__savings_status",
            "unexpected",
        ];
        let map = EncodingMap::new(&names, &catalog);
        assert_eq!(map.len(), names.len());

        let mut per_feature = vec![0_usize; map.features().len()];
        for column in 0..map.len() {
            per_feature[map.feature_index_of_column(column)] += 1;
        }
        assert_eq!(per_feature.iter().sum::<usize>(), names.len());
        for (index, name) in names.iter().enumerate() {
            let feature = &map.features()[map.feature_index_of_column(index)];
            assert_eq!(feature, map.resolve(name));
        }
    }
}
