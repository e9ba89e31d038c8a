use std::fmt;

use creditlens_engine::{ApplicantRecord, ExplainError, FeatureDecl, FeatureKind};
use serde::{Deserialize, Serialize};

/// Human-readable raw value of a feature in an explanation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum DisplayValue {
    /// An input number.
    Number { value: f64 },
    /// A formula-derived number, shown with its defining equation.
    Derived { value: f64, equation: String },
    /// A category literal and its label (the literal when unlabeled).
    Category { literal: String, label: String },
    /// No raw value exists (the unknown pseudo-feature).
    Unavailable,
}

impl DisplayValue {
    /// Resolves the display value of `decl` in an engineered `record`.
    pub fn resolve(decl: &FeatureDecl, record: &ApplicantRecord) -> Result<Self, ExplainError> {
        let value = match decl.kind {
            FeatureKind::Numeric => Self::Number {
                value: record.number(&decl.id)?,
            },
            FeatureKind::Derived(formula) => Self::Derived {
                value: record.number(&decl.id)?,
                equation: formula.equation().to_owned(),
            },
            FeatureKind::Categorical | FeatureKind::Ordinal => {
                let literal = record.category(&decl.id)?;
                Self::Category {
                    literal: literal.to_owned(),
                    label: decl.label_for(literal).to_owned(),
                }
            }
        };
        Ok(value)
    }

    /// The numeric raw value, for numeric and derived features.
    #[must_use]
    pub fn number(&self) -> Option<f64> {
        match self {
            Self::Number { value } | Self::Derived { value, .. } => Some(*value),
            Self::Category { .. } | Self::Unavailable => None,
        }
    }
}

/// Formats a number with two decimals, dropping them for whole numbers.
pub(crate) fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

impl fmt::Display for DisplayValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number { value } => f.write_str(&format_number(*value)),
            Self::Derived { value, equation } => {
                write!(f, "{} ({equation})", format_number(*value))
            }
            Self::Category { label, .. } => f.write_str(label),
            Self::Unavailable => f.write_str("n/a"),
        }
    }
}
