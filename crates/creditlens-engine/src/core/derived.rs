use serde::{Deserialize, Serialize};

use crate::{ExplainError, core::record::ApplicantRecord};

/// Formula-derived numeric features produced by feature engineering.
///
/// The display layer shows each derived value together with its defining
/// equation, so the equations here must match the engineering step exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivedFormula {
    /// `amount / duration`
    MonthlyBurden,
    /// `age * employment_years`
    StabilityScore,
    /// `amount / (age * 100)`
    RiskRatio,
    /// `amount / age`
    CreditToIncomeProxy,
    /// `duration * amount`
    DurationRisk,
}

impl DerivedFormula {
    pub const ALL: [Self; 5] = [
        Self::MonthlyBurden,
        Self::StabilityScore,
        Self::RiskRatio,
        Self::CreditToIncomeProxy,
        Self::DurationRisk,
    ];

    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            Self::MonthlyBurden => "monthly_burden",
            Self::StabilityScore => "stability_score",
            Self::RiskRatio => "risk_ratio",
            Self::CreditToIncomeProxy => "credit_to_income_proxy",
            Self::DurationRisk => "duration_risk",
        }
    }

    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::MonthlyBurden => "Monthly repayment burden",
            Self::StabilityScore => "Stability score",
            Self::RiskRatio => "Amount-to-age risk ratio",
            Self::CreditToIncomeProxy => "Credit-to-income proxy",
            Self::DurationRisk => "Duration risk",
        }
    }

    /// The defining equation, written for display.
    ///
    /// ```
    /// use creditlens_engine::DerivedFormula;
    ///
    /// assert_eq!(DerivedFormula::MonthlyBurden.equation(), "amount ÷ duration");
    /// assert_eq!(DerivedFormula::RiskRatio.equation(), "amount ÷ (age × 100)");
    /// ```
    #[must_use]
    pub fn equation(self) -> &'static str {
        match self {
            Self::MonthlyBurden => "amount ÷ duration",
            Self::StabilityScore => "age × employment_years",
            Self::RiskRatio => "amount ÷ (age × 100)",
            Self::CreditToIncomeProxy => "amount ÷ age",
            Self::DurationRisk => "duration × amount",
        }
    }

    /// Raw input features the formula reads.
    #[must_use]
    pub fn inputs(self) -> &'static [&'static str] {
        match self {
            Self::MonthlyBurden => &["amount", "duration"],
            Self::StabilityScore => &["age", "employment_years"],
            Self::RiskRatio | Self::CreditToIncomeProxy => &["amount", "age"],
            Self::DurationRisk => &["duration", "amount"],
        }
    }

    /// Evaluates the formula on a raw applicant record.
    ///
    /// Fails with [`ExplainError::InvalidInput`] when an input is missing or
    /// not finite, when a divisor is zero, or when the result is not finite.
    /// A derived value is never allowed to become `NaN` or infinite.
    pub fn compute(self, record: &ApplicantRecord) -> Result<f64, ExplainError> {
        let value = match self {
            Self::MonthlyBurden => record.number("amount")? / self.divisor(record, "duration")?,
            Self::StabilityScore => record.number("age")? * record.number("employment_years")?,
            Self::RiskRatio => record.number("amount")? / (self.divisor(record, "age")? * 100.0),
            Self::CreditToIncomeProxy => {
                record.number("amount")? / self.divisor(record, "age")?
            }
            Self::DurationRisk => record.number("duration")? * record.number("amount")?,
        };
        if !value.is_finite() {
            return Err(ExplainError::invalid_input(
                self.id(),
                format!("{} produced a non-finite value", self.equation()),
            ));
        }
        Ok(value)
    }

    fn divisor(self, record: &ApplicantRecord, input: &str) -> Result<f64, ExplainError> {
        let value = record.number(input)?;
        if value.abs() < f64::EPSILON {
            return Err(ExplainError::invalid_input(
                input,
                format!("must be non-zero because {} divides by it", self.id()),
            ));
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn applicant(amount: f64, duration: f64, age: f64, employment_years: f64) -> ApplicantRecord {
        ApplicantRecord::new()
            .with("amount", amount)
            .with("duration", duration)
            .with("age", age)
            .with("employment_years", employment_years)
    }

    #[test]
    fn test_formulas_match_their_equations() {
        let record = applicant(2400.0, 24.0, 30.0, 4.0);
        let values = DerivedFormula::ALL.map(|f| f.compute(&record).unwrap());
        assert!((values[0] - 100.0).abs() < 1e-12);
        assert!((values[1] - 120.0).abs() < 1e-12);
        assert!((values[2] - 0.8).abs() < 1e-12);
        assert!((values[3] - 80.0).abs() < 1e-12);
        assert!((values[4] - 57_600.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_age_is_invalid_input() {
        let record = applicant(2400.0, 24.0, 0.0, 4.0);
        for formula in [DerivedFormula::RiskRatio, DerivedFormula::CreditToIncomeProxy] {
            let err = formula.compute(&record).unwrap_err();
            assert!(matches!(err, ExplainError::InvalidInput { ref feature, .. } if feature == "age"));
        }
        // multiplying by zero age is fine
        assert_eq!(DerivedFormula::StabilityScore.compute(&record), Ok(0.0));
    }

    #[test]
    fn test_zero_duration_is_invalid_input() {
        let record = applicant(2400.0, 0.0, 30.0, 4.0);
        let err = DerivedFormula::MonthlyBurden.compute(&record).unwrap_err();
        assert!(matches!(err, ExplainError::InvalidInput { feature, .. } if feature == "duration"));
    }

    #[test]
    fn test_overflow_is_invalid_input() {
        let record = applicant(f64::MAX, f64::MAX, 30.0, 4.0);
        let err = DerivedFormula::DurationRisk.compute(&record).unwrap_err();
        assert!(
            matches!(err, ExplainError::InvalidInput { feature, .. } if feature == "duration_risk")
        );
    }
}
