use std::iter;

use crate::percentiles::Percentiles;

/// Mean response within three value bands split at the quartiles.
///
/// Bands are `value <= Q25` (low), `Q25 < value <= Q75` (mid) and
/// `value > Q75` (high). A band that received no observations has no mean.
///
/// # Examples
///
/// ```
/// use creditlens_stats::bands::BandSummary;
///
/// let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
/// let responses = [0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0];
/// let bands = BandSummary::new(&values, &responses).unwrap();
/// assert_eq!(bands.low_mean, Some(0.0));
/// assert_eq!(bands.mid_mean, Some(1.0));
/// assert_eq!(bands.high_mean, Some(0.0));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BandSummary {
    pub q25: f64,
    pub q50: f64,
    pub q75: f64,
    pub low_mean: Option<f64>,
    pub mid_mean: Option<f64>,
    pub high_mean: Option<f64>,
}

impl BandSummary {
    /// Summarizes `responses` grouped by the quartile band of the paired `values`.
    ///
    /// Returns `None` when the inputs are empty or have different lengths.
    #[must_use]
    pub fn new(values: &[f64], responses: &[f64]) -> Option<Self> {
        if values.is_empty() || values.len() != responses.len() {
            return None;
        }
        let percentiles = Percentiles::new(values, &[25.0, 50.0, 75.0]);
        let q25 = percentiles.get(25.0)?;
        let q50 = percentiles.get(50.0)?;
        let q75 = percentiles.get(75.0)?;

        let mut low = MeanAccumulator::default();
        let mut mid = MeanAccumulator::default();
        let mut high = MeanAccumulator::default();
        for (&value, &response) in iter::zip(values, responses) {
            if value <= q25 {
                low.push(response);
            } else if value <= q75 {
                mid.push(response);
            } else {
                high.push(response);
            }
        }

        Some(Self {
            q25,
            q50,
            q75,
            low_mean: low.mean(),
            mid_mean: mid.mean(),
            high_mean: high.mean(),
        })
    }

    /// Deviation of the mid band from the average of the two outer bands.
    ///
    /// Returns `None` when any band is empty.
    #[must_use]
    pub fn mid_deviation(&self) -> Option<f64> {
        let low = self.low_mean?;
        let mid = self.mid_mean?;
        let high = self.high_mean?;
        Some((mid - (low + high) / 2.0).abs())
    }
}

#[derive(Debug, Default)]
struct MeanAccumulator {
    sum: f64,
    count: usize,
}

impl MeanAccumulator {
    fn push(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    #[expect(clippy::cast_precision_loss)]
    fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}
