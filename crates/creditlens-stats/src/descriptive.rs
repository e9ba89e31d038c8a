/// Descriptive statistics summarizing a dataset.
///
/// This structure contains the range, mean and spread of a dataset of `f64`
/// values, together with the mean of the absolute values (used as an
/// importance measure for signed attributions).
#[derive(Debug, Clone)]
pub struct DescriptiveStats {
    /// The minimum value in the dataset.
    pub min: f64,
    /// The maximum value in the dataset.
    pub max: f64,
    /// The arithmetic mean (average) of the dataset.
    pub mean: f64,
    /// The arithmetic mean of the absolute values of the dataset.
    pub mean_abs: f64,
    /// The population standard deviation of the dataset.
    pub std_dev: f64,
}

impl DescriptiveStats {
    /// Computes descriptive statistics from unsorted values.
    ///
    /// This method will sort the values internally before computing statistics.
    ///
    /// # Returns
    ///
    /// * `Some(DescriptiveStats)` - if the dataset contains at least one value
    /// * `None` - if the dataset is empty
    ///
    /// # Examples
    ///
    /// ```
    /// # use creditlens_stats::descriptive::DescriptiveStats;
    /// let values = [5.0, -2.0, 4.0, 1.0, -3.0];
    /// let stats = DescriptiveStats::new(values).unwrap();
    /// assert_eq!(stats.min, -3.0);
    /// assert_eq!(stats.max, 5.0);
    /// assert_eq!(stats.mean, 1.0);
    /// assert_eq!(stats.mean_abs, 3.0);
    /// ```
    #[must_use]
    pub fn new<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let mut values = values.into_iter().collect::<Vec<_>>();
        values.sort_by(f64::total_cmp);
        Self::from_sorted(&values)
    }

    /// Computes descriptive statistics from pre-sorted values.
    ///
    /// Use this when you already have sorted data to avoid unnecessary work.
    ///
    /// # Panics
    ///
    /// Panics if `sorted_values` is not sorted in ascending order.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn from_sorted(sorted_values: &[f64]) -> Option<Self> {
        assert!(
            sorted_values.is_sorted_by(|a, b| a <= b),
            "values must be sorted in ascending order"
        );

        let min = *sorted_values.first()?;
        let max = *sorted_values.last()?;
        let n = sorted_values.len() as f64;
        let mean = sorted_values.iter().sum::<f64>() / n;
        let mean_abs = sorted_values.iter().map(|v| v.abs()).sum::<f64>() / n;
        let variance = sorted_values
            .iter()
            .map(|v| (v - mean).powi(2))
            .sum::<f64>()
            / n;

        Some(Self {
            min,
            max,
            mean,
            mean_abs,
            std_dev: variance.sqrt(),
        })
    }
}

/// Shares of strictly positive and strictly negative values, in percent.
///
/// Zeros count toward neither share, so the two shares may sum to less than 100.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignShares {
    pub pct_positive: f64,
    pub pct_negative: f64,
}

impl SignShares {
    /// Computes sign shares of a dataset.
    ///
    /// Returns `None` for an empty dataset.
    ///
    /// ```
    /// # use creditlens_stats::descriptive::SignShares;
    /// let shares = SignShares::new([1.0, -1.0, 2.0, 0.0]).unwrap();
    /// assert_eq!(shares.pct_positive, 50.0);
    /// assert_eq!(shares.pct_negative, 25.0);
    /// ```
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn new<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let (mut total, mut positive, mut negative) = (0_usize, 0_usize, 0_usize);
        for value in values {
            total += 1;
            if value > 0.0 {
                positive += 1;
            } else if value < 0.0 {
                negative += 1;
            }
        }
        if total == 0 {
            return None;
        }
        Some(Self {
            pct_positive: 100.0 * positive as f64 / total as f64,
            pct_negative: 100.0 * negative as f64 / total as f64,
        })
    }
}
