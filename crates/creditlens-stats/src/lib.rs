//! Statistical utilities for the creditlens attribution engine.
//!
//! This crate provides the small set of statistics the population profiler
//! needs to summarize attribution distributions:
//!
//! - **Descriptive statistics**: mean, mean of absolute values, spread, sign shares
//! - **Percentiles**: linearly interpolated percentile points
//! - **Correlation**: Pearson correlation between paired samples
//! - **Bands**: mean response within three quartile bands of a paired value
//!
//! # Modules
//!
//! - [`descriptive`]: Descriptive statistics for summarizing datasets
//! - [`percentiles`]: Percentile computation and storage
//! - [`correlation`]: Pearson correlation coefficient
//! - [`bands`]: Quartile band summaries used for nonlinearity detection
//!
//! # Examples
//!
//! ## Computing descriptive statistics
//!
//! ```
//! use creditlens_stats::descriptive::DescriptiveStats;
//!
//! let values = [1.0, 2.0, 3.0, 4.0, 5.0];
//! let stats = DescriptiveStats::new(values).unwrap();
//! assert_eq!(stats.mean, 3.0);
//! ```
//!
//! ## Computing percentiles
//!
//! ```
//! use creditlens_stats::percentiles::Percentiles;
//!
//! let values = [1.0, 2.0, 3.0, 4.0, 5.0];
//! let percentiles = Percentiles::new(&values, &[25.0, 50.0, 75.0]);
//! assert_eq!(percentiles.get(50.0), Some(3.0));
//! ```
//!
//! ## Relating a value to its attribution
//!
//! ```
//! use creditlens_stats::{bands::BandSummary, correlation::pearson};
//!
//! let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
//! let attributions = [-0.4, -0.3, -0.2, -0.1, 0.1, 0.2, 0.3, 0.4];
//! assert!(pearson(&values, &attributions).unwrap() > 0.9);
//!
//! let bands = BandSummary::new(&values, &attributions).unwrap();
//! assert!(bands.low_mean.unwrap() < bands.high_mean.unwrap());
//! ```

pub mod bands;
pub mod correlation;
pub mod descriptive;
pub mod percentiles;
