//! Reference sample selection.
//!
//! Global profiles are computed over a reference sample of the applicant
//! population rather than the whole population. The sample is drawn
//! without replacement from a PCG generator seeded by the caller, so the
//! same population and seed always select the same applicants in the same
//! order.
//!
//! # Example
//!
//! ```
//! use creditlens_analysis::sample::ReferenceSample;
//! use creditlens_engine::ApplicantRecord;
//!
//! let population = (0..100)
//!     .map(|i| ApplicantRecord::new().with("age", f64::from(20 + i)))
//!     .collect::<Vec<_>>();
//!
//! let a = ReferenceSample::draw(&population, 10, 42);
//! let b = ReferenceSample::draw(&population, 10, 42);
//! assert_eq!(a.len(), 10);
//! assert_eq!(a.records(), b.records());
//!
//! // asking for more than the population takes everyone
//! assert_eq!(ReferenceSample::draw(&population, 500, 42).len(), 100);
//! ```

use creditlens_engine::ApplicantRecord;
use rand::{SeedableRng as _, seq::index};
use rand_pcg::Pcg64;

/// Applicants selected for population profiling.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceSample {
    records: Vec<ApplicantRecord>,
    seed: u64,
    population_size: usize,
}

impl ReferenceSample {
    /// Draws up to `sample_size` applicants without replacement.
    ///
    /// Selected applicants keep their population order. When `sample_size`
    /// is at least the population size, the whole population is used.
    #[must_use]
    pub fn draw(population: &[ApplicantRecord], sample_size: usize, seed: u64) -> Self {
        let records = if sample_size >= population.len() {
            population.to_vec()
        } else {
            let mut rng = Pcg64::seed_from_u64(seed);
            let mut indices = index::sample(&mut rng, population.len(), sample_size).into_vec();
            indices.sort_unstable();
            indices.into_iter().map(|i| population[i].clone()).collect()
        };
        tracing::debug!(
            population = population.len(),
            sample = records.len(),
            seed,
            "drew reference sample"
        );
        Self {
            records,
            seed,
            population_size: population.len(),
        }
    }

    /// Uses `records` as the sample as-is.
    #[must_use]
    pub fn from_records(records: Vec<ApplicantRecord>, seed: u64) -> Self {
        let population_size = records.len();
        Self {
            records,
            seed,
            population_size,
        }
    }

    #[must_use]
    pub fn records(&self) -> &[ApplicantRecord] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    #[must_use]
    pub fn population_size(&self) -> usize {
        self.population_size
    }
}
