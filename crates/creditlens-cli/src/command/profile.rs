use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::Args;
use creditlens_analysis::{
    cache::{ProfileCache, ProfilePolicy},
    profile::{PopulationProfile, PopulationProfiler, ProfilerConfig},
};
use creditlens_explainer::service::{LoadedModel, ModelService};

use crate::util::{self, Output};

/// Model and population inputs shared by `profile` and `report`.
#[derive(Debug, Clone, Args)]
pub(crate) struct PopulationArg {
    /// Path to the model bundle JSON file
    #[arg(long)]
    pub bundle: PathBuf,

    /// Path to the population JSON file (array of applicant records)
    #[arg(long)]
    pub population: PathBuf,

    /// Path to the configuration JSON file
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[clap(flatten)]
    pub overrides: ProfilerOverrides,
}

/// Command-line overrides of the profiler configuration.
#[derive(Debug, Clone, Default, Args)]
pub(crate) struct ProfilerOverrides {
    /// Seed of the reference sample draw
    #[arg(long)]
    pub seed: Option<u64>,

    /// Maximum number of applicants in the reference sample
    #[arg(long)]
    pub sample_size: Option<usize>,

    /// Number of top-ranked numeric features analyzed for dependence
    #[arg(long)]
    pub dependence_top_k: Option<usize>,

    /// Minimum mid-band deviation flagged as nonlinear
    #[arg(long)]
    pub nonlinearity_threshold: Option<f64>,
}

impl ProfilerOverrides {
    fn apply(&self, config: &mut ProfilerConfig) {
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(sample_size) = self.sample_size {
            config.sample_size = sample_size;
        }
        if let Some(top_k) = self.dependence_top_k {
            config.dependence_top_k = top_k;
        }
        if let Some(threshold) = self.nonlinearity_threshold {
            config.nonlinearity_threshold = threshold;
        }
    }
}

#[derive(Debug, Clone, Args)]
pub(crate) struct ProfileArg {
    #[clap(flatten)]
    pub input: PopulationArg,

    /// Output file path (defaults to stdout)
    #[arg(long)]
    pub output: Option<PathBuf>,
}

pub(crate) fn run(arg: &ProfileArg) -> anyhow::Result<()> {
    let (_, profile) = compute_profile(&arg.input)?;
    Output::save_json(&*profile, arg.output.clone())?;
    Ok(())
}

/// Loads the bundle and profiles the population with it.
pub(crate) fn compute_profile(
    input: &PopulationArg,
) -> anyhow::Result<(Arc<LoadedModel>, Arc<PopulationProfile>)> {
    let mut config = util::read_config_file(input.config.as_deref())?.profiler;
    input.overrides.apply(&mut config);

    let bundle = util::read_bundle_file(&input.bundle)?;
    let population = util::read_population_file(&input.population)?;

    let service = ModelService::new();
    service
        .load(|| bundle.into_loaded_model())
        .with_context(|| format!("Failed to load model bundle: {}", input.bundle.display()))?;

    let cache = ProfileCache::new(PopulationProfiler::new(config), population);
    let profile = cache
        .get(&service, ProfilePolicy::ComputeIfMissing)
        .context("Failed to profile the population")?;
    let model = service.snapshot()?;

    tracing::info!(
        model = %model.metadata().name,
        sample = profile.sample_size,
        population = profile.population_size,
        "profiled population"
    );
    Ok((model, profile))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_replace_only_given_fields() {
        let overrides = ProfilerOverrides {
            seed: Some(3),
            nonlinearity_threshold: Some(0.05),
            ..ProfilerOverrides::default()
        };
        let mut config = ProfilerConfig {
            sample_size: 250,
            ..ProfilerConfig::default()
        };
        overrides.apply(&mut config);
        assert_eq!(config.seed, 3);
        assert_eq!(config.sample_size, 250);
        assert_eq!(config.dependence_top_k, 8);
        assert!((config.nonlinearity_threshold - 0.05).abs() < f64::EPSILON);
    }
}
