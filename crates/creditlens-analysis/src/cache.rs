//! Population profile cache tied to the served model generation.
//!
//! A profile is only valid for the model it was computed with. The cache
//! tags its profile with the [`ModelService`] generation and treats a
//! profile of an older generation as stale. A new profile replaces the
//! cached one only after its computation succeeded, so a failed refresh
//! never loses the last good profile.

use std::{
    sync::Arc,
    thread::{self, JoinHandle},
};

use creditlens_engine::{ApplicantRecord, ExplainError};
use creditlens_explainer::service::{LoadedModel, ModelService};
use parking_lot::{Mutex, RwLock};

use crate::profile::{PopulationProfile, PopulationProfiler};

/// What to do when no profile exists for the current model generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum ProfilePolicy {
    /// Fail with [`ExplainError::StaleProfile`].
    CachedOnly,
    /// Compute the profile synchronously.
    ComputeIfMissing,
}

#[derive(Debug, Clone)]
struct CachedProfile {
    generation: u64,
    profile: Arc<PopulationProfile>,
}

#[derive(Debug)]
pub struct ProfileCache {
    profiler: PopulationProfiler,
    population: Arc<[ApplicantRecord]>,
    slot: RwLock<Option<CachedProfile>>,
    compute_lock: Mutex<()>,
}

impl ProfileCache {
    #[must_use]
    pub fn new(profiler: PopulationProfiler, population: Vec<ApplicantRecord>) -> Self {
        Self {
            profiler,
            population: population.into(),
            slot: RwLock::new(None),
            compute_lock: Mutex::new(()),
        }
    }

    /// Profile of the currently served model.
    pub fn get(
        &self,
        service: &ModelService,
        policy: ProfilePolicy,
    ) -> Result<Arc<PopulationProfile>, ExplainError> {
        let (model, generation) = service.snapshot_with_generation()?;
        if let Some(profile) = self.cached(generation) {
            return Ok(profile);
        }
        match policy {
            ProfilePolicy::CachedOnly => Err(ExplainError::StaleProfile),
            ProfilePolicy::ComputeIfMissing => self.compute(&model, generation),
        }
    }

    /// Recomputes the profile of the currently served model.
    pub fn refresh(&self, service: &ModelService) -> Result<Arc<PopulationProfile>, ExplainError> {
        let (model, generation) = service.snapshot_with_generation()?;
        self.compute(&model, generation)
    }

    /// Recomputes the profile on a background thread.
    ///
    /// Requests keep being served from the cached profile until the new one
    /// is stored.
    pub fn spawn_refresh(
        self: &Arc<Self>,
        service: Arc<ModelService>,
    ) -> JoinHandle<Result<Arc<PopulationProfile>, ExplainError>> {
        let cache = Arc::clone(self);
        thread::spawn(move || {
            let result = cache.refresh(&service);
            if let Err(err) = &result {
                tracing::warn!(error = %err, "background profile refresh failed");
            }
            result
        })
    }

    /// The cached profile, if it belongs to `generation`.
    #[must_use]
    pub fn cached(&self, generation: u64) -> Option<Arc<PopulationProfile>> {
        self.slot
            .read()
            .as_ref()
            .filter(|c| c.generation == generation)
            .map(|c| Arc::clone(&c.profile))
    }

    /// The most recently stored profile and its generation, stale or not.
    #[must_use]
    pub fn latest(&self) -> Option<(u64, Arc<PopulationProfile>)> {
        self.slot
            .read()
            .as_ref()
            .map(|c| (c.generation, Arc::clone(&c.profile)))
    }

    fn compute(
        &self,
        model: &LoadedModel,
        generation: u64,
    ) -> Result<Arc<PopulationProfile>, ExplainError> {
        let _guard = self.compute_lock.lock();
        // another caller may have finished the same generation meanwhile
        if let Some(profile) = self.cached(generation) {
            return Ok(profile);
        }

        let profile = Arc::new(self.profiler.profile(model, &self.population)?);

        let mut slot = self.slot.write();
        let newer_cached = slot.as_ref().is_some_and(|c| c.generation > generation);
        if !newer_cached {
            *slot = Some(CachedProfile {
                generation,
                profile: Arc::clone(&profile),
            });
            tracing::debug!(generation, "stored population profile");
        }
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use creditlens_engine::{
        FeatureCatalog, FeatureDecl,
        model::{LinearModel, OneHotTransform, PreprocessingTransform as _},
    };

    use super::*;
    use crate::profile::tests::{metadata, model_with_weights, population};

    fn cache() -> Arc<ProfileCache> {
        Arc::new(ProfileCache::new(
            PopulationProfiler::default(),
            population(120),
        ))
    }

    /// A model whose catalog needs a feature the population lacks.
    fn model_needing_income() -> LoadedModel {
        let catalog = FeatureCatalog::new(vec![FeatureDecl::numeric("income", "Income")]).unwrap();
        let transform = OneHotTransform::new(&catalog);
        let scoring = LinearModel::new(
            transform.encoded_column_names().to_vec(),
            0.0,
            vec![0.1],
            vec![0.0],
        )
        .unwrap();
        LoadedModel::new(catalog, Box::new(transform), Box::new(scoring), metadata()).unwrap()
    }

    #[test]
    fn test_not_loaded_model_is_reported() {
        let cache = cache();
        let service = ModelService::new();
        assert_eq!(
            cache
                .get(&service, ProfilePolicy::ComputeIfMissing)
                .unwrap_err(),
            ExplainError::ModelNotLoaded
        );
    }

    #[test]
    fn test_cached_only_requires_a_profile() {
        let cache = cache();
        let service = ModelService::new();
        service
            .load(|| Ok(model_with_weights([0.1, 0.0, 0.0, 0.2, 0.0])))
            .unwrap();

        let err = cache.get(&service, ProfilePolicy::CachedOnly).unwrap_err();
        assert_eq!(err, ExplainError::StaleProfile);
        assert!(err.class().is_not_ready());

        let computed = cache
            .get(&service, ProfilePolicy::ComputeIfMissing)
            .unwrap();
        let cached = cache.get(&service, ProfilePolicy::CachedOnly).unwrap();
        assert!(Arc::ptr_eq(&computed, &cached));
    }

    #[test]
    fn test_reload_makes_profile_stale() {
        let cache = cache();
        let service = ModelService::new();
        service
            .load(|| Ok(model_with_weights([0.1, 0.0, 0.0, 0.2, 0.0])))
            .unwrap();
        cache.refresh(&service).unwrap();

        service
            .load(|| Ok(model_with_weights([-0.1, 0.0, 0.0, 0.2, 0.0])))
            .unwrap();
        assert_eq!(
            cache.get(&service, ProfilePolicy::CachedOnly).unwrap_err(),
            ExplainError::StaleProfile
        );
        let (generation, _) = cache.latest().unwrap();
        assert_eq!(generation, 1);
    }

    #[test]
    fn test_failed_compute_keeps_previous_profile() {
        let cache = cache();
        let service = ModelService::new();
        service
            .load(|| Ok(model_with_weights([0.1, 0.0, 0.0, 0.2, 0.0])))
            .unwrap();
        let good = cache.refresh(&service).unwrap();

        service.load(|| Ok(model_needing_income())).unwrap();
        let err = cache.refresh(&service).unwrap_err();
        assert!(matches!(err, ExplainError::InvalidInput { feature, .. } if feature == "income"));

        let (generation, kept) = cache.latest().unwrap();
        assert_eq!(generation, 1);
        assert!(Arc::ptr_eq(&good, &kept));
    }

    #[test]
    fn test_background_refresh() {
        let cache = cache();
        let service = Arc::new(ModelService::new());
        service
            .load(|| Ok(model_with_weights([0.1, 0.0, 0.0, 0.2, 0.0])))
            .unwrap();

        let handle = cache.spawn_refresh(Arc::clone(&service));
        let refreshed = handle.join().unwrap().unwrap();
        let cached = cache.get(&service, ProfilePolicy::CachedOnly).unwrap();
        assert!(Arc::ptr_eq(&refreshed, &cached));
    }
}
