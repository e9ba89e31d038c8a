//! Model lifecycle handle.
//!
//! A [`ModelService`] owns the currently served [`LoadedModel`] snapshot and
//! moves through three states:
//!
//! ```text
//! Uninitialized --load--> Loading --ok--> Ready
//!                            |
//!                            +--err--> previous state
//! ```
//!
//! Requests take an `Arc` snapshot and keep it for their whole duration, so
//! a reload never changes the model under an in-flight request. The
//! attribution explainer is built eagerly while loading; a model whose
//! explainer cannot be built never becomes ready.

use std::sync::Arc;

use creditlens_engine::{
    EncodingMap, ExplainError, FeatureCatalog,
    model::{AttributionExplainer, ModelMetadata, PreprocessingTransform, ScoringModel},
};
use parking_lot::{Mutex, RwLock};

/// Immutable bundle of everything needed to explain predictions of one model.
#[derive(Debug)]
pub struct LoadedModel {
    catalog: FeatureCatalog,
    transform: Box<dyn PreprocessingTransform>,
    scoring: Box<dyn ScoringModel>,
    explainer: Box<dyn AttributionExplainer>,
    encoding: EncodingMap,
    metadata: ModelMetadata,
}

impl LoadedModel {
    /// Assembles a model snapshot, building its attribution explainer and
    /// encoding map.
    pub fn new(
        catalog: FeatureCatalog,
        transform: Box<dyn PreprocessingTransform>,
        scoring: Box<dyn ScoringModel>,
        metadata: ModelMetadata,
    ) -> Result<Self, ExplainError> {
        let explainer = scoring.build_explainer()?;
        let encoding = EncodingMap::new(transform.encoded_column_names(), &catalog);
        Ok(Self {
            catalog,
            transform,
            scoring,
            explainer,
            encoding,
            metadata,
        })
    }

    #[must_use]
    pub fn catalog(&self) -> &FeatureCatalog {
        &self.catalog
    }

    #[must_use]
    pub fn transform(&self) -> &dyn PreprocessingTransform {
        self.transform.as_ref()
    }

    #[must_use]
    pub fn scoring(&self) -> &dyn ScoringModel {
        self.scoring.as_ref()
    }

    #[must_use]
    pub fn explainer(&self) -> &dyn AttributionExplainer {
        self.explainer.as_ref()
    }

    #[must_use]
    pub fn encoding(&self) -> &EncodingMap {
        &self.encoding
    }

    #[must_use]
    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }
}

/// Observable lifecycle state of a [`ModelService`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum ServiceStatus {
    Uninitialized,
    Loading,
    Ready,
}

#[derive(Debug)]
struct ServiceState {
    current: Option<Arc<LoadedModel>>,
    loading: bool,
    generation: u64,
}

/// Keeps `loading` set while a build runs, and clears it even if the build
/// panics.
struct LoadingFlag<'a> {
    state: &'a RwLock<ServiceState>,
    raised: bool,
}

impl<'a> LoadingFlag<'a> {
    fn raise(state: &'a RwLock<ServiceState>) -> Self {
        state.write().loading = true;
        Self {
            state,
            raised: true,
        }
    }

    /// Clears the flag under a write lock the caller already holds.
    fn lower(mut self, state: &mut ServiceState) {
        state.loading = false;
        self.raised = false;
    }
}

impl Drop for LoadingFlag<'_> {
    fn drop(&mut self) {
        if self.raised {
            self.state.write().loading = false;
        }
    }
}

/// Explicit handle to the served model.
#[derive(Debug)]
pub struct ModelService {
    state: RwLock<ServiceState>,
    load_lock: Mutex<()>,
}

impl Default for ModelService {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelService {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RwLock::new(ServiceState {
                current: None,
                loading: false,
                generation: 0,
            }),
            load_lock: Mutex::new(()),
        }
    }

    /// Builds a model with `build` and makes it the served snapshot.
    ///
    /// Loads are serialized. While `build` runs, requests keep being served
    /// from the previous snapshot, if any. On success the snapshot is
    /// swapped and the new generation is returned; on failure the previous
    /// snapshot stays in place.
    pub fn load<F>(&self, build: F) -> Result<u64, ExplainError>
    where
        F: FnOnce() -> Result<LoadedModel, ExplainError>,
    {
        let _guard = self.load_lock.lock();
        let loading = LoadingFlag::raise(&self.state);

        let result = build();

        let mut state = self.state.write();
        loading.lower(&mut state);
        match result {
            Ok(model) => {
                state.current = Some(Arc::new(model));
                state.generation += 1;
                tracing::info!(
                    generation = state.generation,
                    columns = state.current.as_ref().map_or(0, |m| m.encoding().len()),
                    "model loaded"
                );
                Ok(state.generation)
            }
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    generation = state.generation,
                    "model load failed; keeping the previous model"
                );
                Err(err)
            }
        }
    }

    /// The currently served model.
    pub fn snapshot(&self) -> Result<Arc<LoadedModel>, ExplainError> {
        self.state
            .read()
            .current
            .clone()
            .ok_or(ExplainError::ModelNotLoaded)
    }

    /// Number of successful loads so far.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.state.read().generation
    }

    #[must_use]
    pub fn status(&self) -> ServiceStatus {
        let state = self.state.read();
        match (&state.current, state.loading) {
            (Some(_), _) => ServiceStatus::Ready,
            (None, true) => ServiceStatus::Loading,
            (None, false) => ServiceStatus::Uninitialized,
        }
    }

    /// The served snapshot together with its generation, read atomically.
    pub fn snapshot_with_generation(&self) -> Result<(Arc<LoadedModel>, u64), ExplainError> {
        let state = self.state.read();
        let model = state.current.clone().ok_or(ExplainError::ModelNotLoaded)?;
        Ok((model, state.generation))
    }
}
