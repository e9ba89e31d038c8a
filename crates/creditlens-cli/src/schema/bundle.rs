use creditlens_engine::{
    ExplainError, FeatureCatalog,
    model::{LinearModel, ModelMetadata, OneHotTransform, PreprocessingTransform as _},
};
use creditlens_explainer::service::LoadedModel;
use serde::{Deserialize, Serialize};

/// A trained model as stored on disk.
///
/// The preprocessing transform is rebuilt from the catalog, so the model's
/// column names must be exactly the columns the catalog encodes to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelBundle {
    pub metadata: ModelMetadata,
    /// Defaults to the German credit catalog.
    #[serde(default = "FeatureCatalog::german_credit")]
    pub catalog: FeatureCatalog,
    pub model: LinearModel,
}

impl ModelBundle {
    pub fn into_loaded_model(self) -> Result<LoadedModel, ExplainError> {
        let transform = OneHotTransform::new(&self.catalog);
        let expected = transform.encoded_column_names();
        let actual = self.model.column_names();
        if expected.len() != actual.len() {
            return Err(ExplainError::SchemaMismatch {
                expected: expected.len(),
                actual: actual.len(),
            });
        }
        if let Some((e, a)) = expected.iter().zip(actual).find(|(e, a)| e != a) {
            return Err(ExplainError::collaborator(format!(
                "model column '{a}' does not match encoded column '{e}'"
            )));
        }
        LoadedModel::new(
            self.catalog,
            Box::new(transform),
            Box::new(self.model),
            self.metadata,
        )
    }
}
