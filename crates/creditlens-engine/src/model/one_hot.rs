use crate::{
    ApplicantRecord, ExplainError, FeatureCatalog, FeatureKind, NAMESPACE_SEPARATOR,
    model::{Matrix, PreprocessingTransform},
};

/// Column-wise encoder derived from a [`FeatureCatalog`].
///
/// | feature kind | columns |
/// |---|---|
/// | numeric, derived | `num__<id>` (value passed through) |
/// | categorical | `cat__<id>_<category>` per declared category (one-hot) |
/// | ordinal | `ord__<id>` (index of the category in declared order) |
///
/// A categorical value outside the declared categories encodes as all zeros.
/// An ordinal value outside them has no rank and is rejected.
#[derive(Debug, Clone)]
pub struct OneHotTransform {
    column_names: Vec<String>,
    encoders: Vec<FeatureEncoder>,
}

#[derive(Debug, Clone)]
enum FeatureEncoder {
    Passthrough { id: String },
    OneHot { id: String, categories: Vec<String> },
    Ordinal { id: String, categories: Vec<String> },
}

impl FeatureEncoder {
    fn width(&self) -> usize {
        match self {
            Self::Passthrough { .. } | Self::Ordinal { .. } => 1,
            Self::OneHot { categories, .. } => categories.len(),
        }
    }

    fn encode(&self, record: &ApplicantRecord, out: &mut [f64]) -> Result<(), ExplainError> {
        match self {
            Self::Passthrough { id } => out[0] = record.number(id)?,
            Self::OneHot { id, categories } => {
                let value = record.category(id)?;
                for (slot, category) in out.iter_mut().zip(categories) {
                    *slot = if category == value { 1.0 } else { 0.0 };
                }
            }
            Self::Ordinal { id, categories } => {
                let value = record.category(id)?;
                let rank = categories.iter().position(|c| c == value).ok_or_else(|| {
                    ExplainError::invalid_input(
                        id,
                        format!("'{value}' is not one of the declared ordinal categories"),
                    )
                })?;
                out[0] = f64::from(u32::try_from(rank).unwrap_or(u32::MAX));
            }
        }
        Ok(())
    }
}

impl OneHotTransform {
    #[must_use]
    pub fn new(catalog: &FeatureCatalog) -> Self {
        let mut column_names = vec![];
        let mut encoders = vec![];
        for decl in catalog.iter() {
            let id = decl.id.clone();
            match decl.kind {
                FeatureKind::Numeric | FeatureKind::Derived(_) => {
                    column_names.push(format!("num{NAMESPACE_SEPARATOR}{id}"));
                    encoders.push(FeatureEncoder::Passthrough { id });
                }
                FeatureKind::Categorical => {
                    column_names.extend(
                        decl.categories
                            .iter()
                            .map(|c| format!("cat{NAMESPACE_SEPARATOR}{id}_{c}")),
                    );
                    encoders.push(FeatureEncoder::OneHot {
                        id,
                        categories: decl.categories.clone(),
                    });
                }
                FeatureKind::Ordinal => {
                    column_names.push(format!("ord{NAMESPACE_SEPARATOR}{id}"));
                    encoders.push(FeatureEncoder::Ordinal {
                        id,
                        categories: decl.categories.clone(),
                    });
                }
            }
        }
        Self {
            column_names,
            encoders,
        }
    }
}

impl PreprocessingTransform for OneHotTransform {
    fn encoded_column_names(&self) -> &[String] {
        &self.column_names
    }

    fn transform(&self, records: &[ApplicantRecord]) -> Result<Matrix, ExplainError> {
        let mut matrix = Matrix::zeros(records.len(), self.column_names.len());
        for (index, record) in records.iter().enumerate() {
            let row = matrix.row_mut(index);
            let mut offset = 0;
            for encoder in &self.encoders {
                let width = encoder.width();
                encoder.encode(record, &mut row[offset..offset + width])?;
                offset += width;
            }
        }
        Ok(matrix)
    }
}
