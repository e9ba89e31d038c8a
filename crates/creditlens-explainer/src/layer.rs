use rand::{Rng, seq::IndexedRandom as _};
use serde::{Deserialize, Serialize};

/// Presentation format of an explanation.
///
/// One layer is drawn uniformly per session and persisted with the
/// session's explanation, so a session keeps seeing the same format.
///
/// ```
/// use creditlens_explainer::layer::ExplanationLayer;
/// use rand::SeedableRng as _;
/// use rand_pcg::Pcg64;
///
/// let mut rng = Pcg64::seed_from_u64(7);
/// let layer = ExplanationLayer::draw(&mut rng);
/// assert!(ExplanationLayer::ALL.contains(&layer));
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::IsVariant,
)]
#[serde(rename_all = "snake_case")]
pub enum ExplanationLayer {
    /// Decision only.
    #[display("minimal")]
    Minimal,
    /// Ranked feature importance bars.
    #[display("feature_importance")]
    FeatureImportance,
    /// Cumulative waterfall from base value to prediction.
    #[display("waterfall")]
    Waterfall,
    /// Plain-language paragraph.
    #[display("narrative")]
    Narrative,
    /// Every grouped feature with raw values.
    #[display("detailed")]
    Detailed,
}

impl ExplanationLayer {
    pub const ALL: [Self; 5] = [
        Self::Minimal,
        Self::FeatureImportance,
        Self::Waterfall,
        Self::Narrative,
        Self::Detailed,
    ];

    /// Draws a layer uniformly at random.
    pub fn draw<R>(rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        Self::ALL.choose(rng).copied().unwrap_or(Self::Detailed)
    }
}
