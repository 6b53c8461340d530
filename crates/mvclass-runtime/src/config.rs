use mvclass_core::prelude::{AugmentMode, ClipTransform, CollapsePolicy, ViewAugment, ViewPolicy};

/// Per-request analysis settings.
#[derive(Clone, Debug, PartialEq)]
pub struct AnalyzerConfig {
    /// Predictions returned per image.
    pub top_k: usize,

    /// Upper bound on views generated per image.
    pub max_views: usize,

    pub view_policy: ViewPolicy,

    /// How a single-view model reduces the view axis.
    pub collapse_policy: CollapsePolicy,

    pub augment: ViewAugment,
    pub augment_mode: AugmentMode,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            max_views: 2,
            view_policy: ViewPolicy::default(),
            collapse_policy: CollapsePolicy::default(),
            augment: ViewAugment::default(),
            augment_mode: AugmentMode::default(),
        }
    }
}

impl AnalyzerConfig {
    /// The per-view transform described by this config.
    pub fn transform(&self) -> ClipTransform {
        ClipTransform::new().with_augment(self.augment)
    }
}
