/*!

# mvclass Core

The image side of the multi-view classification pipeline, plus the
tract wrappers used to run the classifier itself.

```text
bytes ─ decode ─▶ RawImage ─ ViewSampler ─▶ ViewBatch [V, C, H, W]
      ─ ModelKind::normalize ─▶ model input ─ Inferer::forward ─▶ logits
      ─ topk::predictions ─▶ Vec<Prediction>
```

 */

#![warn(rust_2018_idioms)]

pub use tract_core;
pub use tract_hir;

pub mod augment;
pub mod classes;
pub mod decode;
pub mod error;
pub mod inferer;
mod model_api;
pub mod shape;
pub mod topk;
pub mod transform;
pub mod views;

pub use error::{Error, Result};

/// Most core utilities are re-exported here.
pub mod prelude {
    pub use super::augment::{
        AugmentMode, AugmentSource, ConstantAugmentSource, EntropyAugmentSource,
        SeededAugmentSource,
    };
    pub use super::classes::ClassTable;
    pub use super::decode::{decode, RawImage};
    pub use super::error::Error;
    pub use super::inferer::{Inferer, InfererBuilder, InfererProvider, MemoizingInferer};
    pub use super::model_api::{Dims, ModelApi};
    pub use super::shape::{CollapsePolicy, ModelKind};
    pub use super::topk::{predictions, Prediction};
    pub use super::transform::{ClipTransform, Transform, ViewAugment};
    pub use super::views::{ViewBatch, ViewPolicy, ViewSampler};
}
