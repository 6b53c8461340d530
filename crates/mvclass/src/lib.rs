/*!

# mvclass

mvclass classifies one or more photos of the same object with a
multi-view model: every upload is expanded into a few randomly
transformed views, the views are fed through the classifier, and the
top-k classes are returned per image.

## mvclass Core

The core crate holds the image side of the pipeline (decoding,
transforms, view sampling, shape normalization, top-k) along with the
tract wrappers used to run graphs.

```no_run
# fn load_bytes(s: &str) -> Vec<u8> { vec![] }
use mvclass_core::prelude::*;

let image = decode(&load_bytes("front.jpg"))?;
let transform = ClipTransform::new();
let mut sampler = ViewSampler::new(&transform, SeededAugmentSource::new(7));

let views = sampler.sample_one(&image, 2);
let input = ModelKind::MultiView.normalize(views.into_dyn(), CollapsePolicy::First)?;
assert_eq!(input.shape(), &[1, 2, 3, 224, 224]);
# Ok::<(), Box<dyn std::error::Error>>(())
```

## mvclass Asset

Models are shipped as a small binary container holding an ONNX or NNEF
graph together with the class names it was trained on.

```no_run
# fn load_bytes(s: &str) -> Vec<u8> { vec![] }
use mvclass_asset::{AssetData, AssetKind};
use mvclass_core::prelude::ClassTable;

let classes = ClassTable::parse("coupling\nelbow\ntee")?;
let asset = AssetData::new(AssetKind::Onnx, None, classes, load_bytes("model.onnx"));

let bytes = asset.serialize(true)?;
let inferer = AssetData::deserialize(&bytes[..])?.load_memoizing()?;
# Ok::<(), Box<dyn std::error::Error>>(())
```

## mvclass ONNX and mvclass NNEF

These are simple intermediates helping mvclass Asset, but can also be used directly.

```no_run
# fn load_bytes(s: &str) -> std::io::Cursor<Vec<u8>> { std::io::Cursor::new(vec![]) }
use mvclass_core::prelude::{Inferer, ModelKind};

let model = mvclass_onnx::builder(load_bytes("model.onnx"))
    .with_kind(Some(ModelKind::MultiView))
    .with_preloaded_shape(&[1, 2, 3, 224, 224])
    .build_memoizing()?;
# Ok::<(), Box<dyn std::error::Error>>(())
```

## mvclass Runtime

See [`runtime`] for the request-level entry point.

*/

#![warn(rust_2018_idioms)]

pub use mvclass_asset as asset;
pub use mvclass_core as core;
pub use mvclass_nnef as nnef;
pub use mvclass_onnx as onnx;
pub use mvclass_runtime as runtime;
