use mvclass_asset::{AssetData, AssetKind};
use mvclass_core::prelude::{Inferer, ModelKind};
use mvclass_core::tract_core::prelude::tract_ndarray::{ArrayD, IxDyn};
use std::io::Cursor;

#[path = "./helpers.rs"]
mod helpers;

fn roundtrip(graph: &str, model_kind: Option<ModelKind>) -> AssetData {
    let asset = AssetData::new(
        AssetKind::Nnef,
        model_kind,
        helpers::class_table(),
        helpers::nnef_tar(graph),
    );
    let bytes = asset.serialize(true).expect("serialized");
    AssetData::deserialize(Cursor::new(bytes)).expect("valid asset")
}

#[test]
fn test_load_detects_kind() {
    let instance = roundtrip(helpers::MULTI_VIEW_GRAPH, None)
        .load_memoizing()
        .expect("an inferer");

    assert_eq!(instance.kind(), ModelKind::MultiView);
    assert_eq!(instance.class_count(), Some(3));
}

#[test]
fn test_load_uses_declared_kind() {
    let instance = roundtrip(helpers::SINGLE_VIEW_GRAPH, Some(ModelKind::SingleView))
        .load_memoizing()
        .expect("an inferer");

    assert_eq!(instance.kind(), ModelKind::SingleView);
    assert_eq!(
        instance.input_shapes()[0].1,
        [Some(1), Some(3), Some(224), Some(224)],
        "mismatch in input shapes"
    );
}

#[test]
fn test_infer_from_asset() {
    let instance = roundtrip(helpers::SINGLE_VIEW_GRAPH, None)
        .load_memoizing()
        .expect("an inferer");

    let input = ArrayD::<f32>::from_elem(IxDyn(&[1, 3, 224, 224]), 0.25);
    let logits = instance.forward(input).expect("forward");
    assert_eq!(logits.shape(), &[1, 3]);
}

#[test]
fn test_describe() {
    let api = roundtrip(helpers::MULTI_VIEW_GRAPH, None)
        .describe()
        .expect("valid graph");

    assert_eq!(api.input_rank(), Some(5));
    assert_eq!(api.class_count(), Some(3));
}

#[test]
fn test_load_invalid_model_data() {
    let asset = AssetData::new(AssetKind::Nnef, None, helpers::class_table(), vec![1u8, 2, 3]);
    assert!(asset.load_memoizing().is_err());
}
