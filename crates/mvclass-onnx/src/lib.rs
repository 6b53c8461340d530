//! Contains utilities for loading ONNX classifiers.

use anyhow::Result;
use mvclass_core::prelude::{
    InfererBuilder, InfererProvider, MemoizingInferer, ModelApi, ModelKind,
};
use std::io::Read;
use tract_onnx::prelude::*;

pub use tract_onnx;

fn model_for_reader(reader: &mut dyn Read) -> Result<InferenceModel> {
    let onnx = tract_onnx::onnx();
    onnx.model_for_read(reader)
}

/// Wrapper for a reader providing ONNX data.
pub struct OnnxData<T: Read>(pub T);

impl<T> OnnxData<T>
where
    T: Read,
{
    fn load(&mut self) -> Result<InferenceModel> {
        model_for_reader(&mut self.0)
    }
}

impl<T> InfererProvider for OnnxData<T>
where
    T: Read,
{
    /// Build a [`MemoizingInferer`].
    fn build_memoizing(mut self, kind: Option<ModelKind>) -> Result<MemoizingInferer> {
        let model = self.load()?;
        MemoizingInferer::from_model(model, kind)
    }
}

/// Utility function for creating an [`InfererBuilder`] for [`OnnxData`].
pub fn builder<T: Read>(read: T) -> InfererBuilder<OnnxData<T>> {
    InfererBuilder::new(OnnxData(read))
}

/// Read only the declared inputs and outputs of an ONNX model.
pub fn describe(reader: &mut dyn Read) -> Result<ModelApi> {
    let model = model_for_reader(reader)?;
    ModelApi::for_model(&model)
}
