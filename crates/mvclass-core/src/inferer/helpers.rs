use anyhow::bail;
use tract_core::{
    model::TypedModel,
    prelude::{SymbolValues, TDim, ToDim, TypedRunnableModel},
    tract_data::{TVec, TractResult},
};
use tract_hir::prelude::{Datum, InferenceFact, InferenceModel, InferenceModelExt};

/// Pin every input dimension of `model` to `shape` and compile it.
pub(super) fn build_inference_plan(
    model: &InferenceModel,
    shape: &[usize],
) -> TractResult<TypedRunnableModel<TypedModel>> {
    let mut model = model.clone();

    let outlets = model.output_outlets()?.len();
    for output in 0..outlets {
        model.set_output_fact(output, Default::default())?;
    }

    let full_shape: TVec<TDim> = shape.iter().map(|v| v.to_dim()).collect();
    model.set_input_fact(0, InferenceFact::dt_shape(f32::datum_type(), full_shape))?;

    model.into_optimized()?.into_runnable()
}

/// Bind the symbolic input dimensions of `model` to `shape` and compile it.
pub(super) fn build_typed_plan(
    model: &TypedModel,
    shape: &[usize],
) -> TractResult<TypedRunnableModel<TypedModel>> {
    let input = model.input_outlets()?[0];
    let fact = model.outlet_fact(input)?;

    if fact.rank() != shape.len() {
        bail!(
            "model expects a rank {} input but got shape {:?}",
            fact.rank(),
            shape
        );
    }

    let mut values = SymbolValues::default();
    for (dim, value) in fact.shape.iter().zip(shape) {
        let dim: TDim = dim.clone();
        match dim {
            TDim::Val(known) if known as usize != *value => {
                bail!("input shape mismatch: model declares {:?}, got {:?}", fact.shape, shape)
            }
            TDim::Sym(symbol) => values = values.with(&symbol, *value as i64),
            _ => {}
        }
    }

    model
        .concretize_dims(&values)?
        .into_optimized()?
        .into_runnable()
}
