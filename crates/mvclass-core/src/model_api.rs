// Describes the declared inputs and outputs of a loaded graph.

use tract_core::{model::TypedModel, tract_data::TractResult};
use tract_hir::{infer::Factoid, prelude::InferenceModel};

/// A declared tensor shape; `None` marks a symbolic (dynamic) dimension.
pub type Dims = Vec<Option<usize>>;

/// The `ModelApi` describes the inputs and outputs for a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelApi {
    /// The named model inputs.
    pub inputs: Vec<(String, Dims)>,

    /// The named model outputs.
    pub outputs: Vec<(String, Dims)>,
}

fn clean_name(name: &str) -> String {
    let name = name.split(':').next().unwrap_or(name);
    name.strip_suffix("_0").unwrap_or(name).to_owned()
}

impl ModelApi {
    /// Extract the model API from the provided inference model.
    pub fn for_model(model: &InferenceModel) -> TractResult<Self> {
        let mut inputs: Vec<(String, Dims)> = Default::default();
        for (idx, input_outlet) in model.input_outlets()?.iter().enumerate() {
            let node = model.node(input_outlet.node);
            let input_shape = &model.input_fact(idx)?.shape;

            inputs.push((
                clean_name(&node.name),
                input_shape
                    .dims()
                    .map(|value| {
                        value
                            .concretize()
                            .and_then(|v| v.to_i64().ok())
                            .map(|val| val as usize)
                    })
                    .collect(),
            ));
        }

        let mut outputs: Vec<(String, Dims)> = Default::default();
        for (idx, output_outlet) in model.output_outlets()?.iter().enumerate() {
            let name = model
                .outlet_labels
                .get(output_outlet)
                .map(|label| clean_name(label))
                .unwrap_or_else(|| format!("output_{idx}"));

            let output_shape = &model.output_fact(idx)?.shape;
            outputs.push((
                name,
                output_shape
                    .dims()
                    .map(|value| {
                        value
                            .concretize()
                            .and_then(|v| v.to_i64().ok())
                            .map(|val| val as usize)
                    })
                    .collect(),
            ));
        }

        Ok(Self { outputs, inputs })
    }

    pub fn for_typed_model(model: &TypedModel) -> TractResult<Self> {
        let mut inputs: Vec<(String, Dims)> = Default::default();

        for (idx, input_outlet) in model.input_outlets()?.iter().enumerate() {
            let node = model.node(input_outlet.node);
            let input_shape = &model.input_fact(idx)?.shape;

            inputs.push((
                clean_name(&node.name),
                input_shape
                    .iter()
                    .map(|dim| dim.to_i64().ok().map(|v| v as usize))
                    .collect(),
            ));
        }

        let mut outputs: Vec<(String, Dims)> = Default::default();

        for (idx, output_outlet) in model.outputs.iter().enumerate() {
            let name = model
                .outlet_labels
                .get(output_outlet)
                .map(|label| clean_name(label))
                .unwrap_or_else(|| format!("output_{idx}"));

            let output_shape = &model.output_fact(idx)?.shape;
            let clean_shape = output_shape
                .iter()
                .map(|dim| dim.to_i64().ok().map(|v| v as usize))
                .collect();

            outputs.push((name, clean_shape));
        }

        Ok(Self { outputs, inputs })
    }

    /// Rank of the first input, if the model has any inputs.
    pub fn input_rank(&self) -> Option<usize> {
        self.inputs.first().map(|(_, dims)| dims.len())
    }

    /// The size of the last axis of the first output when it is
    /// statically known; for a classifier this is the class count.
    pub fn class_count(&self) -> Option<usize> {
        self.outputs
            .first()
            .and_then(|(_, dims)| dims.last().copied().flatten())
    }
}
