use super::{helpers, Inferer};
use crate::{
    model_api::{Dims, ModelApi},
    shape::ModelKind,
};
use anyhow::{bail, Result};
use parking_lot::{RwLock, RwLockReadGuard, RwLockUpgradableReadGuard, RwLockWriteGuard};
use std::{
    collections::{hash_map::Entry, HashMap},
    ops::Deref,
};
use tract_core::prelude::{tract_ndarray::ArrayD, tvec, Tensor, TypedModel, TypedRunnableModel};
use tract_hir::prelude::InferenceModel;

enum Graph {
    Inference(InferenceModel),
    Typed(TypedModel),
}

/// The memoizing inferer generates execution plans to fit each input
/// shape exactly, caching them for later requests.
///
/// Setting up a new plan is fairly costly, so the first request with a
/// new view count pays a noticeable spike. Known shapes can be preloaded
/// through [`InfererBuilder::with_preloaded_shape`](super::InfererBuilder::with_preloaded_shape).
///
/// The cache sits behind a read-mostly lock; runs only hold a read
/// guard, so concurrent forwards on already-seen shapes never contend.
pub struct MemoizingInferer {
    graph: Graph,
    kind: ModelKind,
    model_api: ModelApi,
    plans: RwLock<HashMap<Vec<usize>, TypedRunnableModel<TypedModel>>>,
}

fn resolve_kind(model_api: &ModelApi, kind: Option<ModelKind>) -> Result<ModelKind> {
    if model_api.inputs.len() != 1 {
        bail!(
            "a classifier must have exactly one input, found {}",
            model_api.inputs.len()
        );
    }

    match kind {
        Some(kind) => Ok(kind),
        None => Ok(ModelKind::from_input_rank(model_api.input_rank().unwrap_or(0))?),
    }
}

impl MemoizingInferer {
    /// Create an inferer for the provided `inference` model.
    ///
    /// # Errors
    ///
    /// Fails when the graph doesn't have exactly one input or when the
    /// model kind can't be detected from the input rank.
    pub fn from_model(model: InferenceModel, kind: Option<ModelKind>) -> Result<Self> {
        let model_api = ModelApi::for_model(&model)?;
        let kind = resolve_kind(&model_api, kind)?;

        Ok(Self {
            graph: Graph::Inference(model),
            kind,
            model_api,
            plans: Default::default(),
        })
    }

    /// Create an inferer for the provided `typed` model.
    ///
    /// # Errors
    ///
    /// See [`MemoizingInferer::from_model`].
    pub fn from_typed(model: TypedModel, kind: Option<ModelKind>) -> Result<Self> {
        let model_api = ModelApi::for_typed_model(&model)?;
        let kind = resolve_kind(&model_api, kind)?;

        Ok(Self {
            graph: Graph::Typed(model.into_decluttered()?),
            kind,
            model_api,
            plans: Default::default(),
        })
    }

    /// Build and cache the plan for `shape` ahead of time.
    pub fn preload(&self, shape: &[usize]) -> Result<()> {
        self.get_concrete_model(shape).map(|_| ())
    }

    fn get_concrete_model(
        &self,
        shape: &[usize],
    ) -> Result<impl Deref<Target = TypedRunnableModel<TypedModel>> + '_> {
        let cache = self.plans.upgradable_read();
        let cache = {
            if !cache.contains_key(shape) {
                let mut content = RwLockUpgradableReadGuard::upgrade(cache);
                if let Entry::Vacant(e) = content.entry(shape.to_vec()) {
                    log::debug!("building plan for input shape {:?}", shape);
                    let plan = match &self.graph {
                        Graph::Inference(model) => helpers::build_inference_plan(model, shape)?,
                        Graph::Typed(model) => helpers::build_typed_plan(model, shape)?,
                    };

                    e.insert(plan);
                }

                RwLockWriteGuard::downgrade(content)
            } else {
                RwLockUpgradableReadGuard::downgrade(cache)
            }
        };

        Ok(RwLockReadGuard::map(cache, |c| &c[shape]))
    }
}

impl Inferer for MemoizingInferer {
    fn kind(&self) -> ModelKind {
        self.kind
    }

    fn forward(&self, input: ArrayD<f32>) -> Result<ArrayD<f32>> {
        let shape = input.shape().to_vec();
        let tensor: Tensor = input.into();

        let mut result = self.get_concrete_model(&shape)?.run(tvec!(tensor.into()))?;
        if result.is_empty() {
            bail!("model produced no outputs");
        }

        let logits = result.remove(0);
        Ok(logits.to_array_view::<f32>()?.to_owned())
    }

    fn input_shapes(&self) -> &[(String, Dims)] {
        &self.model_api.inputs
    }

    fn output_shapes(&self) -> &[(String, Dims)] {
        &self.model_api.outputs
    }

    fn cached_plans(&self) -> usize {
        self.plans.read().len()
    }
}
