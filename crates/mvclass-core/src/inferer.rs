#![warn(clippy::all)]

/*!
Inferers run a classifier graph on a single, already shape-normalized
input tensor.

The [`Inferer`] trait is deliberately small so the rest of the
pipeline can be exercised against test doubles. Loaded graphs are
wrapped in a [`MemoizingInferer`], which builds one optimized tract
plan per distinct input shape. In practice only a handful of shapes
are ever seen (one per view count), so the plan cache stays small while
every run gets a fully concrete, optimized plan.
 */

use anyhow::Result;
use tract_core::prelude::tract_ndarray::ArrayD;

mod helpers;
mod memoizing;

pub use memoizing::MemoizingInferer;

use crate::{model_api::Dims, shape::ModelKind};

/// The main workhorse shared by all components.
///
/// Implementations must be safe to call concurrently through a shared
/// reference; the runtime adds no locking around [`Inferer::forward`].
pub trait Inferer {
    /// The input convention of the model.
    fn kind(&self) -> ModelKind;

    /// Execute the model once on a rank-normalized input, returning raw
    /// logits shaped `[B, NumClasses]`.
    fn forward(&self, input: ArrayD<f32>) -> Result<ArrayD<f32>>;

    /// Retrieve the name and shapes of the model inputs.
    fn input_shapes(&self) -> &[(String, Dims)];

    /// Retrieve the name and shapes of the model outputs.
    fn output_shapes(&self) -> &[(String, Dims)];

    /// Number of classes, when the model declares it statically.
    fn class_count(&self) -> Option<usize> {
        self.output_shapes()
            .first()
            .and_then(|(_, dims)| dims.last().copied().flatten())
    }

    /// Number of execution plans compiled so far. Zero for inferers
    /// without a plan cache.
    fn cached_plans(&self) -> usize {
        0
    }
}

impl<T: Inferer + ?Sized> Inferer for Box<T> {
    fn kind(&self) -> ModelKind {
        (**self).kind()
    }

    fn forward(&self, input: ArrayD<f32>) -> Result<ArrayD<f32>> {
        (**self).forward(input)
    }

    fn input_shapes(&self) -> &[(String, Dims)] {
        (**self).input_shapes()
    }

    fn output_shapes(&self) -> &[(String, Dims)] {
        (**self).output_shapes()
    }

    fn class_count(&self) -> Option<usize> {
        (**self).class_count()
    }

    fn cached_plans(&self) -> usize {
        (**self).cached_plans()
    }
}

/// Helper trait for loadable model formats.
pub trait InfererProvider {
    /// Build a [`MemoizingInferer`]. When `kind` is `None` the model kind
    /// is detected from the rank of the declared input.
    fn build_memoizing(self, kind: Option<ModelKind>) -> Result<MemoizingInferer>;
}

/// Builder for inferers.
pub struct InfererBuilder<P: InfererProvider> {
    provider: P,
    kind: Option<ModelKind>,
    preload: Vec<Vec<usize>>,
}

impl<P> InfererBuilder<P>
where
    P: InfererProvider,
{
    /// Begin the building process from the provided model provider.
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            kind: None,
            preload: vec![],
        }
    }

    /// Declare the model kind instead of detecting it.
    pub fn with_kind(mut self, kind: Option<ModelKind>) -> Self {
        self.kind = kind;
        self
    }

    /// Build a plan for `shape` up-front instead of on first use.
    pub fn with_preloaded_shape(mut self, shape: &[usize]) -> Self {
        self.preload.push(shape.to_vec());
        self
    }

    /// Build a [`MemoizingInferer`].
    pub fn build_memoizing(self) -> Result<MemoizingInferer> {
        let inferer = self.provider.build_memoizing(self.kind)?;
        for shape in &self.preload {
            inferer.preload(shape)?;
        }

        Ok(inferer)
    }
}
