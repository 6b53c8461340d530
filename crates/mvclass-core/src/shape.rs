/*!
Reconciles view tensors with the input convention of the loaded model.

This is the single place where the pipeline branches on [`ModelKind`];
everything upstream produces `[V, C, H, W]` view stacks regardless of
which kind of model will consume them.

| Kind        | Input rank          | Output            |
| ----------- | ------------------- | ----------------- |
| multi-view  | 4 `[V, C, H, W]`    | `[1, V, C, H, W]` |
| multi-view  | 5 `[B, V, C, H, W]` | unchanged         |
| single-view | 5 `[B, V, C, H, W]` | `[B, C, H, W]`    |
| single-view | 4 `[V, C, H, W]`    | `[1, C, H, W]`    |
| single-view | 3 `[C, H, W]`       | `[1, C, H, W]`    |
 */

use crate::error::{Error, Result};
use tract_core::prelude::tract_ndarray::{ArrayD, Axis};

/// The input convention declared by a classifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModelKind {
    /// Expects `[B, V, C, H, W]` and aggregates views internally.
    MultiView,

    /// Expects `[B, C, H, W]`.
    SingleView,
}

/// How a single-view model reduces a view axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CollapsePolicy {
    /// Take view 0.
    #[default]
    First,

    /// Average across views.
    Mean,
}

impl std::str::FromStr for CollapsePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first" => Ok(CollapsePolicy::First),
            "mean" => Ok(CollapsePolicy::Mean),
            _ => Err(format!("unknown collapse policy: {}", s)),
        }
    }
}

impl std::fmt::Display for CollapsePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollapsePolicy::First => f.pad("first"),
            CollapsePolicy::Mean => f.pad("mean"),
        }
    }
}

impl CollapsePolicy {
    fn collapse(self, input: ArrayD<f32>, axis: Axis) -> ArrayD<f32> {
        match self {
            CollapsePolicy::First => input.index_axis_move(axis, 0),
            CollapsePolicy::Mean => match input.mean_axis(axis) {
                Some(mean) => mean,
                // Zero views; keep the (empty) shape consistent.
                None => input.index_axis_move(axis, 0),
            },
        }
    }
}

impl ModelKind {
    /// Guess the convention from the rank of the model's first input.
    pub fn from_input_rank(rank: usize) -> Result<Self> {
        match rank {
            5 => Ok(ModelKind::MultiView),
            4 => Ok(ModelKind::SingleView),
            rank => Err(Error::UnsupportedRank {
                rank,
                shape: vec![],
                kind: "classifier",
            }),
        }
    }

    pub fn is_multiview(self) -> bool {
        self == ModelKind::MultiView
    }

    /// Asset header code; `0` is reserved for "detect".
    pub fn code(self) -> u8 {
        match self {
            ModelKind::SingleView => 1,
            ModelKind::MultiView => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(ModelKind::SingleView),
            2 => Some(ModelKind::MultiView),
            _ => None,
        }
    }

    /// Adapt `input` to this model's convention.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedRank`] for ranks outside the table in
    /// the module documentation.
    pub fn normalize(self, input: ArrayD<f32>, policy: CollapsePolicy) -> Result<ArrayD<f32>> {
        match (self, input.ndim()) {
            (ModelKind::MultiView, 4) => Ok(input.insert_axis(Axis(0))),
            (ModelKind::MultiView, 5) => Ok(input),
            (ModelKind::SingleView, 5) => Ok(policy.collapse(input, Axis(1))),
            (ModelKind::SingleView, 4) => Ok(policy.collapse(input, Axis(0)).insert_axis(Axis(0))),
            (ModelKind::SingleView, 3) => Ok(input.insert_axis(Axis(0))),
            (kind, rank) => Err(Error::UnsupportedRank {
                rank,
                shape: input.shape().to_vec(),
                kind: kind.name(),
            }),
        }
    }

    fn name(self) -> &'static str {
        match self {
            ModelKind::MultiView => "multi-view",
            ModelKind::SingleView => "single-view",
        }
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.name())
    }
}

impl std::str::FromStr for ModelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "multi-view" | "multiview" => Ok(ModelKind::MultiView),
            "single-view" | "singleview" => Ok(ModelKind::SingleView),
            _ => Err(format!("unknown model kind: {}", s)),
        }
    }
}
