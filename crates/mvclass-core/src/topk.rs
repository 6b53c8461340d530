/*!
Softmax and top-k extraction over classifier logits.
 */

use crate::{
    classes::ClassTable,
    error::{Error, Result},
};
use serde::{Deserialize, Serialize};
use tract_core::prelude::tract_ndarray::{ArrayViewD, Axis};

/// One ranked class prediction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub class: String,
    pub probability: f32,
}

/// Numerically stable softmax.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exp: Vec<f32> = logits.iter().map(|v| (v - max).exp()).collect();
    let sum: f32 = exp.iter().sum();

    exp.into_iter().map(|v| v / sum).collect()
}

/// Indices and probabilities of the `k` most probable classes, ordered
/// by descending probability with ties going to the lower index.
///
/// # Errors
///
/// Returns [`Error::InvalidK`] when `k` is zero or exceeds the number of
/// classes.
pub fn top_k_indices(logits: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
    if k == 0 || k > logits.len() {
        return Err(Error::InvalidK {
            k,
            classes: logits.len(),
        });
    }

    let mut ranked: Vec<(usize, f32)> = softmax(logits).into_iter().enumerate().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.truncate(k);

    Ok(ranked)
}

/// Convert raw model output into ranked [`Prediction`]s.
///
/// `logits` may be `[NumClasses]` or `[B, NumClasses]`; in the latter
/// case only batch row 0 is used.
///
/// # Errors
///
/// * [`Error::InvalidK`] for out-of-range `k`.
/// * [`Error::UnsupportedRank`] when logits are neither rank 1 nor 2.
/// * [`Error::ModelUnavailable`] when the model emits a class index the
///   class table cannot name.
pub fn predictions(
    logits: ArrayViewD<'_, f32>,
    k: usize,
    classes: &ClassTable,
) -> Result<Vec<Prediction>> {
    let row = match logits.ndim() {
        1 => logits,
        2 => logits.index_axis_move(Axis(0), 0),
        rank => {
            return Err(Error::UnsupportedRank {
                rank,
                shape: logits.shape().to_vec(),
                kind: "logits",
            })
        }
    };

    let row: Vec<f32> = row.iter().copied().collect();

    top_k_indices(&row, k)?
        .into_iter()
        .map(|(index, probability)| {
            let class = classes.get(index).ok_or_else(|| {
                Error::ModelUnavailable(format!(
                    "model produced class {} but the class table only has {} entries",
                    index,
                    classes.len()
                ))
            })?;

            Ok(Prediction {
                class: class.to_owned(),
                probability,
            })
        })
        .collect()
}
