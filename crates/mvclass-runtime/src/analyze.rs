use crate::{config::AnalyzerConfig, model::ModelRuntime};
use mvclass_core::{
    prelude::{decode, predictions, Prediction, RawImage, ViewSampler},
    Error, Result,
};
use serde::{Deserialize, Serialize};

/// One analysis request: a batch of encoded images and a free-text prompt.
#[derive(Clone, Debug, Default)]
pub struct AnalyzeRequest {
    /// Accepted and logged, but not used for classification.
    pub prompt: String,
    pub images: Vec<Vec<u8>>,
}

impl AnalyzeRequest {
    pub fn new(prompt: impl Into<String>, images: Vec<Vec<u8>>) -> Self {
        Self {
            prompt: prompt.into(),
            images,
        }
    }
}

/// Ranked predictions for the image at `image_index` in the request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageAnalysis {
    pub image_index: usize,
    pub predictions: Vec<Prediction>,
}

/// Per-image analyses, in upload order.
pub type AnalysisResult = Vec<ImageAnalysis>;

/// The wire shape of a successful analysis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub predictions: AnalysisResult,
}

impl From<AnalysisResult> for AnalyzeResponse {
    fn from(predictions: AnalysisResult) -> Self {
        Self { predictions }
    }
}

fn decode_all(images: &[Vec<u8>]) -> Result<Vec<RawImage>> {
    images
        .iter()
        .enumerate()
        .map(|(idx, bytes)| match decode(bytes) {
            Err(Error::Decode(reason)) => Err(Error::Decode(format!("image {}: {}", idx, reason))),
            other => other,
        })
        .collect()
}

/// Classify every image in `request`.
///
/// All images are decoded before any inference happens, and the view
/// count is shared by the whole request. The first failure aborts the
/// batch; no partial result is returned.
pub fn analyze(
    runtime: &ModelRuntime,
    request: &AnalyzeRequest,
    config: &AnalyzerConfig,
) -> Result<AnalysisResult> {
    log::debug!(
        "analyzing {} images, prompt {:?}",
        request.images.len(),
        request.prompt
    );

    let images = decode_all(&request.images)?;
    let views = config
        .view_policy
        .view_count(config.max_views, images.len())?;

    let classes = runtime.class_table();
    if config.top_k == 0 || config.top_k > classes.len() {
        return Err(Error::InvalidK {
            k: config.top_k,
            classes: classes.len(),
        });
    }

    let transform = config.transform();
    let mut sampler = ViewSampler::new(&transform, config.augment_mode.source());
    let batches = sampler.sample(&images, views)?;
    log::debug!("sampled {} views for each of {} images", views, batches.len());

    let mut result = Vec::with_capacity(batches.len());
    for (image_index, batch) in batches.into_iter().enumerate() {
        let input = runtime
            .kind()
            .normalize(batch.into_dyn(), config.collapse_policy)?;
        log::debug!("image {}: model input {:?}", image_index, input.shape());

        let logits = runtime.forward(input)?;
        let predictions = predictions(logits.view(), config.top_k, classes)?;

        result.push(ImageAnalysis {
            image_index,
            predictions,
        });
    }

    Ok(result)
}
