/*!
Multi-view sampling: turns decoded images into stacked `[V, C, H, W]`
view tensors.
*/

use crate::{
    augment::AugmentSource,
    decode::RawImage,
    error::{Error, Result},
    transform::Transform,
};
use tract_core::prelude::tract_ndarray::{Array4, ArrayD, Axis};

/// The views of a single image, stacked along the leading axis.
#[derive(Clone, Debug)]
pub struct ViewBatch {
    views: Array4<f32>,
}

impl ViewBatch {
    /// Number of views along the leading axis.
    pub fn num_views(&self) -> usize {
        self.views.len_of(Axis(0))
    }

    pub fn shape(&self) -> &[usize] {
        self.views.shape()
    }

    pub fn as_array(&self) -> &Array4<f32> {
        &self.views
    }

    pub fn into_dyn(self) -> ArrayD<f32> {
        self.views.into_dyn()
    }
}

/// How many views each image in a request receives.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ViewPolicy {
    /// `min(max_views, images_in_request)`, computed once per request.
    #[default]
    RequestCoupled,

    /// Always `max_views`, regardless of request size.
    PerModel,
}

impl ViewPolicy {
    /// Compute the view count for a request of `images` images.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyBatch`] when `images` is zero.
    pub fn view_count(self, max_views: usize, images: usize) -> Result<usize> {
        if images == 0 {
            return Err(Error::EmptyBatch);
        }

        let views = match self {
            ViewPolicy::RequestCoupled => max_views.min(images),
            ViewPolicy::PerModel => max_views,
        };

        Ok(views.max(1))
    }
}

impl std::str::FromStr for ViewPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "request" | "request-coupled" => Ok(ViewPolicy::RequestCoupled),
            "model" | "per-model" => Ok(ViewPolicy::PerModel),
            _ => Err(format!("unknown view policy: {}", s)),
        }
    }
}

/// Produces [`ViewBatch`]es by applying a [`Transform`] once per view.
pub struct ViewSampler<'t, T: Transform + ?Sized, S: AugmentSource> {
    transform: &'t T,
    source: S,
}

impl<'t, T, S> ViewSampler<'t, T, S>
where
    T: Transform + ?Sized,
    S: AugmentSource,
{
    pub fn new(transform: &'t T, source: S) -> Self {
        Self { transform, source }
    }

    /// Draw `views` independent views of `image`.
    pub fn sample_one(&mut self, image: &RawImage, views: usize) -> ViewBatch {
        let [c, h, w] = self.transform.output_shape();
        let mut stacked = Array4::zeros((views, c, h, w));

        for mut slot in stacked.outer_iter_mut() {
            let view = self.transform.apply(image, &mut self.source);
            slot.assign(&view);
        }

        ViewBatch { views: stacked }
    }

    /// Draw `views` views for every image, preserving order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyBatch`] when `images` is empty.
    pub fn sample(&mut self, images: &[RawImage], views: usize) -> Result<Vec<ViewBatch>> {
        if images.is_empty() {
            return Err(Error::EmptyBatch);
        }

        Ok(images
            .iter()
            .map(|image| self.sample_one(image, views))
            .collect())
    }
}
