/*!
Image → tensor transforms.

The shipped model family is trained on CLIP ViT-B/32 statistics, so
[`ClipTransform`] mirrors the evaluation transform used there: a
bicubic shortest-side resize, a center crop, scaling to `[0, 1]` and a
per-channel normalization.
 */

use crate::{augment::AugmentSource, decode::RawImage};
use image::{
    imageops::{self, FilterType},
    RgbImage,
};
use std::borrow::Cow;
use tract_core::prelude::tract_ndarray::Array3;

/// Per-channel mean of the CLIP training distribution.
pub const CLIP_MEAN: [f32; 3] = [0.481_454_66, 0.457_827_5, 0.408_210_73];

/// Per-channel standard deviation of the CLIP training distribution.
pub const CLIP_STD: [f32; 3] = [0.268_629_54, 0.261_302_58, 0.275_777_11];

/// Default square input resolution.
pub const CLIP_SIZE: u32 = 224;

/// Longest long-to-short side ratio that is resized whole.
const MAX_ASPECT: u32 = 8;

/// A transform producing one `[C, H, W]` view of an image.
pub trait Transform {
    /// The `[C, H, W]` shape of every produced view.
    fn output_shape(&self) -> [usize; 3];

    /// Produce one view. Implementations must take any randomness they
    /// need from `source` so independent calls yield independent views.
    fn apply(&self, image: &RawImage, source: &mut dyn AugmentSource) -> Array3<f32>;
}

/// Optional random perturbations applied independently per view.
///
/// The default disables both, which reproduces the deterministic
/// evaluation transform.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ViewAugment {
    /// Probability in `[0, 1]` of mirroring a view horizontally.
    pub flip_probability: f32,

    /// Maximum crop offset, in pixels, away from the center crop.
    pub crop_jitter: u32,
}

impl ViewAugment {
    pub fn is_enabled(&self) -> bool {
        self.flip_probability > 0.0 || self.crop_jitter > 0
    }
}

/// Resize-shortest-side, center-crop, scale and normalize.
#[derive(Clone, Debug)]
pub struct ClipTransform {
    size: u32,
    mean: [f32; 3],
    std: [f32; 3],
    augment: ViewAugment,
}

impl Default for ClipTransform {
    fn default() -> Self {
        Self {
            size: CLIP_SIZE,
            mean: CLIP_MEAN,
            std: CLIP_STD,
            augment: ViewAugment::default(),
        }
    }
}

impl ClipTransform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the crop size. Mostly useful to keep tests small.
    pub fn with_size(mut self, size: u32) -> Self {
        self.size = size;
        self
    }

    /// Replace the normalization statistics.
    pub fn with_stats(mut self, mean: [f32; 3], std: [f32; 3]) -> Self {
        self.mean = mean;
        self.std = std;
        self
    }

    pub fn with_augment(mut self, augment: ViewAugment) -> Self {
        self.augment = augment;
        self
    }

    pub fn augment(&self) -> ViewAugment {
        self.augment
    }
}

/// Dimensions after scaling the shortest side of `width`×`height` to
/// `short`; the long side is truncated like the reference resize.
pub(crate) fn shortest_side_dims(width: u32, height: u32, short: u32) -> (u32, u32) {
    if width <= height {
        let long = (short as u64 * height as u64 / width as u64) as u32;
        (short, long)
    } else {
        let long = (short as u64 * width as u64 / height as u64) as u32;
        (long, short)
    }
}

/// Offset of a centered `crop` window in `dim`, rounding halves to even.
pub(crate) fn center_offset(dim: u32, crop: u32) -> u32 {
    let slack = dim - crop;
    let half = slack / 2;
    if slack % 2 == 1 && half % 2 == 1 {
        half + 1
    } else {
        half
    }
}

/// Trim the long side of `image` to at most `MAX_ASPECT` times its short
/// side, keeping the center. Views only read the central square, so the
/// trimmed margins are never sampled and the resize buffer stays bounded.
fn trim_long_side(image: &RgbImage) -> Cow<'_, RgbImage> {
    let (width, height) = image.dimensions();
    let short = width.min(height);
    let limit = short.saturating_mul(MAX_ASPECT);

    if width > limit {
        let left = center_offset(width, limit);
        Cow::Owned(imageops::crop_imm(image, left, 0, limit, height).to_image())
    } else if height > limit {
        let top = center_offset(height, limit);
        Cow::Owned(imageops::crop_imm(image, 0, top, width, limit).to_image())
    } else {
        Cow::Borrowed(image)
    }
}

fn jittered(center: u32, max: u32, jitter: u32, draw: f32) -> u32 {
    let delta = ((draw * 2.0 - 1.0) * jitter as f32).round() as i64;
    (center as i64 + delta).clamp(0, max as i64) as u32
}

impl Transform for ClipTransform {
    fn output_shape(&self) -> [usize; 3] {
        [3, self.size as usize, self.size as usize]
    }

    fn apply(&self, image: &RawImage, source: &mut dyn AugmentSource) -> Array3<f32> {
        let size = self.size;
        let jitter = self.augment.crop_jitter;
        let target = size + 2 * jitter;

        let source_image = trim_long_side(image.pixels());
        let (width, height) =
            shortest_side_dims(source_image.width(), source_image.height(), target);
        let resized = if (width, height) == source_image.dimensions() {
            source_image.into_owned()
        } else {
            imageops::resize(&*source_image, width, height, FilterType::CatmullRom)
        };

        let mut left = center_offset(width, size);
        let mut top = center_offset(height, size);
        if jitter > 0 {
            left = jittered(left, width - size, jitter, source.uniform());
            top = jittered(top, height - size, jitter, source.uniform());
        }

        let flip =
            self.augment.flip_probability > 0.0 && source.uniform() < self.augment.flip_probability;

        let (mean, std) = (self.mean, self.std);
        let last = size as usize - 1;
        Array3::from_shape_fn((3, size as usize, size as usize), |(c, y, x)| {
            let x = if flip { last - x } else { x };
            let pixel = resized.get_pixel(left + x as u32, top + y as u32);
            (pixel[c] as f32 / 255.0 - mean[c]) / std[c]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::augment::ConstantAugmentSource;
    use image::{Rgb, RgbImage};

    fn raw(img: RgbImage) -> RawImage {
        RawImage::from_rgb(img).unwrap()
    }

    #[test]
    fn shortest_side() {
        assert_eq!(shortest_side_dims(640, 480, 224), (298, 224));
        assert_eq!(shortest_side_dims(480, 640, 224), (224, 298));
        assert_eq!(shortest_side_dims(100, 100, 224), (224, 224));
    }

    #[test]
    fn center_offset_rounds_half_to_even() {
        assert_eq!(center_offset(224, 224), 0);
        assert_eq!(center_offset(225, 224), 0);
        assert_eq!(center_offset(226, 224), 1);
        assert_eq!(center_offset(227, 224), 2);
        assert_eq!(center_offset(229, 224), 2);
        assert_eq!(center_offset(298, 224), 37);
    }

    #[test]
    fn odd_slack_keeps_leading_row() {
        // One spare row: the crop starts at row 0, so the red row survives.
        let image = raw(RgbImage::from_fn(224, 225, |_, y| {
            if y == 0 {
                Rgb([255, 0, 0])
            } else {
                Rgb([0, 0, 0])
            }
        }));
        let transform = ClipTransform::new().with_stats([0.0; 3], [1.0; 3]);
        let view = transform.apply(&image, &mut ConstantAugmentSource::for_value(0.5));

        assert_eq!(view[[0, 0, 0]], 1.0);
        assert_eq!(view[[0, 223, 0]], 0.0);
    }

    #[test]
    fn five_spare_rows_start_at_two() {
        let image = raw(RgbImage::from_fn(224, 229, |_, y| Rgb([y as u8, 0, 0])));
        let transform = ClipTransform::new().with_stats([0.0; 3], [1.0; 3]);
        let view = transform.apply(&image, &mut ConstantAugmentSource::for_value(0.5));

        assert!((view[[0, 0, 0]] - 2.0 / 255.0).abs() < 1e-6);
        assert!((view[[0, 223, 0]] - 225.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn extreme_aspect_ratio_stays_bounded() {
        let tall = raw(RgbImage::from_pixel(1, 200_000, Rgb([200, 100, 50])));
        let wide = raw(RgbImage::from_pixel(150_000, 2, Rgb([200, 100, 50])));
        let transform = ClipTransform::new().with_stats([0.0; 3], [1.0; 3]);

        for image in [tall, wide] {
            let view = transform.apply(&image, &mut ConstantAugmentSource::for_value(0.5));
            assert_eq!(view.shape(), &[3, 224, 224]);
            assert!((view[[0, 112, 112]] - 200.0 / 255.0).abs() < 1e-2);
            assert!((view[[2, 0, 0]] - 50.0 / 255.0).abs() < 1e-2);
        }
    }

    #[test]
    fn trim_only_touches_extreme_images() {
        let ordinary = RgbImage::new(640, 80);
        assert!(matches!(trim_long_side(&ordinary), Cow::Borrowed(_)));

        let tall = RgbImage::new(3, 100);
        assert_eq!(trim_long_side(&tall).dimensions(), (3, 24));

        let wide = RgbImage::new(100, 3);
        assert_eq!(trim_long_side(&wide).dimensions(), (24, 3));
    }

    #[test]
    fn output_shape_is_square() {
        let transform = ClipTransform::new();
        let image = raw(RgbImage::from_pixel(300, 120, Rgb([0, 0, 0])));
        let view = transform.apply(&image, &mut ConstantAugmentSource::for_value(0.5));

        assert_eq!(view.shape(), &[3, 224, 224]);
        assert_eq!(transform.output_shape(), [3, 224, 224]);
    }

    #[test]
    fn normalizes_per_channel() {
        let transform = ClipTransform::new().with_size(8);
        let image = raw(RgbImage::from_pixel(8, 8, Rgb([255, 0, 128])));
        let view = transform.apply(&image, &mut ConstantAugmentSource::for_value(0.5));

        let expect = |c: usize, v: f32| (v / 255.0 - CLIP_MEAN[c]) / CLIP_STD[c];
        assert!((view[[0, 3, 3]] - expect(0, 255.0)).abs() < 1e-5);
        assert!((view[[1, 3, 3]] - expect(1, 0.0)).abs() < 1e-5);
        assert!((view[[2, 3, 3]] - expect(2, 128.0)).abs() < 1e-5);
    }

    #[test]
    fn center_crops_long_side() {
        // 4 columns wide, 8 rows tall: rows 2..6 survive a 4x4 center crop.
        let image = raw(RgbImage::from_fn(4, 8, |_, y| Rgb([y as u8 * 10, 0, 0])));
        let transform = ClipTransform::new()
            .with_size(4)
            .with_stats([0.0; 3], [1.0; 3]);
        let view = transform.apply(&image, &mut ConstantAugmentSource::for_value(0.5));

        assert!((view[[0, 0, 0]] - 20.0 / 255.0).abs() < 1e-6);
        assert!((view[[0, 3, 0]] - 50.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn flip_mirrors_columns() {
        let image = raw(RgbImage::from_fn(4, 4, |x, _| Rgb([x as u8, 0, 0])));
        let transform = ClipTransform::new()
            .with_size(4)
            .with_stats([0.0; 3], [1.0; 3])
            .with_augment(ViewAugment {
                flip_probability: 0.5,
                crop_jitter: 0,
            });

        let kept = transform.apply(&image, &mut ConstantAugmentSource::for_value(0.9));
        let flipped = transform.apply(&image, &mut ConstantAugmentSource::for_value(0.1));

        assert_eq!(kept[[0, 0, 0]], 0.0);
        assert!((flipped[[0, 0, 0]] - 3.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn jitter_stays_in_bounds() {
        let image = raw(RgbImage::from_pixel(50, 30, Rgb([1, 2, 3])));
        let transform = ClipTransform::new().with_size(16).with_augment(ViewAugment {
            flip_probability: 0.0,
            crop_jitter: 4,
        });

        for draw in [0.0, 0.3, 0.999] {
            let view = transform.apply(&image, &mut ConstantAugmentSource::for_value(draw));
            assert_eq!(view.shape(), &[3, 16, 16]);
        }
    }
}
