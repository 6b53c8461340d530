/*!
Randomness sources for per-view augmentation.

Every view drawn by the [`ViewSampler`](crate::views::ViewSampler) pulls
its own draws from an [`AugmentSource`], so two views of the same image
only coincide when the augmentation itself is disabled. Tests and
reproducible runs can swap in a [`SeededAugmentSource`].
*/

use perchance::PerchanceContext;
use rand::{thread_rng, Rng};

/// Uniform samples in `[0, 1)` consumed by the transform pipeline.
pub trait AugmentSource {
    fn uniform(&mut self) -> f32;
}

impl<S: AugmentSource + ?Sized> AugmentSource for Box<S> {
    fn uniform(&mut self) -> f32 {
        (**self).uniform()
    }
}

/// A non-random source, primarily intended for testing.
pub struct ConstantAugmentSource {
    value: f32,
}

impl ConstantAugmentSource {
    /// Will produce `value` on every draw.
    pub fn for_value(value: f32) -> Self {
        Self { value }
    }
}

impl AugmentSource for ConstantAugmentSource {
    fn uniform(&mut self) -> f32 {
        self.value
    }
}

/// Deterministic xorshift source. Identical seeds produce identical
/// augmentation sequences, which is what "deterministic transform
/// mode" relies on.
pub struct SeededAugmentSource {
    ctx: PerchanceContext,
}

impl SeededAugmentSource {
    pub fn new(seed: u128) -> Self {
        Self {
            ctx: PerchanceContext::new(seed),
        }
    }
}

impl Default for SeededAugmentSource {
    /// Seeded from the current time.
    fn default() -> Self {
        Self::new(perchance::gen_time_seed())
    }
}

impl AugmentSource for SeededAugmentSource {
    fn uniform(&mut self) -> f32 {
        self.ctx.uniform_f32()
    }
}

/// Uses [`rand::thread_rng`] as the entropy source.
#[derive(Default)]
pub struct EntropyAugmentSource;

impl AugmentSource for EntropyAugmentSource {
    fn uniform(&mut self) -> f32 {
        thread_rng().gen::<f32>()
    }
}

/// How a request obtains its augmentation randomness.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AugmentMode {
    #[default]
    Entropy,
    Seeded(u128),
}

impl AugmentMode {
    /// Build a fresh source for one request.
    pub fn source(self) -> Box<dyn AugmentSource + Send> {
        match self {
            AugmentMode::Entropy => Box::new(EntropyAugmentSource),
            AugmentMode::Seeded(seed) => Box::new(SeededAugmentSource::new(seed)),
        }
    }
}
