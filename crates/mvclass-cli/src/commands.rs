use anyhow::Result;
use clap::{Args, Parser};
use mvclass::{
    asset::fetch::{ArtifactSource, DEFAULT_MAX_ATTEMPTS},
    core::prelude::{AugmentMode, CollapsePolicy, ViewAugment, ViewPolicy},
    runtime::{AnalyzerConfig, DevicePreference, ModelRuntime},
};
use std::path::PathBuf;

mod analyze;
mod describe;
mod fetch;
#[cfg(feature = "serve")]
mod multipart;
mod package;
#[cfg(feature = "serve")]
mod serve;

/// The command to run.
#[derive(Parser, Debug)]
pub(crate) enum Command {
    #[cfg(feature = "serve")]
    Serve(serve::Args),
    Analyze(analyze::Args),
    Describe(describe::DescribeArgs),
    Package(package::PackageArgs),
    Fetch(fetch::Args),
}

pub(crate) fn run(command: Command) -> Result<()> {
    match command {
        #[cfg(feature = "serve")]
        Command::Serve(config) => serve::serve(config),
        Command::Analyze(config) => analyze::analyze(config),
        Command::Describe(config) => describe::describe(config),
        Command::Package(config) => package::package(config),
        Command::Fetch(config) => fetch::fetch(config),
    }
}

/// Where to find the model artifact.
#[derive(Args, Debug)]
pub(crate) struct ModelArgs {
    /// The packaged model artifact.
    #[clap(long, env = "MVCLASS_MODEL")]
    model: PathBuf,

    /// Download the artifact from here if it doesn't exist locally.
    #[clap(long, env = "MVCLASS_MODEL_URL")]
    model_url: Option<String>,

    /// Number of download attempts before giving up.
    #[clap(long, default_value_t = DEFAULT_MAX_ATTEMPTS)]
    attempts: u32,
}

impl ModelArgs {
    pub(crate) fn source(&self) -> ArtifactSource {
        ArtifactSource::new(&self.model)
            .with_url(self.model_url.clone())
            .with_max_attempts(self.attempts)
    }

    pub(crate) fn load_runtime(&self, device: DevicePreference) -> Result<ModelRuntime> {
        let path = self.source().ensure_local()?;
        Ok(ModelRuntime::load(path, device)?)
    }
}

/// Settings shared by everything that runs the analysis pipeline.
#[derive(Args, Debug)]
pub(crate) struct AnalysisArgs {
    /// Number of predictions per image.
    #[clap(long, default_value_t = 5)]
    top_k: usize,

    /// Upper bound on views per image.
    #[clap(long, default_value_t = 2)]
    max_views: usize,

    /// `request` for min(max-views, images) or `model` for always max-views.
    #[clap(long, default_value = "request")]
    view_policy: ViewPolicy,

    /// How single-view models reduce the views: `first` or `mean`.
    #[clap(long, default_value = "first")]
    collapse: CollapsePolicy,

    /// Seed the view augmentation for reproducible results.
    #[clap(long)]
    seed: Option<u128>,

    /// Probability of mirroring each view.
    #[clap(long, default_value_t = 0.0)]
    flip_probability: f32,

    /// Maximum random crop offset in pixels.
    #[clap(long, default_value_t = 0)]
    crop_jitter: u32,

    /// `auto` or `cpu`.
    #[clap(long, default_value = "auto")]
    device: DevicePreference,
}

impl AnalysisArgs {
    pub(crate) fn device(&self) -> DevicePreference {
        self.device
    }

    pub(crate) fn to_config(&self) -> AnalyzerConfig {
        AnalyzerConfig {
            top_k: self.top_k,
            max_views: self.max_views,
            view_policy: self.view_policy,
            collapse_policy: self.collapse,
            augment: ViewAugment {
                flip_probability: self.flip_probability,
                crop_jitter: self.crop_jitter,
            },
            augment_mode: self.seed.map_or(AugmentMode::Entropy, AugmentMode::Seeded),
        }
    }
}
