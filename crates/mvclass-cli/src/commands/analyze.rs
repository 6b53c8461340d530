use super::{AnalysisArgs, ModelArgs};
use anyhow::{Context, Result};
use clap::Parser;
use mvclass::runtime::{analyze as run_analysis, AnalyzeRequest, AnalyzeResponse};
use std::path::PathBuf;

/// Classify image files and print the JSON response.
#[derive(Parser, Debug)]
#[clap()]
pub(crate) struct Args {
    /// Images of the object, in upload order.
    files: Vec<PathBuf>,

    /// Free text sent along with the images.
    #[clap(long, default_value = "")]
    prompt: String,

    /// Pretty-print the JSON.
    #[clap(long)]
    pretty: bool,

    #[clap(flatten)]
    model: ModelArgs,

    #[clap(flatten)]
    analysis: AnalysisArgs,
}

pub(super) fn analyze(config: Args) -> Result<()> {
    let runtime = config.model.load_runtime(config.analysis.device())?;

    let images = config
        .files
        .iter()
        .map(|path| std::fs::read(path).with_context(|| format!("reading {:?}", path)))
        .collect::<Result<Vec<_>>>()?;

    let request = AnalyzeRequest::new(config.prompt, images);
    let result = run_analysis(&runtime, &request, &config.analysis.to_config())?;
    let response = AnalyzeResponse::from(result);

    let json = if config.pretty {
        serde_json::to_string_pretty(&response)?
    } else {
        serde_json::to_string(&response)?
    };

    println!("{}", json);
    Ok(())
}
