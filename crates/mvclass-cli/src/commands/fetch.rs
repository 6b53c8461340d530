use super::ModelArgs;
use anyhow::Result;
use clap::Parser;

/// Make sure the model artifact exists locally, downloading it if needed.
#[derive(Parser, Debug)]
#[clap()]
pub(crate) struct Args {
    #[clap(flatten)]
    model: ModelArgs,
}

pub(super) fn fetch(config: Args) -> Result<()> {
    let path = config.model.source().ensure_local()?;
    println!("{}", path.display());
    Ok(())
}
