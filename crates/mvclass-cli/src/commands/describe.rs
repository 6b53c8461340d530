use anyhow::{bail, Result};
use clap::Parser;
use mvclass::{
    asset::AssetData,
    core::prelude::{ModelApi, ModelKind},
};
use std::{fs::File, io::BufReader, path::PathBuf};

/// Shortly describe a model or artifact file.
#[derive(Parser, Debug)]
#[clap()]
pub(crate) struct DescribeArgs {
    file: PathBuf,
}

fn print_api(api: &ModelApi) {
    match api.input_rank().map(ModelKind::from_input_rank) {
        Some(Ok(kind)) => println!("input rank suggests a {} model", kind),
        _ => println!("input rank doesn't match a known model kind"),
    }

    println!("Inputs:");
    for (name, shape) in &api.inputs {
        println!("\t{:40}: {:?}", name, shape);
    }

    println!("\nOutputs:");
    for (name, shape) in &api.outputs {
        println!("\t{:40}: {:?}", name, shape);
    }
}

pub(super) fn describe(config: DescribeArgs) -> Result<()> {
    let mut reader = BufReader::new(File::open(&config.file)?);

    if mvclass::nnef::is_nnef_tar(&config.file) {
        println!("a NNEF file");
        print_api(&mvclass::nnef::describe(&mut reader)?);
        return Ok(());
    }

    match config.file.extension().and_then(|ext| ext.to_str()) {
        Some("onnx") => {
            println!("an ONNX file");
            print_api(&mvclass::onnx::describe(&mut reader)?);
        }
        Some("mvca") => {
            let asset = AssetData::deserialize(&mut reader)?;
            println!("an mvclass artifact containing {} data", asset.kind());
            println!(
                "compressed: {}, model kind: {}",
                asset.was_compressed(),
                asset
                    .model_kind()
                    .map_or_else(|| "detect".to_owned(), |kind| kind.to_string())
            );
            println!("{} classes:", asset.classes().len());
            for (idx, name) in asset.classes().iter().enumerate() {
                println!("\t{:4}: {}", idx, name);
            }

            print_api(&asset.describe()?);
        }
        Some(other) => bail!("unknown file type {:?}", other),
        None => bail!("missing file extension {:?}", config.file),
    }

    Ok(())
}
