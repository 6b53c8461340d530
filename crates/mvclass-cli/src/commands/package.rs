use anyhow::{bail, Context, Result};
use clap::Parser;
use mvclass::{
    asset::{AssetData, AssetKind},
    core::prelude::{ClassTable, Inferer, ModelKind},
};
use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
};

/// Package an ONNX or NNEF model and its class list into an artifact.
#[derive(Parser, Debug)]
#[clap()]
pub(crate) struct PackageArgs {
    /// The model to package, `.onnx` or `.nnef.tar`.
    model: PathBuf,

    /// Class names, one per line or as a JSON array of strings.
    #[clap(long)]
    classes: PathBuf,

    /// Where to write the artifact.
    #[clap(short, long)]
    output: PathBuf,

    /// Declare the model kind instead of detecting it at load time.
    #[clap(long)]
    kind: Option<ModelKind>,

    /// Snappy-compress the model data.
    #[clap(long)]
    compress: bool,
}

fn backend_for(path: &Path) -> Result<AssetKind> {
    if mvclass::nnef::is_nnef_tar(path) {
        return Ok(AssetKind::Nnef);
    }

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("onnx") => Ok(AssetKind::Onnx),
        Some(other) => bail!("unknown file type {:?}", other),
        None => bail!("missing file extension {:?}", path),
    }
}

fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(data)?;
    file.persist(path)
        .with_context(|| format!("writing {:?}", path))?;

    Ok(())
}

pub(super) fn package(config: PackageArgs) -> Result<()> {
    let backend = backend_for(&config.model)?;

    let text = std::fs::read_to_string(&config.classes)
        .with_context(|| format!("reading {:?}", config.classes))?;
    let classes = ClassTable::parse(&text)?;

    let reader = File::open(&config.model)?;
    let asset = AssetData::from_reader(backend, config.kind, classes, reader)?;

    let inferer = asset.load_memoizing()?;
    if let Some(count) = inferer.class_count() {
        if count != asset.classes().len() {
            bail!(
                "model predicts {} classes but {:?} lists {}",
                count,
                config.classes,
                asset.classes().len()
            );
        }
    }

    let bytes = asset.serialize(config.compress)?;
    write_atomic(&config.output, &bytes)?;

    log::info!(
        "packaged {} {} model with {} classes into {:?} ({} bytes)",
        inferer.kind(),
        backend,
        asset.classes().len(),
        config.output,
        bytes.len()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_backend() {
        assert_eq!(backend_for(Path::new("a/model.onnx")).unwrap(), AssetKind::Onnx);
        assert_eq!(backend_for(Path::new("model.nnef.tar")).unwrap(), AssetKind::Nnef);
        assert!(backend_for(Path::new("model.pth")).is_err());
        assert!(backend_for(Path::new("model")).is_err());
    }

    #[test]
    fn writes_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.mvca");

        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"second");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
