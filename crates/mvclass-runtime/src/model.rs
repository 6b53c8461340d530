use crate::device::{Device, DevicePreference};
use mvclass_asset::AssetData;
use mvclass_core::{
    prelude::{ClassTable, Dims, Inferer, ModelKind},
    tract_core::prelude::tract_ndarray::ArrayD,
    Error, Result,
};
use std::{fs::File, io::BufReader, path::Path};

/// A loaded classifier and the class table it predicts over.
///
/// Built once at startup and shared read-only between requests, either
/// by reference or behind an `Arc`.
pub struct ModelRuntime {
    inferer: Box<dyn Inferer + Send + Sync>,
    classes: ClassTable,
    device: Device,
}

impl ModelRuntime {
    /// Load a packaged artifact from disk.
    ///
    /// # Errors
    ///
    /// [`Error::ModelUnavailable`] when the file is missing, malformed,
    /// or inconsistent with its class table.
    pub fn load(path: impl AsRef<Path>, preference: DevicePreference) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| Error::ModelUnavailable(format!("opening {:?}: {}", path, e)))?;

        let asset = AssetData::deserialize(BufReader::new(file))
            .map_err(|e| Error::ModelUnavailable(format!("reading {:?}: {:#}", path, e)))?;

        log::info!(
            "loaded {} artifact {:?} with {} classes",
            asset.kind(),
            path,
            asset.classes().len()
        );

        Self::from_asset(&asset, preference)
    }

    /// Build a runtime from an already deserialized artifact.
    pub fn from_asset(asset: &AssetData, preference: DevicePreference) -> Result<Self> {
        let inferer = asset.load_memoizing().map_err(|e| {
            Error::ModelUnavailable(format!("building {} model: {:#}", asset.kind(), e))
        })?;

        Self::from_parts(inferer, asset.classes().clone(), preference.resolve())
    }

    /// Assemble a runtime from an arbitrary inferer.
    ///
    /// # Errors
    ///
    /// [`Error::ModelUnavailable`] when the inferer declares a class count
    /// that differs from the table length.
    pub fn from_parts(
        inferer: impl Inferer + Send + Sync + 'static,
        classes: ClassTable,
        device: Device,
    ) -> Result<Self> {
        if let Some(count) = inferer.class_count() {
            if count != classes.len() {
                return Err(Error::ModelUnavailable(format!(
                    "model predicts {} classes but the class table has {}",
                    count,
                    classes.len()
                )));
            }
        }

        log::info!(
            "{} model ready on {} ({} classes)",
            inferer.kind(),
            device,
            classes.len()
        );

        Ok(Self {
            inferer: Box::new(inferer),
            classes,
            device,
        })
    }

    /// Run one forward pass, returning raw logits.
    pub fn forward(&self, input: ArrayD<f32>) -> Result<ArrayD<f32>> {
        Ok(self.inferer.forward(input)?)
    }

    pub fn kind(&self) -> ModelKind {
        self.inferer.kind()
    }

    pub fn is_multiview(&self) -> bool {
        self.kind().is_multiview()
    }

    pub fn class_table(&self) -> &ClassTable {
        &self.classes
    }

    pub fn device(&self) -> Device {
        self.device
    }

    /// Name and declared shape of the model inputs.
    pub fn input_shapes(&self) -> &[(String, Dims)] {
        self.inferer.input_shapes()
    }

    /// Name and declared shape of the model outputs.
    pub fn output_shapes(&self) -> &[(String, Dims)] {
        self.inferer.output_shapes()
    }

    /// Number of execution plans the backend has compiled, one per
    /// distinct input shape seen.
    pub fn cached_plans(&self) -> usize {
        self.inferer.cached_plans()
    }
}

impl std::fmt::Debug for ModelRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRuntime")
            .field("kind", &self.kind())
            .field("classes", &self.classes.len())
            .field("device", &self.device)
            .finish()
    }
}
