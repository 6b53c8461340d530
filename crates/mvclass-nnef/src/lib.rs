/*! Contains utilities for loading NNEF classifiers.

If you're going to load NNEF files on a thread; consider using
`init_thread` when creating it - otherwise the first NNEF asset will
cause a noticeable spike.
*/

use anyhow::Result;

use mvclass_core::prelude::{
    InfererBuilder, InfererProvider, MemoizingInferer, ModelApi, ModelKind,
};
use std::{
    cell::UnsafeCell,
    ffi::OsStr,
    io::Read,
    path::{Path, PathBuf},
    rc::Rc,
};
use tract_nnef::{framework::Nnef, prelude::*};

pub use tract_nnef;

thread_local!(
    /// The NNEF framework is expensive to set up, so it is built once per thread.
    static NNEF: Rc<UnsafeCell<Nnef>>  = {
        Rc::new(UnsafeCell::new(tract_nnef::nnef().with_tract_core()))
    }
);

/// Initialize the thread-local NNEF instance.
///
/// Call this when spawning a loader thread to avoid paying for the
/// framework setup on first load.
pub fn init_thread() {
    NNEF.with(|_| {})
}

/// Utility function to check if a file name is `.nnef.tar`.
pub fn is_nnef_tar(path: &Path) -> bool {
    if let Some(ext) = path.extension().and_then(OsStr::to_str) {
        if ext != "tar" {
            return false;
        }

        let stem = match path.file_stem().and_then(OsStr::to_str).map(PathBuf::from) {
            Some(p) => p,
            None => return false,
        };

        if let Some(ext) = stem.extension().and_then(OsStr::to_str) {
            return ext == "nnef";
        }
    }

    false
}

fn model_for_reader(reader: &mut dyn Read) -> Result<TypedModel> {
    // SAFETY: the framework never leaves this thread and no reference
    // outlives the closure.
    NNEF.with(|n| unsafe { (*n.as_ref().get()).model_for_read(reader) })
}

/// A reader for providing NNEF data.
pub struct NnefData<T: Read>(pub T);

impl<T> NnefData<T>
where
    T: Read,
{
    fn load(&mut self) -> Result<TypedModel> {
        model_for_reader(&mut self.0)
    }
}

impl<T> InfererProvider for NnefData<T>
where
    T: Read,
{
    /// Build a [`MemoizingInferer`].
    fn build_memoizing(mut self, kind: Option<ModelKind>) -> Result<MemoizingInferer> {
        let model = self.load()?;
        MemoizingInferer::from_typed(model, kind)
    }
}

/// Utility function for creating an [`InfererBuilder`] for [`NnefData`].
pub fn builder<T: Read>(read: T) -> InfererBuilder<NnefData<T>> {
    InfererBuilder::new(NnefData(read))
}

/// Read only the declared inputs and outputs of an NNEF archive.
pub fn describe(reader: &mut dyn Read) -> Result<ModelApi> {
    let model = model_for_reader(reader)?;
    ModelApi::for_typed_model(&model)
}
