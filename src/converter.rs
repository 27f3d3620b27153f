//! Hand-off of processed features to a provisioning model converter.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::{Error, Result};

/// Converts one processed feature into provisioning model text.
///
/// `siblings` is the complete list of processed features of the batch, the
/// converted feature included, so references between features can be
/// resolved.
pub trait ModelConverter {
    fn convert(&self, feature: &Path, output: &Path, siblings: &[PathBuf]) -> anyhow::Result<()>;
}

/// Runs `converter` over every processed feature, writing `<file name>.txt`
/// files into `converted_dir`.
///
/// Returns the written paths in input order. The first converter failure
/// aborts the run.
pub fn convert_all<P: AsRef<Path>>(
    processed: &[PathBuf],
    converted_dir: P,
    converter: &dyn ModelConverter,
) -> Result<Vec<PathBuf>> {
    let converted_dir = converted_dir.as_ref();
    fs::create_dir_all(converted_dir).map_err(|source| Error::FileWrite {
        path: converted_dir.display().to_string(),
        source,
    })?;

    let mut outputs = Vec::with_capacity(processed.len());
    for feature in processed {
        let name = feature
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let output = converted_dir.join(format!("{name}.txt"));
        debug!("Converting {} to {}", feature.display(), output.display());
        converter
            .convert(feature, &output, processed)
            .map_err(|e| Error::Convert(format!("{}: {e:#}", feature.display())))?;
        outputs.push(output);
    }
    Ok(outputs)
}
