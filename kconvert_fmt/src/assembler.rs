//! Final assembly of the model.

use crate::{ConvertError, FormatError, io_error};
use kconvert_core::{
    Attribute, ConstraintFile, ConstraintFileType, ModelBuilder, VariabilityModel, VariableType,
};
use log::{debug, info};
use std::fs::File;
use std::io;
use std::path::Path;
use tempfile::TempPath;

/// Prefix of the private copies of the constraint file.
const COPY_PREFIX: &str = "varmodel";

// The input file belongs to the tool that produced it, which may delete it at any time.
fn copy_constraint_file(dimacs_file: &Path, temp_dir: &Path) -> Result<TempPath, ConvertError> {
    let mut source = File::open(dimacs_file).map_err(io_error(dimacs_file))?;
    let mut copy = tempfile::Builder::new()
        .prefix(COPY_PREFIX)
        .suffix(crate::DIMACS_EXTENSION)
        .tempfile_in(temp_dir)
        .map_err(io_error(temp_dir))?;
    let bytes = io::copy(&mut source, &mut copy).map_err(io_error(copy.path()))?;
    debug!(target: "parser", "copied {bytes} bytes to '{}'", copy.path().display());
    Ok(copy.into_temp_path())
}

/// Freezes the symbols into a [`VariabilityModel`] backed by a private copy of the DIMACS file.
pub(crate) fn assemble(
    symbols: ModelBuilder,
    dimacs_file: &Path,
) -> Result<VariabilityModel, ConvertError> {
    let temp_dir = std::env::temp_dir();
    let constraint_file = ConstraintFile::new(copy_constraint_file(dimacs_file, &temp_dir)?);
    let mut model = symbols
        .build(constraint_file)
        .map_err(FormatError::from)?;
    let descriptor = model.descriptor_mut();
    descriptor.set_variable_type(VariableType::Boolean);
    descriptor.set_constraint_file_type(ConstraintFileType::Dimacs);
    descriptor.add_attribute(Attribute::ConstraintUsage);
    descriptor.add_attribute(Attribute::Hierarchical);
    info!(target: "parser", "model of {} symbols assembled", model.len());
    Ok(model)
}
