//! Converter for the output of KconfigReader.
//!
//! For a Kconfig tree, KconfigReader writes two files sharing the same base path:
//!
//! - `<base>.dimacs`, a CNF encoding of the constraints whose comment header
//!   declares the numeric id of every boolean and tristate symbol;
//! - `<base>.rsf`, a textual preamble followed by an XML dump of the menu and symbol tree.
//!
//! The [`Converter`] reconciles the two into a single [`VariabilityModel`]:
//! symbols are read from the XML tree (with their types and their place in the hierarchy),
//! get their ids from the DIMACS header,
//! and get linked to the symbols their constraints refer to.
//!
//! ```no_run
//! # use std::path::Path;
//! let model = kconvert_fmt::convert(Path::new("/tmp/kconfigreader/model"))?;
//! println!("{} symbols", model.len());
//! # Ok::<(), kconvert_fmt::ConvertError>(())
//! ```

mod assembler;
mod graph;
mod merger;
mod parser;

pub use kconvert_core;
use kconvert_core::{ModelError, VariabilityModel};
use log::info;
pub use parser::{DimacsError, RsfError};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Extension of the constraint file.
pub const DIMACS_EXTENSION: &str = ".dimacs";
/// Extension of the symbol tree file.
pub const RSF_EXTENSION: &str = ".rsf";

/// A violation of either input format, or an inconsistency between the two.
#[derive(Debug, Error)]
pub enum FormatError {
    /// The DIMACS header is malformed.
    #[error("malformed DIMACS header: {0}")]
    Dimacs(#[from] DimacsError),
    /// The RSF file is malformed.
    #[error("malformed RSF file at byte {position}: {error}")]
    Rsf {
        /// Byte offset in the RSF file at which the error was detected.
        position: u64,
        /// The violation.
        #[source]
        error: RsfError,
    },
    /// A symbol in the DIMACS header has no counterpart in the RSF tree.
    #[error("symbol `{0}` found in DIMACS header but not in RSF tree")]
    MissingInTree(String),
    /// A constraint refers to an id that no symbol has.
    #[error("no symbol for reference id `{0}`")]
    UnresolvedId(String),
    /// The symbols do not make up a consistent model.
    #[error("inconsistent model: {0}")]
    Model(#[from] ModelError),
}

/// The error type for conversions.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// A file could not be read, or the constraint file could not be copied.
    #[error("I/O error on '{}'", .path.display())]
    Io {
        /// The offending file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The input files are malformed or inconsistent.
    #[error(transparent)]
    Format(#[from] FormatError),
}

pub(crate) fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ConvertError + '_ {
    move |source| ConvertError::Io {
        path: path.to_owned(),
        source,
    }
}

fn with_extension(base: &Path, extension: &str) -> PathBuf {
    let mut path = OsString::from(base.as_os_str());
    path.push(extension);
    PathBuf::from(path)
}

/// Converts a pair of KconfigReader output files into a [`VariabilityModel`].
#[derive(Debug, Clone)]
pub struct Converter {
    dimacs_file: PathBuf,
    rsf_file: PathBuf,
}

impl Converter {
    /// Creates a converter for the files `<output_base>.dimacs` and `<output_base>.rsf`.
    pub fn new(output_base: &Path) -> Self {
        Self {
            dimacs_file: with_extension(output_base, DIMACS_EXTENSION),
            rsf_file: with_extension(output_base, RSF_EXTENSION),
        }
    }

    /// Path of the DIMACS file.
    pub fn dimacs_file(&self) -> &Path {
        &self.dimacs_file
    }

    /// Path of the RSF file.
    pub fn rsf_file(&self) -> &Path {
        &self.rsf_file
    }

    /// Runs the conversion.
    ///
    /// The returned model owns a private copy of the DIMACS file,
    /// so the input files can be deleted afterwards.
    ///
    /// Fails with [`ConvertError::Io`] if either file cannot be read or the copy cannot be made,
    /// and with [`ConvertError::Format`] on any malformed input or inconsistency between the files.
    pub fn convert(&self) -> Result<VariabilityModel, ConvertError> {
        info!(
            target: "parser",
            "converting '{}' and '{}'",
            self.dimacs_file.display(),
            self.rsf_file.display()
        );
        let header = parser::dimacs::parse_file(&self.dimacs_file)?;
        let parser::rsf::RsfTree {
            mut symbols,
            id_to_name,
            used_ids,
            ..
        } = parser::rsf::parse_file(&self.rsf_file)?;
        merger::merge(header, &mut symbols)?;
        graph::link(&mut symbols, &id_to_name, used_ids)?;
        assembler::assemble(symbols, &self.dimacs_file)
    }
}

/// Converts the files `<output_base>.dimacs` and `<output_base>.rsf` into a [`VariabilityModel`].
///
/// See [`Converter::convert`].
pub fn convert(output_base: &Path) -> Result<VariabilityModel, ConvertError> {
    Converter::new(output_base).convert()
}
