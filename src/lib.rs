//! Command-line front end of the KconfigReader converter.
//!
//! Besides running the conversion of [`kconvert_fmt`],
//! it can attach to the converted model the places where its symbols are declared in the sources,
//! and clean up after the extraction tool.

mod cli;
mod locations;

pub use cli::Cli;
pub use kconvert_fmt;
pub use locations::{add_source_locations, delete_output_files};
