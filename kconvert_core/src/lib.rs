//! Variability model for Kconfig-based product lines.
//!
//! A model is a catalogue of typed configuration [`Symbol`]s
//! (boolean, tristate or otherwise typed),
//! arranged in a feature hierarchy given by the original menu structure,
//! together with a directed relation recording which symbols appear in the constraints of which other symbols.
//!
//! Models are defined through a [`ModelBuilder`],
//! which collects in-progress [`SymbolBuilder`]s in a single name-indexed table.
//! Then, a [`VariabilityModel`] is built from the [`ModelBuilder`],
//! and its symbols can no longer be altered
//! (with the sole exception of their source locations, see [`VariabilityModel::add_source_location`]).
//!
//! ```
//! # use kconvert_core::*;
//! # let constraint_file = ConstraintFile::new(tempfile::NamedTempFile::new().unwrap().into_temp_path());
//! let mut builder = ModelBuilder::new();
//! builder.declare(SymbolBuilder::new("CONFIG_A", SymbolKind::Bool)).unwrap();
//! builder
//!     .declare(SymbolBuilder::new("CONFIG_B", SymbolKind::Tristate { module_number: 0 }).with_parent("CONFIG_A"))
//!     .unwrap();
//! builder.assign_dimacs_number("CONFIG_A", 1).unwrap();
//! builder.set_used_in_constraints("CONFIG_B", ["CONFIG_A".to_string()].into()).unwrap();
//!
//! let model = builder.build(constraint_file).unwrap();
//! assert_eq!(model.nesting_depth("CONFIG_B"), Some(1));
//! assert!(model.symbol("CONFIG_A").unwrap().used_in_constraints_of_others().contains("CONFIG_B"));
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod model;
mod symbol;

pub use model::*;
pub use symbol::*;

use thiserror::Error;

/// Prefix shared by the names of all symbols in a model.
pub const NAME_PREFIX: &str = "CONFIG_";

/// The error type for operations on [`ModelBuilder`]s and [`VariabilityModel`]s.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// Symbol names have to carry the [`NAME_PREFIX`].
    #[error("symbol name `{0}` does not start with `CONFIG_`")]
    MissingPrefix(String),
    /// Symbol names have to be non-empty past the [`NAME_PREFIX`].
    #[error("symbol name `{0}` is empty")]
    EmptyName(String),
    /// There is no such symbol in the model.
    #[error("no symbol named `{0}`")]
    MissingSymbol(String),
    /// A symbol was made its own parent.
    #[error("symbol `{0}` cannot be its own parent")]
    SelfParent(String),
    /// The parent relation is not a forest.
    #[error("parent relation of symbol `{0}` is cyclic")]
    ParentCycle(String),
    /// Only boolean and tristate symbols can have DIMACS numbers.
    #[error("symbol `{0}` of type `{1}` cannot carry a DIMACS number")]
    NotBinary(String, String),
}
