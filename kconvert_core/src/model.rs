//! Frozen variability models and their descriptors.

mod builder;

use crate::{ModelError, SourceLocation, Symbol};
pub use builder::*;
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempPath;

/// Domain of the variables in the constraint file.
#[derive(Debug, Default, Clone, Copy, Hash, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableType {
    /// Not specified.
    #[default]
    Unknown,
    /// Every variable is boolean (tristates are encoded by two boolean variables).
    Boolean,
}

/// Format of the constraint file.
#[derive(Debug, Default, Clone, Copy, Hash, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintFileType {
    /// Not specified.
    #[default]
    Unknown,
    /// DIMACS CNF.
    Dimacs,
}

/// Optional information a [`VariabilityModel`] provides.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    /// Symbols know which symbols appear in their constraints, and vice versa.
    ConstraintUsage,
    /// Symbols know their parent in the feature hierarchy.
    Hierarchical,
    /// Symbols know where they are declared in the sources.
    SourceLocations,
}

/// Describes the content of a [`VariabilityModel`].
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ModelDescriptor {
    variable_type: VariableType,
    constraint_file_type: ConstraintFileType,
    attributes: BTreeSet<Attribute>,
}

impl ModelDescriptor {
    /// Domain of the variables in the constraint file.
    pub fn variable_type(&self) -> VariableType {
        self.variable_type
    }

    /// Sets the domain of the variables in the constraint file.
    pub fn set_variable_type(&mut self, variable_type: VariableType) {
        self.variable_type = variable_type;
    }

    /// Format of the constraint file.
    pub fn constraint_file_type(&self) -> ConstraintFileType {
        self.constraint_file_type
    }

    /// Sets the format of the constraint file.
    pub fn set_constraint_file_type(&mut self, constraint_file_type: ConstraintFileType) {
        self.constraint_file_type = constraint_file_type;
    }

    /// Adds an attribute to the descriptor.
    pub fn add_attribute(&mut self, attribute: Attribute) {
        self.attributes.insert(attribute);
    }

    /// Whether the model provides the given attribute.
    pub fn has_attribute(&self, attribute: Attribute) -> bool {
        self.attributes.contains(&attribute)
    }

    /// All attributes the model provides.
    pub fn attributes(&self) -> impl Iterator<Item = Attribute> + '_ {
        self.attributes.iter().copied()
    }
}

/// A file holding the constraints of a model.
///
/// The file is owned by the model: it is deleted when the last clone of the model is dropped.
#[derive(Debug, Clone)]
pub struct ConstraintFile(Arc<TempPath>);

impl ConstraintFile {
    /// Takes ownership of a temporary file.
    pub fn new(path: TempPath) -> Self {
        Self(Arc::new(path))
    }

    /// Path of the file.
    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl Serialize for ConstraintFile {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.path().serialize(serializer)
    }
}

/// A variability model: a catalogue of symbols, indexed by name,
/// together with a reference to the constraint file.
///
/// Built by [`ModelBuilder::build`].
#[derive(Debug, Clone, Serialize)]
pub struct VariabilityModel {
    constraint_file: ConstraintFile,
    descriptor: ModelDescriptor,
    symbols: BTreeMap<String, Symbol>,
}

impl VariabilityModel {
    /// Path of the constraint file.
    pub fn constraint_file(&self) -> &Path {
        self.constraint_file.path()
    }

    /// Describes the content of this model.
    pub fn descriptor(&self) -> &ModelDescriptor {
        &self.descriptor
    }

    /// Mutable access to the descriptor.
    pub fn descriptor_mut(&mut self) -> &mut ModelDescriptor {
        &mut self.descriptor
    }

    /// Number of symbols.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Whether there are no symbols at all.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Whether a symbol with the given name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    /// Gets a symbol by name.
    pub fn symbol(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    /// Iterates over all symbols, sorted by name.
    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }

    /// Gets the parent of the named symbol, if it has one.
    pub fn parent(&self, name: &str) -> Option<&Symbol> {
        self.symbols
            .get(name)
            .and_then(Symbol::parent)
            .and_then(|parent| self.symbols.get(parent))
    }

    /// Iterates over the symbols whose parent is the named symbol.
    pub fn children<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Symbol> + 'a {
        self.symbols
            .values()
            .filter(move |symbol| symbol.parent() == Some(name))
    }

    /// Nesting depth of the named symbol in the feature hierarchy,
    /// where symbols without parent have depth `0`.
    pub fn nesting_depth(&self, name: &str) -> Option<usize> {
        let mut symbol = self.symbols.get(name)?;
        let mut depth = 0;
        // Parent relation is a forest, checked at build time.
        while let Some(parent) = symbol.parent().and_then(|parent| self.symbols.get(parent)) {
            symbol = parent;
            depth += 1;
        }
        Some(depth)
    }

    /// Maps DIMACS numbers to the names of the variables they stand for.
    ///
    /// The `_MODULE` half of a tristate symbol is mapped to the symbol's name with the `_MODULE` suffix.
    pub fn dimacs_mapping(&self) -> BTreeMap<u32, String> {
        let mut mapping = BTreeMap::new();
        for symbol in self.symbols.values() {
            if symbol.dimacs_number != 0 {
                mapping.insert(symbol.dimacs_number, symbol.name.clone());
            }
            if let Some(module_number) = symbol.module_number().filter(|n| *n != 0) {
                mapping.insert(module_number, format!("{}_MODULE", symbol.name));
            }
        }
        mapping
    }

    /// Records a source location for the named symbol.
    ///
    /// This is the only change a model accepts after being built.
    pub fn add_source_location(
        &mut self,
        name: &str,
        location: SourceLocation,
    ) -> Result<(), ModelError> {
        let symbol = self
            .symbols
            .get_mut(name)
            .ok_or_else(|| ModelError::MissingSymbol(name.to_owned()))?;
        symbol
            .source_locations
            .get_or_insert_with(Vec::new)
            .push(location);
        Ok(())
    }
}
