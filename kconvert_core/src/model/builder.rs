use super::{ConstraintFile, ModelDescriptor, VariabilityModel};
use crate::{ModelError, NAME_PREFIX, Symbol, SymbolKind};
use log::{debug, info, warn};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// A symbol whose definition is still in progress.
///
/// Unlike a [`Symbol`], it has no reverse constraint relation yet:
/// that can only be computed once every symbol's constraints are known,
/// which is when the [`ModelBuilder`] gets built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolBuilder {
    name: String,
    kind: SymbolKind,
    dimacs_number: u32,
    parent: Option<String>,
    used_in_constraints: Option<BTreeSet<String>>,
}

impl SymbolBuilder {
    /// Creates a new symbol, without DIMACS number, parent or constraints.
    pub fn new(name: impl Into<String>, kind: SymbolKind) -> Self {
        Self {
            name: name.into(),
            kind,
            dimacs_number: 0,
            parent: None,
            used_in_constraints: None,
        }
    }

    /// Sets the parent of the symbol.
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Name of the symbol.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Kind of the symbol.
    pub fn kind(&self) -> &SymbolKind {
        &self.kind
    }

    /// DIMACS number assigned so far (`0` if none).
    pub fn dimacs_number(&self) -> u32 {
        self.dimacs_number
    }

    /// Name of the parent symbol, if any.
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }
}

/// Defines and builds a [`VariabilityModel`].
///
/// Symbols are kept in a single table indexed by name,
/// and refer to each other (as parents or in constraints) by name only.
#[derive(Debug, Default, Clone)]
pub struct ModelBuilder {
    symbols: HashMap<String, SymbolBuilder>,
}

impl ModelBuilder {
    /// Creates a new, empty [`ModelBuilder`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of declared symbols.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Whether no symbol has been declared yet.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Whether a symbol with the given name has been declared.
    pub fn contains(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    /// Gets a declared symbol by name.
    pub fn symbol(&self, name: &str) -> Option<&SymbolBuilder> {
        self.symbols.get(name)
    }

    /// Declares a new symbol.
    ///
    /// A symbol declared under an already-used name replaces the previous declaration,
    /// which is returned.
    ///
    /// Fails if the name does not carry the `CONFIG_` prefix,
    /// if it is empty past the prefix,
    /// or if the symbol is declared to be its own parent.
    pub fn declare(&mut self, symbol: SymbolBuilder) -> Result<Option<SymbolBuilder>, ModelError> {
        if !symbol.name.starts_with(NAME_PREFIX) {
            return Err(ModelError::MissingPrefix(symbol.name));
        } else if symbol.name.len() == NAME_PREFIX.len() {
            return Err(ModelError::EmptyName(symbol.name));
        }
        if symbol.parent.as_ref() == Some(&symbol.name) {
            return Err(ModelError::SelfParent(symbol.name));
        }
        let previous = self.symbols.insert(symbol.name.clone(), symbol);
        if let Some(ref previous) = previous {
            warn!("symbol '{}' declared multiple times", previous.name);
        }
        Ok(previous)
    }

    fn symbol_mut(&mut self, name: &str) -> Result<&mut SymbolBuilder, ModelError> {
        self.symbols
            .get_mut(name)
            .ok_or_else(|| ModelError::MissingSymbol(name.to_owned()))
    }

    /// Assigns a DIMACS number to a boolean or tristate symbol.
    ///
    /// Fails if there is no such symbol or if it is of any other kind.
    pub fn assign_dimacs_number(&mut self, name: &str, number: u32) -> Result<(), ModelError> {
        let symbol = self.symbol_mut(name)?;
        if !symbol.kind.is_binary() {
            return Err(ModelError::NotBinary(
                symbol.name.clone(),
                symbol.kind.type_name().to_owned(),
            ));
        }
        symbol.dimacs_number = number;
        Ok(())
    }

    /// Assigns the DIMACS number of the `_MODULE` half of a tristate symbol.
    ///
    /// Fails if there is no such symbol or if it is not a tristate.
    pub fn assign_module_number(&mut self, name: &str, number: u32) -> Result<(), ModelError> {
        let symbol = self.symbol_mut(name)?;
        match symbol.kind {
            SymbolKind::Tristate {
                ref mut module_number,
            } => {
                *module_number = number;
                Ok(())
            }
            _ => Err(ModelError::NotBinary(
                symbol.name.clone(),
                symbol.kind.type_name().to_owned(),
            )),
        }
    }

    /// Sets the names of the symbols used in the constraints of the named symbol.
    ///
    /// Fails if any of the involved symbols does not exist.
    /// A symbol listing itself is silently dropped from its own set.
    pub fn set_used_in_constraints(
        &mut self,
        name: &str,
        mut used: BTreeSet<String>,
    ) -> Result<(), ModelError> {
        if let Some(missing) = used.iter().find(|used| !self.symbols.contains_key(*used)) {
            return Err(ModelError::MissingSymbol(missing.clone()));
        }
        used.remove(name);
        self.symbol_mut(name)?.used_in_constraints = Some(used);
        Ok(())
    }

    // A parent chain longer than the number of symbols must be cyclic.
    fn check_forest(&self) -> Result<(), ModelError> {
        for symbol in self.symbols.values() {
            let mut current = symbol;
            let mut steps = 0;
            while let Some(ref parent) = current.parent {
                current = self
                    .symbols
                    .get(parent)
                    .ok_or_else(|| ModelError::MissingSymbol(parent.clone()))?;
                steps += 1;
                if steps > self.symbols.len() {
                    return Err(ModelError::ParentCycle(symbol.name.clone()));
                }
            }
        }
        Ok(())
    }

    /// Builds the [`VariabilityModel`] with the given constraint file.
    ///
    /// Symbols whose constraints were never set get an empty set.
    /// The reverse constraint relation is computed here, in a final pass over all symbols.
    ///
    /// Fails if some parent does not exist, or if the parent relation is cyclic.
    pub fn build(self, constraint_file: ConstraintFile) -> Result<VariabilityModel, ModelError> {
        info!("building variability model of {} symbols", self.symbols.len());
        self.check_forest()?;

        let mut symbols = self
            .symbols
            .into_iter()
            .map(|(name, symbol)| {
                let symbol = Symbol {
                    name: symbol.name,
                    kind: symbol.kind,
                    dimacs_number: symbol.dimacs_number,
                    parent: symbol.parent,
                    used_in_constraints: symbol.used_in_constraints.unwrap_or_default(),
                    used_in_constraints_of_others: BTreeSet::new(),
                    source_locations: None,
                };
                (name, symbol)
            })
            .collect::<BTreeMap<_, _>>();

        let edges = symbols
            .values()
            .flat_map(|symbol| {
                symbol
                    .used_in_constraints
                    .iter()
                    .map(move |used| (used.clone(), symbol.name.clone()))
            })
            .collect::<Vec<_>>();
        debug!("constraint usage graph has {} edges", edges.len());
        for (used, user) in edges {
            // Existence was checked when setting the constraints.
            if let Some(symbol) = symbols.get_mut(&used) {
                symbol.used_in_constraints_of_others.insert(user);
            }
        }

        Ok(VariabilityModel {
            constraint_file,
            descriptor: ModelDescriptor::default(),
            symbols,
        })
    }
}
