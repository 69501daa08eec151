//! Reconciliation of the DIMACS header with the RSF tree.

use crate::FormatError;
use crate::parser::dimacs::{DimacsEntry, DimacsHeader};
use crate::parser::vocabulary::MODULES_SYMBOL;
use kconvert_core::{ModelBuilder, SymbolBuilder, SymbolKind};
use log::{debug, trace, warn};

/// Copies the ids declared by the header onto the symbols of the tree.
///
/// Header names are matched up to their first `=`:
/// each value of a non-binary symbol is encoded as a separate variable,
/// and none of them is a usable id for the symbol itself.
pub(crate) fn merge(header: DimacsHeader, symbols: &mut ModelBuilder) -> Result<(), FormatError> {
    debug!(target: "parser", "merging {} header entries into {} symbols", header.len(), symbols.len());
    for (name, entry) in header {
        let name = name.split_once('=').map_or(name.as_str(), |(name, _)| name);
        let Some(symbol) = symbols.symbol(name) else {
            if name == MODULES_SYMBOL {
                warn!(target: "parser", "'{name}' not declared by the tree, adding it as a boolean");
                symbols.declare(SymbolBuilder::new(name, SymbolKind::Bool))?;
                symbols.assign_dimacs_number(name, entry.number())?;
                continue;
            }
            return Err(FormatError::MissingInTree(name.to_owned()));
        };

        match symbol.kind() {
            SymbolKind::Bool => {
                if let DimacsEntry::Tristate { .. } = entry {
                    warn!(target: "parser", "'{name}' is a tristate in the header but a boolean in the tree");
                }
                trace!(target: "parser", "'{name}' gets number {}", entry.number());
                symbols.assign_dimacs_number(name, entry.number())?;
            }
            SymbolKind::Tristate { .. } => {
                trace!(
                    target: "parser",
                    "'{name}' gets numbers {} and {}",
                    entry.number(),
                    entry.module_number()
                );
                symbols.assign_dimacs_number(name, entry.number())?;
                symbols.assign_module_number(name, entry.module_number())?;
            }
            SymbolKind::Other(type_tag) => {
                trace!(target: "parser", "'{name}' of type '{type_tag}' gets no number");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder(symbols: &[(&str, SymbolKind)]) -> ModelBuilder {
        let mut builder = ModelBuilder::new();
        for (name, kind) in symbols {
            builder
                .declare(SymbolBuilder::new(*name, kind.clone()))
                .expect("valid symbol");
        }
        builder
    }

    fn number(builder: &ModelBuilder, name: &str) -> Option<u32> {
        builder.symbol(name).map(SymbolBuilder::dimacs_number)
    }

    #[test]
    fn assigns_numbers() {
        let mut symbols = builder(&[
            ("CONFIG_ALPHA", SymbolKind::Tristate { module_number: 0 }),
            ("CONFIG_GAMMA", SymbolKind::Bool),
            ("CONFIG_DELTA", SymbolKind::Tristate { module_number: 0 }),
        ]);
        let header = DimacsHeader::from([
            (
                "CONFIG_ALPHA".to_string(),
                DimacsEntry::Tristate {
                    number: 1,
                    module_number: 2,
                },
            ),
            ("CONFIG_GAMMA".to_string(), DimacsEntry::Bool(3)),
            ("CONFIG_DELTA".to_string(), DimacsEntry::Bool(4)),
        ]);
        merge(header, &mut symbols).expect("consistent inputs");
        assert_eq!(number(&symbols, "CONFIG_ALPHA"), Some(1));
        assert_eq!(
            symbols.symbol("CONFIG_ALPHA").map(SymbolBuilder::kind),
            Some(&SymbolKind::Tristate { module_number: 2 })
        );
        assert_eq!(number(&symbols, "CONFIG_GAMMA"), Some(3));
        assert_eq!(number(&symbols, "CONFIG_DELTA"), Some(4));
        assert_eq!(
            symbols.symbol("CONFIG_DELTA").map(SymbolBuilder::kind),
            Some(&SymbolKind::Tristate { module_number: 0 })
        );
    }

    #[test]
    fn non_binary_values() {
        let string = SymbolKind::Other("string".to_string());
        let mut symbols = builder(&[("CONFIG_ARCH_HWEIGHT_CFLAGS", string.clone())]);
        let header = DimacsHeader::from([
            (
                "CONFIG_ARCH_HWEIGHT_CFLAGS=-fcall-saved-ecx -fcall-saved-edx".to_string(),
                DimacsEntry::Bool(4),
            ),
            ("CONFIG_ARCH_HWEIGHT_CFLAGS=".to_string(), DimacsEntry::Bool(5)),
        ]);
        merge(header, &mut symbols).expect("consistent inputs");
        assert_eq!(number(&symbols, "CONFIG_ARCH_HWEIGHT_CFLAGS"), Some(0));
        assert_eq!(
            symbols
                .symbol("CONFIG_ARCH_HWEIGHT_CFLAGS")
                .map(SymbolBuilder::kind),
            Some(&string)
        );
    }

    #[test]
    fn modules_symbol() {
        let mut symbols = builder(&[("CONFIG_A", SymbolKind::Bool)]);
        let header = DimacsHeader::from([
            ("CONFIG_A".to_string(), DimacsEntry::Bool(1)),
            ("CONFIG_MODULES".to_string(), DimacsEntry::Bool(2)),
        ]);
        merge(header, &mut symbols).expect("consistent inputs");
        assert_eq!(symbols.len(), 2);
        assert_eq!(
            symbols.symbol("CONFIG_MODULES").map(SymbolBuilder::kind),
            Some(&SymbolKind::Bool)
        );
        assert_eq!(number(&symbols, "CONFIG_MODULES"), Some(2));
    }

    #[test]
    fn missing_in_tree() {
        let mut symbols = builder(&[("CONFIG_A", SymbolKind::Bool)]);
        let header = DimacsHeader::from([("CONFIG_B".to_string(), DimacsEntry::Bool(1))]);
        assert!(matches!(
            merge(header, &mut symbols),
            Err(FormatError::MissingInTree(name)) if name == "CONFIG_B"
        ));
    }
}
