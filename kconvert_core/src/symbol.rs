use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// The type of a configuration symbol.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum SymbolKind {
    /// A two-valued symbol.
    Bool,
    /// A three-valued symbol (absent, module, built-in),
    /// encoded by its plain DIMACS number and by the number of its `_MODULE` half.
    Tristate {
        /// DIMACS number of the `_MODULE` half, or `0` if not (yet) known.
        module_number: u32,
    },
    /// Any other type (`int`, `hex`, `string`, ...), which has no single DIMACS number.
    Other(String),
}

impl SymbolKind {
    /// Maps a Kconfig type tag to the corresponding kind.
    ///
    /// Both `boolean` and `bool` denote [`SymbolKind::Bool`].
    pub fn from_type_tag(tag: &str) -> Self {
        match tag {
            "bool" | "boolean" => SymbolKind::Bool,
            "tristate" => SymbolKind::Tristate { module_number: 0 },
            _ => SymbolKind::Other(tag.to_owned()),
        }
    }

    /// Kconfig type tag of this kind.
    pub fn type_name(&self) -> &str {
        match self {
            SymbolKind::Bool => "bool",
            SymbolKind::Tristate { .. } => "tristate",
            SymbolKind::Other(tag) => tag,
        }
    }

    /// Whether symbols of this kind can carry DIMACS numbers.
    pub fn is_binary(&self) -> bool {
        !matches!(self, SymbolKind::Other(_))
    }
}

// Serialized as `{ "type": <tag> }`, plus `module_number` for tristates,
// so that it can be flattened into the enclosing symbol.
impl Serialize for SymbolKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("type", self.type_name())?;
        if let SymbolKind::Tristate { module_number } = self {
            map.serialize_entry("module_number", module_number)?;
        }
        map.end()
    }
}

/// A place in the Kconfig sources where a symbol is declared.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, serde::Serialize)]
pub struct SourceLocation {
    /// Path of the declaring file, relative to the root of the source tree.
    pub file: PathBuf,
    /// 1-based line number.
    pub line: usize,
}

/// A configuration symbol of a built [`VariabilityModel`](crate::VariabilityModel).
///
/// Equality and hashing are structural over all fields.
#[derive(Debug, Clone, Hash, PartialEq, Eq, serde::Serialize)]
pub struct Symbol {
    pub(crate) name: String,
    #[serde(flatten)]
    pub(crate) kind: SymbolKind,
    pub(crate) dimacs_number: u32,
    pub(crate) parent: Option<String>,
    pub(crate) used_in_constraints: BTreeSet<String>,
    pub(crate) used_in_constraints_of_others: BTreeSet<String>,
    pub(crate) source_locations: Option<Vec<SourceLocation>>,
}

impl Symbol {
    /// Unique name of the symbol, always starting with `CONFIG_`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The kind (type) of the symbol.
    pub fn kind(&self) -> &SymbolKind {
        &self.kind
    }

    /// DIMACS number of the symbol, `0` if unassigned.
    ///
    /// Only [`SymbolKind::Bool`] and [`SymbolKind::Tristate`] symbols are ever assigned a number.
    pub fn dimacs_number(&self) -> u32 {
        self.dimacs_number
    }

    /// DIMACS number of the `_MODULE` half of a tristate symbol.
    pub fn module_number(&self) -> Option<u32> {
        if let SymbolKind::Tristate { module_number } = self.kind {
            Some(module_number)
        } else {
            None
        }
    }

    /// Name of the parent symbol in the feature hierarchy, if any.
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// Names of the symbols appearing in this symbol's constraints.
    pub fn used_in_constraints(&self) -> &BTreeSet<String> {
        &self.used_in_constraints
    }

    /// Names of the symbols whose constraints this symbol appears in.
    pub fn used_in_constraints_of_others(&self) -> &BTreeSet<String> {
        &self.used_in_constraints_of_others
    }

    /// Source locations, if they have been looked up.
    pub fn source_locations(&self) -> Option<&[SourceLocation]> {
        self.source_locations.as_deref()
    }
}
