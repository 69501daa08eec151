// Tags of the RSF symbol tree
pub(crate) const TAG_SUBMENU: &str = "submenu";
pub(crate) const TAG_MENU: &str = "menu";
pub(crate) const TAG_SYMBOL: &str = "symbol";
pub(crate) const TAG_NAME: &str = "name";
pub(crate) const TAG_PROPERTY: &str = "property";
pub(crate) const TAG_DEP: &str = "dep";
// Not a tag: the parent of the root element
pub(crate) const DOCUMENT: &str = "document";

// Attributes of `symbol`
pub(crate) const ATTR_TYPE: &str = "type";
pub(crate) const ATTR_ID: &str = "id";
pub(crate) const ATTR_FLAGS: &str = "flags";

/// `flags` bit marking a choice.
pub(crate) const FLAG_CHOICE: u32 = 0x0010;

/// End of the RSF preamble.
pub(crate) const PREAMBLE_TERMINATOR: &[u8] = b"\n.\n";
/// Prefix turning a `symbol` id into a reference id, as found in properties.
pub(crate) const ID_PREFIX: &str = "S@";
/// Pattern of reference ids in properties.
pub(crate) const ID_PATTERN: &str = r"S@[0-9]+";
/// Prefix of the names given to anonymous choices.
pub(crate) const CHOICE_PREFIX: &str = "CHOICE_";

// DIMACS header
pub(crate) const COMMENT: &str = "c";
pub(crate) const PROBLEM: &str = "p";
pub(crate) const MODULE_SUFFIX: &str = "_MODULE";
/// Symbol KconfigReader always encodes, whether or not the tree declares it.
pub(crate) const MODULES_SYMBOL: &str = "CONFIG_MODULES";
