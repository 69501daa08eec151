use super::vocabulary::*;
use crate::{ConvertError, FormatError, io_error};
use kconvert_core::{ModelBuilder, ModelError, NAME_PREFIX, SymbolBuilder, SymbolKind};
use log::{debug, error, info, trace, warn};
use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::Reader;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::BufRead;
use std::path::Path;
use std::str::{self, Utf8Error};
use std::sync::LazyLock;
use thiserror::Error;

static ID_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(ID_PATTERN).unwrap());

/// A violation of the RSF format.
#[derive(Debug, Error)]
pub enum RsfError {
    /// The file ends before the preamble does.
    #[error("expected RSF file to contain the `\\n.\\n` preamble terminator")]
    MissingTerminator,
    /// The XML document has no root element.
    #[error("missing top level `submenu` element")]
    MissingRoot,
    /// The root element is not a `submenu`.
    #[error("top level element `{0}` is not a submenu")]
    InvalidRoot(String),
    /// An element appears where it is not allowed.
    #[error("unexpected tag `{tag}` in <{parent}>")]
    UnexpectedTag {
        /// The enclosing element.
        parent: &'static str,
        /// The offending element.
        tag: String,
    },
    /// Non-blank text appears where it is not allowed.
    #[error("unexpected text `{text}` in <{parent}>")]
    UnexpectedText {
        /// The enclosing element.
        parent: &'static str,
        /// The offending text.
        text: String,
    },
    /// Other XML content (CDATA, processing instructions, ...) appears where it is not allowed.
    #[error("unexpected {content} in <{parent}>")]
    UnexpectedContent {
        /// The enclosing element.
        parent: &'static str,
        /// The kind of the offending content.
        content: &'static str,
    },
    /// A `menu` has more than one `symbol`.
    #[error("more than one symbol in <menu>")]
    MultipleSymbols,
    /// A `symbol` lacks a required attribute.
    #[error("missing attribute `{0}` in <symbol>")]
    MissingAttr(&'static str),
    /// A `symbol` attribute has an invalid value.
    #[error("invalid value `{value}` for attribute `{attr}` in <symbol>")]
    InvalidAttr {
        /// The attribute.
        attr: &'static str,
        /// The offending value.
        value: String,
    },
    /// A `symbol` has more than one `name`.
    #[error("more than one name for symbol `{0}`")]
    MultipleNames(String),
    /// A `symbol` has an empty `name`.
    #[error("empty name for symbol with id `{0}`")]
    EmptyName(String),
    /// A `symbol` that is not a choice has no `name`.
    #[error("no name found in symbol with id `{0}`")]
    MissingName(String),
    /// The document ends inside an element.
    #[error("open tags have not been closed")]
    UnclosedTags,
    /// The declared symbol is not acceptable.
    #[error(transparent)]
    Model(#[from] ModelError),
    /// The XML itself is malformed.
    #[error(transparent)]
    Xml(#[from] quick_xml::Error),
    /// An attribute is malformed.
    #[error(transparent)]
    Attr(#[from] AttrError),
    /// A tag or attribute name is not valid UTF-8.
    #[error(transparent)]
    Utf8(#[from] Utf8Error),
}

/// Symbols read from the RSF tree.
#[derive(Debug, Default)]
pub(crate) struct RsfTree {
    /// Declared symbols, with their parents but without constraints.
    pub(crate) symbols: ModelBuilder,
    /// Maps reference ids (`S@<id>`) to symbol names.
    pub(crate) id_to_name: HashMap<String, String>,
    /// Maps symbol names to the reference ids found in their properties.
    pub(crate) used_ids: BTreeMap<String, BTreeSet<String>>,
    // Anonymous choices found so far.
    choices: usize,
}

/// Attributes of a `symbol` element.
#[derive(Debug)]
struct SymbolAttrs {
    type_tag: String,
    id: String,
    flags: u32,
}

impl SymbolAttrs {
    fn parse(tag: &BytesStart<'_>) -> Result<Self, RsfError> {
        let mut type_tag = None;
        let mut id = None;
        let mut flags = None;
        for attr in tag.attributes() {
            let attr = attr?;
            match str::from_utf8(attr.key.into_inner())? {
                ATTR_TYPE => type_tag = Some(attr.unescape_value()?.into_owned()),
                ATTR_ID => id = Some(attr.unescape_value()?.into_owned()),
                ATTR_FLAGS => flags = Some(attr.unescape_value()?.into_owned()),
                key => trace!(target: "parser", "ignoring attribute '{key}' of <{TAG_SYMBOL}>"),
            }
        }

        let type_tag = type_tag.ok_or(RsfError::MissingAttr(ATTR_TYPE))?;
        if type_tag.is_empty() {
            return Err(RsfError::InvalidAttr {
                attr: ATTR_TYPE,
                value: type_tag,
            });
        }
        let id = id.ok_or(RsfError::MissingAttr(ATTR_ID))?;
        if id.parse::<u64>().is_err() {
            return Err(RsfError::InvalidAttr {
                attr: ATTR_ID,
                value: id,
            });
        }
        let flags = flags.ok_or(RsfError::MissingAttr(ATTR_FLAGS))?;
        let flags = flags.parse::<u32>().map_err(|_| RsfError::InvalidAttr {
            attr: ATTR_FLAGS,
            value: flags.clone(),
        })?;

        Ok(Self {
            type_tag,
            id: format!("{ID_PREFIX}{id}"),
            flags,
        })
    }

    fn is_choice(&self) -> bool {
        self.flags & FLAG_CHOICE != 0
    }
}

pub(crate) fn parse_file(path: &Path) -> Result<RsfTree, ConvertError> {
    info!(target: "parser", "parsing RSF tree of '{}'", path.display());
    let bytes = std::fs::read(path).map_err(io_error(path))?;
    Ok(parse(&bytes)?)
}

pub(crate) fn parse(bytes: &[u8]) -> Result<RsfTree, FormatError> {
    let start = bytes
        .windows(PREAMBLE_TERMINATOR.len())
        .position(|window| window == PREAMBLE_TERMINATOR)
        .map(|position| position + PREAMBLE_TERMINATOR.len())
        .ok_or(FormatError::Rsf {
            position: bytes.len() as u64,
            error: RsfError::MissingTerminator,
        })?;
    trace!(target: "parser", "skipped preamble of {start} bytes");

    let mut reader = Reader::from_reader(&bytes[start..]);
    let mut tree = RsfTree::default();
    parse_document(&mut reader, &mut tree).map_err(|error| FormatError::Rsf {
        position: start as u64 + reader.buffer_position() as u64,
        error,
    })?;
    debug!(target: "parser", "RSF tree declares {} symbols", tree.symbols.len());
    Ok(tree)
}

fn tag_name<'a>(tag: &'a BytesStart<'_>) -> Result<&'a str, Utf8Error> {
    str::from_utf8(tag.name().into_inner())
}

fn unexpected_tag(parent: &'static str, tag: &BytesStart<'_>) -> RsfError {
    let tag = String::from_utf8_lossy(tag.name().into_inner()).into_owned();
    error!(target: "parser", "unexpected tag '{tag}' in <{parent}>");
    RsfError::UnexpectedTag { parent, tag }
}

// Whitespace-only text is ignored anywhere in the structure.
fn check_blank(text: &BytesText<'_>, parent: &'static str) -> Result<(), RsfError> {
    let text = text.unescape()?;
    let text = text.trim();
    if text.is_empty() {
        Ok(())
    } else {
        error!(target: "parser", "unexpected text in <{parent}>");
        Err(RsfError::UnexpectedText {
            parent,
            text: text.to_owned(),
        })
    }
}

fn parse_document<R: BufRead>(reader: &mut Reader<R>, tree: &mut RsfTree) -> Result<(), RsfError> {
    let mut buf = Vec::new();
    let mut root = false;
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(tag) if !root => {
                let tag_name = tag_name(&tag)?;
                if tag_name != TAG_SUBMENU {
                    error!(target: "parser", "top level element '{tag_name}' is not a submenu");
                    return Err(RsfError::InvalidRoot(tag_name.to_owned()));
                }
                root = true;
                // One slot per nesting level, holding the latest symbol found at that level.
                let mut stack = vec![None];
                parse_submenu(reader, &mut stack, tree)?;
            }
            Event::Empty(tag) if !root => {
                let tag_name = tag_name(&tag)?;
                if tag_name != TAG_SUBMENU {
                    error!(target: "parser", "top level element '{tag_name}' is not a submenu");
                    return Err(RsfError::InvalidRoot(tag_name.to_owned()));
                }
                warn!(target: "parser", "empty symbol tree");
                root = true;
            }
            Event::Start(tag) | Event::Empty(tag) => {
                return Err(unexpected_tag(DOCUMENT, &tag));
            }
            Event::End(_) => return Err(RsfError::UnclosedTags),
            Event::Text(text) => check_blank(&text, DOCUMENT)?,
            Event::CData(_) => {
                return Err(RsfError::UnexpectedContent {
                    parent: DOCUMENT,
                    content: "CDATA section",
                });
            }
            // Ignore comments, XML declaration, doctype and processing instructions
            Event::Comment(_) | Event::Decl(_) | Event::DocType(_) | Event::PI(_) => {}
            Event::Eof => break,
        }
        // if we don't keep a borrow elsewhere, we can clear the buffer to keep memory usage low
        buf.clear();
    }
    if root {
        Ok(())
    } else {
        Err(RsfError::MissingRoot)
    }
}

fn parse_submenu<R: BufRead>(
    reader: &mut Reader<R>,
    stack: &mut Vec<Option<String>>,
    tree: &mut RsfTree,
) -> Result<(), RsfError> {
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(tag) => match tag_name(&tag)? {
                TAG_SUBMENU => {
                    trace!(target: "parser", "entering submenu at depth {}", stack.len());
                    stack.push(None);
                    parse_submenu(reader, stack, tree)?;
                    stack.pop();
                }
                TAG_MENU => parse_menu(reader, stack, tree)?,
                _ => return Err(unexpected_tag(TAG_SUBMENU, &tag)),
            },
            Event::Empty(tag) => match tag_name(&tag)? {
                TAG_SUBMENU | TAG_MENU => {}
                _ => return Err(unexpected_tag(TAG_SUBMENU, &tag)),
            },
            Event::End(_) => return Ok(()),
            Event::Text(text) => check_blank(&text, TAG_SUBMENU)?,
            Event::Comment(_) => {}
            event => return Err(unexpected_content(TAG_SUBMENU, &event)),
        }
        buf.clear();
    }
}

fn parse_menu<R: BufRead>(
    reader: &mut Reader<R>,
    stack: &mut [Option<String>],
    tree: &mut RsfTree,
) -> Result<(), RsfError> {
    let mut buf = Vec::new();
    let mut has_symbol = false;
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(tag) => match tag_name(&tag)? {
                TAG_SYMBOL => {
                    if has_symbol {
                        error!(target: "parser", "more than one symbol in <{TAG_MENU}>");
                        return Err(RsfError::MultipleSymbols);
                    }
                    has_symbol = true;
                    let attrs = SymbolAttrs::parse(&tag)?;
                    parse_symbol(reader, attrs, true, stack, tree)?;
                }
                // Its condition is also found among the properties of the symbol.
                TAG_DEP => {
                    reader.read_to_end_into(tag.name(), &mut Vec::new())?;
                }
                _ => return Err(unexpected_tag(TAG_MENU, &tag)),
            },
            Event::Empty(tag) => match tag_name(&tag)? {
                TAG_SYMBOL => {
                    if has_symbol {
                        error!(target: "parser", "more than one symbol in <{TAG_MENU}>");
                        return Err(RsfError::MultipleSymbols);
                    }
                    has_symbol = true;
                    let attrs = SymbolAttrs::parse(&tag)?;
                    parse_symbol(reader, attrs, false, stack, tree)?;
                }
                TAG_DEP => {}
                _ => return Err(unexpected_tag(TAG_MENU, &tag)),
            },
            Event::End(_) => return Ok(()),
            Event::Text(text) => check_blank(&text, TAG_MENU)?,
            Event::Comment(_) => {}
            event => return Err(unexpected_content(TAG_MENU, &event)),
        }
        buf.clear();
    }
}

// Reads the content of `name` and `property` elements.
fn read_text<R: BufRead>(reader: &mut Reader<R>, parent: &'static str) -> Result<String, RsfError> {
    let mut buf = Vec::new();
    let mut text = String::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Text(t) => text.push_str(&t.unescape()?),
            Event::CData(cdata) => text.push_str(str::from_utf8(&cdata)?),
            Event::End(_) => return Ok(text),
            Event::Comment(_) => {}
            Event::Start(tag) | Event::Empty(tag) => return Err(unexpected_tag(parent, &tag)),
            event => return Err(unexpected_content(parent, &event)),
        }
        buf.clear();
    }
}

fn unexpected_content(parent: &'static str, event: &Event<'_>) -> RsfError {
    let content = match event {
        Event::Eof => return RsfError::UnclosedTags,
        Event::CData(_) => "CDATA section",
        Event::PI(_) => "processing instruction",
        Event::Decl(_) => "XML declaration",
        Event::DocType(_) => "doctype",
        _ => "content",
    };
    error!(target: "parser", "unexpected {content} in <{parent}>");
    RsfError::UnexpectedContent { parent, content }
}

fn parse_symbol<R: BufRead>(
    reader: &mut Reader<R>,
    attrs: SymbolAttrs,
    has_children: bool,
    stack: &mut [Option<String>],
    tree: &mut RsfTree,
) -> Result<(), RsfError> {
    let mut name: Option<String> = None;
    let mut used_ids = BTreeSet::new();
    let mut buf = Vec::new();
    while has_children {
        match reader.read_event_into(&mut buf)? {
            Event::Start(tag) => match tag_name(&tag)? {
                TAG_NAME => {
                    if let Some(name) = name {
                        error!(target: "parser", "more than one name for symbol '{name}'");
                        return Err(RsfError::MultipleNames(name));
                    }
                    let text = read_text(reader, TAG_NAME)?;
                    if text.is_empty() {
                        return Err(RsfError::EmptyName(attrs.id));
                    }
                    name = Some(text);
                }
                TAG_PROPERTY => {
                    let text = read_text(reader, TAG_PROPERTY)?;
                    used_ids.extend(
                        ID_REGEX
                            .find_iter(&text)
                            .map(|id| id.as_str())
                            .filter(|id| *id != attrs.id)
                            .map(str::to_owned),
                    );
                }
                _ => return Err(unexpected_tag(TAG_SYMBOL, &tag)),
            },
            Event::Empty(tag) => match tag_name(&tag)? {
                TAG_NAME => {
                    return Err(match name {
                        Some(name) => RsfError::MultipleNames(name),
                        None => RsfError::EmptyName(attrs.id),
                    });
                }
                TAG_PROPERTY => {}
                _ => return Err(unexpected_tag(TAG_SYMBOL, &tag)),
            },
            Event::End(_) => break,
            Event::Text(text) => check_blank(&text, TAG_SYMBOL)?,
            Event::Comment(_) => {}
            event => return Err(unexpected_content(TAG_SYMBOL, &event)),
        }
        buf.clear();
    }

    let name = match name {
        Some(name) => name,
        None if attrs.is_choice() => {
            tree.choices += 1;
            format!("{CHOICE_PREFIX}{}", tree.choices)
        }
        None => {
            error!(target: "parser", "no name found in symbol with id '{}'", attrs.id);
            return Err(RsfError::MissingName(attrs.id));
        }
    };
    tree.add_symbol(attrs, format!("{NAME_PREFIX}{name}"), used_ids, stack)
}

impl RsfTree {
    // Whether `name` is `symbol` or one of its ancestors.
    // Redeclared symbols keep their name, so nesting one under its own descendant would close a cycle.
    fn is_ancestor_or_self(&self, name: &str, symbol: &str) -> bool {
        let mut current = Some(symbol);
        let mut steps = 0;
        while let Some(symbol) = current {
            if symbol == name {
                return true;
            }
            steps += 1;
            if steps > self.symbols.len() {
                break;
            }
            current = self.symbols.symbol(symbol).and_then(SymbolBuilder::parent);
        }
        false
    }

    fn add_symbol(
        &mut self,
        attrs: SymbolAttrs,
        name: String,
        used_ids: BTreeSet<String>,
        stack: &mut [Option<String>],
    ) -> Result<(), RsfError> {
        let kind = SymbolKind::from_type_tag(&attrs.type_tag);
        trace!(target: "parser", "symbol '{name}' of type '{}' with id '{}'", kind.type_name(), attrs.id);
        let mut symbol = SymbolBuilder::new(name.clone(), kind);
        // The latest symbol one level up is the parent.
        if let [.., Some(parent), _] = stack {
            if self.is_ancestor_or_self(&name, parent) {
                warn!(target: "parser", "symbol '{name}' nested within itself, leaving it without parent");
            } else {
                symbol = symbol.with_parent(parent.clone());
            }
        }
        // The symbol becomes the latest at its own level.
        if let Some(top) = stack.last_mut() {
            *top = Some(name.clone());
        }
        self.symbols.declare(symbol)?;
        self.id_to_name.insert(attrs.id, name.clone());
        self.used_ids.insert(name, used_ids);
        Ok(())
    }
}
