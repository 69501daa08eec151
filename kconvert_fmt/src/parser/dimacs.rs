use super::vocabulary::*;
use crate::{ConvertError, FormatError, io_error};
use kconvert_core::NAME_PREFIX;
use log::{debug, info, trace, warn};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::num::ParseIntError;
use std::path::Path;
use thiserror::Error;

/// A violation of the DIMACS header format, with the 1-based number of the offending line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DimacsError {
    /// A header line does not start with `c`.
    #[error("expected comment line starting with `c` at line {0}")]
    MissingComment(usize),
    /// A header line has no id.
    #[error("missing variable number at line {0}")]
    MissingNumber(usize),
    /// A header line has an id but no name.
    #[error("missing variable name at line {0}")]
    MissingName(usize),
    /// A header line has an id that is not a (non-negative) integer.
    #[error("couldn't parse integer at line {line}: {source}")]
    InvalidNumber {
        /// The offending line.
        line: usize,
        /// The underlying error.
        #[source]
        source: ParseIntError,
    },
}

/// Numeric ids of a symbol, as declared by the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DimacsEntry {
    Bool(u32),
    Tristate { number: u32, module_number: u32 },
}

impl DimacsEntry {
    pub(crate) fn number(&self) -> u32 {
        match *self {
            DimacsEntry::Bool(number) | DimacsEntry::Tristate { number, .. } => number,
        }
    }

    pub(crate) fn module_number(&self) -> u32 {
        match *self {
            DimacsEntry::Bool(_) => 0,
            DimacsEntry::Tristate { module_number, .. } => module_number,
        }
    }
}

/// Symbols declared by the header, by name.
///
/// Names of non-binary symbols still carry their `=<value>` suffix.
pub(crate) type DimacsHeader = BTreeMap<String, DimacsEntry>;

pub(crate) fn parse_file(path: &Path) -> Result<DimacsHeader, ConvertError> {
    info!(target: "parser", "parsing DIMACS header of '{}'", path.display());
    let file = File::open(path).map_err(io_error(path))?;
    parse(BufReader::new(file), path)
}

pub(crate) fn parse<R: BufRead>(reader: R, path: &Path) -> Result<DimacsHeader, ConvertError> {
    // Tristates are assembled from two lines, in any order.
    let mut cache = HashMap::new();
    for (index, line) in reader.split(b'\n').enumerate() {
        let line = line.map_err(io_error(path))?;
        let line_number = index + 1;
        // Values of string symbols are not always valid UTF-8.
        let line = String::from_utf8_lossy(&line);
        let line = line.strip_suffix('\r').unwrap_or(&line);
        let mut tokens = line.split(' ').collect::<Vec<_>>();
        // Trailing separators do not make tokens.
        while tokens.len() > 1 && tokens.last().is_some_and(|token| token.is_empty()) {
            tokens.pop();
        }
        if tokens.len() == 4 && tokens[0] == PROBLEM {
            trace!(target: "parser", "end of header at line {line_number}");
            break;
        } else if tokens[0] != COMMENT {
            return Err(FormatError::from(DimacsError::MissingComment(line_number)).into());
        }
        read_entry(&tokens[1..], line_number, &mut cache).map_err(FormatError::from)?;
    }

    let mut header = DimacsHeader::new();
    for (name, entry) in cache {
        match entry {
            // Never found the plain half: this is a boolean whose name happens to end in `_MODULE`.
            DimacsEntry::Tristate {
                number: 0,
                module_number,
            } => {
                debug!(target: "parser", "'{name}{MODULE_SUFFIX}' has no plain counterpart, taking it as a boolean");
                header.insert(
                    format!("{name}{MODULE_SUFFIX}"),
                    DimacsEntry::Bool(module_number),
                );
            }
            entry => {
                header.insert(name, entry);
            }
        }
    }
    debug!(target: "parser", "DIMACS header declares {} symbols", header.len());
    Ok(header)
}

fn read_entry(
    tokens: &[&str],
    line: usize,
    cache: &mut HashMap<String, DimacsEntry>,
) -> Result<(), DimacsError> {
    let (number, name) = match tokens {
        [] => return Err(DimacsError::MissingNumber(line)),
        [_] => return Err(DimacsError::MissingName(line)),
        [number, name @ ..] => (number, name),
    };
    let number = number
        .parse::<u32>()
        .map_err(|source| DimacsError::InvalidNumber { line, source })?;
    // Names can contain spaces.
    let name = format!("{NAME_PREFIX}{}", name.join(" "));
    trace!(target: "parser", "'{name}' has number {number}");

    if let Some(base) = name.strip_suffix(MODULE_SUFFIX) {
        let plain = cache.get(base).map_or(0, DimacsEntry::number);
        cache.insert(
            base.to_owned(),
            DimacsEntry::Tristate {
                number: plain,
                module_number: number,
            },
        );
    } else if let Some(entry) = cache.get_mut(&name) {
        match entry {
            DimacsEntry::Bool(plain) => {
                warn!(target: "parser", "'{name}' declared again at line {line}");
                *plain = number;
            }
            DimacsEntry::Tristate { number: plain, .. } => *plain = number,
        }
    } else {
        cache.insert(name, DimacsEntry::Bool(number));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_str(content: &str) -> Result<DimacsHeader, ConvertError> {
        parse(content.as_bytes(), Path::new("test.dimacs"))
    }

    fn dimacs_error(content: &str) -> DimacsError {
        match parse_str(content) {
            Err(ConvertError::Format(FormatError::Dimacs(err))) => err,
            other => panic!("expected DIMACS error, got {other:?}"),
        }
    }

    #[test]
    fn bool_and_tristate() {
        let header = parse_str("c 1 ALPHA\nc 2 ALPHA_MODULE\nc 3 GAMMA\np cnf 3 0\n1 -2 0\n")
            .expect("valid header");
        assert_eq!(header.len(), 2);
        assert_eq!(
            header["CONFIG_ALPHA"],
            DimacsEntry::Tristate {
                number: 1,
                module_number: 2
            }
        );
        assert_eq!(header["CONFIG_GAMMA"], DimacsEntry::Bool(3));
    }

    #[test]
    fn module_half_first() {
        let header = parse_str("c 2 ALPHA_MODULE\nc 1 ALPHA\np cnf 2 0\n").expect("valid header");
        assert_eq!(
            header["CONFIG_ALPHA"],
            DimacsEntry::Tristate {
                number: 1,
                module_number: 2
            }
        );
    }

    #[test]
    fn boolean_ending_in_module() {
        let header = parse_str("c 1 ALPHA_MODULE\np cnf 1 0\n").expect("valid header");
        assert_eq!(header.len(), 1);
        assert_eq!(header["CONFIG_ALPHA_MODULE"], DimacsEntry::Bool(1));
    }

    #[test]
    fn spaces_in_names() {
        let header =
            parse_str("c 4 ARCH_HWEIGHT_CFLAGS=-fcall-saved-ecx -fcall-saved-edx\np cnf 4 0\n")
                .expect("valid header");
        assert_eq!(
            header["CONFIG_ARCH_HWEIGHT_CFLAGS=-fcall-saved-ecx -fcall-saved-edx"],
            DimacsEntry::Bool(4)
        );
    }

    #[test]
    fn invalid_utf8() {
        let header = parse(
            &b"c 1 A\nc 2 S=caf\xe9\nc 3 S\np cnf 3 0\n"[..],
            Path::new("test.dimacs"),
        )
        .expect("valid header");
        assert_eq!(header.len(), 3);
        assert_eq!(header["CONFIG_S=caf\u{FFFD}"], DimacsEntry::Bool(2));
        assert_eq!(header["CONFIG_S"], DimacsEntry::Bool(3));
        assert!(matches!(
            parse(&b"c 1 A\n\xff 2 B\n"[..], Path::new("test.dimacs")),
            Err(ConvertError::Format(FormatError::Dimacs(
                DimacsError::MissingComment(2)
            )))
        ));
    }

    #[test]
    fn clauses_are_not_read() {
        let header = parse_str("c 1 A\np cnf 1 1\nthis is not a comment\n").expect("valid header");
        assert_eq!(header.len(), 1);
    }

    #[test]
    fn missing_problem_line() {
        let header = parse_str("c 1 A\nc 2 B\n").expect("valid header");
        assert_eq!(header.len(), 2);
    }

    #[test]
    fn missing_comment() {
        assert_eq!(
            dimacs_error("c 1 A\nc 2 B\nx 3 C\np cnf 3 0\n"),
            DimacsError::MissingComment(3)
        );
        assert_eq!(
            dimacs_error("c 1 A\n\np cnf 1 0\n"),
            DimacsError::MissingComment(2)
        );
        // Not 4 tokens, so not a problem line.
        assert_eq!(
            dimacs_error("c 1 A\np cnf 1\n"),
            DimacsError::MissingComment(2)
        );
    }

    #[test]
    fn invalid_numbers() {
        assert!(matches!(
            dimacs_error("c 1 A\nc two B\n"),
            DimacsError::InvalidNumber { line: 2, .. }
        ));
        assert!(matches!(
            dimacs_error("c -1 A\n"),
            DimacsError::InvalidNumber { line: 1, .. }
        ));
        assert_eq!(dimacs_error("c 1\n"), DimacsError::MissingName(1));
        assert_eq!(dimacs_error("c\n"), DimacsError::MissingNumber(1));
    }
}
