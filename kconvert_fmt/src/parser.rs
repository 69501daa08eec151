//! Parsers for the two files written by KconfigReader.

pub(crate) mod dimacs;
pub(crate) mod rsf;
pub(crate) mod vocabulary;

pub use self::dimacs::DimacsError;
pub use self::rsf::RsfError;
