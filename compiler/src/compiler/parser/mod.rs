use super::ast::Program;
use std::fmt;

pub mod compiscript_pest_parser;

/// Parser handles interpretation of source text into the intermediate
/// representation. Put another way the parser turns a source string into an
/// abstract syntax tree.
pub trait AstParser {
    /// Creates a default configuration of an AstParser
    fn default() -> Self;

    /// Parse a source string into an Abstract Syntax Tree
    fn parse(&self, source: &str) -> Result<Program, SyntaxError>;
}

/// A syntax error reported by the parser, anchored to a source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub line: usize,
    pub message: String,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ERROR L{}: {}", self.line, self.message)
    }
}

// Concrete Definition Export
pub use self::compiscript_pest_parser::PestCompiscriptParser;
