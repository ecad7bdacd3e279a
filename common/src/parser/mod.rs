use crate::TacProgram;
use std::io::Error;

pub mod tac_text_parser;

/// Listing parsers read a persisted intermediate listing back into a
/// quadruple table. The driver writes listings for inspection; tooling and
/// tests load them back through this interface.
pub trait TacListingParser {
    /// Parse listing text into a quadruple table
    fn parse_str(&self, data: &str) -> Result<TacProgram, Error>;
}

// Concrete Definition Export
pub use self::tac_text_parser::TacTextParser;
