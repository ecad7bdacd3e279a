use std::fmt;

/// Literal is a constant value used within an expression.
/// # Example:
///     let hello: integer = 4;
///                          ^ -> Literal
///     let world: boolean = false;
///                          ^^^^^ -> Literal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    INTEGER(i64),
    BOOL(bool),
    STRING(String),
    NULL
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::INTEGER(value) => write!(f, "{}", value),
            Literal::BOOL(value) => write!(f, "{}", value),
            Literal::STRING(value) => write!(f, "\"{}\"", value),
            Literal::NULL => write!(f, "null"),
        }
    }
}
