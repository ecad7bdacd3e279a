use std::fmt;

/// Unary operations are expression operations with only one argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperation {
    NOT,
    NEGATE,
    PLUS
}

impl fmt::Display for UnaryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOperation::NOT => write!(f, "!"),
            UnaryOperation::NEGATE => write!(f, "-"),
            UnaryOperation::PLUS => write!(f, "+"),
        }
    }
}

/// Binary operations are expression operations with two arguments.
/// Chains of equal precedence fold left to right, so `a - b - c` parses as
/// `(a - b) - c`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum BinaryOperation {
    ADD,
    SUB,
    MUL,
    DIV,
    MOD,
    LESS_THAN,
    LESS_EQUAL,
    GREATER_THAN,
    GREATER_EQUAL,
    EQUAL,
    NOT_EQUAL,
    AND,
    OR
}

impl BinaryOperation {
    /// True for `< <= > >= == !=`
    pub fn is_comparison(&self) -> bool {
        matches!(self,
            BinaryOperation::LESS_THAN | BinaryOperation::LESS_EQUAL
          | BinaryOperation::GREATER_THAN | BinaryOperation::GREATER_EQUAL
          | BinaryOperation::EQUAL | BinaryOperation::NOT_EQUAL)
    }
}

impl fmt::Display for BinaryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            BinaryOperation::ADD => "+",
            BinaryOperation::SUB => "-",
            BinaryOperation::MUL => "*",
            BinaryOperation::DIV => "/",
            BinaryOperation::MOD => "%",
            BinaryOperation::LESS_THAN => "<",
            BinaryOperation::LESS_EQUAL => "<=",
            BinaryOperation::GREATER_THAN => ">",
            BinaryOperation::GREATER_EQUAL => ">=",
            BinaryOperation::EQUAL => "==",
            BinaryOperation::NOT_EQUAL => "!=",
            BinaryOperation::AND => "&&",
            BinaryOperation::OR => "||",
        };
        write!(f, "{}", symbol)
    }
}
