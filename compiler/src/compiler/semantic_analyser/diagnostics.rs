use std::fmt;

/// Semantic error kinds. Tests match on line and kind; the Spanish prose of
/// the message is presentation only and not part of the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemanticErrorKind {
    Redeclaration,
    UndeclaredIdentifier,
    MissingTypeAnnotation,
    TypeMismatch,
    HeterogeneousArray,
    NonRectangularArray,
    InvalidOperands,
    NotAnArray,
    InvalidIndex,
    NotAClass,
    UnknownMember,
    ArityMismatch,
    AssignToImmutable,
    MissingReturn,
    ReturnMismatch,
    ReturnOutsideFunction,
    NonBooleanCondition,
    BreakOutsideLoop,
    ContinueOutsideLoop,
    DuplicateCase,
    InheritanceCycle,
}

/// One diagnostic produced by the analyzer. The analyzer accumulates these
/// and keeps walking; it never aborts on a semantic error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemanticError {
    pub line: usize,
    pub kind: SemanticErrorKind,
    pub message: String,
}

impl SemanticError {
    pub fn new(line: usize, kind: SemanticErrorKind, message: String) -> Self {
        SemanticError { line, kind, message }
    }
}

impl fmt::Display for SemanticError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ERROR L{}: {}", self.line, self.message)
    }
}
