use super::ast::{AnalysedProgram, Program};

pub mod diagnostics;
pub mod compiscript_semantic_analyser;

pub use self::diagnostics::{SemanticError, SemanticErrorKind};

/// Semantic analysis sits between parsing and code generation. The analyser
/// builds the scope tree, attaches a symbol for every declaration, infers a
/// (base, rank) type for every expression and accumulates one diagnostic per
/// violation. It completes the walk regardless of how many errors it finds.
pub trait SemanticAnalyser {
    /// Creates a default configuration of a SemanticAnalyser
    fn default() -> Self;

    /// Analyse a parse tree into a symbol table plus diagnostics
    fn analyse(self, root: Program) -> AnalysedProgram;
}

// Concrete Definition Export
pub use self::compiscript_semantic_analyser::CompiscriptSemanticAnalyser;
