pub mod literals;
pub mod operators;
pub mod ast_node;
pub mod symbol_table;
pub mod datatype;

pub use self::{
    ast_node::{
        AssignTarget,
        Expression,
        Parameter,
        Program,
        Statement,
        SwitchCase,
        TypeAnnotation
    },
    literals::Literal,
    operators::{
        BinaryOperation,
        UnaryOperation
    },
};

pub use self::datatype::{BaseType, DataType};
pub use self::symbol_table::{ParameterInfo, Scope, ScopeId, Symbol, SymbolKind, SymbolTable};

/// Intermediate representation of the compiler model after analysis.
/// Holds the parsed tree, the scope tree with every declared symbol, and
/// the diagnostics accumulated while walking the tree.
pub struct AnalysedProgram {
    pub root: Program,
    pub symbol_table: SymbolTable,
    pub diagnostics: Vec<crate::compiler::semantic_analyser::SemanticError>,
}

impl AnalysedProgram {
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}
