// External Modules
extern crate pest;
#[macro_use]
extern crate pest_derive;

// Internal Modules
pub mod compiler;

// Compiler types to use
pub use compiler::{
    CompileError,
    Compiler,
    CompilerOutput,
    CompiscriptMipsGenerator,
    CompiscriptSemanticAnalyser,
    CompiscriptTacGenerator,
    PestCompiscriptParser,
};
