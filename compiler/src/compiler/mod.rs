pub mod ast;
pub mod backend;
pub mod parser;
pub mod semantic_analyser;
pub mod tac_generator;

use std::fs;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use thiserror::Error;

use compiscript_common::TacProgram;

// Interface Definitions
use self::ast::SymbolTable;
use self::backend::{BackEndGenerator, MipsAssembly};
use self::parser::{AstParser, SyntaxError};
use self::semantic_analyser::{SemanticAnalyser, SemanticError};
use self::tac_generator::{FrameSizes, TacGenerator};

// Concrete Definitions Re-Export
pub use self::backend::CompiscriptMipsGenerator;
pub use self::parser::PestCompiscriptParser;
pub use self::semantic_analyser::CompiscriptSemanticAnalyser;
pub use self::tac_generator::CompiscriptTacGenerator;

/// Failure of a compilation attempt.
/// Static semantic errors arrive as the accumulated diagnostic list
/// together with the best-effort symbol table; the pipeline stops before
/// TAC generation when the list is non-empty.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("{0}")]
    Syntax(SyntaxError),

    #[error("Se encontraron errores semánticos")]
    Semantic {
        symbol_table: SymbolTable,
        errors: Vec<SemanticError>,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Everything a successful compilation produces: the symbol table, the
/// (ungrouped) quadruple table, the per-function frame sizes and the
/// assembly listing.
#[derive(Debug)]
pub struct CompilerOutput {
    pub symbol_table: SymbolTable,
    pub tac: TacProgram,
    pub frame_sizes: FrameSizes,
    pub assembly: MipsAssembly,
}

/// Compiler is a simple class that holds the configuration of a compilation.
/// Compiler takes four typed parameters defining:
///  the AstParser being used,
///  the SemanticAnalyser being used,
///  the TacGenerator being used,
///  and the BackEndGenerator being used.
///
/// # Compilation Diagram
/// compiscript_code -> AstParser -> AST -> SemanticAnalyser
///     -> (SymbolTable, diagnostics) -> TacGenerator -> Quadruples
///     -> BackEndGenerator -> MipsAssembly
pub struct Compiler<P: AstParser, A: SemanticAnalyser, T: TacGenerator, G: BackEndGenerator> {
    parser: P,
    analyser: A,
    tac_generator: T,
    generator: G,
}

#[allow(dead_code)] // Many of the functions on compiler act as a library interface and are not used
impl<P: AstParser, A: SemanticAnalyser, T: TacGenerator, G: BackEndGenerator> Compiler<P, A, T, G> {

    /// Default generates a default compiler configuration. Default
    /// configuration is determined by the default methods of each stage.
    pub fn default() -> Self {
        Compiler {
            parser: P::default(),
            analyser: A::default(),
            tac_generator: T::default(),
            generator: G::default(),
        }
    }

    /// Create new compiler using preconfigured stages.
    pub fn new(parser: P, analyser: A, tac_generator: T, generator: G) -> Self {
        Compiler {
            parser,
            analyser,
            tac_generator,
            generator,
        }
    }

    /// Compiles a source string through all four stages.
    pub fn compile_str(self, source: &str) -> Result<CompilerOutput, CompileError> {
        let root = self.parser.parse(source).map_err(CompileError::Syntax)?;

        let analysed = self.analyser.analyse(root);
        if !analysed.is_clean() {
            return Err(CompileError::Semantic {
                symbol_table: analysed.symbol_table,
                errors: analysed.diagnostics,
            });
        }

        let mut symbols = analysed.symbol_table;
        let generated = self.tac_generator.generate(&analysed.root, &mut symbols);
        let assembly = self.generator.generate(&generated.tac, &symbols, &generated.frame_sizes);

        Ok(CompilerOutput {
            symbol_table: symbols,
            tac: generated.tac,
            frame_sizes: generated.frame_sizes,
            assembly,
        })
    }

    /// Compiles a program file.
    /// @return: CompilerOutput if Ok. Otherwise the compile or IO error.
    pub fn compile(self, source_filename: &Path) -> Result<CompilerOutput, CompileError> {
        let source = fs::read_to_string(source_filename)?;
        self.compile_str(source.as_str())
    }

    /// Compiles a program file and writes the assembly listing into the
    /// destination file path.
    pub fn compile_and_save(self, source_filename: &Path, dest_filename: &Path) -> Result<(), CompileError> {
        let output = self.compile(source_filename)?;

        let mut file = File::create(dest_filename)?;
        file.write_all(output.assembly.to_string().as_bytes())?;
        Ok(())
    }
}
