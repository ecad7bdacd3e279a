use std::collections::HashMap;

use compiscript_common::TacProgram;

use super::ast::{Program, SymbolTable};

pub mod compiscript_tac_generator;

/// Byte size of each function frame, keyed by canonical scope name
/// (`function_<name>`). The MIPS backend sizes prologues from this map.
pub type FrameSizes = HashMap<String, u32>;

/// Result of intermediate code generation: the quadruple table plus the
/// frame layout assigned to every function while walking it.
pub struct TacOutput {
    pub tac: TacProgram,
    pub frame_sizes: FrameSizes,
}

/// The TAC generator performs a tree-directed translation of the analysed
/// program into quadruples. It re-enters the scopes the analyzer created
/// (by canonical key) and assigns frame offsets to locals on the way.
pub trait TacGenerator {
    /// Creates a default configuration of a TacGenerator
    fn default() -> Self;

    /// Generate quadruples for an analysed program. The symbol table is the
    /// one built by the analyzer; symbol addresses and array sizes are
    /// written onto it during generation.
    fn generate(self, root: &Program, symbols: &mut SymbolTable) -> TacOutput;
}

// Concrete Definition Export
pub use self::compiscript_tac_generator::CompiscriptTacGenerator;
