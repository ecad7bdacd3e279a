use compiscript_common::TacProgram;

use super::ast::SymbolTable;
use super::tac_generator::FrameSizes;

pub mod register_allocator;
pub mod mips_generator;

pub use self::mips_generator::MipsAssembly;

/// Backend generators turn the quadruple table into target assembly.
/// The quadruple list is block-grouped on entry so every function body is
/// a contiguous span behind the global prefix.
pub trait BackEndGenerator {
    /// Creates a default configuration of a BackEndGenerator
    fn default() -> Self;

    /// Generate target assembly from quadruples, the symbol table and the
    /// per-function frame sizes assigned during TAC generation.
    fn generate(self, tac: &TacProgram, symbols: &SymbolTable, frames: &FrameSizes) -> MipsAssembly;
}

// Concrete Definition Export
pub use self::mips_generator::CompiscriptMipsGenerator;
pub use self::register_allocator::RegisterAllocator;
