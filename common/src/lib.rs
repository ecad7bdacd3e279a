#[macro_use]
extern crate simple_error;

mod tac;

pub use tac::{
    Quadruple,
    TacProgram,
    TacOp,
    Operand,
    RenderMode
};

mod parser;

pub use parser::{
    TacListingParser,
    TacTextParser
};
