//! Control-flow reconstruction: basic blocks, functions and the program.

mod basic_block;
mod function;
mod program;
mod variable;

pub use basic_block::BasicBlock;
pub use function::Function;
pub use program::Program;
pub use variable::{Variable, GLOBAL_SEGMENT_TOP};
