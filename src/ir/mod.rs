//! The three-address intermediate representation and its parser.

mod error;
mod instruction;
mod opcode;
mod operand;

pub use error::ParseError;
pub use instruction::{place_of, Instruction, Place};
pub use opcode::Opcode;
pub use operand::{Operand, GLOBAL_AREA_FLOOR};

/// Parses a full program listing. Lines without the `instr` keyword (headers,
/// blank lines) are skipped; anything else must parse completely.
pub fn parse(source: &str) -> Result<Vec<Instruction>, ParseError> {
    source
        .lines()
        .filter(|line| line.contains("instr"))
        .map(Instruction::parse)
        .collect()
}
