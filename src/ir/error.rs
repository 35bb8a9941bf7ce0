use thiserror::Error;

use super::Opcode;

/// Errors produced while parsing three-address code. All of these are fatal;
/// a malformed input aborts the run without producing output.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Unknown opcode: '{0}'")]
    UnknownOpcode(String),
    #[error("Opcode '{opcode}' takes {expected} operand(s), but {found} were given")]
    OperandCount {
        opcode: Opcode,
        expected: usize,
        found: usize,
    },
    #[error("Invalid integer literal: '{0}'")]
    IntegerLiteral(String),
    #[error("Malformed operand: '{0}'")]
    MalformedOperand(String),
    #[error("Malformed instruction line: '{0}'")]
    MalformedLine(String),
}
