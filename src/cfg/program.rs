use std::fmt::{self, Display, Formatter};

use log::debug;

use crate::ir::{Instruction, Opcode, Operand};

use super::{
    function::Function,
    variable::{finalise_table, Variable, GLOBAL_SEGMENT_TOP},
};

/// A whole program: its functions plus the global variable table scanned
/// from the raw instruction stream before function splitting.
#[derive(Debug)]
pub struct Program {
    pub global_variables: Vec<Variable>,
    pub functions: Vec<Function>,
    /// Total number of parsed instructions, which bounds the virtual
    /// register space for the C backend.
    pub instruction_count: usize,
}

impl Program {
    pub fn from_instructions(instructions: Vec<Instruction>) -> Self {
        let instruction_count = instructions.len();
        let global_variables = scan_global_variables(&instructions);
        debug!(
            "globals: {:?}",
            global_variables
                .iter()
                .map(|v| v.name.as_str())
                .collect::<Vec<_>>()
        );

        // Functions are the enter..ret runs. `entrypc` marks the next
        // function as the entry point and is dropped, as are stray nops
        // between functions.
        let mut functions = vec![];
        let mut is_main = false;
        let mut run: Vec<Instruction> = vec![];
        for instruction in instructions {
            match instruction.opcode {
                Opcode::EntryPc => {
                    is_main = true;
                    continue;
                }
                Opcode::Nop if run.is_empty() => continue,
                _ => {}
            }
            let is_ret = instruction.opcode == Opcode::Ret;
            run.push(instruction);
            if is_ret {
                functions.push(Function::new(run, is_main));
                is_main = false;
                run = vec![];
            }
        }

        Self {
            global_variables,
            functions,
            instruction_count,
        }
    }
}

/// Global variables only ever enter the instruction stream through address
/// computations of the shape `add <name>_base#<addr> GP`.
fn scan_global_variables(instructions: &[Instruction]) -> Vec<Variable> {
    let mut globals = vec![];
    for instruction in instructions {
        if instruction.operands.len() == 2 && instruction.operands[1] == Operand::Gp {
            assert_eq!(
                Opcode::Add,
                instruction.opcode,
                "GP may only appear as the base of an address computation"
            );
            match &instruction.operands[0] {
                Operand::GlobalAddress { name, offset } => {
                    globals.push(Variable::new(name, *offset));
                }
                other => panic!(
                    "instruction {} adds {:?} to GP instead of a global address",
                    instruction.label, other
                ),
            }
        }
    }
    finalise_table(globals, GLOBAL_SEGMENT_TOP)
}

impl Display for Program {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        for function in &self.functions {
            write!(f, "{}", function)?;
        }
        Ok(())
    }
}
