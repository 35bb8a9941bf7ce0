use std::fmt::{self, Display, Formatter};

use crate::ir::{Instruction, Opcode};

/// A maximal straight-line run of instructions. The first instruction is
/// always a block leader, and labels within the block are contiguous.
///
/// `successor_labels` holds the leader labels control can transfer to from
/// the final instruction; `predecessor_labels` is filled in by the function
/// once all blocks exist, as the transpose of the successor relation.
#[derive(Debug)]
pub struct BasicBlock {
    pub instructions: Vec<Instruction>,
    pub predecessor_labels: Vec<i64>,
    pub successor_labels: Vec<i64>,
}

impl BasicBlock {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        assert!(!instructions.is_empty(), "a basic block cannot be empty");
        let last = instructions.last().unwrap();

        let mut successor_labels = vec![];
        if last.is_branch() {
            successor_labels.push(last.branch_target());
        }
        if last.opcode != Opcode::Br && last.opcode != Opcode::Ret {
            // Fall through to the next contiguous label.
            successor_labels.push(last.label + 1);
        }
        successor_labels.sort_unstable();
        successor_labels.dedup();

        let block = Self {
            instructions,
            predecessor_labels: vec![],
            successor_labels,
        };
        assert_eq!(
            block.last_label() - block.first_label() + 1,
            block.len() as i64,
            "labels within a basic block must be contiguous"
        );
        block
    }

    /// The label of the block's leader, used as the block's identity in
    /// predecessor/successor sets.
    pub fn first_label(&self) -> i64 {
        self.instructions[0].label
    }

    pub fn last_label(&self) -> i64 {
        self.instructions[self.instructions.len() - 1].label
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// True when the block ends in a `call`, which conservatively clobbers
    /// global variables in the reaching-definitions analysis.
    pub fn ends_in_call(&self) -> bool {
        self.instructions
            .last()
            .map(|i| i.opcode == Opcode::Call)
            .unwrap_or(false)
    }
}

impl Display for BasicBlock {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        for instruction in &self.instructions {
            writeln!(f, "    {}", instruction)?;
        }
        Ok(())
    }
}
