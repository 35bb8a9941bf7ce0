use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};

use log::debug;

use crate::ir::{Instruction, Opcode, Operand};

use super::{
    basic_block::BasicBlock,
    variable::{finalise_table, Variable},
};

/// A function reconstructed from a contiguous `enter`..`ret` instruction run.
///
/// Blocks and their instructions are built once and never moved or deleted
/// afterwards; optimisation passes rewrite instructions in place (dead code
/// becomes `nop`) so that every label keeps addressing the same slot.
#[derive(Debug)]
pub struct Function {
    /// The label of the function's `enter` instruction, which also serves as
    /// its id at call sites.
    pub id: i64,
    pub is_main: bool,
    pub blocks: Vec<BasicBlock>,
    pub local_variables: Vec<Variable>,
    pub parameters: Vec<Variable>,
    /// Size of the local frame in bytes, from `enter`.
    pub frame_size: i64,
    /// Size of the parameter area in bytes, from `ret`.
    pub param_size: i64,
    /// Constants propagated by the last constant propagation run.
    pub constants_propagated: usize,
    /// Statements nopped out by the last dead-store elimination run.
    pub statements_eliminated: usize,
    block_index: HashMap<i64, usize>,
}

impl Function {
    /// Builds a function from its instructions. The first instruction must
    /// be `enter` and the last `ret`; labels must be contiguous and
    /// ascending. Violations are structural defects in the input and abort
    /// the run.
    pub fn new(mut instructions: Vec<Instruction>, is_main: bool) -> Self {
        let first = instructions.first().expect("a function cannot be empty");
        assert_eq!(
            Opcode::Enter,
            first.opcode,
            "a function must start with enter"
        );
        let id = first.label;
        let frame_size = constant_operand(first);
        let last = instructions.last().unwrap();
        assert_eq!(Opcode::Ret, last.opcode, "a function must end with ret");
        let param_size = constant_operand(last);

        let local_variables = scan_local_variables(&instructions);
        let parameters = scan_parameters(&instructions);
        scan_block_leaders(&mut instructions);
        debug!(
            "function {}: leaders at {:?}",
            id,
            instructions
                .iter()
                .filter(|i| i.is_block_leader)
                .map(|i| i.label)
                .collect::<Vec<_>>()
        );

        let mut blocks: Vec<BasicBlock> = vec![];
        let mut run: Vec<Instruction> = vec![];
        for instruction in instructions {
            if instruction.is_block_leader && !run.is_empty() {
                blocks.push(BasicBlock::new(run));
                run = vec![];
            }
            run.push(instruction);
        }
        if !run.is_empty() {
            blocks.push(BasicBlock::new(run));
        }

        let block_index = blocks
            .iter()
            .enumerate()
            .map(|(index, block)| (block.first_label(), index))
            .collect();

        let mut function = Self {
            id,
            is_main,
            blocks,
            local_variables,
            parameters,
            frame_size,
            param_size,
            constants_propagated: 0,
            statements_eliminated: 0,
            block_index,
        };
        function.wire_predecessors();
        function
    }

    /// Records each block as a predecessor of all its successors, so the
    /// two relations are transposes of each other by construction.
    fn wire_predecessors(&mut self) {
        let mut edges: Vec<(usize, i64)> = vec![];
        for block in &self.blocks {
            for &successor in &block.successor_labels {
                edges.push((self.index_of(successor), block.first_label()));
            }
        }
        for (index, predecessor) in edges {
            self.blocks[index].predecessor_labels.push(predecessor);
        }
        for block in &mut self.blocks {
            block.predecessor_labels.sort_unstable();
            block.predecessor_labels.dedup();
        }
    }

    /// The index of the block whose leader carries `label`. Panics when the
    /// label is not a leader; all graph traversals go through this map.
    pub fn index_of(&self, label: i64) -> usize {
        *self
            .block_index
            .get(&label)
            .unwrap_or_else(|| panic!("label {} is not a block leader", label))
    }

    /// Successor edges as block indices, for the dataflow solver.
    pub fn successor_indices(&self) -> Vec<Vec<usize>> {
        self.blocks
            .iter()
            .map(|block| {
                block
                    .successor_labels
                    .iter()
                    .map(|&label| self.index_of(label))
                    .collect()
            })
            .collect()
    }

    /// Predecessor edges as block indices, for the dataflow solver.
    pub fn predecessor_indices(&self) -> Vec<Vec<usize>> {
        self.blocks
            .iter()
            .map(|block| {
                block
                    .predecessor_labels
                    .iter()
                    .map(|&label| self.index_of(label))
                    .collect()
            })
            .collect()
    }

    /// Looks up an instruction by its label. Labels are contiguous across
    /// the function's blocks, so the owning block can be found by range.
    pub fn instruction(&self, label: i64) -> &Instruction {
        let position = self
            .blocks
            .partition_point(|block| block.first_label() <= label);
        assert!(position > 0, "label {} precedes function {}", label, self.id);
        let block = &self.blocks[position - 1];
        let offset = label - block.first_label();
        assert!(
            offset >= 0 && (offset as usize) < block.len(),
            "label {} is outside function {}",
            label,
            self.id
        );
        &block.instructions[offset as usize]
    }

    pub fn iter_instructions(&self) -> impl Iterator<Item = &Instruction> {
        self.blocks.iter().flat_map(|block| &block.instructions)
    }
}

fn constant_operand(instruction: &Instruction) -> i64 {
    match instruction.operands.first() {
        Some(&Operand::Constant(value)) => value,
        other => panic!(
            "instruction {} must carry a constant operand, found {:?}",
            instruction.label, other
        ),
    }
}

fn scan_local_variables(instructions: &[Instruction]) -> Vec<Variable> {
    let locals = instructions
        .iter()
        .flat_map(|i| &i.operands)
        .filter(|o| o.is_local())
        .filter_map(Variable::from_operand)
        .collect();
    // The frame grows down from FP, so the last local is bounded by zero.
    finalise_table(locals, 0)
}

fn scan_parameters(instructions: &[Instruction]) -> Vec<Variable> {
    let mut params: Vec<Variable> = instructions
        .iter()
        .flat_map(|i| &i.operands)
        .filter_map(|o| match o {
            Operand::Parameter { name, offset } => Some(Variable::new(name, *offset)),
            _ => None,
        })
        .collect();
    params.sort_by(|a, b| a.address.cmp(&b.address).then_with(|| a.name.cmp(&b.name)));
    params.dedup();
    // Parameters are one slot each; reversing yields declaration order.
    params.reverse();
    params
}

/// Marks every block leader: the function's first instruction, every branch
/// target, and the instruction after every branch or call. Branch targets
/// also record the branching instruction's label as a predecessor, which the
/// C backend later uses to decide which statements need a jump label.
fn scan_block_leaders(instructions: &mut [Instruction]) {
    let count = instructions.len();
    instructions[0].is_block_leader = true;
    for i in 0..count {
        if instructions[i].is_branch() {
            assert!(
                i + 1 < count,
                "a branch cannot be the last instruction of a function"
            );
            instructions[i + 1].is_block_leader = true;

            let target_label = instructions[i].branch_target();
            let own_label = instructions[i].label;
            let target = (target_label - own_label + i as i64) as usize;
            assert!(
                target < count && instructions[target].label == target_label,
                "branch {} targets label {} outside its function",
                own_label,
                target_label
            );
            instructions[target].is_block_leader = true;
            instructions[target].predecessor_labels.push(own_label);
        } else if instructions[i].opcode == Opcode::Call {
            // The function ends in ret, so a call is never last. Splitting
            // after the call keeps call-adjacent code separable for analysis.
            assert!(
                i + 1 < count,
                "a call cannot be the last instruction of a function"
            );
            instructions[i + 1].is_block_leader = true;
        }
    }
}

impl Display for Function {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        for block in &self.blocks {
            write!(f, "{}", block)?;
        }
        Ok(())
    }
}
