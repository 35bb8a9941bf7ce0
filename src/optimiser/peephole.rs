//! Local pattern rewrites. Neither rewrite needs global analysis, but both
//! are interleaved with constant propagation: collapsing an address
//! computation turns a load into an `assign` the reaching-definitions pass
//! can track, and folding an instruction with constant operands creates a
//! new constant definition for it to propagate.

use log::trace;

use crate::cfg::BasicBlock;
use crate::ir::{Instruction, Opcode, Operand};

/// Collapses `add <x>_base#<k> GP|FP` followed by a load or store through
/// the freshly computed address into a direct named-variable access:
///
/// ```text
/// instr 70: add max_base#32728 GP        instr 70: nop
/// instr 71: load (70)                -->  instr 71: assign max#32728
///
/// instr 68: add maxi_base#32744 GP        instr 68: nop
/// instr 69: store (67) (68)          -->  instr 69: move maxi#32744 (67)
/// ```
pub fn collapse_addresses(block: &mut BasicBlock) -> usize {
    let mut collapsed = 0;
    for i in 1..block.instructions.len() {
        let (head, tail) = block.instructions.split_at_mut(i);
        let address = &mut head[i - 1];
        let access = &mut tail[0];

        if address.opcode != Opcode::Add
            || !matches!(address.operands.get(1), Some(Operand::Gp | Operand::Fp))
        {
            continue;
        }
        let variable = match &address.operands[0] {
            Operand::GlobalAddress { name, offset } => Operand::GlobalVariable {
                name: name.clone(),
                offset: *offset,
            },
            Operand::LocalAddress { name, offset } => Operand::LocalVariable {
                name: name.clone(),
                offset: *offset,
            },
            _ => continue,
        };
        let address_label = address.label;
        let through_address = |operand: &Operand| *operand == Operand::Register(address_label);

        match access.opcode {
            Opcode::Load if through_address(&access.operands[0]) => {
                access.opcode = Opcode::Assign;
                access.operands = vec![variable];
            }
            Opcode::Store if through_address(&access.operands[1]) => {
                let value = access.operands[0].clone();
                access.opcode = Opcode::Move;
                access.operands = vec![variable, value];
            }
            _ => continue,
        }
        trace!("collapsed address computation {}", address.label);
        address.to_nop();
        collapsed += 1;
    }
    collapsed
}

/// Folds a binary arithmetic or compare instruction with two constant
/// operands into an `assign` of the result. Division by zero is left alone
/// (the input program gets to fail at runtime instead of folding time);
/// `mod` and `neg` are never folded.
pub fn fold_constants(block: &mut BasicBlock) -> usize {
    let mut folded = 0;
    for instruction in &mut block.instructions {
        if fold_instruction(instruction) {
            folded += 1;
        }
    }
    folded
}

fn fold_instruction(instruction: &mut Instruction) -> bool {
    let (lhs, rhs) = match instruction.operands.as_slice() {
        [Operand::Constant(lhs), Operand::Constant(rhs)] => (*lhs, *rhs),
        _ => return false,
    };
    let value = match instruction.opcode {
        Opcode::Add => lhs.wrapping_add(rhs),
        Opcode::Sub => lhs.wrapping_sub(rhs),
        Opcode::Mul => lhs.wrapping_mul(rhs),
        Opcode::Div if rhs != 0 => lhs.wrapping_div(rhs),
        Opcode::CmpEq => (lhs == rhs) as i64,
        Opcode::CmpLe => (lhs <= rhs) as i64,
        Opcode::CmpLt => (lhs < rhs) as i64,
        _ => return false,
    };
    trace!("folded instruction {} to {}", instruction.label, value);
    instruction.opcode = Opcode::Assign;
    instruction.operands = vec![Operand::Constant(value)];
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir;

    fn block(source: &str) -> BasicBlock {
        BasicBlock::new(ir::parse(source).unwrap())
    }

    fn rendered(block: &BasicBlock) -> Vec<String> {
        block.instructions.iter().map(|i| i.to_string()).collect()
    }

    #[test]
    fn collapses_global_load() {
        let mut block = block("instr 70: add max_base#32728 GP\ninstr 71: load (70)");
        assert_eq!(1, collapse_addresses(&mut block));
        assert_eq!(
            vec!["instr 70: nop", "instr 71: assign max#32728"],
            rendered(&block)
        );
    }

    #[test]
    fn collapses_store_into_move() {
        let mut block = block(
            "instr 67: add 1 2\ninstr 68: add maxi_base#32744 GP\ninstr 69: store (67) (68)",
        );
        assert_eq!(1, collapse_addresses(&mut block));
        assert_eq!(
            vec![
                "instr 67: add 1 2",
                "instr 68: nop",
                "instr 69: move maxi#32744 (67)"
            ],
            rendered(&block)
        );
    }

    #[test]
    fn collapses_frame_relative_addresses() {
        let mut block = block("instr 30: add buf_base#-64 FP\ninstr 31: load (30)");
        assert_eq!(1, collapse_addresses(&mut block));
        assert_eq!(
            vec!["instr 30: nop", "instr 31: assign buf#-64"],
            rendered(&block)
        );
    }

    #[test]
    fn load_through_another_register_is_left_alone() {
        let mut block = block("instr 70: add max_base#32728 GP\ninstr 71: load (12)");
        assert_eq!(0, collapse_addresses(&mut block));
    }

    #[test]
    fn folds_arithmetic_and_compares() {
        let mut block = block("instr 4: add 2 3\ninstr 5: cmplt 2 3\ninstr 6: sub (4) 3");
        assert_eq!(2, fold_constants(&mut block));
        assert_eq!(
            vec!["instr 4: assign 5", "instr 5: assign 1", "instr 6: sub (4) 3"],
            rendered(&block)
        );
    }

    #[test]
    fn division_folds_towards_zero() {
        let mut block = block("instr 4: div -7 2");
        fold_constants(&mut block);
        assert_eq!(vec!["instr 4: assign -3"], rendered(&block));
    }

    #[test]
    fn division_by_zero_is_not_folded() {
        let mut block = block("instr 4: div 7 0");
        assert_eq!(0, fold_constants(&mut block));
    }

    #[test]
    fn modulo_is_not_folded() {
        let mut block = block("instr 4: mod 7 2");
        assert_eq!(0, fold_constants(&mut block));
    }
}
