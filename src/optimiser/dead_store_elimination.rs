//! Liveness-based dead-store elimination.

use std::collections::HashSet;

use log::{debug, trace};

use crate::cfg::Function;
use crate::ir::{place_of, Operand, Place};

use super::dataflow::{self, Direction};

/// Nops out every instruction whose defined place is dead, per a backward
/// liveness analysis. Only frame-private scalars (local variables,
/// parameters, virtual registers) are candidates; globals, stores through
/// pointers and address-taken locals survive unconditionally. Returns the
/// number of statements eliminated.
pub fn run(function: &mut Function) -> usize {
    let aliased = address_taken_locals(function);
    let (uses, defs) = use_def_sets(function, &aliased);

    let successors = function.successor_indices();
    let predecessors = function.predecessor_indices();
    // IN = USE ∪ (OUT − DEF), with OUT = ∪ IN(successors).
    let solution = dataflow::solve(&successors, &predecessors, Direction::Backward, |block, out| {
        let mut live: HashSet<Place> = out.difference(&defs[block]).cloned().collect();
        live.extend(uses[block].iter().cloned());
        live
    });

    let mut eliminated = 0;
    for (block, out) in function.blocks.iter_mut().zip(solution.merged) {
        let mut live = out;
        for instruction in block.instructions.iter_mut().rev() {
            if let Some(def) = instruction.def_for_liveness() {
                if !aliased.contains(&def) {
                    if !live.contains(&def) {
                        trace!("instruction {} is a dead store", instruction.label);
                        instruction.to_nop();
                        eliminated += 1;
                        continue;
                    }
                    live.remove(&def);
                }
            }
            live.extend(instruction.uses_for_liveness());
        }
    }
    debug!("function {}: {} statements eliminated", function.id, eliminated);
    eliminated
}

/// Locals whose address is taken anywhere in the function. A store the
/// peephole collapsed into a named move can still be read back through an
/// uncollapsed pointer that never mentions the name, so writes to these
/// locals are not elimination candidates.
fn address_taken_locals(function: &Function) -> HashSet<Place> {
    function
        .iter_instructions()
        .flat_map(|i| &i.operands)
        .filter_map(|operand| match operand {
            Operand::LocalAddress { name, offset } => place_of(&Operand::LocalVariable {
                name: name.clone(),
                offset: *offset,
            }),
            _ => None,
        })
        .collect()
}

/// Per-block USE (places read before any local write) and DEF (places
/// written without a prior local read).
fn use_def_sets(
    function: &Function,
    aliased: &HashSet<Place>,
) -> (Vec<HashSet<Place>>, Vec<HashSet<Place>>) {
    let mut uses = vec![];
    let mut defs = vec![];
    for block in &function.blocks {
        let mut use_set: HashSet<Place> = HashSet::new();
        let mut def_set: HashSet<Place> = HashSet::new();
        for instruction in &block.instructions {
            for used in instruction.uses_for_liveness() {
                if !def_set.contains(&used) {
                    use_set.insert(used);
                }
            }
            if let Some(defined) = instruction.def_for_liveness() {
                if !aliased.contains(&defined) && !use_set.contains(&defined) {
                    def_set.insert(defined);
                }
            }
        }
        uses.push(use_set);
        defs.push(def_set);
    }
    (uses, defs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{self, Opcode};

    fn function(source: &str) -> Function {
        Function::new(ir::parse(source).unwrap(), false)
    }

    fn opcodes(function: &Function) -> Vec<Opcode> {
        function.iter_instructions().map(|i| i.opcode).collect()
    }

    #[test]
    fn used_store_survives() {
        let mut function = function(
            "instr 2: enter 8
             instr 3: move a#24 0
             instr 4: write a#24
             instr 5: ret 0",
        );
        assert_eq!(0, run(&mut function));
        assert_eq!(
            vec![Opcode::Enter, Opcode::Move, Opcode::Write, Opcode::Ret],
            opcodes(&function)
        );
    }

    #[test]
    fn unread_definitions_become_nops() {
        // Nothing ever reads a#24 or register 4.
        let mut function = function(
            "instr 2: enter 8
             instr 3: move a#24 5
             instr 4: add a#24 3
             instr 5: ret 0",
        );
        assert_eq!(2, run(&mut function));
        assert_eq!(
            vec![Opcode::Enter, Opcode::Nop, Opcode::Nop, Opcode::Ret],
            opcodes(&function)
        );
    }

    #[test]
    fn elimination_cascades_within_a_block() {
        // Register 4 feeds only the dead store to i#-8, so both go.
        let mut function = function(
            "instr 2: enter 8
             instr 3: move j#-16 7
             instr 4: add j#-16 1
             instr 5: move i#-8 (4)
             instr 6: write j#-16
             instr 7: ret 0",
        );
        assert_eq!(2, run(&mut function));
        assert_eq!(
            vec![
                Opcode::Enter,
                Opcode::Move,
                Opcode::Nop,
                Opcode::Nop,
                Opcode::Write,
                Opcode::Ret
            ],
            opcodes(&function)
        );
    }

    #[test]
    fn liveness_crosses_block_boundaries() {
        // i#-8 is defined before the branch and read only in the branch
        // target block, so the definition must survive.
        let mut function = function(
            "instr 2: enter 8
             instr 3: move i#-8 1
             instr 4: blbs p#24 [6]
             instr 5: move i#-8 2
             instr 6: write i#-8
             instr 7: ret 0",
        );
        assert_eq!(0, run(&mut function));
        assert_eq!(Opcode::Move, function.instruction(3).opcode);
        assert_eq!(Opcode::Move, function.instruction(5).opcode);
    }

    #[test]
    fn loop_carried_use_keeps_the_definition_alive() {
        let mut function = function(
            "instr 2: enter 8
             instr 3: move i#-8 0
             instr 4: add i#-8 1
             instr 5: move i#-8 (4)
             instr 6: cmplt i#-8 10
             instr 7: blbs (6) [4]
             instr 8: ret 0",
        );
        assert_eq!(0, run(&mut function));
        assert_eq!(Opcode::Move, function.instruction(5).opcode);
    }

    #[test]
    fn address_taken_local_is_never_eliminated() {
        // buf#-64 is written by name (the collapsed form of a store) but
        // read back only through a pointer, so the write must survive.
        let mut function = function(
            "instr 2: enter 64
             instr 3: move buf#-64 7
             instr 4: add buf_base#-64 FP
             instr 5: add (4) 0
             instr 6: load (5)
             instr 7: write (6)
             instr 8: ret 0",
        );
        assert_eq!(0, run(&mut function));
        assert_eq!(Opcode::Move, function.instruction(3).opcode);
    }

    #[test]
    fn global_stores_are_never_eliminated() {
        let mut function = function(
            "instr 2: enter 0
             instr 3: add g_base#32760 GP
             instr 4: store 1 (3)
             instr 5: ret 0",
        );
        assert_eq!(0, run(&mut function));
        assert_eq!(Opcode::Store, function.instruction(4).opcode);
    }

    #[test]
    fn read_keeps_its_side_effect() {
        // The read's result is dead, but the input must still be consumed.
        let mut function = function(
            "instr 2: enter 8
             instr 3: read
             instr 4: ret 0",
        );
        assert_eq!(0, run(&mut function));
        assert_eq!(Opcode::Read, function.instruction(3).opcode);
    }
}
