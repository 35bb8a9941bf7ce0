//! Reaching-definitions based constant propagation.

use std::collections::{HashMap, HashSet};

use log::{debug, trace};

use crate::cfg::Function;
use crate::ir::{place_of, Opcode, Operand, Place};

use super::{
    dataflow::{self, Direction},
    peephole,
};

/// Runs constant propagation on one function, interleaved with the peephole
/// rewrites, until a full round propagates nothing new. Returns the total
/// number of operands rewritten to constants.
pub fn run(function: &mut Function) -> usize {
    let mut total = 0;
    loop {
        for block in &mut function.blocks {
            peephole::collapse_addresses(block);
            peephole::fold_constants(block);
        }
        let propagated = propagate_once(function);
        total += propagated;
        if propagated == 0 {
            break;
        }
    }
    debug!("function {}: {} constants propagated", function.id, total);
    total
}

/// One full reaching-definitions round: solve to a fixed point, then rewrite
/// every arithmetic/compare operand whose reaching value is a single known
/// constant.
fn propagate_once(function: &mut Function) -> usize {
    let universe = DefUniverse::scan(function);
    let gen = universe.gen_sets(function);
    let kill = universe.kill_sets(function);
    let global = universe.global_sets(function);

    let successors = function.successor_indices();
    let predecessors = function.predecessor_indices();
    let solution = dataflow::solve(&successors, &predecessors, Direction::Forward, |block, input| {
        // OUT = (GEN − GLOBAL) ∪ (IN − KILL)
        let mut out: HashSet<i64> = gen[block].difference(&global[block]).copied().collect();
        out.extend(input.difference(&kill[block]).copied());
        out
    });

    // Seed each block's constant environment from its converged IN set
    // before touching any instruction, since rewriting needs the blocks
    // mutably.
    let environments: Vec<HashMap<Place, Option<i64>>> = solution
        .merged
        .iter()
        .map(|reaching| seed_environment(function, reaching))
        .collect();

    let mut propagated = 0;
    for (block, mut constants) in function.blocks.iter_mut().zip(environments) {
        for instruction in &mut block.instructions {
            if instruction.is_arithmetic() {
                let label = instruction.label;
                for operand in instruction.used_operands_mut() {
                    let place = match place_of(operand) {
                        Some(place) => place,
                        None => continue,
                    };
                    if let Some(&Some(value)) = constants.get(&place) {
                        trace!("instruction {}: {} becomes constant {}", label, operand, value);
                        *operand = Operand::Constant(value);
                        propagated += 1;
                    }
                }
            }
            // A constant definition overwrites the binding; any other
            // definition makes the place unknown.
            if let Some(place) = instruction.def() {
                constants.insert(place, instruction.constant_value());
            }
        }
    }
    propagated
}

/// A variable is known at block entry only when every reaching definition
/// assigns it the same constant.
fn seed_environment(
    function: &Function,
    reaching: &HashSet<i64>,
) -> HashMap<Place, Option<i64>> {
    let mut constants: HashMap<Place, Option<i64>> = HashMap::new();
    for &label in reaching {
        let instruction = function.instruction(label);
        let place = instruction
            .def()
            .expect("a reaching-definition label must denote a definition");
        let value = instruction.constant_value();
        constants
            .entry(place)
            .and_modify(|known| {
                if *known != value {
                    *known = None;
                }
            })
            .or_insert(value);
    }
    constants
}

/// The function-wide map from each place to the labels defining it, used to
/// build KILL sets.
struct DefUniverse {
    defs_of: HashMap<Place, Vec<i64>>,
}

impl DefUniverse {
    fn scan(function: &Function) -> Self {
        let mut defs_of: HashMap<Place, Vec<i64>> = HashMap::new();
        for instruction in function.iter_instructions() {
            if let Some(place) = instruction.def() {
                defs_of.entry(place).or_default().push(instruction.label);
            }
        }
        Self { defs_of }
    }

    /// GEN: labels of the definitions each block produces.
    fn gen_sets(&self, function: &Function) -> Vec<HashSet<i64>> {
        function
            .blocks
            .iter()
            .map(|block| {
                block
                    .instructions
                    .iter()
                    .filter(|i| i.is_def())
                    .map(|i| i.label)
                    .collect()
            })
            .collect()
    }

    /// KILL: for each definition in the block, every *other* label in the
    /// function defining the same place.
    fn kill_sets(&self, function: &Function) -> Vec<HashSet<i64>> {
        function
            .blocks
            .iter()
            .map(|block| {
                let mut kill = HashSet::new();
                for instruction in &block.instructions {
                    if let Some(place) = instruction.def() {
                        kill.extend(
                            self.defs_of[&place]
                                .iter()
                                .copied()
                                .filter(|&label| label != instruction.label),
                        );
                    }
                }
                kill
            })
            .collect()
    }

    /// GLOBAL: definitions of named globals in blocks ending in a call. A
    /// callee may overwrite any global, so such definitions must not survive
    /// past the call. This is a conservative approximation of call side
    /// effects; deeper aliasing through pointers is not modelled.
    fn global_sets(&self, function: &Function) -> Vec<HashSet<i64>> {
        function
            .blocks
            .iter()
            .map(|block| {
                if !block.ends_in_call() {
                    return HashSet::new();
                }
                block
                    .instructions
                    .iter()
                    .filter(|i| {
                        i.opcode == Opcode::Move
                            && matches!(i.operands[0], Operand::GlobalVariable { .. })
                    })
                    .map(|i| i.label)
                    .collect()
            })
            .collect()
    }
}
