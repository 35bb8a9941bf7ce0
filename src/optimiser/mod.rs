//! The optimisation passes: constant propagation, dead-store elimination
//! and the peephole rewrites feeding them.

mod constant_propagation;
mod dataflow;
mod dead_store_elimination;
mod peephole;

use crate::cfg::Program;

/// Runs reaching-definitions constant propagation (interleaved with the
/// peephole rewrites) over every function, recording per-function counts
/// for reporting.
pub fn propagate_constants(program: &mut Program) {
    for function in &mut program.functions {
        function.constants_propagated = constant_propagation::run(function);
    }
}

/// Runs liveness-based dead-store elimination over every function,
/// recording per-function counts for reporting.
pub fn eliminate_dead_stores(program: &mut Program) {
    for function in &mut program.functions {
        function.statements_eliminated = dead_store_elimination::run(function);
    }
}
