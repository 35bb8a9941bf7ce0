//! A generic worklist solver for iterative dataflow analyses.
//!
//! Both analyses in this crate are monotone set problems over a finite
//! universe (definition labels, live places), so one solver covers them:
//! the merge operator is set union, and the caller supplies the direction
//! and the per-block transfer function.

use std::collections::{HashSet, VecDeque};
use std::hash::Hash;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Converged per-block sets. For a forward problem `merged` holds the IN
/// sets and `transferred` the OUT sets; for a backward problem `merged`
/// holds the OUT sets and `transferred` the IN sets.
#[derive(Debug)]
pub struct Solution<T> {
    pub merged: Vec<HashSet<T>>,
    pub transferred: Vec<HashSet<T>>,
}

/// Runs the transfer function to a fixed point over the given edges.
///
/// Every block starts on a FIFO worklist; whenever a block's transferred
/// set changes, its downstream neighbours (successors when forward,
/// predecessors when backward) are re-enqueued, deduplicated. Iteration
/// order affects only the number of rounds, never the result.
pub fn solve<T, F>(
    successors: &[Vec<usize>],
    predecessors: &[Vec<usize>],
    direction: Direction,
    mut transfer: F,
) -> Solution<T>
where
    T: Clone + Eq + Hash,
    F: FnMut(usize, &HashSet<T>) -> HashSet<T>,
{
    assert_eq!(successors.len(), predecessors.len());
    let count = successors.len();
    let (upstream, downstream) = match direction {
        Direction::Forward => (predecessors, successors),
        Direction::Backward => (successors, predecessors),
    };

    let mut merged: Vec<HashSet<T>> = vec![HashSet::new(); count];
    let mut transferred: Vec<HashSet<T>> = vec![HashSet::new(); count];
    let mut worklist: VecDeque<usize> = (0..count).collect();
    let mut queued = vec![true; count];

    while let Some(block) = worklist.pop_front() {
        queued[block] = false;

        let mut incoming = HashSet::new();
        for &neighbour in &upstream[block] {
            incoming.extend(transferred[neighbour].iter().cloned());
        }
        let outgoing = transfer(block, &incoming);
        merged[block] = incoming;

        if outgoing != transferred[block] {
            transferred[block] = outgoing;
            for &neighbour in &downstream[block] {
                if !queued[neighbour] {
                    queued[neighbour] = true;
                    worklist.push_back(neighbour);
                }
            }
        }
    }

    Solution {
        merged,
        transferred,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // A diamond with a back edge:
    //      0
    //     / \
    //    1   2
    //     \ /
    //      3 -> 1
    fn diamond() -> (Vec<Vec<usize>>, Vec<Vec<usize>>) {
        let successors = vec![vec![1, 2], vec![3], vec![3], vec![1]];
        let predecessors = vec![vec![], vec![0, 3], vec![0], vec![1, 2]];
        (successors, predecessors)
    }

    fn gen_kill_transfer<'s>(
        gen: &'s [Vec<u32>],
        kill: &'s [Vec<u32>],
    ) -> impl FnMut(usize, &HashSet<u32>) -> HashSet<u32> + 's {
        move |block, incoming| {
            let mut out: HashSet<u32> = incoming
                .iter()
                .copied()
                .filter(|fact| !kill[block].contains(fact))
                .collect();
            out.extend(gen[block].iter().copied());
            out
        }
    }

    #[test]
    fn forward_reaches_a_fixed_point_through_the_loop() {
        let (successors, predecessors) = diamond();
        // Fact 0 born in block 0 and killed in block 2; fact 1 born in 1.
        let gen = vec![vec![0], vec![1], vec![], vec![]];
        let kill = vec![vec![], vec![], vec![0], vec![]];

        let solution = solve(
            &successors,
            &predecessors,
            Direction::Forward,
            gen_kill_transfer(&gen, &kill),
        );

        // Block 1 sees fact 0 from block 0 and fact 1 along the back edge;
        // block 2 kills the only fact reaching it.
        assert_eq!(HashSet::from([0, 1]), solution.merged[1]);
        assert_eq!(HashSet::new(), solution.transferred[2]);
        assert_eq!(HashSet::from([0, 1]), solution.merged[3]);
    }

    #[test]
    fn converged_solution_is_idempotent() {
        let (successors, predecessors) = diamond();
        let gen = vec![vec![0], vec![1], vec![], vec![2]];
        let kill = vec![vec![], vec![0], vec![], vec![1]];

        let solution = solve(
            &successors,
            &predecessors,
            Direction::Forward,
            gen_kill_transfer(&gen, &kill),
        );

        let mut transfer = gen_kill_transfer(&gen, &kill);
        for block in 0..successors.len() {
            let mut merged: HashSet<u32> = HashSet::new();
            for &pred in &predecessors[block] {
                merged.extend(solution.transferred[pred].iter().copied());
            }
            assert_eq!(solution.merged[block], merged);
            assert_eq!(solution.transferred[block], transfer(block, &merged));
        }
    }

    #[test]
    fn backward_propagates_against_the_edges() {
        let (successors, predecessors) = diamond();
        // A fact used in block 3 and killed in block 2, liveness-style.
        let gen = vec![vec![], vec![], vec![], vec![7]];
        let kill = vec![vec![], vec![], vec![7], vec![]];

        let solution = solve(
            &successors,
            &predecessors,
            Direction::Backward,
            gen_kill_transfer(&gen, &kill),
        );

        // Live into blocks 1 and 3, but block 2 cuts it off.
        assert_eq!(HashSet::from([7]), solution.transferred[1]);
        assert_eq!(HashSet::from([7]), solution.transferred[3]);
        assert_eq!(HashSet::new(), solution.transferred[2]);
        // Out of block 0, the fact is live along the path through block 1.
        assert_eq!(HashSet::from([7]), solution.merged[0]);
    }
}
