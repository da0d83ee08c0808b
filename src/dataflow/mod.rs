//! Generic gen/kill dataflow framework.
//!
//! All analyses in this crate are instances of the same scheme: per block,
//! compute a local `gen` set (facts the block establishes) and a `kill` set
//! (facts it invalidates), then run a worklist to a fixed point over the CFG.
//!
//! # Data flow equations
//!
//! Backward (liveness-shaped):
//!
//! - `after[b]  = UNION(before[s])` for all successors `s`
//! - `before[b] = (after[b] - kill[b]) UNION gen[b]`
//!
//! Forward (reaching-definitions-shaped):
//!
//! - `before[b] = UNION(after[p])` for all predecessors `p`
//! - `after[b]  = (before[b] - kill[b]) UNION gen[b]`
//!
//! # Termination
//!
//! The fact universe per block is finite and the transfer functions are
//! monotone under set union, so before/after sets only ever grow and the
//! chaotic iteration reaches a fixed point. Growth is detected by strict
//! cardinality increase, which is exact given monotonicity.
//!
//! # Worklist policy
//!
//! Any processing order converges to the same fixed point; this solver uses
//! FIFO with a bitset membership guard so runs are deterministic.
//!
//! # Modules
//!
//! - [`liveness`]: backward liveness over register identifiers
//! - [`reaching_defs`]: forward reaching definitions over (register, def-site)
//!   pairs
//! - [`value_liveness`]: backward liveness over value identities (defining
//!   instructions), a third instantiation of the same solver

use std::collections::VecDeque;
use std::hash::Hash;

use fixedbitset::FixedBitSet;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::ir::{BlockId, Function, InstrId};

pub mod liveness;
pub mod reaching_defs;
pub mod value_liveness;

pub use liveness::Liveness;
pub use reaching_defs::{RdFact, ReachingDefs};
pub use value_liveness::ValueLiveness;

// =============================================================================
// Facts and fact sets
// =============================================================================

/// A dataflow fact. Equality and hashing must be structural; pointer or
/// allocation identity silently breaks set deduplication.
pub trait Fact: Clone + Eq + Hash {}

impl<T: Clone + Eq + Hash> Fact for T {}

/// A deduplicated, unordered collection of facts.
pub type FactSet<F> = FxHashSet<F>;

/// `(lhs - rhs) UNION gen`, the shared local transfer function.
fn transfer<F: Fact>(boundary: &FactSet<F>, kill: &FactSet<F>, gen: &FactSet<F>) -> FactSet<F> {
    let mut out: FactSet<F> = boundary.difference(kill).cloned().collect();
    out.extend(gen.iter().cloned());
    out
}

// =============================================================================
// Per-block inputs and outputs
// =============================================================================

/// Direction of an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Facts flow along CFG edges (reaching definitions).
    Forward,
    /// Facts flow against CFG edges (liveness).
    Backward,
}

/// Per-block gen/kill sets, indexed by [`BlockId`]. Computed once per
/// analysis and immutable thereafter.
#[derive(Debug, Clone)]
pub struct GenKill<F> {
    /// Facts each block establishes.
    pub gen: Vec<FactSet<F>>,
    /// Facts each block invalidates.
    pub kill: Vec<FactSet<F>>,
}

impl<F> GenKill<F> {
    /// Empty gen/kill sets for `n` blocks.
    pub fn with_blocks(n: usize) -> Self {
        Self {
            gen: (0..n).map(|_| FactSet::default()).collect(),
            kill: (0..n).map(|_| FactSet::default()).collect(),
        }
    }
}

/// Converged before/after fact sets per block, indexed by [`BlockId`].
#[derive(Debug, Clone)]
pub struct BlockFacts<F> {
    /// Facts holding at each block's entry.
    pub before: Vec<FactSet<F>>,
    /// Facts holding at each block's exit.
    pub after: Vec<FactSet<F>>,
    /// Number of worklist pops until convergence.
    pub iterations: usize,
}

impl<F: Fact> BlockFacts<F> {
    fn empty(n: usize) -> Self {
        Self {
            before: (0..n).map(|_| FactSet::default()).collect(),
            after: (0..n).map(|_| FactSet::default()).collect(),
            iterations: 0,
        }
    }
}

/// Before/after fact sets per instruction.
#[derive(Debug, Clone, Default)]
pub struct InstrFacts<F> {
    /// Facts holding immediately before each instruction.
    pub before: FxHashMap<InstrId, FactSet<F>>,
    /// Facts holding immediately after each instruction.
    pub after: FxHashMap<InstrId, FactSet<F>>,
}

impl<F> InstrFacts<F> {
    pub(crate) fn with_capacity(n: usize) -> Self {
        Self {
            before: FxHashMap::with_capacity_and_hasher(n, Default::default()),
            after: FxHashMap::with_capacity_and_hasher(n, Default::default()),
        }
    }
}

// =============================================================================
// Worklist solver
// =============================================================================

/// Run the worklist algorithm to a fixed point, starting from empty
/// before/after sets.
pub fn solve<F: Fact>(func: &Function, sets: &GenKill<F>, direction: Direction) -> BlockFacts<F> {
    solve_from(func, sets, direction, BlockFacts::empty(func.blocks.len()))
}

/// Run the worklist algorithm to a fixed point from a given starting state.
///
/// Passing a previously converged [`BlockFacts`] returns it unchanged (the
/// fixed point is idempotent); passing the empty state is equivalent to
/// [`solve`].
pub fn solve_from<F: Fact>(
    func: &Function,
    sets: &GenKill<F>,
    direction: Direction,
    mut facts: BlockFacts<F>,
) -> BlockFacts<F> {
    let n = func.blocks.len();

    // Seed with every block. FIFO queue, bitset guard against duplicates.
    let mut worklist: VecDeque<BlockId> = func.block_ids().collect();
    let mut queued = FixedBitSet::with_capacity(n);
    queued.insert_range(..);

    let mut iterations = 0usize;

    while let Some(block) = worklist.pop_front() {
        queued.set(block.0, false);
        iterations += 1;

        match direction {
            Direction::Backward => {
                // after[b] = UNION(before[s]) over successors
                let mut after: FactSet<F> = FactSet::default();
                for &succ in func.successors(block) {
                    after.extend(facts.before[succ.0].iter().cloned());
                }
                let before = transfer(&after, &sets.kill[block.0], &sets.gen[block.0]);
                facts.after[block.0] = after;
                // Sets only grow, so a larger cardinality is the change test.
                if before.len() > facts.before[block.0].len() {
                    facts.before[block.0] = before;
                    for &pred in func.predecessors(block) {
                        if !queued.contains(pred.0) {
                            queued.insert(pred.0);
                            worklist.push_back(pred);
                        }
                    }
                }
            }
            Direction::Forward => {
                // before[b] = UNION(after[p]) over predecessors
                let mut before: FactSet<F> = FactSet::default();
                for &pred in func.predecessors(block) {
                    before.extend(facts.after[pred.0].iter().cloned());
                }
                let after = transfer(&before, &sets.kill[block.0], &sets.gen[block.0]);
                facts.before[block.0] = before;
                if after.len() > facts.after[block.0].len() {
                    facts.after[block.0] = after;
                    for &succ in func.successors(block) {
                        if !queued.contains(succ.0) {
                            queued.insert(succ.0);
                            worklist.push_back(succ);
                        }
                    }
                }
            }
        }
    }

    debug!(
        function = %func.name,
        ?direction,
        blocks = n,
        iterations,
        "dataflow converged"
    );

    facts.iterations = iterations;
    facts
}
