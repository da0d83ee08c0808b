//! Forward reaching-definitions analysis.
//!
//! A definition `(reg, site)` reaches a program point if some path from the
//! site to the point writes `reg` nowhere in between. Facts are
//! register/def-site pairs compared structurally, so the same definition
//! discovered twice is one fact.
//!
//! The fact universe is built up front over the whole function: every def
//! operand contributes a fact for its register, and a def of a physical
//! register also contributes one fact per alias at the same site. Per block:
//!
//! - `gen`: facts defined in the block that survive to its end
//! - `kill`: every universe fact whose register the block writes
//!
//! Kill is drawn from the whole universe, not just the block, which is what
//! makes a def in one block obscure same-register defs from other blocks.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::dataflow::{solve, BlockFacts, Direction, FactSet, GenKill, InstrFacts};
use crate::ir::{Function, InstrId, Reg};
use crate::target::TargetInfo;

/// A single reaching definition: `reg` was written at `def`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RdFact {
    /// The register defined.
    pub reg: Reg,
    /// Where it was defined.
    pub def: InstrId,
}

impl RdFact {
    /// Create a fact.
    #[inline]
    pub fn new(reg: Reg, def: InstrId) -> Self {
        Self { reg, def }
    }
}

impl std::fmt::Display for RdFact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.reg, self.def)
    }
}

/// Converged reaching-definition facts at block and instruction granularity.
#[derive(Debug, Clone)]
pub struct ReachingDefs {
    /// Per-block reaching sets.
    pub blocks: BlockFacts<RdFact>,
    /// Per-instruction reaching sets.
    pub instrs: InstrFacts<RdFact>,
    /// The whole-function fact universe, indexed by register.
    universe: FxHashMap<Reg, FactSet<RdFact>>,
}

impl ReachingDefs {
    /// Run reaching definitions to a fixed point over `func`.
    pub fn analyze(func: &Function, target: &TargetInfo) -> Self {
        let universe = build_universe(func, target);
        let sets = gen_kill(func, target, &universe);
        let blocks = solve(func, &sets, Direction::Forward);
        let instrs = propagate_instrs(func, target, &universe, &blocks);
        Self { blocks, instrs, universe }
    }

    /// Facts reaching the entry of a block.
    pub fn reaching_before(&self, block: crate::ir::BlockId) -> &FactSet<RdFact> {
        &self.blocks.before[block.0]
    }

    /// Facts reaching the exit of a block.
    pub fn reaching_after(&self, block: crate::ir::BlockId) -> &FactSet<RdFact> {
        &self.blocks.after[block.0]
    }

    /// Facts reaching the point immediately before an instruction.
    pub fn reaching_before_instr(&self, id: InstrId) -> &FactSet<RdFact> {
        &self.instrs.before[&id]
    }

    /// Facts reaching the point immediately after an instruction.
    pub fn reaching_after_instr(&self, id: InstrId) -> &FactSet<RdFact> {
        &self.instrs.after[&id]
    }

    /// Definition sites of `reg` that reach the point before `id`. The
    /// classic use-def query: a use with exactly one reaching def is a
    /// forwarding candidate.
    pub fn defs_reaching(&self, id: InstrId, reg: Reg) -> impl Iterator<Item = InstrId> + '_ {
        self.instrs.before[&id]
            .iter()
            .filter(move |f| f.reg == reg)
            .map(|f| f.def)
    }

    /// Every definition site of `reg` anywhere in the function.
    pub fn all_defs_of(&self, reg: Reg) -> &FactSet<RdFact> {
        static EMPTY: once_cell::sync::Lazy<FactSet<RdFact>> =
            once_cell::sync::Lazy::new(FactSet::default);
        self.universe.get(&reg).unwrap_or(&EMPTY)
    }
}

/// Enumerate every fact the function can ever generate, grouped by register.
/// A def of a physical register yields an additional fact per alias at the
/// same site.
fn build_universe(func: &Function, target: &TargetInfo) -> FxHashMap<Reg, FactSet<RdFact>> {
    let mut universe: FxHashMap<Reg, FactSet<RdFact>> = FxHashMap::default();
    for bb in &func.blocks {
        for (index, instr) in bb.instrs.iter().enumerate() {
            let site = InstrId::new(bb.id, index);
            for reg in instr.defs() {
                for touched in target.expand(reg) {
                    universe
                        .entry(touched)
                        .or_default()
                        .insert(RdFact::new(touched, site));
                }
            }
        }
    }
    universe
}

fn gen_kill(
    func: &Function,
    target: &TargetInfo,
    universe: &FxHashMap<Reg, FactSet<RdFact>>,
) -> GenKill<RdFact> {
    let mut sets: GenKill<RdFact> = GenKill::with_blocks(func.blocks.len());
    for bb in &func.blocks {
        let gen = &mut sets.gen[bb.id.0];
        let kill = &mut sets.kill[bb.id.0];
        for (index, instr) in bb.instrs.iter().enumerate() {
            let site = InstrId::new(bb.id, index);
            for reg in instr.defs() {
                for touched in target.expand(reg) {
                    // A later def of the same register obscures facts the
                    // block generated earlier.
                    gen.retain(|f| f.reg != touched);
                    gen.insert(RdFact::new(touched, site));
                    if let Some(facts) = universe.get(&touched) {
                        kill.extend(facts.iter().copied());
                    }
                }
            }
        }
    }
    sets
}

/// Replay each block forwards from its converged reaching-before set to
/// obtain per-instruction reaching sets.
fn propagate_instrs(
    func: &Function,
    target: &TargetInfo,
    universe: &FxHashMap<Reg, FactSet<RdFact>>,
    blocks: &BlockFacts<RdFact>,
) -> InstrFacts<RdFact> {
    let mut facts = InstrFacts::with_capacity(func.instr_count());
    for bb in &func.blocks {
        let mut reaching = blocks.before[bb.id.0].clone();
        for (index, instr) in bb.instrs.iter().enumerate() {
            let id = InstrId::new(bb.id, index);
            facts.before.insert(id, reaching.clone());
            // Instructions that define nothing pass their input through.
            if instr.defs().next().is_some() {
                for reg in instr.defs() {
                    for touched in target.expand(reg) {
                        if let Some(killed) = universe.get(&touched) {
                            reaching.retain(|f| !killed.contains(f));
                        }
                        reaching.insert(RdFact::new(touched, id));
                    }
                }
            }
            facts.after.insert(id, reaching.clone());
        }
    }
    facts
}
