//! Backward liveness analysis over registers.
//!
//! A register is live at a program point if some path from that point reaches
//! a use of the register with no intervening redefinition. Per block:
//!
//! - `gen`: upward-exposed uses, i.e. registers read before any write in the
//!   block
//! - `kill`: every register the block writes
//!
//! Both sets are closed under physical-register aliasing, so a write through
//! one name of an overlapping pair kills both and a read through one name
//! keeps both alive.

use crate::dataflow::{solve, BlockFacts, Direction, FactSet, GenKill, InstrFacts};
use crate::ir::{BasicBlock, BlockId, Function, InstrId, Reg};
use crate::target::TargetInfo;

/// Converged liveness facts at block and instruction granularity.
#[derive(Debug, Clone)]
pub struct Liveness {
    /// Per-block live-before / live-after sets.
    pub blocks: BlockFacts<Reg>,
    /// Per-instruction live-before / live-after sets.
    pub instrs: InstrFacts<Reg>,
}

impl Liveness {
    /// Run liveness to a fixed point over `func`.
    pub fn analyze(func: &Function, target: &TargetInfo) -> Self {
        let sets = gen_kill(func, target);
        let blocks = solve(func, &sets, Direction::Backward);
        let instrs = propagate_instrs(func, target, &blocks);
        Self { blocks, instrs }
    }

    /// Registers live on entry to a block.
    pub fn live_before(&self, block: BlockId) -> &FactSet<Reg> {
        &self.blocks.before[block.0]
    }

    /// Registers live on exit from a block.
    pub fn live_after(&self, block: BlockId) -> &FactSet<Reg> {
        &self.blocks.after[block.0]
    }

    /// Registers live immediately before an instruction.
    pub fn live_before_instr(&self, id: InstrId) -> &FactSet<Reg> {
        &self.instrs.before[&id]
    }

    /// Registers live immediately after an instruction.
    pub fn live_after_instr(&self, id: InstrId) -> &FactSet<Reg> {
        &self.instrs.after[&id]
    }

    /// Whether `reg` is live immediately after `id`. A def whose register is
    /// dead here is a candidate for removal.
    pub fn is_live_after(&self, id: InstrId, reg: Reg) -> bool {
        self.instrs.after[&id].contains(&reg)
    }
}

/// Per-block upward-exposed uses (gen) and written registers (kill), both
/// alias-closed.
fn gen_kill(func: &Function, target: &TargetInfo) -> GenKill<Reg> {
    let mut sets = GenKill::with_blocks(func.blocks.len());
    for bb in &func.blocks {
        let (gen, kill) = block_gen_kill(bb, target);
        sets.gen[bb.id.0] = gen;
        sets.kill[bb.id.0] = kill;
    }
    sets
}

fn block_gen_kill(bb: &BasicBlock, target: &TargetInfo) -> (FactSet<Reg>, FactSet<Reg>) {
    let mut gen = FactSet::default();
    let mut kill = FactSet::default();
    for instr in &bb.instrs {
        // Uses are checked against defs seen so far, so a use after an
        // in-block def (including a def of an alias) is not upward-exposed.
        for reg in instr.uses() {
            if !kill.contains(&reg) {
                target.expand_into(&mut gen, reg);
            }
        }
        for reg in instr.defs() {
            target.expand_into(&mut kill, reg);
        }
    }
    (gen, kill)
}

/// Replay each block backwards from its converged live-after set to obtain
/// per-instruction live sets.
fn propagate_instrs(
    func: &Function,
    target: &TargetInfo,
    blocks: &BlockFacts<Reg>,
) -> InstrFacts<Reg> {
    let mut facts = InstrFacts::with_capacity(func.instr_count());
    for bb in &func.blocks {
        let mut live = blocks.after[bb.id.0].clone();
        for (index, instr) in bb.instrs.iter().enumerate().rev() {
            let id = InstrId::new(bb.id, index);
            facts.after.insert(id, live.clone());
            let mut kill = FactSet::default();
            for reg in instr.defs() {
                target.expand_into(&mut kill, reg);
            }
            if !kill.is_empty() {
                live.retain(|r| !kill.contains(r));
            }
            for reg in instr.uses() {
                target.expand_into(&mut live, reg);
            }
            facts.before.insert(id, live.clone());
        }
    }
    facts
}
