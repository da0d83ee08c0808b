//! Backward liveness over value identities.
//!
//! Instead of asking which register names are live, this instantiation asks
//! which *values* are live, where a value is identified by the instruction
//! that defines it. Facts are [`InstrId`]s. The analysis requires single-def
//! form: every virtual register has at most one definition site, so register
//! and value are interchangeable and the def-site map is a bijection.
//!
//! Per block:
//!
//! - `gen`: values used in the block whose defining instruction is not
//!   earlier in the same block
//! - `kill`: every instruction of the block (a block kills exactly the
//!   values it creates, and only its own instructions can create values
//!   inside it)
//!
//! Physical registers carry no value identity and are ignored here; register
//! liveness covers them.

use rustc_hash::FxHashMap;

use crate::dataflow::{solve, BlockFacts, Direction, FactSet, GenKill, InstrFacts};
use crate::error::{FlowError, Result};
use crate::ir::{BlockId, Function, InstrId, Reg};

/// Converged value-liveness facts at block and instruction granularity.
#[derive(Debug, Clone)]
pub struct ValueLiveness {
    /// Per-block live-before / live-after value sets.
    pub blocks: BlockFacts<InstrId>,
    /// Per-instruction live-before / live-after value sets.
    pub instrs: InstrFacts<InstrId>,
    /// Definition site of each virtual register.
    def_sites: FxHashMap<Reg, InstrId>,
}

impl ValueLiveness {
    /// Run value liveness to a fixed point over `func`.
    ///
    /// # Errors
    ///
    /// [`FlowError::MultipleDefinitions`] if any virtual register is defined
    /// at more than one site; value identity is then ambiguous.
    pub fn analyze(func: &Function) -> Result<Self> {
        let def_sites = collect_def_sites(func)?;
        let sets = gen_kill(func, &def_sites);
        let blocks = solve(func, &sets, Direction::Backward);
        let instrs = propagate_instrs(func, &def_sites, &blocks);
        Ok(Self { blocks, instrs, def_sites })
    }

    /// Values live on entry to a block.
    pub fn live_before(&self, block: BlockId) -> &FactSet<InstrId> {
        &self.blocks.before[block.0]
    }

    /// Values live on exit from a block.
    pub fn live_after(&self, block: BlockId) -> &FactSet<InstrId> {
        &self.blocks.after[block.0]
    }

    /// Values live immediately before an instruction.
    pub fn live_before_instr(&self, id: InstrId) -> &FactSet<InstrId> {
        &self.instrs.before[&id]
    }

    /// Values live immediately after an instruction.
    pub fn live_after_instr(&self, id: InstrId) -> &FactSet<InstrId> {
        &self.instrs.after[&id]
    }

    /// The single definition site of a virtual register, if it has one.
    pub fn def_site(&self, reg: Reg) -> Option<InstrId> {
        self.def_sites.get(&reg).copied()
    }

    /// Whether the value produced by `def` is live across the exit of
    /// `block`.
    pub fn value_live_after(&self, block: BlockId, def: InstrId) -> bool {
        self.blocks.after[block.0].contains(&def)
    }
}

/// Map each virtual register to its unique definition site.
fn collect_def_sites(func: &Function) -> Result<FxHashMap<Reg, InstrId>> {
    let mut sites: FxHashMap<Reg, InstrId> = FxHashMap::default();
    for bb in &func.blocks {
        for (index, instr) in bb.instrs.iter().enumerate() {
            let site = InstrId::new(bb.id, index);
            for reg in instr.defs().filter(|r| r.is_virtual()) {
                if let Some(&first) = sites.get(&reg) {
                    return Err(FlowError::MultipleDefinitions { reg, first, second: site });
                }
                sites.insert(reg, site);
            }
        }
    }
    Ok(sites)
}

fn gen_kill(func: &Function, def_sites: &FxHashMap<Reg, InstrId>) -> GenKill<InstrId> {
    let mut sets = GenKill::with_blocks(func.blocks.len());
    for bb in &func.blocks {
        let gen = &mut sets.gen[bb.id.0];
        let kill = &mut sets.kill[bb.id.0];
        for (index, instr) in bb.instrs.iter().enumerate() {
            for reg in instr.uses().filter(|r| r.is_virtual()) {
                // Uses of registers with no definition site (arguments,
                // undefined inputs) have no value identity and are skipped.
                if let Some(&site) = def_sites.get(&reg) {
                    let defined_above = site.block == bb.id && site.index < index;
                    if !defined_above {
                        gen.insert(site);
                    }
                }
            }
            kill.insert(InstrId::new(bb.id, index));
        }
    }
    sets
}

/// Replay each block backwards from its converged live-after set. Per
/// instruction the kill is the instruction's own value and the gen is the
/// values it reads.
fn propagate_instrs(
    func: &Function,
    def_sites: &FxHashMap<Reg, InstrId>,
    blocks: &BlockFacts<InstrId>,
) -> InstrFacts<InstrId> {
    let mut facts = InstrFacts::with_capacity(func.instr_count());
    for bb in &func.blocks {
        let mut live = blocks.after[bb.id.0].clone();
        for (index, instr) in bb.instrs.iter().enumerate().rev() {
            let id = InstrId::new(bb.id, index);
            facts.after.insert(id, live.clone());
            live.remove(&id);
            for reg in instr.uses().filter(|r| r.is_virtual()) {
                if let Some(&site) = def_sites.get(&reg) {
                    live.insert(site);
                }
            }
            facts.before.insert(id, live.clone());
        }
    }
    facts
}
