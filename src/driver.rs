//! One-call analysis driver.
//!
//! Runs every register-granularity analysis over a validated function and
//! bundles the results with a stable instruction numbering, so callers (and
//! dumps) can refer to instructions as `%1`, `%2`, ... instead of raw
//! block/index pairs.

use rustc_hash::FxHashMap;
use serde_json::{json, Value};
use tracing::info;

use crate::dataflow::{Liveness, RdFact, ReachingDefs};
use crate::error::Result;
use crate::ir::{Function, InstrId, Reg};
use crate::target::TargetInfo;

/// A 1-based numbering of every instruction, in function order.
///
/// The numbering is dense: numbers run from 1 to the instruction count with
/// no gaps, so it doubles as a compact display name (`%n`).
#[derive(Debug, Clone)]
pub struct InstrNumbering {
    by_id: FxHashMap<InstrId, usize>,
    by_number: Vec<InstrId>,
}

impl InstrNumbering {
    /// Number the instructions of `func`.
    pub fn new(func: &Function) -> Self {
        let by_number: Vec<InstrId> = func.instr_ids().collect();
        let by_id = by_number
            .iter()
            .enumerate()
            .map(|(i, &id)| (id, i + 1))
            .collect();
        Self { by_id, by_number }
    }

    /// The number assigned to an instruction.
    pub fn number(&self, id: InstrId) -> Option<usize> {
        self.by_id.get(&id).copied()
    }

    /// The instruction carrying a given number.
    pub fn id(&self, number: usize) -> Option<InstrId> {
        number.checked_sub(1).and_then(|i| self.by_number.get(i)).copied()
    }

    /// Total number of numbered instructions.
    pub fn len(&self) -> usize {
        self.by_number.len()
    }

    /// Whether the function had no instructions at all.
    pub fn is_empty(&self) -> bool {
        self.by_number.is_empty()
    }
}

/// All register-granularity results for one function.
#[derive(Debug, Clone)]
pub struct FunctionAnalysis {
    /// Stable instruction numbering used by dumps and JSON output.
    pub numbering: InstrNumbering,
    /// Backward liveness results.
    pub liveness: Liveness,
    /// Forward reaching-definition results.
    pub reaching: ReachingDefs,
}

impl FunctionAnalysis {
    /// Validate `func` and run liveness and reaching definitions over it.
    ///
    /// # Errors
    ///
    /// Structural validation errors from [`Function::validate`]; the
    /// analyses themselves are total over valid input.
    pub fn run(func: &Function, target: &TargetInfo) -> Result<Self> {
        func.validate()?;
        let numbering = InstrNumbering::new(func);
        let liveness = Liveness::analyze(func, target);
        let reaching = ReachingDefs::analyze(func, target);
        info!(
            function = %func.name,
            blocks = func.blocks.len(),
            instrs = numbering.len(),
            "function analyzed"
        );
        Ok(Self { numbering, liveness, reaching })
    }

    /// Serialize the per-block results as JSON.
    ///
    /// Registers render via their display form and reaching facts as
    /// `"reg@%n"` strings using the instruction numbering, so the output is
    /// self-contained and stable across runs.
    pub fn to_json(&self, func: &Function) -> Value {
        let blocks: Vec<Value> = func
            .blocks
            .iter()
            .map(|bb| {
                json!({
                    "block": bb.id.to_string(),
                    "label": bb.label,
                    "live_before": sorted_regs(self.liveness.live_before(bb.id)),
                    "live_after": sorted_regs(self.liveness.live_after(bb.id)),
                    "reaching_before": self.sorted_facts(self.reaching.reaching_before(bb.id)),
                    "reaching_after": self.sorted_facts(self.reaching.reaching_after(bb.id)),
                })
            })
            .collect();
        json!({
            "function": func.name,
            "blocks": blocks,
        })
    }

    fn sorted_facts(&self, set: &crate::dataflow::FactSet<RdFact>) -> Vec<String> {
        let mut facts: Vec<RdFact> = set.iter().copied().collect();
        facts.sort();
        facts
            .into_iter()
            .map(|f| match self.numbering.number(f.def) {
                Some(n) => format!("{}@%{}", f.reg, n),
                None => f.to_string(),
            })
            .collect()
    }
}

fn sorted_regs(set: &crate::dataflow::FactSet<Reg>) -> Vec<String> {
    let mut regs: Vec<Reg> = set.iter().copied().collect();
    regs.sort();
    regs.into_iter().map(|r| r.to_string()).collect()
}
