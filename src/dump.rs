//! Human-readable dumps of functions and analysis results.
//!
//! Sets are printed sorted, so dump output is stable across runs and usable
//! in golden tests. Physical registers print under their target display name
//! when one was declared, otherwise under the generic `pN` form.

use std::fmt::Write;

use crate::dataflow::{FactSet, Liveness, RdFact, ReachingDefs, ValueLiveness};
use crate::driver::InstrNumbering;
use crate::ir::{Function, InstrId, Reg};
use crate::target::TargetInfo;

fn reg_name(target: &TargetInfo, reg: Reg) -> String {
    match target.name(reg) {
        Some(name) => name.to_string(),
        None => reg.to_string(),
    }
}

fn reg_set(target: &TargetInfo, set: &FactSet<Reg>) -> String {
    let mut regs: Vec<Reg> = set.iter().copied().collect();
    regs.sort();
    let names: Vec<String> = regs.into_iter().map(|r| reg_name(target, r)).collect();
    format!("{{ {} }}", names.join(", "))
}

fn fact_set(target: &TargetInfo, numbering: &InstrNumbering, set: &FactSet<RdFact>) -> String {
    let mut facts: Vec<RdFact> = set.iter().copied().collect();
    facts.sort();
    let names: Vec<String> = facts
        .into_iter()
        .map(|f| match numbering.number(f.def) {
            Some(n) => format!("{}@%{}", reg_name(target, f.reg), n),
            None => f.to_string(),
        })
        .collect();
    format!("{{ {} }}", names.join(", "))
}

fn id_set(numbering: &InstrNumbering, set: &FactSet<InstrId>) -> String {
    let mut sites: Vec<InstrId> = set.iter().copied().collect();
    sites.sort();
    let names: Vec<String> = sites
        .into_iter()
        .map(|id| match numbering.number(id) {
            Some(n) => format!("%{n}"),
            None => id.to_string(),
        })
        .collect();
    format!("{{ {} }}", names.join(", "))
}

/// Dump a function's blocks and numbered instructions.
pub fn dump_function(func: &Function, target: &TargetInfo, numbering: &InstrNumbering) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "function {}", func.name);
    for bb in &func.blocks {
        let _ = writeln!(out, "{} ({}):", bb.id, bb.label);
        for (index, instr) in bb.instrs.iter().enumerate() {
            let id = InstrId::new(bb.id, index);
            let operands: Vec<String> = instr
                .operands
                .iter()
                .map(|o| reg_name(target, o.reg))
                .collect();
            let number = numbering.number(id).unwrap_or(0);
            let _ = writeln!(out, "  %{}  {} {}", number, instr.opcode, operands.join(", "));
        }
    }
    out
}

/// Dump liveness results: block-level sets followed by one line per
/// instruction.
pub fn dump_liveness(
    func: &Function,
    target: &TargetInfo,
    numbering: &InstrNumbering,
    liveness: &Liveness,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "function {} (liveness)", func.name);
    for bb in &func.blocks {
        let _ = writeln!(out, "BASIC BLOCK {} ({})", bb.id, bb.label);
        let _ = writeln!(out, "  L-Before: {}", reg_set(target, liveness.live_before(bb.id)));
        let _ = writeln!(out, "  L-After:  {}", reg_set(target, liveness.live_after(bb.id)));
        for index in 0..bb.instrs.len() {
            let id = InstrId::new(bb.id, index);
            let number = numbering.number(id).unwrap_or(0);
            let _ = writeln!(
                out,
                "    %{}  before {}  after {}",
                number,
                reg_set(target, liveness.live_before_instr(id)),
                reg_set(target, liveness.live_after_instr(id)),
            );
        }
    }
    out
}

/// Dump per-block reaching-definition results. Facts print as `reg@%n` using
/// the shared instruction numbering.
pub fn dump_reaching_defs(
    func: &Function,
    target: &TargetInfo,
    numbering: &InstrNumbering,
    reaching: &ReachingDefs,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "function {} (reaching definitions)", func.name);
    for bb in &func.blocks {
        let _ = writeln!(out, "BASIC BLOCK {} ({})", bb.id, bb.label);
        let _ = writeln!(
            out,
            "  RD-Before: {}",
            fact_set(target, numbering, reaching.reaching_before(bb.id))
        );
        let _ = writeln!(
            out,
            "  RD-After:  {}",
            fact_set(target, numbering, reaching.reaching_after(bb.id))
        );
        for index in 0..bb.instrs.len() {
            let id = InstrId::new(bb.id, index);
            let number = numbering.number(id).unwrap_or(0);
            let _ = writeln!(
                out,
                "    %{}  before {}  after {}",
                number,
                fact_set(target, numbering, reaching.reaching_before_instr(id)),
                fact_set(target, numbering, reaching.reaching_after_instr(id)),
            );
        }
    }
    out
}

/// Dump value-liveness results. Values print as `%n` after the defining
/// instruction's number.
pub fn dump_value_liveness(
    func: &Function,
    numbering: &InstrNumbering,
    values: &ValueLiveness,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "function {} (value liveness)", func.name);
    for bb in &func.blocks {
        let _ = writeln!(out, "BASIC BLOCK {} ({})", bb.id, bb.label);
        let _ = writeln!(out, "  V-Before: {}", id_set(numbering, values.live_before(bb.id)));
        let _ = writeln!(out, "  V-After:  {}", id_set(numbering, values.live_after(bb.id)));
        for index in 0..bb.instrs.len() {
            let id = InstrId::new(bb.id, index);
            let number = numbering.number(id).unwrap_or(0);
            let _ = writeln!(
                out,
                "    %{}  before {}  after {}",
                number,
                id_set(numbering, values.live_before_instr(id)),
                id_set(numbering, values.live_after_instr(id)),
            );
        }
    }
    out
}
