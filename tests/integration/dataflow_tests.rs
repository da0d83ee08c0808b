//! End-to-end dataflow tests.
//!
//! Builds small but non-trivial CFGs through the public API and checks the
//! converged analyses, the dumps, and the JSON export against each other.

use regflow::dump::{dump_function, dump_liveness, dump_reaching_defs};
use regflow::ir::{BlockId, FunctionBuilder, Instr, InstrId, Operand, Reg};
use regflow::{FlowError, Function, FunctionAnalysis, TargetInfo, ValueLiveness};

const V1: Reg = Reg::Virt(1);
const V2: Reg = Reg::Virt(2);
const V3: Reg = Reg::Virt(3);
const AX: Reg = Reg::Phys(0);
const AL: Reg = Reg::Phys(1);

/// A loop that accumulates into v1 and finally copies it to a physical
/// register:
///
///   entry:  v1 = 0; v2 = n
///   header: (branch on v2)
///   body:   v1 = v1 + v2; v2 = v2 - 1
///   exit:   ax = v1
fn count_loop() -> Function {
    let mut b = FunctionBuilder::new("count_loop");
    let entry = b.block("entry");
    let header = b.block("header");
    let body = b.block("body");
    let exit = b.block("exit");
    b.edge(entry, header);
    b.edge(header, body);
    b.edge(header, exit);
    b.edge(body, header);
    b.push(entry, Instr::new("li", vec![Operand::def_of(V1)]));
    b.push(entry, Instr::new("li", vec![Operand::def_of(V2)]));
    b.push(header, Instr::new("brz", vec![Operand::use_of(V2)]));
    b.push(
        body,
        Instr::new("add", vec![Operand::use_def_of(V1), Operand::use_of(V2)]),
    );
    b.push(body, Instr::new("dec", vec![Operand::use_def_of(V2)]));
    b.push(
        exit,
        Instr::new("mov", vec![Operand::def_of(AX), Operand::use_of(V1)]),
    );
    b.finish().expect("valid function")
}

// =============================================================================
// Liveness
// =============================================================================

#[test]
fn test_loop_liveness_end_to_end() {
    crate::init_tracing();
    let func = count_loop();
    let fa = FunctionAnalysis::run(&func, &TargetInfo::none()).expect("analysis succeeds");

    let header = BlockId(1);
    let body = BlockId(2);
    let exit = BlockId(3);

    // Both loop-carried values are live around the back edge.
    assert!(fa.liveness.live_before(header).contains(&V1));
    assert!(fa.liveness.live_before(header).contains(&V2));
    assert!(fa.liveness.live_after(body).contains(&V1));
    assert!(fa.liveness.live_after(body).contains(&V2));

    // Only v1 survives into the exit block, and nothing survives past it.
    assert!(fa.liveness.live_before(exit).contains(&V1));
    assert!(!fa.liveness.live_before(exit).contains(&V2));
    assert!(fa.liveness.live_after(exit).is_empty());
}

#[test]
fn test_instruction_liveness_refines_block_liveness() {
    let func = count_loop();
    let fa = FunctionAnalysis::run(&func, &TargetInfo::none()).expect("analysis succeeds");

    // Inside body: v2 dies at the dec, v1 is live throughout.
    let add = InstrId::new(BlockId(2), 0);
    let dec = InstrId::new(BlockId(2), 1);
    assert!(fa.liveness.live_before_instr(add).contains(&V2));
    assert!(fa.liveness.live_before_instr(dec).contains(&V2));
    assert!(fa.liveness.is_live_after(dec, V2));
    assert!(fa.liveness.is_live_after(dec, V1));
}

// =============================================================================
// Reaching definitions
// =============================================================================

#[test]
fn test_loop_reaching_defs_merge_at_header() {
    let func = count_loop();
    let fa = FunctionAnalysis::run(&func, &TargetInfo::none()).expect("analysis succeeds");

    // The header sees the entry defs and the body redefs.
    let header = BlockId(1);
    let brz = InstrId::new(header, 0);
    let v1_defs: Vec<InstrId> = fa.reaching.defs_reaching(brz, V1).collect();
    let v2_defs: Vec<InstrId> = fa.reaching.defs_reaching(brz, V2).collect();
    assert_eq!(v1_defs.len(), 2, "entry def and body redef of v1");
    assert_eq!(v2_defs.len(), 2, "entry def and body redef of v2");

    // The exit block's mov has the same two v1 defs reaching it.
    let mov = InstrId::new(BlockId(3), 0);
    assert_eq!(fa.reaching.defs_reaching(mov, V1).count(), 2);
}

#[test]
fn test_straightline_use_has_single_reaching_def() {
    let mut b = FunctionBuilder::new("straight");
    let entry = b.block("entry");
    b.push(entry, Instr::new("li", vec![Operand::def_of(V1)]));
    b.push(entry, Instr::new("li", vec![Operand::def_of(V1)]));
    b.push(
        entry,
        Instr::new("mov", vec![Operand::def_of(V2), Operand::use_of(V1)]),
    );
    let func = b.finish().expect("valid function");
    let fa = FunctionAnalysis::run(&func, &TargetInfo::none()).expect("analysis succeeds");

    let mov = InstrId::new(entry, 2);
    let defs: Vec<InstrId> = fa.reaching.defs_reaching(mov, V1).collect();
    assert_eq!(defs, vec![InstrId::new(entry, 1)]);
}

// =============================================================================
// Aliasing
// =============================================================================

#[test]
fn test_alias_closure_spans_both_analyses() {
    // entry: al = ...
    // exit:  use ax
    let target = TargetInfo::builder()
        .alias(AX, AL)
        .name(AX, "ax")
        .name(AL, "al")
        .build();
    let mut b = FunctionBuilder::new("alias");
    let entry = b.block("entry");
    let exit = b.block("exit");
    b.edge(entry, exit);
    b.push(entry, Instr::new("li", vec![Operand::def_of(AL)]));
    b.push(exit, Instr::new("use", vec![Operand::use_of(AX)]));
    let func = b.finish().expect("valid function");

    let fa = FunctionAnalysis::run(&func, &target).expect("analysis succeeds");

    // The use of ax keeps al live across the edge.
    assert!(fa.liveness.live_after(entry).contains(&AL));
    assert!(fa.liveness.live_after(entry).contains(&AX));
    // The def of al reaches the use under both names.
    let use_id = InstrId::new(exit, 0);
    assert_eq!(fa.reaching.defs_reaching(use_id, AX).count(), 1);
    assert_eq!(fa.reaching.defs_reaching(use_id, AL).count(), 1);
}

// =============================================================================
// Value liveness
// =============================================================================

#[test]
fn test_value_liveness_on_single_def_form() {
    // The loop function redefines v1/v2 via use_def operands, so it is not
    // single-def; a straightline single-def function is.
    let func = count_loop();
    assert!(matches!(
        ValueLiveness::analyze(&func),
        Err(FlowError::MultipleDefinitions { .. })
    ));

    let mut b = FunctionBuilder::new("ssa_ish");
    let entry = b.block("entry");
    let exit = b.block("exit");
    b.edge(entry, exit);
    b.push(entry, Instr::new("li", vec![Operand::def_of(V1)]));
    b.push(
        exit,
        Instr::new("mov", vec![Operand::def_of(V3), Operand::use_of(V1)]),
    );
    let func = b.finish().expect("valid function");

    let vl = ValueLiveness::analyze(&func).expect("single-def form");
    assert!(vl.value_live_after(entry, InstrId::new(entry, 0)));
    assert!(vl.live_after(exit).is_empty());
    assert_eq!(vl.def_site(V3), Some(InstrId::new(exit, 0)));
}

// =============================================================================
// Dumps and JSON
// =============================================================================

#[test]
fn test_dumps_are_deterministic_and_consistent() {
    let func = count_loop();
    let target = TargetInfo::builder().name(AX, "ax").build();
    let fa = FunctionAnalysis::run(&func, &target).expect("analysis succeeds");

    let code = dump_function(&func, &target, &fa.numbering);
    assert!(code.contains("function count_loop"));
    assert!(code.contains("%1  li v1"));
    assert!(code.contains("%6  mov ax, v1"));

    let live = dump_liveness(&func, &target, &fa.numbering, &fa.liveness);
    assert!(live.contains("BASIC BLOCK bb1 (header)"));
    assert!(live.contains("L-Before: { v1, v2 }"));
    assert!(live.contains("%3  before { v1, v2 }  after { v1, v2 }"));

    let reach = dump_reaching_defs(&func, &target, &fa.numbering, &fa.reaching);
    assert!(reach.contains("RD-Before: { v1@%1, v1@%4, v2@%2, v2@%5 }"));

    // Dumping twice yields byte-identical output.
    assert_eq!(code, dump_function(&func, &target, &fa.numbering));
    assert_eq!(live, dump_liveness(&func, &target, &fa.numbering, &fa.liveness));
}

#[test]
fn test_json_export_round_trips_through_serde() {
    let func = count_loop();
    let fa = FunctionAnalysis::run(&func, &TargetInfo::none()).expect("analysis succeeds");

    let v = fa.to_json(&func);
    let text = serde_json::to_string(&v).expect("serializable");
    let back: serde_json::Value = serde_json::from_str(&text).expect("parseable");
    assert_eq!(back["function"], "count_loop");
    assert_eq!(back["blocks"].as_array().expect("array").len(), 4);
    // Header's live-before is sorted.
    assert_eq!(back["blocks"][1]["live_before"][0], "v1");
    assert_eq!(back["blocks"][1]["live_before"][1], "v2");
}

#[test]
fn test_functions_survive_serde_round_trip() {
    let func = count_loop();
    let text = serde_json::to_string(&func).expect("serializable");
    let back: Function = serde_json::from_str(&text).expect("parseable");
    back.validate().expect("still valid");

    // Analyses agree before and after the round trip.
    let a = FunctionAnalysis::run(&func, &TargetInfo::none()).expect("analysis succeeds");
    let b = FunctionAnalysis::run(&back, &TargetInfo::none()).expect("analysis succeeds");
    for block in func.block_ids() {
        assert_eq!(a.liveness.live_before(block), b.liveness.live_before(block));
        assert_eq!(
            a.reaching.reaching_after(block),
            b.reaching.reaching_after(block)
        );
    }
}
