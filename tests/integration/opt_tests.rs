//! Store-to-load forwarding tests through the public API.

use regflow::ir::{BlockId, FunctionBuilder, Instr, InstrId, Operand, Reg};
use regflow::opt::forward_loads;
use regflow::{FunctionAnalysis, TargetInfo};

const VAL: Reg = Reg::Virt(1);
const ADDR: Reg = Reg::Virt(2);
const DST: Reg = Reg::Virt(3);
const OUT: Reg = Reg::Virt(4);

fn store(value: Reg, addr: Reg) -> Instr {
    Instr::new("store", vec![Operand::use_of(value), Operand::use_of(addr)])
}

fn load(dst: Reg, addr: Reg) -> Instr {
    Instr::new("load", vec![Operand::def_of(dst), Operand::use_of(addr)])
}

#[test]
fn test_forwarding_then_reanalysis() {
    crate::init_tracing();
    // entry: store v1 -> [v2]; v3 = load [v2]; v4 = add v3, v3
    let mut b = FunctionBuilder::new("spill");
    let entry = b.block("entry");
    b.push(entry, store(VAL, ADDR));
    b.push(entry, load(DST, ADDR));
    b.push(
        entry,
        Instr::new(
            "add",
            vec![
                Operand::def_of(OUT),
                Operand::use_of(DST),
                Operand::use_of(DST),
            ],
        ),
    );
    let mut func = b.finish().expect("valid function");

    let removed = forward_loads(&mut func, &TargetInfo::none()).expect("well-formed loads");
    assert_eq!(removed, 1);
    assert_eq!(func.instr_count(), 2);

    // The rewritten function is still valid and analyzable; v3 is gone from
    // the live sets entirely.
    let fa = FunctionAnalysis::run(&func, &TargetInfo::none()).expect("analysis succeeds");
    let add = InstrId::new(BlockId(0), 1);
    assert!(fa.liveness.live_before_instr(add).contains(&VAL));
    assert!(!fa.liveness.live_before_instr(add).contains(&DST));
    assert_eq!(fa.reaching.all_defs_of(DST).len(), 0);
}

#[test]
fn test_forwarding_is_idempotent() {
    let mut b = FunctionBuilder::new("spill");
    let entry = b.block("entry");
    b.push(entry, store(VAL, ADDR));
    b.push(entry, load(DST, ADDR));
    b.push(
        entry,
        Instr::new("add", vec![Operand::def_of(OUT), Operand::use_of(DST)]),
    );
    let mut func = b.finish().expect("valid function");

    assert_eq!(forward_loads(&mut func, &TargetInfo::none()).expect("first pass"), 1);
    assert_eq!(forward_loads(&mut func, &TargetInfo::none()).expect("second pass"), 0);
}

#[test]
fn test_loads_across_blocks_are_untouched() {
    // Forwarding is intra-block only; a load in a successor block stays.
    let mut b = FunctionBuilder::new("cross_block");
    let entry = b.block("entry");
    let next = b.block("next");
    b.edge(entry, next);
    b.push(entry, store(VAL, ADDR));
    b.push(next, load(DST, ADDR));
    b.push(
        next,
        Instr::new("add", vec![Operand::def_of(OUT), Operand::use_of(DST)]),
    );
    let mut func = b.finish().expect("valid function");

    let removed = forward_loads(&mut func, &TargetInfo::none()).expect("well-formed loads");
    assert_eq!(removed, 0);
    assert_eq!(func.instr_count(), 3);
}

#[test]
fn test_two_pairs_in_one_block() {
    let other_addr = Reg::Virt(10);
    let other_dst = Reg::Virt(11);
    let mut b = FunctionBuilder::new("pairs");
    let entry = b.block("entry");
    b.push(entry, store(VAL, ADDR));
    b.push(entry, store(OUT, other_addr));
    b.push(entry, load(DST, ADDR));
    b.push(entry, load(other_dst, other_addr));
    b.push(
        entry,
        Instr::new(
            "add",
            vec![
                Operand::def_of(Reg::Virt(12)),
                Operand::use_of(DST),
                Operand::use_of(other_dst),
            ],
        ),
    );
    let mut func = b.finish().expect("valid function");

    let removed = forward_loads(&mut func, &TargetInfo::none()).expect("well-formed loads");
    assert_eq!(removed, 2);
    // Both uses read the stored registers now.
    let add = func.blocks[0].instrs.last().expect("add remains");
    assert_eq!(add.uses().collect::<Vec<_>>(), vec![VAL, OUT]);
}
