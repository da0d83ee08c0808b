//! Store-to-load forwarding within basic blocks.
//!
//! A `store` followed in the same block by a `load` from the same address
//! makes the load redundant: the loaded register holds the stored value.
//! The pass rewrites later uses of the loaded register to read the stored
//! value's register directly and deletes the load when every remaining use
//! has been rewritten.
//!
//! Operand conventions, shared with the IR examples:
//!
//! - `store` reads `[value, addr]` (two use operands, no defs)
//! - `load` writes `[dst]` and reads `[addr]`
//!
//! Forwarding is strictly intra-block and deliberately conservative: any
//! intervening write to the value, address, or destination register, and any
//! other store to the same address, ends the window. Clobber checks are
//! closed under physical-register aliasing, matching the analyses' kill
//! sets: a write to `ax` ends a window whose value lives in `al`.

use tracing::debug;

use crate::dataflow::Liveness;
use crate::error::Result;
use crate::ir::{BlockId, Function, InstrId, Reg};
use crate::target::TargetInfo;

const STORE: &str = "store";
const LOAD: &str = "load";

/// What ended the rewrite scan after a forwarded load.
enum Stop {
    /// The destination itself was redefined; every prior use was rewritten.
    DstRedefined,
    /// The destination's storage is still read in a form that cannot be
    /// rewritten: a read-modify-write of the destination, or any access
    /// through an aliasing register.
    DstStillNeeded,
    /// The value or address register was clobbered (directly or through an
    /// alias) with the destination still intact.
    SourceClobbered,
    /// The block ended with the window still open.
    BlockEnd,
}

/// Whether a write to `def` changes the contents of `reg`. Physical
/// registers clobber their aliases' storage too.
fn clobbers(target: &TargetInfo, def: Reg, reg: Reg) -> bool {
    def == reg || target.aliases_of(def).contains(&reg)
}

/// Forward stored values into same-block loads, deleting loads whose
/// destination becomes dead. Returns the number of loads removed.
///
/// # Errors
///
/// [`crate::FlowError::NoDefinedRegister`] if a `load` instruction carries
/// no def operand.
pub fn forward_loads(func: &mut Function, target: &TargetInfo) -> Result<usize> {
    let liveness = Liveness::analyze(func, target);
    let mut removed_total = 0usize;

    for b in 0..func.blocks.len() {
        let block = BlockId(b);
        let n = func.blocks[b].instrs.len();
        let mut removed = vec![false; n];

        for i in 0..n {
            if removed[i] {
                continue;
            }
            let Some((value, addr)) = store_operands(func, block, i) else {
                continue;
            };
            let Some(j) = find_forwardable_load(func, target, block, i, value, addr, &removed)
            else {
                continue;
            };
            let load_id = InstrId::new(block, j);
            let dst = func.blocks[b].instrs[j].def_reg(load_id)?;

            let stop = rewrite_uses(func, target, block, j + 1, dst, value, addr, &removed);
            let delete = match stop {
                Stop::DstRedefined => true,
                Stop::BlockEnd => !liveness.live_after(block).contains(&dst),
                Stop::DstStillNeeded | Stop::SourceClobbered => false,
            };
            if delete {
                removed[j] = true;
                removed_total += 1;
                debug!(function = %func.name, %load_id, %dst, %value, "load forwarded");
            }
        }

        if removed.iter().any(|&r| r) {
            let mut keep = removed.iter().map(|&r| !r);
            func.blocks[b].instrs.retain(|_| keep.next().unwrap_or(true));
        }
    }

    Ok(removed_total)
}

/// The `(value, addr)` registers of a store instruction, if `index` is one.
fn store_operands(func: &Function, block: BlockId, index: usize) -> Option<(Reg, Reg)> {
    let instr = &func.blocks[block.0].instrs[index];
    if instr.opcode != STORE {
        return None;
    }
    let mut uses = instr.uses();
    let value = uses.next()?;
    let addr = uses.next()?;
    Some((value, addr))
}

/// Scan forward from a store for a load of the same address reachable with
/// `value` and `addr` still intact. Clobber checks are alias-closed, like
/// the analyses' kill sets.
fn find_forwardable_load(
    func: &Function,
    target: &TargetInfo,
    block: BlockId,
    store_index: usize,
    value: Reg,
    addr: Reg,
    removed: &[bool],
) -> Option<usize> {
    let instrs = &func.blocks[block.0].instrs;
    for (j, instr) in instrs.iter().enumerate().skip(store_index + 1) {
        if removed[j] {
            continue;
        }
        if instr.opcode == LOAD && instr.uses().next() == Some(addr) {
            return Some(j);
        }
        // Another store through the same (or an aliasing) address register
        // may change the memory cell.
        if instr.opcode == STORE {
            let mut uses = instr.uses();
            let _value = uses.next();
            if uses.next().is_some_and(|a| clobbers(target, a, addr)) {
                return None;
            }
        }
        if instr
            .defs()
            .any(|r| clobbers(target, r, value) || clobbers(target, r, addr))
        {
            return None;
        }
    }
    None
}

/// Rewrite pure uses of `dst` to `value` from `start` to the end of the
/// window and report what closed it. Uses within an instruction happen
/// before its defs, so an instruction that redefines a register still gets
/// its own uses rewritten first.
fn rewrite_uses(
    func: &mut Function,
    target: &TargetInfo,
    block: BlockId,
    start: usize,
    dst: Reg,
    value: Reg,
    addr: Reg,
    removed: &[bool],
) -> Stop {
    let instrs = &mut func.blocks[block.0].instrs;
    for (k, instr) in instrs.iter_mut().enumerate().skip(start) {
        if removed[k] {
            continue;
        }
        // A read-modify-write of dst, or any read through an aliasing
        // register, touches the loaded storage in a form that cannot be
        // renamed to `value`.
        if instr.operands.iter().any(|o| {
            o.is_use && ((o.reg == dst && o.is_def) || (o.reg != dst && clobbers(target, o.reg, dst)))
        }) {
            return Stop::DstStillNeeded;
        }
        for op in &mut instr.operands {
            if op.is_use && !op.is_def && op.reg == dst {
                op.reg = value;
            }
        }
        if instr.defs().any(|r| r == dst) {
            return Stop::DstRedefined;
        }
        // An aliased write to dst only partially replaces its storage, so
        // the load cannot be proven dead; same for clobbers of the sources.
        if instr
            .defs()
            .any(|r| clobbers(target, r, dst) || clobbers(target, r, value) || clobbers(target, r, addr))
        {
            return Stop::SourceClobbered;
        }
    }
    Stop::BlockEnd
}
