//! Machine IR type definitions.
//!
//! The IR is deliberately small: a [`Function`] is a vector of
//! [`BasicBlock`]s connected by an explicit edge list, a block is an ordered
//! vector of [`Instr`]s, and an instruction is an opcode plus an ordered list
//! of register [`Operand`]s tagged use/def. The analyses read this structure
//! and never mutate it; blocks and instructions are addressed by dense
//! indices ([`BlockId`], [`InstrId`]) rather than pointers, so results can be
//! stored in plain maps keyed by value.

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{FlowError, Result};

/// Unique identifier for a basic block: its index in `Function::blocks`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockId(pub usize);

impl std::fmt::Display for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

/// Stable identity of an instruction: owning block plus position within it.
///
/// Equality and hashing are structural. Reaching-definition facts embed an
/// `InstrId`, so two facts naming the same definition site always compare
/// equal no matter where the fact values were created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InstrId {
    /// The block containing the instruction.
    pub block: BlockId,
    /// The instruction's position within the block.
    pub index: usize,
}

impl InstrId {
    /// Create an instruction id from a block and an in-block position.
    #[inline]
    pub fn new(block: BlockId, index: usize) -> Self {
        Self { block, index }
    }
}

impl std::fmt::Display for InstrId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.block, self.index)
    }
}

/// A register identifier.
///
/// Virtual registers are analysis-time names, unique per logical value, with
/// no aliasing. Physical registers belong to the target's register file and
/// may alias other physical registers (see `TargetInfo`). There is no
/// reserved "register zero": an unknown register is unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reg {
    /// A virtual register.
    Virt(u32),
    /// A physical (machine) register.
    Phys(u32),
}

impl Reg {
    /// Whether this is a physical register.
    #[inline]
    pub fn is_physical(self) -> bool {
        matches!(self, Reg::Phys(_))
    }

    /// Whether this is a virtual register.
    #[inline]
    pub fn is_virtual(self) -> bool {
        matches!(self, Reg::Virt(_))
    }
}

impl std::fmt::Display for Reg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reg::Virt(n) => write!(f, "v{n}"),
            Reg::Phys(n) => write!(f, "p{n}"),
        }
    }
}

/// A register operand with its access mode.
///
/// An operand may be both a use and a def (read-modify-write); gen/kill
/// computation treats it as a use immediately followed by a def.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Operand {
    /// The register accessed.
    pub reg: Reg,
    /// The operand reads the register.
    pub is_use: bool,
    /// The operand writes the register.
    pub is_def: bool,
}

impl Operand {
    /// A pure use operand.
    #[inline]
    pub fn use_of(reg: Reg) -> Self {
        Self { reg, is_use: true, is_def: false }
    }

    /// A pure def operand.
    #[inline]
    pub fn def_of(reg: Reg) -> Self {
        Self { reg, is_use: false, is_def: true }
    }

    /// A read-modify-write operand.
    #[inline]
    pub fn use_def_of(reg: Reg) -> Self {
        Self { reg, is_use: true, is_def: true }
    }
}

/// A single machine instruction: an opcode mnemonic plus ordered operands.
///
/// The analyses are opcode-agnostic; only the peephole pass inspects
/// mnemonics. Instructions with zero def operands are legal everywhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instr {
    /// Opcode mnemonic (e.g. `"add"`, `"load"`, `"store"`, `"br"`).
    pub opcode: String,
    /// Ordered register operands.
    pub operands: Vec<Operand>,
}

impl Instr {
    /// Create an instruction.
    pub fn new(opcode: impl Into<String>, operands: Vec<Operand>) -> Self {
        Self { opcode: opcode.into(), operands }
    }

    /// Registers this instruction reads, in operand order.
    pub fn uses(&self) -> impl Iterator<Item = Reg> + '_ {
        self.operands.iter().filter(|o| o.is_use).map(|o| o.reg)
    }

    /// Registers this instruction writes, in operand order.
    pub fn defs(&self) -> impl Iterator<Item = Reg> + '_ {
        self.operands.iter().filter(|o| o.is_def).map(|o| o.reg)
    }

    /// The register this instruction defines.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::NoDefinedRegister`] if the instruction defines
    /// nothing. Callers that treat a missing def as a bug can unwrap at
    /// their own boundary; the library itself propagates the error.
    pub fn def_reg(&self, at: InstrId) -> Result<Reg> {
        self.defs().next().ok_or(FlowError::NoDefinedRegister { at })
    }
}

/// A basic block: a label and an ordered instruction sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicBlock {
    /// This block's id (its index in the owning function).
    pub id: BlockId,
    /// Human-readable label.
    pub label: String,
    /// Instructions in execution order.
    pub instrs: Vec<Instr>,
}

/// A control-flow edge between two blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    /// Source block.
    pub from: BlockId,
    /// Target block.
    pub to: BlockId,
}

/// Cached adjacency lists for O(1) successor/predecessor lookups.
///
/// Built lazily on first access; invalidated by cloning the function.
#[derive(Debug)]
pub struct AdjacencyCache {
    successors: HashMap<BlockId, Vec<BlockId>>,
    predecessors: HashMap<BlockId, Vec<BlockId>>,
}

/// A function: basic blocks plus the CFG edge list.
///
/// Topology is immutable for the duration of one analysis run. The first
/// block is the entry block.
#[derive(Debug, Serialize, Deserialize)]
pub struct Function {
    /// Function name.
    pub name: String,
    /// Basic blocks, indexed by `BlockId`.
    pub blocks: Vec<BasicBlock>,
    /// CFG edges.
    pub edges: Vec<Edge>,
    #[serde(skip)]
    adjacency_cache: OnceCell<AdjacencyCache>,
}

impl Clone for Function {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            blocks: self.blocks.clone(),
            edges: self.edges.clone(),
            // Rebuilt lazily if needed.
            adjacency_cache: OnceCell::new(),
        }
    }
}

impl Function {
    /// Assemble a function from parts. Prefer [`crate::ir::FunctionBuilder`],
    /// which validates as it goes.
    pub fn new(name: impl Into<String>, blocks: Vec<BasicBlock>, edges: Vec<Edge>) -> Self {
        Self {
            name: name.into(),
            blocks,
            edges,
            adjacency_cache: OnceCell::new(),
        }
    }

    /// The block with the given id.
    #[inline]
    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.0]
    }

    /// The instruction with the given id.
    #[inline]
    pub fn instr(&self, id: InstrId) -> &Instr {
        &self.blocks[id.block.0].instrs[id.index]
    }

    /// Iterate over all block ids in function order.
    pub fn block_ids(&self) -> impl Iterator<Item = BlockId> {
        (0..self.blocks.len()).map(BlockId)
    }

    /// Iterate over all instruction ids in function order.
    pub fn instr_ids(&self) -> impl Iterator<Item = InstrId> + '_ {
        self.blocks.iter().flat_map(|bb| {
            (0..bb.instrs.len()).map(move |i| InstrId::new(bb.id, i))
        })
    }

    /// Total number of instructions.
    pub fn instr_count(&self) -> usize {
        self.blocks.iter().map(|bb| bb.instrs.len()).sum()
    }

    /// Successors of a block. First call builds the adjacency cache.
    pub fn successors(&self, id: BlockId) -> &[BlockId] {
        self.adjacency()
            .successors
            .get(&id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Predecessors of a block. First call builds the adjacency cache.
    pub fn predecessors(&self, id: BlockId) -> &[BlockId] {
        self.adjacency()
            .predecessors
            .get(&id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Validate structural invariants: at least one block, block ids dense
    /// and self-consistent, every edge endpoint present.
    ///
    /// # Errors
    ///
    /// [`FlowError::EmptyFunction`] or [`FlowError::UnknownBlock`].
    pub fn validate(&self) -> Result<()> {
        if self.blocks.is_empty() {
            return Err(FlowError::EmptyFunction(self.name.clone()));
        }
        for (i, bb) in self.blocks.iter().enumerate() {
            if bb.id.0 != i {
                return Err(FlowError::UnknownBlock(bb.id));
            }
        }
        for edge in &self.edges {
            if edge.from.0 >= self.blocks.len() {
                return Err(FlowError::UnknownBlock(edge.from));
            }
            if edge.to.0 >= self.blocks.len() {
                return Err(FlowError::UnknownBlock(edge.to));
            }
        }
        Ok(())
    }

    fn adjacency(&self) -> &AdjacencyCache {
        self.adjacency_cache.get_or_init(|| {
            let mut successors: HashMap<BlockId, Vec<BlockId>> =
                HashMap::with_capacity(self.blocks.len());
            let mut predecessors: HashMap<BlockId, Vec<BlockId>> =
                HashMap::with_capacity(self.blocks.len());
            for edge in &self.edges {
                successors.entry(edge.from).or_default().push(edge.to);
                predecessors.entry(edge.to).or_default().push(edge.from);
            }
            AdjacencyCache {
                successors,
                predecessors,
            }
        })
    }
}
