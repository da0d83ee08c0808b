//! Incremental construction of IR functions.

use crate::error::{FlowError, Result};
use crate::ir::types::{BasicBlock, BlockId, Edge, Function, Instr};

/// Builds a [`Function`] block by block.
///
/// Blocks are created with [`FunctionBuilder::block`] and filled with
/// [`FunctionBuilder::push`]; edges may reference blocks created later.
/// [`FunctionBuilder::finish`] validates the result, so a successfully built
/// function never needs re-validation before analysis.
///
/// # Example
///
/// ```
/// use regflow::ir::{FunctionBuilder, Instr, Operand, Reg};
///
/// let mut b = FunctionBuilder::new("double");
/// let entry = b.block("entry");
/// b.push(entry, Instr::new("add", vec![
///     Operand::def_of(Reg::Virt(2)),
///     Operand::use_of(Reg::Virt(1)),
///     Operand::use_of(Reg::Virt(1)),
/// ]));
/// let f = b.finish().unwrap();
/// assert_eq!(f.instr_count(), 1);
/// ```
#[derive(Debug)]
pub struct FunctionBuilder {
    name: String,
    blocks: Vec<BasicBlock>,
    edges: Vec<Edge>,
}

impl FunctionBuilder {
    /// Start building a function with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            blocks: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Append a new empty block and return its id. The first block created
    /// is the entry block.
    pub fn block(&mut self, label: impl Into<String>) -> BlockId {
        let id = BlockId(self.blocks.len());
        self.blocks.push(BasicBlock {
            id,
            label: label.into(),
            instrs: Vec::new(),
        });
        id
    }

    /// Append an instruction to a block.
    pub fn push(&mut self, block: BlockId, instr: Instr) {
        self.blocks[block.0].instrs.push(instr);
    }

    /// Add a CFG edge. Duplicate edges are dropped.
    pub fn edge(&mut self, from: BlockId, to: BlockId) {
        let edge = Edge { from, to };
        if !self.edges.contains(&edge) {
            self.edges.push(edge);
        }
    }

    /// Finish and validate the function.
    ///
    /// # Errors
    ///
    /// [`FlowError::EmptyFunction`] if no block was created;
    /// [`FlowError::UnknownBlock`] if an edge references a block id that was
    /// never handed out by this builder.
    pub fn finish(self) -> Result<Function> {
        if self.blocks.is_empty() {
            return Err(FlowError::EmptyFunction(self.name));
        }
        let func = Function::new(self.name, self.blocks, self.edges);
        func.validate()?;
        Ok(func)
    }
}
