//! The register-based machine IR the analyses operate on.
//!
//! # Modules
//!
//! - [`types`]: registers, operands, instructions, blocks, functions
//! - [`builder`]: incremental function construction with validation

pub mod builder;
pub mod types;

pub use builder::FunctionBuilder;
pub use types::{BasicBlock, BlockId, Edge, Function, Instr, InstrId, Operand, Reg};
