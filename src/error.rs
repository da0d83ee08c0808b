//! Error types for regflow analyses.

use thiserror::Error;

use crate::ir::{BlockId, InstrId, Reg};

/// Errors produced while building IR or running analyses.
///
/// Well-formed input makes every analysis a total function, so most of these
/// indicate a malformed function handed to the library rather than a
/// recoverable runtime condition. They are still surfaced as values: the
/// library never aborts the host process.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    /// An instruction that was expected to define a register defines none.
    #[error("instruction {at} defines no register")]
    NoDefinedRegister {
        /// The offending instruction.
        at: InstrId,
    },

    /// A virtual register has more than one definition, so it has no single
    /// value identity. Raised by value-granularity liveness, which requires
    /// single-def form.
    #[error("virtual register {reg} defined at both {first} and {second}")]
    MultipleDefinitions {
        /// The multiply-defined register.
        reg: Reg,
        /// Its first definition site.
        first: InstrId,
        /// The second definition site encountered.
        second: InstrId,
    },

    /// An edge references a block that does not exist in the function.
    #[error("edge references unknown block {0}")]
    UnknownBlock(BlockId),

    /// A function must contain at least one basic block.
    #[error("function {0:?} has no basic blocks")]
    EmptyFunction(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FlowError>;
