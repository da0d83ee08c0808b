//! regflow: gen/kill dataflow analyses over a register-based machine IR.
//!
//! The crate is organized around one generic worklist solver
//! ([`dataflow::solve`]) and three instantiations of it:
//!
//! - [`dataflow::Liveness`]: backward liveness over register names, closed
//!   under physical-register aliasing
//! - [`dataflow::ReachingDefs`]: forward reaching definitions over
//!   register/def-site pairs
//! - [`dataflow::ValueLiveness`]: backward liveness over value identities,
//!   for single-def functions
//!
//! [`driver::FunctionAnalysis`] runs the register-granularity analyses in
//! one call and attaches a stable instruction numbering; [`dump`] renders
//! functions and results as deterministic text; [`opt::forward_loads`] is a
//! store-to-load forwarding peephole built on the liveness results.
//!
//! # Example
//!
//! ```
//! use regflow::driver::FunctionAnalysis;
//! use regflow::ir::{FunctionBuilder, Instr, Operand, Reg};
//! use regflow::target::TargetInfo;
//!
//! let mut b = FunctionBuilder::new("min");
//! let entry = b.block("entry");
//! b.push(entry, Instr::new("li", vec![Operand::def_of(Reg::Virt(1))]));
//! b.push(entry, Instr::new("use", vec![Operand::use_of(Reg::Virt(1))]));
//! let func = b.finish()?;
//!
//! let analysis = FunctionAnalysis::run(&func, &TargetInfo::none())?;
//! assert!(!analysis.liveness.live_after(entry).contains(&Reg::Virt(1)));
//! # Ok::<(), regflow::FlowError>(())
//! ```

pub mod dataflow;
pub mod driver;
pub mod dump;
pub mod error;
pub mod ir;
pub mod opt;
pub mod target;

pub use dataflow::{Liveness, RdFact, ReachingDefs, ValueLiveness};
pub use driver::FunctionAnalysis;
pub use error::{FlowError, Result};
pub use ir::{Function, FunctionBuilder};
pub use target::TargetInfo;
