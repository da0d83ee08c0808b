//! Peephole optimizations driven by the analyses.

pub mod load_forwarding;

pub use load_forwarding::forward_loads;
