//! Physical-register metadata: alias tables and display names.
//!
//! Physical registers that share underlying storage alias one another (e.g.
//! a 16-bit register overlapping the low half of a 32-bit one). Whenever an
//! analysis records a use or def of a physical register it must record the
//! same event for every alias, otherwise a write through one name would
//! appear to leave the overlapping name's old value intact.
//!
//! The table is static per-target data, fixed for the lifetime of an
//! analysis run. Virtual registers never alias. The analyses assume the
//! metadata is finite and well formed; the builder enforces symmetry so a
//! one-directional description cannot produce asymmetric kill sets.

use rustc_hash::FxHashMap;

use crate::dataflow::FactSet;
use crate::ir::Reg;

/// Per-target register metadata consulted by all analyses.
#[derive(Debug, Clone, Default)]
pub struct TargetInfo {
    aliases: FxHashMap<Reg, Vec<Reg>>,
    names: FxHashMap<Reg, String>,
}

impl TargetInfo {
    /// Metadata with no physical registers at all. Suitable for functions
    /// that only touch virtual registers.
    pub fn none() -> Self {
        Self::default()
    }

    /// Start describing a target.
    pub fn builder() -> TargetInfoBuilder {
        TargetInfoBuilder {
            info: Self::default(),
        }
    }

    /// Declared aliases of a register. Empty for virtual registers and for
    /// physical registers with no overlap.
    pub fn aliases_of(&self, reg: Reg) -> &[Reg] {
        self.aliases.get(&reg).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Display name of a physical register, if one was declared.
    pub fn name(&self, reg: Reg) -> Option<&str> {
        self.names.get(&reg).map(String::as_str)
    }

    /// Insert `reg` and its alias closure into `set`.
    ///
    /// Total and idempotent: a virtual register contributes only itself.
    pub fn expand_into(&self, set: &mut FactSet<Reg>, reg: Reg) {
        set.insert(reg);
        for &alias in self.aliases_of(reg) {
            set.insert(alias);
        }
    }

    /// The closed set of registers physically touched by `reg`.
    pub fn expand(&self, reg: Reg) -> FactSet<Reg> {
        let mut set = FactSet::default();
        self.expand_into(&mut set, reg);
        set
    }
}

/// Builder for [`TargetInfo`].
#[derive(Debug)]
pub struct TargetInfoBuilder {
    info: TargetInfo,
}

impl TargetInfoBuilder {
    /// Declare that two physical registers overlap. Recorded in both
    /// directions, so the resulting table is always symmetric.
    pub fn alias(mut self, a: Reg, b: Reg) -> Self {
        debug_assert!(a.is_physical() && b.is_physical(), "only physical registers alias");
        let fwd = self.info.aliases.entry(a).or_default();
        if !fwd.contains(&b) {
            fwd.push(b);
        }
        let back = self.info.aliases.entry(b).or_default();
        if !back.contains(&a) {
            back.push(a);
        }
        self
    }

    /// Give a physical register a display name for dumps.
    pub fn name(mut self, reg: Reg, name: impl Into<String>) -> Self {
        self.info.names.insert(reg, name.into());
        self
    }

    /// Finish the description.
    pub fn build(self) -> TargetInfo {
        self.info
    }
}
