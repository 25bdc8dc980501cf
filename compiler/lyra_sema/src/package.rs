//! View of the build system's package graph.
//!
//! The analyzer consults, but does not own, package facts: a package's
//! role, its declared dependencies, and per-definition external
//! visibility. The only thing written back is usage statistics (which
//! packages a package actually referenced).

use lyra_ir::Name;
use rustc_hash::FxHashSet;

use crate::{AccessLevel, Definition};

/// Index of a package in the graph.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
#[repr(transparent)]
pub struct PackageId(u32);

impl PackageId {
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        PackageId(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Debug for PackageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "pkg#{}", self.0)
    }
}

/// Why a package participates in the analysis.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum PackageRole {
    /// Ordinary source being compiled.
    Source,
    /// Prebuilt dependency.
    External,
    /// Published definitions a source package must stay compatible with.
    CompatConstraint,
    /// Like `CompatConstraint`, but violations are warnings.
    SoftCompatConstraint,
}

impl PackageRole {
    /// Constraint packages contribute definitions for diffing only; their
    /// members never resolve as ordinary references.
    pub fn is_constraint(self) -> bool {
        matches!(
            self,
            PackageRole::CompatConstraint | PackageRole::SoftCompatConstraint
        )
    }
}

#[derive(Debug)]
struct Package {
    name: Name,
    role: PackageRole,
    dependencies: Vec<PackageId>,
    /// Packages actually referenced from this one; written back for the
    /// build system.
    used: FxHashSet<PackageId>,
}

/// All packages participating in one analysis run.
#[derive(Default)]
pub struct PackageGraph {
    packages: Vec<Package>,
}

impl PackageGraph {
    pub fn new() -> Self {
        PackageGraph::default()
    }

    #[allow(clippy::cast_possible_truncation)]
    pub fn add_package(
        &mut self,
        name: Name,
        role: PackageRole,
        dependencies: Vec<PackageId>,
    ) -> PackageId {
        let id = PackageId(self.packages.len() as u32);
        self.packages.push(Package {
            name,
            role,
            dependencies,
            used: FxHashSet::default(),
        });
        id
    }

    pub fn name(&self, id: PackageId) -> Name {
        self.packages[id.index()].name
    }

    pub fn role(&self, id: PackageId) -> PackageRole {
        self.packages[id.index()].role
    }

    pub fn dependencies(&self, id: PackageId) -> &[PackageId] {
        &self.packages[id.index()].dependencies
    }

    /// Whether `from` declared a dependency on `to`.
    pub fn depends_on(&self, from: PackageId, to: PackageId) -> bool {
        from == to || self.packages[from.index()].dependencies.contains(&to)
    }

    /// Record that `from` referenced a definition in `to`.
    pub fn record_usage(&mut self, from: PackageId, to: PackageId) {
        if from != to {
            self.packages[from.index()].used.insert(to);
        }
    }

    /// Packages actually referenced from `id`.
    pub fn usage(&self, id: PackageId) -> impl Iterator<Item = PackageId> + '_ {
        self.packages[id.index()].used.iter().copied()
    }

    /// Whether a definition is visible outside its defining package.
    pub fn visible_outside(&self, def: &Definition) -> bool {
        match &def.access {
            AccessLevel::Public | AccessLevel::Protected => true,
            AccessLevel::Internal | AccessLevel::Private => false,
            // Scoped access names specific modules; visibility is decided
            // per reference site, so the conservative answer here is yes.
            AccessLevel::Scoped(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DefKind, Definition, ScopeId};
    use lyra_ir::Span;
    use pretty_assertions::assert_eq;

    #[test]
    fn usage_is_recorded_once_and_never_for_self() {
        let mut graph = PackageGraph::new();
        let a = graph.add_package(Name::EMPTY, PackageRole::Source, Vec::new());
        let b = graph.add_package(Name::EMPTY, PackageRole::External, Vec::new());

        graph.record_usage(a, b);
        graph.record_usage(a, b);
        graph.record_usage(a, a);

        assert_eq!(graph.usage(a).collect::<Vec<_>>(), vec![b]);
        assert_eq!(graph.usage(b).count(), 0);
    }

    #[test]
    fn visibility_follows_access_level() {
        let graph = PackageGraph::new();
        let mut def = Definition::new(
            Name::EMPTY,
            DefKind::Function,
            ScopeId::ROOT,
            PackageId::from_raw(0),
            Span::DUMMY,
        );
        assert!(!graph.visible_outside(&def));
        def.access = AccessLevel::Public;
        assert!(graph.visible_outside(&def));
        def.access = AccessLevel::Private;
        assert!(!graph.visible_outside(&def));
    }

    #[test]
    fn constraint_roles() {
        assert!(PackageRole::CompatConstraint.is_constraint());
        assert!(!PackageRole::Source.is_constraint());
    }
}
