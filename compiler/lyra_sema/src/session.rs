//! One analysis session: ownership of every arena the analyzer borrows.
//!
//! The session is the public entry point. Callers build trees into the
//! session's arena and interner, then run [`AnalysisSession::analyze`]
//! over the roots; results are the diagnostic queue, the definitions in
//! the program graph, and the per-node result types.

use lyra_diagnostic::DiagnosticSink;
use lyra_ir::{NodeArena, NodeId, Span, StringInterner};
use lyra_types::{Idx, Pool};
use tracing::debug;

use crate::{
    AccessLevel, Analyzer, Context, DefKind, Definition, PackageGraph, PackageId, PackageRole,
    Program, ScopeId,
};

pub struct AnalysisSession {
    pub interner: StringInterner,
    pub arena: NodeArena,
    pub pool: Pool,
    pub program: Program,
    pub packages: PackageGraph,
    pub sink: DiagnosticSink,
    root_package: PackageId,
}

impl AnalysisSession {
    pub fn new() -> Self {
        let interner = StringInterner::new();
        let mut packages = PackageGraph::new();
        let root_package =
            packages.add_package(interner.intern("main"), PackageRole::Source, Vec::new());
        let mut session = AnalysisSession {
            interner,
            arena: NodeArena::new(),
            pool: Pool::new(),
            program: Program::new(),
            packages,
            sink: DiagnosticSink::new(),
            root_package,
        };
        session.install_primitives();
        session
    }

    /// The built-in type names, as public aliases in the root scope.
    fn install_primitives(&mut self) {
        for raw in 1..Idx::PRIMITIVE_COUNT {
            let idx = Idx::from_raw(raw);
            let Some(name) = idx.name() else { continue };
            let name = self.interner.intern(name);
            let mut def = Definition::new(
                name,
                DefKind::TypeAlias,
                ScopeId::ROOT,
                self.root_package,
                Span::DUMMY,
            );
            def.access = AccessLevel::Public;
            def.ty = idx;
            self.program.new_def(def);
        }
    }

    pub fn root_package(&self) -> PackageId {
        self.root_package
    }

    /// Register a further package; roots can then be analyzed under it.
    pub fn add_package(
        &mut self,
        name: &str,
        role: PackageRole,
        dependencies: Vec<PackageId>,
    ) -> PackageId {
        self.packages
            .add_package(self.interner.intern(name), role, dependencies)
    }

    /// Analyze roots under the session's source package. Returns whether
    /// analysis produced no errors.
    pub fn analyze(&mut self, roots: &[NodeId]) -> bool {
        self.analyze_in(roots, self.root_package)
    }

    /// Analyze roots attributed to a specific package.
    pub fn analyze_in(&mut self, roots: &[NodeId], package: PackageId) -> bool {
        debug!(roots = roots.len(), "analysis start");
        let mut analyzer = Analyzer::new(
            &mut self.arena,
            &self.interner,
            &mut self.pool,
            &mut self.program,
            &mut self.packages,
            &mut self.sink,
        );
        let ctx = Context::root(ScopeId::ROOT, package);
        analyzer.analyze(roots, &ctx);
        debug!(
            errors = self.sink.error_count(),
            warnings = self.sink.warning_count(),
            "analysis finished"
        );
        !self.sink.has_errors()
    }

    /// The type recorded for a node, if analysis assigned one.
    pub fn result_type(&self, node: NodeId) -> Option<Idx> {
        let slot = self.arena.result(node);
        (!slot.is_none()).then(|| Idx::from_raw(slot.raw()))
    }
}

impl Default for AnalysisSession {
    fn default() -> Self {
        Self::new()
    }
}
