//! The analysis driver.
//!
//! One [`Analyzer`] exists per analysis session. It owns the scheduler
//! and the call graph and borrows everything else (tree, pool, program,
//! diagnostics) from the session, so deferred tasks can be plain
//! closures over `&mut Analyzer`.
//!
//! Analysis proceeds in two movements: an immediate declaration walk
//! that registers every definition and defers the rest, then the
//! phase-ordered drain of the deferred queues. Anything deferred to a
//! phase that has already started runs immediately instead.

mod attrs;
mod decl;
mod expr;
mod types;

use lyra_diagnostic::{Diagnostic, DiagnosticSink, ErrorCode};
use lyra_ir::{Name, NodeArena, NodeId, Span, StringInterner};
use lyra_types::{Idx, Pool, Tag};
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::generalize::{BodyState, CallGraph, VertexId};
use crate::reach::ReachValidator;
use crate::sched::{Context, Scheduler};
use crate::{DefId, PackageGraph, Phase, Program, WellKnownNames};

pub struct Analyzer<'a> {
    pub(crate) arena: &'a mut NodeArena,
    pub(crate) interner: &'a StringInterner,
    pub(crate) pool: &'a mut Pool,
    pub(crate) program: &'a mut Program,
    pub(crate) packages: &'a mut PackageGraph,
    pub(crate) sink: &'a mut DiagnosticSink,
    pub(crate) names: WellKnownNames,
    pub(crate) sched: Scheduler,
    pub(crate) graph: CallGraph,
    /// Negative return flow per inferred-return function; `return` and
    /// tail values constrain into it.
    pub(crate) ret_flows: FxHashMap<DefId, Idx>,
    /// Nodes whose evaluation suspends; read by reachability validation.
    pub(crate) suspending: FxHashSet<NodeId>,
    /// Nodes whose evaluation can fail; a condition built from one is a
    /// valid failure context even when its type is not `logic`.
    pub(crate) deciding: FxHashSet<NodeId>,
    /// Definitions carrying an explicit override marker, pending linkage.
    pub(crate) wants_override: FxHashSet<DefId>,
    /// Aliases currently being resolved, for cycle detection.
    pub(crate) resolving_aliases: FxHashSet<DefId>,
    /// Names of user-declared attribute classes; attributes with these
    /// names are accepted without further meaning.
    pub(crate) attribute_classes: FxHashSet<Name>,
}

impl<'a> Analyzer<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        arena: &'a mut NodeArena,
        interner: &'a StringInterner,
        pool: &'a mut Pool,
        program: &'a mut Program,
        packages: &'a mut PackageGraph,
        sink: &'a mut DiagnosticSink,
    ) -> Self {
        let names = WellKnownNames::new(interner);
        Analyzer {
            arena,
            interner,
            pool,
            program,
            packages,
            sink,
            names,
            sched: Scheduler::new(),
            graph: CallGraph::new(),
            ret_flows: FxHashMap::default(),
            suspending: FxHashSet::default(),
            deciding: FxHashSet::default(),
            wants_override: FxHashSet::default(),
            resolving_aliases: FxHashSet::default(),
            attribute_classes: FxHashSet::default(),
        }
    }

    /// Analyze a set of root nodes under one context, then drain every
    /// phase in order.
    pub fn analyze(&mut self, roots: &[NodeId], ctx: &Context) {
        for &root in roots {
            self.declare(root, ctx);
        }
        self.run_phases();
    }

    /// Run `task` now if `phase` has already started, otherwise queue it
    /// with a snapshot of `ctx`.
    pub(crate) fn defer<F>(&mut self, phase: Phase, ctx: &Context, task: F)
    where
        F: for<'b> FnOnce(&mut Analyzer<'b>, &Context) + 'static,
    {
        if self.sched.is_immediate(phase) {
            task(self, ctx);
        } else {
            self.sched.enqueue(phase, ctx.clone(), Box::new(task));
        }
    }

    fn run_phases(&mut self) {
        for phase in Phase::ALL {
            debug!(%phase, "phase start");
            self.sched.set_current(phase);
            while let Some((ctx, task)) = self.sched.pop(phase) {
                task(self, &ctx);
            }
        }
        if self.sched.pending() != 0 {
            // A task enqueued from the final phase into itself would have
            // run immediately, so anything left indicates a driver bug.
            self.sink.emit(Diagnostic::error(
                ErrorCode::E9001,
                Span::DUMMY,
                "analysis finished with deferred work remaining",
            ));
        }
    }

    // ========================================
    // Function references and generalization
    // ========================================

    /// The type a reference to function `def` has at this point.
    ///
    /// Explicitly typed functions instantiate their generalized type
    /// directly. Inferred-return functions are analyzed on first
    /// reference; a reference back into a function currently being
    /// analyzed (recursion, direct or mutual) is monomorphic.
    pub(crate) fn reference_function(&mut self, def: DefId, ctx: &Context) -> Idx {
        let Some(vertex) = self.graph.vertex_of(def) else {
            return self.instantiated_type(def);
        };
        match self.graph.state(vertex) {
            BodyState::Done => self.instantiated_type(def),
            BodyState::Analyzing => {
                if self.graph.is_on_stack(vertex) {
                    self.graph.note_reference(vertex);
                }
                self.program.def(def).ty
            }
            BodyState::Pending(_) => {
                self.visit_function(vertex, def, ctx);
                self.instantiated_type(def)
            }
        }
    }

    /// Make sure a function's type is ready to be read: analyze a pending
    /// inferred-return body now, or record the recursive reference if it
    /// is already being analyzed up the stack.
    pub(crate) fn prepare_function(&mut self, def: DefId, ctx: &Context) {
        if let Some(vertex) = self.graph.vertex_of(def) {
            match self.graph.state(vertex) {
                BodyState::Pending(_) => self.visit_function(vertex, def, ctx),
                BodyState::Analyzing => {
                    if self.graph.is_on_stack(vertex) {
                        self.graph.note_reference(vertex);
                    }
                }
                BodyState::Done => {}
            }
        }
    }

    fn instantiated_type(&mut self, def: DefId) -> Idx {
        let d = self.program.def(def);
        if d.type_vars.is_empty() {
            d.ty
        } else {
            let (ty, vars) = (d.ty, d.type_vars.clone());
            self.pool.instantiate(ty, &vars)
        }
    }

    fn visit_function(&mut self, vertex: VertexId, def: DefId, ctx: &Context) {
        let body = self.graph.begin_visit(vertex);
        let d = self.program.def(def);
        let scope = d.inner_scope.unwrap_or(d.scope);
        let effects = self.pool.function_effects(d.ty);
        let body_ctx = ctx.in_function(def, scope, effects);
        self.check_function_body(def, body, &body_ctx);
        if let Some(component) = self.graph.finish_visit(vertex) {
            for member in component {
                self.finalize_inferred(member);
            }
        }
    }

    /// Force analysis of any inferred-return function nobody referenced.
    pub(crate) fn force_function(&mut self, def: DefId, ctx: &Context) {
        if let Some(vertex) = self.graph.vertex_of(def) {
            if let BodyState::Pending(_) = self.graph.state(vertex) {
                self.visit_function(vertex, def, ctx);
            }
        }
    }

    fn finalize_inferred(&mut self, def: DefId) {
        let raw = self.program.def(def).ty;
        let Some((ty, vars)) = self.pool.generalize(raw) else {
            let d = self.program.def(def);
            let name = self.display_name(d.name);
            self.sink.emit(
                Diagnostic::error(
                    ErrorCode::E2104,
                    d.span,
                    format!("the inferred type of `{name}` refers to itself"),
                )
                .with_note("give the function an explicit return type"),
            );
            return;
        };
        // A variable appearing only in the return type means the result
        // depends on nothing but the function's own recursion.
        let params = self.pool.function_params(ty);
        let unbound = vars
            .iter()
            .any(|&v| !params.iter().any(|&p| self.type_mentions(p, v)));
        if unbound {
            let d = self.program.def(def);
            let name = self.display_name(d.name);
            self.sink.emit(
                Diagnostic::error(
                    ErrorCode::E2104,
                    d.span,
                    format!("the return type of `{name}` cannot be inferred from its uses"),
                )
                .with_note("give the function an explicit return type"),
            );
        }
        trace!(?def, vars = vars.len(), "generalized");
        let d = self.program.def_mut(def);
        d.ty = ty;
        d.type_vars = vars;
    }

    /// Whether `var` (a type-variable nominal) occurs anywhere in `ty`.
    pub(crate) fn type_mentions(&self, ty: Idx, var: Idx) -> bool {
        fn walk(pool: &Pool, ty: Idx, var: Idx, depth: usize) -> bool {
            if depth > 64 {
                return false;
            }
            let ty = pool.normal(ty);
            if ty == var {
                return true;
            }
            match pool.tag(ty) {
                Tag::Array => walk(pool, pool.array_elem(ty), var, depth + 1),
                Tag::Option => walk(pool, pool.option_inner(ty), var, depth + 1),
                Tag::Map => {
                    walk(pool, pool.map_key(ty), var, depth + 1)
                        || walk(pool, pool.map_value(ty), var, depth + 1)
                }
                Tag::Pointer | Tag::Reference | Tag::TypeOf => {
                    walk(pool, pool.negative_slot(ty), var, depth + 1)
                        || walk(pool, pool.positive_slot(ty), var, depth + 1)
                }
                Tag::Tuple => pool
                    .tuple_elems(ty)
                    .iter()
                    .any(|&e| walk(pool, e, var, depth + 1)),
                Tag::Function => {
                    pool.function_params(ty)
                        .iter()
                        .any(|&p| walk(pool, p, var, depth + 1))
                        || walk(pool, pool.function_return(ty), var, depth + 1)
                }
                _ => false,
            }
        }
        walk(self.pool, ty, var, 0)
    }

    // ========================================
    // Shared reporting helpers
    // ========================================

    /// Constrain `found` to fit `expected`, reporting a mismatch.
    ///
    /// Stays silent when either side is unknown; whatever left it unknown
    /// has already been reported.
    pub(crate) fn constrain_or_report(
        &mut self,
        found: Idx,
        expected: Idx,
        span: Span,
        what: &str,
    ) {
        if found == Idx::UNKNOWN || expected == Idx::UNKNOWN {
            return;
        }
        if !self.pool.constrain(found, expected) {
            let found_s = self.pool.display(self.interner, found).to_string();
            let expected_s = self.pool.display(self.interner, expected).to_string();
            self.sink.emit(Diagnostic::error(
                ErrorCode::E2101,
                span,
                format!("{what} has type `{found_s}`, which does not fit `{expected_s}`"),
            ));
        }
    }

    pub(crate) fn display_name(&self, name: Name) -> String {
        self.interner
            .resolve(name)
            .unwrap_or_else(|| "<unresolved>".to_string())
    }

    pub(crate) fn validate_reachability(&mut self, body: NodeId) {
        ReachValidator::new(
            self.arena,
            self.sink,
            self.names.ignore_unreachable,
            &self.suspending,
        )
        .validate(body);
    }

    /// Candidate definitions for a possibly qualified identifier.
    ///
    /// An unknown name or qualifier reports here and returns an empty
    /// set; callers stay silent on empty.
    pub(crate) fn resolve_candidates(
        &mut self,
        name: Name,
        qualifier: Option<Name>,
        ctx: &Context,
        span: Span,
    ) -> SmallVec<[DefId; 4]> {
        let candidates = match qualifier {
            None => self.program.lookup(ctx.scope, name),
            Some(q) => {
                let holders = self.program.lookup(ctx.scope, q);
                let scope = holders.iter().find_map(|&d| self.program.def(d).inner_scope);
                let Some(scope) = scope else {
                    let q = self.display_name(q);
                    self.sink.emit(Diagnostic::error(
                        ErrorCode::E2004,
                        span,
                        format!("`{q}` does not name a module, class, or enumeration"),
                    ));
                    return SmallVec::new();
                };
                self.program.lookup_qualified(scope, name)
            }
        };
        if candidates.is_empty() {
            let name = self.display_name(name);
            self.sink.emit(Diagnostic::error(
                ErrorCode::E2001,
                span,
                format!("unknown identifier `{name}`"),
            ));
        }
        candidates
    }
}
