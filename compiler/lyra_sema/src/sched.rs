//! Deferred task scheduling.
//!
//! A deferred task is a closure plus an immutable [`Context`] snapshot,
//! queued at one of the fixed [`Phase`]s. The scheduler is exactly a
//! priority work queue drained to exhaustion: within a phase tasks run in
//! enqueue order, tasks may enqueue into their own or a later phase, and a
//! task enqueued at a phase at or before the one currently executing runs
//! immediately instead of being queued.
//!
//! Tasks never fail structurally; they report diagnostics and complete.
//! There is no rollback: a task leaves whatever partial mutations it made.

use std::collections::VecDeque;

use lyra_types::{EffectSet, Idx};
use smallvec::SmallVec;

use crate::{Analyzer, DefId, PackageId, Phase, ScopeId};

/// Immutable snapshot of the ambient analysis state captured with a task.
#[derive(Clone, Debug)]
pub struct Context {
    /// Scope names resolve against.
    pub scope: ScopeId,
    /// Type of `Self` inside a class/interface body; `NONE` outside.
    pub self_ty: Idx,
    /// Enclosing function definition, if any.
    pub function: Option<DefId>,
    /// Package being analyzed.
    pub package: PackageId,
    /// Ambient allowed effect set.
    pub allowed_effects: EffectSet,
    /// Enclosing definitions, outermost first; used to propagate
    /// deprecated/experimental marks.
    pub enclosing: SmallVec<[DefId; 4]>,
}

impl Context {
    pub fn root(scope: ScopeId, package: PackageId) -> Self {
        Context {
            scope,
            self_ty: Idx::NONE,
            function: None,
            package,
            allowed_effects: EffectSet::MODULE_DEFAULT,
            enclosing: SmallVec::new(),
        }
    }

    #[must_use]
    pub fn in_scope(&self, scope: ScopeId) -> Self {
        Context {
            scope,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn in_function(&self, def: DefId, scope: ScopeId, allowed: EffectSet) -> Self {
        let mut ctx = self.clone();
        ctx.scope = scope;
        ctx.function = Some(def);
        ctx.allowed_effects = allowed;
        ctx.enclosing.push(def);
        ctx
    }

    #[must_use]
    pub fn entering(&self, def: DefId, scope: ScopeId) -> Self {
        let mut ctx = self.clone();
        ctx.scope = scope;
        ctx.enclosing.push(def);
        ctx
    }

    #[must_use]
    pub fn with_effects(&self, allowed: EffectSet) -> Self {
        let mut ctx = self.clone();
        ctx.allowed_effects = allowed;
        ctx
    }
}

type TaskFn = Box<dyn for<'a> FnOnce(&mut Analyzer<'a>, &Context)>;

struct Task {
    ctx: Context,
    run: TaskFn,
}

/// The phase-ordered work queues.
pub struct Scheduler {
    queues: [VecDeque<Task>; Phase::COUNT],
    current: Phase,
}

impl Scheduler {
    pub fn new() -> Self {
        Scheduler {
            queues: std::array::from_fn(|_| VecDeque::new()),
            current: Phase::Modules,
        }
    }

    /// The phase currently executing.
    pub fn current(&self) -> Phase {
        self.current
    }

    pub(crate) fn set_current(&mut self, phase: Phase) {
        debug_assert!(phase >= self.current);
        self.current = phase;
    }

    /// Whether a task for `phase` should run immediately rather than queue.
    pub(crate) fn is_immediate(&self, phase: Phase) -> bool {
        phase <= self.current
    }

    pub(crate) fn enqueue(&mut self, phase: Phase, ctx: Context, run: TaskFn) {
        debug_assert!(!self.is_immediate(phase));
        self.queues[phase.index()].push_back(Task { ctx, run });
    }

    pub(crate) fn pop(&mut self, phase: Phase) -> Option<(Context, TaskFn)> {
        self.queues[phase.index()]
            .pop_front()
            .map(|task| (task.ctx, task.run))
    }

    /// Tasks still queued; nonzero after the final phase signals an
    /// unresolved dependency.
    pub fn pending(&self) -> usize {
        self.queues.iter().map(VecDeque::len).sum()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
