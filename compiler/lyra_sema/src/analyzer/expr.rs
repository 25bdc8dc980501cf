//! Expression checking.
//!
//! Checking an expression resolves its names, constrains its types,
//! verifies its effects against the ambient allowed set, and records its
//! result type in the tree's side table. Unknown types silence dependent
//! checks; the expression that went unknown has already been reported.

use lyra_diagnostic::{Diagnostic, ErrorCode};
use lyra_ir::{NodeId, NodeKind, Span, TypeSlot};
use lyra_types::{EffectSet, Idx, Tag};
use smallvec::SmallVec;

use crate::effects::require_effects;
use crate::overload::{choose_symbol, resolve_call, NamePosition, OverloadOutcome, SymbolChoice};
use crate::sched::Context;
use crate::{DefId, DefKind, Phase, ScopeKind};

use super::Analyzer;

impl Analyzer<'_> {
    pub(crate) fn check_expr(&mut self, node: NodeId, ctx: &Context) -> Idx {
        let ty = self.check_expr_uncached(node, ctx);
        self.arena.set_result(node, TypeSlot::from_raw(ty.raw()));
        ty
    }

    #[allow(clippy::too_many_lines)]
    fn check_expr_uncached(&mut self, node: NodeId, ctx: &Context) -> Idx {
        let span = self.arena.span(node);
        match self.arena.kind(node).clone() {
            NodeKind::Error => Idx::UNKNOWN,

            NodeKind::IntLit(_) => Idx::INT,
            NodeKind::FloatLit(_) => Idx::FLOAT,
            NodeKind::LogicLit(_) => Idx::LOGIC,
            NodeKind::CharLit(_) => Idx::CHAR,
            NodeKind::StrLit(_) => Idx::STRING,

            NodeKind::Ident { name, qualifier } => {
                let candidates = self.resolve_candidates(name, qualifier, ctx, span);
                if candidates.is_empty() {
                    return Idx::UNKNOWN;
                }
                match choose_symbol(self.program, &candidates, NamePosition::Value) {
                    SymbolChoice::One(def) => self.value_of_def(def, ctx, span),
                    SymbolChoice::Functions(set) if set.len() == 1 => {
                        self.value_of_def(set[0], ctx, span)
                    }
                    SymbolChoice::Functions(_) | SymbolChoice::Collision(_) => {
                        let name = self.display_name(name);
                        self.sink.emit(Diagnostic::error(
                            ErrorCode::E2003,
                            span,
                            format!("`{name}` is ambiguous here"),
                        ));
                        Idx::UNKNOWN
                    }
                    SymbolChoice::FunctionsInTypePosition(_) | SymbolChoice::Nothing => {
                        Idx::UNKNOWN
                    }
                }
            }

            NodeKind::Call { callee, args } => self.check_call(node, callee, &args, false, ctx),
            NodeKind::FailCall { callee, args } => self.check_call(node, callee, &args, true, ctx),

            NodeKind::Assign { target, value } => {
                let target_ty = self.check_expr(target, ctx);
                let value_ty = self.check_expr(value, ctx);
                let normal = self.pool.normal(target_ty);
                if target_ty == Idx::UNKNOWN {
                    // Already reported.
                } else if self.pool.tag(normal) == Tag::Pointer {
                    let slot = self.pool.negative_slot(normal);
                    self.constrain_or_report(value_ty, slot, span, "assigned value");
                    require_effects(
                        self.sink,
                        EffectSet::WRITES,
                        ctx.allowed_effects,
                        span,
                        "assignment",
                    );
                } else {
                    self.sink.emit(Diagnostic::error(
                        ErrorCode::E2106,
                        span,
                        "assignment target is not mutable",
                    ));
                }
                Idx::VOID
            }

            NodeKind::If {
                cond,
                then_body,
                else_body,
            } => {
                self.check_cond(cond, ctx);
                let then_ty = self.check_expr(then_body, ctx);
                match else_body {
                    Some(else_body) => {
                        let else_ty = self.check_expr(else_body, ctx);
                        self.pool.join(then_ty, else_ty)
                    }
                    // Without an else branch the value is unusable.
                    None => Idx::VOID,
                }
            }

            NodeKind::Loop { body } => {
                self.check_expr(body, ctx);
                Idx::VOID
            }
            NodeKind::Break => Idx::FALSE,
            NodeKind::Return { value } => {
                let value_ty = match value {
                    Some(value) => self.check_expr(value, ctx),
                    None => Idx::VOID,
                };
                if let Some(def) = ctx.function {
                    self.constrain_return(def, value_ty, span);
                } // Outside a function the reachability pass reports it.
                Idx::FALSE
            }

            NodeKind::Defer { body } => {
                self.check_expr(body, ctx);
                Idx::VOID
            }
            NodeKind::Spawn { body } | NodeKind::Branch { body } => {
                // A spawned body runs concurrently with its own effect
                // allowance; it may suspend regardless of the spawning
                // context.
                let inner = ctx.with_effects(EffectSet::FUNCTION_DEFAULT | EffectSet::SUSPENDS);
                self.check_expr(body, &inner);
                Idx::VOID
            }

            NodeKind::Sync(children) => {
                self.check_concurrent(node, &children, span, "`sync`", ctx);
                let mut tys: SmallVec<[Idx; 4]> = SmallVec::new();
                let inner = ctx.with_effects(ctx.allowed_effects | EffectSet::SUSPENDS);
                for &child in &children {
                    tys.push(self.check_expr(child, &inner));
                }
                self.pool.tuple(&tys)
            }
            NodeKind::Race(children) => self.check_first_wins(node, &children, span, "`race`", ctx),
            NodeKind::Rush(children) => self.check_first_wins(node, &children, span, "`rush`", ctx),

            NodeKind::Tuple(elems) => {
                let mut tys: SmallVec<[Idx; 4]> = SmallVec::new();
                for &elem in &elems {
                    tys.push(self.check_expr(elem, ctx));
                }
                self.pool.tuple(&tys)
            }

            NodeKind::Block(children) => {
                let scope = self.program.new_scope(ScopeKind::Control, ctx.scope);
                let inner = ctx.in_scope(scope);
                let mut last = Idx::VOID;
                for &child in &children {
                    last = self.check_statement(child, &inner);
                }
                last
            }

            // Declarations nested in expression position.
            NodeKind::Module { .. }
            | NodeKind::ModuleAlias { .. }
            | NodeKind::Using { .. }
            | NodeKind::Class { .. }
            | NodeKind::Interface { .. }
            | NodeKind::Enum { .. }
            | NodeKind::Enumerator { .. }
            | NodeKind::Function { .. }
            | NodeKind::Data { .. }
            | NodeKind::TypeAlias { .. } => {
                self.declare(node, ctx);
                Idx::VOID
            }

            NodeKind::ArrayTy { .. }
            | NodeKind::MapTy { .. }
            | NodeKind::OptionTy { .. }
            | NodeKind::RefTy { .. }
            | NodeKind::FuncTy { .. } => {
                // A type expression in value position denotes the type
                // itself.
                let ty = self.resolve_type(node, ctx);
                self.pool.exact_type_of(ty)
            }
        }
    }

    fn check_statement(&mut self, node: NodeId, ctx: &Context) -> Idx {
        match self.arena.kind(node) {
            NodeKind::Data { .. }
            | NodeKind::Function { .. }
            | NodeKind::Class { .. }
            | NodeKind::Interface { .. }
            | NodeKind::Enum { .. }
            | NodeKind::TypeAlias { .. }
            | NodeKind::ModuleAlias { .. }
            | NodeKind::Using { .. } => {
                self.declare(node, ctx);
                Idx::VOID
            }
            _ => self.check_expr(node, ctx),
        }
    }

    // ========================================
    // Calls
    // ========================================

    #[allow(clippy::too_many_lines)]
    fn check_call(
        &mut self,
        node: NodeId,
        callee: NodeId,
        args: &[NodeId],
        failable: bool,
        ctx: &Context,
    ) -> Idx {
        let span = self.arena.span(node);
        let mut arg_tys: SmallVec<[Idx; 4]> = SmallVec::new();
        for &arg in args {
            arg_tys.push(self.check_expr(arg, ctx));
        }

        let fn_ty = if let NodeKind::Ident { name, qualifier } = *self.arena.kind(callee) {
            let candidates = self.resolve_candidates(name, qualifier, ctx, span);
            if candidates.is_empty() {
                return Idx::UNKNOWN;
            }
            match choose_symbol(self.program, &candidates, NamePosition::Call) {
                SymbolChoice::Functions(set) => {
                    // Typing a candidate may require analyzing its body
                    // first (inferred returns).
                    for &cand in &set {
                        self.prepare_function(cand, ctx);
                    }
                    match resolve_call(self.pool, self.program, &set, &arg_tys) {
                        OverloadOutcome::Resolved { def, ty } => {
                            self.use_definition(def, ctx, span);
                            self.record_package_use(def, ctx);
                            ty
                        }
                        OverloadOutcome::Undetermined => return Idx::UNKNOWN,
                        OverloadOutcome::NoMatch => {
                            self.report_no_match(name, &set, args.len(), span);
                            return Idx::UNKNOWN;
                        }
                        OverloadOutcome::Ambiguous(matching) => {
                            let shown = self.display_name(name);
                            let mut d = Diagnostic::error(
                                ErrorCode::E2302,
                                span,
                                format!("call to `{shown}` is ambiguous"),
                            );
                            for &m in &matching {
                                let ty = self.program.def(m).ty;
                                let rendered = self.pool.display(self.interner, ty).to_string();
                                d = d.with_note(format!("candidate: `{rendered}`"));
                            }
                            self.sink.emit(d);
                            return Idx::UNKNOWN;
                        }
                    }
                }
                SymbolChoice::One(def) => {
                    let kind = self.program.def(def).kind;
                    if kind.is_type() {
                        // Constructor call: the value is an instance.
                        self.use_definition(def, ctx, span);
                        self.record_package_use(def, ctx);
                        return self.program.def(def).ty;
                    }
                    self.value_of_def(def, ctx, span)
                }
                SymbolChoice::Collision(_) => {
                    let shown = self.display_name(name);
                    self.sink.emit(Diagnostic::error(
                        ErrorCode::E2303,
                        span,
                        format!("`{shown}` is ambiguous between a type and functions"),
                    ));
                    return Idx::UNKNOWN;
                }
                SymbolChoice::FunctionsInTypePosition(_) | SymbolChoice::Nothing => {
                    return Idx::UNKNOWN;
                }
            }
        } else {
            self.check_expr(callee, ctx)
        };

        if fn_ty == Idx::UNKNOWN {
            return Idx::UNKNOWN;
        }
        let fn_ty = self.pool.normal(fn_ty);
        if self.pool.tag(fn_ty) != Tag::Function {
            let rendered = self.pool.display(self.interner, fn_ty).to_string();
            self.sink.emit(Diagnostic::error(
                ErrorCode::E2101,
                span,
                format!("expression of type `{rendered}` is not callable"),
            ));
            return Idx::UNKNOWN;
        }

        let params = self.pool.function_params(fn_ty);
        if params.len() != args.len() {
            self.sink.emit(Diagnostic::error(
                ErrorCode::E2108,
                span,
                format!(
                    "this call has {} argument(s), but the function takes {}",
                    args.len(),
                    params.len()
                ),
            ));
        }
        for (i, (&arg_ty, &param)) in arg_tys.iter().zip(params.iter()).enumerate() {
            let arg_span = args.get(i).map_or(span, |&a| self.arena.span(a));
            self.constrain_or_report(arg_ty, param, arg_span, "argument");
        }

        let effects = self.pool.function_effects(fn_ty);
        if effects.contains(EffectSet::DECIDES) && !failable {
            self.sink.emit(
                Diagnostic::error(
                    ErrorCode::E2203,
                    span,
                    "call to a failable function must use square brackets",
                )
                .with_note("write `f[..]` instead of `f(..)`"),
            );
        } else if failable && !effects.contains(EffectSet::DECIDES) {
            self.sink.emit(Diagnostic::error(
                ErrorCode::E2203,
                span,
                "callee cannot fail; use a normal call",
            ));
        }
        require_effects(self.sink, effects, ctx.allowed_effects, span, "this call");

        if effects.contains(EffectSet::SUSPENDS) {
            self.suspending.insert(node);
        }
        if effects.contains(EffectSet::DECIDES) {
            self.deciding.insert(node);
        }
        self.pool.function_return(fn_ty)
    }

    fn report_no_match(&mut self, name: lyra_ir::Name, set: &[DefId], arity: usize, span: Span) {
        let all_wrong_arity = set.iter().all(|&d| {
            let ty = self.program.def(d).ty;
            self.pool.tag(ty) == Tag::Function && self.pool.function_param_count(ty) != arity
        });
        let shown = self.display_name(name);
        if all_wrong_arity {
            self.sink.emit(Diagnostic::error(
                ErrorCode::E2108,
                span,
                format!("no overload of `{shown}` takes {arity} argument(s)"),
            ));
            return;
        }
        let mut d = Diagnostic::error(
            ErrorCode::E2301,
            span,
            format!("no overload of `{shown}` accepts these arguments"),
        );
        for &m in set {
            let ty = self.program.def(m).ty;
            let rendered = self.pool.display(self.interner, ty).to_string();
            d = d.with_note(format!("candidate: `{rendered}`"));
        }
        self.sink.emit(d);
    }

    // ========================================
    // Conditions, returns, concurrency
    // ========================================

    /// A condition is a failure context: failure-capable expressions are
    /// allowed, and anything else must be a logic value.
    fn check_cond(&mut self, cond: NodeId, ctx: &Context) {
        let inner = ctx.with_effects(ctx.allowed_effects | EffectSet::DECIDES);
        let ty = self.check_expr(cond, &inner);
        if ty == Idx::UNKNOWN || self.deciding.contains(&cond) {
            return;
        }
        if !self.pool.constrain(ty, Idx::LOGIC) {
            let span = self.arena.span(cond);
            self.sink.emit(Diagnostic::error(
                ErrorCode::E2107,
                span,
                "condition must be a logic value or an expression that can fail",
            ));
        }
    }

    fn constrain_return(&mut self, def: DefId, value_ty: Idx, span: Span) {
        if let Some(&rneg) = self.ret_flows.get(&def) {
            self.constrain_or_report(value_ty, rneg, span, "returned value");
            return;
        }
        let fn_ty = self.program.def(def).ty;
        if self.pool.tag(fn_ty) != Tag::Function {
            return;
        }
        let ret = self.pool.function_return(fn_ty);
        if ret == Idx::VOID && value_ty == Idx::VOID {
            return;
        }
        self.constrain_or_report(value_ty, ret, span, "returned value");
    }

    fn check_concurrent(
        &mut self,
        node: NodeId,
        _children: &[NodeId],
        span: Span,
        what: &str,
        ctx: &Context,
    ) {
        require_effects(
            self.sink,
            EffectSet::SUSPENDS,
            ctx.allowed_effects,
            span,
            what,
        );
        self.suspending.insert(node);
    }

    fn check_first_wins(
        &mut self,
        node: NodeId,
        children: &[NodeId],
        span: Span,
        what: &str,
        ctx: &Context,
    ) -> Idx {
        self.check_concurrent(node, children, span, what, ctx);
        let inner = ctx.with_effects(ctx.allowed_effects | EffectSet::SUSPENDS);
        let mut result = Idx::FALSE;
        for &child in children {
            let ty = self.check_expr(child, &inner);
            result = self.pool.join(result, ty);
        }
        result
    }

    // ========================================
    // Definition references
    // ========================================

    pub(crate) fn value_of_def(&mut self, def: DefId, ctx: &Context, span: Span) -> Idx {
        self.use_definition(def, ctx, span);
        self.record_package_use(def, ctx);
        let d = self.program.def(def);
        match d.kind {
            DefKind::Function => self.reference_function(def, ctx),
            DefKind::Data | DefKind::Enumerator | DefKind::TypeVariable => d.ty,
            DefKind::Class | DefKind::Interface | DefKind::Enumeration | DefKind::TypeAlias => {
                let ty = d.ty;
                self.pool.exact_type_of(ty)
            }
            DefKind::Module | DefKind::ModuleAlias => {
                let name = self.display_name(d.name);
                self.sink.emit(Diagnostic::error(
                    ErrorCode::E2105,
                    span,
                    format!("`{name}` is a module, not a value"),
                ));
                Idx::UNKNOWN
            }
        }
    }

    // ========================================
    // Function bodies
    // ========================================

    /// Check a function body against its signature, and queue the body
    /// for reachability validation.
    pub(crate) fn check_function_body(&mut self, def: DefId, body: NodeId, ctx: &Context) {
        let body_ty = self.check_expr(body, ctx);
        let span = self.arena.span(body);
        // A diverging tail (every path returns) needs no constraint.
        if body_ty != Idx::FALSE {
            if let Some(&rneg) = self.ret_flows.get(&def) {
                self.constrain_or_report(body_ty, rneg, span, "function body");
            } else {
                let fn_ty = self.program.def(def).ty;
                if self.pool.tag(fn_ty) == Tag::Function {
                    let ret = self.pool.function_return(fn_ty);
                    if ret != Idx::VOID {
                        self.constrain_or_report(body_ty, ret, span, "function body");
                    }
                }
            }
        }
        self.defer(Phase::FinalValidation, ctx, move |a, _| {
            a.validate_reachability(body);
        });
    }
}
