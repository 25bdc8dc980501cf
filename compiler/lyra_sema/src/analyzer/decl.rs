//! The immediate declaration walk.
//!
//! Every declaration node creates its definition the moment it is seen,
//! so later lookups always find a target even when its type is not
//! resolved yet. Everything that needs other declarations (imports,
//! type expressions, supertype links, bodies, attributes) is deferred to
//! its phase with a context snapshot.
//!
//! Module declarations with the same name in the same scope merge into
//! one definition; all other same-name collisions except function
//! overloads are duplicates.

use lyra_diagnostic::{Diagnostic, ErrorCode};
use lyra_ir::{Name, NodeId, NodeKind, Span};
use lyra_types::{EffectSet, Idx, NominalInfo, NominalKind};
use smallvec::SmallVec;

use crate::effects::{effect_class, effect_tag};
use crate::sched::Context;
use crate::{DefId, DefKind, Definition, Phase, ScopeKind};

use super::Analyzer;

impl Analyzer<'_> {
    /// Declare one node. Non-declaration nodes in declaration position
    /// are module-level expressions, checked in their phase.
    pub(crate) fn declare(&mut self, node: NodeId, ctx: &Context) {
        let span = self.arena.span(node);
        match self.arena.kind(node).clone() {
            NodeKind::Error => {}

            NodeKind::Module { name, members } => self.declare_module(node, name, &members, ctx),
            NodeKind::ModuleAlias { name, target } => {
                self.declare_module_alias(node, name, target, ctx, span);
            }
            NodeKind::Using { target } => {
                self.defer(Phase::Imports, ctx, move |a, ctx| {
                    a.resolve_using(target, ctx);
                });
            }
            NodeKind::Class {
                name,
                supers,
                members,
            } => self.declare_nominal(node, name, DefKind::Class, &supers, &members, ctx),
            NodeKind::Interface {
                name,
                supers,
                members,
            } => self.declare_nominal(node, name, DefKind::Interface, &supers, &members, ctx),
            NodeKind::Enum { name, enumerators } => {
                self.declare_enum(node, name, &enumerators, ctx);
            }
            NodeKind::Enumerator { name } => {
                // Only meaningful inside an enumeration body.
                self.check_duplicate(name, DefKind::Enumerator, ctx, span);
                self.create_def(node, name, DefKind::Enumerator, ctx, span);
            }
            NodeKind::Function {
                name,
                params,
                ret_ty,
                body,
            } => self.declare_function(node, name, &params, ret_ty, body, ctx),
            NodeKind::Data { name, ty, init } => {
                self.check_duplicate(name, DefKind::Data, ctx, span);
                let def = self.create_def(node, name, DefKind::Data, ctx, span);
                if let Some(ty) = ty {
                    self.defer(Phase::Types, ctx, move |a, ctx| {
                        let resolved = a.resolve_type(ty, ctx);
                        a.program.def_mut(def).ty = resolved;
                    });
                }
                if let Some(init) = init {
                    if ctx.function.is_some() {
                        // Local binding: checked in order with the
                        // enclosing body, so later statements see it.
                        self.check_data_init(def, init, ctx);
                    } else {
                        self.defer(Phase::NonFunctionExpressions, ctx, move |a, ctx| {
                            a.check_data_init(def, init, ctx);
                        });
                    }
                }
            }
            NodeKind::TypeAlias { name, target } => {
                self.check_duplicate(name, DefKind::TypeAlias, ctx, span);
                let def = self.create_def(node, name, DefKind::TypeAlias, ctx, span);
                self.defer(Phase::Types, ctx, move |a, ctx| {
                    a.resolve_alias(def, target, ctx);
                });
            }

            _ => {
                // Module-level expression.
                self.defer(Phase::NonFunctionExpressions, ctx, move |a, ctx| {
                    a.check_expr(node, ctx);
                });
            }
        }
    }

    // ========================================
    // Declaration forms
    // ========================================

    fn declare_module(&mut self, node: NodeId, name: Name, members: &[NodeId], ctx: &Context) {
        let span = self.arena.span(node);
        // Parts of the same module merge into one definition and scope.
        let existing = self
            .program
            .scope(ctx.scope)
            .named(name)
            .iter()
            .copied()
            .find(|&d| self.program.def(d).kind == DefKind::Module);
        let (def, scope) = match existing {
            Some(def) => {
                let scope = self.program.def(def).inner_scope.unwrap_or(ctx.scope);
                (def, scope)
            }
            None => {
                self.check_duplicate(name, DefKind::Module, ctx, span);
                let scope = self.program.new_scope(ScopeKind::Module, ctx.scope);
                let def = self.create_def(node, name, DefKind::Module, ctx, span);
                self.program.def_mut(def).inner_scope = Some(scope);
                self.program.scope_mut(scope).owner = Some(def);
                (def, scope)
            }
        };
        let inner = ctx.entering(def, scope);
        for &member in members {
            self.declare(member, &inner);
        }
    }

    fn declare_module_alias(
        &mut self,
        node: NodeId,
        name: Name,
        target: NodeId,
        ctx: &Context,
        span: Span,
    ) {
        self.check_duplicate(name, DefKind::ModuleAlias, ctx, span);
        let def = self.create_def(node, name, DefKind::ModuleAlias, ctx, span);
        self.defer(Phase::Imports, ctx, move |a, ctx| {
            if let Some(scope) = a.resolve_module_scope(target, ctx) {
                a.program.def_mut(def).inner_scope = Some(scope);
            }
        });
    }

    fn resolve_using(&mut self, target: NodeId, ctx: &Context) {
        if let Some(scope) = self.resolve_module_scope(target, ctx) {
            let here = ctx.scope;
            if !self.program.scope(here).usings.contains(&scope) {
                self.program.scope_mut(here).usings.push(scope);
            }
        }
    }

    /// Resolve a node expected to name a module; reports and returns
    /// `None` otherwise.
    fn resolve_module_scope(&mut self, target: NodeId, ctx: &Context) -> Option<crate::ScopeId> {
        let span = self.arena.span(target);
        let NodeKind::Ident { name, qualifier } = *self.arena.kind(target) else {
            self.sink.emit(Diagnostic::error(
                ErrorCode::E2006,
                span,
                "expected the name of a module",
            ));
            return None;
        };
        let candidates = self.resolve_candidates(name, qualifier, ctx, span);
        let module = candidates.iter().copied().find(|&d| {
            matches!(
                self.program.def(d).kind,
                DefKind::Module | DefKind::ModuleAlias
            )
        });
        match module.and_then(|d| {
            self.use_definition(d, ctx, span);
            self.record_package_use(d, ctx);
            self.program.def(d).inner_scope
        }) {
            Some(scope) => Some(scope),
            None => {
                if !candidates.is_empty() {
                    let name = self.display_name(name);
                    self.sink.emit(Diagnostic::error(
                        ErrorCode::E2006,
                        span,
                        format!("`{name}` is not a module"),
                    ));
                }
                None
            }
        }
    }

    fn declare_nominal(
        &mut self,
        node: NodeId,
        name: Name,
        kind: DefKind,
        supers: &[NodeId],
        members: &[NodeId],
        ctx: &Context,
    ) {
        let span = self.arena.span(node);
        self.check_duplicate(name, kind, ctx, span);
        let scope_kind = if kind == DefKind::Class {
            ScopeKind::Class
        } else {
            ScopeKind::Interface
        };
        let nominal_kind = if kind == DefKind::Class {
            NominalKind::Class
        } else {
            NominalKind::Interface
        };
        let scope = self.program.new_scope(scope_kind, ctx.scope);
        let def = self.create_def(node, name, kind, ctx, span);
        let nominal = self.pool.new_nominal(NominalInfo::new(nominal_kind, name));
        {
            let d = self.program.def_mut(def);
            d.inner_scope = Some(scope);
            d.ty = nominal;
        }
        self.program.scope_mut(scope).owner = Some(def);

        let super_nodes: Vec<NodeId> = supers.to_vec();
        self.defer(Phase::Types, ctx, move |a, ctx| {
            a.resolve_supers(def, nominal, &super_nodes, ctx);
        });
        self.defer(Phase::ValidateCycles, ctx, move |a, _| {
            a.validate_inheritance(def, nominal);
        });

        let mut inner = ctx.entering(def, scope);
        inner.self_ty = nominal;
        for &member in members {
            self.declare(member, &inner);
        }
    }

    fn resolve_supers(&mut self, def: DefId, nominal: Idx, supers: &[NodeId], ctx: &Context) {
        let is_interface = self.program.def(def).kind == DefKind::Interface;
        for &node in supers {
            let span = self.arena.span(node);
            let NodeKind::Ident { name, qualifier } = *self.arena.kind(node) else {
                self.sink.emit(Diagnostic::error(
                    ErrorCode::E2103,
                    span,
                    "supertype must name a class or interface",
                ));
                continue;
            };
            let candidates = self.resolve_candidates(name, qualifier, ctx, span);
            let Some(&target) = candidates
                .iter()
                .find(|&&d| matches!(self.program.def(d).kind, DefKind::Class | DefKind::Interface))
            else {
                if !candidates.is_empty() {
                    let name = self.display_name(name);
                    self.sink.emit(Diagnostic::error(
                        ErrorCode::E2103,
                        span,
                        format!("`{name}` is not a class or interface"),
                    ));
                }
                continue;
            };
            self.use_definition(target, ctx, span);
            self.record_package_use(target, ctx);
            let target_def = self.program.def(target);
            let target_ty = target_def.ty;
            let target_kind = target_def.kind;
            let target_scope = target_def.inner_scope;

            if target_kind == DefKind::Class {
                if is_interface {
                    self.sink.emit(Diagnostic::error(
                        ErrorCode::E2103,
                        span,
                        "an interface may only extend interfaces",
                    ));
                    continue;
                }
                if self.pool.nominal(nominal).superclass.is_some() {
                    self.sink.emit(Diagnostic::error(
                        ErrorCode::E2103,
                        span,
                        "a class may have at most one superclass",
                    ));
                    continue;
                }
                self.pool.nominal_mut(nominal).superclass = Some(target_ty);
            } else {
                let interfaces = &mut self.pool.nominal_mut(nominal).interfaces;
                if !interfaces.contains(&target_ty) {
                    interfaces.push(target_ty);
                }
            }
            if let (Some(own), Some(sup)) = (self.program.def(def).inner_scope, target_scope) {
                if !self.program.scope(own).supers.contains(&sup) {
                    self.program.scope_mut(own).supers.push(sup);
                }
            }
        }
    }

    /// Detect inheritance cycles and truncate the super links so later
    /// phases see an acyclic hierarchy.
    fn validate_inheritance(&mut self, def: DefId, nominal: Idx) {
        let chain = self.pool.superclass_chain(nominal);
        let class_cycle = chain.iter().skip(1).any(|&c| c == nominal);
        let interface_cycle = self
            .pool
            .nominal(nominal)
            .interfaces
            .clone()
            .iter()
            .any(|&i| self.pool.all_interfaces(i).contains(&nominal));
        if !(class_cycle || interface_cycle) {
            return;
        }
        let d = self.program.def(def);
        let name = self.display_name(d.name);
        let span = d.span;
        self.sink.emit(
            Diagnostic::error(
                ErrorCode::E2102,
                span,
                format!("`{name}` inherits from itself"),
            )
            .with_note("its supertype list is ignored from here on"),
        );
        let info = self.pool.nominal_mut(nominal);
        info.superclass = None;
        info.interfaces.clear();
        if let Some(scope) = self.program.def(def).inner_scope {
            self.program.scope_mut(scope).supers.clear();
        }
    }

    fn declare_enum(&mut self, node: NodeId, name: Name, enumerators: &[NodeId], ctx: &Context) {
        let span = self.arena.span(node);
        self.check_duplicate(name, DefKind::Enumeration, ctx, span);
        let scope = self.program.new_scope(ScopeKind::Enumeration, ctx.scope);
        let def = self.create_def(node, name, DefKind::Enumeration, ctx, span);
        let nominal = self
            .pool
            .new_nominal(NominalInfo::new(NominalKind::Enumeration, name));
        {
            let d = self.program.def_mut(def);
            d.inner_scope = Some(scope);
            d.ty = nominal;
        }
        self.program.scope_mut(scope).owner = Some(def);

        let inner = ctx.entering(def, scope);
        for &enumerator in enumerators {
            let espan = self.arena.span(enumerator);
            let NodeKind::Enumerator { name } = *self.arena.kind(enumerator) else {
                self.sink.emit(Diagnostic::error(
                    ErrorCode::E9001,
                    espan,
                    "enumeration bodies may only contain enumerators",
                ));
                continue;
            };
            self.check_duplicate(name, DefKind::Enumerator, &inner, espan);
            let e = self.create_def(enumerator, name, DefKind::Enumerator, &inner, espan);
            self.program.def_mut(e).ty = nominal;
        }
    }

    fn declare_function(
        &mut self,
        node: NodeId,
        name: Name,
        params: &[NodeId],
        ret_ty: Option<NodeId>,
        body: Option<NodeId>,
        ctx: &Context,
    ) {
        let span = self.arena.span(node);
        self.check_duplicate(name, DefKind::Function, ctx, span);
        let scope = self.program.new_scope(ScopeKind::Function, ctx.scope);
        let def = self.create_def(node, name, DefKind::Function, ctx, span);
        self.program.def_mut(def).inner_scope = Some(scope);
        self.program.scope_mut(scope).owner = Some(def);

        // Parameters are data definitions in the function scope.
        let inner = ctx.in_scope(scope);
        let mut param_defs: SmallVec<[(DefId, Option<NodeId>); 4]> = SmallVec::new();
        for &param in params {
            let pspan = self.arena.span(param);
            let NodeKind::Data { name, ty, init: _ } = *self.arena.kind(param) else {
                self.arena.replace_with_error(param);
                continue;
            };
            self.check_duplicate(name, DefKind::Data, &inner, pspan);
            let p = self.create_def(param, name, DefKind::Data, &inner, pspan);
            param_defs.push((p, ty));
        }

        let effects = self.declared_effects(node);
        self.defer(Phase::Types, ctx, move |a, ctx| {
            a.resolve_signature(def, &param_defs, ret_ty, body, effects, ctx);
        });
    }

    /// Fold the function's effect attributes into its declared set. An
    /// effect class replaces the default; tags extend it. Non-effect
    /// attributes are handled in the attribute phases.
    fn declared_effects(&mut self, node: NodeId) -> EffectSet {
        let mut base = None;
        let mut extra = EffectSet::empty();
        for attr in self.arena.attrs(node) {
            if let Some(class) = effect_class(&self.names, attr.name) {
                base = Some(class);
            } else if let Some(tag) = effect_tag(&self.names, attr.name) {
                extra |= tag;
            }
        }
        base.unwrap_or(EffectSet::FUNCTION_DEFAULT) | extra
    }

    fn resolve_signature(
        &mut self,
        def: DefId,
        params: &[(DefId, Option<NodeId>)],
        ret_ty: Option<NodeId>,
        body: Option<NodeId>,
        effects: EffectSet,
        ctx: &Context,
    ) {
        let scope = self.program.def(def).inner_scope.unwrap_or(ctx.scope);
        let inner = ctx.in_scope(scope);
        let mut param_slots: SmallVec<[Idx; 4]> = SmallVec::new();
        for &(param, ty_node) in params {
            let slot = match ty_node {
                Some(node) => {
                    let ty = self.resolve_type(node, &inner);
                    self.program.def_mut(param).ty = ty;
                    ty
                }
                None => {
                    // Untyped parameter: a flow pair. Arguments constrain
                    // the negative side; uses inside the body read the
                    // positive side.
                    let (neg, pos) = self.pool.new_flow_pair();
                    self.program.def_mut(param).ty = pos;
                    neg
                }
            };
            param_slots.push(slot);
        }

        match ret_ty {
            Some(node) => {
                let ret = self.resolve_type(node, &inner);
                self.program.def_mut(def).ty = self.pool.function(&param_slots, ret, effects);
                if let Some(body) = body {
                    self.defer(Phase::ClosedFunctionBodies, ctx, move |a, ctx| {
                        let scope = a.program.def(def).inner_scope.unwrap_or(ctx.scope);
                        let body_ctx = ctx.in_function(def, scope, effects);
                        a.check_function_body(def, body, &body_ctx);
                    });
                }
            }
            None => match body {
                Some(body) => {
                    let (rneg, rpos) = self.pool.new_flow_pair();
                    self.ret_flows.insert(def, rneg);
                    self.program.def_mut(def).ty =
                        self.pool.function(&param_slots, rpos, effects);
                    self.graph.register(def, body);
                    self.defer(Phase::OpenFunctionBodies, ctx, move |a, ctx| {
                        a.force_function(def, ctx);
                    });
                }
                None => {
                    // Neither a return type nor a body: an abstract
                    // member, returning nothing.
                    self.program.def_mut(def).ty =
                        self.pool.function(&param_slots, Idx::VOID, effects);
                }
            },
        }
    }

    // ========================================
    // Shared declaration plumbing
    // ========================================

    /// Create the definition and queue its attribute work.
    fn create_def(
        &mut self,
        node: NodeId,
        name: Name,
        kind: DefKind,
        ctx: &Context,
        span: Span,
    ) -> DefId {
        let mut definition = Definition::new(name, kind, ctx.scope, ctx.package, span);
        definition.node = Some(node);
        let def = self.program.new_def(definition);

        if kind == DefKind::Class
            && self
                .arena
                .attrs(node)
                .iter()
                .any(|a| a.name == self.names.attribute)
        {
            self.defer(Phase::AttributeClassAttributes, ctx, move |a, _| {
                let name = a.program.def(def).name;
                a.attribute_classes.insert(name);
            });
        }
        self.defer(Phase::Attributes, ctx, move |a, ctx| {
            a.apply_attributes(def, node, ctx);
        });
        self.defer(Phase::PropagateAttributes, ctx, move |a, ctx| {
            a.propagate_marks(def, ctx);
        });
        def
    }

    /// Same-scope name collisions: functions overload, module parts
    /// merge, everything else is a duplicate.
    fn check_duplicate(&mut self, name: Name, kind: DefKind, ctx: &Context, span: Span) {
        for &existing in self.program.scope(ctx.scope).named(name) {
            let other = self.program.def(existing).kind;
            let overloads = other == DefKind::Function && kind == DefKind::Function;
            let merges = other == DefKind::Module && kind == DefKind::Module;
            if !overloads && !merges {
                let shown = self.display_name(name);
                self.sink.emit(
                    Diagnostic::error(
                        ErrorCode::E2002,
                        span,
                        format!("`{shown}` is already defined in this scope"),
                    )
                    .with_note(format!("previous definition is a {}", other.describe())),
                );
                return;
            }
        }
    }

    pub(crate) fn record_package_use(&mut self, def: DefId, ctx: &Context) {
        let package = self.program.def(def).package;
        if package != ctx.package {
            self.packages.record_usage(ctx.package, package);
        }
    }

    /// Check the initializer of a data definition, inferring its type
    /// when none was declared.
    pub(crate) fn check_data_init(&mut self, def: DefId, init: NodeId, ctx: &Context) {
        let init_ty = self.check_expr(init, ctx);
        let declared = self.program.def(def).ty;
        let span = self.arena.span(init);
        if declared == Idx::UNKNOWN {
            self.program.def_mut(def).ty = init_ty;
        } else {
            self.constrain_or_report(init_ty, declared, span, "initializer");
        }
    }

    /// Resolve a type alias on demand; a cycle through aliases leaves the
    /// alias unknown.
    pub(crate) fn resolve_alias(&mut self, def: DefId, target: NodeId, ctx: &Context) {
        if self.program.def(def).ty != Idx::UNKNOWN {
            return;
        }
        if !self.resolving_aliases.insert(def) {
            let d = self.program.def(def);
            let name = self.display_name(d.name);
            let span = d.span;
            self.sink.emit(Diagnostic::error(
                ErrorCode::E2102,
                span,
                format!("type alias `{name}` refers to itself"),
            ));
            return;
        }
        let ty = self.resolve_type(target, ctx);
        self.resolving_aliases.remove(&def);
        if self.program.def(def).ty == Idx::UNKNOWN {
            self.program.def_mut(def).ty = ty;
        }
    }
}
