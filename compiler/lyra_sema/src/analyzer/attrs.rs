//! Attribute application and use-site validation.
//!
//! Attribute names are resolved against the fixed vocabulary (access
//! levels, markers, effects) plus user-declared attribute classes, which
//! are registered one phase earlier so every application phase sees the
//! complete set. Use-site consequences of attributes (accessibility,
//! deprecation, override linkage) are validated after attributes have
//! been applied and propagated, whenever the use itself was analyzed.

use lyra_diagnostic::{Diagnostic, ErrorCode};
use lyra_ir::{NodeId, Span};
use smallvec::SmallVec;

use crate::effects::{effect_class, effect_tag};
use crate::sched::Context;
use crate::{AccessLevel, DefId, DefKind, Phase, ScopeId, ScopeKind};

use super::Analyzer;

impl Analyzer<'_> {
    /// Apply every attribute on `node` to its definition.
    pub(crate) fn apply_attributes(&mut self, def: DefId, node: NodeId, ctx: &Context) {
        let kind = self.program.def(def).kind;
        let is_member = matches!(
            self.program.scope(self.program.def(def).scope).kind,
            ScopeKind::Class | ScopeKind::Interface
        );
        let mut wants_override = false;
        let names = self.names.clone();

        for attr in self.arena.attrs(node).to_vec() {
            let name = attr.name;
            if name == names.public {
                self.program.def_mut(def).access = AccessLevel::Public;
            } else if name == names.internal {
                self.program.def_mut(def).access = AccessLevel::Internal;
            } else if name == names.private {
                self.program.def_mut(def).access = AccessLevel::Private;
            } else if name == names.scoped {
                self.program.def_mut(def).access = AccessLevel::Scoped(SmallVec::new());
            } else if name == names.protected {
                if is_member {
                    self.program.def_mut(def).access = AccessLevel::Protected;
                } else {
                    self.misplaced(attr.span, "protected", "class and interface members");
                }
            } else if name == names.override_ {
                if is_member {
                    wants_override = true;
                } else {
                    self.misplaced(attr.span, "override", "class and interface members");
                }
            } else if name == names.deprecated {
                self.program.def_mut(def).deprecated = true;
            } else if name == names.experimental {
                self.program.def_mut(def).experimental = true;
            } else if name == names.ignore_unreachable {
                self.misplaced(attr.span, "ignore_unreachable", "statements");
            } else if name == names.attribute {
                if kind != DefKind::Class {
                    self.misplaced(attr.span, "attribute", "classes");
                }
                // Valid uses were registered in the previous phase.
            } else if effect_class(&names, name).is_some() || effect_tag(&names, name).is_some() {
                // Consumed by signature resolution on functions.
                if kind != DefKind::Function {
                    self.misplaced(attr.span, "an effect", "functions");
                }
            } else if self.attribute_classes.contains(&name) {
                // User attribute: carried, no semantics here.
            } else {
                let shown = self.display_name(name);
                self.sink.emit(Diagnostic::error(
                    ErrorCode::E2501,
                    attr.span,
                    format!("unknown attribute `{shown}`"),
                ));
            }
        }

        if wants_override && self.wants_override.insert(def) {
            self.defer(Phase::ValidateAttributes, ctx, move |a, _| {
                a.validate_override(def);
            });
        }
    }

    fn misplaced(&mut self, span: Span, what: &str, allowed_on: &str) {
        self.sink.emit(Diagnostic::error(
            ErrorCode::E2502,
            span,
            format!("{what} only applies to {allowed_on}"),
        ));
    }

    /// Deprecation and experimental marks flow from enclosing definitions
    /// into their members.
    pub(crate) fn propagate_marks(&mut self, def: DefId, ctx: &Context) {
        let inherited_deprecated = ctx
            .enclosing
            .iter()
            .any(|&e| self.program.def(e).deprecated);
        let inherited_experimental = ctx
            .enclosing
            .iter()
            .any(|&e| self.program.def(e).experimental);
        let d = self.program.def_mut(def);
        d.deprecated |= inherited_deprecated;
        d.experimental |= inherited_experimental;
    }

    // ========================================
    // Override linkage
    // ========================================

    pub(crate) fn validate_override(&mut self, def: DefId) {
        let d = self.program.def(def);
        let (name, kind, scope, span, ty) = (d.name, d.kind, d.scope, d.span, d.ty);
        let supers = self.program.scope(scope).supers.clone();
        let mut ancestors: SmallVec<[DefId; 4]> = SmallVec::new();
        for sup in supers {
            for cand in self.program.lookup_qualified(sup, name) {
                if self.program.def(cand).kind == kind && !ancestors.contains(&cand) {
                    ancestors.push(cand);
                }
            }
        }
        let shown = self.display_name(name);
        let Some(&ancestor) = ancestors.first() else {
            self.sink.emit(Diagnostic::error(
                ErrorCode::E2504,
                span,
                format!("`{shown}` does not override anything"),
            ));
            return;
        };
        let ancestor_ty = self.program.def(ancestor).ty;
        if !self.pool.is_subtype(ty, ancestor_ty) {
            let own = self.pool.display(self.interner, ty).to_string();
            let base = self.pool.display(self.interner, ancestor_ty).to_string();
            self.sink.emit(
                Diagnostic::error(
                    ErrorCode::E2505,
                    span,
                    format!("`{shown}` has type `{own}`, incompatible with the overridden `{base}`"),
                )
                .with_note("an override must be usable wherever the original is"),
            );
            return;
        }
        self.program.def_mut(def).overridden = Some(ancestor);
    }

    // ========================================
    // Use sites
    // ========================================

    /// Record a reference to a definition. The consequences that depend
    /// on attributes are validated once attributes are final.
    pub(crate) fn use_definition(&mut self, def: DefId, ctx: &Context, span: Span) {
        self.defer(Phase::ValidateAttributes, ctx, move |a, ctx| {
            a.validate_use(def, ctx, span);
        });
    }

    fn validate_use(&mut self, def: DefId, ctx: &Context, span: Span) {
        let d = self.program.def(def);
        let name = self.display_name(d.name);

        if d.deprecated
            && !ctx
                .enclosing
                .iter()
                .any(|&e| self.program.def(e).deprecated)
        {
            self.sink.emit(Diagnostic::warning(
                ErrorCode::E2506,
                span,
                format!("`{name}` is deprecated"),
            ));
        }
        if d.experimental
            && !ctx
                .enclosing
                .iter()
                .any(|&e| self.program.def(e).experimental)
        {
            self.sink.emit(
                Diagnostic::error(
                    ErrorCode::E2507,
                    span,
                    format!("`{name}` is experimental"),
                )
                .with_note("mark the using definition experimental to accept it"),
            );
        }

        self.validate_access(def, ctx, span, &name);
        self.validate_package(def, ctx, span, &name);
    }

    fn validate_access(&mut self, def: DefId, ctx: &Context, span: Span, name: &str) {
        let d = self.program.def(def);
        let allowed = match &d.access {
            AccessLevel::Public => true,
            AccessLevel::Internal => d.package == ctx.package,
            AccessLevel::Private => self.scope_within(ctx.scope, d.scope),
            AccessLevel::Protected => {
                let member_scope = d.scope;
                self.scope_within(ctx.scope, member_scope)
                    || self.within_subclass_of(ctx.scope, member_scope)
            }
            AccessLevel::Scoped(modules) => {
                let scopes: SmallVec<[ScopeId; 2]> = modules
                    .iter()
                    .filter_map(|&m| self.program.def(m).inner_scope)
                    .collect();
                scopes.iter().any(|&s| self.scope_within(ctx.scope, s))
            }
        };
        if !allowed {
            let level = self.program.def(def).access.describe();
            self.sink.emit(Diagnostic::error(
                ErrorCode::E2503,
                span,
                format!("`{name}` is {level} and not accessible from here"),
            ));
        }
    }

    fn validate_package(&mut self, def: DefId, ctx: &Context, span: Span, name: &str) {
        let d = self.program.def(def);
        if d.package == ctx.package {
            return;
        }
        if !self.packages.depends_on(ctx.package, d.package) {
            let pkg = self.display_name(self.packages.name(d.package));
            self.sink.emit(
                Diagnostic::error(
                    ErrorCode::E2503,
                    span,
                    format!("`{name}` lives in package `{pkg}`, which this package does not depend on"),
                )
                .with_note("declare the dependency to use it"),
            );
        }
    }

    fn scope_within(&self, mut inner: ScopeId, outer: ScopeId) -> bool {
        loop {
            if inner == outer {
                return true;
            }
            match self.program.scope(inner).parent {
                Some(parent) => inner = parent,
                None => return false,
            }
        }
    }

    /// Whether `scope` sits inside a class whose inheritance reaches
    /// `target` (the protected member's declaring scope).
    fn within_subclass_of(&self, mut scope: ScopeId, target: ScopeId) -> bool {
        loop {
            let s = self.program.scope(scope);
            if matches!(s.kind, ScopeKind::Class | ScopeKind::Interface)
                && self.inherits_from(scope, target)
            {
                return true;
            }
            match s.parent {
                Some(parent) => scope = parent,
                None => return false,
            }
        }
    }

    fn inherits_from(&self, scope: ScopeId, target: ScopeId) -> bool {
        let mut work: SmallVec<[ScopeId; 4]> = SmallVec::new();
        let mut seen: SmallVec<[ScopeId; 8]> = SmallVec::new();
        work.push(scope);
        while let Some(current) = work.pop() {
            if current == target {
                return true;
            }
            if seen.contains(&current) {
                continue;
            }
            seen.push(current);
            work.extend_from_slice(&self.program.scope(current).supers);
        }
        false
    }
}
