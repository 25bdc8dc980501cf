//! Type-expression resolution.
//!
//! Type expressions are ordinary nodes; resolving one writes its result
//! slot like any other expression and returns the pool index. Errors
//! resolve to the unknown type, which silences downstream checks.

use lyra_diagnostic::{Diagnostic, ErrorCode};
use lyra_ir::{NodeId, NodeKind, TypeSlot};
use lyra_types::{EffectSet, Idx};
use smallvec::SmallVec;

use crate::effects::{effect_class, effect_tag};
use crate::overload::{choose_symbol, NamePosition, SymbolChoice};
use crate::sched::Context;
use crate::DefKind;

use super::Analyzer;

impl Analyzer<'_> {
    pub(crate) fn resolve_type(&mut self, node: NodeId, ctx: &Context) -> Idx {
        let ty = self.resolve_type_uncached(node, ctx);
        self.arena.set_result(node, TypeSlot::from_raw(ty.raw()));
        ty
    }

    #[allow(clippy::too_many_lines)]
    fn resolve_type_uncached(&mut self, node: NodeId, ctx: &Context) -> Idx {
        let span = self.arena.span(node);
        match self.arena.kind(node).clone() {
            NodeKind::Error => Idx::UNKNOWN,

            NodeKind::Ident { name, qualifier } => {
                let candidates = self.resolve_candidates(name, qualifier, ctx, span);
                if candidates.is_empty() {
                    return Idx::UNKNOWN;
                }
                match choose_symbol(self.program, &candidates, NamePosition::Type) {
                    SymbolChoice::One(def) => {
                        let kind = self.program.def(def).kind;
                        if !kind.is_type() {
                            let name = self.display_name(name);
                            self.sink.emit(Diagnostic::error(
                                ErrorCode::E2105,
                                span,
                                format!("`{name}` is a {}, not a type", kind.describe()),
                            ));
                            return Idx::UNKNOWN;
                        }
                        self.use_definition(def, ctx, span);
                        self.record_package_use(def, ctx);
                        if kind == DefKind::TypeAlias {
                            self.force_alias(def, ctx);
                        }
                        self.program.def(def).ty
                    }
                    SymbolChoice::FunctionsInTypePosition(_) => {
                        let name = self.display_name(name);
                        self.sink.emit(Diagnostic::error(
                            ErrorCode::E2304,
                            span,
                            format!("`{name}` names only functions, which cannot be used as a type"),
                        ));
                        Idx::UNKNOWN
                    }
                    SymbolChoice::Collision(_) => {
                        let name = self.display_name(name);
                        self.sink.emit(Diagnostic::error(
                            ErrorCode::E2303,
                            span,
                            format!("`{name}` is ambiguous in type position"),
                        ));
                        Idx::UNKNOWN
                    }
                    SymbolChoice::Functions(_) | SymbolChoice::Nothing => Idx::UNKNOWN,
                }
            }

            NodeKind::ArrayTy { elem } => {
                let elem = self.resolve_type(elem, ctx);
                self.pool.array(elem)
            }
            NodeKind::OptionTy { inner } => {
                let inner = self.resolve_type(inner, ctx);
                self.pool.option(inner)
            }
            NodeKind::MapTy { key, value } => {
                let key = self.resolve_type(key, ctx);
                let value = self.resolve_type(value, ctx);
                self.pool.map(key, value)
            }
            NodeKind::RefTy { value } => {
                let value = self.resolve_type(value, ctx);
                self.pool.pointer_to(value)
            }
            NodeKind::FuncTy { params, ret } => {
                let effects = self.function_type_effects(node);
                let mut param_tys: SmallVec<[Idx; 4]> = SmallVec::new();
                for &param in &params {
                    param_tys.push(self.resolve_type(param, ctx));
                }
                let ret = self.resolve_type(ret, ctx);
                self.pool.function(&param_tys, ret, effects)
            }
            NodeKind::Tuple(elems) => {
                let mut tys: SmallVec<[Idx; 4]> = SmallVec::new();
                for &elem in &elems {
                    tys.push(self.resolve_type(elem, ctx));
                }
                self.pool.tuple(&tys)
            }

            _ => {
                self.sink.emit(Diagnostic::error(
                    ErrorCode::E2105,
                    span,
                    "expected a type expression",
                ));
                Idx::UNKNOWN
            }
        }
    }

    /// Effects on a function type come from attributes on the type node;
    /// nothing else is a valid attribute there.
    fn function_type_effects(&mut self, node: NodeId) -> EffectSet {
        let mut base = None;
        let mut extra = EffectSet::empty();
        for attr in self.arena.attrs(node).to_vec() {
            if let Some(class) = effect_class(&self.names, attr.name) {
                base = Some(class);
            } else if let Some(tag) = effect_tag(&self.names, attr.name) {
                extra |= tag;
            } else {
                let name = self.display_name(attr.name);
                self.sink.emit(Diagnostic::error(
                    ErrorCode::E2204,
                    attr.span,
                    format!("`{name}` is not an effect"),
                ));
            }
        }
        base.unwrap_or(EffectSet::FUNCTION_DEFAULT) | extra
    }

    /// Resolve a type alias on demand, in the alias's own declaration
    /// context rather than the referencing one.
    fn force_alias(&mut self, def: crate::DefId, ctx: &Context) {
        if self.program.def(def).ty != Idx::UNKNOWN {
            return;
        }
        let Some(node) = self.program.def(def).node else {
            return;
        };
        let NodeKind::TypeAlias { target, .. } = *self.arena.kind(node) else {
            return;
        };
        let alias_ctx = ctx.in_scope(self.program.def(def).scope);
        self.resolve_alias(def, target, &alias_ctx);
    }
}
