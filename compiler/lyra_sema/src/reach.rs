//! Reachability validation over a fully analyzed function body.
//!
//! One pre-order walk per body, threading a pair of dominating-skip flag
//! sets: unconditional (a `break`/`return` definitely precedes this
//! point) and conditional (only on some path). A dominated, non-error,
//! non-suppressed node gets exactly one "unreachable code" warning and
//! marks its region suppressed. Nested definitions and the bodies of
//! `defer`/`spawn`/`branch` are control-flow boundaries: skips never
//! propagate outward through them.

use bitflags::bitflags;

use lyra_diagnostic::{Diagnostic, DiagnosticSink, ErrorCode};
use lyra_ir::{Name, NodeArena, NodeId, NodeKind};
use rustc_hash::FxHashSet;

bitflags! {
    /// Which dominating jumps precede a point in the walk.
    #[derive(Copy, Clone, Eq, PartialEq, Default, Debug)]
    pub struct Skip: u8 {
        const BREAK = 1 << 0;
        const RETURN = 1 << 1;
    }
}

/// Walk state threaded through one body.
#[derive(Copy, Clone, Default, Debug)]
struct Flow {
    unconditional: Skip,
    conditional: Skip,
    /// Set after the first unreachable warning in a region.
    suppressed: bool,
}

/// Validates one function body. Create per body; cheap.
pub struct ReachValidator<'a> {
    arena: &'a NodeArena,
    sink: &'a mut DiagnosticSink,
    ignore_unreachable: Name,
    /// Call nodes whose callee carries the `suspends` effect.
    suspending: &'a FxHashSet<NodeId>,
    in_defer: bool,
    loop_depth: u32,
    in_function: bool,
}

impl<'a> ReachValidator<'a> {
    pub fn new(
        arena: &'a NodeArena,
        sink: &'a mut DiagnosticSink,
        ignore_unreachable: Name,
        suspending: &'a FxHashSet<NodeId>,
    ) -> Self {
        ReachValidator {
            arena,
            sink,
            ignore_unreachable,
            suspending,
            in_defer: false,
            loop_depth: 0,
            in_function: true,
        }
    }

    /// Validate one body; emits diagnostics, never fails.
    pub fn validate(mut self, body: NodeId) {
        let mut flow = Flow::default();
        self.visit(body, &mut flow);
    }

    #[allow(clippy::too_many_lines)]
    fn visit(&mut self, node: NodeId, flow: &mut Flow) {
        if self
            .arena
            .attrs(node)
            .iter()
            .any(|a| a.name == self.ignore_unreachable)
        {
            // Explicit opt-out restarts the region.
            flow.unconditional = Skip::empty();
            flow.suppressed = false;
        }

        let kind = self.arena.kind(node);
        if !flow.unconditional.is_empty() && !flow.suppressed && *kind != NodeKind::Error {
            self.sink.emit(Diagnostic::warning(
                ErrorCode::E2401,
                self.arena.span(node),
                "unreachable code",
            ));
            flow.suppressed = true;
        }

        match kind {
            NodeKind::Break => {
                if self.in_defer {
                    self.sink.emit(Diagnostic::error(
                        ErrorCode::E2403,
                        self.arena.span(node),
                        "may not break out of `defer`",
                    ));
                } else if self.loop_depth == 0 {
                    self.sink.emit(Diagnostic::error(
                        ErrorCode::E2402,
                        self.arena.span(node),
                        "`break` outside a loop",
                    ));
                }
                flow.unconditional |= Skip::BREAK;
            }
            NodeKind::Return { value } => {
                if let Some(value) = value {
                    self.visit(*value, flow);
                }
                if self.in_defer {
                    self.sink.emit(Diagnostic::error(
                        ErrorCode::E2403,
                        self.arena.span(node),
                        "may not return out of `defer`",
                    ));
                } else if !self.in_function {
                    self.sink.emit(Diagnostic::error(
                        ErrorCode::E2405,
                        self.arena.span(node),
                        "`return` outside a function",
                    ));
                }
                flow.unconditional |= Skip::RETURN;
            }
            NodeKind::If {
                cond,
                then_body,
                else_body,
            } => {
                self.visit(*cond, flow);
                let mut then_flow = *flow;
                self.visit(*then_body, &mut then_flow);
                let mut else_flow = *flow;
                if let Some(else_body) = else_body {
                    self.visit(*else_body, &mut else_flow);
                }
                // Unconditional only where every branch skips;
                // conditional wherever any branch might.
                let branch_uncond = then_flow.unconditional & else_flow.unconditional;
                let branch_cond = (then_flow.unconditional | then_flow.conditional)
                    | (else_flow.unconditional | else_flow.conditional);
                flow.unconditional |= branch_uncond;
                flow.conditional |= branch_cond - flow.unconditional;
            }
            NodeKind::Loop { body } => {
                let mut body_flow = Flow::default();
                self.loop_depth += 1;
                self.visit(*body, &mut body_flow);
                self.loop_depth -= 1;

                let exits = body_flow.unconditional | body_flow.conditional;
                if exits.is_empty() && !self.suspends_within(*body) {
                    self.sink.emit(Diagnostic::error(
                        ErrorCode::E2404,
                        self.arena.span(node),
                        "loop never exits and never suspends",
                    ));
                    flow.unconditional |= Skip::RETURN;
                } else if !exits.contains(Skip::BREAK)
                    && body_flow.unconditional.contains(Skip::RETURN)
                {
                    // No path breaks and every iteration returns.
                    flow.unconditional |= Skip::RETURN;
                }
            }
            NodeKind::Defer { body } => {
                // Boundary: nothing propagates outward, and jumps out of
                // the deferred block are illegal.
                let was_defer = self.in_defer;
                let depth = self.loop_depth;
                self.in_defer = true;
                self.loop_depth = 0;
                let mut inner = Flow::default();
                self.visit(*body, &mut inner);
                self.in_defer = was_defer;
                self.loop_depth = depth;
            }
            NodeKind::Spawn { body } | NodeKind::Branch { body } => {
                // Boundary: a separate task's control flow.
                let was_defer = self.in_defer;
                let depth = self.loop_depth;
                let was_fn = self.in_function;
                self.in_defer = false;
                self.loop_depth = 0;
                self.in_function = false;
                let mut inner = Flow::default();
                self.visit(*body, &mut inner);
                self.in_defer = was_defer;
                self.loop_depth = depth;
                self.in_function = was_fn;
            }
            NodeKind::Sync(children) | NodeKind::Race(children) | NodeKind::Rush(children) => {
                // All branches conceptually start here; one finishing
                // with a skip only dominates if every branch does.
                let mut uncond = Skip::all();
                let mut cond = Skip::empty();
                let mut any = false;
                for &child in children {
                    let mut branch = *flow;
                    self.visit(child, &mut branch);
                    uncond &= branch.unconditional;
                    cond |= branch.unconditional | branch.conditional;
                    any = true;
                }
                if any {
                    flow.unconditional |= uncond;
                    flow.conditional |= cond - flow.unconditional;
                }
            }
            // Nested definitions are validated with their own bodies.
            NodeKind::Module { .. }
            | NodeKind::Class { .. }
            | NodeKind::Interface { .. }
            | NodeKind::Enum { .. }
            | NodeKind::Function { .. }
            | NodeKind::TypeAlias { .. }
            | NodeKind::ModuleAlias { .. }
            | NodeKind::Using { .. } => {}
            _ => {
                let arena = self.arena;
                arena.for_each_child(node, |child| {
                    self.visit(child, flow);
                });
            }
        }
    }

    /// Whether the subtree contains a suspension point (a call whose
    /// callee suspends, or a structured concurrency construct). Nested
    /// definitions don't count; their bodies run separately.
    fn suspends_within(&self, node: NodeId) -> bool {
        match self.arena.kind(node) {
            NodeKind::Sync(_) | NodeKind::Race(_) | NodeKind::Rush(_) | NodeKind::Spawn { .. } => {
                return true;
            }
            NodeKind::Module { .. }
            | NodeKind::Class { .. }
            | NodeKind::Interface { .. }
            | NodeKind::Function { .. } => return false,
            _ => {}
        }
        if self.suspending.contains(&node) {
            return true;
        }
        let mut found = false;
        self.arena.for_each_child(node, |child| {
            found = found || self.suspends_within(child);
        });
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lyra_ir::{Span, StringInterner};
    use pretty_assertions::assert_eq;

    struct Fixture {
        arena: NodeArena,
        sink: DiagnosticSink,
        ignore: Name,
        suspending: FxHashSet<NodeId>,
    }

    impl Fixture {
        fn new() -> Self {
            let interner = StringInterner::new();
            Fixture {
                arena: NodeArena::new(),
                sink: DiagnosticSink::new(),
                ignore: interner.intern("ignore_unreachable"),
                suspending: FxHashSet::default(),
            }
        }

        fn validate(&mut self, body: NodeId) {
            ReachValidator::new(&self.arena, &mut self.sink, self.ignore, &self.suspending)
                .validate(body);
        }

        fn codes(&self) -> Vec<ErrorCode> {
            self.sink.diagnostics().iter().map(|d| d.code).collect()
        }
    }

    fn lit(arena: &mut NodeArena, value: i64) -> NodeId {
        arena.push(NodeKind::IntLit(value), Span::DUMMY)
    }

    #[test]
    fn return_dominates_following_statements() {
        let mut fx = Fixture::new();
        let value = lit(&mut fx.arena, 1);
        let ret = fx.arena.push(NodeKind::Return { value: Some(value) }, Span::DUMMY);
        let dead1 = lit(&mut fx.arena, 2);
        let dead2 = lit(&mut fx.arena, 3);
        let body = fx
            .arena
            .push(NodeKind::Block(vec![ret, dead1, dead2]), Span::DUMMY);

        fx.validate(body);
        // Exactly one warning for the whole dominated region.
        assert_eq!(fx.codes(), vec![ErrorCode::E2401]);
    }

    #[test]
    fn if_with_returns_in_both_branches_dominates() {
        let mut fx = Fixture::new();
        let cond = fx.arena.push(NodeKind::LogicLit(true), Span::DUMMY);
        let v1 = lit(&mut fx.arena, 1);
        let r1 = fx.arena.push(NodeKind::Return { value: Some(v1) }, Span::DUMMY);
        let v2 = lit(&mut fx.arena, 2);
        let r2 = fx.arena.push(NodeKind::Return { value: Some(v2) }, Span::DUMMY);
        let if_node = fx.arena.push(
            NodeKind::If {
                cond,
                then_body: r1,
                else_body: Some(r2),
            },
            Span::DUMMY,
        );
        let dead = lit(&mut fx.arena, 3);
        let body = fx
            .arena
            .push(NodeKind::Block(vec![if_node, dead]), Span::DUMMY);

        fx.validate(body);
        assert_eq!(fx.codes(), vec![ErrorCode::E2401]);
    }

    #[test]
    fn if_with_one_returning_branch_is_only_conditional() {
        let mut fx = Fixture::new();
        let cond = fx.arena.push(NodeKind::LogicLit(true), Span::DUMMY);
        let v = lit(&mut fx.arena, 1);
        let ret = fx.arena.push(NodeKind::Return { value: Some(v) }, Span::DUMMY);
        let if_node = fx.arena.push(
            NodeKind::If {
                cond,
                then_body: ret,
                else_body: None,
            },
            Span::DUMMY,
        );
        let after = lit(&mut fx.arena, 2);
        let body = fx
            .arena
            .push(NodeKind::Block(vec![if_node, after]), Span::DUMMY);

        fx.validate(body);
        assert_eq!(fx.codes(), vec![]);
    }

    #[test]
    fn break_in_defer_is_reported_once_and_not_unreachable() {
        let mut fx = Fixture::new();
        let brk = fx.arena.push(NodeKind::Break, Span::DUMMY);
        let loop_node = fx.arena.push(NodeKind::Loop { body: brk }, Span::DUMMY);
        let defer = fx
            .arena
            .push(NodeKind::Defer { body: loop_node }, Span::DUMMY);
        let body = fx.arena.push(NodeKind::Block(vec![defer]), Span::DUMMY);

        fx.validate(body);
        assert_eq!(fx.codes(), vec![ErrorCode::E2403]);
    }

    #[test]
    fn break_outside_loop_is_an_error() {
        let mut fx = Fixture::new();
        let brk = fx.arena.push(NodeKind::Break, Span::DUMMY);
        let body = fx.arena.push(NodeKind::Block(vec![brk]), Span::DUMMY);

        fx.validate(body);
        assert_eq!(fx.codes(), vec![ErrorCode::E2402]);
    }

    #[test]
    fn loop_without_exit_or_suspension_is_infinite() {
        let mut fx = Fixture::new();
        let work = lit(&mut fx.arena, 1);
        let inner = fx.arena.push(NodeKind::Block(vec![work]), Span::DUMMY);
        let loop_node = fx.arena.push(NodeKind::Loop { body: inner }, Span::DUMMY);
        let after = lit(&mut fx.arena, 2);
        let body = fx
            .arena
            .push(NodeKind::Block(vec![loop_node, after]), Span::DUMMY);

        fx.validate(body);
        assert_eq!(fx.codes(), vec![ErrorCode::E2404, ErrorCode::E2401]);
    }

    #[test]
    fn loop_with_suspending_call_is_not_infinite() {
        let mut fx = Fixture::new();
        let callee = fx.arena.push(
            NodeKind::Ident {
                name: Name::EMPTY,
                qualifier: None,
            },
            Span::DUMMY,
        );
        let call = fx.arena.push(
            NodeKind::Call {
                callee,
                args: vec![],
            },
            Span::DUMMY,
        );
        fx.suspending.insert(call);
        let loop_node = fx.arena.push(NodeKind::Loop { body: call }, Span::DUMMY);
        let body = fx.arena.push(NodeKind::Block(vec![loop_node]), Span::DUMMY);

        fx.validate(body);
        assert_eq!(fx.codes(), vec![]);
    }

    #[test]
    fn loop_with_conditional_break_is_not_infinite() {
        let mut fx = Fixture::new();
        let cond = fx.arena.push(NodeKind::LogicLit(true), Span::DUMMY);
        let brk = fx.arena.push(NodeKind::Break, Span::DUMMY);
        let if_node = fx.arena.push(
            NodeKind::If {
                cond,
                then_body: brk,
                else_body: None,
            },
            Span::DUMMY,
        );
        let loop_node = fx.arena.push(NodeKind::Loop { body: if_node }, Span::DUMMY);
        let after = lit(&mut fx.arena, 1);
        let body = fx
            .arena
            .push(NodeKind::Block(vec![loop_node, after]), Span::DUMMY);

        fx.validate(body);
        assert_eq!(fx.codes(), vec![]);
    }

    #[test]
    fn sync_intersects_unconditional_skips() {
        let mut fx = Fixture::new();
        let v = lit(&mut fx.arena, 1);
        let ret = fx.arena.push(NodeKind::Return { value: Some(v) }, Span::DUMMY);
        let other = lit(&mut fx.arena, 2);
        let sync = fx.arena.push(NodeKind::Sync(vec![ret, other]), Span::DUMMY);
        let after = lit(&mut fx.arena, 3);
        let body = fx
            .arena
            .push(NodeKind::Block(vec![sync, after]), Span::DUMMY);

        fx.validate(body);
        // Only one branch returns, so what follows stays reachable.
        assert_eq!(fx.codes(), vec![]);
    }

    #[test]
    fn skips_do_not_escape_spawn() {
        let mut fx = Fixture::new();
        let v = lit(&mut fx.arena, 1);
        let ret = fx.arena.push(NodeKind::Return { value: Some(v) }, Span::DUMMY);
        let spawn = fx.arena.push(NodeKind::Spawn { body: ret }, Span::DUMMY);
        let after = lit(&mut fx.arena, 2);
        let body = fx
            .arena
            .push(NodeKind::Block(vec![spawn, after]), Span::DUMMY);

        fx.validate(body);
        // `return` is illegal in the detached task, but code after the
        // spawn is still reachable.
        assert_eq!(fx.codes(), vec![ErrorCode::E2405]);
    }

    #[test]
    fn ignore_attribute_resets_the_region() {
        let mut fx = Fixture::new();
        let interner = StringInterner::new();
        let ignore = interner.intern("ignore_unreachable");
        fx.ignore = ignore;

        let v = lit(&mut fx.arena, 1);
        let ret = fx.arena.push(NodeKind::Return { value: Some(v) }, Span::DUMMY);
        let marked = fx.arena.push_with_attrs(
            NodeKind::IntLit(2),
            Span::DUMMY,
            vec![lyra_ir::Attribute {
                name: ignore,
                span: Span::DUMMY,
            }],
        );
        let body = fx
            .arena
            .push(NodeKind::Block(vec![ret, marked]), Span::DUMMY);

        fx.validate(body);
        assert_eq!(fx.codes(), vec![]);
    }
}
