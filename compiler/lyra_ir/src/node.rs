//! Arena-addressed desugared tree.
//!
//! The analyzer's input is one mutable, already-desugared tree per
//! compilation unit. Nodes are addressed by [`NodeId`] into a [`NodeArena`];
//! a node exposes exactly the two operations the analysis core needs:
//! generic child recursion ([`NodeArena::for_each_child`]) and a mutable
//! result-type slot ([`NodeArena::set_result`]).
//!
//! Structural errors are handled by replacing the offending node in place
//! with [`NodeKind::Error`], so downstream passes never special-case
//! "might be missing".

use crate::{Name, Span};
use std::fmt;

/// Index of a node in a [`NodeArena`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        NodeId(raw)
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

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Opaque handle to a resolved type, filled in by the analyzer.
///
/// The tree crate knows nothing about the type pool; the analyzer stores
/// raw type-pool indices here. `NONE` until analysis assigns one.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
#[repr(transparent)]
pub struct TypeSlot(u32);

impl TypeSlot {
    /// No result type assigned yet.
    pub const NONE: TypeSlot = TypeSlot(u32::MAX);

    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        TypeSlot(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == u32::MAX
    }
}

impl fmt::Debug for TypeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "TypeSlot::NONE")
        } else {
            write!(f, "TypeSlot({})", self.0)
        }
    }
}

/// A raw, uninterpreted attribute attached to a declaration.
///
/// The semantic layer maps attribute names onto access levels, effect
/// classes, override markers, and so on.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Attribute {
    pub name: Name,
    pub span: Span,
}

/// The desugared node vocabulary.
///
/// Surface-syntax sugar (class/struct/enum literals, pattern matches,
/// iteration forms) has already been rewritten into these shapes by the
/// desugarer, which is outside this crate.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    /// Opaque placeholder for a structurally malformed node.
    Error,

    // === Literals ===
    IntLit(i64),
    FloatLit(f64),
    LogicLit(bool),
    CharLit(char),
    StrLit(Name),

    /// Identifier reference, optionally qualified by an enclosing nominal.
    Ident {
        name: Name,
        qualifier: Option<Name>,
    },

    // === Declarations ===
    Module {
        name: Name,
        members: Vec<NodeId>,
    },
    ModuleAlias {
        name: Name,
        target: NodeId,
    },
    /// `using` import of a module scope.
    Using {
        target: NodeId,
    },
    Class {
        name: Name,
        supers: Vec<NodeId>,
        members: Vec<NodeId>,
    },
    Interface {
        name: Name,
        supers: Vec<NodeId>,
        members: Vec<NodeId>,
    },
    Enum {
        name: Name,
        enumerators: Vec<NodeId>,
    },
    Enumerator {
        name: Name,
    },
    Function {
        name: Name,
        params: Vec<NodeId>,
        ret_ty: Option<NodeId>,
        body: Option<NodeId>,
    },
    /// Variable, field, parameter, or local binding.
    Data {
        name: Name,
        ty: Option<NodeId>,
        init: Option<NodeId>,
    },
    TypeAlias {
        name: Name,
        target: NodeId,
    },

    // === Expressions ===
    Block(Vec<NodeId>),
    Call {
        callee: NodeId,
        args: Vec<NodeId>,
    },
    /// Failable (square-bracket) call; requires a `decides` context.
    FailCall {
        callee: NodeId,
        args: Vec<NodeId>,
    },
    Assign {
        target: NodeId,
        value: NodeId,
    },
    If {
        cond: NodeId,
        then_body: NodeId,
        else_body: Option<NodeId>,
    },
    Loop {
        body: NodeId,
    },
    Break,
    Return {
        value: Option<NodeId>,
    },
    /// Deferred block; runs at scope exit. Control-flow boundary.
    Defer {
        body: NodeId,
    },
    /// Structured task spawn. Control-flow boundary.
    Spawn {
        body: NodeId,
    },
    /// Detached async block. Control-flow boundary.
    Branch {
        body: NodeId,
    },
    /// All sub-expressions run; completes when all complete.
    Sync(Vec<NodeId>),
    /// First-to-finish wins; losers cancelled.
    Race(Vec<NodeId>),
    /// First-to-finish wins; losers keep running.
    Rush(Vec<NodeId>),
    Tuple(Vec<NodeId>),

    // === Type expressions ===
    ArrayTy {
        elem: NodeId,
    },
    MapTy {
        key: NodeId,
        value: NodeId,
    },
    OptionTy {
        inner: NodeId,
    },
    RefTy {
        value: NodeId,
    },
    FuncTy {
        params: Vec<NodeId>,
        ret: NodeId,
    },
}

/// One node of the desugared tree.
#[derive(Clone, Debug)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
    pub attrs: Vec<Attribute>,
}

/// Arena of desugared nodes plus their result-type side table.
#[derive(Default)]
pub struct NodeArena {
    nodes: Vec<Node>,
    results: Vec<TypeSlot>,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a node without attributes.
    pub fn push(&mut self, kind: NodeKind, span: Span) -> NodeId {
        self.push_with_attrs(kind, span, Vec::new())
    }

    /// Allocate a node with attributes.
    #[allow(clippy::cast_possible_truncation)]
    pub fn push_with_attrs(&mut self, kind: NodeKind, span: Span, attrs: Vec<Attribute>) -> NodeId {
        debug_assert!(self.nodes.len() < u32::MAX as usize);
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node { kind, span, attrs });
        self.results.push(TypeSlot::NONE);
        id
    }

    #[inline]
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    #[inline]
    pub fn kind_mut(&mut self, id: NodeId) -> &mut NodeKind {
        &mut self.nodes[id.index()].kind
    }

    #[inline]
    pub fn span(&self, id: NodeId) -> Span {
        self.nodes[id.index()].span
    }

    #[inline]
    pub fn attrs(&self, id: NodeId) -> &[Attribute] {
        &self.nodes[id.index()].attrs
    }

    /// Replace a structurally malformed node with the opaque error
    /// placeholder, keeping its span for diagnostics.
    pub fn replace_with_error(&mut self, id: NodeId) {
        self.nodes[id.index()].kind = NodeKind::Error;
    }

    /// Record the analyzed result type of a node.
    #[inline]
    pub fn set_result(&mut self, id: NodeId, slot: TypeSlot) {
        self.results[id.index()] = slot;
    }

    /// Read back the analyzed result type of a node.
    #[inline]
    pub fn result(&self, id: NodeId) -> TypeSlot {
        self.results[id.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Generic child recursion: invoke `f` on every direct child of `id`,
    /// in source order.
    pub fn for_each_child(&self, id: NodeId, mut f: impl FnMut(NodeId)) {
        match self.kind(id) {
            NodeKind::Error
            | NodeKind::IntLit(_)
            | NodeKind::FloatLit(_)
            | NodeKind::LogicLit(_)
            | NodeKind::CharLit(_)
            | NodeKind::StrLit(_)
            | NodeKind::Ident { .. }
            | NodeKind::Enumerator { .. }
            | NodeKind::Break => {}

            NodeKind::Module { members, .. } => members.iter().copied().for_each(f),
            NodeKind::ModuleAlias { target, .. }
            | NodeKind::Using { target }
            | NodeKind::TypeAlias { target, .. } => f(*target),
            NodeKind::Class {
                supers, members, ..
            }
            | NodeKind::Interface {
                supers, members, ..
            } => {
                supers.iter().copied().for_each(&mut f);
                members.iter().copied().for_each(f);
            }
            NodeKind::Enum { enumerators, .. } => enumerators.iter().copied().for_each(f),
            NodeKind::Function {
                params,
                ret_ty,
                body,
                ..
            } => {
                params.iter().copied().for_each(&mut f);
                if let Some(ret) = ret_ty {
                    f(*ret);
                }
                if let Some(body) = body {
                    f(*body);
                }
            }
            NodeKind::Data { ty, init, .. } => {
                if let Some(ty) = ty {
                    f(*ty);
                }
                if let Some(init) = init {
                    f(*init);
                }
            }

            NodeKind::Block(children)
            | NodeKind::Sync(children)
            | NodeKind::Race(children)
            | NodeKind::Rush(children)
            | NodeKind::Tuple(children) => children.iter().copied().for_each(f),
            NodeKind::Call { callee, args } | NodeKind::FailCall { callee, args } => {
                f(*callee);
                args.iter().copied().for_each(f);
            }
            NodeKind::Assign { target, value } => {
                f(*target);
                f(*value);
            }
            NodeKind::If {
                cond,
                then_body,
                else_body,
            } => {
                f(*cond);
                f(*then_body);
                if let Some(else_body) = else_body {
                    f(*else_body);
                }
            }
            NodeKind::Loop { body }
            | NodeKind::Defer { body }
            | NodeKind::Spawn { body }
            | NodeKind::Branch { body } => f(*body),
            NodeKind::Return { value } => {
                if let Some(value) = value {
                    f(*value);
                }
            }

            NodeKind::ArrayTy { elem } => f(*elem),
            NodeKind::MapTy { key, value } => {
                f(*key);
                f(*value);
            }
            NodeKind::OptionTy { inner } | NodeKind::RefTy { value: inner } => f(*inner),
            NodeKind::FuncTy { params, ret } => {
                params.iter().copied().for_each(&mut f);
                f(*ret);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn result_slot_starts_none() {
        let mut arena = NodeArena::new();
        let id = arena.push(NodeKind::IntLit(1), Span::DUMMY);
        assert_eq!(arena.result(id), TypeSlot::NONE);
        arena.set_result(id, TypeSlot::from_raw(7));
        assert_eq!(arena.result(id).raw(), 7);
    }

    #[test]
    fn replace_with_error_keeps_span() {
        let mut arena = NodeArena::new();
        let span = Span::new(3, 9);
        let id = arena.push(NodeKind::Break, span);
        arena.replace_with_error(id);
        assert_eq!(arena.kind(id), &NodeKind::Error);
        assert_eq!(arena.span(id), span);
    }

    #[test]
    fn for_each_child_visits_in_source_order() {
        let mut arena = NodeArena::new();
        let a = arena.push(NodeKind::IntLit(1), Span::DUMMY);
        let b = arena.push(NodeKind::IntLit(2), Span::DUMMY);
        let callee = arena.push(
            NodeKind::Ident {
                name: Name::EMPTY,
                qualifier: None,
            },
            Span::DUMMY,
        );
        let call = arena.push(
            NodeKind::Call {
                callee,
                args: vec![a, b],
            },
            Span::DUMMY,
        );

        let mut seen = Vec::new();
        arena.for_each_child(call, |child| seen.push(child));
        assert_eq!(seen, vec![callee, a, b]);
    }
}
