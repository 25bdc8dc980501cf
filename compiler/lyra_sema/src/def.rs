//! Definitions: named, semantically resolved declarations.
//!
//! Definitions are append-only and live for the whole analysis; they are
//! created the first time their syntactic form is encountered and mutated
//! by later phases (type, access level, override linkage). All links
//! between definitions are plain arena indices with no ownership implied.

use lyra_ir::{Name, NodeId, Span};
use lyra_types::Idx;
use smallvec::SmallVec;

use crate::{PackageId, ScopeId};

/// Index of a definition in the program's definition arena.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct DefId(u32);

impl DefId {
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        DefId(raw)
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

impl std::fmt::Debug for DefId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "def#{}", self.0)
    }
}

/// What kind of declaration a definition stands for.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum DefKind {
    Module,
    ModuleAlias,
    Class,
    Interface,
    Enumeration,
    Enumerator,
    Function,
    /// Variable, field, or parameter.
    Data,
    TypeAlias,
    TypeVariable,
}

impl DefKind {
    /// Whether this definition names a type when used in type position.
    pub fn is_type(self) -> bool {
        matches!(
            self,
            DefKind::Class
                | DefKind::Interface
                | DefKind::Enumeration
                | DefKind::TypeAlias
                | DefKind::TypeVariable
        )
    }

    pub fn describe(self) -> &'static str {
        match self {
            DefKind::Module => "module",
            DefKind::ModuleAlias => "module alias",
            DefKind::Class => "class",
            DefKind::Interface => "interface",
            DefKind::Enumeration => "enumeration",
            DefKind::Enumerator => "enumerator",
            DefKind::Function => "function",
            DefKind::Data => "data definition",
            DefKind::TypeAlias => "type alias",
            DefKind::TypeVariable => "type variable",
        }
    }
}

/// Who may reference a definition.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum AccessLevel {
    Public,
    /// Subclasses of the defining class.
    Protected,
    /// The defining package.
    Internal,
    /// The defining scope.
    Private,
    /// An explicit set of module definitions.
    Scoped(SmallVec<[DefId; 2]>),
}

impl AccessLevel {
    pub fn describe(&self) -> &'static str {
        match self {
            AccessLevel::Public => "public",
            AccessLevel::Protected => "protected",
            AccessLevel::Internal => "internal",
            AccessLevel::Private => "private",
            AccessLevel::Scoped(_) => "scoped",
        }
    }
}

/// A named, semantically resolved declaration.
#[derive(Clone, Debug)]
pub struct Definition {
    pub name: Name,
    pub kind: DefKind,
    /// Owning scope (exclusive back-reference).
    pub scope: ScopeId,
    /// Scope this definition itself introduces, if any (modules, classes,
    /// interfaces, functions).
    pub inner_scope: Option<ScopeId>,
    pub access: AccessLevel,
    /// Resolved type; `UNKNOWN` until the relevant phase assigns one.
    pub ty: Idx,
    /// Generalized type variables (functions with inferred returns).
    pub type_vars: Vec<Idx>,
    /// Overridden ancestor definition; established once per override chain.
    pub overridden: Option<DefId>,
    pub deprecated: bool,
    pub experimental: bool,
    pub package: PackageId,
    /// Declaring node, absent for synthesized definitions.
    pub node: Option<NodeId>,
    pub span: Span,
}

impl Definition {
    pub fn new(name: Name, kind: DefKind, scope: ScopeId, package: PackageId, span: Span) -> Self {
        Definition {
            name,
            kind,
            scope,
            inner_scope: None,
            access: AccessLevel::Internal,
            ty: Idx::UNKNOWN,
            type_vars: Vec::new(),
            overridden: None,
            deprecated: false,
            experimental: false,
            package,
            node: None,
            span,
        }
    }
}
