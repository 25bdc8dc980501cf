//! Scopes and the program graph.
//!
//! A scope is a nested lookup context and the owner of the definitions
//! declared directly inside it. Insertion order is declaration order and
//! is preserved for shadowing and defined-after rules. Class and interface
//! scopes track their super scopes, which are filled in a later phase than
//! scope creation.

use lyra_ir::Name;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::{DefId, Definition};

/// Index of a scope in the program's scope arena.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
#[repr(transparent)]
pub struct ScopeId(u32);

impl ScopeId {
    /// The program root scope, created with the program.
    pub const ROOT: ScopeId = ScopeId(0);

    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        ScopeId(raw)
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

impl std::fmt::Debug for ScopeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "scope#{}", self.0)
    }
}

/// What kind of context a scope is.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ScopeKind {
    /// Program root.
    Root,
    Module,
    /// One physical file's contribution to a module.
    ModulePart,
    Snippet,
    Class,
    Interface,
    Enumeration,
    /// Parameters and locals of one function.
    Function,
    /// If/loop/block body.
    Control,
    TypeExpr,
}

/// One nested lookup context.
#[derive(Debug)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    /// Definition this scope belongs to (the module/class/function itself).
    pub owner: Option<DefId>,
    /// Owned definitions in declaration order.
    defs: Vec<DefId>,
    index: FxHashMap<Name, SmallVec<[DefId; 2]>>,
    /// Module scopes overlaid by `using` imports.
    pub usings: Vec<ScopeId>,
    /// Superclass and super-interface scopes (classes/interfaces only).
    pub supers: Vec<ScopeId>,
}

impl Scope {
    fn new(kind: ScopeKind, parent: Option<ScopeId>) -> Self {
        Scope {
            kind,
            parent,
            owner: None,
            defs: Vec::new(),
            index: FxHashMap::default(),
            usings: Vec::new(),
            supers: Vec::new(),
        }
    }

    /// Owned definitions in declaration order.
    pub fn defs(&self) -> &[DefId] {
        &self.defs
    }

    /// Definitions with this exact name, in declaration order.
    pub fn named(&self, name: Name) -> &[DefId] {
        self.index.get(&name).map_or(&[], |v| v.as_slice())
    }
}

/// The whole-analysis graph: scope arena plus definition arena.
///
/// Both arenas are append-only; every cross-reference is a `Copy` index.
pub struct Program {
    scopes: Vec<Scope>,
    defs: Vec<Definition>,
}

impl Program {
    pub fn new() -> Self {
        Program {
            scopes: vec![Scope::new(ScopeKind::Root, None)],
            defs: Vec::new(),
        }
    }

    // ========================================
    // Scopes
    // ========================================

    #[allow(clippy::cast_possible_truncation)]
    pub fn new_scope(&mut self, kind: ScopeKind, parent: ScopeId) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope::new(kind, Some(parent)));
        id
    }

    #[inline]
    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    #[inline]
    pub fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.index()]
    }

    // ========================================
    // Definitions
    // ========================================

    #[allow(clippy::cast_possible_truncation)]
    pub fn new_def(&mut self, def: Definition) -> DefId {
        let scope = def.scope;
        let name = def.name;
        let id = DefId::from_raw(self.defs.len() as u32);
        self.defs.push(def);
        let scope = &mut self.scopes[scope.index()];
        scope.defs.push(id);
        scope.index.entry(name).or_default().push(id);
        id
    }

    #[inline]
    pub fn def(&self, id: DefId) -> &Definition {
        &self.defs[id.index()]
    }

    #[inline]
    pub fn def_mut(&mut self, id: DefId) -> &mut Definition {
        &mut self.defs[id.index()]
    }

    pub fn def_count(&self) -> usize {
        self.defs.len()
    }

    /// The enclosing definition of a scope (walking up to the nearest
    /// scope with an owner).
    pub fn owner_of(&self, mut scope: ScopeId) -> Option<DefId> {
        loop {
            let s = self.scope(scope);
            if let Some(owner) = s.owner {
                return Some(owner);
            }
            scope = s.parent?;
        }
    }

    // ========================================
    // Lookup
    // ========================================

    /// Unqualified lookup: walk outward from `scope`, overlaying `using`
    /// imports at each level, collecting every same-named candidate.
    ///
    /// Candidates are ordered innermost first; a data definition found at
    /// an inner level shadows outer candidates, while function overloads
    /// accumulate across levels.
    pub fn lookup(&self, scope: ScopeId, name: Name) -> SmallVec<[DefId; 4]> {
        let mut out: SmallVec<[DefId; 4]> = SmallVec::new();
        let mut current = Some(scope);
        while let Some(id) = current {
            let s = self.scope(id);
            let mut level: SmallVec<[DefId; 4]> = SmallVec::new();
            level.extend_from_slice(s.named(name));
            for &using in &s.usings {
                level.extend_from_slice(self.scope(using).named(name));
            }
            // Class/interface scopes also see inherited members.
            for &sup in &s.supers {
                self.collect_inherited(sup, name, &mut level);
            }
            for def in level {
                if !out.contains(&def) {
                    out.push(def);
                }
            }
            // A non-overloadable inner hit shadows everything outward.
            if out
                .iter()
                .any(|&d| self.def(d).kind != crate::DefKind::Function)
            {
                break;
            }
            current = s.parent;
        }
        out
    }

    /// Qualified lookup: members of the named scope (plus inherited ones),
    /// without walking outward.
    pub fn lookup_qualified(&self, scope: ScopeId, name: Name) -> SmallVec<[DefId; 4]> {
        let mut out: SmallVec<[DefId; 4]> = SmallVec::new();
        out.extend_from_slice(self.scope(scope).named(name));
        for &sup in &self.scope(scope).supers {
            self.collect_inherited(sup, name, &mut out);
        }
        out
    }

    fn collect_inherited(&self, scope: ScopeId, name: Name, out: &mut SmallVec<[DefId; 4]>) {
        // Inheritance cycles are diagnosed separately; guard here too.
        let mut work: SmallVec<[ScopeId; 4]> = SmallVec::new();
        let mut seen: SmallVec<[ScopeId; 8]> = SmallVec::new();
        work.push(scope);
        while let Some(current) = work.pop() {
            if seen.contains(&current) {
                continue;
            }
            seen.push(current);
            for &def in self.scope(current).named(name) {
                if !out.contains(&def) {
                    out.push(def);
                }
            }
            work.extend_from_slice(&self.scope(current).supers);
        }
    }
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DefKind, PackageId};
    use lyra_ir::{Span, StringInterner};
    use pretty_assertions::assert_eq;

    fn def(name: Name, kind: DefKind, scope: ScopeId) -> Definition {
        Definition::new(name, kind, scope, PackageId::from_raw(0), Span::DUMMY)
    }

    #[test]
    fn inner_data_shadows_outer() {
        let interner = StringInterner::new();
        let x = interner.intern("x");
        let mut program = Program::new();
        let inner = program.new_scope(ScopeKind::Function, ScopeId::ROOT);

        let outer_def = program.new_def(def(x, DefKind::Data, ScopeId::ROOT));
        let inner_def = program.new_def(def(x, DefKind::Data, inner));

        let found = program.lookup(inner, x);
        assert_eq!(found.first().copied(), Some(inner_def));
        // Shadowed: outer is cut off by the inner data hit.
        assert!(!found.contains(&outer_def));
    }

    #[test]
    fn function_overloads_accumulate_across_levels() {
        let interner = StringInterner::new();
        let f = interner.intern("f");
        let mut program = Program::new();
        let inner = program.new_scope(ScopeKind::Function, ScopeId::ROOT);

        let outer_fn = program.new_def(def(f, DefKind::Function, ScopeId::ROOT));
        let inner_fn = program.new_def(def(f, DefKind::Function, inner));

        let found = program.lookup(inner, f);
        assert_eq!(found.as_slice(), &[inner_fn, outer_fn]);
    }

    #[test]
    fn using_overlays_module_scope() {
        let interner = StringInterner::new();
        let helper = interner.intern("helper");
        let mut program = Program::new();
        let module = program.new_scope(ScopeKind::Module, ScopeId::ROOT);
        let snippet = program.new_scope(ScopeKind::Snippet, ScopeId::ROOT);

        let target = program.new_def(def(helper, DefKind::Function, module));
        assert!(program.lookup(snippet, helper).is_empty());

        program.scope_mut(snippet).usings.push(module);
        assert_eq!(program.lookup(snippet, helper).as_slice(), &[target]);
    }

    #[test]
    fn qualified_lookup_sees_inherited_members() {
        let interner = StringInterner::new();
        let m = interner.intern("m");
        let mut program = Program::new();
        let base = program.new_scope(ScopeKind::Class, ScopeId::ROOT);
        let derived = program.new_scope(ScopeKind::Class, ScopeId::ROOT);
        program.scope_mut(derived).supers.push(base);

        let inherited = program.new_def(def(m, DefKind::Function, base));
        assert_eq!(program.lookup_qualified(derived, m).as_slice(), &[inherited]);
    }

    #[test]
    fn defs_keep_declaration_order() {
        let interner = StringInterner::new();
        let mut program = Program::new();
        let a = program.new_def(def(interner.intern("a"), DefKind::Data, ScopeId::ROOT));
        let b = program.new_def(def(interner.intern("b"), DefKind::Data, ScopeId::ROOT));
        assert_eq!(program.scope(ScopeId::ROOT).defs(), &[a, b]);
    }
}
