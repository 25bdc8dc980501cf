//! End-to-end analysis scenarios over hand-built trees.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use lyra_diagnostic::ErrorCode;
use lyra_ir::{Attribute, NodeId, NodeKind, Span};
use lyra_sema::{AnalysisSession, DefId, ScopeId};
use lyra_types::{Idx, Tag};
use pretty_assertions::assert_eq;

fn ident(s: &mut AnalysisSession, name: &str) -> NodeId {
    let name = s.interner.intern(name);
    s.arena.push(
        NodeKind::Ident {
            name,
            qualifier: None,
        },
        Span::DUMMY,
    )
}

fn qualified(s: &mut AnalysisSession, qualifier: &str, name: &str) -> NodeId {
    let qualifier = Some(s.interner.intern(qualifier));
    let name = s.interner.intern(name);
    s.arena
        .push(NodeKind::Ident { name, qualifier }, Span::DUMMY)
}

fn int(s: &mut AnalysisSession, value: i64) -> NodeId {
    s.arena.push(NodeKind::IntLit(value), Span::DUMMY)
}

fn data(s: &mut AnalysisSession, name: &str, ty: Option<NodeId>, init: Option<NodeId>) -> NodeId {
    let name = s.interner.intern(name);
    s.arena.push(NodeKind::Data { name, ty, init }, Span::DUMMY)
}

fn call(s: &mut AnalysisSession, callee: NodeId, args: Vec<NodeId>) -> NodeId {
    s.arena.push(NodeKind::Call { callee, args }, Span::DUMMY)
}

fn block(s: &mut AnalysisSession, stmts: Vec<NodeId>) -> NodeId {
    s.arena.push(NodeKind::Block(stmts), Span::DUMMY)
}

fn func(
    s: &mut AnalysisSession,
    name: &str,
    params: Vec<NodeId>,
    ret_ty: Option<NodeId>,
    body: Option<NodeId>,
    attrs: &[&str],
) -> NodeId {
    let name = s.interner.intern(name);
    let attrs = attrs
        .iter()
        .map(|a| Attribute {
            name: s.interner.intern(a),
            span: Span::DUMMY,
        })
        .collect();
    s.arena.push_with_attrs(
        NodeKind::Function {
            name,
            params,
            ret_ty,
            body,
        },
        Span::DUMMY,
        attrs,
    )
}

fn class(s: &mut AnalysisSession, name: &str, supers: Vec<NodeId>, members: Vec<NodeId>) -> NodeId {
    let name = s.interner.intern(name);
    s.arena.push(
        NodeKind::Class {
            name,
            supers,
            members,
        },
        Span::DUMMY,
    )
}

fn find_def(s: &AnalysisSession, name: &str) -> DefId {
    let name = s.interner.intern(name);
    s.program.lookup(ScopeId::ROOT, name)[0]
}

fn codes(s: &AnalysisSession) -> Vec<ErrorCode> {
    s.sink.diagnostics().iter().map(|d| d.code).collect()
}

#[test]
fn explicit_identity_function_analyzes_cleanly() {
    let mut s = AnalysisSession::new();
    let int_ty = ident(&mut s, "int");
    let x = data(&mut s, "x", Some(int_ty), None);
    let ret = ident(&mut s, "int");
    let body = ident(&mut s, "x");
    let f = func(&mut s, "id", vec![x], Some(ret), Some(body), &[]);

    assert!(s.analyze(&[f]));
    assert!(s.sink.is_empty(), "unexpected: {:?}", codes(&s));

    let ty = s.program.def(find_def(&s, "id")).ty;
    assert_eq!(s.pool.tag(ty), Tag::Function);
    assert_eq!(s.pool.function_params(ty), vec![Idx::INT]);
    assert_eq!(s.pool.function_return(ty), Idx::INT);
}

#[test]
fn inferred_identity_generalizes_to_one_variable() {
    let mut s = AnalysisSession::new();
    let x = data(&mut s, "x", None, None);
    let body = ident(&mut s, "x");
    let f = func(&mut s, "id", vec![x], None, Some(body), &[]);

    assert!(s.analyze(&[f]));
    assert!(s.sink.is_empty(), "unexpected: {:?}", codes(&s));

    let def = s.program.def(find_def(&s, "id"));
    assert_eq!(def.type_vars.len(), 1);
    let ty = def.ty;
    assert_eq!(s.pool.tag(ty), Tag::Function);
    // Parameter and return are the same variable.
    assert_eq!(s.pool.function_params(ty)[0], s.pool.function_return(ty));
}

#[test]
fn recursive_function_without_return_type_is_rejected() {
    let mut s = AnalysisSession::new();
    let callee = ident(&mut s, "f");
    let body = call(&mut s, callee, Vec::new());
    let f = func(&mut s, "f", Vec::new(), None, Some(body), &[]);

    assert!(!s.analyze(&[f]));
    assert!(codes(&s).contains(&ErrorCode::E2104));
}

#[test]
fn overloads_resolve_by_argument_type() {
    let mut s = AnalysisSession::new();
    let (int_p, int_r) = (ident(&mut s, "int"), ident(&mut s, "int"));
    let x1 = data(&mut s, "x", Some(int_p), None);
    let b1 = ident(&mut s, "x");
    let f1 = func(&mut s, "f", vec![x1], Some(int_r), Some(b1), &["converges"]);

    let (str_p, str_r) = (ident(&mut s, "string"), ident(&mut s, "string"));
    let x2 = data(&mut s, "x", Some(str_p), None);
    let b2 = ident(&mut s, "x");
    let f2 = func(&mut s, "f", vec![x2], Some(str_r), Some(b2), &["converges"]);

    let callee = ident(&mut s, "f");
    let arg = int(&mut s, 3);
    let c = call(&mut s, callee, vec![arg]);

    assert!(s.analyze(&[f1, f2, c]));
    assert!(s.sink.is_empty(), "unexpected: {:?}", codes(&s));
    assert_eq!(s.result_type(c), Some(Idx::INT));
}

#[test]
fn unknown_argument_suppresses_overload_diagnostics() {
    let mut s = AnalysisSession::new();
    let (int_p, int_r) = (ident(&mut s, "int"), ident(&mut s, "int"));
    let x1 = data(&mut s, "x", Some(int_p), None);
    let b1 = ident(&mut s, "x");
    let f1 = func(&mut s, "f", vec![x1], Some(int_r), Some(b1), &["converges"]);

    let callee = ident(&mut s, "f");
    let arg = ident(&mut s, "no_such_name");
    let c = call(&mut s, callee, vec![arg]);

    assert!(!s.analyze(&[f1, c]));
    // Only the unknown identifier is reported; the call stays silent.
    assert_eq!(codes(&s), vec![ErrorCode::E2001]);
}

#[test]
fn no_matching_overload_lists_candidates() {
    let mut s = AnalysisSession::new();
    let (int_p, int_r) = (ident(&mut s, "int"), ident(&mut s, "int"));
    let x1 = data(&mut s, "x", Some(int_p), None);
    let b1 = ident(&mut s, "x");
    let f1 = func(&mut s, "f", vec![x1], Some(int_r), Some(b1), &["converges"]);

    let (str_p, str_r) = (ident(&mut s, "string"), ident(&mut s, "string"));
    let x2 = data(&mut s, "x", Some(str_p), None);
    let b2 = ident(&mut s, "x");
    let f2 = func(&mut s, "f", vec![x2], Some(str_r), Some(b2), &["converges"]);

    let callee = ident(&mut s, "f");
    let arg = s.arena.push(NodeKind::LogicLit(true), Span::DUMMY);
    let c = call(&mut s, callee, vec![arg]);

    assert!(!s.analyze(&[f1, f2, c]));
    assert_eq!(codes(&s), vec![ErrorCode::E2301]);
    assert_eq!(s.sink.diagnostics()[0].notes.len(), 2);
}

#[test]
fn module_members_resolve_qualified() {
    let mut s = AnalysisSession::new();
    let ret = ident(&mut s, "int");
    let body = int(&mut s, 5);
    let g = func(&mut s, "g", Vec::new(), Some(ret), Some(body), &["converges"]);
    let name = s.interner.intern("m");
    let module = s.arena.push(
        NodeKind::Module {
            name,
            members: vec![g],
        },
        Span::DUMMY,
    );
    let callee = qualified(&mut s, "m", "g");
    let c = call(&mut s, callee, Vec::new());

    assert!(s.analyze(&[module, c]));
    assert!(s.sink.is_empty(), "unexpected: {:?}", codes(&s));
    assert_eq!(s.result_type(c), Some(Idx::INT));
}

#[test]
fn using_overlays_a_module_scope() {
    let mut s = AnalysisSession::new();
    let ret = ident(&mut s, "int");
    let body = int(&mut s, 5);
    let g = func(&mut s, "g", Vec::new(), Some(ret), Some(body), &["converges"]);
    let name = s.interner.intern("m");
    let module = s.arena.push(
        NodeKind::Module {
            name,
            members: vec![g],
        },
        Span::DUMMY,
    );
    let target = ident(&mut s, "m");
    let using = s.arena.push(NodeKind::Using { target }, Span::DUMMY);
    let callee = ident(&mut s, "g");
    let c = call(&mut s, callee, Vec::new());

    assert!(s.analyze(&[module, using, c]));
    assert!(s.sink.is_empty(), "unexpected: {:?}", codes(&s));
    assert_eq!(s.result_type(c), Some(Idx::INT));
}

#[test]
fn forward_references_work_across_phases() {
    let mut s = AnalysisSession::new();
    // The call appears before the declaration in source order.
    let callee = ident(&mut s, "late");
    let c = call(&mut s, callee, Vec::new());
    let ret = ident(&mut s, "int");
    let body = int(&mut s, 7);
    let f = func(&mut s, "late", Vec::new(), Some(ret), Some(body), &["converges"]);

    assert!(s.analyze(&[c, f]));
    assert!(s.sink.is_empty(), "unexpected: {:?}", codes(&s));
    assert_eq!(s.result_type(c), Some(Idx::INT));
}

#[test]
fn inheritance_cycle_is_reported_once_and_truncated() {
    let mut s = AnalysisSession::new();
    let super_b = ident(&mut s, "b");
    let a = class(&mut s, "a", vec![super_b], Vec::new());
    let super_a = ident(&mut s, "a");
    let b = class(&mut s, "b", vec![super_a], Vec::new());

    assert!(!s.analyze(&[a, b]));
    assert_eq!(codes(&s), vec![ErrorCode::E2102]);
}

#[test]
fn unreachable_code_after_return_warns_once() {
    let mut s = AnalysisSession::new();
    let five = int(&mut s, 5);
    let ret_stmt = s.arena.push(NodeKind::Return { value: Some(five) }, Span::DUMMY);
    let dead = int(&mut s, 7);
    let body = block(&mut s, vec![ret_stmt, dead]);
    let ret_ty = ident(&mut s, "int");
    let f = func(&mut s, "f", Vec::new(), Some(ret_ty), Some(body), &[]);

    assert!(s.analyze(&[f]));
    assert_eq!(s.sink.warning_count(), 1);
    assert_eq!(codes(&s), vec![ErrorCode::E2401]);
}

#[test]
fn suspending_call_needs_permission() {
    let mut s = AnalysisSession::new();
    let void_ty = ident(&mut s, "void");
    let sleepy = func(&mut s, "sleepy", Vec::new(), Some(void_ty), None, &["suspends"]);

    let callee = ident(&mut s, "sleepy");
    let c = call(&mut s, callee, Vec::new());
    let body = block(&mut s, vec![c]);
    let void_ty2 = ident(&mut s, "void");
    let g = func(&mut s, "g", Vec::new(), Some(void_ty2), Some(body), &[]);

    assert!(!s.analyze(&[sleepy, g]));
    assert!(codes(&s).contains(&ErrorCode::E2201));
}

#[test]
fn failable_call_requires_brackets() {
    let mut s = AnalysisSession::new();
    let int_ty = ident(&mut s, "int");
    let d = func(&mut s, "maybe", Vec::new(), Some(int_ty), None, &["decides"]);

    let callee = ident(&mut s, "maybe");
    let c = call(&mut s, callee, Vec::new());
    let body = block(&mut s, vec![c]);
    let void_ty = ident(&mut s, "void");
    let g = func(&mut s, "g", Vec::new(), Some(void_ty), Some(body), &[]);

    assert!(!s.analyze(&[d, g]));
    assert!(codes(&s).contains(&ErrorCode::E2203));
}

#[test]
fn failable_call_in_a_condition_is_a_failure_context() {
    let mut s = AnalysisSession::new();
    let int_ty = ident(&mut s, "int");
    let d = func(&mut s, "maybe", Vec::new(), Some(int_ty), None, &["decides"]);

    let callee = ident(&mut s, "maybe");
    let cond = s.arena.push(
        NodeKind::FailCall {
            callee,
            args: Vec::new(),
        },
        Span::DUMMY,
    );
    let then_body = block(&mut s, Vec::new());
    let if_node = s.arena.push(
        NodeKind::If {
            cond,
            then_body,
            else_body: None,
        },
        Span::DUMMY,
    );
    let body = block(&mut s, vec![if_node]);
    let void_ty = ident(&mut s, "void");
    let g = func(&mut s, "g", Vec::new(), Some(void_ty), Some(body), &[]);

    assert!(s.analyze(&[d, g]));
    assert!(s.sink.is_empty(), "unexpected: {:?}", codes(&s));
}

#[test]
fn deprecated_use_warns_at_the_use_site() {
    let mut s = AnalysisSession::new();
    let ret = ident(&mut s, "int");
    let body = int(&mut s, 5);
    let old = func(
        &mut s,
        "old",
        Vec::new(),
        Some(ret),
        Some(body),
        &["deprecated", "converges"],
    );
    let callee = ident(&mut s, "old");
    let c = call(&mut s, callee, Vec::new());

    assert!(s.analyze(&[old, c]));
    assert_eq!(codes(&s), vec![ErrorCode::E2506]);
    assert_eq!(s.sink.warning_count(), 1);
}

#[test]
fn private_members_are_inaccessible_from_outside() {
    let mut s = AnalysisSession::new();
    let int_ty = ident(&mut s, "int");
    let name = s.interner.intern("secret");
    let member = s.arena.push_with_attrs(
        NodeKind::Data {
            name,
            ty: Some(int_ty),
            init: None,
        },
        Span::DUMMY,
        vec![Attribute {
            name: s.interner.intern("private"),
            span: Span::DUMMY,
        }],
    );
    let c = class(&mut s, "box", Vec::new(), vec![member]);
    let access = qualified(&mut s, "box", "secret");

    assert!(!s.analyze(&[c, access]));
    assert!(codes(&s).contains(&ErrorCode::E2503));
}

#[test]
fn override_links_to_the_ancestor_member() {
    let mut s = AnalysisSession::new();
    let ret1 = ident(&mut s, "int");
    let one = int(&mut s, 1);
    let base_m = func(&mut s, "m", Vec::new(), Some(ret1), Some(one), &[]);
    let base = class(&mut s, "base", Vec::new(), vec![base_m]);

    let ret2 = ident(&mut s, "int");
    let two = int(&mut s, 2);
    let derived_m = func(&mut s, "m", Vec::new(), Some(ret2), Some(two), &["override"]);
    let super_ref = ident(&mut s, "base");
    let derived = class(&mut s, "derived", vec![super_ref], vec![derived_m]);

    assert!(s.analyze(&[base, derived]));
    assert!(s.sink.is_empty(), "unexpected: {:?}", codes(&s));

    let derived_scope = s
        .program
        .def(find_def(&s, "derived"))
        .inner_scope
        .expect("class scope");
    let m = s.interner.intern("m");
    let member = s.program.scope(derived_scope).named(m)[0];
    assert!(s.program.def(member).overridden.is_some());
}

#[test]
fn incompatible_override_is_rejected() {
    let mut s = AnalysisSession::new();
    let ret1 = ident(&mut s, "int");
    let one = int(&mut s, 1);
    let base_m = func(&mut s, "m", Vec::new(), Some(ret1), Some(one), &[]);
    let base = class(&mut s, "base", Vec::new(), vec![base_m]);

    let ret2 = ident(&mut s, "string");
    let hello = s.arena.push(
        NodeKind::StrLit(s.interner.intern("hello")),
        Span::DUMMY,
    );
    let derived_m = func(&mut s, "m", Vec::new(), Some(ret2), Some(hello), &["override"]);
    let super_ref = ident(&mut s, "base");
    let derived = class(&mut s, "derived", vec![super_ref], vec![derived_m]);

    assert!(!s.analyze(&[base, derived]));
    assert!(codes(&s).contains(&ErrorCode::E2505));
}

#[test]
fn enumerators_carry_the_enumeration_type() {
    let mut s = AnalysisSession::new();
    let red = s.arena.push(
        NodeKind::Enumerator {
            name: s.interner.intern("red"),
        },
        Span::DUMMY,
    );
    let green = s.arena.push(
        NodeKind::Enumerator {
            name: s.interner.intern("green"),
        },
        Span::DUMMY,
    );
    let color = s.arena.push(
        NodeKind::Enum {
            name: s.interner.intern("color"),
            enumerators: vec![red, green],
        },
        Span::DUMMY,
    );
    let access = qualified(&mut s, "color", "red");

    assert!(s.analyze(&[color, access]));
    assert!(s.sink.is_empty(), "unexpected: {:?}", codes(&s));
    let enum_ty = s.program.def(find_def(&s, "color")).ty;
    assert_eq!(s.result_type(access), Some(enum_ty));
}

#[test]
fn duplicate_data_definitions_collide() {
    let mut s = AnalysisSession::new();
    let five = int(&mut s, 5);
    let first = data(&mut s, "x", None, Some(five));
    let six = int(&mut s, 6);
    let second = data(&mut s, "x", None, Some(six));

    assert!(!s.analyze(&[first, second]));
    assert!(codes(&s).contains(&ErrorCode::E2002));
}
