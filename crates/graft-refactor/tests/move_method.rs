//! Moving an instance method to a parameter's type, in both delegator and
//! inline modes, including the round trip back to the original class.

use graft_model::{Argument, DeclId, Program, ProgramBuilder, Receiver, TypeRef};
use graft_refactor::{perform, CancelFlag, MoveInstanceMethod, MoveTarget, RefactorRequest, RequestKind};
use pretty_assertions::assert_eq;

struct Scenario {
    program: Program,
    m_a1: DeclId,
}

/// `A.mA1(B b)` touches both instances: two calls through `b` and one
/// unqualified call on its own class.
fn scenario() -> Scenario {
    let mut b = ProgramBuilder::new();
    let unit_b = b.unit("B.java");
    let b_cls = b.class(unit_b, "B");
    b.method(b_cls, "mB1", None, &[], Some(""));
    b.method(b_cls, "mB2", None, &[], Some(""));

    let unit_a = b.unit("A.java");
    let a_cls = b.class(unit_a, "A");
    b.method(a_cls, "mA2", None, &[], Some(""));
    let m_a1 = b.method(
        a_cls,
        "mA1",
        None,
        &[("b", TypeRef::named(b_cls))],
        Some("b.mB1();\nmA2();\nb.mB2();"),
    );

    let unit_c = b.unit("C.java");
    let c_cls = b.class(unit_c, "C");
    let run = b.method(
        c_cls,
        "run",
        None,
        &[("a", TypeRef::named(a_cls)), ("b", TypeRef::named(b_cls))],
        Some("a.mA1(b);"),
    );
    b.invoke(
        run,
        "a.mA1(b)",
        "mA1",
        Receiver::Expr("a".to_string()),
        Some(TypeRef::named(a_cls)),
        vec![Argument::new("b", TypeRef::named(b_cls))],
    );

    Scenario {
        program: b.finish().expect("valid model"),
        m_a1,
    }
}

fn move_request(method: DeclId, inline_delegator: bool) -> RefactorRequest {
    RefactorRequest {
        kind: RequestKind::MoveInstanceMethod(MoveInstanceMethod {
            method,
            target: MoveTarget::Parameter { index: 0 },
            inline_delegator,
        }),
        allow_partial: false,
    }
}

#[test]
fn move_to_parameter_keeps_a_delegator_behind() {
    let s = scenario();
    let outcome = perform(&s.program, &move_request(s.m_a1, false), &CancelFlag::new())
        .expect("request runs");
    assert!(outcome.status.allows_edits());
    let changed = outcome.edits.apply(&s.program).expect("edits apply");

    // B gains the moved method: old receiver calls lose their qualifier and
    // the old instance is threaded as a parameter.
    assert_eq!(
        changed["B.java"],
        "class B {\n\
         \x20   void mB1() {\n\
         \x20   }\n\
         \n\
         \x20   void mB2() {\n\
         \x20   }\n\
         \n\
         \x20   void mA1(A a) {\n\
         \x20       mB1();\n\
         \x20       a.mA2();\n\
         \x20       mB2();\n\
         \x20   }\n\
         }\n"
    );
    // The original forwards through the old parameter.
    assert_eq!(
        changed["A.java"],
        "class A {\n\
         \x20   void mA2() {\n\
         \x20   }\n\
         \n\
         \x20   void mA1(B b) {\n\
         \x20       b.mA1(this);\n\
         \x20   }\n\
         }\n"
    );
    // Call sites are untouched in delegator mode.
    assert_eq!(changed.len(), 2);
}

#[test]
fn move_with_inlined_delegator_swaps_receiver_and_argument_at_call_sites() {
    let s = scenario();
    let outcome = perform(&s.program, &move_request(s.m_a1, true), &CancelFlag::new())
        .expect("request runs");
    assert!(outcome.status.allows_edits());
    let changed = outcome.edits.apply(&s.program).expect("edits apply");

    assert!(changed["B.java"].contains("void mA1(A a)"));
    assert_eq!(
        changed["A.java"],
        "class A {\n\
         \x20   void mA2() {\n\
         \x20   }\n\
         \n\
         }\n"
    );
    assert_eq!(
        changed["C.java"],
        "class C {\n\
         \x20   void run(A a, B b) {\n\
         \x20       b.mA1(a);\n\
         \x20   }\n\
         }\n"
    );
}

#[test]
fn moving_back_restores_the_original_body_and_call_shape() {
    // The mirrored snapshot: mA1 already lives on B.
    let mut b = ProgramBuilder::new();
    let unit_a = b.unit("A.java");
    let a_cls = b.class(unit_a, "A");
    b.method(a_cls, "mA2", None, &[], Some(""));

    let unit_b = b.unit("B.java");
    let b_cls = b.class(unit_b, "B");
    b.method(b_cls, "mB1", None, &[], Some(""));
    b.method(b_cls, "mB2", None, &[], Some(""));
    let moved = b.method(
        b_cls,
        "mA1",
        None,
        &[("a", TypeRef::named(a_cls))],
        Some("mB1();\na.mA2();\nmB2();"),
    );

    let unit_c = b.unit("C.java");
    let c_cls = b.class(unit_c, "C");
    let run = b.method(
        c_cls,
        "run",
        None,
        &[("a", TypeRef::named(a_cls)), ("b", TypeRef::named(b_cls))],
        Some("b.mA1(a);"),
    );
    b.invoke(
        run,
        "b.mA1(a)",
        "mA1",
        Receiver::Expr("b".to_string()),
        Some(TypeRef::named(b_cls)),
        vec![Argument::new("a", TypeRef::named(a_cls))],
    );
    let program = b.finish().expect("valid model");

    let outcome = perform(&program, &move_request(moved, true), &CancelFlag::new())
        .expect("request runs");
    assert!(outcome.status.allows_edits());
    let changed = outcome.edits.apply(&program).expect("edits apply");

    // Byte-identical to the forward scenario's starting point.
    let forward = scenario();
    let forward_a = forward
        .program
        .units()
        .iter()
        .find(|u| u.path == "A.java")
        .expect("unit exists");
    assert_eq!(changed["A.java"], forward_a.text);
    assert!(changed["C.java"].contains("a.mA1(b);"));
}

#[test]
fn self_recursive_method_cannot_lose_its_delegator() {
    let mut b = ProgramBuilder::new();
    let unit = b.unit("A.java");
    let helper_cls = b.class(unit, "Helper");
    b.method(helper_cls, "step", None, &[], Some(""));
    let a_cls = b.class(unit, "A");
    let walk = b.method(
        a_cls,
        "walk",
        None,
        &[("h", TypeRef::named(helper_cls))],
        Some("h.step();\nwalk(h);"),
    );
    b.invoke(
        walk,
        "walk(h)",
        "walk",
        Receiver::ImplicitThis,
        None,
        vec![Argument::new("h", TypeRef::named(helper_cls))],
    );
    let program = b.finish().expect("valid model");

    let outcome = perform(&program, &move_request(walk, true), &CancelFlag::new())
        .expect("request runs");
    assert!(!outcome.status.allows_edits());
    assert!(outcome.edits.is_empty());
    assert!(outcome
        .status
        .entries
        .iter()
        .any(|e| e.message.contains("calls itself")));
}
