//! Inlining constants, temps, and single-expression methods, and the
//! evaluation-count and identity hazards that must abort it.

use graft_model::{Argument, Primitive, ProgramBuilder, Receiver, TypeRef};
use graft_refactor::{
    perform, CancelFlag, InlineConstant, InlineMethod, InlineTemp, RefactorRequest, RequestKind,
};
use pretty_assertions::assert_eq;

fn int() -> TypeRef {
    TypeRef::Primitive(Primitive::Int)
}

fn request(kind: RequestKind) -> RefactorRequest {
    RefactorRequest {
        kind,
        allow_partial: false,
    }
}

#[test]
fn temp_with_side_effecting_initializer_and_two_uses_is_rejected() {
    let mut b = ProgramBuilder::new();
    let unit = b.unit("A.java");
    let a = b.class(unit, "A");
    let work = b.method(
        a,
        "work",
        Some(int()),
        &[("x", int())],
        Some("int t = x--;\nf(t);\ng(t);\nreturn 0;"),
    );
    let t = b.local(work, "t", int(), "x--");
    b.name_ref(work, "t", t);
    b.name_ref(work, "t", t);
    let program = b.finish().expect("valid model");

    let outcome = perform(
        &program,
        &request(RequestKind::InlineTemp(InlineTemp { local: t })),
        &CancelFlag::new(),
    )
    .expect("request runs");
    assert!(!outcome.status.allows_edits());
    assert!(outcome.edits.is_empty());
    assert!(outcome
        .status
        .entries
        .iter()
        .any(|e| e.message.contains("side effects")));
}

#[test]
fn temp_with_side_effecting_initializer_and_one_use_inlines_parenthesized() {
    let mut b = ProgramBuilder::new();
    let unit = b.unit("A.java");
    let a = b.class(unit, "A");
    let work = b.method(
        a,
        "work",
        Some(int()),
        &[("x", int())],
        Some("int t = x--;\nf(t);\nreturn 0;"),
    );
    let t = b.local(work, "t", int(), "x--");
    b.name_ref(work, "t", t);
    let program = b.finish().expect("valid model");

    let outcome = perform(
        &program,
        &request(RequestKind::InlineTemp(InlineTemp { local: t })),
        &CancelFlag::new(),
    )
    .expect("request runs");
    assert!(outcome.status.allows_edits());
    let changed = outcome.edits.apply(&program).expect("edits apply");
    assert!(changed["A.java"].contains("f((x--));"));
    assert!(!changed["A.java"].contains("int t = x--;"));
}

#[test]
fn unused_temp_with_side_effects_is_not_silently_dropped() {
    let mut b = ProgramBuilder::new();
    let unit = b.unit("A.java");
    let a = b.class(unit, "A");
    let work = b.method(a, "work", None, &[("x", int())], Some("int t = x--;"));
    let t = b.local(work, "t", int(), "x--");
    let program = b.finish().expect("valid model");

    let outcome = perform(
        &program,
        &request(RequestKind::InlineTemp(InlineTemp { local: t })),
        &CancelFlag::new(),
    )
    .expect("request runs");
    assert!(!outcome.status.allows_edits());
    assert!(outcome
        .status
        .entries
        .iter()
        .any(|e| e.message.contains("drop the effect")));
}

#[test]
fn lambda_constant_fanned_into_an_array_initializer_is_rejected() {
    let mut b = ProgramBuilder::new();
    let unit = b.unit("A.java");
    let a = b.class(unit, "A");
    let f = b.field_init(
        a,
        "F",
        TypeRef::Unresolved("java.util.function.Function".to_string()),
        Some("x -> x + 1"),
    );
    let used = b.method(a, "table", None, &[], Some("Object[] r = { F, F };"));
    b.name_ref_full(used, "F", f, true);
    b.name_ref_full(used, "F", f, true);
    let program = b.finish().expect("valid model");

    let outcome = perform(
        &program,
        &request(RequestKind::InlineConstant(InlineConstant { field: f })),
        &CancelFlag::new(),
    )
    .expect("request runs");
    assert!(!outcome.status.allows_edits());
    assert!(outcome.edits.is_empty());
    assert!(outcome
        .status
        .entries
        .iter()
        .any(|e| e.message.contains("identities")));
}

#[test]
fn plain_constant_inlines_into_every_use_and_disappears() {
    let mut b = ProgramBuilder::new();
    let unit = b.unit("A.java");
    let a = b.class(unit, "A");
    let max = b.field_init(a, "MAX", int(), Some("100"));
    let used = b.method(a, "cap", Some(int()), &[], Some("return MAX + MAX;"));
    b.name_ref(used, "MAX", max);
    b.name_ref(used, "MAX", max);
    let program = b.finish().expect("valid model");

    let outcome = perform(
        &program,
        &request(RequestKind::InlineConstant(InlineConstant { field: max })),
        &CancelFlag::new(),
    )
    .expect("request runs");
    assert!(outcome.status.allows_edits());
    let changed = outcome.edits.apply(&program).expect("edits apply");
    assert!(changed["A.java"].contains("return 100 + 100;"));
    assert!(!changed["A.java"].contains("MAX"));
}

#[test]
fn single_expression_method_inlines_with_substituted_arguments() {
    let mut b = ProgramBuilder::new();
    let unit = b.unit("Calc.java");
    let calc = b.class(unit, "Calc");
    let twice = b.method(calc, "twice", Some(int()), &[("v", int())], Some("return v + v;"));
    let run = b.method(calc, "run", Some(int()), &[], Some("return twice(3) + 1;"));
    b.invoke(
        run,
        "twice(3)",
        "twice",
        Receiver::ImplicitThis,
        None,
        vec![Argument::new("3", int())],
    );
    let program = b.finish().expect("valid model");

    let outcome = perform(
        &program,
        &request(RequestKind::InlineMethod(InlineMethod { method: twice })),
        &CancelFlag::new(),
    )
    .expect("request runs");
    assert!(outcome.status.allows_edits());
    let changed = outcome.edits.apply(&program).expect("edits apply");
    assert_eq!(
        changed["Calc.java"],
        "class Calc {\n\
         \n\
         \x20   int run() {\n\
         \x20       return (3 + 3) + 1;\n\
         \x20   }\n\
         }\n"
    );
}

#[test]
fn side_effecting_argument_must_not_be_evaluated_twice() {
    let mut b = ProgramBuilder::new();
    let unit = b.unit("Calc.java");
    let calc = b.class(unit, "Calc");
    let twice = b.method(calc, "twice", Some(int()), &[("v", int())], Some("return v + v;"));
    let run = b.method(calc, "run", Some(int()), &[("x", int())], Some("return twice(x--);"));
    b.invoke(
        run,
        "twice(x--)",
        "twice",
        Receiver::ImplicitThis,
        None,
        vec![Argument::new("x--", int())],
    );
    let program = b.finish().expect("valid model");

    let outcome = perform(
        &program,
        &request(RequestKind::InlineMethod(InlineMethod { method: twice })),
        &CancelFlag::new(),
    )
    .expect("request runs");
    assert!(!outcome.status.allows_edits());
    assert!(outcome.edits.is_empty());
}

#[test]
fn recursive_method_cannot_be_inlined() {
    let mut b = ProgramBuilder::new();
    let unit = b.unit("R.java");
    let r = b.class(unit, "R");
    let f = b.method(r, "f", Some(int()), &[("n", int())], Some("return f(n - 1);"));
    b.invoke(
        f,
        "f(n - 1)",
        "f",
        Receiver::ImplicitThis,
        None,
        vec![Argument::new("n - 1", int())],
    );
    let program = b.finish().expect("valid model");

    let outcome = perform(
        &program,
        &request(RequestKind::InlineMethod(InlineMethod { method: f })),
        &CancelFlag::new(),
    )
    .expect("request runs");
    assert!(!outcome.status.allows_edits());
    assert!(outcome
        .status
        .entries
        .iter()
        .any(|e| e.message.contains("calls itself")));
}
