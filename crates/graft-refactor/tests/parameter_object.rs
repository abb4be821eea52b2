//! Bundling parameters into a synthesized carrier class, including a
//! recursive method whose self-call is rewritten inside the redeclared body.

use graft_model::{Argument, Primitive, ProgramBuilder, Receiver, TypeRef};
use graft_refactor::{perform, CancelFlag, IntroduceParameterObject, RefactorRequest, RequestKind};
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
fn carrier_replaces_the_group_at_declaration_and_call_sites() {
    let mut b = ProgramBuilder::new();
    let unit_calc = b.unit("Calc.java");
    let calc = b.class(unit_calc, "Calc");
    let span = b.method(
        calc,
        "span",
        Some(int()),
        &[("start", int()), ("end", int())],
        Some("if (start < end) {\n    return span(start + 1, end);\n}\nreturn end - start;"),
    );
    b.invoke(
        span,
        "span(start + 1, end)",
        "span",
        Receiver::ImplicitThis,
        None,
        vec![Argument::new("start + 1", int()), Argument::new("end", int())],
    );

    let unit_main = b.unit("Main.java");
    let main_cls = b.class(unit_main, "Main");
    let run = b.method(
        main_cls,
        "run",
        None,
        &[("c", TypeRef::named(calc)), ("a", int()), ("b", int())],
        Some("c.span(a, b);"),
    );
    b.invoke(
        run,
        "c.span(a, b)",
        "span",
        Receiver::Expr("c".to_string()),
        Some(TypeRef::named(calc)),
        vec![Argument::new("a", int()), Argument::new("b", int())],
    );
    let program = b.finish().expect("valid model");

    let outcome = perform(
        &program,
        &request(RequestKind::IntroduceParameterObject(IntroduceParameterObject {
            method: span,
            class_name: "Range".to_string(),
            parameter_name: None,
            parameters: None,
        })),
        &CancelFlag::new(),
    )
    .expect("request runs");
    assert!(outcome.status.allows_edits());
    let changed = outcome.edits.apply(&program).expect("edits apply");

    // The recursive call is rewritten inside the re-rendered body, and the
    // grouped parameters read through the carrier's fields.
    assert_eq!(
        changed["Calc.java"],
        "class Calc {\n\
         \x20   int span(Range range) {\n\
         \x20       if (range.start < range.end) {\n\
         \x20           return span(new Range(range.start + 1, range.end));\n\
         \x20       }\n\
         \x20       return range.end - range.start;\n\
         \x20   }\n\
         }\n\
         \n\
         public final class Range {\n\
         \x20   public final int start;\n\
         \x20   public final int end;\n\
         \n\
         \x20   public Range(int start, int end) {\n\
         \x20       this.start = start;\n\
         \x20       this.end = end;\n\
         \x20   }\n\
         }\n"
    );
    assert_eq!(
        changed["Main.java"],
        "class Main {\n\
         \x20   void run(Calc c, int a, int b) {\n\
         \x20       c.span(new Range(a, b));\n\
         \x20   }\n\
         }\n"
    );
}

#[test]
fn a_partial_group_keeps_the_remaining_parameters_in_place() {
    let mut b = ProgramBuilder::new();
    let unit = b.unit("Mail.java");
    let mail = b.class(unit, "Mail");
    let send = b.method(
        mail,
        "send",
        None,
        &[("to", TypeRef::Unresolved("java.lang.String".to_string())),
          ("retries", int()),
          ("timeout", int())],
        Some("dispatch(to, retries, timeout);"),
    );
    let program = b.finish().expect("valid model");

    let outcome = perform(
        &program,
        &request(RequestKind::IntroduceParameterObject(IntroduceParameterObject {
            method: send,
            class_name: "RetryPolicy".to_string(),
            parameter_name: Some("policy".to_string()),
            parameters: Some(vec![2, 1]),
        })),
        &CancelFlag::new(),
    )
    .expect("request runs");
    assert!(outcome.status.allows_edits());
    let changed = outcome.edits.apply(&program).expect("edits apply");

    // Group order is declared order, whatever order the host listed.
    assert!(changed["Mail.java"].contains("void send(String to, RetryPolicy policy)"));
    assert!(changed["Mail.java"]
        .contains("dispatch(to, policy.retries, policy.timeout);"));
    assert!(changed["Mail.java"].contains("public RetryPolicy(int retries, int timeout)"));
}

#[test]
fn the_variable_arity_parameter_cannot_join_the_group() {
    let mut b = ProgramBuilder::new();
    let unit = b.unit("Log.java");
    let log_cls = b.class(unit, "Log");
    let log = b.method(
        log_cls,
        "log",
        None,
        &[("level", int()),
          ("args", TypeRef::array(TypeRef::Unresolved("java.lang.Object".to_string())))],
        Some(""),
    );
    b.set_varargs(log);
    let program = b.finish().expect("valid model");

    let outcome = perform(
        &program,
        &request(RequestKind::IntroduceParameterObject(IntroduceParameterObject {
            method: log,
            class_name: "Request".to_string(),
            parameter_name: None,
            parameters: None,
        })),
        &CancelFlag::new(),
    )
    .expect("request runs");
    assert!(!outcome.status.allows_edits());
    assert!(outcome.edits.is_empty());
}

#[test]
fn an_existing_type_of_the_same_name_blocks_the_carrier() {
    let mut b = ProgramBuilder::new();
    let unit = b.unit("Calc.java");
    let calc = b.class(unit, "Calc");
    let span = b.method(calc, "span", Some(int()), &[("start", int()), ("end", int())], Some("return end - start;"));
    let unit_range = b.unit("Range.java");
    b.class(unit_range, "Range");
    let program = b.finish().expect("valid model");

    let outcome = perform(
        &program,
        &request(RequestKind::IntroduceParameterObject(IntroduceParameterObject {
            method: span,
            class_name: "Range".to_string(),
            parameter_name: None,
            parameters: None,
        })),
        &CancelFlag::new(),
    )
    .expect("request runs");
    assert!(!outcome.status.allows_edits());
    assert!(outcome.edits.is_empty());
}
