//! Extract Method, Introduce Indirection, and Make Static end to end.

use graft_model::{Argument, Primitive, ProgramBuilder, Receiver, TextRange, TypeRef};
use graft_refactor::{
    perform, CancelFlag, ExtractMethod, IntroduceIndirection, MakeStatic, RefactorRequest,
    RequestKind,
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
fn extract_method_parameterizes_free_variables() {
    let mut b = ProgramBuilder::new();
    let unit = b.unit("Util.java");
    let util = b.class(unit, "Util");
    let report = b.method(
        util,
        "report",
        None,
        &[("n", int())],
        Some("int sum = n + n;\nlog(sum);\nlog(n);"),
    );
    let sum = b.local(report, "sum", int(), "n + n");
    b.name_ref(report, "sum", sum);
    let program = b.finish().expect("valid model");

    let text = program.decl_text(report).expect("rendered");
    let sel = TextRange::new(
        text.find("        int sum").expect("selection start"),
        text.find("        log(n)").expect("selection end"),
    );
    let outcome = perform(
        &program,
        &request(RequestKind::ExtractMethod(ExtractMethod {
            method: report,
            selection: sel,
            new_name: "helper".to_string(),
        })),
        &CancelFlag::new(),
    )
    .expect("request runs");
    assert!(outcome.status.allows_edits());
    let changed = outcome.edits.apply(&program).expect("edits apply");

    assert_eq!(
        changed["Util.java"],
        "class Util {\n\
         \x20   void report(int n) {\n\
         \x20       helper(n);\n\
         \x20       log(n);\n\
         \x20   }\n\
         \n\
         \x20   private void helper(int n) {\n\
         \x20       int sum = n + n;\n\
         \x20       log(sum);\n\
         \x20   }\n\
         }\n"
    );
}

#[test]
fn extract_method_returns_the_single_outflowing_local() {
    let mut b = ProgramBuilder::new();
    let unit = b.unit("Util.java");
    let util = b.class(unit, "Util");
    let report = b.method(
        util,
        "report",
        Some(int()),
        &[("n", int())],
        Some("int sum = n + n;\nlog(sum);\nreturn sum;"),
    );
    let sum = b.local(report, "sum", int(), "n + n");
    b.name_ref(report, "sum", sum);
    b.name_ref(report, "sum", sum);
    let program = b.finish().expect("valid model");

    let text = program.decl_text(report).expect("rendered");
    let sel = TextRange::new(
        text.find("        int sum").expect("selection start"),
        text.find("        return sum").expect("selection end"),
    );
    let outcome = perform(
        &program,
        &request(RequestKind::ExtractMethod(ExtractMethod {
            method: report,
            selection: sel,
            new_name: "helper".to_string(),
        })),
        &CancelFlag::new(),
    )
    .expect("request runs");
    assert!(outcome.status.allows_edits());
    let changed = outcome.edits.apply(&program).expect("edits apply");

    assert!(changed["Util.java"].contains("        int sum = helper(n);\n        return sum;"));
    assert!(changed["Util.java"].contains("    private int helper(int n) {"));
    assert!(changed["Util.java"].contains("        return sum;\n    }\n}\n"));
}

#[test]
fn extract_method_rejects_jumps_across_the_selection_boundary() {
    let mut b = ProgramBuilder::new();
    let unit = b.unit("Util.java");
    let util = b.class(unit, "Util");
    let report = b.method(
        util,
        "report",
        Some(int()),
        &[("n", int())],
        Some("log(n);\nreturn n;"),
    );
    let program = b.finish().expect("valid model");

    let text = program.decl_text(report).expect("rendered");
    let start = text.find("        log(n)").expect("selection start");
    let end = text.find("    }").expect("selection end");
    let outcome = perform(
        &program,
        &request(RequestKind::ExtractMethod(ExtractMethod {
            method: report,
            selection: TextRange::new(start, end),
            new_name: "helper".to_string(),
        })),
        &CancelFlag::new(),
    )
    .expect("request runs");
    assert!(!outcome.status.allows_edits());
    assert!(outcome.edits.is_empty());
}

#[test]
fn indirection_routes_exactly_one_call_site() {
    let mut b = ProgramBuilder::new();
    let unit_server = b.unit("Server.java");
    let server = b.class(unit_server, "Server");
    b.method(
        server,
        "send",
        None,
        &[("msg", TypeRef::Unresolved("java.lang.String".to_string()))],
        Some(""),
    );

    let unit_gateway = b.unit("Gateway.java");
    let gateway = b.class(unit_gateway, "Gateway");

    let unit_client = b.unit("Client.java");
    let client = b.class(unit_client, "Client");
    let go = b.method(
        client,
        "go",
        None,
        &[("s", TypeRef::named(server)),
          ("msg", TypeRef::Unresolved("java.lang.String".to_string()))],
        Some("s.send(msg);\ns.send(msg);"),
    );
    let routed = b.invoke(
        go,
        "s.send(msg)",
        "send",
        Receiver::Expr("s".to_string()),
        Some(TypeRef::named(server)),
        vec![Argument::new("msg", TypeRef::Unresolved("java.lang.String".to_string()))],
    );
    b.invoke(
        go,
        "s.send(msg)",
        "send",
        Receiver::Expr("s".to_string()),
        Some(TypeRef::named(server)),
        vec![Argument::new("msg", TypeRef::Unresolved("java.lang.String".to_string()))],
    );
    let program = b.finish().expect("valid model");

    let outcome = perform(
        &program,
        &request(RequestKind::IntroduceIndirection(IntroduceIndirection {
            call_site: routed,
            delegate_type: gateway,
            name: None,
        })),
        &CancelFlag::new(),
    )
    .expect("request runs");
    assert!(outcome.status.allows_edits());
    let changed = outcome.edits.apply(&program).expect("edits apply");

    assert_eq!(
        changed["Gateway.java"],
        "class Gateway {\n\
         \x20   public static void send(Server s, String msg) {\n\
         \x20       s.send(msg);\n\
         \x20   }\n\
         }\n"
    );
    // Only the designated occurrence is rerouted.
    assert_eq!(
        changed["Client.java"],
        "class Client {\n\
         \x20   void go(Server s, String msg) {\n\
         \x20       Gateway.send(s, msg);\n\
         \x20       s.send(msg);\n\
         \x20   }\n\
         }\n"
    );
}

#[test]
fn make_static_threads_the_receiver_through_body_and_sites() {
    let mut b = ProgramBuilder::new();
    let unit_counter = b.unit("Counter.java");
    let counter = b.class(unit_counter, "Counter");
    b.field(counter, "total", int());
    let bump = b.method(
        counter,
        "bump",
        Some(int()),
        &[("amount", int())],
        Some("total += amount;\nreturn total;"),
    );

    let unit_main = b.unit("Main.java");
    let main_cls = b.class(unit_main, "Main");
    let run = b.method(
        main_cls,
        "run",
        None,
        &[("c", TypeRef::named(counter))],
        Some("c.bump(5);"),
    );
    b.invoke(
        run,
        "c.bump(5)",
        "bump",
        Receiver::Expr("c".to_string()),
        Some(TypeRef::named(counter)),
        vec![Argument::new("5", int())],
    );
    let program = b.finish().expect("valid model");

    let outcome = perform(
        &program,
        &request(RequestKind::MakeStatic(MakeStatic { method: bump })),
        &CancelFlag::new(),
    )
    .expect("request runs");
    assert!(outcome.status.allows_edits());
    let changed = outcome.edits.apply(&program).expect("edits apply");

    assert_eq!(
        changed["Counter.java"],
        "class Counter {\n\
         \x20   int total;\n\
         \n\
         \x20   static int bump(Counter c, int amount) {\n\
         \x20       c.total += amount;\n\
         \x20       return c.total;\n\
         \x20   }\n\
         }\n"
    );
    assert_eq!(
        changed["Main.java"],
        "class Main {\n\
         \x20   void run(Counter c) {\n\
         \x20       Counter.bump(c, 5);\n\
         \x20   }\n\
         }\n"
    );
}

#[test]
fn make_static_without_instance_state_keeps_the_parameter_list() {
    let mut b = ProgramBuilder::new();
    let unit = b.unit("MathUtil.java");
    let math = b.class(unit, "MathUtil");
    let add = b.method(
        math,
        "add",
        Some(int()),
        &[("a", int()), ("b", int())],
        Some("return a + b;"),
    );
    let program = b.finish().expect("valid model");

    let outcome = perform(
        &program,
        &request(RequestKind::MakeStatic(MakeStatic { method: add })),
        &CancelFlag::new(),
    )
    .expect("request runs");
    assert!(outcome.status.allows_edits());
    let changed = outcome.edits.apply(&program).expect("edits apply");
    assert!(changed["MathUtil.java"].contains("    static int add(int a, int b) {"));
    assert!(changed["MathUtil.java"].contains("        return a + b;"));
}
