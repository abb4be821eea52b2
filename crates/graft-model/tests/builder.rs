use graft_model::{Primitive, ProgramBuilder, TypeRef, Visibility};
use pretty_assertions::assert_eq;

fn int() -> TypeRef {
    TypeRef::Primitive(Primitive::Int)
}

#[test]
fn renders_canonical_unit_text_with_consistent_spans() {
    let mut b = ProgramBuilder::new();
    let unit = b.unit("A.java");
    let other = b.class(unit, "B");
    let a = b.class(unit, "A");
    b.set_visibility(a, Visibility::Public);
    let field = b.field(a, "b", TypeRef::named(other));
    b.set_visibility(field, Visibility::Private);
    let m = b.method(a, "count", Some(int()), &[("x", int())], Some("return x + 1;"));
    let program = b.finish().expect("valid model");

    assert_eq!(
        program.units()[0].text,
        "class B {\n\
         }\n\
         \n\
         public class A {\n\
         \x20   private B b;\n\
         \n\
         \x20   int count(int x) {\n\
         \x20       return x + 1;\n\
         \x20   }\n\
         }\n"
    );

    assert_eq!(
        program.decl_text(field).expect("field span"),
        "    private B b;\n"
    );
    assert_eq!(
        program.decl_text(m).expect("method span"),
        "    int count(int x) {\n        return x + 1;\n    }\n"
    );
    assert_eq!(program.qualified_name(m), "A.count");
}

#[test]
fn local_declarations_are_located_in_the_body() {
    let mut b = ProgramBuilder::new();
    let unit = b.unit("A.java");
    let a = b.class(unit, "A");
    let m = b.method(
        a,
        "work",
        Some(int()),
        &[],
        Some("int tmp = 40 + 2;\nreturn tmp;"),
    );
    let tmp = b.local(m, "tmp", int(), "40 + 2");
    b.name_ref(m, "tmp", tmp);
    let program = b.finish().expect("valid model");

    assert_eq!(
        program.decl_text(tmp).expect("local span"),
        "int tmp = 40 + 2;"
    );
    // The registered reference is the *use*, not the declaration: marker
    // occurrences are matched in order, and the declaration's own `tmp` was
    // consumed by the local itself.
    let refs = program.references_to(tmp);
    assert_eq!(refs.len(), 1);
    let use_text = program.slice(refs[0].unit, refs[0].range);
    assert_eq!(use_text, "tmp");
}
