//! Hoisting members into an ancestor and pushing them into subtypes.

use graft_model::{DeclId, Primitive, Program, ProgramBuilder, TypeRef};
use graft_refactor::{perform, CancelFlag, PullUp, PushDown, RefactorRequest, RequestKind};
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

/// `Shape` with two subclasses both declaring `int area()`.
fn shapes(circle_body: &str, square_body: &str) -> (Program, DeclId) {
    let mut b = ProgramBuilder::new();
    let unit_shape = b.unit("Shape.java");
    let shape = b.class(unit_shape, "Shape");
    b.set_abstract(shape);

    let unit_circle = b.unit("Circle.java");
    let circle = b.class(unit_circle, "Circle");
    b.extends(circle, shape);
    let circle_area = b.method(circle, "area", Some(int()), &[], Some(circle_body));

    let unit_square = b.unit("Square.java");
    let square = b.class(unit_square, "Square");
    b.extends(square, shape);
    b.method(square, "area", Some(int()), &[], Some(square_body));

    (b.finish().expect("valid model"), circle_area)
}

#[test]
fn divergent_bodies_hoist_only_an_abstract_declaration() {
    let (program, circle_area) = shapes("return 1;", "return 2;");
    let outcome = perform(
        &program,
        &request(RequestKind::PullUp(PullUp {
            method: circle_area,
            destination: None,
        })),
        &CancelFlag::new(),
    )
    .expect("request runs");
    assert!(outcome.status.allows_edits());
    assert!(outcome
        .status
        .entries
        .iter()
        .any(|e| e.message.contains("diverge")));
    let changed = outcome.edits.apply(&program).expect("edits apply");

    assert_eq!(
        changed["Shape.java"],
        "abstract class Shape {\n    abstract int area();\n}\n"
    );
    // The concrete overrides stay where they are.
    assert_eq!(changed.len(), 1);
}

#[test]
fn identical_bodies_hoist_the_implementation_and_delete_the_siblings() {
    // Layout differences do not count as divergence.
    let (program, circle_area) = shapes("return 1;", "return  1;");
    let outcome = perform(
        &program,
        &request(RequestKind::PullUp(PullUp {
            method: circle_area,
            destination: None,
        })),
        &CancelFlag::new(),
    )
    .expect("request runs");
    assert!(outcome.status.allows_edits());
    let changed = outcome.edits.apply(&program).expect("edits apply");

    assert_eq!(
        changed["Shape.java"],
        "abstract class Shape {\n\
         \x20   int area() {\n\
         \x20       return 1;\n\
         \x20   }\n\
         }\n"
    );
    assert_eq!(changed["Circle.java"], "class Circle extends Shape {\n}\n");
    assert_eq!(changed["Square.java"], "class Square extends Shape {\n}\n");
}

#[test]
fn private_members_cannot_be_pulled_up() {
    let mut b = ProgramBuilder::new();
    let unit = b.unit("Shape.java");
    let shape = b.class(unit, "Shape");
    b.set_abstract(shape);
    let unit_circle = b.unit("Circle.java");
    let circle = b.class(unit_circle, "Circle");
    b.extends(circle, shape);
    let area = b.method(circle, "area", Some(int()), &[], Some("return 1;"));
    b.set_visibility(area, graft_model::Visibility::Private);
    let program = b.finish().expect("valid model");

    let outcome = perform(
        &program,
        &request(RequestKind::PullUp(PullUp {
            method: area,
            destination: None,
        })),
        &CancelFlag::new(),
    )
    .expect("request runs");
    assert!(!outcome.status.allows_edits());
    assert!(outcome.edits.is_empty());
}

#[test]
fn push_down_copies_into_subtypes_without_an_override() {
    let mut b = ProgramBuilder::new();
    let unit_animal = b.unit("Animal.java");
    let animal = b.class(unit_animal, "Animal");
    let speak = b.method(animal, "speak", None, &[], Some("log(\"...\");"));

    let unit_dog = b.unit("Dog.java");
    let dog = b.class(unit_dog, "Dog");
    b.extends(dog, animal);
    b.method(dog, "speak", None, &[], Some("log(\"woof\");"));

    let unit_cat = b.unit("Cat.java");
    let cat = b.class(unit_cat, "Cat");
    b.extends(cat, animal);
    let program = b.finish().expect("valid model");

    let outcome = perform(
        &program,
        &request(RequestKind::PushDown(PushDown {
            method: speak,
            keep_abstract: false,
        })),
        &CancelFlag::new(),
    )
    .expect("request runs");
    assert!(outcome.status.allows_edits());
    assert!(outcome
        .status
        .entries
        .iter()
        .any(|e| e.message.contains("already overrides")));
    let changed = outcome.edits.apply(&program).expect("edits apply");

    assert_eq!(
        changed["Cat.java"],
        "class Cat extends Animal {\n\
         \x20   void speak() {\n\
         \x20       log(\"...\");\n\
         \x20   }\n\
         }\n"
    );
    assert_eq!(changed["Animal.java"], "class Animal {\n}\n");
    // Dog keeps its own implementation untouched.
    assert!(!changed.contains_key("Dog.java"));
}

#[test]
fn push_down_can_leave_an_abstract_declaration_behind() {
    let mut b = ProgramBuilder::new();
    let unit_base = b.unit("Base.java");
    let base = b.class(unit_base, "Base");
    b.set_abstract(base);
    let render = b.method(base, "render", None, &[], Some("draw();"));

    let unit_panel = b.unit("Panel.java");
    let panel = b.class(unit_panel, "Panel");
    b.extends(panel, base);
    let program = b.finish().expect("valid model");

    let outcome = perform(
        &program,
        &request(RequestKind::PushDown(PushDown {
            method: render,
            keep_abstract: true,
        })),
        &CancelFlag::new(),
    )
    .expect("request runs");
    assert!(outcome.status.allows_edits());
    let changed = outcome.edits.apply(&program).expect("edits apply");

    assert_eq!(
        changed["Base.java"],
        "abstract class Base {\n    abstract void render();\n}\n"
    );
    assert!(changed["Panel.java"].contains("    void render() {\n        draw();\n    }\n"));
}
