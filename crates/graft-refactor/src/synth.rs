//! Synthesis of new member text.
//!
//! Rendering matches the canonical unit layout the snapshot builder produces
//! (four-space member indent, modifiers in visibility/static/abstract/final
//! order, `void` for absent return types, `Ty...` for a trailing varargs
//! parameter), so synthesized members are indistinguishable from
//! binder-supplied ones after the printer applies the edits.

use graft_model::{DeclId, Modifiers, Program, TypeRef};

use crate::edit::Edit;
use crate::scan::indent_block;

pub(crate) fn push_modifiers(out: &mut String, modifiers: &Modifiers) {
    let vis = modifiers.visibility.keyword();
    if !vis.is_empty() {
        out.push_str(vis);
        out.push(' ');
    }
    if modifiers.is_static {
        out.push_str("static ");
    }
    if modifiers.is_abstract {
        out.push_str("abstract ");
    }
    if modifiers.is_final {
        out.push_str("final ");
    }
}

/// `(type text, name)` pairs of a method's declared parameters.
pub(crate) fn param_list(program: &Program, method: DeclId) -> Vec<(String, String)> {
    program
        .decl(method)
        .params
        .iter()
        .map(|&p| {
            let param = program.decl(p);
            let ty = param
                .ty
                .as_ref()
                .map(|t| program.display_type(t))
                .unwrap_or_else(|| "Object".to_string());
            (ty, param.name.clone())
        })
        .collect()
}

/// Render a full method declaration at `indent`. `body` is unindented
/// statement text; `None` renders an abstract declaration.
pub(crate) fn method_text(
    program: &Program,
    indent: &str,
    modifiers: &Modifiers,
    ret: Option<&TypeRef>,
    name: &str,
    params: &[(String, String)],
    varargs: bool,
    body: Option<&str>,
) -> String {
    let mut out = String::new();
    out.push_str(indent);
    push_modifiers(&mut out, modifiers);
    out.push_str(&match ret {
        Some(ty) => program.display_type(ty),
        None => "void".to_string(),
    });
    out.push(' ');
    out.push_str(name);
    out.push('(');
    for (n, (ty, pname)) in params.iter().enumerate() {
        if n > 0 {
            out.push_str(", ");
        }
        let ty_text = if varargs && n + 1 == params.len() {
            match ty.strip_suffix("[]") {
                Some(elem) => format!("{elem}..."),
                None => ty.clone(),
            }
        } else {
            ty.clone()
        };
        out.push_str(&ty_text);
        out.push(' ');
        out.push_str(pname);
    }
    out.push(')');
    match body {
        None => out.push_str(";\n"),
        Some(body) => {
            out.push_str(" {\n");
            out.push_str(&indent_block(body, &format!("{indent}    ")));
            if !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(indent);
            out.push_str("}\n");
        }
    }
    out
}

/// The indentation of the first member line of a class's text.
pub(crate) fn class_indent(class_text: &str) -> String {
    let mut lines = class_text.lines();
    lines.next();
    for line in lines {
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('}') {
            continue;
        }
        let indent_len = line.len() - trimmed.len();
        return line[..indent_len].to_string();
    }
    "    ".to_string()
}

/// Insert `member_text` just before the class's closing brace, keeping one
/// blank line between existing members and the insertion.
pub(crate) fn insert_member(program: &Program, class: DeclId, member_text: &str) -> Edit {
    let text = program.decl_text(class).unwrap_or("");
    let close = text.rfind('}').unwrap_or(text.len());
    let prefix = &text[..close];
    let body_start = text.find('{').map(|p| p + 1).unwrap_or(0);
    let mut insertion = String::new();
    if !prefix.ends_with('\n') {
        insertion.push('\n');
    }
    if !text[body_start..close].trim().is_empty() && !prefix.ends_with("\n\n") {
        insertion.push('\n');
    }
    insertion.push_str(member_text);
    if !insertion.ends_with('\n') {
        insertion.push('\n');
    }
    Edit::insert(class, close, insertion)
}

/// Append `class_text` as a new sibling right after `after`'s declaration.
pub(crate) fn append_sibling(program: &Program, after: DeclId, class_text: &str) -> Edit {
    let len = program.decl_text(after).map_or(0, str::len);
    let mut insertion = String::from("\n");
    insertion.push_str(class_text);
    if !insertion.ends_with('\n') {
        insertion.push('\n');
    }
    Edit::insert(after, len, insertion)
}

#[cfg(test)]
mod tests {
    use super::*;
    use graft_model::{Primitive, ProgramBuilder, Visibility};
    use pretty_assertions::assert_eq;

    #[test]
    fn method_text_matches_canonical_rendering() {
        let mut b = ProgramBuilder::new();
        let unit = b.unit("A.java");
        let a = b.class(unit, "A");
        let m = b.method(
            a,
            "count",
            Some(TypeRef::Primitive(Primitive::Int)),
            &[("x", TypeRef::Primitive(Primitive::Int))],
            Some("return x + 1;"),
        );
        let program = b.finish().expect("valid model");

        let rendered = method_text(
            &program,
            "    ",
            &Modifiers::default(),
            Some(&TypeRef::Primitive(Primitive::Int)),
            "count",
            &[("int".to_string(), "x".to_string())],
            false,
            Some("return x + 1;"),
        );
        assert_eq!(rendered, program.decl_text(m).unwrap());
    }

    #[test]
    fn inserting_into_a_populated_class_adds_a_separating_blank_line() {
        let mut b = ProgramBuilder::new();
        let unit = b.unit("A.java");
        let a = b.class(unit, "A");
        b.set_visibility(a, Visibility::Public);
        b.method(a, "first", None, &[], Some(""));
        let program = b.finish().expect("valid model");

        let edit = insert_member(&program, a, "    void second() {\n    }\n");
        let class_text = program.decl_text(a).unwrap();
        assert_eq!(class_indent(class_text), "    ");
        assert!(edit.new_text.starts_with('\n'));
    }
}
