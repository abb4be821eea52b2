//! Pull Up / Push Down.
//!
//! Pull Up hoists a member into an ancestor. When every sibling
//! implementation of the same signature is structurally identical (modulo
//! whitespace) the implementation itself moves and the siblings are deleted;
//! when bodies diverge but the signature is shared, an abstract declaration
//! is introduced in the ancestor and every concrete override stays. Only the
//! chosen ancestor gains a declaration; intermediate types are left alone.
//!
//! Push Down copies the member into each direct subtype that does not
//! already override it, deleting the original or leaving it behind as an
//! abstract declaration.

use std::sync::OnceLock;

use graft_model::{DeclId, DeclKind, Modifiers, Program, Visibility};
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::edit::{Edit, EditSet};
use crate::engine::{outcome, RefactorError, RefactorOutcome};
use crate::precondition::{check_member_collision, instance_member_names, instance_state_refs};
use crate::status::{RefactoringStatus, StatusAnchor};
use crate::synth::{class_indent, insert_member, method_text, param_list};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PullUp {
    pub method: DeclId,
    /// Ancestor receiving the declaration; defaults to the direct superclass.
    #[serde(default)]
    pub destination: Option<DeclId>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PushDown {
    pub method: DeclId,
    /// Leave an abstract declaration behind instead of deleting the member.
    #[serde(default)]
    pub keep_abstract: bool,
}

pub(crate) fn pull_up(program: &Program, params: &PullUp) -> Result<RefactorOutcome, RefactorError> {
    let decl = program.decl(params.method);
    if decl.kind != DeclKind::Method {
        return Err(RefactorError::WrongTargetKind("method"));
    }
    let owner = match program.enclosing_type(params.method) {
        Some(ty) => ty,
        None => return Err(RefactorError::WrongTargetKind("member method")),
    };
    let mut status = RefactoringStatus::new();

    let destination = match params.destination {
        Some(dest) => dest,
        None => match program.direct_supertypes(owner).first().copied() {
            Some(dest) => dest,
            None => {
                status.error(
                    format!("`{}` has no supertype in the snapshot", program.decl(owner).name),
                    Some(StatusAnchor::Decl(owner)),
                );
                return Ok(outcome(status, EditSet::new()));
            }
        },
    };
    if !program.is_subtype_decl(owner, destination) || owner == destination {
        status.error(
            format!(
                "`{}` is not an ancestor of `{}`",
                program.decl(destination).name,
                program.decl(owner).name
            ),
            Some(StatusAnchor::Decl(destination)),
        );
        return Ok(outcome(status, EditSet::new()));
    }
    if decl.modifiers.visibility == Visibility::Private {
        status.error(
            format!("private member `{}` cannot be pulled up", decl.name),
            Some(StatusAnchor::Decl(params.method)),
        );
    }
    let erased = program.erased_param_types(params.method);
    check_member_collision(program, destination, &decl.name, Some(&erased), &[], &mut status);
    if !status.allows_edits() {
        return Ok(outcome(status, EditSet::new()));
    }

    // Every declaration of the same signature below the destination.
    let siblings: Vec<DeclId> = program
        .decls()
        .filter(|d| d.is_type() && d.id != destination && program.is_subtype_decl(d.id, destination))
        .flat_map(|t| program.methods_named(t.id, &decl.name))
        .filter(|m| program.same_signature(m.id, params.method))
        .map(|m| m.id)
        .collect();

    let identical = siblings.iter().all(|&s| {
        normalized_body(program, s) == normalized_body(program, params.method)
    });

    let mut edits = EditSet::new();
    let dest_indent = class_indent(program.decl_text(destination).unwrap_or(""));
    if identical {
        // One shared implementation hoists; the referenced members must
        // exist on the ancestor.
        for name in instance_state_refs(program, params.method) {
            if !instance_member_names(program, destination).contains(&name) {
                status.error(
                    format!(
                        "body references `{}`, which `{}` does not declare",
                        name,
                        program.decl(destination).name
                    ),
                    Some(StatusAnchor::Decl(params.method)),
                );
            }
        }
        if !status.allows_edits() {
            return Ok(outcome(status, EditSet::new()));
        }
        let hoisted = method_text(
            program,
            &dest_indent,
            &decl.modifiers,
            decl.ty.as_ref(),
            &decl.name,
            &param_list(program, params.method),
            decl.is_varargs,
            decl.body.as_deref(),
        );
        edits.push(insert_member(program, destination, &hoisted));
        for &sibling in &siblings {
            edits.push(Edit::delete_decl(program, sibling));
        }
        status.info(format!(
            "pulled `{}` up into `{}`, removing {} identical sibling implementation(s)",
            decl.name,
            program.decl(destination).name,
            siblings.len()
        ));
    } else {
        // Divergent bodies share a signature: the ancestor gains an abstract
        // declaration and every concrete override stays where it is.
        if program.decl(destination).kind == DeclKind::Class
            && !program.decl(destination).is_abstract()
        {
            status.warning(
                format!(
                    "`{}` is not abstract; it must become abstract to hold the declaration",
                    program.decl(destination).name
                ),
                Some(StatusAnchor::Decl(destination)),
            );
        }
        let abstract_modifiers = Modifiers {
            is_abstract: true,
            is_static: false,
            is_final: false,
            ..decl.modifiers
        };
        let declaration = method_text(
            program,
            &dest_indent,
            &abstract_modifiers,
            decl.ty.as_ref(),
            &decl.name,
            &param_list(program, params.method),
            decl.is_varargs,
            None,
        );
        edits.push(insert_member(program, destination, &declaration));
        status.info(format!(
            "sibling bodies diverge; introduced abstract `{}` in `{}`",
            decl.name,
            program.decl(destination).name
        ));
    }
    debug!(
        method = %program.qualified_name(params.method),
        destination = %program.decl(destination).name,
        identical,
        siblings = siblings.len(),
        "pull up"
    );
    Ok(outcome(status, edits))
}

pub(crate) fn push_down(
    program: &Program,
    params: &PushDown,
) -> Result<RefactorOutcome, RefactorError> {
    let decl = program.decl(params.method);
    if decl.kind != DeclKind::Method {
        return Err(RefactorError::WrongTargetKind("method"));
    }
    let owner = match program.enclosing_type(params.method) {
        Some(ty) => ty,
        None => return Err(RefactorError::WrongTargetKind("member method")),
    };
    let mut status = RefactoringStatus::new();
    let subtypes = program.direct_subtypes(owner);
    if subtypes.is_empty() {
        status.error(
            format!("`{}` has no subtypes to push down into", program.decl(owner).name),
            Some(StatusAnchor::Decl(owner)),
        );
        return Ok(outcome(status, EditSet::new()));
    }

    let mut edits = EditSet::new();
    let mut copies = 0usize;
    for sub in subtypes {
        let already = program
            .methods_named(sub, &decl.name)
            .iter()
            .any(|m| program.same_signature(m.id, params.method));
        if already {
            status.info(format!(
                "`{}` already overrides `{}`; its implementation wins",
                program.decl(sub).name,
                decl.name
            ));
            continue;
        }
        let indent = class_indent(program.decl_text(sub).unwrap_or(""));
        let copy = method_text(
            program,
            &indent,
            &decl.modifiers,
            decl.ty.as_ref(),
            &decl.name,
            &param_list(program, params.method),
            decl.is_varargs,
            decl.body.as_deref(),
        );
        edits.push(insert_member(program, sub, &copy));
        copies += 1;
    }

    if params.keep_abstract {
        let indent: String = program
            .decl_text(params.method)
            .unwrap_or("")
            .chars()
            .take_while(|c| *c == ' ')
            .collect();
        let abstract_modifiers = Modifiers {
            is_abstract: true,
            is_static: false,
            is_final: false,
            ..decl.modifiers
        };
        let declaration = method_text(
            program,
            &indent,
            &abstract_modifiers,
            decl.ty.as_ref(),
            &decl.name,
            &param_list(program, params.method),
            decl.is_varargs,
            None,
        );
        edits.push(Edit::replace_decl(program, params.method, declaration));
    } else {
        edits.push(Edit::delete_decl(program, params.method));
    }
    debug!(
        method = %program.qualified_name(params.method),
        copies,
        keep_abstract = params.keep_abstract,
        "push down"
    );
    status.info(format!("pushed `{}` down into {} subtype(s)", decl.name, copies));
    Ok(outcome(status, edits))
}

/// Body text with indentation, blank lines, and interior whitespace runs
/// collapsed, for structural comparison.
fn normalized_body(program: &Program, method: DeclId) -> Option<String> {
    static WS: OnceLock<Regex> = OnceLock::new();
    let ws = WS.get_or_init(|| Regex::new(r"[ \t]+").expect("valid regex"));
    program.decl(method).body.as_ref().map(|body| {
        body.lines()
            .map(|line| ws.replace_all(line.trim(), " ").into_owned())
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_bodies_ignore_layout_only_differences() {
        let mut b = graft_model::ProgramBuilder::new();
        let unit = b.unit("lib.java");
        let a = b.class(unit, "A");
        let m1 = b.method(a, "m", None, &[], Some("x();\ny();"));
        let m2 = b.method(a, "n", None, &[], Some("  x();\n\n  y();"));
        let program = b.finish().expect("valid model");
        assert_eq!(normalized_body(&program, m1), normalized_body(&program, m2));
    }
}
